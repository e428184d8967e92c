//! 应用状态

use std::sync::Arc;

use chrono::Duration;
use metrics_exporter_prometheus::PrometheusHandle;
use portal_auth_core::{Guard, SessionCarrier, SessionCodec};
use portal_ports::UserStore;
use sqlx::PgPool;

#[derive(Clone)]
pub struct AppState {
    pub guard: Guard,
    pub store: Arc<dyn UserStore>,
    pub session_ttl: Duration,
    /// 未配置数据库时（测试）readiness 只报告自身
    pub pool: Option<PgPool>,
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(guard: Guard, store: Arc<dyn UserStore>, session_ttl: Duration) -> Self {
        Self {
            guard,
            store,
            session_ttl,
            pool: None,
            metrics: None,
        }
    }

    pub fn with_pool(mut self, pool: PgPool) -> Self {
        self.pool = Some(pool);
        self
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    pub fn codec(&self) -> &SessionCodec {
        self.guard.resolver().codec()
    }

    pub fn carrier(&self) -> &SessionCarrier {
        self.guard.resolver().carrier()
    }
}
