//! 中间件

use axum::{
    extract::{FromRequestParts, Request, State},
    middleware::Next,
    response::Response,
};
use portal_auth_core::{AuthRequest, CurrentUser, Role};
use portal_errors::AppError;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// 当前用户提取器
///
/// 必须在 `require_role` 之后使用
pub struct AuthUser(pub CurrentUser);

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .map(AuthUser)
            .ok_or_else(|| ApiError(AppError::unauthenticated("Authentication required")))
    }
}

/// 角色守卫中间件
///
/// 身份解析与角色检查都通过后才会执行后续 handler，当前用户注入到请求扩展中
pub async fn require_role(
    State((state, required)): State<(AppState, Role)>,
    request: Request,
    next: Next,
) -> ApiResult<Response> {
    let headers = request.headers().clone();
    let auth = AuthRequest::new(&headers);

    let response = state
        .guard
        .guard(&auth, required, |user| async move {
            let mut request = request;
            request.extensions_mut().insert(user);
            next.run(request).await
        })
        .await?;

    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{UnavailableStore, cookie_for, record, state_with};
    use axum::{
        Router,
        body::Body,
        http::{Request, StatusCode, header::COOKIE},
        middleware,
        routing::get,
    };
    use portal_ports::InMemoryUserStore;
    use std::sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    };
    use tower::ServiceExt;

    fn app(state: AppState, required: Role, invoked: Arc<AtomicBool>) -> Router {
        Router::new()
            .route(
                "/",
                get(move |AuthUser(user): AuthUser| async move {
                    invoked.store(true, Ordering::SeqCst);
                    user.email
                }),
            )
            .route_layer(middleware::from_fn_with_state((state, required), require_role))
    }

    fn request(cookie: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri("/");
        if let Some(cookie) = cookie {
            builder = builder.header(COOKIE, cookie);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_missing_cookie_is_unauthorized_and_handler_skipped() {
        let state = state_with(Arc::new(InMemoryUserStore::new()));
        let invoked = Arc::new(AtomicBool::new(false));

        let response = app(state, Role::Employee, invoked.clone())
            .oneshot(request(None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(!invoked.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_insufficient_role_is_forbidden_and_handler_skipped() {
        let user = record("employee", "emp@example.com");
        let id = user.id.clone();
        let state = state_with(Arc::new(InMemoryUserStore::with_users([user])));
        let cookie = cookie_for(&state, &id);
        let invoked = Arc::new(AtomicBool::new(false));

        let response = app(state, Role::Hr, invoked.clone())
            .oneshot(request(Some(&cookie)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert!(!invoked.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_sufficient_role_reaches_handler_with_user() {
        let user = record("manager", "mgr@example.com");
        let id = user.id.clone();
        let state = state_with(Arc::new(InMemoryUserStore::with_users([user])));
        let cookie = cookie_for(&state, &id);
        let invoked = Arc::new(AtomicBool::new(false));

        let response = app(state, Role::Hr, invoked.clone())
            .oneshot(request(Some(&cookie)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(invoked.load(Ordering::SeqCst));
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"mgr@example.com");
    }

    #[tokio::test]
    async fn test_tampered_cookie_is_unauthorized() {
        let user = record("super_manager", "boss@example.com");
        let id = user.id.clone();
        let state = state_with(Arc::new(InMemoryUserStore::with_users([user])));
        let cookie = format!("{}x", cookie_for(&state, &id));
        let invoked = Arc::new(AtomicBool::new(false));

        let response = app(state, Role::Employee, invoked.clone())
            .oneshot(request(Some(&cookie)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(!invoked.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_unavailable_store_is_not_reported_as_unauthorized() {
        let state = state_with(Arc::new(UnavailableStore));
        let cookie = cookie_for(&state, &portal_common::UserId::new());
        let invoked = Arc::new(AtomicBool::new(false));

        let response = app(state, Role::Employee, invoked.clone())
            .oneshot(request(Some(&cookie)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!invoked.load(Ordering::SeqCst));
    }
}
