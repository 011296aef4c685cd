pub mod health;

use axum::{routing::get, Router};

use crate::cv::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/v1/cv/generate", get(handlers::handle_generate_cv))
        .route("/api/v1/cv/preview", get(handlers::handle_preview_cv))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use axum::response::Response;
    use serde_json::Value;
    use tokio_util::sync::CancellationToken;
    use tower::ServiceExt;
    use uuid::Uuid;

    use super::*;
    use crate::auth::USER_ID_HEADER;
    use crate::cv::pipeline::testing::{ada_store, default_limiter, pipeline};
    use crate::cv::GENERIC_FAILURE;
    use crate::engine::mock::{Faults, MockLauncher};
    use crate::engine::EngineLimiter;
    use crate::profile::store::memory::{make_profile, MemoryProfileStore};

    fn app(store: MemoryProfileStore, launcher: &MockLauncher) -> (Router, AppState) {
        app_with(store, launcher, default_limiter())
    }

    fn app_with(
        store: MemoryProfileStore,
        launcher: &MockLauncher,
        limiter: EngineLimiter,
    ) -> (Router, AppState) {
        let state = AppState {
            pipeline: pipeline(store, launcher, limiter),
        };
        (build_router(state.clone()), state)
    }

    async fn get(router: Router, uri: &str, user: Option<Uuid>) -> Response {
        let mut request = Request::builder().uri(uri);
        if let Some(id) = user {
            request = request.header(USER_ID_HEADER, id.to_string());
        }
        router
            .oneshot(request.body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    async fn json_body(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let (router, _) = app(MemoryProfileStore::new(), &MockLauncher::new());
        let response = get(router, "/health", None).await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["engine"]["available"], 2);
    }

    #[tokio::test]
    async fn test_generate_returns_pdf_attachment() {
        let user_id = Uuid::new_v4();
        let (router, _) = app(ada_store(user_id), &MockLauncher::new());

        let response = get(router, "/api/v1/cv/generate", Some(user_id)).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/pdf");
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"ada-lovelace-cv.pdf\"; filename*=UTF-8''ada-lovelace-cv.pdf"
        );
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[tokio::test]
    async fn test_generate_keeps_accented_name_in_filename() {
        let user_id = Uuid::new_v4();
        let store = MemoryProfileStore::new();
        store
            .profiles
            .lock()
            .unwrap()
            .push(make_profile(user_id, "Zoë Ünal"));
        let (router, _) = app(store, &MockLauncher::new());

        let response = get(router, "/api/v1/cv/generate", Some(user_id)).await;

        assert_eq!(response.status(), StatusCode::OK);
        let disposition = response.headers()[header::CONTENT_DISPOSITION]
            .to_str()
            .unwrap()
            .to_string();
        assert!(disposition.contains("filename=\"zo_-_nal-cv.pdf\""));
        assert!(disposition.ends_with("filename*=UTF-8''zo%C3%AB-%C3%BCnal-cv.pdf"));
    }

    #[tokio::test]
    async fn test_generate_requires_user() {
        let launcher = MockLauncher::new();
        let (router, _) = app(ada_store(Uuid::new_v4()), &launcher);

        let response = get(router, "/api/v1/cv/generate", None).await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = json_body(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(launcher.spy.launches(), 0);
    }

    #[tokio::test]
    async fn test_generate_unknown_profile_is_404() {
        let (router, _) = app(MemoryProfileStore::new(), &MockLauncher::new());

        let response = get(router, "/api/v1/cv/generate", Some(Uuid::new_v4())).await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = json_body(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "Profile not found");
        assert_eq!(body["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_engine_failure_is_uniform_500() {
        let user_id = Uuid::new_v4();
        let launcher = MockLauncher::with_faults(Faults {
            launch: true,
            ..Faults::default()
        });
        let (router, _) = app(ada_store(user_id), &launcher);

        let response = get(router, "/api/v1/cv/generate", Some(user_id)).await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = json_body(response).await;
        assert_eq!(body["error"], GENERIC_FAILURE);
        assert!(!body.to_string().contains("browser binary"));
    }

    #[tokio::test]
    async fn test_busy_engine_is_503() {
        let user_id = Uuid::new_v4();
        let launcher = MockLauncher::new();
        let (router, state) = app_with(
            ada_store(user_id),
            &launcher,
            EngineLimiter::new(1, Duration::ZERO),
        );
        let _held = state
            .pipeline
            .engine()
            .limiter()
            .acquire(&CancellationToken::new())
            .await
            .unwrap();

        let response = get(router, "/api/v1/cv/generate", Some(user_id)).await;

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(json_body(response).await["code"], "OVERLOADED");
        assert_eq!(launcher.spy.launches(), 0);
    }

    #[tokio::test]
    async fn test_preview_returns_context() {
        let user_id = Uuid::new_v4();
        let launcher = MockLauncher::new();
        let (router, _) = app(ada_store(user_id), &launcher);

        let response = get(router, "/api/v1/cv/preview?projects=featured", Some(user_id)).await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["profile"]["name"], "Ada Lovelace");
        assert_eq!(body["data"]["education"][0]["school"], "Analytical Institute");
        assert_eq!(body["data"]["themeColor"], "#4F46E5");
        assert_eq!(launcher.spy.launches(), 0);
    }

    #[tokio::test]
    async fn test_unknown_project_selection_is_400() {
        let user_id = Uuid::new_v4();
        let (router, _) = app(ada_store(user_id), &MockLauncher::new());

        let response = get(router, "/api/v1/cv/preview?projects=some", Some(user_id)).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["code"], "VALIDATION_ERROR");
    }
}
