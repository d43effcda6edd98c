//! API route handlers.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use std::sync::{Arc, Mutex};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::AppConfig;
use crate::pipeline::AcquisitionPipeline;
use crate::scraper::PageFetcher;
use crate::storage::NameStore;
use crate::types::{ErrorResponse, HealthResponse, ScrapeResponse};

/// Application state shared across handlers.
pub struct AppState<R, D> {
    pub config: AppConfig,
    pub pipeline: AcquisitionPipeline<R, D>,
    pub store: Mutex<NameStore>,
}

/// Error type for API handlers.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn internal(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: msg.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorResponse {
            error: self.status.to_string(),
            message: self.message,
        });
        (self.status, body).into_response()
    }
}

/// Build the router
pub fn router<R, D>(state: Arc<AppState<R, D>>) -> Router
where
    R: PageFetcher + 'static,
    D: PageFetcher + 'static,
{
    Router::new()
        .route("/health", get(health))
        .route("/api/scrape", get(scrape::<R, D>))
        .route("/api/horses", get(stored_horses::<R, D>))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Scrape today's final-race entrants.
///
/// Always answers 200; failures are reported in the `error` field.
pub async fn scrape<R: PageFetcher, D: PageFetcher>(
    State(state): State<Arc<AppState<R, D>>>,
) -> Json<ScrapeResponse> {
    Json(state.pipeline.run_today().await.into())
}

/// Names from the named store.
pub async fn stored_horses<R: PageFetcher, D: PageFetcher>(
    State(state): State<Arc<AppState<R, D>>>,
) -> Result<Json<ScrapeResponse>, ApiError> {
    let storage = &state.config.storage;
    let horses = state
        .store
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .project_field(&storage.collection, &storage.field)
        .map_err(|e| ApiError::internal(format!("Failed to read stored horses: {}", e)))?;

    Ok(Json(ScrapeResponse::Horses { horses }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ScrapeError;
    use crate::scraper::fetch::stub::StubFetcher;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    const LIST_HTML: &str = r#"<html><body>
<dl class="RaceList_DataList">
  <dt class="RaceList_DataHeader">高知</dt>
  <dd><ul><li class="RaceList_DataItem"><div class="Race_Num">11R</div><span class="ItemTitle">ファイナルレース</span></li></ul></dd>
</dl>
</body></html>"#;

    const CARD_HTML: &str = r#"<html><body><table>
<tr class="HorseList"><td class="HorseName">ハルウララ</td></tr>
<tr class="HorseList"><td class="HorseName">トサノカゼ</td></tr>
</table></body></html>"#;

    fn app(list: Result<&str, ScrapeError>, card: Result<&str, ScrapeError>) -> Router {
        let config = AppConfig::default();
        let state = Arc::new(AppState {
            pipeline: AcquisitionPipeline::new(&config, StubFetcher::always(list), StubFetcher::always(card)),
            store: Mutex::new(NameStore::in_memory().unwrap()),
            config,
        });
        router(state)
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = get_json(app(Ok(LIST_HTML), Ok(CARD_HTML)), "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_scrape_success() {
        let (status, body) = get_json(app(Ok(LIST_HTML), Ok(CARD_HTML)), "/api/scrape").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"horses": ["ハルウララ", "トサノカゼ"]}));
    }

    #[tokio::test]
    async fn test_scrape_failure_is_error_field() {
        let (status, body) = get_json(
            app(Err(ScrapeError::fetch("browser crashed")), Ok(CARD_HTML)),
            "/api/scrape",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"error": "スクレイピングに失敗しました"}));
    }

    #[tokio::test]
    async fn test_stored_horses() {
        let config = AppConfig::default();
        let store = NameStore::in_memory().unwrap();
        store.insert("horses", &json!({"name": "ハルウララ"})).unwrap();
        let state = Arc::new(AppState {
            pipeline: AcquisitionPipeline::new(
                &config,
                StubFetcher::always(Ok(LIST_HTML)),
                StubFetcher::always(Ok(CARD_HTML)),
            ),
            store: Mutex::new(store),
            config,
        });

        let (status, body) = get_json(router(state), "/api/horses").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"horses": ["ハルウララ"]}));
    }
}
