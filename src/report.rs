//! HTTP status reporting.
//!
//! Read-only surface over [`WatchState`]: `GET /` serializes a snapshot
//! of every endpoint record to a JSON array, `GET /ping` answers
//! liveness without touching the store. Both responses carry the
//! `responding-pod` header with the host identity handed to the core at
//! startup.

use axum::extract::State;
use axum::http::header::{HeaderName, HeaderValue, CONTENT_TYPE};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use tracing::error;

use crate::state::WatchState;

const POD_HEADER: &str = "responding-pod";

/// Shared context for the report handlers.
#[derive(Clone)]
pub struct ReportContext {
    /// Status store to snapshot.
    pub state: WatchState,
    /// Host identity, supplied by the environment.
    pub hostname: String,
}

/// Build the reporter router.
pub fn router(state: WatchState, hostname: String) -> Router {
    Router::new()
        .route("/", get(status))
        .route("/ping", get(ping))
        .with_state(ReportContext { state, hostname })
}

/// `GET /` — JSON array of per-endpoint status objects.
pub async fn status(State(ctx): State<ReportContext>) -> Response {
    let snapshot = ctx.state.snapshot();
    let mut response = match serde_json::to_vec_pretty(&snapshot) {
        Ok(body) => (
            StatusCode::OK,
            [(CONTENT_TYPE, HeaderValue::from_static("application/json"))],
            body,
        )
            .into_response(),
        Err(err) => {
            error!(error = %err, "failed to serialize status snapshot");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "failed to serialize status snapshot",
            )
                .into_response()
        }
    };
    attach_identity(&mut response, &ctx.hostname);
    response
}

/// `GET /ping` — liveness check, fixed body, never blocks on the store.
pub async fn ping(State(ctx): State<ReportContext>) -> Response {
    let mut response = "pong".into_response();
    attach_identity(&mut response, &ctx.hostname);
    response
}

fn attach_identity(response: &mut Response, hostname: &str) {
    let value = HeaderValue::from_str(hostname)
        .unwrap_or_else(|_| HeaderValue::from_static("unknown"));
    response
        .headers_mut()
        .insert(HeaderName::from_static(POD_HEADER), value);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EndpointConfig;
    use crate::state::ProbeResult;
    use chrono::Utc;
    use std::time::Duration;

    fn make_context() -> ReportContext {
        let endpoints = vec![EndpointConfig {
            name: "svc.example.com".to_string(),
            server: "10.0.0.2:53".parse().unwrap(),
            external: false,
        }];
        ReportContext {
            state: WatchState::new(&endpoints, Duration::from_secs(5)),
            hostname: "pod-1".to_string(),
        }
    }

    async fn body_bytes(response: Response) -> Vec<u8> {
        axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap()
            .to_vec()
    }

    #[tokio::test]
    async fn test_ping_returns_pong_with_identity_header() {
        let response = ping(State(make_context())).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers().get(POD_HEADER).unwrap(), "pod-1");
        assert_eq!(body_bytes(response).await, b"pong");
    }

    #[tokio::test]
    async fn test_status_returns_one_object_per_endpoint() {
        let ctx = make_context();
        ctx.state.apply(ProbeResult::success(
            "svc.example.com",
            Utc::now(),
            Duration::from_millis(10),
            vec!["192.0.2.1".parse().unwrap()],
        ));
        ctx.state.aggregate(Utc::now());

        let response = status(State(ctx)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(CONTENT_TYPE).unwrap(),
            "application/json"
        );
        assert_eq!(response.headers().get(POD_HEADER).unwrap(), "pod-1");

        let body = body_bytes(response).await;
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        let array = json.as_array().unwrap();
        assert_eq!(array.len(), 1);
        assert_eq!(array[0]["Endpoint"], "svc.example.com");
        assert_eq!(array[0]["Value"], "192.0.2.1");
    }

    #[tokio::test]
    async fn test_unprintable_hostname_falls_back() {
        let mut ctx = make_context();
        ctx.hostname = "bad\nname".to_string();
        let response = ping(State(ctx)).await;
        assert_eq!(response.headers().get(POD_HEADER).unwrap(), "unknown");
    }
}
