//! Feed lookup endpoint
//!
//! `GET /feedinfo?url=<feed>` maps every [`FeedLookup`] outcome to a fixed
//! status and plain-text body. The upstream stat is passed through as raw
//! bytes; upstream error text never reaches the client.

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};

use crate::config::StaleResponse;
use crate::metrics;
use crate::monitor::{FeedLookup, TrackedFeed};

use super::AppState;

/// Body of the 417 response
pub const STALE_MESSAGE: &str = "information could not be obtained for more than 6 hours";

// ============================================================================
// API Routes
// ============================================================================

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/feedinfo", get(feed_info))
        .route("/feeds", get(list_feeds))
        .with_state(state)
}

// ============================================================================
// Handlers
// ============================================================================

/// Feed info endpoint
async fn feed_info(
    State(state): State<AppState>,
    Query(params): Query<Vec<(String, String)>>,
) -> Response {
    // Repeated keys are allowed, the first one wins
    let url = params
        .into_iter()
        .find(|(key, _)| key == "url")
        .map(|(_, value)| value)
        .filter(|value| !value.is_empty());

    let Some(url) = url else {
        metrics::record_lookup(StatusCode::BAD_REQUEST.as_u16());
        return StatusCode::BAD_REQUEST.into_response();
    };

    let lookup = state.monitor.lookup(&url).await;
    let (status, body) = render_lookup(lookup, state.monitor.stale_response());

    tracing::debug!(url = %url, status = status.as_u16(), "Feed lookup served");
    metrics::record_lookup(status.as_u16());

    (status, [(header::CONTENT_TYPE, "text/plain")], body).into_response()
}

/// Tracked feeds, sorted by URL
async fn list_feeds(State(state): State<AppState>) -> Json<Vec<TrackedFeed>> {
    Json(state.monitor.registry().snapshot().await)
}

// ============================================================================
// Rendering
// ============================================================================

/// Status and body of a lookup outcome
pub fn render_lookup(lookup: FeedLookup, stale: StaleResponse) -> (StatusCode, Vec<u8>) {
    match lookup {
        FeedLookup::Pending => (StatusCode::ACCEPTED, Vec::new()),
        FeedLookup::Ready(state) => (StatusCode::OK, state.payload()),
        FeedLookup::Stale(state) => {
            let mut body = STALE_MESSAGE.as_bytes().to_vec();
            if stale == StaleResponse::MessageAndPayload {
                body.extend_from_slice(&state.payload());
            }
            (StatusCode::EXPECTATION_FAILED, body)
        }
        FeedLookup::NotFound => (StatusCode::NOT_FOUND, Vec::new()),
        FeedLookup::LimitExhausted { limit, tracked } => {
            let mut body = format!("Feeds limit ({limit}) is exhausted:\n");
            for url in tracked {
                body.push_str(&url);
                body.push('\n');
            }
            (StatusCode::PAYMENT_REQUIRED, body.into_bytes())
        }
        FeedLookup::Unavailable => (StatusCode::SERVICE_UNAVAILABLE, Vec::new()),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::FeedState;
    use bytes::Bytes;

    fn state(failing: bool) -> FeedState {
        FeedState {
            size_marker: "100".to_string(),
            raw_stat: Bytes::from_static(b"size:100 bytes"),
            vacancy_count: 3,
            failing_since: failing.then(chrono::Utc::now),
        }
    }

    #[test]
    fn test_render_ready() {
        let (status, body) = render_lookup(FeedLookup::Ready(state(false)), StaleResponse::default());
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"size:100 bytes, vacanciesCount: 3");
    }

    #[test]
    fn test_render_keeps_raw_stat_bytes() {
        let mut state = state(true);
        state.raw_stat = Bytes::from_static(b"name:\xff\xfe size:100 bytes");

        let (_, body) = render_lookup(FeedLookup::Ready(state.clone()), StaleResponse::default());
        assert_eq!(body, b"name:\xff\xfe size:100 bytes, vacanciesCount: 3");

        let (_, body) = render_lookup(FeedLookup::Stale(state), StaleResponse::MessageAndPayload);
        assert!(body.starts_with(STALE_MESSAGE.as_bytes()));
        assert!(body.ends_with(b"\xff\xfe size:100 bytes, vacanciesCount: 3"));
    }

    #[test]
    fn test_render_pending_and_not_found_are_empty() {
        let (status, body) = render_lookup(FeedLookup::Pending, StaleResponse::default());
        assert_eq!(status, StatusCode::ACCEPTED);
        assert!(body.is_empty());

        let (status, body) = render_lookup(FeedLookup::NotFound, StaleResponse::default());
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body.is_empty());
    }

    #[test]
    fn test_render_stale_appends_payload() {
        let (status, body) = render_lookup(
            FeedLookup::Stale(state(true)),
            StaleResponse::MessageAndPayload,
        );
        assert_eq!(status, StatusCode::EXPECTATION_FAILED);
        assert_eq!(
            body,
            b"information could not be obtained for more than 6 hours\
              size:100 bytes, vacanciesCount: 3"
        );
    }

    #[test]
    fn test_render_stale_message_only() {
        let (status, body) =
            render_lookup(FeedLookup::Stale(state(true)), StaleResponse::MessageOnly);
        assert_eq!(status, StatusCode::EXPECTATION_FAILED);
        assert_eq!(body, STALE_MESSAGE.as_bytes());
    }

    #[test]
    fn test_render_limit_exhausted() {
        let lookup = FeedLookup::LimitExhausted {
            limit: 2,
            tracked: vec!["http://a.test/feed".to_string(), "http://b.test/feed".to_string()],
        };
        let (status, body) = render_lookup(lookup, StaleResponse::default());
        assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
        assert_eq!(
            body,
            b"Feeds limit (2) is exhausted:\nhttp://a.test/feed\nhttp://b.test/feed\n"
        );
    }
}
