//! Telephony provider webhooks.
//!
//! - `POST /incoming-call` answers an inbound call with XML that points the
//!   provider at this server's `/stream` WebSocket
//! - `POST /hangup` receives the provider's hangup callback

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    Form,
    extract::{RawQuery, State},
    http::{HeaderMap, StatusCode, header},
    response::IntoResponse,
};
use tracing::info;

use crate::state::AppState;

/// Content type the provider streams to us.
const STREAM_CONTENT_TYPE: &str = "audio/x-mulaw;rate=8000";

/// Build the WebSocket URL for the media stream, carrying over the webhook's
/// query string.
fn stream_url(host: &str, query: Option<&str>) -> String {
    let host = host
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .trim_start_matches("wss://")
        .trim_end_matches('/');
    match query.filter(|q| !q.is_empty()) {
        Some(query) => format!("wss://{host}/stream?{query}"),
        None => format!("wss://{host}/stream"),
    }
}

/// Answer XML with a bidirectional `<Stream>` element.
///
/// The URL is the element's only text content, with `&` escaped.
fn answer_xml(stream_url: &str) -> String {
    let escaped = stream_url.replace('&', "&amp;");
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<Response>\n<Stream bidirectional=\"true\" keepCallAlive=\"true\" contentType=\"{STREAM_CONTENT_TYPE}\">{escaped}</Stream>\n</Response>"
    )
}

/// Incoming call webhook
///
/// The stream host is `public_url` when configured, otherwise the request's
/// `Host` header.
pub async fn incoming_call(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    RawQuery(query): RawQuery,
) -> impl IntoResponse {
    let host = state
        .config
        .public_url
        .clone()
        .or_else(|| {
            headers
                .get(header::HOST)
                .and_then(|h| h.to_str().ok())
                .map(str::to_string)
        })
        .unwrap_or_else(|| state.config.address());

    let url = stream_url(&host, query.as_deref());
    info!(stream_url = %url, "Answering incoming call");

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/xml")],
        answer_xml(&url),
    )
}

/// Hangup callback
///
/// Logs the callback fields; nothing else depends on it.
pub async fn hangup(Form(fields): Form<HashMap<String, String>>) -> StatusCode {
    info!(
        call_uuid = fields.get("CallUUID").map(String::as_str).unwrap_or("-"),
        ?fields,
        "Hangup callback received"
    );
    StatusCode::OK
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_url_keeps_query() {
        assert_eq!(
            stream_url("bridge.example.com", Some("from=111&to=222")),
            "wss://bridge.example.com/stream?from=111&to=222"
        );
        assert_eq!(
            stream_url("https://bridge.example.com/", None),
            "wss://bridge.example.com/stream"
        );
        assert_eq!(
            stream_url("bridge.example.com", Some("")),
            "wss://bridge.example.com/stream"
        );
    }

    #[test]
    fn test_answer_xml_escapes_ampersand() {
        let xml = answer_xml("wss://h/stream?from=1&to=2");
        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(xml.contains(
            "<Stream bidirectional=\"true\" keepCallAlive=\"true\" contentType=\"audio/x-mulaw;rate=8000\">wss://h/stream?from=1&amp;to=2</Stream>"
        ));
        assert!(!xml.contains("&to"));
    }

    #[tokio::test]
    async fn test_hangup_returns_ok() {
        let mut fields = HashMap::new();
        fields.insert("CallUUID".to_string(), "abc123".to_string());
        assert_eq!(hangup(Form(fields)).await, StatusCode::OK);
    }
}
