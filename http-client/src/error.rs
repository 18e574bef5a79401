//! Translation of transport failures and error responses into `AgentError`

use agent_core::AgentError;
use reqwest::StatusCode;
use serde_json::Value;

/// Body fields the backend puts human-readable failure reasons in
const MESSAGE_FIELDS: &[&str] = &["message", "error", "detail"];

/// Map a reqwest failure that happened before a usable response existed
pub fn from_transport(err: reqwest::Error) -> AgentError {
    if err.is_decode() {
        AgentError::Protocol(format!("Malformed response body: {err}"))
    } else if err.is_builder() {
        AgentError::Configuration(format!("Invalid request: {err}"))
    } else {
        // connect, timeout, request and body errors are all worth retrying
        AgentError::Network(err.to_string())
    }
}

/// Map a non-2xx response to `AgentError::Http`
pub fn from_response(status: StatusCode, body: &str) -> AgentError {
    let message = extract_message(body).unwrap_or_else(|| {
        let text = body.trim();
        if text.is_empty() {
            status
                .canonical_reason()
                .unwrap_or("Request failed")
                .to_string()
        } else {
            text.chars().take(500).collect()
        }
    });

    if status == StatusCode::UNAUTHORIZED {
        return AgentError::Unauthorized(message);
    }
    AgentError::http(status.as_u16(), message)
}

/// Pull the first non-empty message field out of a JSON error body.
///
/// `detail` may be a structured validation report; it is rendered as JSON.
fn extract_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    let object = value.as_object()?;

    MESSAGE_FIELDS
        .iter()
        .filter_map(|field| object.get(*field))
        .find_map(|value| match value {
            Value::String(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
            Value::Null | Value::String(_) => None,
            other => Some(other.to_string()),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_field_precedence() {
        let err = from_response(
            StatusCode::BAD_REQUEST,
            r#"{"detail": "third", "error": "second", "message": "first"}"#,
        );
        assert_eq!(err, AgentError::http(400, "first"));

        let err = from_response(StatusCode::NOT_FOUND, r#"{"detail": "Agente não encontrado"}"#);
        assert_eq!(err, AgentError::http(404, "Agente não encontrado"));
    }

    #[test]
    fn test_structured_detail_is_rendered() {
        let err = from_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            r#"{"detail": [{"loc": ["body", "industry"], "msg": "field required"}]}"#,
        );
        match err {
            AgentError::Http { status, message } => {
                assert_eq!(status, 422);
                assert!(message.contains("field required"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_fallbacks_for_unhelpful_bodies() {
        assert_eq!(
            from_response(StatusCode::SERVICE_UNAVAILABLE, ""),
            AgentError::http(503, "Service Unavailable")
        );
        assert_eq!(
            from_response(StatusCode::BAD_GATEWAY, "upstream crashed"),
            AgentError::http(502, "upstream crashed")
        );
        assert_eq!(
            from_response(StatusCode::INTERNAL_SERVER_ERROR, r#"{"error": ""}"#),
            AgentError::http(500, r#"{"error": ""}"#)
        );
    }

    #[test]
    fn test_unauthorized_maps_to_auth_error() {
        let err = from_response(StatusCode::UNAUTHORIZED, r#"{"detail": "Token expired"}"#);
        assert_eq!(err, AgentError::Unauthorized("Token expired".to_string()));
        assert!(!err.is_transient());
    }
}
