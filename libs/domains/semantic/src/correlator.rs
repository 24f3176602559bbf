//! Pairs a search result with the request that asked for it.

use crate::models::{ResultEnvelope, SearchResponse};

/// Build the outbound response for a search.
///
/// `request_id` is copied verbatim; an absent id stays absent (`null` on the wire).
pub fn wrap(request_id: Option<String>, envelope: ResultEnvelope) -> SearchResponse {
    SearchResponse {
        request_id,
        results: envelope,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SearchHit;

    #[test]
    fn test_wrap_keeps_request_id() {
        let response = wrap(Some("abc-123".into()), ResultEnvelope::success(vec![]));
        assert_eq!(response.request_id.as_deref(), Some("abc-123"));
        assert!(response.results.is_success());
    }

    #[test]
    fn test_wrap_keeps_absent_request_id() {
        let response = wrap(None, ResultEnvelope::error("index unavailable"));
        assert_eq!(response.request_id, None);
        assert_eq!(response.results, ResultEnvelope::error("index unavailable"));
    }

    #[test]
    fn test_wrap_does_not_touch_results() {
        let hits = vec![SearchHit {
            text: "a".into(),
            score: 0.7,
        }];
        let response = wrap(Some("".into()), ResultEnvelope::success(hits.clone()));
        assert_eq!(response.request_id.as_deref(), Some(""));
        assert_eq!(response.results, ResultEnvelope::success(hits));
    }
}
