//! JSON output of an aggregation run.
//!
//! The document mirrors [`AggregationResult`]: `limit` plus a `sources`
//! array in configuration order, each with its `articles` and an optional
//! `failure`.

use crate::models::AggregationResult;

pub fn render(result: &AggregationResult) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SourceError;
    use crate::models::SourceResult;

    #[test]
    fn test_render_json_keeps_failed_sources() {
        let result = AggregationResult {
            limit: 3,
            sources: vec![SourceResult::failed(
                "B",
                &SourceError::Unavailable("dns".into()),
            )],
        };
        let json = render(&result).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["limit"], 3);
        assert_eq!(value["sources"][0]["source"], "B");
        assert_eq!(value["sources"][0]["articles"].as_array().map(Vec::len), Some(0));
        assert_eq!(value["sources"][0]["failure"]["kind"], "unavailable");
    }
}
