use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

use crate::error::{ParseError, ScanError, Stage};
use crate::models::{Locale, QueryResult, Sentiment};
use crate::parse::{find_json_object, is_truthy, string_list, stringify};
use crate::provider::{AiProvider, AiQueryRequest};

const MAX_COMPETITORS: usize = 5;

static RE_TLD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\.(com|io|org|net|co|ai|dev|app|xyz|me|fr|de|uk|us|tech)$").unwrap()
});

/// Brand name guessed from a domain by dropping a common TLD
pub fn extract_brand_name(domain: &str) -> String {
    RE_TLD.replace(domain, "").into_owned()
}

pub(crate) fn analysis_prompt(domain: &str, query: &str, response: &str, locale: Locale) -> String {
    let brand = extract_brand_name(domain);

    let mut prompt = format!(
        r#"Analyze the following AI response about "{domain}" (brand name: "{brand}") for the query "{query}".

AI Response:
"""
{response}
"""

Provide your analysis in JSON format only (no markdown, no explanation):

{{
  "isPresent": true/false,
  "rank": number or null,
  "sentiment": "positive" | "neutral" | "negative",
  "competitors": ["competitor1.com", "competitor2.com"],
  "context": "the first sentence where {brand} is mentioned, or empty string if not present"
}}

Rules:
- "isPresent": be generous. true if "{domain}" or the brand name "{brand}" appears anywhere in the response, case-insensitive, including as part of a longer word, URL or product name
- "rank": the position where {brand} appears in any list or ranking (1 = first mentioned, 2 = second, etc.). null if not in a list or not present
- "sentiment": the overall tone about {brand} specifically. "neutral" if factual, "positive" if recommending, "negative" if criticizing
- "competitors": other domains/brands mentioned in the response (max 5)
- "context": copy the FIRST sentence of the response that mentions {brand}, verbatim. Empty string if not present
"#
    );

    if let Some(instruction) = locale.prompt_instruction() {
        prompt.push_str(instruction);
        prompt.push('\n');
    }
    prompt.push_str("\nRespond ONLY with valid JSON, nothing else.\n");
    prompt
}

/// Build a `QueryResult` from the provider's judgement.
///
/// `query`, `raw_response` and `sources` are the caller's originals; whatever
/// the provider restates for them is ignored.
pub fn parse_analysis_response(
    content: &str,
    query: &str,
    raw_response: &str,
    sources: &[String],
) -> Result<QueryResult, ScanError> {
    let span = find_json_object(content)
        .ok_or_else(|| ScanError::parse(Stage::Analysis, ParseError::NoJson))?;
    let parsed: Value =
        serde_json::from_str(span).map_err(|e| ScanError::parse(Stage::Analysis, e))?;

    let sentiment = parsed
        .get("sentiment")
        .and_then(Value::as_str)
        .and_then(Sentiment::from_label)
        .unwrap_or(Sentiment::Neutral);

    let is_present = parsed.get("isPresent").map(is_truthy).unwrap_or(false);
    let rank = parsed.get("rank").and_then(Value::as_f64);
    let competitors = parsed
        .get("competitors")
        .and_then(|v| string_list(v, MAX_COMPETITORS))
        .unwrap_or_default();
    let context = match parsed.get("context") {
        None | Some(Value::Null) => String::new(),
        Some(v) => stringify(v),
    };

    Ok(QueryResult {
        query: query.to_string(),
        response: raw_response.to_string(),
        is_present,
        rank,
        sentiment,
        competitors,
        sources: sources.to_vec(),
        context,
    })
}

/// Ask the provider to judge one raw answer
pub async fn analyze_response(
    domain: &str,
    query: &str,
    raw_response: &str,
    sources: &[String],
    provider: &dyn AiProvider,
    locale: Locale,
) -> Result<QueryResult, ScanError> {
    let prompt = analysis_prompt(domain, query, raw_response, locale);
    let analysis = provider.query(&AiQueryRequest::new(prompt, domain)).await?;

    parse_analysis_response(&analysis.content, query, raw_response, sources)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockProvider;

    fn sources() -> Vec<String> {
        vec!["https://wiki.com".to_string()]
    }

    #[test]
    fn test_extract_brand_name() {
        assert_eq!(extract_brand_name("example.com"), "example");
        assert_eq!(extract_brand_name("notion.so"), "notion.so");
        assert_eq!(extract_brand_name("shop.example.co.uk"), "shop.example.co");
        assert_eq!(extract_brand_name("mistral.ai"), "mistral");
    }

    #[test]
    fn test_parses_full_analysis() {
        let content = r#"{"isPresent": true, "rank": 2, "sentiment": "positive",
            "competitors": ["rival.com"], "context": "Example.com is great."}"#;
        let result = parse_analysis_response(content, "best tools?", "raw answer", &sources()).unwrap();

        assert!(result.is_present);
        assert_eq!(result.rank, Some(2.0));
        assert_eq!(result.sentiment, Sentiment::Positive);
        assert_eq!(result.competitors, vec!["rival.com"]);
        assert_eq!(result.context, "Example.com is great.");
        assert_eq!(result.query, "best tools?");
        assert_eq!(result.response, "raw answer");
        assert_eq!(result.sources, sources());
    }

    #[test]
    fn test_unknown_sentiment_defaults_to_neutral() {
        let content = r#"{"isPresent": true, "sentiment": "enthusiastic"}"#;
        let result = parse_analysis_response(content, "q", "r", &[]).unwrap();
        assert_eq!(result.sentiment, Sentiment::Neutral);

        let content = r#"{"isPresent": true, "sentiment": "Positive"}"#;
        let result = parse_analysis_response(content, "q", "r", &[]).unwrap();
        assert_eq!(result.sentiment, Sentiment::Neutral);
    }

    #[test]
    fn test_loose_fields_are_coerced() {
        let content = r#"{"isPresent": "yes", "rank": "3", "competitors": "rival.com"}"#;
        let result = parse_analysis_response(content, "q", "r", &[]).unwrap();
        assert!(result.is_present);
        assert_eq!(result.rank, None);
        assert!(result.competitors.is_empty());
        assert_eq!(result.context, "");

        let content = r#"{"isPresent": 0, "rank": null, "context": null}"#;
        let result = parse_analysis_response(content, "q", "r", &[]).unwrap();
        assert!(!result.is_present);
        assert_eq!(result.context, "");
    }

    #[test]
    fn test_truncates_competitors() {
        let content = r#"{"isPresent": false, "competitors": ["a", "b", "c", "d", "e", "f", "g"]}"#;
        let result = parse_analysis_response(content, "q", "r", &[]).unwrap();
        assert_eq!(result.competitors, vec!["a", "b", "c", "d", "e"]);
    }

    #[test]
    fn test_extracts_json_from_code_fence() {
        let content = "```json\n{\"isPresent\": true, \"rank\": 1, \"sentiment\": \"negative\"}\n```";
        let result = parse_analysis_response(content, "q", "r", &[]).unwrap();
        assert!(result.is_present);
        assert_eq!(result.sentiment, Sentiment::Negative);
    }

    #[test]
    fn test_non_json_text_fails() {
        let err = parse_analysis_response("The brand is not mentioned.", "q", "r", &[]).unwrap_err();
        assert_eq!(err.to_string(), "Analysis: no JSON found in response");
    }

    #[test]
    fn test_prompt_embeds_brand_query_and_answer() {
        let prompt = analysis_prompt("example.com", "best tools?", "Example is #1", Locale::En);
        assert!(prompt.contains("brand name: \"example\""));
        assert!(prompt.contains("\"best tools?\""));
        assert!(prompt.contains("Example is #1"));
        assert!(prompt.contains("FIRST sentence"));
        assert!(prompt.contains("case-insensitive"));
    }

    #[tokio::test]
    async fn test_analyze_response_keeps_caller_sources() {
        let provider = MockProvider::new().with_analysis(
            r#"{"isPresent": true, "rank": 1, "sentiment": "positive", "competitors": []}"#,
        );

        let result = analyze_response(
            "example.com",
            "What is example.com?",
            "Example.com is a platform.",
            &sources(),
            &provider,
            Locale::En,
        )
        .await
        .unwrap();

        assert_eq!(result.sources, sources());
        assert_eq!(result.rank, Some(1.0));
        assert_eq!(provider.call_count(), 1);
    }
}
