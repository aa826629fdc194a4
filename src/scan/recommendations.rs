use serde_json::Value;

use crate::error::{ParseError, ScanError, Stage};
use crate::models::{Locale, Metrics, Priority, Recommendation};
use crate::parse::find_json_array;
use crate::provider::{AiProvider, AiQueryRequest};

const MAX_RECOMMENDATIONS: usize = 5;

pub(crate) fn recommendations_prompt(domain: &str, metrics: &Metrics, locale: Locale) -> String {
    let citation_pct = (metrics.citation_rate * 100.0).round();
    let position = metrics
        .average_position
        .map(|p| p.to_string())
        .unwrap_or_else(|| "not ranked".to_string());
    let share_of_voice =
        serde_json::to_string(&metrics.share_of_voice).unwrap_or_else(|_| "{}".to_string());
    let sources = if metrics.influence_sources.is_empty() {
        "none".to_string()
    } else {
        metrics.influence_sources.join(", ")
    };

    let mut prompt = format!(
        r#"You are an AI visibility expert. Analyze these metrics for "{domain}" and provide actionable recommendations.

Metrics:
- Visibility Score: {score}/100
- Citation Rate: {citation_pct}% (how often AI mentions this brand)
- Average Position: {position}
- Overall Sentiment: {sentiment}
- Share of Voice: {share_of_voice}
- Influence Sources: {sources}

Provide 3-5 specific, actionable recommendations in JSON format only (no markdown, no explanation):

[
  {{
    "title": "Short action title",
    "description": "Detailed explanation of what to do and why it will improve AI visibility",
    "priority": "high" | "medium" | "low"
  }}
]

Rules:
- Sort by priority (high first)
- Be specific to this domain and its metrics
- Focus on improving AI visibility (not traditional SEO)
- Each recommendation should be actionable and concrete
"#,
        score = metrics.visibility_score,
        sentiment = metrics.overall_sentiment,
    );

    if let Some(instruction) = locale.prompt_instruction() {
        prompt.push_str(instruction);
        prompt.push('\n');
    }
    prompt.push_str("\nRespond ONLY with valid JSON array, nothing else.\n");
    prompt
}

/// Parse provider text into at most five recommendations, in provider order
pub fn parse_recommendations_response(content: &str) -> Result<Vec<Recommendation>, ScanError> {
    let span = find_json_array(content)
        .ok_or_else(|| ScanError::parse(Stage::Recommendations, ParseError::NoJsonArray))?;
    let parsed: Value =
        serde_json::from_str(span).map_err(|e| ScanError::parse(Stage::Recommendations, e))?;

    let entries = parsed
        .as_array()
        .ok_or_else(|| ScanError::parse(Stage::Recommendations, ParseError::NotAnArray))?;

    let recommendations = entries
        .iter()
        .filter_map(|entry| {
            let title = entry.get("title")?.as_str()?;
            let description = entry.get("description")?.as_str()?;
            Some(Recommendation {
                title: title.to_string(),
                description: description.to_string(),
                priority: Priority::from_label(entry.get("priority").and_then(Value::as_str)),
            })
        })
        .take(MAX_RECOMMENDATIONS)
        .collect();

    Ok(recommendations)
}

/// Turn the metrics into prioritized action items
pub async fn generate_recommendations(
    domain: &str,
    metrics: &Metrics,
    provider: &dyn AiProvider,
    locale: Locale,
) -> Result<Vec<Recommendation>, ScanError> {
    let prompt = recommendations_prompt(domain, metrics, locale);
    let response = provider.query(&AiQueryRequest::new(prompt, domain)).await?;

    parse_recommendations_response(&response.content)
}
