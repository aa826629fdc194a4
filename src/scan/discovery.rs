use serde_json::Value;
use tracing::debug;

use crate::error::{ParseError, ScanError, Stage};
use crate::models::{DiscoveryResult, Locale, QueryType};
use crate::parse::{find_json_object, is_truthy, string_list, stringify};
use crate::provider::{AiProvider, AiQueryRequest};

const MAX_COMPETITORS: usize = 5;

pub(crate) fn discovery_prompt(
    domain: &str,
    locale: Locale,
    query_count: usize,
    query_types: &[QueryType],
) -> String {
    let types = if query_types.is_empty() {
        &QueryType::ALL[..]
    } else {
        query_types
    };
    let guidance = types
        .iter()
        .map(|t| format!("  - {}", t.guidance(domain)))
        .collect::<Vec<_>>()
        .join("\n");

    let mut prompt = format!(
        r#"Analyze the website "{domain}" and provide the following information in JSON format only (no markdown, no explanation):

{{
  "sector": "the business sector/industry of this website (e.g. 'e-commerce', 'SaaS', 'restaurant', 'fintech')",
  "competitors": ["competitor1.com", "competitor2.com", "competitor3.com"],
  "queries": [
    "strategic question 1 that a user might ask an AI about this type of business",
    "strategic question 2",
    "..."
  ]
}}

Rules:
- "sector" must be a single short label
- "competitors" must be 3-5 real competitor domain names
- "queries" must be exactly {query_count} diverse questions that a potential customer might ask an AI assistant. Cover these types:
{guidance}
"#
    );

    if let Some(instruction) = locale.prompt_instruction() {
        prompt.push_str(instruction);
        prompt.push('\n');
    }
    prompt.push_str("\nRespond ONLY with valid JSON, nothing else.\n");
    prompt
}

/// Parse the discovery JSON out of provider text
pub fn parse_discovery_response(
    content: &str,
    query_count: usize,
) -> Result<DiscoveryResult, ScanError> {
    let span = find_json_object(content)
        .ok_or_else(|| ScanError::parse(Stage::Discovery, ParseError::NoJson))?;
    let parsed: Value =
        serde_json::from_str(span).map_err(|e| ScanError::parse(Stage::Discovery, e))?;

    let invalid = || ScanError::parse(Stage::Discovery, ParseError::InvalidStructure);

    let sector = parsed.get("sector").filter(|v| is_truthy(v)).ok_or_else(invalid)?;
    let competitors = parsed
        .get("competitors")
        .and_then(|v| string_list(v, MAX_COMPETITORS))
        .ok_or_else(invalid)?;
    let queries = parsed
        .get("queries")
        .and_then(|v| string_list(v, query_count))
        .ok_or_else(invalid)?;

    Ok(DiscoveryResult {
        sector: stringify(sector),
        competitors,
        queries,
    })
}

/// Ask the provider for the domain's sector, competitors and strategic queries
pub async fn discover_domain(
    domain: &str,
    provider: &dyn AiProvider,
    locale: Locale,
    query_count: usize,
    query_types: &[QueryType],
) -> Result<DiscoveryResult, ScanError> {
    let prompt = discovery_prompt(domain, locale, query_count, query_types);
    let response = provider.query(&AiQueryRequest::new(prompt, domain)).await?;

    let discovery = parse_discovery_response(&response.content, query_count)?;
    debug!(
        domain = %domain,
        sector = %discovery.sector,
        competitors = discovery.competitors.len(),
        queries = discovery.queries.len(),
        "Discovery complete"
    );
    Ok(discovery)
}
