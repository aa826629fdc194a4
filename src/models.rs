use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Tone of an AI answer towards the tracked brand
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

impl Sentiment {
    /// Parse an exact lowercase label, `None` for anything else
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "positive" => Some(Self::Positive),
            "neutral" => Some(Self::Neutral),
            "negative" => Some(Self::Negative),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Positive => "positive",
            Self::Neutral => "neutral",
            Self::Negative => "negative",
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle state of a scan record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl ScanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl FromStr for ScanStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "running" => Ok(Self::Running),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            other => Err(format!("unknown scan status: {}", other)),
        }
    }
}

/// Scan record
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scan {
    pub id: String,
    pub domain: String,
    pub status: ScanStatus,
    pub created_at: String,
    pub updated_at: String,
}

/// Sector, competitors and strategic queries inferred for a domain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryResult {
    pub sector: String,
    pub competitors: Vec<String>,
    pub queries: Vec<String>,
}

/// Judgement of one AI answer for one strategic query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult {
    pub query: String,
    pub response: String,
    pub is_present: bool,
    pub rank: Option<f64>,
    pub sentiment: Sentiment,
    pub competitors: Vec<String>,
    pub sources: Vec<String>,
    pub context: String,
}

/// Aggregate visibility metrics for one scan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metrics {
    pub visibility_score: u32,
    pub citation_rate: f64,
    pub average_position: Option<f64>,
    pub overall_sentiment: Sentiment,
    pub share_of_voice: IndexMap<String, u32>,
    pub influence_sources: Vec<String>,
}

/// Recommendation urgency, ordered high first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    /// Normalize a loose label; unknown values become `Medium`
    pub fn from_label(label: Option<&str>) -> Self {
        match label {
            Some("high") => Self::High,
            Some("low") => Self::Low,
            _ => Self::Medium,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

/// Action item generated from the metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub title: String,
    pub description: String,
    pub priority: Priority,
}

/// Final scan report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub id: String,
    pub scan_id: String,
    pub domain: String,
    pub sector: String,
    pub metrics: Metrics,
    pub query_results: Vec<QueryResult>,
    pub recommendations: Vec<Recommendation>,
    pub created_at: String,
}

impl Report {
    /// Recommendations sorted high to low, provider order kept within a priority
    pub fn recommendations_by_priority(&self) -> Vec<Recommendation> {
        let mut sorted = self.recommendations.clone();
        sorted.sort_by_key(|r| r.priority);
        sorted
    }

    pub fn score_band(&self) -> ScoreBand {
        ScoreBand::from_score(self.metrics.visibility_score)
    }
}

/// Report contents before the store assigns an id and timestamp
#[derive(Debug, Clone)]
pub struct NewReport {
    pub scan_id: String,
    pub domain: String,
    pub sector: String,
    pub metrics: Metrics,
    pub query_results: Vec<QueryResult>,
    pub recommendations: Vec<Recommendation>,
}

/// History list row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub scan_id: String,
    pub report_id: String,
    pub domain: String,
    pub score: u32,
    pub created_at: String,
}

/// Qualitative bucket for a visibility score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreBand {
    Good,
    Average,
    Low,
}

impl ScoreBand {
    pub fn from_score(score: u32) -> Self {
        if score >= 70 {
            Self::Good
        } else if score >= 40 {
            Self::Average
        } else {
            Self::Low
        }
    }
}

/// Citation domain with its occurrence count
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainCount {
    pub domain: String,
    pub count: u32,
}

/// Citation sources of a report grouped by hostname
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceBreakdown {
    pub total_sources: usize,
    pub unique_domains: usize,
    pub top_domains: Vec<DomainCount>,
}

// =====================
// Scan options
// =====================

/// Output language for natural-language prompt values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    En,
    Fr,
}

impl Locale {
    /// Extra prompt line for non-default locales
    pub fn prompt_instruction(&self) -> Option<&'static str> {
        match self {
            Self::En => None,
            Self::Fr => Some(
                "IMPORTANT: Write every natural-language value (labels, questions, sentences, titles, descriptions) in French. Keep JSON keys and enum values in English.",
            ),
        }
    }
}

impl FromStr for Locale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "en" => Ok(Self::En),
            "fr" => Ok(Self::Fr),
            other => Err(format!("unsupported locale: {}", other)),
        }
    }
}

/// How many strategic queries a scan runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanDepth {
    Quick,
    #[default]
    Standard,
    Deep,
}

impl ScanDepth {
    pub fn query_count(&self) -> usize {
        match self {
            Self::Quick => 5,
            Self::Standard => 10,
            Self::Deep => 20,
        }
    }
}

/// Category of strategic query requested from discovery
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryType {
    Commercial,
    Comparative,
    Reputation,
    Informational,
}

impl QueryType {
    pub const ALL: [QueryType; 4] = [
        Self::Commercial,
        Self::Comparative,
        Self::Reputation,
        Self::Informational,
    ];

    /// Prompt guidance describing the category
    pub fn guidance(&self, domain: &str) -> String {
        match self {
            Self::Commercial => format!(
                "Commercial queries (best products in the sector, where to buy, \"is {} worth it?\")",
                domain
            ),
            Self::Comparative => format!(
                "Comparative queries (\"{} vs [competitor]\", \"best alternatives to {}\", top 5 lists)",
                domain, domain
            ),
            Self::Reputation => format!(
                "Reputation queries (\"{} reviews\", \"is {} reliable?\", known issues)",
                domain, domain
            ),
            Self::Informational => format!(
                "Informational queries (\"what is {}?\", how it works, guides, explanations)",
                domain
            ),
        }
    }
}

/// Caller-selected scan parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanOptions {
    pub depth: ScanDepth,
    pub query_types: Vec<QueryType>,
}

impl ScanOptions {
    /// Build options; an empty type selection means every category
    pub fn new(depth: ScanDepth, query_types: Vec<QueryType>) -> Self {
        let query_types = if query_types.is_empty() {
            QueryType::ALL.to_vec()
        } else {
            query_types
        };
        Self { depth, query_types }
    }

    pub fn query_count(&self) -> usize {
        self.depth.query_count()
    }
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self::new(ScanDepth::default(), Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(title: &str, priority: Priority) -> Recommendation {
        Recommendation {
            title: title.to_string(),
            description: String::new(),
            priority,
        }
    }

    #[test]
    fn test_priority_from_label_defaults_to_medium() {
        assert_eq!(Priority::from_label(Some("high")), Priority::High);
        assert_eq!(Priority::from_label(Some("low")), Priority::Low);
        assert_eq!(Priority::from_label(Some("urgent")), Priority::Medium);
        assert_eq!(Priority::from_label(None), Priority::Medium);
    }

    #[test]
    fn test_recommendations_by_priority_is_stable() {
        let report = Report {
            id: "r".into(),
            scan_id: "s".into(),
            domain: "example.com".into(),
            sector: "SaaS".into(),
            metrics: Metrics {
                visibility_score: 55,
                citation_rate: 0.5,
                average_position: None,
                overall_sentiment: Sentiment::Neutral,
                share_of_voice: IndexMap::new(),
                influence_sources: vec![],
            },
            query_results: vec![],
            recommendations: vec![
                rec("a", Priority::Low),
                rec("b", Priority::High),
                rec("c", Priority::Medium),
                rec("d", Priority::High),
            ],
            created_at: String::new(),
        };

        let titles: Vec<_> = report
            .recommendations_by_priority()
            .into_iter()
            .map(|r| r.title)
            .collect();
        assert_eq!(titles, vec!["b", "d", "c", "a"]);
        assert_eq!(report.score_band(), ScoreBand::Average);
    }

    #[test]
    fn test_score_band_thresholds() {
        assert_eq!(ScoreBand::from_score(100), ScoreBand::Good);
        assert_eq!(ScoreBand::from_score(70), ScoreBand::Good);
        assert_eq!(ScoreBand::from_score(69), ScoreBand::Average);
        assert_eq!(ScoreBand::from_score(40), ScoreBand::Average);
        assert_eq!(ScoreBand::from_score(39), ScoreBand::Low);
    }

    #[test]
    fn test_scan_options_empty_types_fall_back_to_all() {
        let options = ScanOptions::new(ScanDepth::Quick, vec![]);
        assert_eq!(options.query_types, QueryType::ALL.to_vec());
        assert_eq!(options.query_count(), 5);
        assert_eq!(ScanOptions::default().query_count(), 10);
        assert_eq!(ScanDepth::Deep.query_count(), 20);
    }

    #[test]
    fn test_locale_parsing() {
        assert_eq!("fr".parse::<Locale>(), Ok(Locale::Fr));
        assert!("de".parse::<Locale>().is_err());
        assert!(Locale::En.prompt_instruction().is_none());
        assert!(Locale::Fr.prompt_instruction().is_some());
    }

    #[test]
    fn test_query_result_serializes_camel_case() {
        let result = QueryResult {
            query: "q".into(),
            response: "r".into(),
            is_present: true,
            rank: Some(2.0),
            sentiment: Sentiment::Positive,
            competitors: vec![],
            sources: vec![],
            context: String::new(),
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["isPresent"], true);
        assert_eq!(json["sentiment"], "positive");
    }
}
