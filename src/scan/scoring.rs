//! Visibility scoring.
//!
//! Pure functions over the complete `QueryResult` list of one scan. Nothing
//! here performs I/O or keeps state; identical inputs give identical metrics.

use indexmap::IndexMap;
use std::collections::HashSet;
use url::Url;

use crate::models::{DomainCount, Metrics, QueryResult, Sentiment, SourceBreakdown};

const WEIGHT_CITATION_RATE: f64 = 0.4;
const WEIGHT_POSITION: f64 = 0.3;
const WEIGHT_SENTIMENT: f64 = 0.2;
const WEIGHT_SOURCES_DIVERSITY: f64 = 0.1;

/// Sentiment score used when the brand is never cited
const NO_SIGNAL_SENTIMENT: f64 = 0.5;

fn sentiment_value(sentiment: Sentiment) -> f64 {
    match sentiment {
        Sentiment::Positive => 1.0,
        Sentiment::Neutral => 0.5,
        Sentiment::Negative => 0.0,
    }
}

/// Fraction of results that mention the brand
pub fn citation_rate(results: &[QueryResult]) -> f64 {
    if results.is_empty() {
        return 0.0;
    }
    let cited = results.iter().filter(|r| r.is_present).count();
    cited as f64 / results.len() as f64
}

/// Mean rank over cited, ranked results
pub fn average_position(results: &[QueryResult]) -> Option<f64> {
    let ranks: Vec<f64> = results
        .iter()
        .filter(|r| r.is_present)
        .filter_map(|r| r.rank)
        .collect();

    if ranks.is_empty() {
        return None;
    }
    Some(ranks.iter().sum::<f64>() / ranks.len() as f64)
}

/// Mean sentiment over cited results, neutral when nothing is cited
pub fn sentiment_score(results: &[QueryResult]) -> f64 {
    let cited: Vec<&QueryResult> = results.iter().filter(|r| r.is_present).collect();
    if cited.is_empty() {
        return NO_SIGNAL_SENTIMENT;
    }
    let sum: f64 = cited.iter().map(|r| sentiment_value(r.sentiment)).sum();
    sum / cited.len() as f64
}

pub fn overall_sentiment(results: &[QueryResult]) -> Sentiment {
    let score = sentiment_score(results);
    if score >= 0.7 {
        Sentiment::Positive
    } else if score >= 0.4 {
        Sentiment::Neutral
    } else {
        Sentiment::Negative
    }
}

/// Linear rank score: position 1 gives 1.0, position 10 and beyond give 0.0
pub fn position_score(average_position: Option<f64>) -> f64 {
    match average_position {
        None => 0.0,
        Some(position) => (1.0 - (position - 1.0) / 9.0).max(0.0),
    }
}

/// Ratio of distinct sources to source occurrences
pub fn sources_diversity_score(results: &[QueryResult]) -> f64 {
    let all: Vec<&str> = results
        .iter()
        .flat_map(|r| r.sources.iter().map(String::as_str))
        .collect();
    if all.is_empty() {
        return 0.0;
    }
    let unique: HashSet<&str> = all.iter().copied().collect();
    (unique.len() as f64 / all.len() as f64).min(1.0)
}

/// Mention share per brand, as independently rounded percentages.
///
/// The tracked domain counts once per result that cites it; each listed
/// competitor counts once per result, lowercased, whether or not the brand
/// was cited. Rounded entries may not sum to exactly 100.
pub fn share_of_voice(results: &[QueryResult], domain: &str) -> IndexMap<String, u32> {
    let mut mentions: IndexMap<String, u32> = IndexMap::new();

    for result in results {
        if result.is_present {
            *mentions.entry(domain.to_string()).or_insert(0) += 1;
        }
        for competitor in &result.competitors {
            *mentions.entry(competitor.to_lowercase()).or_insert(0) += 1;
        }
    }

    let total: u32 = mentions.values().sum();
    if total == 0 {
        return IndexMap::new();
    }

    mentions
        .into_iter()
        .map(|(name, count)| {
            let pct = (count as f64 / total as f64 * 100.0).round() as u32;
            (name, pct)
        })
        .collect()
}

/// Count occurrences per key, then order by descending count.
/// Ties keep first-seen order.
fn rank_by_frequency<I>(items: I) -> Vec<(String, u32)>
where
    I: IntoIterator<Item = String>,
{
    let mut counts: IndexMap<String, u32> = IndexMap::new();
    for item in items {
        *counts.entry(item).or_insert(0) += 1;
    }

    let mut ranked: Vec<(String, u32)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    ranked
}

/// Distinct sources, most cited first
pub fn collect_influence_sources(results: &[QueryResult]) -> Vec<String> {
    rank_by_frequency(results.iter().flat_map(|r| r.sources.iter().cloned()))
        .into_iter()
        .map(|(source, _)| source)
        .collect()
}

/// Headline 0-100 KPI
pub fn visibility_score(results: &[QueryResult]) -> u32 {
    if results.is_empty() {
        return 0;
    }

    let raw = citation_rate(results) * WEIGHT_CITATION_RATE
        + position_score(average_position(results)) * WEIGHT_POSITION
        + sentiment_score(results) * WEIGHT_SENTIMENT
        + sources_diversity_score(results) * WEIGHT_SOURCES_DIVERSITY;

    (raw * 100.0).round() as u32
}

pub fn compute_metrics(results: &[QueryResult], domain: &str) -> Metrics {
    Metrics {
        visibility_score: visibility_score(results),
        citation_rate: citation_rate(results),
        average_position: average_position(results),
        overall_sentiment: overall_sentiment(results),
        share_of_voice: share_of_voice(results, domain),
        influence_sources: collect_influence_sources(results),
    }
}

fn source_host(source: &str) -> String {
    match Url::parse(source) {
        Ok(url) => match url.host_str() {
            Some(host) => host.strip_prefix("www.").unwrap_or(host).to_string(),
            None => source.to_string(),
        },
        Err(_) => source.to_string(),
    }
}

/// Group every cited source by hostname, most cited first
pub fn source_breakdown(results: &[QueryResult], limit: usize) -> SourceBreakdown {
    let total_sources = results.iter().map(|r| r.sources.len()).sum();
    let ranked = rank_by_frequency(
        results
            .iter()
            .flat_map(|r| r.sources.iter().map(|s| source_host(s))),
    );

    SourceBreakdown {
        total_sources,
        unique_domains: ranked.len(),
        top_domains: ranked
            .into_iter()
            .take(limit)
            .map(|(domain, count)| DomainCount { domain, count })
            .collect(),
    }
}
