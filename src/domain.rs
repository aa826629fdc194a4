use regex::Regex;
use std::sync::LazyLock;

use crate::error::DomainError;

const MAX_DOMAIN_LENGTH: usize = 253;

// Dotted labels of 1-63 chars, no edge hyphens, alphabetic TLD of 2+ chars
static RE_DOMAIN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?\.)+[a-zA-Z]{2,}$").unwrap()
});

/// Reduce user input to a bare lowercase host.
///
/// Strips scheme, a leading `www.`, any path and any port.
pub fn sanitize_domain(input: &str) -> String {
    let mut domain = input.trim().to_lowercase();

    for scheme in ["https://", "http://"] {
        if let Some(rest) = domain.strip_prefix(scheme) {
            domain = rest.to_string();
            break;
        }
    }

    if let Some(rest) = domain.strip_prefix("www.") {
        domain = rest.to_string();
    }

    let domain = domain.split('/').next().unwrap_or_default();
    let domain = domain.split(':').next().unwrap_or_default();

    domain.to_string()
}

/// Check a host against the hostname grammar
pub fn is_valid_domain(input: &str) -> bool {
    let trimmed = input.trim().to_lowercase();
    if trimmed.is_empty() || trimmed.len() > MAX_DOMAIN_LENGTH {
        return false;
    }

    RE_DOMAIN.is_match(&trimmed)
}

/// Sanitize then validate; the gate in front of every scan
pub fn validate_and_sanitize(input: &str) -> Result<String, DomainError> {
    if input.trim().is_empty() {
        return Err(DomainError::Required);
    }

    let domain = sanitize_domain(input);
    if !is_valid_domain(&domain) {
        return Err(DomainError::InvalidFormat);
    }

    Ok(domain)
}
