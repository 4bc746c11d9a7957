// src/utils.rs
use crate::types::HarvestError;
use std::collections::HashSet;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

/// Reads lines from a file into a vector of strings.
pub fn read_lines(path: &Path) -> io::Result<Vec<String>> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    reader.lines().collect()
}

/// Lowercase a zone or host name and strip surrounding whitespace and trailing dots.
pub fn normalize_zone(name: &str) -> String {
    name.trim().trim_end_matches('.').to_lowercase()
}

/// Encode internationalized labels to their ASCII-compatible form.
pub fn to_ascii_zone(name: &str) -> Result<String, HarvestError> {
    let name = name.trim();
    if name.is_ascii() {
        return Ok(normalize_zone(name));
    }

    match url::Host::parse(name) {
        Ok(url::Host::Domain(domain)) => Ok(normalize_zone(&domain)),
        Ok(other) => Err(HarvestError::ParseError(format!(
            "{} is not a domain name ({})",
            name, other
        ))),
        Err(e) => Err(HarvestError::ParseError(format!(
            "Failed to encode {}: {}",
            name, e
        ))),
    }
}

/// Check if a string looks like a zone name we can query.
pub fn is_valid_zone(zone: &str) -> bool {
    if zone.is_empty() || zone.len() > 253 {
        return false;
    }

    zone.split('.').all(|part| {
        !part.is_empty()
            && part.len() <= 63
            && part.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
            && !part.starts_with('-')
            && !part.ends_with('-')
    })
}

/// Remove duplicate names (case-insensitive), keeping first-seen order.
pub fn deduplicate_names(names: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut unique = Vec::new();

    for name in names {
        let lower = normalize_zone(&name);
        if !lower.is_empty() && seen.insert(lower.clone()) {
            unique.push(lower);
        }
    }

    unique
}

/// Turn a host or zone name into something safe to use inside a file name.
pub fn file_safe(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '\0' => '_',
            c => c,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_zone() {
        assert_eq!(normalize_zone("EXAMPLE.com."), "example.com");
        assert_eq!(normalize_zone(" ns1.Example. "), "ns1.example");
        assert_eq!(normalize_zone("."), "");
    }

    #[test]
    fn test_to_ascii_zone() {
        assert_eq!(to_ascii_zone("Co.UK").unwrap(), "co.uk");
        assert_eq!(to_ascii_zone("bücher.de").unwrap(), "xn--bcher-kva.de");
    }

    #[test]
    fn test_is_valid_zone() {
        assert!(is_valid_zone("example"));
        assert!(is_valid_zone("co.uk"));
        assert!(!is_valid_zone(""));
        assert!(!is_valid_zone("-bad.example"));
        assert!(!is_valid_zone("a..b"));
    }

    #[test]
    fn test_deduplicate_names() {
        let names = vec![
            "Example.com.".to_string(),
            "example.com".to_string(),
            "other.com".to_string(),
        ];

        let unique = deduplicate_names(names);
        assert_eq!(unique, vec!["example.com".to_string(), "other.com".to_string()]);
    }

    #[test]
    fn test_file_safe() {
        assert_eq!(file_safe("2001:db8::1"), "2001_db8__1");
        assert_eq!(file_safe("ns1.example"), "ns1.example");
    }
}
