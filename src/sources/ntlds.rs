// src/sources/ntlds.rs
use crate::sources::ListSource;
use crate::types::HarvestError;
use crate::utils::normalize_zone;
use async_trait::async_trait;

/// Number of header rows in the CSV export.
const HEADER_ROWS: usize = 2;

/// nTLDStats CSV export of new gTLDs. Everything listed here is already
/// well known and excluded from scanning.
#[derive(Debug, Clone)]
pub struct NtldSource {
    name: String,
    url: String,
}

impl NtldSource {
    pub fn new(url: &str) -> Self {
        Self {
            name: "ntldstats".to_string(),
            url: url.to_string(),
        }
    }
}

#[async_trait]
impl ListSource for NtldSource {
    type Entries = Vec<String>;

    fn name(&self) -> &str {
        &self.name
    }

    fn url(&self) -> &str {
        &self.url
    }

    fn parse(&self, body: &str) -> Result<Self::Entries, HarvestError> {
        Ok(body
            .lines()
            .skip(HEADER_ROWS)
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| line.split(',').next())
            .map(normalize_zone)
            .filter(|tld| !tld.is_empty())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_skips_header_rows() {
        let body = "nTLDStats export\nTLD,Domains,Registry\nshop, 1200,X\n\nAPP,5,Y\n";
        let source = NtldSource::new("https://localhost/ntlds.csv");

        assert_eq!(
            source.parse(body).unwrap(),
            vec!["shop".to_string(), "app".to_string()]
        );
    }
}
