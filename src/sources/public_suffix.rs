// src/sources/public_suffix.rs
use crate::sources::ListSource;
use crate::types::HarvestError;
use crate::utils::to_ascii_zone;
use async_trait::async_trait;
use log::warn;

const ICANN_BEGIN: &str = "// ===BEGIN ICANN DOMAINS===";
const ICANN_END: &str = "// ===END ICANN DOMAINS===";

/// Mozilla public suffix list, ICANN section only
#[derive(Debug, Clone)]
pub struct PublicSuffixSource {
    name: String,
    url: String,
}

impl PublicSuffixSource {
    pub fn new(url: &str) -> Self {
        Self {
            name: "publicsuffix".to_string(),
            url: url.to_string(),
        }
    }
}

#[async_trait]
impl ListSource for PublicSuffixSource {
    type Entries = Vec<String>;

    fn name(&self) -> &str {
        &self.name
    }

    fn url(&self) -> &str {
        &self.url
    }

    fn parse(&self, body: &str) -> Result<Self::Entries, HarvestError> {
        let mut in_icann = false;
        let mut seen_section = false;
        let mut suffixes = Vec::new();

        for line in body.lines() {
            if line.contains(ICANN_BEGIN) {
                in_icann = true;
                seen_section = true;
                continue;
            }
            if line.contains(ICANN_END) {
                break;
            }

            let line = line.trim();
            if !in_icann || line.is_empty() || line.starts_with("//") {
                continue;
            }

            let stripped = line.replace("*.", "").replace('!', "");
            match to_ascii_zone(&stripped) {
                Ok(zone) if !zone.is_empty() => suffixes.push(zone),
                Ok(_) => {}
                Err(e) => warn!("{}: skipping {}: {}", self.name, line, e),
            }
        }

        if !seen_section {
            return Err(HarvestError::SourceError {
                source_name: self.name.clone(),
                message: "ICANN section marker not found".to_string(),
            });
        }

        Ok(suffixes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_reads_only_icann_section() {
        let body = "// header comment\n\
            ignored\n\
            // ===BEGIN ICANN DOMAINS===\n\
            \n\
            // ac : comment\n\
            ac\n\
            *.ck\n\
            !www.ck\n\
            公司.cn\n\
            // ===END ICANN DOMAINS===\n\
            // ===BEGIN PRIVATE DOMAINS===\n\
            blogspot.com\n";

        let source = PublicSuffixSource::new("https://localhost/psl.dat");
        let suffixes = source.parse(body).unwrap();

        assert_eq!(
            suffixes,
            vec![
                "ac".to_string(),
                "ck".to_string(),
                "www.ck".to_string(),
                "xn--55qx5d.cn".to_string(),
            ]
        );
    }

    #[test]
    fn test_parse_requires_icann_marker() {
        let source = PublicSuffixSource::new("https://localhost/psl.dat");
        assert!(source.parse("ac\nad\n").is_err());
    }
}
