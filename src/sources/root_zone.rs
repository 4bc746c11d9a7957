// src/sources/root_zone.rs
use crate::sources::ListSource;
use crate::types::HarvestError;
use crate::utils::normalize_zone;
use async_trait::async_trait;
use regex::Regex;
use std::collections::HashMap;

/// One delegated zone from the root zone file with its nameservers in file order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootDelegation {
    pub zone: String,
    pub nameservers: Vec<String>,
}

/// IANA root zone file (`root.zone`)
#[derive(Debug, Clone)]
pub struct RootZoneSource {
    name: String,
    url: String,
}

impl RootZoneSource {
    pub fn new(url: &str) -> Self {
        Self {
            name: "rootzone".to_string(),
            url: url.to_string(),
        }
    }
}

#[async_trait]
impl ListSource for RootZoneSource {
    type Entries = Vec<RootDelegation>;

    fn name(&self) -> &str {
        &self.name
    }

    fn url(&self) -> &str {
        &self.url
    }

    fn parse(&self, body: &str) -> Result<Self::Entries, HarvestError> {
        let ns_line = Regex::new(r"(?i)\bIN\s+NS\s+")
            .map_err(|e| HarvestError::ParseError(format!("Regex error: {}", e)))?;

        let mut delegations: Vec<RootDelegation> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();

        for line in body.lines() {
            if line.is_empty() || !ns_line.is_match(line) {
                continue;
            }

            let cols: Vec<&str> = line.split_whitespace().collect();
            let (Some(owner), Some(target)) = (cols.first(), cols.last()) else {
                continue;
            };

            let zone = normalize_zone(owner);
            let target = normalize_zone(target);
            // The root's own NS set has an empty owner once the dot is gone.
            if zone.is_empty() || target.is_empty() {
                continue;
            }

            match index.get(&zone) {
                Some(&i) => {
                    let entry = &mut delegations[i];
                    if !entry.nameservers.contains(&target) {
                        entry.nameservers.push(target);
                    }
                }
                None => {
                    index.insert(zone.clone(), delegations.len());
                    delegations.push(RootDelegation {
                        zone,
                        nameservers: vec![target],
                    });
                }
            }
        }

        if delegations.is_empty() {
            return Err(HarvestError::SourceError {
                source_name: self.name.clone(),
                message: "document contains no NS delegations".to_string(),
            });
        }

        Ok(delegations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = ".\t518400\tIN\tNS\ta.root-servers.net.\n\
        .\t86400\tIN\tSOA\ta.root-servers.net. nstld.verisign-grs.com. 1 1800 900 604800 86400\n\
        AAA.\t172800\tIN\tNS\tNS1.DNS.NIC.AAA.\n\
        aaa.\t172800\tIN\tNS\tns2.dns.nic.aaa.\n\
        aaa.\t172800\tIN\tNS\tns1.dns.nic.aaa.\n\
        ns1.dns.nic.aaa.\t172800\tIN\tA\t156.154.144.2\n\
        example. 172800 IN NS a.iana-servers.net.\n";

    #[test]
    fn test_parse_groups_ns_records_by_owner() {
        let source = RootZoneSource::new("https://localhost/root.zone");
        let delegations = source.parse(SAMPLE).unwrap();

        assert_eq!(delegations.len(), 2);
        assert_eq!(delegations[0].zone, "aaa");
        assert_eq!(
            delegations[0].nameservers,
            vec!["ns1.dns.nic.aaa".to_string(), "ns2.dns.nic.aaa".to_string()]
        );
        assert_eq!(delegations[1].zone, "example");
        assert_eq!(delegations[1].nameservers, vec!["a.iana-servers.net".to_string()]);
    }

    #[test]
    fn test_parse_rejects_document_without_delegations() {
        let source = RootZoneSource::new("https://localhost/root.zone");
        assert!(source.parse("<html>maintenance</html>").is_err());
    }
}
