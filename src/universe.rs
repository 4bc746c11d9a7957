// src/universe.rs
use crate::cache::Cache;
use crate::sources::{RootDelegation, SourceDocuments};
use crate::transport::Transport;
use crate::types::{HarvestError, Origin, ZoneCandidate, ZoneStatus};
use crate::utils::{is_valid_zone, normalize_zone};
use futures::stream::{self, StreamExt};
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use log::{debug, info, warn};
use std::collections::HashSet;
use std::num::NonZeroU32;
use std::sync::Arc;

/// Concurrent NS lookups while resolving public suffixes.
const LOOKUP_CONCURRENCY: usize = 16;

/// Zones that are never scanned.
#[derive(Debug, Clone, Default)]
pub struct SkipRules {
    skip_list: Vec<String>,
    excluded: HashSet<String>,
}

impl SkipRules {
    pub fn new(skip_list: &[String], excluded: &[String]) -> Self {
        Self {
            skip_list: skip_list
                .iter()
                .map(|s| normalize_zone(s))
                .filter(|s| !s.is_empty())
                .collect(),
            excluded: excluded.iter().map(|s| normalize_zone(s)).collect(),
        }
    }

    /// True when `zone` is excluded or equals / sits below a skip-list entry.
    pub fn skips(&self, zone: &str) -> bool {
        self.excluded.contains(zone)
            || self.skip_list.iter().any(|s| {
                zone == s
                    || (zone.len() > s.len()
                        && zone.ends_with(s.as_str())
                        && zone.as_bytes()[zone.len() - s.len() - 1] == b'.')
            })
    }
}

/// Candidate zones, unique by name, in insertion order. Zones whose NS
/// lookup failed are held separately and never scanned.
#[derive(Debug, Clone, Default)]
pub struct Universe {
    candidates: Vec<ZoneCandidate>,
    names: HashSet<String>,
    rejected: Vec<ZoneCandidate>,
}

impl Universe {
    /// Insert unless a candidate with the same name is already present.
    pub fn insert(&mut self, candidate: ZoneCandidate) -> bool {
        if candidate.name.is_empty() || !self.names.insert(candidate.name.clone()) {
            return false;
        }
        self.candidates.push(candidate);
        true
    }

    pub fn contains(&self, zone: &str) -> bool {
        self.names.contains(zone)
    }

    /// Record a zone that failed NS lookup.
    pub fn reject(&mut self, zone: &str, origin: Origin) {
        self.rejected
            .push(ZoneCandidate::new(zone, Vec::new(), origin).with_status(ZoneStatus::Invalid));
    }

    pub fn rejected(&self) -> &[ZoneCandidate] {
        &self.rejected
    }

    pub fn get(&self, zone: &str) -> Option<&ZoneCandidate> {
        self.candidates.iter().find(|c| c.name == zone)
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn candidates(&self) -> &[ZoneCandidate] {
        &self.candidates
    }

    pub fn into_candidates(self) -> Vec<ZoneCandidate> {
        self.candidates
    }
}

/// Merges cache, root zone and public suffixes into one universe. The first
/// source to name a zone wins; the cache only ever gains entries.
pub struct UniverseBuilder {
    transport: Arc<dyn Transport>,
    rules: SkipRules,
    limiter: Option<DefaultDirectRateLimiter>,
    universe: Universe,
}

impl UniverseBuilder {
    pub fn new(transport: Arc<dyn Transport>, rules: SkipRules) -> Self {
        Self {
            transport,
            rules,
            limiter: None,
            universe: Universe::default(),
        }
    }

    pub fn with_rate_limit(mut self, per_second: Option<u32>) -> Self {
        self.limiter = per_second
            .and_then(NonZeroU32::new)
            .map(|rate| RateLimiter::direct(Quota::per_second(rate)));
        self
    }

    /// Previously valid zones are scanned again with their cached nameservers.
    pub fn seed_from_cache(&mut self, cache: &Cache) -> usize {
        let mut added = 0;
        for (zone, nameservers) in cache.valid_zones() {
            let candidate = ZoneCandidate::new(zone, nameservers.clone(), Origin::Cache)
                .with_status(ZoneStatus::Valid);
            if self.universe.insert(candidate) {
                added += 1;
            }
        }
        debug!("cache: seeded {} zones", added);
        added
    }

    fn admits(&self, zone: &str, cache: &Cache) -> bool {
        !zone.is_empty()
            && !self.rules.skips(zone)
            && !self.universe.contains(zone)
            && !cache.contains(zone)
    }

    pub fn add_root_zone(&mut self, cache: &mut Cache, delegations: Vec<RootDelegation>) -> usize {
        let mut added = 0;
        for delegation in delegations {
            let zone = normalize_zone(&delegation.zone);
            if !self.admits(&zone, cache) {
                continue;
            }

            let candidate = ZoneCandidate::new(&zone, delegation.nameservers, Origin::RootZone)
                .with_status(ZoneStatus::Valid);
            cache.insert_valid(&candidate.name, candidate.nameserver_hints.clone());
            self.universe.insert(candidate);
            added += 1;
        }
        info!("rootzone: {} new zones", added);
        added
    }

    /// Look up nameservers for every admissible suffix. Lookup failures only
    /// mark that suffix invalid.
    pub async fn add_public_suffixes(&mut self, cache: &mut Cache, suffixes: Vec<String>) -> usize {
        let mut seen = HashSet::new();
        let pending: Vec<String> = suffixes
            .iter()
            .map(|s| normalize_zone(s))
            .filter(|zone| self.admits(zone, cache) && seen.insert(zone.clone()))
            .collect();

        info!("publicsuffix: resolving {} zones", pending.len());

        let transport = &self.transport;
        let limiter = &self.limiter;
        let lookups: Vec<(String, Result<Vec<String>, HarvestError>)> = stream::iter(pending)
            .map(|zone| async move {
                if let Some(limiter) = limiter {
                    limiter.until_ready().await;
                }
                let result = transport.resolve_ns(&zone).await;
                (zone, result)
            })
            .buffered(LOOKUP_CONCURRENCY)
            .collect()
            .await;

        let mut added = 0;
        for (zone, lookup) in lookups {
            match lookup {
                Ok(hosts) => {
                    let candidate = ZoneCandidate::new(&zone, hosts, Origin::PublicSuffix)
                        .with_status(ZoneStatus::Valid);
                    cache.insert_valid(&candidate.name, candidate.nameserver_hints.clone());
                    self.universe.insert(candidate);
                    added += 1;
                }
                Err(e) => {
                    warn!("publicsuffix: {} marked invalid: {}", zone, e);
                    cache.insert_invalid(&zone);
                    self.universe.reject(&zone, Origin::PublicSuffix);
                }
            }
        }
        info!("publicsuffix: {} new zones", added);
        added
    }

    pub fn finish(self) -> Universe {
        self.universe
    }
}

/// Build the scan universe from the fetched documents, updating `cache` in place.
pub async fn build(
    cache: &mut Cache,
    documents: SourceDocuments,
    transport: Arc<dyn Transport>,
    skip_list: &[String],
    ns_lookup_rate: Option<u32>,
) -> Universe {
    let rules = SkipRules::new(skip_list, &documents.excluded);
    let mut builder = UniverseBuilder::new(transport, rules).with_rate_limit(ns_lookup_rate);

    builder.seed_from_cache(cache);
    builder.add_root_zone(cache, documents.root_zone);
    builder
        .add_public_suffixes(cache, documents.public_suffixes)
        .await;

    builder.finish()
}

/// Universe for explicitly named zones: live NS lookup, no skip rules, no cache.
pub async fn direct(zones: &[String], transport: Arc<dyn Transport>) -> Universe {
    let mut universe = Universe::default();
    for zone in zones {
        let zone = normalize_zone(zone);
        if universe.contains(&zone) {
            continue;
        }
        if !is_valid_zone(&zone) {
            warn!("{:?}: not a zone name, skipping", zone);
            continue;
        }

        match transport.resolve_ns(&zone).await {
            Ok(hosts) if !hosts.is_empty() => {
                universe.insert(
                    ZoneCandidate::new(&zone, hosts, Origin::Direct).with_status(ZoneStatus::Valid),
                );
            }
            Ok(_) => {
                warn!("{}: no nameservers", zone);
                universe.reject(&zone, Origin::Direct);
            }
            Err(e) => {
                warn!("{}: {}", zone, e);
                universe.reject(&zone, Origin::Direct);
            }
        }
    }
    universe
}
