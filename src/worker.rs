// src/worker.rs
use crate::resolver::NameserverResolver;
use crate::transfer::TransferEngine;
use crate::types::{Depth, HarvestError, ZoneCandidate, ZoneReport};
use futures::stream::{FuturesUnordered, StreamExt};
use indicatif::ProgressBar;
use log::{debug, error, info};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Checks one zone: resolve its hints, then try each endpoint in order until
/// every owner host has either succeeded once or run out of addresses.
#[derive(Clone)]
pub struct ZoneWorker {
    resolver: NameserverResolver,
    engine: TransferEngine,
}

impl ZoneWorker {
    pub fn new(resolver: NameserverResolver, engine: TransferEngine) -> Self {
        Self { resolver, engine }
    }

    pub async fn check(&self, candidate: ZoneCandidate) -> ZoneReport {
        let endpoints = self.resolver.resolve_all(&candidate.nameserver_hints).await;
        info!("Zone: {} ({} endpoints)", candidate.name, endpoints.len());

        let mut report = ZoneReport {
            zone: candidate.name.clone(),
            origin: candidate.origin,
            endpoints: endpoints.clone(),
            results: Vec::new(),
        };

        let mut succeeded: HashSet<String> = HashSet::new();
        for endpoint in &endpoints {
            if succeeded.contains(&endpoint.owner_host) {
                debug!("{}: {} already transferred, skipping", candidate.name, endpoint);
                continue;
            }

            match self
                .engine
                .attempt(&candidate.name, endpoint, Depth::TopLevel)
                .await
            {
                Ok(result) => {
                    if result.is_success() {
                        succeeded.insert(endpoint.owner_host.clone());
                    }
                    report.results.push(result);
                }
                Err(e) => error!("{} @ {}: {}", candidate.name, endpoint, e),
            }
        }

        info!("Finished: {}", candidate.name);
        report
    }
}

/// Fixed-size pool of concurrent zone checks.
pub struct WorkerPool {
    size: usize,
}

impl WorkerPool {
    pub fn new(size: usize) -> Result<Self, HarvestError> {
        if size == 0 {
            return Err(HarvestError::ConfigError(
                "Number of workers must be greater than zero".to_string(),
            ));
        }
        Ok(Self { size })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Check every candidate; reports come back in completion order.
    pub async fn run(
        &self,
        candidates: Vec<ZoneCandidate>,
        worker: ZoneWorker,
        progress: ProgressBar,
    ) -> Vec<ZoneReport> {
        let semaphore = Arc::new(Semaphore::new(self.size));
        let worker = Arc::new(worker);
        let mut tasks = FuturesUnordered::new();

        for candidate in candidates {
            let semaphore = semaphore.clone();
            let worker = worker.clone();
            let zone = candidate.name.clone();

            let handle = tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok()?;
                Some(worker.check(candidate).await)
            });
            tasks.push(async move { (zone, handle.await) });
        }

        let mut reports = Vec::with_capacity(tasks.len());
        while let Some((zone, joined)) = tasks.next().await {
            progress.inc(1);
            match joined {
                Ok(Some(report)) => reports.push(report),
                Ok(None) => error!("{}: worker pool closed", zone),
                Err(e) => error!("{}: worker task failed: {}", zone, e),
            }
        }
        progress.finish_and_clear();

        reports
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::ArtifactSink;
    use crate::transfer::tests::{ScriptedTransport, TRAILER};
    use crate::types::{Origin, TransferOutcome};
    use std::time::Duration;
    use tempfile::{tempdir, TempDir};

    fn worker(transport: Arc<ScriptedTransport>) -> (ZoneWorker, TempDir) {
        let dir = tempdir().unwrap();
        let sink = ArtifactSink::new(dir.path()).unwrap();
        let engine = TransferEngine::new(transport.clone(), sink, Duration::from_secs(35));
        (ZoneWorker::new(NameserverResolver::new(transport), engine), dir)
    }

    fn zone_payload(zone: &str) -> String {
        format!("{z}. 3600 IN NS ns1.{z}.\n{t}", z = zone, t = TRAILER)
    }

    #[test]
    fn test_pool_rejects_zero_workers() {
        assert!(matches!(WorkerPool::new(0), Err(HarvestError::ConfigError(_))));
        assert_eq!(WorkerPool::new(20).unwrap().size(), 20);
    }

    #[tokio::test]
    async fn test_host_dedup_skips_remaining_addresses() {
        let transport = Arc::new(
            ScriptedTransport::default()
                .with_address("ns1.example", &["192.0.2.1", "192.0.2.2"])
                .with_address("ns2.example", &["192.0.2.3"])
                .with_payload("example", "192.0.2.1", &zone_payload("example"))
                .with_payload("example", "192.0.2.2", &zone_payload("example")),
        );
        let (worker, _dir) = worker(transport.clone());
        let candidate = ZoneCandidate::new(
            "example",
            vec!["ns1.example".into(), "ns2.example".into()],
            Origin::RootZone,
        );

        let report = worker.check(candidate).await;

        let attempted: Vec<_> = transport.calls().into_iter().map(|(_, ip)| ip.to_string()).collect();
        assert_eq!(attempted, vec!["192.0.2.1", "192.0.2.3"]);
        assert_eq!(report.endpoints.len(), 3);
        assert_eq!(report.results.len(), 2);
        assert_eq!(report.results[1].outcome, TransferOutcome::Failure);
        assert_eq!(report.successful_hosts(), vec!["ns1.example"]);
    }

    #[tokio::test]
    async fn test_failed_address_falls_through_to_next_for_same_host() {
        let transport = Arc::new(
            ScriptedTransport::default()
                .with_address("ns1.example", &["192.0.2.1", "192.0.2.2"])
                .with_payload("example", "192.0.2.2", &zone_payload("example")),
        );
        let (worker, _dir) = worker(transport.clone());
        let candidate = ZoneCandidate::new("example", vec!["ns1.example".into()], Origin::RootZone);

        let report = worker.check(candidate).await;

        assert_eq!(transport.calls().len(), 2);
        assert_eq!(report.successful_hosts(), vec!["ns1.example"]);
    }

    #[tokio::test]
    async fn test_pool_checks_every_candidate() {
        let mut transport = ScriptedTransport::default();
        let mut candidates = Vec::new();
        for i in 0..12 {
            let zone = format!("zone{}", i);
            let host = format!("ns1.{}", zone);
            let address = format!("192.0.2.{}", i + 1);
            transport = transport
                .with_address(&host, &[address.as_str()])
                .with_payload(&zone, &address, &zone_payload(&zone));
            candidates.push(ZoneCandidate::new(&zone, vec![host], Origin::PublicSuffix));
        }
        let transport = Arc::new(transport);
        let (worker, dir) = worker(transport.clone());

        let pool = WorkerPool::new(4).unwrap();
        let reports = pool.run(candidates, worker, ProgressBar::hidden()).await;

        assert_eq!(reports.len(), 12);
        assert!(reports.iter().all(|r| r.successful_hosts().len() == 1));
        assert_eq!(transport.calls().len(), 12);
        assert!(dir.path().join("zone7_ns1.zone7.zone").exists());
    }

    #[tokio::test]
    async fn test_zone_without_endpoints_finishes_cleanly() {
        let transport = Arc::new(ScriptedTransport::default());
        let (worker, _dir) = worker(transport.clone());
        let candidate = ZoneCandidate::new("example", vec!["unresolvable.example".into()], Origin::Cache);

        let report = worker.check(candidate).await;

        assert!(report.endpoints.is_empty());
        assert!(report.results.is_empty());
        assert!(transport.calls().is_empty());
    }
}
