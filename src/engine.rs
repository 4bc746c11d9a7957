use crate::cache::CacheStore;
use crate::cli::Args;
use crate::config;
use crate::output::{self, ArtifactSink};
use crate::resolver::NameserverResolver;
use crate::session::Session;
use crate::sources;
use crate::transfer::TransferEngine;
use crate::transport::{DnsTransport, Transport};
use crate::types::{Config, HarvestError, HarvestReport, HarvestStats, ZoneCandidate};
use crate::universe;
use crate::worker::{WorkerPool, ZoneWorker};
use indicatif::{ProgressBar, ProgressStyle};
use log::info;
use std::sync::Arc;
use std::time::Instant;

pub struct Harvester {
    config: Config,
    session: Session,
    transport: Arc<dyn Transport>,
    sink: ArtifactSink,
    cache_store: CacheStore,
    pool: WorkerPool,
    args: Args,
}

impl Harvester {
    pub async fn new(args: Args) -> Result<Self, HarvestError> {
        let config = config::load(&args)?;

        let transport: Arc<dyn Transport> = Arc::new(DnsTransport::new(&config.resolver)?);
        Self::with_transport(args, config, transport)
    }

    /// Build around an existing transport. Every configuration problem
    /// surfaces here, before any network work starts.
    pub fn with_transport(
        args: Args,
        config: Config,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, HarvestError> {
        let session = Session::new(&config)?;
        let sink = ArtifactSink::new(&config.output.folder)?;
        let cache_store = CacheStore::new(&config.cache_path);
        let pool = WorkerPool::new(config.workers)?;

        Ok(Self {
            config,
            session,
            transport,
            sink,
            cache_store,
            pool,
            args,
        })
    }

    pub async fn run(&mut self) -> Result<HarvestReport, HarvestError> {
        let start_time = Instant::now();

        let direct = self.args.direct_zones()?;
        let candidates = if direct.is_empty() {
            self.build_universe().await?
        } else {
            info!("Checking {} zones given on the command line", direct.len());
            universe::direct(&direct, self.transport.clone())
                .await
                .into_candidates()
        };

        info!(
            "Checking {} zones with {} workers, writing to {}",
            candidates.len(),
            self.pool.size(),
            self.sink.folder().display()
        );

        let worker = ZoneWorker::new(
            NameserverResolver::new(self.transport.clone()),
            TransferEngine::new(
                self.transport.clone(),
                self.sink.clone(),
                self.config.transfer_timeout,
            ),
        );
        let progress = self.progress_bar(candidates.len() as u64);
        let zones = self.pool.run(candidates, worker, progress).await;

        let stats = HarvestStats::from_reports(&zones, start_time.elapsed());
        let report = HarvestReport {
            stats,
            zones,
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        if let Some(path) = &self.config.output.report_file {
            output::write_report(path, &report)?;
            info!("Report written to {}", path.display());
        }

        Ok(report)
    }

    /// Merge cache and remote documents, then persist the cache. Zones that
    /// failed NS lookup stay in the cache but never reach the scan.
    async fn build_universe(&self) -> Result<Vec<ZoneCandidate>, HarvestError> {
        let mut cache = self.cache_store.load()?;
        let documents = sources::load_all(&self.config.sources, &self.session).await?;

        let universe = universe::build(
            &mut cache,
            documents,
            self.transport.clone(),
            &self.config.skip_zones,
            self.config.resolver.ns_lookup_rate,
        )
        .await;

        self.cache_store.save(&cache)?;
        if !universe.rejected().is_empty() {
            info!("{} zones marked invalid, not scanned", universe.rejected().len());
        }
        Ok(universe.into_candidates())
    }

    /// Drawn only when logs go to a file; otherwise it would interleave with them on stderr.
    fn progress_bar(&self, len: u64) -> ProgressBar {
        if self.config.output.silent || self.config.output.log_file.is_none() {
            return ProgressBar::hidden();
        }

        let style = ProgressStyle::with_template(
            "{spinner} [{elapsed_precise}] {bar:40} {pos}/{len} zones",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar());
        ProgressBar::new(len).with_style(style)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transfer::tests::{ScriptedTransport, TRAILER};
    use crate::types::{Depth, SourceUrls, TransferOutcome};
    use clap::Parser;
    use log::{Level, LevelFilter, Log, Metadata, Record};
    use std::sync::Mutex;
    use tempfile::tempdir;

    static CAPTURED: Mutex<Vec<String>> = Mutex::new(Vec::new());

    struct CaptureLogger;

    impl Log for CaptureLogger {
        fn enabled(&self, metadata: &Metadata) -> bool {
            metadata.level() <= Level::Info
        }

        fn log(&self, record: &Record) {
            if self.enabled(record.metadata()) {
                CAPTURED.lock().unwrap().push(record.args().to_string());
            }
        }

        fn flush(&self) {}
    }

    static LOGGER: CaptureLogger = CaptureLogger;

    fn capture_logs() {
        if log::set_logger(&LOGGER).is_ok() {
            log::set_max_level(LevelFilter::Info);
        }
    }

    /// Serve the three documents; the mocks stay registered while the returned guards live.
    async fn documents(
        server: &mut mockito::ServerGuard,
        root: &str,
    ) -> (SourceUrls, Vec<mockito::Mock>) {
        let mocks = vec![
            server
                .mock("GET", "/ntlds.csv")
                .with_body("title\nTLD,Domains\n")
                .create_async()
                .await,
            server
                .mock("GET", "/root.zone")
                .with_body(root)
                .create_async()
                .await,
            server
                .mock("GET", "/psl.dat")
                .with_body("// ===BEGIN ICANN DOMAINS===\n// ===END ICANN DOMAINS===\n")
                .create_async()
                .await,
        ];

        let urls = SourceUrls {
            root_zone: format!("{}/root.zone", server.url()),
            public_suffix: format!("{}/psl.dat", server.url()),
            ntlds: format!("{}/ntlds.csv", server.url()),
        };
        (urls, mocks)
    }

    #[tokio::test]
    async fn test_end_to_end_harvest() {
        capture_logs();
        let dir = tempdir().unwrap();
        let mut server = mockito::Server::new_async().await;
        let (urls, _mocks) = documents(
            &mut server,
            "harvestzone.\t172800\tIN\tNS\tns1.harvestzone.\nharvestzone.\t172800\tIN\tNS\tns2.harvestzone.\n",
        )
        .await;

        let payload = format!(
            "harvestzone. 3600 IN SOA ns1.harvestzone. hostmaster.harvestzone. 1 7200 900 1209600 3600\n\
             harvestzone. 3600 IN NS ns1.harvestzone.\n\
             sub.harvestzone. 3600 IN NS ns1.harvestzone.\n{}",
            TRAILER
        );
        let transport = Arc::new(
            ScriptedTransport::default()
                .with_address("ns1.harvestzone", &["192.0.2.10"])
                .with_payload("harvestzone", "192.0.2.10", &payload),
        );

        let mut config = Config::default();
        config.sources = urls;
        config.skip_zones = Vec::new();
        config.cache_path = dir.path().join("cache.json");
        config.output.folder = dir.path().join("zones");
        config.resolver.ns_lookup_rate = None;

        let args = Args::parse_from(["zoneharvest"]);
        let mut harvester = Harvester::with_transport(args, config, transport.clone()).unwrap();
        let report = harvester.run().await.unwrap();

        let artifact = dir.path().join("zones").join("harvestzone_ns1.harvestzone.zone");
        let written = std::fs::read_to_string(&artifact).unwrap();
        assert_eq!(written, payload);
        assert_eq!(written.lines().filter(|l| !l.starts_with(";;")).count(), 3);

        let ip: std::net::IpAddr = "192.0.2.10".parse().unwrap();
        assert_eq!(
            transport.calls(),
            vec![("harvestzone".to_string(), ip), ("sub.harvestzone".to_string(), ip)]
        );

        assert_eq!(report.zones.len(), 1);
        let top = &report.zones[0].results[0];
        assert_eq!(top.outcome, TransferOutcome::Success);
        assert_eq!(top.delegated.len(), 1);
        assert_eq!(top.delegated[0].zone, "sub.harvestzone");
        assert_eq!(top.delegated[0].depth, Depth::Delegated);
        assert_eq!(report.stats.successful_transfers, 1);

        let cache = CacheStore::new(dir.path().join("cache.json")).load().unwrap();
        assert!(cache.is_valid("harvestzone"));

        let logs = CAPTURED.lock().unwrap().clone();
        let success = logs
            .iter()
            .position(|l| l.starts_with("Success: harvestzone @"))
            .unwrap();
        let finished = logs
            .iter()
            .position(|l| l == "Finished: harvestzone")
            .unwrap();
        assert!(success < finished);
    }

    #[tokio::test]
    async fn test_fetch_failure_is_fatal_and_leaves_cache_untouched() {
        let dir = tempdir().unwrap();
        let server = mockito::Server::new_async().await;

        let mut config = Config::default();
        config.sources = SourceUrls {
            root_zone: format!("{}/missing", server.url()),
            public_suffix: format!("{}/missing", server.url()),
            ntlds: format!("{}/missing", server.url()),
        };
        config.cache_path = dir.path().join("cache.json");
        config.output.folder = dir.path().join("zones");

        let args = Args::parse_from(["zoneharvest"]);
        let transport = Arc::new(ScriptedTransport::default());
        let mut harvester = Harvester::with_transport(args, config, transport).unwrap();

        assert!(matches!(
            harvester.run().await,
            Err(HarvestError::SourceError { .. })
        ));
        assert!(!dir.path().join("cache.json").exists());
    }

    #[tokio::test]
    async fn test_direct_mode_skips_sources_and_cache() {
        let dir = tempdir().unwrap();
        let payload = format!("example.org. 3600 IN NS ns1.example.org.\n{}", TRAILER);
        let transport = Arc::new(
            ScriptedTransport::default()
                .with_ns("example.org", &["ns1.example.org"])
                .with_address("ns1.example.org", &["192.0.2.20"])
                .with_payload("example.org", "192.0.2.20", &payload),
        );

        let mut config = Config::default();
        config.cache_path = dir.path().join("cache.json");
        config.output.folder = dir.path().join("zones");
        config.output.report_file = Some(dir.path().join("report.json"));

        let args = Args::parse_from(["zoneharvest", "-d", "example.org"]);
        let mut harvester = Harvester::with_transport(args, config, transport).unwrap();
        let report = harvester.run().await.unwrap();

        assert_eq!(report.stats.zones_checked, 1);
        assert_eq!(report.stats.successful_transfers, 1);
        assert!(dir.path().join("report.json").exists());
        assert!(!dir.path().join("cache.json").exists());
    }

    #[test]
    fn test_zero_workers_rejected_before_work() {
        let dir = tempdir().unwrap();
        let mut config = Config::default();
        config.workers = 0;
        config.output.folder = dir.path().join("zones");

        let args = Args::parse_from(["zoneharvest"]);
        let result = Harvester::with_transport(args, config, Arc::new(ScriptedTransport::default()));
        assert!(matches!(result, Err(HarvestError::ConfigError(_))));
    }
}
