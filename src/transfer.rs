// src/transfer.rs
use crate::axfr::COMPLETION_MARKER;
use crate::output::ArtifactSink;
use crate::subzones;
use crate::transport::Transport;
use crate::types::{
    Depth, Endpoint, HarvestError, TransferError, TransferOutcome, TransferResult,
};
use log::{debug, error, info, warn};
use std::sync::Arc;
use std::time::Duration;

/// How much of the end of a stream is inspected for the completion marker.
pub const TAIL_BYTES: usize = 100;

pub fn has_completion_marker(payload: &[u8]) -> bool {
    let start = payload.len().saturating_sub(TAIL_BYTES);
    String::from_utf8_lossy(&payload[start..]).contains(COMPLETION_MARKER)
}

/// Runs AXFR attempts and follows same-host delegations one level down.
#[derive(Clone)]
pub struct TransferEngine {
    transport: Arc<dyn Transport>,
    sink: ArtifactSink,
    timeout: Duration,
}

impl TransferEngine {
    pub fn new(transport: Arc<dyn Transport>, sink: ArtifactSink, timeout: Duration) -> Self {
        Self {
            transport,
            sink,
            timeout,
        }
    }

    /// Attempt `zone` against `endpoint`. A successful top-level transfer also
    /// attempts every discovered subzone at [`Depth::Delegated`]; those
    /// results are attached to the returned result.
    ///
    /// `Err` is only returned when a verified payload could not be persisted.
    pub async fn attempt(
        &self,
        zone: &str,
        endpoint: &Endpoint,
        depth: Depth,
    ) -> Result<TransferResult, HarvestError> {
        let (mut result, payload) = self.transfer_once(zone, endpoint, depth).await?;

        let Some(payload) = payload else {
            return Ok(result);
        };
        if depth == Depth::Delegated {
            return Ok(result);
        }

        for child in self.subzone_targets(zone, endpoint, &payload) {
            match self.transfer_once(&child, endpoint, Depth::Delegated).await {
                Ok((child_result, _)) => result.delegated.push(child_result),
                Err(e) => error!("{} @ {}: {}", child, endpoint, e),
            }
        }

        Ok(result)
    }

    async fn transfer_once(
        &self,
        zone: &str,
        endpoint: &Endpoint,
        depth: Depth,
    ) -> Result<(TransferResult, Option<Vec<u8>>), HarvestError> {
        let mut result = TransferResult {
            zone: zone.to_string(),
            endpoint: endpoint.clone(),
            outcome: TransferOutcome::Failure,
            byte_count: 0,
            artifact: None,
            depth,
            delegated: Vec::new(),
        };

        let exchange = tokio::time::timeout(
            self.timeout,
            self.transport
                .zone_transfer(zone, endpoint.address, self.timeout),
        )
        .await;

        let payload = match exchange {
            Ok(Ok(payload)) => payload,
            Ok(Err(TransferError::TimedOut(_))) | Err(_) => {
                warn!("Timeout: {} @ {} after {:?}", zone, endpoint, self.timeout);
                result.outcome = TransferOutcome::Timeout;
                return Ok((result, None));
            }
            Ok(Err(e)) => {
                error!("Failed: {} @ {}: {}", zone, endpoint, e);
                return Ok((result, None));
            }
        };

        result.byte_count = payload.len();
        if !has_completion_marker(&payload) {
            debug!(
                "Failed: {} @ {}: no completion marker in {} bytes",
                zone, endpoint, result.byte_count
            );
            return Ok((result, None));
        }

        let path = self
            .sink
            .write_artifact(zone, &endpoint.owner_host, &payload)?;
        info!("Success: {} @ {}: {}", zone, endpoint, result.byte_count);

        result.outcome = TransferOutcome::Success;
        result.artifact = Some(path);
        Ok((result, Some(payload)))
    }

    fn subzone_targets(&self, zone: &str, endpoint: &Endpoint, payload: &[u8]) -> Vec<String> {
        match subzones::discover(payload, zone, &endpoint.owner_host) {
            Ok(set) if set.is_empty() => Vec::new(),
            Ok(set) if !set.within_fan_out() => {
                info!(
                    "{} @ {}: ignoring {} delegated subzones",
                    zone,
                    endpoint,
                    set.len()
                );
                Vec::new()
            }
            Ok(set) => {
                debug!("{} @ {}: subzones {:?}", zone, endpoint, set.names());
                set.into_targets()
            }
            Err(e) => {
                warn!("{} @ {}: subzone scan abandoned: {}", zone, endpoint, e);
                Vec::new()
            }
        }
    }
}
