// src/transport.rs
use crate::axfr::AxfrClient;
use crate::resolver::DnsResolver;
use crate::types::{HarvestError, ResolverConfig, TransferError};
use async_trait::async_trait;
use std::net::IpAddr;
use std::time::Duration;

/// DNS operations the harvester depends on.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Nameserver host names for `zone`, trailing dots stripped.
    async fn resolve_ns(&self, zone: &str) -> Result<Vec<String>, HarvestError>;

    async fn resolve_address(&self, host: &str) -> Result<Vec<IpAddr>, HarvestError>;

    /// Run an AXFR for `zone` against `address`. `Ok` means the exchange ended
    /// without a transport error; the caller still validates the payload.
    async fn zone_transfer(
        &self,
        zone: &str,
        address: IpAddr,
        timeout: Duration,
    ) -> Result<Vec<u8>, TransferError>;
}

/// Production transport: trust-dns lookups plus a raw TCP AXFR exchange.
pub struct DnsTransport {
    resolver: DnsResolver,
    axfr: AxfrClient,
}

impl DnsTransport {
    pub fn new(config: &ResolverConfig) -> Result<Self, HarvestError> {
        Ok(Self {
            resolver: DnsResolver::new(config)?,
            axfr: AxfrClient::default(),
        })
    }
}

#[async_trait]
impl Transport for DnsTransport {
    async fn resolve_ns(&self, zone: &str) -> Result<Vec<String>, HarvestError> {
        self.resolver.lookup_ns(zone).await
    }

    async fn resolve_address(&self, host: &str) -> Result<Vec<IpAddr>, HarvestError> {
        self.resolver.lookup_ip(host).await
    }

    async fn zone_transfer(
        &self,
        zone: &str,
        address: IpAddr,
        timeout: Duration,
    ) -> Result<Vec<u8>, TransferError> {
        self.axfr.transfer(zone, address, timeout).await
    }
}
