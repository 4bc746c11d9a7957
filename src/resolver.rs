// src/resolver.rs
use crate::transport::Transport;
use crate::types::{Endpoint, HarvestError, ResolverConfig};
use crate::utils::normalize_zone;
use log::{debug, warn};
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::sync::Arc;
use trust_dns_resolver::config::{ResolverConfig as DnsResolverConfig, ResolverOpts};
use trust_dns_resolver::TokioAsyncResolver;

pub struct DnsResolver {
    resolver: TokioAsyncResolver,
}

impl DnsResolver {
    pub fn new(config: &ResolverConfig) -> Result<Self, HarvestError> {
        let resolver = if config.use_system_resolver {
            TokioAsyncResolver::tokio_from_system_conf().map_err(|e| {
                HarvestError::ResolutionError(format!("Failed to create system resolver: {}", e))
            })?
        } else {
            let mut resolver_config = DnsResolverConfig::new();

            for ns in &config.nameservers {
                let socket_addr = SocketAddr::from_str(ns).map_err(|e| {
                    HarvestError::ConfigError(format!("Invalid nameserver address {}: {}", ns, e))
                })?;
                resolver_config.add_name_server(trust_dns_resolver::config::NameServerConfig {
                    socket_addr,
                    protocol: trust_dns_resolver::config::Protocol::Udp,
                    tls_dns_name: None,
                    trust_negative_responses: false,
                    bind_addr: None,
                });
            }

            let mut opts = ResolverOpts::default();
            opts.timeout = config.timeout;
            opts.attempts = 2;

            TokioAsyncResolver::tokio(resolver_config, opts)
        };

        Ok(Self { resolver })
    }

    pub async fn lookup_ns(&self, zone: &str) -> Result<Vec<String>, HarvestError> {
        let fqdn = format!("{}.", normalize_zone(zone));
        let lookup = self
            .resolver
            .ns_lookup(fqdn.as_str())
            .await
            .map_err(|e| HarvestError::ResolutionError(format!("NS {}: {}", zone, e)))?;

        let mut hosts: Vec<String> = Vec::new();
        for ns in lookup.iter() {
            let host = normalize_zone(&ns.to_string());
            if !host.is_empty() && !hosts.contains(&host) {
                hosts.push(host);
            }
        }
        Ok(hosts)
    }

    pub async fn lookup_ip(&self, host: &str) -> Result<Vec<IpAddr>, HarvestError> {
        self.resolver
            .lookup_ip(host)
            .await
            .map(|lookup| lookup.iter().collect())
            .map_err(|e| HarvestError::ResolutionError(format!("Failed to resolve {}: {}", host, e)))
    }
}

/// Expands a zone's nameserver hints into concrete endpoints.
#[derive(Clone)]
pub struct NameserverResolver {
    transport: Arc<dyn Transport>,
}

impl NameserverResolver {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Endpoints for a single hint. Failures are logged and yield nothing.
    pub async fn resolve_hint(&self, hint: &str) -> Vec<Endpoint> {
        let owner_host = normalize_zone(hint);
        if owner_host.is_empty() {
            return Vec::new();
        }

        match self.transport.resolve_address(&owner_host).await {
            Ok(addresses) => {
                let mut endpoints: Vec<Endpoint> = Vec::with_capacity(addresses.len());
                for address in addresses {
                    let endpoint = Endpoint {
                        owner_host: owner_host.clone(),
                        address,
                    };
                    if !endpoints.contains(&endpoint) {
                        endpoints.push(endpoint);
                    }
                }
                debug!("NS {}: {} address(es)", owner_host, endpoints.len());
                endpoints
            }
            Err(e) => {
                warn!("NS: {}: {}", owner_host, e);
                Vec::new()
            }
        }
    }

    /// Endpoints for all hints, in hint order then resolution order.
    pub async fn resolve_all(&self, hints: &[String]) -> Vec<Endpoint> {
        let mut endpoints = Vec::new();
        for hint in hints {
            endpoints.extend(self.resolve_hint(hint).await);
        }
        endpoints
    }
}
