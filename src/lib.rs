// src/lib.rs
pub mod axfr;
pub mod cache;
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod output;
pub mod resolver;
pub mod session;
pub mod sources;
pub mod subzones;
pub mod transfer;
pub mod transport;
pub mod types;
pub mod universe;
pub mod utils;
pub mod worker;

pub use cli::Args;
pub use engine::Harvester;
pub use transport::{DnsTransport, Transport};
pub use types::{Config, HarvestError, HarvestReport, TransferResult, ZoneCandidate};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
