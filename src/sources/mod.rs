// src/sources/mod.rs
use crate::session::Session;
use crate::types::{HarvestError, SourceUrls};
use async_trait::async_trait;
use log::info;

mod ntlds;
mod public_suffix;
mod root_zone;

pub use ntlds::NtldSource;
pub use public_suffix::PublicSuffixSource;
pub use root_zone::{RootDelegation, RootZoneSource};

/// A remote list document consumed while building the zone universe.
#[async_trait]
pub trait ListSource: Send + Sync {
    type Entries: Send;

    fn name(&self) -> &str;
    fn url(&self) -> &str;
    fn parse(&self, body: &str) -> Result<Self::Entries, HarvestError>;

    /// Fetch and parse the document. Any failure is reported as a source error.
    async fn load(&self, session: &Session) -> Result<Self::Entries, HarvestError> {
        let body = session
            .get_text_with_retry(self.url(), 2)
            .await
            .map_err(|e| HarvestError::SourceError {
                source_name: self.name().to_string(),
                message: format!("Failed to fetch {}: {}", self.url(), e),
            })?;

        info!("{}: fetched {} bytes", self.name(), body.len());
        self.parse(&body)
    }
}

/// The three documents a full scan is built from.
pub struct SourceDocuments {
    pub excluded: Vec<String>,
    pub root_zone: Vec<RootDelegation>,
    pub public_suffixes: Vec<String>,
}

pub async fn load_all(urls: &SourceUrls, session: &Session) -> Result<SourceDocuments, HarvestError> {
    let ntlds = NtldSource::new(&urls.ntlds);
    let root = RootZoneSource::new(&urls.root_zone);
    let suffixes = PublicSuffixSource::new(&urls.public_suffix);

    let (excluded, root_zone, public_suffixes) = tokio::try_join!(
        ntlds.load(session),
        root.load(session),
        suffixes.load(session),
    )?;

    Ok(SourceDocuments {
        excluded,
        root_zone,
        public_suffixes,
    })
}
