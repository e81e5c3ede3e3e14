//! Import of geodata metadata from remote map services.
//!
//! Every service type is handled by a [`MetadataParser`] registered in a
//! [`MetadataRegistry`] under its datatype code.

pub mod capabilities;
pub mod ogc;

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::MetadataConfig;
use crate::models::ParsedMetadata;

pub use ogc::{OgcParser, OgcService, canonical_url};

#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("Invalid service URL: {0}")]
    InvalidUrl(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Service responded with status {0}")]
    Status(u16),

    #[error("Capabilities document exceeds {0} bytes")]
    TooLarge(usize),

    #[error("Malformed XML: {0}")]
    Xml(String),

    #[error("Expected a capabilities document, got <{0}>")]
    NotCapabilities(String),
}

/// A source of geodata metadata for one service type.
#[async_trait]
pub trait MetadataParser: Send + Sync {
    /// Datatype code the parser is registered under, e.g. `wms`.
    fn code(&self) -> &str;

    /// Human readable service name.
    fn name(&self) -> &str;

    /// Canonical form of `url`, used to recognise already imported services.
    fn service_url(&self, url: &str) -> String {
        canonical_url(url)
    }

    /// Fetches and parses the metadata behind `url`. Nothing is stored.
    async fn parse(&self, url: &str) -> Result<ParsedMetadata, MetadataError>;
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ServiceInfo {
    pub code: String,
    pub name: String,
}

#[derive(Clone, Default)]
pub struct MetadataRegistry {
    parsers: Vec<Arc<dyn MetadataParser>>,
}

impl MetadataRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with parsers for all supported OGC services.
    pub fn with_ogc_services(config: &MetadataConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.request_timeout_seconds))
            .user_agent(config.user_agent.clone())
            .build()?;

        let mut registry = Self::new();
        for service in OgcService::ALL {
            registry.register(Arc::new(OgcParser::new(
                service,
                client.clone(),
                config.max_document_bytes,
            )));
        }
        Ok(registry)
    }

    /// Adds a parser, replacing any parser with the same code.
    pub fn register(&mut self, parser: Arc<dyn MetadataParser>) {
        self.parsers.retain(|p| p.code() != parser.code());
        self.parsers.push(parser);
    }

    #[must_use]
    pub fn get_service(&self, code: &str) -> Option<Arc<dyn MetadataParser>> {
        self.parsers.iter().find(|p| p.code() == code).cloned()
    }

    #[must_use]
    pub fn service_codes(&self) -> Vec<String> {
        self.parsers.iter().map(|p| p.code().to_string()).collect()
    }

    #[must_use]
    pub fn services(&self) -> Vec<ServiceInfo> {
        self.parsers
            .iter()
            .map(|p| ServiceInfo {
                code: p.code().to_string(),
                name: p.name().to_string(),
            })
            .collect()
    }

    /// Parses the service behind `url`, logging and swallowing failures.
    pub async fn parse_metadata(&self, url: &str, code: &str) -> Option<ParsedMetadata> {
        let Some(parser) = self.get_service(code) else {
            warn!(code, "No metadata parser registered");
            return None;
        };

        match parser.parse(url).await {
            Ok(parsed) => {
                debug!(
                    url,
                    code,
                    layers = parsed.layers.len(),
                    "Parsed service metadata"
                );
                Some(parsed)
            }
            Err(e) => {
                warn!(url, code, error = %e, "Failed to parse service metadata");
                None
            }
        }
    }
}
