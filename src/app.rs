//! Service wiring shared by the HTTP server and the CLI.

use crate::ai::{HttpServiceFactory, ServiceFactory};
use crate::image::{Badge, ImageService, Watermarker};
use crate::models::{Config, StorageConfig};
use crate::storage::{BlobStore, LocalBlobStore, S3BlobStore};
use crate::usage::{JsonlUsageSink, TracingUsageSink, UsageLog, UsageSink};
use crate::Result;
use std::sync::Arc;
use tracing::info;

/// Everything a forwarder needs to serve one request.
pub struct App {
    pub(crate) factory: Box<dyn ServiceFactory>,
    pub(crate) image: Box<dyn ImageService>,
    pub(crate) store: Box<dyn BlobStore>,
    pub(crate) usage: UsageLog,
    pub(crate) config: Config,
}

/// Injectable service bundle used to construct [`App`] in tests/harnesses.
pub struct AppServices {
    pub factory: Box<dyn ServiceFactory>,
    pub image: Box<dyn ImageService>,
    pub store: Box<dyn BlobStore>,
    pub usage: UsageLog,
}

impl App {
    /// Build an app from concrete service dependencies.
    pub fn with_services(services: AppServices, config: Config) -> Self {
        Self {
            factory: services.factory,
            image: services.image,
            store: services.store,
            usage: services.usage,
            config,
        }
    }

    /// Construct the production services described by `config`.
    pub async fn new(config: Config) -> Result<Self> {
        // Reuse one HTTP connection pool across provider clients.
        let factory = Box::new(HttpServiceFactory::new(reqwest::Client::new()));

        let badge = match &config.watermark_path {
            Some(path) => {
                info!("Watermark badge: {}", path.display());
                Badge::load(path)
            }
            None => Badge::bundled(),
        };
        let image = Box::new(Watermarker::new(badge));

        let store: Box<dyn BlobStore> = match &config.storage {
            StorageConfig::Local {
                dir,
                public_base_url,
            } => {
                info!("Storing images in {}", dir.display());
                Box::new(LocalBlobStore::new(dir.clone(), public_base_url.clone())?)
            }
            StorageConfig::S3 {
                access_key_id,
                secret_access_key,
                endpoint,
                bucket,
                public_base_url,
            } => {
                info!("Storing images in bucket {} at {}", bucket, endpoint);
                Box::new(
                    S3BlobStore::new(
                        access_key_id.clone(),
                        secret_access_key.clone(),
                        endpoint.clone(),
                        bucket.clone(),
                        public_base_url.clone(),
                    )
                    .await?,
                )
            }
        };

        let sink: Arc<dyn UsageSink> = match &config.usage_log_path {
            Some(path) => {
                info!("Usage log: {}", path.display());
                Arc::new(JsonlUsageSink::new(path.clone()))
            }
            None => Arc::new(TracingUsageSink),
        };

        Ok(Self::with_services(
            AppServices {
                factory,
                image,
                store,
                usage: UsageLog::new(sink),
            },
            config,
        ))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}
