use super::config::ScraperConfig;
use crate::scraping::service::{BrowserService, EcourtsService};
use crate::scraping::EcourtsScraper;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ScraperConfig>,
    /// Shared browser-backed scraper. Requests queue on its single session.
    pub service: Arc<dyn EcourtsService>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("base_url", &self.config.base_url)
            .field("output_dir", &self.config.output_dir)
            .finish()
    }
}

impl AppState {
    pub fn new(config: ScraperConfig) -> Self {
        let config = Arc::new(config);
        let scraper = EcourtsScraper::from_config(config.clone());
        Self {
            config,
            service: Arc::new(BrowserService::new(scraper)),
        }
    }

    pub fn with_service(config: ScraperConfig, service: Arc<dyn EcourtsService>) -> Self {
        Self {
            config: Arc::new(config),
            service,
        }
    }
}
