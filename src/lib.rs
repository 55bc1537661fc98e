pub mod captcha;
pub mod core;
pub mod extract;
pub mod features;
pub mod scraping;
pub mod web;

// --- Primary exports ---
pub use core::config::{load_config, ScraperConfig};
pub use core::types;
pub use core::types::*;
pub use core::{AppState, ScraperError};
pub use extract::Extraction;
pub use scraping::{EcourtsScraper, PageDriver, ScraperSession};
