pub mod browser_manager;
pub mod cdp;
pub mod driver;
pub mod locator;
pub mod navigation;
pub mod scraper;
pub mod service;
pub mod session;

pub use driver::{DriverError, PageDriver};
pub use locator::{LocateError, Locator, LocatorChain};
pub use scraper::EcourtsScraper;
pub use service::{BrowserService, EcourtsService};
pub use session::ScraperSession;
