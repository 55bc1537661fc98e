//! Failure snapshots: a full-page PNG named after the step that failed.

use crate::scraping::driver::PageDriver;
use std::path::PathBuf;
use tracing::{info, warn};

pub const CNR_BUTTON_NOT_FOUND: &str = "cnr_button_not_found.png";
pub const CNR_INPUT_NOT_FOUND: &str = "cnr_input_not_found.png";
pub const SEARCH_BUTTON_NOT_FOUND: &str = "search_button_not_found.png";
pub const ERROR_SEARCHING_BY_CNR: &str = "error_searching_by_cnr.png";

pub const STATE_SELECT_NOT_FOUND: &str = "state_select_not_found.png";
pub const DISTRICT_SELECT_NOT_FOUND: &str = "district_select_not_found.png";
pub const COMPLEX_SELECT_NOT_FOUND: &str = "court_complex_select_not_found.png";
pub const COURT_SELECT_NOT_FOUND: &str = "court_name_select_not_found.png";
pub const CAUSELIST_SUBMIT_NOT_FOUND: &str = "causelist_submit_not_found.png";
pub const ERROR_DOWNLOADING_CAUSELIST: &str = "error_downloading_causelist.png";

#[derive(Debug, Clone)]
pub struct Diagnostics {
    dir: PathBuf,
}

impl Diagnostics {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    /// Best-effort; a failed snapshot is only logged.
    pub async fn capture(&self, driver: &dyn PageDriver, name: &str) -> Option<PathBuf> {
        let path = self.path_for(name);
        match driver.save_snapshot(&path).await {
            Ok(()) => {
                info!("diagnostic snapshot saved to {}", path.display());
                Some(path)
            }
            Err(e) => {
                warn!("could not save snapshot {}: {}", path.display(), e);
                None
            }
        }
    }
}
