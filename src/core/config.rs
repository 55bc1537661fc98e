use std::path::{Path, PathBuf};
use std::time::Duration;

// ---------------------------------------------------------------------------
// ScraperConfig: file-based config loader (ecourts.json) with env-var overrides
// ---------------------------------------------------------------------------

pub const ENV_CONFIG_PATH: &str = "ECOURTS_CONFIG";
pub const ENV_HEADLESS: &str = "ECOURTS_HEADLESS";
pub const ENV_BROWSER_TIMEOUT_MS: &str = "ECOURTS_BROWSER_TIMEOUT_MS";
pub const ENV_WAIT_TIMEOUT_MS: &str = "ECOURTS_WAIT_TIMEOUT_MS";
pub const ENV_MAX_CAPTCHA_RETRIES: &str = "ECOURTS_MAX_CAPTCHA_RETRIES";
pub const ENV_TESSERACT_CMD: &str = "TESSERACT_CMD";
pub const ENV_OUTPUT_DIR: &str = "ECOURTS_OUTPUT_DIR";
pub const ENV_DIAGNOSTICS_DIR: &str = "ECOURTS_DIAGNOSTICS_DIR";
pub const ENV_BASE_URL: &str = "ECOURTS_BASE_URL";
pub const ENV_CHROME_EXECUTABLE: &str = "CHROME_EXECUTABLE";

pub const DEFAULT_BASE_URL: &str = "https://services.ecourts.gov.in/ecourtindia_v6/";

/// Runtime settings for a scraper instance.
///
/// Every field can be set in `ecourts.json`; the matching env var (when set
/// and parseable) wins over the file.
#[derive(serde::Deserialize, Clone, Debug)]
#[serde(default)]
pub struct ScraperConfig {
    pub headless: bool,
    /// Default timeout for CDP requests (page loads, commands).
    pub browser_timeout_ms: u64,
    /// Timeout for targeted element waits on the portal's forms.
    pub wait_timeout_ms: u64,
    /// Timeout for the verification image to appear on each attempt.
    pub captcha_image_timeout_ms: u64,
    pub max_captcha_retries: u32,
    /// Pause after refreshing the verification image.
    pub captcha_refresh_pause_ms: u64,
    /// Pause after each cascading select so dependent options can load.
    pub settle_delay_ms: u64,
    /// Pause after opening the cause-list page before touching the form.
    pub request_delay_ms: u64,
    /// How long to watch for a direct document after submitting a cause list.
    pub download_wait_ms: u64,
    pub network_idle_timeout_ms: u64,
    pub tesseract_cmd: Option<String>,
    pub chrome_executable: Option<String>,
    /// Root of the `json/`, `pdfs/` and `logs/` tree.
    pub output_dir: PathBuf,
    /// Where failure screenshots are written.
    pub diagnostics_dir: PathBuf,
    pub base_url: String,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            headless: true,
            browser_timeout_ms: 60_000,
            wait_timeout_ms: 20_000,
            captcha_image_timeout_ms: 5_000,
            max_captcha_retries: 5,
            captcha_refresh_pause_ms: 1_000,
            settle_delay_ms: 1_000,
            request_delay_ms: 2_000,
            download_wait_ms: 3_000,
            network_idle_timeout_ms: 15_000,
            tesseract_cmd: None,
            chrome_executable: None,
            output_dir: PathBuf::from("output"),
            diagnostics_dir: PathBuf::from("."),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

impl ScraperConfig {
    /// CNR search lives on the portal's landing page.
    pub fn cnr_search_url(&self) -> String {
        self.base_url.clone()
    }

    pub fn cause_list_url(&self) -> String {
        format!("{}?p=cause_list/index", self.base_url)
    }

    pub fn browser_timeout(&self) -> Duration {
        Duration::from_millis(self.browser_timeout_ms)
    }

    pub fn wait_timeout(&self) -> Duration {
        Duration::from_millis(self.wait_timeout_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }

    pub fn download_wait(&self) -> Duration {
        Duration::from_millis(self.download_wait_ms)
    }

    pub fn network_idle_timeout(&self) -> Duration {
        Duration::from_millis(self.network_idle_timeout_ms)
    }

    /// Apply `ECOURTS_*` / `TESSERACT_CMD` / `CHROME_EXECUTABLE` overrides.
    pub fn apply_env_overrides(mut self) -> Self {
        if let Some(v) = env_bool(ENV_HEADLESS) {
            self.headless = v;
        }
        if let Some(v) = env_parse(ENV_BROWSER_TIMEOUT_MS) {
            self.browser_timeout_ms = v;
        }
        if let Some(v) = env_parse(ENV_WAIT_TIMEOUT_MS) {
            self.wait_timeout_ms = v;
        }
        if let Some(v) = env_parse(ENV_MAX_CAPTCHA_RETRIES) {
            self.max_captcha_retries = v;
        }
        if let Some(v) = env_string(ENV_TESSERACT_CMD) {
            self.tesseract_cmd = Some(v);
        }
        if let Some(v) = env_string(ENV_CHROME_EXECUTABLE) {
            self.chrome_executable = Some(v);
        }
        if let Some(v) = env_string(ENV_OUTPUT_DIR) {
            self.output_dir = PathBuf::from(v);
        }
        if let Some(v) = env_string(ENV_DIAGNOSTICS_DIR) {
            self.diagnostics_dir = PathBuf::from(v);
        }
        if let Some(v) = env_string(ENV_BASE_URL) {
            self.base_url = v;
        }
        self
    }
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env_string(key).and_then(|v| v.parse().ok())
}

fn env_bool(key: &str) -> Option<bool> {
    let v = env_string(key)?.to_ascii_lowercase();
    match v.as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Load `ecourts.json` from standard locations, then apply env overrides.
///
/// Search order (first found wins):
/// 1. `explicit` (the CLI's `--config`)
/// 2. `ECOURTS_CONFIG` env var path
/// 3. `./ecourts.json`
/// 4. `../ecourts.json`
///
/// Missing file → defaults. Parse error → log a warning, use defaults.
pub fn load_config(explicit: Option<&Path>) -> ScraperConfig {
    let mut candidates: Vec<PathBuf> = vec![
        PathBuf::from("ecourts.json"),
        PathBuf::from("../ecourts.json"),
    ];
    if let Ok(env_path) = std::env::var(ENV_CONFIG_PATH) {
        candidates.insert(0, PathBuf::from(env_path));
    }
    if let Some(p) = explicit {
        candidates.insert(0, p.to_path_buf());
    }

    let base = candidates
        .iter()
        .find_map(|path| {
            let contents = std::fs::read_to_string(path).ok()?;
            match parse_config(&contents) {
                Ok(cfg) => {
                    tracing::info!("ecourts.json loaded from {}", path.display());
                    Some(cfg)
                }
                Err(e) => {
                    tracing::warn!(
                        "ecourts.json parse error at {}: {}, using defaults",
                        path.display(),
                        e
                    );
                    Some(ScraperConfig::default())
                }
            }
        })
        .unwrap_or_default();

    base.apply_env_overrides()
}

pub fn parse_config(contents: &str) -> Result<ScraperConfig, serde_json::Error> {
    serde_json::from_str(contents)
}
