//! The capture → normalize → recognize → fill → refresh loop.

use super::normalize::normalize;
use super::recognize::{recognize, CharsetPolicy, TextRecognizer};
use crate::scraping::driver::PageDriver;
use crate::scraping::locator::LocatorChain;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Recognizer plus the ordered policies tried on each captured image.
#[derive(Clone)]
pub struct CaptchaSolver {
    engine: Arc<dyn TextRecognizer>,
    policies: Vec<CharsetPolicy>,
}

impl CaptchaSolver {
    pub fn new(engine: Arc<dyn TextRecognizer>) -> Self {
        Self {
            engine,
            policies: vec![CharsetPolicy::Alphanumeric, CharsetPolicy::Numeric],
        }
    }

    /// First accepted candidate across the policy chain.
    pub async fn solve(&self, image_bytes: &[u8]) -> Option<String> {
        let image = normalize(image_bytes);
        for policy in &self.policies {
            if let Some(code) = recognize(self.engine.as_ref(), &image, *policy).await {
                return Some(code);
            }
        }
        None
    }
}

/// Where the challenge lives on the current page.
#[derive(Debug, Clone)]
pub struct ChallengeLocators {
    pub image: LocatorChain,
    pub input: LocatorChain,
    pub refresh: LocatorChain,
}

#[derive(Debug, Clone)]
pub struct VerificationConfig {
    pub max_attempts: u32,
    pub image_timeout: Duration,
    pub refresh_pause: Duration,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            image_timeout: Duration::from_secs(5),
            refresh_pause: Duration::from_secs(1),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    ImageNotFound,
    CaptureFailed,
    Unreadable,
    InputNotFound,
    FillFailed,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RejectReason::ImageNotFound => "challenge image not found",
            RejectReason::CaptureFailed => "could not capture challenge image",
            RejectReason::Unreadable => "no acceptable reading",
            RejectReason::InputNotFound => "challenge input not found",
            RejectReason::FillFailed => "could not fill challenge input",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    Accepted,
    Rejected(RejectReason),
}

#[derive(Debug, Clone)]
pub struct VerificationAttempt {
    /// 1-based.
    pub index: u32,
    pub image: Vec<u8>,
    pub candidate: Option<String>,
    pub outcome: AttemptOutcome,
}

#[derive(Debug, Clone, Default)]
pub struct VerificationReport {
    pub attempts: Vec<VerificationAttempt>,
}

impl VerificationReport {
    pub fn solved(&self) -> bool {
        self.attempts
            .last()
            .map(|a| a.outcome == AttemptOutcome::Accepted)
            .unwrap_or(false)
    }

    pub fn code(&self) -> Option<&str> {
        self.attempts
            .iter()
            .find(|a| a.outcome == AttemptOutcome::Accepted)
            .and_then(|a| a.candidate.as_deref())
    }
}

/// Solve the challenge on the current page and type the answer in.
///
/// Never errors: exhaustion is a report whose `solved()` is false and whose
/// attempt log holds exactly `max_attempts` entries.
pub async fn solve_challenge(
    driver: &dyn PageDriver,
    solver: &CaptchaSolver,
    locators: &ChallengeLocators,
    cfg: &VerificationConfig,
) -> VerificationReport {
    let mut report = VerificationReport::default();

    for index in 1..=cfg.max_attempts {
        info!("verification attempt {}/{}", index, cfg.max_attempts);
        let attempt = attempt_once(driver, solver, locators, cfg, index).await;
        let accepted = attempt.outcome == AttemptOutcome::Accepted;
        if let AttemptOutcome::Rejected(reason) = &attempt.outcome {
            warn!("verification attempt {} rejected: {}", index, reason);
        }
        report.attempts.push(attempt);
        if accepted {
            return report;
        }
        if index < cfg.max_attempts {
            refresh(driver, locators, cfg).await;
        }
    }

    error!(
        "verification failed after {} attempts",
        report.attempts.len()
    );
    report
}

async fn attempt_once(
    driver: &dyn PageDriver,
    solver: &CaptchaSolver,
    locators: &ChallengeLocators,
    cfg: &VerificationConfig,
    index: u32,
) -> VerificationAttempt {
    let rejected = |image: Vec<u8>, candidate: Option<String>, reason| VerificationAttempt {
        index,
        image,
        candidate,
        outcome: AttemptOutcome::Rejected(reason),
    };

    let image_at = match locators.image.wait(driver, cfg.image_timeout).await {
        Ok(l) => l,
        Err(_) => return rejected(Vec::new(), None, RejectReason::ImageNotFound),
    };
    let image = match driver.capture_element(&image_at).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!("challenge capture failed: {}", e);
            return rejected(Vec::new(), None, RejectReason::CaptureFailed);
        }
    };
    let Some(code) = solver.solve(&image).await else {
        return rejected(image, None, RejectReason::Unreadable);
    };
    let Some(input_at) = locators.input.first_present(driver).await else {
        return rejected(image, Some(code), RejectReason::InputNotFound);
    };
    if let Err(e) = driver.fill(&input_at, &code).await {
        warn!("challenge fill failed: {}", e);
        return rejected(image, Some(code), RejectReason::FillFailed);
    }
    info!("verification code filled: {}", code);
    VerificationAttempt {
        index,
        image,
        candidate: Some(code),
        outcome: AttemptOutcome::Accepted,
    }
}

async fn refresh(driver: &dyn PageDriver, locators: &ChallengeLocators, cfg: &VerificationConfig) {
    let Some(control) = locators.refresh.first_present(driver).await else {
        return;
    };
    if let Err(e) = driver.click(&control).await {
        warn!("challenge refresh failed: {}", e);
    }
    tokio::time::sleep(cfg.refresh_pause).await;
}
