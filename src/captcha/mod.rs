//! Verification-code (CAPTCHA) handling.

pub mod normalize;
pub mod recognize;
pub mod verification;

pub use normalize::normalize;
pub use recognize::{CharsetPolicy, OcrError, TesseractCli, TextRecognizer};
pub use verification::{
    solve_challenge, CaptchaSolver, ChallengeLocators, VerificationAttempt, VerificationConfig,
    VerificationReport,
};
