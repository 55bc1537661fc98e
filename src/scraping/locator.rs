//! Tolerant element targeting.
//!
//! The portal renames ids and attributes between releases, so every element
//! the flows touch is described as a [`LocatorChain`]: an ordered list of
//! fallback strategies, the first one present on the page wins.

use super::driver::PageDriver;
use std::fmt;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::debug;

const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// One way of finding an element.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Locator {
    /// Any CSS selector the browser understands, including the `i` flag.
    Css(String),
    /// First `tag` element whose visible text contains `text`, ignoring case.
    Text { tag: String, text: String },
}

impl Locator {
    pub fn css(selector: impl Into<String>) -> Self {
        Locator::Css(selector.into())
    }

    /// `tag[attr*='needle' i]`: attribute substring, case-insensitive.
    pub fn attr_contains(tag: &str, attr: &str, needle: &str) -> Self {
        Locator::Css(format!("{}[{}*='{}' i]", tag, attr, needle.replace('\'', "\\'")))
    }

    pub fn text(tag: &str, text: &str) -> Self {
        Locator::Text {
            tag: tag.to_string(),
            text: text.to_string(),
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Css(sel) => write!(f, "{}", sel),
            Locator::Text { tag, text } => write!(f, "{}:has-text('{}')", tag, text),
        }
    }
}

#[derive(Debug, Error)]
pub enum LocateError {
    #[error("{name}: no strategy matched within {timeout_ms}ms")]
    Timeout { name: &'static str, timeout_ms: u128 },
}

/// Named, ordered list of [`Locator`] strategies.
#[derive(Debug, Clone)]
pub struct LocatorChain {
    name: &'static str,
    strategies: Vec<Locator>,
}

impl LocatorChain {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            strategies: Vec::new(),
        }
    }

    pub fn or(mut self, locator: Locator) -> Self {
        self.strategies.push(locator);
        self
    }

    pub fn or_css(self, selector: &str) -> Self {
        self.or(Locator::css(selector))
    }

    /// Adds one `attr*=needle` strategy per attribute, in the given order.
    pub fn or_attr_contains(mut self, tag: &str, attrs: &[&str], needle: &str) -> Self {
        for attr in attrs {
            self.strategies.push(Locator::attr_contains(tag, attr, needle));
        }
        self
    }

    pub fn or_text(self, tag: &str, text: &str) -> Self {
        self.or(Locator::text(tag, text))
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn strategies(&self) -> &[Locator] {
        &self.strategies
    }

    /// Single pass over the strategies without waiting.
    ///
    /// Driver errors on one strategy (a selector the page rejects, a detached
    /// node) only skip that strategy.
    pub async fn first_present(&self, driver: &dyn PageDriver) -> Option<Locator> {
        for locator in &self.strategies {
            match driver.exists(locator).await {
                Ok(true) => return Some(locator.clone()),
                Ok(false) => {}
                Err(e) => debug!("{}: strategy {} errored: {}", self.name, locator, e),
            }
        }
        None
    }

    /// Poll until some strategy matches or `timeout` elapses.
    pub async fn wait(
        &self,
        driver: &dyn PageDriver,
        timeout: Duration,
    ) -> Result<Locator, LocateError> {
        let start = Instant::now();
        loop {
            if let Some(hit) = self.first_present(driver).await {
                debug!("{}: matched {}", self.name, hit);
                return Ok(hit);
            }
            if start.elapsed() >= timeout {
                return Err(LocateError::Timeout {
                    name: self.name,
                    timeout_ms: timeout.as_millis(),
                });
            }
            tokio::time::sleep(POLL_INTERVAL.min(timeout)).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attr_contains_renders_case_insensitive_substring() {
        assert_eq!(
            Locator::attr_contains("img", "id", "captcha"),
            Locator::Css("img[id*='captcha' i]".into())
        );
    }

    #[test]
    fn builder_keeps_declaration_order() {
        let chain = LocatorChain::new("state select")
            .or_attr_contains("select", &["name", "id"], "state")
            .or_text("button", "Go");
        let rendered: Vec<String> = chain.strategies().iter().map(|l| l.to_string()).collect();
        assert_eq!(
            rendered,
            vec![
                "select[name*='state' i]",
                "select[id*='state' i]",
                "button:has-text('Go')",
            ]
        );
    }
}
