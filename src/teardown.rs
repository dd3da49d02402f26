//! Best-effort teardown
//!
//! Shutdown paths run every step even when earlier ones fail. Failures are
//! collected and logged, never returned.

use std::fmt::Display;
use std::future::Future;
use tracing::{debug, warn};

/// Collects failures from a sequence of teardown steps
#[derive(Debug)]
pub struct Teardown {
    scope: &'static str,
    failures: Vec<String>,
}

impl Teardown {
    /// Start a teardown for the named component
    pub fn new(scope: &'static str) -> Self {
        Self {
            scope,
            failures: Vec::new(),
        }
    }

    /// Run a fallible step, recording its error instead of propagating it
    pub async fn step<T, E, F>(&mut self, name: &str, fut: F) -> Option<T>
    where
        E: Display,
        F: Future<Output = Result<T, E>>,
    {
        match fut.await {
            Ok(value) => {
                debug!("{}: {} done", self.scope, name);
                Some(value)
            }
            Err(e) => {
                self.record(name, e);
                None
            }
        }
    }

    /// Record a failure observed outside `step`
    pub fn record(&mut self, name: &str, reason: impl Display) {
        warn!("{}: {} failed: {}", self.scope, name, reason);
        self.failures.push(format!("{}: {}", name, reason));
    }

    /// Failures recorded so far
    pub fn failures(&self) -> &[String] {
        &self.failures
    }

    /// Finish the teardown and return the failure list for reporting
    pub fn finish(self) -> Vec<String> {
        if self.failures.is_empty() {
            debug!("{}: teardown completed cleanly", self.scope);
        } else {
            warn!(
                "{}: teardown completed with {} failure(s)",
                self.scope,
                self.failures.len()
            );
        }
        self.failures
    }
}
