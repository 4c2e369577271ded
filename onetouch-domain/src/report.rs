use onetouch_types::{MutationOutcome, Platform};
use tracing::warn;

/// Tally of one configurator pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassReport {
    pub platform: Platform,
    pub applied: usize,
    pub unchanged: usize,
    /// Features skipped because a file or node they edit is missing.
    pub skipped: Vec<String>,
}

impl PassReport {
    pub fn new(platform: Platform) -> Self {
        Self {
            platform,
            applied: 0,
            unchanged: 0,
            skipped: Vec::new(),
        }
    }

    pub fn record(&mut self, outcome: MutationOutcome) {
        self.changed(outcome.is_applied());
    }

    pub fn changed(&mut self, changed: bool) {
        if changed {
            self.applied += 1;
        } else {
            self.unchanged += 1;
        }
    }

    pub fn skip(&mut self, feature: &str, reason: impl std::fmt::Display) {
        warn!(platform = %self.platform, feature, %reason, "skipped");
        self.skipped.push(feature.to_string());
    }
}
