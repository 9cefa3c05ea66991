//! Reporter - the ordered diagnostics channel
//!
//! Progress messages are numbered monotonically and forwarded through
//! `tracing` so a subscriber decides where they end up. When verbose mode
//! is off, nothing is counted or emitted.

/// Numbered progress reporting for a single compilation
#[derive(Debug, Default)]
pub struct Reporter {
    verbose: bool,
    next: u32,
}

impl Reporter {
    pub fn new(verbose: bool) -> Self {
        Self { verbose, next: 0 }
    }

    pub fn verbose(&self) -> bool {
        self.verbose
    }

    /// Emits one progress message with the next sequence number
    pub fn note(&mut self, message: impl AsRef<str>) {
        if !self.verbose {
            return;
        }
        self.next += 1;
        tracing::debug!(target: "lyra::codegen", step = self.next, "{}", message.as_ref());
    }

    /// Number of messages emitted so far
    pub fn emitted(&self) -> u32 {
        self.next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quiet_reporter_counts_nothing() {
        let mut reporter = Reporter::new(false);
        assert!(!reporter.verbose());
        reporter.note("running code generation");
        assert_eq!(reporter.emitted(), 0);
    }

    #[test]
    fn test_verbose_reporter_numbers_messages() {
        let mut reporter = Reporter::new(true);
        assert!(reporter.verbose());
        reporter.note("running code generation");
        reporter.note("block lowered");
        assert_eq!(reporter.emitted(), 2);
    }
}
