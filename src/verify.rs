//! Comparing the declared body length against the observed byte count.

use std::fmt::{self, Display};
use std::sync::{Arc, Mutex};

/// Outcome of comparing a declared length against the observed byte count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Match,
    Mismatch,
}

impl Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Match => f.write_str("match"),
            Verdict::Mismatch => f.write_str("mismatch"),
        }
    }
}

/// Compares the declared body length against the observed byte count.
pub fn verify(declared: u64, observed: u64) -> Verdict {
    if declared == observed { Verdict::Match } else { Verdict::Mismatch }
}

/// One verified request, as recorded by the handler.
///
/// `declared` and `verdict` are `None` when the request carried no parseable
/// `X-Body-Byte-Length` trailer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerdictReport {
    pub observed: u64,
    pub declared: Option<u64>,
    pub verdict: Option<Verdict>,
}

/// Shared sink collecting one [`VerdictReport`] per handled request.
///
/// Injected into the handler so tests and callers can observe verification
/// outcomes without scraping log output.
#[derive(Debug, Clone, Default)]
pub struct ReportSink {
    reports: Arc<Mutex<Vec<VerdictReport>>>,
}

impl ReportSink {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn push(&self, report: VerdictReport) {
        self.reports.lock().unwrap_or_else(|e| e.into_inner()).push(report);
    }

    /// Takes all reports recorded so far, leaving the sink empty.
    pub fn take(&self) -> Vec<VerdictReport> {
        std::mem::take(&mut *self.reports.lock().unwrap_or_else(|e| e.into_inner()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_lengths_match() {
        assert_eq!(verify(5, 5), Verdict::Match);
        assert_eq!(verify(0, 0), Verdict::Match);
    }

    #[test]
    fn unequal_lengths_mismatch() {
        assert_eq!(verify(999, 5), Verdict::Mismatch);
        assert_eq!(verify(0, 1), Verdict::Mismatch);
    }

    #[test]
    fn verdict_display_is_lowercase() {
        assert_eq!(Verdict::Match.to_string(), "match");
        assert_eq!(Verdict::Mismatch.to_string(), "mismatch");
    }

    #[test]
    fn sink_take_drains_reports() {
        let sink = ReportSink::new();
        sink.push(VerdictReport { observed: 5, declared: Some(5), verdict: Some(Verdict::Match) });

        assert_eq!(sink.take().len(), 1);
        assert!(sink.take().is_empty());
    }
}
