// Result streaming: walks the per-account results in order and turns
// each into a display event carrying the overall progress percentage.

use crate::api::ExecutionResult;
use std::thread;
use std::time::Duration;

/// Progress once the operator's run has been accepted.
pub const RUN_STARTED: u8 = 12;
/// Progress once a backend answered.
pub const BACKEND_RESOLVED: u8 = 28;
/// Progress once the dispatch response is in; result streaming fills the rest.
pub const DISPATCH_COMPLETE: u8 = 50;
pub const COMPLETE: u8 = 100;

pub const SUCCESS_MARKER: char = '✔';
pub const FAILURE_MARKER: char = '✖';

/// One rendered per-account result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressEvent {
    /// 1-based position in the result list.
    pub position: usize,
    pub total: usize,
    pub label: String,
    pub ok: bool,
    pub message: String,
    pub percent: u8,
}

impl ProgressEvent {
    pub fn marker(&self) -> char {
        if self.ok {
            SUCCESS_MARKER
        } else {
            FAILURE_MARKER
        }
    }

    /// `✔ label: message` or `✖ label: message`; the message is verbatim.
    pub fn line(&self) -> String {
        format!("{} {}: {}", self.marker(), self.label, self.message)
    }
}

#[derive(Debug, Clone)]
pub struct ProgressReporter {
    base_offset: u8,
    pacing: Duration,
}

impl ProgressReporter {
    pub fn new(base_offset: u8, pacing: Duration) -> Self {
        ProgressReporter {
            base_offset: base_offset.min(COMPLETE),
            pacing,
        }
    }

    /// Emit one event per result, in order. The pacing sleep sits between
    /// events only and has no effect on what is emitted.
    pub fn stream<F>(&self, results: &[ExecutionResult], mut on_event: F)
    where
        F: FnMut(ProgressEvent),
    {
        let total = results.len();
        for (idx, result) in results.iter().enumerate() {
            if idx > 0 && !self.pacing.is_zero() {
                thread::sleep(self.pacing);
            }
            let position = idx + 1;
            on_event(ProgressEvent {
                position,
                total,
                label: result.label.clone(),
                ok: result.ok,
                message: result.message.clone(),
                percent: self.percent_at(position, total),
            });
        }
    }

    /// `floor(processed / total * remaining) + base_offset`, capped at 100.
    pub fn percent_at(&self, processed: usize, total: usize) -> u8 {
        if total == 0 {
            return self.base_offset;
        }
        let remaining = (COMPLETE - self.base_offset) as usize;
        let step = processed.min(total) * remaining / total;
        (self.base_offset as usize + step).min(COMPLETE as usize) as u8
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        ProgressReporter::new(DISPATCH_COMPLETE, Duration::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(label: &str, ok: bool, message: &str) -> ExecutionResult {
        ExecutionResult {
            label: label.into(),
            ok,
            message: message.into(),
        }
    }

    #[test]
    fn emits_every_result_in_order() {
        let results = vec![
            result("A", true, "followed"),
            result("B", false, "rate limited"),
        ];
        let mut events = Vec::new();
        ProgressReporter::default().stream(&results, |evt| events.push(evt));

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].line(), "✔ A: followed");
        assert_eq!(events[1].line(), "✖ B: rate limited");
        assert!(events[0].percent <= events[1].percent);
        assert!(events.iter().all(|e| e.percent <= COMPLETE));
        assert_eq!(events[1].percent, COMPLETE);
    }

    #[test]
    fn percent_is_floored_and_monotonic() {
        let reporter = ProgressReporter::new(DISPATCH_COMPLETE, Duration::ZERO);
        assert_eq!(reporter.percent_at(1, 3), 66);
        assert_eq!(reporter.percent_at(2, 3), 83);
        assert_eq!(reporter.percent_at(3, 3), 100);

        let mut last = DISPATCH_COMPLETE;
        for processed in 0..=7 {
            let pct = reporter.percent_at(processed, 7);
            assert!(pct >= last);
            last = pct;
        }
    }

    #[test]
    fn empty_results_emit_nothing() {
        let mut count = 0;
        ProgressReporter::default().stream(&[], |_| count += 1);
        assert_eq!(count, 0);
    }

    #[test]
    fn pacing_does_not_change_events() {
        let results = vec![result("A", true, "x"), result("B", true, "y")];
        let mut paced = Vec::new();
        ProgressReporter::new(DISPATCH_COMPLETE, Duration::from_millis(5))
            .stream(&results, |evt| paced.push(evt));
        let mut unpaced = Vec::new();
        ProgressReporter::default().stream(&results, |evt| unpaced.push(evt));
        assert_eq!(paced, unpaced);
    }
}
