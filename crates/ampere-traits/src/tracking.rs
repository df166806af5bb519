//! Experiment tracker trait.
//!
//! An experiment tracker is a side-effecting sink: training code reports
//! parameters, per-fold metrics, and artifacts to it and only needs to know
//! whether each call succeeded. Trackers are passed explicitly to the code
//! that uses them; there is no process-wide tracking state.

use crate::Result;
use std::collections::BTreeMap;

/// Identifier of a tracked run.
pub type RunId = String;

/// Records runs, metrics, and artifacts for named experiments.
pub trait ExperimentTracker: std::fmt::Debug {
    /// Opens a new run inside `experiment` and returns its identifier.
    fn start_run(&mut self, experiment: &str) -> Result<RunId>;

    /// Records the parameters of a run.
    fn log_params(&mut self, run: &str, params: &BTreeMap<String, String>) -> Result<()>;

    /// Records one value of a metric at `step`.
    fn log_metric(&mut self, run: &str, name: &str, value: f64, step: usize) -> Result<()>;

    /// Stores an artifact under `name`.
    fn log_artifact(&mut self, run: &str, name: &str, bytes: &[u8]) -> Result<()>;

    /// Marks a run as finished.
    fn end_run(&mut self, run: &str) -> Result<()>;
}

/// Tracker that accepts and discards everything.
///
/// Used for untracked evaluations such as hyperparameter trials.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullTracker;

impl ExperimentTracker for NullTracker {
    fn start_run(&mut self, _experiment: &str) -> Result<RunId> {
        Ok(String::new())
    }

    fn log_params(&mut self, _run: &str, _params: &BTreeMap<String, String>) -> Result<()> {
        Ok(())
    }

    fn log_metric(&mut self, _run: &str, _name: &str, _value: f64, _step: usize) -> Result<()> {
        Ok(())
    }

    fn log_artifact(&mut self, _run: &str, _name: &str, _bytes: &[u8]) -> Result<()> {
        Ok(())
    }

    fn end_run(&mut self, _run: &str) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_tracker_accepts_everything() {
        let mut tracker = NullTracker;
        let run = tracker.start_run("demand").unwrap();
        tracker.log_params(&run, &BTreeMap::new()).unwrap();
        tracker.log_metric(&run, "mae_test", 1.0, 0).unwrap();
        tracker.log_artifact(&run, "model.json", b"{}").unwrap();
        tracker.end_run(&run).unwrap();
    }
}
