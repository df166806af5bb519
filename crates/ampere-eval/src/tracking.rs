//! File-backed experiment tracker.
//!
//! Layout under the tracker root:
//!
//! ```text
//! <root>/<experiment>/<run_id>/meta.json
//!                             /params.json
//!                             /metrics.jsonl
//!                             /artifacts/<name>
//! ```

use ampere_traits::{AmpereError, ExperimentTracker, Result, RunId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use uuid::Uuid;

const META_FILE: &str = "meta.json";
const PARAMS_FILE: &str = "params.json";
const METRICS_FILE: &str = "metrics.jsonl";
const ARTIFACTS_DIR: &str = "artifacts";

/// Lifecycle of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Started and not yet ended.
    Running,
    /// Ended normally.
    Finished,
}

/// Run metadata stored in `meta.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMeta {
    /// Run identifier (UUID v4).
    pub run_id: RunId,
    /// Experiment name.
    pub experiment: String,
    /// Current status.
    pub status: RunStatus,
    /// Start time.
    pub started_at: DateTime<Utc>,
    /// End time, once finished.
    pub ended_at: Option<DateTime<Utc>>,
}

/// One metric observation, a line of `metrics.jsonl`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricPoint {
    /// Metric name.
    pub name: String,
    /// Value.
    pub value: f64,
    /// Step (fold index for walk-forward metrics).
    pub step: usize,
    /// Time of logging.
    pub timestamp: DateTime<Utc>,
}

/// A run read back from disk.
#[derive(Debug, Clone, PartialEq)]
pub struct RunRecord {
    /// Metadata.
    pub meta: RunMeta,
    /// Logged parameters.
    pub params: BTreeMap<String, String>,
    /// Metric history in logging order.
    pub metrics: Vec<MetricPoint>,
    /// Run directory.
    pub dir: PathBuf,
}

impl RunRecord {
    /// Last logged value of `name`.
    pub fn final_metric(&self, name: &str) -> Option<f64> {
        self.metrics
            .iter()
            .rev()
            .find(|m| m.name == name)
            .map(|m| m.value)
    }

    /// Path of a logged artifact.
    pub fn artifact_path(&self, name: &str) -> PathBuf {
        self.dir.join(ARTIFACTS_DIR).join(name)
    }
}

/// Tracker writing runs as plain files.
#[derive(Debug, Clone)]
pub struct FileTracker {
    root: PathBuf,
    active: HashMap<RunId, PathBuf>,
}

fn tracking_err(context: &str, path: &Path, e: impl std::fmt::Display) -> AmpereError {
    AmpereError::Tracking(format!("{context} {}: {e}", path.display()))
}

fn check_name(kind: &str, name: &str) -> Result<()> {
    if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
        return Err(AmpereError::Tracking(format!("invalid {kind} name '{name}'")));
    }
    Ok(())
}

impl FileTracker {
    /// Creates a tracker rooted at `root` (created if missing).
    ///
    /// # Errors
    ///
    /// Returns [`AmpereError::Tracking`] if the directory cannot be created.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| tracking_err("cannot create", &root, e))?;
        Ok(Self {
            root,
            active: HashMap::new(),
        })
    }

    /// Tracker root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn run_dir(&self, run: &str) -> Result<PathBuf> {
        if let Some(dir) = self.active.get(run) {
            return Ok(dir.clone());
        }
        check_name("run", run)?;
        let entries =
            fs::read_dir(&self.root).map_err(|e| tracking_err("cannot read", &self.root, e))?;
        for entry in entries.flatten() {
            let candidate = entry.path().join(run);
            if candidate.join(META_FILE).is_file() {
                return Ok(candidate);
            }
        }
        Err(AmpereError::Tracking(format!("unknown run '{run}'")))
    }

    fn read_meta(dir: &Path) -> Result<RunMeta> {
        let path = dir.join(META_FILE);
        let bytes = fs::read(&path).map_err(|e| tracking_err("cannot read", &path, e))?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    fn write_meta(dir: &Path, meta: &RunMeta) -> Result<()> {
        let path = dir.join(META_FILE);
        fs::write(&path, serde_json::to_vec_pretty(meta)?)
            .map_err(|e| tracking_err("cannot write", &path, e))
    }

    /// Reads one run.
    ///
    /// # Errors
    ///
    /// Returns an error if the run does not exist or its files are corrupt.
    pub fn load_run(&self, run: &str) -> Result<RunRecord> {
        let dir = self.run_dir(run)?;
        Self::read_run(&dir)
    }

    fn read_run(dir: &Path) -> Result<RunRecord> {
        let meta = Self::read_meta(dir)?;

        let params_path = dir.join(PARAMS_FILE);
        let params = if params_path.is_file() {
            let bytes =
                fs::read(&params_path).map_err(|e| tracking_err("cannot read", &params_path, e))?;
            serde_json::from_slice(&bytes)?
        } else {
            BTreeMap::new()
        };

        let metrics_path = dir.join(METRICS_FILE);
        let metrics = if metrics_path.is_file() {
            let text = fs::read_to_string(&metrics_path)
                .map_err(|e| tracking_err("cannot read", &metrics_path, e))?;
            text.lines()
                .filter(|l| !l.trim().is_empty())
                .map(serde_json::from_str)
                .collect::<std::result::Result<Vec<MetricPoint>, _>>()?
        } else {
            Vec::new()
        };

        Ok(RunRecord {
            meta,
            params,
            metrics,
            dir: dir.to_path_buf(),
        })
    }

    /// Every run of `experiment`, oldest first. A missing experiment has no
    /// runs.
    ///
    /// # Errors
    ///
    /// Returns an error if a run directory cannot be read.
    pub fn list_runs(&self, experiment: &str) -> Result<Vec<RunRecord>> {
        check_name("experiment", experiment)?;
        let dir = self.root.join(experiment);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let entries = fs::read_dir(&dir).map_err(|e| tracking_err("cannot read", &dir, e))?;
        let mut runs = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if path.join(META_FILE).is_file() {
                runs.push(Self::read_run(&path)?);
            }
        }
        runs.sort_by_key(|r| r.meta.started_at);
        Ok(runs)
    }
}

impl ExperimentTracker for FileTracker {
    fn start_run(&mut self, experiment: &str) -> Result<RunId> {
        check_name("experiment", experiment)?;
        let run_id = Uuid::new_v4().to_string();
        let dir = self.root.join(experiment).join(&run_id);
        fs::create_dir_all(dir.join(ARTIFACTS_DIR))
            .map_err(|e| tracking_err("cannot create", &dir, e))?;

        Self::write_meta(
            &dir,
            &RunMeta {
                run_id: run_id.clone(),
                experiment: experiment.to_string(),
                status: RunStatus::Running,
                started_at: Utc::now(),
                ended_at: None,
            },
        )?;
        info!("started run {run_id} in experiment '{experiment}'");
        self.active.insert(run_id.clone(), dir);
        Ok(run_id)
    }

    fn log_params(&mut self, run: &str, params: &BTreeMap<String, String>) -> Result<()> {
        let dir = self.run_dir(run)?;
        let path = dir.join(PARAMS_FILE);
        let mut merged: BTreeMap<String, String> = if path.is_file() {
            let bytes = fs::read(&path).map_err(|e| tracking_err("cannot read", &path, e))?;
            serde_json::from_slice(&bytes)?
        } else {
            BTreeMap::new()
        };
        merged.extend(params.iter().map(|(k, v)| (k.clone(), v.clone())));
        fs::write(&path, serde_json::to_vec_pretty(&merged)?)
            .map_err(|e| tracking_err("cannot write", &path, e))
    }

    fn log_metric(&mut self, run: &str, name: &str, value: f64, step: usize) -> Result<()> {
        let dir = self.run_dir(run)?;
        let path = dir.join(METRICS_FILE);
        let point = MetricPoint {
            name: name.to_string(),
            value,
            step,
            timestamp: Utc::now(),
        };
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| tracking_err("cannot open", &path, e))?;
        let mut line = serde_json::to_vec(&point)?;
        line.push(b'\n');
        file.write_all(&line)
            .map_err(|e| tracking_err("cannot write", &path, e))?;
        debug!("run {run}: {name}[{step}] = {value}");
        Ok(())
    }

    fn log_artifact(&mut self, run: &str, name: &str, bytes: &[u8]) -> Result<()> {
        check_name("artifact", name)?;
        let path = self.run_dir(run)?.join(ARTIFACTS_DIR).join(name);
        fs::write(&path, bytes).map_err(|e| tracking_err("cannot write", &path, e))
    }

    fn end_run(&mut self, run: &str) -> Result<()> {
        let dir = self.run_dir(run)?;
        let mut meta = Self::read_meta(&dir)?;
        meta.status = RunStatus::Finished;
        meta.ended_at = Some(Utc::now());
        Self::write_meta(&dir, &meta)?;
        self.active.remove(run);
        info!("finished run {run}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut tracker = FileTracker::new(dir.path()).unwrap();

        let run = tracker.start_run("demand").unwrap();
        let params = BTreeMap::from([("max_depth".to_string(), "6".to_string())]);
        tracker.log_params(&run, &params).unwrap();
        tracker.log_metric(&run, "mae_test", 12.0, 0).unwrap();
        tracker.log_metric(&run, "mae_test", 9.5, 1).unwrap();
        tracker.log_artifact(&run, "model.json", b"{}").unwrap();
        tracker.end_run(&run).unwrap();

        let record = tracker.load_run(&run).unwrap();
        assert_eq!(record.meta.status, RunStatus::Finished);
        assert!(record.meta.ended_at.is_some());
        assert_eq!(record.params["max_depth"], "6");
        assert_eq!(record.metrics.len(), 2);
        assert_eq!(record.final_metric("mae_test"), Some(9.5));
        assert_eq!(record.final_metric("rmse"), None);
        assert_eq!(fs::read(record.artifact_path("model.json")).unwrap(), b"{}");
    }

    #[test]
    fn test_list_runs() {
        let dir = tempfile::tempdir().unwrap();
        let mut tracker = FileTracker::new(dir.path()).unwrap();
        let a = tracker.start_run("demand").unwrap();
        let b = tracker.start_run("demand").unwrap();
        tracker.start_run("other").unwrap();

        let runs = tracker.list_runs("demand").unwrap();
        let ids: Vec<&str> = runs.iter().map(|r| r.meta.run_id.as_str()).collect();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&a.as_str()) && ids.contains(&b.as_str()));
        assert!(tracker.list_runs("missing").unwrap().is_empty());
    }

    #[test]
    fn test_reopened_tracker_finds_runs() {
        let dir = tempfile::tempdir().unwrap();
        let run = {
            let mut tracker = FileTracker::new(dir.path()).unwrap();
            tracker.start_run("demand").unwrap()
        };

        let mut reopened = FileTracker::new(dir.path()).unwrap();
        reopened.log_metric(&run, "mae_train", 1.0, 0).unwrap();
        reopened.end_run(&run).unwrap();
        assert_eq!(
            reopened.load_run(&run).unwrap().meta.status,
            RunStatus::Finished
        );
    }

    #[test]
    fn test_rejects_bad_names() {
        let dir = tempfile::tempdir().unwrap();
        let mut tracker = FileTracker::new(dir.path()).unwrap();
        assert!(tracker.start_run("../escape").is_err());

        let run = tracker.start_run("demand").unwrap();
        assert!(tracker.log_artifact(&run, "../model.json", b"x").is_err());
        assert!(tracker.log_metric("no-such-run", "m", 1.0, 0).is_err());
    }
}
