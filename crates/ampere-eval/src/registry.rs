//! Model registry over the file tracker.
//!
//! Registered models live in `<root>/_registry/<name>.json` as a list of
//! versions. Each version points back at the tracked run whose artifacts
//! hold the model and the artifact bundle.

use crate::tracking::{FileTracker, RunRecord, RunStatus};
use ampere_traits::{AmpereError, Result, RunId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::PathBuf;
use tracing::info;

const REGISTRY_DIR: &str = "_registry";

/// Deployment stage of a model version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stage {
    /// Registered, not deployed.
    None,
    /// Candidate for production.
    Staging,
    /// Serving predictions.
    Production,
    /// Retired.
    Archived,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::None => "None",
            Self::Staging => "Staging",
            Self::Production => "Production",
            Self::Archived => "Archived",
        };
        f.write_str(s)
    }
}

/// One registered version of a model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelVersion {
    /// Registered model name.
    pub name: String,
    /// Version number, starting at 1.
    pub version: u32,
    /// Source run.
    pub run_id: RunId,
    /// Experiment of the source run.
    pub experiment: String,
    /// Current stage.
    pub stage: Stage,
    /// Registration time.
    pub created_at: DateTime<Utc>,
    /// Directory holding the run's artifacts.
    pub artifacts: PathBuf,
}

impl ModelVersion {
    /// Path of a named artifact of this version.
    pub fn artifact_path(&self, name: &str) -> PathBuf {
        self.artifacts.join(name)
    }
}

/// Registry of named, versioned models.
#[derive(Debug, Clone)]
pub struct ModelRegistry {
    tracker: FileTracker,
    dir: PathBuf,
}

impl ModelRegistry {
    /// Opens the registry stored under a tracker root.
    ///
    /// # Errors
    ///
    /// Returns [`AmpereError::Tracking`] if the directories cannot be created.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let tracker = FileTracker::new(root)?;
        let dir = tracker.root().join(REGISTRY_DIR);
        fs::create_dir_all(&dir)
            .map_err(|e| AmpereError::Tracking(format!("cannot create {}: {e}", dir.display())))?;
        Ok(Self { tracker, dir })
    }

    /// Finished run of `experiment` with the lowest final value of `metric`.
    ///
    /// Runs that never logged the metric, or logged a non-finite value, are
    /// ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if the runs cannot be read.
    pub fn search_best(&self, experiment: &str, metric: &str) -> Result<Option<RunRecord>> {
        let best = self
            .tracker
            .list_runs(experiment)?
            .into_iter()
            .filter(|r| r.meta.status == RunStatus::Finished)
            .filter_map(|r| {
                r.final_metric(metric)
                    .filter(|v| v.is_finite())
                    .map(|v| (v, r))
            })
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, r)| r);
        Ok(best)
    }

    fn path(&self, name: &str) -> Result<PathBuf> {
        if name.is_empty() || name.contains(['/', '\\', '.']) {
            return Err(AmpereError::Tracking(format!("invalid model name '{name}'")));
        }
        Ok(self.dir.join(format!("{name}.json")))
    }

    /// Every version of `name`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the registry file is unreadable.
    pub fn versions(&self, name: &str) -> Result<Vec<ModelVersion>> {
        let path = self.path(name)?;
        if !path.is_file() {
            return Ok(Vec::new());
        }
        let bytes = fs::read(&path)
            .map_err(|e| AmpereError::Tracking(format!("cannot read {}: {e}", path.display())))?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    fn save(&self, name: &str, versions: &[ModelVersion]) -> Result<()> {
        let path = self.path(name)?;
        fs::write(&path, serde_json::to_vec_pretty(versions)?)
            .map_err(|e| AmpereError::Tracking(format!("cannot write {}: {e}", path.display())))
    }

    /// Registers a finished run as a new version of `name` in stage
    /// [`Stage::None`].
    ///
    /// # Errors
    ///
    /// Returns [`AmpereError::Tracking`] if the run is not finished.
    pub fn register(&self, name: &str, run: &RunRecord) -> Result<ModelVersion> {
        if run.meta.status != RunStatus::Finished {
            return Err(AmpereError::Tracking(format!(
                "run {} has not finished",
                run.meta.run_id
            )));
        }
        let mut versions = self.versions(name)?;
        let version = ModelVersion {
            name: name.to_string(),
            version: versions.last().map_or(1, |v| v.version + 1),
            run_id: run.meta.run_id.clone(),
            experiment: run.meta.experiment.clone(),
            stage: Stage::None,
            created_at: Utc::now(),
            artifacts: run.artifact_path(""),
        };
        versions.push(version.clone());
        self.save(name, &versions)?;
        info!(
            "registered {name} version {} from run {}",
            version.version, version.run_id
        );
        Ok(version)
    }

    /// Moves `version` of `name` to `stage`.
    ///
    /// Promoting to [`Stage::Production`] archives the previous production
    /// version, so at most one version serves at a time.
    ///
    /// # Errors
    ///
    /// Returns [`AmpereError::Tracking`] if the version does not exist.
    pub fn promote(&self, name: &str, version: u32, stage: Stage) -> Result<ModelVersion> {
        let mut versions = self.versions(name)?;
        if !versions.iter().any(|v| v.version == version) {
            return Err(AmpereError::Tracking(format!(
                "{name} has no version {version}"
            )));
        }

        for v in &mut versions {
            if v.version == version {
                v.stage = stage;
            } else if stage == Stage::Production && v.stage == Stage::Production {
                info!("archiving {name} version {}", v.version);
                v.stage = Stage::Archived;
            }
        }
        self.save(name, &versions)?;

        let promoted = versions
            .into_iter()
            .find(|v| v.version == version)
            .ok_or_else(|| AmpereError::Tracking(format!("{name} has no version {version}")))?;
        info!("{name} version {version} moved to {stage}");
        Ok(promoted)
    }

    /// The version of `name` currently in production.
    ///
    /// # Errors
    ///
    /// Returns [`AmpereError::Tracking`] if no version is in production.
    pub fn production(&self, name: &str) -> Result<ModelVersion> {
        self.versions(name)?
            .into_iter()
            .rev()
            .find(|v| v.stage == Stage::Production)
            .ok_or_else(|| AmpereError::Tracking(format!("{name} has no production version")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ampere_traits::ExperimentTracker;

    fn finished_run(tracker: &mut FileTracker, mae: Option<f64>) -> RunId {
        let run = tracker.start_run("demand").unwrap();
        if let Some(mae) = mae {
            tracker.log_metric(&run, "mae_test", mae + 5.0, 0).unwrap();
            tracker.log_metric(&run, "mae_test", mae, 1).unwrap();
        }
        tracker.log_artifact(&run, "model.json", b"{}").unwrap();
        tracker.end_run(&run).unwrap();
        run
    }

    #[test]
    fn test_search_best() {
        let dir = tempfile::tempdir().unwrap();
        let mut tracker = FileTracker::new(dir.path()).unwrap();
        finished_run(&mut tracker, Some(20.0));
        let best = finished_run(&mut tracker, Some(11.0));
        finished_run(&mut tracker, None);
        // unfinished runs never win
        let running = tracker.start_run("demand").unwrap();
        tracker.log_metric(&running, "mae_test", 1.0, 0).unwrap();

        let registry = ModelRegistry::new(dir.path()).unwrap();
        let found = registry.search_best("demand", "mae_test").unwrap().unwrap();
        assert_eq!(found.meta.run_id, best);
        assert!(registry.search_best("nothing", "mae_test").unwrap().is_none());
    }

    #[test]
    fn test_register_and_promote() {
        let dir = tempfile::tempdir().unwrap();
        let mut tracker = FileTracker::new(dir.path()).unwrap();
        let first = finished_run(&mut tracker, Some(10.0));
        let second = finished_run(&mut tracker, Some(8.0));

        let registry = ModelRegistry::new(dir.path()).unwrap();
        assert!(registry.production("demand-reg").is_err());

        let v1 = registry
            .register("demand-reg", &tracker.load_run(&first).unwrap())
            .unwrap();
        assert_eq!(v1.version, 1);
        assert_eq!(v1.stage, Stage::None);
        registry.promote("demand-reg", 1, Stage::Production).unwrap();
        assert_eq!(registry.production("demand-reg").unwrap().run_id, first);

        let v2 = registry
            .register("demand-reg", &tracker.load_run(&second).unwrap())
            .unwrap();
        assert_eq!(v2.version, 2);
        registry.promote("demand-reg", 2, Stage::Production).unwrap();

        let prod = registry.production("demand-reg").unwrap();
        assert_eq!(prod.run_id, second);
        assert!(prod.artifact_path("model.json").is_file());

        let stages: Vec<Stage> = registry
            .versions("demand-reg")
            .unwrap()
            .iter()
            .map(|v| v.stage)
            .collect();
        assert_eq!(stages, vec![Stage::Archived, Stage::Production]);
    }

    #[test]
    fn test_promote_unknown_version() {
        let dir = tempfile::tempdir().unwrap();
        let registry = ModelRegistry::new(dir.path()).unwrap();
        assert!(registry.promote("demand-reg", 3, Stage::Staging).is_err());
    }

    #[test]
    fn test_register_requires_finished_run() {
        let dir = tempfile::tempdir().unwrap();
        let mut tracker = FileTracker::new(dir.path()).unwrap();
        let run = tracker.start_run("demand").unwrap();

        let registry = ModelRegistry::new(dir.path()).unwrap();
        let record = tracker.load_run(&run).unwrap();
        assert!(registry.register("demand-reg", &record).is_err());
    }
}
