use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Per-project tally for one scheduler or publisher run, rolled up into a
/// `RunSummary` and mailed out by the notifier
/// (`original_source/scripts/tasks.py::send_email_task`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectRunStats {
    pub project_id: i64,
    pub project_title: String,
    pub discovered: u64,
    pub extracted: u64,
    pub enqueued: u64,
    pub above_threshold: u64,
    pub posted: u64,
    pub extraction_failures: u64,
    pub scoring_failures: u64,
    /// Set once `discovered` crosses the adapter's per-project cap, so the
    /// notifier can flag a project that may be silently truncating results.
    pub hit_source_cap: bool,
}

/// Everything one run (one Scheduler invocation, or one Publisher sweep)
/// needs to report in its summary email (`spec.md` §2 row C10, §7).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub source: crate::Source,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub projects: Vec<ProjectRunStats>,
    pub fatal_errors: Vec<String>,
}

impl RunSummary {
    pub fn new(source: crate::Source, started_at: DateTime<Utc>) -> Self {
        Self {
            source,
            started_at,
            finished_at: started_at,
            projects: Vec::new(),
            fatal_errors: Vec::new(),
        }
    }

    pub fn total_discovered(&self) -> u64 {
        self.projects.iter().map(|p| p.discovered).sum()
    }

    pub fn total_posted(&self) -> u64 {
        self.projects.iter().map(|p| p.posted).sum()
    }

    pub fn any_near_cap(&self) -> bool {
        self.projects.iter().any(|p| p.hit_source_cap)
    }
}
