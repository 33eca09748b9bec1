use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use feminicide_common::{CandidateArticle, Project, ProjectHistory};

use crate::error::Result;

/// Inclusive date window a source scan is bounded to (`spec.md` §4.4).
#[derive(Debug, Clone, Copy)]
pub struct DateWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Broadens `window.start` to `last_publish_date - 1 day` when that
/// watermark is earlier — the rule the Wayback and rate-limited commercial
/// adapters share (`spec.md` §4.4: "Uses the same watermark-broadening rule
/// as the Wayback adapter").
pub fn broaden_with_watermark(window: DateWindow, history: Option<&ProjectHistory>) -> DateWindow {
    let Some(last_publish_date) = history.and_then(|h| h.last_publish_date) else {
        return window;
    };
    let broadened = last_publish_date - Duration::days(1);
    if broadened < window.start {
        DateWindow {
            start: broadened,
            end: window.end,
        }
    } else {
        window
    }
}

/// One adapter per supported source (`spec.md` §4.4). Adapters are stateless
/// aside from their configured credentials; the cursor and window come from
/// the Scheduler (C8), which owns watermark bookkeeping.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Fetches candidates for `project` within `window`, respecting
    /// `history` as an advisory watermark. Adapters MUST NOT skip items on
    /// transient errors without surfacing that the cursor didn't advance —
    /// callers treat an `Err` as "stop, nothing after this point is safe to
    /// assume was seen".
    async fn iterate(
        &self,
        project: &Project,
        window: DateWindow,
        history: Option<&ProjectHistory>,
    ) -> Result<Vec<CandidateArticle>>;

    /// Per-project result cap, when this adapter enforces one. The
    /// Scheduler uses this to flag a project whose discovered count landed
    /// at or above the cap, since that run may have silently truncated
    /// results (surfaced in the run summary, not treated as an error).
    fn cap(&self) -> Option<u32> {
        None
    }
}
