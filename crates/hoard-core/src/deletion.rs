//! Confirmation-gated removal of low-risk files.
//!
//! Deletion is a two-step affair: [`SafeDeletionEngine::plan`] selects
//! candidates, the caller shows the count and estimated size and asks the
//! user, and only a [`ConfirmedPlan`] (obtained through
//! [`DeletionPlan::confirm`]) can be executed.

use humansize::{format_size, BINARY};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::classify::{classify, Tier};
use crate::error::Error;
use crate::platform;
use crate::progress::ProgressReporter;
use crate::record::FileRecord;
use crate::results::ResultSet;

/// How files leave the disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisposalMethod {
    /// Move to the platform trash / recycle bin.
    Trash,
    /// Remove for good: recursively for directories, directly for files.
    Permanent,
}

impl DisposalMethod {
    /// Trash where the platform has one, otherwise permanent removal.
    pub fn preferred() -> Self {
        if platform::has_trash() {
            DisposalMethod::Trash
        } else {
            DisposalMethod::Permanent
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletionCandidate {
    pub path: PathBuf,
    pub size_bytes: u64,
    pub reason: String,
}

/// Candidates selected for one tier and size threshold, not yet approved.
#[derive(Debug, Clone)]
pub struct DeletionPlan {
    tier: Tier,
    threshold_bytes: u64,
    candidates: Vec<DeletionCandidate>,
    estimated_bytes: u64,
}

impl DeletionPlan {
    pub fn tier(&self) -> Tier {
        self.tier
    }

    pub fn threshold_bytes(&self) -> u64 {
        self.threshold_bytes
    }

    pub fn candidates(&self) -> &[DeletionCandidate] {
        &self.candidates
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Sum of the recorded sizes of all candidates.
    pub fn estimated_bytes(&self) -> u64 {
        self.estimated_bytes
    }

    pub fn formatted_estimate(&self) -> String {
        format_size(self.estimated_bytes, BINARY)
    }

    /// Marks the plan as approved by the user. Call only after the candidate
    /// count and estimated size were shown and the user agreed.
    pub fn confirm(self) -> ConfirmedPlan {
        ConfirmedPlan { plan: self }
    }
}

/// A [`DeletionPlan`] the user has agreed to.
#[derive(Debug, Clone)]
pub struct ConfirmedPlan {
    plan: DeletionPlan,
}

impl ConfirmedPlan {
    pub fn plan(&self) -> &DeletionPlan {
        &self.plan
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeletionOutcome {
    pub succeeded: usize,
    pub failed: usize,
}

pub struct SafeDeletionEngine {
    method: DisposalMethod,
    reporter: Arc<dyn ProgressReporter>,
}

impl SafeDeletionEngine {
    pub fn new(reporter: Arc<dyn ProgressReporter>) -> Self {
        Self {
            method: DisposalMethod::preferred(),
            reporter,
        }
    }

    pub fn with_method(mut self, method: DisposalMethod) -> Self {
        self.method = method;
        self
    }

    pub fn method(&self) -> DisposalMethod {
        self.method
    }

    /// Selects the records classified exactly as `tier` whose size is at
    /// least `threshold_bytes`.
    pub fn plan(&self, records: &[FileRecord], tier: Tier, threshold_bytes: u64) -> DeletionPlan {
        let candidates: Vec<DeletionCandidate> = records
            .iter()
            .filter(|r| r.size_bytes() >= threshold_bytes)
            .filter_map(|r| {
                let classification = classify(r.path());
                (classification.tier == tier).then(|| DeletionCandidate {
                    path: r.path().to_path_buf(),
                    size_bytes: r.size_bytes(),
                    reason: classification.reason,
                })
            })
            .collect();
        let estimated_bytes = candidates.iter().map(|c| c.size_bytes).sum();

        debug!(
            "Planned {} {} candidates >= {} bytes ({} bytes total)",
            candidates.len(),
            tier,
            threshold_bytes,
            estimated_bytes
        );
        DeletionPlan {
            tier,
            threshold_bytes,
            candidates,
            estimated_bytes,
        }
    }

    /// Removes every candidate of a confirmed plan, best effort.
    ///
    /// Only `Safe` plans are accepted, and each candidate is classified again
    /// right before removal. A failing item is counted and the batch goes on.
    pub fn execute(&self, confirmed: ConfirmedPlan) -> Result<DeletionOutcome, Error> {
        let plan = confirmed.plan;
        if plan.tier != Tier::Safe {
            return Err(Error::TierNotEligible(plan.tier));
        }

        let total = plan.candidates.len();
        self.reporter.on_delete_start(total);
        let mut outcome = DeletionOutcome::default();

        for (index, candidate) in plan.candidates.iter().enumerate() {
            let path = candidate.path.as_path();
            let tier = classify(path).tier;
            if tier != Tier::Safe {
                warn!("Refusing to remove '{}': now classified {}", path.display(), tier);
                outcome.failed += 1;
            } else if path.symlink_metadata().is_err() {
                warn!("'{}' no longer exists, skipping", path.display());
                outcome.succeeded += 1;
            } else {
                match self.dispose(path) {
                    Ok(()) => {
                        debug!("{}: {}", self.method_label(), path.display());
                        outcome.succeeded += 1;
                    }
                    Err(e) => {
                        warn!("Failed to remove '{}': {}", path.display(), e);
                        outcome.failed += 1;
                    }
                }
            }
            self.reporter.on_delete_progress(index + 1, total);
        }

        info!(
            "Deletion executed: {} succeeded, {} failed",
            outcome.succeeded, outcome.failed
        );
        self.reporter
            .on_delete_complete(outcome.succeeded, outcome.failed);
        Ok(outcome)
    }

    /// [`execute`](Self::execute), then drops records whose files are gone
    /// from `results`.
    pub fn execute_and_reconcile(
        &self,
        confirmed: ConfirmedPlan,
        results: &mut ResultSet,
    ) -> Result<DeletionOutcome, Error> {
        let outcome = self.execute(confirmed)?;
        let removed = results.retain_existing();
        debug!("Reconciled result set, {} records removed", removed);
        Ok(outcome)
    }

    fn dispose(&self, path: &Path) -> Result<(), String> {
        match self.method {
            DisposalMethod::Trash => {
                trash::delete(path).map_err(|e| format!("trash error: {}", e))
            }
            DisposalMethod::Permanent => {
                let is_dir = path
                    .symlink_metadata()
                    .map(|m| m.is_dir())
                    .unwrap_or(false);
                let result = if is_dir {
                    fs::remove_dir_all(path)
                } else {
                    fs::remove_file(path)
                };
                result.map_err(|e| format!("error: {}", e))
            }
        }
    }

    fn method_label(&self) -> &'static str {
        match self.method {
            DisposalMethod::Trash => "trashed",
            DisposalMethod::Permanent => "removed",
        }
    }
}
