//! `sprintgraph merge` command: fold analysis results into a meeting store.

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::Result;

use sprintgraph_core::plan::{AnalysisResult, BuildOptions};
use sprintgraph_store::{MeetingStore, MeetingSummary, MergeOutcome};

use crate::build_cmd::build_meeting;
use crate::files::{read_json, write_json};

/// Counts of what happened to each input.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MergeSummary {
    pub inserted: usize,
    pub replaced: usize,
    pub stale: usize,
    pub failed: usize,
}

impl MergeSummary {
    fn record(&mut self, outcome: MergeOutcome) {
        match outcome {
            MergeOutcome::Inserted => self.inserted += 1,
            MergeOutcome::Replaced => self.replaced += 1,
            MergeOutcome::Stale { .. } => self.stale += 1,
        }
    }
}

impl fmt::Display for MergeSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "merged: {} inserted, {} replaced, {} stale, {} failed",
            self.inserted, self.replaced, self.stale, self.failed
        )
    }
}

/// Run the merge command.
pub fn run_merge(
    seed: Option<&Path>,
    files: &[PathBuf],
    output: Option<&Path>,
    options: &BuildOptions,
) -> Result<()> {
    let mut store = load_store(seed)?;

    let mut results = Vec::with_capacity(files.len());
    for file in files {
        let result: AnalysisResult = read_json(file)?;
        results.push(result);
    }

    let summary = merge_results(&mut store, &results, options);
    write_json(&store.snapshot(), output)?;
    eprintln!("{summary}");
    Ok(())
}

/// Build a store from a seed file (a JSON array of meetings), or an empty
/// one.
pub fn load_store(seed: Option<&Path>) -> Result<MeetingStore> {
    match seed {
        Some(path) => {
            let meetings: Vec<MeetingSummary> = read_json(path)?;
            tracing::info!(path = %path.display(), meetings = meetings.len(), "seeding store");
            Ok(MeetingStore::from_snapshot_meetings(meetings))
        }
        None => Ok(MeetingStore::new()),
    }
}

/// Add each result to `store` in order. A result that fails to build is
/// logged and skipped; the store is not touched for it.
pub fn merge_results(
    store: &mut MeetingStore,
    results: &[AnalysisResult],
    options: &BuildOptions,
) -> MergeSummary {
    let mut summary = MergeSummary::default();
    for result in results {
        match build_meeting(result, options) {
            Ok(meeting) => summary.record(store.add_meeting_checked(meeting)),
            Err(err) => {
                tracing::warn!(
                    meeting_id = %result.response.meeting_id,
                    error = %format!("{err:#}"),
                    "skipping analysis result"
                );
                summary.failed += 1;
            }
        }
    }
    summary
}
