//! Incremental meeting/task store.
//!
//! Holds every analyzed meeting (most recent first) and a flattened,
//! id-deduplicated index of all their tasks. Meetings move to the front when
//! first seen; tasks never move once indexed, so views keyed by task id stay
//! visually stable when a later analysis revises a task.

use serde::{Deserialize, Serialize};

use crate::index::OrderedIndex;
use crate::models::{MeetingSummary, TaskNode};

/// What [`MeetingStore::add_meeting`] did with an incoming meeting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum MergeOutcome {
    /// New meeting id, placed at the front of the meeting list.
    Inserted,
    /// Existing meeting id, fields replaced at the same position.
    Replaced,
    /// Incoming revision is older than the stored one; nothing changed.
    Stale { stored: u64, incoming: u64 },
}

/// Serializable view of the whole store, in display order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub meetings: Vec<MeetingSummary>,
    pub tasks: Vec<TaskNode>,
}

/// The session-scoped store. Construct one per session and hand it to
/// whatever needs it.
#[derive(Debug, Clone, Default)]
pub struct MeetingStore {
    meetings: OrderedIndex<MeetingSummary>,
    tasks: OrderedIndex<TaskNode>,
}

impl MeetingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store already initialized from `seed`.
    pub fn from_snapshot_meetings(seed: Vec<MeetingSummary>) -> Self {
        let mut store = Self::new();
        store.initialize(seed);
        store
    }

    /// Replace all content with `seed`, keeping the seed's meeting order.
    ///
    /// Tasks are indexed meeting by meeting; when two meetings carry the same
    /// task id the later value wins but the first-seen slot is kept.
    pub fn initialize(&mut self, seed: Vec<MeetingSummary>) {
        self.reset();
        for meeting in seed {
            for task in &meeting.tasks {
                self.tasks
                    .upsert_preserving_position(task.id.clone(), task.clone());
            }
            // A duplicated meeting id in the seed collapses onto its first slot.
            self.meetings
                .upsert_preserving_position(meeting.id.clone(), meeting);
        }
        tracing::debug!(
            meetings = self.meetings.len(),
            tasks = self.tasks.len(),
            "store initialized"
        );
    }

    /// Drop every meeting and task.
    pub fn reset(&mut self) {
        self.meetings.clear();
        self.tasks.clear();
    }

    /// Merge one analyzed meeting, unconditionally.
    ///
    /// A known meeting id is replaced in place, an unknown one goes to the
    /// front. Every task is upserted into the task index without moving
    /// existing ids. The last call for a given id always wins.
    pub fn add_meeting(&mut self, meeting: MeetingSummary) -> MergeOutcome {
        for task in &meeting.tasks {
            self.tasks
                .upsert_preserving_position(task.id.clone(), task.clone());
        }

        let meeting_id = meeting.id.clone();
        let task_count = meeting.tasks.len();
        let outcome = match self.meetings.upsert_to_front(meeting_id.clone(), meeting) {
            Some(_) => MergeOutcome::Replaced,
            None => MergeOutcome::Inserted,
        };
        tracing::debug!(
            meeting_id = %meeting_id,
            tasks = task_count,
            outcome = ?outcome,
            "meeting merged"
        );
        outcome
    }

    /// Like [`Self::add_meeting`], but refuses to overwrite a stored meeting
    /// whose `revision` is newer than the incoming one.
    ///
    /// When either side has no revision the merge is unconditional.
    pub fn add_meeting_checked(&mut self, meeting: MeetingSummary) -> MergeOutcome {
        let stored = self.meetings.get(&meeting.id).and_then(|m| m.revision);
        if let (Some(stored), Some(incoming)) = (stored, meeting.revision) {
            if incoming < stored {
                tracing::warn!(
                    meeting_id = %meeting.id,
                    stored,
                    incoming,
                    "refusing stale meeting revision"
                );
                return MergeOutcome::Stale { stored, incoming };
            }
        }
        self.add_meeting(meeting)
    }

    /// Meetings in display order (newly analyzed first).
    pub fn meetings(&self) -> impl Iterator<Item = &MeetingSummary> {
        self.meetings.values()
    }

    /// All tasks across meetings, in first-seen order.
    pub fn tasks(&self) -> impl Iterator<Item = &TaskNode> {
        self.tasks.values()
    }

    pub fn meeting(&self, id: &str) -> Option<&MeetingSummary> {
        self.meetings.get(id)
    }

    pub fn task(&self, id: &str) -> Option<&TaskNode> {
        self.tasks.get(id)
    }

    /// Number of meetings held.
    pub fn len(&self) -> usize {
        self.meetings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.meetings.is_empty()
    }

    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    /// Clone the current contents into a serializable snapshot.
    pub fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            meetings: self.meetings().cloned().collect(),
            tasks: self.tasks().cloned().collect(),
        }
    }
}
