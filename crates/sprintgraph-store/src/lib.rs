//! In-memory model and merge store for analyzed meetings.

pub mod index;
pub mod models;
pub mod store;

pub use index::OrderedIndex;
pub use models::{MeetingSummary, RawTaskSpec, TaskNode, TaskStatus, TaskStatusParseError};
pub use store::{MeetingStore, MergeOutcome, StoreSnapshot};
