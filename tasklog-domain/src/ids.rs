//! Entity identifiers.
//!
//! Every entity owns exactly one stream, named `<category>-<uuid>`.

use nutype::nutype;
use tasklog::{StreamId, StreamIdError};
use uuid::Uuid;

/// Stream category of task entities.
pub const TASK_STREAM_CATEGORY: &str = "task";

/// Stream category of label entities.
pub const LABEL_STREAM_CATEGORY: &str = "label";

/// Identifies a single task for its whole lifetime.
#[nutype(derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    AsRef,
    Display,
    Serialize,
    Deserialize
))]
pub struct TaskId(Uuid);

impl TaskId {
    /// A fresh, time-ordered identifier (UUIDv7).
    pub fn generate() -> Self {
        Self::new(Uuid::now_v7())
    }

    /// The stream holding this task's events.
    pub fn stream_id(&self) -> Result<StreamId, StreamIdError> {
        StreamId::for_entity(TASK_STREAM_CATEGORY, self)
    }
}

/// Identifies a single label for its whole lifetime.
#[nutype(derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    AsRef,
    Display,
    Serialize,
    Deserialize
))]
pub struct LabelId(Uuid);

impl LabelId {
    /// A fresh, time-ordered identifier (UUIDv7).
    pub fn generate() -> Self {
        Self::new(Uuid::now_v7())
    }

    /// The stream holding this label's events.
    pub fn stream_id(&self) -> Result<StreamId, StreamIdError> {
        StreamId::for_entity(LABEL_STREAM_CATEGORY, self)
    }
}
