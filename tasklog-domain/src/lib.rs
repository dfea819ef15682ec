//! Task and Label aggregates for the `tasklog` engine.
//!
//! Commands enter through [`Dispatcher::dispatch`], are decided against the
//! state rebuilt from the target entity's own stream and either record new
//! events or come back as a typed [`Rejection`].
//!
//! ```rust,ignore
//! use tasklog::InMemoryEventStore;
//! use tasklog_domain::{Dispatcher, TaskCommand, TaskId};
//!
//! let dispatcher = Dispatcher::new(InMemoryEventStore::new());
//! let task_id = TaskId::generate();
//! dispatcher.dispatch(TaskCommand::CreateDraft { task_id }).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod dispatch;
mod ids;
pub mod label;
pub mod task;
mod values;

pub use dispatch::{Command, DispatchError, Dispatcher, DomainEvent, EntityId, Rejection};
pub use ids::{LABEL_STREAM_CATEGORY, LabelId, TASK_STREAM_CATEGORY, TaskId};
pub use label::{LabelCommand, LabelDetailsChange, LabelEvent, LabelRejection, LabelState};
pub use task::{
    MIN_DESCRIPTION_LENGTH, TaskCommand, TaskEvent, TaskRejection, TaskState, TaskStatus,
    is_valid_create_draft_command, validate_create_basic_task,
};
pub use tasklog::ValueMismatch;
pub use values::{LabelColor, LabelDetails, LabelTitle, TaskDescription, TaskPriority};
