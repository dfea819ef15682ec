//! Routing of domain commands to their aggregate.
//!
//! [`Dispatcher`] is the only way commands reach the event store: it picks
//! the target stream from the command and runs it through the engine.

use crate::ids::{LabelId, TaskId};
use crate::label::{LabelCommand, LabelEvent, LabelRejection, LabelState};
use crate::task::{TaskCommand, TaskEvent, TaskRejection, TaskState};
use serde::{Deserialize, Serialize};
use std::fmt;
use tasklog::{CommandError, EventStore, RetryPolicy, execute, load_state};
use tracing::debug;

/// Every command the domain accepts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    /// Addressed to a task.
    Task(TaskCommand),
    /// Addressed to a label.
    Label(LabelCommand),
}

impl Command {
    /// The entity whose stream the command is decided against.
    pub const fn target(&self) -> EntityId {
        match self {
            Self::Task(command) => EntityId::Task(command.task_id()),
            Self::Label(command) => EntityId::Label(command.label_id()),
        }
    }
}

impl From<TaskCommand> for Command {
    fn from(command: TaskCommand) -> Self {
        Self::Task(command)
    }
}

impl From<LabelCommand> for Command {
    fn from(command: LabelCommand) -> Self {
        Self::Label(command)
    }
}

/// Identity of any entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityId {
    /// A task.
    Task(TaskId),
    /// A label.
    Label(LabelId),
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Task(id) => write!(f, "task {id}"),
            Self::Label(id) => write!(f, "label {id}"),
        }
    }
}

/// Every event the domain records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DomainEvent {
    /// Recorded on a task stream.
    Task(TaskEvent),
    /// Recorded on a label stream.
    Label(LabelEvent),
}

/// Every business-rule rejection the domain can produce.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
pub enum Rejection {
    /// A task rule was broken.
    #[error(transparent)]
    Task(#[from] TaskRejection),
    /// A label rule was broken.
    #[error(transparent)]
    Label(#[from] LabelRejection),
}

/// Failure of [`Dispatcher::dispatch`]: a rejection or an infrastructure error.
pub type DispatchError = CommandError<Rejection>;

/// Single entry point turning commands into recorded events.
///
/// Each dispatch reads the target entity's stream, decides the command
/// against the rebuilt state and appends the outcome, retrying on version
/// conflicts according to the configured [`RetryPolicy`].
#[derive(Debug)]
pub struct Dispatcher<S> {
    store: S,
    retry_policy: RetryPolicy,
}

impl<S> Dispatcher<S>
where
    S: EventStore + Sync,
{
    /// Dispatcher over `store` with the default retry policy.
    pub fn new(store: S) -> Self {
        Self {
            store,
            retry_policy: RetryPolicy::default(),
        }
    }

    /// Replace the retry policy.
    #[must_use]
    pub fn with_retry_policy(self, retry_policy: RetryPolicy) -> Self {
        Self {
            retry_policy,
            ..self
        }
    }

    /// The underlying event store.
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Decide `command` against its target's current state and record the
    /// resulting events.
    ///
    /// Returns the recorded events in append order.
    pub async fn dispatch(
        &self,
        command: impl Into<Command>,
    ) -> Result<Vec<DomainEvent>, DispatchError> {
        let command = command.into();
        debug!(entity = %command.target(), "dispatching command");

        match command {
            Command::Task(command) => execute(&self.store, command, self.retry_policy.clone())
                .await
                .map(|events| events.into_iter().map(DomainEvent::Task).collect())
                .map_err(|error| error.map_rejection(Rejection::Task)),
            Command::Label(command) => execute(&self.store, command, self.retry_policy.clone())
                .await
                .map(|events| events.into_iter().map(DomainEvent::Label).collect())
                .map_err(|error| error.map_rejection(Rejection::Label)),
        }
    }

    /// Current state of a task. Unknown tasks come back as the default state.
    pub async fn load_task(&self, task_id: TaskId) -> Result<TaskState, DispatchError> {
        let stream_id = task_id.stream_id().map_err(CommandError::InvalidStreamId)?;
        let (state, _) = load_state::<TaskState, _>(&self.store, &stream_id).await?;
        Ok(state)
    }

    /// Current state of a label. Unknown labels come back as the default state.
    pub async fn load_label(&self, label_id: LabelId) -> Result<LabelState, DispatchError> {
        let stream_id = label_id.stream_id().map_err(CommandError::InvalidStreamId)?;
        let (state, _) = load_state::<LabelState, _>(&self.store, &stream_id).await?;
        Ok(state)
    }
}
