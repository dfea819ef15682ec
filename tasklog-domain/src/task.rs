//! Task aggregate: events, state, commands and the rules between them.
//!
//! A task is created either as a draft or directly as a finalized task.
//! Drafts can be finalized, finalized tasks completed, and any created task
//! deleted. Description and priority edits are guarded by an optimistic
//! "expected previous value" check.

use crate::ids::TaskId;
use crate::values::{TaskDescription, TaskPriority};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tasklog::mismatch::{self, ValueMismatch};
use tasklog::{Aggregate, CommandLogic, Event, NewEvents, StreamId, StreamIdError};

/// Minimum number of characters (Unicode scalar values) in a task description.
pub const MIN_DESCRIPTION_LENGTH: usize = 3;

/// Where a task is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TaskStatus {
    /// No event has been recorded for the task yet.
    #[default]
    Undefined,
    /// Created via `CreateDraft`.
    Draft,
    /// Created via `CreateBasicTask` or finalized from a draft.
    Finalized,
    /// Finalized and then completed.
    Completed,
    /// Removed. No further command is accepted.
    Deleted,
}

impl TaskStatus {
    /// Whether description and priority may still be changed.
    pub const fn is_editable(self) -> bool {
        matches!(self, Self::Draft | Self::Finalized)
    }
}

/// Facts recorded on a task's stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TaskEvent {
    /// A finalized task was created with a description.
    TaskCreated {
        /// The new task.
        task_id: TaskId,
        /// Its initial description.
        description: TaskDescription,
    },
    /// A draft was opened. `created_at` is taken when the command is handled.
    TaskDraftCreated {
        /// The new task.
        task_id: TaskId,
        /// When the draft was opened.
        created_at: DateTime<Utc>,
    },
    /// The description was replaced.
    TaskDescriptionUpdated {
        /// The edited task.
        task_id: TaskId,
        /// Description before the edit; `None` for a draft that had none.
        previous: Option<TaskDescription>,
        /// Description after the edit.
        new: TaskDescription,
    },
    /// The priority was changed.
    TaskPriorityUpdated {
        /// The edited task.
        task_id: TaskId,
        /// Priority before the edit.
        previous: TaskPriority,
        /// Priority after the edit.
        new: TaskPriority,
    },
    /// A draft became a finalized task.
    TaskDraftFinalized {
        /// The finalized task.
        task_id: TaskId,
    },
    /// The task was completed.
    TaskCompleted {
        /// The completed task.
        task_id: TaskId,
    },
    /// The task was deleted.
    TaskDeleted {
        /// The deleted task.
        task_id: TaskId,
    },
}

impl Event for TaskEvent {
    fn event_type_name(&self) -> &'static str {
        match self {
            Self::TaskCreated { .. } => "TaskCreated",
            Self::TaskDraftCreated { .. } => "TaskDraftCreated",
            Self::TaskDescriptionUpdated { .. } => "TaskDescriptionUpdated",
            Self::TaskPriorityUpdated { .. } => "TaskPriorityUpdated",
            Self::TaskDraftFinalized { .. } => "TaskDraftFinalized",
            Self::TaskCompleted { .. } => "TaskCompleted",
            Self::TaskDeleted { .. } => "TaskDeleted",
        }
    }
}

/// Current state of a task, rebuilt from its events.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TaskState {
    id: Option<TaskId>,
    status: TaskStatus,
    description: Option<TaskDescription>,
    priority: TaskPriority,
    draft_created_at: Option<DateTime<Utc>>,
}

impl TaskState {
    /// The task's id, once created.
    pub const fn id(&self) -> Option<TaskId> {
        self.id
    }

    /// Lifecycle position; `Undefined` until the first event.
    pub const fn status(&self) -> TaskStatus {
        self.status
    }

    /// Drafts have no description until one is set.
    pub const fn description(&self) -> Option<&TaskDescription> {
        self.description.as_ref()
    }

    /// Current priority, `Normal` unless changed.
    pub const fn priority(&self) -> TaskPriority {
        self.priority
    }

    /// When the task was opened as a draft, if it was.
    pub const fn draft_created_at(&self) -> Option<DateTime<Utc>> {
        self.draft_created_at
    }
}

impl Aggregate for TaskState {
    type Event = TaskEvent;

    fn apply(self, event: &Self::Event) -> Self {
        match event {
            TaskEvent::TaskCreated {
                task_id,
                description,
            } => Self {
                id: Some(*task_id),
                status: TaskStatus::Finalized,
                description: Some(description.clone()),
                ..self
            },
            TaskEvent::TaskDraftCreated {
                task_id,
                created_at,
            } => Self {
                id: Some(*task_id),
                status: TaskStatus::Draft,
                draft_created_at: Some(*created_at),
                ..self
            },
            TaskEvent::TaskDescriptionUpdated { new, .. } => Self {
                description: Some(new.clone()),
                ..self
            },
            TaskEvent::TaskPriorityUpdated { new, .. } => Self {
                priority: *new,
                ..self
            },
            TaskEvent::TaskDraftFinalized { .. } => Self {
                status: TaskStatus::Finalized,
                ..self
            },
            TaskEvent::TaskCompleted { .. } => Self {
                status: TaskStatus::Completed,
                ..self
            },
            TaskEvent::TaskDeleted { .. } => Self {
                status: TaskStatus::Deleted,
                ..self
            },
        }
    }
}

/// Requests addressed to a single task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TaskCommand {
    /// Create a finalized task in one step.
    CreateBasicTask {
        /// Id of the task to create.
        task_id: TaskId,
        /// Initial description.
        description: TaskDescription,
    },
    /// Open a draft for a task that does not exist yet.
    CreateDraft {
        /// Id of the task to create.
        task_id: TaskId,
    },
    /// Replace the description, asserting the current one.
    UpdateTaskDescription {
        /// Target task.
        task_id: TaskId,
        /// The description the caller believes is current.
        previous: Option<TaskDescription>,
        /// Replacement description.
        new: TaskDescription,
    },
    /// Replace the priority, asserting the current one.
    UpdateTaskPriority {
        /// Target task.
        task_id: TaskId,
        /// The priority the caller believes is current.
        previous: TaskPriority,
        /// Replacement priority.
        new: TaskPriority,
    },
    /// Turn a draft into a finalized task.
    FinalizeDraft {
        /// Target task.
        task_id: TaskId,
    },
    /// Complete a finalized task.
    CompleteTask {
        /// Target task.
        task_id: TaskId,
    },
    /// Delete a draft, finalized or completed task.
    DeleteTask {
        /// Target task.
        task_id: TaskId,
    },
}

impl TaskCommand {
    /// The task this command is addressed to.
    pub const fn task_id(&self) -> TaskId {
        match self {
            Self::CreateBasicTask { task_id, .. }
            | Self::CreateDraft { task_id }
            | Self::UpdateTaskDescription { task_id, .. }
            | Self::UpdateTaskPriority { task_id, .. }
            | Self::FinalizeDraft { task_id }
            | Self::CompleteTask { task_id }
            | Self::DeleteTask { task_id } => *task_id,
        }
    }
}

/// Business rules a task command can break.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
///
/// Every variant names the task it concerns. Status-based rejections carry
/// the status the task was in, mismatch rejections the full
/// [`ValueMismatch`] so the caller can resubmit against the actual value.
pub enum TaskRejection {
    /// `CreateDraft` for a task that already has events.
    #[error("cannot create draft: task {task_id} already exists")]
    CannotCreateDraft {
        /// Target task.
        task_id: TaskId,
    },

    /// `CreateBasicTask` with a description below the minimum length.
    #[error(
        "cannot create task {task_id}: description must be at least {min} characters",
        min = MIN_DESCRIPTION_LENGTH
    )]
    CannotCreateTaskWithInappropriateDescription {
        /// Target task.
        task_id: TaskId,
    },

    /// `CreateBasicTask` for a task that already has events.
    #[error("task {task_id} already exists")]
    TaskAlreadyExists {
        /// Target task.
        task_id: TaskId,
    },

    /// An edit to a task that is not a draft or finalized.
    #[error("task {task_id} cannot be edited while {status:?}")]
    TaskNotEditable {
        /// Target task.
        task_id: TaskId,
        /// Status at the time of the command.
        status: TaskStatus,
    },

    /// `UpdateTaskDescription` with a replacement below the minimum length.
    #[error(
        "cannot update task {task_id}: description must be at least {min} characters",
        min = MIN_DESCRIPTION_LENGTH
    )]
    CannotUpdateTaskWithInappropriateDescription {
        /// Target task.
        task_id: TaskId,
    },

    /// The asserted previous description is not the current one.
    #[error("cannot update description of task {task_id}: {mismatch}")]
    CannotUpdateTaskDescription {
        /// Target task.
        task_id: TaskId,
        /// Asserted, actual and requested descriptions.
        mismatch: ValueMismatch<Option<TaskDescription>>,
    },

    /// The asserted previous priority is not the current one.
    #[error("cannot update priority of task {task_id}: {mismatch}")]
    CannotUpdateTaskPriority {
        /// Target task.
        task_id: TaskId,
        /// Asserted, actual and requested priorities.
        mismatch: ValueMismatch<TaskPriority>,
    },

    /// `FinalizeDraft` on anything but a draft.
    #[error("cannot finalize task {task_id}: it is {status:?}, not a draft")]
    CannotFinalizeDraft {
        /// Target task.
        task_id: TaskId,
        /// Status at the time of the command.
        status: TaskStatus,
    },

    /// `CompleteTask` on anything but a finalized task.
    #[error("cannot complete task {task_id} while {status:?}")]
    CannotCompleteTask {
        /// Target task.
        task_id: TaskId,
        /// Status at the time of the command.
        status: TaskStatus,
    },

    /// `DeleteTask` on a task that was never created or is already deleted.
    #[error("cannot delete task {task_id} while {status:?}")]
    CannotDeleteTask {
        /// Target task.
        task_id: TaskId,
        /// Status at the time of the command.
        status: TaskStatus,
    },
}

/// A draft may only be opened for a task that does not exist yet.
pub const fn is_valid_create_draft_command(status: TaskStatus) -> bool {
    matches!(status, TaskStatus::Undefined)
}

/// Whether a description meets the minimum-length policy.
pub fn has_appropriate_length(description: &TaskDescription) -> bool {
    description.char_count() >= MIN_DESCRIPTION_LENGTH
}

/// Length check applied when creating a finalized task.
///
/// [`TaskDescription`] trims surrounding whitespace on construction, so the
/// minimum applies to the trimmed text: `" ab "` is too short, and `"abc  "`
/// passes and is stored as `"abc"`.
pub fn validate_create_basic_task(
    task_id: TaskId,
    description: &TaskDescription,
) -> Result<(), TaskRejection> {
    if has_appropriate_length(description) {
        Ok(())
    } else {
        Err(TaskRejection::CannotCreateTaskWithInappropriateDescription { task_id })
    }
}

impl CommandLogic for TaskCommand {
    type State = TaskState;
    type Event = TaskEvent;
    type Rejection = TaskRejection;

    fn stream_id(&self) -> Result<StreamId, StreamIdError> {
        self.task_id().stream_id()
    }

    fn handle(&self, state: Self::State) -> Result<NewEvents<Self::Event>, Self::Rejection> {
        match self {
            Self::CreateBasicTask {
                task_id,
                description,
            } => create_basic_task(&state, *task_id, description),
            Self::CreateDraft { task_id } => create_draft(&state, *task_id),
            Self::UpdateTaskDescription {
                task_id,
                previous,
                new,
            } => update_description(&state, *task_id, previous.as_ref(), new),
            Self::UpdateTaskPriority {
                task_id,
                previous,
                new,
            } => update_priority(&state, *task_id, *previous, *new),
            Self::FinalizeDraft { task_id } => finalize_draft(&state, *task_id),
            Self::CompleteTask { task_id } => complete(&state, *task_id),
            Self::DeleteTask { task_id } => delete(&state, *task_id),
        }
    }
}

fn create_basic_task(
    state: &TaskState,
    task_id: TaskId,
    description: &TaskDescription,
) -> Result<NewEvents<TaskEvent>, TaskRejection> {
    if state.status != TaskStatus::Undefined {
        return Err(TaskRejection::TaskAlreadyExists { task_id });
    }
    validate_create_basic_task(task_id, description)?;

    Ok(NewEvents::single(TaskEvent::TaskCreated {
        task_id,
        description: description.clone(),
    }))
}

fn create_draft(state: &TaskState, task_id: TaskId) -> Result<NewEvents<TaskEvent>, TaskRejection> {
    if !is_valid_create_draft_command(state.status) {
        return Err(TaskRejection::CannotCreateDraft { task_id });
    }

    Ok(NewEvents::single(TaskEvent::TaskDraftCreated {
        task_id,
        created_at: Utc::now(),
    }))
}

fn ensure_editable(state: &TaskState, task_id: TaskId) -> Result<(), TaskRejection> {
    if state.status.is_editable() {
        Ok(())
    } else {
        Err(TaskRejection::TaskNotEditable {
            task_id,
            status: state.status,
        })
    }
}

fn update_description(
    state: &TaskState,
    task_id: TaskId,
    previous: Option<&TaskDescription>,
    new: &TaskDescription,
) -> Result<NewEvents<TaskEvent>, TaskRejection> {
    ensure_editable(state, task_id)?;
    if !has_appropriate_length(new) {
        return Err(TaskRejection::CannotUpdateTaskWithInappropriateDescription { task_id });
    }

    let previous = previous.cloned();
    mismatch::check(&previous, &state.description, &Some(new.clone()))
        .map_err(|mismatch| TaskRejection::CannotUpdateTaskDescription { task_id, mismatch })?;

    Ok(NewEvents::single(TaskEvent::TaskDescriptionUpdated {
        task_id,
        previous,
        new: new.clone(),
    }))
}

fn update_priority(
    state: &TaskState,
    task_id: TaskId,
    previous: TaskPriority,
    new: TaskPriority,
) -> Result<NewEvents<TaskEvent>, TaskRejection> {
    ensure_editable(state, task_id)?;
    mismatch::check(&previous, &state.priority, &new)
        .map_err(|mismatch| TaskRejection::CannotUpdateTaskPriority { task_id, mismatch })?;

    Ok(NewEvents::single(TaskEvent::TaskPriorityUpdated {
        task_id,
        previous,
        new,
    }))
}

fn finalize_draft(state: &TaskState, task_id: TaskId) -> Result<NewEvents<TaskEvent>, TaskRejection> {
    match state.status {
        TaskStatus::Draft => Ok(NewEvents::single(TaskEvent::TaskDraftFinalized { task_id })),
        status => Err(TaskRejection::CannotFinalizeDraft { task_id, status }),
    }
}

fn complete(state: &TaskState, task_id: TaskId) -> Result<NewEvents<TaskEvent>, TaskRejection> {
    match state.status {
        TaskStatus::Finalized => Ok(NewEvents::single(TaskEvent::TaskCompleted { task_id })),
        status => Err(TaskRejection::CannotCompleteTask { task_id, status }),
    }
}

fn delete(state: &TaskState, task_id: TaskId) -> Result<NewEvents<TaskEvent>, TaskRejection> {
    match state.status {
        TaskStatus::Draft | TaskStatus::Finalized | TaskStatus::Completed => {
            Ok(NewEvents::single(TaskEvent::TaskDeleted { task_id }))
        }
        status @ (TaskStatus::Undefined | TaskStatus::Deleted) => {
            Err(TaskRejection::CannotDeleteTask { task_id, status })
        }
    }
}
