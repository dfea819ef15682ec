//! Label aggregate.
//!
//! Labels are created with a title and the default color; afterwards title
//! and color change together through a guarded details update.

use crate::ids::LabelId;
use crate::values::{LabelDetails, LabelTitle};
use serde::{Deserialize, Serialize};
use tasklog::mismatch::{self, ValueMismatch};
use tasklog::{Aggregate, CommandLogic, Event, NewEvents, StreamId, StreamIdError};

/// Previous and new details carried by an update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelDetailsChange {
    /// Details the update was asserted against.
    pub previous: LabelDetails,
    /// Details after the update.
    pub new: LabelDetails,
}

/// Facts recorded on a label's stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum LabelEvent {
    /// Carries the title only; the color is defaulted on replay.
    LabelCreated {
        /// The created label.
        label_id: LabelId,
        /// Its title.
        title: LabelTitle,
    },
    /// Title and color were replaced.
    LabelDetailsUpdated {
        /// The edited label.
        label_id: LabelId,
        /// Details before and after.
        change: LabelDetailsChange,
    },
}

impl Event for LabelEvent {
    fn event_type_name(&self) -> &'static str {
        match self {
            Self::LabelCreated { .. } => "LabelCreated",
            Self::LabelDetailsUpdated { .. } => "LabelDetailsUpdated",
        }
    }
}

/// Current state of a label. `details` is `None` until the label is created.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LabelState {
    id: Option<LabelId>,
    details: Option<LabelDetails>,
}

impl LabelState {
    /// The label's id, once created.
    pub const fn id(&self) -> Option<LabelId> {
        self.id
    }

    /// Current title and color.
    pub const fn details(&self) -> Option<&LabelDetails> {
        self.details.as_ref()
    }

    /// Whether a `LabelCreated` has been applied.
    pub const fn exists(&self) -> bool {
        self.details.is_some()
    }
}

impl Aggregate for LabelState {
    type Event = LabelEvent;

    fn apply(self, event: &Self::Event) -> Self {
        match event {
            LabelEvent::LabelCreated { label_id, title } => Self {
                id: Some(*label_id),
                details: Some(LabelDetails::titled(title.clone())),
            },
            LabelEvent::LabelDetailsUpdated { change, .. } => Self {
                details: Some(change.new.clone()),
                ..self
            },
        }
    }
}

/// Requests addressed to a single label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum LabelCommand {
    /// Create a label with `title` and the default color. Accepted for any
    /// label id, existing or not.
    CreateBasicLabel {
        /// Id of the label to create.
        label_id: LabelId,
        /// Its title.
        title: LabelTitle,
    },
    /// Replace title and color, asserting the current details.
    UpdateLabelDetails {
        /// Target label.
        label_id: LabelId,
        /// The details the caller believes are current.
        previous: LabelDetails,
        /// Replacement details.
        new: LabelDetails,
    },
}

impl LabelCommand {
    /// The label this command is addressed to.
    pub const fn label_id(&self) -> LabelId {
        match self {
            Self::CreateBasicLabel { label_id, .. } | Self::UpdateLabelDetails { label_id, .. } => {
                *label_id
            }
        }
    }
}

/// Business rules a label command can break.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
pub enum LabelRejection {
    /// The asserted previous details differ from the label's actual details.
    #[error("cannot update details of label {label_id}: {mismatch}")]
    CannotUpdateLabelDetails {
        /// Target label.
        label_id: LabelId,
        /// Asserted, actual and requested details.
        mismatch: ValueMismatch<LabelDetails>,
    },

    /// An update to a label that was never created.
    #[error("label {label_id} does not exist")]
    LabelNotFound {
        /// Target label.
        label_id: LabelId,
    },
}

impl CommandLogic for LabelCommand {
    type State = LabelState;
    type Event = LabelEvent;
    type Rejection = LabelRejection;

    fn stream_id(&self) -> Result<StreamId, StreamIdError> {
        self.label_id().stream_id()
    }

    fn handle(&self, state: Self::State) -> Result<NewEvents<Self::Event>, Self::Rejection> {
        match self {
            Self::CreateBasicLabel { label_id, title } => {
                Ok(NewEvents::single(LabelEvent::LabelCreated {
                    label_id: *label_id,
                    title: title.clone(),
                }))
            }
            Self::UpdateLabelDetails {
                label_id,
                previous,
                new,
            } => update_details(&state, *label_id, previous, new),
        }
    }
}

fn update_details(
    state: &LabelState,
    label_id: LabelId,
    previous: &LabelDetails,
    new: &LabelDetails,
) -> Result<NewEvents<LabelEvent>, LabelRejection> {
    let actual = state
        .details()
        .ok_or(LabelRejection::LabelNotFound { label_id })?;

    mismatch::check(previous, actual, new)
        .map_err(|mismatch| LabelRejection::CannotUpdateLabelDetails { label_id, mismatch })?;

    Ok(NewEvents::single(LabelEvent::LabelDetailsUpdated {
        label_id,
        change: LabelDetailsChange {
            previous: previous.clone(),
            new: new.clone(),
        },
    }))
}
