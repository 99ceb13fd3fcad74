use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::id::RecordId;
use crate::temporal::{self, Timestamp};

/// A stored task record.
///
/// Invariants upheld by every constructor and by [`Task::apply`]:
/// - `title` and `description` are non-blank.
/// - `updated_at >= created_at`.
/// - `completed_at` never goes from `Some` back to `None`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Task {
    pub id: RecordId,
    pub title: String,
    pub description: String,
    pub completed_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Task {
    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }

    /// Merge `patch` over this record and refresh `updated_at`.
    ///
    /// The patch must already be validated. Fields the patch leaves unset
    /// keep their prior values.
    pub fn apply(&mut self, patch: &TaskPatch) {
        if let Some(title) = &patch.title {
            self.title.clone_from(title);
        }
        if let Some(description) = &patch.description {
            self.description.clone_from(description);
        }
        if let Some(completed_at) = patch.completed_at {
            self.completed_at = Some(completed_at);
        }
        self.updated_at = temporal::advance(&self.updated_at);
    }
}

/// Input for creating a task.
///
/// The id is optional; the store assigns a generated [`RecordId`] when the
/// caller leaves it unset.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewTask {
    #[serde(default)]
    pub id: Option<RecordId>,
    pub title: String,
    pub description: String,
}

impl NewTask {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: None,
            title: title.into(),
            description: description.into(),
        }
    }

    pub fn with_id(mut self, id: RecordId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require("title", &self.title)?;
        require("description", &self.description)
    }

    /// Validate and stamp a fresh record: `completed_at` unset,
    /// `created_at == updated_at == at`.
    pub fn into_task(self, at: Timestamp) -> Result<Task, ValidationError> {
        self.validate()?;
        Ok(Task {
            id: self.id.unwrap_or_else(RecordId::generate),
            title: self.title,
            description: self.description,
            completed_at: None,
            created_at: at,
            updated_at: at,
        })
    }
}

/// The fixed set of fields an update may change.
///
/// There is deliberately no way to express "clear `completed_at`".
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TaskPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<Timestamp>,
}

impl TaskPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn completed_at(mut self, at: Timestamp) -> Self {
        self.completed_at = Some(at);
        self
    }

    /// Patch that marks a task completed now.
    pub fn complete() -> Self {
        Self::new().completed_at(temporal::now())
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none() && self.completed_at.is_none()
    }

    /// Content fields that are present must be non-blank.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(title) = &self.title {
            require("title", title)?;
        }
        if let Some(description) = &self.description {
            require("description", description)?;
        }
        Ok(())
    }
}

fn require(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::empty(field))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sample() -> Task {
        NewTask::new("A", "B").into_task(temporal::now()).unwrap()
    }

    #[test]
    fn into_task_stamps_fields() {
        let at = temporal::now();
        let task = NewTask::new("Buy milk", "at store").into_task(at).unwrap();
        assert_eq!(task.title, "Buy milk");
        assert_eq!(task.description, "at store");
        assert_eq!(task.created_at, at);
        assert_eq!(task.updated_at, at);
        assert!(!task.is_completed());
    }

    #[test]
    fn into_task_keeps_supplied_id() {
        let id = RecordId::parse("fixed").unwrap();
        let task = NewTask::new("A", "B")
            .with_id(id.clone())
            .into_task(temporal::now())
            .unwrap();
        assert_eq!(task.id, id);
    }

    #[test]
    fn blank_fields_rejected() {
        assert_eq!(
            NewTask::new("  ", "B").validate(),
            Err(ValidationError::empty("title"))
        );
        assert_eq!(
            NewTask::new("A", "").validate(),
            Err(ValidationError::empty("description"))
        );
    }

    #[test]
    fn apply_preserves_untouched_fields() {
        let mut task = sample();
        let before = task.clone();
        task.apply(&TaskPatch::new().title("C"));
        assert_eq!(task.title, "C");
        assert_eq!(task.description, "B");
        assert_eq!(task.created_at, before.created_at);
        assert!(task.updated_at > before.updated_at);
        assert!(task.completed_at.is_none());
    }

    #[test]
    fn apply_completion() {
        let mut task = sample();
        task.apply(&TaskPatch::complete());
        assert!(task.is_completed());
        task.apply(&TaskPatch::new().title("still done"));
        assert!(task.is_completed());
        assert!(task.updated_at >= task.created_at);
    }

    #[test]
    fn patch_validation() {
        assert!(TaskPatch::new().validate().is_ok());
        assert!(TaskPatch::new().is_empty());
        assert_eq!(
            TaskPatch::new().description(" ").validate(),
            Err(ValidationError::empty("description"))
        );
    }

    #[test]
    fn patch_rejects_unknown_fields() {
        let err = serde_json::from_str::<TaskPatch>(r#"{"title":"x","owner":"y"}"#);
        assert!(err.is_err());
        let ok: TaskPatch = serde_json::from_str(r#"{"title":"x"}"#).unwrap();
        assert_eq!(ok, TaskPatch::new().title("x"));
    }

    #[test]
    fn serde_roundtrip() {
        let task = sample();
        let json = serde_json::to_string(&task).unwrap();
        let parsed: Task = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, task);
    }

    proptest! {
        #[test]
        fn apply_keeps_unset_fields_and_advances(
            title in proptest::option::of("[a-zA-Z0-9 ]{1,16}"),
            description in proptest::option::of("[a-zA-Z0-9 ]{1,16}"),
            complete in any::<bool>(),
            repeats in 1usize..8,
        ) {
            let original = sample();
            let mut patch = TaskPatch::new();
            if let Some(title) = &title {
                patch = patch.title(title.clone());
            }
            if let Some(description) = &description {
                patch = patch.description(description.clone());
            }
            if complete {
                patch = patch.completed_at(temporal::now());
            }

            let mut task = original.clone();
            let mut previous = task.updated_at;
            for _ in 0..repeats {
                task.apply(&patch);
                prop_assert!(task.updated_at > previous);
                previous = task.updated_at;
            }

            prop_assert_eq!(&task.id, &original.id);
            prop_assert_eq!(task.created_at, original.created_at);
            prop_assert_eq!(&task.title, title.as_ref().unwrap_or(&original.title));
            prop_assert_eq!(&task.description, description.as_ref().unwrap_or(&original.description));
            prop_assert_eq!(task.is_completed(), complete);
        }
    }
}
