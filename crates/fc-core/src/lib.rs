//! Core domain entities, rules, and traits for FrameCheck.
//!
//! A [`Project`] is an immutable snapshot: every edit in [`edit`] takes the
//! current snapshot by reference and returns the next one. The caller (usually
//! a [`Workspace`]) is responsible for publishing the new snapshot.

use thiserror::Error;

pub mod assistant;
pub mod edit;
pub mod migrate;
pub mod model;
pub mod workspace;

pub use edit::{apply_edit, apply_edit_with, apply_or_keep, Edit, ItemPatch, Rejection, RoundPolicy};
pub use migrate::{load_projects, parse_projects};
pub use model::{
    new_id, Category, Escalation, InspectionStatus, ItemResult, LevelData, Photo, Project,
    DEFAULT_LEVELS, DEFAULT_QUICK_NOTES,
};
pub use workspace::Workspace;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors returned by core validation and domain rules.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Returned when a validation rule is violated.
    #[error("validation error: {0}")]
    Validation(String),
    /// Returned when repository operations fail.
    #[error("storage error: {0}")]
    Storage(String),
    /// Returned when a referenced project does not exist.
    #[error("not found: {0}")]
    NotFound(String),
}

impl From<Rejection> for CoreError {
    fn from(value: Rejection) -> Self {
        Self::Validation(value.to_string())
    }
}

/// Persistence port for the project list and the active-project pointer.
///
/// Loading never fails: unreadable or corrupt data degrades to an empty list.
pub trait ProjectStore {
    /// Load and migrate every stored project.
    fn load_projects(&self) -> Vec<Project>;
    /// Replace the stored project list.
    fn save_projects(&self, projects: &[Project]) -> CoreResult<()>;
    /// Load the id of the currently selected project.
    fn load_active_id(&self) -> CoreResult<Option<String>>;
    /// Persist the currently selected project id, clearing it on `None`.
    fn save_active_id(&self, id: Option<&str>) -> CoreResult<()>;
}
