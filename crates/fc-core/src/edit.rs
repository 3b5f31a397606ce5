//! Pure project mutations.
//!
//! Every operation borrows the current snapshot and returns the next one. A
//! user-facing rejection comes back as `Err(Rejection)` and leaves the caller's
//! snapshot untouched; silent no-ops return an unchanged copy.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{new_id, Category, InspectionStatus, ItemResult, LevelData, Photo, Project};

/// A validation failure that should be shown to the user.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum Rejection {
    /// A required name was empty after trimming.
    #[error("name cannot be empty")]
    EmptyName,
    /// A level with this name already exists.
    #[error("level `{0}` already exists")]
    DuplicateLevel(String),
    /// The project must keep at least one level.
    #[error("at least one level is required")]
    LastLevel,
    /// The level does not exist on this project.
    #[error("unknown level `{0}`")]
    UnknownLevel(String),
    /// The category does not exist on this level.
    #[error("unknown category `{0}`")]
    UnknownCategory(String),
    /// The level has no categories to log against.
    #[error("no categories found for level `{0}`")]
    NoCategories(String),
}

/// How the round counter reacts to a PASS.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RoundPolicy {
    /// Keep the highest round reached.
    #[default]
    Retain,
    /// Reset the round to zero on PASS.
    ResetOnPass,
}

/// Partial update for an item result.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct ItemPatch {
    /// Replacement notes text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Replacement photo sequence.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photos: Option<Vec<Photo>>,
}

/// Serializable description of a single edit.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Edit {
    RenameProject {
        name: String,
    },
    AddLevel {
        name: String,
    },
    DeleteLevel {
        name: String,
    },
    AddCategory {
        level: String,
        name: String,
    },
    DeleteCategory {
        level: String,
        category_id: String,
    },
    SetCategoryItems {
        level: String,
        category_id: String,
        item_names: Vec<String>,
    },
    AddQuickNote {
        text: String,
    },
    DeleteQuickNote {
        text: String,
    },
    SetItemStatus {
        level: String,
        category_id: String,
        item_name: String,
        status: InspectionStatus,
    },
    UpdateItemDetails {
        level: String,
        category_id: String,
        item_id: String,
        patch: ItemPatch,
    },
    AppendItemNote {
        level: String,
        category_id: String,
        item_id: String,
        note: String,
    },
    AddPhoto {
        level: String,
        category_id: String,
        item_id: String,
        photo: Photo,
    },
    RemovePhoto {
        level: String,
        category_id: String,
        item_id: String,
        photo_id: String,
    },
    PruneOrphans,
}

/// Apply an edit with the default round policy.
pub fn apply_edit(project: &Project, edit: &Edit) -> Result<Project, Rejection> {
    apply_edit_with(project, edit, RoundPolicy::default())
}

/// Apply an edit with an explicit round policy.
pub fn apply_edit_with(
    project: &Project,
    edit: &Edit,
    policy: RoundPolicy,
) -> Result<Project, Rejection> {
    match edit {
        Edit::RenameProject { name } => rename_project(project, name),
        Edit::AddLevel { name } => add_level(project, name),
        Edit::DeleteLevel { name } => delete_level(project, name),
        Edit::AddCategory { level, name } => add_category(project, level, name),
        Edit::DeleteCategory { level, category_id } => delete_category(project, level, category_id),
        Edit::SetCategoryItems {
            level,
            category_id,
            item_names,
        } => set_category_items(project, level, category_id, item_names),
        Edit::AddQuickNote { text } => Ok(add_quick_note(project, text)),
        Edit::DeleteQuickNote { text } => Ok(delete_quick_note(project, text)),
        Edit::SetItemStatus {
            level,
            category_id,
            item_name,
            status,
        } => set_item_status(project, level, category_id, item_name, *status, policy),
        Edit::UpdateItemDetails {
            level,
            category_id,
            item_id,
            patch,
        } => Ok(update_item_details(project, level, category_id, item_id, patch)),
        Edit::AppendItemNote {
            level,
            category_id,
            item_id,
            note,
        } => Ok(append_item_note(project, level, category_id, item_id, note)),
        Edit::AddPhoto {
            level,
            category_id,
            item_id,
            photo,
        } => Ok(add_photo(project, level, category_id, item_id, photo.clone())),
        Edit::RemovePhoto {
            level,
            category_id,
            item_id,
            photo_id,
        } => Ok(remove_photo(project, level, category_id, item_id, photo_id)),
        Edit::PruneOrphans => Ok(prune_orphans(project)),
    }
}

/// Apply an edit, keeping the old snapshot when it is rejected.
pub fn apply_or_keep(
    project: &Project,
    edit: &Edit,
    policy: RoundPolicy,
) -> (Project, Option<Rejection>) {
    match apply_edit_with(project, edit, policy) {
        Ok(next) => (next, None),
        Err(rejection) => (project.clone(), Some(rejection)),
    }
}

pub fn rename_project(project: &Project, name: &str) -> Result<Project, Rejection> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Rejection::EmptyName);
    }
    let mut next = project.clone();
    next.name = name.to_string();
    Ok(next)
}

/// Append a level with an empty category list and data map.
pub fn add_level(project: &Project, name: &str) -> Result<Project, Rejection> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Rejection::EmptyName);
    }
    if project.has_level(name) {
        return Err(Rejection::DuplicateLevel(name.to_string()));
    }
    let mut next = project.clone();
    next.levels.push(name.to_string());
    next.level_categories.insert(name.to_string(), Vec::new());
    next.level_data.insert(name.to_string(), LevelData::new());
    Ok(next)
}

/// Remove a level with its categories and recorded results.
pub fn delete_level(project: &Project, name: &str) -> Result<Project, Rejection> {
    if !project.has_level(name) {
        return Err(Rejection::UnknownLevel(name.to_string()));
    }
    if project.levels.len() <= 1 {
        return Err(Rejection::LastLevel);
    }
    let mut next = project.clone();
    next.levels.retain(|level| level != name);
    next.level_categories.remove(name);
    next.level_data.remove(name);
    Ok(next)
}

/// Append an empty category. An empty name is ignored.
pub fn add_category(project: &Project, level: &str, name: &str) -> Result<Project, Rejection> {
    if !project.has_level(level) {
        return Err(Rejection::UnknownLevel(level.to_string()));
    }
    let name = name.trim();
    if name.is_empty() {
        return Ok(project.clone());
    }
    let mut next = project.clone();
    next.level_categories
        .entry(level.to_string())
        .or_default()
        .push(Category::new(name));
    Ok(next)
}

/// Remove a category definition. Its recorded results are retained.
pub fn delete_category(
    project: &Project,
    level: &str,
    category_id: &str,
) -> Result<Project, Rejection> {
    if !project.has_level(level) {
        return Err(Rejection::UnknownLevel(level.to_string()));
    }
    let mut next = project.clone();
    if let Some(categories) = next.level_categories.get_mut(level) {
        categories.retain(|category| category.id != category_id);
    }
    Ok(next)
}

/// Split multi-line input into template item names, dropping blank lines.
pub fn parse_item_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Replace a category's template items. Recorded results are not touched.
pub fn set_category_items(
    project: &Project,
    level: &str,
    category_id: &str,
    item_names: &[String],
) -> Result<Project, Rejection> {
    if project.category(level, category_id).is_none() {
        return Err(unknown_target(project, level, category_id));
    }
    let names: Vec<String> = item_names
        .iter()
        .map(|name| name.trim())
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect();
    let mut next = project.clone();
    if let Some(category) = next
        .level_categories
        .get_mut(level)
        .and_then(|categories| categories.iter_mut().find(|category| category.id == category_id))
    {
        category.item_names = names;
    }
    Ok(next)
}

/// Insert a quick note if it is not already present.
pub fn add_quick_note(project: &Project, text: &str) -> Project {
    let text = text.trim();
    let mut next = project.clone();
    if !text.is_empty() && !next.quick_notes.iter().any(|note| note == text) {
        next.quick_notes.push(text.to_string());
    }
    next
}

/// Remove a quick note by exact match.
pub fn delete_quick_note(project: &Project, text: &str) -> Project {
    let mut next = project.clone();
    next.quick_notes.retain(|note| note != text);
    next
}

/// Record a status for a template item, driving the escalation round.
///
/// `Unset -> Fail(1)`, `Fail(r) -> Fail(r + 1)`, `Pass(r) -> Fail(max(r, 1))`.
/// PASS leaves the round alone unless the policy resets it.
pub fn set_item_status(
    project: &Project,
    level: &str,
    category_id: &str,
    item_name: &str,
    status: InspectionStatus,
    policy: RoundPolicy,
) -> Result<Project, Rejection> {
    if project.category(level, category_id).is_none() {
        return Err(unknown_target(project, level, category_id));
    }
    let item_name = item_name.trim();
    if item_name.is_empty() {
        return Err(Rejection::EmptyName);
    }

    let mut next = project.clone();
    let results = next
        .level_data
        .entry(level.to_string())
        .or_default()
        .entry(category_id.to_string())
        .or_default();

    match results.iter().position(|result| result.name == item_name) {
        Some(index) => {
            let result = &mut results[index];
            result.round = next_round(result, status, policy);
            result.status = status;
        }
        None => results.push(ItemResult {
            id: new_id(),
            name: item_name.to_string(),
            status,
            round: u32::from(status == InspectionStatus::Fail),
            notes: String::new(),
            photos: Vec::new(),
        }),
    }
    Ok(next)
}

fn next_round(previous: &ItemResult, status: InspectionStatus, policy: RoundPolicy) -> u32 {
    match (previous.status, status) {
        (InspectionStatus::Fail, InspectionStatus::Fail) => previous.round.saturating_add(1),
        (_, InspectionStatus::Fail) => previous.round.max(1),
        (_, InspectionStatus::Pass) if policy == RoundPolicy::ResetOnPass => 0,
        _ => previous.round,
    }
}

/// Merge fields onto the result with `item_id`. Missing targets are ignored.
pub fn update_item_details(
    project: &Project,
    level: &str,
    category_id: &str,
    item_id: &str,
    patch: &ItemPatch,
) -> Project {
    let mut next = project.clone();
    if let Some(result) = find_result_mut(&mut next, level, category_id, item_id) {
        if let Some(notes) = &patch.notes {
            result.notes.clone_from(notes);
        }
        if let Some(photos) = &patch.photos {
            result.photos.clone_from(photos);
        }
    }
    next
}

/// Append a quick note to an item's notes on a new line.
pub fn append_item_note(
    project: &Project,
    level: &str,
    category_id: &str,
    item_id: &str,
    note: &str,
) -> Project {
    let Some(result) = find_result(project, level, category_id, item_id) else {
        return project.clone();
    };
    let notes = if result.notes.is_empty() {
        note.to_string()
    } else {
        format!("{}\n{note}", result.notes)
    };
    let patch = ItemPatch {
        notes: Some(notes),
        photos: None,
    };
    update_item_details(project, level, category_id, item_id, &patch)
}

/// Append a photo to an item.
pub fn add_photo(
    project: &Project,
    level: &str,
    category_id: &str,
    item_id: &str,
    photo: Photo,
) -> Project {
    let Some(result) = find_result(project, level, category_id, item_id) else {
        return project.clone();
    };
    let mut photos = result.photos.clone();
    photos.push(photo);
    let patch = ItemPatch {
        notes: None,
        photos: Some(photos),
    };
    update_item_details(project, level, category_id, item_id, &patch)
}

/// Remove a photo from an item by id.
pub fn remove_photo(
    project: &Project,
    level: &str,
    category_id: &str,
    item_id: &str,
    photo_id: &str,
) -> Project {
    let Some(result) = find_result(project, level, category_id, item_id) else {
        return project.clone();
    };
    let photos = result
        .photos
        .iter()
        .filter(|photo| photo.id != photo_id)
        .cloned()
        .collect();
    let patch = ItemPatch {
        notes: None,
        photos: Some(photos),
    };
    update_item_details(project, level, category_id, item_id, &patch)
}

/// Drop recorded results whose category no longer exists on that level.
pub fn prune_orphans(project: &Project) -> Project {
    let mut next = project.clone();
    for (level, data) in &mut next.level_data {
        let known = project.level_categories.get(level);
        data.retain(|category_id, _| {
            known.is_some_and(|categories| {
                categories.iter().any(|category| &category.id == category_id)
            })
        });
    }
    next
}

fn find_result<'a>(
    project: &'a Project,
    level: &str,
    category_id: &str,
    item_id: &str,
) -> Option<&'a ItemResult> {
    project
        .results(level, category_id)?
        .iter()
        .find(|result| result.id == item_id)
}

fn find_result_mut<'a>(
    project: &'a mut Project,
    level: &str,
    category_id: &str,
    item_id: &str,
) -> Option<&'a mut ItemResult> {
    if !project.has_level(level) {
        return None;
    }
    project
        .level_data
        .get_mut(level)?
        .get_mut(category_id)?
        .iter_mut()
        .find(|result| result.id == item_id)
}

fn unknown_target(project: &Project, level: &str, category_id: &str) -> Rejection {
    if project.has_level(level) {
        Rejection::UnknownCategory(category_id.to_string())
    } else {
        Rejection::UnknownLevel(level.to_string())
    }
}
