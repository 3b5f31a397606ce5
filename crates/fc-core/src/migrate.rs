//! Upgrade stored project lists to the current schema.
//!
//! Older payloads are detected by missing fields; no version tag is stored.

use std::collections::BTreeMap;

use serde::Deserialize;
use tracing::warn;

use crate::model::{
    new_id, seed_categories, Category, LevelData, Project, DEFAULT_LEVELS, DEFAULT_QUICK_NOTES,
};
use crate::{CoreError, CoreResult};

/// A project in any historical shape.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredProject {
    id: Option<String>,
    #[serde(default)]
    name: String,
    /// Global category list from before categories were scoped per level.
    categories: Option<Vec<Category>>,
    levels: Option<Vec<String>>,
    level_categories: Option<BTreeMap<String, Vec<Category>>>,
    level_data: Option<BTreeMap<String, LevelData>>,
    quick_notes: Option<Vec<String>>,
}

/// Load a stored project list, degrading to an empty list on any failure.
pub fn load_projects(stored: Option<&str>) -> Vec<Project> {
    let Some(contents) = stored else {
        return Vec::new();
    };
    if contents.trim().is_empty() {
        return Vec::new();
    }
    match parse_projects(contents) {
        Ok(projects) => projects,
        Err(err) => {
            warn!(error = %err, "failed to parse stored projects; starting empty");
            Vec::new()
        }
    }
}

/// Parse and migrate a serialized project list.
pub fn parse_projects(contents: &str) -> CoreResult<Vec<Project>> {
    let stored: Vec<StoredProject> =
        serde_json::from_str(contents).map_err(|err| CoreError::Storage(err.to_string()))?;
    Ok(stored.into_iter().map(upgrade).collect())
}

fn upgrade(stored: StoredProject) -> Project {
    let mut levels: Vec<String> = Vec::new();
    for level in stored.levels.unwrap_or_default() {
        if !levels.contains(&level) {
            levels.push(level);
        }
    }
    if levels.is_empty() {
        levels = DEFAULT_LEVELS.iter().map(|level| (*level).to_string()).collect();
    }

    let mut level_data = stored.level_data.unwrap_or_default();
    for level in &levels {
        level_data.entry(level.clone()).or_default();
    }

    let mut level_categories = match stored.level_categories {
        Some(existing) => existing,
        None => {
            let template = stored.categories.unwrap_or_else(Category::defaults);
            seed_categories(&levels, &template)
        }
    };
    for level in &levels {
        level_categories.entry(level.clone()).or_default();
    }

    let quick_notes = match stored.quick_notes {
        Some(notes) => {
            let mut unique: Vec<String> = Vec::with_capacity(notes.len());
            for note in notes {
                if !unique.contains(&note) {
                    unique.push(note);
                }
            }
            unique
        }
        None => DEFAULT_QUICK_NOTES.iter().map(|note| (*note).to_string()).collect(),
    };

    Project {
        id: stored.id.unwrap_or_else(new_id),
        name: stored.name,
        levels,
        level_categories,
        level_data,
        quick_notes,
    }
}
