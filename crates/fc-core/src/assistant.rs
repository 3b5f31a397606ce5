//! The single action exposed to a hosted voice/vision assistant.
//!
//! The assistant never edits a project directly: a logged deficiency goes
//! through the same [`set_item_status`] and [`update_item_details`] calls the
//! inspector uses.

use serde::Deserialize;
use serde_json::{json, Value};

use crate::edit::{set_item_status, update_item_details, ItemPatch, Rejection, RoundPolicy};
use crate::model::{Category, InspectionStatus, Project};

/// Function name advertised to the model.
pub const LOG_DEFICIENCY: &str = "log_deficiency";

/// Arguments of a `log_deficiency` call as sent by the model.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DeficiencyCall {
    pub item_name: String,
    #[serde(default)]
    pub notes: String,
}

/// Function declaration handed to the hosted model.
pub fn tool_declaration() -> Value {
    json!({
        "name": LOG_DEFICIENCY,
        "parameters": {
            "type": "OBJECT",
            "description": "Logs a construction deficiency found during the site walk.",
            "properties": {
                "itemName": {
                    "type": "STRING",
                    "description": "The name of the item being inspected."
                },
                "notes": {
                    "type": "STRING",
                    "description": "Details about the observed issue."
                }
            },
            "required": ["itemName", "notes"]
        }
    })
}

/// Something that can carry out a `log_deficiency` call.
pub trait DeficiencyLogger {
    /// Record a failing result and return a confirmation for the model.
    fn log_deficiency(&mut self, call: &DeficiencyCall) -> Result<String, Rejection>;
}

/// A logger bound to one project snapshot and the level being walked.
#[derive(Debug, Clone)]
pub struct LevelSession {
    project: Project,
    level: String,
    policy: RoundPolicy,
}

impl LevelSession {
    pub fn new(project: Project, level: impl Into<String>, policy: RoundPolicy) -> Self {
        Self {
            project,
            level: level.into(),
            policy,
        }
    }

    /// The latest snapshot, including every deficiency logged so far.
    pub fn project(&self) -> &Project {
        &self.project
    }

    pub fn into_project(self) -> Project {
        self.project
    }
}

impl DeficiencyLogger for LevelSession {
    fn log_deficiency(&mut self, call: &DeficiencyCall) -> Result<String, Rejection> {
        let next = log_deficiency(&self.project, &self.level, call, self.policy)?;
        self.project = next;
        Ok(format!("Successfully logged deficiency: {}", call.item_name.trim()))
    }
}

/// Mark an item as failing on `level`, matching it to the best category.
pub fn log_deficiency(
    project: &Project,
    level: &str,
    call: &DeficiencyCall,
    policy: RoundPolicy,
) -> Result<Project, Rejection> {
    let categories = project
        .categories(level)
        .ok_or_else(|| Rejection::UnknownLevel(level.to_string()))?;
    let spoken = call.item_name.trim();
    if spoken.is_empty() {
        return Err(Rejection::EmptyName);
    }
    let category = match_category(categories, spoken)
        .ok_or_else(|| Rejection::NoCategories(level.to_string()))?;
    let item_name = project
        .results(level, &category.id)
        .unwrap_or_default()
        .iter()
        .map(|result| &result.name)
        .chain(&category.item_names)
        .find(|name| name.to_lowercase() == spoken.to_lowercase())
        .map_or(spoken, String::as_str);

    let next = set_item_status(
        project,
        level,
        &category.id,
        item_name,
        InspectionStatus::Fail,
        policy,
    )?;
    let notes = call.notes.trim();
    if notes.is_empty() {
        return Ok(next);
    }
    let Some(item_id) = next
        .result_for(level, &category.id, item_name)
        .map(|result| result.id.clone())
    else {
        return Ok(next);
    };
    let patch = ItemPatch {
        notes: Some(notes.to_string()),
        photos: None,
    };
    Ok(update_item_details(&next, level, &category.id, &item_id, &patch))
}

fn match_category<'a>(categories: &'a [Category], spoken: &str) -> Option<&'a Category> {
    let spoken = spoken.to_lowercase();
    categories
        .iter()
        .find(|category| {
            category.item_names.iter().any(|name| {
                let name = name.to_lowercase();
                name.contains(&spoken) || spoken.contains(&name)
            })
        })
        .or_else(|| categories.first())
}
