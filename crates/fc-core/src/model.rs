//! Project entity shapes as they are stored and exchanged.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{CoreError, CoreResult};

/// Levels seeded into every new project.
pub const DEFAULT_LEVELS: [&str; 3] = ["Basement", "Main Floor", "Second Floor"];

/// Reusable deficiency tags seeded into every new project.
pub const DEFAULT_QUICK_NOTES: [&str; 7] = [
    "Missing Hardware",
    "Check Plan",
    "Incomplete",
    "Damaged",
    "Wrong Material",
    "Safety Violation",
    "Needs Cleaning",
];

/// Generate a fresh opaque identifier.
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Recorded outcome of a single checklist item.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InspectionStatus {
    /// The item passed inspection.
    Pass,
    /// Work is underway; never set by the inspector itself.
    InProgress,
    /// The item failed inspection.
    Fail,
}

impl InspectionStatus {
    /// Short label used by front ends and reports.
    pub fn label(self) -> &'static str {
        match self {
            Self::Pass => "PASS",
            Self::InProgress => "IN PROGRESS",
            Self::Fail => "FAIL",
        }
    }
}

/// Display tier derived from an item's round counter. Never stored.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Escalation {
    /// First failure or never failed.
    None,
    /// Failed on a second walk.
    Repeat,
    /// Failed on three or more walks.
    Critical,
}

impl Escalation {
    /// Classify a round counter.
    pub fn for_round(round: u32) -> Self {
        match round {
            0 | 1 => Self::None,
            2 => Self::Repeat,
            _ => Self::Critical,
        }
    }
}

/// An embedded photo attached to an item result.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct Photo {
    /// Unique identifier.
    pub id: String,
    /// Embedded image as a `data:` URL.
    pub url: String,
    /// Caption fixed at capture time.
    pub label: String,
}

impl Photo {
    /// Create a photo with a fresh id.
    pub fn new(url: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            url: url.into(),
            label: label.into(),
        }
    }

    /// Caption in the `<level> - <category> - <Mon dd, yyyy>` form.
    pub fn caption(level: &str, category: &str, taken: chrono::NaiveDate) -> String {
        format!("{level} - {category} - {}", taken.format("%b %d, %Y"))
    }
}

/// The recorded result for one checklist item within one category and level.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct ItemResult {
    /// Unique identifier.
    pub id: String,
    /// Item label, matching a template name of the category.
    pub name: String,
    /// Latest recorded status.
    pub status: InspectionStatus,
    /// Escalation round counter.
    #[serde(default)]
    pub round: u32,
    /// Free-text deficiency description.
    #[serde(default)]
    pub notes: String,
    /// Attached photos, in capture order.
    #[serde(default)]
    pub photos: Vec<Photo>,
}

impl ItemResult {
    /// Display tier for this result.
    pub fn escalation(&self) -> Escalation {
        Escalation::for_round(self.round)
    }

    /// Whether the item is currently failing.
    pub fn is_failing(&self) -> bool {
        self.status == InspectionStatus::Fail
    }
}

/// A named checklist template scoped to one level.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    /// Unique identifier within the level.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Template item labels, in display order.
    #[serde(default)]
    pub item_names: Vec<String>,
}

impl Category {
    /// Create an empty category with a fresh id.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            name: name.into(),
            item_names: Vec::new(),
        }
    }

    /// The two seeded categories every default level starts with.
    pub fn defaults() -> Vec<Category> {
        vec![
            Category {
                id: "1".into(),
                name: "Framing".into(),
                item_names: vec!["Wall Studs".into(), "Top Plate".into(), "Headers".into()],
            },
            Category {
                id: "2".into(),
                name: "Electrical".into(),
                item_names: vec!["Rough-in".into(), "Panel Box".into(), "Outlets".into()],
            },
        ]
    }
}

/// Results for one level, keyed by category id.
pub type LevelData = BTreeMap<String, Vec<ItemResult>>;

/// The top-level aggregate.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    /// Unique identifier, fixed at creation.
    pub id: String,
    /// Human label.
    pub name: String,
    /// Level names in display order.
    pub levels: Vec<String>,
    /// Category templates per level.
    pub level_categories: BTreeMap<String, Vec<Category>>,
    /// Recorded results per level and category id.
    pub level_data: BTreeMap<String, LevelData>,
    /// Reusable deficiency tags in display order.
    pub quick_notes: Vec<String>,
}

impl Project {
    /// Create a project with the default skeleton.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_id(new_id(), name)
    }

    /// Create a project with the default skeleton and a known id.
    pub fn with_id(id: impl Into<String>, name: impl Into<String>) -> Self {
        let levels: Vec<String> = DEFAULT_LEVELS.iter().map(|level| (*level).to_string()).collect();
        let level_categories = seed_categories(&levels, &Category::defaults());
        let level_data = levels
            .iter()
            .map(|level| (level.clone(), LevelData::new()))
            .collect();
        Self {
            id: id.into(),
            name: name.into(),
            levels,
            level_categories,
            level_data,
            quick_notes: DEFAULT_QUICK_NOTES.iter().map(|note| (*note).to_string()).collect(),
        }
    }

    /// Whether the level exists.
    pub fn has_level(&self, level: &str) -> bool {
        self.levels.iter().any(|candidate| candidate == level)
    }

    /// Categories configured for a level.
    pub fn categories(&self, level: &str) -> Option<&[Category]> {
        if !self.has_level(level) {
            return None;
        }
        self.level_categories.get(level).map(Vec::as_slice)
    }

    /// A single category on a level.
    pub fn category(&self, level: &str, category_id: &str) -> Option<&Category> {
        self.categories(level)?
            .iter()
            .find(|category| category.id == category_id)
    }

    /// Recorded results for a category, if any were ever recorded.
    pub fn results(&self, level: &str, category_id: &str) -> Option<&[ItemResult]> {
        if !self.has_level(level) {
            return None;
        }
        self.level_data
            .get(level)?
            .get(category_id)
            .map(Vec::as_slice)
    }

    /// The recorded result for a template item, matched by name.
    pub fn result_for(
        &self,
        level: &str,
        category_id: &str,
        item_name: &str,
    ) -> Option<&ItemResult> {
        self.results(level, category_id)?
            .iter()
            .find(|result| result.name == item_name)
    }

    /// Number of failing results across reachable categories of a level.
    pub fn level_deficiencies(&self, level: &str) -> usize {
        self.categories(level)
            .unwrap_or_default()
            .iter()
            .filter_map(|category| self.results(level, &category.id))
            .flatten()
            .filter(|result| result.is_failing())
            .count()
    }

    /// Number of failing results across every stored level entry.
    pub fn total_deficiencies(&self) -> usize {
        self.level_data
            .values()
            .flat_map(BTreeMap::values)
            .flatten()
            .filter(|result| result.is_failing())
            .count()
    }

    /// Check the structural invariants every stored project must satisfy.
    pub fn validate(&self) -> CoreResult<()> {
        if self.levels.is_empty() {
            return Err(CoreError::Validation("project has no levels".into()));
        }
        for (index, level) in self.levels.iter().enumerate() {
            if self.levels[..index].contains(level) {
                return Err(CoreError::Validation(format!("duplicate level `{level}`")));
            }
            if !self.level_categories.contains_key(level) {
                return Err(CoreError::Validation(format!(
                    "level `{level}` has no category list"
                )));
            }
            if !self.level_data.contains_key(level) {
                return Err(CoreError::Validation(format!("level `{level}` has no data map")));
            }
        }
        for (index, note) in self.quick_notes.iter().enumerate() {
            if self.quick_notes[..index].contains(note) {
                return Err(CoreError::Validation(format!("duplicate quick note `{note}`")));
            }
        }
        Ok(())
    }
}

/// Deep-copy a category template into an independent list per level.
pub fn seed_categories(
    levels: &[String],
    template: &[Category],
) -> BTreeMap<String, Vec<Category>> {
    levels
        .iter()
        .map(|level| (level.clone(), template.to_vec()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_project_has_default_skeleton() {
        let project = Project::new("Oak St");
        assert_eq!(project.levels, vec!["Basement", "Main Floor", "Second Floor"]);
        assert_eq!(project.quick_notes.len(), DEFAULT_QUICK_NOTES.len());
        for level in &project.levels {
            let categories = project.categories(level).expect("categories");
            let names: Vec<_> = categories.iter().map(|c| c.name.as_str()).collect();
            assert_eq!(names, vec!["Framing", "Electrical"]);
            assert!(project.level_data[level].is_empty());
        }
        project.validate().expect("valid skeleton");
    }

    #[test]
    fn seeded_levels_do_not_share_templates() {
        let mut project = Project::new("Oak St");
        project
            .level_categories
            .get_mut("Basement")
            .expect("basement")[0]
            .item_names
            .push("Sill Plate".into());
        assert_eq!(project.level_categories["Main Floor"][0].item_names.len(), 3);
        assert_eq!(project.level_categories["Basement"][0].item_names.len(), 4);
    }

    #[test]
    fn accessors_report_absence_instead_of_panicking() {
        let project = Project::new("Oak St");
        assert!(project.categories("Attic").is_none());
        assert!(project.category("Basement", "missing").is_none());
        assert!(project.results("Basement", "1").is_none());
        assert!(project.result_for("Attic", "1", "Wall Studs").is_none());
    }

    #[test]
    fn escalation_tiers_follow_round() {
        assert_eq!(Escalation::for_round(0), Escalation::None);
        assert_eq!(Escalation::for_round(1), Escalation::None);
        assert_eq!(Escalation::for_round(2), Escalation::Repeat);
        assert_eq!(Escalation::for_round(3), Escalation::Critical);
        assert_eq!(Escalation::for_round(9), Escalation::Critical);
    }

    #[test]
    fn status_uses_stored_spelling() {
        let json = serde_json::to_string(&InspectionStatus::InProgress).expect("json");
        assert_eq!(json, "\"IN_PROGRESS\"");
    }

    #[test]
    fn photo_caption_format() {
        let date = chrono::NaiveDate::from_ymd_opt(2024, 3, 7).expect("date");
        assert_eq!(
            Photo::caption("Main Floor", "Framing", date),
            "Main Floor - Framing - Mar 07, 2024"
        );
    }

    #[test]
    fn validate_rejects_missing_level_entries() {
        let mut project = Project::new("Oak St");
        project.level_data.remove("Basement");
        assert!(matches!(project.validate(), Err(CoreError::Validation(_))));
    }
}
