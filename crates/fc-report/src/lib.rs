//! Deficiency report generation for FrameCheck.
//!
//! A [`Report`] lists every failing item of a project. [`paginate`] lays it out
//! on fixed-height pages and [`render_markdown`] turns the pages into a single
//! Markdown document with the photos embedded.

use std::borrow::Cow;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use fc_core::{Escalation, Photo, Project};
use fc_utils::{decode_data_url, UtilsResult};

/// Document title.
pub const REPORT_TITLE: &str = "FrameCheck Canvas Report";

const PAGE_TOP: u32 = 20;
const CONTENT_LIMIT: u32 = 250;
const PHOTO_LIMIT: u32 = 220;
const NOTE_COLUMNS: usize = 90;

/// A failing item as it appears in the report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deficiency {
    pub name: String,
    pub round: u32,
    pub notes: String,
    pub photos: Vec<Photo>,
}

impl Deficiency {
    pub fn escalation(&self) -> Escalation {
        Escalation::for_round(self.round)
    }
}

/// Failing items of one category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategorySection {
    pub name: String,
    pub items: Vec<Deficiency>,
}

/// Categories with failing items on one level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelSection {
    pub level: String,
    pub categories: Vec<CategorySection>,
}

/// Every deficiency of a project, grouped by level and category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub project_name: String,
    pub generated_at: DateTime<Utc>,
    pub levels: Vec<LevelSection>,
}

impl Report {
    /// Collect failing items in level and category display order.
    ///
    /// Results whose category was deleted are not reachable and are left out.
    pub fn build(project: &Project, generated_at: DateTime<Utc>) -> Self {
        let mut levels = Vec::new();
        for level in &project.levels {
            let categories: Vec<CategorySection> = project
                .categories(level)
                .unwrap_or_default()
                .iter()
                .filter_map(|category| {
                    let items: Vec<Deficiency> = project
                        .results(level, &category.id)
                        .unwrap_or_default()
                        .iter()
                        .filter(|result| result.is_failing())
                        .map(|result| Deficiency {
                            name: result.name.clone(),
                            round: result.round,
                            notes: result.notes.clone(),
                            photos: result.photos.clone(),
                        })
                        .collect();
                    (!items.is_empty()).then(|| CategorySection {
                        name: category.name.clone(),
                        items,
                    })
                })
                .collect();

            if let Some(data) = project.level_data.get(level) {
                for category_id in data.keys() {
                    if project.category(level, category_id).is_none() {
                        debug!(
                            level = %level,
                            category_id = %category_id,
                            "skipping results of deleted category"
                        );
                    }
                }
            }

            if !categories.is_empty() {
                levels.push(LevelSection {
                    level: level.clone(),
                    categories,
                });
            }
        }
        Self {
            project_name: project.name.clone(),
            generated_at,
            levels,
        }
    }

    /// Total number of failing items in the report.
    pub fn deficiency_count(&self) -> usize {
        self.levels
            .iter()
            .flat_map(|level| &level.categories)
            .map(|category| category.items.len())
            .sum()
    }

    /// Summary line, e.g. `3 deficiencies`.
    pub fn summary(&self) -> String {
        match self.deficiency_count() {
            1 => "1 deficiency".to_string(),
            count => format!("{count} deficiencies"),
        }
    }
}

/// A positioned element of the laid-out document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Title(String),
    Meta(String),
    Summary(String),
    LevelHeading(String),
    CategoryHeading(String),
    Item {
        name: String,
        round: u32,
        escalation: Escalation,
    },
    Notes(Vec<String>),
    Photo {
        caption: String,
        url: String,
    },
}

/// One page of the laid-out document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub number: usize,
    pub blocks: Vec<Block>,
}

struct Cursor {
    pages: Vec<Page>,
    y: u32,
}

impl Cursor {
    fn new() -> Self {
        Self {
            pages: vec![Page {
                number: 1,
                blocks: Vec::new(),
            }],
            y: PAGE_TOP,
        }
    }

    fn break_if_past(&mut self, limit: u32) {
        if self.y > limit {
            let number = self.pages.len() + 1;
            self.pages.push(Page {
                number,
                blocks: Vec::new(),
            });
            self.y = PAGE_TOP;
        }
    }

    fn place(&mut self, block: Block, height: u32) {
        if let Some(page) = self.pages.last_mut() {
            page.blocks.push(block);
        }
        self.y += height;
    }
}

/// Lay the report out on pages using millimetre offsets on an A4 sheet.
///
/// Photos that cannot be decoded are logged and left out.
pub fn paginate(report: &Report) -> Vec<Page> {
    let mut cursor = Cursor::new();
    cursor.place(Block::Title(REPORT_TITLE.to_string()), 10);
    cursor.place(Block::Meta(format!("Project: {}", report.project_name)), 7);
    cursor.place(
        Block::Meta(format!(
            "Generated: {}",
            report.generated_at.format("%Y-%m-%d %H:%M UTC")
        )),
        7,
    );
    cursor.place(Block::Summary(report.summary()), 15);

    for level in &report.levels {
        cursor.break_if_past(CONTENT_LIMIT);
        cursor.place(Block::LevelHeading(level.level.to_uppercase()), 10);

        for category in &level.categories {
            cursor.place(Block::CategoryHeading(category.name.clone()), 8);

            for item in &category.items {
                cursor.break_if_past(CONTENT_LIMIT);
                cursor.place(
                    Block::Item {
                        name: item.name.clone(),
                        round: item.round,
                        escalation: item.escalation(),
                    },
                    6,
                );

                let notes = if item.notes.trim().is_empty() {
                    "No notes"
                } else {
                    item.notes.as_str()
                };
                let lines: Vec<String> = textwrap::wrap(&format!("Notes: {notes}"), NOTE_COLUMNS)
                    .into_iter()
                    .map(Cow::into_owned)
                    .collect();
                let height = u32::try_from(lines.len()).unwrap_or(u32::MAX / 10) * 5 + 3;
                cursor.place(Block::Notes(lines), height);

                for photo in &item.photos {
                    cursor.break_if_past(PHOTO_LIMIT);
                    if let Err(err) = decode_data_url(&photo.url) {
                        warn!(
                            photo = %photo.id,
                            item = %item.name,
                            error = %err,
                            "skipping photo that could not be embedded"
                        );
                        continue;
                    }
                    cursor.place(
                        Block::Photo {
                            caption: photo.label.clone(),
                            url: photo.url.clone(),
                        },
                        75,
                    );
                }
            }
            cursor.y += 5;
        }
    }
    cursor.pages
}

/// Render laid-out pages as Markdown.
pub fn render_markdown(pages: &[Page]) -> String {
    let mut rendered_pages = Vec::with_capacity(pages.len());
    for page in pages {
        let mut blocks = vec![format!("<!-- page {} -->", page.number)];
        blocks.extend(page.blocks.iter().map(render_block));
        rendered_pages.push(blocks.join("\n\n"));
    }
    let mut document = rendered_pages.join("\n\n---\n\n");
    document.push('\n');
    document
}

fn render_block(block: &Block) -> String {
    match block {
        Block::Title(title) => format!("# {title}"),
        Block::Meta(text) => text.clone(),
        Block::Summary(text) => format!("**{text}**"),
        Block::LevelHeading(level) => format!("## {level}"),
        Block::CategoryHeading(name) => format!("### {name}"),
        Block::Item {
            name,
            round,
            escalation,
        } => {
            let tag = match escalation {
                Escalation::Critical => " `CRITICAL`",
                Escalation::Repeat => " `REPEAT`",
                Escalation::None => "",
            };
            format!("- **{name}** — Round {round}{tag}")
        }
        Block::Notes(lines) => lines
            .iter()
            .map(|line| format!("  > {line}").trim_end().to_string())
            .collect::<Vec<_>>()
            .join("\n"),
        Block::Photo { caption, url } => format!("  ![{caption}]({url})\n  *{caption}*"),
    }
}

/// Build, lay out, and render a project report in one step.
pub fn render_project(project: &Project, generated_at: DateTime<Utc>) -> String {
    let report = Report::build(project, generated_at);
    render_markdown(&paginate(&report))
}

/// File name for an exported report. Whitespace runs become `_`, as does
/// anything else outside `[A-Za-z0-9._-]`, so the name never leaves `dir`.
pub fn report_file_name(project_name: &str, generated_at: DateTime<Utc>) -> String {
    let name: String = project_name
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!(
        "FrameCheck_Report_{name}_{}.md",
        generated_at.timestamp_millis()
    )
}

/// Write a report for `project` into `dir` and return its path.
pub fn export_report(
    project: &Project,
    dir: &Path,
    generated_at: DateTime<Utc>,
) -> UtilsResult<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join(report_file_name(&project.name, generated_at));
    fs::write(&path, render_project(project, generated_at))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use fc_core::edit::{add_photo, delete_category, set_item_status, update_item_details};
    use fc_core::{InspectionStatus, ItemPatch, RoundPolicy};

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 7, 14, 5, 0).single().expect("time")
    }

    fn fail(project: &Project, level: &str, category: &str, item: &str) -> Project {
        set_item_status(project, level, category, item, InspectionStatus::Fail, RoundPolicy::Retain)
            .expect("fail")
    }

    fn item_id(project: &Project, level: &str, category: &str, item: &str) -> String {
        project
            .result_for(level, category, item)
            .expect("result")
            .id
            .clone()
    }

    #[test]
    fn empty_report_has_zero_summary_and_no_sections() {
        let project = Project::with_id("p1", "Oak St");
        let project = set_item_status(
            &project,
            "Basement",
            "1",
            "Headers",
            InspectionStatus::Pass,
            RoundPolicy::Retain,
        )
        .expect("pass");
        let markdown = render_project(&project, at());
        insta::assert_snapshot!(markdown.trim_end(), @r"
<!-- page 1 -->

# FrameCheck Canvas Report

Project: Oak St

Generated: 2024-03-07 14:05 UTC

**0 deficiencies**
");
    }

    #[test]
    fn third_failure_is_reported_as_critical() {
        let mut project = Project::with_id("p1", "Oak St");
        for _ in 0..3 {
            project = fail(&project, "Main Floor", "1", "Wall Studs");
        }
        let id = item_id(&project, "Main Floor", "1", "Wall Studs");
        let project = update_item_details(
            &project,
            "Main Floor",
            "1",
            &id,
            &ItemPatch {
                notes: Some("Split stud at grid B".into()),
                photos: None,
            },
        );

        let report = Report::build(&project, at());
        assert_eq!(report.deficiency_count(), 1);
        assert_eq!(report.levels[0].level, "Main Floor");
        assert_eq!(report.levels[0].categories[0].name, "Framing");
        assert_eq!(report.levels[0].categories[0].items[0].round, 3);

        let markdown = render_markdown(&paginate(&report));
        let level = markdown.find("## MAIN FLOOR").expect("level heading");
        let category = markdown.find("### Framing").expect("category heading");
        let item = markdown
            .find("- **Wall Studs** — Round 3 `CRITICAL`")
            .expect("item line");
        let notes = markdown.find("> Notes: Split stud at grid B").expect("notes");
        assert!(level < category && category < item && item < notes);
        assert!(markdown.contains("**1 deficiency**"));
    }

    #[test]
    fn second_round_is_marked_repeat() {
        let mut project = Project::with_id("p1", "Oak St");
        project = fail(&project, "Basement", "2", "Outlets");
        project = fail(&project, "Basement", "2", "Outlets");
        let markdown = render_project(&project, at());
        assert!(markdown.contains("- **Outlets** — Round 2 `REPEAT`"));
        assert!(markdown.contains("> Notes: No notes"));
    }

    #[test]
    fn results_of_deleted_category_are_omitted() {
        let project = fail(&Project::with_id("p1", "Oak St"), "Main Floor", "1", "Wall Studs");
        let project = delete_category(&project, "Main Floor", "1").expect("delete");
        assert_eq!(project.total_deficiencies(), 1);

        let report = Report::build(&project, at());
        assert_eq!(report.deficiency_count(), 0);
        assert!(report.levels.is_empty());
        assert!(render_markdown(&paginate(&report)).contains("**0 deficiencies**"));
    }

    #[test]
    fn long_lists_flow_onto_a_second_page() {
        let mut project = Project::with_id("p1", "Oak St");
        for index in 0..14 {
            project = fail(&project, "Main Floor", "1", &format!("Item {index:02}"));
        }
        let pages = paginate(&Report::build(&project, at()));
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[1].number, 2);
        assert!(matches!(
            &pages[1].blocks[0],
            Block::Item { name, .. } if name == "Item 13"
        ));
        let markdown = render_markdown(&pages);
        assert!(markdown.contains("---\n\n<!-- page 2 -->"));
    }

    #[test]
    fn broken_photo_is_skipped_without_aborting() {
        let project = fail(&Project::with_id("p1", "Oak St"), "Main Floor", "1", "Headers");
        let id = item_id(&project, "Main Floor", "1", "Headers");
        let good = Photo::new(
            "data:image/png;base64,iVBORw0KGgo=",
            "Main Floor - Framing - Mar 07, 2024",
        );
        let bad = Photo::new("data:image/jpeg;base64,%%%", "broken");
        let project = add_photo(&project, "Main Floor", "1", &id, bad);
        let project = add_photo(&project, "Main Floor", "1", &id, good);

        let pages = paginate(&Report::build(&project, at()));
        let photos: Vec<_> = pages
            .iter()
            .flat_map(|page| &page.blocks)
            .filter_map(|block| match block {
                Block::Photo { caption, .. } => Some(caption.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(photos, vec!["Main Floor - Framing - Mar 07, 2024"]);
    }

    #[test]
    fn file_name_replaces_whitespace() {
        assert_eq!(
            report_file_name("Oak  St Phase 2", at()),
            format!("FrameCheck_Report_Oak_St_Phase_2_{}.md", at().timestamp_millis())
        );
    }

    #[test]
    fn file_name_never_contains_path_separators() {
        let name = report_file_name("Unit 4/5 ../Oak\\St", at());
        assert_eq!(
            name,
            format!("FrameCheck_Report_Unit_4_5_.._Oak_St_{}.md", at().timestamp_millis())
        );

        let temp = tempfile::TempDir::new().expect("temp dir");
        let project = Project::with_id("p1", "Unit 4/5 Oak St");
        let path = export_report(&project, temp.path(), at()).expect("export");
        assert_eq!(path.parent(), Some(temp.path()));
        assert!(path.exists());
    }

    #[test]
    fn long_notes_wrap_at_ninety_columns() {
        let project = fail(&Project::with_id("p1", "Oak St"), "Basement", "1", "Headers");
        let id = item_id(&project, "Basement", "1", "Headers");
        let patch = ItemPatch {
            notes: Some("undersized header over the east window opening ".repeat(4)),
            photos: None,
        };
        let project = update_item_details(&project, "Basement", "1", &id, &patch);
        let pages = paginate(&Report::build(&project, at()));
        let lines = pages[0]
            .blocks
            .iter()
            .find_map(|block| match block {
                Block::Notes(lines) => Some(lines.clone()),
                _ => None,
            })
            .expect("notes");
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("Notes: undersized"));
        assert!(lines.iter().all(|line| line.chars().count() <= NOTE_COLUMNS));
    }
}
