use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use chrono::{Local, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{debug, info};

use fc_core::assistant::{DeficiencyCall, DeficiencyLogger, LevelSession};
use fc_core::edit::parse_item_lines;
use fc_core::{
    Category, CoreError, Edit, Escalation, InspectionStatus, ItemResult, Photo, Project, Workspace,
};
use fc_fs::{load_config, resolve_data_path, save_config, set_data_path, AppConfig, FsStore};
use fc_report::export_report;
use fc_sync::GistClient;
use fc_utils::{encode_data_url, image_mime_for_extension};

#[derive(Parser)]
#[command(name = "framecheck", version, about = "FrameCheck field inspection tracker")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Initialize the data directory.
    Init {
        /// Optional path to initialize the data directory at.
        #[arg(long)]
        path: Option<String>,
    },
    /// Manage projects.
    Project {
        #[command(subcommand)]
        command: ProjectCommand,
    },
    /// Manage levels of the open project.
    Level {
        #[command(subcommand)]
        command: LevelCommand,
    },
    /// Manage categories on a level.
    Category {
        #[command(subcommand)]
        command: CategoryCommand,
    },
    /// Manage reusable quick notes.
    QuickNote {
        #[command(subcommand)]
        command: QuickNoteCommand,
    },
    /// Record an inspection result for an item.
    Mark {
        /// Category id or name.
        category: String,
        /// Item name.
        item: String,
        #[arg(value_enum)]
        status: StatusArg,
        #[arg(long)]
        level: Option<String>,
    },
    /// Set or extend the notes of a recorded item.
    Notes {
        /// Category id or name.
        category: String,
        /// Item name.
        item: String,
        /// Notes text.
        text: String,
        /// Append on a new line instead of replacing.
        #[arg(long)]
        append: bool,
        #[arg(long)]
        level: Option<String>,
    },
    /// Attach or remove photos.
    Photo {
        #[command(subcommand)]
        command: PhotoCommand,
    },
    /// Drop results left behind by deleted categories.
    Prune,
    /// Export the deficiency report of the open project.
    Report {
        /// Directory to write the report into.
        #[arg(long)]
        out: Option<String>,
    },
    /// Back up or restore projects through a GitHub gist.
    Sync {
        #[command(subcommand)]
        command: SyncCommand,
    },
    /// Log a deficiency the way the live assistant does.
    Assist {
        /// Spoken item name.
        item: String,
        #[arg(long, default_value = "")]
        notes: String,
        #[arg(long)]
        level: Option<String>,
    },
}

#[derive(Subcommand)]
enum ProjectCommand {
    /// Create a project and open it.
    New { name: String },
    /// List projects.
    List,
    /// Open a project by id, id prefix, or name.
    Open { project: String },
    /// Return to the project list.
    Close,
    /// Rename the open project.
    Rename { name: String },
    /// Delete a project.
    Delete { project: String },
    /// Show the open project.
    Show,
}

#[derive(Subcommand)]
enum LevelCommand {
    Add { name: String },
    Remove { name: String },
    List,
}

#[derive(Subcommand)]
enum CategoryCommand {
    Add {
        name: String,
        #[arg(long)]
        level: Option<String>,
    },
    Remove {
        category: String,
        #[arg(long)]
        level: Option<String>,
    },
    /// Replace the template items of a category.
    Items {
        category: String,
        /// Item name; repeat for several items.
        #[arg(long = "item")]
        items: Vec<String>,
        /// Read item names from a file, one per line.
        #[arg(long)]
        file: Option<String>,
        #[arg(long)]
        level: Option<String>,
    },
    List {
        #[arg(long)]
        level: Option<String>,
    },
}

#[derive(Subcommand)]
enum QuickNoteCommand {
    Add { text: String },
    Remove { text: String },
    List,
}

#[derive(Subcommand)]
enum PhotoCommand {
    /// Attach an image file to a recorded item.
    Add {
        category: String,
        item: String,
        path: String,
        #[arg(long)]
        level: Option<String>,
    },
    Remove {
        category: String,
        item: String,
        photo_id: String,
        #[arg(long)]
        level: Option<String>,
    },
}

#[derive(Subcommand)]
enum SyncCommand {
    /// Store a GitHub token for backups.
    Login { token: String },
    /// Forget the stored token and gist id.
    Logout,
    /// Upload all projects.
    Push,
    /// Replace local projects with the backup.
    Pull,
    /// Show backup settings.
    Status,
}

#[derive(Clone, Copy, ValueEnum)]
enum StatusArg {
    Pass,
    Fail,
    InProgress,
}

impl From<StatusArg> for InspectionStatus {
    fn from(value: StatusArg) -> Self {
        match value {
            StatusArg::Pass => InspectionStatus::Pass,
            StatusArg::Fail => InspectionStatus::Fail,
            StatusArg::InProgress => InspectionStatus::InProgress,
        }
    }
}

struct Session {
    store: FsStore,
    config: AppConfig,
    workspace: Workspace,
}

impl Session {
    fn open(store: FsStore, config: AppConfig) -> Result<Self> {
        if !store.exists() {
            return Err(anyhow!(
                "FrameCheck is not initialized. Run `framecheck init` to get started."
            ));
        }
        let workspace = Workspace::load(&store).context("failed to load projects")?;
        Ok(Self {
            store,
            config,
            workspace,
        })
    }

    fn save(&self) -> Result<()> {
        self.workspace
            .save(&self.store)
            .context("failed to save projects")
    }

    fn active(&self) -> Result<&Project> {
        self.workspace
            .active()
            .ok_or_else(|| anyhow!("no project is open; run `framecheck project open <project>`"))
    }

    fn level(&self, level: Option<&str>) -> Result<String> {
        let project = self.active()?;
        match level {
            Some(level) if project.has_level(level) => Ok(level.to_string()),
            Some(level) => Err(anyhow!("unknown level `{level}`")),
            None => project
                .levels
                .first()
                .cloned()
                .ok_or_else(|| anyhow!("project has no levels")),
        }
    }

    fn apply(&mut self, edit: &Edit) -> Result<&Project> {
        let id = self.active()?.id.clone();
        let policy = self.config.round_policy;
        match self.workspace.apply(&id, edit, policy) {
            Ok(_) => {}
            Err(CoreError::Validation(message)) => bail!(message),
            Err(err) => return Err(err).context("failed to apply edit"),
        }
        self.save()?;
        self.active()
    }
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    let command = match cli.command {
        Some(c) => c,
        None => return fc_tui::run(),
    };

    let config = load_config().context("failed to load config")?;

    if let Command::Init { path } = &command {
        let path = match path {
            Some(path) => PathBuf::from(path),
            None => resolve_data_path(&config)?,
        };
        let store = FsStore::new(path.clone());
        store.init().context("failed to initialize data directory")?;
        set_data_path(&path)?;
        println!("FrameCheck initialized at {}", path.display());
        return Ok(());
    }

    let store = FsStore::new(resolve_data_path(&config)?);
    debug!(path = %store.path().display(), "using data directory");
    let mut session = Session::open(store, config)?;
    dispatch(&mut session, command)
}

fn dispatch(session: &mut Session, command: Command) -> Result<()> {
    match command {
        Command::Project { command } => project_command(session, command),
        Command::Level { command } => level_command(session, command),
        Command::Category { command } => category_command(session, command),
        Command::QuickNote { command } => quick_note_command(session, command),
        Command::Mark {
            category,
            item,
            status,
            level,
        } => mark_item(session, level.as_deref(), &category, &item, status.into()),
        Command::Notes {
            category,
            item,
            text,
            append,
            level,
        } => set_notes(session, level.as_deref(), &category, &item, &text, append),
        Command::Photo { command } => photo_command(session, command),
        Command::Prune => {
            session.apply(&Edit::PruneOrphans)?;
            Ok(())
        }
        Command::Report { out } => export(session, out.as_deref()),
        Command::Sync { command } => sync_command(session, command),
        Command::Assist { item, notes, level } => assist(session, level.as_deref(), item, notes),
        Command::Init { .. } => unreachable!("handled above"),
    }
}

fn project_command(session: &mut Session, command: ProjectCommand) -> Result<()> {
    match command {
        ProjectCommand::New { name } => {
            let project = session
                .workspace
                .create_project(&name)
                .map_err(|err| anyhow!(err))?;
            println!("{}\t{}", project.id, project.name);
            session.save()
        }
        ProjectCommand::List => {
            let active = session.workspace.active_id();
            for project in session.workspace.projects() {
                let marker = if Some(project.id.as_str()) == active { "*" } else { " " };
                println!(
                    "{marker} {}\t{}\t{} levels\t{} deficiencies",
                    project.id,
                    project.name,
                    project.levels.len(),
                    project.total_deficiencies()
                );
            }
            Ok(())
        }
        ProjectCommand::Open { project } => {
            let id = resolve_project(&session.workspace, &project)?;
            session.workspace.select(Some(&id))?;
            session.save()
        }
        ProjectCommand::Close => {
            session.workspace.select(None)?;
            session.save()
        }
        ProjectCommand::Rename { name } => {
            session.apply(&Edit::RenameProject { name })?;
            Ok(())
        }
        ProjectCommand::Delete { project } => {
            let id = resolve_project(&session.workspace, &project)?;
            session.workspace.delete_project(&id);
            session.save()
        }
        ProjectCommand::Show => {
            print!("{}", describe_project(session.active()?));
            Ok(())
        }
    }
}

fn level_command(session: &mut Session, command: LevelCommand) -> Result<()> {
    match command {
        LevelCommand::Add { name } => {
            session.apply(&Edit::AddLevel { name })?;
        }
        LevelCommand::Remove { name } => {
            session.apply(&Edit::DeleteLevel { name })?;
        }
        LevelCommand::List => {
            let project = session.active()?;
            for level in &project.levels {
                println!("{level}\t{} deficiencies", project.level_deficiencies(level));
            }
        }
    }
    Ok(())
}

fn category_command(session: &mut Session, command: CategoryCommand) -> Result<()> {
    match command {
        CategoryCommand::Add { name, level } => {
            let level = session.level(level.as_deref())?;
            let project = session.apply(&Edit::AddCategory {
                level: level.clone(),
                name,
            })?;
            if let Some(category) = project.categories(&level).and_then(<[Category]>::last) {
                println!("{}\t{}", category.id, category.name);
            }
        }
        CategoryCommand::Remove { category, level } => {
            let level = session.level(level.as_deref())?;
            let category_id = resolve_category(session.active()?, &level, &category)?.id.clone();
            session.apply(&Edit::DeleteCategory { level, category_id })?;
        }
        CategoryCommand::Items {
            category,
            items,
            file,
            level,
        } => {
            let level = session.level(level.as_deref())?;
            let category_id = resolve_category(session.active()?, &level, &category)?.id.clone();
            let mut item_names = items;
            if let Some(file) = file {
                let contents = std::fs::read_to_string(&file)
                    .with_context(|| format!("failed to read {file}"))?;
                item_names.extend(parse_item_lines(&contents));
            }
            session.apply(&Edit::SetCategoryItems {
                level,
                category_id,
                item_names,
            })?;
        }
        CategoryCommand::List { level } => {
            let level = session.level(level.as_deref())?;
            for category in session.active()?.categories(&level).unwrap_or_default() {
                println!(
                    "{}\t{}\t{}",
                    category.id,
                    category.name,
                    category.item_names.join(", ")
                );
            }
        }
    }
    Ok(())
}

fn quick_note_command(session: &mut Session, command: QuickNoteCommand) -> Result<()> {
    match command {
        QuickNoteCommand::Add { text } => {
            session.apply(&Edit::AddQuickNote { text })?;
        }
        QuickNoteCommand::Remove { text } => {
            session.apply(&Edit::DeleteQuickNote { text })?;
        }
        QuickNoteCommand::List => {
            for note in &session.active()?.quick_notes {
                println!("{note}");
            }
        }
    }
    Ok(())
}

fn mark_item(
    session: &mut Session,
    level: Option<&str>,
    category: &str,
    item: &str,
    status: InspectionStatus,
) -> Result<()> {
    let level = session.level(level)?;
    let category_id = resolve_category(session.active()?, &level, category)?.id.clone();
    let project = session.apply(&Edit::SetItemStatus {
        level: level.clone(),
        category_id: category_id.clone(),
        item_name: item.to_string(),
        status,
    })?;
    if let Some(result) = project.result_for(&level, &category_id, item.trim()) {
        println!("{}", describe_result(result));
    }
    Ok(())
}

fn set_notes(
    session: &mut Session,
    level: Option<&str>,
    category: &str,
    item: &str,
    text: &str,
    append: bool,
) -> Result<()> {
    let level = session.level(level)?;
    let (category_id, item_id) = resolve_deficiency(session.active()?, &level, category, item)?;
    let edit = if append {
        Edit::AppendItemNote {
            level,
            category_id,
            item_id,
            note: text.to_string(),
        }
    } else {
        Edit::UpdateItemDetails {
            level,
            category_id,
            item_id,
            patch: fc_core::ItemPatch {
                notes: Some(text.to_string()),
                photos: None,
            },
        }
    };
    session.apply(&edit)?;
    Ok(())
}

fn photo_command(session: &mut Session, command: PhotoCommand) -> Result<()> {
    match command {
        PhotoCommand::Add {
            category,
            item,
            path,
            level,
        } => {
            let level = session.level(level.as_deref())?;
            let project = session.active()?;
            let category_name = resolve_category(project, &level, &category)?.name.clone();
            let (category_id, item_id) = resolve_deficiency(project, &level, &category, &item)?;
            let url = read_photo(Path::new(&path))?;
            let label = Photo::caption(&level, &category_name, Local::now().date_naive());
            let photo = Photo::new(url, label);
            println!("{}", photo.id);
            session.apply(&Edit::AddPhoto {
                level,
                category_id,
                item_id,
                photo,
            })?;
        }
        PhotoCommand::Remove {
            category,
            item,
            photo_id,
            level,
        } => {
            let level = session.level(level.as_deref())?;
            let (category_id, item_id) =
                resolve_deficiency(session.active()?, &level, &category, &item)?;
            session.apply(&Edit::RemovePhoto {
                level,
                category_id,
                item_id,
                photo_id,
            })?;
        }
    }
    Ok(())
}

fn export(session: &Session, out: Option<&str>) -> Result<()> {
    let project = session.active()?;
    let dir = match out {
        Some(out) => PathBuf::from(out),
        None => std::env::current_dir().context("failed to resolve current directory")?,
    };
    let path = export_report(project, &dir, Utc::now()).context("failed to export report")?;
    println!("{}", path.display());
    Ok(())
}

fn sync_command(session: &mut Session, command: SyncCommand) -> Result<()> {
    match command {
        SyncCommand::Login { token } => {
            session.config.github_token = Some(token.trim().to_string());
            save_config(&session.config).context("failed to save config")?;
        }
        SyncCommand::Logout => {
            session.config.clear_sync();
            save_config(&session.config).context("failed to save config")?;
        }
        SyncCommand::Push => {
            let client = GistClient::new(session.config.resolved_token().as_deref())?;
            let runtime = runtime()?;
            let gist_id = runtime
                .block_on(
                    client.push(session.workspace.projects(), session.config.gist_id.as_deref()),
                )
                .context("failed to push backup")?;
            info!(gist = %gist_id, "pushed backup");
            session.config.gist_id = Some(gist_id.clone());
            session.config.last_sync = Some(Utc::now());
            save_config(&session.config).context("failed to save config")?;
            println!("Pushed {} project(s) to gist {gist_id}", session.workspace.projects().len());
        }
        SyncCommand::Pull => {
            let client = GistClient::new(session.config.resolved_token().as_deref())?;
            let runtime = runtime()?;
            let projects = runtime
                .block_on(client.pull(session.config.gist_id.as_deref()))
                .context("failed to pull backup")?;
            let count = projects.len();
            info!(count, "pulled backup");
            session.workspace.replace_all(projects);
            session.save()?;
            session.config.last_sync = Some(Utc::now());
            save_config(&session.config).context("failed to save config")?;
            println!("Restored {count} project(s)");
        }
        SyncCommand::Status => {
            let token = if session.config.resolved_token().is_some() {
                "configured"
            } else {
                "missing"
            };
            println!("token\t{token}");
            println!(
                "gist\t{}",
                session.config.gist_id.as_deref().unwrap_or("none")
            );
            println!(
                "last sync\t{}",
                session
                    .config
                    .last_sync
                    .map_or_else(|| "never".to_string(), |at| at.to_rfc3339())
            );
        }
    }
    Ok(())
}

fn assist(session: &mut Session, level: Option<&str>, item: String, notes: String) -> Result<()> {
    let level = session.level(level)?;
    let project = session.active()?.clone();
    let mut logger = LevelSession::new(project, level, session.config.round_policy);
    let message = logger
        .log_deficiency(&DeficiencyCall {
            item_name: item,
            notes,
        })
        .map_err(|err| anyhow!(err))?;
    session.workspace.replace(logger.into_project());
    session.save()?;
    println!("{message}");
    Ok(())
}

fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to initialize runtime")
}

fn resolve_project(workspace: &Workspace, query: &str) -> Result<String> {
    workspace
        .resolve(query)
        .map(|project| project.id.clone())
        .ok_or_else(|| anyhow!("project `{query}` not found"))
}

fn resolve_category<'a>(project: &'a Project, level: &str, query: &str) -> Result<&'a Category> {
    let categories = project
        .categories(level)
        .ok_or_else(|| anyhow!("unknown level `{level}`"))?;
    categories
        .iter()
        .find(|category| category.id == query)
        .or_else(|| {
            categories
                .iter()
                .find(|category| category.name.eq_ignore_ascii_case(query.trim()))
        })
        .ok_or_else(|| anyhow!("category `{query}` not found on {level}"))
}

fn resolve_deficiency(
    project: &Project,
    level: &str,
    category: &str,
    item: &str,
) -> Result<(String, String)> {
    let category = resolve_category(project, level, category)?;
    let result = project
        .result_for(level, &category.id, item.trim())
        .ok_or_else(|| anyhow!("`{item}` has no recorded result; mark it first"))?;
    if !result.is_failing() {
        bail!("`{item}` is not failing; notes and photos are kept only for deficiencies");
    }
    Ok((category.id.clone(), result.id.clone()))
}

fn read_photo(path: &Path) -> Result<String> {
    let mime = path
        .extension()
        .and_then(|ext| ext.to_str())
        .and_then(image_mime_for_extension)
        .ok_or_else(|| anyhow!("{} is not a supported image", path.display()))?;
    let bytes = std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    Ok(encode_data_url(mime, &bytes))
}

fn describe_result(result: &ItemResult) -> String {
    let mut line = format!("{}\t{}", result.name, result.status.label());
    if result.round > 0 {
        line.push_str(&format!("\tround {}", result.round));
    }
    if result.escalation() == Escalation::Critical {
        line.push_str("\tCRITICAL");
    }
    line
}

fn describe_project(project: &Project) -> String {
    let mut out = format!("{} ({})\n", project.name, project.id);
    for level in &project.levels {
        out.push_str(&format!("{level}\n"));
        for category in project.categories(level).unwrap_or_default() {
            out.push_str(&format!("  {} [{}]\n", category.name, category.id));
            for name in &category.item_names {
                match project.result_for(level, &category.id, name) {
                    Some(result) => out.push_str(&format!("    {}\n", describe_result(result))),
                    None => out.push_str(&format!("    {name}\t-\n")),
                }
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use tempfile::TempDir;

    fn session(temp: &TempDir) -> Session {
        let store = FsStore::new(temp.path().join("data"));
        store.init().expect("init");
        Session::open(store, AppConfig::default()).expect("session")
    }

    fn exec(session: &mut Session, args: &[&str]) -> Result<()> {
        let mut argv = vec!["framecheck"];
        argv.extend_from_slice(args);
        let cli = Cli::try_parse_from(argv).expect("parse");
        dispatch(session, cli.command.expect("command"))
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn oak_street_walk_through() {
        let temp = TempDir::new().expect("temp dir");
        let mut session = session(&temp);
        exec(&mut session, &["project", "new", "Oak St"]).expect("new");
        for _ in 0..3 {
            exec(&mut session, &["mark", "framing", "Wall Studs", "fail", "--level", "Main Floor"])
                .expect("mark");
        }
        exec(
            &mut session,
            &["notes", "Framing", "Wall Studs", "Split stud", "--level", "Main Floor"],
        )
        .expect("notes");

        let reloaded = Workspace::load(&session.store).expect("reload");
        let project = reloaded.active().expect("active");
        let result = project
            .result_for("Main Floor", "1", "Wall Studs")
            .expect("result");
        assert_eq!(result.round, 3);
        assert_eq!(result.notes, "Split stud");
        assert!(describe_result(result).ends_with("CRITICAL"));

        let out = temp.path().join("reports");
        exec(&mut session, &["report", "--out", out.to_str().expect("utf8")]).expect("report");
        assert_eq!(std::fs::read_dir(&out).expect("dir").count(), 1);
    }

    #[test]
    fn rejected_edits_leave_store_untouched() {
        let temp = TempDir::new().expect("temp dir");
        let mut session = session(&temp);
        exec(&mut session, &["project", "new", "Oak St"]).expect("new");
        exec(&mut session, &["level", "remove", "Basement"]).expect("remove");
        exec(&mut session, &["level", "remove", "Second Floor"]).expect("remove");
        let err = exec(&mut session, &["level", "remove", "Main Floor"]).expect_err("last level");
        assert!(err.to_string().contains("at least one level"));
        let err = exec(&mut session, &["level", "add", "Main Floor"]).expect_err("duplicate");
        assert!(err.to_string().contains("already exists"));

        let reloaded = Workspace::load(&session.store).expect("reload");
        assert_eq!(reloaded.active().expect("active").levels, vec!["Main Floor"]);
    }

    #[test]
    fn notes_require_a_recorded_result() {
        let temp = TempDir::new().expect("temp dir");
        let mut session = session(&temp);
        exec(&mut session, &["project", "new", "Oak St"]).expect("new");
        let err = exec(&mut session, &["notes", "Framing", "Headers", "x"]).expect_err("no result");
        assert!(err.to_string().contains("mark it first"));
    }

    #[test]
    fn passed_items_reject_notes_and_photos() {
        let temp = TempDir::new().expect("temp dir");
        let mut session = session(&temp);
        exec(&mut session, &["project", "new", "Oak St"]).expect("new");
        exec(&mut session, &["mark", "Framing", "Headers", "in-progress"]).expect("mark");
        let err = exec(&mut session, &["notes", "Framing", "Headers", "bad"])
            .expect_err("not failing");
        assert!(err.to_string().contains("is not failing"));

        exec(&mut session, &["mark", "Framing", "Headers", "pass"]).expect("mark");
        let image = temp.path().join("header.jpg");
        std::fs::write(&image, [0xff, 0xd8, 0xff]).expect("write image");
        let err = exec(
            &mut session,
            &["photo", "add", "Framing", "Headers", image.to_str().expect("utf8")],
        )
        .expect_err("not failing");
        assert!(err.to_string().contains("is not failing"));

        let project = session.active().expect("active");
        let result = project.result_for("Basement", "1", "Headers").expect("result");
        assert!(result.notes.is_empty());
        assert!(result.photos.is_empty());
    }

    #[test]
    fn photo_is_embedded_as_data_url() {
        let temp = TempDir::new().expect("temp dir");
        let mut session = session(&temp);
        exec(&mut session, &["project", "new", "Oak St"]).expect("new");
        exec(&mut session, &["mark", "Electrical", "Outlets", "fail"]).expect("mark");
        let image = temp.path().join("outlet.png");
        std::fs::write(&image, [0x89, b'P', b'N', b'G']).expect("write image");
        exec(
            &mut session,
            &["photo", "add", "Electrical", "Outlets", image.to_str().expect("utf8")],
        )
        .expect("photo");

        let project = session.active().expect("active");
        let result = project.result_for("Basement", "2", "Outlets").expect("result");
        assert_eq!(result.photos.len(), 1);
        assert!(result.photos[0].url.starts_with("data:image/png;base64,"));
        assert!(result.photos[0].label.starts_with("Basement - Electrical - "));
    }

    #[test]
    fn assistant_logs_through_the_inspector_path() {
        let temp = TempDir::new().expect("temp dir");
        let mut session = session(&temp);
        exec(&mut session, &["project", "new", "Oak St"]).expect("new");
        exec(&mut session, &["assist", "top plate", "--notes", "Not lapped"]).expect("assist");
        let project = session.active().expect("active");
        let result = project.result_for("Basement", "1", "Top Plate").expect("result");
        assert_eq!(result.status, InspectionStatus::Fail);
        assert_eq!(result.notes, "Not lapped");
    }

    #[test]
    fn deleting_open_project_closes_it() {
        let temp = TempDir::new().expect("temp dir");
        let mut session = session(&temp);
        exec(&mut session, &["project", "new", "Oak St"]).expect("new");
        exec(&mut session, &["project", "delete", "oak st"]).expect("delete");
        assert!(session.workspace.active().is_none());
        assert!(session.workspace.projects().is_empty());
    }
}
