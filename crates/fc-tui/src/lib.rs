use anyhow::{Context, Result};
use chrono::Utc;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Tabs, Wrap};
use ratatui::{Frame, Terminal};
use std::io::{self, Stdout};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use fc_core::edit::parse_item_lines;
use fc_core::{
    Category, CoreError, Edit, Escalation, InspectionStatus, ItemPatch, ItemResult, Project,
    ProjectStore, RoundPolicy, Workspace,
};
use fc_fs::{load_config, resolve_data_path, FsStore};
use fc_report::export_report;

const TICK_RATE: Duration = Duration::from_millis(200);
const FAILING_ONLY: &str = "Notes and photos are kept only for failing items";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tab {
    Inspect,
    Build,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Focus {
    Categories,
    Items,
    Levels,
    QuickNotes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InputMode {
    None,
    NewProject,
    RenameProject,
    Notes,
    AddLevel,
    AddCategory,
    CategoryItems,
    AddQuickNote,
    QuickNotePicker,
    Confirm,
}

impl InputMode {
    fn title(self) -> &'static str {
        match self {
            InputMode::NewProject => "New Project",
            InputMode::RenameProject => "Rename Project",
            InputMode::Notes => "Deficiency Notes",
            InputMode::AddLevel => "New Level",
            InputMode::AddCategory => "New Category",
            InputMode::CategoryItems => "Items (one per line)",
            InputMode::AddQuickNote => "New Quick Note",
            InputMode::None | InputMode::QuickNotePicker | InputMode::Confirm => "",
        }
    }
}

#[derive(Debug, Clone)]
enum ConfirmAction {
    DeleteProject { id: String, name: String },
    DeleteLevel(String),
    DeleteCategory {
        level: String,
        category_id: String,
        name: String,
    },
}

#[derive(Debug)]
struct App {
    workspace: Workspace,
    policy: RoundPolicy,
    report_dir: PathBuf,
    tab: Tab,
    focus: Focus,
    level_index: usize,
    project_state: ListState,
    category_state: ListState,
    item_state: ListState,
    note_state: ListState,
    input_mode: InputMode,
    input: TextInput,
    pending_confirm: Option<ConfirmAction>,
    status: Option<String>,
    show_help: bool,
}

/// Single-line editor; `cursor` counts characters, not bytes.
#[derive(Debug, Default, Clone)]
struct TextInput {
    content: String,
    cursor: usize,
}

impl TextInput {
    fn from(content: String) -> Self {
        let cursor = content.chars().count();
        Self { content, cursor }
    }

    fn byte_index(&self) -> usize {
        self.content
            .char_indices()
            .nth(self.cursor)
            .map_or(self.content.len(), |(index, _)| index)
    }

    fn insert(&mut self, c: char) {
        let index = self.byte_index();
        self.content.insert(index, c);
        self.cursor += 1;
    }

    fn delete_back(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            let index = self.byte_index();
            self.content.remove(index);
        }
    }

    fn move_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    fn move_right(&mut self) {
        if self.cursor < self.content.chars().count() {
            self.cursor += 1;
        }
    }

    fn move_home(&mut self) {
        self.cursor = 0;
    }

    fn move_end(&mut self) {
        self.cursor = self.content.chars().count();
    }

    fn reset(&mut self) {
        self.content.clear();
        self.cursor = 0;
    }
}

impl App {
    fn new(workspace: Workspace, policy: RoundPolicy, report_dir: PathBuf) -> Self {
        let mut app = Self {
            workspace,
            policy,
            report_dir,
            tab: Tab::Inspect,
            focus: Focus::Categories,
            level_index: 0,
            project_state: ListState::default(),
            category_state: ListState::default(),
            item_state: ListState::default(),
            note_state: ListState::default(),
            input_mode: InputMode::None,
            input: TextInput::default(),
            pending_confirm: None,
            status: None,
            show_help: false,
        };
        app.clamp_selections();
        app
    }

    fn project(&self) -> Option<&Project> {
        self.workspace.active()
    }

    fn level(&self) -> Option<&str> {
        self.project()?
            .levels
            .get(self.level_index)
            .map(String::as_str)
    }

    fn categories(&self) -> &[Category] {
        match (self.project(), self.level()) {
            (Some(project), Some(level)) => project.categories(level).unwrap_or_default(),
            _ => &[],
        }
    }

    fn category(&self) -> Option<&Category> {
        self.categories().get(self.category_state.selected()?)
    }

    fn item_names(&self) -> &[String] {
        self.category()
            .map(|category| category.item_names.as_slice())
            .unwrap_or_default()
    }

    fn item_name(&self) -> Option<&str> {
        self.item_names()
            .get(self.item_state.selected()?)
            .map(String::as_str)
    }

    fn item_result(&self) -> Option<&ItemResult> {
        self.project()?
            .result_for(self.level()?, &self.category()?.id, self.item_name()?)
    }

    fn quick_notes(&self) -> &[String] {
        self.project()
            .map(|project| project.quick_notes.as_slice())
            .unwrap_or_default()
    }

    /// Level, category id, and result id of the selected item while it is failing.
    fn item_target(&self) -> Option<(String, String, String)> {
        let result = self.item_result().filter(|result| result.is_failing())?;
        Some((
            self.level()?.to_string(),
            self.category()?.id.clone(),
            result.id.clone(),
        ))
    }

    fn clamp_selections(&mut self) {
        let level_count = self.project().map_or(0, |project| project.levels.len());
        if self.level_index >= level_count {
            self.level_index = level_count.saturating_sub(1);
        }
        let projects = self.workspace.projects().len();
        clamp(&mut self.project_state, projects);
        let categories = self.categories().len();
        clamp(&mut self.category_state, categories);
        let items = self.item_names().len();
        clamp(&mut self.item_state, items);
        let notes = self.quick_notes().len();
        clamp(&mut self.note_state, notes);
    }

    fn reset_navigation(&mut self) {
        self.tab = Tab::Inspect;
        self.focus = Focus::Categories;
        self.level_index = 0;
        self.category_state.select(Some(0));
        self.item_state.select(Some(0));
        self.clamp_selections();
    }

    fn shift_level(&mut self, forward: bool) {
        let count = self.project().map_or(0, |project| project.levels.len());
        if count == 0 {
            return;
        }
        self.level_index = if forward {
            (self.level_index + 1) % count
        } else {
            (self.level_index + count - 1) % count
        };
        self.category_state.select(Some(0));
        self.item_state.select(Some(0));
        self.clamp_selections();
    }

    fn next_focus(&mut self) {
        self.focus = match (self.tab, self.focus) {
            (Tab::Inspect, Focus::Categories) => Focus::Items,
            (Tab::Inspect, _) => Focus::Categories,
            (Tab::Build, Focus::Levels) => Focus::Categories,
            (Tab::Build, Focus::Categories) => Focus::QuickNotes,
            (Tab::Build, _) => Focus::Levels,
        };
    }

    fn switch_tab(&mut self) {
        self.tab = match self.tab {
            Tab::Inspect => Tab::Build,
            Tab::Build => Tab::Inspect,
        };
        self.focus = match self.tab {
            Tab::Inspect => Focus::Categories,
            Tab::Build => Focus::Levels,
        };
    }

    fn select_next(list_state: &mut ListState, len: usize) {
        let i = match list_state.selected() {
            Some(i) if i + 1 < len => i + 1,
            _ => 0,
        };
        list_state.select(Some(i));
    }

    fn select_prev(list_state: &mut ListState, len: usize) {
        let i = match list_state.selected() {
            Some(0) | None => len.saturating_sub(1),
            Some(i) => i - 1,
        };
        list_state.select(Some(i));
    }
}

fn clamp(state: &mut ListState, len: usize) {
    match state.selected() {
        _ if len == 0 => state.select(None),
        Some(i) if i >= len => state.select(Some(len - 1)),
        None => state.select(Some(0)),
        Some(_) => {}
    }
}

#[derive(Debug, Clone, Copy)]
enum Move {
    Up,
    Down,
    First,
    Last,
}

pub fn run() -> Result<()> {
    let config = load_config().context("failed to load config")?;
    let store = FsStore::new(resolve_data_path(&config)?);
    if !store.exists() {
        store.init().context("failed to initialize data directory")?;
        info!(path = %store.path().display(), "initialized data directory");
    }
    let workspace = Workspace::load(&store).context("failed to load projects")?;
    let report_dir = std::env::current_dir().context("failed to resolve current directory")?;
    let mut app = App::new(workspace, config.round_policy, report_dir);

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = ratatui::backend::CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut last_tick = Instant::now();

    loop {
        terminal.draw(|frame| render_app(frame, &app))?;

        let timeout = TICK_RATE.saturating_sub(last_tick.elapsed());
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press && handle_key(&store, &mut app, key)? {
                    break;
                }
            }
        }

        if last_tick.elapsed() >= TICK_RATE {
            last_tick = Instant::now();
        }
    }

    restore_terminal(terminal)?;
    Ok(())
}

fn handle_key(store: &impl ProjectStore, app: &mut App, key: KeyEvent) -> Result<bool> {
    match app.input_mode {
        InputMode::None => {}
        InputMode::Confirm => return handle_confirm_input(store, app, key),
        InputMode::QuickNotePicker => return handle_picker_input(store, app, key),
        _ => return handle_text_input(store, app, key),
    }

    if app.show_help {
        if matches!(key.code, KeyCode::Char('?') | KeyCode::Esc) {
            app.show_help = false;
        }
        return Ok(false);
    }

    match key.code {
        KeyCode::Char('q') => return Ok(true),
        KeyCode::Char('?') => {
            app.show_help = true;
            return Ok(false);
        }
        _ => {}
    }

    if app.project().is_none() {
        handle_project_list_key(store, app, key)?;
    } else {
        handle_project_key(store, app, key)?;
    }
    Ok(false)
}

fn handle_project_list_key(store: &impl ProjectStore, app: &mut App, key: KeyEvent) -> Result<()> {
    let len = app.workspace.projects().len();
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => move_list(&mut app.project_state, len, Move::Down),
        KeyCode::Char('k') | KeyCode::Up => move_list(&mut app.project_state, len, Move::Up),
        KeyCode::Home | KeyCode::Char('g') => move_list(&mut app.project_state, len, Move::First),
        KeyCode::End | KeyCode::Char('G') => move_list(&mut app.project_state, len, Move::Last),
        KeyCode::Char('n') => open_input(app, InputMode::NewProject, String::new()),
        KeyCode::Enter => {
            let selected = app
                .project_state
                .selected()
                .and_then(|i| app.workspace.projects().get(i))
                .map(|project| project.id.clone());
            if let Some(id) = selected {
                app.workspace.select(Some(&id))?;
                app.workspace.save(store).context("failed to save projects")?;
                app.reset_navigation();
            }
        }
        KeyCode::Char('x') => {
            let selected = app
                .project_state
                .selected()
                .and_then(|i| app.workspace.projects().get(i))
                .map(|project| ConfirmAction::DeleteProject {
                    id: project.id.clone(),
                    name: project.name.clone(),
                });
            if let Some(action) = selected {
                app.pending_confirm = Some(action);
                app.input_mode = InputMode::Confirm;
            }
        }
        _ => {}
    }
    Ok(())
}

fn handle_project_key(store: &impl ProjectStore, app: &mut App, key: KeyEvent) -> Result<()> {
    match key.code {
        KeyCode::Esc => {
            app.workspace.select(None)?;
            app.workspace.save(store).context("failed to save projects")?;
            app.status = None;
            app.clamp_selections();
            return Ok(());
        }
        KeyCode::Left | KeyCode::Right => {
            app.switch_tab();
            return Ok(());
        }
        KeyCode::Char('[') | KeyCode::Char('h') => {
            app.shift_level(false);
            return Ok(());
        }
        KeyCode::Char(']') | KeyCode::Char('l') => {
            app.shift_level(true);
            return Ok(());
        }
        KeyCode::Tab => {
            app.next_focus();
            return Ok(());
        }
        KeyCode::Char('r') => {
            export(app);
            return Ok(());
        }
        KeyCode::Char('R') => {
            let name = app.project().map(|p| p.name.clone()).unwrap_or_default();
            open_input(app, InputMode::RenameProject, name);
            return Ok(());
        }
        KeyCode::Char('j') | KeyCode::Down => {
            handle_list_move(app, Move::Down);
            return Ok(());
        }
        KeyCode::Char('k') | KeyCode::Up => {
            handle_list_move(app, Move::Up);
            return Ok(());
        }
        KeyCode::Home | KeyCode::Char('g') => {
            handle_list_move(app, Move::First);
            return Ok(());
        }
        KeyCode::End | KeyCode::Char('G') => {
            handle_list_move(app, Move::Last);
            return Ok(());
        }
        _ => {}
    }

    match app.tab {
        Tab::Inspect => handle_inspect_key(store, app, key),
        Tab::Build => handle_build_key(store, app, key),
    }
}

fn handle_inspect_key(store: &impl ProjectStore, app: &mut App, key: KeyEvent) -> Result<()> {
    if app.focus == Focus::Categories {
        if key.code == KeyCode::Enter {
            app.focus = Focus::Items;
        }
        return Ok(());
    }

    match key.code {
        KeyCode::Char('p') => mark_item(store, app, InspectionStatus::Pass)?,
        KeyCode::Char('f') => mark_item(store, app, InspectionStatus::Fail)?,
        KeyCode::Char('n') => {
            let notes = app
                .item_result()
                .filter(|result| result.is_failing())
                .map(|result| result.notes.clone());
            match notes {
                Some(notes) => open_input(app, InputMode::Notes, notes),
                None => app.status = Some(FAILING_ONLY.into()),
            }
        }
        KeyCode::Char('t') => {
            if app.item_target().is_none() {
                app.status = Some(FAILING_ONLY.into());
            } else if app.quick_notes().is_empty() {
                app.status = Some("No quick notes defined".into());
            } else {
                app.note_state.select(Some(0));
                app.input_mode = InputMode::QuickNotePicker;
            }
        }
        KeyCode::Esc | KeyCode::Backspace => app.focus = Focus::Categories,
        _ => {}
    }
    Ok(())
}

fn handle_build_key(store: &impl ProjectStore, app: &mut App, key: KeyEvent) -> Result<()> {
    match (key.code, app.focus) {
        (KeyCode::Char('a'), Focus::Levels) => open_input(app, InputMode::AddLevel, String::new()),
        (KeyCode::Char('a'), Focus::Categories) => {
            open_input(app, InputMode::AddCategory, String::new());
        }
        (KeyCode::Char('a'), Focus::QuickNotes) => {
            open_input(app, InputMode::AddQuickNote, String::new());
        }
        (KeyCode::Char('e'), Focus::Categories) => {
            if let Some(items) = app.category().map(|category| category.item_names.join("\n")) {
                open_input(app, InputMode::CategoryItems, items);
            }
        }
        (KeyCode::Char('x'), Focus::Levels) => {
            if let Some(level) = app.level().map(str::to_string) {
                app.pending_confirm = Some(ConfirmAction::DeleteLevel(level));
                app.input_mode = InputMode::Confirm;
            }
        }
        (KeyCode::Char('x'), Focus::Categories) => {
            let action = match (app.level(), app.category()) {
                (Some(level), Some(category)) => Some(ConfirmAction::DeleteCategory {
                    level: level.to_string(),
                    category_id: category.id.clone(),
                    name: category.name.clone(),
                }),
                _ => None,
            };
            if let Some(action) = action {
                app.pending_confirm = Some(action);
                app.input_mode = InputMode::Confirm;
            }
        }
        (KeyCode::Char('x'), Focus::QuickNotes) => {
            let note = app
                .note_state
                .selected()
                .and_then(|i| app.quick_notes().get(i))
                .cloned();
            if let Some(text) = note {
                apply_edit(store, app, Edit::DeleteQuickNote { text })?;
            }
        }
        (KeyCode::Char('P'), _) => {
            apply_edit(store, app, Edit::PruneOrphans)?;
            app.status = Some("Removed results of deleted categories".into());
        }
        _ => {}
    }
    Ok(())
}

fn handle_text_input(store: &impl ProjectStore, app: &mut App, key: KeyEvent) -> Result<bool> {
    match key.code {
        KeyCode::Esc => {
            app.input_mode = InputMode::None;
            app.input.reset();
        }
        KeyCode::Enter if app.input_mode == InputMode::CategoryItems => app.input.insert('\n'),
        KeyCode::Enter => finish_input(store, app)?,
        KeyCode::Char(c) if key.modifiers.contains(KeyModifiers::CONTROL) => match c {
            'a' => app.input.move_home(),
            'e' => app.input.move_end(),
            's' => finish_input(store, app)?,
            _ => {}
        },
        KeyCode::Char(c) => app.input.insert(c),
        KeyCode::Backspace => app.input.delete_back(),
        KeyCode::Left => app.input.move_left(),
        KeyCode::Right => app.input.move_right(),
        KeyCode::Home => app.input.move_home(),
        KeyCode::End => app.input.move_end(),
        _ => {}
    }
    Ok(false)
}

fn handle_picker_input(store: &impl ProjectStore, app: &mut App, key: KeyEvent) -> Result<bool> {
    let len = app.quick_notes().len();
    match key.code {
        KeyCode::Esc => app.input_mode = InputMode::None,
        KeyCode::Char('j') | KeyCode::Down => move_list(&mut app.note_state, len, Move::Down),
        KeyCode::Char('k') | KeyCode::Up => move_list(&mut app.note_state, len, Move::Up),
        KeyCode::Enter => {
            app.input_mode = InputMode::None;
            let note = app
                .note_state
                .selected()
                .and_then(|i| app.quick_notes().get(i))
                .cloned();
            if let (Some(note), Some((level, category_id, item_id))) = (note, app.item_target()) {
                apply_edit(
                    store,
                    app,
                    Edit::AppendItemNote {
                        level,
                        category_id,
                        item_id,
                        note,
                    },
                )?;
            }
        }
        _ => {}
    }
    Ok(false)
}

fn handle_confirm_input(store: &impl ProjectStore, app: &mut App, key: KeyEvent) -> Result<bool> {
    match key.code {
        KeyCode::Char('y') | KeyCode::Char('Y') => {
            app.input_mode = InputMode::None;
            if let Some(action) = app.pending_confirm.take() {
                confirm(store, app, action)?;
            }
        }
        KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
            app.pending_confirm = None;
            app.input_mode = InputMode::None;
            app.status = Some("Cancelled".into());
        }
        _ => {}
    }
    Ok(false)
}

fn confirm(store: &impl ProjectStore, app: &mut App, action: ConfirmAction) -> Result<()> {
    match action {
        ConfirmAction::DeleteProject { id, name } => {
            if app.workspace.delete_project(&id) {
                app.workspace.save(store).context("failed to save projects")?;
                app.status = Some(format!("Deleted {name}"));
            }
            app.clamp_selections();
        }
        ConfirmAction::DeleteLevel(name) => apply_edit(store, app, Edit::DeleteLevel { name })?,
        ConfirmAction::DeleteCategory {
            level,
            category_id,
            name,
        } => {
            apply_edit(store, app, Edit::DeleteCategory { level, category_id })?;
            if app.status.is_none() {
                app.status = Some(format!("Deleted {name}; press P to drop its results"));
            }
        }
    }
    Ok(())
}

fn finish_input(store: &impl ProjectStore, app: &mut App) -> Result<()> {
    submit_input(store, app)?;
    app.input_mode = InputMode::None;
    app.input.reset();
    Ok(())
}

fn submit_input(store: &impl ProjectStore, app: &mut App) -> Result<()> {
    let text = app.input.content.clone();
    match app.input_mode {
        InputMode::NewProject => {
            match app.workspace.create_project(&text) {
                Ok(project) => info!(id = %project.id, "created project"),
                Err(rejection) => {
                    app.status = Some(rejection.to_string());
                    return Ok(());
                }
            }
            app.workspace.save(store).context("failed to save projects")?;
            app.reset_navigation();
        }
        InputMode::RenameProject => apply_edit(store, app, Edit::RenameProject { name: text })?,
        InputMode::Notes => {
            if let Some((level, category_id, item_id)) = app.item_target() {
                let patch = ItemPatch {
                    notes: Some(text),
                    photos: None,
                };
                apply_edit(
                    store,
                    app,
                    Edit::UpdateItemDetails {
                        level,
                        category_id,
                        item_id,
                        patch,
                    },
                )?;
            }
        }
        InputMode::AddLevel => {
            let name = text.trim().to_string();
            apply_edit(store, app, Edit::AddLevel { name: name.clone() })?;
            if let Some(index) = app
                .project()
                .and_then(|project| project.levels.iter().position(|level| *level == name))
            {
                app.level_index = index;
                app.clamp_selections();
            }
        }
        InputMode::AddCategory => {
            if let Some(level) = app.level().map(str::to_string) {
                apply_edit(store, app, Edit::AddCategory { level, name: text })?;
            }
        }
        InputMode::CategoryItems => {
            let target = app
                .level()
                .zip(app.category())
                .map(|(level, category)| (level.to_string(), category.id.clone()));
            if let Some((level, category_id)) = target {
                let item_names = parse_item_lines(&text);
                apply_edit(
                    store,
                    app,
                    Edit::SetCategoryItems {
                        level,
                        category_id,
                        item_names,
                    },
                )?;
            }
        }
        InputMode::AddQuickNote => apply_edit(store, app, Edit::AddQuickNote { text })?,
        InputMode::None | InputMode::QuickNotePicker | InputMode::Confirm => {}
    }
    Ok(())
}

fn mark_item(store: &impl ProjectStore, app: &mut App, status: InspectionStatus) -> Result<()> {
    let target = match (app.level(), app.category(), app.item_name()) {
        (Some(level), Some(category), Some(item)) => {
            Some((level.to_string(), category.id.clone(), item.to_string()))
        }
        _ => None,
    };
    if let Some((level, category_id, item_name)) = target {
        apply_edit(
            store,
            app,
            Edit::SetItemStatus {
                level,
                category_id,
                item_name,
                status,
            },
        )?;
    }
    Ok(())
}

/// Apply an edit to the open project and persist it; rejections land in the status line.
fn apply_edit(store: &impl ProjectStore, app: &mut App, edit: Edit) -> Result<()> {
    let Some(id) = app.workspace.active_id().map(str::to_string) else {
        return Ok(());
    };
    match app.workspace.apply(&id, &edit, app.policy) {
        Ok(_) => {
            app.workspace.save(store).context("failed to save projects")?;
            app.status = None;
            debug!(project = %id, "applied edit");
        }
        Err(CoreError::Validation(message)) => app.status = Some(message),
        Err(err) => return Err(err).context("failed to apply edit"),
    }
    app.clamp_selections();
    Ok(())
}

fn export(app: &mut App) {
    let Some(project) = app.project() else {
        return;
    };
    let message = match export_report(project, &app.report_dir, Utc::now()) {
        Ok(path) => format!("Report saved to {}", path.display()),
        Err(err) => {
            debug!(error = %err, "report export failed");
            format!("Report failed: {err}")
        }
    };
    app.status = Some(message);
}

fn open_input(app: &mut App, mode: InputMode, content: String) {
    app.input = TextInput::from(content);
    app.input_mode = mode;
}

fn handle_list_move(app: &mut App, movement: Move) {
    match app.focus {
        Focus::Categories => {
            let len = app.categories().len();
            move_list(&mut app.category_state, len, movement);
            app.item_state.select(Some(0));
            app.clamp_selections();
        }
        Focus::Items => {
            let len = app.item_names().len();
            move_list(&mut app.item_state, len, movement);
        }
        Focus::Levels => {
            let len = app.project().map_or(0, |project| project.levels.len());
            let mut state = ListState::default().with_selected(Some(app.level_index));
            move_list(&mut state, len, movement);
            app.level_index = state.selected().unwrap_or(0);
            app.category_state.select(Some(0));
            app.clamp_selections();
        }
        Focus::QuickNotes => {
            let len = app.quick_notes().len();
            move_list(&mut app.note_state, len, movement);
        }
    }
}

fn move_list(state: &mut ListState, len: usize, movement: Move) {
    if len == 0 {
        return;
    }
    match movement {
        Move::Up => App::select_prev(state, len),
        Move::Down => App::select_next(state, len),
        Move::First => state.select(Some(0)),
        Move::Last => state.select(Some(len - 1)),
    }
}

fn render_app(frame: &mut Frame, app: &App) {
    let size = frame.size();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0), Constraint::Length(3)].as_ref())
        .split(size);

    match app.project() {
        None => {
            let header = Paragraph::new("Projects")
                .block(Block::default().borders(Borders::ALL).title("FrameCheck"));
            frame.render_widget(header, chunks[0]);
            render_project_list(frame, chunks[1], app);
        }
        Some(project) => {
            let level = app.level().unwrap_or("-");
            let title = format!(
                "FrameCheck | {} | {} ({} open)",
                project.name,
                level,
                project.level_deficiencies(level)
            );
            let tabs = Tabs::new(vec![Line::from("Inspect"), Line::from("Build")])
                .select(match app.tab {
                    Tab::Inspect => 0,
                    Tab::Build => 1,
                })
                .block(Block::default().borders(Borders::ALL).title(title))
                .highlight_style(Style::default().add_modifier(Modifier::BOLD));
            frame.render_widget(tabs, chunks[0]);
            match app.tab {
                Tab::Inspect => render_inspect(frame, chunks[1], app, project),
                Tab::Build => render_build(frame, chunks[1], app, project),
            }
        }
    }

    render_guide_bar(frame, chunks[2], app);

    match app.input_mode {
        InputMode::None => {}
        InputMode::Confirm => render_confirm_popup(frame, size, app),
        InputMode::QuickNotePicker => render_picker_popup(frame, size, app),
        mode => render_input_popup(frame, size, mode, &app.input),
    }

    if app.show_help {
        render_help_popup(frame, size, &help_text(app));
    }
}

fn render_project_list(frame: &mut Frame, area: Rect, app: &App) {
    let block = Block::default().borders(Borders::ALL).title("Projects");
    if app.workspace.projects().is_empty() {
        let empty = Paragraph::new("No projects yet. Press n to create one.")
            .block(block)
            .wrap(Wrap { trim: true });
        frame.render_widget(empty, area);
        return;
    }
    let items = app
        .workspace
        .projects()
        .iter()
        .map(|project| {
            ListItem::new(Line::from(vec![
                Span::styled(project.name.clone(), Style::default().add_modifier(Modifier::BOLD)),
                Span::raw(format!(
                    "  {} levels, {} open deficiencies",
                    project.levels.len(),
                    project.total_deficiencies()
                )),
            ]))
        })
        .collect::<Vec<_>>();
    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default().bg(Color::DarkGray));
    frame.render_stateful_widget(list, area, &mut app.project_state.clone());
}

fn render_inspect(frame: &mut Frame, area: Rect, app: &App, project: &Project) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(35), Constraint::Percentage(65)].as_ref())
        .split(area);
    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(6)].as_ref())
        .split(columns[1]);
    let level = app.level().unwrap_or_default();

    let categories = app
        .categories()
        .iter()
        .map(|category| {
            let failing = project
                .results(level, &category.id)
                .unwrap_or_default()
                .iter()
                .filter(|result| result.is_failing())
                .count();
            let label = if failing > 0 {
                format!("{} ({failing})", category.name)
            } else {
                category.name.clone()
            };
            ListItem::new(label)
        })
        .collect::<Vec<_>>();
    let categories_block = if categories.is_empty() {
        "No categories on this level"
    } else {
        "Categories"
    };
    let list = List::new(categories)
        .block(focus_block(categories_block, app.focus == Focus::Categories))
        .highlight_style(Style::default().bg(Color::DarkGray));
    frame.render_stateful_widget(list, columns[0], &mut app.category_state.clone());

    let category_id = app.category().map(|category| category.id.as_str()).unwrap_or_default();
    let items = app
        .item_names()
        .iter()
        .map(|name| ListItem::new(item_line(name, project.result_for(level, category_id, name))))
        .collect::<Vec<_>>();
    let list = List::new(items)
        .block(focus_block("Items", app.focus == Focus::Items))
        .highlight_style(Style::default().bg(Color::DarkGray));
    frame.render_stateful_widget(list, right[0], &mut app.item_state.clone());

    let detail = match app.item_result() {
        Some(result) => {
            let mut lines = Vec::new();
            if result.notes.is_empty() {
                lines.push(Line::from("No notes"));
            } else {
                lines.extend(result.notes.lines().map(|line| Line::from(line.to_string())));
            }
            if !result.photos.is_empty() {
                lines.push(Line::from(format!("{} photo(s)", result.photos.len())));
            }
            lines
        }
        None => vec![Line::from("Not inspected")],
    };
    let detail = Paragraph::new(detail)
        .block(Block::default().borders(Borders::ALL).title("Details"))
        .wrap(Wrap { trim: true });
    frame.render_widget(detail, right[1]);
}

fn item_line(name: &str, result: Option<&ItemResult>) -> Line<'static> {
    let Some(result) = result else {
        return Line::from(vec![
            Span::styled("[    ] ", Style::default().fg(Color::DarkGray)),
            Span::raw(name.to_string()),
        ]);
    };
    let (badge, color) = match result.status {
        InspectionStatus::Pass => ("[PASS] ", Color::Green),
        InspectionStatus::Fail => ("[FAIL] ", Color::Red),
        InspectionStatus::InProgress => ("[WIP ] ", Color::Yellow),
    };
    let mut spans = vec![
        Span::styled(badge, Style::default().fg(color)),
        Span::raw(name.to_string()),
    ];
    if result.round > 0 {
        spans.push(Span::raw(format!("  R{}", result.round)));
    }
    match result.escalation() {
        Escalation::Critical => spans.push(Span::styled(
            " CRITICAL",
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )),
        Escalation::Repeat => {
            spans.push(Span::styled(" REPEAT", Style::default().fg(Color::Yellow)));
        }
        Escalation::None => {}
    }
    Line::from(spans)
}

fn render_build(frame: &mut Frame, area: Rect, app: &App, project: &Project) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(
            [
                Constraint::Percentage(25),
                Constraint::Percentage(45),
                Constraint::Percentage(30),
            ]
            .as_ref(),
        )
        .split(area);

    let levels = project
        .levels
        .iter()
        .map(|level| ListItem::new(level.clone()))
        .collect::<Vec<_>>();
    let list = List::new(levels)
        .block(focus_block("Levels", app.focus == Focus::Levels))
        .highlight_style(Style::default().bg(Color::DarkGray));
    let mut level_state = ListState::default().with_selected(Some(app.level_index));
    frame.render_stateful_widget(list, columns[0], &mut level_state);

    let categories = app
        .categories()
        .iter()
        .map(|category| {
            ListItem::new(vec![
                Line::from(Span::styled(
                    category.name.clone(),
                    Style::default().add_modifier(Modifier::BOLD),
                )),
                Line::from(Span::styled(
                    format!("  {}", category.item_names.join(", ")),
                    Style::default().fg(Color::DarkGray),
                )),
            ])
        })
        .collect::<Vec<_>>();
    let list = List::new(categories)
        .block(focus_block("Categories", app.focus == Focus::Categories))
        .highlight_style(Style::default().bg(Color::DarkGray));
    frame.render_stateful_widget(list, columns[1], &mut app.category_state.clone());

    let notes = app
        .quick_notes()
        .iter()
        .map(|note| ListItem::new(note.clone()))
        .collect::<Vec<_>>();
    let list = List::new(notes)
        .block(focus_block("Quick Notes", app.focus == Focus::QuickNotes))
        .highlight_style(Style::default().bg(Color::DarkGray));
    frame.render_stateful_widget(list, columns[2], &mut app.note_state.clone());
}

fn focus_block(title: &str, focused: bool) -> Block<'_> {
    Block::default()
        .borders(Borders::ALL)
        .title(title)
        .border_style(if focused {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default()
        })
}

fn render_input_popup(frame: &mut Frame, area: Rect, mode: InputMode, input_data: &TextInput) {
    let height = if mode == InputMode::CategoryItems { 60 } else { 20 };
    let popup_area = centered_rect(60, height, area);
    frame.render_widget(Clear, popup_area);
    let input_widget = Paragraph::new(input_data.content.as_str())
        .block(Block::default().borders(Borders::ALL).title(mode.title()));
    frame.render_widget(input_widget, popup_area);

    let before: String = input_data.content.chars().take(input_data.cursor).collect();
    let row = before.matches('\n').count() as u16;
    let column = before.rsplit('\n').next().map_or(0, |line| line.chars().count()) as u16;
    let cx = popup_area.x + 1 + column.min(popup_area.width.saturating_sub(3));
    let cy = popup_area.y + 1 + row.min(popup_area.height.saturating_sub(3));
    frame.set_cursor(cx, cy);
}

fn render_confirm_popup(frame: &mut Frame, area: Rect, app: &App) {
    let popup_area = centered_rect(60, 25, area);
    frame.render_widget(Clear, popup_area);
    let block = Block::default().borders(Borders::ALL).title("Confirm");

    let message = match &app.pending_confirm {
        Some(ConfirmAction::DeleteProject { name, .. }) => {
            format!("Delete project {name} and all of its results?")
        }
        Some(ConfirmAction::DeleteLevel(level)) => {
            format!("Delete level {level} with its categories and results?")
        }
        Some(ConfirmAction::DeleteCategory { name, .. }) => format!("Delete category {name}?"),
        None => "No pending action.".to_string(),
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(2), Constraint::Length(1)].as_ref())
        .margin(1)
        .split(popup_area);

    frame.render_widget(Paragraph::new(message).wrap(Wrap { trim: true }), chunks[0]);
    let help =
        Paragraph::new("y: Confirm | n/Esc: Cancel").style(Style::default().fg(Color::DarkGray));
    frame.render_widget(help, chunks[1]);
    frame.render_widget(block, popup_area);
}

fn render_picker_popup(frame: &mut Frame, area: Rect, app: &App) {
    let popup_area = centered_rect(50, 50, area);
    frame.render_widget(Clear, popup_area);
    let items = app
        .quick_notes()
        .iter()
        .map(|note| ListItem::new(note.clone()))
        .collect::<Vec<_>>();
    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title("Append Quick Note"))
        .highlight_style(Style::default().bg(Color::DarkGray));
    frame.render_stateful_widget(list, popup_area, &mut app.note_state.clone());
}

fn render_guide_bar(frame: &mut Frame, area: Rect, app: &App) {
    let spans: Vec<Span> = get_key_hints(app)
        .iter()
        .flat_map(|(key, desc)| {
            vec![
                Span::styled(
                    format!(" [{key}] "),
                    Style::default().add_modifier(Modifier::BOLD).fg(Color::Cyan),
                ),
                Span::raw(format!("{desc}  ")),
            ]
        })
        .collect();

    let title = app.status.as_deref().unwrap_or("Guide");
    let guide = Paragraph::new(Line::from(spans))
        .block(Block::default().borders(Borders::ALL).title(title));
    frame.render_widget(guide, area);
}

fn get_key_hints(app: &App) -> Vec<(&'static str, &'static str)> {
    match app.input_mode {
        InputMode::None => {}
        InputMode::Confirm => return vec![("y", "Confirm"), ("n", "Cancel")],
        InputMode::QuickNotePicker => return vec![("Enter", "Append"), ("Esc", "Close")],
        InputMode::CategoryItems => {
            return vec![("Enter", "New Line"), ("Ctrl+S", "Save"), ("Esc", "Cancel")];
        }
        _ => return vec![("Enter", "Save"), ("Esc", "Cancel")],
    }
    if app.show_help {
        return vec![("?", "Close Help")];
    }

    let mut hints = vec![("q", "Quit"), ("?", "Help")];
    if app.project().is_none() {
        hints.extend_from_slice(&[("n", "New"), ("Enter", "Open"), ("x", "Delete")]);
        return hints;
    }
    hints.extend_from_slice(&[("Esc", "Projects"), ("←/→", "Tabs"), ("[/]", "Level")]);
    match (app.tab, app.focus) {
        (Tab::Inspect, Focus::Items) => {
            hints.extend_from_slice(&[
                ("p", "Pass"),
                ("f", "Fail"),
                ("n", "Notes"),
                ("t", "Quick Note"),
            ]);
        }
        (Tab::Inspect, _) => hints.extend_from_slice(&[("Enter", "Items"), ("r", "Report")]),
        (Tab::Build, Focus::Categories) => {
            hints.extend_from_slice(&[
                ("a", "Add"),
                ("e", "Items"),
                ("x", "Delete"),
                ("P", "Prune"),
            ]);
        }
        (Tab::Build, _) => {
            hints.extend_from_slice(&[("a", "Add"), ("x", "Delete"), ("Tab", "Focus")]);
        }
    }
    hints
}

fn render_help_popup(frame: &mut Frame, area: Rect, content: &str) {
    let popup_area = centered_rect(70, 60, area);
    frame.render_widget(Clear, popup_area);
    let block = Block::default().borders(Borders::ALL).title("Help");
    let help = Paragraph::new(content).block(block).wrap(Wrap { trim: true });
    frame.render_widget(help, popup_area);
}

fn help_text(app: &App) -> String {
    if app.project().is_none() {
        return "n: new project\nenter: open\nx: delete\nj/k: navigate\nq: quit".into();
    }
    match app.tab {
        Tab::Inspect => [
            "enter: open category",
            "p: pass",
            "f: fail (repeat fails escalate)",
            "n: edit notes",
            "t: append quick note",
            "[/]: switch level",
            "r: export report",
            "R: rename project",
            "esc: back to projects",
        ]
        .join("\n"),
        Tab::Build => [
            "tab: cycle levels/categories/quick notes",
            "a: add",
            "x: delete",
            "e: edit category items",
            "P: prune results of deleted categories",
            "[/]: switch level",
        ]
        .join("\n"),
    }
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Percentage((100 - percent_y) / 2),
                Constraint::Percentage(percent_y),
                Constraint::Percentage((100 - percent_y) / 2),
            ]
            .as_ref(),
        )
        .split(r);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints(
            [
                Constraint::Percentage((100 - percent_x) / 2),
                Constraint::Percentage(percent_x),
                Constraint::Percentage((100 - percent_x) / 2),
            ]
            .as_ref(),
        )
        .split(popup_layout[1])[1]
}

fn restore_terminal(
    mut terminal: Terminal<ratatui::backend::CrosstermBackend<Stdout>>,
) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}
