//! The project list and the active-project pointer.

use tracing::debug;

use crate::edit::{apply_edit_with, Edit, Rejection, RoundPolicy};
use crate::model::Project;
use crate::{CoreError, CoreResult, ProjectStore};

/// All projects on this device plus the currently selected one.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Workspace {
    projects: Vec<Project>,
    active_id: Option<String>,
}

impl Workspace {
    /// Build a workspace, dropping an active id that matches no project.
    pub fn new(projects: Vec<Project>, active_id: Option<String>) -> Self {
        let active_id = active_id.filter(|id| projects.iter().any(|project| &project.id == id));
        Self {
            projects,
            active_id,
        }
    }

    /// Load projects and selection from a store.
    pub fn load(store: &impl ProjectStore) -> CoreResult<Self> {
        let projects = store.load_projects();
        let active_id = store.load_active_id()?;
        debug!(count = projects.len(), "loaded workspace");
        Ok(Self::new(projects, active_id))
    }

    /// Persist projects and selection to a store.
    pub fn save(&self, store: &impl ProjectStore) -> CoreResult<()> {
        store.save_projects(&self.projects)?;
        store.save_active_id(self.active_id.as_deref())
    }

    /// All projects in creation order.
    pub fn projects(&self) -> &[Project] {
        &self.projects
    }

    /// The currently selected project id.
    pub fn active_id(&self) -> Option<&str> {
        self.active_id.as_deref()
    }

    /// The currently selected project.
    pub fn active(&self) -> Option<&Project> {
        let id = self.active_id.as_deref()?;
        self.get(id)
    }

    /// Look up a project by exact id.
    pub fn get(&self, id: &str) -> Option<&Project> {
        self.projects.iter().find(|project| project.id == id)
    }

    /// Resolve a user-supplied reference: exact id, unique id prefix, or name.
    pub fn resolve(&self, query: &str) -> Option<&Project> {
        let query = query.trim();
        if query.is_empty() {
            return None;
        }
        if let Some(project) = self.get(query) {
            return Some(project);
        }
        let mut prefixed = self.projects.iter().filter(|project| project.id.starts_with(query));
        if let (Some(project), None) = (prefixed.next(), prefixed.next()) {
            return Some(project);
        }
        let mut named = self
            .projects
            .iter()
            .filter(|project| project.name.eq_ignore_ascii_case(query));
        match (named.next(), named.next()) {
            (Some(project), None) => Some(project),
            _ => None,
        }
    }

    /// Create a project with the default skeleton and select it.
    pub fn create_project(&mut self, name: &str) -> Result<&Project, Rejection> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Rejection::EmptyName);
        }
        let project = Project::new(name);
        self.active_id = Some(project.id.clone());
        self.projects.push(project);
        Ok(&self.projects[self.projects.len() - 1])
    }

    /// Delete a project, clearing the selection if it pointed at it.
    pub fn delete_project(&mut self, id: &str) -> bool {
        let before = self.projects.len();
        self.projects.retain(|project| project.id != id);
        if self.active_id.as_deref() == Some(id) {
            self.active_id = None;
        }
        self.projects.len() != before
    }

    /// Change the selection. `None` returns to the project list.
    pub fn select(&mut self, id: Option<&str>) -> CoreResult<()> {
        match id {
            Some(id) if self.get(id).is_none() => Err(CoreError::NotFound(format!("project {id}"))),
            Some(id) => {
                self.active_id = Some(id.to_string());
                Ok(())
            }
            None => {
                self.active_id = None;
                Ok(())
            }
        }
    }

    /// Publish a new snapshot of an existing project.
    pub fn replace(&mut self, project: Project) -> bool {
        match self.projects.iter_mut().find(|existing| existing.id == project.id) {
            Some(existing) => {
                *existing = project;
                true
            }
            None => false,
        }
    }

    /// Replace every project at once, as after a backup restore.
    pub fn replace_all(&mut self, projects: Vec<Project>) {
        let active_id = self.active_id.take();
        *self = Self::new(projects, active_id);
    }

    /// Apply an edit to a project and publish the result.
    pub fn apply(
        &mut self,
        project_id: &str,
        edit: &Edit,
        policy: RoundPolicy,
    ) -> CoreResult<&Project> {
        let current = self
            .get(project_id)
            .ok_or_else(|| CoreError::NotFound(format!("project {project_id}")))?;
        let next = apply_edit_with(current, edit, policy)?;
        let index = self
            .projects
            .iter()
            .position(|project| project.id == project_id)
            .ok_or_else(|| CoreError::NotFound(format!("project {project_id}")))?;
        self.projects[index] = next;
        Ok(&self.projects[index])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryStore;

    #[test]
    fn create_selects_new_project() {
        let mut workspace = Workspace::default();
        let id = workspace.create_project("  Oak St ").expect("create").id.clone();
        assert_eq!(workspace.active_id(), Some(id.as_str()));
        assert_eq!(workspace.active().map(|p| p.name.as_str()), Some("Oak St"));
        assert_eq!(workspace.create_project(" "), Err(Rejection::EmptyName));
    }

    #[test]
    fn deleting_active_project_clears_selection() {
        let mut workspace = Workspace::default();
        let first = workspace.create_project("Oak St").expect("create").id.clone();
        let second = workspace.create_project("Elm Ave").expect("create").id.clone();
        workspace.select(Some(&first)).expect("select");
        assert!(workspace.delete_project(&second));
        assert_eq!(workspace.active_id(), Some(first.as_str()));
        assert!(workspace.delete_project(&first));
        assert_eq!(workspace.active_id(), None);
        assert!(!workspace.delete_project("missing"));
    }

    #[test]
    fn stale_active_id_is_dropped_on_load() {
        let store = MemoryStore::default();
        store.save_projects(&[Project::with_id("p1", "Oak St")]).expect("save");
        store.save_active_id(Some("gone")).expect("save id");
        let workspace = Workspace::load(&store).expect("load");
        assert_eq!(workspace.active_id(), None);
    }

    #[test]
    fn save_and_load_round_trip() {
        let store = MemoryStore::default();
        let mut workspace = Workspace::default();
        workspace.create_project("Oak St").expect("create");
        workspace.save(&store).expect("save");
        assert_eq!(Workspace::load(&store).expect("load"), workspace);
    }

    #[test]
    fn resolve_accepts_prefix_and_name() {
        let workspace = Workspace::new(
            vec![Project::with_id("abc123", "Oak St"), Project::with_id("abd456", "Elm Ave")],
            None,
        );
        assert_eq!(workspace.resolve("abc").map(|p| p.id.as_str()), Some("abc123"));
        assert!(workspace.resolve("ab").is_none());
        assert_eq!(workspace.resolve("elm ave").map(|p| p.id.as_str()), Some("abd456"));
    }

    #[test]
    fn apply_publishes_new_snapshot() {
        let mut workspace = Workspace::new(vec![Project::with_id("p1", "Oak St")], None);
        workspace
            .apply("p1", &Edit::AddLevel { name: "Attic".into() }, RoundPolicy::Retain)
            .expect("apply");
        assert!(workspace.get("p1").expect("project").has_level("Attic"));
        let err = workspace
            .apply("p1", &Edit::AddLevel { name: "Attic".into() }, RoundPolicy::Retain)
            .expect_err("duplicate");
        assert!(matches!(err, CoreError::Validation(_)));
    }
}
