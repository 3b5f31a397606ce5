//! Filesystem-backed persistence for FrameCheck.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use fc_core::{load_projects, CoreError, CoreResult, Project, ProjectStore, RoundPolicy};

/// Default directory name for the data store.
pub const DATA_DIR_NAME: &str = "framecheck";

const CONFIG_FILE_NAME: &str = "config.yaml";
const PROJECTS_FILE_NAME: &str = "projects.json";
const ACTIVE_FILE_NAME: &str = "active_project";

/// Environment override for the data directory.
pub const PATH_ENV: &str = "FRAMECHECK_PATH";
/// Environment override for the GitHub token.
pub const TOKEN_ENV: &str = "FRAMECHECK_GITHUB_TOKEN";

/// Filesystem-backed project store.
#[derive(Debug, Clone)]
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    /// Create a new store rooted at the provided path.
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Get the root path of the store.
    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Resolve the default data path (~/.framecheck).
    pub fn default_path() -> CoreResult<PathBuf> {
        if let Some(dir) = dirs::home_dir() {
            return Ok(dir.join(format!(".{DATA_DIR_NAME}")));
        }
        Err(CoreError::Storage(
            "unable to determine a default data path".into(),
        ))
    }

    /// Check if the store exists at the root path.
    pub fn exists(&self) -> bool {
        self.root.is_dir()
    }

    /// Initialize the store directory.
    pub fn init(&self) -> CoreResult<()> {
        fs::create_dir_all(&self.root).map_err(|err| CoreError::Storage(err.to_string()))
    }

    fn projects_path(&self) -> PathBuf {
        self.root.join(PROJECTS_FILE_NAME)
    }

    fn active_path(&self) -> PathBuf {
        self.root.join(ACTIVE_FILE_NAME)
    }

    /// Read the raw serialized project list, if one was ever written.
    pub fn read_raw_projects(&self) -> CoreResult<Option<String>> {
        let path = self.projects_path();
        if !path.exists() {
            return Ok(None);
        }
        fs::read_to_string(&path)
            .map(Some)
            .map_err(|err| CoreError::Storage(err.to_string()))
    }
}

impl ProjectStore for FsStore {
    fn load_projects(&self) -> Vec<Project> {
        match self.read_raw_projects() {
            Ok(contents) => load_projects(contents.as_deref()),
            Err(err) => {
                warn!(
                    path = %self.projects_path().display(),
                    error = %err,
                    "unable to read projects"
                );
                Vec::new()
            }
        }
    }

    fn save_projects(&self, projects: &[Project]) -> CoreResult<()> {
        let contents = serde_json::to_string_pretty(projects)
            .map_err(|err| CoreError::Storage(err.to_string()))?;
        write_atomic(&self.projects_path(), contents.as_bytes())?;
        debug!(count = projects.len(), "saved projects");
        Ok(())
    }

    fn load_active_id(&self) -> CoreResult<Option<String>> {
        let path = self.active_path();
        if !path.exists() {
            return Ok(None);
        }
        let contents =
            fs::read_to_string(&path).map_err(|err| CoreError::Storage(err.to_string()))?;
        let id = contents.trim();
        Ok((!id.is_empty()).then(|| id.to_string()))
    }

    fn save_active_id(&self, id: Option<&str>) -> CoreResult<()> {
        let path = self.active_path();
        match id {
            Some(id) => write_atomic(&path, id.as_bytes()),
            None if path.exists() => {
                fs::remove_file(path).map_err(|err| CoreError::Storage(err.to_string()))
            }
            None => Ok(()),
        }
    }
}

/// Replace a file in one step so readers never see a partial write.
pub fn write_atomic(path: &Path, contents: &[u8]) -> CoreResult<()> {
    let parent = path
        .parent()
        .ok_or_else(|| CoreError::Storage(format!("{} has no parent", path.display())))?;
    fs::create_dir_all(parent).map_err(|err| CoreError::Storage(err.to_string()))?;
    let mut file =
        NamedTempFile::new_in(parent).map_err(|err| CoreError::Storage(err.to_string()))?;
    file.write_all(contents)
        .map_err(|err| CoreError::Storage(err.to_string()))?;
    file.persist(path)
        .map_err(|err| CoreError::Storage(err.to_string()))?;
    Ok(())
}

/// Application settings persisted between runs.
#[derive(Debug, Default, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct AppConfig {
    /// Data directory override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_path: Option<String>,
    /// GitHub token used for gist backups.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github_token: Option<String>,
    /// Gist that holds the backup document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gist_id: Option<String>,
    /// Time of the last successful push or pull.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_sync: Option<DateTime<Utc>>,
    /// Whether PASS resets the escalation round.
    #[serde(default)]
    pub round_policy: RoundPolicy,
}

impl AppConfig {
    /// Token from the environment, falling back to the config file.
    pub fn resolved_token(&self) -> Option<String> {
        if let Ok(value) = std::env::var(TOKEN_ENV) {
            if !value.trim().is_empty() {
                return Some(value.trim().to_string());
            }
        }
        self.github_token
            .as_deref()
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(str::to_string)
    }

    /// Forget the stored credential and gist id.
    pub fn clear_sync(&mut self) {
        self.github_token = None;
        self.gist_id = None;
    }
}

/// Location of the config file.
pub fn config_path() -> CoreResult<PathBuf> {
    if let Some(dir) = dirs::config_dir() {
        return Ok(dir.join(DATA_DIR_NAME).join(CONFIG_FILE_NAME));
    }
    Err(CoreError::Storage(
        "unable to determine config directory".into(),
    ))
}

/// Load the config from the default location.
pub fn load_config() -> CoreResult<AppConfig> {
    load_config_from(&config_path()?)
}

/// Load the config from an explicit file; a missing file yields defaults.
pub fn load_config_from(path: &Path) -> CoreResult<AppConfig> {
    if !path.exists() {
        return Ok(AppConfig::default());
    }
    let contents =
        fs::read_to_string(path).map_err(|err| CoreError::Storage(err.to_string()))?;
    serde_yaml::from_str(&contents).map_err(|err| CoreError::Storage(err.to_string()))
}

/// Save the config to the default location.
pub fn save_config(config: &AppConfig) -> CoreResult<()> {
    save_config_to(&config_path()?, config)
}

/// Save the config to an explicit file.
pub fn save_config_to(path: &Path, config: &AppConfig) -> CoreResult<()> {
    let contents =
        serde_yaml::to_string(config).map_err(|err| CoreError::Storage(err.to_string()))?;
    write_atomic(path, contents.as_bytes())
}

/// Remember a data directory in the config.
pub fn set_data_path(path: &Path) -> CoreResult<()> {
    let mut config = load_config()?;
    config.data_path = Some(path.to_string_lossy().to_string());
    save_config(&config)
}

/// Resolve the data directory: env var, then config, then the default.
pub fn resolve_data_path(config: &AppConfig) -> CoreResult<PathBuf> {
    if let Ok(value) = std::env::var(PATH_ENV) {
        if !value.trim().is_empty() {
            return Ok(PathBuf::from(value));
        }
    }

    if let Some(path) = &config.data_path {
        if !path.trim().is_empty() {
            return Ok(PathBuf::from(path));
        }
    }

    FsStore::default_path()
}

#[cfg(test)]
mod tests {
    use super::*;
    use fc_core::Workspace;
    use tempfile::TempDir;

    #[test]
    fn round_trip_projects_and_selection() {
        let temp = TempDir::new().expect("temp dir");
        let store = FsStore::new(temp.path().join("data"));
        store.init().expect("init");
        assert!(store.exists());

        let mut workspace = Workspace::default();
        workspace.create_project("Oak St").expect("create");
        workspace.save(&store).expect("save");

        let loaded = Workspace::load(&store).expect("load");
        assert_eq!(loaded, workspace);
    }

    #[test]
    fn missing_files_load_empty() {
        let temp = TempDir::new().expect("temp dir");
        let store = FsStore::new(temp.path().to_path_buf());
        assert!(store.load_projects().is_empty());
        assert_eq!(store.load_active_id().expect("active"), None);
    }

    #[test]
    fn corrupt_projects_file_degrades_to_empty() {
        let temp = TempDir::new().expect("temp dir");
        let store = FsStore::new(temp.path().to_path_buf());
        fs::write(temp.path().join(PROJECTS_FILE_NAME), "{{{ not json").expect("write");
        assert!(store.load_projects().is_empty());
    }

    #[test]
    fn legacy_file_is_migrated_on_load() {
        let temp = TempDir::new().expect("temp dir");
        let store = FsStore::new(temp.path().to_path_buf());
        fs::write(
            temp.path().join(PROJECTS_FILE_NAME),
            r#"[{"id":"k3j9x0a1b","name":"Old Site"}]"#,
        )
        .expect("write");
        let projects = store.load_projects();
        assert_eq!(projects.len(), 1);
        projects[0].validate().expect("valid");
    }

    #[test]
    fn clearing_selection_removes_file() {
        let temp = TempDir::new().expect("temp dir");
        let store = FsStore::new(temp.path().to_path_buf());
        store.save_active_id(Some("abc")).expect("save");
        assert_eq!(store.load_active_id().expect("load"), Some("abc".into()));
        store.save_active_id(None).expect("clear");
        assert!(!temp.path().join(ACTIVE_FILE_NAME).exists());
        store.save_active_id(None).expect("clear twice");
    }

    #[test]
    fn config_round_trip() {
        let temp = TempDir::new().expect("temp dir");
        let path = temp.path().join("nested").join(CONFIG_FILE_NAME);
        assert_eq!(load_config_from(&path).expect("default"), AppConfig::default());
        let config = AppConfig {
            data_path: Some("/tmp/framecheck".into()),
            github_token: Some("ghp_test".into()),
            gist_id: Some("abc".into()),
            last_sync: None,
            round_policy: RoundPolicy::ResetOnPass,
        };
        save_config_to(&path, &config).expect("save");
        assert_eq!(load_config_from(&path).expect("load"), config);
    }

    #[test]
    fn config_path_beats_default() {
        let config = AppConfig {
            data_path: Some("/srv/framecheck".into()),
            ..AppConfig::default()
        };
        if std::env::var(PATH_ENV).is_err() {
            assert_eq!(
                resolve_data_path(&config).expect("resolve"),
                PathBuf::from("/srv/framecheck")
            );
        }
    }
}
