//! Application configuration for docbuild.
//!
//! Config lives in `docbuild.toml` at the project root, with a user-level
//! fallback at `~/.docbuild/docbuild.toml`. CLI flags override config file
//! values, which override defaults. The defaults reproduce the classic
//! layout: a `wiki/` source directory compiled into `README.html` and
//! `HOWTO.html`, converted to the matching Markdown files.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{DocBuildError, Result};
use crate::types::DocumentPair;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "docbuild.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".docbuild";

// ---------------------------------------------------------------------------
// Config structs (matching docbuild.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Project layout.
    #[serde(default)]
    pub project: ProjectConfig,

    /// External tool commands.
    #[serde(default)]
    pub tools: ToolsConfig,

    /// Document pairs to build (HTML intermediate, Markdown target).
    #[serde(default = "default_documents")]
    pub documents: Vec<DocumentPair>,

    /// Failure and pause behavior.
    #[serde(default)]
    pub behavior: BehaviorConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            project: ProjectConfig::default(),
            tools: ToolsConfig::default(),
            documents: default_documents(),
            behavior: BehaviorConfig::default(),
        }
    }
}

fn default_documents() -> Vec<DocumentPair> {
    vec![
        DocumentPair::new("README.html", "README.md"),
        DocumentPair::new("HOWTO.html", "HOWTO.md"),
    ]
}

/// `[project]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Project root directory; the whole build runs with this as its
    /// working directory.
    #[serde(default = "default_root")]
    pub root: String,

    /// Wiki source directory, relative to the project root.
    #[serde(default = "default_wiki_dir")]
    pub wiki_dir: String,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            wiki_dir: default_wiki_dir(),
        }
    }
}

fn default_root() -> String {
    ".".into()
}
fn default_wiki_dir() -> String {
    "wiki".into()
}

/// `[tools]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Wiki compiler (wiki markup to static HTML).
    #[serde(default = "default_compiler")]
    pub compiler: ToolConfig,

    /// HTML-to-Markdown converter (writes to stdout).
    #[serde(default = "default_converter")]
    pub converter: ToolConfig,
}

/// A single external tool: command, base arguments, and probe arguments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolConfig {
    /// Executable name or path.
    pub command: String,

    /// Arguments always passed before the per-invocation argument.
    #[serde(default)]
    pub args: Vec<String>,

    /// Arguments used by `docbuild check` to probe availability.
    #[serde(default = "default_probe_args")]
    pub probe_args: Vec<String>,
}

fn default_compiler() -> ToolConfig {
    ToolConfig {
        command: "tiddlywiki".into(),
        args: vec!["--build".into()],
        probe_args: default_probe_args(),
    }
}

fn default_converter() -> ToolConfig {
    ToolConfig {
        command: "html2text".into(),
        args: Vec::new(),
        probe_args: default_probe_args(),
    }
}

fn default_probe_args() -> Vec<String> {
    vec!["--version".into()]
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            compiler: default_compiler(),
            converter: default_converter(),
        }
    }
}

/// `[behavior]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BehaviorConfig {
    /// Abort remaining steps on the first failure instead of continuing.
    #[serde(default)]
    pub fail_fast: bool,

    /// When to pause for user acknowledgment before exit.
    #[serde(default)]
    pub pause: PauseMode,
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            fail_fast: false,
            pause: PauseMode::default(),
        }
    }
}

/// Interactive pause policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PauseMode {
    /// Pause only when stdin and stdout are both terminals.
    #[default]
    Auto,
    /// Always pause.
    Always,
    /// Never pause.
    Never,
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the user-level config directory (`~/.docbuild/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| DocBuildError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the user-level config file (`~/.docbuild/docbuild.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Resolve which config file to load: explicit path, then `./docbuild.toml`,
/// then the user-level file. Returns `None` when no file exists.
pub fn find_config(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
    if let Some(path) = explicit {
        if !path.exists() {
            return Err(DocBuildError::config(format!(
                "config file not found: {}",
                path.display()
            )));
        }
        return Ok(Some(path.to_path_buf()));
    }

    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.exists() {
        return Ok(Some(local));
    }

    let user = config_file_path()?;
    if user.exists() {
        return Ok(Some(user));
    }

    Ok(None)
}

/// Load the application config. Returns defaults if no config file exists.
pub fn load_config(explicit: Option<&Path>) -> Result<AppConfig> {
    match find_config(explicit)? {
        Some(path) => load_config_from(&path),
        None => {
            tracing::debug!("no config file found, using defaults");
            Ok(AppConfig::default())
        }
    }
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| DocBuildError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| DocBuildError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Write a default `docbuild.toml` into the current directory.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let path = PathBuf::from(CONFIG_FILE_NAME);
    if path.exists() {
        return Err(DocBuildError::config(format!(
            "{} already exists",
            path.display()
        )));
    }

    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| DocBuildError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| DocBuildError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Check that the config describes a runnable build.
pub fn validate_config(config: &AppConfig) -> Result<()> {
    if config.documents.is_empty() {
        return Err(DocBuildError::validation("no document pairs configured"));
    }
    for doc in &config.documents {
        if doc.html.as_os_str().is_empty() || doc.markdown.as_os_str().is_empty() {
            return Err(DocBuildError::validation(
                "document pair with empty html or markdown path",
            ));
        }
    }
    if config.tools.compiler.command.is_empty() || config.tools.converter.command.is_empty() {
        return Err(DocBuildError::validation("tool command must not be empty"));
    }
    Ok(())
}
