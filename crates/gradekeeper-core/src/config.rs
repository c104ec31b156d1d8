//! Command-line configuration.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Top-level gradekeeper configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradekeeperConfig {
    /// Default manifest file or directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manifest: Option<PathBuf>,
    /// Default results feed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<PathBuf>,
    /// Output directory for reports.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Report formats written by `grade`.
    #[serde(default = "default_formats")]
    pub formats: Vec<String>,
    /// Max projects graded at once.
    #[serde(default = "default_parallelism")]
    pub parallelism: usize,
    /// Suppress the breakdown on stdout.
    #[serde(default)]
    pub quiet: bool,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./gradekeeper-results")
}
fn default_formats() -> Vec<String> {
    vec!["json".to_string(), "text".to_string()]
}
fn default_parallelism() -> usize {
    4
}

impl Default for GradekeeperConfig {
    fn default() -> Self {
        Self {
            manifest: None,
            results: None,
            output_dir: default_output_dir(),
            formats: default_formats(),
            parallelism: default_parallelism(),
            quiet: false,
        }
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
fn resolve_env_vars(s: &str, lookup: &impl Fn(&str) -> Option<String>) -> String {
    let mut result = s.to_string();
    let mut from = 0;
    while let Some(offset) = result[from..].find("${") {
        let start = from + offset;
        let Some(end) = result[start..].find('}') else {
            break;
        };
        let value = lookup(&result[start + 2..start + end]).unwrap_or_default();
        result = format!("{}{}{}", &result[..start], value, &result[start + end + 1..]);
        from = start + value.len();
    }
    result
}

fn resolve_path(path: &Path, lookup: &impl Fn(&str) -> Option<String>) -> PathBuf {
    PathBuf::from(resolve_env_vars(&path.to_string_lossy(), lookup))
}

impl GradekeeperConfig {
    /// Apply `GRADEKEEPER_*` overrides and resolve `${VAR}` in path values.
    fn apply_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(dir) = lookup("GRADEKEEPER_OUTPUT_DIR") {
            self.output_dir = PathBuf::from(dir);
        }
        if let Some(n) = lookup("GRADEKEEPER_PARALLELISM") {
            self.parallelism = n
                .trim()
                .parse()
                .with_context(|| format!("invalid GRADEKEEPER_PARALLELISM: {n}"))?;
        }

        self.manifest = self.manifest.map(|p| resolve_path(&p, &lookup));
        self.results = self.results.map(|p| resolve_path(&p, &lookup));
        self.output_dir = resolve_path(&self.output_dir, &lookup);
        Ok(self)
    }
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `gradekeeper.toml` in the current directory
/// 2. `~/.config/gradekeeper/config.toml`
///
/// Environment variable overrides: `GRADEKEEPER_OUTPUT_DIR`, `GRADEKEEPER_PARALLELISM`.
pub fn load_config() -> Result<GradekeeperConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<GradekeeperConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("gradekeeper.toml");
        if local.exists() {
            Some(local)
        } else {
            dirs_path()
                .map(|home| home.join("config.toml"))
                .filter(|global| global.exists())
        }
    };

    let config = match config_path {
        Some(path) => {
            tracing::debug!(path = %path.display(), "loading config");
            parse_config(&path)?
        }
        None => GradekeeperConfig::default(),
    };

    config.apply_env(|name| std::env::var(name).ok())
}

fn parse_config(path: &Path) -> Result<GradekeeperConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config: {}", path.display()))?;
    toml::from_str::<GradekeeperConfig>(&content)
        .with_context(|| format!("failed to parse config: {}", path.display()))
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("gradekeeper"))
}
