use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::aggregate::Area;

/// Configuration file structure for buildwatch.
///
/// Holds the static inventory of tracked repositories and pipeline schedules
/// together with provider and notification settings. Configuration files are
/// loaded from the current directory or a specified path.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    /// GitLab connection settings
    #[serde(default)]
    pub gitlab: GitLabConfig,

    /// GitHub connection settings (dependency-update tracking)
    #[serde(default)]
    pub github: GitHubConfig,

    /// Coverage badge lookup settings
    #[serde(default)]
    pub coverage: CoverageConfig,

    /// Notification delivery settings
    #[serde(default)]
    pub notify: NotifyConfig,

    /// Repositories tracked for build status, grouped into areas
    #[serde(default)]
    pub repos: Vec<TrackedRepo>,

    /// Scheduled pipelines tracked for the calendar view
    #[serde(default)]
    pub pipelines: Vec<PipelineDefinition>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct GitLabConfig {
    /// GitLab personal access token
    pub token: Option<String>,

    /// GitLab instance base URL
    #[serde(default = "default_gitlab_base_url")]
    pub base_url: String,

    /// Namespace prefix for tracked repositories (e.g. 'group/subgroup')
    #[serde(default)]
    pub namespace: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct GitHubConfig {
    /// GitHub personal access token
    pub token: Option<String>,

    /// GitHub API base URL
    #[serde(default = "default_github_base_url")]
    pub base_url: String,

    /// GitHub organization mirroring the tracked repositories
    #[serde(default)]
    pub organization: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CoverageConfig {
    /// Coverage badge service base URL
    #[serde(default = "default_coverage_base_url")]
    pub base_url: String,

    /// Organization segment of the badge path
    #[serde(default)]
    pub organization: String,

    /// Branch the coverage badge is read for
    #[serde(default = "default_branch")]
    pub branch: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct NotifyConfig {
    /// Slack incoming webhook URL
    pub webhook_url: Option<String>,

    /// Maximum delivery attempts per message
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Base delay for exponential backoff, in milliseconds
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// UTC hour during which notifications are sent
    #[serde(default = "default_window_hour")]
    pub window_hour_utc: u32,

    /// Append a closing mood message after the area summaries
    #[serde(default)]
    pub mood_enhancer: bool,

    /// Endpoint the mood message is fetched from
    #[serde(default = "default_mood_url")]
    pub mood_url: String,
}

/// One repository tracked for build status reporting.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TrackedRepo {
    /// Repository name
    pub name: String,

    /// Area the repository reports under
    pub area: Area,

    /// Branches tracked for this repository
    #[serde(default = "default_branches")]
    pub branches: Vec<String>,

    /// Namespace override when the repository lives outside the default one
    pub namespace: Option<String>,

    /// Whether the repository counts toward product coverage
    #[serde(default)]
    pub is_product: bool,
}

impl TrackedRepo {
    /// Full project path of the repository on the CI provider.
    pub fn full_path(&self, default_namespace: &str) -> String {
        let namespace = self.namespace.as_deref().unwrap_or(default_namespace);
        if namespace.is_empty() {
            self.name.clone()
        } else {
            format!("{namespace}/{}", self.name)
        }
    }
}

/// One trackable scheduled pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PipelineDefinition {
    /// Human-facing pipeline name, unique within the configuration
    pub name: String,

    /// Project path owning the schedule (e.g. 'group/project')
    pub project: String,

    /// Pipeline schedule identifier
    pub schedule_id: u64,
}

impl Default for GitLabConfig {
    fn default() -> Self {
        Self {
            token: None,
            base_url: default_gitlab_base_url(),
            namespace: String::new(),
        }
    }
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            token: None,
            base_url: default_github_base_url(),
            organization: String::new(),
        }
    }
}

impl Default for CoverageConfig {
    fn default() -> Self {
        Self {
            base_url: default_coverage_base_url(),
            organization: String::new(),
            branch: default_branch(),
        }
    }
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            window_hour_utc: default_window_hour(),
            mood_enhancer: false,
            mood_url: default_mood_url(),
        }
    }
}

fn default_gitlab_base_url() -> String {
    "https://gitlab.com".to_string()
}

fn default_github_base_url() -> String {
    "https://api.github.com".to_string()
}

fn default_coverage_base_url() -> String {
    "https://coveralls.io".to_string()
}

fn default_branch() -> String {
    "master".to_string()
}

fn default_branches() -> Vec<String> {
    vec![default_branch()]
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    1000
}

fn default_window_hour() -> u32 {
    7
}

fn default_mood_url() -> String {
    "https://v2.jokeapi.dev/joke/Programming?blacklistFlags=nsfw,sexist,racist".to_string()
}

impl Config {
    /// Load configuration from a file.
    ///
    /// Searches for configuration files in this order:
    /// 1. Specified path
    /// 2. ./buildwatch.toml
    /// 3. ./buildwatch.json
    /// 4. ./buildwatch.yaml
    /// 5. ./buildwatch.yml
    ///
    /// Returns default configuration if no file is found.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load_from_path(path);
        }

        let candidates = [
            "buildwatch.toml",
            "buildwatch.json",
            "buildwatch.yaml",
            "buildwatch.yml",
        ];

        for candidate in &candidates {
            let path = Path::new(candidate);
            if path.exists() {
                return Self::load_from_path(path);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file path.
    fn load_from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let extension = path.extension().and_then(|ext| ext.to_str()).unwrap_or("");

        match extension {
            "toml" => toml::from_str(&contents)
                .with_context(|| format!("Failed to parse TOML config: {}", path.display())),
            "json" => serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse JSON config: {}", path.display())),
            "yaml" | "yml" => serde_yaml::from_str(&contents)
                .with_context(|| format!("Failed to parse YAML config: {}", path.display())),
            _ => toml::from_str(&contents)
                .or_else(|_| serde_json::from_str(&contents))
                .or_else(|_| serde_yaml::from_str(&contents))
                .with_context(|| format!("Failed to parse config file: {}", path.display())),
        }
    }

    /// Repositories flagged as product repositories (coverage is tracked for these).
    pub fn product_repos(&self) -> impl Iterator<Item = &TrackedRepo> {
        self.repos.iter().filter(|repo| repo.is_product)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.gitlab.base_url, "https://gitlab.com");
        assert_eq!(config.coverage.branch, "master");
        assert_eq!(config.notify.max_attempts, 3);
        assert_eq!(config.notify.window_hour_utc, 7);
        assert!(config.repos.is_empty());
        assert!(config.pipelines.is_empty());
    }

    #[test]
    fn test_load_toml_config() {
        let mut temp_file = NamedTempFile::with_suffix(".toml").unwrap();
        let toml_content = r#"
[gitlab]
token = "glpat-test-token"
base-url = "https://gitlab.example.com"
namespace = "acme/products"

[notify]
webhook-url = "https://hooks.slack.com/services/T0/B0/x"
max-attempts = 5
window-hour-utc = 9

[[repos]]
name = "widget-server"
area = "backend"
is-product = true

[[repos]]
name = "widget-docs"
area = "docs"
branches = ["main", "hosted"]

[[pipelines]]
name = "widget-nightly"
project = "acme/products/widget-qa"
schedule-id = 30585
"#;
        write!(temp_file, "{}", toml_content).unwrap();

        let config = Config::load_from_path(temp_file.path()).unwrap();
        assert_eq!(config.gitlab.token, Some("glpat-test-token".to_string()));
        assert_eq!(config.gitlab.base_url, "https://gitlab.example.com");
        assert_eq!(config.notify.max_attempts, 5);
        assert_eq!(config.notify.window_hour_utc, 9);
        assert_eq!(config.repos.len(), 2);
        assert_eq!(config.repos[0].area, Area::Backend);
        assert!(config.repos[0].is_product);
        assert_eq!(config.repos[0].branches, vec!["master".to_string()]);
        assert_eq!(
            config.repos[1].branches,
            vec!["main".to_string(), "hosted".to_string()]
        );
        assert_eq!(config.pipelines[0].schedule_id, 30585);
    }

    #[test]
    fn test_load_json_config() {
        let mut temp_file = NamedTempFile::with_suffix(".json").unwrap();
        let json_content = r#"{
  "gitlab": {
    "token": "glpat-json-token",
    "base-url": "https://gitlab.json.com"
  },
  "repos": [
    { "name": "widget-client", "area": "client" }
  ]
}"#;
        write!(temp_file, "{}", json_content).unwrap();

        let config = Config::load_from_path(temp_file.path()).unwrap();
        assert_eq!(config.gitlab.token, Some("glpat-json-token".to_string()));
        assert_eq!(config.repos[0].area, Area::Client);
    }

    #[test]
    fn test_load_nonexistent_config() {
        let result = Config::load_from_path(Path::new("nonexistent.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_full_path_resolution() {
        let repo = TrackedRepo {
            name: "widget-server".to_string(),
            area: Area::Backend,
            branches: default_branches(),
            namespace: None,
            is_product: false,
        };
        assert_eq!(repo.full_path("acme/products"), "acme/products/widget-server");
        assert_eq!(repo.full_path(""), "widget-server");

        let overridden = TrackedRepo {
            namespace: Some("acme/saas".to_string()),
            ..repo
        };
        assert_eq!(overridden.full_path("acme/products"), "acme/saas/widget-server");
    }

    #[test]
    fn test_product_repos_filter() {
        let config = Config {
            repos: vec![
                TrackedRepo {
                    name: "a".to_string(),
                    area: Area::Client,
                    branches: default_branches(),
                    namespace: None,
                    is_product: true,
                },
                TrackedRepo {
                    name: "b".to_string(),
                    area: Area::Qa,
                    branches: default_branches(),
                    namespace: None,
                    is_product: false,
                },
            ],
            ..Config::default()
        };

        let product: Vec<_> = config.product_repos().map(|r| r.name.as_str()).collect();
        assert_eq!(product, vec!["a"]);
    }
}
