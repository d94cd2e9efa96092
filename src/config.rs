use serde::Deserialize;
use std::fs;
use std::path::Path;
use thiserror::Error;

pub const DEFAULT_API_URL: &str = "https://api.github.com";
pub const DEFAULT_USER_AGENT: &str = "gh-compare";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Top-level configuration loaded from .gh-compare.toml.
/// All fields are optional; the tool works with zero config.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// GitHub-specific settings
    #[serde(default)]
    pub github: GitHubConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GitHubConfig {
    /// GitHub API token. If None, falls back to GITHUB_TOKEN env var.
    pub token: Option<String>,
    /// API root, e.g. https://github.example.com/api/v3 for GitHub Enterprise
    pub api_url: String,
    pub user_agent: String,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            token: None,
            api_url: DEFAULT_API_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl Config {
    /// Load configuration from .gh-compare.toml in the current directory.
    /// Returns default config if the file doesn't exist.
    pub fn load() -> Result<Config, ConfigError> {
        let path = Path::new(".gh-compare.toml");
        let mut config = if path.exists() {
            Self::load_from(path)?
        } else {
            Config::default()
        };

        config.github.token = resolve_token(
            config.github.token.take(),
            std::env::var("GITHUB_TOKEN").ok(),
        );
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Config, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// The token resolved by `load`, if any.
    pub fn github_token(&self) -> Option<String> {
        self.github.token.clone()
    }
}

/// Config file value wins over GITHUB_TOKEN. A blank token on either side
/// counts as unset, so `token = ""` still falls through to the environment
/// and an empty result means anonymous access.
fn resolve_token(from_file: Option<String>, from_env: Option<String>) -> Option<String> {
    let present = |token: &String| !token.trim().is_empty();
    from_file.filter(present).or_else(|| from_env.filter(present))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.github.token.is_none());
        assert_eq!(config.github.api_url, DEFAULT_API_URL);
        assert_eq!(config.github.user_agent, DEFAULT_USER_AGENT);
    }

    #[test]
    fn test_parse_config_toml() {
        let toml_str = r#"
[github]
token = "ghp_example"
api_url = "https://github.example.com/api/v3"
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.github.token.as_deref(), Some("ghp_example"));
        assert_eq!(config.github.api_url, "https://github.example.com/api/v3");
        assert_eq!(config.github.user_agent, DEFAULT_USER_AGENT);
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.github.api_url, DEFAULT_API_URL);
    }

    #[test]
    fn test_config_token_wins() {
        let mut config = Config::default();
        config.github.token = Some("from-file".to_string());
        assert_eq!(config.github_token().as_deref(), Some("from-file"));
    }

    #[test]
    fn test_resolve_token_prefers_file() {
        let token = resolve_token(Some("from-file".to_string()), Some("from-env".to_string()));
        assert_eq!(token.as_deref(), Some("from-file"));
    }

    #[test]
    fn test_resolve_token_blank_file_falls_back_to_env() {
        let token = resolve_token(Some(String::new()), Some("from-env".to_string()));
        assert_eq!(token.as_deref(), Some("from-env"));
        let token = resolve_token(Some("  ".to_string()), None);
        assert_eq!(token, None);
    }

    #[test]
    fn test_resolve_token_blank_env_is_anonymous() {
        assert_eq!(resolve_token(None, Some(String::new())), None);
        assert_eq!(resolve_token(None, None), None);
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join("gh_compare_test_config.toml");
        fs::write(&path, "[github]\nuser_agent = \"custom-agent\"\n").unwrap();
        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.github.user_agent, "custom-agent");
        fs::remove_file(&path).ok();
    }

    #[test]
    fn test_load_from_missing_file() {
        let path = std::env::temp_dir().join("gh_compare_does_not_exist.toml");
        assert!(matches!(Config::load_from(&path), Err(ConfigError::FileRead(_))));
    }
}
