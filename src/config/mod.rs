pub mod types;

use crate::analyzer::kubepolicy::{RuleId, Severity};
use crate::error::{ConfigError, KubePolicyError, Result};
use std::fs;
use std::path::{Path, PathBuf};

pub use types::Config;

const CONFIG_FILE_NAME: &str = ".kubepolicy.toml";

/// Get the global config file path (~/.kubepolicy.toml)
pub fn global_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(CONFIG_FILE_NAME))
}

/// Get the local config file path (project/.kubepolicy.toml)
pub fn local_config_path(project_path: &Path) -> PathBuf {
    project_path.join(CONFIG_FILE_NAME)
}

/// Load configuration from file or use defaults.
///
/// An explicit file must exist. Otherwise the local config is tried first,
/// then the global one.
pub fn load_config(explicit: Option<&Path>, project_path: &Path) -> Result<Config> {
    if let Some(path) = explicit {
        if !path.is_file() {
            return Err(ConfigError::NotFound(path.to_path_buf()).into());
        }
        return read_config(path);
    }

    let local = local_config_path(project_path);
    if local.is_file() {
        return read_config(&local);
    }

    if let Some(global) = global_config_path().filter(|p| p.is_file()) {
        return read_config(&global);
    }

    Ok(Config::default())
}

fn read_config(path: &Path) -> Result<Config> {
    let content = fs::read_to_string(path).map_err(|source| KubePolicyError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let config = parse_config(&content)
        .map_err(|e| ConfigError::ParsingFailed(format!("{}: {e}", path.display())))?;
    log::debug!("Loaded configuration from {}", path.display());
    Ok(config)
}

/// Parse a TOML configuration document.
pub fn parse_config(content: &str) -> std::result::Result<Config, toml::de::Error> {
    toml::from_str(content)
}

/// Values layered on top of a loaded [`Config`].
///
/// Built once from the environment and once from the command line; `None`
/// leaves the underlying value untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overrides {
    pub include_globs: Option<Vec<String>>,
    pub exclude_globs: Option<Vec<String>>,
    pub file_globs: Option<Vec<String>>,
    pub severity_threshold: Option<Severity>,
    pub post_pr_comment: Option<bool>,
    pub github_token: Option<String>,
    pub json_output: Option<PathBuf>,
    pub no_fallback_all: Option<bool>,
    pub jobs: Option<usize>,
    pub disabled_rules: Vec<RuleId>,
}

impl Overrides {
    /// Read the GitHub Action inputs and `KPB_*` variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let severity_threshold = match var("INPUT_SEVERITY_THRESHOLD") {
            Some(value) => Some(parse_threshold(&value)?),
            None => None,
        };

        Ok(Self {
            include_globs: var("INPUT_INCLUDE_GLOB").map(|v| split_globs(&v)),
            exclude_globs: var("INPUT_EXCLUDE_GLOB").map(|v| split_globs(&v)),
            file_globs: var("KPB_FILE_GLOBS").map(|v| split_globs(&v)),
            severity_threshold,
            post_pr_comment: var("INPUT_POST_PR_COMMENT").map(|v| parse_bool(&v)),
            github_token: var("INPUT_GITHUB_TOKEN"),
            json_output: var("KPB_JSON_OUTPUT").map(PathBuf::from),
            no_fallback_all: var("KPB_NO_FALLBACK_ALL").map(|v| parse_bool(&v)),
            jobs: None,
            disabled_rules: Vec::new(),
        })
    }

    pub fn apply(self, config: &mut Config) {
        if let Some(v) = self.include_globs {
            config.include_globs = v;
        }
        if let Some(v) = self.exclude_globs {
            config.exclude_globs = v;
        }
        if let Some(v) = self.file_globs {
            config.file_globs = v;
        }
        if let Some(v) = self.severity_threshold {
            config.severity_threshold = v;
        }
        if let Some(v) = self.post_pr_comment {
            config.post_pr_comment = v;
        }
        if let Some(v) = self.github_token {
            config.github_token = Some(v);
        }
        if let Some(v) = self.json_output {
            config.json_output = Some(v);
        }
        if let Some(v) = self.no_fallback_all {
            config.no_fallback_all = v;
        }
        if let Some(v) = self.jobs {
            config.jobs = Some(v);
        }
        for rule in self.disabled_rules {
            if !config.disabled_rules.contains(&rule) {
                config.disabled_rules.push(rule);
            }
        }
    }
}

/// Split a comma-separated glob list, dropping blanks.
pub fn split_globs(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

/// `1`, `true`, `yes` and `on` are true; anything else is false.
pub fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

pub fn parse_threshold(value: &str) -> Result<Severity> {
    Severity::parse(value).ok_or_else(|| {
        ConfigError::InvalidValue {
            field: "severity_threshold",
            value: value.to_string(),
        }
        .into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn env(pairs: &[(&str, &str)]) -> Overrides {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Overrides::from_lookup(|name| map.get(name).cloned()).unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.include_globs, vec!["**/*.yml", "**/*.yaml"]);
        assert!(config.exclude_globs.is_empty());
        assert_eq!(config.severity_threshold, Severity::Error);
        assert!(config.post_pr_comment);
        assert!(!config.no_fallback_all);
        assert!(!config.has_file_globs());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = parse_config(
            r#"
severity_threshold = "warning"
exclude_globs = ["charts/**"]
disabled_rules = ["missing-probe", "image-tag"]
"#,
        )
        .unwrap();
        assert_eq!(config.severity_threshold, Severity::Warning);
        assert_eq!(config.exclude_globs, vec!["charts/**"]);
        assert_eq!(
            config.disabled_rules,
            vec![RuleId::MissingProbe, RuleId::ImageTag]
        );
        assert_eq!(config.include_globs, Config::default().include_globs);
        assert!(config.post_pr_comment);
    }

    #[test]
    fn test_unknown_threshold_in_toml_is_rejected() {
        assert!(parse_config("severity_threshold = \"fatal\"").is_err());
    }

    #[test]
    fn test_split_globs() {
        assert_eq!(split_globs("a/*.yaml, ,b/**"), vec!["a/*.yaml", "b/**"]);
        assert!(split_globs(" , ").is_empty());
    }

    #[test]
    fn test_parse_bool() {
        for v in ["1", "true", "TRUE", " yes ", "On"] {
            assert!(parse_bool(v), "{v}");
        }
        for v in ["0", "false", "no", "off", "maybe"] {
            assert!(!parse_bool(v), "{v}");
        }
    }

    #[test]
    fn test_env_overrides() {
        let overrides = env(&[
            ("INPUT_INCLUDE_GLOB", "deploy/**/*.yaml"),
            ("INPUT_EXCLUDE_GLOB", "deploy/legacy/**, tmp/*"),
            ("INPUT_SEVERITY_THRESHOLD", "Warning"),
            ("INPUT_POST_PR_COMMENT", "false"),
            ("INPUT_GITHUB_TOKEN", " ghs_abc "),
            ("KPB_JSON_OUTPUT", "out/summary.json"),
            ("KPB_NO_FALLBACK_ALL", "yes"),
        ]);

        let mut config = Config::default();
        overrides.apply(&mut config);

        assert_eq!(config.include_globs, vec!["deploy/**/*.yaml"]);
        assert_eq!(config.exclude_globs, vec!["deploy/legacy/**", "tmp/*"]);
        assert_eq!(config.severity_threshold, Severity::Warning);
        assert!(!config.post_pr_comment);
        assert_eq!(config.github_token.as_deref(), Some("ghs_abc"));
        assert_eq!(config.json_output, Some(PathBuf::from("out/summary.json")));
        assert!(config.no_fallback_all);
    }

    #[test]
    fn test_empty_env_values_are_unset() {
        let overrides = env(&[("INPUT_POST_PR_COMMENT", ""), ("INPUT_SEVERITY_THRESHOLD", "  ")]);
        assert_eq!(overrides, Overrides::default());
    }

    #[test]
    fn test_invalid_env_threshold() {
        let result = Overrides::from_lookup(|name| {
            (name == "INPUT_SEVERITY_THRESHOLD").then(|| "critical".to_string())
        });
        assert!(matches!(
            result,
            Err(KubePolicyError::Config(ConfigError::InvalidValue { .. }))
        ));
    }

    #[test]
    fn test_later_layers_win() {
        let mut config = parse_config("severity_threshold = \"warning\"\njobs = 2").unwrap();
        env(&[("INPUT_SEVERITY_THRESHOLD", "error")]).apply(&mut config);
        assert_eq!(config.severity_threshold, Severity::Error);

        Overrides {
            severity_threshold: Some(Severity::Warning),
            jobs: Some(8),
            ..Default::default()
        }
        .apply(&mut config);
        assert_eq!(config.severity_threshold, Severity::Warning);
        assert_eq!(config.jobs, Some(8));
    }

    #[test]
    fn test_disabled_rules_accumulate() {
        let mut config = parse_config("disabled_rules = [\"image-tag\"]").unwrap();
        Overrides {
            disabled_rules: vec![RuleId::ImageTag, RuleId::MissingProbe],
            ..Default::default()
        }
        .apply(&mut config);
        assert_eq!(
            config.disabled_rules,
            vec![RuleId::ImageTag, RuleId::MissingProbe]
        );
    }

    #[test]
    fn test_load_local_config() {
        let dir = TempDir::new().unwrap();
        fs::write(local_config_path(dir.path()), "no_fallback_all = true\n").unwrap();
        let config = load_config(None, dir.path()).unwrap();
        assert!(config.no_fallback_all);
    }

    #[test]
    fn test_explicit_config_must_exist() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(matches!(
            load_config(Some(&missing), dir.path()),
            Err(KubePolicyError::Config(ConfigError::NotFound(_)))
        ));
    }

    #[test]
    fn test_malformed_config_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.toml");
        fs::write(&path, "include_globs = 3\n").unwrap();
        assert!(matches!(
            load_config(Some(&path), dir.path()),
            Err(KubePolicyError::Config(ConfigError::ParsingFailed(_)))
        ));
    }
}
