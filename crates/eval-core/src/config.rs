use crate::error::{EvalError, Result};
use crate::paths;
use llm_adapter::AdapterConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// DomainConfig
// ---------------------------------------------------------------------------

/// One evaluation axis. `rubric` and `context` are content names resolved
/// through the [`ContentLibrary`](crate::library::ContentLibrary).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainConfig {
    pub name: String,
    pub rubric: String,
    #[serde(default)]
    pub context: Vec<String>,
}

impl DomainConfig {
    fn standard(name: &str, context: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            rubric: format!("{name}-rubric"),
            context: context.iter().map(|c| c.to_string()).collect(),
        }
    }
}

fn default_domains() -> Vec<DomainConfig> {
    vec![
        DomainConfig::standard("backend", &[]),
        DomainConfig::standard("frontend", &[]),
        DomainConfig::standard("tests", &[]),
        DomainConfig::standard("security", &[]),
    ]
}

// ---------------------------------------------------------------------------
// Config (top-level)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: u32,
    /// LLM command-line tool to drive.
    #[serde(default = "default_executable")]
    pub executable: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Per-invocation limit; `0` disables the timeout.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_streaming")]
    pub streaming: bool,
    #[serde(default = "default_max_score")]
    pub max_score_per_domain: u32,
    #[serde(default = "default_threshold")]
    pub pass_threshold_percent: u32,
    /// Relative paths resolve against the project root.
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
    /// Searched in order when resolving rubric and context names.
    #[serde(default = "default_content_dirs")]
    pub content_dirs: Vec<PathBuf>,
    #[serde(default = "default_domains")]
    pub domains: Vec<DomainConfig>,
}

fn default_version() -> u32 {
    1
}

fn default_executable() -> String {
    "claude".to_string()
}

fn default_timeout_secs() -> u64 {
    30 * 60
}

fn default_streaming() -> bool {
    true
}

fn default_max_score() -> u32 {
    50
}

fn default_threshold() -> u32 {
    70
}

fn default_log_dir() -> PathBuf {
    PathBuf::from(paths::DEFAULT_LOG_DIR)
}

fn default_content_dirs() -> Vec<PathBuf> {
    ["rubrics", "skills", "rules"]
        .into_iter()
        .map(PathBuf::from)
        .collect()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: default_version(),
            executable: default_executable(),
            model: None,
            timeout_secs: default_timeout_secs(),
            streaming: default_streaming(),
            max_score_per_domain: default_max_score(),
            pass_threshold_percent: default_threshold(),
            log_dir: default_log_dir(),
            content_dirs: default_content_dirs(),
            domains: default_domains(),
        }
    }
}

impl Config {
    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        if !path.exists() {
            return Err(EvalError::NotInitialized);
        }
        let data = std::fs::read_to_string(&path)?;
        let cfg: Config = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    /// Like [`Config::load`], but a missing file yields the defaults.
    pub fn load_or_default(root: &Path) -> Result<Self> {
        match Self::load(root) {
            Err(EvalError::NotInitialized) => Ok(Self::default()),
            other => other,
        }
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let path = paths::config_path(root);
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(&path, data.as_bytes())
    }

    pub fn domain_names(&self) -> Vec<String> {
        self.domains.iter().map(|d| d.name.clone()).collect()
    }

    /// Saturates at `u32::MAX`; `validate()` reports that as an error.
    pub fn max_score(&self) -> u32 {
        u32::try_from(self.total_max_score()).unwrap_or(u32::MAX)
    }

    fn total_max_score(&self) -> u64 {
        u64::from(self.max_score_per_domain) * self.domains.len() as u64
    }

    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }

    pub fn adapter_config(&self) -> AdapterConfig {
        AdapterConfig {
            executable: self.executable.clone(),
            model: self.model.clone(),
            timeout: self.timeout(),
            extra_args: Vec::new(),
        }
    }

    pub fn resolve_log_dir(&self, root: &Path) -> PathBuf {
        root.join(&self.log_dir)
    }

    pub fn resolve_content_dirs(&self, root: &Path) -> Vec<PathBuf> {
        self.content_dirs.iter().map(|d| root.join(d)).collect()
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();
        let mut error = |message: String| {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message,
            })
        };

        if self.domains.is_empty() {
            error("no domains configured".to_string());
        }
        if self.max_score_per_domain == 0 {
            error("max_score_per_domain must be greater than 0".to_string());
        }
        if self.total_max_score() > u64::from(u32::MAX) {
            error(format!(
                "max_score_per_domain={} across {} domains exceeds {}",
                self.max_score_per_domain,
                self.domains.len(),
                u32::MAX
            ));
        }
        if self.pass_threshold_percent > 100 {
            error(format!(
                "pass_threshold_percent={} exceeds 100",
                self.pass_threshold_percent
            ));
        }
        if self.executable.trim().is_empty() {
            error("executable is empty".to_string());
        }

        let mut seen = HashSet::new();
        for domain in &self.domains {
            if crate::paths::validate_name(&domain.name).is_err() {
                error(format!("domain name '{}' is not a valid name", domain.name));
            }
            if !seen.insert(domain.name.as_str()) {
                error(format!("domain '{}' is listed more than once", domain.name));
            }
            if domain.rubric.trim().is_empty() {
                error(format!("domain '{}' has an empty rubric", domain.name));
            }
        }

        if self.pass_threshold_percent == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "pass_threshold_percent=0 passes every run".to_string(),
            });
        }
        if self.timeout_secs == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "timeout_secs=0: a hung subprocess will hang the run".to_string(),
            });
        }

        warnings
    }

    /// Fail on the first `Error`-level finding from [`Config::validate`].
    pub fn ensure_valid(&self) -> Result<()> {
        match self
            .validate()
            .into_iter()
            .find(|w| w.level == WarnLevel::Error)
        {
            Some(w) => Err(EvalError::InvalidConfig(w.message)),
            None => Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_is_valid() {
        let cfg = Config::default();
        assert!(cfg.validate().is_empty());
        assert_eq!(cfg.max_score(), 200);
        assert_eq!(
            cfg.domain_names(),
            vec!["backend", "frontend", "tests", "security"]
        );
    }

    #[test]
    fn minimal_yaml_fills_defaults() {
        let cfg: Config = serde_yaml::from_str("executable: my-llm\n").unwrap();
        assert_eq!(cfg.executable, "my-llm");
        assert_eq!(cfg.max_score_per_domain, 50);
        assert_eq!(cfg.pass_threshold_percent, 70);
        assert!(cfg.streaming);
        assert_eq!(cfg.domains.len(), 4);
    }

    #[test]
    fn custom_domains_parse() {
        let yaml = r#"
max_score_per_domain: 10
domains:
  - name: api
    rubric: api-rubric
    context: [rails-controllers, rails-serializers]
"#;
        let cfg: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(cfg.max_score(), 10);
        assert_eq!(cfg.domains[0].context.len(), 2);
    }

    #[test]
    fn save_and_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let mut cfg = Config::default();
        cfg.model = Some("sonnet".into());
        cfg.save(dir.path()).unwrap();
        let loaded = Config::load(dir.path()).unwrap();
        assert_eq!(loaded.model.as_deref(), Some("sonnet"));
        assert_eq!(loaded.domains, cfg.domains);
    }

    #[test]
    fn load_missing_is_not_initialized() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            Config::load(dir.path()),
            Err(EvalError::NotInitialized)
        ));
        assert!(Config::load_or_default(dir.path()).is_ok());
    }

    #[test]
    fn validate_flags_bad_values() {
        let cfg = Config {
            max_score_per_domain: 0,
            pass_threshold_percent: 150,
            domains: vec![
                DomainConfig::standard("backend", &[]),
                DomainConfig::standard("backend", &[]),
                DomainConfig::standard("Bad Name", &[]),
            ],
            ..Config::default()
        };
        let errors: Vec<_> = cfg
            .validate()
            .into_iter()
            .filter(|w| w.level == WarnLevel::Error)
            .map(|w| w.message)
            .collect();
        assert_eq!(errors.len(), 4, "{errors:?}");
        assert!(cfg.ensure_valid().is_err());
    }

    #[test]
    fn oversized_total_score_is_error() {
        let cfg = Config {
            max_score_per_domain: 2_000_000_000,
            ..Config::default()
        };
        assert_eq!(cfg.domains.len(), 4);
        assert_eq!(cfg.max_score(), u32::MAX);
        let errors: Vec<_> = cfg
            .validate()
            .into_iter()
            .filter(|w| w.level == WarnLevel::Error)
            .map(|w| w.message)
            .collect();
        assert_eq!(errors.len(), 1, "{errors:?}");
        assert!(errors[0].contains("exceeds"));
        assert!(cfg.ensure_valid().is_err());
    }

    #[test]
    fn empty_domains_is_error() {
        let cfg = Config {
            domains: vec![],
            ..Config::default()
        };
        assert!(matches!(
            cfg.ensure_valid(),
            Err(EvalError::InvalidConfig(_))
        ));
    }

    #[test]
    fn zero_timeout_disables_deadline() {
        let cfg = Config {
            timeout_secs: 0,
            ..Config::default()
        };
        assert_eq!(cfg.timeout(), None);
        assert_eq!(cfg.adapter_config().timeout, None);
        assert_eq!(
            cfg.validate()
                .iter()
                .filter(|w| w.level == WarnLevel::Warning)
                .count(),
            1
        );
    }
}
