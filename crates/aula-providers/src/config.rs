//! Configuration and reporter factory.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use aula_core::driver::DriverConfig;
use aula_core::session::SessionConfig;
use aula_core::traits::ResultReporter;

use crate::http::HttpReporter;
use crate::json::JsonFileReporter;
use crate::memory::InMemoryBank;
use crate::simulated::SimulatedReporter;

/// Where finished results are delivered.
///
/// Note: Custom Debug impl masks the bearer token to keep it out of logs.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ReporterConfig {
    /// Acknowledge after `submission_latency_ms` without sending anything.
    #[default]
    Simulated,
    Json {
        /// Defaults to `results_dir`.
        #[serde(default)]
        dir: Option<PathBuf>,
    },
    Http {
        url: String,
        #[serde(default)]
        token: Option<String>,
        #[serde(default)]
        timeout_secs: Option<u64>,
    },
}

impl std::fmt::Debug for ReporterConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReporterConfig::Simulated => f.write_str("Simulated"),
            ReporterConfig::Json { dir } => f.debug_struct("Json").field("dir", dir).finish(),
            ReporterConfig::Http {
                url,
                token,
                timeout_secs,
            } => f
                .debug_struct("Http")
                .field("url", url)
                .field("token", &token.as_ref().map(|_| "***"))
                .field("timeout_secs", timeout_secs)
                .finish(),
        }
    }
}

/// Top-level aula configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AulaConfig {
    /// Countdown ticks before an evaluation starts.
    #[serde(default = "default_countdown_ticks")]
    pub countdown_ticks: u32,
    /// Latency of the simulated reporter in milliseconds.
    #[serde(default = "default_submission_latency")]
    pub submission_latency_ms: u64,
    /// Retries on transient submission errors.
    #[serde(default = "default_retries")]
    pub max_submit_retries: u32,
    /// Delay before the first retry in milliseconds.
    #[serde(default = "default_retry_delay")]
    pub retry_delay_ms: u64,
    /// Bank file or directory. The builtin bank is used when unset.
    #[serde(default)]
    pub bank_path: Option<PathBuf>,
    /// Output directory for saved results.
    #[serde(default = "default_results_dir")]
    pub results_dir: PathBuf,
    #[serde(default)]
    pub reporter: ReporterConfig,
}

fn default_countdown_ticks() -> u32 {
    3
}
fn default_submission_latency() -> u64 {
    1500
}
fn default_retries() -> u32 {
    3
}
fn default_retry_delay() -> u64 {
    1000
}
fn default_results_dir() -> PathBuf {
    PathBuf::from("./aula-results")
}

impl Default for AulaConfig {
    fn default() -> Self {
        Self {
            countdown_ticks: default_countdown_ticks(),
            submission_latency_ms: default_submission_latency(),
            max_submit_retries: default_retries(),
            retry_delay_ms: default_retry_delay(),
            bank_path: None,
            results_dir: default_results_dir(),
            reporter: ReporterConfig::default(),
        }
    }
}

impl AulaConfig {
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            countdown_ticks: self.countdown_ticks,
        }
    }

    pub fn driver_config(&self) -> DriverConfig {
        DriverConfig {
            max_submit_retries: self.max_submit_retries,
            retry_delay: Duration::from_millis(self.retry_delay_ms),
            ..DriverConfig::default()
        }
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
/// Substituted values are not expanded again.
fn resolve_env_vars(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(start) = rest.find("${") {
        let Some(end) = rest[start..].find('}') else {
            break;
        };
        let var_name = &rest[start + 2..start + end];
        result.push_str(&rest[..start]);
        result.push_str(&std::env::var(var_name).unwrap_or_default());
        rest = &rest[start + end + 1..];
    }
    result.push_str(rest);
    result
}

fn resolve_reporter_config(config: &ReporterConfig) -> ReporterConfig {
    match config {
        ReporterConfig::Simulated => ReporterConfig::Simulated,
        ReporterConfig::Json { dir } => ReporterConfig::Json {
            dir: dir
                .as_ref()
                .map(|d| PathBuf::from(resolve_env_vars(&d.to_string_lossy()))),
        },
        ReporterConfig::Http {
            url,
            token,
            timeout_secs,
        } => ReporterConfig::Http {
            url: resolve_env_vars(url),
            token: token.as_ref().map(|t| resolve_env_vars(t)),
            timeout_secs: *timeout_secs,
        },
    }
}

/// `AULA_REPORT_URL` switches to the HTTP reporter; `AULA_REPORT_TOKEN`
/// sets its bearer token.
fn apply_env_overrides(config: &mut AulaConfig, url: Option<String>, token: Option<String>) {
    if let Some(url) = url {
        match &mut config.reporter {
            ReporterConfig::Http { url: current, .. } => *current = url,
            other => {
                *other = ReporterConfig::Http {
                    url,
                    token: None,
                    timeout_secs: None,
                }
            }
        }
    }

    if let Some(token) = token {
        if let ReporterConfig::Http { token: current, .. } = &mut config.reporter {
            *current = Some(token);
        }
    }
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `aula.toml` in the current directory
/// 2. `~/.config/aula/config.toml`
///
/// Environment variable overrides: `AULA_REPORT_URL`, `AULA_REPORT_TOKEN`.
pub fn load_config() -> Result<AulaConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<AulaConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("aula.toml");
        if local.exists() {
            Some(local)
        } else {
            dirs_path()
                .map(|dir| dir.join("config.toml"))
                .filter(|global| global.exists())
        }
    };

    let mut config = match &config_path {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            toml::from_str::<AulaConfig>(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => AulaConfig::default(),
    };

    apply_env_overrides(
        &mut config,
        std::env::var("AULA_REPORT_URL").ok(),
        std::env::var("AULA_REPORT_TOKEN").ok(),
    );
    config.reporter = resolve_reporter_config(&config.reporter);

    tracing::debug!(path = ?config_path, reporter = ?config.reporter, "configuration loaded");
    Ok(config)
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("aula"))
}

/// Create the reporter described by the configuration.
pub fn create_reporter(config: &AulaConfig) -> Result<Arc<dyn ResultReporter>> {
    match &config.reporter {
        ReporterConfig::Simulated => Ok(Arc::new(SimulatedReporter::new(Duration::from_millis(
            config.submission_latency_ms,
        )))),
        ReporterConfig::Json { dir } => Ok(Arc::new(JsonFileReporter::new(
            dir.clone().unwrap_or_else(|| config.results_dir.clone()),
        ))),
        ReporterConfig::Http {
            url,
            token,
            timeout_secs,
        } => {
            if url.is_empty() {
                anyhow::bail!("http reporter requires a url");
            }
            let reporter = match timeout_secs {
                Some(secs) => HttpReporter::with_timeout(url, token.clone(), *secs)?,
                None => HttpReporter::new(url, token.clone())?,
            };
            Ok(Arc::new(reporter))
        }
    }
}

/// Open the bank at `path`, falling back to `bank_path` and then the
/// builtin bank.
pub fn create_bank(config: &AulaConfig, path: Option<&Path>) -> Result<InMemoryBank> {
    match path.or(config.bank_path.as_deref()) {
        Some(path) => InMemoryBank::load(path)
            .with_context(|| format!("failed to load bank: {}", path.display())),
        None => InMemoryBank::builtin(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_env_vars_basic() {
        std::env::set_var("_AULA_TEST_VAR", "hello");
        assert_eq!(resolve_env_vars("${_AULA_TEST_VAR}"), "hello");
        assert_eq!(
            resolve_env_vars("prefix_${_AULA_TEST_VAR}_suffix"),
            "prefix_hello_suffix"
        );
        std::env::remove_var("_AULA_TEST_VAR");
    }

    #[test]
    fn resolved_values_are_not_expanded_again() {
        std::env::set_var("_AULA_TEST_SELF", "${_AULA_TEST_SELF}");
        std::env::set_var("_AULA_TEST_INNER", "${_AULA_TEST_OTHER}!");
        assert_eq!(
            resolve_env_vars("${_AULA_TEST_SELF}"),
            "${_AULA_TEST_SELF}"
        );
        assert_eq!(
            resolve_env_vars("a ${_AULA_TEST_INNER} b ${_AULA_TEST_UNSET_VAR}c"),
            "a ${_AULA_TEST_OTHER}! b c"
        );
        assert_eq!(resolve_env_vars("open ${never closed"), "open ${never closed");
        std::env::remove_var("_AULA_TEST_SELF");
        std::env::remove_var("_AULA_TEST_INNER");
    }

    #[test]
    fn default_config() {
        let config = AulaConfig::default();
        assert_eq!(config.countdown_ticks, 3);
        assert_eq!(config.submission_latency_ms, 1500);
        assert_eq!(config.max_submit_retries, 3);
        assert!(matches!(config.reporter, ReporterConfig::Simulated));
        assert_eq!(config.driver_config().retry_delay, Duration::from_secs(1));
    }

    #[test]
    fn parse_reporter_config() {
        let toml_str = r#"
countdown_ticks = 0
results_dir = "out"

[reporter]
type = "http"
url = "https://example.test/results"
token = "secret"
"#;
        let config: AulaConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.session_config().countdown_ticks, 0);
        assert!(matches!(
            config.reporter,
            ReporterConfig::Http { ref url, .. } if url == "https://example.test/results"
        ));

        let debug = format!("{:?}", config.reporter);
        assert!(!debug.contains("secret"));
        assert!(debug.contains("***"));
    }

    #[test]
    fn env_overrides_switch_to_http() {
        let mut config = AulaConfig::default();
        apply_env_overrides(
            &mut config,
            Some("http://localhost:9000/results".into()),
            Some("tok".into()),
        );
        match config.reporter {
            ReporterConfig::Http { url, token, .. } => {
                assert_eq!(url, "http://localhost:9000/results");
                assert_eq!(token.as_deref(), Some("tok"));
            }
            other => panic!("expected http reporter, got {other:?}"),
        }
    }

    #[test]
    fn token_without_http_reporter_is_ignored() {
        let mut config = AulaConfig::default();
        apply_env_overrides(&mut config, None, Some("tok".into()));
        assert!(matches!(config.reporter, ReporterConfig::Simulated));
    }

    #[test]
    fn load_from_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("aula.toml");
        std::fs::write(&path, "max_submit_retries = 5\n[reporter]\ntype = \"json\"\n").unwrap();

        let config = load_config_from(Some(&path)).unwrap();
        assert_eq!(config.max_submit_retries, 5);

        assert!(load_config_from(Some(&dir.path().join("missing.toml"))).is_err());
    }

    #[test]
    fn json_reporter_defaults_to_results_dir() {
        let config = AulaConfig {
            reporter: ReporterConfig::Json { dir: None },
            ..AulaConfig::default()
        };
        let reporter = create_reporter(&config).unwrap();
        assert_eq!(reporter.name(), "json");
    }

    #[test]
    fn builtin_bank_when_no_path() {
        let bank = create_bank(&AulaConfig::default(), None).unwrap();
        assert_eq!(aula_core::traits::QuestionBank::name(&bank), "builtin");
    }
}
