//! Configuration file parsing and management.
//!
//! This module handles loading configuration from TOML files and `NF_*`
//! environment variables, and merging configurations with proper precedence
//! rules.

use crate::error::FetchError;
use crate::types::{FetchConfig, SearchConfig, MAX_WORKERS_LIMIT};
use crate::utils::parse_duration_string;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Output formats accepted in `[output] default_format`.
pub const OUTPUT_FORMATS: &[&str] = &["text", "json", "csv"];

/// Configuration loaded from TOML files.
///
/// ```toml
/// [fetch]
/// max_workers = 8
/// min_interval = "750ms"
/// timeout = "15s"
///
/// [search]
/// max_articles = 30
///
/// [output]
/// default_format = "json"
/// json_pretty = true
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FileConfig {
    /// Fetch pool settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fetch: Option<FetchSection>,

    /// News search settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<SearchSection>,

    /// Output formatting preferences
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<OutputConfig>,
}

/// `[fetch]` section.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FetchSection {
    /// Worker cap (1-100)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_workers: Option<usize>,

    /// Per-domain spacing, e.g. "500ms"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_interval: Option<String>,

    /// Per-request timeout, e.g. "10s"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,

    /// Content truncation limit; 0 disables truncation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_content_chars: Option<usize>,
}

/// `[search]` section.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SearchSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_articles: Option<usize>,
}

/// Output formatting configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct OutputConfig {
    /// Default output format ("text", "json" or "csv")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_format: Option<String>,

    /// Pretty-print JSON by default
    #[serde(skip_serializing_if = "Option::is_none")]
    pub json_pretty: Option<bool>,
}

impl FileConfig {
    /// Overlay the `[fetch]` section onto `base`.
    ///
    /// Durations are checked when a file is loaded; unparsable ones leave
    /// the base value untouched.
    pub fn apply_fetch(&self, mut base: FetchConfig) -> FetchConfig {
        let Some(fetch) = &self.fetch else {
            return base;
        };

        if let Some(workers) = fetch.max_workers {
            base = base.with_max_workers(workers);
        }
        if let Some(interval) = fetch.min_interval.as_deref().and_then(parse_duration_string) {
            base = base.with_min_interval(interval);
        }
        if let Some(timeout) = fetch.timeout.as_deref().and_then(parse_duration_string) {
            base = base.with_timeout(timeout);
        }
        if let Some(agent) = &fetch.user_agent {
            base = base.with_user_agent(agent.clone());
        }
        if let Some(chars) = fetch.max_content_chars {
            base = base.with_max_content_chars((chars > 0).then_some(chars));
        }
        base
    }

    /// Overlay the `[search]` section onto `base`.
    pub fn apply_search(&self, mut base: SearchConfig) -> SearchConfig {
        let Some(search) = &self.search else {
            return base;
        };

        if let Some(url) = &search.base_url {
            base.base_url = url.clone();
        }
        if let Some(language) = &search.language {
            base.language = language.clone();
        }
        if let Some(region) = &search.region {
            base.region = region.clone();
        }
        if let Some(max) = search.max_articles {
            base.max_articles = max;
        }
        base
    }
}

/// Configuration discovery and loading functionality.
pub struct ConfigManager {
    /// Whether to report which config files were picked up
    pub verbose: bool,
}

impl ConfigManager {
    /// Create a new configuration manager.
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    /// Load configuration from a specific file.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    ///
    /// The parsed configuration or an error if reading, parsing or validation fails.
    pub fn load_file<P: AsRef<Path>>(&self, path: P) -> Result<FileConfig, FetchError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(FetchError::file_error(
                path.to_string_lossy(),
                "Configuration file not found",
            ));
        }

        let content = fs::read_to_string(path).map_err(|e| {
            FetchError::file_error(
                path.to_string_lossy(),
                format!("Failed to read configuration file: {}", e),
            )
        })?;

        let config: FileConfig = toml::from_str(&content).map_err(|e| {
            FetchError::config(format!(
                "Failed to parse TOML configuration '{}': {}",
                path.display(),
                e
            ))
        })?;

        self.validate_config(&config)?;

        Ok(config)
    }

    /// Discover and load configuration files in precedence order.
    ///
    /// XDG config is loaded first, then the home directory file, then the
    /// local one; later files override earlier ones key by key. Files that
    /// fail to load are skipped with a warning.
    pub fn discover_and_load(&self) -> Result<FileConfig, FetchError> {
        let mut merged_config = FileConfig::default();
        let mut loaded_files = Vec::new();

        let candidates = [
            self.get_xdg_config_path(),
            self.get_global_config_path(),
            self.get_local_config_path(),
        ];

        for path in candidates.into_iter().flatten() {
            match self.load_file(&path) {
                Ok(config) => {
                    merged_config = self.merge_configs(merged_config, config);
                    loaded_files.push(path);
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "ignoring config file");
                }
            }
        }

        if self.verbose {
            for path in &loaded_files {
                tracing::info!(path = %path.display(), "loaded config file");
            }
        }

        Ok(merged_config)
    }

    /// Looks for configuration files in the current directory.
    fn get_local_config_path(&self) -> Option<PathBuf> {
        ["./newsfetch.toml", "./.newsfetch.toml"]
            .into_iter()
            .map(Path::new)
            .find(|path| path.exists())
            .map(Path::to_path_buf)
    }

    /// Looks for configuration files in the user's home directory.
    fn get_global_config_path(&self) -> Option<PathBuf> {
        let home = env::var_os("HOME")?;
        [".newsfetch.toml", "newsfetch.toml"]
            .into_iter()
            .map(|candidate| Path::new(&home).join(candidate))
            .find(|path| path.exists())
    }

    /// Follows the XDG Base Directory layout.
    fn get_xdg_config_path(&self) -> Option<PathBuf> {
        let config_dir = env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| env::var_os("HOME").map(|home| Path::new(&home).join(".config")))?;

        let path = config_dir.join("newsfetch").join("config.toml");
        path.exists().then_some(path)
    }

    /// Merge two configurations with proper precedence.
    ///
    /// Values from `higher` take precedence over values from `lower`.
    fn merge_configs(&self, lower: FileConfig, higher: FileConfig) -> FileConfig {
        FileConfig {
            fetch: match (lower.fetch, higher.fetch) {
                (Some(lower), Some(higher)) => Some(FetchSection {
                    max_workers: higher.max_workers.or(lower.max_workers),
                    min_interval: higher.min_interval.or(lower.min_interval),
                    timeout: higher.timeout.or(lower.timeout),
                    user_agent: higher.user_agent.or(lower.user_agent),
                    max_content_chars: higher.max_content_chars.or(lower.max_content_chars),
                }),
                (lower, higher) => higher.or(lower),
            },
            search: match (lower.search, higher.search) {
                (Some(lower), Some(higher)) => Some(SearchSection {
                    base_url: higher.base_url.or(lower.base_url),
                    language: higher.language.or(lower.language),
                    region: higher.region.or(lower.region),
                    max_articles: higher.max_articles.or(lower.max_articles),
                }),
                (lower, higher) => higher.or(lower),
            },
            output: match (lower.output, higher.output) {
                (Some(lower), Some(higher)) => Some(OutputConfig {
                    default_format: higher.default_format.or(lower.default_format),
                    json_pretty: higher.json_pretty.or(lower.json_pretty),
                }),
                (lower, higher) => higher.or(lower),
            },
        }
    }

    /// Validate a configuration for common issues.
    fn validate_config(&self, config: &FileConfig) -> Result<(), FetchError> {
        if let Some(fetch) = &config.fetch {
            if let Some(workers) = fetch.max_workers {
                if workers == 0 || workers > MAX_WORKERS_LIMIT {
                    return Err(FetchError::config(format!(
                        "max_workers must be between 1 and {}",
                        MAX_WORKERS_LIMIT
                    )));
                }
            }

            for (name, value) in [
                ("min_interval", &fetch.min_interval),
                ("timeout", &fetch.timeout),
            ] {
                if let Some(value) = value {
                    if parse_duration_string(value).is_none() {
                        return Err(FetchError::config(format!(
                            "Invalid {} format '{}'. Use format like '500ms', '5s', '2m'",
                            name, value
                        )));
                    }
                }
            }

            if fetch.timeout.as_deref().and_then(parse_duration_string) == Some(Duration::ZERO) {
                return Err(FetchError::config("timeout must be greater than zero"));
            }
        }

        if let Some(search) = &config.search {
            if search.max_articles == Some(0) {
                return Err(FetchError::config("max_articles must be at least 1"));
            }
        }

        if let Some(format) = config
            .output
            .as_ref()
            .and_then(|o| o.default_format.as_deref())
        {
            if !OUTPUT_FORMATS.contains(&format) {
                return Err(FetchError::config(format!(
                    "Unknown output format '{}'. Use one of: {}",
                    format,
                    OUTPUT_FORMATS.join(", ")
                )));
            }
        }

        Ok(())
    }
}

/// Environment variable configuration that mirrors CLI options.
///
/// This represents configuration values that can be set via `NF_*` environment variables.
#[derive(Debug, Clone, Default)]
pub struct EnvConfig {
    pub concurrency: Option<usize>,
    pub interval: Option<String>,
    pub timeout: Option<String>,
    pub user_agent: Option<String>,
    pub max_articles: Option<usize>,
    pub json: Option<bool>,
    pub csv: Option<bool>,
    pub pretty: Option<bool>,
    pub file: Option<String>,
    pub config: Option<String>,
}

/// Load configuration from environment variables.
///
/// Parses all `NF_*` environment variables. Invalid values are ignored; with
/// `verbose` set, accepted values are logged and rejected ones warned about.
pub fn load_env_config(verbose: bool) -> EnvConfig {
    EnvConfig::from_lookup(|name| env::var(name).ok(), verbose)
}

impl EnvConfig {
    /// Build from an arbitrary variable lookup.
    pub fn from_lookup<L>(lookup: L, verbose: bool) -> Self
    where
        L: Fn(&str) -> Option<String>,
    {
        let report = |name: &str, value: &str, accepted: bool, hint: &str| {
            if !verbose {
                return;
            }
            if accepted {
                tracing::info!("Using {}={}", name, value);
            } else {
                tracing::warn!("Invalid {}='{}', {}", name, value, hint);
            }
        };

        let number = |name: &str, range: RangeInclusive<usize>| -> Option<usize> {
            let val = lookup(name)?;
            match val.trim().parse::<usize>() {
                Ok(n) if range.contains(&n) => {
                    report(name, &val, true, "");
                    Some(n)
                }
                _ => {
                    report(
                        name,
                        &val,
                        false,
                        &format!("must be {}-{}", range.start(), range.end()),
                    );
                    None
                }
            }
        };

        let duration = |name: &str| -> Option<String> {
            let val = lookup(name)?;
            if parse_duration_string(&val).is_some() {
                report(name, &val, true, "");
                Some(val)
            } else {
                report(name, &val, false, "use format like '500ms', '5s', '2m'");
                None
            }
        };

        let flag = |name: &str| -> Option<bool> {
            let val = lookup(name)?;
            match parse_bool(&val) {
                Some(b) => {
                    report(name, &val, true, "");
                    Some(b)
                }
                None => {
                    report(name, &val, false, "use true/false");
                    None
                }
            }
        };

        let text = |name: &str| -> Option<String> {
            let val = lookup(name)?;
            if val.trim().is_empty() {
                return None;
            }
            report(name, &val, true, "");
            Some(val)
        };

        Self {
            concurrency: number("NF_CONCURRENCY", 1..=MAX_WORKERS_LIMIT),
            interval: duration("NF_INTERVAL"),
            timeout: duration("NF_TIMEOUT"),
            user_agent: text("NF_USER_AGENT"),
            max_articles: number("NF_MAX_ARTICLES", 1..=usize::MAX),
            json: flag("NF_JSON"),
            csv: flag("NF_CSV"),
            pretty: flag("NF_PRETTY"),
            file: text("NF_FILE"),
            config: text("NF_CONFIG"),
        }
    }

    /// Check if output format conflicts exist (JSON and CSV both set).
    pub fn has_output_format_conflict(&self) -> bool {
        matches!((self.json, self.csv), (Some(true), Some(true)))
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(content: &str) -> NamedTempFile {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(content.as_bytes()).unwrap();
        temp_file.flush().unwrap();
        temp_file
    }

    #[test]
    fn test_load_valid_config() {
        let file = write_config(
            r#"
[fetch]
max_workers = 4
min_interval = "750ms"
timeout = "15s"

[search]
region = "GB"
max_articles = 5

[output]
default_format = "json"
json_pretty = true
"#,
        );

        let manager = ConfigManager::new(false);
        let config = manager.load_file(file.path()).unwrap();

        let fetch = config.fetch.as_ref().unwrap();
        assert_eq!(fetch.max_workers, Some(4));
        assert_eq!(fetch.min_interval.as_deref(), Some("750ms"));

        let output = config.output.as_ref().unwrap();
        assert_eq!(output.default_format.as_deref(), Some("json"));
        assert_eq!(output.json_pretty, Some(true));

        let fetch_config = config.apply_fetch(FetchConfig::default());
        assert_eq!(fetch_config.max_workers, 4);
        assert_eq!(fetch_config.min_interval, Duration::from_millis(750));
        assert_eq!(fetch_config.timeout, Duration::from_secs(15));

        let search_config = config.apply_search(SearchConfig::default());
        assert_eq!(search_config.region, "GB");
        assert_eq!(search_config.language, "en-US");
        assert_eq!(search_config.max_articles, 5);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let manager = ConfigManager::new(false);
        for content in [
            "[fetch]\nmax_workers = 0\n",
            "[fetch]\nmax_workers = 101\n",
            "[fetch]\nmin_interval = \"soon\"\n",
            "[fetch]\ntimeout = \"0s\"\n",
            "[search]\nmax_articles = 0\n",
            "[output]\ndefault_format = \"xml\"\n",
            "[fetch\nbroken",
        ] {
            let file = write_config(content);
            assert!(
                matches!(manager.load_file(file.path()), Err(FetchError::ConfigError { .. })),
                "accepted: {}",
                content
            );
        }
    }

    #[test]
    fn test_missing_file() {
        let manager = ConfigManager::new(false);
        let result = manager.load_file("/definitely/not/here/newsfetch.toml");
        assert!(matches!(result, Err(FetchError::FileError { .. })));
    }

    #[test]
    fn test_zero_content_limit_disables_truncation() {
        let config = FileConfig {
            fetch: Some(FetchSection {
                max_content_chars: Some(0),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert_eq!(config.apply_fetch(FetchConfig::default()).max_content_chars, None);
    }

    #[test]
    fn test_merge_configs() {
        let manager = ConfigManager::new(false);

        let lower = FileConfig {
            fetch: Some(FetchSection {
                max_workers: Some(10),
                timeout: Some("5s".to_string()),
                ..Default::default()
            }),
            output: Some(OutputConfig {
                default_format: Some("csv".to_string()),
                json_pretty: Some(false),
            }),
            ..Default::default()
        };

        let higher = FileConfig {
            fetch: Some(FetchSection {
                max_workers: Some(3),
                ..Default::default()
            }),
            search: Some(SearchSection {
                max_articles: Some(7),
                ..Default::default()
            }),
            output: Some(OutputConfig {
                json_pretty: Some(true),
                ..Default::default()
            }),
        };

        let merged = manager.merge_configs(lower, higher);

        let fetch = merged.fetch.unwrap();
        assert_eq!(fetch.max_workers, Some(3)); // Higher wins
        assert_eq!(fetch.timeout.as_deref(), Some("5s")); // Lower preserved
        assert_eq!(merged.search.unwrap().max_articles, Some(7));

        let output = merged.output.unwrap();
        assert_eq!(output.default_format.as_deref(), Some("csv"));
        assert_eq!(output.json_pretty, Some(true));
    }

    #[test]
    fn test_env_config_from_lookup() {
        let vars: HashMap<&str, &str> = [
            ("NF_CONCURRENCY", "4"),
            ("NF_INTERVAL", "250ms"),
            ("NF_TIMEOUT", "later"),
            ("NF_JSON", "yes"),
            ("NF_CSV", "maybe"),
            ("NF_FILE", "  "),
            ("NF_MAX_ARTICLES", "0"),
        ]
        .into_iter()
        .collect();

        let env = EnvConfig::from_lookup(|name| vars.get(name).map(|v| v.to_string()), true);

        assert_eq!(env.concurrency, Some(4));
        assert_eq!(env.interval.as_deref(), Some("250ms"));
        assert_eq!(env.timeout, None);
        assert_eq!(env.json, Some(true));
        assert_eq!(env.csv, None);
        assert_eq!(env.file, None);
        assert_eq!(env.max_articles, None);
        assert!(!env.has_output_format_conflict());
    }

    #[test]
    fn test_env_output_conflict() {
        let env = EnvConfig {
            json: Some(true),
            csv: Some(true),
            ..Default::default()
        };
        assert!(env.has_output_format_conflict());
    }
}
