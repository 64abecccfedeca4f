//! Ceph configuration file parser
//!
//! Parses ceph.conf style files and exposes typed options.
//!
//! Option names are normalized the way Ceph does it: spaces, dashes and
//! underscores are interchangeable, so `mon pgmap verify aggregates`,
//! `mon-pgmap-verify-aggregates` and `mon_pgmap_verify_aggregates` all name
//! the same option.
//!
//! # Example
//!
//! ```
//! use cephconfig::CephConfig;
//!
//! let config = CephConfig::parse("[mon]\nmon pgmap summary interval = 10\n").unwrap();
//! assert_eq!(config.get("mon", "mon_pgmap_summary_interval"), Some("10"));
//! ```

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse config file at line {line}: {reason}")]
    ParseError { line: usize, reason: String },

    #[error("Invalid {type_name} value: {value}")]
    InvalidValue {
        type_name: &'static str,
        value: String,
    },
}

/// Trait for types that can be parsed from ceph.conf values
pub trait ConfigValue: Sized + Clone {
    fn parse_config_value(s: &str) -> Result<Self, ConfigError>;

    /// Get the type name for error messages
    fn type_name() -> &'static str;
}

/// Count value (plain non-negative integer)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Count(pub u64);

impl ConfigValue for Count {
    fn parse_config_value(s: &str) -> Result<Self, ConfigError> {
        s.trim()
            .replace('_', "")
            .parse()
            .map(Count)
            .map_err(|_| ConfigError::InvalidValue {
                type_name: Self::type_name(),
                value: s.to_string(),
            })
    }

    fn type_name() -> &'static str {
        "count"
    }
}

impl ConfigValue for bool {
    fn parse_config_value(s: &str) -> Result<Self, ConfigError> {
        match s.trim().to_lowercase().as_str() {
            "true" | "yes" | "1" | "on" => Ok(true),
            "false" | "no" | "0" | "off" => Ok(false),
            _ => Err(ConfigError::InvalidValue {
                type_name: Self::type_name(),
                value: s.to_string(),
            }),
        }
    }

    fn type_name() -> &'static str {
        "bool"
    }
}

impl ConfigValue for String {
    fn parse_config_value(s: &str) -> Result<Self, ConfigError> {
        Ok(s.to_string())
    }

    fn type_name() -> &'static str {
        "string"
    }
}

/// A configuration option with name and default value
pub struct ConfigOption<T: ConfigValue> {
    name: &'static str,
    default: T,
}

impl<T: ConfigValue> ConfigOption<T> {
    pub const fn new(name: &'static str, default: T) -> Self {
        Self { name, default }
    }

    /// Get the value from config, falling back to the default
    ///
    /// An option that is present but unparsable is logged and ignored.
    pub fn get(&self, config: &CephConfig, sections: &[&str]) -> T {
        let Some(raw) = config.get_with_fallback(sections, self.name) else {
            return self.default.clone();
        };
        match T::parse_config_value(raw) {
            Ok(value) => value,
            Err(e) => {
                warn!("Ignoring option {}: {}; using default", self.name, e);
                self.default.clone()
            }
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn default_value(&self) -> &T {
        &self.default
    }
}

/// Normalize an option name: `"mon pgmap-foo"` -> `"mon_pgmap_foo"`
pub fn normalize_key(key: &str) -> String {
    key.trim()
        .split(|c: char| c == ' ' || c == '-' || c == '_')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}

/// Strip a trailing `#` or `;` comment from a value line
fn strip_comment(line: &str) -> &str {
    match line.find(['#', ';']) {
        Some(pos) => &line[..pos],
        None => line,
    }
}

/// Represents a parsed Ceph configuration
#[derive(Debug, Clone, Default)]
pub struct CephConfig {
    sections: HashMap<String, HashMap<String, String>>,
}

impl CephConfig {
    /// Parse a Ceph configuration file from the given path
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse a Ceph configuration from a string
    ///
    /// Keys before the first section header belong to `[global]`.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let mut sections: HashMap<String, HashMap<String, String>> = HashMap::new();
        let mut current_section = String::from("global");

        for (idx, raw) in content.lines().enumerate() {
            let line = raw.trim();

            if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
                continue;
            }

            if let Some(rest) = line.strip_prefix('[') {
                let name = rest.strip_suffix(']').ok_or_else(|| ConfigError::ParseError {
                    line: idx + 1,
                    reason: format!("unterminated section header: {}", line),
                })?;
                current_section = name.trim().to_string();
                sections.entry(current_section.clone()).or_default();
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                return Err(ConfigError::ParseError {
                    line: idx + 1,
                    reason: format!("expected 'key = value', got: {}", line),
                });
            };

            let key = normalize_key(key);
            if key.is_empty() {
                return Err(ConfigError::ParseError {
                    line: idx + 1,
                    reason: "empty option name".to_string(),
                });
            }

            sections
                .entry(current_section.clone())
                .or_default()
                .insert(key, strip_comment(value).trim().to_string());
        }

        Ok(Self { sections })
    }

    /// Get a configuration value from a specific section
    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.sections
            .get(section)
            .and_then(|s| s.get(&normalize_key(key)))
            .map(|v| v.as_str())
    }

    /// Get a configuration value, checking `sections` in order
    pub fn get_with_fallback(&self, sections: &[&str], key: &str) -> Option<&str> {
        sections
            .iter()
            .find_map(|section| self.get(section, key))
    }

    pub fn sections(&self) -> Vec<&str> {
        self.sections.keys().map(|s| s.as_str()).collect()
    }

    /// Get all (normalized) keys in a section
    pub fn keys(&self, section: &str) -> Vec<&str> {
        self.sections
            .get(section)
            .map(|s| s.keys().map(|k| k.as_str()).collect())
            .unwrap_or_default()
    }
}

/// Define a configuration struct with typed options
///
/// # Example
///
/// ```
/// use cephconfig::{define_options, CephConfig, Count};
///
/// define_options! {
///     /// Monitor options
///     pub struct MonOptions {
///         /// Versions between summary log lines
///         mon_pgmap_summary_interval: Count = Count(1),
///
///         /// Recompute aggregates after every update
///         mon_pgmap_verify_aggregates: bool = false,
///     }
/// }
///
/// let ceph_config = CephConfig::parse("[mon]\nmon pgmap summary interval = 50\n").unwrap();
/// let opts = MonOptions::from_ceph_config(&ceph_config, &["mon", "global"]);
///
/// assert_eq!(opts.mon_pgmap_summary_interval.0, 50);
/// assert!(!opts.mon_pgmap_verify_aggregates);
/// ```
#[macro_export]
macro_rules! define_options {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[$field_meta:meta])*
                $field:ident: $ty:ty = $default:expr
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone)]
        $vis struct $name {
            $(
                $(#[$field_meta])*
                pub $field: $ty,
            )*
        }

        impl $name {
            /// Create with default values
            pub fn new() -> Self {
                Self {
                    $(
                        $field: $default,
                    )*
                }
            }

            /// Load from ceph.conf with section fallback
            pub fn from_ceph_config(
                config: &$crate::CephConfig,
                sections: &[&str],
            ) -> Self {
                Self {
                    $(
                        $field: {
                            let opt = $crate::ConfigOption::new(stringify!($field), $default);
                            opt.get(config, sections)
                        },
                    )*
                }
            }

            /// Get option names (for introspection)
            pub fn option_names() -> &'static [&'static str] {
                &[
                    $(stringify!($field),)*
                ]
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }
    };
}
