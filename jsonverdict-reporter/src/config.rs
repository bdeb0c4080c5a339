// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration for where the report is written.
//!
//! The destination can come from the command line or from a TOML file:
//!
//! ```toml
//! [report]
//! path = "$CI_ARTIFACTS/verdict.json"
//! ```
//!
//! Environment variables (`$VAR` and `${VAR}`) and a leading `~` are expanded, and relative paths
//! are resolved against the current directory.

use crate::errors::ConfigError;
use camino::{Utf8Path, Utf8PathBuf};
use serde::Deserialize;

/// Resolved report configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReportConfig {
    path: Utf8PathBuf,
}

impl ReportConfig {
    /// Creates a configuration that writes to `path` as-is, without any expansion.
    pub fn new(path: impl Into<Utf8PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Creates a configuration from a path as a user wrote it, expanding environment variables,
    /// `~` and relative paths.
    pub fn from_raw_path(raw: &str) -> Result<Self, ConfigError> {
        let home = home::home_dir().and_then(|home| Utf8PathBuf::from_path_buf(home).ok());
        let path = expand_path(raw, |name| std::env::var(name).ok(), home.as_deref())?;
        let path = if path.is_absolute() {
            path
        } else {
            let cwd = std::env::current_dir()
                .and_then(|cwd| {
                    Utf8PathBuf::try_from(cwd).map_err(|error| error.into_io_error())
                })
                .map_err(|error| ConfigError::CurrentDir {
                    path: path.clone(),
                    error,
                })?;
            cwd.join(path)
        };
        Ok(Self { path })
    }

    /// Resolves the configuration from an optional command-line path and an optional config
    /// file. The command-line path takes precedence.
    pub fn resolve(
        cli_path: Option<&str>,
        config_file: Option<&Utf8Path>,
    ) -> Result<Self, ConfigError> {
        if let Some(raw) = cli_path {
            return Self::from_raw_path(raw);
        }

        let Some(config_file) = config_file else {
            return Err(ConfigError::MissingPath);
        };
        let contents =
            std::fs::read_to_string(config_file).map_err(|error| ConfigError::Read {
                file: config_file.to_owned(),
                error,
            })?;
        let parsed: ConfigFileImpl =
            toml::from_str(&contents).map_err(|error| ConfigError::Parse {
                file: config_file.to_owned(),
                error,
            })?;

        match parsed.report.path {
            Some(raw) => Self::from_raw_path(&raw),
            None => Err(ConfigError::MissingPath),
        }
    }

    /// Returns the path the report is written to.
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct ConfigFileImpl {
    #[serde(default)]
    report: ReportConfigImpl,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct ReportConfigImpl {
    #[serde(default)]
    path: Option<String>,
}

fn expand_path(
    raw: &str,
    lookup: impl Fn(&str) -> Option<String>,
    home: Option<&Utf8Path>,
) -> Result<Utf8PathBuf, ConfigError> {
    let expanded = expand_env_vars(raw, lookup);
    let expanded = expand_tilde(&expanded, home).ok_or_else(|| ConfigError::HomeDir {
        raw: raw.to_owned(),
    })?;
    if expanded.as_str().is_empty() {
        return Err(ConfigError::EmptyPath {
            raw: raw.to_owned(),
        });
    }
    Ok(expanded)
}

/// Substitutes `$NAME` and `${NAME}`. References to unset variables are left as written.
fn expand_env_vars(raw: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;

    while let Some(dollar) = rest.find('$') {
        out.push_str(&rest[..dollar]);
        let after = &rest[dollar + 1..];

        let (name, reference_len) = if let Some(braced) = after.strip_prefix('{') {
            match braced.find('}') {
                Some(end) => (&braced[..end], end + 2),
                None => ("", 0),
            }
        } else {
            let end = after
                .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                .unwrap_or(after.len());
            (&after[..end], end)
        };

        match (name.is_empty(), lookup(name)) {
            (false, Some(value)) => out.push_str(&value),
            _ => out.push_str(&rest[dollar..dollar + 1 + reference_len]),
        }
        rest = &after[reference_len..];
    }

    out.push_str(rest);
    out
}

/// Expands a leading `~` or `~/`. Returns `None` if that requires a home directory and there is
/// none.
fn expand_tilde(raw: &str, home: Option<&Utf8Path>) -> Option<Utf8PathBuf> {
    let rest = match raw.strip_prefix('~') {
        Some("") => "",
        Some(rest) if rest.starts_with('/') || rest.starts_with(std::path::MAIN_SEPARATOR) => {
            &rest[1..]
        }
        // `~user` and paths without a tilde are left alone.
        _ => return Some(raw.into()),
    };
    let home = home?;
    Some(if rest.is_empty() {
        home.to_owned()
    } else {
        home.join(rest)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino_tempfile::Utf8TempDir;
    use indoc::indoc;
    use test_case::test_case;

    fn lookup(name: &str) -> Option<String> {
        match name {
            "CI_DIR" => Some("/ci".to_owned()),
            "RUN" => Some("42".to_owned()),
            _ => None,
        }
    }

    #[test_case("reports/out.json", "reports/out.json" ; "no variables")]
    #[test_case("$CI_DIR/out.json", "/ci/out.json" ; "bare variable")]
    #[test_case("${CI_DIR}/run-${RUN}.json", "/ci/run-42.json" ; "braced variables")]
    #[test_case("$CI_DIR$RUN", "/ci42" ; "adjacent variables")]
    #[test_case("$UNSET/out.json", "$UNSET/out.json" ; "unset variable kept")]
    #[test_case("${UNSET}/out.json", "${UNSET}/out.json" ; "unset braced variable kept")]
    #[test_case("cost$/out.json", "cost$/out.json" ; "lone dollar")]
    #[test_case("${CI_DIR", "${CI_DIR" ; "unterminated brace")]
    fn env_var_expansion(raw: &str, expected: &str) {
        assert_eq!(expand_env_vars(raw, lookup), expected);
    }

    #[test_case("~", Some("/home/me") ; "bare tilde")]
    #[test_case("~/out.json", Some("/home/me/out.json") ; "tilde prefix")]
    #[test_case("~other/out.json", Some("~other/out.json") ; "other user kept")]
    #[test_case("a/~/out.json", Some("a/~/out.json") ; "tilde not leading")]
    fn tilde_expansion(raw: &str, expected: Option<&str>) {
        let home = Utf8Path::new("/home/me");
        assert_eq!(
            expand_tilde(raw, Some(home)),
            expected.map(Utf8PathBuf::from)
        );
    }

    #[test]
    fn tilde_without_home() {
        assert_eq!(expand_tilde("~/out.json", None), None);
        assert_eq!(
            expand_tilde("out.json", None),
            Some(Utf8PathBuf::from("out.json"))
        );
        assert!(matches!(
            expand_path("~/x.json", lookup, None),
            Err(ConfigError::HomeDir { .. })
        ));
    }

    #[test]
    fn empty_path_is_rejected() {
        assert!(matches!(
            expand_path("", lookup, None),
            Err(ConfigError::EmptyPath { .. })
        ));
    }

    #[test]
    fn relative_path_is_made_absolute() {
        let config = ReportConfig::from_raw_path("verdict/report.json").unwrap();
        assert!(config.path().is_absolute(), "{} is absolute", config.path());
        assert!(config.path().ends_with("verdict/report.json"));
    }

    #[test]
    fn resolve_prefers_cli_path() {
        let dir = Utf8TempDir::new().unwrap();
        let config_file = dir.path().join("jsonverdict.toml");
        std::fs::write(
            &config_file,
            indoc! {r#"
                [report]
                path = "/from/file.json"
            "#},
        )
        .unwrap();

        let from_file = ReportConfig::resolve(None, Some(&config_file)).unwrap();
        assert_eq!(from_file.path(), "/from/file.json");

        let from_cli = ReportConfig::resolve(Some("/from/cli.json"), Some(&config_file)).unwrap();
        assert_eq!(from_cli.path(), "/from/cli.json");
    }

    #[test]
    fn resolve_errors() {
        let dir = Utf8TempDir::new().unwrap();

        assert!(matches!(
            ReportConfig::resolve(None, None),
            Err(ConfigError::MissingPath)
        ));

        let missing = dir.path().join("missing.toml");
        assert!(matches!(
            ReportConfig::resolve(None, Some(&missing)),
            Err(ConfigError::Read { .. })
        ));

        let no_report = dir.path().join("no-report.toml");
        std::fs::write(&no_report, "[other]\nkey = 1\n").unwrap();
        assert!(matches!(
            ReportConfig::resolve(None, Some(&no_report)),
            Err(ConfigError::MissingPath)
        ));

        let invalid = dir.path().join("invalid.toml");
        std::fs::write(&invalid, "[report]\npath = 42\n").unwrap();
        assert!(matches!(
            ReportConfig::resolve(None, Some(&invalid)),
            Err(ConfigError::Parse { .. })
        ));
    }
}
