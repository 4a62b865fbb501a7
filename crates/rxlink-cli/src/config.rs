//! Matcher configuration from a TOML file plus command-line overrides.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use rxlink_match::MatcherConfig;

/// Environment variable naming the default catalog.
pub const CATALOG_ENV: &str = "RXLINK_CATALOG";

/// Flag values that take precedence over the config file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub min_similarity: Option<f64>,
    pub max_results: Option<usize>,
    pub lookup_timeout_ms: Option<u64>,
    pub no_exact: bool,
}

/// Load `path` (or defaults), apply `overrides`, and validate the result.
pub fn load_matcher_config(path: Option<&Path>, overrides: &Overrides) -> Result<MatcherConfig> {
    let mut config = match path {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("read config {}", path.display()))?;
            parse_matcher_config(&text).with_context(|| format!("parse config {}", path.display()))?
        }
        None => MatcherConfig::default(),
    };
    apply_overrides(&mut config, overrides);
    config.validate().context("invalid matcher configuration")?;
    Ok(config)
}

pub fn parse_matcher_config(text: &str) -> Result<MatcherConfig> {
    Ok(toml::from_str(text)?)
}

pub fn apply_overrides(config: &mut MatcherConfig, overrides: &Overrides) {
    if let Some(value) = overrides.min_similarity {
        config.min_similarity = value;
    }
    if let Some(value) = overrides.max_results {
        config.max_results = value;
    }
    if let Some(value) = overrides.lookup_timeout_ms {
        config.lookup_timeout_ms = Some(value);
    }
    if overrides.no_exact {
        config.prefer_exact_match = false;
    }
}

/// Catalog path from the flag, falling back to [`CATALOG_ENV`].
pub fn resolve_catalog(flag: Option<&Path>) -> Result<PathBuf> {
    resolve_catalog_from(flag, std::env::var_os(CATALOG_ENV))
}

fn resolve_catalog_from(flag: Option<&Path>, env: Option<OsString>) -> Result<PathBuf> {
    if let Some(path) = flag {
        return Ok(path.to_path_buf());
    }
    match env.filter(|value| !value.is_empty()) {
        Some(value) => Ok(PathBuf::from(value)),
        None => bail!("no catalog given; pass --catalog or set {CATALOG_ENV}"),
    }
}
