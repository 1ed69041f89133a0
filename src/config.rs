use std::path::PathBuf;

use crate::errors::CatalogError;
use crate::types::SortKey;

/// Constants for the catalogue store
pub const CATALOG_PATH: &str = "Records.json";
pub const CATALOG_CREATE_IF_MISSING: bool = false;
pub const CATALOG_MIGRATE_ON_OPEN: bool = true;
pub const CATALOG_PRETTY_JSON: bool = true;

pub const LOG_FILTER: &str = "info,vinyl_catalog=debug";

/// Reads one variable through `lookup`, treating blank values as unset
fn lookup_set(lookup: &dyn Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    lookup(key).filter(|v| !v.trim().is_empty())
}

fn parse_bool(key: &str, value: &str) -> Result<bool, CatalogError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on"  => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(CatalogError::Config(format!("{key} is not a boolean: {value:?}"))),
    }
}

fn env_to_bool(
    lookup: &dyn Fn(&str) -> Option<String>,
    key: &str,
    default: bool
) -> Result<bool, CatalogError> {
    match lookup_set(lookup, key) {
        Some(v) => parse_bool(key, &v),
        None => Ok(default),
    }
}

///
/// Which identifier generator new tracks draw from
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IdStrategy {
    #[default]
    Timestamp,
    Sequential
}

impl IdStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            IdStrategy::Timestamp  => "timestamp",
            IdStrategy::Sequential => "sequential"
        }
    }
    pub fn parse(s: &str) -> Option<IdStrategy> {
        match s.trim().to_ascii_lowercase().as_str() {
            "timestamp"  => Some(IdStrategy::Timestamp),
            "sequential" => Some(IdStrategy::Sequential),
            _ => None
        }
    }
}

///
/// Configuration for the JSON backed track store
///
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    pub path: PathBuf,
    pub create_if_missing: bool,  // otherwise a missing file is fatal
    pub migrate_on_open: bool,    // rewrite legacy shapes right after load
    pub id_strategy: IdStrategy,
    pub sort: SortKey,            // default list ordering
    pub pretty_json: bool
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(CATALOG_PATH),
            create_if_missing: CATALOG_CREATE_IF_MISSING,
            migrate_on_open: CATALOG_MIGRATE_ON_OPEN,
            id_strategy: IdStrategy::default(),
            sort: SortKey::default(),
            pretty_json: CATALOG_PRETTY_JSON
        }
    }
}

fn build_catalog(lookup: &dyn Fn(&str) -> Option<String>) ->
    Result<CatalogConfig, CatalogError> {

    let defaults = CatalogConfig::default();

    let path = lookup_set(lookup, "CATALOG_PATH")
        .map(PathBuf::from)
        .unwrap_or(defaults.path);

    let id_strategy = match lookup_set(lookup, "CATALOG_ID_STRATEGY") {
        Some(v) => IdStrategy::parse(&v).ok_or_else(|| CatalogError::Config(
            format!("CATALOG_ID_STRATEGY must be timestamp or sequential, got {v:?}")
        ))?,
        None => defaults.id_strategy
    };

    let sort = match lookup_set(lookup, "CATALOG_SORT") {
        Some(v) => SortKey::parse(&v).ok_or_else(|| CatalogError::Config(
            format!("CATALOG_SORT invalid: {v:?}")
        ))?,
        None => defaults.sort
    };

    Ok( CatalogConfig {
        path,
        create_if_missing: env_to_bool(
            lookup, "CATALOG_CREATE_IF_MISSING", defaults.create_if_missing)?,
        migrate_on_open: env_to_bool(
            lookup, "CATALOG_MIGRATE_ON_OPEN", defaults.migrate_on_open)?,
        id_strategy,
        sort,
        pretty_json: env_to_bool(
            lookup, "CATALOG_PRETTY_JSON", defaults.pretty_json)?,
    })
}

///
/// Configuration for Logger
///

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub filter_directives: String,
    pub format: LogFormat,
    pub with_ansi: bool,
    pub include_file_line: bool,
    pub include_target: bool
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter_directives: LOG_FILTER.to_string(),
            format: LogFormat::Pretty,
            with_ansi: true,
            include_file_line: false,
            include_target: true
        }
    }
}

fn build_logging(lookup: &dyn Fn(&str) -> Option<String>) ->
    Result<LoggingConfig, CatalogError> {

    let mut logging = LoggingConfig::default();

    if let Some(filter) = lookup_set(lookup, "CATALOG_LOG_FILTER") {
        logging.filter_directives = filter;
    }

    if let Some(format) = lookup_set(lookup, "CATALOG_LOG_FORMAT") {
        logging.format = match format.trim().to_ascii_lowercase().as_str() {
            "pretty" => LogFormat::Pretty,
            "json" => {
                // json lines go to collectors, not terminals
                logging.with_ansi = false;
                logging.include_file_line = true;
                LogFormat::Json
            },
            _ => return Err(CatalogError::Config(
                format!("CATALOG_LOG_FORMAT must be pretty or json, got {format:?}")
            )),
        };
    }

    Ok( logging )
}

///
/// AppConfig which holds everything main needs at start up
///
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    pub catalog: CatalogConfig,
    pub logging: LoggingConfig
}

/// Builds the configuration from an arbitrary variable source
pub fn build_config(lookup: impl Fn(&str) -> Option<String>) ->
    Result<AppConfig, CatalogError> {

    let catalog = build_catalog(&lookup)?;
    let logging = build_logging(&lookup)?;

    Ok( AppConfig { catalog, logging } )
}

///
/// Return all environment variables to caller at program start.
///
pub fn load_config() -> Result<AppConfig, CatalogError> {
    dotenvy::dotenv().ok();
    build_config(|key| std::env::var(key).ok())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn from_pairs(pairs: &[(&str, &str)]) -> Result<AppConfig, CatalogError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        build_config(move |key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_when_nothing_is_set() -> Result<(), CatalogError> {
        let cfgs = from_pairs(&[])?;
        assert_eq!(cfgs.catalog.path, PathBuf::from("Records.json"));
        assert!(!cfgs.catalog.create_if_missing);
        assert!(cfgs.catalog.migrate_on_open);
        assert_eq!(cfgs.catalog.id_strategy, IdStrategy::Timestamp);
        assert_eq!(cfgs.catalog.sort, SortKey::Created);
        assert_eq!(cfgs.logging.format, LogFormat::Pretty);
        assert_eq!(cfgs.logging.filter_directives, LOG_FILTER);
        Ok(())
    }

    #[test]
    fn overrides_are_applied() -> Result<(), CatalogError> {
        let cfgs = from_pairs(&[
            ("CATALOG_PATH", "/tmp/crate.json"),
            ("CATALOG_CREATE_IF_MISSING", "Yes"),
            ("CATALOG_MIGRATE_ON_OPEN", "off"),
            ("CATALOG_ID_STRATEGY", "sequential"),
            ("CATALOG_SORT", "artist"),
            ("CATALOG_PRETTY_JSON", "0"),
            ("CATALOG_LOG_FORMAT", "json"),
        ])?;
        assert_eq!(cfgs.catalog.path, PathBuf::from("/tmp/crate.json"));
        assert!(cfgs.catalog.create_if_missing);
        assert!(!cfgs.catalog.migrate_on_open);
        assert_eq!(cfgs.catalog.id_strategy, IdStrategy::Sequential);
        assert_eq!(cfgs.catalog.sort, SortKey::Artist);
        assert!(!cfgs.catalog.pretty_json);
        assert_eq!(cfgs.logging.format, LogFormat::Json);
        assert!(!cfgs.logging.with_ansi);
        Ok(())
    }

    #[test]
    fn blank_values_count_as_unset() -> Result<(), CatalogError> {
        let cfgs = from_pairs(&[("CATALOG_PATH", "   "), ("CATALOG_SORT", "")])?;
        assert_eq!(cfgs.catalog.path, PathBuf::from(CATALOG_PATH));
        assert_eq!(cfgs.catalog.sort, SortKey::Created);
        Ok(())
    }

    #[test]
    fn invalid_values_name_the_variable() {
        for (key, value) in [
            ("CATALOG_CREATE_IF_MISSING", "maybe"),
            ("CATALOG_ID_STRATEGY", "uuid"),
            ("CATALOG_SORT", "colour"),
            ("CATALOG_LOG_FORMAT", "xml"),
        ] {
            match from_pairs(&[(key, value)]) {
                Err(CatalogError::Config(msg)) => assert!(msg.contains(key), "{msg}"),
                other => panic!("expected config error for {key}, got {other:?}"),
            }
        }
    }

    #[test]
    fn id_strategy_names() {
        for strategy in [IdStrategy::Timestamp, IdStrategy::Sequential] {
            assert_eq!(IdStrategy::parse(strategy.as_str()), Some(strategy));
        }
    }
}
