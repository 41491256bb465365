use super::types::Config;
use super::{expand_env_vars, expand_tilde, unexpanded_env_vars};
use std::path::Path;
use thiserror::Error;

/// Smallest window the debug filter may be capped at.
pub const MIN_Z2M_FETCH_CAP: usize = 1000;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("validation failed:\n{}", .0.join("\n"))]
    ValidationList(Vec<String>),

    #[error("validation failed: {0}")]
    Validation(String),
}

pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let yaml = std::fs::read_to_string(path).map_err(|e| {
        ConfigError::Io(std::io::Error::new(
            e.kind(),
            format!("failed to read config file '{}': {}", path.display(), e),
        ))
    })?;

    parse_config(&yaml)
}

/// Parse and validate config from a YAML string.
pub fn parse_config(yaml: &str) -> Result<Config, ConfigError> {
    let yaml = expand_env_vars(yaml);

    // Checked on parsed values so placeholders inside comments don't count.
    let document: serde_yaml::Value = serde_yaml::from_str(&yaml)?;
    check_unexpanded_vars(&document)?;

    let mut config: Config = serde_yaml::from_value(document)?;
    expand_paths(&mut config);
    validate_config(&config)?;

    Ok(config)
}

/// Appends every string scalar (keys included) in `value` to `out`.
fn collect_strings<'v>(value: &'v serde_yaml::Value, out: &mut Vec<&'v str>) {
    match value {
        serde_yaml::Value::String(s) => out.push(s),
        serde_yaml::Value::Sequence(items) => {
            for item in items {
                collect_strings(item, out);
            }
        }
        serde_yaml::Value::Mapping(map) => {
            for (key, item) in map {
                collect_strings(key, out);
                collect_strings(item, out);
            }
        }
        serde_yaml::Value::Tagged(tagged) => collect_strings(&tagged.value, out),
        _ => {}
    }
}

fn check_unexpanded_vars(document: &serde_yaml::Value) -> Result<(), ConfigError> {
    let mut strings = Vec::new();
    collect_strings(document, &mut strings);

    let mut names: Vec<String> = strings
        .into_iter()
        .flat_map(unexpanded_env_vars)
        .collect();
    names.sort();
    names.dedup();

    match names.as_slice() {
        [] => Ok(()),
        [name] => Err(ConfigError::Validation(format!(
            "environment variable $env{{{name}}} is not set.\n\
             Set it (export {name}=...) or replace the placeholder in the config file"
        ))),
        _ => Err(ConfigError::Validation(format!(
            "environment variables are not set: {}",
            names.join(", ")
        ))),
    }
}

fn expand_paths(config: &mut Config) {
    config.paths.config_dir = expand_tilde(&config.paths.config_dir);
    config.paths.all_addon_configs_dir = expand_tilde(&config.paths.all_addon_configs_dir);
    for file in &mut config.core_log.files {
        *file = expand_tilde(file);
    }
}

fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let mut errors = Vec::new();

    if config.auth.token.trim().is_empty() {
        errors.push("auth.token cannot be empty".to_string());
    }
    if config.upstream.token.trim().is_empty() {
        errors.push("upstream.token cannot be empty".to_string());
    }
    if config.upstream.base_url.trim().is_empty() {
        errors.push("upstream.base_url cannot be empty".to_string());
    }
    if config.z2m.slug.trim().is_empty() {
        errors.push("z2m.slug cannot be empty".to_string());
    }
    if config.z2m.fetch_cap < MIN_Z2M_FETCH_CAP {
        errors.push(format!(
            "z2m.fetch_cap must be >= {MIN_Z2M_FETCH_CAP} (got {})",
            config.z2m.fetch_cap
        ));
    }

    let lines = &config.lines;
    if lines.default <= 0 {
        errors.push(format!("lines.default must be positive (got {})", lines.default));
    }
    if lines.max <= 0 {
        errors.push(format!("lines.max must be positive (got {})", lines.max));
    } else if lines.max < lines.default {
        errors.push(format!(
            "lines.max ({}) must be >= lines.default ({})",
            lines.max, lines.default
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationList(errors))
    }
}
