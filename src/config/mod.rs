pub mod generate;
pub mod parse;
pub mod types;

use regex::{Captures, Regex};
use std::path::{Path, PathBuf};

pub use parse::{load_config, ConfigError};
pub use types::Config;

const ENV_PLACEHOLDER: &str = r"\$env\{([A-Za-z_][A-Za-z0-9_]*)\}";

fn env_placeholder() -> Regex {
    Regex::new(ENV_PLACEHOLDER).expect("env placeholder pattern is valid")
}

/// Replaces `$env{NAME}` placeholders with the value of the named variable.
/// Placeholders whose variable is unset are left in place so validation can
/// report them.
pub fn expand_env_vars(text: &str) -> String {
    env_placeholder()
        .replace_all(text, |caps: &Captures| {
            std::env::var(&caps[1]).unwrap_or_else(|_| caps[0].to_string())
        })
        .into_owned()
}

/// Names of `$env{..}` placeholders still present in `text`, sorted and deduplicated.
pub fn unexpanded_env_vars(text: &str) -> Vec<String> {
    let mut names: Vec<String> = env_placeholder()
        .captures_iter(text)
        .map(|caps| caps[1].to_string())
        .collect();
    names.sort();
    names.dedup();
    names
}

/// Expands a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
    let Some(home_dir) = dirs::home_dir() else {
        return path.to_path_buf();
    };

    match path.strip_prefix("~") {
        Ok(rest) if rest.as_os_str().is_empty() => home_dir,
        Ok(rest) => home_dir.join(rest),
        Err(_) => path.to_path_buf(),
    }
}

/// Resolves the config file path.
/// Returns the first match from:
/// 1. Explicit path (with tilde expansion)
/// 2. ~/.config/loggw/config.yml
/// 3. /etc/loggw/config.yml
pub fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(expand_tilde(path));
    }

    if let Some(home_dir) = dirs::home_dir() {
        let user_config = home_dir.join(".config/loggw/config.yml");
        if user_config.exists() {
            return Some(user_config);
        }
    }

    let system_config = PathBuf::from("/etc/loggw/config.yml");
    if system_config.exists() {
        return Some(system_config);
    }

    None
}
