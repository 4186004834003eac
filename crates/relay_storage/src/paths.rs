#![forbid(unsafe_code)]

use std::env;
use std::path::PathBuf;

const APP_DIR: &str = "ussd-relay";

pub fn default_config_dir() -> PathBuf {
    if let Some(dir) = non_empty_env("USSD_RELAY_CONFIG_DIR") {
        return PathBuf::from(dir);
    }
    if let Some(xdg_config_home) = non_empty_env("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg_config_home).join(APP_DIR);
    }
    if let Some(home) = non_empty_env("HOME") {
        return PathBuf::from(home).join(".config").join(APP_DIR);
    }
    PathBuf::from(".ussd-relay")
}

/// Per-login ephemeral directory; `None` means keep session state in memory.
pub fn default_session_dir() -> Option<PathBuf> {
    non_empty_env("XDG_RUNTIME_DIR").map(|dir| PathBuf::from(dir).join(APP_DIR))
}

fn non_empty_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}
