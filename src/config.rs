//! Three-tier configuration: `jil.toml` defaults, `JIL_*` env overrides, CLI
//! flags on top. Mirrors the teacher's layering for cache-size env vars
//! (`backend/bytecode/cache.rs::get_can_compile_cache_size`) and package
//! manifests (`backend/modules/package.rs`, `metta.toml`).

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;

#[derive(Debug, Clone)]
pub struct Config {
    pub cache_dir: PathBuf,
    pub jit_enabled: bool,
    pub shadow_enabled: bool,
    pub strict_divergence: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            cache_dir: PathBuf::from(".jil_cache"),
            jit_enabled: true,
            shadow_enabled: true,
            strict_divergence: false,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
struct ConfigFile {
    cache_dir: Option<PathBuf>,
    jit_enabled: Option<bool>,
    shadow_enabled: Option<bool>,
    strict_divergence: Option<bool>,
}

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "could not read config file: {e}"),
            ConfigError::Parse(e) => write!(f, "could not parse config file: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl Config {
    /// Loads `path` (if given) over the defaults, then applies `JIL_*`
    /// environment overrides. CLI flags are applied by the caller afterward
    /// via the `with_*` setters, since they're parsed in `main.rs`.
    pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
        let mut cfg = Config::default();

        if let Some(path) = path {
            let text = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
            let file: ConfigFile = toml::from_str(&text).map_err(ConfigError::Parse)?;
            if let Some(d) = file.cache_dir {
                cfg.cache_dir = d;
            }
            if let Some(b) = file.jit_enabled {
                cfg.jit_enabled = b;
            }
            if let Some(b) = file.shadow_enabled {
                cfg.shadow_enabled = b;
            }
            if let Some(b) = file.strict_divergence {
                cfg.strict_divergence = b;
            }
        }

        if let Ok(v) = std::env::var("JIL_CACHE_DIR") {
            cfg.cache_dir = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("JIL_JIT") {
            cfg.jit_enabled = parse_bool_env(&v, cfg.jit_enabled);
        }
        if let Ok(v) = std::env::var("JIL_SHADOW") {
            cfg.shadow_enabled = parse_bool_env(&v, cfg.shadow_enabled);
        }
        if let Ok(v) = std::env::var("JIL_STRICT") {
            cfg.strict_divergence = parse_bool_env(&v, cfg.strict_divergence);
        }

        Ok(cfg)
    }
}

fn parse_bool_env(v: &str, default: bool) -> bool {
    match v.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_jit_and_shadow_on_strict_off() {
        let cfg = Config::default();
        assert!(cfg.jit_enabled);
        assert!(cfg.shadow_enabled);
        assert!(!cfg.strict_divergence);
    }

    #[test]
    fn parse_bool_env_falls_back_to_default_on_garbage() {
        assert!(parse_bool_env("banana", true));
        assert!(!parse_bool_env("off", true));
    }
}
