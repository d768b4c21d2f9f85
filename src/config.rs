use anyhow::Result;
use clap::{Parser, Subcommand};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::classifier::ClassifierSettings;
use crate::marker::MarkNames;
use crate::scheduler::SchedulerSettings;
use crate::style::STYLE_ID;

#[derive(Parser, Debug)]
#[command(name = "eyecare")]
#[command(about = "Re-styles light page surfaces to a low-contrast palette", long_about = None)]
pub struct Cli {
    #[arg(short = 'c', long = "config", global = true)]
    pub config_path: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Attach to a captured page, replay its timeline and print the result
    Run {
        snapshot: PathBuf,
        #[arg(short, long)]
        pretty: bool,
    },
    /// List the menu entries for a host
    Menu {
        #[arg(long)]
        host: String,
    },
    /// Select the active theme
    Theme { key: String },
    /// Enable or disable processing on a host
    Toggle { host: String },
}

pub fn default_config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".eyecare")
}

pub fn default_config_path() -> PathBuf {
    default_config_dir().join("config.yaml")
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MarkSettings {
    #[serde(flatten)]
    pub names: MarkNames,
    pub style_id: String,
}

impl Default for MarkSettings {
    fn default() -> Self {
        MarkSettings {
            names: MarkNames::default(),
            style_id: STYLE_ID.to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StoreSettings {
    pub path: PathBuf,
}

impl Default for StoreSettings {
    fn default() -> Self {
        StoreSettings {
            path: default_config_dir().join("store.json"),
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct Config {
    pub classifier: ClassifierSettings,
    pub scheduler: SchedulerSettings,
    pub marks: MarkSettings,
    pub store: StoreSettings,
}

impl Config {
    pub fn new(path: &str) -> Result<Self> {
        let cfg = Config::load_config(path)?;
        Ok(cfg)
    }

    /// Loads `path` when given. Without one, the default location is used
    /// if a file exists there, and built-in defaults otherwise.
    pub fn resolve(path: Option<&str>) -> Result<Self> {
        match path {
            Some(path) => Config::new(path),
            None => {
                let default = default_config_path();
                if Path::new(&default).exists() {
                    Config::new(&default.to_string_lossy())
                } else {
                    tracing::debug!(path = ?default, "no config file, using defaults");
                    Ok(Config::default())
                }
            }
        }
    }

    fn load_config(path: &str) -> Result<Config> {
        let yaml_str = fs::read_to_string(path)?;
        Config::from_yaml(&yaml_str)
    }

    pub fn from_yaml(yaml_str: &str) -> Result<Config> {
        let yaml_with_env = Config::substitute_env_vars(yaml_str);
        if yaml_with_env.trim().is_empty() {
            return Ok(Config::default());
        }
        let config: Config = serde_yaml::from_str(&yaml_with_env)?;
        Ok(config)
    }

    /// Expands `${VAR}` and `${VAR:-default}`. An unset variable without a
    /// default expands to nothing. An unterminated `${` is left as written.
    fn substitute_env_vars(yaml_str: &str) -> String {
        let mut out = String::with_capacity(yaml_str.len());
        let mut rest = yaml_str;

        while let Some(open) = rest.find("${") {
            let body = &rest[open + 2..];
            let Some(close) = body.find('}') else {
                break;
            };
            out.push_str(&rest[..open]);

            let (name, fallback) = match body[..close].split_once(":-") {
                Some((name, fallback)) => (name, Some(fallback)),
                None => (&body[..close], None),
            };
            match (env::var(name), fallback) {
                (Ok(value), _) => out.push_str(&value),
                (Err(_), Some(fallback)) => out.push_str(fallback),
                (Err(_), None) => tracing::warn!(var = name, "environment variable not found"),
            }
            rest = &body[close + 1..];
        }

        out.push_str(rest);
        out
    }
}
