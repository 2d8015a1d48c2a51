/*
 *  config.rs
 *
 *  showtime - tabs on a serial screen
 *	(c) 2020-26 Stuart Hunter
 *
 *	Configuration - YAML file layered under command line overrides
 *
 *	This program is free software: you can redistribute it and/or modify
 *	it under the terms of the GNU General Public License as published by
 *	the Free Software Foundation, either version 3 of the License, or
 *	(at your option) any later version.
 *
 *	This program is distributed in the hope that it will be useful,
 *	but WITHOUT ANY WARRANTY; without even the implied warranty of
 *	MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *	GNU General Public License for more details.
 *
 *	See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *	Public License.
 *
 */

use clap::{ArgAction, Parser, ValueHint};
use dirs_next::home_dir;
use serde::{Deserialize, Serialize};
use std::{fs, path::{Path, PathBuf}, time::Duration};
use thiserror::Error;

pub const DEFAULT_PORT: &str = "/dev/ttyUSB0";
pub const DEFAULT_TAB: usize = 1;
pub const DEFAULT_INTERVAL_SECS: u64 = 15;
pub const DEFAULT_ROTATION: u8 = 0;
pub const DEFAULT_BOOT_DELAY_SECS: u64 = 6;
pub const DEFAULT_LOG_LEVEL: &str = "info";
pub const DEFAULT_WEBSITE_NAME: &str = "Google";
pub const DEFAULT_WEBSITE_URL: &str = "http://google.com";

/// Error type for config loading/validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Top-level app configuration. Unset fields fall back to the defaults above.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub port: Option<String>,
    /// 1-based tab shown first
    pub tab: Option<usize>,
    pub interval_secs: Option<u64>,
    pub rotation: Option<u8>,
    pub boot_delay_secs: Option<u64>,
    pub log_level: Option<String>,
    pub tabs: Option<Vec<TabConfig>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TabConfig {
    SystemStats,
    DiskUsage,
    WebsiteUptime {
        websites: Vec<WebsiteConfig>,
    },
    BitcoinPrice {
        /// ticker endpoint, Bitstamp when unset
        #[serde(default, skip_serializing_if = "Option::is_none")]
        url: Option<String>,
    },
    Bitcoind {
        host: String,
        username: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        password: Option<String>,
        /// read the password from here instead, first line only
        #[serde(default, skip_serializing_if = "Option::is_none")]
        password_file: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebsiteConfig {
    pub name: String,
    pub url: String,
}

impl Config {
    pub fn port(&self) -> &str {
        self.port.as_deref().unwrap_or(DEFAULT_PORT)
    }

    /// 0-based index of the first tab
    pub fn start_index(&self) -> usize {
        self.tab.unwrap_or(DEFAULT_TAB).saturating_sub(1)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.unwrap_or(DEFAULT_INTERVAL_SECS))
    }

    pub fn rotation(&self) -> u8 {
        self.rotation.unwrap_or(DEFAULT_ROTATION)
    }

    pub fn boot_delay(&self) -> Duration {
        Duration::from_secs(self.boot_delay_secs.unwrap_or(DEFAULT_BOOT_DELAY_SECS))
    }

    pub fn log_level(&self) -> &str {
        self.log_level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL)
    }

    /// Configured tabs; with none listed, system and disk stats plus an
    /// uptime check on one well known site
    pub fn tabs(&self) -> Vec<TabConfig> {
        self.tabs.clone().unwrap_or_else(|| {
            vec![
                TabConfig::SystemStats,
                TabConfig::DiskUsage,
                TabConfig::WebsiteUptime {
                    websites: vec![WebsiteConfig {
                        name: DEFAULT_WEBSITE_NAME.to_string(),
                        url: DEFAULT_WEBSITE_URL.to_string(),
                    }],
                },
            ]
        })
    }
}

/// Resolve the RPC password from inline text or a file
pub fn resolve_password(
    password: Option<&str>,
    password_file: Option<&Path>,
) -> Result<String, ConfigError> {
    match (password, password_file) {
        (Some(p), _) => Ok(p.to_string()),
        (None, Some(path)) => {
            let contents = fs::read_to_string(path)?;
            Ok(contents.lines().next().unwrap_or("").trim().to_string())
        }
        (None, None) => Err(ConfigError::Validation(
            "bitcoind needs password or password_file".into(),
        )),
    }
}

/// CLI overrides. All fields are Options so we can layer them over YAML.
#[derive(Debug, Parser, Clone)]
#[command(name = "showtime", about = "Rotating status tabs on a serial display", version)]
pub struct Cli {
    /// Path to a YAML config file (overrides search)
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,
    /// start from which tab (default=1)
    #[arg(short = 't', long)]
    pub tab: Option<usize>,
    /// seconds a tab is shown before changing it (default=15)
    #[arg(short = 'T', long = "time")]
    pub time: Option<u64>,
    /// serial port to use as the output (default=/dev/ttyUSB0)
    #[arg(short = 'p', long, value_hint = ValueHint::FilePath)]
    pub port: Option<String>,
    /// panel rotation 0..=3, even values are portrait
    #[arg(long)]
    pub rotation: Option<u8>,
    /// seconds to let the panel boot before the first write
    #[arg(long)]
    pub boot_delay: Option<u64>,
    #[arg(long)]
    pub log_level: Option<String>,
    /// shorthand for --log-level debug
    #[arg(short = 'd', long, action = ArgAction::SetTrue)]
    pub debug: bool,
    /// dump fully merged config (after overrides) and exit
    #[arg(long, action = ArgAction::SetTrue)]
    pub dump_config: bool,
}

/// Public entry point: parse CLI, read YAML, merge, validate.
pub fn load() -> Result<Config, ConfigError> {
    let cli = Cli::parse();
    let cfg = resolve(&cli)?;

    if cli.dump_config {
        // Pretty YAML of effective config
        let s = serde_yaml::to_string(&cfg)?;
        println!("{s}");
        std::process::exit(0);
    }

    Ok(cfg)
}

/// Defaults, then YAML, then CLI, then validation
pub fn resolve(cli: &Cli) -> Result<Config, ConfigError> {
    let mut cfg = Config::default();

    if let Some(p) = cli.config.as_ref() {
        if p.exists() {
            let y = read_yaml(p)?;
            merge(&mut cfg, y);
        } else {
            return Err(ConfigError::Validation(format!(
                "Config file not found: {}",
                p.display()
            )));
        }
    } else if let Some(p) = find_config_file() {
        let y = read_yaml(&p)?;
        merge(&mut cfg, y);
    }

    apply_cli_overrides(&mut cfg, cli);
    validate(&cfg)?;
    Ok(cfg)
}

/// Try common locations in order (first hit wins).
fn find_config_file() -> Option<PathBuf> {
    // XDG-style: ~/.config/showtime/config.yaml
    if let Some(home) = home_dir() {
        let p = home.join(".config/showtime/config.yaml");
        if p.exists() { return Some(p) }
        let p = home.join(".config/showtime.yaml");
        if p.exists() { return Some(p) }
    }
    // project local
    for candidate in &["showtime.yaml", "config.yaml"] {
        let p = PathBuf::from(candidate);
        if p.exists() { return Some(p) }
    }
    None
}

fn read_yaml(path: &Path) -> Result<Config, ConfigError> {
    let s = fs::read_to_string(path)?;
    parse_yaml(&s)
}

pub fn parse_yaml(text: &str) -> Result<Config, ConfigError> {
    Ok(serde_yaml::from_str(text)?)
}

/// Shallow merge `src` into `dst`, Option-by-Option.
fn merge(dst: &mut Config, src: Config) {
    if src.port.is_some()            { dst.port = src.port; }
    if src.tab.is_some()             { dst.tab = src.tab; }
    if src.interval_secs.is_some()   { dst.interval_secs = src.interval_secs; }
    if src.rotation.is_some()        { dst.rotation = src.rotation; }
    if src.boot_delay_secs.is_some() { dst.boot_delay_secs = src.boot_delay_secs; }
    if src.log_level.is_some()       { dst.log_level = src.log_level; }
    if src.tabs.is_some()            { dst.tabs = src.tabs; }
}

fn apply_cli_overrides(cfg: &mut Config, cli: &Cli) {
    if cli.port.is_some()       { cfg.port = cli.port.clone(); }
    if cli.tab.is_some()        { cfg.tab = cli.tab; }
    if cli.time.is_some()       { cfg.interval_secs = cli.time; }
    if cli.rotation.is_some()   { cfg.rotation = cli.rotation; }
    if cli.boot_delay.is_some() { cfg.boot_delay_secs = cli.boot_delay; }
    if cli.log_level.is_some()  { cfg.log_level = cli.log_level.clone(); }
    if cli.debug                { cfg.log_level = Some("debug".into()); }
}

/// Put any invariants here (required fields, ranges, etc.)
pub fn validate(cfg: &Config) -> Result<(), ConfigError> {
    let invalid = |msg: String| Err(ConfigError::Validation(msg));

    if cfg.interval().is_zero() {
        return invalid("interval must be > 0 seconds".into());
    }
    if cfg.rotation() > 3 {
        return invalid(format!("rotation must be 0..=3, got {}", cfg.rotation()));
    }

    let tabs = cfg.tabs();
    if tabs.is_empty() {
        return invalid("at least one tab must be configured".into());
    }
    let tab = cfg.tab.unwrap_or(DEFAULT_TAB);
    if tab == 0 || tab > tabs.len() {
        return invalid(format!("start tab must be 1..={}, got {}", tabs.len(), tab));
    }

    for entry in &tabs {
        match entry {
            TabConfig::WebsiteUptime { websites } => {
                if websites.is_empty() {
                    return invalid("website_uptime needs at least one website".into());
                }
                if websites.iter().any(|w| w.name.trim().is_empty() || w.url.trim().is_empty()) {
                    return invalid("every website needs a name and a url".into());
                }
            }
            TabConfig::Bitcoind { host, username, password, password_file } => {
                if host.trim().is_empty() || username.trim().is_empty() {
                    return invalid("bitcoind needs host and username".into());
                }
                if password.is_none() && password_file.is_none() {
                    return invalid("bitcoind needs password or password_file".into());
                }
            }
            _ => {}
        }
    }
    Ok(())
}
