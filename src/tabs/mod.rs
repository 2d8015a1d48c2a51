/*
 *  tabs/mod.rs
 *
 *  showtime - tabs on a serial screen
 *	(c) 2020-26 Stuart Hunter
 *
 *	Tabs - the pages the scheduler rotates through
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

use std::time::Duration;

use reqwest::Client;
use thiserror::Error;

use crate::config::{resolve_password, Config, ConfigError, TabConfig};
use crate::deutils::progress_bar;
use crate::display::{Color, DisplayError, SerialDisplay};
use crate::httprpc::RpcClientError;
use crate::scheduler::TabRegistry;

pub mod bitcoin;
pub mod sysinfo;
pub mod uptime;

pub use bitcoin::{BitcoinPrice, Bitcoind};
pub use sysinfo::{DiskUsage, SystemStats};
pub use uptime::WebsiteUptime;

/// One page of content below the header.
///
/// `render` draws from the cursor position left by the header. Upstream
/// trouble is the tab's own business and shows up on screen; only a
/// failing display comes back as an error.
#[allow(async_fn_in_trait)]
pub trait Tab {
    fn title(&self) -> &str;

    async fn render(&mut self, display: &mut SerialDisplay) -> Result<(), DisplayError>;
}

/// Why a tab could not refresh its data
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("HTTP status {0}")]
    Status(u16),
    #[error("RPC: {0}")]
    Rpc(#[from] RpcClientError),
}

impl FetchError {
    /// Well-formed but unusable answer, skip the update without an error line
    pub fn is_silent(&self) -> bool {
        matches!(self, FetchError::Rpc(e) if e.is_silent())
    }

    /// Short text for the on-screen error line
    pub fn summary(&self) -> String {
        match self {
            FetchError::Http(e) if e.is_timeout() => "Request timed out".to_string(),
            FetchError::Http(e) if e.is_connect() => "Connection failed".to_string(),
            FetchError::Rpc(RpcClientError::Http(e)) if e.is_timeout() => {
                "Request timed out, bitcoind probably busy".to_string()
            }
            FetchError::Rpc(RpcClientError::Http(e)) if e.is_connect() => {
                "Couldn't connect to bitcoind".to_string()
            }
            other => other.to_string(),
        }
    }
}

/// Tabs that can be named in the config file
pub enum AnyTab {
    SystemStats(SystemStats),
    DiskUsage(DiskUsage),
    WebsiteUptime(WebsiteUptime),
    BitcoinPrice(BitcoinPrice),
    Bitcoind(Bitcoind),
}

impl AnyTab {
    pub fn from_config(entry: &TabConfig) -> Result<Self, ConfigError> {
        Ok(match entry {
            TabConfig::SystemStats => AnyTab::SystemStats(SystemStats::new()),
            TabConfig::DiskUsage => AnyTab::DiskUsage(DiskUsage::new()),
            TabConfig::WebsiteUptime { websites } => {
                AnyTab::WebsiteUptime(WebsiteUptime::new(websites)?)
            }
            TabConfig::BitcoinPrice { url } => AnyTab::BitcoinPrice(BitcoinPrice::new(url.as_deref())?),
            TabConfig::Bitcoind { host, username, password, password_file } => {
                let password = resolve_password(password.as_deref(), password_file.as_deref())?;
                AnyTab::Bitcoind(Bitcoind::new(host, username, &password)?)
            }
        })
    }
}

impl Tab for AnyTab {
    fn title(&self) -> &str {
        match self {
            AnyTab::SystemStats(t) => t.title(),
            AnyTab::DiskUsage(t) => t.title(),
            AnyTab::WebsiteUptime(t) => t.title(),
            AnyTab::BitcoinPrice(t) => t.title(),
            AnyTab::Bitcoind(t) => t.title(),
        }
    }

    async fn render(&mut self, display: &mut SerialDisplay) -> Result<(), DisplayError> {
        match self {
            AnyTab::SystemStats(t) => t.render(display).await,
            AnyTab::DiskUsage(t) => t.render(display).await,
            AnyTab::WebsiteUptime(t) => t.render(display).await,
            AnyTab::BitcoinPrice(t) => t.render(display).await,
            AnyTab::Bitcoind(t) => t.render(display).await,
        }
    }
}

impl TabRegistry<AnyTab> {
    /// Build every configured tab, in configuration order
    pub fn from_config(cfg: &Config) -> Result<Self, ConfigError> {
        let tabs = cfg
            .tabs()
            .iter()
            .map(AnyTab::from_config)
            .collect::<Result<Vec<_>, _>>()?;
        TabRegistry::new(tabs)
    }
}

pub(crate) fn http_client(timeout: Duration) -> Result<Client, ConfigError> {
    const VERSION: &str = concat!(env!("CARGO_PKG_NAME"), " v", env!("CARGO_PKG_VERSION"));
    Client::builder()
        .user_agent(VERSION)
        .timeout(timeout)
        .build()
        .map_err(|e| ConfigError::Validation(format!("unable to build HTTP client: {e}")))
}

/// `[` + threshold colored bar + `]`, spanning the whole row
pub(crate) async fn write_usage_bar(
    display: &mut SerialDisplay,
    fraction: f64,
) -> Result<(), DisplayError> {
    let width = display.columns().saturating_sub(2);
    display
        .set_foreground(Color::White)
        .await?
        .write("[")
        .await?
        .set_foreground(Color::for_usage(fraction))
        .await?
        .write(&progress_bar(width, fraction))
        .await?
        .set_foreground(Color::White)
        .await?
        .write("]")
        .await?;
    Ok(())
}

/// One red row of error text, foreground back to white afterwards
pub(crate) async fn write_error_line(
    display: &mut SerialDisplay,
    message: &str,
) -> Result<(), DisplayError> {
    let clipped: String = message.chars().take(display.columns()).collect();
    display
        .set_foreground(Color::Red)
        .await?
        .write_line(&clipped)
        .await?
        .set_foreground(Color::White)
        .await?;
    Ok(())
}
