/*
 *  tabs/uptime.rs
 *
 *  showtime - tabs on a serial screen
 *	(c) 2020-26 Stuart Hunter
 *
 *	Website uptime tab - periodic reachability checks
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

use log::{debug, info};
use reqwest::Client;
use tokio::time::Instant;

use super::{http_client, Tab};
use crate::config::{ConfigError, WebsiteConfig};
use crate::deutils::format_timespan;
use crate::display::{Color, DisplayError, SerialDisplay};
use crate::pacer::Throttle;

pub const CHECK_INTERVAL: Duration = Duration::from_secs(60);
pub const CHECK_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct SiteStatus {
    pub name: String,
    pub url: String,
    /// `None` until the first check completes
    pub up: Option<bool>,
    /// When the current outage was first seen
    pub down_since: Option<Instant>,
}

impl SiteStatus {
    /// Fold one check result into the status
    pub fn record(&mut self, reachable: bool, now: Instant) {
        if reachable {
            if self.up == Some(false) {
                info!("{} is back up", self.name);
            }
            self.down_since = None;
        } else if self.down_since.is_none() {
            info!("{} went down", self.name);
            self.down_since = Some(now);
        }
        self.up = Some(reachable);
    }

    pub fn downtime(&self, now: Instant) -> Duration {
        self.down_since.map_or(Duration::ZERO, |since| now.saturating_duration_since(since))
    }
}

pub struct WebsiteUptime {
    sites: Vec<SiteStatus>,
    client: Client,
    throttle: Throttle,
}

impl WebsiteUptime {
    pub fn new(websites: &[WebsiteConfig]) -> Result<Self, ConfigError> {
        let sites = websites
            .iter()
            .map(|w| SiteStatus { name: w.name.clone(), url: w.url.clone(), up: None, down_since: None })
            .collect();
        Ok(Self {
            sites,
            client: http_client(CHECK_TIMEOUT)?,
            throttle: Throttle::new(CHECK_INTERVAL),
        })
    }

    pub fn sites(&self) -> &[SiteStatus] {
        &self.sites
    }

    /// Check every site if a minute has passed since the last round
    pub async fn refresh(&mut self) {
        if !self.throttle.is_due() {
            return;
        }
        for site in &mut self.sites {
            let reachable = match self.client.get(&site.url).send().await {
                Ok(response) => response.status().is_success(),
                Err(e) => {
                    debug!("{} unreachable: {}", site.url, e);
                    false
                }
            };
            site.record(reachable, Instant::now());
        }
        self.throttle.record_success();
    }

    pub async fn draw(&self, display: &mut SerialDisplay) -> Result<(), DisplayError> {
        let now = Instant::now();
        for site in &self.sites {
            let Some(up) = site.up else { continue };

            display.set_foreground(Color::White).await?.write_line(&site.name).await?;
            if up {
                display.set_foreground(Color::Green).await?.write_line("UP").await?;
            } else {
                let outage = format_timespan(site.downtime(now).as_secs());
                display
                    .set_foreground(Color::Red)
                    .await?
                    .write_line(&format!("DOWN for {outage}"))
                    .await?;
            }
            display.linebreak().await?;
        }
        display.set_foreground(Color::White).await?;
        Ok(())
    }
}

impl Tab for WebsiteUptime {
    fn title(&self) -> &str {
        "Website uptime"
    }

    async fn render(&mut self, display: &mut SerialDisplay) -> Result<(), DisplayError> {
        self.refresh().await;
        self.draw(display).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::MockTransport;
    use tokio::time::advance;

    fn site() -> SiteStatus {
        SiteStatus { name: "Example".into(), url: "http://example.invalid".into(), up: None, down_since: None }
    }

    #[tokio::test(start_paused = true)]
    async fn test_outage_measured_from_first_failure() {
        let mut status = site();
        let start = Instant::now();
        status.record(false, start);

        advance(Duration::from_secs(90)).await;
        status.record(false, Instant::now());
        assert_eq!(status.down_since, Some(start));
        assert_eq!(status.downtime(Instant::now()), Duration::from_secs(90));

        status.record(true, Instant::now());
        assert_eq!(status.up, Some(true));
        assert_eq!(status.downtime(Instant::now()), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_unreachable_site_reported_down() {
        let websites = vec![WebsiteConfig { name: "Local".into(), url: "http://127.0.0.1:1/".into() }];
        let mut tab = WebsiteUptime::new(&websites).unwrap();
        let transport = MockTransport::new();
        let mut display = SerialDisplay::new(transport.boxed());

        tab.render(&mut display).await.unwrap();

        assert_eq!(tab.sites()[0].up, Some(false));
        let out = transport.output();
        assert!(out.contains("Local"));
        assert!(out.contains("DOWN for"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unchecked_sites_not_drawn() {
        let websites = vec![WebsiteConfig { name: "Pending".into(), url: "http://127.0.0.1:1/".into() }];
        let tab = WebsiteUptime::new(&websites).unwrap();
        let transport = MockTransport::new();
        let mut display = SerialDisplay::new(transport.boxed());

        tab.draw(&mut display).await.unwrap();

        assert!(!transport.output().contains("Pending"));
    }
}
