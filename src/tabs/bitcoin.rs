/*
 *  tabs/bitcoin.rs
 *
 *  showtime - tabs on a serial screen
 *	(c) 2020-26 Stuart Hunter
 *
 *	Bitcoin tabs - exchange ticker and bitcoind node statistics
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

use std::collections::HashSet;
use std::time::Duration;

use chrono::Utc;
use log::{debug, warn};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tokio::time::Instant;

use super::{http_client, write_error_line, FetchError, Tab};
use crate::config::ConfigError;
use crate::deutils::{deserialize_numeric_f64, format_timespan};
use crate::display::{Color, DisplayError, SerialDisplay};
use crate::httprpc::RpcClient;
use crate::pacer::Throttle;

pub const TICKER_URL: &str = "https://www.bitstamp.net/api/ticker/";
pub const TICKER_INTERVAL: Duration = Duration::from_secs(60);
const TICKER_TIMEOUT: Duration = Duration::from_secs(5);

/// Mempool tracking starts over once this many transactions are held
pub const TRANSACTION_PURGE_THRESHOLD: usize = 20_000;

const CONNECTION_YELLOW_THRESHOLD: usize = 4;
const CONNECTION_GREEN_THRESHOLD: usize = 9;

#[derive(Debug, Default, Clone, Copy, PartialEq, Deserialize)]
pub struct Ticker {
    #[serde(deserialize_with = "deserialize_numeric_f64")]
    pub last: f64,
    #[serde(deserialize_with = "deserialize_numeric_f64")]
    pub high: f64,
    #[serde(deserialize_with = "deserialize_numeric_f64")]
    pub low: f64,
}

pub struct BitcoinPrice {
    url: String,
    client: Client,
    throttle: Throttle,
    ticker: Ticker,
    error: Option<String>,
}

impl BitcoinPrice {
    pub fn new(url: Option<&str>) -> Result<Self, ConfigError> {
        Ok(Self {
            url: url.unwrap_or(TICKER_URL).to_string(),
            client: http_client(TICKER_TIMEOUT)?,
            throttle: Throttle::new(TICKER_INTERVAL),
            ticker: Ticker::default(),
            error: None,
        })
    }

    pub fn ticker(&self) -> &Ticker {
        &self.ticker
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    async fn fetch(&self) -> Result<Ticker, FetchError> {
        let response = self.client.get(&self.url).send().await?;
        if !response.status().is_success() {
            return Err(FetchError::Status(response.status().as_u16()));
        }
        Ok(response.json::<Ticker>().await?)
    }

    pub async fn refresh(&mut self) {
        if !self.throttle.is_due() {
            return;
        }
        match self.fetch().await {
            Ok(ticker) => {
                self.ticker = ticker;
                self.error = None;
                self.throttle.record_success();
            }
            Err(e) => {
                let wait = self.throttle.record_failure();
                warn!("Ticker update failed, retry in {:?}: {}", wait, e);
                self.error = Some(e.summary());
            }
        }
    }

    pub async fn draw(&self, display: &mut SerialDisplay) -> Result<(), DisplayError> {
        let text_size = display.text_size();
        display
            .set_text_size(3)
            .await?
            .set_background(Color::Black)
            .await?
            .set_foreground(Color::White)
            .await?
            .write("Last ")
            .await?
            .set_foreground(Color::Yellow)
            .await?
            .linebreak()
            .await?
            .write_line(&format!("${:.2}", self.ticker.last))
            .await?
            .linebreak()
            .await?;

        for (label, value) in [("24hr high", self.ticker.high), ("24hr low", self.ticker.low)] {
            display
                .set_foreground(Color::White)
                .await?
                .write(label)
                .await?
                .set_foreground(Color::Yellow)
                .await?
                .linebreak()
                .await?
                .write_line(&format!("${value:.2}"))
                .await?;
        }
        display.set_text_size(text_size).await?.set_foreground(Color::White).await?;

        if let Some(error) = &self.error {
            display.linebreak().await?;
            write_error_line(display, error).await?;
        }
        Ok(())
    }
}

impl Tab for BitcoinPrice {
    fn title(&self) -> &str {
        "Bitcoin price"
    }

    async fn render(&mut self, display: &mut SerialDisplay) -> Result<(), DisplayError> {
        self.refresh().await;
        self.draw(display).await
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PeerInfo {
    pub inbound: bool,
    #[serde(default)]
    pub addrlocal: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BlockInfo {
    pub time: i64,
    pub tx: Vec<String>,
}

/// One round of RPC answers
#[derive(Debug, Clone)]
pub struct NodeSnapshot {
    pub block_count: u64,
    pub peers: Vec<PeerInfo>,
    pub mempool: Vec<String>,
    pub best_block: BlockInfo,
}

/// Running view of the node, built up from successive snapshots.
#[derive(Debug, Clone)]
pub struct NodeStats {
    pub connections: usize,
    pub inbound: usize,
    pub outbound: usize,
    pub addr_local: String,
    pub block_count: u64,
    pub utx_count: usize,
    /// Unconfirmed transactions seen and not yet mined
    pub mempool: HashSet<String>,
    /// New transactions counted since `utx_start`
    pub utx_since_last_block: u64,
    pub utx_start: Option<Instant>,
    /// Unix time of the best block
    pub last_block_time: i64,
}

impl Default for NodeStats {
    fn default() -> Self {
        Self {
            connections: 0,
            inbound: 0,
            outbound: 0,
            addr_local: "N/A".to_string(),
            block_count: 0,
            utx_count: 0,
            mempool: HashSet::new(),
            utx_since_last_block: 0,
            utx_start: None,
            last_block_time: Utc::now().timestamp(),
        }
    }
}

impl NodeStats {
    pub fn apply(&mut self, snapshot: NodeSnapshot, now: Instant) {
        if self.mempool.len() >= TRANSACTION_PURGE_THRESHOLD {
            debug!("Mempool tracking reset at {} transactions", self.mempool.len());
            self.mempool.clear();
            self.utx_start = None;
            self.utx_since_last_block = 0;
        }

        if self.block_count != snapshot.block_count {
            self.utx_since_last_block = 0;
            if self.utx_start.is_some() {
                self.utx_start = Some(now);
            }
        }
        self.block_count = snapshot.block_count;

        self.connections = snapshot.peers.len();
        self.inbound = snapshot.peers.iter().filter(|p| p.inbound).count();
        self.outbound = self.connections - self.inbound;
        if let Some(addr) = snapshot.peers.iter().rev().find_map(|p| p.addrlocal.clone()) {
            self.addr_local = addr;
        }

        self.utx_count = snapshot.mempool.len();
        let counting = self.utx_start.is_some();
        for tx in snapshot.mempool {
            if self.mempool.insert(tx) && counting {
                self.utx_since_last_block += 1;
            }
        }

        self.last_block_time = snapshot.best_block.time;
        for tx in &snapshot.best_block.tx {
            self.mempool.remove(tx);
        }

        if self.utx_start.is_none() {
            self.utx_start = Some(now);
        }
    }

    pub fn tx_per_second(&self, now: Instant) -> f64 {
        let elapsed = self
            .utx_start
            .map_or(0, |start| now.saturating_duration_since(start).as_secs());
        if elapsed == 0 {
            return 0.0;
        }
        self.utx_since_last_block as f64 / elapsed as f64
    }

    pub fn secs_since_block(&self, unix_now: i64) -> u64 {
        unix_now.saturating_sub(self.last_block_time).max(0) as u64
    }
}

/// Color for a peer count
pub fn connection_color(connections: usize) -> Color {
    if connections < CONNECTION_YELLOW_THRESHOLD {
        Color::Red
    } else if connections <= CONNECTION_GREEN_THRESHOLD {
        Color::Yellow
    } else {
        Color::Green
    }
}

pub struct Bitcoind {
    client: RpcClient,
    host_label: String,
    throttle: Throttle,
    stats: NodeStats,
    error: Option<String>,
}

impl Bitcoind {
    pub fn new(host: &str, username: &str, password: &str) -> Result<Self, ConfigError> {
        let client = RpcClient::new(host, username, password)
            .map_err(|e| ConfigError::Validation(format!("bitcoind client: {e}")))?;
        let host_label = host
            .trim_start_matches("http://")
            .trim_start_matches("https://")
            .to_string();
        Ok(Self {
            client,
            host_label,
            throttle: Throttle::new(Duration::ZERO),
            stats: NodeStats::default(),
            error: None,
        })
    }

    pub fn stats(&self) -> &NodeStats {
        &self.stats
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    async fn fetch(&mut self) -> Result<NodeSnapshot, FetchError> {
        let block_count: u64 = self.client.call_as("getblockcount", vec![]).await?;
        let peers: Vec<PeerInfo> = self.client.call_as("getpeerinfo", vec![]).await?;
        let mempool: Vec<String> = self.client.call_as("getrawmempool", vec![]).await?;
        let best_hash: String = self.client.call_as("getbestblockhash", vec![]).await?;
        let best_block: BlockInfo = self
            .client
            .call_as("getblock", vec![Value::String(best_hash)])
            .await?;
        Ok(NodeSnapshot { block_count, peers, mempool, best_block })
    }

    pub async fn refresh(&mut self) {
        if !self.throttle.is_due() {
            return;
        }
        match self.fetch().await {
            Ok(snapshot) => {
                self.stats.apply(snapshot, Instant::now());
                self.error = None;
                self.throttle.record_success();
            }
            Err(e) if e.is_silent() => {
                debug!("Error in bitcoind response, skipping: {}", e);
                self.error = None;
                self.throttle.record_success();
            }
            Err(e) => {
                let wait = self.throttle.record_failure();
                warn!("bitcoind {} failed, retry in {:?}: {}", self.client.url(), wait, e);
                self.error = Some(e.summary());
            }
        }
    }

    pub async fn draw(&self, display: &mut SerialDisplay) -> Result<(), DisplayError> {
        if let Some(error) = &self.error {
            return write_error_line(display, error).await;
        }

        let stats = &self.stats;
        display
            .set_background(Color::Black)
            .await?
            .set_foreground(Color::Yellow)
            .await?
            .write_line(&self.host_label)
            .await?
            .set_foreground(Color::White)
            .await?
            .write("Local: ")
            .await?
            .set_foreground(Color::Yellow)
            .await?
            .write_line(&stats.addr_local)
            .await?
            .linebreak()
            .await?;

        display
            .set_foreground(Color::White)
            .await?
            .write("Connections: ")
            .await?
            .set_foreground(connection_color(stats.connections))
            .await?
            .write_line(&stats.connections.to_string())
            .await?;
        for (label, count) in [("    inbound: ", stats.inbound), ("   outbound: ", stats.outbound)] {
            display
                .set_foreground(Color::White)
                .await?
                .write(label)
                .await?
                .set_foreground(Color::Yellow)
                .await?
                .write_line(&count.to_string())
                .await?;
        }
        display.linebreak().await?;

        let now = Instant::now();
        display
            .set_foreground(Color::White)
            .await?
            .write("Blocks: ")
            .await?
            .set_foreground(Color::Yellow)
            .await?
            .write_line(&stats.block_count.to_string())
            .await?
            .set_foreground(Color::White)
            .await?
            .write_line("Unconf. tx: ")
            .await?
            .set_foreground(Color::Yellow)
            .await?
            .write(&stats.utx_count.to_string())
            .await?
            .write_line(&format!(" ({:.2} tx/s)", stats.tx_per_second(now)))
            .await?
            .set_foreground(Color::White)
            .await?
            .write_line("Time since block: ")
            .await?
            .set_foreground(Color::Yellow)
            .await?
            .write_line(&format_timespan(stats.secs_since_block(Utc::now().timestamp())))
            .await?
            .set_foreground(Color::White)
            .await?;
        Ok(())
    }
}

impl Tab for Bitcoind {
    fn title(&self) -> &str {
        "bitcoind stats"
    }

    async fn render(&mut self, display: &mut SerialDisplay) -> Result<(), DisplayError> {
        self.refresh().await;
        self.draw(display).await
    }
}
