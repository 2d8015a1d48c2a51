/*
 *  httprpc.rs
 *
 *  showtime - tabs on a serial screen
 *	(c) 2020-26 Stuart Hunter
 *
 *	JSON-RPC 1.0 client for bitcoind, basic auth over HTTP
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

use log::debug;
use reqwest::{header, Client};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// bitcoind may be busy verifying, don't wait on it longer than this
pub const RPC_TIMEOUT: Duration = Duration::from_secs(4);

#[derive(Debug, Error)]
pub enum RpcClientError {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP status {0}")]
    Status(u16),

    #[error("JSON deserialization error: {0}")]
    Deserialization(#[from] serde_json::Error),

    #[error("RPC error {}: {}", .0.code, .0.message)]
    Rpc(RpcError),

    #[error("RPC response missing 'result' field")]
    MissingResult,

    #[error("RPC id mismatch: expected {expected}, received {received:?}")]
    IdMismatch { expected: u64, received: Option<u64> },
}

impl RpcClientError {
    /// Server answered but the answer is unusable; keep the last state quietly
    pub fn is_silent(&self) -> bool {
        matches!(self, RpcClientError::Rpc(_) | RpcClientError::MissingResult)
    }
}

#[derive(Debug, Serialize)]
pub struct RpcRequest<'a> {
    pub jsonrpc: &'static str,
    pub id: u64,
    pub method: &'a str,
    pub params: Vec<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct JsonRpcResponse {
    pub id: Option<u64>,
    pub result: Option<Value>,
    pub error: Option<RpcError>,
}

impl JsonRpcResponse {
    /// Check id, error object and result in that order
    pub fn into_result(self, expected: u64) -> Result<Value, RpcClientError> {
        if let Some(received) = self.id {
            if received != expected {
                return Err(RpcClientError::IdMismatch { expected, received: Some(received) });
            }
        }
        if let Some(error) = self.error {
            return Err(RpcClientError::Rpc(error));
        }
        match self.result {
            Some(Value::Null) | None => Err(RpcClientError::MissingResult),
            Some(result) => Ok(result),
        }
    }
}

/// Talks to a single bitcoind RPC endpoint.
#[derive(Debug)]
pub struct RpcClient {
    url: String,
    username: String,
    password: String,
    id: u64,
    client: Client,
}

impl RpcClient {
    pub fn new(url: &str, username: &str, password: &str) -> Result<Self, RpcClientError> {
        const VERSION: &str = concat!(env!("CARGO_PKG_NAME"), " v", env!("CARGO_PKG_VERSION"));

        let mut headers = header::HeaderMap::new();
        headers.insert("User-Agent", header::HeaderValue::from_static(VERSION));
        headers.insert("Content-Type", header::HeaderValue::from_static("application/json"));
        headers.insert("Connection", header::HeaderValue::from_static("close"));

        let client = Client::builder()
            .http1_only()
            .default_headers(headers)
            .timeout(RPC_TIMEOUT)
            .build()?;

        Ok(Self {
            url: url.to_string(),
            username: username.to_string(),
            password: password.to_string(),
            id: 1,
            client,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Call `method` and hand back the raw `result` value
    pub async fn call(&mut self, method: &str, params: Vec<Value>) -> Result<Value, RpcClientError> {
        let request_id = self.id;
        self.id = self.id.wrapping_add(1);

        let request = RpcRequest { jsonrpc: "1.0", id: request_id, method, params };
        debug!("rpc {} -> {}", method, self.url);

        let response = self
            .client
            .post(&self.url)
            .basic_auth(&self.username, Some(&self.password))
            .json(&request)
            .send()
            .await?;

        // bitcoind sends its error objects with a 500, so look at the body first
        let status = response.status();
        let body = response.text().await?;
        match serde_json::from_str::<JsonRpcResponse>(&body) {
            Ok(rpc_response) => rpc_response.into_result(request_id),
            Err(_) if !status.is_success() => Err(RpcClientError::Status(status.as_u16())),
            Err(e) => Err(RpcClientError::Deserialization(e)),
        }
    }

    pub async fn call_as<T: DeserializeOwned>(
        &mut self,
        method: &str,
        params: Vec<Value>,
    ) -> Result<T, RpcClientError> {
        let value = self.call(method, params).await?;
        Ok(serde_json::from_value(value)?)
    }
}
