// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A thin `reqwest` wrapper over the daemon's two admin HTTP surfaces
//! (§6.1). Both surfaces share the same bearer-token auth and JSON error
//! envelope, so one client handles either depending on which base URL
//! it is built with.

use anyhow::{anyhow, Result};
use core_wire::ApiError;
use reqwest::Method;
use serde::Serialize;
use serde::de::DeserializeOwned;

pub struct DaemonClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl DaemonClient {
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Self {
        Self { http: reqwest::Client::new(), base_url: base_url.into(), token }
    }

    pub async fn get<R: DeserializeOwned>(&self, path: &str) -> Result<R> {
        self.request::<(), R>(Method::GET, path, None).await
    }

    pub async fn post<B: Serialize, R: DeserializeOwned>(&self, path: &str, body: &B) -> Result<R> {
        self.request(Method::POST, path, Some(body)).await
    }

    pub async fn post_empty(&self, path: &str) -> Result<()> {
        self.request_no_response::<()>(path, None).await
    }

    /// POST with a JSON body, discarding the (empty) response — used by
    /// the `204 No Content` mutation endpoints.
    pub async fn post_no_response<B: Serialize>(&self, path: &str, body: &B) -> Result<()> {
        self.request_no_response(path, Some(body)).await
    }

    async fn request<B: Serialize, R: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<R> {
        let mut req = self.http.request(method, format!("{}{}", self.base_url, path));
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }
        if let Some(body) = body {
            req = req.json(body);
        }
        let response = req.send().await?;
        Self::parse(response).await
    }

    async fn request_no_response<B: Serialize>(&self, path: &str, body: Option<&B>) -> Result<()> {
        let mut req = self.http.request(Method::POST, format!("{}{}", self.base_url, path));
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }
        if let Some(body) = body {
            req = req.json(body);
        }
        let response = req.send().await?;
        if response.status().is_success() {
            return Ok(());
        }
        Err(Self::error_for(response).await)
    }

    async fn parse<R: DeserializeOwned>(response: reqwest::Response) -> Result<R> {
        if response.status().is_success() {
            return Ok(response.json().await?);
        }
        Err(Self::error_for(response).await)
    }

    async fn error_for(response: reqwest::Response) -> anyhow::Error {
        let status = response.status();
        match response.json::<ApiError>().await {
            Ok(body) => anyhow!("{} ({}): {}", status, format!("{:?}", body.kind), body.message),
            Err(_) => anyhow!("request failed with status {}", status),
        }
    }
}

pub fn is_connection_refused(err: &anyhow::Error) -> bool {
    err.downcast_ref::<reqwest::Error>().map(|e| e.is_connect()).unwrap_or(false)
}
