// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP API connector.
//!
//! The command is a JSON document `{"method": "GET", "endpoint": "/x",
//! "body": {...}}` executed against the configured base URL.

use crate::config::ConnectionConfig;
use crate::outcome::ExecOutcome;
use serde::Deserialize;
use serde_json::Value;
use std::time::{Duration, Instant};

#[derive(Debug, Deserialize)]
struct ApiCommand {
    #[serde(default = "default_method")]
    method: String,
    #[serde(default = "default_endpoint")]
    endpoint: String,
    #[serde(default)]
    body: Option<Value>,
}

fn default_method() -> String {
    "GET".to_string()
}

fn default_endpoint() -> String {
    "/".to_string()
}

pub async fn execute(
    command: &str,
    config: &ConnectionConfig,
    timeout: Duration,
) -> ExecOutcome {
    let Some(base_url) = config.base_url.as_deref().filter(|u| !u.is_empty()) else {
        return ExecOutcome::connection_failure("API connector requires base_url.");
    };

    let api_command: ApiCommand = match serde_json::from_str(command) {
        Ok(parsed) => parsed,
        Err(error) => {
            return ExecOutcome::failure(format!("Invalid API command JSON: {error}"), -1)
        }
    };

    let method = match api_command.method.to_ascii_uppercase().parse::<reqwest::Method>() {
        Ok(method) => method,
        Err(_) => {
            return ExecOutcome::failure(
                format!("Unsupported HTTP method: {}", api_command.method),
                -1,
            )
        }
    };

    let url = format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        api_command.endpoint.trim_start_matches('/')
    );

    let client = match reqwest::Client::builder().timeout(timeout).build() {
        Ok(client) => client,
        Err(error) => return ExecOutcome::connection_failure(error.to_string()),
    };

    let mut request = client.request(method, &url);
    for (name, value) in &config.headers {
        request = request.header(name, value);
    }
    if let Some(api_key) = &config.api_key {
        request = request.bearer_auth(api_key);
    }
    if let Some(body) = &api_command.body {
        request = request.json(body);
    }

    let started = Instant::now();
    match request.send().await {
        Ok(response) => {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            ExecOutcome {
                success: status.is_success(),
                output: text,
                error: if status.as_u16() >= 400 {
                    format!("HTTP {}", status.as_u16())
                } else {
                    String::new()
                },
                exit_code: status.as_u16() as i32,
                duration_ms: started.elapsed().as_millis() as u64,
                ..ExecOutcome::default()
            }
        }
        Err(error) => {
            tracing::error!(%url, %error, "api execution error");
            ExecOutcome::connection_failure(error.to_string())
        }
    }
}
