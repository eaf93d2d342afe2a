// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Database connector: runs SQL through the native client binaries.

use crate::config::ConnectionConfig;
use crate::outcome::ExecOutcome;
use crate::subprocess::{binary_available, run_with_timeout, SubprocessError};
use std::time::{Duration, Instant};
use tokio::process::Command;

pub async fn execute(
    command: &str,
    config: &ConnectionConfig,
    timeout: Duration,
) -> ExecOutcome {
    let db_type = config.db_type.as_deref().unwrap_or("postgresql").to_ascii_lowercase();
    let host = config.host.as_deref().unwrap_or("localhost");
    let database = config.database.as_deref().unwrap_or_default();
    let username = config.username.as_deref().unwrap_or_default();

    let query = command.trim();
    if query.is_empty() {
        return ExecOutcome::failure("Database connector requires a SQL statement.", -1);
    }

    let (client, cmd) = match db_type.as_str() {
        "postgresql" | "postgres" => {
            let mut cmd = Command::new("psql");
            cmd.args(["-h", host])
                .args(["-p", &config.port.unwrap_or(5432).to_string()])
                .args(["-U", username])
                .args(["-d", database])
                .args(["-v", "ON_ERROR_STOP=1"])
                .args(["-c", query]);
            if let Some(password) = &config.password {
                cmd.env("PGPASSWORD", password);
            }
            ("psql", cmd)
        }
        "mysql" => {
            let mut cmd = Command::new("mysql");
            cmd.args(["-h", host])
                .args(["-P", &config.port.unwrap_or(3306).to_string()])
                .args(["-u", username])
                .args(["-D", database])
                .args(["-e", query]);
            if let Some(password) = &config.password {
                cmd.env("MYSQL_PWD", password);
            }
            ("mysql", cmd)
        }
        other => {
            return ExecOutcome::failure(format!("Unsupported database type: {other}"), -1);
        }
    };

    if !binary_available(client) {
        tracing::warn!(client, "database client not installed; simulating execution");
        return ExecOutcome::simulated(format!("[simulated {db_type}:{host}] {query}"));
    }

    let started = Instant::now();
    match run_with_timeout(cmd, timeout, client).await {
        Ok(output) => {
            let exit_code = output.status.code().unwrap_or(-1);
            ExecOutcome {
                success: output.status.success(),
                output: String::from_utf8_lossy(&output.stdout).into_owned(),
                error: String::from_utf8_lossy(&output.stderr).into_owned(),
                exit_code,
                duration_ms: started.elapsed().as_millis() as u64,
                ..ExecOutcome::default()
            }
        }
        Err(SubprocessError::Timeout { .. }) => ExecOutcome::connection_failure(format!(
            "Database query timed out after {} seconds",
            timeout.as_secs()
        )),
        Err(error) => ExecOutcome::connection_failure(error.to_string()),
    }
}
