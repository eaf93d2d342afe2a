// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shell selection and quoting for command execution.

/// Escape a string for safe use inside shell single-quoted contexts.
///
/// Single quotes in the value are replaced with `'\''` (end quote, escaped
/// literal quote, start quote), the standard bash idiom for embedding a
/// single quote inside a single-quoted string.
pub fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "'\\''"))
}

/// Build the remote command string for a given shell preference.
///
/// Windows shells run under PowerShell; POSIX shells get a login shell
/// (`-lc`); anything else falls back to `-c`. No shell means the raw
/// command.
pub fn remote_command(command: &str, shell: Option<&str>) -> String {
    let Some(shell) = shell.map(str::trim).filter(|s| !s.is_empty()) else {
        return command.to_string();
    };
    let lower = shell.to_ascii_lowercase();
    if lower.starts_with("power") {
        format!("powershell -Command {}", shell_quote(command))
    } else if matches!(lower.as_str(), "bash" | "sh" | "zsh" | "ksh") {
        format!("{lower} -lc {}", shell_quote(command))
    } else {
        format!("{shell} -c {}", shell_quote(command))
    }
}

/// Program + argv for running a command on the local host.
pub fn local_invocation(command: &str, shell: Option<&str>) -> (String, Vec<String>) {
    let shell = shell.map(str::trim).filter(|s| !s.is_empty()).unwrap_or("bash");
    let lower = shell.to_ascii_lowercase();
    if lower.starts_with("power") {
        ("powershell".to_string(), vec!["-Command".to_string(), command.to_string()])
    } else if matches!(lower.as_str(), "bash" | "sh" | "zsh" | "ksh") {
        (lower, vec!["-lc".to_string(), command.to_string()])
    } else {
        (shell.to_string(), vec!["-c".to_string(), command.to_string()])
    }
}

#[cfg(test)]
#[path = "shell_tests.rs"]
mod tests;
