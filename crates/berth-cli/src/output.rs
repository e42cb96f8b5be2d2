//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)

use chrono::Utc;
use serde::Serialize;

use berth_core::{
    CVarValue, FavoriteServer, InstalledEngineVersion, InstalledServerContent, LoginInfo,
};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// One row of `berth vars`
#[derive(Debug, Clone, Serialize)]
pub struct VarRow {
    pub name: &'static str,
    pub kind: String,
    pub value: CVarValue,
    pub default: CVarValue,
}

/// A login as shown to the user; the token secret is never printed
#[derive(Debug, Clone, Serialize)]
pub struct LoginRow {
    pub user_id: String,
    pub username: String,
    pub server: Option<String>,
    pub expires: String,
    pub expired: bool,
    pub selected: bool,
}

impl LoginRow {
    pub fn new(login: &LoginInfo, selected: bool) -> Self {
        Self {
            user_id: login.user_id.to_string(),
            username: login.username.clone(),
            server: login.server.clone(),
            expires: login.token.expire_time.to_rfc3339(),
            expired: login.token.is_expired(Utc::now()),
            selected,
        }
    }
}

/// Output helper for consistent formatting
pub struct Output {
    /// The output format
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Check if output is in quiet mode
    pub fn is_quiet(&self) -> bool {
        matches!(self.format, OutputFormat::Quiet)
    }

    /// Print all variables with their current values
    pub fn print_vars(&self, vars: &[VarRow]) {
        match self.format {
            OutputFormat::Human => {
                for var in vars {
                    let marker = if var.value == var.default { " " } else { "*" };
                    println!(
                        "{}{:<32} {:<6} {}",
                        marker,
                        var.name,
                        var.kind,
                        display_value(&var.value)
                    );
                }
                println!("\n{} variable(s), * = changed from default", vars.len());
            }
            OutputFormat::Json => print_json(vars),
            OutputFormat::Quiet => {
                for var in vars {
                    println!("{}={}", var.name, var.value);
                }
            }
        }
    }

    /// Print a single variable value
    pub fn print_value(&self, name: &str, value: &CVarValue) {
        match self.format {
            OutputFormat::Human | OutputFormat::Quiet => println!("{}", value),
            OutputFormat::Json => {
                println!("{}", serde_json::json!({ "name": name, "value": value }));
            }
        }
    }

    /// Print favorite servers
    pub fn print_favorites<'a>(&self, favorites: impl Iterator<Item = &'a FavoriteServer>) {
        let favorites: Vec<_> = favorites.collect();
        match self.format {
            OutputFormat::Human => {
                if favorites.is_empty() {
                    println!("No favorite servers.");
                    return;
                }
                for fav in &favorites {
                    println!(
                        "{:<40} {}",
                        truncate(&fav.address, 40),
                        fav.name.as_deref().unwrap_or("")
                    );
                }
                println!("\n{} favorite(s)", favorites.len());
            }
            OutputFormat::Json => print_json(&favorites),
            OutputFormat::Quiet => {
                for fav in &favorites {
                    println!("{}", fav.address);
                }
            }
        }
    }

    /// Print stored logins
    pub fn print_logins(&self, logins: &[LoginRow]) {
        match self.format {
            OutputFormat::Human => {
                if logins.is_empty() {
                    println!("No logins.");
                    return;
                }
                for login in logins {
                    let marker = if login.selected { "*" } else { " " };
                    let status = if login.expired { " (expired)" } else { "" };
                    println!(
                        "{}{} | {}{}{}",
                        marker,
                        login.user_id,
                        login.username,
                        login
                            .server
                            .as_deref()
                            .map(|s| format!(" @ {}", s))
                            .unwrap_or_default(),
                        status
                    );
                }
                println!("\n{} login(s), * = selected", logins.len());
            }
            OutputFormat::Json => print_json(logins),
            OutputFormat::Quiet => {
                for login in logins {
                    println!("{}", login.user_id);
                }
            }
        }
    }

    /// Print installed server content
    pub fn print_server_content<'a>(
        &self,
        content: impl Iterator<Item = &'a InstalledServerContent>,
    ) {
        let content: Vec<_> = content.collect();
        match self.format {
            OutputFormat::Human => {
                if content.is_empty() {
                    println!("No server content installed.");
                    return;
                }
                for c in &content {
                    println!(
                        "{:<24} {} (engine {}, disk {})",
                        truncate(&c.fork_id, 24),
                        truncate(&c.current_version, 20),
                        c.current_engine_version,
                        c.disk_id
                    );
                }
                println!("\n{} installation(s)", content.len());
            }
            OutputFormat::Json => print_json(&content),
            OutputFormat::Quiet => {
                for c in &content {
                    println!("{}", c.fork_id);
                }
            }
        }
    }

    /// Print installed engine versions
    pub fn print_engines<'a>(&self, engines: impl Iterator<Item = &'a InstalledEngineVersion>) {
        let engines: Vec<_> = engines.collect();
        match self.format {
            OutputFormat::Human => {
                if engines.is_empty() {
                    println!("No engine versions installed.");
                    return;
                }
                for e in &engines {
                    println!("{:<16} {}", e.version, truncate(&e.signature, 16));
                }
                println!("\n{} engine version(s)", engines.len());
            }
            OutputFormat::Json => print_json(&engines),
            OutputFormat::Quiet => {
                for e in &engines {
                    println!("{}", e.version);
                }
            }
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "success", "message": message})
                );
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Print an informational message
    pub fn message(&self, msg: &str) {
        match self.format {
            OutputFormat::Human => println!("{}", msg),
            OutputFormat::Json => {
                println!("{}", serde_json::json!({"message": msg}));
            }
            OutputFormat::Quiet => {}
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Failed to serialize output: {}", e),
    }
}

/// Render a value for humans; the zero guid and empty strings show as "(not set)"
fn display_value(value: &CVarValue) -> String {
    let text = value.to_string();
    if text.is_empty() {
        "(not set)".to_string()
    } else {
        text
    }
}

/// Truncate a string to max length, adding "..." if truncated
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len - 3).collect();
        format!("{}...", head)
    }
}
