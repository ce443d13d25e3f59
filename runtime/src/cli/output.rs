//! Output mode flags shared by every subcommand.
//!
//! `main` exports the global `--json` / `--quiet` flags as environment
//! variables so any module can check them without threading them through.

use serde::Serialize;

pub const JSON_ENV: &str = "ONLINE_WATCH_JSON";
pub const QUIET_ENV: &str = "ONLINE_WATCH_QUIET";

/// Machine-readable output requested.
pub fn is_json() -> bool {
    flag_set(JSON_ENV)
}

/// Human summary suppressed.
pub fn is_quiet() -> bool {
    flag_set(QUIET_ENV)
}

/// Print a value as pretty JSON on stdout.
pub fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{s}"),
        Err(e) => eprintln!("  Error: failed to encode JSON output: {e}"),
    }
}

fn flag_set(name: &str) -> bool {
    std::env::var(name)
        .map(|v| matches!(v.trim(), "1" | "true" | "yes"))
        .unwrap_or(false)
}
