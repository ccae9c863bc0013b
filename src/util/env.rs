//! Environment helpers: centralized dotenv loading and ergonomic getters.
//! Call `init_env()` once early in each binary (or rely on lazy Once).
use std::str::FromStr;
use std::sync::Once;
use tracing::info;

static INIT: Once = Once::new();

/// Load .env exactly once. Safe to call many times.
pub fn init_env() {
    INIT.call_once(|| {
        if dotenv::dotenv().is_ok() {
            return;
        }
        // Fallback to Cargo project root
        let candidate = format!("{}/.env", env!("CARGO_MANIFEST_DIR"));
        let _ = dotenv::from_filename(candidate);
    });
}

/// Common bootstrap for the CLI binary: load dotenv and note which bin started.
pub fn bootstrap_cli(bin_name: &str) {
    init_env();
    info!(target = "bootstrap", bin = bin_name, "environment loaded");
}

/// Get optional env var (None if unset or empty).
pub fn env_opt(key: &str) -> Option<String> {
    init_env();
    match std::env::var(key) {
        Ok(v) if !v.trim().is_empty() => Some(v),
        _ => None,
    }
}

/// Get parsed value with default fallback.
pub fn env_parse<T>(key: &str, default: T) -> T
where
    T: FromStr + Clone,
{
    init_env();
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse::<T>().unwrap_or(default),
        Err(_) => default,
    }
}

/// Boolean flag; accepts 1/true/on/yes (case-insensitive) as true and
/// 0/false/off/no as false. Anything else keeps the default.
pub fn env_flag(key: &str, default: bool) -> bool {
    init_env();
    match std::env::var(key) {
        Ok(raw) => parse_flag(&raw).unwrap_or(default),
        Err(_) => default,
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Some(true),
        "0" | "false" | "off" | "no" => Some(false),
        _ => None,
    }
}

/// Strip credentials from URL-shaped values before they reach the logs.
pub fn redact_value(key: &str, val: &str) -> String {
    let k = key.to_ascii_uppercase();
    if k.contains("PASSWORD") || k.contains("SECRET") || k.contains("TOKEN") {
        return "***".to_string();
    }
    let val_trim = val.trim();
    if let Ok(mut u) = url::Url::parse(val_trim) {
        if !u.username().is_empty() || u.password().is_some() {
            let _ = u.set_username("***");
            let _ = u.set_password(Some("***"));
            return u.to_string();
        }
    }
    val_trim.to_string()
}

/// Log a consolidated, redacted snapshot of the resolved configuration.
pub fn log_snapshot(title: &str, entries: &[(&str, String)]) {
    let snapshot: Vec<(String, String)> = entries
        .iter()
        .map(|(k, v)| (k.to_string(), redact_value(k, v)))
        .collect();
    info!(target = "preflight", title, snapshot = ?snapshot, "configuration snapshot");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_flag_accepts_common_spellings() {
        assert_eq!(parse_flag("YES"), Some(true));
        assert_eq!(parse_flag(" on "), Some(true));
        assert_eq!(parse_flag("0"), Some(false));
        assert_eq!(parse_flag("Off"), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }

    #[test]
    fn redact_value_masks_url_credentials() {
        let out = redact_value("BRICK_BASE_URL", "https://user:pw@cdn.example.com/downloads");
        assert!(!out.contains("pw"));
        assert!(out.contains("cdn.example.com"));
        assert_eq!(
            redact_value("BRICK_BASE_URL", "https://cdn.example.com/x"),
            "https://cdn.example.com/x"
        );
        assert_eq!(redact_value("API_TOKEN", "abc"), "***");
    }
}
