use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use toml::Value;
use tripxl_core::config::{AppConfig, LoadOptions, DEFAULT_CONFIG_FILE};

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let entries = [
        entry("database.url", config.database.url.clone(), &["TRIPXL_DATABASE_URL"]),
        entry(
            "database.max_connections",
            config.database.max_connections.to_string(),
            &["TRIPXL_DATABASE_MAX_CONNECTIONS"],
        ),
        entry(
            "database.timeout_secs",
            config.database.timeout_secs.to_string(),
            &["TRIPXL_DATABASE_TIMEOUT_SECS"],
        ),
        entry(
            "server.bind_address",
            config.server.bind_address.clone(),
            &["TRIPXL_SERVER_BIND_ADDRESS"],
        ),
        entry("server.port", config.server.port.to_string(), &["TRIPXL_SERVER_PORT"]),
        entry(
            "server.graceful_shutdown_secs",
            config.server.graceful_shutdown_secs.to_string(),
            &["TRIPXL_SERVER_GRACEFUL_SHUTDOWN_SECS"],
        ),
        entry("maps.base_url", config.maps.base_url.clone(), &["TRIPXL_MAPS_BASE_URL"]),
        entry(
            "maps.api_key",
            redact_secret(config.maps.api_key.as_ref()),
            &["TRIPXL_MAPS_API_KEY"],
        ),
        entry(
            "maps.timeout_secs",
            config.maps.timeout_secs.to_string(),
            &["TRIPXL_MAPS_TIMEOUT_SECS"],
        ),
        entry("weather.enabled", config.weather.enabled.to_string(), &["TRIPXL_WEATHER_ENABLED"]),
        entry("weather.base_url", config.weather.base_url.clone(), &["TRIPXL_WEATHER_BASE_URL"]),
        entry(
            "weather.api_key",
            redact_secret(config.weather.api_key.as_ref()),
            &["TRIPXL_WEATHER_API_KEY"],
        ),
        entry(
            "weather.timeout_secs",
            config.weather.timeout_secs.to_string(),
            &["TRIPXL_WEATHER_TIMEOUT_SECS"],
        ),
        entry("fuel.source_url", config.fuel.source_url.clone(), &["TRIPXL_FUEL_SOURCE_URL"]),
        entry("fuel.publish_url", config.fuel.publish_url.clone(), &["TRIPXL_FUEL_PUBLISH_URL"]),
        entry(
            "fuel.timeout_secs",
            config.fuel.timeout_secs.to_string(),
            &["TRIPXL_FUEL_TIMEOUT_SECS"],
        ),
        entry(
            "logging.level",
            config.logging.level.clone(),
            &["TRIPXL_LOGGING_LEVEL", "TRIPXL_LOG_LEVEL"],
        ),
        entry(
            "logging.format",
            format!("{:?}", config.logging.format).to_ascii_lowercase(),
            &["TRIPXL_LOGGING_FORMAT", "TRIPXL_LOG_FORMAT"],
        ),
    ];

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for (key, value, env_keys) in entries {
        let source =
            field_source(key, env_keys, config_file_doc.as_ref(), config_file_path.as_deref());
        lines.push(render_line(key, &value, source));
    }
    lines.join("\n")
}

type ConfigEntry = (&'static str, String, &'static [&'static str]);

fn entry(key: &'static str, value: String, env_keys: &'static [&'static str]) -> ConfigEntry {
    (key, value, env_keys)
}

fn detect_config_path() -> Option<PathBuf> {
    [PathBuf::from(DEFAULT_CONFIG_FILE), PathBuf::from("config").join(DEFAULT_CONFIG_FILE)]
        .into_iter()
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

/// Keeps the last four characters of long keys so operators can tell keys apart.
fn redact_secret(secret: Option<&SecretString>) -> String {
    let Some(secret) = secret else {
        return "<unset>".to_string();
    };
    let trimmed = secret.expose_secret().trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    let chars: Vec<char> = trimmed.chars().collect();
    if chars.len() <= 8 {
        return "<redacted>".to_string();
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("***{tail}")
}

#[cfg(test)]
mod tests {
    use secrecy::SecretString;

    use super::{contains_path, redact_secret};

    #[test]
    fn secrets_are_redacted_to_a_short_tail() {
        let key = SecretString::from("AIzaSyD-example-key-1234".to_string());
        assert_eq!(redact_secret(Some(&key)), "***1234");
        assert_eq!(redact_secret(Some(&SecretString::from("short".to_string()))), "<redacted>");
        assert_eq!(redact_secret(None), "<unset>");
    }

    #[test]
    fn dotted_paths_resolve_in_toml_documents() {
        let doc: toml::Value = "[maps]\nbase_url = \"http://localhost\"\n".parse().expect("toml");
        assert!(contains_path(&doc, "maps.base_url"));
        assert!(!contains_path(&doc, "maps.api_key"));
    }
}
