use log::warn;
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use strum::{Display, EnumString};

/// Parse the contents of a `.env` file into key/value pairs.
/// Handles values with spaces without requiring quotes.
pub fn parse_dotenv(content: &str) -> HashMap<String, String> {
    let mut vars = HashMap::new();

    for line in content.lines() {
        let line = line.trim();

        // Skip empty lines and comments
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let line = line.strip_prefix("export ").unwrap_or(line);

        if let Some((key, value)) = line.split_once('=') {
            let mut value = value.trim();

            // Remove surrounding quotes if present
            if value.len() >= 2
                && ((value.starts_with('"') && value.ends_with('"'))
                    || (value.starts_with('\'') && value.ends_with('\'')))
            {
                value = &value[1..value.len() - 1];
            }

            vars.insert(key.trim().to_string(), value.to_string());
        }
    }

    vars
}

/// Read `.env` from the working directory, if there is one.
pub fn load_dotenv() -> HashMap<String, String> {
    let env_path = Path::new(".env");
    match fs::read_to_string(env_path) {
        Ok(content) => parse_dotenv(&content),
        Err(_) => HashMap::new(),
    }
}

/// Which status source drives the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum SourceKind {
    Database,
    Api,
}

/// Which output driver backs the pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum DriverKind {
    Gpio,
    Simulated,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub output: OutputConfig,
    pub source: SourceKind,
    pub device_id: String,
    pub mongo: MongoConfig,
    pub api: ApiConfig,
    pub poll_interval: Duration,
}

#[derive(Debug, Clone)]
pub struct OutputConfig {
    /// BCM pin number
    pub pin: u8,
    pub driver: DriverKind,
}

#[derive(Clone)]
pub struct MongoConfig {
    /// Connection string. Carries credentials, so it has no default.
    pub uri: Option<String>,
    pub database: String,
    pub collection: String,
}

impl fmt::Debug for MongoConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MongoConfig")
            .field("uri", &self.uri.as_ref().map(|_| "<redacted>"))
            .field("database", &self.database)
            .field("collection", &self.collection)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub url: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output: OutputConfig {
                pin: 17,
                driver: DriverKind::Gpio,
            },
            source: SourceKind::Database,
            device_id: "raspberry_pi_1".to_string(),
            mongo: MongoConfig {
                uri: None,
                database: "iot_db".to_string(),
                collection: "led_status".to_string(),
            },
            api: ApiConfig {
                url: "http://localhost:8080/status".to_string(),
            },
            poll_interval: Duration::from_secs(2),
        }
    }
}

impl Config {
    /// Load configuration from the process environment, falling back to `.env`.
    pub fn from_env() -> Self {
        Self::from_lookup(layered(|key| std::env::var(key).ok(), load_dotenv()))
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(pin) = parse_var(&lookup, "LED_PIN") {
            config.output.pin = pin;
        }
        if let Some(driver) = parse_var(&lookup, "OUTPUT_DRIVER") {
            config.output.driver = driver;
        }

        if let Some(flag) = lookup("USE_DIRECT_MONGO") {
            config.source = if flag.trim().eq_ignore_ascii_case("true") {
                SourceKind::Database
            } else {
                SourceKind::Api
            };
        }
        if let Some(source) = parse_var(&lookup, "STATUS_SOURCE") {
            config.source = source;
        }

        if let Some(id) = lookup("DEVICE_ID") {
            config.device_id = id;
        }

        // Database configuration
        if let Some(uri) = lookup("MONGO_URI").filter(|uri| !uri.trim().is_empty()) {
            config.mongo.uri = Some(uri);
        }
        if let Some(database) = lookup("MONGO_DATABASE") {
            config.mongo.database = database;
        }
        if let Some(collection) = lookup("MONGO_COLLECTION") {
            config.mongo.collection = collection;
        }

        if let Some(url) = lookup("API_URL") {
            config.api.url = url;
        }

        if let Some(secs) = parse_var::<f64, _>(&lookup, "CHECK_INTERVAL") {
            match Duration::try_from_secs_f64(secs) {
                Ok(interval) if !interval.is_zero() => config.poll_interval = interval,
                _ => warn!(
                    "Ignoring CHECK_INTERVAL={}: must be a positive number of seconds",
                    secs
                ),
            }
        }

        config
    }
}

/// Look keys up in `env` first, then in the `.env` values.
///
/// The file values are only read, never exported, so the process
/// environment is left as it was.
pub fn layered<E>(env: E, dotenv: HashMap<String, String>) -> impl Fn(&str) -> Option<String>
where
    E: Fn(&str) -> Option<String>,
{
    move |key| env(key).or_else(|| dotenv.get(key).cloned())
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("Ignoring invalid value for {}: {:?}", key, raw);
            None
        }
    }
}
