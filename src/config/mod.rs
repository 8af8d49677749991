use std::{
    collections::HashMap,
    env,
    fs,
    io::{BufRead, BufReader},
    net::IpAddr,
    path::PathBuf,
    time::Duration,
};

use directories::BaseDirs;

/// Operating mode for the row processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Production,
    Mock,
}

/// Which deterministic result mock mode produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockPolicy {
    /// Index-tagged marker per row.
    Placeholder,
    /// Keyword classification of each row's "major" field.
    Classifier,
}

#[derive(Debug, Clone)]
pub struct Config {
    inner: HashMap<String, String>,
    pub config_path: PathBuf,
}

impl Config {
    pub fn load() -> Self {
        Self::load_from(default_config_path())
    }

    fn load_from(config_path: PathBuf) -> Self {
        let mut map = default_map();

        // Read colgen.conf if exists
        if config_path.exists() {
            if let Ok(file) = fs::File::open(&config_path) {
                let reader = BufReader::new(file);
                for line in reader.lines().flatten() {
                    let line = line.trim();
                    if line.is_empty() || line.starts_with('#') {
                        continue;
                    }
                    if let Some((k, v)) = line.split_once('=') {
                        map.insert(k.trim().to_string(), v.trim().to_string());
                    }
                }
            }
        }

        // Overlay environment variables (take precedence)
        for (k, v) in env::vars() {
            if is_config_key(&k) {
                map.insert(k, v);
            }
        }

        Self { inner: map, config_path }
    }

    /// Build a config from explicit key/value pairs, skipping the rc file
    /// and the environment. Defaults still apply for absent keys.
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut map = default_map();
        map.extend(pairs);
        Self { inner: map, config_path: default_config_path() }
    }

    /// Replace one key, consuming the config. Used for startup-time CLI
    /// overrides before any component reads the value.
    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.inner.insert(key.to_string(), value.to_string());
        self
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.inner.get(key).cloned()
    }

    pub fn api_key(&self) -> Option<String> {
        self.get("OPENAI_API_KEY").filter(|v| !v.is_empty())
    }

    pub fn base_url(&self) -> String {
        let raw = self.get("API_BASE_URL").unwrap_or_else(|| "default".into());
        let base = if raw == "default" {
            "https://api.openai.com/v1".to_string()
        } else {
            raw
        };
        let trimmed = base.trim_end_matches('/');
        if !trimmed.ends_with("/v1") && !trimmed.contains("/v1/") {
            format!("{}/v1", trimmed)
        } else {
            trimmed.to_string()
        }
    }

    pub fn model(&self) -> String {
        self.get("DEFAULT_MODEL").unwrap_or_else(|| "gpt-4o".into())
    }

    pub fn request_timeout(&self) -> Duration {
        let secs = self
            .get("REQUEST_TIMEOUT")
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(60);
        Duration::from_secs(secs)
    }

    pub fn mode(&self) -> Mode {
        match self.get("COLGEN_MODE").as_deref() {
            Some("mock") => Mode::Mock,
            _ => Mode::Production,
        }
    }

    pub fn mock_policy(&self) -> MockPolicy {
        match self.get("COLGEN_MOCK_POLICY").as_deref() {
            Some("classifier") => MockPolicy::Classifier,
            _ => MockPolicy::Placeholder,
        }
    }

    pub fn allowed_origins(&self) -> Vec<String> {
        self.get("COLGEN_ALLOWED_ORIGINS")
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }

    pub fn max_rows(&self) -> usize {
        self.get("COLGEN_MAX_ROWS")
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(1000)
    }

    pub fn bind_host(&self) -> IpAddr {
        self.get("COLGEN_HOST")
            .and_then(|v| v.parse::<IpAddr>().ok())
            .unwrap_or(IpAddr::from([127, 0, 0, 1]))
    }

    pub fn bind_port(&self) -> u16 {
        self.get("COLGEN_PORT")
            .and_then(|v| v.parse::<u16>().ok())
            .unwrap_or(8000)
    }
}

fn is_config_key(k: &str) -> bool {
    // Accept known keys or COLGEN_*/OPENAI_* for forward-compat
    const KEYS: &[&str] = &[
        "OPENAI_API_KEY",
        "API_BASE_URL",
        "DEFAULT_MODEL",
        "REQUEST_TIMEOUT",
    ];

    KEYS.contains(&k) || k.starts_with("COLGEN_") || k.starts_with("OPENAI_")
}

fn default_config_path() -> PathBuf {
    let base = BaseDirs::new()
        .map(|b| b.config_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("~/.config"));
    base.join("colgen").join("colgen.conf")
}

fn default_map() -> HashMap<String, String> {
    let mut m = HashMap::new();

    m.insert("API_BASE_URL".into(), "default".into());
    m.insert("DEFAULT_MODEL".into(), "gpt-4o".into());
    m.insert("REQUEST_TIMEOUT".into(), "60".into());

    m.insert("COLGEN_MODE".into(), "production".into());
    m.insert("COLGEN_MOCK_POLICY".into(), "placeholder".into());
    m.insert("COLGEN_ALLOWED_ORIGINS".into(), "http://localhost:3000".into());
    m.insert("COLGEN_MAX_ROWS".into(), "1000".into());
    m.insert("COLGEN_HOST".into(), "127.0.0.1".into());
    m.insert("COLGEN_PORT".into(), "8000".into());

    m
}
