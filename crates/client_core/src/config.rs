use std::{collections::HashMap, fs, time::Duration};

/// Client-side configuration surface: where the scheduler lives and how
/// often the backstop poll fires. Everything else about the service is
/// server-owned.
#[derive(Debug, Clone)]
pub struct Settings {
    pub base_url: String,
    pub poll_interval: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".into(),
            poll_interval: Duration::from_secs(5),
        }
    }
}

/// Defaults, overlaid by `jobdeck.toml` in the working directory, overlaid
/// by environment variables. Unparseable values fall through to the
/// previous layer.
pub fn load_settings() -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string("jobdeck.toml") {
        apply_file_overrides(&mut settings, &raw);
    }

    if let Ok(v) = std::env::var("JOBDECK_BASE_URL") {
        settings.base_url = v;
    }
    if let Ok(v) = std::env::var("JOBDECK_POLL_INTERVAL_SECS") {
        if let Ok(secs) = v.parse::<u64>() {
            settings.poll_interval = Duration::from_secs(secs);
        }
    }

    settings.base_url = settings.base_url.trim_end_matches('/').to_string();
    settings
}

fn apply_file_overrides(settings: &mut Settings, raw: &str) {
    if let Ok(file_cfg) = toml::from_str::<HashMap<String, String>>(raw) {
        if let Some(v) = file_cfg.get("base_url") {
            settings.base_url = v.clone();
        }
        if let Some(v) = file_cfg.get("poll_interval_secs") {
            if let Ok(secs) = v.parse::<u64>() {
                settings.poll_interval = Duration::from_secs(secs);
            }
        }
    }
}
