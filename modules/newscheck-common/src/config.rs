use anyhow::{Context, Result};

/// Secrets and environment-specific values. Everything tunable lives in the
/// TOML `FileConfig`.
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    // AI / LLM
    pub openai_api_key: Option<String>,
    pub openai_base_url: Option<String>,

    // Context retrieval
    pub serper_api_key: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let config = Self {
            openai_api_key: non_empty_env("OPENAI_API_KEY"),
            openai_base_url: non_empty_env("OPENAI_BASE_URL"),
            serper_api_key: non_empty_env("SERPER_API_KEY"),
        };

        config.log_keys();
        config
    }

    /// The agents cannot run without an OpenAI key.
    pub fn require_openai_key(&self) -> Result<&str> {
        self.openai_api_key
            .as_deref()
            .context("OPENAI_API_KEY environment variable is required to run the agents")
    }

    fn log_keys(&self) {
        tracing::info!("Config loaded:");
        tracing::info!("  OPENAI_API_KEY: {}", preview_opt(&self.openai_api_key));
        tracing::info!("  OPENAI_BASE_URL: {}", preview_opt(&self.openai_base_url));
        tracing::info!("  SERPER_API_KEY: {}", preview_opt(&self.serper_api_key));
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn preview(val: &str) -> String {
    let n = val
        .char_indices()
        .nth(5)
        .map(|(i, _)| i)
        .unwrap_or(val.len());
    format!("{}...({} chars)", &val[..n], val.len())
}

fn preview_opt(val: &Option<String>) -> String {
    match val {
        Some(v) if !v.is_empty() => preview(v),
        _ => "<not set>".to_string(),
    }
}
