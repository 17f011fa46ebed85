use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub dims: Option<usize>,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// API endpoint root, without the `/v1/...` path.
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "disabled".to_string(),
            model: None,
            dims: None,
            max_retries: 5,
            timeout_secs: 30,
            base_url: default_base_url(),
        }
    }
}

fn default_provider() -> String {
    "disabled".to_string()
}
fn default_max_retries() -> u32 {
    5
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_base_url() -> String {
    "https://api.openai.com".to_string()
}

impl EmbeddingConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct GenerationConfig {
    #[serde(default = "default_generation_model")]
    pub model: String,
    #[serde(default = "default_generation_retries")]
    pub max_retries: u32,
    #[serde(default = "default_generation_timeout")]
    pub timeout_secs: u64,
    /// API endpoint root, without the `/v1/...` path.
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            model: default_generation_model(),
            max_retries: default_generation_retries(),
            timeout_secs: default_generation_timeout(),
            base_url: default_base_url(),
        }
    }
}

fn default_generation_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_generation_retries() -> u32 {
    3
}
fn default_generation_timeout() -> u64 {
    60
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    /// Number of text units retrieved per question. A tunable, not a
    /// contract; small values keep the generation prompt focused.
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
        }
    }
}

fn default_top_k() -> usize {
    4
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub bind: String,
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if config.retrieval.top_k < 1 {
        anyhow::bail!("retrieval.top_k must be >= 1");
    }

    if config.embedding.is_enabled() {
        if config.embedding.dims.is_none() || config.embedding.dims == Some(0) {
            anyhow::bail!(
                "embedding.dims must be > 0 when provider is '{}'",
                config.embedding.provider
            );
        }
        if config.embedding.model.is_none() {
            anyhow::bail!(
                "embedding.model must be specified when provider is '{}'",
                config.embedding.provider
            );
        }
    }

    match config.embedding.provider.as_str() {
        "disabled" | "openai" => {}
        other => anyhow::bail!(
            "Unknown embedding provider: '{}'. Must be disabled or openai.",
            other
        ),
    }

    if config.generation.model.trim().is_empty() {
        anyhow::bail!("generation.model must not be empty");
    }

    if config.embedding.base_url.trim().is_empty() || config.generation.base_url.trim().is_empty() {
        anyhow::bail!("base_url must not be empty");
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(content: &str) -> (tempfile::TempDir, PathBuf) {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("knowbot.toml");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(content.as_bytes()).unwrap();
        (tmp, path)
    }

    const MINIMAL: &str = r#"
[db]
path = "data/knowbot.sqlite"

[server]
bind = "127.0.0.1:7450"
"#;

    #[test]
    fn minimal_config_gets_defaults() {
        let (_tmp, path) = write_config(MINIMAL);
        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.embedding.provider, "disabled");
        assert!(!cfg.embedding.is_enabled());
        assert_eq!(cfg.retrieval.top_k, 4);
        assert_eq!(cfg.generation.model, "gpt-4o-mini");
        assert_eq!(cfg.embedding.base_url, "https://api.openai.com");
        assert_eq!(cfg.generation.base_url, "https://api.openai.com");
    }

    #[test]
    fn base_url_overridable() {
        let (_tmp, path) = write_config(&format!(
            "{}\n[generation]\nbase_url = \"http://127.0.0.1:9999\"\n",
            MINIMAL
        ));
        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.generation.base_url, "http://127.0.0.1:9999");
    }

    #[test]
    fn zero_top_k_rejected() {
        let (_tmp, path) = write_config(&format!("{}\n[retrieval]\ntop_k = 0\n", MINIMAL));
        assert!(load_config(&path).is_err());
    }

    #[test]
    fn unknown_provider_rejected() {
        let (_tmp, path) = write_config(&format!(
            "{}\n[embedding]\nprovider = \"mystery\"\nmodel = \"m\"\ndims = 8\n",
            MINIMAL
        ));
        assert!(load_config(&path).is_err());
    }

    #[test]
    fn enabled_provider_requires_model_and_dims() {
        let (_tmp, path) = write_config(&format!("{}\n[embedding]\nprovider = \"openai\"\n", MINIMAL));
        assert!(load_config(&path).is_err());
    }
}
