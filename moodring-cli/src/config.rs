use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::state::ensure_moodring_home;

pub const PLACEHOLDER_API_KEY: &str = "your_api_key_here";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

pub const ENV_API_KEY: &str = "MOODRING_OPENAI_API_KEY";
pub const ENV_BASE_URL: &str = "MOODRING_OPENAI_BASE_URL";
pub const ENV_MODEL: &str = "MOODRING_OPENAI_MODEL";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub pipeline: PipelineSection,
    pub notify: NotifySection,
    pub openai: OpenAiSection,
    pub voice: VoiceSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSection {
    /// IANA zone used for record dates and display times.
    pub timezone: String,
    pub stats_tick_secs: u64,
    pub mock_seed: Option<u64>,
}

/// Longest stats refresh period accepted from the file.
pub const MAX_STATS_TICK_SECS: u64 = 86_400;

impl PipelineSection {
    pub fn clamped(mut self) -> Self {
        self.stats_tick_secs = self.stats_tick_secs.clamp(1, MAX_STATS_TICK_SECS);
        self
    }

    pub fn stats_tick(&self) -> chrono::Duration {
        let secs = self.stats_tick_secs.clamp(1, MAX_STATS_TICK_SECS);
        chrono::Duration::seconds(i64::try_from(secs).unwrap_or(MAX_STATS_TICK_SECS as i64))
    }
}

impl Default for PipelineSection {
    fn default() -> Self {
        Self {
            timezone: "UTC".to_string(),
            stats_tick_secs: 60,
            mock_seed: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifySection {
    /// false behaves like a denied system notification permission.
    pub desktop: bool,
}

impl Default for NotifySection {
    fn default() -> Self {
        Self { desktop: true }
    }
}

/// Chat-completion settings as written in the file. Unset strings fall back
/// to the environment, then to built-in defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAiSection {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub temperature: f64,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

impl Default for OpenAiSection {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: None,
            model: None,
            temperature: 0.7,
            max_tokens: 500,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u32,
    pub timeout: Duration,
}

impl OpenAiSection {
    pub fn resolve(&self) -> OpenAiConfig {
        self.resolve_with(|k| std::env::var(k).ok())
    }

    /// Per field: file value, then `env(name)`, then default. Blank values count as unset.
    pub fn resolve_with(&self, env: impl Fn(&str) -> Option<String>) -> OpenAiConfig {
        let pick = |file: &Option<String>, var: &str, default: &str| {
            file.clone()
                .filter(|s| !s.trim().is_empty())
                .or_else(|| env(var).filter(|s| !s.trim().is_empty()))
                .unwrap_or_else(|| default.to_string())
        };
        let cfg = OpenAiConfig {
            api_key: pick(&self.api_key, ENV_API_KEY, PLACEHOLDER_API_KEY),
            base_url: pick(&self.base_url, ENV_BASE_URL, DEFAULT_BASE_URL),
            model: pick(&self.model, ENV_MODEL, DEFAULT_MODEL),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            timeout: Duration::from_secs(self.timeout_secs.max(1)),
        };
        if cfg.api_key == PLACEHOLDER_API_KEY {
            tracing::warn!("using placeholder API key; set openai.api_key or {ENV_API_KEY}");
        }
        cfg
    }
}

impl OpenAiConfig {
    pub fn validate(&self) -> Result<()> {
        if self.api_key.trim().is_empty() || self.api_key == PLACEHOLDER_API_KEY {
            bail!("API key is missing; set openai.api_key or {ENV_API_KEY}");
        }
        let url = reqwest::Url::parse(&self.base_url).with_context(|| format!("invalid base URL: {}", self.base_url))?;
        if !matches!(url.scheme(), "http" | "https") {
            bail!("base URL must be http or https: {}", self.base_url);
        }
        if self.model.trim().is_empty() {
            bail!("model name is required");
        }
        Ok(())
    }

    pub fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceSection {
    pub voice_input_enabled: bool,
    pub voice_output_enabled: bool,
    pub auto_send: bool,
    pub speech: SpeechSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechSettings {
    pub rate: f32,
    pub pitch: f32,
    pub volume: f32,
    pub voice: Option<String>,
}

impl Default for SpeechSettings {
    fn default() -> Self {
        Self {
            rate: 1.0,
            pitch: 1.0,
            volume: 1.0,
            voice: None,
        }
    }
}

impl SpeechSettings {
    pub fn clamped(mut self) -> Self {
        self.rate = self.rate.clamp(0.1, 10.0);
        self.pitch = self.pitch.clamp(0.0, 2.0);
        self.volume = self.volume.clamp(0.0, 1.0);
        self
    }
}

impl Config {
    pub fn from_toml(s: &str) -> Result<Self> {
        let mut cfg: Config = toml::from_str(s).context("parse config.toml")?;
        cfg.voice.speech = cfg.voice.speech.clamped();
        cfg.pipeline = cfg.pipeline.clamped();
        Ok(cfg)
    }

    /// Copy suitable for printing: the API key is masked.
    pub fn redacted(&self) -> Self {
        let mut out = self.clone();
        out.openai.api_key = out.openai.api_key.as_deref().map(mask_secret);
        out
    }
}

pub fn mask_secret(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    if chars.len() <= 8 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}...{tail}")
}

pub fn config_path() -> Result<PathBuf> {
    Ok(ensure_moodring_home()?.join("config.toml"))
}

pub fn load_config() -> Result<Config> {
    load_config_from(&config_path()?)
}

pub fn load_config_from(p: &Path) -> Result<Config> {
    if !p.exists() {
        return Ok(Config::default());
    }
    let s = fs::read_to_string(p).with_context(|| format!("read {}", p.display()))?;
    Config::from_toml(&s)
}

pub fn save_config_to(cfg: &Config, p: &Path) -> Result<()> {
    let s = toml::to_string_pretty(cfg).context("serialize config")?;
    fs::write(p, s).with_context(|| format!("write {}", p.display()))?;
    Ok(())
}

pub fn init_config() -> Result<()> {
    let p = config_path()?;
    if p.exists() {
        println!("Config already exists: {}", p.display());
        return Ok(());
    }
    save_config_to(&Config::default(), &p)?;
    println!("Wrote {}", p.display());
    Ok(())
}

pub fn show_config() -> Result<()> {
    let p = config_path()?;
    let cfg = load_config_from(&p)?;
    let resolved = cfg.openai.resolve();
    println!("# {}", p.display());
    println!("{}", toml::to_string_pretty(&cfg.redacted()).context("serialize config")?);
    println!("# effective chat settings");
    println!("api_key = {}", mask_secret(&resolved.api_key));
    println!("base_url = {}", resolved.base_url);
    println!("model = {}", resolved.model);
    Ok(())
}
