use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::errors::{ScreenPilotError, ScreenPilotResult};
use crate::executor::safety::Rect;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub agent: AgentSettings,
    #[serde(default)]
    pub screen: ScreenSettings,
    #[serde(default)]
    pub vision: VisionSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSettings {
    #[serde(default)]
    pub dry_run: bool,
    #[serde(default)]
    pub confirm_actions: bool,
    /// Default is to continue past a failed step and report the full record.
    #[serde(default)]
    pub abort_on_failure: bool,
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f32,
    #[serde(default = "default_click_delay_ms")]
    pub click_delay_ms: u64,
    #[serde(default = "default_type_delay_ms")]
    pub type_delay_ms: u64,
    #[serde(default = "default_step_delay_ms")]
    pub step_delay_ms: u64,
    /// When absent the confirmation gate blocks until answered.
    #[serde(default)]
    pub confirmation_timeout_secs: Option<u64>,
    #[serde(default = "default_scroll_amount")]
    pub default_scroll_amount: i32,
    /// Rectangles no action may ever target, dry-run or not.
    #[serde(default)]
    pub safe_zones: Vec<Rect>,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            dry_run: false,
            confirm_actions: false,
            abort_on_failure: false,
            min_confidence: default_min_confidence(),
            click_delay_ms: default_click_delay_ms(),
            type_delay_ms: default_type_delay_ms(),
            step_delay_ms: default_step_delay_ms(),
            confirmation_timeout_secs: None,
            default_scroll_amount: default_scroll_amount(),
            safe_zones: Vec::new(),
        }
    }
}

fn default_min_confidence() -> f32 {
    0.5
}

fn default_click_delay_ms() -> u64 {
    300
}

fn default_type_delay_ms() -> u64 {
    20
}

fn default_step_delay_ms() -> u64 {
    500
}

fn default_scroll_amount() -> i32 {
    3
}

/// Fallback screen dimensions when no live display can be queried.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenSettings {
    #[serde(default = "default_screen_width")]
    pub width: u32,
    #[serde(default = "default_screen_height")]
    pub height: u32,
}

impl Default for ScreenSettings {
    fn default() -> Self {
        Self {
            width: default_screen_width(),
            height: default_screen_height(),
        }
    }
}

fn default_screen_width() -> u32 {
    1920
}

fn default_screen_height() -> u32 {
    1080
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisionSettings {
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Optional key in config.toml; falls back to the SCREENPILOT_API_KEY env var.
    #[serde(default)]
    pub api_key: Option<String>,
}

impl Default for VisionSettings {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            api_key: None,
        }
    }
}

impl VisionSettings {
    /// Missing credentials are a construction-time error: nothing useful
    /// can run without them, so fail immediately instead of at call time.
    pub fn resolve_api_key(&self) -> ScreenPilotResult<String> {
        if let Some(key) = &self.api_key {
            if !key.is_empty() {
                return Ok(key.clone());
            }
        }
        std::env::var("SCREENPILOT_API_KEY").map_err(|_| {
            ScreenPilotError::Config(
                "no API key: set vision.api_key in config.toml or SCREENPILOT_API_KEY".into(),
            )
        })
    }
}

fn default_api_base() -> String {
    "https://api.openai.com/v1/chat/completions".into()
}

fn default_model() -> String {
    "gpt-4o".into()
}

fn default_temperature() -> f64 {
    0.1
}

fn default_max_tokens() -> u32 {
    2000
}

fn resolve_config_path() -> Option<PathBuf> {
    if let Ok(exe) = std::env::current_exe() {
        if let Some(parent) = exe.parent() {
            let candidate = parent.join("config.toml");
            if candidate.exists() {
                tracing::debug!(path = %candidate.display(), "config found next to executable");
                return Some(candidate);
            }
        }
    }

    if let Ok(cwd) = std::env::current_dir() {
        let candidate = cwd.join("config.toml");
        if candidate.exists() {
            tracing::debug!(path = %candidate.display(), "config found in working directory");
            return Some(candidate);
        }
    }

    None
}

/// Loads config.toml from next to the executable or the working directory,
/// falling back to defaults when no file exists.
pub fn load_config() -> ScreenPilotResult<AppConfig> {
    let Some(path) = resolve_config_path() else {
        tracing::info!("no config.toml found, using defaults");
        return Ok(AppConfig::default());
    };
    let content = std::fs::read_to_string(&path)?;
    let config: AppConfig = toml::from_str(&content)?;
    tracing::info!(path = %path.display(), model = %config.vision.model, "config loaded");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let cfg = AppConfig::default();
        assert!(!cfg.agent.dry_run);
        assert!(!cfg.agent.abort_on_failure);
        assert!((cfg.agent.min_confidence - 0.5).abs() < f32::EPSILON);
        assert_eq!(cfg.screen.width, 1920);
        assert!(cfg.agent.safe_zones.is_empty());
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let cfg: AppConfig = toml::from_str(
            r#"
            [agent]
            dry_run = true

            [[agent.safe_zones]]
            x = 0
            y = 0
            width = 100
            height = 40
            "#,
        )
        .unwrap();
        assert!(cfg.agent.dry_run);
        assert_eq!(cfg.agent.safe_zones.len(), 1);
        assert_eq!(cfg.agent.click_delay_ms, 300);
        assert_eq!(cfg.vision.model, "gpt-4o");
    }
}
