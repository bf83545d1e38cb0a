//! Configuration parsing and management for Saka3D

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{ConfigError, Saka3dError};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub avatar: AvatarConfig,
    pub pose: PoseConfig,
    pub animation: AnimationConfig,
    pub chat: ChatConfig,
    pub http: HttpConfig,
    pub render: RenderConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Saka3dError> {
        let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            ConfigError::ReadFile(format!("{}: {}", path.as_ref().display(), e))
        })?;

        Self::from_str(&contents)
    }

    /// Parse configuration from a TOML string
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Result<Self, Saka3dError> {
        toml::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()).into())
    }

    /// Load configuration from default paths
    pub fn load() -> Result<Self, Saka3dError> {
        let paths = [
            PathBuf::from("config.toml"),
            PathBuf::from("config/default.toml"),
            dirs_path().join("config.toml"),
        ];

        for path in &paths {
            if path.exists() {
                tracing::info!("Loading config from: {}", path.display());
                return Self::from_file(path);
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), Saka3dError> {
        let blink = &self.animation.blink;
        if blink.interval_min_secs <= 0.0 || blink.interval_min_secs >= blink.interval_max_secs {
            return Err(invalid(
                "animation.blink.interval_min_secs",
                "Blink interval must satisfy 0 < min < max",
            ));
        }
        if !(0.0..1.0).contains(&blink.closed_scale) {
            return Err(invalid(
                "animation.blink.closed_scale",
                "Closed eye scale must be in [0.0, 1.0)",
            ));
        }
        if blink.speed <= 0.0 {
            return Err(invalid("animation.blink.speed", "Blink speed must be positive"));
        }

        let smile = &self.animation.smile;
        if !(0.0..=1.0).contains(&smile.target) {
            return Err(invalid(
                "animation.smile.target",
                "Smile target must be between 0.0 and 1.0",
            ));
        }
        check_rate("animation.smile.rise_rate", smile.rise_rate)?;
        check_rate("animation.smile.fall_rate", smile.fall_rate)?;

        let talk = &self.animation.talk;
        if !(0.0..=1.0).contains(&talk.floor)
            || !(0.0..=1.0).contains(&talk.ceiling)
            || talk.floor > talk.ceiling
        {
            return Err(invalid(
                "animation.talk.floor",
                "Talk floor and ceiling must lie in [0.0, 1.0] with floor <= ceiling",
            ));
        }
        check_rate("animation.talk.typing_decay", talk.typing_decay)?;
        check_rate("animation.talk.idle_decay", talk.idle_decay)?;

        if self.render.fps == 0 || self.render.fps > 240 {
            return Err(invalid("render.fps", "FPS must be between 1 and 240"));
        }

        if self.chat.base_url.trim().is_empty() {
            return Err(invalid("chat.base_url", "Base URL must not be empty"));
        }
        if !(0.0..=2.0).contains(&self.chat.temperature) {
            return Err(invalid(
                "chat.temperature",
                "Temperature must be between 0.0 and 2.0",
            ));
        }
        if self.chat.speech_min_ms > self.chat.speech_max_ms {
            return Err(invalid(
                "chat.speech_min_ms",
                "Minimum speech duration must not exceed the maximum",
            ));
        }

        if let Some(ref path) = self.avatar.rig_path {
            if !path.exists() {
                tracing::warn!(
                    "Rig manifest not found at {}, the built-in humanoid rig will be used",
                    path.display()
                );
            }
        }

        if self.http.port == 0 {
            return Err(invalid("http.port", "Port must be greater than 0"));
        }

        Ok(())
    }
}

fn invalid(field: &str, message: &str) -> Saka3dError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        message: message.to_string(),
    }
    .into()
}

fn check_rate(field: &str, rate: f32) -> Result<(), Saka3dError> {
    if rate > 0.0 && rate <= 1.0 {
        Ok(())
    } else {
        Err(invalid(field, "Rate must be in (0.0, 1.0]"))
    }
}

/// Avatar model configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AvatarConfig {
    /// Optional rig manifest (TOML) describing bone and morph target names.
    /// When unset the built-in VRoid-style humanoid rig is used.
    pub rig_path: Option<PathBuf>,
}

/// Static resting pose, angles in degrees
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PoseConfig {
    /// Upper arm X rotation (arms lowered from T-pose)
    pub upper_arm_down_deg: f32,
    /// Upper arm Z rotation (left positive, right mirrored)
    pub upper_arm_forward_deg: f32,
    /// Hand Z roll (left positive, right mirrored)
    pub hand_roll_deg: f32,
}

impl Default for PoseConfig {
    fn default() -> Self {
        Self {
            upper_arm_down_deg: 120.0,
            upper_arm_forward_deg: 77.0,
            hand_roll_deg: 180.0,
        }
    }
}

/// Procedural animation tuning
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationConfig {
    pub blink: BlinkConfig,
    pub breathing: BreathingConfig,
    pub smile: SmileConfig,
    pub talk: TalkConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BlinkConfig {
    /// Shortest wait between blinks (seconds)
    pub interval_min_secs: f32,
    /// Longest wait between blinks (seconds, exclusive)
    pub interval_max_secs: f32,
    /// Phase advance per second while a blink is active
    pub speed: f32,
    /// Phase a new blink starts at
    pub start_phase: f32,
    /// Eye Y scale at full closure, as a fraction of the original
    pub closed_scale: f32,
}

impl Default for BlinkConfig {
    fn default() -> Self {
        Self {
            interval_min_secs: 3.0,
            interval_max_secs: 5.0,
            speed: 12.0,
            start_phase: 0.1,
            closed_scale: 0.2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BreathingConfig {
    /// Phase advance per second (radians)
    pub rate: f32,
    /// Amplitude of the breathing sine
    pub amplitude: f32,
    pub spine_base: f32,
    pub spine_gain: f32,
    pub chest_base: f32,
    pub chest_gain: f32,
    pub arm_gain: f32,
}

impl Default for BreathingConfig {
    fn default() -> Self {
        Self {
            rate: 1.5,
            amplitude: 0.005,
            spine_base: 0.02,
            spine_gain: 0.05,
            chest_base: 0.01,
            chest_gain: 0.03,
            arm_gain: 0.02,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SmileConfig {
    /// Smile level while the user is composing a message
    pub target: f32,
    /// Per-frame approach rate toward a raised target
    pub rise_rate: f32,
    /// Per-frame approach rate back to neutral
    pub fall_rate: f32,
    /// Joy-eye weight as a multiple of the smile level
    pub joy_eye_gain: f32,
}

impl Default for SmileConfig {
    fn default() -> Self {
        Self {
            target: 0.85,
            rise_rate: 0.24,
            fall_rate: 0.10,
            joy_eye_gain: 1.3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TalkConfig {
    /// Phase advance per second while speaking
    pub phase_rate: f32,
    /// Multiplier on the phase inside the rectified sine
    pub frequency: f32,
    /// Peak of the rectified sine
    pub amplitude: f32,
    /// Total width of the uniform jitter band
    pub jitter: f32,
    /// Lowest mouth level while speaking
    pub floor: f32,
    /// Highest mouth level while speaking
    pub ceiling: f32,
    /// Per-frame decay toward closed while the user types
    pub typing_decay: f32,
    /// Per-frame decay toward closed while nobody speaks
    pub idle_decay: f32,
}

impl Default for TalkConfig {
    fn default() -> Self {
        Self {
            phase_rate: 5.0,
            frequency: 2.0,
            amplitude: 0.80,
            jitter: 0.20,
            floor: 0.08,
            ceiling: 0.58,
            typing_decay: 0.28,
            idle_decay: 0.22,
        }
    }
}

/// Chat completion endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Base URL; requests go to `{base_url}/chat/completions`
    pub base_url: String,
    /// Model identifier sent with every request
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Bearer token (takes precedence over `api_key_env`)
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Environment variable holding the bearer token
    pub api_key_env: String,
    /// Request timeout; unset means wait indefinitely
    pub timeout_secs: Option<u64>,
    /// Speaking time granted per reply character
    pub speech_ms_per_char: u64,
    pub speech_min_ms: u64,
    pub speech_max_ms: u64,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            base_url: "https://router.huggingface.co/v1".to_string(),
            model: "openai/gpt-oss-120b:groq".to_string(),
            max_tokens: 600,
            temperature: 0.75,
            api_key: None,
            api_key_env: "HF_TOKEN".to_string(),
            timeout_secs: None,
            speech_ms_per_char: 60,
            speech_min_ms: 800,
            speech_max_ms: 15_000,
        }
    }
}

impl ChatConfig {
    /// Resolve the bearer token from config or environment
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| std::env::var(&self.api_key_env).ok())
            .filter(|k| !k.trim().is_empty())
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Enable HTTP server
    pub enabled: bool,
    /// HTTP server host
    pub host: String,
    /// HTTP server port
    pub port: u16,
    /// Enable CORS
    pub cors_enabled: bool,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: "127.0.0.1".to_string(),
            port: 8080,
            cors_enabled: true,
        }
    }
}

/// Frame loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Animation ticks per second
    pub fps: u32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self { fps: 60 }
    }
}

/// Get the platform-specific configuration directory
fn dirs_path() -> PathBuf {
    #[cfg(target_os = "linux")]
    {
        if let Some(config_dir) = std::env::var_os("XDG_CONFIG_HOME") {
            return PathBuf::from(config_dir).join("saka3d");
        }
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home).join(".config/saka3d");
        }
    }

    #[cfg(target_os = "macos")]
    {
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home).join("Library/Application Support/saka3d");
        }
    }

    #[cfg(target_os = "windows")]
    {
        if let Some(appdata) = std::env::var_os("APPDATA") {
            return PathBuf::from(appdata).join("saka3d");
        }
    }

    PathBuf::from(".")
}
