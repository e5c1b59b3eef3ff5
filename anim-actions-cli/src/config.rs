//! # Config 模块
//!
//! 演示宿主的配置管理。
//!
//! ## 配置优先级
//!
//! 1. 命令行参数（最高）
//! 2. 配置文件 (anim-actions.json)
//! 3. 默认值（最低）

use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use anim_actions::MainQueueConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 应用配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// 日志级别（trace/debug/info/warn/error）
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// 主线程队列配置
    #[serde(default)]
    pub main_queue: MainQueueConfig,

    /// 播放配置
    #[serde(default)]
    pub playback: PlaybackConfig,

    /// 等待回调的超时（毫秒）
    #[serde(default = "default_callback_timeout_ms")]
    pub callback_timeout_ms: u64,

    /// 确认 "不会触发" 时的静默观察期（毫秒）
    #[serde(default = "default_quiet_period_ms")]
    pub quiet_period_ms: u64,
}

/// 播放配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybackConfig {
    /// 演示动画时长（秒）
    #[serde(default = "default_duration_secs")]
    pub duration_secs: f32,

    /// 引擎每帧推进的时间（秒）
    #[serde(default = "default_tick_secs")]
    pub tick_secs: f32,
}

/// 单次播放允许推进的最大帧数
pub const MAX_FRAMES: usize = 1_000_000;

impl PlaybackConfig {
    /// 播放到结束所需的帧数预算（含取整余量）
    pub fn frame_budget(&self) -> usize {
        (self.duration_secs / self.tick_secs).ceil() as usize + 2
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            duration_secs: default_duration_secs(),
            tick_secs: default_tick_secs(),
        }
    }
}

// 默认值函数
fn default_log_level() -> String {
    "info".to_string()
}

fn default_callback_timeout_ms() -> u64 {
    2000
}

fn default_quiet_period_ms() -> u64 {
    100
}

fn default_duration_secs() -> f32 {
    1.0
}

fn default_tick_secs() -> f32 {
    0.25
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            main_queue: MainQueueConfig::default(),
            playback: PlaybackConfig::default(),
            callback_timeout_ms: default_callback_timeout_ms(),
            quiet_period_ms: default_quiet_period_ms(),
        }
    }
}

impl AppConfig {
    /// 加载配置文件
    ///
    /// 文件不存在时返回默认配置；文件存在但无法读取或解析时返回错误。
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            eprintln!("⚠️ 配置文件不存在: {}，使用默认配置", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;
        serde_json::from_str(&content).map_err(|e| ConfigError::ParseFailed(e.to_string()))
    }

    /// 保存配置到文件
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializationFailed(e.to_string()))?;

        fs::write(path, json).map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    /// 验证配置有效性
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.tracing_level()?;

        let PlaybackConfig {
            duration_secs,
            tick_secs,
        } = self.playback;

        if !duration_secs.is_finite() || duration_secs < 0.0 {
            return Err(ConfigError::ValidationFailed(
                "动画时长必须是非负有限数".to_string(),
            ));
        }

        if !tick_secs.is_finite() || tick_secs <= 0.0 {
            return Err(ConfigError::ValidationFailed(
                "每帧推进时间必须是正的有限数".to_string(),
            ));
        }

        if self.playback.frame_budget() > MAX_FRAMES {
            return Err(ConfigError::ValidationFailed(format!(
                "每帧推进时间过小：播放需要超过 {MAX_FRAMES} 帧"
            )));
        }

        if self.callback_timeout_ms == 0 {
            return Err(ConfigError::ValidationFailed(
                "回调超时必须大于 0".to_string(),
            ));
        }

        Ok(())
    }

    /// 解析日志级别
    pub fn tracing_level(&self) -> Result<tracing::Level, ConfigError> {
        tracing::Level::from_str(&self.log_level).map_err(|_| {
            ConfigError::ValidationFailed(format!("无效的日志级别: {}", self.log_level))
        })
    }

    /// 等待回调的超时
    pub fn callback_timeout(&self) -> Duration {
        Duration::from_millis(self.callback_timeout_ms)
    }

    /// 静默观察期
    pub fn quiet_period(&self) -> Duration {
        Duration::from_millis(self.quiet_period_ms)
    }
}

/// 配置错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// 序列化失败
    #[error("配置序列化失败: {0}")]
    SerializationFailed(String),

    /// 解析失败
    #[error("配置解析失败: {0}")]
    ParseFailed(String),

    /// IO 错误
    #[error("配置 IO 错误: {0}")]
    IoError(String),

    /// 验证失败
    #[error("配置验证失败: {0}")]
    ValidationFailed(String),
}
