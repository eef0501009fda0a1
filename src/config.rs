use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::rate::{MAX_RATE, MIN_RATE};

/// 应用配置管理模块
/// 集中管理所有配置项，提供默认值和配置验证

/// 主配置结构
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub sampling: SamplingConfig,
    pub mqtt: MqttConfig,
    pub simulation: SimulationConfig,
    pub export: ExportConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Duckdb,
    Memory,
}

/// 数据库配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub backend: StorageBackend,
    pub path: String,
    pub channel_capacity: usize,
    pub auto_create_dir: bool,
}

/// 采样配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    /// Requested samples per second; clamped into the supported range at startup.
    pub rate: i64,
    pub logging_enabled: bool,
}

/// MQTT配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MqttConfig {
    pub broker: String,
    pub port: u16,
    pub client_id: String,
    pub keep_alive: u16,
    pub topics: MqttTopics,
}

/// MQTT主题配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MqttTopics {
    pub acceleration: String,
    pub rotation: String,
    pub compass: String,
    pub location: String,
}

/// 模拟传感器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Motion channel updates per second.
    pub update_rate_hz: f64,
    /// Seconds between simulated location fixes.
    pub location_interval_seconds: f64,
}

/// 导出配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub directory: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Duckdb,
            path: "data/telemetry.db".to_string(),
            channel_capacity: 100,
            auto_create_dir: true,
        }
    }
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            rate: 10,
            logging_enabled: false,
        }
    }
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            broker: "localhost".to_string(),
            port: 1883,
            client_id: "sense_logger".to_string(),
            keep_alive: 5,
            topics: MqttTopics::default(),
        }
    }
}

impl Default for MqttTopics {
    fn default() -> Self {
        Self {
            acceleration: "sensors/acceleration".to_string(),
            rotation: "sensors/rotation".to_string(),
            compass: "sensors/compass".to_string(),
            location: "sensors/location".to_string(),
        }
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            update_rate_hz: 50.0,
            location_interval_seconds: 5.0,
        }
    }
}

impl SimulationConfig {
    /// Time between motion updates, or `None` if the rate cannot be expressed as one.
    pub fn update_period(&self) -> Option<Duration> {
        if !(self.update_rate_hz > 0.0) {
            return None;
        }
        Duration::try_from_secs_f64(1.0 / self.update_rate_hz).ok()
    }

    /// Time between location fixes, or `None` if it is not a positive finite duration.
    pub fn location_interval(&self) -> Option<Duration> {
        if !(self.location_interval_seconds > 0.0) {
            return None;
        }
        Duration::try_from_secs_f64(self.location_interval_seconds).ok()
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            directory: "data_export".to_string(),
        }
    }
}

impl AppConfig {
    /// 从文件加载配置
    pub fn load_from_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::IoError)?;

        let config: AppConfig = toml::from_str(&content).map_err(ConfigError::ParseError)?;

        config.validate()?;
        Ok(config)
    }

    /// 保存配置到文件
    pub fn save_to_file<P: AsRef<std::path::Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self).map_err(ConfigError::SerializeError)?;

        std::fs::write(path, content).map_err(ConfigError::IoError)?;

        Ok(())
    }

    /// 验证配置的有效性
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.channel_capacity == 0 {
            return Err(ConfigError::ValidationError(
                "Database channel capacity must be positive".to_string(),
            ));
        }

        if self.database.backend == StorageBackend::Duckdb && self.database.path.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "Database path must not be empty".to_string(),
            ));
        }

        if self.simulation.update_period().is_none() {
            return Err(ConfigError::ValidationError(
                "Simulation update rate must be a positive, finite rate".to_string(),
            ));
        }

        if self.simulation.location_interval().is_none() {
            return Err(ConfigError::ValidationError(
                "Simulation location interval must be a positive, finite duration".to_string(),
            ));
        }

        // 采样率越界不是错误，启动时会被钳制
        if self.sampling.rate < i64::from(MIN_RATE) || self.sampling.rate > i64::from(MAX_RATE) {
            log::info!(
                "Configured rate {} is outside [{}, {}] and will be clamped",
                self.sampling.rate,
                MIN_RATE,
                MAX_RATE
            );
        }

        Ok(())
    }

    /// 获取导出目录路径
    pub fn get_export_directory(&self) -> PathBuf {
        PathBuf::from(&self.export.directory)
    }
}

/// 配置错误类型
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(std::io::Error),
    #[error("Parse error: {0}")]
    ParseError(toml::de::Error),
    #[error("Serialize error: {0}")]
    SerializeError(toml::ser::Error),
    #[error("Validation error: {0}")]
    ValidationError(String),
}

/// 配置管理器
pub struct ConfigManager {
    config: AppConfig,
    config_path: Option<PathBuf>,
}

impl ConfigManager {
    /// 创建配置管理器
    pub fn new() -> Self {
        Self {
            config: AppConfig::default(),
            config_path: None,
        }
    }

    /// 从文件加载配置
    pub fn load_from_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self, ConfigError> {
        let config = AppConfig::load_from_file(&path)?;
        Ok(Self {
            config,
            config_path: Some(path.as_ref().to_path_buf()),
        })
    }

    /// 获取当前配置
    pub fn get_config(&self) -> &AppConfig {
        &self.config
    }

    /// 获取可变配置
    pub fn get_config_mut(&mut self) -> &mut AppConfig {
        &mut self.config
    }

    /// 保存配置
    pub fn save(&self) -> Result<(), ConfigError> {
        if let Some(path) = &self.config_path {
            self.config.save_to_file(path)?;
        }
        Ok(())
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}
