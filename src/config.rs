use std::env;
use std::str::FromStr;

use crate::constants::{
    DEFAULT_CALIBRATION_FRAMES, DEFAULT_FRAME_CHANNEL_CAPACITY, DEFAULT_SIMILARITY_THRESHOLD,
};
use crate::logging::LogConfig;

#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub enable_file_logs: bool,
    pub log_dir: String,
    /// 图库 JSON 文件；为空时使用空图库，所有人脸识别为 unknown
    pub gallery_path: Option<String>,
    pub frame_channel_capacity: usize,
    pub inference: InferenceEnvConfig,
}

#[derive(Debug, Clone)]
pub struct InferenceEnvConfig {
    /// JSON file overriding the built-in inference tables.
    pub config_path: Option<String>,
    pub calibration_frames: usize,
    pub similarity_threshold: f32,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            log_level: env_or("RUST_LOG", "info"),
            enable_file_logs: env_or_bool("ENABLE_FILE_LOGS", false),
            log_dir: env_or("LOG_DIR", "./logs"),
            gallery_path: env_opt("GALLERY_PATH"),
            frame_channel_capacity: env_or_parse(
                "FRAME_CHANNEL_CAPACITY",
                DEFAULT_FRAME_CHANNEL_CAPACITY,
            ),
            inference: InferenceEnvConfig {
                config_path: env_opt("INFERENCE_CONFIG_PATH"),
                calibration_frames: env_or_parse("CALIBRATION_FRAMES", DEFAULT_CALIBRATION_FRAMES),
                similarity_threshold: env_or_parse(
                    "SIMILARITY_THRESHOLD",
                    DEFAULT_SIMILARITY_THRESHOLD,
                ),
            },
        }
    }

    pub fn log_config(&self) -> LogConfig {
        LogConfig {
            log_level: self.log_level.clone(),
            enable_file_logs: self.enable_file_logs,
            log_dir: self.log_dir.clone(),
        }
    }
}

pub fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Unset and blank values both read as `None`.
pub fn env_opt(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub fn env_or_parse<T>(key: &str, default: T) -> T
where
    T: FromStr + Copy,
{
    match env::var(key) {
        Ok(raw) => match raw.trim().parse::<T>() {
            Ok(v) => v,
            Err(_) => {
                tracing::warn!(
                    key,
                    value = %raw,
                    "Failed to parse env var, using default"
                );
                default
            }
        },
        Err(_) => default,
    }
}

pub fn env_or_bool(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" => false,
            _ => default,
        },
        Err(_) => default,
    }
}
