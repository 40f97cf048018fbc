use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// 应用配置的根结构。
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub tessellation: TessellationConfig,
}

impl AppConfig {
    /// 从显式路径加载配置。
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// 自动发现配置文件：优先读取环境变量 `KMOD_CONFIG`，否则寻找 `./config/default.toml`。
    /// 若文件缺失，则返回默认配置。
    pub fn discover() -> Result<Self, ConfigError> {
        if let Some(path) = env::var_os("KMOD_CONFIG") {
            return Self::from_file(PathBuf::from(path));
        }

        let default_path = env::current_dir()
            .map(|dir| dir.join("config").join("default.toml"))
            .map_err(|source| ConfigError::Context {
                message: "获取当前工作目录失败".to_string(),
                source,
            })?;

        if default_path.exists() {
            Self::from_file(default_path)
        } else {
            Ok(Self::default())
        }
    }
}

/// 日志配置，支持设置默认等级。
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,
}

impl LoggingConfig {
    fn default_level() -> String {
        "info".to_string()
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
        }
    }
}

/// 圆弧离散化参数：每段目标弧长（毫米）及段数上下限。
#[derive(Debug, Clone, Deserialize)]
pub struct TessellationConfig {
    #[serde(default = "TessellationConfig::default_segment_length")]
    pub segment_length_mm: f64,
    #[serde(default = "TessellationConfig::default_min_segments")]
    pub min_segments: usize,
    #[serde(default = "TessellationConfig::default_max_segments")]
    pub max_segments: usize,
}

impl TessellationConfig {
    fn default_segment_length() -> f64 {
        0.1
    }

    fn default_min_segments() -> usize {
        8
    }

    fn default_max_segments() -> usize {
        64
    }
}

impl Default for TessellationConfig {
    fn default() -> Self {
        Self {
            segment_length_mm: Self::default_segment_length(),
            min_segments: Self::default_min_segments(),
            max_segments: Self::default_max_segments(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("读取配置文件 {path:?} 失败: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("解析配置文件 {path:?} 失败: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("{message}")]
    Context {
        message: String,
        #[source]
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_builtin_values() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.logging.level, "info");
        assert_eq!(cfg.tessellation.segment_length_mm, 0.1);
        assert_eq!(cfg.tessellation.min_segments, 8);
        assert_eq!(cfg.tessellation.max_segments, 64);
    }

    #[test]
    fn load_from_temp_file() {
        let mut file = tempfile::NamedTempFile::new().expect("create temp file");
        writeln!(
            file,
            r#"
            [logging]
            level = "debug"

            [tessellation]
            segment_length_mm = 0.05
            max_segments = 128
            "#
        )
        .unwrap();

        let cfg = AppConfig::from_file(file.path()).expect("load config");
        assert_eq!(cfg.logging.level, "debug");
        assert_eq!(cfg.tessellation.segment_length_mm, 0.05);
        assert_eq!(cfg.tessellation.min_segments, 8);
        assert_eq!(cfg.tessellation.max_segments, 128);
    }

    #[test]
    fn empty_file_uses_defaults() {
        let file = tempfile::NamedTempFile::new().expect("create temp file");
        let cfg = AppConfig::from_file(file.path()).expect("load config");
        assert_eq!(cfg.logging.level, "info");
        assert_eq!(cfg.tessellation.max_segments, 64);
    }

    #[test]
    fn invalid_toml_reports_parse_error() {
        let mut file = tempfile::NamedTempFile::new().expect("create temp file");
        writeln!(file, "[tessellation]\nmin_segments = \"many\"").unwrap();
        let err = AppConfig::from_file(file.path()).expect_err("类型错误");
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn missing_file_reports_io_error() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let err = AppConfig::from_file(dir.path().join("absent.toml")).expect_err("文件不存在");
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
