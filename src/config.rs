//! 配置管理模块
//! 支持从环境变量和配置文件加载配置

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::domain::address_format::Network;
use crate::service::derivation_engine::{InvalidChildPolicy, DEFAULT_MAX_SKIPS};
use crate::service::exporter::DEFAULT_EXPORT_COUNT;
use crate::service::pager::DEFAULT_PAGE_SIZE;
use crate::service::stub::{DEFAULT_PREFIX_LEN, DEFAULT_SUFFIX_LEN};

/// 地址浏览器配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExplorerConfig {
    #[serde(default)]
    pub derivation: DerivationConfig,
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub export: ExportConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// 派生配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DerivationConfig {
    pub network: Network,
    pub invalid_child_policy: InvalidChildPolicy,
    pub max_skips: u32,
}

/// 显示配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    pub page_size: u32,
    pub stub_prefix: usize,
    pub stub_suffix: usize,
}

/// 导出配置（存储卡挂载目录）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    pub count: u32,
    pub dir: PathBuf,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.parse().ok())
}

impl Default for DerivationConfig {
    fn default() -> Self {
        Self {
            network: env_parse("EXPLORER_NETWORK").unwrap_or(Network::Mainnet),
            invalid_child_policy: env_parse("EXPLORER_INVALID_CHILD_POLICY")
                .unwrap_or(InvalidChildPolicy::Skip),
            max_skips: env_parse("EXPLORER_MAX_SKIPS").unwrap_or(DEFAULT_MAX_SKIPS),
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            page_size: env_parse("EXPLORER_PAGE_SIZE").unwrap_or(DEFAULT_PAGE_SIZE),
            stub_prefix: env_parse("EXPLORER_STUB_PREFIX").unwrap_or(DEFAULT_PREFIX_LEN),
            stub_suffix: env_parse("EXPLORER_STUB_SUFFIX").unwrap_or(DEFAULT_SUFFIX_LEN),
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            count: env_parse("EXPLORER_EXPORT_COUNT").unwrap_or(DEFAULT_EXPORT_COUNT),
            dir: std::env::var("EXPLORER_EXPORT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./microsd")),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            format: std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".into()),
        }
    }
}

impl ExplorerConfig {
    /// 从环境变量加载配置
    pub fn from_env() -> Result<Self> {
        Ok(Self::default())
    }

    /// 从配置文件加载配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

        let config: ExplorerConfig =
            toml::from_str(&content).with_context(|| "Failed to parse config file as TOML")?;

        Ok(config)
    }

    /// 从环境变量和配置文件合并加载（配置文件存在时优先）
    pub fn from_env_and_file<P: AsRef<Path>>(path: Option<P>) -> Result<Self> {
        let mut config = Self::from_env()?;

        if let Some(path) = path {
            if path.as_ref().exists() {
                config = Self::from_file(path)?;
            }
        }

        Ok(config)
    }

    /// 验证配置有效性
    pub fn validate(&self) -> Result<()> {
        if self.display.page_size == 0 {
            anyhow::bail!("EXPLORER_PAGE_SIZE must be at least 1");
        }
        if self.export.count == 0 {
            anyhow::bail!("EXPLORER_EXPORT_COUNT must be at least 1");
        }
        if self.display.stub_prefix == 0 || self.display.stub_suffix == 0 {
            anyhow::bail!("EXPLORER_STUB_PREFIX and EXPLORER_STUB_SUFFIX must be at least 1");
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            anyhow::bail!("LOG_LEVEL must be one of: {:?}", valid_levels);
        }

        if self.logging.format != "json" && self.logging.format != "text" {
            anyhow::bail!("LOG_FORMAT must be 'json' or 'text'");
        }

        Ok(())
    }
}
