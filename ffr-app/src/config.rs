//! ffrcheck 配置
//!
//! 配置来源按优先级：`--config` 指定的文件、当前目录的 `ffrcheck.toml`、
//! 内置默认值。文件无法读取或解析时记录警告并使用默认值。
//!
//! # 配置文件格式
//!
//! ```toml
//! [default_arguments]
//! input_dir = "data/lot1"
//! output_dir = "output"
//! sspec = "*"
//! html_stats = true
//!
//! [itf_parser]
//! active_mapping = "lockout_RAP"
//!
//! [itf_parser.visualid_filter]
//! enabled = true
//! filter_list = ["U1", "U2"]
//!
//! [fle_settings]
//! filename = "FleFuseSettings.json"
//!
//! [processing]
//! progress_interval = 100000
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use ffr_parsers::itf::{lockout_rap_profile, DEFAULT_PROFILE};
use ffr_parsers::{SsidMapping, SsidTable, VisualIdFilter};
use log::{info, warn};
use serde::{Deserialize, Serialize};

/// 当前目录下的默认配置文件名
pub const DEFAULT_CONFIG_FILE: &str = "ffrcheck.toml";

/// ffrcheck 配置
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub default_arguments: DefaultArguments,
    pub itf_parser: ItfParserConfig,
    pub fle_settings: FleSettings,
    pub processing: ProcessingConfig,
}

/// 命令行未给出时使用的参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultArguments {
    pub input_dir: Option<String>,
    pub output_dir: String,
    pub sspec: Option<String>,
    pub ube: Option<String>,
    pub mtlolf: Option<String>,
    pub ituff: Option<String>,
    pub visualid: Option<String>,
    pub log: bool,
    pub html_stats: bool,
}

impl Default for DefaultArguments {
    fn default() -> Self {
        Self {
            input_dir: None,
            output_dir: "output".to_string(),
            sspec: None,
            ube: None,
            mtlolf: None,
            ituff: None,
            visualid: None,
            log: false,
            html_stats: true,
        }
    }
}

/// ITF 解析设置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ItfParserConfig {
    pub active_mapping: String,
    /// 配置名 -> 映射列表
    pub ssid_mappings: BTreeMap<String, Vec<SsidMapping>>,
    pub visualid_filter: VisualIdFilterConfig,
}

impl Default for ItfParserConfig {
    fn default() -> Self {
        Self {
            active_mapping: DEFAULT_PROFILE.to_string(),
            ssid_mappings: BTreeMap::new(),
            visualid_filter: VisualIdFilterConfig::default(),
        }
    }
}

impl ItfParserConfig {
    /// 当前映射配置；未定义时退回 `lockout_RAP`
    pub fn ssid_table(&self) -> SsidTable {
        if let Some(mappings) = self.ssid_mappings.get(&self.active_mapping) {
            info!(
                "Using SSID mapping '{}' ({} entries)",
                self.active_mapping,
                mappings.len()
            );
            return SsidTable::new(mappings.clone());
        }
        if self.active_mapping != DEFAULT_PROFILE {
            warn!(
                "SSID mapping '{}' not defined, using '{DEFAULT_PROFILE}'",
                self.active_mapping
            );
        }
        SsidTable::new(lockout_rap_profile())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisualIdFilterConfig {
    pub enabled: bool,
    pub filter_list: Vec<String>,
}

impl VisualIdFilterConfig {
    pub fn filter(&self) -> VisualIdFilter {
        VisualIdFilter::from_config(self.enabled, &self.filter_list)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FleSettings {
    pub filename: String,
}

impl Default for FleSettings {
    fn default() -> Self {
        Self {
            filename: "FleFuseSettings.json".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// 每处理多少行输出一次进度（0 关闭）
    pub progress_interval: usize,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            progress_interval: 100_000,
        }
    }
}

impl Config {
    /// 加载配置
    ///
    /// # 参数
    /// - `explicit`: `--config` 指定的路径
    pub fn load(explicit: Option<&Path>) -> Self {
        match explicit {
            Some(path) => Self::load_from_file(path).unwrap_or_else(|| {
                warn!("Using default configuration");
                Self::default()
            }),
            None => {
                let local = Path::new(DEFAULT_CONFIG_FILE);
                if local.is_file() {
                    Self::load_from_file(local).unwrap_or_default()
                } else {
                    Self::default()
                }
            }
        }
    }

    /// 读取并解析配置文件，失败时记录警告
    fn load_from_file(path: &Path) -> Option<Self> {
        match std::fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => {
                    info!("Loaded config from {}", path.display());
                    Some(config)
                }
                Err(e) => {
                    warn!("Failed to parse {}: {}", path.display(), e);
                    None
                }
            },
            Err(e) => {
                warn!("Failed to read {}: {}", path.display(), e);
                None
            }
        }
    }
}
