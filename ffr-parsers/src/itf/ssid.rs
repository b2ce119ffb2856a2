//! SSID 映射表
//!
//! 将 TNAME 映射到 (域, 寄存器, SSID)。模式先按子串匹配，再按忽略大小写的
//! 正则匹配；无法编译的正则只做子串匹配。

use log::warn;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

/// 一条 SSID 映射
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SsidMapping {
    pub domain: String,
    pub register: String,
    pub ssid: String,
    pub tname_patterns: Vec<String>,
}

impl SsidMapping {
    pub fn new(domain: &str, register: &str, ssid: &str, patterns: &[&str]) -> Self {
        Self {
            domain: domain.to_string(),
            register: register.to_string(),
            ssid: ssid.to_string(),
            tname_patterns: patterns.iter().map(|p| p.to_string()).collect(),
        }
    }
}

/// 默认映射配置名
pub const DEFAULT_PROFILE: &str = "lockout_RAP";

/// 默认 `lockout_RAP` 映射
pub fn lockout_rap_profile() -> Vec<SsidMapping> {
    vec![
        SsidMapping::new(
            "IPC::FUS",
            "CPU0",
            "U1.U5",
            &["FACTFUSBURNCPUNOM_X_X_X_X_LOCKBIT_RAP_CPU0"],
        ),
        SsidMapping::new(
            "IPC::FUS",
            "CPU1",
            "U1.U6",
            &["FACTFUSBURNCPUNOM_X_X_X_X_LOCKBIT_RAP_CPU1"],
        ),
        SsidMapping::new(
            "IPG::FUS",
            "GCD",
            "U1.U4",
            &["FACTFUSBURNGCDNOM_X_X_X_X_LOCKBIT_RAP_GCD"],
        ),
        SsidMapping::new(
            "IPH::FUS",
            "HUB",
            "U1.U2",
            &["FACTFUSBURNHUBNOM_X_X_X_X_LOCKBIT_RAP_HUB"],
        ),
        SsidMapping::new(
            "IPP::FUS",
            "PCD",
            "U1.U3",
            &["FACTFUSBURNPCDNOM_X_X_X_X_LOCKBITRAP_PCD"],
        ),
    ]
}

#[derive(Debug, Clone)]
struct CompiledPattern {
    text: String,
    regex: Option<Regex>,
}

impl CompiledPattern {
    fn matches(&self, tname: &str) -> bool {
        tname.contains(&self.text) || self.regex.as_ref().is_some_and(|re| re.is_match(tname))
    }
}

/// 编译后的映射表，按顺序匹配，第一条命中者生效
#[derive(Debug, Clone)]
pub struct SsidTable {
    entries: Vec<(SsidMapping, Vec<CompiledPattern>)>,
}

impl SsidTable {
    pub fn new(mappings: Vec<SsidMapping>) -> Self {
        let entries = mappings
            .into_iter()
            .map(|mapping| {
                let patterns = mapping
                    .tname_patterns
                    .iter()
                    .filter(|text| !text.is_empty())
                    .map(|text| {
                        let regex = RegexBuilder::new(text)
                            .case_insensitive(true)
                            .build()
                            .map_err(|e| warn!("TNAME pattern '{text}' is not a valid regex: {e}"))
                            .ok();
                        CompiledPattern {
                            text: text.clone(),
                            regex,
                        }
                    })
                    .collect();
                (mapping, patterns)
            })
            .collect();
        Self { entries }
    }

    pub fn lockout_rap() -> Self {
        Self::new(lockout_rap_profile())
    }

    /// 查找 TNAME 对应的映射
    pub fn find(&self, tname: &str) -> Option<&SsidMapping> {
        if tname.is_empty() {
            return None;
        }
        self.entries
            .iter()
            .find(|(_, patterns)| patterns.iter().any(|pattern| pattern.matches(tname)))
            .map(|(mapping, _)| mapping)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for SsidTable {
    fn default() -> Self {
        Self::lockout_rap()
    }
}
