//! FLE 熔丝设置解析器
//!
//! 收集 `FleFuseSettings.json` 中出现的熔丝名/熔丝组名，用于单元数据状态检查。

use std::collections::HashSet;
use std::path::Path;

use ffr_core::FfrError;
use log::{info, warn};
use serde_json::Value;

use crate::line_reader::open_buffered;

/// FLE 熔丝名集合（同时保存原名与规范化名）
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FleFuseSet {
    names: HashSet<String>,
}

/// `/` 替换为 `_` 并转小写
fn normalize(name: &str) -> String {
    name.replace('/', "_").to_lowercase()
}

impl FleFuseSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// 从输入目录加载；文件不存在时返回空集合
    pub fn load(input_dir: &Path, filename: &str) -> Result<Self, FfrError> {
        let path = input_dir.join(filename);
        if !path.is_file() {
            info!("No FLE settings at {}", path.display());
            return Ok(Self::new());
        }

        let value: Value = serde_json::from_reader(open_buffered(&path)?)?;
        let set = Self::from_value(&value);
        info!("Loaded {} FLE fuse names from {}", set.len(), path.display());
        Ok(set)
    }

    /// 从已解析的 JSON 收集熔丝名
    pub fn from_value(value: &Value) -> Self {
        let mut set = Self::new();

        let Some(registers) = value["Registers"].as_array() else {
            warn!("FLE settings without a Registers array");
            return set;
        };

        for register in registers {
            for key in register["SecurityKeys"].as_array().into_iter().flatten() {
                for decoder in key["SecurityKeyDecoder"].as_array().into_iter().flatten() {
                    if let Some(name) = decoder["fuseName"].as_str() {
                        set.insert(name);
                    }
                }
            }

            let special = &register["SpecialFuses"];
            for lockout in special["LockoutBits"].as_array().into_iter().flatten() {
                for name in lockout["fuseNames"].as_array().into_iter().flatten() {
                    if let Some(name) = name.as_str() {
                        set.insert(name);
                    }
                }
            }
            for algorithm in special["SpecialAlgorithms"].as_array().into_iter().flatten() {
                if let Some(name) = algorithm["Fuse"].as_str() {
                    set.insert(name);
                }
                for name in algorithm["IncludeFuses"].as_array().into_iter().flatten() {
                    if let Some(name) = name.as_str() {
                        set.insert(name);
                    }
                }
            }
        }
        set
    }

    /// 登记一个熔丝名的原名与规范化名
    pub fn insert(&mut self, name: &str) {
        if name.is_empty() {
            return;
        }
        let normalized = normalize(name);
        if normalized.contains("dfxagg") {
            self.names.insert(normalized.replace("dfxagg", "dfx_agg"));
        }
        self.names.insert(name.to_string());
        self.names.insert(normalized);
    }

    /// 熔丝组名或熔丝名（原名、小写、规范化）任一命中即为 FLE
    pub fn contains_any(&self, group: &str, fuse: &str) -> bool {
        [group, fuse].into_iter().filter(|name| !name.is_empty()).any(|name| {
            self.names.contains(name)
                || self.names.contains(&name.to_lowercase())
                || self.names.contains(&normalize(name))
        })
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> FleFuseSet {
        FleFuseSet::from_value(&json!({
            "Registers": [{
                "Name": "CPU0",
                "SecurityKeys": [{"SecurityKeyDecoder": [
                    {"fuseName": "KEY/DFXAGG_Lock"},
                    {"fuseName": ""}
                ]}],
                "SpecialFuses": {
                    "LockoutBits": [{"fuseNames": ["Lockout_Group"]}],
                    "SpecialAlgorithms": [{"Fuse": "Hash_Group", "IncludeFuses": ["inc_a"]}]
                }
            }]
        }))
    }

    #[test]
    fn test_collects_all_sources() {
        let set = sample();
        assert!(set.contains_any("", "KEY/DFXAGG_Lock"));
        assert!(set.contains_any("", "key_dfxagg_lock"));
        assert!(set.contains_any("", "key_dfx_agg_lock"));
        assert!(set.contains_any("Lockout_Group", ""));
        assert!(set.contains_any("hash_group", "other"));
        assert!(set.contains_any("other", "INC_A"));
        assert!(!set.contains_any("other", "missing"));
        assert!(!set.contains_any("", ""));
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let set = FleFuseSet::load(dir.path(), "FleFuseSettings.json").unwrap();
        assert!(set.is_empty());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("fle.json"),
            r#"{"Registers": [{"SpecialFuses": {"LockoutBits": [{"fuseNames": ["G/1"]}]}}]}"#,
        )
        .unwrap();
        let set = FleFuseSet::load(dir.path(), "fle.json").unwrap();
        assert!(set.contains_any("g_1", ""));
        assert_eq!(set.len(), 2);
    }
}
