//! ITF 记录解析
//!
//! 行以层级数字开头（`6_` 批次头、`3_` 单元、`2_` 测试项）。一个单元从
//! `3_lsep`/`3_lbeg` 开始，`2_tname_<T>` 登记待取值的 TNAME，紧随的
//! `2_strgalt_fus_msbF_<V>` 给出它的值。

use std::collections::BTreeMap;
use std::io::BufRead;

use ffr_core::FfrError;

use super::ssid::SsidTable;
use crate::line_reader::LossyLines;

/// 批次头前缀与键名
pub const HEADER_KEYS: [(&str, &str); 7] = [
    ("6_lotid_", "lotid"),
    ("6_sspec_", "sspec"),
    ("6_prgnm_", "prgnm"),
    ("5_lcode_", "lcode"),
    ("4_sysid_", "sysid"),
    ("4_facid_", "facid"),
    ("4_tempr_", "tempr"),
];

/// 可由 `3_<key>_<v>` / `2_<key>_<v>` 设置的单元属性
pub const UNIT_KEYS: [&str; 15] = [
    "prtnm",
    "thermalhdid",
    "dvtststdt",
    "socket",
    "tstordnum",
    "tiuid",
    "eqpprtid",
    "siteid",
    "prttesterid",
    "tiuprscdid",
    "visualid",
    "subflstpid",
    "binn",
    "curfbin",
    "curibin",
];

const TNAME_PREFIX: &str = "2_tname_";
const VALUE_PREFIX: &str = "2_strgalt_fus_msbF_";
const VISUALID_PREFIX: &str = "2_visualid_";
const ULT_PREFIXES: [&str; 4] = ["2_sstrlot_", "2_sstrwafer_", "2_sstrxloc_", "2_sstryloc_"];

/// ITF 批次头
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItfHeader {
    values: BTreeMap<String, String>,
}

impl ItfHeader {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }
}

/// 单个 SSID 的 ULT 组成部分
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct UltParts {
    lot: Option<String>,
    wafer: Option<String>,
    xloc: Option<String>,
    yloc: Option<String>,
}

impl UltParts {
    /// `lot_wafer_xloc_yloc`，缺失部分为空；全部缺失时返回 None
    fn render(&self) -> Option<String> {
        let parts = [&self.lot, &self.wafer, &self.xloc, &self.yloc];
        if parts.iter().all(|part| part.is_none()) {
            return None;
        }
        Some(
            parts
                .iter()
                .map(|part| part.as_deref().unwrap_or_default())
                .collect::<Vec<_>>()
                .join("_"),
        )
    }
}

/// 一个测试单元
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItfUnit {
    fields: BTreeMap<String, String>,
    /// SSID -> ULT 字符串
    pub ult: BTreeMap<String, String>,
    /// 按首次出现顺序保存的 (TNAME, 值)
    pub tname_values: Vec<(String, String)>,
}

impl ItfUnit {
    pub fn visual_id(&self) -> Option<&str> {
        self.field("visualid").filter(|id| !id.is_empty())
    }

    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    /// 设置已知属性，未知键忽略
    fn set_field(&mut self, key: &str, value: &str) {
        if UNIT_KEYS.contains(&key) {
            self.fields.insert(key.to_string(), value.to_string());
        }
    }

    /// 设置 TNAME 值，保持首次出现的位置
    pub fn set_tname_value(&mut self, tname: &str, value: &str) {
        match self.tname_values.iter_mut().find(|(name, _)| name == tname) {
            Some((_, existing)) => *existing = value.to_string(),
            None => self
                .tname_values
                .push((tname.to_string(), value.to_string())),
        }
    }
}

/// 从 `..._U1.U<n>_<value>` 中取 (SSID, 值)
fn split_ssid_value(line: &str) -> Option<(&str, String)> {
    let parts: Vec<&str> = line.split('_').collect();
    if parts.len() < 3 {
        return None;
    }
    parts.iter().enumerate().find_map(|(i, part)| {
        let digits = part.strip_prefix("U1.U")?;
        let is_ssid = digits.chars().next().is_some_and(|c| c.is_ascii_digit());
        (is_ssid && i + 1 < parts.len()).then(|| (*part, parts[i + 1..].join("_")))
    })
}

/// 解析状态
struct UnitBuilder {
    unit: ItfUnit,
    ult_parts: BTreeMap<String, UltParts>,
    pending_tname: Option<String>,
}

impl UnitBuilder {
    fn new() -> Self {
        Self {
            unit: ItfUnit::default(),
            ult_parts: BTreeMap::new(),
            pending_tname: None,
        }
    }

    fn finish(mut self) -> ItfUnit {
        for (ssid, parts) in &self.ult_parts {
            if let Some(ult) = parts.render() {
                self.unit.ult.insert(ssid.clone(), ult);
            }
        }
        self.unit
    }

    fn record_ult(&mut self, line: &str) {
        let Some((ssid, value)) = split_ssid_value(line) else {
            return;
        };
        let parts = self.ult_parts.entry(ssid.to_string()).or_default();
        if value.is_empty() {
            return;
        }
        if line.starts_with("2_sstrlot_") {
            parts.lot = Some(value);
        } else if line.starts_with("2_sstrwafer_") {
            parts.wafer = Some(value);
        } else if line.starts_with("2_sstrxloc_") {
            parts.xloc = Some(value);
        } else {
            parts.yloc = Some(value);
        }
    }
}

/// `<level>_<key>_<value>` 形式的键值
fn key_value(rest: &str) -> Option<(&str, &str)> {
    rest.split_once('_')
}

/// 解析一个 ITF 流，返回批次头与全部单元（含无 visualID 的单元）
pub fn parse_itf_reader<R: BufRead>(
    reader: R,
    table: &SsidTable,
) -> Result<(ItfHeader, Vec<ItfUnit>), FfrError> {
    let mut header = ItfHeader::default();
    let mut units = Vec::new();
    let mut current: Option<UnitBuilder> = None;

    for line in LossyLines::new(reader) {
        let line = line.map_err(|e| FfrError::io("<itf>", e))?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        for (prefix, key) in HEADER_KEYS {
            if let Some(value) = line.strip_prefix(prefix) {
                header.values.insert(key.to_string(), value.to_string());
            }
        }

        if line.starts_with("3_lsep") || line.starts_with("3_lbeg") {
            if let Some(finished) = current.replace(UnitBuilder::new()) {
                units.push(finished.finish());
            }
            continue;
        }

        let Some(builder) = current.as_mut() else {
            continue;
        };

        if let Some(rest) = line.strip_prefix("3_") {
            if let Some((key, value)) = key_value(rest) {
                builder.unit.set_field(key, value);
            }
        } else if let Some(visual_id) = line.strip_prefix(VISUALID_PREFIX) {
            builder.unit.set_field("visualid", visual_id);
        } else if let Some(tname) = line.strip_prefix(TNAME_PREFIX) {
            if table.find(tname).is_some() {
                builder.unit.set_tname_value(tname, "");
                builder.pending_tname = Some(tname.to_string());
            } else {
                builder.pending_tname = None;
            }
        } else if line.starts_with(VALUE_PREFIX) && builder.pending_tname.is_some() {
            if let Some(tname) = builder.pending_tname.take() {
                builder.unit.set_tname_value(&tname, &line[VALUE_PREFIX.len()..]);
            }
        } else if ULT_PREFIXES.iter().any(|prefix| line.starts_with(prefix)) {
            builder.record_ult(line);
        } else if let Some(rest) = line.strip_prefix("2_") {
            if let Some((key, value)) = key_value(rest) {
                builder.unit.set_field(key, value);
            }
            if !line.starts_with(VALUE_PREFIX) {
                builder.pending_tname = None;
            }
        }
    }

    if let Some(finished) = current {
        units.push(finished.finish());
    }
    Ok((header, units))
}
