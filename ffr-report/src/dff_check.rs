//! DFF 单元数据检查
//!
//! 按 `令牌|ref_level` 查找 UBE 令牌值，找不到时退回 `令牌|WFR|<MDPOSITION>`；
//! 取值按 `|` 拆分后按 `field_name_seq` 取对应字段。

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;

use ffr_core::FfrError;
use ffr_parsers::{MtlOlfRow, UbeRecord};
use log::info;
use serde::Serialize;

use crate::csv_writer::CsvReport;
use crate::echo::{mtl_cells, GLOBAL_TYPE_COLUMN, MTL_COLUMNS};

const INVALID_VALUE: &str = "-999";

/// 令牌值查找表：键 -> visualID -> 令牌值（后出现者覆盖）
struct UbeLookup<'u> {
    by_ref_level: HashMap<String, HashMap<&'u str, &'u str>>,
    by_mdposition: HashMap<String, HashMap<&'u str, &'u str>>,
    visual_ids: BTreeSet<&'u str>,
}

impl<'u> UbeLookup<'u> {
    fn new(records: &'u [UbeRecord]) -> Self {
        let mut lookup = Self {
            by_ref_level: HashMap::new(),
            by_mdposition: HashMap::new(),
            visual_ids: BTreeSet::new(),
        };
        for record in records {
            let visual_id = record.visual_id.as_str();
            lookup.visual_ids.insert(visual_id);
            lookup
                .by_ref_level
                .entry(format!("{}|{}", record.token_name, record.ref_level))
                .or_default()
                .insert(visual_id, &record.token_value);

            if record.ref_level.to_uppercase().contains("WFR") && !record.mdposition.is_empty() {
                lookup
                    .by_mdposition
                    .entry(format!("{}|WFR|{}", record.token_name, record.mdposition))
                    .or_default()
                    .insert(visual_id, &record.token_value);
            }
        }
        lookup
    }

    fn values_for(&self, token: &MtlOlfRow) -> Option<&HashMap<&'u str, &'u str>> {
        let name = &token.token.token_name;
        let ref_level = &token.token.ref_level;
        self.by_ref_level
            .get(&format!("{name}|{ref_level}"))
            .filter(|values| !values.is_empty())
            .or_else(|| self.by_mdposition.get(&format!("{name}|WFR|{ref_level}")))
    }
}

/// 从 `|` 分隔的令牌值中取第 `seq` 个字段；序号 0 取第一个字段
fn field_value(token_value: &str, seq: usize) -> Option<&str> {
    token_value.split('|').nth(seq.saturating_sub(1)).map(str::trim)
}

/// DFF 值表：visualID -> `熔丝名|寄存器` -> 值
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DffTable {
    values: HashMap<String, HashMap<String, String>>,
}

impl DffTable {
    pub fn get(&self, visual_id: &str, key: &str) -> Option<&str> {
        self.values
            .get(visual_id)
            .and_then(|values| values.get(key))
            .map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.values.values().all(HashMap::is_empty)
    }

    fn insert(&mut self, visual_id: &str, key: String, value: String) {
        self.values
            .entry(visual_id.to_string())
            .or_default()
            .insert(key, value);
    }
}

/// 单个寄存器的检查统计
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DffRegisterStats {
    pub total_tokens: usize,
    pub missing_tokens: usize,
    pub invalid_tokens: usize,
}

/// DFF 检查统计
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DffStats {
    pub total_rows: usize,
    pub visual_ids: usize,
    pub total_missing: usize,
    pub total_invalid: usize,
    pub per_register: BTreeMap<String, DffRegisterStats>,
    /// `寄存器|令牌` -> 缺失次数
    pub missing_by_token: BTreeMap<String, usize>,
    /// `寄存器|令牌` -> `-999` 次数
    pub invalid_by_token: BTreeMap<String, usize>,
}

/// 检查结果
#[derive(Debug, Clone, Default)]
pub struct DffCheck {
    /// 排序后的 visualID
    pub visual_ids: Vec<String>,
    /// 每个令牌行在各 visualID 上的取值，顺序与 `visual_ids` 一致
    pub values: Vec<Vec<String>>,
    pub table: DffTable,
    pub stats: DffStats,
}

/// 对全部令牌行执行检查
pub fn check_units(tokens: &[MtlOlfRow], records: &[UbeRecord]) -> DffCheck {
    let lookup = UbeLookup::new(records);
    let visual_ids: Vec<String> = lookup.visual_ids.iter().map(|id| id.to_string()).collect();
    let mut check = DffCheck {
        stats: DffStats {
            visual_ids: visual_ids.len(),
            ..Default::default()
        },
        ..Default::default()
    };

    for token in tokens {
        let register = token.fuse_register.as_str();
        let token_key = format!("{register}|{}", token.token.token_name);
        let values = lookup.values_for(token);
        let register_stats = check.stats.per_register.entry(register.to_string()).or_default();
        register_stats.total_tokens += 1;

        let mut row = Vec::with_capacity(visual_ids.len());
        for visual_id in &visual_ids {
            let value = values
                .and_then(|values| values.get(visual_id.as_str()))
                .and_then(|token_value| field_value(token_value, token.field_name_seq));

            let cell = match value {
                Some(value) => {
                    if value == INVALID_VALUE {
                        register_stats.invalid_tokens += 1;
                        *check.stats.invalid_by_token.entry(token_key.clone()).or_default() += 1;
                    }
                    value.to_string()
                }
                None => {
                    register_stats.missing_tokens += 1;
                    *check.stats.missing_by_token.entry(token_key.clone()).or_default() += 1;
                    "N/A".to_string()
                }
            };

            if !token.fuse_name.is_empty() && !register.is_empty() {
                check.table.insert(
                    visual_id,
                    format!("{}|{register}", token.fuse_name),
                    cell.clone(),
                );
            }
            row.push(cell);
        }
        check.values.push(row);
    }

    check.stats.total_rows = tokens.len();
    check.stats.total_missing = check.stats.per_register.values().map(|s| s.missing_tokens).sum();
    check.stats.total_invalid = check.stats.per_register.values().map(|s| s.invalid_tokens).sum();
    check.visual_ids = visual_ids;
    check
}

impl DffStats {
    pub fn log_summary(&self) {
        info!("DFF unit data check: {} rows", self.total_rows);
        info!("  Total missing tokens: {}", self.total_missing);
        info!("  Total invalid tokens (-999): {}", self.total_invalid);
        for (register, stats) in &self.per_register {
            info!(
                "  {register}: {} tokens, {} missing, {} invalid",
                stats.total_tokens, stats.missing_tokens, stats.invalid_tokens
            );
        }
    }
}

/// 写出 `xfuse-dff-unitData-check_<name>.csv`
pub fn write_dff_csv(path: &Path, tokens: &[MtlOlfRow], check: &DffCheck) -> Result<usize, FfrError> {
    let mut headers: Vec<&str> = MTL_COLUMNS.to_vec();
    headers.push(GLOBAL_TYPE_COLUMN);
    headers.extend(check.visual_ids.iter().map(String::as_str));

    let mut report = CsvReport::create(path, &headers)?;
    for (token, values) in tokens.iter().zip(&check.values) {
        let mut cells = mtl_cells(token);
        cells.push(token.token.global_type.clone());
        cells.extend(values.iter().cloned());
        report.write_row(cells)?;
    }
    report.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ffr_parsers::UbeParser;

    const UBE: &str = "\
UNIT,V2
CLASS,FT,TOK_A=5|-999|7
WFR,SORT,MDPOSITION=P1,TOK_W=1|0
UNIT,V1
CLASS,FT,TOK_A=1|2
";

    fn token(name: &str, ref_level: &str, seq: usize, fuse: &str) -> MtlOlfRow {
        let mut row = MtlOlfRow {
            field_name_seq: seq,
            fuse_name: fuse.to_string(),
            fuse_register: "CPU0".to_string(),
            ..Default::default()
        };
        row.token.token_name = name.to_string();
        row.token.ref_level = ref_level.to_string();
        row
    }

    fn records() -> Vec<UbeRecord> {
        UbeParser::new().parse_reader(UBE.as_bytes()).unwrap()
    }

    #[test]
    fn test_field_values_per_visual_id() {
        let tokens = vec![
            token("TOK_A", "CLASS", 2, "core"),
            token("TOK_A", "CLASS", 3, "ratio"),
        ];
        let check = check_units(&tokens, &records());
        assert_eq!(check.visual_ids, vec!["V1", "V2"]);
        assert_eq!(check.values[0], vec!["2", "-999"]);
        assert_eq!(check.values[1], vec!["N/A", "7"]);

        assert_eq!(check.stats.total_invalid, 1);
        assert_eq!(check.stats.total_missing, 1);
        assert_eq!(check.stats.invalid_by_token["CPU0|TOK_A"], 1);
        assert_eq!(check.table.get("V2", "ratio|CPU0"), Some("7"));
        assert_eq!(check.table.get("V1", "ratio|CPU0"), Some("N/A"));
    }

    #[test]
    fn test_mdposition_fallback_and_seq_zero() {
        let tokens = vec![token("TOK_W", "P1", 0, ""), token("TOK_X", "CLASS", 1, "x")];
        let check = check_units(&tokens, &records());
        assert_eq!(check.values[0], vec!["N/A", "1"]);
        assert_eq!(check.values[1], vec!["N/A", "N/A"]);
        assert_eq!(check.stats.per_register["CPU0"].missing_tokens, 3);
        // 没有熔丝名的行不进入 DFF 值表
        assert!(check.table.get("V2", "|CPU0").is_none());
    }

    #[test]
    fn test_write_dff_csv_headers() {
        let tokens = vec![token("TOK_A", "CLASS", 1, "core")];
        let check = check_units(&tokens, &records());
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dff.csv");
        write_dff_csv(&path, &tokens, &check).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let header = text.trim_start_matches('\u{feff}').lines().next().unwrap();
        assert!(header.ends_with("global_type_MTL,V1,V2"));
    }
}
