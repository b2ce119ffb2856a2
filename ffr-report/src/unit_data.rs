//! 按熔丝展开的单元数据
//!
//! 以拆分表的行作为字段定义、ITF 完整熔丝串作为数据源运行字段映射，
//! 再与 QDF 期望值和 DFF 值比较得出每个单元的状态。

use std::collections::BTreeMap;
use std::path::Path;

use ffr_core::{
    binary_to_hex, hex_equals, is_binary_string, normalize_hex, FfrError, FieldMapper,
    MapperStats, UnitDataSource,
};
use ffr_parsers::FleFuseSet;
use log::info;
use serde::Serialize;

use crate::breakdown::{breakdown_headers, Breakdown, BreakdownRow};
use crate::csv_writer::CsvReport;
use crate::dff_check::DffTable;

/// 单元状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum UnitStatus {
    Sort,
    Fle,
    Dynamic,
    Static,
    Mismatch,
}

impl UnitStatus {
    pub fn label(self) -> &'static str {
        match self {
            UnitStatus::Sort => "sort",
            UnitStatus::Fle => "FLE",
            UnitStatus::Dynamic => "dynamic",
            UnitStatus::Static => "static",
            UnitStatus::Mismatch => "!mismatch!",
        }
    }
}

/// DFF 值的十六进制候选：`0X` 前缀按原样；否则依次尝试二进制、十六进制、十进制
fn dff_candidates(dff: &str) -> Vec<String> {
    let dff = dff.trim();
    if dff.is_empty() {
        return Vec::new();
    }
    if dff.to_ascii_uppercase().starts_with("0X") {
        return vec![normalize_hex(dff)];
    }

    let mut candidates = Vec::new();
    if is_binary_string(dff) {
        candidates.push(normalize_hex(&binary_to_hex(dff)));
    }
    if dff.bytes().all(|b| b.is_ascii_hexdigit()) {
        candidates.push(normalize_hex(dff));
    }
    if dff.bytes().all(|b| b.is_ascii_digit()) {
        if let Ok(value) = dff.parse::<u128>() {
            candidates.push(format!("{value:X}"));
        }
    }
    candidates
}

/// 选取与 ITF 值相等的候选，否则取第一个
fn dff_as_hex(dff: &str, itf_hex: &str) -> Option<String> {
    let candidates = dff_candidates(dff);
    candidates
        .iter()
        .find(|candidate| hex_equals(candidate, itf_hex))
        .or_else(|| candidates.first())
        .cloned()
}

/// QDF 十六进制与 ITF 十六进制比较
fn qdf_status(qdf_hex: &str, itf_hex: Option<&str>) -> UnitStatus {
    match itf_hex {
        Some(itf_hex) if qdf_hex != "N/A" && hex_equals(qdf_hex, itf_hex) => UnitStatus::Static,
        _ => UnitStatus::Mismatch,
    }
}

/// 计算单元状态
///
/// # 参数
/// - `dff`: DFF 值单元格（没有 DFF 数据时为 None）
/// - `qdf_hex`: 主 QDF 的十六进制单元格
/// - `itf_hex`: ITF 十六进制值，未解析时为 None
pub fn status_check(dff: Option<&str>, qdf_hex: &str, itf_hex: Option<&str>) -> UnitStatus {
    match (dff, itf_hex) {
        (Some("sort-skip"), _) => UnitStatus::Sort,
        (Some("FLE"), _) => UnitStatus::Fle,
        (Some(dff), Some(itf)) if dff != "N/A" => match dff_as_hex(dff, itf) {
            Some(candidate) if hex_equals(&candidate, itf) => UnitStatus::Dynamic,
            _ => qdf_status(qdf_hex, itf_hex),
        },
        _ => qdf_status(qdf_hex, itf_hex),
    }
}

/// 单元格 DFF 值：sort 位优先，再按熔丝组名、熔丝名查找，最后检查 FLE
fn dff_value(row: &BreakdownRow, sort_skip: bool, visual_id: &str, dff: &DffTable, fle: &FleFuseSet) -> String {
    if sort_skip {
        return "sort-skip".to_string();
    }
    let register = &row.register;
    let value = dff
        .get(visual_id, &format!("{}|{register}", row.fuse_group()))
        .or_else(|| dff.get(visual_id, &format!("{}|{register}", row.fuse_name())))
        .unwrap_or("N/A");
    if value == "N/A" && fle.contains_any(row.fuse_group(), row.fuse_name()) {
        return "FLE".to_string();
    }
    value.to_string()
}

/// 单元数据统计
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UnitDataStats {
    pub units: usize,
    pub rows: usize,
    pub with_dff: bool,
    /// visualID -> 状态 -> 数量
    pub status_counts: BTreeMap<String, BTreeMap<String, usize>>,
    pub mapper: MapperStats,
}

/// 单元数据表
#[derive(Debug, Clone, Default)]
pub struct UnitDataTable {
    pub visual_ids: Vec<String>,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub stats: UnitDataStats,
}

/// 生成单元数据表
///
/// # 参数
/// - `breakdown`: sspec 拆分结果，第一个 QDF 作为比较基准
/// - `source`: ITF 完整熔丝串
/// - `visual_ids`: 排序后的单元列表
/// - `dff`: DFF 检查得到的值表；为空时不输出 DFF 列
/// - `fle`: FLE 熔丝集合
pub fn build_unit_data<S: UnitDataSource + ?Sized>(
    breakdown: &Breakdown,
    source: &S,
    visual_ids: &[String],
    dff: Option<&DffTable>,
    fle: &FleFuseSet,
) -> UnitDataTable {
    let dff = dff.filter(|table| !table.is_empty());
    let mut table = UnitDataTable {
        visual_ids: visual_ids.to_vec(),
        headers: breakdown_headers(&breakdown.qdfs),
        ..Default::default()
    };
    for visual_id in visual_ids {
        table.headers.push(format!("{visual_id}_ITF_binaryValue"));
        table.headers.push(format!("{visual_id}_ITF_hexValue"));
        if dff.is_some() {
            table.headers.push(format!("{visual_id}_DFF_value"));
        }
        table.headers.push(format!("{visual_id}_StatusCheck"));
    }

    let mut mapper = FieldMapper::new(source);
    for row in &breakdown.rows {
        let mut cells = row.cells();
        let field = row.field_definition();
        let primary = row.cells.first();
        let qdf_hex = primary.map(|cell| cell.hex.as_str()).unwrap_or("N/A");
        let sort_skip = primary.is_some_and(|cell| cell.has_sort_bits());

        for visual_id in visual_ids {
            let value = field
                .as_ref()
                .map(|field| mapper.resolve(field, visual_id))
                .unwrap_or_default();
            let itf_hex = (!value.hex.is_empty()).then(|| format!("0X{}", normalize_hex(&value.hex)));

            cells.push(if value.is_resolved() {
                format!("b{}", value.binary)
            } else {
                "N/A".to_string()
            });
            cells.push(itf_hex.clone().unwrap_or_else(|| "N/A".to_string()));

            let dff_cell = dff.map(|dff| dff_value(row, sort_skip, visual_id, dff, fle));
            if let Some(dff_cell) = &dff_cell {
                cells.push(dff_cell.clone());
            }

            let status = status_check(dff_cell.as_deref(), qdf_hex, itf_hex.as_deref());
            *table
                .stats
                .status_counts
                .entry(visual_id.clone())
                .or_default()
                .entry(status.label().to_string())
                .or_default() += 1;
            cells.push(status.label().to_string());
        }
        table.rows.push(cells);
    }

    table.stats.units = visual_ids.len();
    table.stats.rows = table.rows.len();
    table.stats.with_dff = dff.is_some();
    table.stats.mapper = mapper.stats();
    info!(
        "Unit data: {} rows for {} units ({} register values decoded)",
        table.stats.rows, table.stats.units, table.stats.mapper.decoded_pairs
    );
    table
}

/// 写出 `S_UnitData_by_Fuse_<name>.csv`
pub fn write_unit_data_csv(path: &Path, table: &UnitDataTable) -> Result<usize, FfrError> {
    let mut report = CsvReport::create(path, &table.headers)?;
    for row in &table.rows {
        report.write_row(row)?;
    }
    report.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::breakdown::build_breakdown;
    use crate::dff_check::check_units;
    use ffr_parsers::{FuseDefRow, MtlOlfRow, SspecEntry, UbeParser};
    use std::collections::HashMap;

    #[test]
    fn test_dff_candidates() {
        assert_eq!(dff_candidates("0x0027"), vec!["27"]);
        assert_eq!(dff_candidates("10"), vec!["2", "10", "A"]);
        assert_eq!(dff_candidates("1F"), vec!["1F"]);
        assert!(dff_candidates("").is_empty());
        assert_eq!(dff_as_hex("10", "0XA").as_deref(), Some("A"));
        assert_eq!(dff_as_hex("10", "0X7").as_deref(), Some("2"));
    }

    #[test]
    fn test_status_check() {
        assert_eq!(status_check(Some("sort-skip"), "Q", None), UnitStatus::Sort);
        assert_eq!(status_check(Some("FLE"), "0X1", Some("0X1")), UnitStatus::Fle);
        assert_eq!(status_check(Some("39"), "0X0", Some("0X27")), UnitStatus::Dynamic);
        assert_eq!(status_check(Some("5"), "0X27", Some("0X27")), UnitStatus::Static);
        assert_eq!(status_check(Some("5"), "Q", Some("0X27")), UnitStatus::Mismatch);
        assert_eq!(status_check(Some("N/A"), "0X027", Some("0X27")), UnitStatus::Static);
        assert_eq!(status_check(None, "0X27", None), UnitStatus::Mismatch);
        assert_eq!(status_check(None, "N/A", Some("0X0")), UnitStatus::Mismatch);
    }

    fn breakdown() -> Breakdown {
        let entries = vec![SspecEntry {
            register: "CPU0".to_string(),
            qdf: "L0V8".to_string(),
            fuse_string: "ss00mmmm00100111".to_string(),
            line_number: 1,
        }];
        let fuse = |group: &str, name: &str, start: &str, end: &str| FuseDefRow {
            register_name: "CPU0".to_string(),
            fuse_group_name: group.to_string(),
            fuse_name: name.to_string(),
            start_address: start.to_string(),
            end_address: end.to_string(),
        };
        let fuses = vec![
            fuse("core", "core_disable", "0", "7"),
            fuse("ratio", "ratio_bits", "8", "11"),
            fuse("lock", "lock_bits", "12", "15"),
        ];
        build_breakdown(&entries, &fuses, &["L0V8".to_string()])
    }

    fn itf_source() -> HashMap<(String, String), String> {
        HashMap::from([
            (("V1".to_string(), "CPU0".to_string()), "0001010100100111".to_string()),
            (("V2".to_string(), "CPU0".to_string()), "A8B2A2B4".to_string()),
        ])
    }

    #[test]
    fn test_unit_data_without_dff() {
        let ids = vec!["V1".to_string(), "V2".to_string(), "V3".to_string()];
        let table = build_unit_data(&breakdown(), &itf_source(), &ids, None, &FleFuseSet::new());

        assert_eq!(table.headers.len(), 9 + 3 * 3);
        assert_eq!(table.headers[9], "V1_ITF_binaryValue");
        assert_eq!(table.headers[11], "V1_StatusCheck");

        let core = &table.rows[0];
        assert_eq!(&core[9..12], ["b00100111", "0X27", "static"]);
        // V2 = 0000000011001111
        assert_eq!(&core[12..15], ["b11001111", "0XCF", "!mismatch!"]);
        assert_eq!(&core[15..18], ["N/A", "N/A", "!mismatch!"]);

        assert_eq!(table.stats.status_counts["V1"]["static"], 1);
        assert_eq!(table.stats.mapper.decoded_pairs, 2);
    }

    #[test]
    fn test_unit_data_with_dff_and_fle() {
        let mut tokens = Vec::new();
        for (name, fuse) in [("TOK_CORE", "core"), ("TOK_RATIO", "ratio_bits")] {
            let mut row = MtlOlfRow {
                field_name_seq: 1,
                fuse_name: fuse.to_string(),
                fuse_register: "CPU0".to_string(),
                ..Default::default()
            };
            row.token.token_name = name.to_string();
            row.token.ref_level = "CLASS".to_string();
            tokens.push(row);
        }
        let records = UbeParser::new()
            .parse_reader("UNIT,V1\nCLASS,FT,TOK_CORE=39,TOK_RATIO=0x5\n".as_bytes())
            .unwrap();
        let check = check_units(&tokens, &records);

        let mut fle = FleFuseSet::new();
        fle.insert("Lock");

        let ids = vec!["V1".to_string()];
        let table = build_unit_data(&breakdown(), &itf_source(), &ids, Some(&check.table), &fle);
        assert_eq!(table.headers.len(), 9 + 4);
        assert_eq!(table.headers[11], "V1_DFF_value");

        // 熔丝组名命中 DFF，十进制 39 == 0X27
        assert_eq!(&table.rows[0][9..], ["b00100111", "0X27", "39", "dynamic"]);
        // 主 QDF 截取位含 m 但不含 s，按熔丝名命中 DFF
        assert_eq!(&table.rows[1][9..], ["b0101", "0X5", "0x5", "dynamic"]);
        // sort 位优先于 FLE
        assert_eq!(table.rows[2][11], "sort-skip");
        assert_eq!(table.rows[2][12], "sort");
    }

    #[test]
    fn test_fle_when_dff_missing() {
        let mut fle = FleFuseSet::new();
        fle.insert("RATIO");
        let dff = check_units(&[], &[]).table;
        assert!(dff.is_empty());

        let breakdown = breakdown();
        let row = &breakdown.rows[1];
        assert_eq!(dff_value(row, false, "V1", &dff, &fle), "FLE");
        assert_eq!(dff_value(row, true, "V1", &dff, &fle), "sort-skip");
        assert_eq!(dff_value(&breakdown.rows[0], false, "V1", &dff, &fle), "N/A");
    }
}
