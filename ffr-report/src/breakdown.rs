//! sspec 熔丝串拆分
//!
//! 对每个 sspec 寄存器（按首次出现顺序），用该寄存器的 fuseDef 行从各 QDF 的
//! 熔丝串中截取熔丝位。熔丝串可含 `m`/`s` 等非二进制字符，此时十六进制列为 `Q`。

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;

use ffr_core::{
    analyze_fuse_string, binary_to_hex, extract_segments, is_binary_string, normalize_hex,
    FfrError, FieldDefinition, FuseStringProfile,
};
use ffr_parsers::{FuseDefRow, SspecEntry};
use log::{info, warn};
use serde::Serialize;

use crate::csv_writer::CsvReport;
use crate::percent;

/// 统计未使用空间的熔丝名
const VF_HEAP_UNUSED: &str = "VF_Heap_Unused";

pub const BREAKDOWN_COLUMNS: [&str; 7] = [
    "RegisterName",
    "RegisterName_fuseDef",
    "FuseGroup_Name_fuseDef",
    "Fuse_Name_fuseDef",
    "StartAddress_fuseDef",
    "EndAddress_fuseDef",
    "bit_length",
];

/// 一个 QDF 上的截取结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QdfCell {
    /// `b<bits>` 或 `N/A`
    pub binary: String,
    /// `0X<hex>` 或 `Q`
    pub hex: String,
}

impl QdfCell {
    fn from_bits(bits: &str) -> Self {
        let binary = if bits.is_empty() {
            "N/A".to_string()
        } else {
            format!("b{bits}")
        };
        let hex = if is_binary_string(bits) {
            format!("0X{}", normalize_hex(&binary_to_hex(bits)))
        } else {
            "Q".to_string()
        };
        Self { binary, hex }
    }

    fn unavailable() -> Self {
        Self {
            binary: "N/A".to_string(),
            hex: "Q".to_string(),
        }
    }

    /// 截取位中含 sort 标记
    pub fn has_sort_bits(&self) -> bool {
        self.binary != "N/A" && self.binary[1..].contains(['s', 'S'])
    }
}

/// 拆分表中的一行
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BreakdownRow {
    /// sspec 中的寄存器名
    pub register: String,
    /// 对应的 fuseDef 行；寄存器没有 fuseDef 定义时为 None
    pub fuse: Option<FuseDefRow>,
    /// 第一个非零截取长度
    pub bit_length: usize,
    /// 与 QDF 列表顺序一致
    pub cells: Vec<QdfCell>,
}

impl BreakdownRow {
    pub fn field_definition(&self) -> Option<FieldDefinition> {
        self.fuse.as_ref().and_then(FuseDefRow::to_field_definition)
    }

    pub fn fuse_group(&self) -> &str {
        self.fuse
            .as_ref()
            .map(|fuse| fuse.fuse_group_name.as_str())
            .unwrap_or_default()
    }

    pub fn fuse_name(&self) -> &str {
        self.fuse
            .as_ref()
            .map(|fuse| fuse.fuse_name.as_str())
            .unwrap_or_default()
    }

    /// 前 7 列
    pub fn base_cells(&self) -> Vec<String> {
        let mut cells = vec![self.register.clone()];
        match &self.fuse {
            Some(fuse) => cells.extend([
                fuse.register_name.clone(),
                fuse.fuse_group_name.clone(),
                fuse.fuse_name.clone(),
                fuse.start_address.clone(),
                fuse.end_address.clone(),
            ]),
            None => cells.extend(std::iter::repeat("N/A".to_string()).take(5)),
        }
        cells.push(self.bit_length.to_string());
        cells
    }

    pub fn cells(&self) -> Vec<String> {
        let mut cells = self.base_cells();
        for cell in &self.cells {
            cells.push(cell.binary.clone());
            cells.push(cell.hex.clone());
        }
        cells
    }
}

/// 寄存器在单个 QDF 上的统计
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RegisterQdfStats {
    pub fuse_definitions: usize,
    pub valid_extractions: usize,
    pub valid_hex: usize,
    pub failed_hex: usize,
    pub total_bit_length: usize,
    pub vf_heap_unused_bit_length: usize,
    /// 占寄存器长度的百分比
    pub vf_heap_unused_percentage: f64,
    pub profile: Option<FuseStringProfile>,
}

impl RegisterQdfStats {
    fn new(fuse_string: &str) -> Self {
        Self {
            profile: analyze_fuse_string(fuse_string),
            ..Default::default()
        }
    }

    fn finish(&mut self) {
        self.vf_heap_unused_percentage = match self.profile {
            Some(profile) if profile.register_size > 0 => {
                percent(self.vf_heap_unused_bit_length, profile.register_size)
            }
            _ => 0.0,
        };
    }

    pub fn valid_extractions_percent(&self) -> f64 {
        percent(self.valid_extractions, self.fuse_definitions)
    }

    pub fn valid_hex_percent(&self) -> f64 {
        percent(self.valid_hex, self.fuse_definitions)
    }

    pub fn failed_hex_percent(&self) -> f64 {
        percent(self.failed_hex, self.fuse_definitions)
    }
}

/// 拆分统计
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BreakdownStats {
    pub total_rows: usize,
    pub unique_registers: usize,
    pub unique_fuse_names: usize,
    pub qdfs: Vec<String>,
    /// 寄存器（首次出现顺序） -> QDF -> 统计
    pub registers: Vec<(String, BTreeMap<String, RegisterQdfStats>)>,
}

/// 拆分结果
#[derive(Debug, Clone, Default)]
pub struct Breakdown {
    pub qdfs: Vec<String>,
    pub rows: Vec<BreakdownRow>,
    pub stats: BreakdownStats,
}

/// 按寄存器分组 sspec 条目：寄存器首次出现顺序，同一 QDF 后者覆盖
fn group_by_register(entries: &[SspecEntry]) -> Vec<(&str, HashMap<&str, &str>)> {
    let mut order: Vec<&str> = Vec::new();
    let mut groups: HashMap<&str, HashMap<&str, &str>> = HashMap::new();
    for entry in entries {
        let register = entry.register.as_str();
        groups
            .entry(register)
            .or_insert_with(|| {
                order.push(register);
                HashMap::new()
            })
            .insert(entry.qdf.as_str(), entry.fuse_string.as_str());
    }
    order
        .into_iter()
        .filter_map(|register| groups.remove(register).map(|qdfs| (register, qdfs)))
        .collect()
}

/// 生成拆分表
pub fn build_breakdown(entries: &[SspecEntry], fuse_rows: &[FuseDefRow], qdfs: &[String]) -> Breakdown {
    let mut by_register: HashMap<&str, Vec<&FuseDefRow>> = HashMap::new();
    for row in fuse_rows {
        by_register.entry(row.register_name.as_str()).or_default().push(row);
    }

    let mut breakdown = Breakdown {
        qdfs: qdfs.to_vec(),
        ..Default::default()
    };

    for (register, fuse_strings) in group_by_register(entries) {
        let Some(definitions) = by_register.get(register) else {
            warn!("No fuseDef entries found for register '{register}'");
            breakdown.rows.push(BreakdownRow {
                register: register.to_string(),
                fuse: None,
                bit_length: 0,
                cells: qdfs.iter().map(|_| QdfCell::unavailable()).collect(),
            });
            continue;
        };
        info!(
            "Register {register}: {} fuseDef entries, QDFs {:?}",
            definitions.len(),
            fuse_strings.keys().collect::<BTreeSet<_>>()
        );

        let mut register_stats: BTreeMap<String, RegisterQdfStats> = BTreeMap::new();
        for fuse in definitions {
            let segments = fuse.to_field_definition().map(|field| field.segments);
            let mut row = BreakdownRow {
                register: register.to_string(),
                fuse: Some((*fuse).clone()),
                bit_length: 0,
                cells: Vec::with_capacity(qdfs.len()),
            };

            for qdf in qdfs {
                let Some(fuse_string) = fuse_strings.get(qdf.as_str()) else {
                    row.cells.push(QdfCell::unavailable());
                    continue;
                };
                let bits = segments
                    .as_deref()
                    .map(|segments| extract_segments(fuse_string, segments))
                    .unwrap_or_default();
                let cell = QdfCell::from_bits(&bits);
                if row.bit_length == 0 {
                    row.bit_length = bits.len();
                }

                let stats = register_stats
                    .entry(qdf.clone())
                    .or_insert_with(|| RegisterQdfStats::new(fuse_string));
                stats.fuse_definitions += 1;
                stats.total_bit_length += bits.len();
                if fuse.fuse_name == VF_HEAP_UNUSED {
                    stats.vf_heap_unused_bit_length += bits.len();
                }
                if cell.binary != "N/A" {
                    stats.valid_extractions += 1;
                }
                if cell.hex == "Q" {
                    stats.failed_hex += 1;
                } else {
                    stats.valid_hex += 1;
                }
                row.cells.push(cell);
            }
            breakdown.rows.push(row);
        }

        register_stats.values_mut().for_each(RegisterQdfStats::finish);
        breakdown
            .stats
            .registers
            .push((register.to_string(), register_stats));
    }

    let registers: BTreeSet<&str> = breakdown.rows.iter().map(|row| row.register.as_str()).collect();
    let fuse_names: BTreeSet<&str> = breakdown
        .rows
        .iter()
        .filter(|row| row.fuse.is_some())
        .map(BreakdownRow::fuse_name)
        .collect();
    breakdown.stats.total_rows = breakdown.rows.len();
    breakdown.stats.unique_registers = registers.len();
    breakdown.stats.unique_fuse_names = fuse_names.len();
    breakdown.stats.qdfs = qdfs.to_vec();
    breakdown
}

/// 拆分表表头
pub fn breakdown_headers(qdfs: &[String]) -> Vec<String> {
    let mut headers: Vec<String> = BREAKDOWN_COLUMNS.iter().map(|h| h.to_string()).collect();
    for qdf in qdfs {
        headers.push(format!("{qdf}_binaryValue"));
        headers.push(format!("{qdf}_hexValue"));
    }
    headers
}

/// 写出 `xsplit-sspec_<qdfs>_<name>.csv`
pub fn write_breakdown_csv(path: &Path, breakdown: &Breakdown) -> Result<usize, FfrError> {
    let mut report = CsvReport::create(path, &breakdown_headers(&breakdown.qdfs))?;
    for row in &breakdown.rows {
        report.write_row(row.cells())?;
    }
    report.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(register: &str, qdf: &str, fuse_string: &str) -> SspecEntry {
        SspecEntry {
            register: register.to_string(),
            qdf: qdf.to_string(),
            fuse_string: fuse_string.to_string(),
            line_number: 1,
        }
    }

    fn fuse(register: &str, name: &str, start: &str, end: &str) -> FuseDefRow {
        FuseDefRow {
            register_name: register.to_string(),
            fuse_group_name: format!("{name}_group"),
            fuse_name: name.to_string(),
            start_address: start.to_string(),
            end_address: end.to_string(),
        }
    }

    fn qdfs() -> Vec<String> {
        vec!["L0V8".to_string(), "L0VS".to_string()]
    }

    fn sample() -> Breakdown {
        let entries = vec![
            entry("HUB", "L0V8", "1111"),
            entry("CPU0", "L0V8", "0000mmss00100111"),
            entry("CPU0", "L0VS", "0000000000000011"),
        ];
        let fuses = vec![
            fuse("CPU0", "core_disable", "0", "7"),
            fuse("CPU0", "sorted", "8", "11"),
            fuse("CPU0", VF_HEAP_UNUSED, "12", "15"),
            fuse("CPU0", "beyond", "16", "20"),
        ];
        build_breakdown(&entries, &fuses, &qdfs())
    }

    #[test]
    fn test_register_without_fusedef() {
        let breakdown = sample();
        let hub = &breakdown.rows[0];
        assert_eq!(hub.register, "HUB");
        assert_eq!(
            hub.cells(),
            vec!["HUB", "N/A", "N/A", "N/A", "N/A", "N/A", "0", "N/A", "Q", "N/A", "Q"]
        );
    }

    #[test]
    fn test_cells_per_qdf() {
        let breakdown = sample();
        let core = &breakdown.rows[1];
        assert_eq!(core.bit_length, 8);
        assert_eq!(core.cells[0].binary, "b00100111");
        assert_eq!(core.cells[0].hex, "0X27");
        assert_eq!(core.cells[1].hex, "0X3");

        let sorted = &breakdown.rows[2];
        assert_eq!(sorted.cells[0].binary, "bmmss");
        assert_eq!(sorted.cells[0].hex, "Q");
        assert!(sorted.cells[0].has_sort_bits());
        assert_eq!(sorted.cells[1].hex, "0X0");

        // 地址越界：N/A 与 Q
        let beyond = &breakdown.rows[4];
        assert_eq!(beyond.bit_length, 0);
        assert_eq!(beyond.cells[0], QdfCell::unavailable());
    }

    #[test]
    fn test_register_qdf_stats() {
        let breakdown = sample();
        assert_eq!(breakdown.stats.total_rows, 5);
        assert_eq!(breakdown.stats.unique_registers, 2);
        assert_eq!(breakdown.stats.unique_fuse_names, 4);

        let (register, stats) = &breakdown.stats.registers[0];
        assert_eq!(register, "CPU0");
        let l0v8 = &stats["L0V8"];
        assert_eq!(l0v8.fuse_definitions, 4);
        assert_eq!(l0v8.valid_extractions, 3);
        assert_eq!(l0v8.valid_hex, 2);
        assert_eq!(l0v8.failed_hex, 2);
        assert_eq!(l0v8.total_bit_length, 16);
        assert_eq!(l0v8.vf_heap_unused_bit_length, 4);
        assert_eq!(l0v8.vf_heap_unused_percentage, 25.0);
        let profile = l0v8.profile.unwrap();
        assert_eq!((profile.static_bits, profile.dynamic_bits, profile.sort_bits), (12, 2, 2));
    }

    #[test]
    fn test_headers() {
        let headers = breakdown_headers(&qdfs());
        assert_eq!(headers.len(), 11);
        assert_eq!(headers[7], "L0V8_binaryValue");
        assert_eq!(headers[10], "L0VS_hexValue");
    }
}
