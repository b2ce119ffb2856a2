//! fuseDef 与 MTL_OLF 匹配检查
//!
//! 寄存器索引保留第一条，熔丝组名/熔丝名索引保留最后一条；熔丝名命中优先于熔丝组名。

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use ffr_core::FfrError;
use ffr_parsers::{FuseDefRow, MtlOlfRow};
use log::info;
use serde::Serialize;

use crate::csv_writer::CsvReport;
use crate::echo::{mtl_cells, MTL_COLUMNS};
use crate::percent;

const MATCH_COLUMNS: [&str; 8] = [
    "RegisterName_fuseDef",
    "FuseGroup_Name_fuseDef",
    "Fuse_Name_fuseDef",
    "StartAddress_fuseDef",
    "EndAddress_fuseDef",
    "register_match",
    "fusegroup_match",
    "fusename_match",
];

/// fuseDef 查找索引
pub struct FuseDefIndex<'a> {
    by_register: HashMap<&'a str, &'a FuseDefRow>,
    by_group: HashMap<&'a str, &'a FuseDefRow>,
    by_fuse: HashMap<&'a str, &'a FuseDefRow>,
}

impl<'a> FuseDefIndex<'a> {
    pub fn new(rows: &'a [FuseDefRow]) -> Self {
        let mut index = Self {
            by_register: HashMap::new(),
            by_group: HashMap::new(),
            by_fuse: HashMap::new(),
        };
        for row in rows {
            let register = row.register_name.trim();
            if !register.is_empty() {
                index.by_register.entry(register).or_insert(row);
            }
            let group = row.fuse_group_name.trim();
            if !group.is_empty() {
                index.by_group.insert(group, row);
            }
            let fuse = row.fuse_name.trim();
            if !fuse.is_empty() {
                index.by_fuse.insert(fuse, row);
            }
        }
        info!(
            "Indices built: {} registers, {} fuse groups, {} fuse names",
            index.by_register.len(),
            index.by_group.len(),
            index.by_fuse.len()
        );
        index
    }

    /// 匹配一条令牌行
    pub fn match_row<'t>(&self, token: &'t MtlOlfRow) -> MatchRow<'t, 'a> {
        let register = token.fuse_register.trim();
        let fuse = token.fuse_name.trim();

        let register_row = (!register.is_empty())
            .then(|| self.by_register.get(register).copied())
            .flatten();
        let group_row = (!fuse.is_empty())
            .then(|| self.by_group.get(fuse).copied())
            .flatten();
        let fuse_name_row = (!fuse.is_empty())
            .then(|| self.by_fuse.get(fuse).copied())
            .flatten();

        MatchRow {
            token,
            register_row,
            fuse_row: fuse_name_row.or(group_row),
            register_match: register_row.is_some(),
            fusegroup_match: group_row.is_some(),
            fusename_match: fuse_name_row.is_some(),
        }
    }
}

/// 一条令牌行的匹配结果
#[derive(Debug, Clone)]
pub struct MatchRow<'t, 'a> {
    pub token: &'t MtlOlfRow,
    pub register_row: Option<&'a FuseDefRow>,
    pub fuse_row: Option<&'a FuseDefRow>,
    pub register_match: bool,
    pub fusegroup_match: bool,
    pub fusename_match: bool,
}

fn match_label(matched: bool) -> &'static str {
    if matched {
        "match"
    } else {
        "no-match"
    }
}

impl MatchRow<'_, '_> {
    fn fuse_cell(&self, matched: bool, value: impl Fn(&FuseDefRow) -> &str) -> String {
        match self.fuse_row {
            Some(row) if matched => value(row).to_string(),
            _ => "N/A".to_string(),
        }
    }

    fn address_cell(&self, value: impl Fn(&FuseDefRow) -> &str) -> String {
        self.fuse_row
            .or(self.register_row)
            .map(|row| value(row).to_string())
            .unwrap_or_default()
    }

    pub fn fuse_group_cell(&self) -> String {
        self.fuse_cell(self.fusegroup_match, |row| &row.fuse_group_name)
    }

    pub fn fuse_name_cell(&self) -> String {
        self.fuse_cell(self.fusename_match, |row| &row.fuse_name)
    }

    pub fn cells(&self) -> Vec<String> {
        let mut cells = mtl_cells(self.token);
        cells.push(
            self.register_row
                .map(|row| row.register_name.clone())
                .unwrap_or_default(),
        );
        cells.push(self.fuse_group_cell());
        cells.push(self.fuse_name_cell());
        cells.push(self.address_cell(|row| &row.start_address));
        cells.push(self.address_cell(|row| &row.end_address));
        cells.push(match_label(self.register_match).to_string());
        cells.push(match_label(self.fusegroup_match).to_string());
        cells.push(match_label(self.fusename_match).to_string());
        cells
    }
}

/// 不匹配记录
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MismatchEntry {
    pub token_name: String,
    pub field_name: String,
    pub module: String,
    pub fuse_register: String,
    pub fuse_name: String,
    pub first_socket_upload: String,
    pub ssid: String,
    pub ref_level: String,
}

impl From<&MtlOlfRow> for MismatchEntry {
    fn from(row: &MtlOlfRow) -> Self {
        Self {
            token_name: row.token.token_name.clone(),
            field_name: row.field_name.clone(),
            module: row.token.module.clone(),
            fuse_register: row.fuse_register.trim().to_string(),
            fuse_name: row.fuse_name.trim().to_string(),
            first_socket_upload: row.token.first_socket_upload.clone(),
            ssid: row.token.ssid.clone(),
            ref_level: row.token.ref_level.clone(),
        }
    }
}

/// 单个寄存器的不匹配汇总
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RegisterMismatchSummary {
    pub total_tokens: usize,
    pub register_mismatches: usize,
    pub fusegroup_mismatches: usize,
    pub fusename_mismatches: usize,
    /// 任一项不匹配的行数
    pub mismatch_tokens: usize,
}

/// 匹配统计
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MatchStats {
    pub total_rows: usize,
    pub register_matches: usize,
    pub fusegroup_matches: usize,
    pub fusename_matches: usize,
    pub fusegroup_na: usize,
    pub fusename_na: usize,
    pub register_mismatches: Vec<MismatchEntry>,
    pub fusegroup_mismatches: Vec<MismatchEntry>,
    pub fusename_mismatches: Vec<MismatchEntry>,
    /// 空寄存器计入 `N/A`
    pub per_register: BTreeMap<String, RegisterMismatchSummary>,
}

impl MatchStats {
    fn record(&mut self, row: &MatchRow<'_, '_>) {
        let token = row.token;
        let register = token.fuse_register.trim();
        let has_fuse = !token.fuse_name.trim().is_empty();

        self.total_rows += 1;
        self.register_matches += usize::from(row.register_match);
        self.fusegroup_matches += usize::from(row.fusegroup_match);
        self.fusename_matches += usize::from(row.fusename_match);
        self.fusegroup_na += usize::from(row.fuse_group_cell() == "N/A");
        self.fusename_na += usize::from(row.fuse_name_cell() == "N/A");

        let key = if register.is_empty() { "N/A" } else { register };
        let summary = self.per_register.entry(key.to_string()).or_default();
        summary.total_tokens += 1;

        let register_miss = !row.register_match && !register.is_empty();
        let group_miss = !row.fusegroup_match && has_fuse;
        let name_miss = !row.fusename_match && has_fuse;

        if register_miss {
            summary.register_mismatches += 1;
            self.register_mismatches.push(token.into());
        }
        if group_miss {
            summary.fusegroup_mismatches += 1;
            self.fusegroup_mismatches.push(token.into());
        }
        if name_miss {
            summary.fusename_mismatches += 1;
            self.fusename_mismatches.push(token.into());
        }
        if register_miss || group_miss || name_miss {
            summary.mismatch_tokens += 1;
        }
    }

    pub fn log_summary(&self) {
        let total = self.total_rows;
        info!("Match statistics: {total} rows");
        info!(
            "  Register matches: {} ({:.1}%)",
            self.register_matches,
            percent(self.register_matches, total)
        );
        info!(
            "  FuseGroup matches: {} ({:.1}%)",
            self.fusegroup_matches,
            percent(self.fusegroup_matches, total)
        );
        info!(
            "  FuseName matches: {} ({:.1}%)",
            self.fusename_matches,
            percent(self.fusename_matches, total)
        );
        info!(
            "  Mismatches: register {}, fuse group {}, fuse name {}",
            self.register_mismatches.len(),
            self.fusegroup_mismatches.len(),
            self.fusename_mismatches.len()
        );
        for (register, summary) in &self.per_register {
            info!(
                "  {register}: {} tokens, register {} / group {} / name {} mismatches",
                summary.total_tokens,
                summary.register_mismatches,
                summary.fusegroup_mismatches,
                summary.fusename_mismatches
            );
        }
    }
}

/// 匹配全部令牌行
pub fn match_rows<'t, 'a>(
    tokens: &'t [MtlOlfRow],
    fuse_rows: &'a [FuseDefRow],
) -> (Vec<MatchRow<'t, 'a>>, MatchStats) {
    let index = FuseDefIndex::new(fuse_rows);
    let mut stats = MatchStats::default();
    let rows: Vec<MatchRow<'t, 'a>> = tokens
        .iter()
        .map(|token| {
            let row = index.match_row(token);
            stats.record(&row);
            row
        })
        .collect();
    (rows, stats)
}

/// 写出 `xfuse-mtlolf-check_<name>.csv`
pub fn write_match_csv(path: &Path, rows: &[MatchRow<'_, '_>]) -> Result<usize, FfrError> {
    let headers: Vec<&str> = MTL_COLUMNS.iter().chain(MATCH_COLUMNS.iter()).copied().collect();
    let mut report = CsvReport::create(path, &headers)?;
    for row in rows {
        report.write_row(row.cells())?;
    }
    report.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fuse(register: &str, group: &str, name: &str, start: &str) -> FuseDefRow {
        FuseDefRow {
            register_name: register.to_string(),
            fuse_group_name: group.to_string(),
            fuse_name: name.to_string(),
            start_address: start.to_string(),
            end_address: start.to_string(),
        }
    }

    fn token(register: &str, fuse_name: &str) -> MtlOlfRow {
        MtlOlfRow {
            field_name: "f".to_string(),
            field_name_seq: 1,
            fuse_name: fuse_name.to_string(),
            fuse_register: register.to_string(),
            ..Default::default()
        }
    }

    fn fuse_rows() -> Vec<FuseDefRow> {
        vec![
            fuse("CPU0", "core", "core_disable", "0"),
            fuse("CPU0", "core", "core_ratio", "8"),
            fuse("GCD", "gfx", "gfx_disable", "16"),
        ]
    }

    #[test]
    fn test_group_index_keeps_last_row() {
        let fuses = fuse_rows();
        let tokens = vec![token("CPU0", "core")];
        let (rows, _) = match_rows(&tokens, &fuses);
        let cells = rows[0].cells();
        let tail = &cells[MTL_COLUMNS.len()..];
        assert_eq!(tail, ["CPU0", "core", "N/A", "8", "8", "match", "match", "no-match"]);
    }

    #[test]
    fn test_fuse_name_match_and_register_miss() {
        let fuses = fuse_rows();
        let tokens = vec![token("HUB", "gfx_disable"), token("", "")];
        let (rows, stats) = match_rows(&tokens, &fuses);

        let tail = rows[0].cells()[MTL_COLUMNS.len()..].to_vec();
        assert_eq!(
            tail,
            ["", "N/A", "gfx_disable", "16", "16", "no-match", "no-match", "match"]
        );

        // 空寄存器/空熔丝名不计为不匹配，地址为空
        let tail = rows[1].cells()[MTL_COLUMNS.len()..].to_vec();
        assert_eq!(tail[3], "");

        assert_eq!(stats.total_rows, 2);
        assert_eq!(stats.register_mismatches.len(), 1);
        assert_eq!(stats.fusegroup_mismatches.len(), 1);
        assert_eq!(stats.fusename_mismatches.len(), 0);
        assert_eq!(stats.fusegroup_na, 2);
        assert_eq!(stats.per_register["HUB"].mismatch_tokens, 1);
        assert_eq!(stats.per_register["N/A"].total_tokens, 1);
        assert_eq!(stats.per_register["N/A"].mismatch_tokens, 0);
    }

    #[test]
    fn test_register_index_keeps_first_row() {
        let fuses = fuse_rows();
        let tokens = vec![token("CPU0", "unknown")];
        let (rows, _) = match_rows(&tokens, &fuses);
        let cells = rows[0].cells();
        assert_eq!(cells[MTL_COLUMNS.len() + 3], "0");
    }

    #[test]
    fn test_write_match_csv() {
        let fuses = fuse_rows();
        let tokens = vec![token("CPU0", "core_disable")];
        let (rows, _) = match_rows(&tokens, &fuses);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("m.csv");
        assert_eq!(write_match_csv(&path, &rows).unwrap(), 1);
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("register_match,fusegroup_match,fusename_match"));
    }
}
