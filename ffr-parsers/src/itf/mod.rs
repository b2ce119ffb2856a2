//! ITF 测试日志解析
//!
//! 读取目录中的全部 ITF 文件，按 SSID 映射表抽取熔丝 TNAME 行，
//! 并把 `_fd<N>` 分段拼接成完整熔丝串。

mod discovery;
mod fullstring;
mod reader;
mod ssid;

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;

use ffr_core::FfrError;
use log::{debug, info, warn};

pub use discovery::{display_name, find_itf_files, open_itf};
pub use fullstring::{build_fullstring_rows, split_fd, FullStringTable};
pub use reader::{parse_itf_reader, ItfHeader, ItfUnit, HEADER_KEYS, UNIT_KEYS};
pub use ssid::{lockout_rap_profile, SsidMapping, SsidTable, DEFAULT_PROFILE};

/// 行属性列：批次头键 + 单元属性键（visualid 单独成列）
pub const ATTRIBUTE_COLUMNS: [&str; 21] = [
    "lotid",
    "sspec",
    "prgnm",
    "lcode",
    "sysid",
    "facid",
    "tempr",
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
    "subflstpid",
    "binn",
    "curfbin",
    "curibin",
];

/// 一个已映射 TNAME 的取值行
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TnameRow {
    pub filename: String,
    pub visual_id: String,
    pub ssid: String,
    pub ult: String,
    pub tname: String,
    pub value: String,
    pub domain: String,
    pub register: String,
    attributes: BTreeMap<String, String>,
}

impl TnameRow {
    /// 属性值，缺失时为空串
    pub fn attribute(&self, key: &str) -> &str {
        self.attributes.get(key).map(String::as_str).unwrap_or_default()
    }
}

/// 拼接后的完整熔丝串行
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FullStringRow {
    pub row: TnameRow,
    pub fd_count: usize,
    /// 逗号分隔的 FD 序号（升序）
    pub fd_numbers: String,
}

/// visualID 过滤器
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum VisualIdFilter {
    #[default]
    All,
    Only(BTreeSet<String>),
}

impl VisualIdFilter {
    /// `*` 或空文本表示全部，否则为逗号分隔列表
    ///
    /// # 示例
    /// ```
    /// use ffr_parsers::VisualIdFilter;
    ///
    /// assert_eq!(VisualIdFilter::parse("*"), VisualIdFilter::All);
    /// let filter = VisualIdFilter::parse("V1, V2");
    /// assert!(filter.allows("V2"));
    /// assert!(!filter.allows("V3"));
    /// ```
    pub fn parse(text: &str) -> Self {
        let text = text.trim();
        if text == "*" {
            return Self::All;
        }
        Self::from_list(text.split(','))
    }

    /// 配置文件中的过滤设置；未启用或列表为空时不过滤
    pub fn from_config<S: AsRef<str>>(enabled: bool, filter_list: &[S]) -> Self {
        if !enabled {
            return Self::All;
        }
        Self::from_list(filter_list.iter().map(AsRef::as_ref))
    }

    fn from_list<'a>(ids: impl Iterator<Item = &'a str>) -> Self {
        let ids: BTreeSet<String> = ids
            .map(str::trim)
            .filter(|id| !id.is_empty() && *id != "*")
            .map(str::to_string)
            .collect();
        if ids.is_empty() {
            Self::All
        } else {
            Self::Only(ids)
        }
    }

    pub fn allows(&self, visual_id: &str) -> bool {
        match self {
            Self::All => true,
            Self::Only(ids) => ids.contains(visual_id),
        }
    }
}

/// ITF 解析统计
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItfStats {
    pub total_files: usize,
    pub failed_files: usize,
    pub unique_visual_ids: usize,
    pub total_tname_rows: usize,
    pub total_fullstring_rows: usize,
    pub unique_ssids: usize,
    /// SSID -> 行数（按 SSID 排序）
    pub ssid_breakdown: Vec<(String, usize)>,
    /// 寄存器 -> 行数（按寄存器排序）
    pub register_breakdown: Vec<(String, usize)>,
}

impl ItfStats {
    fn collect(total_files: usize, failed_files: usize, dataset: &ItfDataset) -> Self {
        let mut visual_ids = BTreeSet::new();
        let mut ssids: BTreeMap<String, usize> = BTreeMap::new();
        let mut registers: BTreeMap<String, usize> = BTreeMap::new();
        for row in &dataset.rows {
            visual_ids.insert(row.visual_id.as_str());
            *ssids.entry(row.ssid.clone()).or_default() += 1;
            *registers.entry(row.register.clone()).or_default() += 1;
        }

        Self {
            total_files,
            failed_files,
            unique_visual_ids: visual_ids.len(),
            total_tname_rows: dataset.rows.len(),
            total_fullstring_rows: dataset.fullstring_rows.len(),
            unique_ssids: ssids.len(),
            ssid_breakdown: ssids.into_iter().collect(),
            register_breakdown: registers.into_iter().collect(),
        }
    }
}

/// 目录解析结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItfDataset {
    pub rows: Vec<TnameRow>,
    pub fullstring_rows: Vec<FullStringRow>,
    pub stats: ItfStats,
}

impl ItfDataset {
    /// 供字段映射使用的完整熔丝串表
    pub fn full_string_table(&self) -> FullStringTable {
        FullStringTable::from_rows(&self.fullstring_rows)
    }
}

/// 同一 visualID 的单元合并：TNAME 值后者覆盖，ULT 先到先得，属性取第一个单元
fn merge_units(units: Vec<ItfUnit>, filter: &VisualIdFilter) -> Vec<(String, ItfUnit)> {
    let mut order: Vec<String> = Vec::new();
    let mut merged: HashMap<String, ItfUnit> = HashMap::new();

    for unit in units {
        let Some(visual_id) = unit.visual_id().map(str::to_string) else {
            debug!("Unit without visual ID skipped");
            continue;
        };
        if !filter.allows(&visual_id) {
            continue;
        }
        match merged.get_mut(&visual_id) {
            Some(existing) => {
                for (tname, value) in &unit.tname_values {
                    existing.set_tname_value(tname, value);
                }
                for (ssid, ult) in unit.ult {
                    existing.ult.entry(ssid).or_insert(ult);
                }
            }
            None => {
                order.push(visual_id.clone());
                merged.insert(visual_id, unit);
            }
        }
    }

    order
        .into_iter()
        .filter_map(|id| merged.remove(&id).map(|unit| (id, unit)))
        .collect()
}

/// 由一个文件的单元生成 TNAME 行
fn build_rows(
    filename: &str,
    header: &ItfHeader,
    units: Vec<ItfUnit>,
    table: &SsidTable,
    filter: &VisualIdFilter,
) -> Vec<TnameRow> {
    let mut rows = Vec::new();
    for (visual_id, unit) in merge_units(units, filter) {
        let attributes: BTreeMap<String, String> = ATTRIBUTE_COLUMNS
            .iter()
            .filter_map(|key| {
                header
                    .get(key)
                    .or_else(|| unit.field(key))
                    .map(|value| (key.to_string(), value.to_string()))
            })
            .collect();

        for (tname, value) in &unit.tname_values {
            let Some(mapping) = table.find(tname) else {
                continue;
            };
            rows.push(TnameRow {
                filename: filename.to_string(),
                visual_id: visual_id.clone(),
                ssid: mapping.ssid.clone(),
                ult: unit.ult.get(&mapping.ssid).cloned().unwrap_or_default(),
                tname: tname.clone(),
                value: value.clone(),
                domain: mapping.domain.clone(),
                register: mapping.register.clone(),
                attributes: attributes.clone(),
            });
        }
    }
    rows
}

/// 解析单个 ITF 文件为 TNAME 行
pub fn parse_itf_file(
    path: &Path,
    table: &SsidTable,
    filter: &VisualIdFilter,
) -> Result<Vec<TnameRow>, FfrError> {
    let (header, units) = parse_itf_reader(open_itf(path)?, table).map_err(|e| match e {
        FfrError::Io { source, .. } => FfrError::io(path, source),
        other => other,
    })?;
    debug!("{}: {} unit(s)", path.display(), units.len());
    Ok(build_rows(&display_name(path), &header, units, table, filter))
}

/// 解析目录中的全部 ITF 文件；单个文件失败只记录警告
pub fn parse_itf_directory(
    dir: &Path,
    table: &SsidTable,
    filter: &VisualIdFilter,
) -> Result<ItfDataset, FfrError> {
    if !dir.is_dir() {
        return Err(FfrError::InvalidInput(format!(
            "ITF directory not found: {}",
            dir.display()
        )));
    }

    let files = find_itf_files(dir)?;
    info!("Found {} ITF file(s) in {}", files.len(), dir.display());

    let mut dataset = ItfDataset::default();
    let mut failed = 0usize;
    for path in &files {
        match parse_itf_file(path, table, filter) {
            Ok(rows) => dataset.rows.extend(rows),
            Err(e) => {
                warn!("Failed to parse {}: {e}", path.display());
                failed += 1;
            }
        }
    }

    dataset.fullstring_rows = build_fullstring_rows(&dataset.rows);
    dataset.stats = ItfStats::collect(files.len(), failed, &dataset);
    info!(
        "ITF parsing completed: {} rows, {} full strings, {} visual IDs",
        dataset.stats.total_tname_rows,
        dataset.stats.total_fullstring_rows,
        dataset.stats.unique_visual_ids
    );
    Ok(dataset)
}
