//! UBE 单元数据解析器
//!
//! 行格式：
//! - `UNIT,<visualID>` 开始一个单元
//! - 以 `:` 结尾的行设置当前 ULT（并清空 MDPOSITION）
//! - 任意行中的 `MDPOSITION=<x>` 更新当前 MDPOSITION
//! - `ref_level,first_socket_upload,tok=val,tok=val...` 每个 `tok=val` 产生一条记录

use std::collections::{HashMap, HashSet};
use std::io::BufRead;
use std::path::Path;

use ffr_core::FfrError;
use log::{debug, info, warn};

use crate::line_reader::{open_buffered, LossyLines};

const MDPOSITION_KEY: &str = "MDPOSITION=";

/// 一条 UBE 令牌记录
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UbeRecord {
    pub visual_id: String,
    /// 缺失时为 `N/A`
    pub ult: String,
    pub ref_level: String,
    pub first_socket_upload: String,
    pub token_name: String,
    pub token_value: String,
    /// 仅 `WFR` 记录保存
    pub mdposition: String,
}

/// UBE 统计
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UbeStats {
    pub total_entries: usize,
    pub unique_visual_ids: usize,
    pub unique_ults: usize,
    pub unique_ref_levels: usize,
    pub unique_tokens: usize,
    pub unique_mdpositions: usize,
    /// 按数量降序
    pub ref_level_breakdown: Vec<(String, usize)>,
    /// 按数量降序，无 MDPOSITION 的记录计入 `No MDPOSITION`
    pub mdposition_breakdown: Vec<(String, usize)>,
}

fn sorted_counts(counts: HashMap<&str, usize>) -> Vec<(String, usize)> {
    let mut counts: Vec<(String, usize)> = counts
        .into_iter()
        .map(|(key, count)| (key.to_string(), count))
        .collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    counts
}

impl UbeStats {
    pub fn from_records(records: &[UbeRecord]) -> Self {
        let mut visual_ids = HashSet::new();
        let mut ults = HashSet::new();
        let mut tokens = HashSet::new();
        let mut ref_levels: HashMap<&str, usize> = HashMap::new();
        let mut mdpositions: HashMap<&str, usize> = HashMap::new();

        for record in records {
            visual_ids.insert(record.visual_id.as_str());
            if record.ult != "N/A" {
                ults.insert(record.ult.as_str());
            }
            tokens.insert(record.token_name.as_str());
            *ref_levels.entry(record.ref_level.as_str()).or_default() += 1;

            let mdposition = record.mdposition.trim();
            let key = if mdposition.is_empty() {
                "No MDPOSITION"
            } else {
                mdposition
            };
            *mdpositions.entry(key).or_default() += 1;
        }

        let unique_mdpositions =
            mdpositions.len() - usize::from(mdpositions.contains_key("No MDPOSITION"));

        Self {
            total_entries: records.len(),
            unique_visual_ids: visual_ids.len(),
            unique_ults: ults.len(),
            unique_ref_levels: ref_levels.len(),
            unique_tokens: tokens.len(),
            unique_mdpositions,
            ref_level_breakdown: sorted_counts(ref_levels),
            mdposition_breakdown: sorted_counts(mdpositions),
        }
    }
}

/// 从 UBE 文件名提取 (批次, 位置)：最后一个 `_` 之后为位置
///
/// # 示例
/// ```
/// use std::path::Path;
/// use ffr_parsers::ube::lot_and_location;
///
/// assert_eq!(
///     lot_and_location(Path::new("data/X123_AB_6248.ube")),
///     ("X123_AB".to_string(), "6248".to_string())
/// );
/// assert_eq!(
///     lot_and_location(Path::new("single.ube")),
///     ("single".to_string(), "unknown".to_string())
/// );
/// ```
pub fn lot_and_location(path: &Path) -> (String, String) {
    let stem = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    match stem.rsplit_once('_') {
        Some((lot, location)) => (lot.to_string(), location.to_string()),
        None => (stem, "unknown".to_string()),
    }
}

/// 行内 `MDPOSITION=` 的值（到下一个逗号为止）
fn find_mdposition(line: &str) -> Option<&str> {
    let start = line.find(MDPOSITION_KEY)? + MDPOSITION_KEY.len();
    let value = line[start..].split(',').next().unwrap_or_default();
    (!value.is_empty()).then_some(value)
}

/// UBE 解析器
#[derive(Debug, Clone)]
pub struct UbeParser {
    progress_interval: usize,
}

impl Default for UbeParser {
    fn default() -> Self {
        Self::new()
    }
}

impl UbeParser {
    pub fn new() -> Self {
        Self {
            progress_interval: 10_000,
        }
    }

    pub fn with_progress_interval(mut self, interval: usize) -> Self {
        self.progress_interval = interval;
        self
    }

    pub fn parse_file(&self, path: &Path) -> Result<Vec<UbeRecord>, FfrError> {
        info!("Parsing UBE file: {}", path.display());
        let records = self
            .parse_reader(open_buffered(path)?)
            .map_err(|e| match e {
                FfrError::Io { source, .. } => FfrError::io(path, source),
                other => other,
            })?;
        info!("UBE parsing completed: {} entries", records.len());
        Ok(records)
    }

    pub fn parse_reader<R: BufRead>(&self, reader: R) -> Result<Vec<UbeRecord>, FfrError> {
        let mut records = Vec::new();
        let mut visual_id: Option<String> = None;
        let mut ult: Option<String> = None;
        let mut mdposition: Option<String> = None;
        let mut skipped = 0usize;

        for (index, line) in LossyLines::new(reader).enumerate() {
            let line = line.map_err(|e| FfrError::io("<ube>", e))?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if self.progress_interval > 0 && (index + 1) % self.progress_interval == 0 {
                debug!("Processing line {}...", index + 1);
            }

            if let Some(id) = line.strip_prefix("UNIT,") {
                visual_id = Some(id.trim().to_string());
                ult = None;
                mdposition = None;
                continue;
            }

            if let Some(name) = line.strip_suffix(':') {
                ult = Some(name.trim().to_string());
                mdposition = None;
                continue;
            }

            if let Some(value) = find_mdposition(line) {
                mdposition = Some(value.to_string());
            }

            let Some(current_visual_id) = visual_id.as_deref() else {
                continue;
            };
            let mut parts = line.splitn(3, ',');
            let (Some(ref_level), Some(first_socket_upload)) = (parts.next(), parts.next()) else {
                continue;
            };
            let ref_level = ref_level.trim();
            let first_socket_upload = first_socket_upload.trim();
            let Some(tokens) = parts.next() else {
                continue;
            };

            let record_mdposition = if ref_level == "WFR" {
                mdposition.clone().unwrap_or_default()
            } else {
                String::new()
            };

            for token in tokens.split(',').map(str::trim) {
                if token.is_empty() || token.starts_with(MDPOSITION_KEY) {
                    continue;
                }
                match token.split_once('=') {
                    Some((name, value)) if !name.is_empty() && !value.is_empty() => {
                        records.push(UbeRecord {
                            visual_id: current_visual_id.to_string(),
                            ult: ult.clone().unwrap_or_else(|| "N/A".to_string()),
                            ref_level: ref_level.to_string(),
                            first_socket_upload: first_socket_upload.to_string(),
                            token_name: name.trim().to_string(),
                            token_value: value.trim().to_string(),
                            mdposition: record_mdposition.clone(),
                        });
                    }
                    _ => skipped += 1,
                }
            }
        }

        if skipped > 0 {
            warn!("Skipped {skipped} malformed UBE token entries");
        }
        Ok(records)
    }
}
