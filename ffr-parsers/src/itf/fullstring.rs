//! 分段 TNAME 拼接
//!
//! 同一寄存器的熔丝串可能分多段上传（`<TNAME>_fd1`、`<TNAME>_fd2`...），
//! 按 FD 序号拼接成完整熔丝串。

use std::collections::{BTreeMap, BTreeSet, HashMap};

use ffr_core::UnitDataSource;
use log::debug;

use super::{FullStringRow, TnameRow};

/// 拆分 `_fd<N>` 后缀，无后缀时序号为 0
///
/// # 示例
/// ```
/// use ffr_parsers::itf::split_fd;
///
/// assert_eq!(split_fd("RAP_CPU0_fd12"), ("RAP_CPU0", 12));
/// assert_eq!(split_fd("RAP_CPU0"), ("RAP_CPU0", 0));
/// assert_eq!(split_fd("RAP_fdx"), ("RAP_fdx", 0));
/// ```
pub fn split_fd(tname: &str) -> (&str, u32) {
    let Some(index) = tname.rfind("_fd") else {
        return (tname, 0);
    };
    let digits = &tname[index + 3..];
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return (tname, 0);
    }
    match digits.parse() {
        Ok(fd) => (&tname[..index], fd),
        Err(_) => (tname, 0),
    }
}

/// 按 (visualID, SSID, 基础 TNAME) 分组拼接，保持首次出现顺序
pub fn build_fullstring_rows(rows: &[TnameRow]) -> Vec<FullStringRow> {
    let mut order: Vec<(String, String, String)> = Vec::new();
    let mut groups: HashMap<(String, String, String), (&TnameRow, BTreeMap<u32, &str>)> =
        HashMap::new();

    for row in rows {
        let (base, fd) = split_fd(&row.tname);
        let key = (row.visual_id.clone(), row.ssid.clone(), base.to_string());
        let entry = groups.entry(key.clone()).or_insert_with(|| {
            order.push(key);
            (row, BTreeMap::new())
        });
        entry.1.insert(fd, row.value.as_str());
    }

    order
        .into_iter()
        .filter_map(|key| {
            let (first, parts) = groups.remove(&key)?;
            let value: String = parts.values().copied().collect();
            let fd_numbers = parts
                .keys()
                .map(u32::to_string)
                .collect::<Vec<_>>()
                .join(",");
            Some(FullStringRow {
                row: TnameRow {
                    tname: key.2,
                    value,
                    ..first.clone()
                },
                fd_count: parts.len(),
                fd_numbers,
            })
        })
        .collect()
}

/// (visualID, 寄存器) -> 完整熔丝串
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FullStringTable {
    values: HashMap<(String, String), String>,
    visual_ids: BTreeSet<String>,
}

impl FullStringTable {
    /// 空值与缺少 visualID/寄存器的行被跳过；同一 (visualID, 寄存器) 出现多次时保留最后一条
    pub fn from_rows(rows: &[FullStringRow]) -> Self {
        let mut table = Self::default();
        for full in rows {
            let row = &full.row;
            if row.visual_id.is_empty() || row.register.is_empty() || row.value.is_empty() {
                continue;
            }
            table.visual_ids.insert(row.visual_id.clone());
            let key = (row.visual_id.clone(), row.register.clone());
            if table.values.insert(key, row.value.clone()).is_some() {
                debug!(
                    "Full string for {} / {} replaced by a later row",
                    row.visual_id, row.register
                );
            }
        }
        table
    }

    /// 排序后的 visualID
    pub fn visual_ids(&self) -> Vec<String> {
        self.visual_ids.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl UnitDataSource for FullStringTable {
    fn raw_value(&self, unit: &str, register: &str) -> Option<&str> {
        self.values
            .get(&(unit.to_string(), register.to_string()))
            .map(String::as_str)
    }
}
