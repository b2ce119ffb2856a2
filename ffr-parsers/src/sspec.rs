//! sspec 熔丝串解析器
//!
//! 只处理 `FUSEDATA:<寄存器>:<QDF>:<保留>:<熔丝串>` 行，其余行忽略。

use std::collections::BTreeSet;
use std::io::BufRead;
use std::path::Path;

use ffr_core::FfrError;
use log::{info, warn};

use crate::line_reader::{open_buffered, LossyLines};

const FUSEDATA_PREFIX: &str = "FUSEDATA:";

/// sspec 条目
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SspecEntry {
    pub register: String,
    pub qdf: String,
    pub fuse_string: String,
    /// 1 起始行号
    pub line_number: usize,
}

/// QDF 选择：`*` 表示文件中的全部 QDF
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QdfSelection {
    All,
    List(Vec<String>),
}

impl QdfSelection {
    /// 解析命令行文本；空文本返回 None
    ///
    /// # 示例
    /// ```
    /// use ffr_parsers::QdfSelection;
    ///
    /// assert_eq!(QdfSelection::parse(" * "), Some(QdfSelection::All));
    /// assert_eq!(
    ///     QdfSelection::parse("L0V8, L0VS,L0V8"),
    ///     Some(QdfSelection::List(vec!["L0V8".into(), "L0VS".into()]))
    /// );
    /// assert_eq!(QdfSelection::parse(" , "), None);
    /// ```
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if text == "*" {
            return Some(Self::All);
        }

        let mut qdfs: Vec<String> = Vec::new();
        for qdf in text.split(',').map(str::trim).filter(|qdf| !qdf.is_empty()) {
            if !qdfs.iter().any(|seen| seen == qdf) {
                qdfs.push(qdf.to_string());
            }
        }
        (!qdfs.is_empty()).then_some(Self::List(qdfs))
    }

    /// 解析为具体 QDF 列表；`*` 时扫描文件中出现的全部 QDF（排序）
    pub fn resolve(&self, sspec_path: &Path) -> Result<Vec<String>, FfrError> {
        match self {
            Self::List(qdfs) => Ok(qdfs.clone()),
            Self::All => {
                let qdfs = discover_qdfs(open_buffered(sspec_path)?)?;
                info!("Discovered {} QDF(s): {:?}", qdfs.len(), qdfs);
                Ok(qdfs)
            }
        }
    }
}

/// 拆分 FUSEDATA 行，返回 (寄存器, QDF, 熔丝串)
fn split_fusedata(line: &str) -> Option<(&str, &str, Option<&str>)> {
    if !line.starts_with(FUSEDATA_PREFIX) {
        return None;
    }
    let mut parts = line.splitn(5, ':').skip(1);
    let register = parts.next()?.trim();
    let qdf = parts.next()?.trim();
    let fuse_string = parts.nth(1).map(str::trim);
    Some((register, qdf, fuse_string))
}

/// 扫描全部 QDF
pub fn discover_qdfs<R: BufRead>(reader: R) -> Result<Vec<String>, FfrError> {
    let mut qdfs = BTreeSet::new();
    for line in LossyLines::new(reader) {
        let line = line.map_err(|e| FfrError::io("<sspec>", e))?;
        if let Some((_, qdf, _)) = split_fusedata(line.trim()) {
            if !qdf.is_empty() {
                qdfs.insert(qdf.to_string());
            }
        }
    }
    Ok(qdfs.into_iter().collect())
}

/// 读取选定 QDF 的条目
pub fn parse_sspec_reader<R: BufRead>(
    reader: R,
    qdfs: &[String],
) -> Result<Vec<SspecEntry>, FfrError> {
    let mut entries = Vec::new();
    let mut malformed = 0usize;

    for (index, line) in LossyLines::new(reader).enumerate() {
        let line = line.map_err(|e| FfrError::io("<sspec>", e))?;
        let Some((register, qdf, fuse_string)) = split_fusedata(line.trim()) else {
            continue;
        };
        let Some(fuse_string) = fuse_string else {
            malformed += 1;
            continue;
        };
        if qdfs.iter().any(|wanted| wanted == qdf) {
            entries.push(SspecEntry {
                register: register.to_string(),
                qdf: qdf.to_string(),
                fuse_string: fuse_string.to_string(),
                line_number: index + 1,
            });
        }
    }

    if malformed > 0 {
        warn!("Skipped {malformed} FUSEDATA lines with fewer than 5 fields");
    }
    Ok(entries)
}

/// 读取 sspec.txt
pub fn parse_sspec(path: &Path, qdfs: &[String]) -> Result<Vec<SspecEntry>, FfrError> {
    info!("Parsing sspec: {} for QDFs {:?}", path.display(), qdfs);
    let entries = parse_sspec_reader(open_buffered(path)?, qdfs)?;
    info!("sspec parsing completed: {} entries", entries.len());
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
# comment
FUSEDATA:CPU0:L0V8:x:0011mmss
FUSEDATA:CPU0:L0VS:x: 11110000
FUSEDATA:GCD:L0V8:x:1010
FUSEDATA:HUB:L15E:short
OTHER:CPU0:L0V8:x:1111
";

    #[test]
    fn test_discover_qdfs_sorted() {
        let qdfs = discover_qdfs(SAMPLE.as_bytes()).unwrap();
        assert_eq!(qdfs, vec!["L0V8", "L0VS", "L15E"]);
    }

    #[test]
    fn test_parse_selected_qdfs() {
        let entries = parse_sspec_reader(SAMPLE.as_bytes(), &["L0V8".to_string()]).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].register, "CPU0");
        assert_eq!(entries[0].fuse_string, "0011mmss");
        assert_eq!(entries[0].line_number, 2);
        assert_eq!(entries[1].register, "GCD");
    }

    #[test]
    fn test_fuse_string_is_trimmed() {
        let entries = parse_sspec_reader(SAMPLE.as_bytes(), &["L0VS".to_string()]).unwrap();
        assert_eq!(entries[0].fuse_string, "11110000");
    }

    #[test]
    fn test_wildcard_resolves_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sspec.txt");
        std::fs::write(&path, SAMPLE).unwrap();

        let qdfs = QdfSelection::All.resolve(&path).unwrap();
        assert_eq!(qdfs.len(), 3);
        let entries = parse_sspec(&path, &qdfs).unwrap();
        assert_eq!(entries.len(), 3);
    }
}
