//! ITF 文件发现与打开
//!
//! 支持 `.itf`、`.txt` 与 `.itf.gz`；压缩文件直接按流解压读取。

use std::fs;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use ffr_core::FfrError;
use flate2::read::MultiGzDecoder;
use log::debug;

use crate::line_reader::open_buffered;

fn is_gzip(path: &Path) -> bool {
    path.file_name()
        .map(|name| name.to_string_lossy().ends_with(".itf.gz"))
        .unwrap_or(false)
}

fn is_itf(path: &Path) -> bool {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    name.ends_with(".itf") || name.ends_with(".txt") || name.ends_with(".itf.gz")
}

/// 列出目录中的 ITF 文件（按文件名排序）
pub fn find_itf_files(dir: &Path) -> Result<Vec<PathBuf>, FfrError> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| FfrError::io(dir, e))? {
        let path = entry.map_err(|e| FfrError::io(dir, e))?.path();
        if path.is_file() && is_itf(&path) {
            debug!("Found ITF file: {}", path.display());
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// 打开 ITF 文件；`.gz` 文件返回解压流
pub fn open_itf(path: &Path) -> Result<Box<dyn BufRead>, FfrError> {
    let reader = open_buffered(path)?;
    if is_gzip(path) {
        Ok(Box::new(BufReader::new(MultiGzDecoder::new(reader))))
    } else {
        Ok(Box::new(reader))
    }
}

/// 报告中使用的文件名（压缩文件去掉 `.gz`）
pub fn display_name(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    match name.strip_suffix(".gz") {
        Some(stripped) => stripped.to_string(),
        None => name,
    }
}
