//! 按行读取工具
//!
//! 输入文件可能混有非 UTF-8 字节，逐行按有损方式解码而不是整体失败。

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use ffr_core::FfrError;

/// 有损 UTF-8 行迭代器，行尾的 `\r\n` / `\n` 被去掉
pub(crate) struct LossyLines<R> {
    reader: R,
    buf: Vec<u8>,
}

impl<R: BufRead> LossyLines<R> {
    pub(crate) fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::with_capacity(256),
        }
    }
}

impl<R: BufRead> Iterator for LossyLines<R> {
    type Item = std::io::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        self.buf.clear();
        match self.reader.read_until(b'\n', &mut self.buf) {
            Ok(0) => None,
            Ok(_) => {
                while matches!(self.buf.last(), Some(b'\n' | b'\r')) {
                    self.buf.pop();
                }
                Some(Ok(String::from_utf8_lossy(&self.buf).into_owned()))
            }
            Err(e) => Some(Err(e)),
        }
    }
}

/// 打开文件并返回缓冲读取器
pub(crate) fn open_buffered(path: &Path) -> Result<BufReader<File>, FfrError> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|e| FfrError::io(path, e))
}
