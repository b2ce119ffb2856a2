//! CSV 报告写入器
//!
//! 逐行流式写出，文件以 UTF-8 BOM 开头，所有单元格经过公式注入清理。

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use ffr_core::sanitizer::sanitize_csv_field;
use ffr_core::FfrError;
use log::info;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

fn csv_error(e: csv::Error) -> FfrError {
    FfrError::Csv(e.to_string())
}

/// 流式 CSV 写入器
pub struct CsvReport {
    path: PathBuf,
    writer: csv::Writer<BufWriter<File>>,
    columns: usize,
    rows: usize,
}

impl CsvReport {
    /// 创建文件并写入 BOM 与表头
    pub fn create<S: AsRef<str>>(path: &Path, headers: &[S]) -> Result<Self, FfrError> {
        let file = File::create(path).map_err(|e| FfrError::io(path, e))?;
        let mut buffered = BufWriter::new(file);
        buffered
            .write_all(UTF8_BOM)
            .map_err(|e| FfrError::io(path, e))?;

        let mut writer = csv::WriterBuilder::new()
            .flexible(false)
            .from_writer(buffered);
        writer
            .write_record(headers.iter().map(|h| sanitize_csv_field(h.as_ref()).into_owned()))
            .map_err(csv_error)?;

        Ok(Self {
            path: path.to_path_buf(),
            writer,
            columns: headers.len(),
            rows: 0,
        })
    }

    /// 写入一行；列数必须与表头一致
    pub fn write_row<I, S>(&mut self, cells: I) -> Result<(), FfrError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let record: Vec<String> = cells
            .into_iter()
            .map(|cell| sanitize_csv_field(cell.as_ref()).into_owned())
            .collect();
        if record.len() != self.columns {
            return Err(FfrError::Csv(format!(
                "{}: row has {} cells, header has {}",
                self.path.display(),
                record.len(),
                self.columns
            )));
        }
        self.writer.write_record(&record).map_err(csv_error)?;
        self.rows += 1;
        Ok(())
    }

    /// 刷新并关闭，返回数据行数
    pub fn finish(mut self) -> Result<usize, FfrError> {
        self.writer
            .flush()
            .map_err(|e| FfrError::io(&self.path, e))?;
        info!("Wrote {} rows to {}", self.rows, self.path.display());
        Ok(self.rows)
    }
}
