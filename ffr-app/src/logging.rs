//! 日志初始化
//!
//! env_logger 默认级别 `info`（`RUST_LOG` 可覆盖），输出到 stderr；
//! 启用 `--log` 后同一份日志同时写入 `xconsole_<name>.txt`。

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

use env_logger::{Env, Target};

type SharedFile = Arc<Mutex<Option<File>>>;

/// 日志输出目标：stderr 加可选的日志文件
struct TeeWriter {
    file: SharedFile,
}

impl Write for TeeWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        io::stderr().write_all(buf)?;
        if let Ok(mut guard) = self.file.lock() {
            if let Some(file) = guard.as_mut() {
                file.write_all(buf)?;
            }
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stderr().flush()?;
        if let Ok(mut guard) = self.file.lock() {
            if let Some(file) = guard.as_mut() {
                file.flush()?;
            }
        }
        Ok(())
    }
}

/// 控制台日志句柄，用于在确定输出目录后开启文件副本
#[derive(Clone, Default)]
pub struct ConsoleLog {
    file: SharedFile,
}

impl ConsoleLog {
    /// 开始把日志复制到文件
    pub fn tee_to(&self, path: &Path) -> io::Result<()> {
        let file = File::create(path)?;
        if let Ok(mut guard) = self.file.lock() {
            *guard = Some(file);
        }
        Ok(())
    }

    /// 刷新并关闭日志文件；先释放锁，调用方可以继续写日志报告错误
    pub fn close(&self) -> io::Result<()> {
        let file = self.file.lock().ok().and_then(|mut guard| guard.take());
        match file {
            Some(mut file) => file.flush(),
            None => Ok(()),
        }
    }

    fn writer(&self) -> TeeWriter {
        TeeWriter {
            file: Arc::clone(&self.file),
        }
    }
}

/// 初始化全局日志，重复调用时只返回新的句柄
pub fn init() -> ConsoleLog {
    let console = ConsoleLog::default();
    let _ = env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .target(Target::Pipe(Box::new(console.writer())))
        .try_init();
    console
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tee_writer_copies_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("xconsole_test.txt");
        let console = ConsoleLog::default();
        let mut writer = console.writer();

        writer.write_all(b"before\n").unwrap();
        console.tee_to(&path).unwrap();
        writer.write_all(b"after\n").unwrap();
        console.close().unwrap();
        writer.write_all(b"closed\n").unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "after\n");
    }

    #[test]
    fn test_close_reports_result_and_releases_lock() {
        let console = ConsoleLog::default();
        assert!(console.close().is_ok());

        let dir = tempfile::tempdir().unwrap();
        console.tee_to(&dir.path().join("xconsole_close.txt")).unwrap();
        assert!(console.close().is_ok());
        assert!(console.file.lock().unwrap().is_none());

        // 关闭后仍可通过同一写入器输出（错误报告走 stderr）
        let mut writer = console.writer();
        writer.write_all(b"after close\n").unwrap();
        writer.flush().unwrap();
    }
}
