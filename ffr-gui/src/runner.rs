//! 后台运行 ffrcheck
//!
//! 子进程的 stdout/stderr 由读取线程逐行转发到通道；等待线程轮询退出状态，
//! 以便界面线程随时可以终止子进程。

use std::io::{self, BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{debug, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// 运行过程中的事件
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunEvent {
    Line(String),
    /// 退出码；被信号终止时为 None
    Finished(Option<i32>),
    Failed(String),
}

/// ffrcheck 可执行文件：优先使用与本程序同目录的文件，否则从 PATH 查找
pub fn ffrcheck_program() -> PathBuf {
    let name = format!("ffrcheck{}", std::env::consts::EXE_SUFFIX);
    std::env::current_exe()
        .ok()
        .map(|exe| exe.with_file_name(&name))
        .filter(|path| path.is_file())
        .unwrap_or_else(|| PathBuf::from(name))
}

fn forward_lines<R: Read + Send + 'static>(reader: R, sender: Sender<RunEvent>) -> JoinHandle<()> {
    thread::spawn(move || {
        for line in BufReader::new(reader).lines() {
            match line {
                Ok(line) => {
                    if sender.send(RunEvent::Line(line)).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    debug!("Output stream closed: {e}");
                    break;
                }
            }
        }
    })
}

/// 正在运行的子进程
pub struct RunHandle {
    child: Arc<Mutex<Child>>,
    events: Receiver<RunEvent>,
}

impl RunHandle {
    /// 启动子进程
    pub fn spawn(program: &Path, args: &[String]) -> io::Result<Self> {
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        let (sender, events) = mpsc::channel();
        let mut readers = Vec::new();
        if let Some(stdout) = child.stdout.take() {
            readers.push(forward_lines(stdout, sender.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(forward_lines(stderr, sender.clone()));
        }

        let child = Arc::new(Mutex::new(child));
        let waiter = Arc::clone(&child);
        thread::spawn(move || {
            let status = loop {
                let polled = match waiter.lock() {
                    Ok(mut child) => child.try_wait(),
                    Err(_) => break Err("process handle poisoned".to_string()),
                };
                match polled {
                    Ok(Some(status)) => break Ok(status.code()),
                    Ok(None) => thread::sleep(POLL_INTERVAL),
                    Err(e) => break Err(e.to_string()),
                }
            };
            for reader in readers {
                let _ = reader.join();
            }
            let event = match status {
                Ok(code) => RunEvent::Finished(code),
                Err(message) => RunEvent::Failed(message),
            };
            let _ = sender.send(event);
        });

        Ok(Self { child, events })
    }

    /// 终止子进程
    pub fn stop(&self) {
        match self.child.lock() {
            Ok(mut child) => {
                if let Err(e) = child.kill() {
                    warn!("Failed to stop process: {e}");
                }
            }
            Err(_) => warn!("Failed to stop process: handle poisoned"),
        }
    }

    /// 取出已到达的事件，不阻塞
    pub fn poll(&self) -> Vec<RunEvent> {
        self.events.try_iter().collect()
    }

    /// 阻塞等待下一个事件
    pub fn next_event(&self, timeout: Duration) -> Option<RunEvent> {
        self.events.recv_timeout(timeout).ok()
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn collect(handle: &RunHandle) -> Vec<RunEvent> {
        let mut events = Vec::new();
        while let Some(event) = handle.next_event(Duration::from_secs(10)) {
            let done = !matches!(event, RunEvent::Line(_));
            events.push(event);
            if done {
                break;
            }
        }
        events
    }

    #[test]
    fn test_streams_output_and_exit_code() {
        let args = vec!["-c".to_string(), "echo out; echo err 1>&2; exit 3".to_string()];
        let handle = RunHandle::spawn(Path::new("sh"), &args).unwrap();
        let events = collect(&handle);

        assert!(events.contains(&RunEvent::Line("out".to_string())));
        assert!(events.contains(&RunEvent::Line("err".to_string())));
        assert_eq!(events.last(), Some(&RunEvent::Finished(Some(3))));
    }

    #[test]
    fn test_stop_kills_child() {
        let args = vec!["-c".to_string(), "exec sleep 30".to_string()];
        let handle = RunHandle::spawn(Path::new("sh"), &args).unwrap();
        handle.stop();
        let events = collect(&handle);
        assert_eq!(events.last(), Some(&RunEvent::Finished(None)));
    }

    #[test]
    fn test_spawn_missing_program() {
        assert!(RunHandle::spawn(Path::new("/nonexistent/ffrcheck"), &[]).is_err());
    }
}
