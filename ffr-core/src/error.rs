//! FFR Check 错误定义

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FfrError {
    /// 文件读写失败
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// JSON 解析失败
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    /// XML 解析失败
    #[error("XML parse error: {0}")]
    Xml(String),
    /// CSV 写入失败
    #[error("CSV error: {0}")]
    Csv(String),
    /// 缺少必需的键
    #[error("Missing key: {0}")]
    MissingKey(String),
    /// 解析错误
    #[error("Parse error: {0}")]
    ParseError(String),
    /// 配置错误
    #[error("Configuration error: {0}")]
    ConfigError(String),
    /// 无效输入
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl FfrError {
    /// 附带文件路径包装 I/O 错误
    pub fn io(path: impl AsRef<std::path::Path>, source: std::io::Error) -> Self {
        FfrError::Io {
            path: path.as_ref().display().to_string(),
            source,
        }
    }
}

impl From<String> for FfrError {
    fn from(s: String) -> Self {
        FfrError::ParseError(s)
    }
}

impl From<&str> for FfrError {
    fn from(s: &str) -> Self {
        FfrError::ParseError(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_mentions_path() {
        let err = FfrError::io(
            "input/fuseDef.json",
            std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        );
        let message = err.to_string();
        assert!(message.contains("input/fuseDef.json"));
        assert!(message.contains("missing"));
    }

    #[test]
    fn test_string_converts_to_parse_error() {
        let err: FfrError = "bad address".into();
        assert!(matches!(err, FfrError::ParseError(ref msg) if msg == "bad address"));
    }
}
