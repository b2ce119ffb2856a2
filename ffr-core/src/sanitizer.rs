//! 输出清理工具
//!
//! CSV 单元格防公式注入、HTML 转义与文件名清理

use std::borrow::Cow;

/// 会被表格软件当作公式起始的字符
const FORMULA_PREFIXES: [char; 4] = ['=', '+', '-', '@'];

/// 清理 CSV 单元格
///
/// 以 `=`、`+`、`-`、`@` 开头的值加上 `'` 前缀；数值字面量（如 `-999`）保持不变。
///
/// # 示例
/// ```
/// use ffr_core::sanitizer::sanitize_csv_field;
///
/// assert_eq!(sanitize_csv_field("=SUM(A1)"), "'=SUM(A1)");
/// assert_eq!(sanitize_csv_field("-999"), "-999");
/// assert_eq!(sanitize_csv_field("0X27"), "0X27");
/// ```
pub fn sanitize_csv_field(value: &str) -> Cow<'_, str> {
    match value.chars().next() {
        Some(first) if FORMULA_PREFIXES.contains(&first) && value.parse::<f64>().is_err() => {
            Cow::Owned(format!("'{value}"))
        }
        _ => Cow::Borrowed(value),
    }
}

/// HTML 文本转义
pub fn html_escape(text: &str) -> Cow<'_, str> {
    if !text.contains(['&', '<', '>', '"', '\'']) {
        return Cow::Borrowed(text);
    }

    let mut escaped = String::with_capacity(text.len() + 16);
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(c),
        }
    }
    Cow::Owned(escaped)
}

/// 清理文件名片段：路径分隔符和非法字符替换为 `_`
pub fn sanitize_filename(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    let cleaned = cleaned.trim_matches('.');
    if cleaned.is_empty() {
        "unnamed".to_string()
    } else {
        cleaned.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_csv_field() {
        assert_eq!(sanitize_csv_field("=1+1"), "'=1+1");
        assert_eq!(sanitize_csv_field("+cmd"), "'+cmd");
        assert_eq!(sanitize_csv_field("@SUM(A1)"), "'@SUM(A1)");
        assert_eq!(sanitize_csv_field("-x"), "'-x");
        assert_eq!(sanitize_csv_field("-999"), "-999");
        assert_eq!(sanitize_csv_field("+1.5"), "+1.5");
        assert_eq!(sanitize_csv_field("b0101"), "b0101");
        assert_eq!(sanitize_csv_field(""), "");
    }

    #[test]
    fn test_html_escape() {
        assert_eq!(html_escape("plain"), "plain");
        assert!(matches!(html_escape("plain"), Cow::Borrowed(_)));
        assert_eq!(
            html_escape("<td a=\"1\">R&D's</td>"),
            "&lt;td a=&quot;1&quot;&gt;R&amp;D&#x27;s&lt;/td&gt;"
        );
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("lot/1:2"), "lot_1_2");
        assert_eq!(sanitize_filename("..\\up"), "_up");
        assert_eq!(sanitize_filename("  "), "unnamed");
        assert_eq!(sanitize_filename("Q1AB,Q1AC"), "Q1AB,Q1AC");
    }
}
