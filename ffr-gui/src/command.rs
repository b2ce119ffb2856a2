//! 表单到 ffrcheck 参数列表的转换

use thiserror::Error;

/// 表单校验错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormError {
    #[error("Input directory is required")]
    MissingInputDir,
    #[error("Output directory is required")]
    MissingOutputDir,
}

/// 运行表单
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunForm {
    pub input_dir: String,
    pub output_dir: String,
    pub sspec: String,
    pub ube: String,
    pub mtlolf: String,
    pub ituff: String,
    pub visualid: String,
    pub log: bool,
    pub html_stats: bool,
}

impl Default for RunForm {
    fn default() -> Self {
        Self {
            input_dir: String::new(),
            output_dir: "output".to_string(),
            sspec: String::new(),
            ube: String::new(),
            mtlolf: String::new(),
            ituff: String::new(),
            visualid: String::new(),
            log: false,
            html_stats: true,
        }
    }
}

impl RunForm {
    /// 生成 ffrcheck 参数；空白字段不传
    ///
    /// # 示例
    /// ```
    /// use ffr_gui::RunForm;
    ///
    /// let form = RunForm {
    ///     input_dir: "lot1".into(),
    ///     sspec: " * ".into(),
    ///     ..Default::default()
    /// };
    /// assert_eq!(
    ///     form.build_args().unwrap(),
    ///     ["lot1", "output", "--sspec", "*", "--html-stats", "true"]
    /// );
    /// ```
    pub fn build_args(&self) -> Result<Vec<String>, FormError> {
        let input_dir = self.input_dir.trim();
        if input_dir.is_empty() {
            return Err(FormError::MissingInputDir);
        }
        let output_dir = self.output_dir.trim();
        if output_dir.is_empty() {
            return Err(FormError::MissingOutputDir);
        }

        let mut args = vec![input_dir.to_string(), output_dir.to_string()];
        for (flag, value) in [
            ("--sspec", &self.sspec),
            ("--ube", &self.ube),
            ("--mtlolf", &self.mtlolf),
            ("--ituff", &self.ituff),
            ("--visualid", &self.visualid),
        ] {
            let value = value.trim();
            if !value.is_empty() {
                args.push(flag.to_string());
                args.push(value.to_string());
            }
        }
        if self.log {
            args.push("--log".to_string());
        }
        args.push("--html-stats".to_string());
        args.push(self.html_stats.to_string());
        Ok(args)
    }
}

/// 控制台中显示的命令行，含空格的参数加引号
pub fn display_command(program: &str, args: &[String]) -> String {
    std::iter::once(program)
        .chain(args.iter().map(String::as_str))
        .map(|arg| {
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                format!("\"{arg}\"")
            } else {
                arg.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_args_full() {
        let form = RunForm {
            input_dir: " data/lot 1 ".to_string(),
            output_dir: "out".to_string(),
            sspec: "L0V8,L0VS".to_string(),
            ube: "a.ube".to_string(),
            mtlolf: "MTL.xml".to_string(),
            ituff: "itf".to_string(),
            visualid: "V1,V2".to_string(),
            log: true,
            html_stats: false,
        };
        assert_eq!(
            form.build_args().unwrap(),
            [
                "data/lot 1",
                "out",
                "--sspec",
                "L0V8,L0VS",
                "--ube",
                "a.ube",
                "--mtlolf",
                "MTL.xml",
                "--ituff",
                "itf",
                "--visualid",
                "V1,V2",
                "--log",
                "--html-stats",
                "false",
            ]
        );
    }

    #[test]
    fn test_build_args_validation() {
        assert_eq!(RunForm::default().build_args(), Err(FormError::MissingInputDir));
        let form = RunForm {
            input_dir: "lot".to_string(),
            output_dir: "  ".to_string(),
            ..Default::default()
        };
        assert_eq!(form.build_args(), Err(FormError::MissingOutputDir));
    }

    #[test]
    fn test_display_command() {
        let args = vec!["data/lot 1".to_string(), "out".to_string()];
        assert_eq!(display_command("ffrcheck", &args), "ffrcheck \"data/lot 1\" out");
    }
}
