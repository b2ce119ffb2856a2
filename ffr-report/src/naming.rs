//! 输出文件命名

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use ffr_core::sanitizer::sanitize_filename;

/// 输出目录下的文件路径，文件名经过清理
pub fn report_path(output_dir: &Path, file_name: &str) -> PathBuf {
    output_dir.join(sanitize_filename(file_name))
}

pub fn mtl_olf_echo(name: &str) -> String {
    format!("_MTL_OLF-{name}.csv")
}

pub fn fusedef_echo(name: &str) -> String {
    format!("_FUSEDEF-{name}.csv")
}

pub fn ube_echo(lot: &str, location: &str) -> String {
    format!("_UBE-----{lot}_{location}.csv")
}

pub fn match_check(name: &str) -> String {
    format!("xfuse-mtlolf-check_{name}.csv")
}

pub fn dff_check(name: &str) -> String {
    format!("xfuse-dff-unitData-check_{name}.csv")
}

/// ITF 输出的时间戳后缀 `YYYYmmdd_HHMMSS`
pub fn timestamp_suffix(now: DateTime<Local>) -> String {
    now.format("%Y%m%d_%H%M%S").to_string()
}

pub fn itf_rows(name: &str, suffix: &str) -> String {
    format!("itf_tname_value_rows_{name}_{suffix}.csv")
}

pub fn itf_fullstring(name: &str, suffix: &str) -> String {
    format!("itf_tname_value_rows_fullstring_{name}_{suffix}.csv")
}

/// `xsplit-sspec_<qdf1_qdf2>_<name>.csv`
pub fn sspec_breakdown<S: AsRef<str>>(qdfs: &[S], name: &str) -> String {
    let qdfs: Vec<&str> = qdfs.iter().map(AsRef::as_ref).collect();
    format!("xsplit-sspec_{}_{name}.csv", qdfs.join("_"))
}

pub fn unit_data(name: &str) -> String {
    format!("S_UnitData_by_Fuse_{name}.csv")
}

pub fn html_statistics(name: &str) -> String {
    format!("xFFR-Statistics_{name}.html")
}

pub fn console_log(name: &str) -> String {
    format!("xconsole_{name}.txt")
}
