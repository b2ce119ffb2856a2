//! FFR Check Report Engine
//!
//! This crate turns parsed inputs into the FFR Check reports: CSV echoes of
//! every input, the MTL_OLF/fuseDef match check, the DFF unit data check,
//! the sspec fuse string breakdown, per-unit data by fuse and the static
//! HTML statistics page.

pub mod breakdown;
pub mod csv_writer;
pub mod dff_check;
pub mod echo;
pub mod html;
pub mod matcher;
pub mod naming;
pub mod unit_data;

pub use breakdown::{build_breakdown, write_breakdown_csv, Breakdown, BreakdownRow, BreakdownStats};
pub use csv_writer::CsvReport;
pub use dff_check::{check_units, write_dff_csv, DffCheck, DffStats, DffTable};
pub use html::HtmlReport;
pub use matcher::{match_rows, write_match_csv, FuseDefIndex, MatchRow, MatchStats};
pub use unit_data::{build_unit_data, write_unit_data_csv, UnitDataStats, UnitDataTable, UnitStatus};

/// 百分比，保留一位小数；总数为 0 时返回 0
///
/// # 示例
/// ```
/// use ffr_report::percent;
///
/// assert_eq!(percent(4, 16), 25.0);
/// assert_eq!(percent(1, 3), 33.3);
/// assert_eq!(percent(5, 0), 0.0);
/// ```
pub fn percent(part: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (part as f64 * 1000.0 / total as f64).round() / 10.0
}
