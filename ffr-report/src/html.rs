//! HTML 统计报告生成器
//!
//! 生成单文件静态 HTML：内联样式，不含脚本。每个处理阶段的统计在加入时
//! 即被整理为卡片和表格，生成时统一转义。

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use ffr_core::sanitizer::html_escape;
use ffr_core::FfrError;
use ffr_parsers::{ItfStats, MtlOlfStats, UbeStats};

use crate::breakdown::BreakdownStats;
use crate::dff_check::DffStats;
use crate::matcher::MatchStats;
use crate::percent;
use crate::unit_data::{UnitDataStats, UnitStatus};

const STYLE: &str = r#"
        body { font-family: 'Segoe UI', Tahoma, Geneva, Verdana, sans-serif; margin: 20px; background-color: #f5f5f5; }
        .container { max-width: 1400px; margin: 0 auto; background-color: white; padding: 30px; border-radius: 8px; box-shadow: 0 2px 4px rgba(0,0,0,0.1); }
        h1 { color: #0078d4; border-bottom: 3px solid #0078d4; padding-bottom: 10px; }
        h2 { color: #005a9e; margin-top: 30px; }
        h3 { color: #333; margin-top: 20px; }
        .stats-grid { display: grid; grid-template-columns: repeat(auto-fit, minmax(250px, 1fr)); gap: 20px; margin: 20px 0; }
        .stat-card { background: linear-gradient(135deg, #667eea 0%, #764ba2 100%); color: white; padding: 20px; border-radius: 8px; box-shadow: 0 4px 6px rgba(0,0,0,0.1); }
        .stat-label { font-size: 14px; opacity: 0.9; }
        .stat-value { font-size: 32px; font-weight: bold; margin-top: 10px; }
        table { width: 100%; border-collapse: collapse; margin-top: 20px; }
        th, td { padding: 12px; text-align: left; border-bottom: 1px solid #ddd; }
        th { background-color: #0078d4; color: white; font-weight: bold; }
        tr:hover { background-color: #f5f5f5; }
        .timestamp { color: #666; font-size: 14px; margin-top: 20px; }
"#;

/// 状态列顺序
const STATUS_ORDER: [UnitStatus; 5] = [
    UnitStatus::Sort,
    UnitStatus::Fle,
    UnitStatus::Dynamic,
    UnitStatus::Static,
    UnitStatus::Mismatch,
];

/// 报告中的表格
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Table {
    caption: String,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    fn new(caption: &str, headers: &[&str]) -> Self {
        Self {
            caption: caption.to_string(),
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    fn push<I: IntoIterator<Item = String>>(&mut self, row: I) {
        self.rows.push(row.into_iter().collect());
    }
}

/// 报告的一个小节
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Section {
    title: String,
    cards: Vec<(String, String)>,
    tables: Vec<Table>,
}

impl Section {
    fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            ..Default::default()
        }
    }

    fn card(&mut self, label: &str, value: impl ToString) {
        self.cards.push((label.to_string(), value.to_string()));
    }
}

fn with_percent(part: usize, total: usize) -> String {
    format!("{part} ({:.1}%)", percent(part, total))
}

fn count_table(caption: &str, key: &str, counts: &[(String, usize)]) -> Table {
    let mut table = Table::new(caption, &[key, "Count"]);
    for (name, count) in counts {
        table.push([name.clone(), count.to_string()]);
    }
    table
}

/// HTML 统计报告
pub struct HtmlReport {
    name: String,
    sections: Vec<Section>,
    output_files: Vec<String>,
}

impl HtmlReport {
    /// # 参数
    /// - `name`: 熔丝文件名（用于标题）
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            sections: Vec::new(),
            output_files: Vec::new(),
        }
    }

    /// 登记一个已生成的输出文件
    pub fn add_output_file(&mut self, path: &Path) {
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        self.output_files.push(name);
    }

    pub fn section_count(&self) -> usize {
        self.sections.len()
    }

    pub fn add_mtl_olf(&mut self, stats: &MtlOlfStats) {
        let mut section = Section::new("XML (MTL_OLF) Statistics");
        section.card("Tokens", stats.total_tokens);
        section.card("Records", stats.total_records);
        section.card("Unique Token Names", stats.unique_token_names);
        section.card("Records with Field Name", stats.total_fields);

        let to_vec = |map: &BTreeMap<String, usize>| -> Vec<(String, usize)> {
            map.iter().map(|(k, v)| (k.clone(), *v)).collect()
        };
        section
            .tables
            .push(count_table("By Fuse Register", "fuse_register", &to_vec(&stats.by_fuse_register)));
        section
            .tables
            .push(count_table("By Module", "module", &to_vec(&stats.by_module)));
        section.tables.push(count_table(
            "By First Socket Upload",
            "first_socket_upload",
            &to_vec(&stats.by_first_socket_upload),
        ));
        self.sections.push(section);
    }

    pub fn add_ube(&mut self, stats: &UbeStats) {
        let mut section = Section::new("UBE Statistics");
        section.card("Entries", stats.total_entries);
        section.card("Visual IDs", stats.unique_visual_ids);
        section.card("ULTs", stats.unique_ults);
        section.card("Ref Levels", stats.unique_ref_levels);
        section.card("Tokens", stats.unique_tokens);
        section.card("MDPOSITIONs", stats.unique_mdpositions);
        section
            .tables
            .push(count_table("Ref Level Breakdown", "ref_level", &stats.ref_level_breakdown));
        section.tables.push(count_table(
            "MDPOSITION Breakdown",
            "MDPOSITION",
            &stats.mdposition_breakdown,
        ));
        self.sections.push(section);
    }

    pub fn add_match(&mut self, stats: &MatchStats) {
        let total = stats.total_rows;
        let mut section = Section::new("Match Statistics");
        section.card("Rows", total);
        section.card("Register Matches", with_percent(stats.register_matches, total));
        section.card("FuseGroup Matches", with_percent(stats.fusegroup_matches, total));
        section.card("FuseName Matches", with_percent(stats.fusename_matches, total));
        section.card("FuseGroup N/A", stats.fusegroup_na);
        section.card("FuseName N/A", stats.fusename_na);

        let mut registers = Table::new(
            "Mismatches by Register",
            &["Register", "Tokens", "Register", "FuseGroup", "FuseName", "Any"],
        );
        for (register, summary) in &stats.per_register {
            registers.push([
                register.clone(),
                summary.total_tokens.to_string(),
                summary.register_mismatches.to_string(),
                summary.fusegroup_mismatches.to_string(),
                summary.fusename_mismatches.to_string(),
                summary.mismatch_tokens.to_string(),
            ]);
        }
        section.tables.push(registers);

        let mut mismatches = Table::new(
            "Mismatch Details",
            &["Kind", "token_name", "field_name", "module", "fuse_register", "fuse_name"],
        );
        for (kind, entries) in [
            ("register", &stats.register_mismatches),
            ("fuse group", &stats.fusegroup_mismatches),
            ("fuse name", &stats.fusename_mismatches),
        ] {
            for entry in entries {
                mismatches.push([
                    kind.to_string(),
                    entry.token_name.clone(),
                    entry.field_name.clone(),
                    entry.module.clone(),
                    entry.fuse_register.clone(),
                    entry.fuse_name.clone(),
                ]);
            }
        }
        section.tables.push(mismatches);
        self.sections.push(section);
    }

    pub fn add_dff(&mut self, stats: &DffStats) {
        let mut section = Section::new("DFF Unit Data Check");
        section.card("Rows", stats.total_rows);
        section.card("Visual IDs", stats.visual_ids);
        section.card("Missing Tokens", stats.total_missing);
        section.card("Invalid Tokens (-999)", stats.total_invalid);

        let mut registers = Table::new("By Register", &["Register", "Tokens", "Missing", "Invalid"]);
        for (register, register_stats) in &stats.per_register {
            registers.push([
                register.clone(),
                register_stats.total_tokens.to_string(),
                register_stats.missing_tokens.to_string(),
                register_stats.invalid_tokens.to_string(),
            ]);
        }
        section.tables.push(registers);

        let mut tokens = Table::new("Missing / Invalid by Token", &["Register|Token", "Missing", "Invalid"]);
        let keys: BTreeSet<&String> = stats
            .missing_by_token
            .keys()
            .chain(stats.invalid_by_token.keys())
            .collect();
        for key in keys {
            tokens.push([
                key.clone(),
                stats.missing_by_token.get(key).copied().unwrap_or_default().to_string(),
                stats.invalid_by_token.get(key).copied().unwrap_or_default().to_string(),
            ]);
        }
        section.tables.push(tokens);
        self.sections.push(section);
    }

    pub fn add_itf(&mut self, stats: &ItfStats) {
        let mut section = Section::new("ITF Statistics");
        section.card("Files", stats.total_files);
        section.card("Failed Files", stats.failed_files);
        section.card("Visual IDs", stats.unique_visual_ids);
        section.card("TNAME Rows", stats.total_tname_rows);
        section.card("Full-String Rows", stats.total_fullstring_rows);
        section.card("SSIDs", stats.unique_ssids);
        section
            .tables
            .push(count_table("SSID Breakdown", "SSID", &stats.ssid_breakdown));
        section
            .tables
            .push(count_table("Register Breakdown", "Register", &stats.register_breakdown));
        self.sections.push(section);
    }

    pub fn add_breakdown(&mut self, stats: &BreakdownStats) {
        let mut section = Section::new("sspec Register Statistics");
        section.card("Rows", stats.total_rows);
        section.card("Registers", stats.unique_registers);
        section.card("Fuse Names", stats.unique_fuse_names);
        section.card("QDFs", stats.qdfs.join(", "));

        let mut registers = Table::new(
            "Per Register and QDF",
            &[
                "Register",
                "QDF",
                "Fuse Definitions",
                "Valid Extractions",
                "Valid Hex",
                "Failed Hex",
                "Total Bits",
                "VF_Heap_Unused",
                "Static / Dynamic / Sort Bits",
            ],
        );
        for (register, qdfs) in &stats.registers {
            for (qdf, qdf_stats) in qdfs {
                let bits = qdf_stats
                    .profile
                    .map(|profile| {
                        format!(
                            "{} / {} / {}",
                            profile.static_bits, profile.dynamic_bits, profile.sort_bits
                        )
                    })
                    .unwrap_or_else(|| "N/A".to_string());
                registers.push([
                    register.clone(),
                    qdf.clone(),
                    qdf_stats.fuse_definitions.to_string(),
                    format!(
                        "{} ({:.1}%)",
                        qdf_stats.valid_extractions,
                        qdf_stats.valid_extractions_percent()
                    ),
                    format!("{} ({:.1}%)", qdf_stats.valid_hex, qdf_stats.valid_hex_percent()),
                    format!("{} ({:.1}%)", qdf_stats.failed_hex, qdf_stats.failed_hex_percent()),
                    qdf_stats.total_bit_length.to_string(),
                    format!(
                        "{} ({:.1}%)",
                        qdf_stats.vf_heap_unused_bit_length, qdf_stats.vf_heap_unused_percentage
                    ),
                    bits,
                ]);
            }
        }
        section.tables.push(registers);
        self.sections.push(section);
    }

    pub fn add_unit_data(&mut self, stats: &UnitDataStats) {
        let mut section = Section::new("Unit Status Check");
        section.card("Units", stats.units);
        section.card("Rows", stats.rows);
        section.card("Register Values Decoded", stats.mapper.decoded_pairs);
        section.card("DFF Values", if stats.with_dff { "yes" } else { "no" });

        let mut headers = vec!["visualID"];
        headers.extend(STATUS_ORDER.iter().map(|status| status.label()));
        let mut units = Table::new("Status Counts", &headers);
        for (visual_id, counts) in &stats.status_counts {
            let mut row = vec![visual_id.clone()];
            row.extend(
                STATUS_ORDER
                    .iter()
                    .map(|status| counts.get(status.label()).copied().unwrap_or_default().to_string()),
            );
            units.push(row);
        }
        section.tables.push(units);
        self.sections.push(section);
    }

    /// 生成完整的 HTML 文本
    pub fn generate(&self, now: DateTime<Local>) -> String {
        let mut html = String::new();
        let name = html_escape(&self.name);

        html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
        html.push_str("    <meta charset=\"UTF-8\">\n");
        html.push_str(&format!("    <title>FFR Check Statistics - {name}</title>\n"));
        html.push_str(&format!("    <style>{STYLE}    </style>\n"));
        html.push_str("</head>\n<body>\n    <div class=\"container\">\n");
        html.push_str("        <h1>FFR Check Statistics Report</h1>\n");
        html.push_str(&format!("        <p><strong>FusefileName:</strong> {name}</p>\n"));
        html.push_str(&format!(
            "        <p class=\"timestamp\">Generated: {}</p>\n",
            now.format("%Y-%m-%d %H:%M:%S")
        ));

        let mut overview = Section::new("Overview");
        overview.card("Sections Processed", self.sections.len());
        overview.card("Output Files", self.output_files.len());
        push_section(&mut html, &overview);
        if !self.output_files.is_empty() {
            html.push_str("        <ul>\n");
            for file in &self.output_files {
                html.push_str(&format!("            <li>{}</li>\n", html_escape(file)));
            }
            html.push_str("        </ul>\n");
        }

        for section in &self.sections {
            push_section(&mut html, section);
        }

        html.push_str("    </div>\n</body>\n</html>\n");
        html
    }

    /// 写出报告，返回文件路径
    pub fn write(&self, path: &Path, now: DateTime<Local>) -> Result<PathBuf, FfrError> {
        fs::write(path, self.generate(now)).map_err(|e| FfrError::io(path, e))?;
        Ok(path.to_path_buf())
    }
}

fn push_section(html: &mut String, section: &Section) {
    html.push_str(&format!("        <h2>{}</h2>\n", html_escape(&section.title)));
    if !section.cards.is_empty() {
        html.push_str("        <div class=\"stats-grid\">\n");
        for (label, value) in &section.cards {
            html.push_str("            <div class=\"stat-card\">\n");
            html.push_str(&format!(
                "                <div class=\"stat-label\">{}</div>\n",
                html_escape(label)
            ));
            html.push_str(&format!(
                "                <div class=\"stat-value\">{}</div>\n",
                html_escape(value)
            ));
            html.push_str("            </div>\n");
        }
        html.push_str("        </div>\n");
    }

    for table in &section.tables {
        if table.rows.is_empty() {
            continue;
        }
        html.push_str(&format!("        <h3>{}</h3>\n", html_escape(&table.caption)));
        html.push_str("        <table>\n            <tr>");
        for header in &table.headers {
            html.push_str(&format!("<th>{}</th>", html_escape(header)));
        }
        html.push_str("</tr>\n");
        for row in &table.rows {
            html.push_str("            <tr>");
            for cell in row {
                html.push_str(&format!("<td>{}</td>", html_escape(cell)));
            }
            html.push_str("</tr>\n");
        }
        html.push_str("        </table>\n");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 3, 5, 14, 7, 9).unwrap()
    }

    #[test]
    fn test_empty_report() {
        let report = HtmlReport::new("fuse<1>");
        let html = report.generate(now());
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("FFR Check Statistics - fuse&lt;1&gt;"));
        assert!(html.contains("Generated: 2024-03-05 14:07:09"));
        assert!(!html.contains("<script"));
        assert!(!html.contains("<table>"));
    }

    #[test]
    fn test_sections_and_escaping() {
        let mut report = HtmlReport::new("fuse");
        report.add_ube(&UbeStats {
            total_entries: 4,
            ref_level_breakdown: vec![("WFR".to_string(), 3), ("<CLASS>".to_string(), 1)],
            ..Default::default()
        });
        report.add_dff(&DffStats {
            total_rows: 2,
            total_missing: 1,
            missing_by_token: BTreeMap::from([("CPU0|TOK".to_string(), 1)]),
            invalid_by_token: BTreeMap::from([("CPU0|BAD".to_string(), 2)]),
            ..Default::default()
        });
        report.add_output_file(Path::new("/out/xFFR-Statistics_fuse.html"));
        assert_eq!(report.section_count(), 2);

        let html = report.generate(now());
        assert!(html.contains("<h2>UBE Statistics</h2>"));
        assert!(html.contains("<td>&lt;CLASS&gt;</td><td>1</td>"));
        assert!(html.contains("<td>CPU0|BAD</td><td>0</td><td>2</td>"));
        assert!(html.contains("<li>xFFR-Statistics_fuse.html</li>"));
        // 概览卡片：两个小节、一个输出文件
        assert!(html.contains("<div class=\"stat-label\">Sections Processed</div>\n                <div class=\"stat-value\">2</div>"));
    }

    #[test]
    fn test_unit_status_table() {
        let mut stats = UnitDataStats {
            units: 1,
            rows: 3,
            ..Default::default()
        };
        stats.status_counts.insert(
            "V1".to_string(),
            BTreeMap::from([("static".to_string(), 2), ("!mismatch!".to_string(), 1)]),
        );
        let mut report = HtmlReport::new("fuse");
        report.add_unit_data(&stats);

        let html = report.generate(now());
        assert!(html.contains("<th>!mismatch!</th>"));
        assert!(html.contains("<td>V1</td><td>0</td><td>0</td><td>0</td><td>2</td><td>1</td>"));
    }

    #[test]
    fn test_write_report() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.html");
        let report = HtmlReport::new("fuse");
        assert_eq!(report.write(&path, now()).unwrap(), path);
        assert!(std::fs::read_to_string(&path).unwrap().contains("</html>"));
    }
}
