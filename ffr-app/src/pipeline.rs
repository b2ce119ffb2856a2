//! 处理流程
//!
//! 顺序：UBE -> XML -> JSON -> 匹配 -> DFF 检查 -> ITF -> sspec 拆分 ->
//! 单元数据 -> HTML -> 汇总。单个阶段失败只记录错误，后续阶段继续执行。

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use ffr_core::FfrError;
use ffr_parsers::sspec::parse_sspec;
use ffr_parsers::ube::lot_and_location;
use ffr_parsers::{
    parse_fusedef, parse_itf_directory, FleFuseSet, FuseDefRow, ItfDataset, MtlOlfParser,
    MtlOlfRow, QdfSelection, SsidTable, UbeParser, UbeRecord, UbeStats, VisualIdFilter,
};
use ffr_report::{
    build_breakdown, build_unit_data, check_units, echo, match_rows, naming, write_breakdown_csv,
    write_dff_csv, write_match_csv, write_unit_data_csv, Breakdown, DffCheck, HtmlReport,
};
use log::{error, info, warn};

pub const MTL_OLF_FILE: &str = "MTL_OLF.xml";
pub const FUSEDEF_FILE: &str = "fuseDef.json";
pub const SSPEC_FILE: &str = "sspec.txt";

/// 一次运行的全部参数（命令行与配置合并后）
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    /// 报告名，取输入目录名
    pub name: String,
    pub sspec: Option<QdfSelection>,
    pub ube: Option<PathBuf>,
    pub mtlolf: PathBuf,
    pub ituff: Option<PathBuf>,
    pub visual_ids: VisualIdFilter,
    pub html_stats: bool,
    pub ssid_table: SsidTable,
    pub fle_filename: String,
    pub progress_interval: usize,
}

/// 运行结果
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub xml_rows: usize,
    pub fusedef_rows: usize,
    pub ube_records: usize,
    pub itf_rows: usize,
    pub outputs: Vec<PathBuf>,
}

impl RunSummary {
    /// 至少处理了一种输入
    pub fn processed_any(&self) -> bool {
        self.xml_rows > 0 || self.fusedef_rows > 0 || self.ube_records > 0 || self.itf_rows > 0
    }
}

/// 阶段结果：失败时记录错误并返回 None
fn stage<T>(label: &str, result: Result<T, FfrError>) -> Option<T> {
    result
        .map_err(|e| error!("{label} failed: {e}"))
        .ok()
}

/// 流程状态
pub struct Pipeline {
    options: RunOptions,
    now: DateTime<Local>,
    html: HtmlReport,
    summary: RunSummary,
}

impl Pipeline {
    pub fn new(options: RunOptions, now: DateTime<Local>) -> Self {
        let html = HtmlReport::new(&options.name);
        Self {
            options,
            now,
            html,
            summary: RunSummary::default(),
        }
    }

    fn output(&self, file_name: &str) -> PathBuf {
        naming::report_path(&self.options.output_dir, file_name)
    }

    fn record_output(&mut self, path: &Path) {
        info!("Results: {}", path.display());
        self.html.add_output_file(path);
        self.summary.outputs.push(path.to_path_buf());
    }

    /// 执行全部阶段
    pub fn run(mut self) -> RunSummary {
        let ube = self.run_ube().unwrap_or_default();
        let tokens = self.run_xml().unwrap_or_default();
        let fuse_rows = self.run_fusedef().unwrap_or_default();

        if !tokens.is_empty() && !fuse_rows.is_empty() {
            self.run_match(&tokens, &fuse_rows);
        } else {
            warn!("Cannot create match check - need both XML and JSON data");
        }

        let dff = if !tokens.is_empty() && !ube.is_empty() {
            self.run_dff(&tokens, &ube)
        } else {
            None
        };

        let itf = self.run_itf();
        if let Some(breakdown) = self.run_sspec(&fuse_rows) {
            match &itf {
                Some(dataset) => self.run_unit_data(&breakdown, dataset, dff.as_ref()),
                None => info!("Unit data skipped - no ITF data"),
            }
        }

        if self.options.html_stats {
            let path = self.output(&naming::html_statistics(&self.options.name));
            if let Some(path) = stage("HTML report", self.html.write(&path, self.now)) {
                self.record_output(&path);
            }
        }

        self.log_summary();
        self.summary
    }

    fn run_ube(&mut self) -> Option<Vec<UbeRecord>> {
        let path = self.options.ube.clone()?;
        if !path.is_file() {
            error!("UBE file '{}' does not exist", path.display());
            return None;
        }
        info!("Processing UBE file: {}", path.display());
        let parser = UbeParser::new().with_progress_interval(self.options.progress_interval);
        let records = stage("UBE parsing", parser.parse_file(&path))?;
        if records.is_empty() {
            warn!("No UBE records found in {}", path.display());
            return None;
        }

        let (lot, location) = lot_and_location(&path);
        let output = self.output(&naming::ube_echo(&lot, &location));
        if stage("UBE report", echo::write_ube_csv(&output, &records)).is_some() {
            self.record_output(&output);
        }

        let stats = UbeStats::from_records(&records);
        info!(
            "UBE statistics: {} entries, {} visual IDs, {} ULTs, {} tokens, {} MDPOSITIONs",
            stats.total_entries,
            stats.unique_visual_ids,
            stats.unique_ults,
            stats.unique_tokens,
            stats.unique_mdpositions
        );
        self.html.add_ube(&stats);
        self.summary.ube_records = records.len();
        Some(records)
    }

    fn run_xml(&mut self) -> Option<Vec<MtlOlfRow>> {
        let path = self.options.mtlolf.clone();
        if !path.is_file() {
            warn!("MTL_OLF.xml not found at '{}'", path.display());
            return None;
        }
        info!("Processing XML file: {}", path.display());
        let parser = MtlOlfParser::new().with_progress_interval(self.options.progress_interval);
        let document = stage("XML parsing", parser.parse_file(&path))?;

        let output = self.output(&naming::mtl_olf_echo(&self.options.name));
        if stage("XML report", echo::write_mtl_olf_csv(&output, &document.rows)).is_some() {
            self.record_output(&output);
        }
        info!(
            "XML statistics: {} tokens, {} records, {} unique token names",
            document.stats.total_tokens,
            document.stats.total_records,
            document.stats.unique_token_names
        );
        self.html.add_mtl_olf(&document.stats);
        self.summary.xml_rows = document.rows.len();
        Some(document.rows)
    }

    fn run_fusedef(&mut self) -> Option<Vec<FuseDefRow>> {
        let path = self.options.input_dir.join(FUSEDEF_FILE);
        if !path.is_file() {
            warn!(
                "fuseDef.json not found in input directory '{}'",
                self.options.input_dir.display()
            );
            return None;
        }
        let rows = stage("JSON parsing", parse_fusedef(&path))?;

        let output = self.output(&naming::fusedef_echo(&self.options.name));
        if stage("JSON report", echo::write_fusedef_csv(&output, &rows)).is_some() {
            self.record_output(&output);
        }
        self.summary.fusedef_rows = rows.len();
        Some(rows)
    }

    fn run_match(&mut self, tokens: &[MtlOlfRow], fuse_rows: &[FuseDefRow]) {
        info!("Creating match check...");
        let (rows, stats) = match_rows(tokens, fuse_rows);
        let output = self.output(&naming::match_check(&self.options.name));
        if stage("Match report", write_match_csv(&output, &rows)).is_some() {
            self.record_output(&output);
        }
        stats.log_summary();
        self.html.add_match(&stats);
    }

    fn run_dff(&mut self, tokens: &[MtlOlfRow], records: &[UbeRecord]) -> Option<DffCheck> {
        info!("Creating DFF unit data check...");
        let check = check_units(tokens, records);
        let output = self.output(&naming::dff_check(&self.options.name));
        if stage("DFF report", write_dff_csv(&output, tokens, &check)).is_some() {
            self.record_output(&output);
        }
        check.stats.log_summary();
        self.html.add_dff(&check.stats);
        Some(check)
    }

    fn run_itf(&mut self) -> Option<ItfDataset> {
        let dir = self.options.ituff.clone()?;
        info!("Processing ITF directory: {}", dir.display());
        let dataset = stage(
            "ITF parsing",
            parse_itf_directory(&dir, &self.options.ssid_table, &self.options.visual_ids),
        )?;
        if dataset.rows.is_empty() {
            warn!("No ITF TNAME rows found in {}", dir.display());
            return None;
        }

        let suffix = naming::timestamp_suffix(self.now);
        let name = self.options.name.clone();
        let output = self.output(&naming::itf_rows(&name, &suffix));
        if stage("ITF report", echo::write_itf_rows_csv(&output, &dataset.rows)).is_some() {
            self.record_output(&output);
        }
        let output = self.output(&naming::itf_fullstring(&name, &suffix));
        if stage(
            "ITF full-string report",
            echo::write_itf_fullstring_csv(&output, &dataset.fullstring_rows),
        )
        .is_some()
        {
            self.record_output(&output);
        }

        info!(
            "ITF statistics: {} files ({} failed), {} visual IDs, {} TNAME rows, {} full strings",
            dataset.stats.total_files,
            dataset.stats.failed_files,
            dataset.stats.unique_visual_ids,
            dataset.stats.total_tname_rows,
            dataset.stats.total_fullstring_rows
        );
        self.html.add_itf(&dataset.stats);
        self.summary.itf_rows = dataset.rows.len();
        Some(dataset)
    }

    fn run_sspec(&mut self, fuse_rows: &[FuseDefRow]) -> Option<Breakdown> {
        let selection = self.options.sspec.clone()?;
        let path = self.options.input_dir.join(SSPEC_FILE);
        if !path.is_file() {
            warn!(
                "sspec.txt not found in input directory '{}'",
                self.options.input_dir.display()
            );
            return None;
        }

        let qdfs = stage("QDF discovery", selection.resolve(&path))?;
        if qdfs.is_empty() {
            warn!("No QDFs resolved for processing");
            return None;
        }
        let entries = stage("sspec parsing", parse_sspec(&path, &qdfs))?;
        if entries.is_empty() || fuse_rows.is_empty() {
            warn!("Cannot create sspec breakdown - need sspec data and fuseDef data");
            return None;
        }

        let breakdown = build_breakdown(&entries, fuse_rows, &qdfs);
        let output = self.output(&naming::sspec_breakdown(&qdfs, &self.options.name));
        if stage("sspec breakdown report", write_breakdown_csv(&output, &breakdown)).is_some() {
            self.record_output(&output);
        }
        self.html.add_breakdown(&breakdown.stats);
        Some(breakdown)
    }

    fn run_unit_data(&mut self, breakdown: &Breakdown, itf: &ItfDataset, dff: Option<&DffCheck>) {
        let fle = stage(
            "FLE settings",
            FleFuseSet::load(&self.options.input_dir, &self.options.fle_filename),
        )
        .unwrap_or_default();

        let table = itf.full_string_table();
        let units = build_unit_data(
            breakdown,
            &table,
            &table.visual_ids(),
            dff.map(|check| &check.table),
            &fle,
        );
        let output = self.output(&naming::unit_data(&self.options.name));
        if stage("Unit data report", write_unit_data_csv(&output, &units)).is_some() {
            self.record_output(&output);
        }
        self.html.add_unit_data(&units.stats);
    }

    fn log_summary(&self) {
        let summary = &self.summary;
        info!("PROCESSING SUMMARY:");
        let report = |label: &str, count: usize| {
            if count > 0 {
                info!("  {label}: {count} rows");
            } else {
                warn!("  {label}: failed or no data found");
            }
        };
        report("XML processing", summary.xml_rows);
        report("JSON processing", summary.fusedef_rows);
        report("UBE processing", summary.ube_records);
        report("ITF processing", summary.itf_rows);
        info!(
            "{} output files saved to: {}",
            summary.outputs.len(),
            self.options.output_dir.display()
        );
    }
}
