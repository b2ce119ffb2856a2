//! FFR Check Application
//!
//! Main entry point for the `ffrcheck` command: validates fuse definitions
//! against the token XML, unit data and ITF test logs and writes the CSV and
//! HTML reports into the output directory.

mod config;
mod logging;
mod pipeline;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use chrono::Local;
use clap::{CommandFactory, Parser};
use ffr_parsers::{QdfSelection, VisualIdFilter};
use log::{error, info, warn};

use crate::config::Config;
use crate::logging::ConsoleLog;
use crate::pipeline::{Pipeline, RunOptions, MTL_OLF_FILE};

#[derive(Parser, Debug, Default)]
#[command(
    name = "ffrcheck",
    author,
    version,
    about = "Fuse file release check",
    after_help = "Default values can be configured in ffrcheck.toml under [default_arguments]"
)]
struct Args {
    /// Input directory containing MTL_OLF.xml, fuseDef.json and sspec.txt
    input_dir: Option<PathBuf>,

    /// Output directory for generated reports
    output_dir: Option<PathBuf>,

    /// Target QDFs, comma separated, or `*` for every QDF in sspec.txt
    #[arg(long)]
    sspec: Option<String>,

    /// UBE file to parse
    #[arg(long)]
    ube: Option<PathBuf>,

    /// MTL_OLF.xml path (default: <INPUT_DIR>/MTL_OLF.xml)
    #[arg(long)]
    mtlolf: Option<PathBuf>,

    /// Directory of ITF test logs
    #[arg(long)]
    ituff: Option<PathBuf>,

    /// Visual ID filter for ITF units, comma separated, or `*`
    #[arg(long)]
    visualid: Option<String>,

    /// Copy the console log to xconsole_<name>.txt
    #[arg(long)]
    log: bool,

    /// Generate the HTML statistics report
    #[arg(long, value_name = "BOOL")]
    html_stats: Option<bool>,

    /// Configuration file (default: ./ffrcheck.toml)
    #[arg(long)]
    config: Option<PathBuf>,
}

/// 报告名：输入目录名
fn report_name(input_dir: &Path) -> String {
    input_dir
        .canonicalize()
        .ok()
        .as_deref()
        .unwrap_or(input_dir)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "ffrcheck".to_string())
}

/// 合并命令行与配置；未给出输入目录时返回 None
fn resolve_options(args: &Args, config: &Config) -> Result<Option<RunOptions>> {
    let defaults = &config.default_arguments;
    let Some(input_dir) = args
        .input_dir
        .clone()
        .or_else(|| defaults.input_dir.as_ref().map(PathBuf::from))
    else {
        return Ok(None);
    };
    if !input_dir.is_dir() {
        bail!("Invalid input directory '{}'", input_dir.display());
    }

    let output_dir = args
        .output_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from(&defaults.output_dir));

    let mtlolf = match args
        .mtlolf
        .clone()
        .or_else(|| defaults.mtlolf.as_ref().map(PathBuf::from))
    {
        Some(path) if !path.is_file() => {
            bail!("Specified MTL_OLF.xml file '{}' does not exist", path.display())
        }
        Some(path) => path,
        None => input_dir.join(MTL_OLF_FILE),
    };

    let sspec = args
        .sspec
        .as_deref()
        .or(defaults.sspec.as_deref())
        .and_then(QdfSelection::parse);
    let visual_ids = match args.visualid.as_deref().or(defaults.visualid.as_deref()) {
        Some(text) => VisualIdFilter::parse(text),
        None => config.itf_parser.visualid_filter.filter(),
    };

    Ok(Some(RunOptions {
        name: report_name(&input_dir),
        input_dir,
        output_dir,
        sspec,
        ube: args.ube.clone().or_else(|| defaults.ube.as_ref().map(PathBuf::from)),
        mtlolf,
        ituff: args
            .ituff
            .clone()
            .or_else(|| defaults.ituff.as_ref().map(PathBuf::from)),
        visual_ids,
        html_stats: args.html_stats.unwrap_or(defaults.html_stats),
        ssid_table: config.itf_parser.ssid_table(),
        fle_filename: config.fle_settings.filename.clone(),
        progress_interval: config.processing.progress_interval,
    }))
}

fn run(args: Args, console: &ConsoleLog) -> Result<ExitCode> {
    let config = Config::load(args.config.as_deref());
    let Some(options) = resolve_options(&args, &config)? else {
        Args::command()
            .error(
                clap::error::ErrorKind::MissingRequiredArgument,
                "INPUT_DIR is required (either via command line or ffrcheck.toml)",
            )
            .exit();
    };

    std::fs::create_dir_all(&options.output_dir).with_context(|| {
        format!(
            "Failed to create output directory '{}'",
            options.output_dir.display()
        )
    })?;

    if args.log || config.default_arguments.log {
        let path = ffr_report::naming::report_path(
            &options.output_dir,
            &ffr_report::naming::console_log(&options.name),
        );
        console
            .tee_to(&path)
            .with_context(|| format!("Failed to create console log '{}'", path.display()))?;
        info!("Console log: {}", path.display());
    }

    info!("Input directory: {}", options.input_dir.display());
    info!("Output directory: {}", options.output_dir.display());
    info!("FusefileName: {}", options.name);
    match &options.sspec {
        Some(QdfSelection::All) => info!("QDF selection: * (all QDFs in sspec.txt)"),
        Some(QdfSelection::List(qdfs)) => info!("Target QDFs: {qdfs:?}"),
        None => {}
    }
    info!("MTL_OLF file: {}", options.mtlolf.display());

    let summary = Pipeline::new(options, Local::now()).run();
    if !summary.processed_any() {
        error!("No files were processed successfully!");
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

fn main() -> ExitCode {
    let args = Args::parse();
    let console = logging::init();

    let code = run(args, &console).unwrap_or_else(|e| {
        error!("{e:#}");
        ExitCode::FAILURE
    });
    if let Err(e) = console.close() {
        warn!("Failed to flush console log: {e}");
    }
    code
}
