//! 输入回显报告：把解析结果原样写成 CSV

use std::path::Path;

use ffr_core::FfrError;
use ffr_parsers::itf::ATTRIBUTE_COLUMNS;
use ffr_parsers::{FullStringRow, FuseDefRow, MtlOlfRow, TnameRow, UbeRecord};

use crate::csv_writer::CsvReport;

/// MTL_OLF 令牌列（`_MTL` 后缀）
pub const MTL_COLUMNS: [&str; 13] = [
    "dff_token_id_MTL",
    "token_name_MTL",
    "first_socket_upload_MTL",
    "upload_process_step_MTL",
    "ssid_MTL",
    "ref_level_MTL",
    "module_MTL",
    "field_name_MTL",
    "field_name_seq_MTL",
    "fuse_name_ori_MTL",
    "fuse_name_MTL",
    "fuse_register_ori_MTL",
    "fuse_register_MTL",
];

pub const GLOBAL_TYPE_COLUMN: &str = "global_type_MTL";

/// fuseDef 列（`_fuseDef` 后缀）
pub const FUSEDEF_COLUMNS: [&str; 5] = [
    "RegisterName_fuseDef",
    "FuseGroup_Name_fuseDef",
    "Fuse_Name_fuseDef",
    "StartAddress_fuseDef",
    "EndAddress_fuseDef",
];

pub const UBE_COLUMNS: [&str; 7] = [
    "visualID",
    "ULT",
    "ref_level",
    "first_socket_upload",
    "token_name",
    "tokenValue",
    "MDPOSITION",
];

const ITF_LEADING_COLUMNS: [&str; 7] = [
    "visualid",
    "SSID",
    "ULT",
    "TNAME",
    "TNAME_VALUE",
    "Domain",
    "Register",
];

/// 令牌行的 13 个 `_MTL` 单元格
pub fn mtl_cells(row: &MtlOlfRow) -> Vec<String> {
    let token = &row.token;
    vec![
        token.dff_token_id.clone(),
        token.token_name.clone(),
        token.first_socket_upload.clone(),
        token.upload_process_step.clone(),
        token.ssid.clone(),
        token.ref_level.clone(),
        token.module.clone(),
        row.field_name.clone(),
        row.field_name_seq.to_string(),
        row.fuse_name_ori.clone(),
        row.fuse_name.clone(),
        row.fuse_register_ori.clone(),
        row.fuse_register.clone(),
    ]
}

pub fn fusedef_cells(row: &FuseDefRow) -> Vec<String> {
    vec![
        row.register_name.clone(),
        row.fuse_group_name.clone(),
        row.fuse_name.clone(),
        row.start_address.clone(),
        row.end_address.clone(),
    ]
}

pub fn write_mtl_olf_csv(path: &Path, rows: &[MtlOlfRow]) -> Result<usize, FfrError> {
    let mut headers: Vec<&str> = MTL_COLUMNS.to_vec();
    headers.push(GLOBAL_TYPE_COLUMN);

    let mut report = CsvReport::create(path, &headers)?;
    for row in rows {
        let mut cells = mtl_cells(row);
        cells.push(row.token.global_type.clone());
        report.write_row(cells)?;
    }
    report.finish()
}

pub fn write_fusedef_csv(path: &Path, rows: &[FuseDefRow]) -> Result<usize, FfrError> {
    let mut report = CsvReport::create(path, &FUSEDEF_COLUMNS)?;
    for row in rows {
        report.write_row(fusedef_cells(row))?;
    }
    report.finish()
}

pub fn write_ube_csv(path: &Path, records: &[UbeRecord]) -> Result<usize, FfrError> {
    let mut report = CsvReport::create(path, &UBE_COLUMNS)?;
    for record in records {
        report.write_row([
            &record.visual_id,
            &record.ult,
            &record.ref_level,
            &record.first_socket_upload,
            &record.token_name,
            &record.token_value,
            &record.mdposition,
        ])?;
    }
    report.finish()
}

fn itf_headers(fullstring: bool) -> Vec<&'static str> {
    let mut headers = ITF_LEADING_COLUMNS.to_vec();
    if fullstring {
        headers.extend(["FD_Count", "FD_Numbers"]);
    }
    headers.push("filename");
    headers.extend(ATTRIBUTE_COLUMNS);
    headers
}

fn itf_cells(row: &TnameRow, fd: Option<(usize, &str)>) -> Vec<String> {
    let mut cells = vec![
        row.visual_id.clone(),
        row.ssid.clone(),
        row.ult.clone(),
        row.tname.clone(),
        row.value.clone(),
        row.domain.clone(),
        row.register.clone(),
    ];
    if let Some((count, numbers)) = fd {
        cells.push(count.to_string());
        cells.push(numbers.to_string());
    }
    cells.push(row.filename.clone());
    cells.extend(ATTRIBUTE_COLUMNS.iter().map(|key| row.attribute(key).to_string()));
    cells
}

pub fn write_itf_rows_csv(path: &Path, rows: &[TnameRow]) -> Result<usize, FfrError> {
    let mut report = CsvReport::create(path, &itf_headers(false))?;
    for row in rows {
        report.write_row(itf_cells(row, None))?;
    }
    report.finish()
}

pub fn write_itf_fullstring_csv(path: &Path, rows: &[FullStringRow]) -> Result<usize, FfrError> {
    let mut report = CsvReport::create(path, &itf_headers(true))?;
    for full in rows {
        report.write_row(itf_cells(&full.row, Some((full.fd_count, &full.fd_numbers))))?;
    }
    report.finish()
}
