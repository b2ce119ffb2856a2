//! MTL_OLF 令牌 XML 解析器
//!
//! 以事件流方式读取 `<Token>` 元素，每个 `<ValueDecoderField>` 展开为一行或多行
//! （逗号分隔的熔丝名/寄存器按配对规则展开）。令牌属性取自同名子元素文本，
//! 子元素缺失时退回到同名属性。

use std::collections::{BTreeMap, HashSet};
use std::io::BufRead;
use std::path::Path;

use ffr_core::FfrError;
use log::{debug, info};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::line_reader::open_buffered;

/// 令牌级属性
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenInfo {
    pub dff_token_id: String,
    pub token_name: String,
    pub first_socket_upload: String,
    pub upload_process_step: String,
    pub ssid: String,
    pub ref_level: String,
    pub module: String,
    pub global_type: String,
}

impl TokenInfo {
    fn set(&mut self, key: &str, value: String) {
        let slot = match key {
            "dff_token_id" => &mut self.dff_token_id,
            "name" | "token_name" => &mut self.token_name,
            "first_socket_upload" => &mut self.first_socket_upload,
            "upload_process_step" => &mut self.upload_process_step,
            "ssid" => &mut self.ssid,
            "ref_level" => &mut self.ref_level,
            "module" => &mut self.module,
            "global_type" => &mut self.global_type,
            _ => return,
        };
        *slot = value;
    }
}

/// 解码字段属性
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct FieldInfo {
    name: String,
    fuse_name: String,
    fuse_register: String,
}

impl FieldInfo {
    fn set(&mut self, key: &str, value: String) {
        let slot = match key {
            "name" | "field_name" => &mut self.name,
            "fuse_name" => &mut self.fuse_name,
            "fuse_register" => &mut self.fuse_register,
            _ => return,
        };
        *slot = value;
    }
}

/// MTL_OLF 输出行：一个 (令牌, 字段, 熔丝名/寄存器配对)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MtlOlfRow {
    pub token: TokenInfo,
    pub field_name: String,
    /// 字段在令牌内的 1 起始序号；无字段的令牌为 0
    pub field_name_seq: usize,
    pub fuse_name_ori: String,
    pub fuse_name: String,
    pub fuse_register_ori: String,
    pub fuse_register: String,
}

/// 解析统计
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MtlOlfStats {
    pub total_tokens: usize,
    pub total_records: usize,
    pub unique_token_names: usize,
    /// 带字段名的行数
    pub total_fields: usize,
    pub by_fuse_register: BTreeMap<String, usize>,
    pub by_module: BTreeMap<String, usize>,
    pub by_first_socket_upload: BTreeMap<String, usize>,
}

/// 解析结果
#[derive(Debug, Clone, Default)]
pub struct MtlOlfDocument {
    pub rows: Vec<MtlOlfRow>,
    pub stats: MtlOlfStats,
}

/// 按配对规则展开逗号分隔的熔丝名与寄存器列表
///
/// # 示例
/// ```
/// use ffr_parsers::mtl_olf::pair_fuse_names_registers;
///
/// let pairs = pair_fuse_names_registers("a,b,c", "CPU0");
/// assert_eq!(pairs.len(), 3);
/// assert!(pairs.iter().all(|(_, reg)| reg == "CPU0"));
/// ```
pub fn pair_fuse_names_registers(names: &str, registers: &str) -> Vec<(String, String)> {
    if names.is_empty() && registers.is_empty() {
        return vec![(String::new(), String::new())];
    }

    let split = |list: &str| -> Vec<String> {
        if list.is_empty() {
            return vec![String::new()];
        }
        list.split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(str::to_string)
            .collect()
    };
    let names = split(names);
    let registers = split(registers);

    match (names.len(), registers.len()) {
        (n, r) if n == r && n > 1 => names.into_iter().zip(registers).collect(),
        (n, 1) if n > 1 => {
            let register = &registers[0];
            names
                .into_iter()
                .map(|name| (name, register.clone()))
                .collect()
        }
        (1, r) if r > 1 => {
            let name = &names[0];
            registers
                .into_iter()
                .map(|register| (name.clone(), register))
                .collect()
        }
        (n, r) if n > 1 && r > 1 => {
            let common = n.min(r);
            let mut pairs: Vec<(String, String)> = names
                .iter()
                .cloned()
                .zip(registers.iter().cloned())
                .take(common)
                .collect();
            if let (Some(last_name), Some(last_register)) = (names.last(), registers.last()) {
                pairs.extend(
                    names[common..]
                        .iter()
                        .map(|name| (name.clone(), last_register.clone())),
                );
                pairs.extend(
                    registers[common..]
                        .iter()
                        .map(|register| (last_name.clone(), register.clone())),
                );
            }
            pairs
        }
        _ => vec![(
            names.first().cloned().unwrap_or_default(),
            registers.first().cloned().unwrap_or_default(),
        )],
    }
}

/// 当前打开的令牌
struct OpenToken {
    depth: usize,
    info: TokenInfo,
    fields: Vec<FieldInfo>,
}

/// 当前打开的解码字段
struct OpenField {
    depth: usize,
    info: FieldInfo,
}

fn is_token(name: &str) -> bool {
    name.eq_ignore_ascii_case("token")
}

fn is_field(name: &str) -> bool {
    name.eq_ignore_ascii_case("valuedecoderfield") || name.eq_ignore_ascii_case("field")
}

fn local_name(element: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(element.local_name().as_ref()).into_owned()
}

fn xml_error(e: impl std::fmt::Display) -> FfrError {
    FfrError::Xml(e.to_string())
}

/// 读取元素属性为 (键, 值) 列表
fn attributes(element: &BytesStart<'_>) -> Result<Vec<(String, String)>, FfrError> {
    element
        .attributes()
        .map(|attr| {
            let attr = attr.map_err(xml_error)?;
            let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
            let value = attr.unescape_value().map_err(xml_error)?.trim().to_string();
            Ok((key, value))
        })
        .collect()
}

/// MTL_OLF 解析器
#[derive(Debug, Clone)]
pub struct MtlOlfParser {
    progress_interval: usize,
}

impl Default for MtlOlfParser {
    fn default() -> Self {
        Self::new()
    }
}

impl MtlOlfParser {
    pub fn new() -> Self {
        Self {
            progress_interval: 1000,
        }
    }

    /// 每处理多少个令牌输出一次进度，0 表示不输出
    pub fn with_progress_interval(mut self, interval: usize) -> Self {
        self.progress_interval = interval;
        self
    }

    /// 解析文件
    pub fn parse_file(&self, path: &Path) -> Result<MtlOlfDocument, FfrError> {
        info!("Parsing MTL_OLF XML: {}", path.display());
        let document = self.parse_reader(open_buffered(path)?)?;
        info!(
            "XML parsing completed: {} tokens, {} records",
            document.stats.total_tokens, document.stats.total_records
        );
        Ok(document)
    }

    /// 从任意缓冲读取器解析
    pub fn parse_reader<R: BufRead>(&self, source: R) -> Result<MtlOlfDocument, FfrError> {
        let mut reader = Reader::from_reader(source);
        reader.config_mut().trim_text(true);

        let mut buf = Vec::new();
        let mut depth = 0usize;
        let mut text = String::new();
        let mut element_names: Vec<String> = Vec::new();
        let mut token: Option<OpenToken> = None;
        let mut field: Option<OpenField> = None;
        let mut document = MtlOlfDocument::default();

        loop {
            match reader.read_event_into(&mut buf).map_err(xml_error)? {
                Event::Start(element) => {
                    depth += 1;
                    text.clear();
                    let name = local_name(&element);
                    self.open_element(&element, &name, depth, &mut token, &mut field)?;
                    element_names.push(name);
                }
                Event::Empty(element) => {
                    let name = local_name(&element);
                    self.open_element(&element, &name, depth + 1, &mut token, &mut field)?;
                    self.close_element(depth + 1, &mut token, &mut field, &mut document);
                }
                Event::Text(content) => {
                    text.push_str(&content.unescape().map_err(xml_error)?);
                }
                Event::CData(content) => {
                    text.push_str(&String::from_utf8_lossy(&content.into_inner()));
                }
                Event::End(_) => {
                    let value = std::mem::take(&mut text);
                    if let Some(name) = element_names.pop() {
                        self.assign_text(&name, depth, value.trim(), &mut token, &mut field);
                    }
                    self.close_element(depth, &mut token, &mut field, &mut document);
                    depth = depth.saturating_sub(1);
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        finish_stats(&mut document);
        Ok(document)
    }

    fn open_element(
        &self,
        element: &BytesStart<'_>,
        name: &str,
        depth: usize,
        token: &mut Option<OpenToken>,
        field: &mut Option<OpenField>,
    ) -> Result<(), FfrError> {
        if token.is_none() && is_token(name) {
            let mut info = TokenInfo::default();
            for (key, value) in attributes(element)? {
                info.set(&key, value);
            }
            *token = Some(OpenToken {
                depth,
                info,
                fields: Vec::new(),
            });
        } else if token.is_some() && field.is_none() && is_field(name) {
            let mut info = FieldInfo::default();
            for (key, value) in attributes(element)? {
                info.set(&key, value);
            }
            *field = Some(OpenField { depth, info });
        }
        Ok(())
    }

    /// 子元素文本覆盖同名属性；只取令牌/字段的直接子元素
    fn assign_text(
        &self,
        name: &str,
        depth: usize,
        value: &str,
        token: &mut Option<OpenToken>,
        field: &mut Option<OpenField>,
    ) {
        if value.is_empty() {
            return;
        }
        if let Some(open) = field.as_mut() {
            if depth == open.depth + 1 {
                open.info.set(name, value.to_string());
            }
        } else if let Some(open) = token.as_mut() {
            if depth == open.depth + 1 {
                open.info.set(name, value.to_string());
            }
        }
    }

    fn close_element(
        &self,
        depth: usize,
        token: &mut Option<OpenToken>,
        field: &mut Option<OpenField>,
        document: &mut MtlOlfDocument,
    ) {
        if field.as_ref().is_some_and(|open| open.depth == depth) {
            if let (Some(closed), Some(open_token)) = (field.take(), token.as_mut()) {
                open_token.fields.push(closed.info);
            }
            return;
        }

        if token.as_ref().is_some_and(|open| open.depth == depth) {
            if let Some(closed) = token.take() {
                document.stats.total_tokens += 1;
                emit_rows(closed, &mut document.rows);
                if self.progress_interval > 0
                    && document.stats.total_tokens % self.progress_interval == 0
                {
                    debug!("Processed {} tokens...", document.stats.total_tokens);
                }
            }
        }
    }
}

fn emit_rows(token: OpenToken, rows: &mut Vec<MtlOlfRow>) {
    if token.fields.is_empty() {
        rows.push(MtlOlfRow {
            token: token.info,
            ..Default::default()
        });
        return;
    }

    for (index, field) in token.fields.iter().enumerate() {
        for (fuse_name, fuse_register) in
            pair_fuse_names_registers(&field.fuse_name, &field.fuse_register)
        {
            rows.push(MtlOlfRow {
                token: token.info.clone(),
                field_name: field.name.clone(),
                field_name_seq: index + 1,
                fuse_name_ori: field.fuse_name.clone(),
                fuse_name,
                fuse_register_ori: field.fuse_register.clone(),
                fuse_register,
            });
        }
    }
}

fn finish_stats(document: &mut MtlOlfDocument) {
    let stats = &mut document.stats;
    stats.total_records = document.rows.len();

    let mut names = HashSet::new();
    for row in &document.rows {
        names.insert(row.token.token_name.as_str());
        if !row.field_name.is_empty() {
            stats.total_fields += 1;
        }
        let register = if row.field_name_seq == 0 {
            "N/A".to_string()
        } else {
            row.fuse_register.clone()
        };
        *stats.by_fuse_register.entry(register).or_default() += 1;
        *stats.by_module.entry(row.token.module.clone()).or_default() += 1;
        *stats
            .by_first_socket_upload
            .entry(row.token.first_socket_upload.clone())
            .or_default() += 1;
    }
    stats.unique_token_names = names.len();
}
