//! fuseDef JSON 解析器

use std::path::Path;

use ffr_core::{parse_address_list, FfrError, FieldDefinition};
use log::{info, warn};
use serde::Deserialize;
use serde_json::Value;

use crate::line_reader::open_buffered;

#[derive(Debug, Deserialize)]
struct FuseDefDocument {
    #[serde(rename = "Registers")]
    registers: Option<Vec<RegisterEntry>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct RegisterEntry {
    registers_data: Vec<RegisterData>,
    fuse_groups: Vec<FuseGroup>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct RegisterData {
    register_name: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct FuseGroup {
    name: String,
    fuses: Vec<Fuse>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct Fuse {
    name: String,
    start_address: Vec<Value>,
    end_address: Vec<Value>,
}

/// fuseDef 行：一个 (寄存器, 熔丝组, 熔丝)
///
/// 地址保持逗号分隔文本（如 `"0,16"`），与输出 CSV 一致。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FuseDefRow {
    pub register_name: String,
    pub fuse_group_name: String,
    pub fuse_name: String,
    pub start_address: String,
    pub end_address: String,
}

impl FuseDefRow {
    /// 转换为字段定义；地址为空或无法解析时返回 None
    pub fn to_field_definition(&self) -> Option<FieldDefinition> {
        if self.start_address.is_empty() || self.end_address.is_empty() {
            return None;
        }
        let segments = parse_address_list(&self.start_address, &self.end_address).ok()?;
        if segments.is_empty() {
            return None;
        }
        Some(
            FieldDefinition::with_segments(&self.register_name, &self.fuse_name, segments)
                .with_group(&self.fuse_group_name),
        )
    }
}

/// 地址数组格式化为逗号分隔文本
fn format_address_array(values: &[Value]) -> String {
    values
        .iter()
        .map(|value| match value {
            Value::String(text) => text.trim().to_string(),
            other => other.to_string(),
        })
        .collect::<Vec<_>>()
        .join(",")
}

/// 解析 fuseDef JSON 文本
pub fn parse_fusedef_str(json: &str) -> Result<Vec<FuseDefRow>, FfrError> {
    let document: FuseDefDocument = serde_json::from_str(json)?;
    flatten(document)
}

/// 解析 fuseDef.json 文件
pub fn parse_fusedef(path: &Path) -> Result<Vec<FuseDefRow>, FfrError> {
    info!("Parsing fuseDef JSON: {}", path.display());
    let document: FuseDefDocument = serde_json::from_reader(open_buffered(path)?)?;
    let rows = flatten(document)?;
    info!("JSON parsing completed: {} records", rows.len());
    Ok(rows)
}

fn flatten(document: FuseDefDocument) -> Result<Vec<FuseDefRow>, FfrError> {
    let registers = document
        .registers
        .ok_or_else(|| FfrError::MissingKey("Registers".to_string()))?;
    info!("Found {} register(s)", registers.len());

    let mut rows = Vec::new();
    for register in &registers {
        if register.registers_data.is_empty() {
            warn!("Register entry without RegistersData skipped");
        }
        for data in &register.registers_data {
            if register.fuse_groups.is_empty() {
                rows.push(FuseDefRow {
                    register_name: data.register_name.clone(),
                    ..Default::default()
                });
                continue;
            }

            for group in &register.fuse_groups {
                for fuse in &group.fuses {
                    rows.push(FuseDefRow {
                        register_name: data.register_name.clone(),
                        fuse_group_name: group.name.clone(),
                        fuse_name: fuse.name.clone(),
                        start_address: format_address_array(&fuse.start_address),
                        end_address: format_address_array(&fuse.end_address),
                    });
                }
            }
        }
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ffr_core::AddressRange;

    const SAMPLE: &str = r#"{
        "Registers": [
            {
                "RegistersData": [{"RegisterName": "CPU0"}, {"RegisterName": "CPU1"}],
                "FuseGroups": [
                    {"Name": "core", "Fuses": [
                        {"Name": "core_disable", "StartAddress": [0], "EndAddress": [7]},
                        {"Name": "split_key", "StartAddress": [8, "24"], "EndAddress": [11, 27]}
                    ]}
                ]
            },
            {"RegistersData": [{"RegisterName": "GCD"}]}
        ]
    }"#;

    #[test]
    fn test_flatten_registers() {
        let rows = parse_fusedef_str(SAMPLE).unwrap();
        assert_eq!(rows.len(), 5);
        assert_eq!(rows[0].register_name, "CPU0");
        assert_eq!(rows[0].fuse_group_name, "core");
        assert_eq!(rows[1].start_address, "8,24");
        assert_eq!(rows[1].end_address, "11,27");
        assert_eq!(rows[2].register_name, "CPU1");
        assert_eq!(
            rows[4],
            FuseDefRow {
                register_name: "GCD".to_string(),
                ..Default::default()
            }
        );
    }

    #[test]
    fn test_missing_registers_key() {
        let result = parse_fusedef_str(r#"{"Other": []}"#);
        assert!(matches!(result, Err(FfrError::MissingKey(ref key)) if key == "Registers"));
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(parse_fusedef_str("{"), Err(FfrError::Json(_))));
    }

    #[test]
    fn test_to_field_definition() {
        let rows = parse_fusedef_str(SAMPLE).unwrap();
        let field = rows[1].to_field_definition().unwrap();
        assert_eq!(field.register, "CPU0");
        assert_eq!(field.group, "core");
        assert_eq!(
            field.segments,
            vec![AddressRange::new(8, 11), AddressRange::new(24, 27)]
        );
        assert!(rows[4].to_field_definition().is_none());
    }
}
