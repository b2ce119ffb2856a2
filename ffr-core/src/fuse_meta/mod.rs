//! 熔丝元数据模块
//!
//! 定义寄存器、熔丝字段与单元取值的数据结构

use serde::{Deserialize, Serialize};

use crate::error::FfrError;

/// 单元标识（visualID）
pub type UnitId = String;

/// 地址区间，LSB 编址，闭区间 [start, end]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AddressRange {
    pub start: i64,
    pub end: i64,
}

impl AddressRange {
    pub fn new(start: i64, end: i64) -> Self {
        Self { start, end }
    }

    /// 区间位宽；start > end 或 start < 0 时返回 None
    pub fn bit_len(&self) -> Option<usize> {
        if self.start < 0 || self.start > self.end {
            return None;
        }
        usize::try_from(self.end - self.start + 1).ok()
    }
}

/// 将逗号分隔的起止地址列表解析为地址区间
///
/// 两个列表按位置配对，长度不一致时以较短者为准。
///
/// # 示例
/// ```
/// use ffr_core::{parse_address_list, AddressRange};
///
/// let ranges = parse_address_list("0,16", "7,19").unwrap();
/// assert_eq!(ranges, vec![AddressRange::new(0, 7), AddressRange::new(16, 19)]);
/// ```
pub fn parse_address_list(starts: &str, ends: &str) -> Result<Vec<AddressRange>, FfrError> {
    let parse = |list: &str| -> Result<Vec<i64>, FfrError> {
        list.split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(|item| {
                item.parse::<i64>()
                    .map_err(|_| FfrError::ParseError(format!("Invalid address: {item}")))
            })
            .collect()
    };

    let starts = parse(starts)?;
    let ends = parse(ends)?;

    Ok(starts
        .into_iter()
        .zip(ends)
        .map(|(start, end)| AddressRange::new(start, end))
        .collect())
}

/// 字段定义：一个命名熔丝在寄存器中的位区间
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDefinition {
    pub register: String,
    pub name: String,
    /// 熔丝组名，可为空
    #[serde(default)]
    pub group: String,
    /// 按顺序拼接的地址段
    pub segments: Vec<AddressRange>,
}

impl FieldDefinition {
    pub fn new(register: &str, name: &str, start: i64, end: i64) -> Self {
        Self::with_segments(register, name, vec![AddressRange::new(start, end)])
    }

    pub fn with_segments(register: &str, name: &str, segments: Vec<AddressRange>) -> Self {
        Self {
            register: register.to_string(),
            name: name.to_string(),
            group: String::new(),
            segments,
        }
    }

    pub fn with_group(mut self, group: &str) -> Self {
        self.group = group.to_string();
        self
    }

    /// 所有地址段位宽之和；任一段无效时返回 None
    pub fn bit_len(&self) -> Option<usize> {
        if self.segments.is_empty() {
            return None;
        }
        self.segments.iter().map(AddressRange::bit_len).sum()
    }
}

/// 单个 (字段, 单元) 的取值：二进制串及其十六进制表示
///
/// 两者均为空字符串表示未解析。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldValue {
    pub binary: String,
    pub hex: String,
}

impl FieldValue {
    pub fn empty() -> Self {
        Self::default()
    }

    /// 由提取出的二进制串构造，空串得到空值
    pub fn from_binary(binary: String) -> Self {
        if binary.is_empty() {
            return Self::empty();
        }
        let hex = crate::bits::binary_to_hex(&binary);
        Self { binary, hex }
    }

    pub fn is_resolved(&self) -> bool {
        !self.binary.is_empty()
    }
}

/// 单元取值
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitValue {
    pub unit: UnitId,
    pub value: FieldValue,
}

/// 字段映射结果：一个字段在所有请求单元上的取值
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRecord<'a> {
    pub field: &'a FieldDefinition,
    pub values: Vec<UnitValue>,
}

impl FieldRecord<'_> {
    pub fn value_for(&self, unit: &str) -> Option<&FieldValue> {
        self.values
            .iter()
            .find(|entry| entry.unit == unit)
            .map(|entry| &entry.value)
    }
}

/// sspec 熔丝串的位统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FuseStringProfile {
    pub register_size: usize,
    /// '0'/'1'
    pub static_bits: usize,
    /// 'm'/'M'
    pub dynamic_bits: usize,
    /// 's'/'S'
    pub sort_bits: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_range_bit_len() {
        assert_eq!(AddressRange::new(0, 7).bit_len(), Some(8));
        assert_eq!(AddressRange::new(5, 5).bit_len(), Some(1));
        assert_eq!(AddressRange::new(8, 7).bit_len(), None);
        assert_eq!(AddressRange::new(-1, 3).bit_len(), None);
    }

    #[test]
    fn test_parse_address_list_truncates_to_shorter() {
        let ranges = parse_address_list("0, 10, 20", "3,12").unwrap();
        assert_eq!(
            ranges,
            vec![AddressRange::new(0, 3), AddressRange::new(10, 12)]
        );
    }

    #[test]
    fn test_parse_address_list_rejects_garbage() {
        assert!(parse_address_list("0,x", "3,4").is_err());
        assert!(parse_address_list("", "").unwrap().is_empty());
    }

    #[test]
    fn test_field_definition_bit_len() {
        let single = FieldDefinition::new("CPU0", "core_disable", 0, 7);
        assert_eq!(single.bit_len(), Some(8));

        let split = FieldDefinition::with_segments(
            "CPU0",
            "split_key",
            vec![AddressRange::new(0, 3), AddressRange::new(16, 19)],
        );
        assert_eq!(split.bit_len(), Some(8));

        let broken = FieldDefinition::new("CPU0", "bad", 7, 0);
        assert_eq!(broken.bit_len(), None);
    }

    #[test]
    fn test_field_value_from_binary() {
        let value = FieldValue::from_binary("00100111".to_string());
        assert_eq!(value.hex, "27");
        assert!(value.is_resolved());

        assert_eq!(FieldValue::from_binary(String::new()), FieldValue::empty());
    }
}
