//! 单元字段映射器
//!
//! 将每个单元的原始寄存器串映射到命名熔丝字段上。每个被引用的
//! (单元, 寄存器) 组合只解码一次，解码结果缓存到本次映射结束。

use std::collections::HashMap;

use log::warn;
use serde::Serialize;

use crate::bits::{decode_rle_with_stats, extract_segments, is_binary_string};
use crate::fuse_meta::{FieldDefinition, FieldRecord, FieldValue, UnitValue};
use crate::UnitDataSource;

/// 映射统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MapperStats {
    /// 实际解码的 (单元, 寄存器) 数
    pub decoded_pairs: usize,
    /// 其中经过游程解码的数量
    pub rle_decoded: usize,
    /// 游程解码时跳过的字符总数
    pub skipped_chars: usize,
    /// 缓存命中次数
    pub cache_hits: usize,
    /// 未能解析的 (字段, 单元) 单元格数
    pub unresolved_cells: usize,
}

/// 字段映射器
///
/// 缓存键为 (单元, 寄存器)，值为 `None` 表示数据源中没有该组合。
pub struct FieldMapper<'s, S: UnitDataSource + ?Sized> {
    source: &'s S,
    cache: HashMap<(String, String), Option<String>>,
    stats: MapperStats,
}

impl<'s, S: UnitDataSource + ?Sized> FieldMapper<'s, S> {
    pub fn new(source: &'s S) -> Self {
        Self {
            source,
            cache: HashMap::new(),
            stats: MapperStats::default(),
        }
    }

    pub fn stats(&self) -> MapperStats {
        self.stats
    }

    /// 获取 (单元, 寄存器) 的解码串，首次访问时解码
    fn decoded(&mut self, unit: &str, register: &str) -> Option<&str> {
        let key = (unit.to_string(), register.to_string());

        if self.cache.contains_key(&key) {
            self.stats.cache_hits += 1;
        } else {
            let source = self.source;
            let decoded = source.raw_value(unit, register).map(|raw| {
                self.stats.decoded_pairs += 1;
                if is_binary_string(raw) {
                    raw.trim().to_string()
                } else {
                    let outcome = decode_rle_with_stats(raw);
                    self.stats.rle_decoded += 1;
                    self.stats.skipped_chars += outcome.skipped;
                    if outcome.skipped > 0 {
                        warn!(
                            "{unit}/{register}: skipped {} characters while decoding",
                            outcome.skipped
                        );
                    }
                    outcome.bits
                }
            });
            self.cache.insert(key.clone(), decoded);
        }

        self.cache.get(&key).and_then(|value| value.as_deref())
    }

    /// 解析单个 (字段, 单元)，无数据或地址越界时返回空值
    pub fn resolve(&mut self, field: &FieldDefinition, unit: &str) -> FieldValue {
        let bits = self
            .decoded(unit, &field.register)
            .map(|decoded| extract_segments(decoded, &field.segments))
            .unwrap_or_default();

        let value = FieldValue::from_binary(bits);
        if !value.is_resolved() {
            self.stats.unresolved_cells += 1;
        }
        value
    }

    /// 按字段顺序映射所有单元，单元顺序与传入顺序一致
    pub fn map_fields<'a, U: AsRef<str>>(
        &mut self,
        fields: &'a [FieldDefinition],
        units: &[U],
    ) -> Vec<FieldRecord<'a>> {
        fields
            .iter()
            .map(|field| FieldRecord {
                field,
                values: units
                    .iter()
                    .map(|unit| UnitValue {
                        unit: unit.as_ref().to_string(),
                        value: self.resolve(field, unit.as_ref()),
                    })
                    .collect(),
            })
            .collect()
    }
}

/// 一次性映射：创建映射器、映射全部字段并丢弃缓存
///
/// # 示例
/// ```
/// use std::collections::HashMap;
/// use ffr_core::{map_fields, FieldDefinition};
///
/// let mut raw = HashMap::new();
/// raw.insert("U1".to_string(), HashMap::from([("CPU0".to_string(), "A5BA2B3".to_string())]));
///
/// let fields = vec![FieldDefinition::new("CPU0", "core_disable", 0, 7)];
/// let records = map_fields(&fields, &raw, &["U1"]);
/// let value = records[0].value_for("U1").unwrap();
/// assert_eq!(value.binary, "00100111");
/// assert_eq!(value.hex, "27");
/// ```
pub fn map_fields<'a, S, U>(
    fields: &'a [FieldDefinition],
    source: &S,
    units: &[U],
) -> Vec<FieldRecord<'a>>
where
    S: UnitDataSource + ?Sized,
    U: AsRef<str>,
{
    FieldMapper::new(source).map_fields(fields, units)
}
