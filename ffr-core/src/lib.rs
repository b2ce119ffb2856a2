//! FFR Check Core Library
//!
//! This crate provides the data model, error type and the fuse bit pipeline
//! (run-length decoding, LSB-addressed bit extraction and per-unit field
//! mapping) shared by the FFR Check parsers, reports and front ends.

pub mod bits;
pub mod error;
pub mod fuse_meta;
pub mod mapper;
pub mod sanitizer;

use std::collections::HashMap;

// 导出错误类型
pub use error::FfrError;

// 导出熔丝元数据类型，便于其他模块使用
pub use fuse_meta::*;

pub use bits::{
    analyze_fuse_string, binary_to_hex, decode_rle, decode_rle_with_stats, extract_bit_field,
    extract_segments, hex_equals, is_binary_string, normalize_hex, normalize_register_value,
};
pub use mapper::{map_fields, FieldMapper, MapperStats};

/// 单元原始数据源接口 - 按 (单元, 寄存器) 提供未解码的寄存器字符串
pub trait UnitDataSource {
    /// 获取单元在指定寄存器上的原始字符串（二进制或游程编码）
    fn raw_value(&self, unit: &str, register: &str) -> Option<&str>;
}

/// (visualID, 寄存器) -> 原始字符串
impl UnitDataSource for HashMap<(String, String), String> {
    fn raw_value(&self, unit: &str, register: &str) -> Option<&str> {
        self.get(&(unit.to_string(), register.to_string()))
            .map(String::as_str)
    }
}

/// visualID -> 寄存器 -> 原始字符串
impl UnitDataSource for HashMap<String, HashMap<String, String>> {
    fn raw_value(&self, unit: &str, register: &str) -> Option<&str> {
        self.get(unit)
            .and_then(|registers| registers.get(register))
            .map(String::as_str)
    }
}
