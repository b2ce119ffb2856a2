//! 熔丝位处理模块
//!
//! 提供游程解码、LSB 编址的位字段提取以及二进制/十六进制转换

pub mod convert;
pub mod extractor;
pub mod rle;

pub use convert::{
    analyze_fuse_string, binary_to_hex, hex_equals, is_binary_string, normalize_hex,
    normalize_register_value,
};
pub use extractor::{extract_bit_field, extract_segments};
pub use rle::{decode_rle, decode_rle_with_stats, RleDecodeOutcome, MAX_RUN_LENGTH};
