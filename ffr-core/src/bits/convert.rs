//! 二进制/十六进制转换工具

use std::borrow::Cow;

use crate::bits::rle::decode_rle;
use crate::fuse_meta::FuseStringProfile;

/// 判断字符串（去除首尾空白后）是否只由 '0'/'1' 组成
pub fn is_binary_string(value: &str) -> bool {
    let value = value.trim();
    !value.is_empty() && value.bytes().all(|b| b == b'0' || b == b'1')
}

/// 将寄存器原始值规范为二进制串：已是二进制则原样返回，否则按游程编码解码
pub fn normalize_register_value(raw: &str) -> Cow<'_, str> {
    if is_binary_string(raw) {
        Cow::Borrowed(raw.trim())
    } else {
        Cow::Owned(decode_rle(raw))
    }
}

/// 二进制串转大写十六进制
///
/// 左侧补零到 4 位的整数倍，高半字节在前。非二进制输入返回空串。
///
/// # 示例
/// ```
/// use ffr_core::binary_to_hex;
///
/// assert_eq!(binary_to_hex("00100111"), "27");
/// assert_eq!(binary_to_hex("101"), "5");
/// ```
pub fn binary_to_hex(bits: &str) -> String {
    if !is_binary_string(bits) {
        return String::new();
    }
    let bits = bits.trim();

    let nibbles = bits.len().div_ceil(4);
    let padding = (8 - bits.len() % 8) % 8;

    let mut bytes = Vec::with_capacity((bits.len() + padding) / 8);
    let mut current = 0u8;
    for (i, bit) in std::iter::repeat(b'0')
        .take(padding)
        .chain(bits.bytes())
        .enumerate()
    {
        current = (current << 1) | (bit - b'0');
        if i % 8 == 7 {
            bytes.push(current);
            current = 0;
        }
    }

    let encoded = hex::encode_upper(bytes);
    encoded[encoded.len() - nibbles..].to_string()
}

/// 规范化十六进制文本用于比较：去掉 0X 前缀与前导零，统一大写
pub fn normalize_hex(value: &str) -> String {
    let upper = value.trim().to_ascii_uppercase();
    let digits = upper.strip_prefix("0X").unwrap_or(&upper);
    let trimmed = digits.trim_start_matches('0');
    if trimmed.is_empty() {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

/// 按数值比较两个十六进制文本，任一为空时不相等
pub fn hex_equals(a: &str, b: &str) -> bool {
    if a.trim().is_empty() || b.trim().is_empty() {
        return false;
    }
    normalize_hex(a) == normalize_hex(b)
}

/// 统计熔丝串中静态位、动态位（m）与 sort 位（s）
pub fn analyze_fuse_string(fuse_string: &str) -> Option<FuseStringProfile> {
    if fuse_string.is_empty() {
        return None;
    }

    let mut profile = FuseStringProfile {
        register_size: fuse_string.chars().count(),
        ..Default::default()
    };
    for symbol in fuse_string.chars() {
        match symbol {
            '0' | '1' => profile.static_bits += 1,
            'm' | 'M' => profile.dynamic_bits += 1,
            's' | 'S' => profile.sort_bits += 1,
            _ => {}
        }
    }
    Some(profile)
}
