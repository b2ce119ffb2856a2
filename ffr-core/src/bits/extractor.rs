//! Bit字段提取器
//!
//! 按硬件寄存器的 LSB 编址从二进制串中截取位字段：
//! 地址 0 是串的最右字符，地址 `len-1` 是最左字符。

use crate::fuse_meta::AddressRange;

/// 从寄存器串中提取 [start_address, end_address] 位字段
///
/// 返回结果保持 MSB 在左的顺序，长度为 `end - start + 1`。
/// 地址越界或区间非法时返回空串。
///
/// # 参数
/// - `bits`: 完整寄存器串
/// - `start_address`: 起始位地址（含）
/// - `end_address`: 结束位地址（含）
///
/// # 示例
/// ```
/// use ffr_core::extract_bit_field;
///
/// assert_eq!(extract_bit_field("1100000111110000", 0, 7), "11110000");
/// assert_eq!(extract_bit_field("1100000111110000", 8, 15), "11000001");
/// assert_eq!(extract_bit_field("1100000111110000", 8, 16), "");
/// ```
pub fn extract_bit_field(bits: &str, start_address: i64, end_address: i64) -> &str {
    if start_address < 0 || start_address > end_address {
        return "";
    }

    let length = bits.len() as i64;
    if end_address >= length {
        return "";
    }

    // 区间映射到串下标：[L-1-end, L-start)
    let start_index = (length - 1 - end_address) as usize;
    let end_index = (length - start_address) as usize;

    bits.get(start_index..end_index).unwrap_or("")
}

/// 依次提取多个地址段并拼接
///
/// 任一地址段提取失败或没有地址段时返回空串。
pub fn extract_segments(bits: &str, segments: &[AddressRange]) -> String {
    let mut extracted = String::new();
    for segment in segments {
        let part = extract_bit_field(bits, segment.start, segment.end);
        if part.is_empty() {
            return String::new();
        }
        extracted.push_str(part);
    }
    extracted
}

#[cfg(test)]
mod tests {
    use super::*;

    const REGISTER: &str = "1100000111110000";

    #[test]
    fn test_extract_low_and_high_bytes() {
        assert_eq!(extract_bit_field(REGISTER, 0, 7), "11110000");
        assert_eq!(extract_bit_field(REGISTER, 8, 15), "11000001");
    }

    #[test]
    fn test_extract_single_bits() {
        // 地址 0 是最右字符
        assert_eq!(extract_bit_field(REGISTER, 0, 0), "0");
        assert_eq!(extract_bit_field(REGISTER, 4, 4), "1");
        assert_eq!(extract_bit_field(REGISTER, 15, 15), "1");
    }

    #[test]
    fn test_extract_length_matches_range() {
        for start in 0..16i64 {
            for end in start..16i64 {
                let field = extract_bit_field(REGISTER, start, end);
                assert_eq!(field.len() as i64, end - start + 1, "range {start}..={end}");
            }
        }
    }

    #[test]
    fn test_extract_boundary_policy() {
        // start > end
        assert_eq!(extract_bit_field(REGISTER, 7, 0), "");
        // end 超出寄存器长度
        assert_eq!(extract_bit_field(REGISTER, 0, 16), "");
        assert_eq!(extract_bit_field("", 0, 0), "");
        // 负地址
        assert_eq!(extract_bit_field(REGISTER, -1, 3), "");
    }

    #[test]
    fn test_extract_segments_concatenates_in_order() {
        let segments = [AddressRange::new(12, 15), AddressRange::new(0, 3)];
        assert_eq!(extract_segments(REGISTER, &segments), "11000000");
    }

    #[test]
    fn test_extract_segments_fails_as_a_whole() {
        let segments = [AddressRange::new(0, 3), AddressRange::new(14, 20)];
        assert_eq!(extract_segments(REGISTER, &segments), "");
        assert_eq!(extract_segments(REGISTER, &[]), "");
    }

    #[test]
    fn test_extract_keeps_non_binary_symbols() {
        // sspec 熔丝串中可能出现 m/s 标记
        assert_eq!(extract_bit_field("10ms01", 2, 3), "ms");
    }
}
