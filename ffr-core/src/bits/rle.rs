//! 游程解码器
//!
//! 两符号游程编码：`A` 表示一段 `0`，`B` 表示一段 `1`（大小写不敏感），
//! 标记后可跟十进制长度，缺省为 1。其他字符一律跳过。

use nom::{
    branch::alt,
    character::complete::{anychar, digit0, one_of},
    sequence::pair,
    IResult,
};

/// 单段游程允许的最大长度（远大于任何寄存器宽度），超出视为畸形输入并跳过
pub const MAX_RUN_LENGTH: usize = 1 << 26;

/// 解码结果及诊断信息
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RleDecodeOutcome {
    pub bits: String,
    /// 被跳过的字符数
    pub skipped: usize,
}

enum Token<'a> {
    Run { bit: char, digits: &'a str },
    Stray,
}

fn run(input: &str) -> IResult<&str, Token<'_>> {
    let (rest, (marker, digits)) = pair(one_of("AaBb"), digit0)(input)?;
    let bit = if marker.eq_ignore_ascii_case(&'a') { '0' } else { '1' };
    Ok((rest, Token::Run { bit, digits }))
}

fn stray(input: &str) -> IResult<&str, Token<'_>> {
    let (rest, _) = anychar(input)?;
    Ok((rest, Token::Stray))
}

/// 解码游程编码串
///
/// # 示例
/// ```
/// use ffr_core::decode_rle;
///
/// assert_eq!(decode_rle("A5BA2B3"), "00000100111");
/// ```
pub fn decode_rle(encoded: &str) -> String {
    decode_rle_with_stats(encoded).bits
}

/// 解码游程编码串，同时统计被跳过的字符
pub fn decode_rle_with_stats(encoded: &str) -> RleDecodeOutcome {
    let mut outcome = RleDecodeOutcome::default();
    let mut rest = encoded;

    while !rest.is_empty() {
        let Ok((next, token)) = alt((run, stray))(rest) else {
            break;
        };
        rest = next;

        match token {
            Token::Run { bit, digits } => {
                let count = if digits.is_empty() {
                    Some(1)
                } else {
                    digits
                        .parse::<usize>()
                        .ok()
                        .filter(|count| *count <= MAX_RUN_LENGTH)
                };
                match count {
                    Some(count) => outcome.bits.extend(std::iter::repeat(bit).take(count)),
                    None => outcome.skipped += 1 + digits.len(),
                }
            }
            Token::Stray => outcome.skipped += 1,
        }
    }

    outcome
}
