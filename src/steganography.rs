//! # LSB 隐写模块
//!
//! 把任意字节载荷隐藏在容器字节的低位中。
//!
//! 载荷按字节展开为位序列 (每字节高位在前)；每个容器字节清除低 `bitsPerByte` 位后，
//! 依次写入下一组 `bitsPerByte` 个载荷位，组内第一个位落在最高位。最后一组不足时以 0 补齐。
//!
//! 载荷之前是一个 32 位小端长度头，使用相同的打包规则，占用 `⌈32 / bitsPerByte⌉` 个容器字节；
//! 载荷从紧随其后的容器字节开始。

use crate::bmp::BmpHeader;
use crate::constants::HEADER_BITS;
use crate::error::{CodecError, Result};
use crate::pixel::BitDepth;
use log::debug;

/// 每个容器字节承载的载荷位数。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitsPerByte {
    Two,
    Four,
    Six,
}

impl BitsPerByte {
    pub fn bits(self) -> usize {
        match self {
            Self::Two => 2,
            Self::Four => 4,
            Self::Six => 6,
        }
    }

    fn mask(self) -> u8 {
        (1u8 << self.bits()) - 1
    }

    /// 承载 `bit_count` 个位所需的容器字节数。
    pub fn span(self, bit_count: usize) -> usize {
        bit_count.div_ceil(self.bits())
    }
}

impl TryFrom<u8> for BitsPerByte {
    type Error = CodecError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            2 => Ok(Self::Two),
            4 => Ok(Self::Four),
            6 => Ok(Self::Six),
            other => Err(CodecError::InvalidParameter(format!(
                "bits per byte must be 2, 4 or 6, got {other}"
            ))),
        }
    }
}

/// 把 `data` 的位序列写入 `pix[dix..]`，返回占用的容器字节数。调用方负责保证范围有效。
fn modify(data: &[u8], pix: &mut [u8], dix: usize, bits: BitsPerByte) -> usize {
    let total = data.len() * 8;
    let n = bits.bits();
    let used = bits.span(total);

    for (group, byte) in pix[dix..dix + used].iter_mut().enumerate() {
        let value = (0..n).fold(0u8, |acc, t| {
            let i = group * n + t;
            let bit = if i < total {
                (data[i / 8] >> (7 - i % 8)) & 0x1
            } else {
                0
            };
            (acc << 1) | bit
        });
        *byte = (*byte & !bits.mask()) | value;
    }

    used
}

/// 从 `pix[dix..]` 读取 `bit_count` 个位并重新组合为字节。调用方负责保证范围有效。
fn recover(pix: &[u8], dix: usize, bit_count: usize, bits: BitsPerByte) -> Vec<u8> {
    let n = bits.bits();
    let mut out = vec![0u8; bit_count.div_ceil(8)];

    for i in 0..bit_count {
        let bit = (pix[dix + i / n] >> (n - 1 - i % n)) & 0x1;
        out[i / 8] |= bit << (7 - i % 8);
    }

    out
}

/// 在 `container_len` 字节的容器中以给定密度最多能隐藏多少字节的载荷。
pub fn capacity(container_len: usize, bits: BitsPerByte) -> usize {
    let available = container_len.saturating_sub(bits.span(HEADER_BITS as usize));
    (available.saturating_mul(bits.bits()) / 8).min(u32::MAX as usize)
}

/// 把 `payload` 连同长度头隐藏进 `container` 的副本中。
///
/// # Errors
///
/// 长度头加载荷需要的容器字节数超过 `container.len()` 时返回 [`CodecError::Capacity`]，
/// 此时不产生任何输出。
pub fn embed(container: &[u8], payload: &[u8], bits: BitsPerByte) -> Result<Vec<u8>> {
    let header_bytes = bits.span(HEADER_BITS as usize);
    let length = u32::try_from(payload.len()).map_err(|_| {
        CodecError::Capacity(format!(
            "payload of {} bytes exceeds the {HEADER_BITS}-bit length header",
            payload.len()
        ))
    })?;

    let required = payload
        .len()
        .checked_mul(8)
        .map(|payload_bits| header_bytes + bits.span(payload_bits))
        .filter(|&required| required <= container.len())
        .ok_or_else(|| {
            CodecError::Capacity(format!(
                "payload of {} bytes does not fit: {} bytes available at {} bits per byte",
                payload.len(),
                capacity(container.len(), bits),
                bits.bits()
            ))
        })?;

    debug!(
        "embedding {length} bytes at {} bits per byte, using {required} of {} container bytes",
        bits.bits(),
        container.len()
    );

    let mut stego = container.to_vec();
    modify(&length.to_le_bytes(), &mut stego, 0, bits);
    modify(payload, &mut stego, header_bytes, bits);
    Ok(stego)
}

/// 从 `container` 中恢复由 [`embed`] 隐藏的载荷。
///
/// `header_bits` 是长度头的位宽 (32 或 64)，必须与隐藏时一致。
///
/// # Errors
///
/// * `header_bits` 不是 32 或 64 时返回 [`CodecError::InvalidParameter`]。
/// * 容器装不下长度头，或长度头声明的载荷超出剩余容量时返回 [`CodecError::Bounds`]。
pub fn extract(container: &[u8], bits: BitsPerByte, header_bits: u32) -> Result<Vec<u8>> {
    if header_bits != 32 && header_bits != 64 {
        return Err(CodecError::InvalidParameter(format!(
            "length header must be 32 or 64 bits, got {header_bits}"
        )));
    }

    let header_bytes = bits.span(header_bits as usize);
    if container.len() < header_bytes {
        return Err(CodecError::Bounds(format!(
            "container of {} bytes cannot hold a {header_bits}-bit length header",
            container.len()
        )));
    }

    let length = recover(container, 0, header_bits as usize, bits)
        .iter()
        .rev()
        .fold(0u64, |acc, &byte| (acc << 8) | u64::from(byte));

    let available = container.len() - header_bytes;
    let payload_bits = usize::try_from(length)
        .ok()
        .and_then(|len| len.checked_mul(8))
        .filter(|&payload_bits| bits.span(payload_bits) <= available)
        .ok_or_else(|| {
            CodecError::Bounds(format!(
                "declared payload of {length} bytes exceeds the {available} remaining container bytes"
            ))
        })?;

    debug!("extracting {length} bytes at {} bits per byte", bits.bits());

    Ok(recover(container, header_bytes, payload_bits, bits))
}

/// 定位 24/32 位 BMP 的像素数组范围。
fn bmp_pixel_region(bmp: &[u8]) -> Result<std::ops::Range<usize>> {
    let header = BmpHeader::parse(bmp)?;
    if !matches!(header.depth(), BitDepth::TwentyFour | BitDepth::ThirtyTwo) {
        return Err(CodecError::UnsupportedFeature(format!(
            "hiding data in {}-bit BMP images (24 or 32 bits required)",
            header.bits_per_pixel
        )));
    }
    header.pixel_region(bmp.len())
}

/// 只在 BMP 文件的像素数组中隐藏载荷，头部保持逐字节不变。
///
/// # Errors
///
/// 见 [`BmpHeader::parse`] 与 [`embed`]；索引色 BMP 返回 [`CodecError::UnsupportedFeature`]。
pub fn embed_in_bmp(bmp: &[u8], payload: &[u8], bits: BitsPerByte) -> Result<Vec<u8>> {
    let region = bmp_pixel_region(bmp)?;
    let pixels = embed(&bmp[region.clone()], payload, bits)?;

    let mut out = bmp.to_vec();
    out[region].copy_from_slice(&pixels);
    Ok(out)
}

/// 从 BMP 文件的像素数组中恢复由 [`embed_in_bmp`] 隐藏的载荷。
///
/// # Errors
///
/// 见 [`BmpHeader::parse`] 与 [`extract`]。
pub fn extract_from_bmp(bmp: &[u8], bits: BitsPerByte) -> Result<Vec<u8>> {
    let region = bmp_pixel_region(bmp)?;
    extract(&bmp[region], bits, HEADER_BITS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groups_are_written_most_significant_bit_first() {
        let mut pix = [0xFFu8; 4];
        let used = modify(&[0b1011_0100], &mut pix, 0, BitsPerByte::Two);
        assert_eq!(used, 4);
        assert_eq!(pix, [0xFE, 0xFF, 0xFD, 0xFC]);
    }

    #[test]
    fn final_group_is_zero_padded() {
        let mut pix = [0u8; 2];
        let used = modify(&[0xFF], &mut pix, 0, BitsPerByte::Six);
        assert_eq!(used, 2);
        assert_eq!(pix, [0b11_1111, 0b11_0000]);
    }

    #[test]
    fn recover_inverts_modify() {
        let data = [0xDE, 0xAD, 0xBE, 0xEF, 0x42];
        for bits in [BitsPerByte::Two, BitsPerByte::Four, BitsPerByte::Six] {
            let mut pix = vec![0x5Au8; 32];
            modify(&data, &mut pix, 3, bits);
            assert_eq!(recover(&pix, 3, data.len() * 8, bits), data);
        }
    }
}
