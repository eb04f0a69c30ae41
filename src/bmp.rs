//! # BMP 编解码模块
//!
//! 读写未压缩的 Windows 位图 (1/4/8/24/32 位)。
//!
//! 文件布局 (全部为小端)：
//!
//! | 偏移 | 字段 |
//! |---|---|
//! | 0 | `"BM"` |
//! | 2 | `u32` 文件大小 |
//! | 10 | `u32` 像素数据偏移 |
//! | 14 | `u32` 信息头大小 |
//! | 18 | `i32` 宽度 |
//! | 22 | `i32` 高度 (正数为自下而上，负数为自上而下) |
//! | 26 | `u16` 平面数 |
//! | 28 | `u16` 位深 |
//! | 30 | `u32` 压缩方式 |
//! | 34 | `u32` 图像大小 |
//! | 38/42 | `i32` 分辨率 |
//! | 46 | `u32` 调色板颜色数 |
//! | 50 | `u32` 重要颜色数 |
//!
//! 调色板 (位深 ≤ 8 时) 紧随信息头，每个条目 4 字节 (B, G, R, 保留)。

use crate::constants::{
    BMP_FILE_HEADER_SIZE, BMP_HEADER_SIZE, BMP_INFO_HEADER_SIZE, BMP_PALETTE_ENTRY_SIZE,
    BMP_PIXELS_PER_METER,
};
use crate::error::{CodecError, Result};
use crate::pixel::{BitDepth, Palette, PixelBuffer, Rgb};
use log::debug;
use std::ops::Range;

/// 像素行在文件中的存放顺序。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Orientation {
    /// 第 0 行是图像的最底行，高度字段为正。
    #[default]
    BottomUp,
    /// 第 0 行是图像的最顶行，高度字段为负。
    TopDown,
}

/// 解析后的 BMP 头部。只有通过 [`BmpHeader::parse`] 校验的头部才会被构造出来。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BmpHeader {
    pub file_size: u32,
    pub pixel_data_offset: u32,
    pub header_size: u32,
    pub width: i32,
    pub height: i32,
    pub planes: u16,
    pub bits_per_pixel: u16,
    pub compression: u32,
    pub image_size: u32,
    pub palette_color_count: u32,
}

fn u16_at(bytes: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([bytes[offset], bytes[offset + 1]])
}

fn u32_at(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}

fn i32_at(bytes: &[u8], offset: usize) -> i32 {
    u32_at(bytes, offset) as i32
}

impl BmpHeader {
    /// 读取并校验 54 字节的头部。
    ///
    /// # Errors
    ///
    /// * 签名不是 `"BM"` 或尺寸非法时返回 [`CodecError::Format`]。
    /// * 数据不足 54 字节时返回 [`CodecError::Bounds`]。
    /// * 压缩方式不为 0、位深不受支持或信息头早于 BITMAPINFOHEADER 时返回 [`CodecError::UnsupportedFeature`]。
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < 2 || &bytes[0..2] != b"BM" {
            return Err(CodecError::Format("missing \"BM\" signature".into()));
        }
        if bytes.len() < BMP_HEADER_SIZE {
            return Err(CodecError::Bounds(format!(
                "BMP header needs {BMP_HEADER_SIZE} bytes, got {}",
                bytes.len()
            )));
        }

        let header = Self {
            file_size: u32_at(bytes, 2),
            pixel_data_offset: u32_at(bytes, 10),
            header_size: u32_at(bytes, 14),
            width: i32_at(bytes, 18),
            height: i32_at(bytes, 22),
            planes: u16_at(bytes, 26),
            bits_per_pixel: u16_at(bytes, 28),
            compression: u32_at(bytes, 30),
            image_size: u32_at(bytes, 34),
            palette_color_count: u32_at(bytes, 46),
        };

        if header.compression != 0 {
            return Err(CodecError::UnsupportedFeature(format!(
                "compression method {} (only uncompressed BMP is supported)",
                header.compression
            )));
        }
        if BitDepth::from_bits(header.bits_per_pixel).is_none() {
            return Err(CodecError::UnsupportedFeature(format!(
                "{} bits per pixel",
                header.bits_per_pixel
            )));
        }
        if header.header_size < BMP_INFO_HEADER_SIZE {
            return Err(CodecError::UnsupportedFeature(format!(
                "info header of {} bytes",
                header.header_size
            )));
        }
        if header.width <= 0 || header.height == 0 {
            return Err(CodecError::Format(format!(
                "invalid dimensions {}x{}",
                header.width, header.height
            )));
        }

        Ok(header)
    }

    pub fn depth(&self) -> BitDepth {
        BitDepth::from_bits(self.bits_per_pixel).unwrap_or(BitDepth::Eight)
    }

    pub fn orientation(&self) -> Orientation {
        if self.height < 0 {
            Orientation::TopDown
        } else {
            Orientation::BottomUp
        }
    }

    pub fn abs_height(&self) -> u32 {
        self.height.unsigned_abs()
    }

    pub fn stride(&self) -> usize {
        self.depth().stride(self.width as u32)
    }

    /// 像素数组在文件中的字节范围：`pixelDataOffset .. pixelDataOffset + stride·|height|`。
    pub fn pixel_region(&self, file_len: usize) -> Result<Range<usize>> {
        let start = self.pixel_data_offset as usize;
        let end = self
            .stride()
            .checked_mul(self.abs_height() as usize)
            .and_then(|size| start.checked_add(size))
            .filter(|&end| end <= file_len)
            .ok_or_else(|| {
                CodecError::Bounds(format!(
                    "pixel array of {} rows x {} bytes at offset {start} exceeds file length {file_len}",
                    self.abs_height(),
                    self.stride()
                ))
            })?;
        Ok(start..end)
    }

    /// 调色板条目数：取头部字段，为 0 时使用位深的默认值。
    fn palette_len(&self) -> Result<usize> {
        let max = self.depth().max_palette_len();
        let count = match self.palette_color_count as usize {
            0 => max,
            n if n > max => {
                return Err(CodecError::Format(format!(
                    "{n} palette colors declared for a {}-bit image",
                    self.bits_per_pixel
                )));
            }
            n => n,
        };
        Ok(count)
    }
}

fn read_palette(bytes: &[u8], header: &BmpHeader) -> Result<Palette> {
    let count = header.palette_len()?;
    let start = BMP_FILE_HEADER_SIZE + header.header_size as usize;
    let end = start + count * BMP_PALETTE_ENTRY_SIZE;
    if end > bytes.len() {
        return Err(CodecError::Bounds(format!(
            "palette of {count} entries at offset {start} exceeds file length {}",
            bytes.len()
        )));
    }

    let colors = bytes[start..end]
        .chunks_exact(BMP_PALETTE_ENTRY_SIZE)
        .map(|entry| Rgb::new(entry[2], entry[1], entry[0]))
        .collect();
    Palette::new(colors)
}

/// 把一行文件数据展开为每像素一个样本。
fn unpack_row(row: &[u8], width: usize, depth: BitDepth, out: &mut Vec<u8>) {
    match depth {
        BitDepth::One => out.extend((0..width).map(|x| (row[x / 8] >> (7 - x % 8)) & 0x1)),
        BitDepth::Four => out.extend((0..width).map(|x| {
            let byte = row[x / 2];
            if x % 2 == 0 { byte >> 4 } else { byte & 0x0F }
        })),
        _ => out.extend_from_slice(&row[..width * depth.sample_size()]),
    }
}

/// 把一行样本按位深打包写入 `out`，不含行尾填充。
fn pack_row(samples: &[u8], depth: BitDepth, out: &mut Vec<u8>) {
    match depth {
        BitDepth::One => out.extend(samples.chunks(8).map(|group| {
            group
                .iter()
                .enumerate()
                .fold(0u8, |byte, (i, &s)| byte | ((s & 0x1) << (7 - i)))
        })),
        BitDepth::Four => out.extend(samples.chunks(2).map(|pair| {
            let high = pair[0] & 0x0F;
            let low = pair.get(1).map_or(0, |s| s & 0x0F);
            (high << 4) | low
        })),
        _ => out.extend_from_slice(samples),
    }
}

/// 将 BMP 文件解码为自上而下的 [`PixelBuffer`]。
///
/// 调色板只在位深 ≤ 8 时读取；行按带填充的跨度遍历，无论头部高度的符号如何，
/// 结果始终以第 0 行为图像顶行。
///
/// # Errors
///
/// 见 [`BmpHeader::parse`]；此外调色板或像素数组越界时返回 [`CodecError::Bounds`]。
pub fn decode(bytes: &[u8]) -> Result<PixelBuffer> {
    let header = BmpHeader::parse(bytes)?;
    let depth = header.depth();
    let width = header.width as u32;
    let height = header.abs_height();
    let stride = header.stride();

    debug!(
        "decoding BMP {width}x{height}, {} bpp, {:?}, stride {stride}",
        depth.bits(),
        header.orientation()
    );

    let palette = if depth.is_indexed() {
        Some(read_palette(bytes, &header)?)
    } else {
        None
    };

    let pixels = &bytes[header.pixel_region(bytes.len())?];
    let mut data = Vec::with_capacity(width as usize * height as usize * depth.sample_size());
    for y in 0..height as usize {
        let stored = match header.orientation() {
            Orientation::TopDown => y,
            Orientation::BottomUp => height as usize - 1 - y,
        };
        let row = &pixels[stored * stride..(stored + 1) * stride];
        unpack_row(row, width as usize, depth, &mut data);
    }

    PixelBuffer::new(width, height, depth, palette, data)
}

/// 将 [`PixelBuffer`] 编码为 BMP 文件。
///
/// 重新计算行跨度、图像大小和文件大小；调色板原样写出；
/// `orientation` 为 [`Orientation::TopDown`] 时以负高度写出，行不做物理翻转。填充字节恒为 0。
///
/// # Errors
///
/// 文件总大小超出 `u32` 可表示的范围时返回 [`CodecError::Bounds`]。
pub fn encode(buffer: &PixelBuffer, orientation: Orientation) -> Result<Vec<u8>> {
    let depth = buffer.depth();
    let width = buffer.width();
    let height = buffer.height();
    let stride = depth.stride(width);
    let palette_len = buffer.palette().map_or(0, Palette::len);
    let pixel_offset = BMP_HEADER_SIZE + palette_len * BMP_PALETTE_ENTRY_SIZE;

    let image_size = stride
        .checked_mul(height as usize)
        .filter(|&size| size <= u32::MAX as usize - pixel_offset)
        .ok_or_else(|| {
            CodecError::Bounds(format!("{width}x{height} image is too large for a BMP file"))
        })?;
    let file_size = pixel_offset + image_size;

    debug!(
        "encoding BMP {width}x{height}, {} bpp, {orientation:?}, {file_size} bytes",
        depth.bits()
    );

    let signed_height = match orientation {
        Orientation::BottomUp => height as i32,
        Orientation::TopDown => -(height as i32),
    };

    let mut out = Vec::with_capacity(file_size);
    out.extend_from_slice(b"BM");
    out.extend_from_slice(&(file_size as u32).to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(&(pixel_offset as u32).to_le_bytes());
    out.extend_from_slice(&BMP_INFO_HEADER_SIZE.to_le_bytes());
    out.extend_from_slice(&(width as i32).to_le_bytes());
    out.extend_from_slice(&signed_height.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes());
    out.extend_from_slice(&depth.bits().to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(&(image_size as u32).to_le_bytes());
    out.extend_from_slice(&BMP_PIXELS_PER_METER.to_le_bytes());
    out.extend_from_slice(&BMP_PIXELS_PER_METER.to_le_bytes());
    out.extend_from_slice(&(palette_len as u32).to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());

    if let Some(palette) = buffer.palette() {
        for color in palette.colors() {
            out.extend_from_slice(&[color.b, color.g, color.r, 0]);
        }
    }

    for i in 0..height {
        let y = match orientation {
            Orientation::TopDown => i,
            Orientation::BottomUp => height - 1 - i,
        };
        let row_start = out.len();
        pack_row(buffer.row(y), depth, &mut out);
        out.resize(row_start + stride, 0);
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pack_and_unpack_one_bit_rows() {
        let samples = [1, 0, 1, 1, 0, 0, 0, 1, 1, 1];
        let mut packed = Vec::new();
        pack_row(&samples, BitDepth::One, &mut packed);
        assert_eq!(packed, vec![0b1011_0001, 0b1100_0000]);

        let mut unpacked = Vec::new();
        unpack_row(&packed, samples.len(), BitDepth::One, &mut unpacked);
        assert_eq!(unpacked, samples);
    }

    #[test]
    fn pack_and_unpack_four_bit_rows() {
        let samples = [0x3, 0xA, 0xF];
        let mut packed = Vec::new();
        pack_row(&samples, BitDepth::Four, &mut packed);
        assert_eq!(packed, vec![0x3A, 0xF0]);

        let mut unpacked = Vec::new();
        unpack_row(&packed, samples.len(), BitDepth::Four, &mut unpacked);
        assert_eq!(unpacked, samples);
    }

    #[test]
    fn stride_is_padded_to_four_bytes() {
        assert_eq!(BitDepth::TwentyFour.stride(1), 4);
        assert_eq!(BitDepth::TwentyFour.stride(5), 16);
        assert_eq!(BitDepth::Eight.stride(5), 8);
        assert_eq!(BitDepth::Four.stride(9), 8);
        assert_eq!(BitDepth::One.stride(33), 8);
    }
}
