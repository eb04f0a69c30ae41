//! # PCX 编解码模块
//!
//! 只处理 8 位、单平面、RLE 编码的 PCX (ZSoft Paintbrush 3.0 及以后版本)，
//! 调色板存放在文件末尾：标记字节 `0x0C` 后跟 256 个 RGB 三元组。

use crate::constants::{
    PCX_HEADER_SIZE, PCX_ID, PCX_MAX_RUN, PCX_PALETTE_MARKER, PCX_PALETTE_SIZE, PCX_RUN_FLAG,
    PCX_VERSION,
};
use crate::error::{CodecError, Result};
use crate::pixel::{BitDepth, Palette, PixelBuffer, Rgb};
use log::{debug, warn};

/// PCX 头部中与解码相关的字段。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PcxHeader {
    pub id: u8,
    pub version: u8,
    pub encoding: u8,
    pub bits_per_pixel: u8,
    pub x_min: u16,
    pub y_min: u16,
    pub x_max: u16,
    pub y_max: u16,
    pub planes: u8,
    pub bytes_per_line: u16,
}

fn u16_at(bytes: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([bytes[offset], bytes[offset + 1]])
}

impl PcxHeader {
    /// 读取并校验 128 字节的头部。
    ///
    /// # Errors
    ///
    /// * 标识字节不是 `0x0A`、坐标范围颠倒或行字节数小于宽度时返回 [`CodecError::Format`]。
    /// * 数据不足 128 字节时返回 [`CodecError::Bounds`]。
    /// * 不是 RLE、8 位、单平面时返回 [`CodecError::UnsupportedFeature`]。
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        if bytes.first() != Some(&PCX_ID) {
            return Err(CodecError::Format(format!(
                "PCX identifier must be 0x{PCX_ID:02X}"
            )));
        }
        if bytes.len() < PCX_HEADER_SIZE {
            return Err(CodecError::Bounds(format!(
                "PCX header needs {PCX_HEADER_SIZE} bytes, got {}",
                bytes.len()
            )));
        }

        let header = Self {
            id: bytes[0],
            version: bytes[1],
            encoding: bytes[2],
            bits_per_pixel: bytes[3],
            x_min: u16_at(bytes, 4),
            y_min: u16_at(bytes, 6),
            x_max: u16_at(bytes, 8),
            y_max: u16_at(bytes, 10),
            planes: bytes[65],
            bytes_per_line: u16_at(bytes, 66),
        };

        if header.encoding != 1 {
            return Err(CodecError::UnsupportedFeature(format!(
                "PCX encoding {} (only RLE is supported)",
                header.encoding
            )));
        }
        if header.bits_per_pixel != 8 || header.planes != 1 {
            return Err(CodecError::UnsupportedFeature(format!(
                "PCX with {} bits per pixel and {} planes (only 8-bit single-plane is supported)",
                header.bits_per_pixel, header.planes
            )));
        }
        if header.x_max < header.x_min || header.y_max < header.y_min {
            return Err(CodecError::Format(format!(
                "invalid PCX window ({}, {})-({}, {})",
                header.x_min, header.y_min, header.x_max, header.y_max
            )));
        }
        if u32::from(header.bytes_per_line) < header.width() {
            return Err(CodecError::Format(format!(
                "bytes per line {} is smaller than width {}",
                header.bytes_per_line,
                header.width()
            )));
        }
        if header.version != PCX_VERSION {
            warn!("PCX version {} is not {PCX_VERSION}, decoding anyway", header.version);
        }

        Ok(header)
    }

    pub fn width(&self) -> u32 {
        u32::from(self.x_max - self.x_min) + 1
    }

    pub fn height(&self) -> u32 {
        u32::from(self.y_max - self.y_min) + 1
    }
}

/// 读取文件末尾的调色板，要求其前一字节为 `0x0C`。
fn read_palette(bytes: &[u8]) -> Result<Palette> {
    let trailer = PCX_PALETTE_SIZE + 1;
    if bytes.len() < PCX_HEADER_SIZE + trailer {
        return Err(CodecError::Bounds(format!(
            "PCX file of {} bytes is too small to hold a palette",
            bytes.len()
        )));
    }

    let marker_offset = bytes.len() - trailer;
    if bytes[marker_offset] != PCX_PALETTE_MARKER {
        return Err(CodecError::Format(format!(
            "missing palette marker 0x{PCX_PALETTE_MARKER:02X} at offset {marker_offset}"
        )));
    }

    let colors = bytes[marker_offset + 1..]
        .chunks_exact(3)
        .map(|rgb| Rgb::new(rgb[0], rgb[1], rgb[2]))
        .collect();
    Palette::new(colors)
}

/// 展开 RLE 数据流，直到填满 `out`。
///
/// 控制字节高两位都置位时，低 6 位是重复次数，下一字节是要重复的值；
/// 否则控制字节本身就是一个像素值。
fn decode_rle(stream: &[u8], out: &mut [u8]) -> Result<()> {
    let mut input = stream.iter().copied();
    let mut pos = 0;

    while pos < out.len() {
        let control = input.next().ok_or_else(|| {
            CodecError::Bounds(format!(
                "RLE stream ended after {pos} of {} bytes",
                out.len()
            ))
        })?;

        let (count, value) = if control & PCX_RUN_FLAG == PCX_RUN_FLAG {
            let value = input.next().ok_or_else(|| {
                CodecError::Bounds("RLE run is missing its value byte".into())
            })?;
            (usize::from(control & !PCX_RUN_FLAG), value)
        } else {
            (1, control)
        };

        let end = (pos + count).min(out.len());
        out[pos..end].fill(value);
        pos = end;
    }

    Ok(())
}

/// 将 PCX 文件解码为 8 位索引色 [`PixelBuffer`]。
///
/// 每行解码 `bytesPerLine` 个字节，超出宽度的部分 (行填充) 被丢弃。
///
/// # Errors
///
/// 见 [`PcxHeader::parse`]；调色板标记缺失时返回 [`CodecError::Format`]，
/// RLE 数据不足时返回 [`CodecError::Bounds`]。
pub fn decode(bytes: &[u8]) -> Result<PixelBuffer> {
    let header = PcxHeader::parse(bytes)?;
    let palette = read_palette(bytes)?;
    let width = header.width() as usize;
    let height = header.height() as usize;
    let bytes_per_line = usize::from(header.bytes_per_line);

    debug!("decoding PCX {width}x{height}, {bytes_per_line} bytes per line");

    let stream = &bytes[PCX_HEADER_SIZE..bytes.len() - PCX_PALETTE_SIZE - 1];
    let mut lines = vec![0u8; height * bytes_per_line];
    decode_rle(stream, &mut lines)?;

    let data = lines
        .chunks_exact(bytes_per_line)
        .flat_map(|line| &line[..width])
        .copied()
        .collect();

    PixelBuffer::new(width as u32, height as u32, BitDepth::Eight, Some(palette), data)
}

/// 把一行像素按 RLE 写入 `out`。
///
/// 连续相同的值合并为最长 63 的段；`0xC0` 及以上的值即使只出现一次也写成两字节段形式，
/// 这样解码端不会把它误认为控制字节。
fn encode_rle_line(line: &[u8], out: &mut Vec<u8>) {
    let mut i = 0;
    while i < line.len() {
        let value = line[i];
        let run = line[i..]
            .iter()
            .take(PCX_MAX_RUN)
            .take_while(|&&b| b == value)
            .count();

        if run == 1 && value < PCX_RUN_FLAG {
            out.push(value);
        } else {
            out.push(PCX_RUN_FLAG | run as u8);
            out.push(value);
        }
        i += run;
    }
}

/// 将 8 位索引色 [`PixelBuffer`] 编码为版本 5 的 RLE PCX 文件。
///
/// 行字节数向上取偶，调色板不足 256 项时以黑色补齐。
///
/// # Errors
///
/// * 位深不是 8 时返回 [`CodecError::UnsupportedFeature`]。
/// * 宽或高超出 PCX 坐标范围时返回 [`CodecError::Bounds`]。
pub fn encode(buffer: &PixelBuffer) -> Result<Vec<u8>> {
    if buffer.depth() != BitDepth::Eight {
        return Err(CodecError::UnsupportedFeature(format!(
            "PCX encoding of {}-bit images (only 8-bit is supported)",
            buffer.depth().bits()
        )));
    }

    let width = buffer.width();
    let height = buffer.height();
    let bytes_per_line = (width + 1) & !1;
    let limit = u32::from(u16::MAX);
    if width > limit || height > limit || bytes_per_line > limit {
        return Err(CodecError::Bounds(format!(
            "{width}x{height} image exceeds PCX coordinate range"
        )));
    }

    debug!("encoding PCX {width}x{height}, {bytes_per_line} bytes per line");

    let mut out = vec![0u8; PCX_HEADER_SIZE];
    out[0] = PCX_ID;
    out[1] = PCX_VERSION;
    out[2] = 1;
    out[3] = 8;
    out[8..10].copy_from_slice(&((width - 1) as u16).to_le_bytes());
    out[10..12].copy_from_slice(&((height - 1) as u16).to_le_bytes());
    out[12..14].copy_from_slice(&72u16.to_le_bytes());
    out[14..16].copy_from_slice(&72u16.to_le_bytes());
    out[65] = 1;
    out[66..68].copy_from_slice(&(bytes_per_line as u16).to_le_bytes());
    out[68..70].copy_from_slice(&1u16.to_le_bytes());

    let mut line = vec![0u8; bytes_per_line as usize];
    for y in 0..height {
        line[..width as usize].copy_from_slice(buffer.row(y));
        encode_rle_line(&line, &mut out);
    }

    out.push(PCX_PALETTE_MARKER);
    let colors = buffer.palette().map(Palette::colors).unwrap_or_default();
    for i in 0..Palette::MAX_LEN {
        let color = colors.get(i).copied().unwrap_or(Rgb::BLACK);
        out.extend_from_slice(&[color.r, color.g, color.b]);
    }

    Ok(out)
}
