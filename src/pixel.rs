//! # 像素缓冲区模块
//!
//! 定义所有编解码器和变换共享的内存光栅模型。
//!
//! [`PixelBuffer`] 在内存中始终按自上而下的顺序存放，行与行之间没有填充：
//! 索引色图像 (1/4/8 位) 每个像素占 1 字节 (调色板索引)，24 位图像每个像素占 3 字节 (B, G, R)，
//! 32 位图像每个像素占 4 字节 (B, G, R, X)。位打包和行对齐只在编码到具体文件格式时发生。

use crate::error::{CodecError, Result};
use log::warn;

/// 一个 8 位/通道的 RGB 颜色。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb { r: 0, g: 0, b: 0 };

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// 两种颜色之间的平方 RGB 距离。
    pub fn distance_squared(self, other: Rgb) -> u32 {
        let dr = i32::from(self.r) - i32::from(other.r);
        let dg = i32::from(self.g) - i32::from(other.g);
        let db = i32::from(self.b) - i32::from(other.b);
        (dr * dr + dg * dg + db * db) as u32
    }
}

/// 有序的调色板，最多 256 个条目，按索引排列。
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Palette {
    colors: Vec<Rgb>,
}

impl Palette {
    pub const MAX_LEN: usize = 256;

    pub fn new(colors: Vec<Rgb>) -> Result<Self> {
        if colors.len() > Self::MAX_LEN {
            return Err(CodecError::Format(format!(
                "palette has {} entries, at most {} are allowed",
                colors.len(),
                Self::MAX_LEN
            )));
        }
        Ok(Self { colors })
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    pub fn get(&self, index: u8) -> Option<Rgb> {
        self.colors.get(usize::from(index)).copied()
    }

    pub fn colors(&self) -> &[Rgb] {
        &self.colors
    }

    pub fn colors_mut(&mut self) -> &mut [Rgb] {
        &mut self.colors
    }
}

/// 支持的位深。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BitDepth {
    One,
    Four,
    Eight,
    TwentyFour,
    ThirtyTwo,
}

impl BitDepth {
    pub fn from_bits(bits: u16) -> Option<Self> {
        match bits {
            1 => Some(Self::One),
            4 => Some(Self::Four),
            8 => Some(Self::Eight),
            24 => Some(Self::TwentyFour),
            32 => Some(Self::ThirtyTwo),
            _ => None,
        }
    }

    pub fn bits(self) -> u16 {
        match self {
            Self::One => 1,
            Self::Four => 4,
            Self::Eight => 8,
            Self::TwentyFour => 24,
            Self::ThirtyTwo => 32,
        }
    }

    /// 是否为调色板索引色。
    pub fn is_indexed(self) -> bool {
        self.bits() <= 8
    }

    /// 内存模型中每个像素占用的字节数。
    pub fn sample_size(self) -> usize {
        match self {
            Self::One | Self::Four | Self::Eight => 1,
            Self::TwentyFour => 3,
            Self::ThirtyTwo => 4,
        }
    }

    /// 该位深下调色板最多能有多少个条目；直接色返回 0。
    pub fn max_palette_len(self) -> usize {
        if self.is_indexed() {
            1 << self.bits()
        } else {
            0
        }
    }

    /// BMP 行跨度：`⌊(bitsPerPixel·width + 31) / 32⌋ · 4`。
    pub fn stride(self, width: u32) -> usize {
        (usize::from(self.bits()) * width as usize).div_ceil(32) * 4
    }
}

/// 规范化的内存光栅：几何信息、可选调色板和自上而下的像素数据。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    depth: BitDepth,
    palette: Option<Palette>,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// 构造并校验一个像素缓冲区。
    ///
    /// # Errors
    ///
    /// * 宽或高为 0 或超过 `i32::MAX` 时返回 [`CodecError::InvalidParameter`]。
    /// * 数据长度与 `width · height · sample_size` 不符时返回 [`CodecError::Bounds`]。
    /// * 索引色缺少调色板、调色板为空或超出位深上限，以及直接色携带调色板时返回 [`CodecError::Format`]。
    pub fn new(
        width: u32,
        height: u32,
        depth: BitDepth,
        palette: Option<Palette>,
        data: Vec<u8>,
    ) -> Result<Self> {
        if width == 0 || height == 0 || width > i32::MAX as u32 || height > i32::MAX as u32 {
            return Err(CodecError::InvalidParameter(format!(
                "image dimensions {width}x{height} are out of range"
            )));
        }

        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|n| n.checked_mul(depth.sample_size()))
            .ok_or_else(|| {
                CodecError::Bounds(format!("image dimensions {width}x{height} overflow"))
            })?;
        if data.len() != expected {
            return Err(CodecError::Bounds(format!(
                "pixel data has {} bytes, expected {expected}",
                data.len()
            )));
        }

        match (&palette, depth.is_indexed()) {
            (None, true) => {
                return Err(CodecError::Format(format!(
                    "{}-bit image requires a palette",
                    depth.bits()
                )));
            }
            (Some(p), true) if p.is_empty() || p.len() > depth.max_palette_len() => {
                return Err(CodecError::Format(format!(
                    "{}-bit image cannot use a palette of {} entries",
                    depth.bits(),
                    p.len()
                )));
            }
            (Some(_), false) => {
                return Err(CodecError::Format(format!(
                    "{}-bit image must not carry a palette",
                    depth.bits()
                )));
            }
            _ => {}
        }

        Ok(Self {
            width,
            height,
            depth,
            palette,
            data,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn depth(&self) -> BitDepth {
        self.depth
    }

    pub fn palette(&self) -> Option<&Palette> {
        self.palette.as_ref()
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// 一行像素占用的字节数 (内存中无填充)。
    pub fn row_len(&self) -> usize {
        self.width as usize * self.depth.sample_size()
    }

    /// 第 `y` 行 (自上而下) 的样本数据。
    pub fn row(&self, y: u32) -> &[u8] {
        let len = self.row_len();
        let start = y as usize * len;
        &self.data[start..start + len]
    }

    /// `(x, y)` 处的原始样本：索引色为 1 字节索引，直接色为 B, G, R(, X)。
    pub fn sample(&self, x: u32, y: u32) -> &[u8] {
        let size = self.depth.sample_size();
        let start = (y as usize * self.width as usize + x as usize) * size;
        &self.data[start..start + size]
    }

    /// 将 `(x, y)` 处的像素解析为 RGB 颜色。超出调色板的索引被视为黑色。
    pub fn rgb(&self, x: u32, y: u32) -> Rgb {
        let sample = self.sample(x, y);
        match &self.palette {
            Some(palette) => palette.get(sample[0]).unwrap_or(Rgb::BLACK),
            None => Rgb::new(sample[2], sample[1], sample[0]),
        }
    }

    /// 将缓冲区渲染为按行排列、自上而下的 RGBA 数据 (alpha 恒为 255)。
    pub fn to_rgba(&self) -> Vec<u8> {
        let mut rgba = Vec::with_capacity(self.width as usize * self.height as usize * 4);
        let mut out_of_range = 0usize;

        for sample in self.data.chunks_exact(self.depth.sample_size()) {
            let color = match &self.palette {
                Some(palette) => palette.get(sample[0]).unwrap_or_else(|| {
                    out_of_range += 1;
                    Rgb::BLACK
                }),
                None => Rgb::new(sample[2], sample[1], sample[0]),
            };
            rgba.extend_from_slice(&[color.r, color.g, color.b, 255]);
        }

        if out_of_range > 0 {
            warn!("{out_of_range} pixels reference indices beyond the palette, rendered black");
        }
        rgba
    }

    /// 拆解为 (宽, 高, 位深, 调色板, 数据)。
    pub fn into_parts(self) -> (u32, u32, BitDepth, Option<Palette>, Vec<u8>) {
        (self.width, self.height, self.depth, self.palette, self.data)
    }
}
