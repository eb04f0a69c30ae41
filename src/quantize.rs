//! # 调色板量化模块
//!
//! 把 8 位索引色图像的调色板缩减为 K 种颜色 (默认 16)：
//! 按使用频率从高到低挑选彼此足够不同的颜色，再把每个像素映射到新调色板中最近的颜色。

use crate::constants::QUANTIZE_THRESHOLD;
use crate::error::{CodecError, Result};
use crate::pixel::{BitDepth, Palette, PixelBuffer, Rgb};
use log::debug;

/// 量化结果：新的索引数据、恰好 K 项的调色板以及对应的 RGBA 渲染。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuantizedImage {
    width: u32,
    height: u32,
    indices: Vec<u8>,
    palette: Palette,
    rgba: Vec<u8>,
}

impl QuantizedImage {
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// 每像素一个字节、取值 `0..K` 的自上而下索引。
    pub fn indices(&self) -> &[u8] {
        &self.indices
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    /// 按行排列、自上而下的 RGBA 数据。
    pub fn rgba(&self) -> &[u8] {
        &self.rgba
    }

    /// 转换为可编码的像素缓冲区：K ≤ 16 时为 4 位，否则为 8 位。
    pub fn into_pixel_buffer(self) -> Result<PixelBuffer> {
        let depth = if self.palette.len() <= BitDepth::Four.max_palette_len() {
            BitDepth::Four
        } else {
            BitDepth::Eight
        };
        PixelBuffer::new(
            self.width,
            self.height,
            depth,
            Some(self.palette),
            self.indices,
        )
    }
}

/// 把 8 位索引色图像量化为 `k` 种颜色。
///
/// 1. 统计每个索引的使用次数，按次数降序 (次数相同按索引升序) 排列；
/// 2. 依次接受与所有已接受颜色的平方距离都不小于阈值 4000 的颜色，直到凑满 `k` 种；
/// 3. 不足 `k` 种时，忽略阈值补入其余尚未出现的颜色，仍不足则以黑色补齐；
/// 4. 每个像素映射到平方距离最小的新调色板项，距离相同时取索引较小者。
///
/// # Errors
///
/// * 输入不是 8 位索引色时返回 [`CodecError::UnsupportedFeature`]。
/// * `k` 不在 `1..=256` 内时返回 [`CodecError::InvalidParameter`]。
pub fn quantize(buffer: &PixelBuffer, k: usize) -> Result<QuantizedImage> {
    if buffer.depth() != BitDepth::Eight {
        return Err(CodecError::UnsupportedFeature(format!(
            "quantization of {}-bit images (only 8-bit is supported)",
            buffer.depth().bits()
        )));
    }
    if !(1..=Palette::MAX_LEN).contains(&k) {
        return Err(CodecError::InvalidParameter(format!(
            "target palette size must be within 1..=256, got {k}"
        )));
    }

    let source = buffer.palette().cloned().unwrap_or_default();
    let color_of = |index: u8| source.get(index).unwrap_or(Rgb::BLACK);

    let mut frequency = [0usize; 256];
    for &index in buffer.data() {
        frequency[usize::from(index)] += 1;
    }

    let mut candidates: Vec<u8> = (0..=255u8).filter(|&i| frequency[usize::from(i)] > 0).collect();
    candidates.sort_by(|&a, &b| frequency[usize::from(b)].cmp(&frequency[usize::from(a)]));

    let mut colors: Vec<Rgb> = Vec::with_capacity(k);
    for &index in &candidates {
        if colors.len() >= k {
            break;
        }
        let color = color_of(index);
        if colors
            .iter()
            .all(|&accepted| color.distance_squared(accepted) >= QUANTIZE_THRESHOLD)
        {
            colors.push(color);
        }
    }
    let distinct = colors.len();

    for &index in &candidates {
        if colors.len() >= k {
            break;
        }
        let color = color_of(index);
        if !colors.contains(&color) {
            colors.push(color);
        }
    }
    colors.resize(k, Rgb::BLACK);

    debug!(
        "quantizing {} used colors to {k}: {distinct} by threshold, {} filled",
        candidates.len(),
        colors.len() - distinct
    );

    let mut mapping = [0u8; 256];
    for &index in &candidates {
        let color = color_of(index);
        let (nearest, _) = colors
            .iter()
            .enumerate()
            .fold((0usize, u32::MAX), |best, (j, &candidate)| {
                let delta = color.distance_squared(candidate);
                if delta < best.1 { (j, delta) } else { best }
            });
        mapping[usize::from(index)] = nearest as u8;
    }

    let indices: Vec<u8> = buffer
        .data()
        .iter()
        .map(|&index| mapping[usize::from(index)])
        .collect();
    let rgba = indices
        .iter()
        .flat_map(|&i| {
            let color = colors[usize::from(i)];
            [color.r, color.g, color.b, 255]
        })
        .collect();

    Ok(QuantizedImage {
        width: buffer.width(),
        height: buffer.height(),
        indices,
        palette: Palette::new(colors)?,
        rgba,
    })
}
