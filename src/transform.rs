//! # 像素变换模块
//!
//! 灰度化、加边框、旋转 90°、最近邻缩放和带透明度的图标叠加。
//! 所有变换都接收一个 [`PixelBuffer`] 并返回新的缓冲区，输入保持不变。

use crate::constants::BORDER_WIDTH;
use crate::error::{CodecError, Result};
use crate::pixel::{BitDepth, PixelBuffer, Rgb};
use log::debug;
use rand::rngs::{StdRng, ThreadRng};
use rand::{RngCore, SeedableRng};

/// 为边框像素提供随机字节的来源。
///
/// 加边框操作通过这个接口获取像素内容，测试可以注入固定序列。
pub trait EntropySource {
    /// 用下一批字节填满 `buf`。
    fn fill(&mut self, buf: &mut [u8]);
}

/// 基于 `rand` 随机数生成器的熵源。
#[derive(Debug, Clone)]
pub struct RngEntropy<R>(pub R);

impl RngEntropy<ThreadRng> {
    /// 使用线程本地随机数生成器。
    pub fn thread() -> Self {
        Self(rand::rng())
    }
}

impl RngEntropy<StdRng> {
    /// 使用给定种子的确定性生成器，相同种子总是产生相同的边框。
    pub fn seeded(seed: u64) -> Self {
        Self(StdRng::seed_from_u64(seed))
    }
}

impl<R: RngCore> EntropySource for RngEntropy<R> {
    fn fill(&mut self, buf: &mut [u8]) {
        self.0.fill_bytes(buf);
    }
}

/// 循环重复一段固定字节序列的熵源。
#[derive(Debug, Clone)]
pub struct CycleEntropy {
    bytes: Vec<u8>,
    pos: usize,
}

impl CycleEntropy {
    /// `bytes` 为空时输出全零。
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes, pos: 0 }
    }
}

impl EntropySource for CycleEntropy {
    fn fill(&mut self, buf: &mut [u8]) {
        if self.bytes.is_empty() {
            buf.fill(0);
            return;
        }
        for byte in buf.iter_mut() {
            *byte = self.bytes[self.pos];
            self.pos = (self.pos + 1) % self.bytes.len();
        }
    }
}

fn require_depth(buffer: &PixelBuffer, depth: BitDepth, operation: &str) -> Result<()> {
    if buffer.depth() != depth {
        return Err(CodecError::UnsupportedFeature(format!(
            "{operation} requires a {}-bit image, got {}-bit",
            depth.bits(),
            buffer.depth().bits()
        )));
    }
    Ok(())
}

/// 把 8 位图像的调色板转换为灰度。
///
/// 每个条目取 `round(0.299·R + 0.587·G + 0.114·B)` 并令 R = G = B；像素索引保持不变。
///
/// # Errors
///
/// 输入不是 8 位索引色时返回 [`CodecError::UnsupportedFeature`]。
pub fn grayscale(buffer: &PixelBuffer) -> Result<PixelBuffer> {
    require_depth(buffer, BitDepth::Eight, "grayscale")?;

    let (width, height, depth, palette, data) = buffer.clone().into_parts();
    let mut palette = palette.unwrap_or_default();
    debug!("converting {} palette entries to grayscale", palette.len());

    for color in palette.colors_mut() {
        let luma = (0.299 * f64::from(color.r) + 0.587 * f64::from(color.g)
            + 0.114 * f64::from(color.b))
        .round() as u8;
        *color = Rgb::new(luma, luma, luma);
    }

    PixelBuffer::new(width, height, depth, Some(palette), data)
}

/// 在图像四周添加宽 15 像素的随机边框。
///
/// 边框像素按行优先顺序从 `entropy` 获取，每个像素占用与其样本相同的字节数
/// (8 位 1 字节，24 位 3 字节，32 位 4 字节)。原图像素原样复制到内部。
///
/// # Errors
///
/// * 1/4 位图像返回 [`CodecError::UnsupportedFeature`]。
/// * 新尺寸溢出时返回 [`CodecError::InvalidParameter`]。
pub fn add_border(buffer: &PixelBuffer, entropy: &mut dyn EntropySource) -> Result<PixelBuffer> {
    let depth = buffer.depth();
    if matches!(depth, BitDepth::One | BitDepth::Four) {
        return Err(CodecError::UnsupportedFeature(format!(
            "border on {}-bit images",
            depth.bits()
        )));
    }

    let border = BORDER_WIDTH;
    let (new_width, new_height) = buffer
        .width()
        .checked_add(2 * border)
        .zip(buffer.height().checked_add(2 * border))
        .ok_or_else(|| CodecError::InvalidParameter("bordered image is too large".into()))?;

    debug!(
        "adding {border}px border: {}x{} -> {new_width}x{new_height}",
        buffer.width(),
        buffer.height()
    );

    let size = depth.sample_size();
    let new_row_len = new_width as usize * size;
    let side_len = border as usize * size;
    let mut data = vec![0u8; new_row_len * new_height as usize];

    for (y, row) in data.chunks_exact_mut(new_row_len).enumerate() {
        let y = y as u32;
        if y < border || y >= border + buffer.height() {
            entropy.fill(row);
            continue;
        }
        let (left, rest) = row.split_at_mut(side_len);
        let (interior, right) = rest.split_at_mut(buffer.row_len());
        entropy.fill(left);
        interior.copy_from_slice(buffer.row(y - border));
        entropy.fill(right);
    }

    PixelBuffer::new(
        new_width,
        new_height,
        depth,
        buffer.palette().cloned(),
        data,
    )
}

/// 将 24 位图像旋转 90°。
///
/// 新宽度为原高度，新高度为原宽度；源像素 `(x, y)` 移到 `(y, newHeight − 1 − x)`。
///
/// # Errors
///
/// 输入不是 24 位时返回 [`CodecError::UnsupportedFeature`]。
pub fn rotate90(buffer: &PixelBuffer) -> Result<PixelBuffer> {
    require_depth(buffer, BitDepth::TwentyFour, "rotation")?;

    let new_width = buffer.height();
    let new_height = buffer.width();
    debug!("rotating {}x{} by 90 degrees", buffer.width(), buffer.height());

    let mut data = vec![0u8; buffer.data().len()];
    for y in 0..buffer.height() {
        for x in 0..buffer.width() {
            let new_x = y as usize;
            let new_y = (new_height - 1 - x) as usize;
            let dst = (new_y * new_width as usize + new_x) * 3;
            data[dst..dst + 3].copy_from_slice(buffer.sample(x, y));
        }
    }

    PixelBuffer::new(new_width, new_height, BitDepth::TwentyFour, None, data)
}

/// 以最近邻插值按系数 `k` 缩放图像。
///
/// 目标尺寸为 `round(width·k) × round(height·k)`；目标像素 `(x, y)` 取源像素
/// `(min(⌊x/k⌋, width−1), min(⌊y/k⌋, height−1))`。调色板保持不变。
///
/// # Errors
///
/// `k` 不是正有限数或目标尺寸为 0 时返回 [`CodecError::InvalidParameter`]。
pub fn scale(buffer: &PixelBuffer, k: f64) -> Result<PixelBuffer> {
    if !k.is_finite() || k <= 0.0 {
        return Err(CodecError::InvalidParameter(format!(
            "scale factor must be a positive number, got {k}"
        )));
    }

    let scaled = |len: u32| -> Result<u32> {
        let target = (f64::from(len) * k).round();
        if target < 1.0 || target > f64::from(i32::MAX) {
            return Err(CodecError::InvalidParameter(format!(
                "scaling {len} pixels by {k} gives an invalid size"
            )));
        }
        Ok(target as u32)
    };
    let new_width = scaled(buffer.width())?;
    let new_height = scaled(buffer.height())?;

    debug!(
        "scaling {}x{} by {k} -> {new_width}x{new_height}",
        buffer.width(),
        buffer.height()
    );

    let source_of = |dst: u32, len: u32| ((f64::from(dst) / k).floor() as u32).min(len - 1);
    let size = buffer.depth().sample_size();
    let mut data = Vec::with_capacity(new_width as usize * new_height as usize * size);

    for y in 0..new_height {
        let src_y = source_of(y, buffer.height());
        for x in 0..new_width {
            let src_x = source_of(x, buffer.width());
            data.extend_from_slice(buffer.sample(src_x, src_y));
        }
    }

    PixelBuffer::new(
        new_width,
        new_height,
        buffer.depth(),
        buffer.palette().cloned(),
        data,
    )
}

/// 把 24 位图标居中叠加到 24 位背景上。
///
/// 图标 `(0, 0)` 处的颜色是透明色，与之完全相同的图标像素被跳过；
/// 其余像素按通道混合为 `round(bg·k + logo·(1−k))`，`k` 是背景的权重。
/// 落在背景之外的图标像素直接跳过。
///
/// # Errors
///
/// * 任一图像不是 24 位时返回 [`CodecError::UnsupportedFeature`]。
/// * `k` 不在 `[0, 1]` 内时返回 [`CodecError::InvalidParameter`]。
pub fn overlay(background: &PixelBuffer, logo: &PixelBuffer, k: f64) -> Result<PixelBuffer> {
    require_depth(background, BitDepth::TwentyFour, "overlay background")?;
    require_depth(logo, BitDepth::TwentyFour, "overlay logo")?;
    if !(0.0..=1.0).contains(&k) {
        return Err(CodecError::InvalidParameter(format!(
            "background weight must be within [0, 1], got {k}"
        )));
    }

    let offset_x = (i64::from(background.width()) - i64::from(logo.width())).div_euclid(2);
    let offset_y = (i64::from(background.height()) - i64::from(logo.height())).div_euclid(2);
    let key = logo.rgb(0, 0);

    debug!(
        "overlaying {}x{} logo at ({offset_x}, {offset_y}), weight {k}, key {key:?}",
        logo.width(),
        logo.height()
    );

    let blend = |bg: u8, fg: u8| (f64::from(bg) * k + f64::from(fg) * (1.0 - k)).round() as u8;
    let (width, height, depth, _, mut data) = background.clone().into_parts();

    for ly in 0..logo.height() {
        let by = offset_y + i64::from(ly);
        if by < 0 || by >= i64::from(height) {
            continue;
        }
        for lx in 0..logo.width() {
            let bx = offset_x + i64::from(lx);
            if bx < 0 || bx >= i64::from(width) {
                continue;
            }
            if logo.rgb(lx, ly) == key {
                continue;
            }

            let fg = logo.sample(lx, ly);
            let at = (by as usize * width as usize + bx as usize) * 3;
            for (channel, &value) in data[at..at + 3].iter_mut().zip(fg) {
                *channel = blend(*channel, value);
            }
        }
    }

    PixelBuffer::new(width, height, depth, None, data)
}
