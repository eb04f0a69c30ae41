//! 各测试文件共用的图像构造辅助函数。

#![allow(dead_code)]

use rand::{Rng, RngCore};
use raster_lab::{BitDepth, Palette, PixelBuffer, Rgb};

/// 生成一个随机颜色的调色板
pub fn random_palette(len: usize) -> Palette {
    let mut rng = rand::rng();
    let colors = (0..len)
        .map(|_| Rgb::new(rng.random(), rng.random(), rng.random()))
        .collect();
    Palette::new(colors).expect("palette length is within 256")
}

/// 生成指定位深的随机像素缓冲区；索引色图像使用满长度的随机调色板
pub fn random_buffer(width: u32, height: u32, depth: BitDepth) -> PixelBuffer {
    let mut rng = rand::rng();
    let count = (width * height) as usize;

    let (palette, data) = if depth.is_indexed() {
        let len = depth.max_palette_len();
        let data = (0..count).map(|_| rng.random_range(0..len) as u8).collect();
        (Some(random_palette(len)), data)
    } else {
        let mut data = vec![0u8; count * depth.sample_size()];
        rng.fill_bytes(&mut data);
        (None, data)
    };

    PixelBuffer::new(width, height, depth, palette, data).expect("valid random buffer")
}

/// 用给定调色板和索引构造 8 位图像
pub fn indexed_buffer(width: u32, height: u32, colors: Vec<Rgb>, indices: Vec<u8>) -> PixelBuffer {
    let palette = Palette::new(colors).expect("palette length is within 256");
    PixelBuffer::new(width, height, BitDepth::Eight, Some(palette), indices)
        .expect("valid indexed buffer")
}

/// 用按行排列的 RGB 颜色构造 24 位图像
pub fn rgb_buffer(width: u32, height: u32, pixels: &[Rgb]) -> PixelBuffer {
    let data = pixels.iter().flat_map(|c| [c.b, c.g, c.r]).collect();
    PixelBuffer::new(width, height, BitDepth::TwentyFour, None, data).expect("valid RGB buffer")
}

/// 生成一个随机的字节序列
pub fn random_bytes(len: usize) -> Vec<u8> {
    let mut bytes = vec![0u8; len];
    rand::rng().fill_bytes(&mut bytes);
    bytes
}
