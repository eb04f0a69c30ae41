//! # raster_lab 库
//!
//! 本库包含 BMP/PCX 图像工具的核心逻辑：字节级的编解码器、像素变换、
//! 调色板量化和 LSB 隐写，全部以内存中的字节或像素缓冲区为输入输出。

// 声明库包含的所有模块。

pub mod bmp;
pub mod cli;
pub mod constants;
pub mod error;
pub mod handler;
pub mod pcx;
pub mod pixel;
pub mod quantize;
pub mod steganography;
pub mod transform;

pub use error::{CodecError, Result};
pub use pixel::{BitDepth, Palette, PixelBuffer, Rgb};
