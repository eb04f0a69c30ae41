//! # 命令处理逻辑模块
//!
//! 包含各个子命令的高级业务逻辑。
//! 本模块负责协调文件 I/O、调用核心编解码与变换函数以及向用户报告结果；
//! 核心层只处理内存中的字节和像素，从不接触文件系统。

use crate::bmp::{self, BmpHeader, Orientation};
use crate::cli::{
    BorderArgs, ConvertArgs, HideArgs, OverlayArgs, PreviewArgs, RecoverArgs, ScaleArgs,
    TransformArgs,
};
use crate::constants::PCX_ID;
use crate::error::CodecError;
use crate::pixel::PixelBuffer;
use crate::steganography::{self, BitsPerByte};
use crate::transform::{self, RngEntropy};
use crate::{pcx, quantize};
use anyhow::{Context, Result};
use colored::Colorize;
use image::{ImageFormat, RgbaImage};
use std::fs;
use std::path::{Path, PathBuf};

fn read_file(path: &Path, kind: &str) -> Result<Vec<u8>> {
    fs::read(path).with_context(|| {
        format!(
            "Unable to read {kind} file: {}",
            path.to_string_lossy().red().bold()
        )
    })
}

/// 在输入文件旁生成 `<prefix>_<文件名主干>.<extension>` 形式的默认输出路径。
fn default_output(input: &Path, prefix: &str, extension: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    input.with_file_name(format!("{prefix}_{stem}.{extension}"))
}

fn ensure_writable(path: &Path, force: bool) -> Result<()> {
    anyhow::ensure!(
        force || !path.exists(),
        "Output file already exists: {} \nUse --force to overwrite it.",
        path.to_string_lossy().red().bold()
    );
    Ok(())
}

fn write_output(path: &Path, bytes: &[u8], force: bool) -> Result<()> {
    ensure_writable(path, force)?;
    fs::write(path, bytes).with_context(|| {
        format!(
            "Unable to write to target file: {}",
            path.to_string_lossy().red().bold()
        )
    })
}

/// 读取并解码 BMP，同时返回其原有的行顺序，以便写回时保持一致。
fn load_bmp(path: &Path) -> Result<(PixelBuffer, Orientation)> {
    let bytes = read_file(path, "image")?;
    let orientation = BmpHeader::parse(&bytes)
        .map(|header| header.orientation())
        .with_context(|| {
            format!(
                "'{}' is not a supported BMP file.",
                path.to_string_lossy().red().bold()
            )
        })?;
    let buffer = bmp::decode(&bytes).with_context(|| {
        format!(
            "Failed to decode BMP image: {}",
            path.to_string_lossy().red().bold()
        )
    })?;
    Ok((buffer, orientation))
}

fn save_bmp(
    buffer: &PixelBuffer,
    orientation: Orientation,
    dest: &Path,
    force: bool,
) -> Result<()> {
    let bytes = bmp::encode(buffer, orientation).context("Failed to encode the result as BMP.")?;
    write_output(dest, &bytes, force)?;
    println!(
        "The {}x{} result has been saved: {}",
        buffer.width(),
        buffer.height(),
        dest.to_string_lossy().green().bold()
    );
    Ok(())
}

/// 读取 BMP、应用 `operation` 并写回，保持原有的行顺序。
fn transform_bmp(
    input: &Path,
    dest: Option<PathBuf>,
    force: bool,
    prefix: &str,
    operation: impl FnOnce(&PixelBuffer) -> Result<PixelBuffer>,
) -> Result<()> {
    let dest = dest.unwrap_or_else(|| default_output(input, prefix, "bmp"));
    ensure_writable(&dest, force)?;

    let (buffer, orientation) = load_bmp(input)?;
    let result = operation(&buffer)?;
    save_bmp(&result, orientation, &dest, force)
}

/// BMP 像素数组以给定密度可隐藏的最大字节数；无法解析时为 0。
fn hiding_capacity(picture: &[u8], bits: BitsPerByte) -> usize {
    BmpHeader::parse(picture)
        .and_then(|header| header.pixel_region(picture.len()))
        .map_or(0, |region| steganography::capacity(region.len(), bits))
}

fn parse_bits(bits: u8) -> Result<BitsPerByte> {
    BitsPerByte::try_from(bits).with_context(|| {
        format!(
            "Invalid embedding density {}. \nChoose 2, 4 or 6 bits per byte.",
            bits.to_string().red().bold()
        )
    })
}

/// 处理 'Grayscale' 命令。
///
/// # Errors
///
/// 输入无法读取、不是 8 位 BMP，或输出无法写入时返回错误。
pub fn handle_grayscale(args: TransformArgs) -> Result<()> {
    transform_bmp(&args.input, args.dest, args.force, "grayscale", |buffer| {
        transform::grayscale(buffer).context("Grayscale conversion requires an 8-bit BMP.")
    })
}

/// 处理 'Border' 命令。给定种子时使用确定性的随机数生成器，否则使用线程本地生成器。
///
/// # Errors
///
/// 输入无法读取、位深不受支持，或输出无法写入时返回错误。
pub fn handle_border(args: BorderArgs) -> Result<()> {
    transform_bmp(&args.input, args.dest, args.force, "bordered", |buffer| {
        let bordered = match args.seed {
            Some(seed) => transform::add_border(buffer, &mut RngEntropy::seeded(seed)),
            None => transform::add_border(buffer, &mut RngEntropy::thread()),
        };
        bordered.context("Failed to add a border to the image.")
    })
}

/// 处理 'Rotate' 命令。
///
/// # Errors
///
/// 输入无法读取、不是 24 位 BMP，或输出无法写入时返回错误。
pub fn handle_rotate(args: TransformArgs) -> Result<()> {
    transform_bmp(&args.input, args.dest, args.force, "rotated", |buffer| {
        transform::rotate90(buffer).context("Rotation requires a 24-bit BMP.")
    })
}

/// 处理 'Scale' 命令。
///
/// # Errors
///
/// 输入无法读取、缩放系数无效，或输出无法写入时返回错误。
pub fn handle_scale(args: ScaleArgs) -> Result<()> {
    let factor = args.factor;
    transform_bmp(&args.input, args.dest, args.force, "scaled", |buffer| {
        transform::scale(buffer, factor).with_context(|| {
            format!(
                "Failed to scale the image by {}.",
                factor.to_string().red().bold()
            )
        })
    })
}

/// 处理 'Overlay' 命令。
///
/// # Errors
///
/// 任一图像无法读取或不是 24 位 BMP、权重无效，或输出无法写入时返回错误。
pub fn handle_overlay(args: OverlayArgs) -> Result<()> {
    let (logo, _) = load_bmp(&args.logo)?;
    let weight = args.weight;
    transform_bmp(&args.image, args.dest, args.force, "overlay", |background| {
        transform::overlay(background, &logo, weight)
            .context("Overlay requires two 24-bit BMP images and a weight within [0, 1].")
    })
}

/// 处理 'Hide' 命令的执行逻辑。
///
/// 负责读取图像和文本文件、调用隐写核心函数把长度头和文本写入像素数组，
/// 最后将结果写入目标图像文件。
///
/// # Errors
///
/// 如果发生以下任一情况，将返回错误：
/// * 无法读取输入的图像或文本文件。
/// * 图像不是 24/32 位的未压缩 BMP。
/// * 图像文件没有足够的空间来隐藏文本。
/// * 目标文件已存在且未指定 `--force`，或无法写入。
pub fn handle_hide(args: HideArgs) -> Result<()> {
    let bits = parse_bits(args.bits)?;
    let dest = args
        .dest
        .unwrap_or_else(|| default_output(&args.image, "doctored", "bmp"));
    ensure_writable(&dest, args.force)?;

    let picture = read_file(&args.image, "image")?;
    let text = read_file(&args.text, "text")?;

    let doctored = steganography::embed_in_bmp(&picture, &text, bits).map_err(|err| {
        let message = match err {
            CodecError::Capacity(_) => format!(
                "Not enough space in the image to hide the text. \nRequired: {} bytes, Available: {} bytes",
                text.len().to_string().red().bold(),
                hiding_capacity(&picture, bits).to_string().green().bold()
            ),
            _ => format!(
                "'{}' cannot carry hidden text. \nAn uncompressed 24/32-bit BMP is required.",
                args.image.to_string_lossy().red().bold()
            ),
        };
        anyhow::Error::new(err).context(message)
    })?;

    write_output(&dest, &doctored, args.force)?;

    println!(
        "The text has been successfully hidden and saved: {}",
        dest.to_string_lossy().green().bold()
    );

    Ok(())
}

/// 处理 'Recover' 命令的执行逻辑。
///
/// 负责读取经过隐写的图像文件、调用恢复核心函数获取文本，
/// 最后将恢复的文本内容写入目标文本文件。
///
/// # Errors
///
/// 如果发生以下任一情况，将返回错误：
/// * 无法读取输入的图像文件。
/// * 图像中的长度头与可用数据不符。
/// * 目标文件已存在且未指定 `--force`，或无法写入。
pub fn handle_recover(args: RecoverArgs) -> Result<()> {
    let bits = parse_bits(args.bits)?;
    let dest = args
        .text
        .unwrap_or_else(|| default_output(&args.image, "recovered", "txt"));
    ensure_writable(&dest, args.force)?;

    let picture = read_file(&args.image, "image")?;

    let text = steganography::extract_from_bmp(&picture, bits).with_context(|| {
        format!(
            "Failed to recover a message from '{}'. \nThe image may not contain a hidden message or is corrupted.",
            args.image.to_string_lossy().red().bold()
        )
    })?;

    write_output(&dest, &text, args.force)?;

    println!(
        "The text has been successfully recovered and saved: {}",
        dest.to_string_lossy().green().bold()
    );
    Ok(())
}

/// 处理 'Convert' 命令：解码 PCX、量化调色板并写成自下而上的 BMP。
///
/// # Errors
///
/// 输入不是受支持的 PCX、颜色数无效，或输出无法写入时返回错误。
pub fn handle_convert(args: ConvertArgs) -> Result<()> {
    let dest = args
        .dest
        .unwrap_or_else(|| default_output(&args.input, "converted", "bmp"));
    ensure_writable(&dest, args.force)?;

    let bytes = read_file(&args.input, "PCX")?;
    let image = pcx::decode(&bytes).with_context(|| {
        format!(
            "Failed to decode PCX image: {}",
            args.input.to_string_lossy().red().bold()
        )
    })?;

    let quantized = quantize::quantize(&image, args.colors).with_context(|| {
        format!(
            "Failed to reduce the palette to {} colors.",
            args.colors.to_string().red().bold()
        )
    })?;

    let buffer = quantized.into_pixel_buffer()?;
    save_bmp(&buffer, Orientation::BottomUp, &dest, args.force)
}

/// 处理 'Preview' 命令：根据魔数选择 BMP 或 PCX 解码器，把结果渲染为 PNG。
///
/// # Errors
///
/// 输入既不是 BMP 也不是 PCX、解码失败，或 PNG 无法写入时返回错误。
pub fn handle_preview(args: PreviewArgs) -> Result<()> {
    let dest = args
        .dest
        .unwrap_or_else(|| default_output(&args.input, "preview", "png"));
    ensure_writable(&dest, args.force)?;

    let bytes = read_file(&args.input, "image")?;
    let buffer = match bytes.first() {
        Some(&b'B') => bmp::decode(&bytes),
        Some(&PCX_ID) => pcx::decode(&bytes),
        _ => anyhow::bail!(
            "'{}' is neither a BMP nor a PCX file.",
            args.input.to_string_lossy().red().bold()
        ),
    }
    .with_context(|| {
        format!(
            "Failed to decode image: {}",
            args.input.to_string_lossy().red().bold()
        )
    })?;

    let preview = RgbaImage::from_raw(buffer.width(), buffer.height(), buffer.to_rgba())
        .context("Rendered pixel data does not match the image dimensions.")?;
    preview
        .save_with_format(&dest, ImageFormat::Png)
        .with_context(|| {
            format!(
                "Unable to write preview image: {}",
                dest.to_string_lossy().red().bold()
            )
        })?;

    println!(
        "The preview has been successfully rendered and saved: {}",
        dest.to_string_lossy().green().bold()
    );
    Ok(())
}
