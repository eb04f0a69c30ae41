//! # 命令行接口模块
//!
//! 使用 `clap` 定义了程序的命令行结构，包括子命令和参数。
//! 每个子命令对应一个核心操作；输出路径省略时根据输入文件名自动生成，
//! 目标文件已存在时必须显式传入 `--force` 才会覆盖。

use crate::constants::QUANTIZE_COLORS;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// 一款处理 BMP/PCX 图像的命令行工具：灰度化、加边框、旋转、缩放、叠加图标、调色板量化以及 LSB 隐写。
#[derive(Parser, Debug)]
#[command(
    version,
    about,
    long_about = "一款处理 BMP/PCX 图像的命令行工具：灰度化、加边框、旋转、缩放、叠加图标、调色板量化以及 LSB 隐写。"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// 可用的子命令。
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// 把 8 位 BMP 的调色板转换为灰度。
    Grayscale(TransformArgs),

    /// 在 BMP 四周添加 15 像素宽的随机边框。
    Border(BorderArgs),

    /// 将 24 位 BMP 旋转 90°。
    Rotate(TransformArgs),

    /// 以最近邻插值缩放 BMP。
    Scale(ScaleArgs),

    /// 把 24 位 BMP 图标居中叠加到 24 位 BMP 背景上。
    Overlay(OverlayArgs),

    /// 在 24/32 位 BMP 中隐藏文本文件内容。
    Hide(HideArgs),

    /// 从经过隐写的 BMP 中恢复隐藏的文本。
    Recover(RecoverArgs),

    /// 把 256 色 PCX 量化后转换为 BMP。
    Convert(ConvertArgs),

    /// 把 BMP 或 PCX 渲染为 PNG 预览图。
    Preview(PreviewArgs),
}

/// 只需要输入和输出路径的变换命令的参数。
#[derive(Parser, Debug)]
pub struct TransformArgs {
    /// 输入的 BMP 文件路径。
    #[arg(short, long)]
    pub input: PathBuf,

    /// 保存结果的路径；省略时在输入文件旁自动生成。
    #[arg(short, long)]
    pub dest: Option<PathBuf>,

    /// 允许覆盖已存在的输出文件。
    #[arg(short, long)]
    pub force: bool,
}

/// 'border' 命令所需的参数。
#[derive(Parser, Debug)]
pub struct BorderArgs {
    /// 输入的 BMP 文件路径 (8/24/32 位)。
    #[arg(short, long)]
    pub input: PathBuf,

    /// 保存结果的路径；省略时在输入文件旁自动生成。
    #[arg(short, long)]
    pub dest: Option<PathBuf>,

    /// 随机数种子；给定时边框内容可复现。
    #[arg(short, long)]
    pub seed: Option<u64>,

    /// 允许覆盖已存在的输出文件。
    #[arg(short, long)]
    pub force: bool,
}

/// 'scale' 命令所需的参数。
#[derive(Parser, Debug)]
pub struct ScaleArgs {
    /// 输入的 BMP 文件路径。
    #[arg(short, long)]
    pub input: PathBuf,

    /// 缩放系数 (常用范围 0.1 到 10)。
    #[arg(short = 'k', long, default_value_t = 2.0)]
    pub factor: f64,

    /// 保存结果的路径；省略时在输入文件旁自动生成。
    #[arg(short, long)]
    pub dest: Option<PathBuf>,

    /// 允许覆盖已存在的输出文件。
    #[arg(short, long)]
    pub force: bool,
}

/// 'overlay' 命令所需的参数。
#[derive(Parser, Debug)]
pub struct OverlayArgs {
    /// 作为背景的 24 位 BMP 文件路径。
    #[arg(short, long)]
    pub image: PathBuf,

    /// 作为图标的 24 位 BMP 文件路径；其左上角像素的颜色视为透明。
    #[arg(short, long)]
    pub logo: PathBuf,

    /// 背景在混合中所占的权重 (0.1 到 0.9)。
    #[arg(short = 'k', long, default_value_t = 0.5)]
    pub weight: f64,

    /// 保存结果的路径；省略时在背景文件旁自动生成。
    #[arg(short, long)]
    pub dest: Option<PathBuf>,

    /// 允许覆盖已存在的输出文件。
    #[arg(short, long)]
    pub force: bool,
}

/// 'hide' 命令所需的参数。
#[derive(Parser, Debug)]
pub struct HideArgs {
    /// 用于隐写的 24/32 位 BMP 文件路径。
    #[arg(short, long)]
    pub image: PathBuf,

    /// 要隐藏的文本内容的文件路径。
    #[arg(short, long)]
    pub text: PathBuf,

    /// 隐写完成后，保存结果图像的输出路径。
    #[arg(short, long)]
    pub dest: Option<PathBuf>,

    /// 每个像素字节承载的位数：2、4 或 6。
    #[arg(short, long, default_value_t = 2)]
    pub bits: u8,

    /// 允许覆盖已存在的输出文件。
    #[arg(short, long)]
    pub force: bool,
}

/// 'recover' 命令所需的参数。
#[derive(Parser, Debug)]
pub struct RecoverArgs {
    /// 已隐藏文本数据的图像文件路径。
    #[arg(short, long)]
    pub image: PathBuf,

    /// 恢复文本后，保存文本内容的输出路径。
    #[arg(short, long)]
    pub text: Option<PathBuf>,

    /// 隐藏时使用的每字节位数：2、4 或 6。
    #[arg(short, long, default_value_t = 2)]
    pub bits: u8,

    /// 允许覆盖已存在的输出文件。
    #[arg(short, long)]
    pub force: bool,
}

/// 'convert' 命令所需的参数。
#[derive(Parser, Debug)]
pub struct ConvertArgs {
    /// 输入的 8 位 PCX 文件路径。
    #[arg(short, long)]
    pub input: PathBuf,

    /// 量化后的颜色数；不超过 16 时输出 4 位 BMP。
    #[arg(short, long, default_value_t = QUANTIZE_COLORS)]
    pub colors: usize,

    /// 保存结果的路径；省略时在输入文件旁自动生成。
    #[arg(short, long)]
    pub dest: Option<PathBuf>,

    /// 允许覆盖已存在的输出文件。
    #[arg(short, long)]
    pub force: bool,
}

/// 'preview' 命令所需的参数。
#[derive(Parser, Debug)]
pub struct PreviewArgs {
    /// 输入的 BMP 或 PCX 文件路径。
    #[arg(short, long)]
    pub input: PathBuf,

    /// 保存 PNG 的路径；省略时在输入文件旁自动生成。
    #[arg(short, long)]
    pub dest: Option<PathBuf>,

    /// 允许覆盖已存在的输出文件。
    #[arg(short, long)]
    pub force: bool,
}
