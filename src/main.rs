use clap::Parser;

use raster_lab::{
    cli::{Cli, Commands},
    handler::{
        handle_border, handle_convert, handle_grayscale, handle_hide, handle_overlay,
        handle_preview, handle_recover, handle_rotate, handle_scale,
    },
};

/// 程序的主入口点
///
/// 初始化日志 (通过 `RUST_LOG` 控制级别)，解析命令行参数，
/// 并根据指定的子命令将执行分派到相应的处理函数
fn main() -> anyhow::Result<()> {
    env_logger::init();

    // 解析命令行参数
    let cli = Cli::parse();

    // 根据子命令调用相应的处理函数
    match cli.command {
        Commands::Grayscale(args) => handle_grayscale(args),
        Commands::Border(args) => handle_border(args),
        Commands::Rotate(args) => handle_rotate(args),
        Commands::Scale(args) => handle_scale(args),
        Commands::Overlay(args) => handle_overlay(args),
        Commands::Hide(args) => handle_hide(args),
        Commands::Recover(args) => handle_recover(args),
        Commands::Convert(args) => handle_convert(args),
        Commands::Preview(args) => handle_preview(args),
    }
}
