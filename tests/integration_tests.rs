use anyhow::Ok;
use rand::{Rng, RngCore};
use raster_lab::bmp::{self, BmpHeader, Orientation};
use raster_lab::{
    BitDepth, Palette, PixelBuffer, Rgb,
    cli::{BorderArgs, ConvertArgs, HideArgs, PreviewArgs, RecoverArgs, TransformArgs},
    handler::{
        handle_border, handle_convert, handle_grayscale, handle_hide, handle_preview,
        handle_recover,
    },
    pcx,
};
use std::fs;
use std::path::Path;
use tempfile::tempdir;

/// 一个辅助函数，用于创建一个带有随机像素的 24 位 BMP 测试图像
fn create_test_image(path: &Path, width: u32, height: u32) {
    let mut raw_pixels = vec![0u8; (width * height * 3) as usize];
    rand::rng().fill_bytes(&mut raw_pixels);

    let buffer = PixelBuffer::new(width, height, BitDepth::TwentyFour, None, raw_pixels)
        .expect("Failed to build test image.");
    let bytes = bmp::encode(&buffer, Orientation::BottomUp).expect("Failed to encode test image.");
    fs::write(path, bytes).expect("Failed to create test image.");
}

/// 一个辅助函数，用于创建一个随机调色板和索引的 8 位图像
fn create_indexed_image(width: u32, height: u32) -> PixelBuffer {
    let mut rng = rand::rng();
    let colors = (0..256)
        .map(|_| Rgb::new(rng.random(), rng.random(), rng.random()))
        .collect();
    let indices = (0..width * height).map(|_| rng.random()).collect();
    let palette = Palette::new(colors).expect("256 colors fit in a palette");
    PixelBuffer::new(width, height, BitDepth::Eight, Some(palette), indices)
        .expect("Failed to build indexed image.")
}

/// 验证从隐藏到恢复的完整流程
#[test]
fn test_handle_hide_and_recover_integration() -> anyhow::Result<()> {
    // 1. 准备环境
    let dir = tempdir()?;
    let original_image_path = dir.path().join("original.bmp");
    let hidden_image_path = dir.path().join("hidden.bmp");
    let source_text_path = dir.path().join("source.txt");
    let recovered_text_path = dir.path().join("recovered.txt");

    create_test_image(&original_image_path, 100, 100);
    let original_text = "This is a test message for the handler! 这是一个给处理器的测试信息！";
    fs::write(&source_text_path, original_text)?;

    for bits in [2, 4, 6] {
        // 2. 测试 handle_hide
        let hide_args = HideArgs {
            image: original_image_path.clone(),
            text: source_text_path.clone(),
            dest: Some(hidden_image_path.clone()),
            bits,
            force: true,
        };
        handle_hide(hide_args)?;
        assert!(
            hidden_image_path.exists(),
            "Hidden image should be created."
        );

        // 3. 测试 handle_recover
        let recover_args = RecoverArgs {
            image: hidden_image_path.clone(),
            text: Some(recovered_text_path.clone()),
            bits,
            force: true,
        };
        handle_recover(recover_args)?;
        assert!(
            recovered_text_path.exists(),
            "Recovered text file should be created."
        );

        // 4. 验证结果
        let recovered_text = fs::read_to_string(&recovered_text_path)?;
        assert_eq!(
            original_text, recovered_text,
            "Recovered text must match the original with {bits} bits per byte."
        );
    }

    Ok(())
}

/// 验证当用户不提供输出路径时，是否能正确生成默认路径并完成操作
#[test]
fn test_handle_hide_and_recover_with_defaults() -> anyhow::Result<()> {
    // 1. 准备环境
    let dir = tempdir()?;
    let original_image_path = dir.path().join("original.bmp");
    let source_text_path = dir.path().join("source.txt");

    create_test_image(&original_image_path, 100, 100);
    let original_text = "Testing default path generation. 测试默认路径生成。";
    fs::write(&source_text_path, original_text)?;

    // 2. 测试 handle_hide，不提供 dest 路径
    let hide_args = HideArgs {
        image: original_image_path.clone(),
        text: source_text_path.clone(),
        dest: None, // 关键：测试 None 的情况
        bits: 2,
        force: false,
    };
    handle_hide(hide_args)?;

    // 验证默认的隐藏图像文件是否已创建
    let expected_hidden_path = dir.path().join("doctored_original.bmp");
    assert!(
        expected_hidden_path.exists(),
        "Default hidden image should be created at: {:?}",
        expected_hidden_path
    );

    // 3. 测试 handle_recover，不提供 text 输出路径
    let recover_args = RecoverArgs {
        image: expected_hidden_path, // 使用上一步生成的默认文件
        text: None,                  // 关键：测试 None 的情况
        bits: 2,
        force: false,
    };
    handle_recover(recover_args)?;

    // 验证默认的恢复文本文件是否已创建
    let expected_recovered_path = dir.path().join("recovered_doctored_original.txt");
    assert!(
        expected_recovered_path.exists(),
        "Default recovered text file should be created at: {:?}",
        expected_recovered_path
    );

    // 4. 验证结果
    let recovered_text = fs::read_to_string(&expected_recovered_path)?;
    assert_eq!(
        original_text, recovered_text,
        "Recovered text from default file must match the original."
    );

    Ok(())
}

/// 验证覆盖保护机制以及 `--force` 标志是否按预期工作
#[test]
fn test_overwrite_protection_and_force_flag() -> anyhow::Result<()> {
    // 1. 准备环境
    let dir = tempdir()?;
    let image_path = dir.path().join("image.bmp");
    let text_path = dir.path().join("text.txt");
    let dest_path = dir.path().join("dest.bmp");

    create_test_image(&image_path, 50, 50);
    fs::write(&text_path, "some text")?;

    // 2. 场景一：测试覆盖保护
    // 先创建一个同名的目标文件，模拟“文件已存在”的场景
    fs::write(&dest_path, "this is a dummy file to be overwritten")?;
    assert!(dest_path.exists());

    // 构建参数，不使用 --force
    let hide_args_no_force = HideArgs {
        image: image_path.clone(),
        text: text_path.clone(),
        dest: Some(dest_path.clone()),
        bits: 2,
        force: false,
    };

    // 执行并断言操作会失败
    let result = handle_hide(hide_args_no_force);
    assert!(result.is_err(), "Execution should fail without --force when file exists.");
    if let Err(e) = result {
        assert!(e.to_string().contains("Output file already exists"));
    }

    // 3. 场景二：测试强制覆盖
    // 构建参数，这次使用 --force
    let hide_args_with_force = HideArgs {
        image: image_path.clone(),
        text: text_path.clone(),
        dest: Some(dest_path.clone()),
        bits: 2,
        force: true,
    };

    // 执行并断言操作会成功
    let result = handle_hide(hide_args_with_force);
    assert!(result.is_ok(), "Execution should succeed with --force when file exists.");

    // 验证文件确实被覆盖（内容不再是 "this is a dummy file..."）
    let dummy_content = fs::read(&dest_path)?;
    assert_ne!(dummy_content, b"this is a dummy file to be overwritten");

    // 4. 场景三：变换命令同样受覆盖保护
    let grayscale_args = TransformArgs {
        input: image_path,
        dest: Some(dest_path),
        force: false,
    };
    let result = handle_grayscale(grayscale_args);
    assert!(result.is_err());
    if let Err(e) = result {
        assert!(e.to_string().contains("Output file already exists"));
    }

    Ok(())
}

/// 验证空间不足时的错误处理
#[test]
fn test_handle_hide_not_enough_space() -> anyhow::Result<()> {
    // 1. 准备环境
    let dir = tempdir()?;
    let image_path = dir.path().join("small.bmp");
    let text_path = dir.path().join("large.txt");
    let dest_path = dir.path().join("dest.bmp");

    // 创建一个非常小的图片
    create_test_image(&image_path, 10, 10);
    // 创建一个非常大的文本
    let large_text = "a".repeat(5000);
    fs::write(&text_path, large_text)?;

    // 2. 执行并断言错误
    let hide_args = HideArgs {
        image: image_path,
        text: text_path,
        dest: Some(dest_path.clone()),
        bits: 6,
        force: false,
    };
    let result = handle_hide(hide_args);

    assert!(result.is_err());
    if let Err(e) = result {
        assert!(e.to_string().contains("Not enough space"));
    }
    assert!(!dest_path.exists(), "No output should be written on failure.");

    Ok(())
}

/// 验证灰度化写回时保持输入的行顺序
#[test]
fn test_handle_grayscale_keeps_orientation() -> anyhow::Result<()> {
    // 1. 准备环境：一张自上而下存储的 8 位 BMP
    let dir = tempdir()?;
    let input_path = dir.path().join("photo.bmp");
    let image = create_indexed_image(9, 4);
    fs::write(&input_path, bmp::encode(&image, Orientation::TopDown)?)?;

    // 2. 使用默认输出路径执行
    handle_grayscale(TransformArgs {
        input: input_path,
        dest: None,
        force: false,
    })?;

    // 3. 验证结果
    let output = fs::read(dir.path().join("grayscale_photo.bmp"))?;
    assert_eq!(BmpHeader::parse(&output)?.orientation(), Orientation::TopDown);

    let gray = bmp::decode(&output)?;
    assert_eq!(gray.data(), image.data());
    let palette = gray.palette().expect("8-bit images keep their palette");
    assert!(palette.colors().iter().all(|c| c.r == c.g && c.g == c.b));

    Ok(())
}

/// 验证给定种子时边框内容可复现
#[test]
fn test_handle_border_with_seed_is_deterministic() -> anyhow::Result<()> {
    // 1. 准备环境
    let dir = tempdir()?;
    let input_path = dir.path().join("input.bmp");
    let first_path = dir.path().join("first.bmp");
    let second_path = dir.path().join("second.bmp");
    create_test_image(&input_path, 8, 6);

    // 2. 以相同种子执行两次
    for dest in [&first_path, &second_path] {
        handle_border(BorderArgs {
            input: input_path.clone(),
            dest: Some(dest.clone()),
            seed: Some(7),
            force: false,
        })?;
    }

    // 3. 验证结果
    let first = fs::read(&first_path)?;
    assert_eq!(first, fs::read(&second_path)?);

    let bordered = bmp::decode(&first)?;
    assert_eq!((bordered.width(), bordered.height()), (38, 36));

    Ok(())
}

/// 验证 PCX 转换为 16 色的 4 位 BMP
#[test]
fn test_handle_convert_pcx_to_bmp() -> anyhow::Result<()> {
    // 1. 准备环境
    let dir = tempdir()?;
    let input_path = dir.path().join("scan.pcx");
    fs::write(&input_path, pcx::encode(&create_indexed_image(21, 13))?)?;

    // 2. 使用默认颜色数与输出路径执行
    handle_convert(ConvertArgs {
        input: input_path,
        colors: 16,
        dest: None,
        force: false,
    })?;

    // 3. 验证结果
    let output = fs::read(dir.path().join("converted_scan.bmp"))?;
    let header = BmpHeader::parse(&output)?;
    assert_eq!(header.bits_per_pixel, 4);
    assert_eq!(header.orientation(), Orientation::BottomUp);

    let converted = bmp::decode(&output)?;
    assert_eq!((converted.width(), converted.height()), (21, 13));
    assert_eq!(converted.palette().map(|p| p.len()), Some(16));

    Ok(())
}

/// 验证 BMP 与 PCX 都能渲染为可被 `image` 库读取的 PNG
#[test]
fn test_handle_preview_renders_png() -> anyhow::Result<()> {
    // 1. 准备环境
    let dir = tempdir()?;
    let bmp_path = dir.path().join("picture.bmp");
    let pcx_path = dir.path().join("picture.pcx");
    let png_path = dir.path().join("pcx_preview.png");
    create_test_image(&bmp_path, 12, 5);
    let indexed = create_indexed_image(7, 3);
    fs::write(&pcx_path, pcx::encode(&indexed)?)?;

    // 2. BMP 使用默认输出路径，PCX 使用指定路径
    handle_preview(PreviewArgs {
        input: bmp_path,
        dest: None,
        force: false,
    })?;
    handle_preview(PreviewArgs {
        input: pcx_path,
        dest: Some(png_path.clone()),
        force: false,
    })?;

    // 3. 验证结果
    let bmp_preview = image::open(dir.path().join("preview_picture.png"))?.to_rgba8();
    assert_eq!(bmp_preview.dimensions(), (12, 5));

    let pcx_preview = image::open(&png_path)?.to_rgba8();
    assert_eq!(pcx_preview.into_raw(), indexed.to_rgba());

    // 4. 未知格式被拒绝
    let unknown_path = dir.path().join("notes.txt");
    fs::write(&unknown_path, "plain text")?;
    let result = handle_preview(PreviewArgs {
        input: unknown_path,
        dest: None,
        force: false,
    });
    assert!(result.is_err());

    Ok(())
}
