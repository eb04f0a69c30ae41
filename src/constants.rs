/// BMP 文件头 (14 字节) 与 BITMAPINFOHEADER (40 字节) 的总大小。
/// 调色板紧随其后，从偏移 54 开始。
pub const BMP_HEADER_SIZE: usize = 54;

/// BMP 文件头本身的大小 (字节)，信息头从这里开始。
pub const BMP_FILE_HEADER_SIZE: usize = 14;

/// 编码时写入的信息头大小 (BITMAPINFOHEADER)。
pub const BMP_INFO_HEADER_SIZE: u32 = 40;

/// 编码时写入的水平/垂直分辨率 (像素/米，约 72 DPI)。
pub const BMP_PIXELS_PER_METER: i32 = 2835;

/// BMP 调色板中每个条目占用的字节数 (B, G, R, 保留)。
pub const BMP_PALETTE_ENTRY_SIZE: usize = 4;

/// PCX 固定头部大小 (字节)，图像数据从这里开始。
pub const PCX_HEADER_SIZE: usize = 128;

/// PCX 文件的标识字节。
pub const PCX_ID: u8 = 0x0A;

/// 写入的 PCX 版本号 (带 256 色调色板的 3.0 版本)。
pub const PCX_VERSION: u8 = 5;

/// 位于文件末尾调色板之前的标记字节。
pub const PCX_PALETTE_MARKER: u8 = 0x0C;

/// 文件末尾调色板的大小：256 个 RGB 三元组。
pub const PCX_PALETTE_SIZE: usize = 768;

/// RLE 控制字节的高两位掩码；两位都置位时表示重复计数。
pub const PCX_RUN_FLAG: u8 = 0xC0;

/// 单个 RLE 段可表示的最大重复次数 (低 6 位)。
pub const PCX_MAX_RUN: usize = 0x3F;

/// 加边框操作在四周添加的像素宽度。
pub const BORDER_WIDTH: u32 = 15;

/// 隐写长度头的位宽。
/// 载荷字节数以小端 `u32` 写入，并与载荷使用同样的位打包规则。
pub const HEADER_BITS: u32 = 32;

/// 调色板量化时两种颜色被视为"足够不同"所需的最小平方 RGB 距离。
pub const QUANTIZE_THRESHOLD: u32 = 4000;

/// 调色板量化的默认目标颜色数。
pub const QUANTIZE_COLORS: usize = 16;
