//! # 错误类型模块
//!
//! 所有编解码与变换入口共用的错误类型。每个变体对应一种失败类别，
//! 并携带一段可读的详细说明。核心层从不在内部恢复错误，而是原样返回给调用方。

use thiserror::Error;

/// 编解码、像素变换与隐写操作可能返回的错误。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// 魔数、签名或标记字节不正确，或头部字段自相矛盾。
    #[error("format error: {0}")]
    Format(String),

    /// 位深、压缩方式或平面数超出支持范围。
    #[error("unsupported feature: {0}")]
    UnsupportedFeature(String),

    /// 载荷超出容器可容纳的容量。
    #[error("capacity error: {0}")]
    Capacity(String),

    /// 由头部推导出的偏移超出缓冲区，或提取出的长度与可用数据不符。
    #[error("bounds error: {0}")]
    Bounds(String),

    /// 调用方传入的数值参数不在允许的取值范围内。
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

pub type Result<T> = std::result::Result<T, CodecError>;
