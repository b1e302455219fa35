// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

/// 视频输入 (Video Input)
///
/// - FrameSource: 视频源统一接口, 由读帧线程独占
/// - convert: YUV420P → RGBA 像素转换
/// - FfmpegSource: FFmpeg 本地视频文件解码 (feature = "ffmpeg")
pub mod convert;
#[cfg(feature = "ffmpeg")]
pub mod decode_filter;
#[cfg(feature = "ffmpeg")]
pub mod decoder;

use crate::error::SourceError;
use crate::pipeline::Frame;

pub use convert::{yuv420p_to_rgba, Yuv420Planes};
#[cfg(feature = "ffmpeg")]
pub use decoder::FfmpegSource;

/// 视频源
pub trait FrameSource {
    /// 读取下一帧; 视频结束返回 Ok(None)
    ///
    /// 帧序号从0开始连续递增
    fn read_next(&mut self) -> Result<Option<Frame>, SourceError>;

    /// 视频报告的帧率, 未知时返回 None
    fn native_frame_rate(&self) -> Option<f64>;

    /// 释放底层资源, 之后不再调用 read_next
    fn release(&mut self);
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn read_next(&mut self) -> Result<Option<Frame>, SourceError> {
        (**self).read_next()
    }

    fn native_frame_rate(&self) -> Option<f64> {
        (**self).native_frame_rate()
    }

    fn release(&mut self) {
        (**self).release()
    }
}
