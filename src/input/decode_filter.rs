// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

/// FFmpeg解码过滤器: 解码帧(YUV420P) → RGBA图像 → 通道
use super::convert::{yuv420p_to_rgba, Yuv420Planes};
use crate::error::SourceError;
use crossbeam_channel::Sender;
use ez_ffmpeg::filter::frame_filter::FrameFilter;
use ez_ffmpeg::filter::frame_filter_context::FrameFilterContext;
use ez_ffmpeg::{AVMediaType, Frame};
use image::RgbaImage;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

pub type DecodedImage = Result<RgbaImage, SourceError>;

pub struct DecodeFilter {
    tx: Sender<DecodedImage>,
    stop: Arc<AtomicBool>,
    count: usize,
    total_frames: usize,
    dropped_frames: usize,
    last: Instant,
}

impl DecodeFilter {
    pub fn new(tx: Sender<DecodedImage>, stop: Arc<AtomicBool>) -> Self {
        Self {
            tx,
            stop,
            count: 0,
            total_frames: 0,
            dropped_frames: 0,
            last: Instant::now(),
        }
    }

    fn drop_frame(&mut self, reason: &str) {
        self.dropped_frames += 1;
        if self.dropped_frames <= 10 {
            warn!("⚠️  丢弃帧 #{}: {}", self.total_frames, reason);
        }
    }
}

impl FrameFilter for DecodeFilter {
    fn media_type(&self) -> AVMediaType {
        AVMediaType::AVMEDIA_TYPE_VIDEO
    }

    fn init(&mut self, _ctx: &FrameFilterContext) -> Result<(), String> {
        info!("✅ 解码线程启动");
        Ok(())
    }

    fn filter_frame(
        &mut self,
        frame: Frame,
        _ctx: &FrameFilterContext,
    ) -> Result<Option<Frame>, String> {
        if self.stop.load(Ordering::Acquire) {
            return Err("decoder released".to_string());
        }
        self.total_frames += 1;

        let image = unsafe {
            if frame.as_ptr().is_null() || frame.is_empty() || frame.is_corrupt() {
                self.drop_frame("空帧/损坏帧");
                return Ok(None);
            }

            let raw = &*frame.as_ptr();
            let (w, h) = (raw.width, raw.height);
            if w <= 0 || h <= 0 {
                self.drop_frame("非法分辨率");
                return Ok(None);
            }

            let (y_plane, u_plane, v_plane) = (raw.data[0], raw.data[1], raw.data[2]);
            let (y_stride, uv_stride) = (raw.linesize[0], raw.linesize[1]);
            if y_plane.is_null() || u_plane.is_null() || v_plane.is_null() {
                self.drop_frame("YUV指针为空");
                return Ok(None);
            }
            if y_stride <= 0 || uv_stride <= 0 || raw.linesize[2] != uv_stride {
                self.drop_frame("步长异常");
                return Ok(None);
            }

            // format=yuv420p 滤镜保证了平面布局
            let (w, h) = (w as usize, h as usize);
            let (y_stride, uv_stride) = (y_stride as usize, uv_stride as usize);
            let uv_h = h.div_ceil(2);
            let planes = Yuv420Planes {
                y: std::slice::from_raw_parts(y_plane, y_stride * h),
                u: std::slice::from_raw_parts(u_plane, uv_stride * uv_h),
                v: std::slice::from_raw_parts(v_plane, uv_stride * uv_h),
                y_stride,
                uv_stride,
            };
            yuv420p_to_rgba(&planes, w as u32, h as u32)
        };

        let Some(image) = image else {
            self.drop_frame("平面数据不足");
            return Ok(None);
        };

        // 读帧线程已释放视频源时接收端已销毁, 返回错误以终止解码
        if self.tx.send(Ok(image)).is_err() {
            return Err("frame receiver dropped".to_string());
        }

        self.count += 1;
        if self.last.elapsed().as_secs_f64() >= 1.0 {
            debug!(
                "📺 解码统计: {:.1}fps | 总帧{} | 丢弃{}",
                self.count as f64 / self.last.elapsed().as_secs_f64(),
                self.total_frames,
                self.dropped_frames
            );
            self.last = Instant::now();
            self.count = 0;
        }

        Ok(Some(frame))
    }

    fn uninit(&mut self, _ctx: &FrameFilterContext) {
        info!(
            "✅ 解码线程退出: 总帧{} 丢弃{}",
            self.total_frames, self.dropped_frames
        );
    }
}
