// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

/// 本地视频文件解码器
/// FFmpeg软件解码, 在后台线程推送RGBA帧, 读帧线程按需拉取
use super::decode_filter::{DecodeFilter, DecodedImage};
use super::FrameSource;
use crate::error::SourceError;
use crate::pipeline::Frame;
use crossbeam_channel::{bounded, Receiver};
use ez_ffmpeg::core::context::null_output::create_null_output;
use ez_ffmpeg::filter::frame_pipeline_builder::FramePipelineBuilder;
use ez_ffmpeg::stream_info::{find_video_stream_info, StreamInfo};
use ez_ffmpeg::{AVMediaType, FfmpegContext, Input};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{error, info, warn};

/// 解码线程与读帧线程之间的缓冲帧数
const DECODE_BUFFER: usize = 4;

pub struct FfmpegSource {
    path: PathBuf,
    fps: Option<f64>,
    rx: Option<Receiver<DecodedImage>>,
    stop: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
    next_index: u64,
}

impl FfmpegSource {
    /// 打开视频文件并启动解码线程
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        let path = path.as_ref().to_path_buf();
        if !path.is_file() {
            return Err(SourceError::NotFound(path));
        }
        let url = path.to_string_lossy().into_owned();

        let unreadable = |reason: String| SourceError::Unreadable {
            path: path.clone(),
            reason,
        };

        let fps = match find_video_stream_info(url.clone()) {
            Ok(Some(StreamInfo::Video { avg_frame_rate, .. })) if avg_frame_rate.den > 0 => {
                Some(avg_frame_rate.num as f64 / avg_frame_rate.den as f64).filter(|f| *f > 0.0)
            }
            Ok(Some(_)) => None,
            Ok(None) => return Err(unreadable("未找到视频流".to_string())),
            Err(e) => return Err(unreadable(e.to_string())),
        };
        match fps {
            Some(fps) => info!("🎞️  视频帧率: {:.2}fps", fps),
            None => warn!("⚠️  视频未报告帧率"),
        }

        let (tx, rx) = bounded::<DecodedImage>(DECODE_BUFFER);
        let (ready_tx, ready_rx) = bounded::<Result<(), String>>(1);
        let stop = Arc::new(AtomicBool::new(false));

        let filter = DecodeFilter::new(tx.clone(), stop.clone());
        let worker = thread::Builder::new()
            .name("decoder".into())
            .spawn(move || {
                let pipe: FramePipelineBuilder = AVMediaType::AVMEDIA_TYPE_VIDEO.into();
                let pipe = pipe.filter("decode", Box::new(filter));
                let out = create_null_output().add_frame_pipeline(pipe);

                let started = FfmpegContext::builder()
                    .input(Input::new(url))
                    .filter_descs(["format=yuv420p"].into())
                    .output(out)
                    .build()
                    .map_err(|e| format!("构建失败: {}", e))
                    .and_then(|ctx| ctx.start().map_err(|e| format!("启动失败: {}", e)));

                let sch = match started {
                    Ok(sch) => {
                        let _ = ready_tx.send(Ok(()));
                        sch
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };

                if let Err(e) = sch.wait() {
                    // 主动释放导致的终止不算读帧失败
                    if !stop.load(Ordering::Acquire) {
                        error!("❌ 解码中断: {}", e);
                        let _ = tx.send(Err(SourceError::Read(e.to_string())));
                    }
                }
            })
            .map_err(|e| unreadable(e.to_string()))?;

        match ready_rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(reason)) => {
                let _ = worker.join();
                return Err(unreadable(reason));
            }
            Err(_) => {
                let _ = worker.join();
                return Err(unreadable("解码线程异常退出".to_string()));
            }
        }

        info!("✅ 视频已打开: {}", path.display());
        Ok(Self {
            path,
            fps,
            rx: Some(rx),
            stop,
            worker: Some(worker),
            next_index: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl FrameSource for FfmpegSource {
    fn read_next(&mut self) -> Result<Option<Frame>, SourceError> {
        let Some(rx) = &self.rx else {
            return Ok(None);
        };
        // 解码结束后发送端全部销毁, recv 返回 Err
        match rx.recv() {
            Ok(Ok(image)) => {
                let frame = Frame::new(self.next_index, image);
                self.next_index += 1;
                Ok(Some(frame))
            }
            Ok(Err(e)) => Err(e),
            Err(_) => Ok(None),
        }
    }

    fn native_frame_rate(&self) -> Option<f64> {
        self.fps
    }

    fn release(&mut self) {
        self.stop.store(true, Ordering::Release);
        // 先销毁接收端, 解除解码线程在发送上的阻塞
        self.rx = None;
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                error!("❌ 解码线程panic");
            }
            info!("🔌 视频源已释放: {} (共{}帧)", self.path.display(), self.next_index);
        }
    }
}

impl Drop for FfmpegSource {
    fn drop(&mut self) {
        self.release();
    }
}
