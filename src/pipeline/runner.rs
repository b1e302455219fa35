// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

/// 流水线编排
/// 创建两个有界队列, 启动读帧/推理线程, 在调用者线程运行显示循环
use super::control::PlaybackControl;
use super::display::{self, DisplayReport, DisplaySettings};
use super::processor::{self, ProcessorReport, ProcessorSettings};
use super::queue::BoundedQueue;
use super::rate::RateController;
use super::reader::{self, ReaderReport};
use super::Frame;
use crate::config::PipelineConfig;
use crate::detection::Annotator;
use crate::error::PipelineError;
use crate::input::FrameSource;
use crate::renderer::{DisplaySink, StatusOverlay};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{error, info};

/// 一次播放的运行汇总
#[derive(Clone, Debug)]
pub struct RunSummary {
    pub reader: ReaderReport,
    pub processor: ProcessorReport,
    pub display: DisplayReport,
    pub elapsed: Duration,
}

impl RunSummary {
    pub fn log(&self) {
        info!("📋 运行汇总 ({:.1}s):", self.elapsed.as_secs_f64());
        info!(
            "  读帧: 读取{} 入队{} ({:?})",
            self.reader.frames_read, self.reader.frames_forwarded, self.reader.end
        );
        if let Some(e) = &self.reader.read_error {
            info!("  读帧错误: {}", e);
        }
        info!(
            "  推理: 标注{} 失败{} 下发{} ({:?})",
            self.processor.frames_annotated,
            self.processor.failures,
            self.processor.frames_forwarded,
            self.processor.end
        );
        info!(
            "  显示: {}帧 ({:?})",
            self.display.frames_shown, self.display.end
        );
    }
}

/// 离开作用域时停止流水线 (包括显示循环panic的情况), 保证工作线程能被join
struct ShutdownGuard<'a>(&'a PlaybackControl);

impl Drop for ShutdownGuard<'_> {
    fn drop(&mut self) {
        self.0.stop();
    }
}

/// 流水线结束时关闭所有窗口
struct SinkGuard<'a, D: DisplaySink + ?Sized>(&'a mut D);

impl<D: DisplaySink + ?Sized> Drop for SinkGuard<'_, D> {
    fn drop(&mut self) {
        self.0.close_all();
    }
}

/// 工作线程全部join之后释放视频源
struct SourceGuard<'a, S: FrameSource + ?Sized>(&'a mut S);

impl<S: FrameSource + ?Sized> Drop for SourceGuard<'_, S> {
    fn drop(&mut self) {
        self.0.release();
    }
}

pub struct Pipeline {
    config: PipelineConfig,
    overlay: StatusOverlay,
}

impl Pipeline {
    /// 校验配置并加载状态文字字体
    pub fn new(config: PipelineConfig) -> Result<Self, PipelineError> {
        config.validate()?;
        let overlay = StatusOverlay::load(config.font_path.as_deref());
        Ok(Self { config, overlay })
    }

    pub fn with_overlay(mut self, overlay: StatusOverlay) -> Self {
        self.overlay = overlay;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// 运行到视频结束或用户退出
    ///
    /// 返回前所有线程均已退出, 窗口已关闭, 视频源已释放
    pub fn run<S, A, D>(
        &self,
        source: &mut S,
        annotator: &mut A,
        sink: &mut D,
    ) -> Result<RunSummary, PipelineError>
    where
        S: FrameSource + Send + ?Sized,
        A: Annotator + Send + ?Sized,
        D: DisplaySink + ?Sized,
    {
        let config = &self.config;
        let base_fps = RateController::resolve_base_fps(source.native_frame_rate(), config.default_fps);
        let rate = RateController::new(base_fps, config.speed_steps.clone())?;

        // panic时按声明的逆序析构: 先关闭窗口, 再释放视频源
        let mut source = SourceGuard(source);
        let mut sink = SinkGuard(sink);

        let started = Instant::now();
        let stages = self.run_stages(&mut *source.0, annotator, &mut *sink.0, &rate);
        drop(sink);
        drop(source);

        let (reader, processor, display) = stages?;
        let summary = RunSummary {
            reader,
            processor,
            display,
            elapsed: started.elapsed(),
        };
        summary.log();
        Ok(summary)
    }

    fn run_stages<S, A, D>(
        &self,
        source: &mut S,
        annotator: &mut A,
        sink: &mut D,
        rate: &RateController,
    ) -> Result<(ReaderReport, ProcessorReport, DisplayReport), PipelineError>
    where
        S: FrameSource + Send + ?Sized,
        A: Annotator + Send + ?Sized,
        D: DisplaySink + ?Sized,
    {
        let config = &self.config;
        let control = PlaybackControl::new();

        // 队列A: 读帧线程 → 推理线程 / 队列B: 推理线程 → 显示线程
        let (tx_a, rx_a) = BoundedQueue::<Frame>::new(config.queue_capacity).split();
        let (tx_b, rx_b) = BoundedQueue::<Frame>::new(config.queue_capacity).split();

        let push_retry = config.push_retry();
        let processor_settings = ProcessorSettings {
            pop_timeout: config.processor_pop_timeout(),
            push_retry,
            on_failure: config.annotation_failure,
        };
        let display_settings = DisplaySettings {
            window_name: config.window_name.clone(),
            pop_timeout: config.display_pop_timeout(),
            idle_key_poll: config.idle_key_poll(),
            pause_poll: config.pause_poll(),
        };

        thread::scope(|scope| -> Result<_, PipelineError> {
            let guard = ShutdownGuard(&control);
            let control = &control;

            let reader = thread::Builder::new()
                .name("reader".into())
                .spawn_scoped(scope, move || reader::run(source, tx_a, control, push_retry))
                .map_err(PipelineError::Spawn)?;

            let processor_settings = &processor_settings;
            let processor = thread::Builder::new()
                .name("processor".into())
                .spawn_scoped(scope, move || {
                    processor::run(annotator, rx_a, tx_b, control, processor_settings)
                })
                .map_err(PipelineError::Spawn)?;

            info!(
                "🚀 流水线启动: 队列容量 {} | 基础帧率 {:.2}fps",
                config.queue_capacity,
                rate.base_fps()
            );
            let display = display::run(sink, rx_b, control, rate, &self.overlay, &display_settings);
            drop(guard);

            let reader = reader.join().map_err(|_| {
                error!("❌ 读帧线程panic");
                PipelineError::WorkerPanicked("读帧")
            })?;
            let processor = processor.join().map_err(|_| {
                error!("❌ 推理线程panic");
                PipelineError::WorkerPanicked("推理")
            })?;
            Ok((reader, processor, display))
        })
    }
}
