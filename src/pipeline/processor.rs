// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

/// 推理线程 (Processor)
/// 职责: 队列A取帧 → Annotator推理标注 → 队列B
use super::control::PlaybackControl;
use super::queue::{Popped, PushOutcome, QueueConsumer, QueueProducer};
use super::Frame;
use crate::config::AnnotationFailurePolicy;
use crate::detection::Annotator;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProcessorEnd {
    /// 收到并转发了结束标记
    EndOfStream,
    /// 流水线已停止
    Cancelled,
    /// 上游未发送结束标记就退出, 或下游已销毁
    Disconnected,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProcessorReport {
    pub frames_received: u64,
    pub frames_annotated: u64,
    pub failures: u64,
    pub frames_forwarded: u64,
    pub end: ProcessorEnd,
}

pub struct ProcessorSettings {
    pub pop_timeout: Duration,
    pub push_retry: Duration,
    pub on_failure: AnnotationFailurePolicy,
}

/// 推理循环
pub fn run<A>(
    annotator: &mut A,
    rx: QueueConsumer<Frame>,
    tx: QueueProducer<Frame>,
    control: &PlaybackControl,
    settings: &ProcessorSettings,
) -> ProcessorReport
where
    A: Annotator + ?Sized,
{
    info!("🔍 推理线程启动");

    let mut report = ProcessorReport {
        frames_received: 0,
        frames_annotated: 0,
        failures: 0,
        frames_forwarded: 0,
        end: ProcessorEnd::Cancelled,
    };

    let mut count = 0u64;
    let mut busy = Duration::ZERO;
    let mut last = Instant::now();

    while control.is_running() {
        let frame = match rx.pop(settings.pop_timeout) {
            Popped::Item(frame) => frame,
            Popped::Empty => continue,
            Popped::EndOfStream => {
                report.end = match tx.finish(control, settings.push_retry) {
                    PushOutcome::Delivered => ProcessorEnd::EndOfStream,
                    PushOutcome::Cancelled => ProcessorEnd::Cancelled,
                    PushOutcome::Disconnected => ProcessorEnd::Disconnected,
                };
                break;
            }
            Popped::Disconnected if !control.is_running() => break,
            Popped::Disconnected => {
                error!("❌ 读帧线程未发送结束标记就已退出");
                report.end = ProcessorEnd::Disconnected;
                break;
            }
        };
        report.frames_received += 1;

        let start = Instant::now();
        let output = match annotator.annotate(&frame) {
            Ok(annotated) => {
                report.frames_annotated += 1;
                Some(annotated)
            }
            Err(e) => {
                report.failures += 1;
                match settings.on_failure {
                    AnnotationFailurePolicy::PassThrough => {
                        warn!("⚠️  [帧{}] 推理失败, 原始帧直接显示: {}", frame.index, e);
                        Some(frame)
                    }
                    AnnotationFailurePolicy::Skip => {
                        warn!("⚠️  [帧{}] 推理失败, 跳过该帧: {}", frame.index, e);
                        None
                    }
                }
            }
        };
        busy += start.elapsed();
        count += 1;

        if last.elapsed().as_secs_f64() >= 1.0 {
            let elapsed = last.elapsed().as_secs_f64();
            debug!(
                "📊 推理统计: 处理{}帧 | {:.1}fps | 每帧{:.1}ms | 队列A {}/{}",
                count,
                count as f64 / elapsed,
                busy.as_secs_f64() * 1000.0 / count as f64,
                rx.len(),
                rx.capacity()
            );
            last = Instant::now();
            busy = Duration::ZERO;
            count = 0;
        }

        let Some(output) = output else {
            continue;
        };
        match tx.push_with_retry(output, control, settings.push_retry) {
            PushOutcome::Delivered => report.frames_forwarded += 1,
            PushOutcome::Cancelled => {
                report.end = ProcessorEnd::Cancelled;
                break;
            }
            PushOutcome::Disconnected => {
                report.end = ProcessorEnd::Disconnected;
                break;
            }
        }
    }

    info!(
        "✅ 推理线程退出: 收到{}帧, 标注{}帧, 失败{}帧 ({:?})",
        report.frames_received, report.frames_annotated, report.failures, report.end
    );
    report
}
