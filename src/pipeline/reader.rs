// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

/// 读帧线程
/// Reader stage: FrameSource → 队列A
use super::control::PlaybackControl;
use super::queue::{PushOutcome, QueueProducer};
use super::Frame;
use crate::input::FrameSource;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// 读帧线程退出原因
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReaderEnd {
    /// 视频读完 (或读帧失败, 同样视为结束), 已发送结束标记
    Exhausted,
    /// 流水线已停止, 未发送结束标记
    Cancelled,
    /// 推理线程已退出, 队列无人消费
    Disconnected,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReaderReport {
    pub frames_read: u64,
    pub frames_forwarded: u64,
    pub read_error: Option<String>,
    pub end: ReaderEnd,
}

/// 读帧循环: 读帧 → 背压入队, 结束时发送一次结束标记
pub fn run<S>(
    source: &mut S,
    tx: QueueProducer<Frame>,
    control: &PlaybackControl,
    retry: Duration,
) -> ReaderReport
where
    S: FrameSource + ?Sized,
{
    info!("🎬 读帧线程启动");

    let mut report = ReaderReport {
        frames_read: 0,
        frames_forwarded: 0,
        read_error: None,
        end: ReaderEnd::Exhausted,
    };

    let mut count = 0u64;
    let mut last = Instant::now();

    while control.is_running() {
        let frame = match source.read_next() {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                debug!("视频源读取完毕");
                break;
            }
            Err(e) => {
                warn!("⚠️  读帧失败, 按视频结束处理: {}", e);
                report.read_error = Some(e.to_string());
                break;
            }
        };
        report.frames_read += 1;

        match tx.push_with_retry(frame, control, retry) {
            PushOutcome::Delivered => report.frames_forwarded += 1,
            PushOutcome::Cancelled => {
                report.end = ReaderEnd::Cancelled;
                break;
            }
            PushOutcome::Disconnected => {
                report.end = ReaderEnd::Disconnected;
                break;
            }
        }

        count += 1;
        if last.elapsed().as_secs_f64() >= 1.0 {
            let fps = count as f64 / last.elapsed().as_secs_f64();
            debug!(
                "📺 读帧统计: 读取{}帧 | {:.1}fps | 队列A {}/{}",
                report.frames_read,
                fps,
                tx.len(),
                tx.capacity()
            );
            last = Instant::now();
            count = 0;
        }
    }

    if report.end == ReaderEnd::Exhausted {
        // 循环因停止而退出时不再发送结束标记
        report.end = match tx.finish(control, retry) {
            PushOutcome::Delivered => ReaderEnd::Exhausted,
            PushOutcome::Cancelled => ReaderEnd::Cancelled,
            PushOutcome::Disconnected => ReaderEnd::Disconnected,
        };
    }

    info!(
        "✅ 读帧线程退出: 读取{}帧, 入队{}帧 ({:?})",
        report.frames_read, report.frames_forwarded, report.end
    );
    report
}
