// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

/// 视频处理流水线 (Video Processing Pipeline)
///
/// 三线程架构,通过两个有界队列通信:
/// - Reader:    视频读帧 (独立线程)      → 队列A
/// - Processor: 逐帧推理标注 (独立线程)  队列A → 队列B
/// - Display:   叠加状态/显示/按键 (调用者线程) ← 队列B
///
/// 所有线程只通过队列交换帧, 共享的只有播放状态 (PlaybackControl) 与倍速 (RateController)
pub mod control;
pub mod display;
pub mod processor;
pub mod queue;
pub mod rate;
pub mod reader;
pub mod runner;

use image::RgbaImage;

pub use control::{PlaybackControl, PlaybackState};
pub use display::{Command, DisplayEnd, DisplayReport};
pub use processor::{ProcessorEnd, ProcessorReport};
pub use queue::{BoundedQueue, Popped, PushOutcome, QueueConsumer, QueueProducer};
pub use rate::RateController;
pub use reader::{ReaderEnd, ReaderReport};
pub use runner::{Pipeline, RunSummary};

// ========== 队列消息类型定义 ==========

/// 视频帧 (视频源 → 推理线程 → 显示线程)
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    pub index: u64, // 帧序号, 由视频源从0开始递增分配
    pub image: RgbaImage,
}

impl Frame {
    pub fn new(index: u64, image: RgbaImage) -> Self {
        Self { index, image }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// 保持帧序号, 替换图像内容 (推理线程产出新帧时使用)
    pub fn with_image(&self, image: RgbaImage) -> Self {
        Self {
            index: self.index,
            image,
        }
    }
}

/// 队列元素: 数据帧或结束标记
#[derive(Debug, PartialEq)]
pub enum Packet<T> {
    Data(T),
    EndOfStream,
}
