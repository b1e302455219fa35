// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

/// 无窗口显示端: 不渲染, 按显示节奏等待并统计帧率
use super::{DisplaySink, KeyEvent};
use crate::pipeline::Frame;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info};

pub struct HeadlessSink {
    shown: u64,
    count: u64,
    last: Instant,
    closed: bool,
}

impl HeadlessSink {
    pub fn new() -> Self {
        Self {
            shown: 0,
            count: 0,
            last: Instant::now(),
            closed: false,
        }
    }

    pub fn frames_shown(&self) -> u64 {
        self.shown
    }
}

impl Default for HeadlessSink {
    fn default() -> Self {
        Self::new()
    }
}

impl DisplaySink for HeadlessSink {
    fn show(&mut self, window_name: &str, frame: &Frame) {
        self.shown += 1;
        self.count += 1;
        if self.last.elapsed().as_secs_f64() >= 1.0 {
            debug!(
                "🖼️  [{}] 帧{} {}x{} | {:.1}fps",
                window_name,
                frame.index,
                frame.width(),
                frame.height(),
                self.count as f64 / self.last.elapsed().as_secs_f64()
            );
            self.last = Instant::now();
            self.count = 0;
        }
    }

    fn poll_key(&mut self, timeout: Duration) -> Option<KeyEvent> {
        thread::sleep(timeout);
        None
    }

    fn close_all(&mut self) {
        if !self.closed {
            self.closed = true;
            info!("🪟 无窗口模式结束: 共显示{}帧", self.shown);
        }
    }
}
