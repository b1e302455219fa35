// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

/// 显示模块 (Display Sink)
///
/// - DisplaySink: 显示端统一接口 (显示一帧 / 限时等待按键 / 关闭窗口)
/// - StatusOverlay: 帧上叠加播放状态文字
/// - HeadlessSink: 无窗口运行, 只记录日志
/// - WindowSink: macroquad GPU窗口 (feature = "window")
pub mod headless;
pub mod overlay;
#[cfg(feature = "window")]
pub mod window;

use crate::pipeline::Frame;
use std::time::Duration;

pub use headless::HeadlessSink;
pub use overlay::{load_font, StatusOverlay};
#[cfg(feature = "window")]
pub use window::{run_window, window_conf, WindowHandle, WindowMessage, WindowSink};

/// 一次按键 (字符形式, 空格键为 ' ')
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct KeyEvent(pub char);

/// 显示端接口
///
/// 由显示线程独占, 只在流水线结束时 close_all 一次
pub trait DisplaySink {
    /// 显示一帧
    fn show(&mut self, window_name: &str, frame: &Frame);

    /// 最多等待 `timeout` 获取一次按键, 超时返回 None
    ///
    /// 显示节奏由这里的等待时长决定
    fn poll_key(&mut self, timeout: Duration) -> Option<KeyEvent>;

    /// 关闭所有窗口
    fn close_all(&mut self);
}

impl<D: DisplaySink + ?Sized> DisplaySink for Box<D> {
    fn show(&mut self, window_name: &str, frame: &Frame) {
        (**self).show(window_name, frame)
    }

    fn poll_key(&mut self, timeout: Duration) -> Option<KeyEvent> {
        (**self).poll_key(timeout)
    }

    fn close_all(&mut self) {
        (**self).close_all()
    }
}
