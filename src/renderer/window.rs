// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

/// macroquad GPU窗口
///
/// macroquad 的事件循环必须在主线程运行, 流水线 (含显示循环) 在工作线程:
/// - WindowSink: 交给流水线, show 把帧发往窗口, poll_key 在按键通道上限时等待
/// - WindowHandle: 留在主线程, 由 run_window 驱动渲染并回传按键
use super::{DisplaySink, KeyEvent};
use crate::pipeline::Frame;
use crossbeam_channel::{bounded, unbounded, Receiver, Sender, TrySendError};
use image::RgbaImage;
use macroquad::prelude::*;
use std::time::Duration;
use tracing::{debug, info};

/// 窗口消息 (流水线 → 主线程)
pub enum WindowMessage {
    Show(RgbaImage),
    Close,
}

/// 主线程最多积压的帧数, 超出时丢弃最旧的渲染请求
const FRAME_BUFFER: usize = 2;

pub struct WindowSink {
    frame_tx: Sender<WindowMessage>,
    key_rx: Receiver<KeyEvent>,
}

pub struct WindowHandle {
    frame_rx: Receiver<WindowMessage>,
    key_tx: Sender<KeyEvent>,
}

impl WindowSink {
    pub fn channel() -> (WindowSink, WindowHandle) {
        let (frame_tx, frame_rx) = bounded(FRAME_BUFFER);
        let (key_tx, key_rx) = unbounded();
        (
            WindowSink { frame_tx, key_rx },
            WindowHandle { frame_rx, key_tx },
        )
    }
}

impl DisplaySink for WindowSink {
    fn show(&mut self, _window_name: &str, frame: &Frame) {
        match self.frame_tx.try_send(WindowMessage::Show(frame.image.clone())) {
            Ok(()) => {}
            // 窗口渲染跟不上时跳过这一帧的画面, 节奏仍由 poll_key 控制
            Err(TrySendError::Full(_)) => debug!("窗口繁忙, 跳过帧{}", frame.index),
            Err(TrySendError::Disconnected(_)) => {}
        }
    }

    fn poll_key(&mut self, timeout: Duration) -> Option<KeyEvent> {
        self.key_rx.recv_timeout(timeout).ok()
    }

    fn close_all(&mut self) {
        let _ = self.frame_tx.send_timeout(WindowMessage::Close, Duration::from_millis(500));
    }
}

/// 窗口主循环: 收到 Close 或流水线侧断开后返回
pub async fn run_window(handle: WindowHandle) {
    prevent_quit();
    let mut texture: Option<Texture2D> = None;

    info!("🪟 窗口已打开");
    'main: loop {
        // 只显示最新一帧
        let mut latest = None;
        loop {
            match handle.frame_rx.try_recv() {
                Ok(WindowMessage::Show(image)) => latest = Some(image),
                Ok(WindowMessage::Close) => break 'main,
                Err(crossbeam_channel::TryRecvError::Empty) => break,
                Err(crossbeam_channel::TryRecvError::Disconnected) => break 'main,
            }
        }

        if let Some(image) = latest {
            let (w, h) = image.dimensions();
            let needs_rebuild = texture
                .as_ref()
                .map_or(true, |t| t.width() != w as f32 || t.height() != h as f32);
            if needs_rebuild {
                let t = Texture2D::from_rgba8(w as u16, h as u16, image.as_raw());
                t.set_filter(FilterMode::Linear);
                texture = Some(t);
            } else if let Some(t) = &texture {
                t.update(&Image {
                    bytes: image.into_raw(),
                    width: w as u16,
                    height: h as u16,
                });
            }
        }

        while let Some(c) = get_char_pressed() {
            let _ = handle.key_tx.send(KeyEvent(c));
        }
        // 关闭窗口等同于按下退出键
        if is_quit_requested() {
            let _ = handle.key_tx.send(KeyEvent('q'));
        }

        clear_background(BLACK);
        if let Some(t) = &texture {
            // 等比缩放居中
            let scale = (screen_width() / t.width()).min(screen_height() / t.height());
            let (dw, dh) = (t.width() * scale, t.height() * scale);
            draw_texture_ex(
                t,
                (screen_width() - dw) / 2.0,
                (screen_height() - dh) / 2.0,
                WHITE,
                DrawTextureParams {
                    dest_size: Some(vec2(dw, dh)),
                    ..Default::default()
                },
            );
        }

        next_frame().await;
    }
    info!("🪟 窗口已关闭");
}

/// 窗口配置
pub fn window_conf(title: &str) -> Conf {
    Conf {
        window_title: title.to_string(),
        window_width: 1280,
        window_height: 720,
        window_resizable: true,
        ..Default::default()
    }
}
