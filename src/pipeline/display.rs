// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

/// 显示线程 (在调用者线程运行)
/// 职责: 队列B取帧 → 叠加状态文字 → 显示 → 按倍速等待按键
use super::control::{PlaybackControl, PlaybackState};
use super::queue::{Popped, QueueConsumer};
use super::rate::RateController;
use super::Frame;
use crate::renderer::{DisplaySink, KeyEvent, StatusOverlay};
use phf::phf_map;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// 播放控制命令
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    Quit,
    TogglePause,
    SpeedUp,
    SpeedDown,
}

/// 按键绑定
static KEY_BINDINGS: phf::Map<char, Command> = phf_map! {
    'q' => Command::Quit,
    ' ' => Command::TogglePause,
    '+' => Command::SpeedUp,
    '-' => Command::SpeedDown,
};

impl Command {
    /// 未绑定的按键返回 None
    pub fn from_key(key: KeyEvent) -> Option<Self> {
        KEY_BINDINGS.get(&key.0).copied()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DisplayEnd {
    /// 收到结束标记, 视频播放完毕
    EndOfStream,
    /// 用户按下退出键
    UserQuit,
    /// 流水线被外部停止
    Cancelled,
    /// 推理线程未发送结束标记就已退出
    Disconnected,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DisplayReport {
    pub frames_shown: u64,
    pub end: DisplayEnd,
}

pub struct DisplaySettings {
    pub window_name: String,
    pub pop_timeout: Duration,
    pub idle_key_poll: Duration,
    pub pause_poll: Duration,
}

/// 执行一条命令, 返回是否为退出
fn apply(command: Command, control: &PlaybackControl, rate: &RateController) -> bool {
    match command {
        Command::Quit => {
            info!("⏹️  用户退出");
            control.stop();
            return true;
        }
        Command::TogglePause => match control.toggle_pause() {
            PlaybackState::Paused => info!("⏸️  已暂停"),
            PlaybackState::Running => info!("▶️  继续播放"),
            PlaybackState::Stopped => {}
        },
        Command::SpeedUp => rate.increase_speed(),
        Command::SpeedDown => rate.decrease_speed(),
    }
    false
}

/// 显示循环
///
/// 暂停时不从队列B取帧, 只轮询按键 (仅响应退出与继续);
/// 循环结束后流水线一定处于 Stopped 状态
pub fn run<D>(
    sink: &mut D,
    rx: QueueConsumer<Frame>,
    control: &PlaybackControl,
    rate: &RateController,
    overlay: &StatusOverlay,
    settings: &DisplaySettings,
) -> DisplayReport
where
    D: DisplaySink + ?Sized,
{
    info!(
        "🖥️  显示线程启动: 基础帧率 {:.2}fps, 帧间隔 {}ms",
        rate.base_fps(),
        rate.current_delay_ms()
    );

    let mut report = DisplayReport {
        frames_shown: 0,
        end: DisplayEnd::Cancelled,
    };

    let mut count = 0u64;
    let mut last = Instant::now();

    loop {
        match control.state() {
            PlaybackState::Stopped => break,
            PlaybackState::Paused => {
                let command = sink.poll_key(settings.pause_poll).and_then(Command::from_key);
                match command {
                    Some(c @ (Command::Quit | Command::TogglePause)) => {
                        if apply(c, control, rate) {
                            report.end = DisplayEnd::UserQuit;
                            break;
                        }
                    }
                    // 暂停期间忽略倍速调整
                    _ => {}
                }
                continue;
            }
            PlaybackState::Running => {}
        }

        let timeout = match rx.pop(settings.pop_timeout) {
            Popped::Item(mut frame) => {
                overlay.render(&mut frame.image, rate.current_fps(), rate.multiplier());
                sink.show(&settings.window_name, &frame);
                report.frames_shown += 1;
                count += 1;
                rate.current_delay()
            }
            Popped::Empty => settings.idle_key_poll,
            Popped::EndOfStream => {
                info!("🏁 视频播放完毕");
                report.end = DisplayEnd::EndOfStream;
                break;
            }
            Popped::Disconnected => {
                report.end = DisplayEnd::Disconnected;
                break;
            }
        };

        if let Some(command) = sink.poll_key(timeout).and_then(Command::from_key) {
            if apply(command, control, rate) {
                report.end = DisplayEnd::UserQuit;
                break;
            }
        }

        if last.elapsed().as_secs_f64() >= 1.0 {
            debug!(
                "🖥️  显示统计: {:.1}fps (目标 {:.1}fps) | 队列B {}/{}",
                count as f64 / last.elapsed().as_secs_f64(),
                rate.current_fps(),
                rx.len(),
                rx.capacity()
            );
            last = Instant::now();
            count = 0;
        }
    }

    control.stop();
    info!(
        "✅ 显示线程退出: 显示{}帧 ({:?})",
        report.frames_shown, report.end
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::queue::{BoundedQueue, PushOutcome};
    use crate::pipeline::rate::SPEED_STEPS;
    use crate::pipeline::testing::{frame, ScriptedSink};

    const PAUSE: Duration = Duration::from_millis(100);
    const IDLE: Duration = Duration::from_millis(10);

    fn settings() -> DisplaySettings {
        DisplaySettings {
            window_name: "test".into(),
            pop_timeout: Duration::from_millis(10),
            idle_key_poll: IDLE,
            pause_poll: PAUSE,
        }
    }

    /// 预先填好 n 帧与结束标记的队列B
    fn ready_queue(n: u64) -> QueueConsumer<Frame> {
        let control = PlaybackControl::new();
        let (tx, rx) = BoundedQueue::new(30).split();
        for i in 0..n {
            assert_eq!(
                tx.push_with_retry(frame(i), &control, Duration::from_millis(10)),
                PushOutcome::Delivered
            );
        }
        tx.finish(&control, Duration::from_millis(10));
        rx
    }

    fn rate() -> RateController {
        RateController::new(25.0, SPEED_STEPS.to_vec()).unwrap()
    }

    fn key(c: char) -> Option<KeyEvent> {
        Some(KeyEvent(c))
    }

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn test_key_bindings() {
        assert_eq!(Command::from_key(KeyEvent('q')), Some(Command::Quit));
        assert_eq!(Command::from_key(KeyEvent(' ')), Some(Command::TogglePause));
        assert_eq!(Command::from_key(KeyEvent('+')), Some(Command::SpeedUp));
        assert_eq!(Command::from_key(KeyEvent('-')), Some(Command::SpeedDown));
        assert_eq!(Command::from_key(KeyEvent('x')), None);
        assert_eq!(Command::from_key(KeyEvent('Q')), None);
    }

    #[test]
    fn test_shows_all_frames_at_base_rate() {
        let control = PlaybackControl::new();
        let rate = rate();
        let mut sink = ScriptedSink::new(vec![]);
        let log = sink.log.clone();

        let report = run(
            &mut sink,
            ready_queue(5),
            &control,
            &rate,
            &StatusOverlay::without_font(),
            &settings(),
        );
        assert_eq!(report.end, DisplayEnd::EndOfStream);
        assert_eq!(report.frames_shown, 5);
        assert_eq!(control.state(), PlaybackState::Stopped);

        let log = log.lock().unwrap();
        assert_eq!(log.shown, vec![0, 1, 2, 3, 4]);
        assert_eq!(log.polls, vec![ms(40); 5]);
    }

    #[test]
    fn test_speed_keys_change_delay() {
        let control = PlaybackControl::new();
        let rate = rate();
        let mut sink = ScriptedSink::new(vec![key('+'), key('+'), key('-'), None]);
        let log = sink.log.clone();

        run(
            &mut sink,
            ready_queue(4),
            &control,
            &rate,
            &StatusOverlay::without_font(),
            &settings(),
        );
        assert_eq!(rate.speed_index(), 1);
        assert_eq!(log.lock().unwrap().polls, vec![ms(40), ms(32), ms(27), ms(32)]);
    }

    #[test]
    fn test_quit_key_stops_pipeline() {
        let control = PlaybackControl::new();
        let rate = rate();
        let mut sink = ScriptedSink::new(vec![None, key('q')]);
        let log = sink.log.clone();

        let report = run(
            &mut sink,
            ready_queue(10),
            &control,
            &rate,
            &StatusOverlay::without_font(),
            &settings(),
        );
        assert_eq!(report.end, DisplayEnd::UserQuit);
        assert_eq!(report.frames_shown, 2);
        assert_eq!(control.state(), PlaybackState::Stopped);
        assert_eq!(log.lock().unwrap().shown, vec![0, 1]);
    }

    #[test]
    fn test_pause_holds_queue_until_resumed() {
        let control = PlaybackControl::new();
        let rate = rate();
        // 第0帧后暂停; 暂停期间两次空轮询 + 一次倍速键 (忽略), 然后继续
        let mut sink = ScriptedSink::new(vec![key(' '), None, key('+'), None, key(' ')]);
        let log = sink.log.clone();

        let report = run(
            &mut sink,
            ready_queue(3),
            &control,
            &rate,
            &StatusOverlay::without_font(),
            &settings(),
        );
        assert_eq!(report.end, DisplayEnd::EndOfStream);
        assert_eq!(rate.speed_index(), 0);

        let log = log.lock().unwrap();
        assert_eq!(log.shown, vec![0, 1, 2]);
        assert_eq!(
            log.polls,
            vec![ms(40), PAUSE, PAUSE, PAUSE, PAUSE, ms(40), ms(40)]
        );
    }

    #[test]
    fn test_quit_while_paused() {
        let control = PlaybackControl::new();
        let rate = rate();
        let mut sink = ScriptedSink::new(vec![key(' '), None, key('q')]);

        let report = run(
            &mut sink,
            ready_queue(5),
            &control,
            &rate,
            &StatusOverlay::without_font(),
            &settings(),
        );
        assert_eq!(report.end, DisplayEnd::UserQuit);
        assert_eq!(report.frames_shown, 1);
        assert_eq!(control.state(), PlaybackState::Stopped);
    }

    #[test]
    fn test_idle_polls_and_unknown_keys() {
        let control = PlaybackControl::new();
        let rate = rate();
        // 队列B为空, 空闲轮询期间按键同样生效
        let (tx, rx) = BoundedQueue::<Frame>::new(4).split();
        let mut sink = ScriptedSink::new(vec![key('x'), key('+'), key('q')]);
        let log = sink.log.clone();

        let report = run(
            &mut sink,
            rx,
            &control,
            &rate,
            &StatusOverlay::without_font(),
            &settings(),
        );
        drop(tx);
        assert_eq!(report.end, DisplayEnd::UserQuit);
        assert_eq!(report.frames_shown, 0);
        assert_eq!(rate.speed_index(), 1);
        assert_eq!(log.lock().unwrap().polls, vec![IDLE; 3]);
    }

    #[test]
    fn test_external_stop_ends_loop() {
        let control = PlaybackControl::new();
        control.stop();
        let rate = rate();
        let mut sink = ScriptedSink::new(vec![]);

        let report = run(
            &mut sink,
            ready_queue(3),
            &control,
            &rate,
            &StatusOverlay::without_font(),
            &settings(),
        );
        assert_eq!(report.end, DisplayEnd::Cancelled);
        assert_eq!(report.frames_shown, 0);
    }
}
