// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

/// 播放状态控制 (所有线程共享)
/// Shared run/pause/stop state machine
///
/// 状态机: Running ⇄ Paused, Running/Paused → Stopped (终态, 不可离开)
/// 单个 AtomicU8 + CAS 保存, 任一线程的 stop() 对其他线程立即可见
use std::sync::atomic::{AtomicU8, Ordering};

const RUNNING: u8 = 0;
const PAUSED: u8 = 1;
const STOPPED: u8 = 2;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlaybackState {
    Running,
    Paused,
    Stopped,
}

impl PlaybackState {
    fn from_raw(raw: u8) -> Self {
        match raw {
            RUNNING => PlaybackState::Running,
            PAUSED => PlaybackState::Paused,
            _ => PlaybackState::Stopped,
        }
    }
}

#[derive(Debug)]
pub struct PlaybackControl {
    state: AtomicU8,
}

impl Default for PlaybackControl {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaybackControl {
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(RUNNING),
        }
    }

    pub fn state(&self) -> PlaybackState {
        PlaybackState::from_raw(self.state.load(Ordering::Acquire))
    }

    /// running 标志: 暂停时仍为 true
    pub fn is_running(&self) -> bool {
        self.state() != PlaybackState::Stopped
    }

    pub fn is_paused(&self) -> bool {
        self.state() == PlaybackState::Paused
    }

    /// 停止流水线 (幂等), 返回本次调用是否完成了状态转换
    pub fn stop(&self) -> bool {
        self.state.swap(STOPPED, Ordering::AcqRel) != STOPPED
    }

    /// 暂停/继续切换, 返回切换后的状态; 已停止时不做任何改变
    pub fn toggle_pause(&self) -> PlaybackState {
        let mut current = self.state.load(Ordering::Acquire);
        loop {
            let next = match current {
                RUNNING => PAUSED,
                PAUSED => RUNNING,
                _ => return PlaybackState::Stopped,
            };
            match self
                .state
                .compare_exchange_weak(current, next, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => return PlaybackState::from_raw(next),
                Err(actual) => current = actual,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_initial_state_running() {
        let control = PlaybackControl::new();
        assert_eq!(control.state(), PlaybackState::Running);
        assert!(control.is_running());
        assert!(!control.is_paused());
    }

    #[test]
    fn test_double_toggle_restores_state() {
        let control = PlaybackControl::new();
        assert_eq!(control.toggle_pause(), PlaybackState::Paused);
        assert!(control.is_running(), "暂停时 running 仍为 true");
        assert_eq!(control.toggle_pause(), PlaybackState::Running);
        assert_eq!(control.state(), PlaybackState::Running);
    }

    #[test]
    fn test_stopped_is_terminal() {
        let control = PlaybackControl::new();
        control.toggle_pause();
        assert!(control.stop());
        assert!(!control.stop(), "重复 stop 不应再次转换");
        assert_eq!(control.toggle_pause(), PlaybackState::Stopped);
        assert_eq!(control.state(), PlaybackState::Stopped);
        assert!(!control.is_running());
    }

    #[test]
    fn test_stop_visible_across_threads() {
        let control = Arc::new(PlaybackControl::new());
        let watchers: Vec<_> = (0..3)
            .map(|_| {
                let c = control.clone();
                thread::spawn(move || {
                    while c.is_running() {
                        thread::yield_now();
                    }
                })
            })
            .collect();
        control.stop();
        for w in watchers {
            w.join().unwrap();
        }
    }

    #[test]
    fn test_concurrent_toggle_and_stop() {
        let control = Arc::new(PlaybackControl::new());
        let togglers: Vec<_> = (0..4)
            .map(|_| {
                let c = control.clone();
                thread::spawn(move || {
                    for _ in 0..1000 {
                        c.toggle_pause();
                    }
                })
            })
            .collect();
        control.stop();
        for t in togglers {
            t.join().unwrap();
        }
        assert_eq!(control.state(), PlaybackState::Stopped);
    }
}
