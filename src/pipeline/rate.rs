// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

/// 倍速控制器
/// Speed multiplier and per-frame display delay
///
/// currentFps = baseFps * speed_steps[index]
/// frameDelayMs = ceil(1000 / currentFps), 至少 1ms
/// 只影响显示节奏, 不改变队列中的帧内容与顺序
use crate::config::validate_speed_steps;
use crate::error::ConfigError;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_FPS: f64 = 30.0;
pub const SPEED_STEPS: [f64; 5] = [1.0, 1.25, 1.5, 1.75, 2.0];

#[derive(Debug)]
pub struct RateController {
    base_fps: f64,
    speed_steps: Vec<f64>,
    index: AtomicUsize,
}

impl RateController {
    pub fn new(base_fps: f64, speed_steps: Vec<f64>) -> Result<Self, ConfigError> {
        validate_speed_steps(&speed_steps)?;
        if !(base_fps.is_finite() && base_fps > 0.0) {
            return Err(ConfigError::Invalid(format!("base_fps 无效: {base_fps}")));
        }
        Ok(Self {
            base_fps,
            speed_steps,
            index: AtomicUsize::new(0),
        })
    }

    /// 视频源帧率为 0/NaN/未知时使用默认帧率
    pub fn resolve_base_fps(native: Option<f64>, default_fps: f64) -> f64 {
        match native {
            Some(fps) if fps.is_finite() && fps > 0.0 => fps,
            _ => default_fps,
        }
    }

    pub fn increase_speed(&self) {
        let last = self.speed_steps.len() - 1;
        let _ = self
            .index
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |i| {
                (i < last).then_some(i + 1)
            });
        debug!("⏩ 倍速: x{:?}", self.multiplier());
    }

    pub fn decrease_speed(&self) {
        let _ = self
            .index
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |i| i.checked_sub(1));
        debug!("⏪ 倍速: x{:?}", self.multiplier());
    }

    pub fn speed_index(&self) -> usize {
        self.index.load(Ordering::Acquire)
    }

    pub fn speed_steps(&self) -> &[f64] {
        &self.speed_steps
    }

    pub fn base_fps(&self) -> f64 {
        self.base_fps
    }

    pub fn multiplier(&self) -> f64 {
        self.speed_steps[self.speed_index()]
    }

    pub fn current_fps(&self) -> f64 {
        self.base_fps * self.multiplier()
    }

    pub fn current_delay_ms(&self) -> u64 {
        ((1000.0 / self.current_fps()).ceil() as u64).max(1)
    }

    pub fn current_delay(&self) -> Duration {
        Duration::from_millis(self.current_delay_ms())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller(base_fps: f64) -> RateController {
        RateController::new(base_fps, SPEED_STEPS.to_vec()).unwrap()
    }

    #[test]
    fn test_default_delay_at_25fps() {
        let rate = controller(25.0);
        assert_eq!(rate.speed_index(), 0);
        assert_eq!(rate.current_delay_ms(), 40);
        assert_eq!(rate.current_delay(), Duration::from_millis(40));
    }

    #[test]
    fn test_increase_saturates_at_ceiling() {
        for k in 0..10 {
            let rate = controller(25.0);
            for _ in 0..k {
                rate.increase_speed();
            }
            assert_eq!(rate.speed_index(), k.min(SPEED_STEPS.len() - 1));
        }
    }

    #[test]
    fn test_decrease_mirrors_increase() {
        let rate = controller(25.0);
        for _ in 0..SPEED_STEPS.len() {
            rate.increase_speed();
        }
        let top = SPEED_STEPS.len() - 1;
        for k in 0..10 {
            if k > 0 {
                rate.decrease_speed();
            }
            assert_eq!(rate.speed_index(), top.saturating_sub(k));
        }
        rate.decrease_speed();
        assert_eq!(rate.speed_index(), 0);
    }

    #[test]
    fn test_delay_non_increasing_with_speed() {
        for base in [1.0, 23.976, 25.0, 30.0, 60.0, 240.0] {
            let rate = controller(base);
            let mut last = rate.current_delay_ms();
            for _ in 0..SPEED_STEPS.len() + 2 {
                rate.increase_speed();
                let delay = rate.current_delay_ms();
                assert!(delay <= last, "base={base}: {delay} > {last}");
                assert!(delay >= 1);
                last = delay;
            }
        }
    }

    #[test]
    fn test_delay_values_at_25fps() {
        let rate = controller(25.0);
        let mut delays = vec![rate.current_delay_ms()];
        for _ in 1..SPEED_STEPS.len() {
            rate.increase_speed();
            delays.push(rate.current_delay_ms());
        }
        // 1000/25=40, 1000/31.25=32, 1000/37.5=26.67, 1000/43.75=22.86, 1000/50=20
        assert_eq!(delays, vec![40, 32, 27, 23, 20]);
        assert_eq!(rate.multiplier(), 2.0);
        assert_eq!(rate.current_fps(), 50.0);
    }

    #[test]
    fn test_delay_at_least_one_ms() {
        let rate = controller(100_000.0);
        assert_eq!(rate.current_delay_ms(), 1);
    }

    #[test]
    fn test_resolve_base_fps() {
        assert_eq!(RateController::resolve_base_fps(Some(25.0), DEFAULT_FPS), 25.0);
        assert_eq!(RateController::resolve_base_fps(Some(0.0), DEFAULT_FPS), 30.0);
        assert_eq!(RateController::resolve_base_fps(Some(f64::NAN), DEFAULT_FPS), 30.0);
        assert_eq!(RateController::resolve_base_fps(None, DEFAULT_FPS), 30.0);
    }

    #[test]
    fn test_rejects_invalid_tables() {
        assert!(RateController::new(25.0, vec![]).is_err());
        assert!(RateController::new(25.0, vec![2.0, 1.0]).is_err());
        assert!(RateController::new(0.0, SPEED_STEPS.to_vec()).is_err());
    }
}
