// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! 流水线配置 - 通过JSON文件调整参数

use crate::error::ConfigError;
use crate::pipeline::rate::{DEFAULT_FPS, SPEED_STEPS};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// 单帧推理失败时的处理策略
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnnotationFailurePolicy {
    /// 记录日志, 原始帧不做标注直接下发 (帧数与顺序保持不变)
    #[default]
    PassThrough,
    /// 记录日志, 丢弃该帧
    Skip,
}

/// 流水线参数配置
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    // === 队列参数 ===
    pub queue_capacity: usize,          // 两个队列的固定容量
    pub push_retry_ms: u64,             // 队列满时单次等待时长 (读帧/推理线程)
    pub processor_pop_timeout_ms: u64,  // 推理线程取帧超时
    pub display_pop_timeout_ms: u64,    // 显示线程取帧超时 (需小于推理线程,保证按键响应)

    // === 播放控制 ===
    pub idle_key_poll_ms: u64,   // 无帧可显示时的按键轮询时长
    pub pause_poll_ms: u64,      // 暂停状态下的按键轮询时长
    pub default_fps: f64,        // 视频源未报告帧率时使用
    pub speed_steps: Vec<f64>,   // 倍速档位 (严格递增)
    pub window_name: String,

    // === 推理参数 (运行期不可调) ===
    pub confidence_threshold: f32,
    pub iou_threshold: f32,
    pub target_height: u32,
    pub target_width: u32,
    pub annotation_failure: AnnotationFailurePolicy,

    // === 叠加文字 ===
    pub font_path: Option<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 30,
            push_retry_ms: 100,
            processor_pop_timeout_ms: 100,
            display_pop_timeout_ms: 10,

            idle_key_poll_ms: 10,
            pause_poll_ms: 100,
            default_fps: DEFAULT_FPS,
            speed_steps: SPEED_STEPS.to_vec(),
            window_name: "YOLO Inference".to_string(),

            confidence_threshold: 0.5,
            iou_threshold: 0.45,
            target_height: 384,
            target_width: 800,
            annotation_failure: AnnotationFailurePolicy::PassThrough,

            font_path: None,
        }
    }
}

impl PipelineConfig {
    /// 从JSON文件加载配置 (文件不存在或解析失败均返回错误)
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&json)?;
        config.validate()?;
        info!("✅ 配置已从 {} 加载", path.display());
        Ok(config)
    }

    /// 加载配置, 文件缺失时使用默认值; 文件存在但无效时仍然报错
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            warn!("📝 配置文件 {} 不存在, 使用默认配置", path.display());
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// 保存配置到JSON文件
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        info!("💾 配置已保存到 {}", path.display());
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.queue_capacity == 0 {
            return Err(ConfigError::Invalid("queue_capacity 必须大于0".into()));
        }
        let intervals = [
            ("push_retry_ms", self.push_retry_ms),
            ("processor_pop_timeout_ms", self.processor_pop_timeout_ms),
            ("display_pop_timeout_ms", self.display_pop_timeout_ms),
            ("idle_key_poll_ms", self.idle_key_poll_ms),
            ("pause_poll_ms", self.pause_poll_ms),
        ];
        for (name, ms) in intervals {
            if ms == 0 {
                return Err(ConfigError::Invalid(format!("{name} 必须大于0")));
            }
        }
        if !(self.default_fps.is_finite() && self.default_fps > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "default_fps 无效: {}",
                self.default_fps
            )));
        }
        validate_speed_steps(&self.speed_steps)?;
        for (name, v) in [
            ("confidence_threshold", self.confidence_threshold),
            ("iou_threshold", self.iou_threshold),
        ] {
            if !(0.0..=1.0).contains(&v) {
                return Err(ConfigError::Invalid(format!("{name} 超出 [0, 1]: {v}")));
            }
        }
        if self.target_height == 0 || self.target_width == 0 {
            return Err(ConfigError::Invalid("推理尺寸必须大于0".into()));
        }
        Ok(())
    }

    pub fn push_retry(&self) -> Duration {
        Duration::from_millis(self.push_retry_ms)
    }

    pub fn processor_pop_timeout(&self) -> Duration {
        Duration::from_millis(self.processor_pop_timeout_ms)
    }

    pub fn display_pop_timeout(&self) -> Duration {
        Duration::from_millis(self.display_pop_timeout_ms)
    }

    pub fn idle_key_poll(&self) -> Duration {
        Duration::from_millis(self.idle_key_poll_ms)
    }

    pub fn pause_poll(&self) -> Duration {
        Duration::from_millis(self.pause_poll_ms)
    }

    /// 打印当前配置
    pub fn log_summary(&self) {
        info!("🎛️  当前流水线配置:");
        info!("  队列容量: {}", self.queue_capacity);
        info!(
            "  超时(ms): 入队重试 {} | 推理取帧 {} | 显示取帧 {}",
            self.push_retry_ms, self.processor_pop_timeout_ms, self.display_pop_timeout_ms
        );
        info!("  倍速档位: {:?}", self.speed_steps);
        info!(
            "  推理: conf={:.2} iou={:.2} 尺寸={}x{} 失败策略={:?}",
            self.confidence_threshold,
            self.iou_threshold,
            self.target_height,
            self.target_width,
            self.annotation_failure
        );
    }
}

/// 倍速档位: 非空, 全部为正, 严格递增
pub fn validate_speed_steps(steps: &[f64]) -> Result<(), ConfigError> {
    if steps.is_empty() {
        return Err(ConfigError::Invalid("speed_steps 不能为空".into()));
    }
    if let Some(bad) = steps.iter().find(|s| !(s.is_finite() && **s > 0.0)) {
        return Err(ConfigError::Invalid(format!("倍速必须为正数: {bad}")));
    }
    if steps.windows(2).any(|w| w[1] <= w[0]) {
        return Err(ConfigError::Invalid(format!(
            "speed_steps 必须严格递增: {steps:?}"
        )));
    }
    Ok(())
}
