// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! YOLOv8 视频推理播放
//!
//! 读帧 → 推理标注 → 显示 三级流水线, 支持暂停/继续/倍速/退出

pub mod config; // 流水线参数 (JSON)
pub mod detection; // 推理与标注
pub mod error; // 错误类型
pub mod input; // 视频输入
pub mod pipeline; // 三线程流水线
pub mod renderer; // 显示端

pub use crate::config::{AnnotationFailurePolicy, PipelineConfig};
pub use crate::detection::Annotator;
pub use crate::error::{AnnotateError, ConfigError, PipelineError, SourceError};
pub use crate::input::FrameSource;
pub use crate::pipeline::{Frame, Pipeline, PlaybackControl, PlaybackState, RateController, RunSummary};
pub use crate::renderer::{DisplaySink, HeadlessSink, KeyEvent, StatusOverlay};
