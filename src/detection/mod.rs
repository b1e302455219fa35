// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

/// 检测与标注 (Detection & Annotation)
///
/// - Annotator: 逐帧推理并返回标注后的新帧, 由推理线程独占
/// - types: 检测框与NMS
/// - postprocess: YOLOv8 预处理/输出解码/类别名解析
/// - plot: 检测框绘制
/// - YoloV8Annotator: ONNX Runtime 推理 (feature = "onnx")
pub mod plot;
pub mod postprocess;
pub mod types;
#[cfg(feature = "onnx")]
pub mod yolov8;

use crate::error::AnnotateError;
use crate::pipeline::Frame;

pub use plot::BoxPlotter;
pub use types::{non_max_suppression, BBox};
#[cfg(feature = "onnx")]
pub use yolov8::YoloV8Annotator;

/// 标注器
pub trait Annotator {
    /// 推理单帧, 返回同序号、同尺寸的标注帧
    fn annotate(&mut self, frame: &Frame) -> Result<Frame, AnnotateError>;
}

impl<A: Annotator + ?Sized> Annotator for Box<A> {
    fn annotate(&mut self, frame: &Frame) -> Result<Frame, AnnotateError> {
        (**self).annotate(frame)
    }
}
