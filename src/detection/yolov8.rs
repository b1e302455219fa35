// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//
// YOLOv8 ONNX 标注器
// 包含: 模型加载、预处理、推理、后处理、绘制

use super::plot::BoxPlotter;
use super::postprocess::{decode, parse_names, preprocess, DecodeParams};
use super::Annotator;
use crate::config::PipelineConfig;
use crate::error::AnnotateError;
use crate::pipeline::Frame;
use ab_glyph::FontArc;
use ndarray::{ArrayView, IxDyn};
use ort::{CUDAExecutionProvider, GraphOptimizationLevel, Session, Tensor, ValueType};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

pub struct YoloV8Annotator {
    session: Session,
    input_name: String,
    output_name: String,
    height: u32,
    width: u32,
    conf: f32,
    iou: f32,
    plotter: BoxPlotter,
    path: PathBuf,
}

impl YoloV8Annotator {
    /// 加载模型, 失败时返回 ModelNotFound / Load
    pub fn load(
        path: impl AsRef<Path>,
        config: &PipelineConfig,
        font: Option<FontArc>,
    ) -> Result<Self, AnnotateError> {
        let path = path.as_ref().to_path_buf();
        if !path.is_file() {
            return Err(AnnotateError::ModelNotFound(path));
        }
        let load_err = |e: ort::Error| AnnotateError::Load {
            path: path.clone(),
            reason: e.to_string(),
        };

        let t = Instant::now();
        let session = Session::builder()
            .and_then(|b| b.with_optimization_level(GraphOptimizationLevel::Level3))
            .and_then(|b| b.with_execution_providers([CUDAExecutionProvider::default().build()]))
            .and_then(|b| b.commit_from_file(&path))
            .map_err(load_err)?;

        let (Some(input), Some(output)) = (session.inputs.first(), session.outputs.first()) else {
            return Err(AnnotateError::Load {
                path,
                reason: "模型缺少输入或输出".to_string(),
            });
        };
        let input_name = input.name.clone();
        let output_name = output.name.clone();

        // 固定尺寸的模型以模型为准, 动态尺寸使用配置
        let (height, width) = match &input.input_type {
            ValueType::Tensor { dimensions, .. }
                if dimensions.len() == 4 && dimensions[2] > 0 && dimensions[3] > 0 =>
            {
                let fixed = (dimensions[2] as u32, dimensions[3] as u32);
                if fixed != (config.target_height, config.target_width) {
                    warn!(
                        "⚠️  模型输入尺寸固定为 {}x{}, 忽略配置 {}x{}",
                        fixed.0, fixed.1, config.target_height, config.target_width
                    );
                }
                fixed
            }
            _ => (config.target_height, config.target_width),
        };

        let names = session
            .metadata()
            .and_then(|m| m.custom("names"))
            .ok()
            .flatten()
            .map(|s| parse_names(&s))
            .unwrap_or_default();
        if names.is_empty() {
            warn!("⚠️  模型元数据中没有类别名, 使用类别序号");
        }

        info!(
            "✅ 模型加载完成: {} ({}类, 输入{}x{}, 耗时{:.1}s)",
            path.display(),
            names.len(),
            height,
            width,
            t.elapsed().as_secs_f64()
        );

        Ok(Self {
            session,
            input_name,
            output_name,
            height,
            width,
            conf: config.confidence_threshold,
            iou: config.iou_threshold,
            plotter: BoxPlotter::new(font, names),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Annotator for YoloV8Annotator {
    fn annotate(&mut self, frame: &Frame) -> Result<Frame, AnnotateError> {
        let infer_err = |e: ort::Error| AnnotateError::Inference(e.to_string());

        let t_pre = Instant::now();
        let (xs, ratio) = preprocess(&frame.image, self.height, self.width);
        let shape = [1usize, 3, self.height as usize, self.width as usize];
        let (data, _) = xs.into_raw_vec_and_offset();
        let input = Tensor::from_array((shape, data)).map_err(infer_err)?;
        let pre = t_pre.elapsed();

        let t_run = Instant::now();
        let outputs = self
            .session
            .run(ort::inputs![self.input_name.as_str() => input].map_err(infer_err)?)
            .map_err(infer_err)?;
        let (dims, values) = outputs[self.output_name.as_str()]
            .try_extract_raw_tensor::<f32>()
            .map_err(infer_err)?;
        let run = t_run.elapsed();

        let t_post = Instant::now();
        let dims: Vec<usize> = dims.iter().map(|d| (*d).max(0) as usize).collect();
        let view = ArrayView::from_shape(IxDyn(&dims), values)
            .map_err(|e| AnnotateError::InvalidOutput(e.to_string()))?;
        let boxes = decode(
            view,
            &DecodeParams {
                confidence_threshold: self.conf,
                iou_threshold: self.iou,
                ratio,
                width_original: frame.width() as f32,
                height_original: frame.height() as f32,
            },
        )?;

        let mut image = frame.image.clone();
        self.plotter.draw(&mut image, &boxes);
        debug!(
            "[帧{}] 检测{}个 | 预处理{:?} 推理{:?} 后处理{:?}",
            frame.index,
            boxes.len(),
            pre,
            run,
            t_post.elapsed()
        );
        Ok(frame.with_image(image))
    }
}
