// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! YOLOv8 预处理与后处理
//!
//! 预处理: 等比缩放到推理尺寸, 贴在左上角, 其余区域填充灰色 (144)
//! 后处理: 输出张量 [1, 4 + nc, N] → 置信度过滤 → 还原到原图坐标 → NMS

use super::types::{non_max_suppression, BBox};
use crate::error::AnnotateError;
use image::imageops::{self, FilterType};
use image::RgbaImage;
use ndarray::{s, Array, ArrayView, Axis, IxDyn};
use regex::Regex;

const CXYWH_OFFSET: usize = 4;
const PAD_VALUE: f32 = 144.0 / 255.0;

/// 等比缩放比例与缩放后的尺寸
pub fn scale_wh(w0: f32, h0: f32, w1: f32, h1: f32) -> (f32, f32, f32) {
    let r = (w1 / w0).min(h1 / h0);
    (r, (w0 * r).round(), (h0 * r).round())
}

/// 预处理: RGBA → [1, 3, height, width] 归一化张量, 同时返回缩放比例
pub fn preprocess(image: &RgbaImage, height: u32, width: u32) -> (Array<f32, IxDyn>, f32) {
    let (w0, h0) = image.dimensions();
    let (ratio, w_new, h_new) = scale_wh(w0 as f32, h0 as f32, width as f32, height as f32);
    let w_new = (w_new as u32).clamp(1, width);
    let h_new = (h_new as u32).clamp(1, height);
    let resized = imageops::resize(image, w_new, h_new, FilterType::Triangle);

    let mut ys = Array::from_elem((1, 3, height as usize, width as usize), PAD_VALUE).into_dyn();
    for (x, y, rgba) in resized.enumerate_pixels() {
        let (x, y) = (x as usize, y as usize);
        let [r, g, b, _] = rgba.0;
        ys[[0, 0, y, x]] = r as f32 / 255.0;
        ys[[0, 1, y, x]] = g as f32 / 255.0;
        ys[[0, 2, y, x]] = b as f32 / 255.0;
    }
    (ys, ratio)
}

/// 检测后处理参数
pub struct DecodeParams {
    pub confidence_threshold: f32,
    pub iou_threshold: f32,
    pub ratio: f32,
    pub width_original: f32,
    pub height_original: f32,
}

/// 解码检测头输出 (batch = 1)
pub fn decode(output: ArrayView<f32, IxDyn>, params: &DecodeParams) -> Result<Vec<BBox>, AnnotateError> {
    let shape = output.shape();
    if shape.len() != 3 || shape[0] != 1 || shape[1] <= CXYWH_OFFSET {
        return Err(AnnotateError::InvalidOutput(format!(
            "期望 [1, 4+nc, N], 实际 {:?}",
            shape
        )));
    }
    let nc = shape[1] - CXYWH_OFFSET;

    let mut boxes = Vec::new();
    let anchors = output.index_axis(Axis(0), 0);
    for pred in anchors.axis_iter(Axis(1)) {
        let clss = pred.slice(s![CXYWH_OFFSET..CXYWH_OFFSET + nc]);
        let Some((id, &confidence)) = clss
            .iter()
            .enumerate()
            .reduce(|max, x| if x.1 > max.1 { x } else { max })
        else {
            continue;
        };
        if confidence < params.confidence_threshold {
            continue;
        }

        let r = params.ratio;
        let mut bbox = BBox::from_cxcywh(
            pred[0] / r,
            pred[1] / r,
            pred[2] / r,
            pred[3] / r,
            confidence,
            id as u32,
        );
        bbox.clamp_to(params.width_original, params.height_original);
        boxes.push(bbox);
    }

    non_max_suppression(&mut boxes, params.iou_threshold);
    Ok(boxes)
}

/// 解析模型元数据中的类别名, 格式如 {0: 'person', 1: 'bicycle'}
pub fn parse_names(metadata: &str) -> Vec<String> {
    let Ok(re) = Regex::new(r#"(['"])([-()\w '"]+?)(['"])"#) else {
        return Vec::new();
    };
    re.captures_iter(metadata)
        .filter_map(|c| c.get(2).map(|m| m.as_str().to_string()))
        .collect()
}

/// 取类别名, 越界时退回为序号
pub fn class_name(names: &[String], class_id: u32) -> String {
    names
        .get(class_id as usize)
        .cloned()
        .unwrap_or_else(|| format!("class{}", class_id))
}
