// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

/// 检测数据结构定义
/// Data structures for detection results

/// 检测框 (原图坐标)
#[derive(Clone, Debug, PartialEq)]
pub struct BBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub confidence: f32,
    pub class_id: u32,
}

impl BBox {
    /// 由中心点与宽高构造
    pub fn from_cxcywh(cx: f32, cy: f32, w: f32, h: f32, confidence: f32, class_id: u32) -> Self {
        Self {
            x1: cx - w / 2.0,
            y1: cy - h / 2.0,
            x2: cx + w / 2.0,
            y2: cy + h / 2.0,
            confidence,
            class_id,
        }
    }

    pub fn width(&self) -> f32 {
        (self.x2 - self.x1).max(0.0)
    }

    pub fn height(&self) -> f32 {
        (self.y2 - self.y1).max(0.0)
    }

    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    /// 裁剪到图像范围内
    pub fn clamp_to(&mut self, width: f32, height: f32) {
        self.x1 = self.x1.clamp(0.0, width);
        self.x2 = self.x2.clamp(0.0, width);
        self.y1 = self.y1.clamp(0.0, height);
        self.y2 = self.y2.clamp(0.0, height);
    }

    pub fn intersection_area(&self, other: &BBox) -> f32 {
        let l = self.x1.max(other.x1);
        let r = self.x2.min(other.x2);
        let t = self.y1.max(other.y1);
        let b = self.y2.min(other.y2);
        (r - l).max(0.0) * (b - t).max(0.0)
    }

    pub fn iou(&self, other: &BBox) -> f32 {
        let inter = self.intersection_area(other);
        let union = self.area() + other.area() - inter;
        if union <= 0.0 {
            0.0
        } else {
            inter / union
        }
    }
}

/// 按置信度降序的贪心NMS, 同类别之间才互相抑制
pub fn non_max_suppression(boxes: &mut Vec<BBox>, iou_threshold: f32) {
    boxes.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut kept = 0;
    for index in 0..boxes.len() {
        let suppressed = (0..kept).any(|prev| {
            boxes[prev].class_id == boxes[index].class_id
                && boxes[prev].iou(&boxes[index]) > iou_threshold
        });
        if !suppressed {
            boxes.swap(kept, index);
            kept += 1;
        }
    }
    boxes.truncate(kept);
}
