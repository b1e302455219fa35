// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

/// 检测框绘制: 边框 + 类别名/置信度标签
use super::postprocess::class_name;
use super::types::BBox;
use ab_glyph::{FontArc, PxScale};
use image::{Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;

const LINE_WIDTH: i32 = 2;
const LABEL_SCALE: f32 = 18.0;
const LABEL_PADDING: i32 = 3;

/// 调色板 (按类别循环取色)
const BRIGHT_COLORS: [(u8, u8, u8); 12] = [
    (255, 0, 0),     // 红色
    (0, 255, 0),     // 绿色
    (0, 0, 255),     // 蓝色
    (255, 255, 0),   // 黄色
    (255, 0, 255),   // 品红
    (0, 255, 255),   // 青色
    (255, 128, 0),   // 橙色
    (255, 0, 128),   // 粉红
    (128, 255, 0),   // 黄绿
    (0, 128, 255),   // 天蓝
    (255, 255, 255), // 白色
    (128, 0, 255),   // 紫色
];

pub fn class_color(class_id: u32) -> Rgba<u8> {
    let (r, g, b) = BRIGHT_COLORS[class_id as usize % BRIGHT_COLORS.len()];
    Rgba([r, g, b, 255])
}

pub struct BoxPlotter {
    font: Option<FontArc>,
    names: Vec<String>,
}

impl BoxPlotter {
    pub fn new(font: Option<FontArc>, names: Vec<String>) -> Self {
        Self { font, names }
    }

    pub fn label(&self, bbox: &BBox) -> String {
        format!("{} {:.2}", class_name(&self.names, bbox.class_id), bbox.confidence)
    }

    /// 在图像上绘制全部检测框
    pub fn draw(&self, image: &mut RgbaImage, boxes: &[BBox]) {
        for bbox in boxes {
            let color = class_color(bbox.class_id);
            let (x, y) = (bbox.x1.round() as i32, bbox.y1.round() as i32);
            let (w, h) = (bbox.width().round() as u32, bbox.height().round() as u32);
            if w == 0 || h == 0 {
                continue;
            }

            // 多画几圈模拟线宽
            for t in 0..LINE_WIDTH {
                let (w, h) = (w.saturating_sub(2 * t as u32), h.saturating_sub(2 * t as u32));
                if w == 0 || h == 0 {
                    break;
                }
                draw_hollow_rect_mut(image, Rect::at(x + t, y + t).of_size(w, h), color);
            }

            let Some(font) = &self.font else {
                continue;
            };
            let label = self.label(bbox);
            let scale = PxScale::from(LABEL_SCALE);
            let (tw, th) = text_size(scale, font, &label);
            let bg_h = th as i32 + 2 * LABEL_PADDING;
            // 框顶部放不下时把标签放进框内
            let bg_y = if y - bg_h >= 0 { y - bg_h } else { y };
            draw_filled_rect_mut(
                image,
                Rect::at(x, bg_y).of_size(tw + 2 * LABEL_PADDING as u32, bg_h as u32),
                color,
            );
            draw_text_mut(
                image,
                Rgba([0, 0, 0, 255]),
                x + LABEL_PADDING,
                bg_y + LABEL_PADDING,
                scale,
                font,
                &label,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_draw_box_outline() {
        let plotter = BoxPlotter::new(None, vec!["person".into()]);
        let mut image = RgbaImage::from_pixel(40, 40, Rgba([0, 0, 0, 255]));
        let bbox = BBox {
            x1: 10.0,
            y1: 10.0,
            x2: 30.0,
            y2: 30.0,
            confidence: 0.9,
            class_id: 1,
        };
        plotter.draw(&mut image, &[bbox]);

        let green = class_color(1);
        assert_eq!(*image.get_pixel(10, 10), green);
        assert_eq!(*image.get_pixel(20, 10), green);
        assert_eq!(*image.get_pixel(11, 20), green);
        // 框内部不受影响
        assert_eq!(*image.get_pixel(20, 20), Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn test_label_format() {
        let plotter = BoxPlotter::new(None, vec!["person".into(), "bicycle".into()]);
        let bbox = BBox {
            x1: 0.0,
            y1: 0.0,
            x2: 1.0,
            y2: 1.0,
            confidence: 0.876,
            class_id: 1,
        };
        assert_eq!(plotter.label(&bbox), "bicycle 0.88");
    }

    #[test]
    fn test_palette_cycles() {
        assert_eq!(class_color(0), class_color(12));
        assert_ne!(class_color(0), class_color(1));
    }
}
