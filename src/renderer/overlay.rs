// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

/// 状态文字叠加
/// Status overlay: FPS / 倍速 / 操作提示
use ab_glyph::{FontArc, PxScale};
use image::{Rgba, RgbaImage};
use imageproc::drawing::draw_text_mut;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const STATUS_MARGIN: i32 = 30;
const LINE_SPACING: i32 = 25;
const PRIMARY_SCALE: f32 = 24.0;
const SECONDARY_SCALE: f32 = 18.0;
const PRIMARY_COLOR: Rgba<u8> = Rgba([0, 255, 0, 255]);
const SECONDARY_COLOR: Rgba<u8> = Rgba([200, 200, 200, 255]);

pub const PAUSE_HINT: &str = "[SPACE] Pause/Resume";

/// 未配置字体时依次尝试的路径
const FONT_CANDIDATES: [&str; 5] = [
    "assets/font/msyh.ttc",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "C:\\Windows\\Fonts\\msyh.ttc",
];

/// 按路径加载字体, 未指定时依次尝试候选路径
pub fn load_font(font_path: Option<&Path>) -> Option<FontArc> {
    let candidates: Vec<PathBuf> = match font_path {
        Some(p) => vec![p.to_path_buf()],
        None => FONT_CANDIDATES.iter().map(PathBuf::from).collect(),
    };

    for path in &candidates {
        let Ok(bytes) = fs::read(path) else {
            continue;
        };
        match FontArc::try_from_vec(bytes) {
            Ok(font) => {
                info!("✅ 字体加载成功: {}", path.display());
                return Some(font);
            }
            Err(e) => warn!("⚠️  字体解析失败 {}: {}", path.display(), e),
        }
    }
    None
}

pub struct StatusOverlay {
    font: Option<FontArc>,
}

impl StatusOverlay {
    pub fn new(font: Option<FontArc>) -> Self {
        Self { font }
    }

    pub fn without_font() -> Self {
        Self { font: None }
    }

    /// 加载字体: 优先使用配置路径, 否则依次尝试常见系统字体
    pub fn load(font_path: Option<&Path>) -> Self {
        let font = load_font(font_path);
        if font.is_none() {
            warn!("⚠️  未找到可用字体, 画面上不绘制状态文字");
        }
        Self::new(font)
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    /// 三行状态文字 (与画面上的绘制内容一致)
    pub fn status_lines(fps: f64, multiplier: f64) -> [String; 3] {
        [
            format!("FPS: {:.1}", fps),
            format!("Speed: x{:?}", multiplier),
            PAUSE_HINT.to_string(),
        ]
    }

    /// 在帧左上角绘制状态文字
    pub fn render(&self, image: &mut RgbaImage, fps: f64, multiplier: f64) {
        let Some(font) = &self.font else {
            return;
        };
        let lines = Self::status_lines(fps, multiplier);
        for (i, text) in lines.iter().enumerate() {
            let (scale, color) = if i == 0 {
                (PRIMARY_SCALE, PRIMARY_COLOR)
            } else {
                (SECONDARY_SCALE, SECONDARY_COLOR)
            };
            // 以基线为准排版, draw_text_mut 的坐标是左上角
            let baseline = STATUS_MARGIN + LINE_SPACING * i as i32;
            let top = baseline - scale as i32 + 4;
            draw_text_mut(
                image,
                color,
                STATUS_MARGIN,
                top,
                PxScale::from(scale),
                font,
                text,
            );
        }
    }
}
