// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

/// YUV420P → RGBA 转换 (BT.601, 定点系数 ×128)
use image::RgbaImage;

/// 三个平面的像素数据与行步长
pub struct Yuv420Planes<'a> {
    pub y: &'a [u8],
    pub u: &'a [u8],
    pub v: &'a [u8],
    pub y_stride: usize,
    pub uv_stride: usize,
}

impl Yuv420Planes<'_> {
    /// 检查步长与平面长度是否足以覆盖 width x height
    fn covers(&self, width: usize, height: usize) -> bool {
        if width == 0 || height == 0 {
            return false;
        }
        let uv_width = width.div_ceil(2);
        let uv_height = height.div_ceil(2);
        self.y_stride >= width
            && self.uv_stride >= uv_width
            && self.y.len() >= self.y_stride * (height - 1) + width
            && self.u.len() >= self.uv_stride * (uv_height - 1) + uv_width
            && self.v.len() >= self.uv_stride * (uv_height - 1) + uv_width
    }
}

#[inline]
fn yuv_to_rgba(y: u8, u: u8, v: u8) -> [u8; 4] {
    let y = y as i32;
    let u = u as i32 - 128;
    let v = v as i32 - 128;
    [
        (y + ((v * 179) >> 7)).clamp(0, 255) as u8,
        (y - ((u * 44) >> 7) - ((v * 91) >> 7)).clamp(0, 255) as u8,
        (y + ((u * 227) >> 7)).clamp(0, 255) as u8,
        255,
    ]
}

/// 转换整帧, 数据不足 (步长/长度异常) 时返回 None
pub fn yuv420p_to_rgba(planes: &Yuv420Planes, width: u32, height: u32) -> Option<RgbaImage> {
    let (w, h) = (width as usize, height as usize);
    if !planes.covers(w, h) {
        return None;
    }

    let mut buffer = vec![0u8; w * h * 4];
    for (row, out) in buffer.chunks_exact_mut(w * 4).enumerate() {
        let y_row = &planes.y[row * planes.y_stride..];
        let uv_offset = (row >> 1) * planes.uv_stride;
        let u_row = &planes.u[uv_offset..];
        let v_row = &planes.v[uv_offset..];

        for (x, px) in out.chunks_exact_mut(4).enumerate() {
            px.copy_from_slice(&yuv_to_rgba(y_row[x], u_row[x >> 1], v_row[x >> 1]));
        }
    }
    RgbaImage::from_raw(width, height, buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_neutral_chroma_is_gray() {
        let y = vec![128u8; 4 * 2];
        let uv = vec![128u8; 2];
        let planes = Yuv420Planes {
            y: &y,
            u: &uv,
            v: &uv,
            y_stride: 4,
            uv_stride: 2,
        };
        let image = yuv420p_to_rgba(&planes, 4, 2).unwrap();
        assert!(image.pixels().all(|p| p.0 == [128, 128, 128, 255]));
    }

    #[test]
    fn test_saturated_red() {
        let (y, u, v) = ([76u8], [85u8], [255u8]);
        let planes = Yuv420Planes {
            y: &y,
            u: &u,
            v: &v,
            y_stride: 1,
            uv_stride: 1,
        };
        let image = yuv420p_to_rgba(&planes, 1, 1).unwrap();
        assert_eq!(image.get_pixel(0, 0).0, [253, 1, 0, 255]);
    }

    #[test]
    fn test_padded_stride_and_odd_size() {
        // 3x3, Y步长8 (行尾填充), UV 2x2 步长4
        let mut y = vec![0u8; 8 * 3];
        for row in 0..3 {
            for x in 0..3 {
                y[row * 8 + x] = 100 + (row * 3 + x) as u8;
            }
        }
        let uv = vec![128u8; 4 * 2];
        let planes = Yuv420Planes {
            y: &y,
            u: &uv,
            v: &uv,
            y_stride: 8,
            uv_stride: 4,
        };
        let image = yuv420p_to_rgba(&planes, 3, 3).unwrap();
        assert_eq!(image.dimensions(), (3, 3));
        assert_eq!(image.get_pixel(2, 2).0, [108, 108, 108, 255]);
        assert_eq!(image.get_pixel(1, 0).0, [101, 101, 101, 255]);
    }

    #[test]
    fn test_rejects_short_planes() {
        let y = vec![0u8; 10];
        let uv = vec![128u8; 4];
        let planes = Yuv420Planes {
            y: &y,
            u: &uv,
            v: &uv,
            y_stride: 4,
            uv_stride: 2,
        };
        assert!(yuv420p_to_rgba(&planes, 4, 4).is_none());
        assert!(yuv420p_to_rgba(&planes, 0, 1).is_none());

        let narrow = Yuv420Planes {
            y_stride: 2,
            ..planes
        };
        assert!(yuv420p_to_rgba(&narrow, 4, 1).is_none());
    }
}
