use crate::core_modules::frame::{BoundingBox, Frame};
use image::Rgb;

pub const REGION_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
pub const REGION_THICKNESS: u32 = 2;

/// Outlines every region on the frame, clipped to the frame bounds.
pub fn draw_regions(frame: &mut Frame, regions: &[BoundingBox]) {
    for region in regions {
        draw_outline(frame, region, REGION_COLOR, REGION_THICKNESS);
    }
}

/// Draws a rectangle outline `thickness` pixels wide, centred on the corner
/// points `(x, y)` and `(x + width, y + height)` as OpenCV strokes rectangles.
/// With a 2-pixel stroke the outline covers `x - 1 ..= x + width`.
pub fn draw_outline(frame: &mut Frame, region: &BoundingBox, color: Rgb<u8>, thickness: u32) {
    if thickness == 0 {
        return;
    }
    let (width, height) = frame.dimensions();
    let image = frame.as_image_mut();
    let half = i64::from(thickness / 2);
    let reach = i64::from(thickness) - 1 - half;
    let left = i64::from(region.x) - half;
    let top = i64::from(region.y) - half;
    let right = i64::from(region.right()) + reach;
    let bottom = i64::from(region.bottom()) + reach;

    let mut put = |x: i64, y: i64| {
        if (0..i64::from(width)).contains(&x) && (0..i64::from(height)).contains(&y) {
            image.put_pixel(x as u32, y as u32, color);
        }
    };
    for t in 0..i64::from(thickness) {
        let (x0, y0, x1, y1) = (left + t, top + t, right - t, bottom - t);
        if x0 > x1 || y0 > y1 {
            break;
        }
        for x in x0.max(0)..=x1.min(i64::from(width)) {
            put(x, y0);
            put(x, y1);
        }
        for y in y0.max(0)..=y1.min(i64::from(height)) {
            put(x0, y);
            put(x1, y);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    fn black(width: u32, height: u32) -> Frame {
        Frame::from_image(RgbImage::new(width, height)).unwrap()
    }

    #[test]
    fn outline_is_centred_on_the_region_edges() {
        let mut frame = black(20, 20);
        draw_regions(&mut frame, &[BoundingBox::new(5, 5, 10, 8)]);
        let img = frame.as_image();

        assert_eq!(*img.get_pixel(4, 4), REGION_COLOR);
        assert_eq!(*img.get_pixel(5, 5), REGION_COLOR);
        assert_eq!(*img.get_pixel(15, 13), REGION_COLOR);
        assert_eq!(*img.get_pixel(14, 12), REGION_COLOR);
        assert_eq!(*img.get_pixel(15, 8), REGION_COLOR);
        assert_eq!(*img.get_pixel(6, 6), Rgb([0, 0, 0]));
        assert_eq!(*img.get_pixel(3, 3), Rgb([0, 0, 0]));
        assert_eq!(*img.get_pixel(16, 14), Rgb([0, 0, 0]));
    }

    #[test]
    fn regions_past_the_edge_are_clipped() {
        let mut frame = black(10, 10);
        draw_regions(
            &mut frame,
            &[
                BoundingBox::new(6, 6, 10, 10),
                BoundingBox::new(30, 30, 5, 5),
                BoundingBox::new(0, 0, 3, 3),
            ],
        );
        let img = frame.as_image();
        assert_eq!(*img.get_pixel(5, 9), REGION_COLOR);
        assert_eq!(*img.get_pixel(6, 9), REGION_COLOR);
        assert_eq!(*img.get_pixel(9, 5), REGION_COLOR);
        assert_eq!(*img.get_pixel(9, 9), Rgb([0, 0, 0]));
        assert_eq!(*img.get_pixel(0, 0), REGION_COLOR);
        assert_eq!(*img.get_pixel(3, 3), REGION_COLOR);
        assert_eq!(*img.get_pixel(1, 1), Rgb([0, 0, 0]));
    }
}
