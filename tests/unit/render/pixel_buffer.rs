use super::*;

fn solid(w: u32, h: u32, rgba: [u8; 4]) -> image::RgbaImage {
    image::RgbaImage::from_pixel(w, h, image::Rgba(rgba))
}

#[test]
fn allocation_aligns_rows_and_starts_black() {
    let buf = PixelBuffer::allocate(10, 3).unwrap();
    assert_eq!(buf.format(), PixelFormat::Xrgb8888);
    assert_eq!(buf.bytes_per_row(), 64);
    assert_eq!(buf.packed_rows().count(), 3);
    assert!(buf.packed_rows().all(|r| r.len() == 40));
    assert_eq!(buf.pixel(9, 2), Some([0xff, 0, 0, 0]));
    assert_eq!(buf.pixel(10, 0), None);
}

#[test]
fn allocation_failures_are_render_errors() {
    assert!(matches!(
        PixelBuffer::allocate(0, 4),
        Err(StillcutError::Render(_))
    ));
    assert!(matches!(
        PixelBuffer::allocate(u32::MAX, u32::MAX),
        Err(StillcutError::Render(_))
    ));
}

#[test]
fn native_fit_anchors_bottom_left() {
    let mut buf = PixelBuffer::allocate(4, 4).unwrap();
    buf.draw_image(&solid(2, 2, [200, 100, 50, 255]), FrameFit::Native, [0, 0, 0])
        .unwrap();

    assert_eq!(buf.pixel(0, 3), Some([0xff, 200, 100, 50]));
    assert_eq!(buf.pixel(1, 2), Some([0xff, 200, 100, 50]));
    assert_eq!(buf.pixel(0, 0), Some([0xff, 0, 0, 0]));
    assert_eq!(buf.pixel(3, 3), Some([0xff, 0, 0, 0]));
}

#[test]
fn native_fit_crops_oversized_images() {
    let mut img = solid(3, 3, [10, 10, 10, 255]);
    // Bottom row of the image is distinct and must survive the crop.
    for x in 0..3 {
        img.put_pixel(x, 2, image::Rgba([250, 0, 0, 255]));
    }
    let mut buf = PixelBuffer::allocate(2, 2).unwrap();
    buf.draw_image(&img, FrameFit::Native, [0, 0, 0]).unwrap();
    assert_eq!(buf.pixel(0, 1), Some([0xff, 250, 0, 0]));
    assert_eq!(buf.pixel(1, 0), Some([0xff, 10, 10, 10]));
}

#[test]
fn stretch_fills_the_frame() {
    let mut buf = PixelBuffer::allocate(8, 6).unwrap();
    buf.draw_image(&solid(2, 2, [0, 255, 0, 255]), FrameFit::Stretch, [0, 0, 0])
        .unwrap();
    for rows in buf.packed_rows() {
        for px in rows.chunks_exact(4) {
            assert_eq!(px, &[0xff, 0, 255, 0]);
        }
    }
}

#[test]
fn contain_letterboxes_with_background() {
    let mut buf = PixelBuffer::allocate(8, 4).unwrap();
    buf.draw_image(&solid(2, 2, [0, 0, 255, 255]), FrameFit::Contain, [9, 9, 9])
        .unwrap();
    // 2x2 scaled to 4x4, centered horizontally at x = 2..6.
    assert_eq!(buf.pixel(0, 0), Some([0xff, 9, 9, 9]));
    assert_eq!(buf.pixel(7, 3), Some([0xff, 9, 9, 9]));
    assert_eq!(buf.pixel(2, 0), Some([0xff, 0, 0, 255]));
    assert_eq!(buf.pixel(5, 3), Some([0xff, 0, 0, 255]));
}

#[test]
fn translucent_pixels_composite_over_background() {
    let mut buf = PixelBuffer::allocate(1, 1).unwrap();
    buf.draw_image(&solid(1, 1, [255, 0, 0, 128]), FrameFit::Native, [0, 0, 0])
        .unwrap();
    assert_eq!(buf.pixel(0, 0), Some([0xff, 128, 0, 0]));
}

#[test]
fn drawing_resets_previous_contents() {
    let mut buf = PixelBuffer::allocate(2, 2).unwrap();
    buf.draw_image(&solid(2, 2, [1, 1, 1, 255]), FrameFit::Native, [0, 0, 0])
        .unwrap();
    buf.draw_image(&solid(1, 1, [5, 5, 5, 255]), FrameFit::Native, [7, 7, 7])
        .unwrap();
    assert_eq!(buf.pixel(0, 0), Some([0xff, 7, 7, 7]));
    assert_eq!(buf.pixel(0, 1), Some([0xff, 5, 5, 5]));
}
