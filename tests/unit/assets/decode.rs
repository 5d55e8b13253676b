use std::io::Cursor;

use super::*;

fn png_bytes(img: image::RgbaImage) -> Vec<u8> {
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

#[test]
fn decode_image_png_keeps_straight_alpha() {
    let img = image::RgbaImage::from_raw(1, 1, vec![100u8, 50u8, 200u8, 128u8]).unwrap();
    let decoded = decode_image(&png_bytes(img)).unwrap();
    assert_eq!(decoded.dimensions(), (1, 1));
    assert_eq!(decoded.as_raw().as_slice(), &[100u8, 50, 200, 128]);
}

#[test]
fn decode_image_rejects_garbage() {
    assert!(decode_image(b"definitely not an image").is_err());
}

#[test]
fn decode_missing_file_is_an_extract_error() {
    let err = decode_image_file(Path::new("target/does/not/exist.png")).unwrap_err();
    assert!(matches!(err, StillcutError::Extract(_)));
    assert!(!err.is_fatal());
}
