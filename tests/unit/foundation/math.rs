use super::*;

#[test]
fn over_endpoints() {
    assert_eq!(over_u8(200, 255, 10), 200);
    assert_eq!(over_u8(200, 0, 10), 10);
    assert_eq!(over_u8(255, 128, 0), 128);
}

#[test]
fn align_up_rounds_to_multiple() {
    assert_eq!(align_up(0, 64), Some(0));
    assert_eq!(align_up(1, 64), Some(64));
    assert_eq!(align_up(64, 64), Some(64));
    assert_eq!(align_up(65, 64), Some(128));
    assert_eq!(align_up(usize::MAX, 64), None);
}
