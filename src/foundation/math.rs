pub(crate) fn mul_div255_u16(x: u16, y: u16) -> u16 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u16
}

/// Straight-alpha source channel over an opaque destination channel.
pub(crate) fn over_u8(src: u8, alpha: u8, dst: u8) -> u8 {
    let a = u16::from(alpha);
    let inv = 255u16 - a;
    (mul_div255_u16(u16::from(src), a) + mul_div255_u16(u16::from(dst), inv)).min(255) as u8
}

/// Round `n` up to the next multiple of `align` (a power of two).
pub(crate) fn align_up(n: usize, align: usize) -> Option<usize> {
    debug_assert!(align.is_power_of_two());
    n.checked_add(align - 1).map(|v| v & !(align - 1))
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/math.rs"]
mod tests;
