//! Fixed-width integer encodings for floating-point attributes.
//!
//! All mappings truncate toward zero, and the signed encoders use the
//! asymmetric full range (32767 for non-negative values, 32768 for
//! negative) so that -1.0 maps exactly onto the integer minimum. These
//! constants are part of the wire format; the runtime decoder inverts
//! them exactly.

/// Map `v` affinely from `[a, b]` to `[-1, 1]`, then onto the full i8 range.
pub fn float_to_int8(v: f32, a: f32, b: f32) -> i8 {
    let mapped = 2.0 * ((v - a) / (b - a)) - 1.0;
    if mapped >= 0.0 {
        (mapped * f32::from(i8::MAX)) as i8
    } else {
        (mapped * 128.0) as i8
    }
}

/// Map `v` affinely from `[a, b]` to `[-1, 1]`, then onto the full i16 range.
pub fn float_to_int16(v: f32, a: f32, b: f32) -> i16 {
    let mapped = 2.0 * ((v - a) / (b - a)) - 1.0;
    if mapped >= 0.0 {
        (mapped * f32::from(i16::MAX)) as i16
    } else {
        (mapped * 32768.0) as i16
    }
}

/// Map `v` affinely from `[a, b]` to `[0, 1]`, then onto the u16 range.
pub fn float_to_uint16(v: f32, a: f32, b: f32) -> u16 {
    let mapped = (v - a) / (b - a);
    (mapped * f32::from(u16::MAX)) as u16
}

/// Pack an RGBA color (channels in 0..1) into one 32-bit word with R in
/// the low byte. The byte order is format-critical, not stylistic.
pub fn color_to_uint32(rgba: [f32; 4]) -> u32 {
    let r = (rgba[0] * 255.0) as u32;
    let g = (rgba[1] * 255.0) as u32;
    let b = (rgba[2] * 255.0) as u32;
    let a = (rgba[3] * 255.0) as u32;
    r | g << 8 | b << 16 | a << 24
}
