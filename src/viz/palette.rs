//! The diverging "Spectral" colormap.

/// Anchor colors from dark red through pale yellow to purple.
const SPECTRAL: [(u8, u8, u8); 11] = [
    (0x9e, 0x01, 0x42),
    (0xd5, 0x3e, 0x4f),
    (0xf4, 0x6d, 0x43),
    (0xfd, 0xae, 0x61),
    (0xfe, 0xe0, 0x8b),
    (0xff, 0xff, 0xbf),
    (0xe6, 0xf5, 0x98),
    (0xab, 0xdd, 0xa4),
    (0x66, 0xc2, 0xa5),
    (0x32, 0x88, 0xbd),
    (0x5e, 0x4f, 0xa2),
];

/// Color at position `t` in `[0, 1]` as `#rrggbb`; values outside are clamped.
#[must_use]
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub fn spectral(t: f64) -> String {
    let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
    let scaled = t * (SPECTRAL.len() - 1) as f64;
    let lower = (scaled.floor() as usize).min(SPECTRAL.len() - 2);
    let frac = scaled - lower as f64;
    let (r0, g0, b0) = SPECTRAL[lower];
    let (r1, g1, b1) = SPECTRAL[lower + 1];
    let mix = |a: u8, b: u8| -> u8 {
        (f64::from(a) + (f64::from(b) - f64::from(a)) * frac).round() as u8
    };
    format!("#{:02x}{:02x}{:02x}", mix(r0, r1), mix(g0, g1), mix(b0, b1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoints_and_midpoint() {
        assert_eq!(spectral(0.0), "#9e0142");
        assert_eq!(spectral(0.5), "#ffffbf");
        assert_eq!(spectral(1.0), "#5e4fa2");
    }

    #[test]
    fn test_out_of_range_is_clamped() {
        assert_eq!(spectral(-3.0), spectral(0.0));
        assert_eq!(spectral(7.0), spectral(1.0));
        assert_eq!(spectral(f64::NAN), spectral(0.0));
    }
}
