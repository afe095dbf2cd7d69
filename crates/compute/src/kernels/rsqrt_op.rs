/// Reciprocal square root by the `0x5f3759df` bit trick plus one
/// Newton-Raphson step. Relative error stays under 0.2% for positive finite
/// inputs.
#[inline]
#[must_use]
pub fn fast_rsqrt(number: f32) -> f32 {
    const THREE_HALFS: f32 = 1.5;

    let x2 = number * 0.5;
    let bits = 0x5f37_59df_u32.wrapping_sub(number.to_bits() >> 1);
    let y = f32::from_bits(bits);
    y * (THREE_HALFS - (x2 * y * y))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn close_to_exact_reciprocal_square_root() {
        for &x in &[1.0f32, 4.0, 9.0, 2.0, 0.25, 1.5625e-6, 3.0e5, 1.0e12] {
            let exact = 1.0 / x.sqrt();
            let approx = fast_rsqrt(x);
            let relative = ((approx - exact) / exact).abs();
            assert!(relative < 2.0e-3, "x={x} exact={exact} approx={approx}");
        }
    }

    #[test]
    fn zero_stays_finite() {
        let y = fast_rsqrt(0.0);
        assert!(y.is_finite());
        assert!((1.0 / y).abs() < 1.0e-12);
    }
}
