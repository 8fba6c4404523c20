/// Bit pattern Prometheus uses to mark a series as stale.
pub const STALE_NAN_BITS: u64 = 0x7ff0000000000002;

/// A NaN carrying the stale marker bit pattern.
pub const STALE_NAN: f64 = f64::from_bits(STALE_NAN_BITS);

/// Ordinary arithmetic never produces this payload, so only values written
/// as stale markers compare true here.
#[inline]
pub fn is_stale_nan(v: f64) -> bool {
    v.to_bits() == STALE_NAN_BITS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stale_nan_is_nan() {
        assert!(STALE_NAN.is_nan());
        assert!(is_stale_nan(STALE_NAN));
        assert!(!is_stale_nan(f64::NAN));
        assert!(!is_stale_nan(1.0));
    }
}
