/**
 * Phase lookup table for the demodulator.
 *
 * At 2 Msps the inner loop cannot afford a transcendental per sample, so
 * every possible (I, Q) byte pair is mapped once to a 16-bit phase angle.
 * The additive π shift moves atan2's [-π, π] range onto [0, 2π), so that
 * the natural wraparound of 16-bit subtraction yields the signed angular
 * difference on the shorter arc (see [`phase_difference`]).
 */
use once_cell::sync::Lazy;
use std::f64::consts::PI;

static PHASE_TABLE: Lazy<Vec<u16>> = Lazy::new(|| {
    let mut table = vec![0u16; 65536];
    for i in 0..256usize {
        for q in 0..256usize {
            let d_i = i as f64 - 127.5;
            let d_q = q as f64 - 127.5;
            let ang = libm::atan2(d_q, d_i) + PI;
            let scaled = libm::round(32768.0 * ang / PI);
            table[(i << 8) | q] = scaled.clamp(0.0, 65535.0) as u16;
        }
    }
    table
});

/// Phase angle of an (I, Q) sample, 65536 units per turn
#[inline]
pub fn iq_phase(i: u8, q: u8) -> u16 {
    PHASE_TABLE[((i as usize) << 8) | q as usize]
}

/// Signed phase difference `to - from` on the shorter arc.
///
/// The two phases live modulo 2π; wrapping 16-bit subtraction
/// reinterpreted as signed is exactly the angular difference in ±π.
#[inline]
pub fn phase_difference(from: u16, to: u16) -> i16 {
    to.wrapping_sub(from) as i16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quadrants() {
        // (0, 0) sits at angle -3π/4, shifted to π/4
        assert_eq!(iq_phase(0, 0), 8192);
        // (255, 255) sits at π/4, shifted to 5π/4
        assert_eq!(iq_phase(255, 255), 40960);
        // (0, 255) sits at 3π/4, shifted to 7π/4
        assert_eq!(iq_phase(0, 255), 57344);
        assert_eq!(iq_phase(255, 0), 24576);
    }

    #[test]
    fn test_shorter_arc() {
        // wraparound across 0 resolves to the short way round
        assert_eq!(phase_difference(65000, 1000), 1536);
        assert_eq!(phase_difference(1000, 65000), -1536);
        assert_eq!(phase_difference(1000, 1000), 0);
        // ±π is the pivot
        assert!(phase_difference(0, 32767) > 0);
        assert!(phase_difference(0, 32769) < 0);
    }

    #[test]
    fn test_table_is_total() {
        for i in 0..=255u8 {
            for q in 0..=255u8 {
                // every entry is a valid u16 phase; the lookup never panics
                let _ = iq_phase(i, q);
            }
        }
    }
}
