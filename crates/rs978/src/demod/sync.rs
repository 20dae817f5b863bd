/**
 * Sync word detection.
 *
 * Every UAT frame starts with a fixed 36-bit sync word transmitted
 * MSB-first as differential phase shifts: a one is a positive dφ between
 * the two half-bit samples, a zero a negative one. The two sync words
 * discriminate the frame type:
 *
 * - ADS-B (downlink): `0xEACDDA4E2`
 * - Uplink (FIS-B):   `0x153225B1D`
 *
 * The scanner shifts the sign of each dφ into two rolling registers (one
 * per half-sample offset) and compares their low 18 bits against the low
 * 18 bits of each sync word. Eighteen bits give a ~2⁻¹⁸ false-positive
 * rate over white input, cheap enough at 2 Msps; a match triggers the
 * full 36-bit verification below.
 */
use tracing::debug;

use super::phase::{iq_phase, phase_difference};

/// 36-bit ADS-B (downlink) sync word
pub const ADSB_SYNC_WORD: u64 = 0xEAC_DDA4E2;

/// 36-bit uplink (FIS-B) sync word
pub const UPLINK_SYNC_WORD: u64 = 0x153_225B1D;

/// Sync word length in bits
pub const SYNC_BITS: usize = 36;

pub(crate) const PREFILTER_MASK: u64 = 0x3_FFFF;

/// Bytes covered by one sync word: 36 bits, 2 samples per bit, 2 bytes
/// per sample
pub(crate) const SYNC_LEN: usize = SYNC_BITS * 4;

/// Modulation sanity bounds: the separation between the mean dφ of one
/// bits and zero bits must land between 20 kHz and 1 MHz of carrier
/// deviation. dφ = 65536 is one full cycle per sample at 2083334 sps.
const MIN_SEPARATION: f64 = 65536.0 * 20.0e3 / 2_083_334.0;
const MAX_SEPARATION: f64 = 65536.0 * 1000.0e3 / 2_083_334.0;

/// Verify a sync word candidate starting at byte index `base` and derive
/// the bit-slicing threshold for the frame that follows.
///
/// Two passes over the 36 bit periods: the first averages dφ separately
/// over the positions where `pattern` expects a one and a zero, placing
/// the threshold halfway between the two means (the DC offset of the
/// discriminator drifts with receiver tuning, so it has to be measured
/// per frame). The second pass re-scores every bit against that
/// threshold and accepts at most 2 errors.
pub(crate) fn check_sync_word(input: &[u8], base: usize, pattern: u64) -> Option<i16> {
    let mut dphi = [0i32; SYNC_BITS];
    let mut one_total: i32 = 0;
    let mut one_bits: i32 = 0;
    let mut zero_total: i32 = 0;
    let mut zero_bits: i32 = 0;

    for (j, d) in dphi.iter_mut().enumerate() {
        let b = base + j * 4;
        let phi0 = iq_phase(input[b], input[b + 1]);
        let phi1 = iq_phase(input[b + 2], input[b + 3]);
        *d = phase_difference(phi0, phi1) as i32;
        if pattern & (1 << (35 - j)) != 0 {
            one_bits += 1;
            one_total += *d;
        } else {
            zero_bits += 1;
            zero_total += *d;
        }
    }

    let one_mean = one_total / one_bits;
    let zero_mean = zero_total / zero_bits;
    let separation = one_mean - zero_mean;
    let center = (one_mean + zero_mean) / 2;

    if (separation as f64) < MIN_SEPARATION || (separation as f64) > MAX_SEPARATION {
        debug!("sync candidate rejected, separation {separation} out of range");
        return None;
    }

    let mut errors = 0;
    for (j, &d) in dphi.iter().enumerate() {
        let bit = d > center;
        let expected = pattern & (1 << (35 - j)) != 0;
        if bit != expected {
            errors += 1;
        }
    }
    if errors > 2 {
        debug!("sync candidate rejected, {errors} bit errors");
        return None;
    }

    Some(center as i16)
}
