/**
 * UAT demodulation pipeline.
 *
 * The input is a continuous stream of interleaved 8-bit I/Q samples at
 * 2.083334 Msps, twice the UAT bit rate: one UAT bit covers two samples,
 * i.e. four bytes. The signal is FM: a one is a positive phase shift
 * between consecutive samples, a zero a negative one.
 *
 * The scanner looks at the phase difference between pairs of adjacent
 * samples at both half-bit alignments,
 *
 * ```text
 *   sample 1 - sample 0   -> sync0
 *   sample 2 - sample 1   -> sync1
 *   sample 3 - sample 2   -> sync0
 *   sample 4 - sample 3   -> sync1
 * ```
 *
 * accumulating the signs into the two registers until one of them holds
 * a frame sync word. From there the sync word itself calibrates the
 * slicing threshold, the payload bits are sliced, and the relevant
 * Reed–Solomon code decides whether the candidate was real. A failed
 * candidate costs nothing: the scanner advances one bit and tries again.
 */
pub mod phase;
pub mod reader;
pub mod sync;

use std::fmt;
use std::str::FromStr;

use serde::ser::Serializer;
use tracing::debug;

use crate::fec::ReedSolomon;
use phase::{iq_phase, phase_difference};
use sync::{check_sync_word, ADSB_SYNC_WORD, PREFILTER_MASK, SYNC_LEN, UPLINK_SYNC_WORD};
pub use sync::SYNC_BITS;

/// Sample rate of the input stream, samples per second
pub const SAMPLE_RATE: f64 = 2_083_334.0;

/// Basic ADS-B frame: 144 data bits + 96 FEC bits
pub const BASIC_FRAME_BITS: usize = 144 + 96;

/// Long ADS-B frame: 272 data bits + 112 FEC bits
pub const LONG_FRAME_BITS: usize = 272 + 112;

/// Uplink frame: six interleaved blocks of 576 data + 160 FEC bits
pub const UPLINK_FRAME_BITS: usize = (576 + 160) * 6;

/// Scan lookahead in bytes: a full sync word plus the largest frame must
/// fit after the current index before a candidate is worth examining
const SCAN_WINDOW: usize = (SYNC_BITS + UPLINK_FRAME_BITS + 1) * 4;

/// Frame direction on the 978 MHz channel
#[derive(Debug, PartialEq, Eq, Copy, Clone, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// ADS-B, transmitted by aircraft
    Downlink,
    /// FIS-B, transmitted by ground stations
    Uplink,
}

/// One error-corrected UAT frame, as handed to the sink.
#[derive(Debug, PartialEq, Clone, serde::Serialize)]
pub struct RawFrame {
    pub direction: Direction,
    /// 18 (Basic ADS-B), 34 (Long ADS-B) or 432 (uplink) payload bytes,
    /// FEC stripped
    #[serde(serialize_with = "as_hex", rename = "frame")]
    pub data: Vec<u8>,
    /// Absolute sample index of the first payload bit
    pub timestamp: u64,
    /// Symbols corrected by the Reed–Solomon decoder (summed over the
    /// six blocks for uplink frames)
    pub rs_errors: usize,
}

pub(crate) fn as_hex<S: Serializer>(data: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&hex::encode(data))
}

impl RawFrame {
    /// Offset of the first payload bit from the start of the stream, in
    /// seconds
    pub fn seconds(&self) -> f64 {
        self.timestamp as f64 / SAMPLE_RATE
    }
}

/// The raw output line: direction marker, lowercase hex payload, and an
/// `rs=` annotation iff the decoder corrected at least one symbol.
impl fmt::Display for RawFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.direction {
            Direction::Downlink => write!(f, "-")?,
            Direction::Uplink => write!(f, "+")?,
        }
        f.write_str(&hex::encode(&self.data))?;
        if self.rs_errors > 0 {
            write!(f, ";rs={};", self.rs_errors)?;
        } else {
            write!(f, ";")?;
        }
        Ok(())
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum ParseFrameError {
    /// The line does not start with `-` or `+`
    Direction,
    /// The payload is not valid hex
    Hex,
    /// A trailing annotation could not be parsed
    Annotation,
    /// The payload length fits no frame type
    Length(usize),
    /// The mdb_type in byte 0 contradicts the payload length
    TypeMismatch,
}

impl fmt::Display for ParseFrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Direction => write!(f, "expected a leading '-' or '+'"),
            Self::Hex => write!(f, "invalid hex payload"),
            Self::Annotation => write!(f, "invalid annotation"),
            Self::Length(n) => write!(f, "invalid payload length {n}"),
            Self::TypeMismatch => {
                write!(f, "payload length inconsistent with the mdb_type")
            }
        }
    }
}

impl std::error::Error for ParseFrameError {}

/// Parse a raw frame line as emitted by [`RawFrame::fmt`], the interface
/// consumed by downstream tools: leading direction marker, hex payload
/// up to the first `;`, annotations after it.
impl FromStr for RawFrame {
    type Err = ParseFrameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (direction, rest) = match s.as_bytes().first() {
            Some(b'-') => (Direction::Downlink, &s[1..]),
            Some(b'+') => (Direction::Uplink, &s[1..]),
            _ => return Err(ParseFrameError::Direction),
        };
        let mut parts = rest.split(';');
        let data = hex::decode(parts.next().unwrap_or_default())
            .map_err(|_| ParseFrameError::Hex)?;
        let mut rs_errors = 0;
        for annotation in parts {
            if let Some(value) = annotation.strip_prefix("rs=") {
                rs_errors =
                    value.parse().map_err(|_| ParseFrameError::Annotation)?;
            }
        }
        match (direction, data.len()) {
            (Direction::Downlink, 18) if data[0] >> 3 != 0 => {
                return Err(ParseFrameError::TypeMismatch)
            }
            (Direction::Downlink, 34) if data[0] >> 3 == 0 => {
                return Err(ParseFrameError::TypeMismatch)
            }
            (Direction::Downlink, 18 | 34) | (Direction::Uplink, 432) => {}
            (_, n) => return Err(ParseFrameError::Length(n)),
        }
        Ok(RawFrame {
            direction,
            data,
            timestamp: 0,
            rs_errors,
        })
    }
}

/// The demodulation pipeline. Owns the three Reed–Solomon contexts; the
/// phase table is a process-wide static. One instance per sample stream.
pub struct Demodulator {
    rs_basic: ReedSolomon,
    rs_long: ReedSolomon,
    rs_uplink: ReedSolomon,
}

impl Default for Demodulator {
    fn default() -> Self {
        Self::new()
    }
}

impl Demodulator {
    pub fn new() -> Self {
        Demodulator {
            rs_basic: ReedSolomon::new(12, 225),
            rs_long: ReedSolomon::new(14, 207),
            rs_uplink: ReedSolomon::new(20, 163),
        }
    }

    /// Scan a window of the sample stream, decoding every frame whose
    /// full extent lies inside it. `offset` is the absolute byte offset
    /// of `input[0]` in the stream. Returns the number of leading bytes
    /// that are safe to drop: the caller keeps the tail and hands it
    /// back at the start of the next window.
    pub fn process_buffer<F>(&self, input: &[u8], offset: u64, sink: &mut F) -> usize
    where
        F: FnMut(RawFrame),
    {
        if input.len() < SCAN_WINDOW + 4 {
            return 0;
        }
        let mut sync0: u64 = 0;
        let mut sync1: u64 = 0;
        let mut last_phi = iq_phase(input[0], input[1]);
        let mut i = 2;
        while i + SCAN_WINDOW < input.len() {
            let phi0 = iq_phase(input[i], input[i + 1]);
            let phi1 = iq_phase(input[i + 2], input[i + 3]);
            let dphi0 = phase_difference(last_phi, phi0);
            let dphi1 = phase_difference(phi0, phi1);
            last_phi = phi1;

            sync0 = (sync0 << 1) | (dphi0 >= 0) as u64;
            sync1 = (sync1 << 1) | (dphi1 >= 0) as u64;

            // Candidates in commit order: ADS-B before uplink, even
            // sub-offset before odd. The first successful decode
            // consumes the frame's samples; the rest are not attempted.
            let mut skip = 0;
            if sync0 & PREFILTER_MASK == ADSB_SYNC_WORD & PREFILTER_MASK {
                skip = self.decode_adsb_frame(input, i + 2, offset, sink);
            }
            if skip == 0 && sync1 & PREFILTER_MASK == ADSB_SYNC_WORD & PREFILTER_MASK {
                skip = self.decode_adsb_frame(input, i + 4, offset, sink);
            }
            if skip == 0 && sync0 & PREFILTER_MASK == UPLINK_SYNC_WORD & PREFILTER_MASK {
                skip = self.decode_uplink_frame(input, i + 2, offset, sink);
            }
            if skip == 0 && sync1 & PREFILTER_MASK == UPLINK_SYNC_WORD & PREFILTER_MASK {
                skip = self.decode_uplink_frame(input, i + 4, offset, sink);
            }
            i += skip + 4;
        }
        // Keep one sync word of history behind the stop index: a sync
        // word completing just past it still needs its leading samples
        // for verification in the next window.
        i.saturating_sub(SYNC_LEN)
    }

    /// Attempt an ADS-B frame whose first payload sample starts at byte
    /// `start`. Returns the bytes consumed, 0 if no frame was decoded.
    fn decode_adsb_frame<F>(&self, input: &[u8], start: usize, offset: u64, sink: &mut F) -> usize
    where
        F: FnMut(RawFrame),
    {
        if start < SYNC_LEN {
            // sync started before this window; already examined in the
            // previous one
            return 0;
        }
        let Some(center) = check_sync_word(input, start - SYNC_LEN, ADSB_SYNC_WORD) else {
            return 0;
        };

        // Slice the Long size speculatively, keep a copy of the Basic
        // prefix: the header type is only trustworthy after correction
        let mut long = [0u8; LONG_FRAME_BITS / 8];
        slice_bits(input, start, center, &mut long);
        let mut basic = [0u8; BASIC_FRAME_BITS / 8];
        basic.copy_from_slice(&long[..BASIC_FRAME_BITS / 8]);

        if let Some(n) = self.rs_long.decode(&mut long) {
            if long[0] >> 3 != 0 {
                sink(RawFrame {
                    direction: Direction::Downlink,
                    data: long[..34].to_vec(),
                    timestamp: (offset + start as u64) / 2,
                    rs_errors: n,
                });
                return LONG_FRAME_BITS * 4;
            }
        }
        if let Some(n) = self.rs_basic.decode(&mut basic) {
            if basic[0] >> 3 == 0 {
                sink(RawFrame {
                    direction: Direction::Downlink,
                    data: basic[..18].to_vec(),
                    timestamp: (offset + start as u64) / 2,
                    rs_errors: n,
                });
                return BASIC_FRAME_BITS * 4;
            }
        }
        debug!(
            "ADS-B candidate at sample {} failed error correction",
            (offset + start as u64) / 2
        );
        0
    }

    /// Attempt an uplink frame: slice all six interleaved blocks,
    /// deinterleave, correct each block, concatenate the data portions.
    fn decode_uplink_frame<F>(&self, input: &[u8], start: usize, offset: u64, sink: &mut F) -> usize
    where
        F: FnMut(RawFrame),
    {
        if start < SYNC_LEN {
            return 0;
        }
        let Some(center) = check_sync_word(input, start - SYNC_LEN, UPLINK_SYNC_WORD) else {
            return 0;
        };

        let mut interleaved = [0u8; UPLINK_FRAME_BITS / 8];
        slice_bits(input, start, center, &mut interleaved);

        let mut payload = Vec::with_capacity(432);
        let mut rs_errors = 0;
        for block in 0..6 {
            let mut blockdata = [0u8; 92];
            for (j, byte) in blockdata.iter_mut().enumerate() {
                *byte = interleaved[j * 6 + block];
            }
            match self.rs_uplink.decode(&mut blockdata) {
                Some(n) => rs_errors += n,
                None => {
                    debug!(
                        "uplink candidate at sample {}: block {} uncorrectable",
                        (offset + start as u64) / 2,
                        block
                    );
                    return 0;
                }
            }
            payload.extend_from_slice(&blockdata[..72]);
        }
        sink(RawFrame {
            direction: Direction::Uplink,
            data: payload,
            timestamp: (offset + start as u64) / 2,
            rs_errors,
        });
        UPLINK_FRAME_BITS * 4
    }
}

/// Slice `out.len() * 8` bits starting at byte `start`, MSB first: a bit
/// is one iff the in-cell phase difference exceeds the threshold derived
/// from the sync word.
fn slice_bits(input: &[u8], start: usize, center: i16, out: &mut [u8]) {
    for k in 0..out.len() * 8 {
        let b = start + k * 4;
        let phi0 = iq_phase(input[b], input[b + 1]);
        let phi1 = iq_phase(input[b + 2], input[b + 3]);
        if phase_difference(phi0, phi1) > center {
            out[k / 8] |= 0x80 >> (k & 7);
        }
    }
}
