/**
 * Sample intake: feeds the demodulator from any byte source.
 *
 * Frames regularly straddle read boundaries, so a slack buffer keeps
 * the unconsumed tail of each window and prepends it to the next read.
 * The buffer holds 256 KiB; one maximum-sized uplink frame plus a sync
 * word covers about 17.8 KB of samples, so a frame can never outgrow
 * the buffer.
 */
use std::io::{self, Read};

use super::{Demodulator, RawFrame};

/// Size of the slack buffer in bytes
pub const BUFFER_SIZE: usize = 262_144;

impl Demodulator {
    /// Run the pipeline over `input` until end of stream, handing every
    /// decoded frame to `sink`.
    ///
    /// The only blocking point is the read on `input`; a zero-length
    /// read terminates the pipeline cleanly, dropping any partial frame
    /// still in the buffer. Interrupted reads are retried; any other
    /// I/O error is fatal and propagated.
    pub fn run<R, F>(&self, mut input: R, mut sink: F) -> io::Result<()>
    where
        R: Read,
        F: FnMut(RawFrame),
    {
        let mut buffer = vec![0u8; BUFFER_SIZE];
        let mut used = 0;
        let mut offset: u64 = 0;
        loop {
            let n = match input.read(&mut buffer[used..]) {
                Ok(0) => return Ok(()),
                Ok(n) => n,
                Err(e)
                    if matches!(
                        e.kind(),
                        io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock
                    ) =>
                {
                    continue
                }
                Err(e) => return Err(e),
            };
            used += n;
            let processed = self.process_buffer(&buffer[..used], offset, &mut sink);
            if processed > 0 {
                buffer.copy_within(processed..used, 0);
                used -= processed;
                offset += processed as u64;
            }
        }
    }
}
