/**
 * Shortened Reed–Solomon codes over GF(2⁸) as used by the UAT physical
 * layer (DO-282): field polynomial 0x187 (x⁸+x⁷+x²+x+1), primitive
 * element α = 2, first consecutive root α¹²⁰.
 *
 * Three codes are in use, all shortened from RS(255, 255-nroots):
 *
 * | Frame        | Code         | nroots | pad | corrects |
 * | ------------ | ------------ | ------ | --- | -------- |
 * | Basic ADS-B  | RS(30, 18)   | 12     | 225 | 6        |
 * | Long ADS-B   | RS(48, 34)   | 14     | 207 | 7        |
 * | Uplink block | RS(92, 72)   | 20     | 163 | 10       |
 *
 * The decoder is the textbook Berlekamp–Massey + Chien search + Forney
 * chain. The encoder fills the parity symbols of a codeword in place; it
 * is exercised by the tests and useful to synthesize valid frames.
 */
use once_cell::sync::Lazy;

/// Codeword length of the parent code, 2⁸ - 1
const NN: usize = 255;

/// Field generator polynomial, x⁸+x⁷+x²+x+1
const GF_POLY: u32 = 0x187;

/// First consecutive root of the generator polynomial, α^120
const FCR: i32 = 120;

struct Tables {
    exp: [u8; 512],
    log: [u8; 256],
}

static TABLES: Lazy<Tables> = Lazy::new(|| {
    let mut exp = [0u8; 512];
    let mut log = [0u8; 256];
    let mut sr: u32 = 1;
    for i in 0..NN {
        exp[i] = sr as u8;
        exp[i + NN] = sr as u8;
        log[sr as usize] = i as u8;
        sr <<= 1;
        if sr & 0x100 != 0 {
            sr ^= GF_POLY;
        }
    }
    // α^255 = 1, keeps exp[] addressable for any sum of two logs
    exp[2 * NN] = 1;
    exp[2 * NN + 1] = exp[1];
    Tables { exp, log }
});

impl Tables {
    #[inline]
    fn mul(&self, a: u8, b: u8) -> u8 {
        if a == 0 || b == 0 {
            0
        } else {
            self.exp[self.log[a as usize] as usize + self.log[b as usize] as usize]
        }
    }

    /// a · α^k, k may be negative
    #[inline]
    fn mulexp(&self, a: u8, k: i32) -> u8 {
        if a == 0 {
            0
        } else {
            let e = (self.log[a as usize] as i32 + k).rem_euclid(NN as i32);
            self.exp[e as usize]
        }
    }

    #[inline]
    fn inv(&self, a: u8) -> u8 {
        self.exp[NN - self.log[a as usize] as usize]
    }
}

/// One parameterisation of the shortened Reed–Solomon code.
pub struct ReedSolomon {
    nroots: usize,
    pad: usize,
    /// Generator polynomial in polynomial form, genpoly[i] is the
    /// coefficient of x^i; genpoly[nroots] = 1 (monic)
    genpoly: Vec<u8>,
}

impl ReedSolomon {
    /// Build a code with `nroots` parity symbols, shortened by `pad`
    /// virtual zero symbols. Codewords are `255 - pad` bytes long.
    pub fn new(nroots: usize, pad: usize) -> Self {
        let t = &*TABLES;
        let mut genpoly = vec![0u8; nroots + 1];
        genpoly[0] = 1;
        for i in 0..nroots {
            let root = FCR + i as i32;
            genpoly[i + 1] = 1;
            for j in (1..=i).rev() {
                genpoly[j] = genpoly[j - 1] ^ t.mulexp(genpoly[j], root);
            }
            genpoly[0] = t.mulexp(genpoly[0], root);
        }
        ReedSolomon {
            nroots,
            pad,
            genpoly,
        }
    }

    /// Codeword length in bytes (data + parity)
    pub fn codeword_len(&self) -> usize {
        NN - self.pad
    }

    /// Number of parity symbols
    pub fn nroots(&self) -> usize {
        self.nroots
    }

    /// Fill the trailing `nroots` bytes of `data` with the parity of the
    /// leading bytes (systematic encoding, LFSR division by the
    /// generator polynomial).
    pub fn encode(&self, data: &mut [u8]) {
        let t = &*TABLES;
        let nroots = self.nroots;
        let split = data.len() - nroots;
        let (msg, parity) = data.split_at_mut(split);
        parity.fill(0);
        for &m in msg.iter() {
            let feedback = m ^ parity[0];
            for j in 1..nroots {
                parity[j - 1] = parity[j] ^ t.mul(feedback, self.genpoly[nroots - j]);
            }
            parity[nroots - 1] = t.mul(feedback, self.genpoly[0]);
        }
    }

    /// Correct `data` (a full codeword, message + parity) in place.
    /// Returns the number of symbols corrected, or `None` if the word is
    /// uncorrectable. The shortened prefix is implicit: no error can be
    /// located there.
    pub fn decode(&self, data: &mut [u8]) -> Option<usize> {
        let t = &*TABLES;
        let nroots = self.nroots;
        let len = data.len();
        debug_assert_eq!(len, self.codeword_len());

        // Syndromes S_i = C(α^(fcr+i)), Horner's rule with data[0] as the
        // highest-degree coefficient
        let mut synd = vec![data[0]; nroots];
        for &byte in &data[1..] {
            for (i, s) in synd.iter_mut().enumerate() {
                *s = byte ^ t.mulexp(*s, FCR + i as i32);
            }
        }
        if synd.iter().all(|&s| s == 0) {
            return Some(0);
        }

        // Berlekamp-Massey: error locator Λ(x)
        let mut lambda = vec![0u8; nroots + 1];
        lambda[0] = 1;
        let mut prev = lambda.clone();
        let mut el = 0usize;
        for r in 1..=nroots {
            let mut discr = 0u8;
            for i in 0..r {
                discr ^= t.mul(lambda[i], synd[r - 1 - i]);
            }
            if discr == 0 {
                prev.rotate_right(1);
                prev[0] = 0;
            } else {
                let mut next = vec![0u8; nroots + 1];
                next[0] = lambda[0];
                for i in 0..nroots {
                    next[i + 1] = lambda[i + 1] ^ t.mul(discr, prev[i]);
                }
                if 2 * el <= r - 1 {
                    el = r - el;
                    let inv = t.inv(discr);
                    for (p, &l) in prev.iter_mut().zip(lambda.iter()) {
                        *p = t.mul(l, inv);
                    }
                } else {
                    prev.rotate_right(1);
                    prev[0] = 0;
                }
                lambda = next;
            }
        }

        let deg = lambda.iter().rposition(|&c| c != 0)?;
        if deg == 0 || 2 * deg > nroots {
            return None;
        }

        // Chien search restricted to the real (non-padded) positions:
        // an error at codeword degree p has locator α^p, so Λ(α^-p) = 0
        let mut locs: Vec<i32> = Vec::with_capacity(deg);
        for p in 0..len as i32 {
            let mut acc = 0u8;
            for (i, &c) in lambda.iter().enumerate().take(deg + 1) {
                acc ^= t.mulexp(c, -(p * i as i32));
            }
            if acc == 0 {
                locs.push(p);
            }
        }
        if locs.len() != deg {
            return None;
        }

        // Forney: Ω(x) = S(x)Λ(x) mod x^nroots, then
        // e_p = α^(p(1-fcr)) · Ω(α^-p) / Λ'(α^-p)
        let mut omega = vec![0u8; nroots];
        for (i, o) in omega.iter_mut().enumerate() {
            let mut acc = 0u8;
            for j in 0..=i.min(deg) {
                acc ^= t.mul(lambda[j], synd[i - j]);
            }
            *o = acc;
        }
        for &p in &locs {
            let mut num = 0u8;
            for (i, &c) in omega.iter().enumerate() {
                num ^= t.mulexp(c, -(p * i as i32));
            }
            let mut den = 0u8;
            let mut i = 1;
            while i <= deg {
                den ^= t.mulexp(lambda[i], -(p * (i as i32 - 1)));
                i += 2;
            }
            if den == 0 {
                return None;
            }
            let e = t.mulexp(t.mul(num, t.inv(den)), p * (1 - FCR));
            data[len - 1 - p as usize] ^= e;
        }
        Some(deg)
    }
}
