//! Nucleotide sequence model.
//!
//! Sequences are packed four bases per byte (A=0, C=1, G=2, T=3, two bits
//! each) with a parallel unknown-base bitmap. The reverse complement is
//! materialized once at encoding time so both strands get O(1) access;
//! position `p` on the reverse strand corresponds to forward position
//! `len - 1 - p`.

use rayon::prelude::*;
use wide::{u8x32, CmpEq};

use crate::bitmap;
use crate::config::Strictness;
use crate::constants::{ENCODE_CHUNK, GC_FRAME_WINDOW, MASK_RUN_LENGTH, NUM_HEXAMERS};
use crate::error::OrfeusError;
use crate::gencode;

/// A contiguous run of unknown bases no gene may cross.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mask {
    pub begin: usize,
    pub end: usize,
}

impl Mask {
    /// True when [start, end] intersects the mask.
    #[inline]
    #[must_use]
    pub const fn overlaps(&self, start: usize, end: usize) -> bool {
        !(end < self.begin || start > self.end)
    }
}

/// One strand of a sequence, packed two bits per base.
#[derive(Debug, Clone, Default)]
pub struct PackedDna {
    data: Vec<u8>,
    len: usize,
}

impl PackedDna {
    fn with_len(len: usize) -> Self {
        Self {
            data: vec![0; len.div_ceil(4)],
            len,
        }
    }

    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// 2-bit code of the base at `pos`.
    #[inline]
    #[must_use]
    pub fn code(&self, pos: usize) -> u8 {
        (self.data[pos >> 2] >> ((pos & 3) * 2)) & 3
    }

    #[inline]
    fn put(&mut self, pos: usize, code: u8) {
        self.data[pos >> 2] |= (code & 3) << ((pos & 3) * 2);
    }

    #[inline]
    #[must_use]
    pub fn is_gc(&self, pos: usize) -> bool {
        matches!(self.code(pos), 1 | 2)
    }

    /// Big-endian k-mer index over `k` bases starting at `pos`.
    #[inline]
    #[must_use]
    pub fn kmer(&self, pos: usize, k: usize) -> usize {
        (pos..pos + k).fold(0usize, |acc, i| (acc << 2) | self.code(i) as usize)
    }

    /// Packed codon index at `pos` (see [`gencode::pack`]).
    #[inline]
    #[must_use]
    pub fn codon(&self, pos: usize) -> usize {
        self.kmer(pos, 3)
    }

    /// Start codon under `table` at `pos`? Caller keeps `pos + 2 < len`.
    #[inline]
    #[must_use]
    pub fn is_start(&self, pos: usize, table: u8) -> bool {
        gencode::is_start(self.codon(pos), table)
    }

    /// Stop codon under `table` at `pos`? Caller keeps `pos + 2 < len`.
    #[inline]
    #[must_use]
    pub fn is_stop(&self, pos: usize, table: u8) -> bool {
        gencode::is_stop(self.codon(pos), table)
    }

    /// GC fraction over the inclusive range [start, end].
    #[must_use]
    pub fn gc_fraction(&self, start: usize, end: usize) -> f64 {
        if start > end || end >= self.len {
            return 0.0;
        }
        let gc = (start..=end).filter(|&i| self.is_gc(i)).count();
        gc as f64 / (end - start + 1) as f64
    }
}

/// Spelled-out k-mer for motif labels; `len == 0` renders as "None".
#[must_use]
pub fn kmer_text(index: usize, len: usize) -> String {
    if len == 0 {
        return "None".to_string();
    }
    (0..len)
        .map(|i| {
            let code = (index >> (2 * (len - 1 - i))) & 3;
            [b'A', b'C', b'G', b'T'][code] as char
        })
        .collect()
}

/// Immutable encoded sequence: both strands plus unknown-base bookkeeping.
#[derive(Debug, Clone, Default)]
pub struct EncodedSequence {
    forward: PackedDna,
    reverse: PackedDna,
    unknown: Vec<u8>,
    masks: Vec<Mask>,
    gc: f64,
}

enum BaseClass {
    Known(u8),
    Ambiguous,
    Invalid,
}

fn classify(byte: u8) -> BaseClass {
    match byte.to_ascii_uppercase() {
        b'A' => BaseClass::Known(0),
        b'C' => BaseClass::Known(1),
        b'G' => BaseClass::Known(2),
        b'T' | b'U' => BaseClass::Known(3),
        b'R' | b'Y' | b'S' | b'W' | b'K' | b'M' | b'B' | b'D' | b'H' | b'V' | b'N' | b'-'
        | b'.' => BaseClass::Ambiguous,
        _ => BaseClass::Invalid,
    }
}

impl EncodedSequence {
    /// Encode a raw nucleotide sequence.
    ///
    /// `Strict` rejects anything but A/C/G/T/U; `Permissive` masks IUPAC
    /// ambiguity codes and gaps as unknowns and turns runs of
    /// [`MASK_RUN_LENGTH`] or more of them into hard masks. Bytes outside
    /// the recognized alphabet fail with `InvalidSequence` either way.
    pub fn encode(raw: &[u8], strictness: Strictness) -> Result<Self, OrfeusError> {
        if raw.is_empty() {
            return Err(OrfeusError::EmptyInput);
        }

        let len = raw.len();
        let mut forward = PackedDna::with_len(len);
        let mut unknown = vec![0u8; len.div_ceil(8)];
        let mut masks = Vec::new();
        let mut gc_count = 0usize;
        let mut unknown_count = 0usize;
        let mut run_start: Option<usize> = None;

        let close_run = |run_start: &mut Option<usize>, end: usize, masks: &mut Vec<Mask>| {
            if let Some(begin) = run_start.take() {
                if end - begin >= MASK_RUN_LENGTH {
                    masks.push(Mask {
                        begin,
                        end: end - 1,
                    });
                }
            }
        };

        // Bulk classification 32 bytes at a time; anything that is not a
        // plain nucleotide drops to the scalar path below.
        let a = u8x32::splat(b'A');
        let c = u8x32::splat(b'C');
        let g = u8x32::splat(b'G');
        let t = u8x32::splat(b'T');
        let u = u8x32::splat(b'U');
        let a_lc = u8x32::splat(b'a');
        let c_lc = u8x32::splat(b'c');
        let g_lc = u8x32::splat(b'g');
        let t_lc = u8x32::splat(b't');
        let u_lc = u8x32::splat(b'u');

        let chunks = len / ENCODE_CHUNK;
        let mut scalar_from = chunks * ENCODE_CHUNK;

        'bulk: for chunk in 0..chunks {
            let base = chunk * ENCODE_CHUNK;
            let mut lane = [0u8; ENCODE_CHUNK];
            lane.copy_from_slice(&raw[base..base + ENCODE_CHUNK]);
            let input = u8x32::from(lane);

            let is_a = input.cmp_eq(a) | input.cmp_eq(a_lc);
            let is_c = input.cmp_eq(c) | input.cmp_eq(c_lc);
            let is_g = input.cmp_eq(g) | input.cmp_eq(g_lc);
            let is_t =
                input.cmp_eq(t) | input.cmp_eq(t_lc) | input.cmp_eq(u) | input.cmp_eq(u_lc);
            let plain = is_a | is_c | is_g | is_t;

            if plain.move_mask() != -1 {
                // Mixed chunk: finish it (and the rest) byte by byte.
                scalar_from = base;
                break 'bulk;
            }

            let c_mask = is_c.move_mask();
            let g_mask = is_g.move_mask();
            let t_mask = is_t.move_mask();
            gc_count += (c_mask | g_mask).count_ones() as usize;
            for i in 0..ENCODE_CHUNK {
                let bit = 1i32 << i;
                let code = if c_mask & bit != 0 {
                    1
                } else if g_mask & bit != 0 {
                    2
                } else if t_mask & bit != 0 {
                    3
                } else {
                    0
                };
                forward.put(base + i, code);
            }
        }

        for (pos, &byte) in raw.iter().enumerate().skip(scalar_from) {
            match classify(byte) {
                BaseClass::Known(code) => {
                    close_run(&mut run_start, pos, &mut masks);
                    if matches!(code, 1 | 2) {
                        gc_count += 1;
                    }
                    forward.put(pos, code);
                }
                BaseClass::Ambiguous => {
                    if strictness == Strictness::Strict {
                        return Err(OrfeusError::InvalidSequence(format!(
                            "ambiguous base '{}' at position {pos} in strict mode",
                            byte as char
                        )));
                    }
                    if run_start.is_none() {
                        run_start = Some(pos);
                    }
                    unknown_count += 1;
                    forward.put(pos, 1);
                    bitmap::set(&mut unknown, pos);
                }
                BaseClass::Invalid => {
                    return Err(OrfeusError::InvalidSequence(format!(
                        "unrecognized byte 0x{byte:02x} at position {pos}"
                    )));
                }
            }
        }
        close_run(&mut run_start, len, &mut masks);

        if unknown_count == len {
            return Err(OrfeusError::EmptyInput);
        }

        let mut reverse = PackedDna::with_len(len);
        for pos in 0..len {
            let src = len - 1 - pos;
            let code = if bitmap::test(&unknown, src) {
                // Unknowns look the same from both strands.
                1
            } else {
                3 - forward.code(src)
            };
            reverse.put(pos, code);
        }

        Ok(Self {
            forward,
            reverse,
            unknown,
            masks,
            gc: gc_count as f64 / len as f64,
        })
    }

    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.forward.len()
    }

    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }

    /// Overall GC fraction.
    #[inline]
    #[must_use]
    pub const fn gc(&self) -> f64 {
        self.gc
    }

    #[inline]
    #[must_use]
    pub const fn forward(&self) -> &PackedDna {
        &self.forward
    }

    #[inline]
    #[must_use]
    pub const fn reverse(&self) -> &PackedDna {
        &self.reverse
    }

    #[must_use]
    pub fn masks(&self) -> &[Mask] {
        &self.masks
    }

    #[inline]
    #[must_use]
    pub fn is_unknown(&self, pos: usize) -> bool {
        pos < self.len() && bitmap::test(&self.unknown, pos)
    }
}

/// Most GC-rich frame per position, from a centered sliding window.
///
/// Returns one frame index (0..=2) per position, or -1 where the window is
/// undefined. Downstream the profile drives the GC-frame bias training.
#[must_use]
pub fn gc_frame_profile(dna: &PackedDna) -> Vec<i8> {
    let len = dna.len();
    if len < 3 {
        return vec![-1; len];
    }

    // Cumulative GC per frame, running left-to-right and right-to-left.
    let mut ahead = vec![0i32; len];
    let mut behind = vec![0i32; len];
    for frame in 0..3 {
        for pos in (frame..len).step_by(3) {
            let gc = i32::from(dna.is_gc(pos));
            ahead[pos] = if pos < 3 { gc } else { ahead[pos - 3] + gc };
        }
        let mut pos = frame + (len - 1 - frame) / 3 * 3;
        loop {
            let gc = i32::from(dna.is_gc(pos));
            behind[pos] = if pos + 3 >= len {
                gc
            } else {
                behind[pos + 3] + gc
            };
            if pos == frame {
                break;
            }
            pos -= 3;
        }
    }

    let half = GC_FRAME_WINDOW / 2;
    let windowed: Vec<i32> = (0..len)
        .map(|pos| {
            let mut total = ahead[pos] + behind[pos] - i32::from(dna.is_gc(pos));
            if pos >= half {
                total -= ahead[pos - half];
            }
            if pos + half < len {
                total -= behind[pos + half];
            }
            total
        })
        .collect();

    let mut profile = vec![-1i8; len];
    for triplet in (0..len.saturating_sub(2)).step_by(3) {
        let counts = [
            windowed[triplet],
            windowed[triplet + 1],
            windowed[triplet + 2],
        ];
        let best = max_frame(counts[0], counts[1], counts[2]) as i8;
        for offset in 0..3.min(len - triplet) {
            profile[triplet + offset] = best;
        }
    }
    profile
}

/// Index of the largest of three frame values; ties resolve rightward.
#[inline]
#[must_use]
pub const fn max_frame(f0: i32, f1: i32, f2: i32) -> usize {
    if f0 > f1 {
        if f0 > f2 {
            0
        } else {
            2
        }
    } else if f1 > f2 {
        1
    } else {
        2
    }
}

/// Background hexamer frequencies over both strands.
#[must_use]
pub fn background_hexamers(forward: &PackedDna, reverse: &PackedDna) -> Vec<f64> {
    let len = forward.len();
    let mut freqs = vec![0.0f64; NUM_HEXAMERS];
    if len < 6 {
        return freqs;
    }

    let positions = len - 5;
    let chunk = (positions / rayon::current_num_threads().max(1)).max(1024);
    let counts = (0..positions)
        .into_par_iter()
        .chunks(chunk)
        .map(|span| {
            let mut local = vec![0u32; NUM_HEXAMERS];
            for pos in span {
                local[forward.kmer(pos, 6)] += 1;
                local[reverse.kmer(pos, 6)] += 1;
            }
            local
        })
        .reduce(
            || vec![0u32; NUM_HEXAMERS],
            |mut acc, local| {
                for (a, l) in acc.iter_mut().zip(local) {
                    *a += l;
                }
                acc
            },
        );

    let total = (positions * 2) as f64;
    for (freq, count) in freqs.iter_mut().zip(counts) {
        *freq = f64::from(count) / total;
    }
    freqs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_round_trip() {
        let seq = EncodedSequence::encode(b"ACGTacgtU", Strictness::Strict).unwrap();
        let codes: Vec<u8> = (0..seq.len()).map(|i| seq.forward().code(i)).collect();
        assert_eq!(codes, [0, 1, 2, 3, 0, 1, 2, 3, 3]);
    }

    #[test]
    fn reverse_complement_coordinates() {
        let seq = EncodedSequence::encode(b"AACGT", Strictness::Strict).unwrap();
        // reverse complement of AACGT is ACGTT
        let rc: Vec<u8> = (0..5).map(|i| seq.reverse().code(i)).collect();
        assert_eq!(rc, [0, 1, 2, 3, 3]);
        for p in 0..5 {
            assert_eq!(seq.reverse().code(p), 3 - seq.forward().code(5 - 1 - p));
        }
    }

    #[test]
    fn gc_content() {
        let seq = EncodedSequence::encode(b"GGCCAATT", Strictness::Strict).unwrap();
        assert!((seq.gc() - 0.5).abs() < 1e-12);
        assert!((seq.forward().gc_fraction(0, 3) - 1.0).abs() < 1e-12);
        assert!((seq.forward().gc_fraction(4, 7)).abs() < 1e-12);
    }

    #[test]
    fn empty_input_rejected() {
        assert!(matches!(
            EncodedSequence::encode(b"", Strictness::Permissive),
            Err(OrfeusError::EmptyInput)
        ));
    }

    #[test]
    fn all_ambiguous_rejected() {
        assert!(matches!(
            EncodedSequence::encode(b"NNNN", Strictness::Permissive),
            Err(OrfeusError::EmptyInput)
        ));
    }

    #[test]
    fn strict_rejects_ambiguity() {
        assert!(matches!(
            EncodedSequence::encode(b"ACGTN", Strictness::Strict),
            Err(OrfeusError::InvalidSequence(_))
        ));
        assert!(EncodedSequence::encode(b"ACGTN", Strictness::Permissive).is_ok());
    }

    #[test]
    fn invalid_bytes_rejected_everywhere() {
        for mode in [Strictness::Strict, Strictness::Permissive] {
            assert!(matches!(
                EncodedSequence::encode(b"ACGT1", mode),
                Err(OrfeusError::InvalidSequence(_))
            ));
        }
    }

    #[test]
    fn unknowns_marked_and_masked() {
        let mut raw = b"ACGT".to_vec();
        raw.extend(std::iter::repeat(b'N').take(MASK_RUN_LENGTH + 2));
        raw.extend_from_slice(b"GGCC");
        let seq = EncodedSequence::encode(&raw, Strictness::Permissive).unwrap();
        assert!(seq.is_unknown(4));
        assert!(!seq.is_unknown(0));
        assert_eq!(seq.masks().len(), 1);
        assert_eq!(seq.masks()[0].begin, 4);
        assert_eq!(seq.masks()[0].end, 4 + MASK_RUN_LENGTH + 1);
    }

    #[test]
    fn short_n_runs_not_masked() {
        let seq = EncodedSequence::encode(b"ACGTNNNNACGT", Strictness::Permissive).unwrap();
        assert!(seq.masks().is_empty());
        assert!(seq.is_unknown(5));
    }

    #[test]
    fn long_sequence_uses_simd_path() {
        // > one chunk, all plain bases: exercises the bulk encoder.
        let raw: Vec<u8> = b"ACGTGGCCAATTACGTGGCCAATTACGTGGCC"
            .iter()
            .cycle()
            .take(100)
            .copied()
            .collect();
        let seq = EncodedSequence::encode(&raw, Strictness::Strict).unwrap();
        for (i, &b) in raw.iter().enumerate() {
            let expect = match b {
                b'A' => 0,
                b'C' => 1,
                b'G' => 2,
                _ => 3,
            };
            assert_eq!(seq.forward().code(i), expect, "position {i}");
        }
    }

    #[test]
    fn codon_predicates() {
        let seq = EncodedSequence::encode(b"ATGAAATAG", Strictness::Strict).unwrap();
        assert!(seq.forward().is_start(0, 11));
        assert!(!seq.forward().is_stop(0, 11));
        assert!(seq.forward().is_stop(6, 11));
    }

    #[test]
    fn kmer_indexing() {
        let seq = EncodedSequence::encode(b"ACGTCA", Strictness::Strict).unwrap();
        // ACG = 0*16 + 1*4 + 2
        assert_eq!(seq.forward().codon(0), 6);
        assert_eq!(kmer_text(6, 3), "ACG");
        assert_eq!(kmer_text(0, 0), "None");
    }

    #[test]
    fn mask_overlap() {
        let mask = Mask { begin: 10, end: 20 };
        assert!(mask.overlaps(5, 12));
        assert!(mask.overlaps(15, 18));
        assert!(!mask.overlaps(0, 9));
        assert!(!mask.overlaps(21, 30));
    }

    #[test]
    fn gc_frame_profile_shape() {
        let raw: Vec<u8> = b"GCAGCAGCAGCAGCAGCAGCAGCAGCAGCA".to_vec();
        let seq = EncodedSequence::encode(&raw, Strictness::Strict).unwrap();
        let profile = gc_frame_profile(seq.forward());
        assert_eq!(profile.len(), raw.len());
        assert!(profile.iter().all(|&f| (-1..=2).contains(&f)));
    }

    #[test]
    fn background_hexamers_normalized() {
        let raw: Vec<u8> = b"ACGTACGTACGTACGTACGTACGTACGT".to_vec();
        let seq = EncodedSequence::encode(&raw, Strictness::Strict).unwrap();
        let bg = background_hexamers(seq.forward(), seq.reverse());
        let sum: f64 = bg.iter().sum();
        assert!((sum - 1.0).abs() < 1e-9);
    }

    #[test]
    fn max_frame_ties() {
        assert_eq!(max_frame(3, 1, 0), 0);
        assert_eq!(max_frame(1, 3, 0), 1);
        assert_eq!(max_frame(1, 0, 3), 2);
        assert_eq!(max_frame(2, 2, 1), 1);
    }
}
