//! Genetic-code registry: table validation, per-table start/stop rules,
//! and codon translation.
//!
//! Codons are addressed by their 2-bit base codes (A=0, C=1, G=2, T=3),
//! packed as `first * 16 + second * 4 + third`, matching the sequence
//! encoding so translation never round-trips through ASCII.

use crate::error::OrfeusError;

/// Default genetic code (bacterial, archaeal, plant plastid).
pub const DEFAULT_TABLE: u8 = 11;

/// Standard code (table 1) indexed by packed codon.
const STANDARD: &[u8; 64] =
    b"KNKNTTTTRSRSIIMIQHQHPPPPRRRRLLLLEDEDAAAAGGGGVVVV*Y*YSSSS*CWCLFLF";

const AAA: usize = 0;
const AGA: usize = 8;
const AGG: usize = 10;
const ATA: usize = 12;
const CTA: usize = 28;
const CTC: usize = 29;
const CTG: usize = 30;
const CTT: usize = 31;
const TAA: usize = 48;
const TAG: usize = 50;
const TCA: usize = 52;
const TGA: usize = 56;
const TTA: usize = 60;

/// True when `table` belongs to the recognized NCBI set {1-6, 9-16, 21-25}.
#[must_use]
pub const fn is_valid_table(table: u8) -> bool {
    matches!(table, 1..=6 | 9..=16 | 21..=25)
}

/// Validate an explicitly requested table.
pub fn check_table(table: u8) -> Result<u8, OrfeusError> {
    if is_valid_table(table) {
        Ok(table)
    } else {
        Err(OrfeusError::UnsupportedTable(table))
    }
}

/// Pack three 2-bit base codes into a codon index.
#[inline]
#[must_use]
pub const fn pack(b0: u8, b1: u8, b2: u8) -> usize {
    ((b0 as usize) << 4) | ((b1 as usize) << 2) | (b2 as usize)
}

/// Translate a packed codon under `table`. Stops map to `*`.
#[must_use]
pub fn translate(codon: usize, table: u8) -> char {
    let standard = STANDARD[codon & 63] as char;
    let reassigned = match table {
        2 => match codon {
            AGA | AGG => Some('*'),
            ATA => Some('M'),
            TGA => Some('W'),
            _ => None,
        },
        3 => match codon {
            ATA => Some('M'),
            CTA | CTC | CTG | CTT => Some('T'),
            TGA => Some('W'),
            _ => None,
        },
        4 => (codon == TGA).then_some('W'),
        5 => match codon {
            AGA | AGG => Some('S'),
            ATA => Some('M'),
            TGA => Some('W'),
            _ => None,
        },
        6 => matches!(codon, TAA | TAG).then_some('Q'),
        9 | 21 => match codon {
            AAA => Some('N'),
            AGA | AGG => Some('S'),
            TGA => Some('W'),
            ATA if table == 21 => Some('M'),
            _ => None,
        },
        10 => (codon == TGA).then_some('C'),
        12 => (codon == CTG).then_some('S'),
        13 => match codon {
            AGA | AGG => Some('G'),
            ATA => Some('M'),
            TGA => Some('W'),
            _ => None,
        },
        14 => match codon {
            AAA => Some('N'),
            AGA | AGG => Some('S'),
            TAA => Some('Y'),
            TGA => Some('W'),
            _ => None,
        },
        15 => (codon == TAG).then_some('Q'),
        16 => (codon == TAG).then_some('L'),
        22 => match codon {
            TCA => Some('*'),
            TAG => Some('L'),
            _ => None,
        },
        23 => (codon == TTA).then_some('*'),
        24 => match codon {
            AGA => Some('S'),
            AGG => Some('K'),
            TGA => Some('W'),
            _ => None,
        },
        25 => (codon == TGA).then_some('G'),
        _ => None,
    };
    reassigned.unwrap_or(standard)
}

/// True when the packed codon terminates translation under `table`.
#[inline]
#[must_use]
pub fn is_stop(codon: usize, table: u8) -> bool {
    translate(codon, table) == '*'
}

/// True when the packed codon can initiate translation under `table`.
///
/// ATG starts everywhere. Tables 6, 10, 14, 15, 16 and 22 admit only ATG;
/// GTG is excluded by tables 1, 3, 12 and 22; TTG by tables below 4, by 9,
/// and by 21-24.
#[must_use]
pub fn is_start(codon: usize, table: u8) -> bool {
    const ATG: usize = 14;
    const GTG: usize = 46;
    const TTG: usize = 62;
    match codon {
        ATG => true,
        _ if matches!(table, 6 | 10 | 14 | 15 | 16 | 22) => false,
        GTG => !matches!(table, 1 | 3 | 12 | 22),
        TTG => !(table < 4 || table == 9 || matches!(table, 21..=24)),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn idx(codon: &str) -> usize {
        codon
            .bytes()
            .map(|b| match b {
                b'A' => 0usize,
                b'C' => 1,
                b'G' => 2,
                b'T' => 3,
                _ => unreachable!(),
            })
            .fold(0, |acc, b| (acc << 2) | b)
    }

    #[test]
    fn valid_table_set() {
        for t in [1, 2, 6, 9, 16, 21, 25] {
            assert!(is_valid_table(t), "table {t} should be valid");
        }
        for t in [0, 7, 8, 17, 18, 19, 20, 26, 30] {
            assert!(!is_valid_table(t), "table {t} should be invalid");
        }
    }

    #[test]
    fn check_table_rejects() {
        assert!(matches!(
            check_table(7),
            Err(OrfeusError::UnsupportedTable(7))
        ));
        assert_eq!(check_table(11).unwrap(), 11);
    }

    #[test]
    fn standard_translation() {
        assert_eq!(translate(idx("ATG"), 11), 'M');
        assert_eq!(translate(idx("TGG"), 11), 'W');
        assert_eq!(translate(idx("AAA"), 11), 'K');
        assert_eq!(translate(idx("GCT"), 11), 'A');
        assert_eq!(translate(idx("TAA"), 11), '*');
        assert_eq!(translate(idx("TAG"), 11), '*');
        assert_eq!(translate(idx("TGA"), 11), '*');
    }

    #[test]
    fn reassignments() {
        assert_eq!(translate(idx("TGA"), 4), 'W');
        assert_eq!(translate(idx("TAA"), 6), 'Q');
        assert_eq!(translate(idx("TGA"), 10), 'C');
        assert_eq!(translate(idx("CTG"), 12), 'S');
        assert_eq!(translate(idx("TAG"), 16), 'L');
        assert_eq!(translate(idx("TCA"), 22), '*');
        assert_eq!(translate(idx("TTA"), 23), '*');
        assert_eq!(translate(idx("AGG"), 24), 'K');
        assert_eq!(translate(idx("TGA"), 25), 'G');
    }

    #[test]
    fn stop_rules_follow_translation() {
        assert!(is_stop(idx("TGA"), 11));
        assert!(!is_stop(idx("TGA"), 4));
        assert!(is_stop(idx("AGA"), 2));
        assert!(!is_stop(idx("TAA"), 6));
    }

    #[test]
    fn start_rules() {
        assert!(is_start(idx("ATG"), 11));
        assert!(is_start(idx("GTG"), 11));
        assert!(is_start(idx("TTG"), 11));
        assert!(!is_start(idx("GTG"), 1));
        assert!(!is_start(idx("TTG"), 9));
        assert!(!is_start(idx("GTG"), 6));
        assert!(is_start(idx("TTG"), 25));
        assert!(!is_start(idx("CTG"), 11));
    }
}
