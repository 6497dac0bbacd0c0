//! Meta-mode model bank: precomputed models per GC bucket and candidate
//! translation table.
//!
//! Bank models are synthesized from the bucket GC rather than trained:
//! coding bias is expressed through wobble-position GC skew against the
//! uniform background, start and RBS weights follow the canonical
//! prokaryotic profile. The bank is built once per process and shared
//! read-only; callers receive it explicitly instead of reaching for a
//! global.

use std::borrow::Cow;
use std::sync::OnceLock;

use crate::constants::{
    BANK_GC_MAX, BANK_GC_MIN, BANK_TABLES, HEXAMER_SCORE_MIN, NUM_HEXAMERS, NUM_RBS_CLASSES,
};
use crate::gencode;
use crate::model::TrainingModel;

/// Canonical Shine-Dalgarno class weights: stronger, better-placed motifs
/// score higher; class 0 is "no RBS".
const CANONICAL_RBS_WEIGHTS: [f64; NUM_RBS_CLASSES] = [
    -1.2, -0.6, -0.8, -0.7, -0.4, 0.0, -0.3, -0.2, 0.2, 0.1, 0.3, 0.6, 0.4, 0.8, 0.5, 1.1, 1.3,
    0.7, 0.9, 1.0, 1.4, 1.5, 1.7, 1.6, 1.9, 1.8, 2.1, 2.4,
];

/// Canonical start preferences [ATG, GTG, TTG].
const CANONICAL_START_WEIGHTS: [f64; 3] = [0.71, -0.37, -1.12];

/// One bank: all (GC bucket x table) models.
#[derive(Debug)]
pub struct TableBank {
    entries: Vec<TrainingModel>,
}

static GLOBAL_BANK: OnceLock<TableBank> = OnceLock::new();

impl TableBank {
    /// Build the full bank. Prefer [`TableBank::global`] unless a private
    /// copy is really needed.
    #[must_use]
    pub fn build() -> Self {
        let mut entries = Vec::new();
        for gc_percent in BANK_GC_MIN..=BANK_GC_MAX {
            for &table in &BANK_TABLES {
                entries.push(synthesize(f64::from(gc_percent) / 100.0, table));
            }
        }
        Self { entries }
    }

    /// The process-wide bank, built on first use.
    #[must_use]
    pub fn global() -> &'static Self {
        GLOBAL_BANK.get_or_init(Self::build)
    }

    /// Candidate models for a sequence of the given GC fraction: one per
    /// candidate translation table, from the nearest bucket.
    pub fn candidates(&self, gc: f64) -> impl Iterator<Item = &TrainingModel> {
        let bucket = bucket_for(gc);
        self.entries
            .iter()
            .filter(move |m| (m.gc * 100.0).round() as u8 == bucket)
    }

    /// The bank model for one (GC, table) pair; used as the fallback when
    /// single-mode training has too little data, or when an explicitly
    /// requested table has no precomputed entry (synthesized on demand).
    #[must_use]
    pub fn fallback(&self, gc: f64, table: u8) -> Cow<'_, TrainingModel> {
        match self.candidates(gc).find(|m| m.translation_table == table) {
            Some(model) => Cow::Borrowed(model),
            None => Cow::Owned(synthesize(
                f64::from(bucket_for(gc)) / 100.0,
                table,
            )),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn bucket_for(gc: f64) -> u8 {
    let percent = (gc * 100.0).round();
    percent.clamp(f64::from(BANK_GC_MIN), f64::from(BANK_GC_MAX)) as u8
}

/// Build one synthetic model for a GC bucket and table.
fn synthesize(gc: f64, table: u8) -> TrainingModel {
    let mut model = TrainingModel {
        gc,
        translation_table: table,
        uses_sd: true,
        start_weights: CANONICAL_START_WEIGHTS,
        rbs_weights: Box::new(CANONICAL_RBS_WEIGHTS),
        ..TrainingModel::default()
    };

    // Coding wobble GC is more extreme than the genome background; the
    // hexamer log-odds reduce to the two wobble positions because the
    // other four cancel against the background.
    let wobble = (0.5 + (gc - 0.5) * 1.6).clamp(0.1, 0.9);
    let base_odds = |code: usize| -> f64 {
        let background = if code == 1 || code == 2 {
            gc / 2.0
        } else {
            (1.0 - gc) / 2.0
        };
        let coding = if code == 1 || code == 2 {
            wobble / 2.0
        } else {
            (1.0 - wobble) / 2.0
        };
        (coding / background).ln()
    };

    for index in 0..NUM_HEXAMERS {
        let first_codon = index >> 6;
        if gencode::is_stop(first_codon, table) {
            // Hexamers opening on a stop never occur inside a gene.
            model.hexamers[index] = HEXAMER_SCORE_MIN;
            continue;
        }
        let wobble1 = (index >> 6) & 3;
        let wobble2 = index & 3;
        model.hexamers[index] = base_odds(wobble1) + base_odds(wobble2);
    }

    model
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bank_covers_every_bucket_and_table() {
        let bank = TableBank::build();
        let buckets = usize::from(BANK_GC_MAX - BANK_GC_MIN) + 1;
        assert_eq!(bank.len(), buckets * BANK_TABLES.len());
    }

    #[test]
    fn candidates_match_bucket() {
        let bank = TableBank::build();
        let models: Vec<_> = bank.candidates(0.52).collect();
        assert_eq!(models.len(), BANK_TABLES.len());
        for model in &models {
            assert!((model.gc - 0.52).abs() < 1e-9);
        }
        let tables: Vec<u8> = models.iter().map(|m| m.translation_table).collect();
        assert!(tables.contains(&11));
        assert!(tables.contains(&4));
    }

    #[test]
    fn extreme_gc_clamps_to_range() {
        let bank = TableBank::build();
        assert_eq!(bank.candidates(0.05).count(), BANK_TABLES.len());
        assert_eq!(bank.candidates(0.95).count(), BANK_TABLES.len());
    }

    #[test]
    fn stop_hexamers_are_floored() {
        let bank = TableBank::build();
        let model = bank.fallback(0.5, 11);
        // TAA-opening hexamer: TAA = 48, any trailing codon.
        let taa_lead = (48 << 6) | 7;
        assert_eq!(model.hexamers[taa_lead], HEXAMER_SCORE_MIN);
        // TGA is not a stop under table 4, so its hexamers score normally.
        let table4 = bank.fallback(0.5, 4);
        let tga_lead = (56 << 6) | 7;
        assert!(table4.hexamers[tga_lead] > HEXAMER_SCORE_MIN);
    }

    #[test]
    fn global_bank_is_shared() {
        let a = TableBank::global() as *const TableBank;
        let b = TableBank::global() as *const TableBank;
        assert_eq!(a, b);
    }

    #[test]
    fn gc_rich_bucket_prefers_gc_wobble() {
        let bank = TableBank::build();
        let model = bank.fallback(0.65, 11);
        // GCG GCG (all-GC wobbles) must outscore GCA GCA under high GC.
        let gcg = (2 << 4) | (1 << 2) | 2;
        let gca = (2 << 4) | (1 << 2);
        assert!(model.hexamers[(gcg << 6) | gcg] > model.hexamers[(gca << 6) | gca]);
    }
}
