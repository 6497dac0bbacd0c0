use crate::constants::MIN_GENE_LENGTH;

/// Operating mode of the finder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Train statistics on each input sequence (complete genomes).
    #[default]
    Single,
    /// Score against the precomputed table bank (fragments, mixed samples).
    Meta,
}

/// How the encoder treats bytes outside A/C/G/T/U.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Strictness {
    /// Only unambiguous nucleotides are accepted.
    Strict,
    /// IUPAC ambiguity codes and gaps are masked as unknowns.
    #[default]
    Permissive,
}

/// Configuration for one [`GeneFinder`](crate::GeneFinder).
#[derive(Debug, Clone)]
pub struct FinderConfig {
    /// Training mode.
    pub mode: Mode,
    /// Forbid genes running off the sequence boundaries.
    pub closed_ends: bool,
    /// Encoding strictness.
    pub strictness: Strictness,
    /// Explicit genetic code; `None` lets the mode decide (single mode
    /// defaults to table 11, meta mode resolves the table ambiguity).
    pub translation_table: Option<u8>,
    /// Minimum ORF length in nucleotides.
    pub min_gene_length: usize,
}

impl Default for FinderConfig {
    fn default() -> Self {
        Self {
            mode: Mode::Single,
            closed_ends: false,
            strictness: Strictness::Permissive,
            translation_table: None,
            min_gene_length: MIN_GENE_LENGTH,
        }
    }
}

impl FinderConfig {
    /// Meta-mode configuration with the remaining fields defaulted.
    #[must_use]
    pub fn meta() -> Self {
        Self {
            mode: Mode::Meta,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = FinderConfig::default();
        assert_eq!(config.mode, Mode::Single);
        assert!(!config.closed_ends);
        assert_eq!(config.strictness, Strictness::Permissive);
        assert_eq!(config.translation_table, None);
        assert_eq!(config.min_gene_length, MIN_GENE_LENGTH);
    }

    #[test]
    fn meta_shortcut() {
        assert_eq!(FinderConfig::meta().mode, Mode::Meta);
    }
}
