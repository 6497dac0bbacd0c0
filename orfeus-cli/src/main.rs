//! Command-line front end: FASTA in, gene predictions out.
//!
//! ```bash
//! # Single-genome prediction, GFF to stdout
//! orfeus -i genome.fna
//!
//! # Metagenomic fragments, per-gene score table to a file
//! orfeus -i contigs.fna -p meta -f scores -o contigs.tsv
//! ```

use std::fs::File;
use std::io::{self, BufWriter, Write};

use bio::io::fasta;
use clap::{Arg, ArgAction, Command};
use orfeus_core::{FinderConfig, GeneFinder, Mode, Strictness};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let matches = Command::new("orfeus")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Prokaryotic gene finder")
        .arg(
            Arg::new("input")
                .short('i')
                .long("input")
                .value_name("FILE")
                .required(true)
                .help("Input FASTA file"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("FILE")
                .help("Output file (default: stdout)"),
        )
        .arg(
            Arg::new("format")
                .short('f')
                .long("format")
                .value_name("FORMAT")
                .default_value("gff")
                .help("Output format: gff or scores"),
        )
        .arg(
            Arg::new("mode")
                .short('p')
                .long("mode")
                .value_name("MODE")
                .default_value("single")
                .help("Prediction mode: single or meta"),
        )
        .arg(
            Arg::new("table")
                .short('g')
                .long("translation-table")
                .value_name("TABLE")
                .help("Genetic code (1-6, 9-16, 21-25)"),
        )
        .arg(
            Arg::new("closed")
                .short('c')
                .long("closed")
                .action(ArgAction::SetTrue)
                .help("Closed ends: no genes running off the edges"),
        )
        .arg(
            Arg::new("strict")
                .long("strict")
                .action(ArgAction::SetTrue)
                .help("Reject ambiguous nucleotides instead of masking them"),
        )
        .get_matches();

    let mode = match matches.get_one::<String>("mode").unwrap().as_str() {
        "single" => Mode::Single,
        "meta" => Mode::Meta,
        other => return Err(format!("unknown mode '{other}'").into()),
    };
    let format = matches.get_one::<String>("format").unwrap().as_str();
    if !matches!(format, "gff" | "scores") {
        return Err(format!("unknown format '{format}'").into());
    }

    let translation_table = matches
        .get_one::<String>("table")
        .map(|t| t.parse::<u8>())
        .transpose()
        .map_err(|_| "translation table must be a number")?;

    let config = FinderConfig {
        mode,
        closed_ends: matches.get_flag("closed"),
        strictness: if matches.get_flag("strict") {
            Strictness::Strict
        } else {
            Strictness::Permissive
        },
        translation_table,
        ..FinderConfig::default()
    };
    let finder = GeneFinder::new(config)?;

    let input = matches.get_one::<String>("input").unwrap();
    let reader = fasta::Reader::new(File::open(input)?);

    let mut writer: Box<dyn Write> = match matches.get_one::<String>("output") {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(BufWriter::new(io::stdout())),
    };

    let mut total = 0usize;
    let mut sequences = 0usize;
    for record in reader.records() {
        let record = record?;
        let sequence = std::str::from_utf8(record.seq())?;
        let genes = finder.find_genes(sequence)?;

        match format {
            "gff" => genes.write_gff(&mut writer, record.id())?,
            _ => genes.write_scores(&mut writer, record.id())?,
        }

        total += genes.len();
        sequences += 1;
    }
    writer.flush()?;

    eprintln!("{total} genes in {sequences} sequence(s)");
    Ok(())
}
