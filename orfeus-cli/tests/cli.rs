use std::io::Write;

use assert_cmd::Command;
use predicates::prelude::*;

fn fixture_fasta() -> tempfile::NamedTempFile {
    let mut body = String::from("TTCTTAAGGAGGTTTTCCATG");
    for _ in 0..60 {
        body.push_str("GCTGAAAAACGT");
    }
    body.push_str("TAATTCTTATTTT");

    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, ">frag_1 synthetic fragment").unwrap();
    writeln!(file, "{body}").unwrap();
    file
}

#[test]
fn gff_output_to_stdout() {
    let fasta = fixture_fasta();
    Command::cargo_bin("orfeus")
        .unwrap()
        .args(["-i", fasta.path().to_str().unwrap(), "-p", "meta"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("##gff-version  3"))
        .stdout(predicate::str::contains("##sequence-region frag_1 1 "))
        .stdout(predicate::str::contains("\tCDS\t"));
}

#[test]
fn score_table_format() {
    let fasta = fixture_fasta();
    Command::cargo_bin("orfeus")
        .unwrap()
        .args([
            "-i",
            fasta.path().to_str().unwrap(),
            "-p",
            "meta",
            "-f",
            "scores",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Beg\tEnd\tStd\t"));
}

#[test]
fn rejects_unknown_format() {
    let fasta = fixture_fasta();
    Command::cargo_bin("orfeus")
        .unwrap()
        .args(["-i", fasta.path().to_str().unwrap(), "-f", "xml"])
        .assert()
        .failure();
}

#[test]
fn rejects_invalid_translation_table() {
    let fasta = fixture_fasta();
    Command::cargo_bin("orfeus")
        .unwrap()
        .args(["-i", fasta.path().to_str().unwrap(), "-g", "7"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unsupported translation table"));
}

#[test]
fn missing_input_fails() {
    Command::cargo_bin("orfeus")
        .unwrap()
        .args(["-i", "/nonexistent/genome.fna"])
        .assert()
        .failure();
}
