//! Helper utilities for integration tests.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use famcall_lib::consensus::ReadRecord;
use famcall_lib::fastq::FastqReads;

/// Runs `famcall` with the given arguments and returns its output.
pub fn run_famcall(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_famcall"))
        .args(args)
        .output()
        .expect("Failed to run famcall")
}

/// Writes FASTQ records given as `(head, bases, qualities)`.
pub fn write_fastq(path: &Path, records: &[(&str, &str, &str)]) {
    let mut text = String::new();
    for (head, bases, quals) in records {
        text.push_str(&format!("@{head}\n{bases}\n+\n{quals}\n"));
    }
    fs::write(path, text).expect("Failed to write FASTQ");
}

pub fn read_fastq(path: &Path) -> Vec<ReadRecord> {
    FastqReads::from_path(path)
        .expect("Failed to open FASTQ")
        .collect::<anyhow::Result<Vec<_>>>()
        .expect("Failed to parse FASTQ")
}

/// Reads a single-row metrics TSV into a column-to-value map.
pub fn read_metrics(path: &Path) -> HashMap<String, String> {
    let text = fs::read_to_string(path).expect("Failed to read metrics");
    let mut lines = text.lines();
    let header = lines.next().expect("Metrics file is empty");
    let row = lines.next().expect("Metrics file has no data row");
    header.split('\t').map(str::to_string).zip(row.split('\t').map(str::to_string)).collect()
}

/// Alignment lines of a SAM file, header excluded.
pub fn sam_records(path: &Path) -> Vec<String> {
    fs::read_to_string(path)
        .expect("Failed to read SAM")
        .lines()
        .filter(|line| !line.starts_with('@'))
        .map(str::to_string)
        .collect()
}

pub fn path_str(path: &Path) -> &str {
    path.to_str().unwrap()
}
