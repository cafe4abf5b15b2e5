//! End-to-end CLI tests for the rescue command.

use std::path::Path;

use tempfile::TempDir;

use crate::helpers::{path_str, read_fastq, read_metrics, run_famcall, write_fastq};

fn write_index(path: &Path) {
    let mut heads = Vec::new();
    for i in 0..12 {
        heads.push((format!("i{i}"), "AAAAA"));
    }
    heads.push(("j0".to_string(), "AAAAT"));
    heads.push(("k0".to_string(), "GGGGG"));
    let records: Vec<_> = heads.iter().map(|(h, s)| (h.as_str(), *s, "IIIII")).collect();
    write_fastq(path, &records);
}

#[test]
fn test_rescue_rewrites_near_miss_barcodes() {
    let dir = TempDir::new().unwrap();
    let index = dir.path().join("index.fq");
    let input = dir.path().join("reads.fq");
    let output = dir.path().join("rescued.fq");
    let metrics = dir.path().join("rescue.tsv");
    write_index(&index);
    write_fastq(
        &input,
        &[
            ("near 1:N:0 |BS=AAAAT", "ACGT", "IIII"),
            ("exact |BS=AAAAA", "ACGT", "IIII"),
            ("far |BS=CCCCC", "ACGT", "IIII"),
            ("bare", "ACGT", "IIII"),
        ],
    );

    let result = run_famcall(&[
        "rescue",
        "--index",
        path_str(&index),
        "-i",
        path_str(&input),
        "-o",
        path_str(&output),
        "--min-family-size",
        "10",
        "--metrics",
        path_str(&metrics),
    ]);
    assert!(result.status.success(), "{}", String::from_utf8_lossy(&result.stderr));

    let reads = read_fastq(&output);
    assert_eq!(reads.len(), 4);
    assert_eq!(reads[0].name, "near");
    assert_eq!(reads[0].comment, "1:N:0 ");
    assert_eq!(reads[0].barcode(), Some("AAAAA"));
    assert_eq!(reads[0].tags.rc, Some(1));
    assert_eq!(reads[1].barcode(), Some("AAAAA"));
    assert_eq!(reads[1].tags.rc, None);
    assert_eq!(reads[2].barcode(), Some("CCCCC"));
    assert_eq!(reads[2].tags.rc, Some(0));
    assert_eq!(reads[3].barcode(), None);

    let summary = read_metrics(&metrics);
    assert_eq!(summary["index_reads"], "14");
    assert_eq!(summary["distinct_barcodes"], "3");
    assert_eq!(summary["true_barcodes"], "1");
    assert_eq!(summary["total_reads"], "4");
    assert_eq!(summary["rescued_reads"], "1");
    assert_eq!(summary["true_reads"], "1");
    assert_eq!(summary["unassigned_reads"], "1");
    assert_eq!(summary["reads_without_barcode"], "1");
}

#[test]
fn test_rescue_rejects_too_many_mismatches() {
    let dir = TempDir::new().unwrap();
    let index = dir.path().join("index.fq");
    let input = dir.path().join("reads.fq");
    write_index(&index);
    write_fastq(&input, &[("r |BS=AAAAA", "ACGT", "IIII")]);

    let result = run_famcall(&[
        "rescue",
        "--index",
        path_str(&index),
        "-i",
        path_str(&input),
        "-o",
        path_str(&dir.path().join("out.fq")),
        "--max-mismatches",
        "4",
    ]);
    assert!(!result.status.success());
    assert!(String::from_utf8_lossy(&result.stderr).contains("max-mismatches"));
}
