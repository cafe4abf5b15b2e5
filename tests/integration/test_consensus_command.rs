//! End-to-end CLI tests for the consensus command.

use tempfile::TempDir;

use crate::helpers::{path_str, read_fastq, read_metrics, run_famcall, write_fastq};

fn grouped_reads() -> Vec<(&'static str, &'static str, &'static str)> {
    vec![
        ("a1 1:N:0 |BS=AAAA", "ACGTAC", "??????"),
        ("a2 1:N:0 |BS=AAAA", "ACGTAC", "??????"),
        ("a3 1:N:0 |BS=AAAA", "ACGTAC", "??????"),
        ("b1 1:N:0 |BS=CCCC", "TTGGCA", "IIIIII"),
        ("c1 1:N:0 |BS=GGGG", "AAAAAA", "??????"),
        ("c2 1:N:0 |BS=GGGG", "CCCCCC", "??????"),
    ]
}

#[test]
fn test_consensus_fisher_writes_one_read_per_family() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("grouped.fq");
    let output = dir.path().join("consensus.fq");
    let metrics = dir.path().join("metrics.tsv");
    let sizes = dir.path().join("sizes.tsv");
    write_fastq(&input, &grouped_reads());

    let result = run_famcall(&[
        "consensus",
        "-i",
        path_str(&input),
        "-o",
        path_str(&output),
        "--metrics",
        path_str(&metrics),
        "--family-sizes",
        path_str(&sizes),
    ]);
    assert!(result.status.success(), "{}", String::from_utf8_lossy(&result.stderr));

    let reads = read_fastq(&output);
    let names: Vec<_> = reads.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, ["a1", "b1", "c1"]);

    let agreeing = &reads[0];
    assert_eq!(agreeing.bases, b"ACGTAC");
    assert_eq!(agreeing.tags.fm, Some(3));
    assert_eq!(agreeing.tags.nd, Some(0));
    assert_eq!(agreeing.tags.fa, vec![3; 6]);
    assert_eq!(agreeing.tags.pv.len(), 6);
    assert!(agreeing.qualities.iter().all(|&q| q > 30));

    let single = &reads[1];
    assert_eq!(single.bases, b"TTGGCA");
    assert_eq!(single.qualities, vec![40; 6]);
    assert_eq!(single.tags.fm, Some(1));

    let split = &reads[2];
    assert_eq!(split.tags.fm, Some(2));
    assert_eq!(split.tags.nd, Some(6));

    let summary = read_metrics(&metrics);
    assert_eq!(summary["total_input_reads"], "6");
    assert_eq!(summary["families"], "3");
    assert_eq!(summary["single_read_families"], "1");
    assert_eq!(summary["max_family_size"], "3");

    let histogram = std::fs::read_to_string(&sizes).unwrap();
    assert_eq!(histogram.lines().count(), 4);
}

#[test]
fn test_consensus_fast_masks_discordant_family() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("grouped.fq");
    let output = dir.path().join("consensus.fq");
    let metrics = dir.path().join("metrics.tsv");
    write_fastq(&input, &grouped_reads());

    let result = run_famcall(&[
        "consensus",
        "-i",
        path_str(&input),
        "-o",
        path_str(&output),
        "--algorithm",
        "fast",
        "--metrics",
        path_str(&metrics),
    ]);
    assert!(result.status.success(), "{}", String::from_utf8_lossy(&result.stderr));

    let reads = read_fastq(&output);
    assert_eq!(reads.len(), 3);
    assert!(reads[0].qualities.iter().all(|&q| q > 0));
    assert!(reads[2].qualities.iter().all(|&q| q == 0));
    assert_eq!(read_metrics(&metrics)["masked_families"], "1");
}

#[test]
fn test_consensus_output_order_is_stable_across_threads() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("grouped.fq");
    let barcodes: Vec<String> =
        (0..200).map(|i| format!("{i:08b}").replace('0', "A").replace('1', "C")).collect();
    let heads: Vec<String> = barcodes
        .iter()
        .enumerate()
        .flat_map(|(i, bc)| (0..2).map(move |j| format!("r{i}_{j} |BS={bc}")))
        .collect();
    let records: Vec<_> = heads.iter().map(|h| (h.as_str(), "ACGTACGT", "IIIIIIII")).collect();
    write_fastq(&input, &records);

    let single = dir.path().join("single.fq");
    let threaded = dir.path().join("threaded.fq");
    for (output, threads) in [(&single, "1"), (&threaded, "4")] {
        let result = run_famcall(&[
            "consensus",
            "-i",
            path_str(&input),
            "-o",
            path_str(output),
            "--threads",
            threads,
            "--batch-size",
            "7",
        ]);
        assert!(result.status.success(), "{}", String::from_utf8_lossy(&result.stderr));
    }

    let expected = std::fs::read_to_string(&single).unwrap();
    assert_eq!(std::fs::read_to_string(&threaded).unwrap(), expected);
    assert_eq!(read_fastq(&single).len(), 200);
}

#[test]
fn test_consensus_rejects_read_without_barcode() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("grouped.fq");
    let output = dir.path().join("consensus.fq");
    write_fastq(&input, &[("a1 |BS=AAAA", "ACGT", "IIII"), ("orphan", "ACGT", "IIII")]);

    let result = run_famcall(&["consensus", "-i", path_str(&input), "-o", path_str(&output)]);
    assert!(!result.status.success());
    assert!(String::from_utf8_lossy(&result.stderr).contains("orphan"));
}

#[test]
fn test_consensus_rejects_inverted_agreement_fractions() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("grouped.fq");
    write_fastq(&input, &[("a1 |BS=AAAA", "ACGT", "IIII")]);

    let result = run_famcall(&[
        "consensus",
        "-i",
        path_str(&input),
        "-o",
        path_str(&dir.path().join("out.fq")),
        "--min-agreement-fraction",
        "0.8",
        "--max-agreement-fraction",
        "0.5",
    ]);
    assert!(!result.status.success());
    assert!(!dir.path().join("out.fq").exists());
}
