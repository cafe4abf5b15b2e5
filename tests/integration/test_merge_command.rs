//! End-to-end CLI tests for the merge command.

use std::fs;
use std::path::Path;

use tempfile::TempDir;

use crate::helpers::{path_str, read_metrics, run_famcall, sam_records};

const HEADER: &str = "@HD\tVN:1.6\tSO:queryname\n@SQ\tSN:chr1\tLN:1000\n@SQ\tSN:chr2\tLN:1000\n";

fn genome() -> String {
    "ACGTTGCAAC".repeat(30)
}

/// Mates covering 101..=150 and 141..=200 of `genome()`.
fn overlapping_pair(name: &str, right_bases: Option<&str>) -> String {
    let genome = genome();
    let left = &genome[100..150];
    let right = right_bases.map_or_else(|| genome[140..200].to_string(), str::to_string);
    format!(
        "{name}\t99\tchr1\t101\t60\t50M\t=\t141\t100\t{left}\t{}\n\
         {name}\t147\tchr1\t141\t60\t60M\t=\t101\t-100\t{right}\t{}\n",
        "?".repeat(50),
        "?".repeat(60)
    )
}

fn write_sam(path: &Path, body: &str) {
    fs::write(path, format!("{HEADER}{body}")).unwrap();
}

fn fields(line: &str) -> Vec<&str> {
    line.split('\t').collect()
}

#[test]
fn test_merge_overlapping_pair() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("in.sam");
    let output = dir.path().join("out.sam");
    let metrics = dir.path().join("merge.tsv");
    write_sam(&input, &overlapping_pair("p1", None));

    let result = run_famcall(&[
        "merge",
        "-i",
        path_str(&input),
        "-o",
        path_str(&output),
        "--metrics",
        path_str(&metrics),
    ]);
    assert!(result.status.success(), "{}", String::from_utf8_lossy(&result.stderr));

    let text = fs::read_to_string(&output).unwrap();
    assert!(text.starts_with("@HD"));
    let records = sam_records(&output);
    assert_eq!(records.len(), 1);
    let merged = fields(&records[0]);
    assert_eq!(merged[0], "p1");
    assert_eq!(merged[2], "chr1");
    assert_eq!(merged[3], "101");
    assert_eq!(merged[4], "255");
    assert_eq!(merged[5], "100M");
    assert_eq!(merged[9], &genome()[100..200]);
    assert!(merged.contains(&"MP:A:T"));

    let summary = read_metrics(&metrics);
    assert_eq!(summary["total_pairs"], "1");
    assert_eq!(summary["merged_pairs"], "1");
    assert_eq!(summary["overlapping_bases"], "10");
    assert_eq!(summary["disagreeing_bases"], "0");
}

#[test]
fn test_merge_mask_both_calls_n_at_disagreement() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("in.sam");
    let output = dir.path().join("out.sam");
    let genome = genome();
    // Reference position 145 reads T in the right mate
    let mut right = genome[140..200].to_string();
    let original = right.as_bytes()[4];
    let replacement = if original == b'T' { "A" } else { "T" };
    right.replace_range(4..5, replacement);
    write_sam(&input, &overlapping_pair("p1", Some(&right)));

    let result = run_famcall(&[
        "merge",
        "-i",
        path_str(&input),
        "-o",
        path_str(&output),
        "--disagreement",
        "mask-both",
    ]);
    assert!(result.status.success(), "{}", String::from_utf8_lossy(&result.stderr));

    let records = sam_records(&output);
    assert_eq!(records.len(), 1);
    let merged = fields(&records[0]);
    assert_eq!(merged[9].as_bytes()[44], b'N');
    assert!(merged.contains(&"DG:B:i,145"));
}

#[test]
fn test_merge_keeps_unmergeable_and_unpaired_records() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("in.sam");
    let output = dir.path().join("out.sam");
    let metrics = dir.path().join("merge.tsv");
    let body = format!(
        "apart\t65\tchr1\t101\t60\t4M\tchr2\t101\t0\tACGT\tIIII\n\
         apart\t129\tchr2\t101\t60\t4M\tchr1\t101\t0\tACGT\tIIII\n\
         {}solo\t0\tchr1\t301\t60\t4M\t*\t0\t0\tGGCC\tIIII\n",
        overlapping_pair("p1", None)
    );
    write_sam(&input, &body);

    let result = run_famcall(&[
        "merge",
        "-i",
        path_str(&input),
        "-o",
        path_str(&output),
        "--threads",
        "2",
        "--batch-size",
        "1",
        "--metrics",
        path_str(&metrics),
    ]);
    assert!(result.status.success(), "{}", String::from_utf8_lossy(&result.stderr));

    let records = sam_records(&output);
    let names: Vec<_> = records.iter().map(|r| fields(r)[0]).collect();
    assert_eq!(names, ["apart", "apart", "p1", "solo"]);
    assert!(records[0].ends_with("MP:A:F"));
    assert!(records[1].ends_with("MP:A:F"));
    assert!(records[2].contains("MP:A:T"));
    assert_eq!(fields(&records[3])[5], "4M");

    let summary = read_metrics(&metrics);
    assert_eq!(summary["total_pairs"], "2");
    assert_eq!(summary["merged_pairs"], "1");
    assert_eq!(summary["failed_different_contigs"], "1");
    assert_eq!(summary["unpaired_records"], "1");
}

#[test]
fn test_merge_missing_input_fails() {
    let dir = TempDir::new().unwrap();
    let result = run_famcall(&[
        "merge",
        "-i",
        path_str(&dir.path().join("missing.sam")),
        "-o",
        path_str(&dir.path().join("out.sam")),
    ]);
    assert!(!result.status.success());
}

/// Writes an executable stand-in for `samtools sort -n -O sam -o OUT IN` that stably sorts
/// records by name.
#[cfg(unix)]
fn fake_sorter(dir: &Path, exit_code: i32) -> std::path::PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join("sorter.sh");
    let script = format!(
        "#!/bin/sh\n{{ grep '^@' \"$7\"; grep -v '^@' \"$7\" | sort -s -k1,1; }} > \"$6\"\nexit {exit_code}\n"
    );
    fs::write(&path, script).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// Two pairs whose mates are interleaved rather than adjacent.
fn interleaved_pairs() -> String {
    let lines: Vec<String> = ["p1", "p2"]
        .iter()
        .map(|name| overlapping_pair(name, None))
        .flat_map(|pair| pair.lines().map(str::to_string).collect::<Vec<_>>())
        .collect();
    format!("{}\n{}\n{}\n{}\n", lines[0], lines[2], lines[1], lines[3])
}

#[cfg(unix)]
#[test]
fn test_merge_sorts_input_by_name_first() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("in.sam");
    let output = dir.path().join("out.sam");
    let metrics = dir.path().join("merge.tsv");
    write_sam(&input, &interleaved_pairs());
    let sorter = fake_sorter(dir.path(), 0);

    let result = run_famcall(&[
        "merge",
        "-i",
        path_str(&input),
        "-o",
        path_str(&output),
        "--name-sort-with",
        path_str(&sorter),
        "--metrics",
        path_str(&metrics),
    ]);
    assert!(result.status.success(), "{}", String::from_utf8_lossy(&result.stderr));

    let records = sam_records(&output);
    let names: Vec<_> = records.iter().map(|r| fields(r)[0]).collect();
    assert_eq!(names, ["p1", "p2"]);
    assert!(records.iter().all(|r| r.contains("MP:A:T")));
    assert_eq!(read_metrics(&metrics)["merged_pairs"], "2");
    assert!(!dir.path().join(".out.sam.by_name.sam").exists());
}

#[test]
fn test_merge_without_sort_leaves_interleaved_mates_unpaired() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("in.sam");
    let output = dir.path().join("out.sam");
    let metrics = dir.path().join("merge.tsv");
    write_sam(&input, &interleaved_pairs());

    let result = run_famcall(&[
        "merge",
        "-i",
        path_str(&input),
        "-o",
        path_str(&output),
        "--metrics",
        path_str(&metrics),
    ]);
    assert!(result.status.success(), "{}", String::from_utf8_lossy(&result.stderr));
    assert_eq!(sam_records(&output).len(), 4);
    assert_eq!(read_metrics(&metrics)["unpaired_records"], "4");
}

#[cfg(unix)]
#[test]
fn test_merge_failed_sort_names_the_command() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("in.sam");
    let output = dir.path().join("out.sam");
    write_sam(&input, &interleaved_pairs());
    let sorter = fake_sorter(dir.path(), 2);

    let result = run_famcall(&[
        "merge",
        "-i",
        path_str(&input),
        "-o",
        path_str(&output),
        "--name-sort-with",
        path_str(&sorter),
    ]);
    assert!(!result.status.success());
    let stderr = String::from_utf8_lossy(&result.stderr);
    assert!(stderr.contains("sorter.sh sort -n -O sam"), "{stderr}");
    assert!(!output.exists());
}
