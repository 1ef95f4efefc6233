use assert_cmd::{Command, cargo::cargo_bin_cmd};
use std::path::Path;
use std::process::Output;

pub fn phantom_cmd() -> Command {
    cargo_bin_cmd!("phantom")
}

pub fn path_str(path: &Path) -> &str {
    path.to_str().expect("temp paths should be UTF-8")
}

/// Runs a plain hashing pass over `root` and returns its output.
pub fn hash_output(root: &Path, args: &[&str]) -> Output {
    let mut cmd = phantom_cmd();
    cmd.args(args).arg(root);
    cmd.output().expect("failed to run `phantom`")
}

// Each integration test file is compiled as its own crate. Only the
// comparison tests write reference files, so this helper is unused elsewhere.
#[allow(dead_code)]
pub fn write_reference(root: &Path, reference: &Path) {
    let output = hash_output(root, &[]);
    assert!(output.status.success(), "hashing pass failed: {output:?}");
    std::fs::write(reference, &output.stdout).expect("failed to write reference file");
}

#[allow(dead_code)]
pub fn stdout_lines(output: &Output) -> Vec<String> {
    std::str::from_utf8(&output.stdout)
        .expect("stdout should be UTF-8")
        .lines()
        .map(str::to_string)
        .collect()
}
