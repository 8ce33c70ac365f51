use std::path::{Path, PathBuf};

/// Fake copy utility: run as `sh <script> SRC DST`, it fails for any source whose name starts
/// with "bad" after printing to both output streams, and copies with `cp -R` otherwise.
const FAKE_UTILITY: &str = r#"#!/bin/sh
case "$(basename "$1")" in
  bad*)
    echo "copying $1"
    echo "cannot copy $1" >&2
    exit 23
    ;;
esac
cp -R "$1" "$2"
"#;

pub fn setup_test_dir() -> tempfile::TempDir {
    let tmp_dir = tempfile::tempdir().unwrap();
    // src
    // |- 0.txt
    // |- bar
    //    |- 1.txt
    //    |- nested
    //       |- 2.txt
    // |- baz
    let src = tmp_dir.path().join("src");
    std::fs::create_dir_all(src.join("bar").join("nested")).unwrap();
    std::fs::create_dir(src.join("baz")).unwrap();
    std::fs::write(src.join("0.txt"), "0").unwrap();
    std::fs::write(src.join("bar").join("1.txt"), "1").unwrap();
    std::fs::write(src.join("bar").join("nested").join("2.txt"), "2").unwrap();
    tmp_dir
}

/// Writes the fake utility script into `dir` and returns its path.
pub fn fake_utility(dir: &Path) -> PathBuf {
    let script = dir.join("fake-copy.sh");
    std::fs::write(&script, FAKE_UTILITY).unwrap();
    script
}
