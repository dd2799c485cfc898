//! Integration tests for the `tessera` binary

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

#[test]
fn test_version_flag() {
    let mut cmd = cargo_bin_cmd!("tessera");
    cmd.arg("--version");

    cmd.assert()
        .success()
        .stdout(predicate::str::starts_with("tessera "));
}

#[test]
fn test_missing_input_is_usage_error() {
    let mut cmd = cargo_bin_cmd!("tessera");
    cmd.env_remove("TESSERACT_CMD");

    cmd.assert().code(2);
}

#[test]
fn test_unknown_mode_is_usage_error() {
    let mut cmd = cargo_bin_cmd!("tessera");
    cmd.args(["--mode", "braille", "page.png"]);

    cmd.assert().code(2);
}

#[test]
fn test_unreadable_input_file() {
    let dir = tempfile::tempdir().unwrap();
    let mut cmd = cargo_bin_cmd!("tessera");
    cmd.arg(dir.path().join("missing.png"));

    cmd.assert()
        .code(1)
        .stderr(predicate::str::contains("cannot open"));
}

#[test]
fn test_engine_not_installed() {
    let dir = tempfile::tempdir().unwrap();
    let page = dir.path().join("page.png");
    image::RgbImage::new(8, 8).save(&page).unwrap();

    let mut cmd = cargo_bin_cmd!("tessera");
    cmd.arg("--tesseract-cmd")
        .arg(dir.path().join("no-such-tesseract"))
        .arg(&page);

    cmd.assert()
        .code(1)
        .stderr(predicate::str::contains("is not installed or it's not in your PATH"));
}

#[cfg(unix)]
mod with_stub_engine {
    use super::*;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use std::path::{Path, PathBuf};

    const KNOWN_TEXT: &str = "first line\nsecond line\nthird line";

    struct Stub {
        dir: tempfile::TempDir,
        page: PathBuf,
    }

    impl Stub {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            let log = dir.path().join("args.log");
            let script = format!(
                r#"#!/bin/sh
if [ "$1" = "--version" ]; then
  echo "tesseract 5.3.0"
  exit 0
fi
if [ "$1" = "--list-langs" ]; then
  echo 'List of available languages in "/usr/share/tessdata/" (2):'
  echo eng
  echo osd
  exit 0
fi
base="$2"
printf '%s\n' "$@" > "{log}"
for arg in "$@"; do
  case "$arg" in
    txt) printf '{text}' > "$base.txt" ;;
    osd) printf 'Orientation in degrees: 90\nRotate: 270\nScript: Cyrillic\n' > "$base.osd" ;;
    pdf) printf '%%PDF-1.5' > "$base.pdf" ;;
  esac
done
"#,
                log = log.display(),
                text = KNOWN_TEXT.replace('\n', "\\n"),
            );
            let engine = dir.path().join("tesseract");
            fs::write(&engine, script).unwrap();
            fs::set_permissions(&engine, fs::Permissions::from_mode(0o755)).unwrap();

            let page = dir.path().join("page.png");
            image::RgbImage::new(16, 8).save(&page).unwrap();

            Stub { dir, page }
        }

        fn engine(&self) -> PathBuf {
            self.dir.path().join("tesseract")
        }

        fn args(&self) -> Vec<String> {
            fs::read_to_string(self.dir.path().join("args.log"))
                .unwrap()
                .lines()
                .map(str::to_string)
                .collect()
        }

        fn cmd(&self) -> assert_cmd::Command {
            let mut cmd = cargo_bin_cmd!("tessera");
            cmd.env("TESSERACT_CMD", self.engine());
            cmd
        }

        fn page(&self) -> &Path {
            &self.page
        }
    }

    #[test]
    fn test_prints_recognized_text() {
        let stub = Stub::new();
        let mut cmd = stub.cmd();
        cmd.arg(stub.page());

        cmd.assert()
            .success()
            .stdout(format!("{}\n", KNOWN_TEXT));
    }

    #[test]
    fn test_lang_and_config_reach_engine() {
        let stub = Stub::new();
        let mut cmd = stub.cmd();
        cmd.args(["-l", "eng", "-c", "--psm 6"]).arg(stub.page());

        cmd.assert().success();
        assert_eq!(&stub.args()[2..], ["-l", "eng", "--psm", "6", "txt"]);
    }

    #[test]
    fn test_tesseract_cmd_flag_overrides_env() {
        let stub = Stub::new();
        let mut cmd = cargo_bin_cmd!("tessera");
        cmd.env("TESSERACT_CMD", stub.dir.path().join("nothing-here"))
            .arg("--tesseract-cmd")
            .arg(stub.engine())
            .arg(stub.page());

        cmd.assert().success();
    }

    #[test]
    fn test_osd_as_json() {
        let stub = Stub::new();
        let mut cmd = stub.cmd();
        cmd.args(["--mode", "osd", "--json"]).arg(stub.page());

        let output = cmd.assert().success().get_output().stdout.clone();
        let value: serde_json::Value = serde_json::from_slice(&output).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"orientation": 90, "rotate": 270, "script": "Cyrillic"})
        );
        assert!(stub.args().contains(&"osd".to_string()));
    }

    #[test]
    fn test_pdf_written_as_raw_bytes() {
        let stub = Stub::new();
        let mut cmd = stub.cmd();
        cmd.args(["--mode", "pdf"]).arg(stub.page());

        cmd.assert().success().stdout("%PDF-1.5");
    }

    #[test]
    fn test_list_langs() {
        let stub = Stub::new();
        let mut cmd = stub.cmd();
        cmd.arg("--list-langs");

        cmd.assert().success().stdout("eng\nosd\n");
    }

    #[test]
    fn test_engine_version() {
        let stub = Stub::new();
        let mut cmd = stub.cmd();
        cmd.arg("--engine-version");

        cmd.assert().success().stdout("tesseract 5.3.0\n");
    }
}
