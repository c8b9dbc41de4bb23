use std::path::PathBuf;
use std::process::Command;

fn bin_path() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_sheetpick"))
}

#[test]
fn cli_fails_and_names_the_missing_setting_when_params_are_empty() {
    let output = Command::new(bin_path())
        .args(["--cli", "--params", ""])
        .output()
        .expect("run cli");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("SpreadsheetId"));
}

#[test]
fn cli_fails_when_spreadsheet_id_is_blank() {
    let output = Command::new(bin_path())
        .args(["--cli", "--params", "SpreadsheetId=%20%20&SheetName=Data"])
        .output()
        .expect("run cli");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("missing required settings"));
    assert!(stderr.contains("SpreadsheetId"));
}
