use std::io::Write;
use std::process::{Command, Output, Stdio};
use tempfile::NamedTempFile;

fn write_temp(content: &str, suffix: &str) -> NamedTempFile {
    let mut f = NamedTempFile::with_suffix(suffix).unwrap();
    f.write_all(content.as_bytes()).unwrap();
    f.flush().unwrap();
    f
}

fn lolkek(args: &[&str], stdin: &str) -> Output {
    let mut child = Command::new(env!("CARGO_BIN_EXE_lolkek"))
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();
    child
        .stdin
        .take()
        .unwrap()
        .write_all(stdin.as_bytes())
        .unwrap();
    child.wait_with_output().unwrap()
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

// ======================================================================
// run
// ======================================================================

#[test]
fn run_reads_console_input() {
    let src = write_temp("main() lol var x; scan(x); print(x * 2); kek", ".lk");
    let out = lolkek(&["run", src.path().to_str().unwrap()], "21\n");
    assert!(out.status.success(), "{}", stderr(&out));
    assert_eq!(
        stdout(&out),
        "# enter a value, please\n# console out: 42\n# processor: execution is finished\n"
    );
}

#[test]
fn run_rejects_wrong_extension() {
    let src = write_temp("main() lol kek", ".txt");
    let out = lolkek(&["run", src.path().to_str().unwrap()], "");
    assert!(!out.status.success());
    assert!(stderr(&out).contains("expected a .lk file"));
}

#[test]
fn errors_are_printed_with_category() {
    let src = write_temp("main() lol print(1 / 0); kek", ".lk");
    let out = lolkek(&["run", src.path().to_str().unwrap()], "");
    assert!(!out.status.success());
    assert!(
        stderr(&out).starts_with("DivisionByZeroError: "),
        "{}",
        stderr(&out)
    );
}

#[test]
fn step_limit_flag() {
    let src = write_temp("main() lol while (1) lol kek kek", ".lk");
    let out = lolkek(&["run", "--max-steps", "500", src.path().to_str().unwrap()], "");
    assert!(!out.status.success());
    assert!(stderr(&out).starts_with("LimitExceededError: "));
}

// ======================================================================
// compile / assemble / exec / disasm
// ======================================================================

#[test]
fn staged_pipeline_matches_run() {
    let src = write_temp(
        "func sq(n) lol return n * n; kek main() lol print(sq(7)); kek",
        ".lk",
    );
    let asm = NamedTempFile::with_suffix(".asm").unwrap();
    let bin = NamedTempFile::with_suffix(".bin").unwrap();
    let asm_path = asm.path().to_str().unwrap();
    let bin_path = bin.path().to_str().unwrap();

    let out = lolkek(&["compile", src.path().to_str().unwrap(), "-o", asm_path], "");
    assert!(out.status.success(), "{}", stderr(&out));
    assert!(std::fs::read_to_string(asm_path).unwrap().contains("call call_1"));

    let out = lolkek(&["assemble", asm_path, "-o", bin_path], "");
    assert!(out.status.success(), "{}", stderr(&out));

    let out = lolkek(&["exec", bin_path], "");
    assert!(out.status.success(), "{}", stderr(&out));
    assert!(stdout(&out).starts_with("# console out: 49\n"));

    let out = lolkek(&["disasm", bin_path], "");
    assert!(out.status.success());
    assert!(stdout(&out).contains("call  L"));
}

#[test]
fn failed_assembly_writes_nothing() {
    let asm = write_temp("push 1\njmp nowhere\n", ".asm");
    let dir = tempfile::tempdir().unwrap();
    let bin_path = dir.path().join("out.bin");

    let out = lolkek(
        &[
            "assemble",
            asm.path().to_str().unwrap(),
            "-o",
            bin_path.to_str().unwrap(),
        ],
        "",
    );
    assert!(!out.status.success());
    assert!(stderr(&out).starts_with("UndefinedLabelError: "));
    assert!(!bin_path.exists());
}

#[test]
fn overwrite_warning_respects_quiet() {
    let src = write_temp("main() lol print(1); kek", ".lk");
    let existing = NamedTempFile::with_suffix(".asm").unwrap();
    let src_path = src.path().to_str().unwrap();
    let out_path = existing.path().to_str().unwrap();

    let out = lolkek(&["compile", src_path, "-o", out_path], "");
    assert!(out.status.success(), "{}", stderr(&out));
    assert!(stderr(&out).contains("overwriting"), "{}", stderr(&out));

    let out = lolkek(&["--quiet", "compile", src_path, "-o", out_path], "");
    assert!(out.status.success(), "{}", stderr(&out));
    assert!(stderr(&out).is_empty(), "{}", stderr(&out));
}

#[test]
fn usage_errors_go_through_the_error_log() {
    let out = lolkek(&["--quiet", "run", "missing.txt"], "");
    assert!(!out.status.success());
    assert!(stderr(&out).contains("ERROR"), "{}", stderr(&out));
}

// ======================================================================
// Inspection
// ======================================================================

#[test]
fn tree_dump() {
    let src = write_temp("var g; main() lol print(g); kek", ".lk");
    let out = lolkek(&["tree", src.path().to_str().unwrap()], "");
    assert!(out.status.success(), "{}", stderr(&out));
    assert!(stdout(&out).starts_with("VARS 1 g"));
}

#[test]
fn tokens_plain() {
    let src = write_temp("main() lol kek", ".lk");
    let out = lolkek(&["tokens", "--no-color", src.path().to_str().unwrap()], "");
    assert!(out.status.success(), "{}", stderr(&out));
    assert!(stdout(&out).contains("main"));
    assert!(!stdout(&out).contains('\u{1b}'));
}
