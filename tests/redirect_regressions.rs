use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};

fn run_shell_with_env(lines: &[&str], env: &[(&str, &str)]) -> std::process::Output {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_psh"));
    for (key, value) in env {
        cmd.env(key, value);
    }
    let mut child = cmd
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn psh");

    {
        let stdin = child.stdin.as_mut().expect("stdin");
        for line in lines {
            writeln!(stdin, "{line}").expect("write line");
        }
        writeln!(stdin, "exit").expect("write exit");
    }

    child.wait_with_output().expect("wait output")
}

fn run_shell(lines: &[&str]) -> std::process::Output {
    run_shell_with_env(lines, &[])
}

/// Fresh scratch directory per test, cleaned up by the caller.
fn temp_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("psh_redirect_{}_{}", name, std::process::id()));
    std::fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

#[test]
fn output_redirect_truncates_on_rerun() {
    let dir = temp_dir("truncate");
    let out = dir.join("out.txt");
    let cmd = format!("echo abc > {}", out.display());

    let output = run_shell(&[cmd.as_str(), cmd.as_str()]);

    assert!(output.status.success(), "shell did not exit cleanly");
    assert_eq!(std::fs::read_to_string(&out).unwrap(), "abc\n");
    let _ = std::fs::remove_dir_all(&dir);
}

#[cfg(unix)]
#[test]
fn external_command_honors_both_redirections() {
    let dir = temp_dir("both");
    let input = dir.join("in.txt");
    let out = dir.join("out.txt");
    std::fs::write(&input, "hello\n").unwrap();

    let cmd = format!("wc -c < {} > {}", input.display(), out.display());
    let output = run_shell(&[cmd.as_str()]);

    assert!(output.status.success(), "shell did not exit cleanly");
    let contents = std::fs::read_to_string(&out).unwrap();
    assert_eq!(contents.trim(), "6", "out.txt was: {contents}");
    let _ = std::fs::remove_dir_all(&dir);
}

#[cfg(unix)]
#[test]
fn input_redirect_wins_over_pipe() {
    let dir = temp_dir("precedence");
    let data = dir.join("data.txt");
    std::fs::write(&data, "FILE-CONTENT\n").unwrap();

    let cmd = format!("echo PIPE-CONTENT | cat < {}", data.display());
    let output = run_shell(&[cmd.as_str()]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(stdout.contains("FILE-CONTENT"), "stdout was: {stdout}");
    assert!(!stdout.contains("PIPE-CONTENT"), "stdout was: {stdout}");
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn builtin_redirect_leaves_shell_stdout_alone() {
    let dir = temp_dir("restore");
    let out = dir.join("out.txt");
    let cmd = format!("pwd > {}", out.display());

    let output = run_shell(&[cmd.as_str(), "echo AFTER-MARKER"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    let file = std::fs::read_to_string(&out).unwrap();

    // pwd's output landed in the file; the next command's went back to the
    // shell's own stdout.
    assert!(!file.is_empty(), "redirect file is empty");
    assert!(!file.contains("AFTER-MARKER"), "file was: {file}");
    assert!(stdout.contains("AFTER-MARKER"), "stdout was: {stdout}");
    let _ = std::fs::remove_dir_all(&dir);
}

#[cfg(unix)]
#[test]
fn missing_input_file_is_reported_and_command_still_runs() {
    // Permissive mode: the failed redirect is diagnosed and the stage keeps
    // its inherited stdin. `true` never reads it, so the session continues.
    let output = run_shell(&["true < /nonexistent-psh-input.txt", "echo ALIVE"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(
        stderr.contains("/nonexistent-psh-input.txt"),
        "stderr was: {stderr}"
    );
    assert!(stdout.contains("ALIVE"), "stdout was: {stdout}");
    assert!(output.status.success(), "shell did not exit cleanly");
}

#[cfg(unix)]
#[test]
fn strict_mode_aborts_the_stage_on_open_failure() {
    // With PSH_STRICT_REDIRECTS the stage never runs, so cat can't fall back
    // to the shell's stdin and swallow the rest of the session.
    let output = run_shell_with_env(
        &["cat < /nonexistent-psh-input.txt", "echo ALIVE"],
        &[("PSH_STRICT_REDIRECTS", "1")],
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(
        stderr.contains("/nonexistent-psh-input.txt"),
        "stderr was: {stderr}"
    );
    assert!(stdout.contains("ALIVE"), "stdout was: {stdout}");
    assert!(output.status.success(), "shell did not exit cleanly");
}

#[cfg(unix)]
#[test]
fn output_redirect_on_inner_pipeline_stage_wins() {
    let dir = temp_dir("inner");
    let out = dir.join("captured.txt");

    // tr's output is claimed by the file, so wc at the end counts nothing.
    let cmd = format!("echo hello | tr a-z A-Z > {} | wc -c", out.display());
    let output = run_shell(&[cmd.as_str()]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert_eq!(std::fs::read_to_string(&out).unwrap(), "HELLO\n");
    assert!(stdout.contains("0"), "stdout was: {stdout}");
    let _ = std::fs::remove_dir_all(&dir);
}
