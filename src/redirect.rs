use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::process::Stdio;

use crate::ast::{StageInput, StageOutput};

/// What to do when a redirection target fails to open.
///
/// `Permissive` reports the failure and lets the stage run with its pipe or
/// inherited stream instead, the shell's historical behavior. `Strict`
/// aborts the stage before anything is spawned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectMode {
    Permissive,
    Strict,
}

impl RedirectMode {
    /// Read the mode from `PSH_STRICT_REDIRECTS` (`1` or `true` → strict).
    /// Defaults to permissive.
    pub fn from_env() -> RedirectMode {
        match std::env::var("PSH_STRICT_REDIRECTS") {
            Ok(v) if v == "1" || v.eq_ignore_ascii_case("true") => RedirectMode::Strict,
            _ => RedirectMode::Permissive,
        }
    }
}

/// Open an input redirection target read-only.
pub fn open_input(path: &str) -> io::Result<File> {
    File::open(path)
}

/// Open an output redirection target for writing, creating or truncating it.
/// New files get mode `rw-r--r--` on Unix.
pub fn open_output(path: &str) -> io::Result<File> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o644);
    }
    options.open(path)
}

/// Resolve a stage's effective stdin for an external child.
///
/// Precedence is fixed: an `in_file` override beats the pipe binding, which
/// beats the inherited stream. In permissive mode an unopenable file is
/// reported and the pipe/inherited binding is used instead.
pub fn stdin_stdio(
    binding: StageInput,
    in_file: Option<&str>,
    mode: RedirectMode,
) -> Result<Stdio, String> {
    if let Some(path) = in_file {
        match open_input(path) {
            Ok(file) => return Ok(Stdio::from(file)),
            Err(e) => open_failure(path, &e, mode)?,
        }
    }
    Ok(match binding {
        StageInput::Inherit => Stdio::inherit(),
        StageInput::Pipe(reader) => Stdio::from(reader),
    })
}

/// Resolve a stage's effective stdout for an external child. Same precedence
/// and failure policy as [`stdin_stdio`].
pub fn stdout_stdio(
    binding: StageOutput,
    out_file: Option<&str>,
    mode: RedirectMode,
) -> Result<Stdio, String> {
    if let Some(path) = out_file {
        match open_output(path) {
            Ok(file) => return Ok(Stdio::from(file)),
            Err(e) => open_failure(path, &e, mode)?,
        }
    }
    Ok(match binding {
        StageOutput::Inherit => Stdio::inherit(),
        StageOutput::Pipe(writer) => Stdio::from(writer),
    })
}

/// Resolve a stage's effective stdin as a `Read` handle for a built-in.
pub fn input_stream(
    binding: StageInput,
    in_file: Option<&str>,
    mode: RedirectMode,
) -> Result<Box<dyn Read + Send>, String> {
    if let Some(path) = in_file {
        match open_input(path) {
            Ok(file) => return Ok(Box::new(file)),
            Err(e) => open_failure(path, &e, mode)?,
        }
    }
    Ok(match binding {
        StageInput::Inherit => Box::new(io::stdin()),
        StageInput::Pipe(reader) => Box::new(reader),
    })
}

/// Resolve a stage's effective stdout as a `Write` handle for a built-in.
pub fn output_stream(
    binding: StageOutput,
    out_file: Option<&str>,
    mode: RedirectMode,
) -> Result<Box<dyn Write + Send>, String> {
    if let Some(path) = out_file {
        match open_output(path) {
            Ok(file) => return Ok(Box::new(file)),
            Err(e) => open_failure(path, &e, mode)?,
        }
    }
    Ok(match binding {
        StageOutput::Inherit => Box::new(io::stdout()),
        StageOutput::Pipe(writer) => Box::new(writer),
    })
}

fn open_failure(path: &str, error: &io::Error, mode: RedirectMode) -> Result<(), String> {
    let message = format!("psh: {path}: {error}");
    match mode {
        RedirectMode::Permissive => {
            eprintln!("{message}");
            Ok(())
        }
        RedirectMode::Strict => Err(message),
    }
}
