use std::io::{self, Write};
use std::process::{Child, Command};
use std::thread;

use crate::ast::{Pipeline, Stage, StageInput, StageOutput};
use crate::builtins::{self, Builtin, BuiltinAction, BuiltinContext};
use crate::redirect::{self, RedirectMode};

/// Derive an exit code from a process status.
/// On Unix, if a process is killed by a signal, `status.code()` is None
/// but we can recover the signal number. The shell convention is 128+signal.
fn exit_code(status: std::process::ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }

    1
}

/// The shell keeps SIGPIPE ignored so an early-exiting pipeline reader can't
/// kill it; children need the default disposition back, or writers like `yes`
/// would spin on EPIPE instead of terminating.
#[cfg(unix)]
fn reset_sigpipe(cmd: &mut Command) {
    use std::os::unix::process::CommandExt;
    // SAFETY: signal() is async-signal-safe and the closure does nothing else
    // between fork and exec.
    unsafe {
        cmd.pre_exec(|| {
            libc::signal(libc::SIGPIPE, libc::SIG_DFL);
            Ok(())
        });
    }
}

#[cfg(not(unix))]
fn reset_sigpipe(_cmd: &mut Command) {}

fn report_spawn_error(program: &str, error: &io::Error) -> i32 {
    if error.kind() == io::ErrorKind::NotFound {
        eprintln!("psh: command not found: {program}");
        127
    } else {
        eprintln!("psh: {program}: {error}");
        126
    }
}

/// Run a built-in as the sole command of a line, inside the shell process.
///
/// Redirections are honored by handing the built-in resolved stream handles
/// instead of rebinding the shell's own stdio, so there is nothing to restore
/// afterwards: a redirect file simply closes when the handle drops, and the
/// next prompt goes to the terminal as before.
pub fn run_builtin(builtin: Builtin, stage: Stage, mode: RedirectMode) -> BuiltinAction {
    let mut input = match redirect::input_stream(stage.stdin, stage.in_file.as_deref(), mode) {
        Ok(stream) => stream,
        Err(message) => {
            eprintln!("{message}");
            return BuiltinAction::Continue(1);
        }
    };
    let mut output = match redirect::output_stream(stage.stdout, stage.out_file.as_deref(), mode) {
        Ok(stream) => stream,
        Err(message) => {
            eprintln!("{message}");
            return BuiltinAction::Continue(1);
        }
    };
    let mut stderr = io::stderr();

    let action = builtins::execute(
        builtin,
        &stage.args,
        BuiltinContext::Shell,
        &mut *input,
        &mut *output,
        &mut stderr,
    );
    let _ = output.flush();
    action
}

/// Execute one external command and wait for it.
/// Returns the exit code (0 = success, 127 = not found, 128+N = killed by
/// signal N).
pub fn run_single(stage: Stage, mode: RedirectMode) -> i32 {
    let stdin = match redirect::stdin_stdio(stage.stdin, stage.in_file.as_deref(), mode) {
        Ok(stdio) => stdio,
        Err(message) => {
            eprintln!("{message}");
            return 1;
        }
    };
    let stdout = match redirect::stdout_stdio(stage.stdout, stage.out_file.as_deref(), mode) {
        Ok(stdio) => stdio,
        Err(message) => {
            eprintln!("{message}");
            return 1;
        }
    };

    let mut cmd = Command::new(&stage.program);
    cmd.args(&stage.args).stdin(stdin).stdout(stdout);
    reset_sigpipe(&mut cmd);

    match cmd.status() {
        Ok(status) => exit_code(status),
        Err(e) => report_spawn_error(&stage.program, &e),
    }
}

/// One spawned pipeline stage awaiting reaping: an OS child for an external
/// command, or the thread standing in for "run in child" when the stage is a
/// built-in.
enum StageHandle {
    External(Child),
    Builtin(thread::JoinHandle<i32>),
}

impl StageHandle {
    fn wait(self) -> i32 {
        match self {
            StageHandle::External(mut child) => match child.wait() {
                Ok(status) => exit_code(status),
                Err(e) => {
                    eprintln!("psh: wait: {e}");
                    1
                }
            },
            StageHandle::Builtin(handle) => handle.join().unwrap_or(1),
        }
    }
}

/// Execute a pipeline of two or more stages.
///
/// Walks the stages in order, creating one pipe per adjacent pair and
/// spawning each stage as soon as its bindings are assigned. The parent's
/// copies of a stage's pipe ends live only for the current iteration (each
/// spawn helper drops them on return), so at most one pipe's worth of extra
/// handles is ever held here, and every pipe is exposed to exactly its writer
/// and its reader by the time the next stage is examined.
///
/// Returns the final stage's exit code.
pub fn run_pipeline(pipeline: Pipeline, mode: RedirectMode) -> i32 {
    let count = pipeline.stages.len();
    let mut handles: Vec<StageHandle> = Vec::with_capacity(count);
    let mut prev_read = StageInput::Inherit;

    for (i, mut stage) in pipeline.stages.into_iter().enumerate() {
        let mut next_read = None;
        if i + 1 < count {
            match os_pipe::pipe() {
                Ok((reader, writer)) => {
                    stage.stdout = StageOutput::Pipe(writer);
                    next_read = Some(reader);
                }
                Err(e) => {
                    eprintln!("psh: pipe: {e}");
                    // Release the pending read end before reaping so the
                    // already-spawned stages can unwind.
                    drop(std::mem::replace(&mut prev_read, StageInput::Inherit));
                    abort_pipeline(handles);
                    return 1;
                }
            }
        }
        stage.stdin = std::mem::replace(&mut prev_read, StageInput::Inherit);

        let spawned = match Builtin::lookup(&stage.program) {
            Some(builtin) => spawn_builtin_stage(builtin, stage, mode),
            None => spawn_external_stage(stage, mode),
        };
        match spawned {
            Ok(handle) => handles.push(handle),
            Err(code) => {
                // The failed stage's own pipe ends are already closed;
                // dropping the pending read end severs the rest of the chain
                // so the spawned stages can unwind before we reap them.
                drop(next_read);
                abort_pipeline(handles);
                return code;
            }
        }

        if let Some(reader) = next_read {
            prev_read = StageInput::Pipe(reader);
        }
    }

    // Reap exactly the stages spawned above, in order. The pipeline's status
    // is the final stage's.
    let mut last = 0;
    for handle in handles {
        last = handle.wait();
    }
    last
}

fn spawn_external_stage(stage: Stage, mode: RedirectMode) -> Result<StageHandle, i32> {
    let stdin = redirect::stdin_stdio(stage.stdin, stage.in_file.as_deref(), mode)
        .map_err(|message| {
            eprintln!("{message}");
            1
        })?;
    let stdout = redirect::stdout_stdio(stage.stdout, stage.out_file.as_deref(), mode)
        .map_err(|message| {
            eprintln!("{message}");
            1
        })?;

    let mut cmd = Command::new(&stage.program);
    cmd.args(&stage.args).stdin(stdin).stdout(stdout);
    reset_sigpipe(&mut cmd);

    // `cmd` drops at return, releasing the parent's copies of this stage's
    // pipe ends immediately after the spawn.
    match cmd.spawn() {
        Ok(child) => Ok(StageHandle::External(child)),
        Err(e) => Err(report_spawn_error(&stage.program, &e)),
    }
}

fn spawn_builtin_stage(
    builtin: Builtin,
    stage: Stage,
    mode: RedirectMode,
) -> Result<StageHandle, i32> {
    let input = redirect::input_stream(stage.stdin, stage.in_file.as_deref(), mode)
        .map_err(|message| {
            eprintln!("{message}");
            1
        })?;
    let output = redirect::output_stream(stage.stdout, stage.out_file.as_deref(), mode)
        .map_err(|message| {
            eprintln!("{message}");
            1
        })?;

    let name = format!("builtin-{}", stage.program);
    let args = stage.args;
    let spawned = thread::Builder::new().name(name).spawn(move || {
        let mut input = input;
        let mut output = output;
        let mut stderr = io::stderr();
        let action = builtins::execute(
            builtin,
            &args,
            BuiltinContext::PipelineStage,
            &mut *input,
            &mut *output,
            &mut stderr,
        );
        let _ = output.flush();
        // Inside a pipeline `exit` is just another stage; the sentinel cannot
        // reach the interactive loop from here, matching a forked child.
        match action {
            BuiltinAction::Continue(code) | BuiltinAction::Exit(code) => code,
        }
    });

    match spawned {
        Ok(handle) => Ok(StageHandle::Builtin(handle)),
        Err(e) => {
            eprintln!("psh: failed to start built-in stage: {e}");
            Err(1)
        }
    }
}

/// Mid-pipeline failure path: nothing already spawned may outlive the line.
/// External children are killed outright; built-in stage threads finish on
/// their own once the surrounding pipe ends are gone, so joining them here
/// cannot hang.
fn abort_pipeline(mut handles: Vec<StageHandle>) {
    for handle in &mut handles {
        if let StageHandle::External(child) = handle {
            let _ = child.kill();
        }
    }
    for handle in handles {
        let _ = handle.wait();
    }
}
