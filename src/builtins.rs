use std::io::{Read, Write};

/// Names of all built-in commands, as listed by `help`.
const BUILTIN_NAMES: &[&str] = &["cd", "echo", "exit", "help", "pwd"];

/// A command implemented inside the shell process. The enum is the typed
/// handle returned by [`Builtin::lookup`]; dispatch matches on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Cd,
    Echo,
    Exit,
    Help,
    Pwd,
}

/// Outcome of running a built-in. `Exit` is the sentinel that terminates the
/// interactive loop; ordinary commands report their code via `Continue`.
#[derive(Debug, PartialEq, Eq)]
pub enum BuiltinAction {
    Continue(i32),
    Exit(i32),
}

/// Where a built-in is running: in the shell process proper, or on a thread
/// standing in for a pipeline child. Environment updates happen only in the
/// `Shell` context, just as a forked child's would never reach the parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinContext {
    Shell,
    PipelineStage,
}

impl Builtin {
    /// Look up a command name in the registry.
    pub fn lookup(name: &str) -> Option<Builtin> {
        match name {
            "cd" => Some(Builtin::Cd),
            "echo" => Some(Builtin::Echo),
            "exit" => Some(Builtin::Exit),
            "help" => Some(Builtin::Help),
            "pwd" => Some(Builtin::Pwd),
            _ => None,
        }
    }
}

/// Execute a built-in, writing output through the provided streams.
///
/// The streams are whatever the caller resolved for this stage (the shell's
/// own stdio, a redirect file, or pipe ends inside a pipeline), so built-ins
/// never touch the process-wide descriptors. Write errors are deliberately
/// ignored: a built-in whose pipe reader has gone away must not take the
/// shell down with it.
pub fn execute(
    builtin: Builtin,
    args: &[String],
    context: BuiltinContext,
    _stdin: &mut dyn Read,
    stdout: &mut dyn Write,
    stderr: &mut dyn Write,
) -> BuiltinAction {
    match builtin {
        Builtin::Cd => BuiltinAction::Continue(builtin_cd(args, context, stderr)),
        Builtin::Echo => BuiltinAction::Continue(builtin_echo(args, stdout)),
        Builtin::Exit => builtin_exit(args, stderr),
        Builtin::Help => BuiltinAction::Continue(builtin_help(stdout)),
        Builtin::Pwd => BuiltinAction::Continue(builtin_pwd(stdout, stderr)),
    }
}

fn builtin_cd(args: &[String], context: BuiltinContext, stderr: &mut dyn Write) -> i32 {
    let target = match args.first() {
        Some(dir) if dir == "-" => match std::env::var("OLDPWD") {
            Ok(previous) => previous,
            Err(_) => {
                let _ = writeln!(stderr, "cd: OLDPWD not set");
                return 1;
            }
        },
        Some(dir) => dir.clone(),
        // cd with no argument goes home.
        None => std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    };

    let previous = std::env::current_dir();

    if let Err(e) = std::env::set_current_dir(&target) {
        let _ = writeln!(stderr, "cd: {target}: {e}");
        return 1;
    }

    // Record the previous directory only once the change has stuck.
    // SAFETY: only the Shell context writes env vars, and the interactive
    // loop runs one built-in at a time with no stage threads alive, so the
    // write cannot race with reads elsewhere in the process.
    if context == BuiltinContext::Shell {
        if let Ok(previous) = previous {
            unsafe { std::env::set_var("OLDPWD", previous) };
        }
    }

    0
}

fn builtin_echo(args: &[String], stdout: &mut dyn Write) -> i32 {
    let _ = writeln!(stdout, "{}", args.join(" "));
    0
}

fn builtin_exit(args: &[String], stderr: &mut dyn Write) -> BuiltinAction {
    match args.first() {
        None => BuiltinAction::Exit(0),
        Some(s) => match s.parse::<i32>() {
            Ok(code) => BuiltinAction::Exit(code),
            Err(_) => {
                let _ = writeln!(stderr, "exit: {s}: numeric argument required");
                BuiltinAction::Exit(2)
            }
        },
    }
}

fn builtin_help(stdout: &mut dyn Write) -> i32 {
    let _ = writeln!(stdout, "psh built-in commands:");
    for name in BUILTIN_NAMES {
        let _ = writeln!(stdout, "  {name}");
    }
    0
}

fn builtin_pwd(stdout: &mut dyn Write, stderr: &mut dyn Write) -> i32 {
    match std::env::current_dir() {
        Ok(path) => {
            let _ = writeln!(stdout, "{}", path.display());
            0
        }
        Err(e) => {
            let _ = writeln!(stderr, "pwd: {e}");
            1
        }
    }
}
