mod ast;
mod builtins;
mod executor;
mod parser;
mod redirect;

use std::io::{self, Write};

use builtins::{Builtin, BuiltinAction};
use redirect::RedirectMode;

fn main() {
    ctrlc::set_handler(|| {
        println!();
        let _ = io::stdout().flush();
    })
    .expect("Failed to set Ctrl-C handler");

    let mode = RedirectMode::from_env();
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut last_exit_code: i32 = 0;

    loop {
        print!("psh> ");
        if stdout.flush().is_err() {
            break;
        }

        let mut input = String::new();
        match stdin.read_line(&mut input) {
            // End of input is "nothing to do": keep prompting. Only the
            // exit sentinel ends the loop.
            Ok(0) => continue,
            Ok(_) => {}
            Err(error) => {
                eprintln!("psh: error reading input: {error}");
                continue;
            }
        }

        let pipeline = match parser::parse(&input) {
            Ok(Some(pipeline)) => pipeline,
            Ok(None) => continue,
            Err(message) => {
                eprintln!("{message}");
                last_exit_code = 2;
                continue;
            }
        };

        if pipeline.stages.len() > 1 {
            last_exit_code = executor::run_pipeline(pipeline, mode);
            continue;
        }

        // Sole stage: built-ins run inside the shell process, so cd can move
        // it and exit can stop it; everything else forks off a child.
        let Some(stage) = pipeline.stages.into_iter().next() else {
            continue;
        };
        match Builtin::lookup(&stage.program) {
            Some(builtin) => match executor::run_builtin(builtin, stage, mode) {
                BuiltinAction::Continue(code) => last_exit_code = code,
                BuiltinAction::Exit(code) => {
                    last_exit_code = code;
                    break;
                }
            },
            None => last_exit_code = executor::run_single(stage, mode),
        }
    }

    std::process::exit(last_exit_code);
}
