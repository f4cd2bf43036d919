use os_pipe::{PipeReader, PipeWriter};

/// Where a stage's standard input comes from.
///
/// `Inherit` is the explicit "use the shell's own stdin" sentinel; `Pipe`
/// owns the read end of the pipe connecting this stage to its predecessor.
/// Dropping a `Pipe` binding closes the descriptor.
#[derive(Debug)]
pub enum StageInput {
    Inherit,
    Pipe(PipeReader),
}

/// Where a stage's standard output goes. Mirrors [`StageInput`].
#[derive(Debug)]
pub enum StageOutput {
    Inherit,
    Pipe(PipeWriter),
}

/// One command within a pipeline: the program, its arguments, optional file
/// redirections, and the stream bindings the pipeline executor assigns just
/// before the stage is spawned.
///
/// When both a pipe binding and a file redirection apply to the same stream,
/// the file wins; see [`crate::redirect`].
#[derive(Debug)]
pub struct Stage {
    pub program: String,
    pub args: Vec<String>,
    /// `< path` — redirect stdin from a file (read-only).
    pub in_file: Option<String>,
    /// `> path` — redirect stdout to a file (create/truncate).
    pub out_file: Option<String>,
    pub stdin: StageInput,
    pub stdout: StageOutput,
}

impl Stage {
    pub fn new(program: String, args: Vec<String>) -> Stage {
        Stage {
            program,
            args,
            in_file: None,
            out_file: None,
            stdin: StageInput::Inherit,
            stdout: StageOutput::Inherit,
        }
    }
}

/// An ordered sequence of stages produced from one input line, connected
/// left-to-right by pipes at execution time.
///
/// Invariant: holds at least one stage (the parser returns `None` instead of
/// an empty pipeline). Consumed by value by exactly one executor call; all
/// owned pipe ends and argument storage are released on drop.
#[derive(Debug)]
pub struct Pipeline {
    pub stages: Vec<Stage>,
}
