use crate::ast::{Pipeline, Stage};

/// Accumulates one stage's worth of tokens while scanning a line.
#[derive(Default)]
struct StageBuilder {
    words: Vec<String>,
    in_file: Option<String>,
    out_file: Option<String>,
}

impl StageBuilder {
    fn is_empty(&self) -> bool {
        self.words.is_empty() && self.in_file.is_none() && self.out_file.is_none()
    }

    fn finish(self) -> Result<Stage, String> {
        let mut words = self.words.into_iter();
        let Some(program) = words.next() else {
            // `< in.txt > out.txt` with no command to run them against.
            return Err("psh: syntax error: redirection without a command".to_string());
        };
        let mut stage = Stage::new(program, words.collect());
        stage.in_file = self.in_file;
        stage.out_file = self.out_file;
        Ok(stage)
    }
}

/// Parse one input line into a [`Pipeline`].
///
/// Tokens are whitespace-separated; `|` separates stages, and `<` / `>`
/// consume the following token as an input/output file. There is no quoting
/// or escaping — a redirection filename is a single plain token.
///
/// Returns `Ok(None)` for a blank line, and `Err` with a diagnostic for
/// syntax errors (empty stage, missing filename, redirection with no
/// command). A returned pipeline always has at least one stage.
pub fn parse(input: &str) -> Result<Option<Pipeline>, String> {
    let mut tokens = input.split_whitespace();
    let mut stages: Vec<Stage> = Vec::new();
    let mut current = StageBuilder::default();

    while let Some(token) = tokens.next() {
        match token {
            "|" => {
                if current.is_empty() {
                    return Err(
                        "psh: syntax error near unexpected token `|'".to_string()
                    );
                }
                stages.push(current.finish()?);
                current = StageBuilder::default();
            }
            "<" => {
                current.in_file = Some(expect_filename(tokens.next(), "<")?);
            }
            ">" => {
                current.out_file = Some(expect_filename(tokens.next(), ">")?);
            }
            word => {
                current.words.push(word.to_string());
            }
        }
    }

    if current.is_empty() {
        if stages.is_empty() {
            // Blank line — nothing to do.
            return Ok(None);
        }
        // Trailing `|`, e.g. `echo hi |`.
        return Err("psh: syntax error: expected command after `|'".to_string());
    }
    stages.push(current.finish()?);

    Ok(Some(Pipeline { stages }))
}

fn expect_filename(token: Option<&str>, operator: &str) -> Result<String, String> {
    match token {
        Some(name) => Ok(name.to_string()),
        None => Err(format!(
            "psh: syntax error: expected filename after `{operator}'"
        )),
    }
}
