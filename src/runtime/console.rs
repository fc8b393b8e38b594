use std::collections::VecDeque;
use std::io::{self, BufRead, Write};

pub const INPUT_PROMPT: &str = "# enter a value, please";
pub const OUTPUT_PREFIX: &str = "# console out: ";
pub const FINISHED_MESSAGE: &str = "# processor: execution is finished";

/// What reading one value from the console produced.
#[derive(Debug, Clone, PartialEq)]
pub enum ReadOutcome {
    Value(f64),
    Exhausted,
    Invalid(String),
}

/// The machine's console: a token reader plus a line writer.
///
/// Input is consumed one whitespace-separated token at a time; extra tokens
/// on a line are kept for the next `in`.
pub struct Console<R: BufRead, W: Write> {
    input: R,
    output: W,
    pending: VecDeque<String>,
}

impl<R: BufRead, W: Write> Console<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Console {
            input,
            output,
            pending: VecDeque::new(),
        }
    }

    /// Prompts and reads one number.
    pub fn read_value(&mut self) -> io::Result<ReadOutcome> {
        writeln!(self.output, "{}", INPUT_PROMPT)?;
        self.output.flush()?;

        let Some(token) = self.next_token()? else {
            return Ok(ReadOutcome::Exhausted);
        };
        Ok(match token.parse::<f64>() {
            Ok(v) => ReadOutcome::Value(v),
            Err(_) => ReadOutcome::Invalid(token),
        })
    }

    pub fn write_value(&mut self, value: f64) -> io::Result<()> {
        writeln!(self.output, "{}{}", OUTPUT_PREFIX, value)
    }

    pub fn write_finished(&mut self) -> io::Result<()> {
        writeln!(self.output, "{}", FINISHED_MESSAGE)?;
        self.output.flush()
    }

    fn next_token(&mut self) -> io::Result<Option<String>> {
        while self.pending.is_empty() {
            let mut line = String::new();
            if self.input.read_line(&mut line)? == 0 {
                return Ok(None);
            }
            self.pending
                .extend(line.split_whitespace().map(str::to_string));
        }
        Ok(self.pending.pop_front())
    }

    pub fn into_output(self) -> W {
        self.output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn console(input: &str) -> Console<&[u8], Vec<u8>> {
        Console::new(input.as_bytes(), Vec::new())
    }

    #[test]
    fn reads_tokens_across_lines() {
        let mut c = console("1 2\n\n  3.5\n");
        assert_eq!(c.read_value().unwrap(), ReadOutcome::Value(1.0));
        assert_eq!(c.read_value().unwrap(), ReadOutcome::Value(2.0));
        assert_eq!(c.read_value().unwrap(), ReadOutcome::Value(3.5));
        assert_eq!(c.read_value().unwrap(), ReadOutcome::Exhausted);
    }

    #[test]
    fn invalid_token_is_reported() {
        let mut c = console("abc");
        assert_eq!(
            c.read_value().unwrap(),
            ReadOutcome::Invalid("abc".to_string())
        );
    }

    #[test]
    fn output_protocol() {
        let mut c = console("4");
        c.read_value().unwrap();
        c.write_value(2.5).unwrap();
        c.write_finished().unwrap();
        let text = String::from_utf8(c.into_output()).unwrap();
        assert_eq!(
            text,
            "# enter a value, please\n# console out: 2.5\n# processor: execution is finished\n"
        );
    }
}
