use std::fmt::Display;
use std::io::{BufRead, Write};

use anyhow::Result;
use thiserror::Error;

/// Standard input reached end of file. The menus treat this as "exit".
#[derive(Debug, Error)]
#[error("input closed")]
pub struct InputClosed;

/// Answer to a numbered listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pick {
    /// 0: leave the listing
    Back,
    /// Zero-based index of the chosen entry
    Entry(usize),
    Unrecognized,
}

/// Line-oriented terminal: prompts go to `output`, answers come from `input`.
pub struct Console<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Console<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Writes `text` followed by a newline.
    pub fn line(&mut self, text: impl Display) -> Result<()> {
        writeln!(self.output, "{}", text)?;
        Ok(())
    }

    /// Writes `text` without a newline and flushes, for prompts.
    pub fn text(&mut self, text: impl Display) -> Result<()> {
        write!(self.output, "{}", text)?;
        self.output.flush()?;
        Ok(())
    }

    /// Next line of input without its line terminator. Bytes that are not
    /// UTF-8 come back as U+FFFD, so they fail validation instead of I/O.
    pub fn read_line(&mut self) -> Result<String> {
        let mut raw = Vec::new();
        if self.input.read_until(b'\n', &mut raw)? == 0 {
            return Err(InputClosed.into());
        }
        let mut line = String::from_utf8_lossy(&raw).into_owned();
        let trimmed = line.trim_end_matches(['\n', '\r']).len();
        line.truncate(trimmed);
        Ok(line)
    }

    pub fn prompt(&mut self, label: impl Display) -> Result<String> {
        self.text(label)?;
        self.read_line()
    }

    /// Asks until a non-negative integer is entered.
    pub fn read_choice(&mut self) -> Result<u32> {
        loop {
            let answer = self.prompt("Please make your choice: ")?;
            match answer.trim().parse::<u32>() {
                Ok(choice) => return Ok(choice),
                Err(_) => self.line("Your input is invalid!")?,
            }
        }
    }

    /// Asks for an index into a list of `count` entries shown as `1..=count`.
    /// An out-of-range number is reported and handed back so the caller can
    /// show the list again.
    pub fn pick(&mut self, count: usize, question: &str) -> Result<Pick> {
        self.line(".........................")?;
        self.line(question)?;
        match self.read_choice()? as usize {
            0 => Ok(Pick::Back),
            n if n <= count => Ok(Pick::Entry(n - 1)),
            _ => {
                self.line("Unrecognized choice!")?;
                Ok(Pick::Unrecognized)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn console(input: &str) -> Console<Cursor<&[u8]>, Vec<u8>> {
        Console::new(Cursor::new(input.as_bytes()), Vec::new())
    }

    fn written(console: Console<Cursor<&[u8]>, Vec<u8>>) -> String {
        String::from_utf8(console.output).unwrap()
    }

    #[test]
    fn invalid_numbers_reprompt() {
        let mut c = console("abc\n-1\n 7 \n");
        assert_eq!(c.read_choice().unwrap(), 7);

        let out = written(c);
        assert_eq!(out.matches("Please make your choice: ").count(), 3);
        assert_eq!(out.matches("Your input is invalid!").count(), 2);
    }

    #[test]
    fn lines_lose_their_terminators_only() {
        let mut c = console("  spaced out \r\nlast");
        assert_eq!(c.read_line().unwrap(), "  spaced out ");
        assert_eq!(c.read_line().unwrap(), "last");
        assert!(c.read_line().unwrap_err().is::<InputClosed>());
    }

    #[test]
    fn non_utf8_input_reprompts() {
        let mut c = Console::new(Cursor::new(&b"\xff\xfe\n4\n"[..]), Vec::new());
        assert_eq!(c.read_choice().unwrap(), 4);
        assert!(written(c).contains("Your input is invalid!"));

        let mut c = Console::new(Cursor::new(&b"caf\xe9\r\n"[..]), Vec::new());
        assert_eq!(c.read_line().unwrap(), "caf\u{FFFD}");
    }

    #[test]
    fn pick_is_one_based_and_zero_goes_back() {
        let mut c = console("5\n2\n0\n");
        assert_eq!(c.pick(3, "Which one?").unwrap(), Pick::Unrecognized);
        assert_eq!(c.pick(3, "Which one?").unwrap(), Pick::Entry(1));
        assert_eq!(c.pick(3, "Which one?").unwrap(), Pick::Back);
        assert!(written(c).contains("Unrecognized choice!"));
    }
}
