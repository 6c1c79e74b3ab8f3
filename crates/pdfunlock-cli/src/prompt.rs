use std::io::{self, BufRead, IsTerminal, Write};

use pdfunlock::PasswordPrompt;

enum Source<R> {
    /// Interactive terminal; input is not echoed.
    Terminal,
    Lines(R),
}

/// Reads passwords from standard input. An empty answer or end of input
/// cancels.
pub struct TerminalPrompt<R> {
    source: Source<R>,
}

impl TerminalPrompt<io::StdinLock<'static>> {
    pub fn stdin() -> Self {
        Self::for_stdin(io::stdin().is_terminal())
    }

    fn for_stdin(interactive: bool) -> Self {
        if interactive {
            Self {
                source: Source::Terminal,
            }
        } else {
            Self::new(io::stdin().lock())
        }
    }
}

impl<R: BufRead> TerminalPrompt<R> {
    pub fn new(input: R) -> Self {
        Self {
            source: Source::Lines(input),
        }
    }

    fn is_masked(&self) -> bool {
        matches!(self.source, Source::Terminal)
    }
}

impl<R: BufRead> PasswordPrompt for TerminalPrompt<R> {
    fn prompt_password(&mut self, filename: &str) -> Option<String> {
        let label = format!("Password for {} (empty to skip): ", filename);

        let answer = match &mut self.source {
            Source::Terminal => rpassword::prompt_password(label).ok()?,
            Source::Lines(input) => {
                eprint!("{}", label);
                let _ = io::stderr().flush();

                let mut line = String::new();
                match input.read_line(&mut line) {
                    Ok(0) | Err(_) => return None,
                    Ok(_) => line,
                }
            }
        };

        let password = answer.trim_end_matches(['\r', '\n']);
        if password.is_empty() {
            None
        } else {
            Some(password.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_reads_one_line_per_prompt() {
        let mut prompt = TerminalPrompt::new(Cursor::new("secret\r\nother pass\n"));
        assert_eq!(prompt.prompt_password("a.pdf"), Some("secret".to_string()));
        assert_eq!(prompt.prompt_password("b.pdf"), Some("other pass".to_string()));
        assert_eq!(prompt.prompt_password("c.pdf"), None);
    }

    #[test]
    fn test_empty_line_cancels() {
        let mut prompt = TerminalPrompt::new(Cursor::new("\nsecret\n"));
        assert_eq!(prompt.prompt_password("a.pdf"), None);
        assert_eq!(prompt.prompt_password("a.pdf"), Some("secret".to_string()));
    }

    #[test]
    fn test_terminal_input_is_masked() {
        assert!(TerminalPrompt::for_stdin(true).is_masked());
        assert!(!TerminalPrompt::for_stdin(false).is_masked());
        assert!(!TerminalPrompt::new(Cursor::new("")).is_masked());
    }
}
