// ABOUTME: rustyline REPL helper — command completion and syntax highlighting for minitip's line syntax

use rustyline::completion::{Completer, Pair};
use rustyline::highlight::{CmdKind, Highlighter};
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{Context, Helper};
use std::borrow::Cow;

use crate::dispatch::COMMANDS;

const COLOR_RESET: &str = "\x1b[0m";
const COLOR_PAREN: &str = "\x1b[1;34m"; // bold blue
const COLOR_COMMAND: &str = "\x1b[1;35m"; // bold magenta
const COLOR_FUNC: &str = "\x1b[36m"; // cyan
const COLOR_NUMBER: &str = "\x1b[33m"; // yellow
const COLOR_REL: &str = "\x1b[1;33m"; // bold yellow
const COLOR_COMMENT: &str = "\x1b[90m"; // bright black

/// The REPL's `rustyline::Helper`: completes command names at the start of
/// a line and colorizes parens/brackets, relation operators, numbers, and
/// `H`/`I`/macro-name function heads.
pub struct MinitipHelper;

impl MinitipHelper {
    pub fn new() -> Self {
        MinitipHelper
    }
}

impl Default for MinitipHelper {
    fn default() -> Self {
        Self::new()
    }
}

impl Helper for MinitipHelper {}

impl Completer for MinitipHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let start = line[..pos].rfind(char::is_whitespace).map(|i| i + 1).unwrap_or(0);
        if start != 0 {
            return Ok((start, Vec::new()));
        }
        let word = &line[start..pos];
        if word.is_empty() {
            return Ok((start, Vec::new()));
        }
        let candidates: Vec<Pair> = COMMANDS
            .iter()
            .filter(|c| c.starts_with(word))
            .map(|c| Pair { display: c.to_string(), replacement: c.to_string() })
            .collect();
        Ok((start, candidates))
    }
}

impl Hinter for MinitipHelper {
    type Hint = String;
}

impl Validator for MinitipHelper {}

impl Highlighter for MinitipHelper {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        let highlighted = highlight_line(line);
        if highlighted == line {
            Cow::Borrowed(line)
        } else {
            Cow::Owned(highlighted)
        }
    }

    fn highlight_char(&self, _line: &str, _pos: usize, _kind: CmdKind) -> bool {
        true
    }
}

fn highlight_line(line: &str) -> String {
    if line.trim_start().starts_with('#') {
        return format!("{COLOR_COMMENT}{line}{COLOR_RESET}");
    }

    let chars: Vec<char> = line.chars().collect();
    let mut out = String::new();
    let mut i = 0;

    let word_end = chars.iter().take_while(|c| c.is_ascii_alphabetic()).count();
    if word_end > 0 {
        let word: String = chars[..word_end].iter().collect();
        if COMMANDS.contains(&word.to_ascii_lowercase().as_str()) {
            out.push_str(COLOR_COMMAND);
            out.push_str(&word);
            out.push_str(COLOR_RESET);
            i = word_end;
        }
    }

    while i < chars.len() {
        let c = chars[i];
        match c {
            '(' | ')' | '[' | ']' => {
                out.push_str(COLOR_PAREN);
                out.push(c);
                out.push_str(COLOR_RESET);
                i += 1;
            }
            '=' | '<' | '>' => {
                let mut j = i + 1;
                while j < chars.len() && matches!(chars[j], '=' | '<' | '>') {
                    j += 1;
                }
                out.push_str(COLOR_REL);
                out.extend(&chars[i..j]);
                out.push_str(COLOR_RESET);
                i = j;
            }
            '0'..='9' => {
                let mut j = i;
                while j < chars.len() && (chars[j].is_ascii_digit() || chars[j] == '.') {
                    j += 1;
                }
                out.push_str(COLOR_NUMBER);
                out.extend(&chars[i..j]);
                out.push_str(COLOR_RESET);
                i = j;
            }
            'A'..='Z' => {
                out.push_str(COLOR_FUNC);
                out.push(c);
                out.push_str(COLOR_RESET);
                i += 1;
            }
            _ => {
                out.push(c);
                i += 1;
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn colorizes_leading_command_word() {
        let out = highlight_line("check a<=b");
        assert!(out.contains(COLOR_COMMAND));
    }

    #[test]
    fn colorizes_parens_and_relation() {
        let out = highlight_line("(a,b)<=a+b");
        assert!(out.contains(COLOR_PAREN));
        assert!(out.contains(COLOR_REL));
    }

    #[test]
    fn colorizes_macro_head_uppercase() {
        let out = highlight_line("D(a,b,c)==0");
        assert!(out.contains(COLOR_FUNC));
    }

    #[test]
    fn comment_line_is_dimmed_whole() {
        let out = highlight_line("# a note");
        assert!(out.starts_with(COLOR_COMMENT));
    }

    #[test]
    fn plain_variable_list_is_unchanged_modulo_color() {
        let out = highlight_line("ab");
        assert_eq!(out, "ab");
    }
}
