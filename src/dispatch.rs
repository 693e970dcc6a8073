// ABOUTME: Interactive command dispatcher shared by the REPL, `-c`/.minitiprc loading, and `run FILE`

use crate::help;
use crate::parser::Style;
use crate::session::{self, CheckReport, Session};
use std::path::Path;

/// What the caller (REPL main loop) should do after one line has been
/// dispatched. Saving history needs the `rustyline::Editor`, which the
/// `Session` does not own, so it is surfaced here rather than handled
/// inline.
pub enum Control {
    Continue,
    Quit,
    SaveHistory(Option<String>),
}

/// The full result of dispatching one line: text to print (if any), the
/// control action, and whether the outcome should be treated as "false" or
/// "error" for the CLI's exit-code mapping.
pub struct Outcome {
    pub text: Option<String>,
    pub control: Control,
    pub is_error: bool,
    /// `Some(true/false)` for a completed check's overall truth value, used
    /// by the non-interactive CLI path to choose exit code 0 vs 1.
    pub truth: Option<bool>,
}

impl Outcome {
    fn info(text: impl Into<String>) -> Self {
        Outcome { text: Some(text.into()), control: Control::Continue, is_error: false, truth: None }
    }
    fn error(text: impl Into<String>) -> Self {
        Outcome { text: Some(text.into()), control: Control::Continue, is_error: true, truth: None }
    }
    fn quiet() -> Self {
        Outcome { text: None, control: Control::Continue, is_error: false, truth: None }
    }
}

pub(crate) const COMMANDS: &[&str] = &[
    "quit", "help", "check", "test", "xcheck", "add", "list", "del", "zap", "macro", "run",
    "style", "syntax", "set", "dump", "save", "about", "args",
];

/// Resolves `word` to a command name: an exact match, or (when `abbrev` is
/// on) the unique command it is an unambiguous prefix of.
fn resolve_command<'a>(word: &str, abbrev: bool) -> Option<&'a str> {
    if let Some(&c) = COMMANDS.iter().find(|&&c| c == word) {
        return Some(c);
    }
    if !abbrev || word.is_empty() {
        return None;
    }
    let mut matches = COMMANDS.iter().filter(|&&c| c.starts_with(word));
    let first = matches.next()?;
    if matches.next().is_none() {
        Some(first)
    } else {
        None
    }
}

/// Splits a line into its first word and the (trimmed) remainder.
fn split_first_word(line: &str) -> (&str, &str) {
    let line = line.trim_start();
    match line.find(char::is_whitespace) {
        Some(i) => (&line[..i], line[i..].trim_start()),
        None => (line, ""),
    }
}

/// Dispatches one line against `session`, per the interactive-command
/// table. A bare line whose first non-space character
/// is not a letter is treated as an implicit `check` (or `zap` if the line
/// contains a top-level `==`).
pub fn dispatch(session: &mut Session, line: &str) -> Outcome {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Outcome::quiet();
    }
    if let Some(c) = trimmed.chars().next() {
        if c == '#' {
            return if session.settings.comment {
                Outcome::info(trimmed)
            } else {
                Outcome::quiet()
            };
        }
    }

    let (word, rest) = split_first_word(trimmed);
    let is_command_shaped = word.chars().next().map(|c| c.is_ascii_alphabetic()).unwrap_or(false);

    if !is_command_shaped {
        return if trimmed.contains("==") { do_zap(session, trimmed) } else { do_check(session, trimmed, true) };
    }

    match resolve_command(&word.to_ascii_lowercase(), session.settings.abbrev) {
        Some("quit") => Outcome { text: Some("bye".to_string()), control: Control::Quit, is_error: false, truth: None },
        Some("help") => Outcome::info(help::topic_text(if rest.is_empty() { "help" } else { rest })),
        Some("check") | Some("test") => do_check(session, rest, true),
        Some("xcheck") => do_check(session, rest, false),
        Some("add") => do_add(session, rest),
        Some("list") => do_list(session, rest),
        Some("del") => do_del(session, rest),
        Some("zap") => do_zap(session, rest),
        Some("macro") => do_macro(session, rest),
        Some("run") => do_run(session, rest),
        Some("style") => do_style(session, rest),
        Some("syntax") => Outcome::info(help::syntax_text(rest)),
        Some("set") => do_set(session, rest),
        Some("dump") => do_dump(session, rest),
        Some("save") => Outcome { text: None, control: Control::SaveHistory(if rest.is_empty() { None } else { Some(rest.to_string()) }), is_error: false, truth: None },
        Some("about") => Outcome::info(help::about_text()),
        Some("args") => Outcome::info(help::args_text()),
        _ => Outcome::error("Unknown command; use 'help' to get a list of commands".to_string()),
    }
}

fn do_check(session: &mut Session, line: &str, use_constraints: bool) -> Outcome {
    if line.trim().is_empty() {
        return Outcome::info(help::topic_text("check"));
    }
    if session.silent {
        return Outcome::quiet();
    }
    match session.check(line, use_constraints) {
        Ok(report) => {
            let truth = session::report_is_true(&report);
            Outcome {
                text: Some(session::render_report(&report)),
                control: Control::Continue,
                is_error: matches!(report, CheckReport::Outcome(crate::lp::CheckOutcome::SolverError(_))),
                truth: Some(truth),
            }
        }
        Err(e) => {
            let mut o = Outcome::error(session::op_error_message(&e, line));
            o.truth = Some(false);
            o
        }
    }
}

fn do_zap(session: &mut Session, line: &str) -> Outcome {
    if line.trim().is_empty() {
        return Outcome::info(help::topic_text("zap"));
    }
    if session.silent {
        return Outcome::quiet();
    }
    match session.zap(line) {
        Ok(s) => Outcome::info(s),
        Err(e) => Outcome::error(session::op_error_message(&e, line)),
    }
}

fn do_add(session: &mut Session, line: &str) -> Outcome {
    if line.is_empty() || line == "?" {
        return Outcome::info(help::topic_text("add"));
    }
    match session.add_constraint(line) {
        Ok(()) => Outcome::info(format!("constraint #{} added", session.list_constraints().len())),
        Err(e) => Outcome::error(session::op_error_message(&e, line)),
    }
}

/// Parses a `list`/`del` range argument: `all`, a bare number, or
/// comma-separated numbers/`a-b` ranges. One-based throughout, matching
/// the constraint table's display numbering.
fn parse_range(arg: &str, max: usize) -> Result<Vec<usize>, String> {
    if arg.is_empty() || arg.eq_ignore_ascii_case("all") {
        return Ok((1..=max).collect());
    }
    let mut out = Vec::new();
    for part in arg.split(',') {
        let part = part.trim();
        if let Some((a, b)) = part.split_once('-') {
            let a: usize = a.trim().parse().map_err(|_| format!("bad range '{part}'"))?;
            let b: usize = b.trim().parse().map_err(|_| format!("bad range '{part}'"))?;
            out.extend(a..=b);
        } else {
            out.push(part.parse().map_err(|_| format!("bad index '{part}'"))?);
        }
    }
    Ok(out)
}

fn do_list(session: &mut Session, rest: &str) -> Outcome {
    if rest == "?" || rest.eq_ignore_ascii_case("help") {
        return Outcome::info(help::topic_text("list"));
    }
    let n = session.list_constraints().len();
    let idxs = match parse_range(rest, n) {
        Ok(v) => v,
        Err(e) => return Outcome::error(e),
    };
    if n == 0 {
        return Outcome::info("no constraints".to_string());
    }
    let mut out = String::new();
    for i in idxs {
        if i >= 1 && i <= n {
            out.push_str(&format!("{}: {}\n", i, session.list_constraints()[i - 1]));
        }
    }
    Outcome::info(out.trim_end().to_string())
}

fn do_del(session: &mut Session, rest: &str) -> Outcome {
    if rest == "?" || rest.eq_ignore_ascii_case("help") {
        return Outcome::info(help::topic_text("del"));
    }
    if rest.eq_ignore_ascii_case("all") {
        session.del_all_constraints();
        return Outcome::info("all constraints deleted".to_string());
    }
    match rest.trim().parse::<usize>() {
        Ok(i) => match session.del_constraint(i) {
            Ok(line) => Outcome::info(format!("deleted #{i}: {line}")),
            Err(e) => Outcome::error(session::op_error_message(&e, rest)),
        },
        Err(_) => Outcome::error(format!("bad constraint index '{rest}'")),
    }
}

fn do_macro(session: &mut Session, rest: &str) -> Outcome {
    let (sub, arg) = split_first_word(rest);
    match sub {
        "" | "?" | "help" => Outcome::info(help::topic_text("macro")),
        "add" => match session.macro_add(arg) {
            Ok(head) => Outcome::info(format!("macro {} defined", head.name)),
            Err(e) => Outcome::error(session::op_error_message(&e, arg)),
        },
        "list" => {
            let mut out = String::new();
            for idx in 0..session.macros.len() {
                if let Some(rendered) = session.render_macro(idx) {
                    out.push_str(&rendered);
                    out.push('\n');
                }
            }
            Outcome::info(out.trim_end().to_string())
        }
        "delete" | "del" => match session.macro_delete_by_header(arg) {
            Ok((_, head)) => Outcome::info(format!("macro {} deleted", head.name)),
            Err(e) => Outcome::error(session::op_error_message(&e, arg)),
        },
        _ => Outcome::error(format!("unknown macro subcommand '{sub}'")),
    }
}

fn do_run(session: &mut Session, path: &str) -> Outcome {
    if path.is_empty() {
        return Outcome::info(help::topic_text("run"));
    }
    let contents = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => return Outcome::error(format!("cannot read '{path}': {e}")),
    };
    let strict = session.settings.run_mode == crate::settings::RunMode::Strict;
    let mut messages = Vec::new();
    for line in contents.lines() {
        let out = dispatch(session, line);
        if let Some(t) = &out.text {
            if session.settings.comment || !line.trim_start().starts_with('#') {
                messages.push(t.clone());
            }
        }
        if out.is_error && strict {
            messages.push(format!("aborting '{path}' at line: {line}"));
            break;
        }
        if matches!(out.control, Control::Quit) {
            break;
        }
    }
    Outcome::info(messages.join("\n"))
}

fn do_style(session: &mut Session, rest: &str) -> Outcome {
    let rest = rest.trim();
    if rest.is_empty() {
        return Outcome::info(if session.style.full {
            "full".to_string()
        } else {
            format!("simple '{}'", session.style.entropy_sep)
        });
    }
    let (kind, arg) = split_first_word(rest);
    match kind {
        "full" => {
            session.set_style(Style::full());
            Outcome::info("style set to full".to_string())
        }
        "simple" | "compact" => {
            let sep = arg.chars().next().unwrap_or(',');
            let extended = session.settings.simplevar == crate::settings::SimpleVarMode::Extended;
            session.set_style(Style::compact(sep, extended));
            Outcome::info(format!("style set to simple '{sep}'"))
        }
        "?" | "help" => Outcome::info(help::topic_text("style")),
        _ => Outcome::error(format!("unknown style '{kind}'")),
    }
}

fn do_set(session: &mut Session, rest: &str) -> Outcome {
    let rest = rest.trim();
    if rest.is_empty() || rest == "?" || rest.eq_ignore_ascii_case("help") {
        return Outcome::info(session.settings.list().join("\n"));
    }
    match rest.split_once('=') {
        Some((k, v)) => match session.settings.apply(k.trim(), v.trim()) {
            Ok(()) => Outcome::info(format!("{}={}", k.trim(), v.trim())),
            Err(e) => Outcome::error(e.to_string()),
        },
        None => Outcome::error(format!("use 'set name=value' ('{rest}' has no '=')")),
    }
}

fn do_dump(session: &mut Session, path: &str) -> Outcome {
    if path.is_empty() {
        return Outcome::info(help::topic_text("dump"));
    }
    match std::fs::write(Path::new(path), session.dump_script()) {
        Ok(()) => Outcome::info(format!("dumped to '{path}'")),
        Err(e) => Outcome::error(format!("cannot write '{path}': {e}")),
    }
}

/// Drives a rc-style silent load: every line is dispatched with
/// `session.silent` forcing
/// `check`/`zap`/`xcheck` into no-ops, while macro/setting/constraint
/// definitions still apply.
pub fn dispatch_line(session: &mut Session, line: &str) -> Result<(), String> {
    let out = dispatch(session, line);
    if out.is_error {
        return Err(out.text.unwrap_or_default());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn implicit_check_on_non_letter_start() {
        let mut s = Session::new();
        let out = dispatch(&mut s, "(a,b)=(b,a)");
        assert_eq!(out.truth, Some(true));
    }

    #[test]
    fn add_then_list() {
        let mut s = Session::new();
        let _ = dispatch(&mut s, "add a:b");
        let out = dispatch(&mut s, "list all");
        assert!(out.text.unwrap().contains("a:b"));
    }

    #[test]
    fn del_all_clears_constraints() {
        let mut s = Session::new();
        let _ = dispatch(&mut s, "add a:b");
        let _ = dispatch(&mut s, "del all");
        assert_eq!(s.list_constraints().len(), 0);
    }

    #[test]
    fn set_round_trips() {
        let mut s = Session::new();
        let out = dispatch(&mut s, "set timelimit=5");
        assert!(!out.is_error);
        assert_eq!(s.settings.timelimit, 5);
    }

    #[test]
    fn abbreviated_command_resolves_uniquely() {
        let mut s = Session::new();
        let out = dispatch(&mut s, "zap (a,b)==a+b");
        assert!(out.text.unwrap().contains('a'));
    }

    #[test]
    fn quit_signals_control() {
        let mut s = Session::new();
        let out = dispatch(&mut s, "quit");
        assert!(matches!(out.control, Control::Quit));
    }
}
