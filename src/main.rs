use clap::Parser;
use minitip::dispatch::{self, Control};
use minitip::highlighter::MinitipHelper;
use minitip::parser::Style;
use minitip::session::{self, Session};
use minitip::{config, lp, settings};
use rustyline::error::ReadlineError;
use rustyline::{Config as RlConfig, Editor};
use std::path::PathBuf;

/// minitip's command-line surface. `-e` is not a
/// standard clap terminator — it means "everything after this is
/// positional, even if it looks like a flag" — so argv is split by hand
/// in `main` before clap ever sees it; `positional` below only absorbs
/// whatever clap's own (hyphen-sensitive) positional matching finds when
/// `-e` was never used.
#[derive(Parser, Debug)]
#[command(name = "minitip")]
#[command(version = config::VERSION)]
#[command(about = "Interactive prover for Shannon-type information-theoretic inequalities")]
#[command(disable_version_flag = true)]
struct CliArgs {
    /// Print the version and exit.
    #[arg(short = 'v', long = "version")]
    version: bool,

    /// Switch to compact style at startup; takes an optional separator
    /// character (default ',').
    #[arg(short = 's', num_args = 0..=1, default_missing_value = ",", value_name = "SEP")]
    simple: Option<String>,

    /// Switch to full style at startup.
    #[arg(short = 'S')]
    full: bool,

    /// History file path (overrides the `history` setting's default).
    #[arg(short = 'f', value_name = "FILE")]
    history_file: Option<String>,

    /// Startup config script (default: `.minitiprc` if present). `-c-`
    /// disables config-file loading entirely.
    #[arg(short = 'c', value_name = "FILE")]
    config: Option<String>,

    /// Pre-install a macro definition before reading other input; may be
    /// repeated.
    #[arg(short = 'm', value_name = "DEF", action = clap::ArgAction::Append)]
    macro_defs: Vec<String>,

    /// Suppress the startup banner.
    #[arg(short = 'q')]
    quiet: bool,

    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    positional: Vec<String>,
}

/// Splits `argv` (without the program name) on a literal `-e` token: the
/// part before it goes to clap as usual, the part after it is taken
/// verbatim as positional arguments, bypassing clap's flag detection.
fn split_for_clap(argv: &[String]) -> (Vec<String>, Vec<String>) {
    match argv.iter().position(|a| a == "-e") {
        Some(i) => (argv[..i].to_vec(), argv[i + 1..].to_vec()),
        None => (argv.to_vec(), Vec::new()),
    }
}

/// Runs `expr` once against `session` (optionally after adding
/// `constraints`), returning the text to print and the process exit code
/// minitip uses for its one-shot mode: 0 true, 1 false, 2 syntax error, 3
/// other error.
fn run_once(session: &mut Session, expr: &str, constraints: &[String]) -> (String, i32) {
    for c in constraints {
        if let Err(e) = session.add_constraint(c) {
            return (session::op_error_message(&e, c), 2);
        }
    }
    match session.check(expr, true) {
        Ok(report) => {
            let text = session::render_report(&report);
            let code = match &report {
                session::CheckReport::Outcome(lp::CheckOutcome::SolverError(_)) => 3,
                _ if session::report_is_true(&report) => 0,
                _ => 1,
            };
            (text, code)
        }
        Err(e) => {
            let msg = session::op_error_message(&e, expr);
            let code = if matches!(e, session::SessionOpError::Parse(_)) { 2 } else { 3 };
            (msg, code)
        }
    }
}

fn main() {
    let argv: Vec<String> = std::env::args().collect();
    let (flag_argv, forced_positional) = split_for_clap(&argv[1..]);
    let mut full = vec![argv[0].clone()];
    full.extend(flag_argv);
    let mut args = CliArgs::parse_from(full);
    args.positional.extend(forced_positional);

    if args.version {
        println!("minitip {}", config::VERSION);
        std::process::exit(0);
    }

    let mut session = Session::new();

    if args.full {
        session.set_style(Style::full());
    } else if let Some(sep) = &args.simple {
        let extended = session.settings.simplevar == settings::SimpleVarMode::Extended;
        let sep_char = sep.chars().next().unwrap_or(',');
        session.set_style(Style::compact(sep_char, extended));
    }

    if let Some(path) = &args.history_file {
        session.settings.history = PathBuf::from(path);
    }

    if let Some(rc_path) = config::resolve_rc_path(&args.config) {
        if let Err(e) = config::load_rc_file(&mut session, &rc_path) {
            eprintln!("{}", config::render_load_error(&e));
            std::process::exit(3);
        }
    }

    for def in &args.macro_defs {
        if let Err(e) = session.macro_add(def) {
            eprintln!("{}", session::op_error_message(&e, def));
            std::process::exit(2);
        }
    }

    if !args.positional.is_empty() {
        let expr = args.positional[0].clone();
        let constraints = args.positional[1..].to_vec();
        let (text, code) = run_once(&mut session, &expr, &constraints);
        println!("{text}");
        std::process::exit(code);
    }

    if !args.quiet {
        println!("{}", config::WELCOME_MESSAGE);
        println!("{}", config::WELCOME_SUBTITLE);
        println!("{}", config::WELCOME_FOOTER);
    }

    let rl_config = RlConfig::builder().auto_add_history(true).build();
    let mut rl = match Editor::with_config(rl_config) {
        Ok(rl) => rl,
        Err(e) => {
            eprintln!("failed to initialize the prompt: {e}");
            std::process::exit(3);
        }
    };
    rl.set_helper(Some(MinitipHelper::new()));
    let _ = rl.load_history(&session.settings.history);

    loop {
        match rl.readline("minitip> ") {
            Ok(line) => {
                let outcome = dispatch::dispatch(&mut session, &line);
                if let Some(text) = &outcome.text {
                    if outcome.is_error {
                        eprintln!("{text}");
                    } else {
                        println!("{text}");
                    }
                }
                match outcome.control {
                    Control::Quit => break,
                    Control::SaveHistory(path) => {
                        let target = path.map(PathBuf::from).unwrap_or_else(|| session.settings.history.clone());
                        let _ = rl.save_history(&target);
                    }
                    Control::Continue => {}
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => {
                break;
            }
            Err(e) => {
                eprintln!("readline error: {e}");
                break;
            }
        }
    }

    if session.settings.save != settings::SaveMode::No {
        let _ = rl.save_history(&session.settings.history);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_e_marker() {
        let argv = vec!["-s".to_string(), ";".to_string(), "-e".to_string(), "-weird".to_string(), "a+b".to_string()];
        let (flags, pos) = split_for_clap(&argv);
        assert_eq!(flags, vec!["-s".to_string(), ";".to_string()]);
        assert_eq!(pos, vec!["-weird".to_string(), "a+b".to_string()]);
    }

    #[test]
    fn no_marker_keeps_everything_as_flags() {
        let argv = vec!["-q".to_string(), "ab=ba".to_string()];
        let (flags, pos) = split_for_clap(&argv);
        assert_eq!(flags, argv);
        assert!(pos.is_empty());
    }

    #[test]
    fn run_once_true_exits_zero() {
        let mut s = Session::new();
        let (text, code) = run_once(&mut s, "(a,b)=(b,a)", &[]);
        assert_eq!(code, 0);
        assert!(text.contains("TRUE"));
    }

    #[test]
    fn run_once_false_exits_one() {
        let mut s = Session::new();
        let (_, code) = run_once(&mut s, "H(a)>=ab", &[]);
        assert_eq!(code, 1);
    }

    #[test]
    fn run_once_syntax_error_exits_two() {
        let mut s = Session::new();
        let (_, code) = run_once(&mut s, "@@@", &[]);
        assert_eq!(code, 2);
    }

    #[test]
    fn run_once_with_constraint_true() {
        let mut s = Session::new();
        let (text, code) = run_once(&mut s, "H(a)<=H(b)", &["a:b".to_string()]);
        assert_eq!(code, 0);
        assert!(text.contains("TRUE"));
    }
}
