// ABOUTME: Version/welcome-banner constants and config-file (.minitiprc) loading

use crate::session::Session;
use std::path::{Path, PathBuf};

pub const VERSION: &str = "1.4.0";

pub const WELCOME_MESSAGE: &str = "minitip -- a MINImal Tool for Information Theoretic inequality Proving";
pub const WELCOME_SUBTITLE: &str = "Type 'help' for a list of commands, 'syntax' for how to enter formulas.";
pub const WELCOME_FOOTER: &str = "Use 'quit' or Ctrl-D to leave.";

/// Default config-file name, overridable by `-c FILE`.
pub const DEFAULT_RC_NAME: &str = ".minitiprc";

/// Loads a config file in "silent" mode: the same dispatcher that drives
/// the REPL runs against `session.silent = true`, so macro/setting
/// definitions apply but `check`/`zap` become no-ops. Returns an error only
/// if `path` was explicitly requested (`-c FILE`) and could not be read;
/// a missing *default* rc file
/// is not an error (the caller distinguishes this by not calling us at all
/// when the default file is absent).
pub fn load_rc_file(session: &mut Session, path: &Path) -> Result<(), String> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| format!("cannot read config file {}: {e}", path.display()))?;

    session.silent = true;
    for (lineno, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Err(e) = crate::dispatch::dispatch_line(session, line) {
            session.silent = false;
            return Err(format!("{} line {}: {}", path.display(), lineno + 1, e));
        }
    }
    session.silent = false;
    Ok(())
}

/// Resolves the config file to load at startup: an explicit `-c FILE`
/// (fatal if unreadable), `-c-` (disabled, returns `None`), or the default
/// `.minitiprc` in the current directory (silently skipped if absent).
pub fn resolve_rc_path(explicit: &Option<String>) -> Option<PathBuf> {
    match explicit {
        Some(s) if s == "-" => None,
        Some(s) => Some(PathBuf::from(s)),
        None => {
            let default = PathBuf::from(DEFAULT_RC_NAME);
            if default.is_file() {
                Some(default)
            } else {
                None
            }
        }
    }
}

pub fn render_load_error(err: &str) -> String {
    err.to_string()
}
