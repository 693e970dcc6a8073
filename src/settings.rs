// ABOUTME: Runtime parameters (C14) — the `set` command's parameter surface

use std::fmt;
use std::path::PathBuf;

/// `run FILE` error-handling mode: abort on the first nonzero return, or
/// continue past anything but a fatal (too-long-line / nesting) error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Strict,
    Loose,
}

/// Whether to prompt, always, or never save on quit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveMode {
    Yes,
    No,
    Ask,
}

/// Whether compact-syntax single-letter variables may carry trailing
/// digits (`a123`) in addition to primes. Left as a direct, uncritical
/// toggle rather than something this crate tries to silently "fix" —
/// the digit/separator interaction has no single obviously-right answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimpleVarMode {
    Basic,
    Extended,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub iterlimit: u64,
    pub timelimit: u64,
    pub constrlimit: usize,
    pub macrolimit: usize,
    pub run_mode: RunMode,
    pub comment: bool,
    pub abbrev: bool,
    pub save: SaveMode,
    pub simplevar: SimpleVarMode,
    pub history: PathBuf,
}

pub const MIN_ITERLIMIT: u64 = 100;
pub const MAX_ITERLIMIT: u64 = 100_000_000;
pub const MIN_TIMELIMIT: u64 = 1;
pub const MAX_TIMELIMIT: u64 = 10_000;

impl Default for Settings {
    fn default() -> Self {
        Settings {
            iterlimit: 80_000,
            timelimit: 10,
            constrlimit: crate::DEFAULT_MAX_CONSTRAINTS,
            macrolimit: crate::macros::DEFAULT_MAX_MACROS,
            run_mode: RunMode::Strict,
            comment: true,
            abbrev: true,
            save: SaveMode::Ask,
            simplevar: SimpleVarMode::Basic,
            history: PathBuf::from(".minitip_history"),
        }
    }
}

/// One `set name=value` assignment, already validated against its bound.
/// Soft errors (out-of-range, unknown key, malformed value) are reported
/// by the caller using `SettingsError`'s message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingsError {
    UnknownKey(String),
    OutOfRange { key: &'static str, min: i64, max: i64 },
    BadValue { key: &'static str, value: String },
}

impl fmt::Display for SettingsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingsError::UnknownKey(k) => write!(f, "unknown setting '{k}'"),
            SettingsError::OutOfRange { key, min, max } => {
                write!(f, "'{key}' must be between {min} and {max}")
            }
            SettingsError::BadValue { key, value } => {
                write!(f, "'{value}' is not a valid value for '{key}'")
            }
        }
    }
}

impl Settings {
    /// Applies one `name=value` assignment (the right-hand side of the
    /// `set` command).
    pub fn apply(&mut self, name: &str, value: &str) -> Result<(), SettingsError> {
        match name {
            "iterlimit" => {
                let v: u64 = value
                    .parse()
                    .map_err(|_| SettingsError::BadValue { key: "iterlimit", value: value.to_string() })?;
                if v < MIN_ITERLIMIT || v > MAX_ITERLIMIT {
                    return Err(SettingsError::OutOfRange {
                        key: "iterlimit",
                        min: MIN_ITERLIMIT as i64,
                        max: MAX_ITERLIMIT as i64,
                    });
                }
                self.iterlimit = v;
            }
            "timelimit" => {
                let v: u64 = value
                    .parse()
                    .map_err(|_| SettingsError::BadValue { key: "timelimit", value: value.to_string() })?;
                if v < MIN_TIMELIMIT || v > MAX_TIMELIMIT {
                    return Err(SettingsError::OutOfRange {
                        key: "timelimit",
                        min: MIN_TIMELIMIT as i64,
                        max: MAX_TIMELIMIT as i64,
                    });
                }
                self.timelimit = v;
            }
            "constrlimit" => {
                self.constrlimit = value
                    .parse()
                    .map_err(|_| SettingsError::BadValue { key: "constrlimit", value: value.to_string() })?;
            }
            "macrolimit" => {
                self.macrolimit = value
                    .parse()
                    .map_err(|_| SettingsError::BadValue { key: "macrolimit", value: value.to_string() })?;
            }
            "run" => {
                self.run_mode = match value {
                    "strict" => RunMode::Strict,
                    "loose" => RunMode::Loose,
                    _ => return Err(SettingsError::BadValue { key: "run", value: value.to_string() }),
                };
            }
            "comment" => self.comment = parse_yesno("comment", value)?,
            "abbrev" => self.abbrev = parse_yesno("abbrev", value)?,
            "save" => {
                self.save = match value {
                    "yes" => SaveMode::Yes,
                    "no" => SaveMode::No,
                    "ask" => SaveMode::Ask,
                    _ => return Err(SettingsError::BadValue { key: "save", value: value.to_string() }),
                };
            }
            "simplevar" => {
                self.simplevar = match value {
                    "basic" => SimpleVarMode::Basic,
                    "extended" => SimpleVarMode::Extended,
                    _ => return Err(SettingsError::BadValue { key: "simplevar", value: value.to_string() }),
                };
            }
            "history" => self.history = PathBuf::from(value),
            _ => return Err(SettingsError::UnknownKey(name.to_string())),
        }
        Ok(())
    }

    /// Renders every current setting as `name=value` lines, the shape
    /// `list`/`dump` need.
    pub fn list(&self) -> Vec<String> {
        vec![
            format!("iterlimit={}", self.iterlimit),
            format!("timelimit={}", self.timelimit),
            format!("constrlimit={}", self.constrlimit),
            format!("macrolimit={}", self.macrolimit),
            format!("run={}", if self.run_mode == RunMode::Strict { "strict" } else { "loose" }),
            format!("comment={}", yesno(self.comment)),
            format!("abbrev={}", yesno(self.abbrev)),
            format!(
                "save={}",
                match self.save {
                    SaveMode::Yes => "yes",
                    SaveMode::No => "no",
                    SaveMode::Ask => "ask",
                }
            ),
            format!(
                "simplevar={}",
                match self.simplevar {
                    SimpleVarMode::Basic => "basic",
                    SimpleVarMode::Extended => "extended",
                }
            ),
            format!("history={}", self.history.display()),
        ]
    }
}

fn parse_yesno(key: &'static str, value: &str) -> Result<bool, SettingsError> {
    match value {
        "yes" => Ok(true),
        "no" => Ok(false),
        _ => Err(SettingsError::BadValue { key, value: value.to_string() }),
    }
}

fn yesno(b: bool) -> &'static str {
    if b {
        "yes"
    } else {
        "no"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let s = Settings::default();
        assert_eq!(s.iterlimit, 80_000);
        assert_eq!(s.timelimit, 10);
    }

    #[test]
    fn rejects_out_of_range_iterlimit() {
        let mut s = Settings::default();
        assert!(s.apply("iterlimit", "50").is_err());
        assert!(s.apply("iterlimit", "1000").is_ok());
    }

    #[test]
    fn rejects_unknown_key() {
        let mut s = Settings::default();
        assert_eq!(s.apply("bogus", "1"), Err(SettingsError::UnknownKey("bogus".to_string())));
    }

    #[test]
    fn round_trips_through_list() {
        let mut s = Settings::default();
        s.apply("run", "loose").unwrap();
        assert!(s.list().contains(&"run=loose".to_string()));
    }
}
