// ABOUTME: Macro-definition parser (C7) — `Name(params) = body` headers under a restricted variable scope

use crate::cursor::Cursor;
use crate::error::ParseError;
use crate::macros::{FindMode, MacroCatalogue, MacroHead};
use crate::parser::{parse_macro_body, read_var_token, Style};
use crate::vartable::VarTable;

/// Everything parsed from a macro header, before the body is known: the
/// identity used for catalogue lookup plus the declared parameter names
/// (needed only to report *which* parameter is unused, by position).
pub struct MacroHeader {
    pub head: MacroHead,
    pub param_names: Vec<String>,
}

/// Parses `Name(p1 sep p2 sep ...)`. Resets `vars` first so parameter `i`
/// is interned at bit `i` (slot assignment is positional): a repeated
/// parameter name re-resolves to an earlier bit instead of a fresh one,
/// which is exactly how a duplicate parameter is detected.
pub fn parse_macro_header(cur: &mut Cursor, vars: &mut VarTable, style: &Style) -> Result<MacroHeader, ()> {
    vars.reset();

    let name = match cur.current() {
        Some(c) if c.is_ascii_uppercase() => c,
        _ => {
            cur.hard_err(ParseError::MacroDefName);
            return Err(());
        }
    };
    cur.advance();
    if cur.current() != Some('(') {
        cur.hard_err(ParseError::MacroDefName);
        return Err(());
    }
    cur.advance();

    let mut param_names: Vec<String> = Vec::new();
    let mut signature: u32 = 0;
    loop {
        let tok = match read_var_token(cur, style) {
            Some(t) => t,
            None => {
                cur.hard_err(ParseError::MacroDefNoParam);
                return Err(());
            }
        };
        let (idx, _event) = vars.intern(&tok);
        if idx != param_names.len() {
            cur.hard_err(ParseError::MacroDefSameParam);
            return Err(());
        }
        param_names.push(tok);

        match cur.current() {
            Some(')') => {
                cur.advance();
                break;
            }
            Some('|') => {
                signature |= 1 << (param_names.len() - 1);
                cur.advance();
            }
            Some(c) if c == style.entropy_sep => {
                cur.advance();
            }
            _ => {
                cur.hard_err(ParseError::MacroDefParamSep);
                return Err(());
            }
        }
    }

    let head = MacroHead { name, arity: param_names.len(), signature };
    Ok(MacroHeader { head, param_names })
}

/// Parses a whole `Name(params) = body` definition. Checks for
/// redefinition of a standard macro or an exact duplicate before parsing
/// the body (so a body error never leaves a half-registered macro), then
/// parses the body under the restricted parameter scope with the "no new
/// variables" guard armed, and verifies every parameter survives into the
/// collapsed body. Registration itself (`macros.add`) is left to the
/// caller (the `Session`), which also owns the capacity check.
pub fn parse_macro_definition(
    cur: &mut Cursor,
    vars: &mut VarTable,
    macros: &MacroCatalogue,
    style: &Style,
) -> Result<(MacroHead, crate::expr::Expr), ()> {
    let header = parse_macro_header(cur, vars, style)?;

    if let Some(existing) = macros.find(header.head, FindMode::Exact) {
        if macros.get(existing).map(|m| m.standard).unwrap_or(false) {
            cur.hard_err(ParseError::MacroDefStandard);
        } else {
            cur.hard_err(ParseError::MacroDefDuplicate);
        }
        return Err(());
    }

    if cur.current() != Some('=') {
        cur.hard_err(ParseError::MacroDefNoEq);
        return Err(());
    }
    cur.advance();

    vars.arm_no_new("only macro arguments can be used");
    let body = parse_macro_body(cur, vars, macros, style);
    vars.disarm_no_new();
    let body = body?;

    let arity = header.head.arity;
    for (slot, pname) in header.param_names.iter().enumerate() {
        let bit = 1u32 << slot;
        let used = body.terms.iter().any(|t| t.set & bit != 0);
        if !used {
            cur.hard_err(ParseError::MacroDefUnused);
            let _ = pname;
            return Err(());
        }
    }
    debug_assert!(body.terms.iter().all(|t| t.set < (1u32 << arity)));

    Ok((header.head, body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ParseError;
    use crate::parser::Style;

    fn def(input: &str) -> Result<(MacroHead, crate::expr::Expr), (ParseError, usize)> {
        let mut vars = VarTable::new();
        let macros = MacroCatalogue::default();
        let style = Style::compact(',', false);
        let mut cur = Cursor::new(input);
        parse_macro_definition(&mut cur, &mut vars, &macros, &style)
            .map_err(|_| cur.diag.hard.clone().unwrap())
    }

    #[test]
    fn defines_a_simple_macro() {
        let (head, body) = def("D(a,b,c)=(a,b|c)+(b,c|a)+(c,a|b)").unwrap();
        assert_eq!(head.name, 'D');
        assert_eq!(head.arity, 3);
        assert!(!body.terms.is_empty());
    }

    #[test]
    fn rejects_redefining_standard_macro() {
        let err = def("I(a,b)=a+b").unwrap_err();
        assert_eq!(err.0, ParseError::MacroDefStandard);
    }

    #[test]
    fn rejects_duplicate_parameter_names() {
        let err = def("F(a,a)=a").unwrap_err();
        assert_eq!(err.0, ParseError::MacroDefSameParam);
    }

    #[test]
    fn rejects_unused_parameter() {
        let err = def("F(a,b)=a").unwrap_err();
        assert_eq!(err.0, ParseError::MacroDefUnused);
    }

    #[test]
    fn rejects_undeclared_variable_in_body() {
        let err = def("F(a,b)=a+x").unwrap_err();
        assert_eq!(err.0, ParseError::IdInMacro);
    }
}
