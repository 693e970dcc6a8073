// ABOUTME: Expression parser (C5) — atomic entropy forms, macro invocations, signed sums, relations

use crate::cursor::Cursor;
use crate::error::{ParseError, ResourceError};
use crate::expr::{Expr, Kind};
use crate::macros::{FindMode, MacroCatalogue, MacroHead};
use crate::vartable::{IdEvent, Mask, VarTable};

/// Everything about an expression's surface syntax that varies between the
/// two grammars: identifier shape, the list separator between variables,
/// and the separator used inside `(.)`/`[.]` forms to mark the mutual-
/// information split point.
#[derive(Debug, Clone, Copy)]
pub struct Style {
    pub full: bool,
    /// Entropy separator: `;` always in full syntax, user-chosen in
    /// compact syntax (`set syntax` / `-s` flag).
    pub entropy_sep: char,
    /// Compact-syntax extension allowing trailing digits after the primes
    /// in a single-letter identifier (`set simplevar`). Left unresolved at
    /// the edges the spec leaves open; see DESIGN.md.
    pub simplevar_extended: bool,
}

impl Style {
    pub fn full() -> Self {
        Style { full: true, entropy_sep: ';', simplevar_extended: false }
    }

    pub fn compact(entropy_sep: char, simplevar_extended: bool) -> Self {
        Style { full: false, entropy_sep, simplevar_extended }
    }
}

/// Maps a `VarTable::intern` side effect onto the right diagnostic slot.
fn route_id_event(cur: &mut Cursor, event: Option<IdEvent>) {
    match event {
        None => {}
        Some(IdEvent::NoNew(_)) => cur.hard_err(ParseError::IdInMacro),
        Some(IdEvent::TooMany) => cur.soft_err(ResourceError::TooManyVariables),
    }
}

/// Reads one variable token under `style`: a single lowercase letter plus
/// primes (and, if `simplevar_extended`, trailing digits) in compact
/// syntax; a letter-then-alphanumeric identifier in full syntax.
pub(crate) fn read_var_token(cur: &mut Cursor, style: &Style) -> Option<String> {
    if style.full {
        let c = cur.current()?;
        if !c.is_ascii_alphabetic() {
            return None;
        }
        cur.read_identifier(crate::vartable::MAX_ID_LENGTH, |_| false)
    } else {
        let c = cur.current()?;
        if !c.is_ascii_lowercase() {
            return None;
        }
        let start = cur.save_pos();
        let mut s = String::new();
        s.push(c);
        cur.bump();
        while cur.current() == Some('\'') {
            s.push('\'');
            cur.bump();
        }
        if style.simplevar_extended {
            while matches!(cur.current(), Some(d) if d.is_ascii_digit()) {
                s.push(cur.current().unwrap());
                cur.bump();
            }
        }
        if s.is_empty() {
            cur.restore_pos(start);
            return None;
        }
        cur.skip_ws();
        Some(s)
    }
}

/// Parses zero or more variable tokens into a mask: comma-separated in
/// full syntax, concatenated with no separator in compact syntax. Returns
/// `None` if not even one token is present (caller decides which specific
/// hard error that implies).
pub(crate) fn parse_variable_list(cur: &mut Cursor, vars: &mut VarTable, style: &Style) -> Option<Mask> {
    let mut mask: Mask = 0;
    let mut any = false;
    loop {
        let name = match read_var_token(cur, style) {
            Some(n) => n,
            None => break,
        };
        let (idx, event) = vars.intern(&name);
        route_id_event(cur, event);
        mask |= 1 << idx;
        any = true;
        if style.full {
            if cur.current() == Some(',') {
                cur.advance();
                continue;
            } else {
                break;
            }
        }
        // compact: keep consuming tokens as long as they look like one
    }
    if any {
        Some(mask)
    } else {
        None
    }
}

pub(crate) fn parse_variable_list_required(
    cur: &mut Cursor,
    vars: &mut VarTable,
    style: &Style,
    on_missing: ParseError,
) -> Result<Mask, ()> {
    match parse_variable_list(cur, vars, style) {
        Some(m) => Ok(m),
        None => {
            cur.hard_err(on_missing);
            Err(())
        }
    }
}

fn expect_sep(cur: &mut Cursor, style: &Style, on_missing: ParseError) -> Result<(), ()> {
    if cur.current() == Some(style.entropy_sep) {
        cur.advance();
        Ok(())
    } else {
        cur.hard_err(on_missing);
        Err(())
    }
}

/// `(V)`, `(V1|V2)`, `(V1;V2)`, `(V1;V2|V3)` — the bracket forms that
/// stand for `H`/conditional `H`/`I`/conditional `I` with no explicit
/// function-name prefix, per the atomic-form table.
fn parse_paren_form(
    cur: &mut Cursor,
    vars: &mut VarTable,
    style: &Style,
    out: &mut Expr,
    coeff: f64,
) -> Result<(), ()> {
    cur.advance(); // consume '('
    let v1 = parse_variable_list_required(cur, vars, style, ParseError::CondExpr)?;
    match cur.current() {
        Some(')') => {
            cur.advance();
            accumulate(out, v1, coeff, cur);
        }
        Some('|') => {
            cur.advance();
            let v2 = parse_variable_list_required(cur, vars, style, ParseError::MissingConditioning)?;
            if cur.current() != Some(')') {
                cur.hard_err(ParseError::Closing);
                return Err(());
            }
            cur.advance();
            accumulate(out, v1 | v2, coeff, cur);
            accumulate(out, v2, -coeff, cur);
        }
        Some(c) if c == style.entropy_sep => {
            cur.advance();
            let v2 = parse_variable_list_required(cur, vars, style, ParseError::VarExpected)?;
            match cur.current() {
                Some(')') => {
                    cur.advance();
                    i2(out, v1, v2, coeff, cur);
                }
                Some('|') => {
                    cur.advance();
                    let v3 = parse_variable_list_required(cur, vars, style, ParseError::MissingConditioning)?;
                    if cur.current() != Some(')') {
                        cur.hard_err(ParseError::Closing);
                        return Err(());
                    }
                    cur.advance();
                    i3(out, v1, v2, v3, coeff, cur);
                }
                _ => {
                    cur.hard_err(ParseError::CommaOrBar);
                    return Err(());
                }
            }
        }
        _ => {
            cur.hard_err(ParseError::CommaOrBar);
            return Err(());
        }
    }
    Ok(())
}

/// `[V1;V2;V3;V4]`: `-I(V1;V2) + I(V1;V2|V3) + I(V1;V2|V4) + I(V3;V4)`.
fn parse_ingleton(
    cur: &mut Cursor,
    vars: &mut VarTable,
    style: &Style,
    out: &mut Expr,
    coeff: f64,
) -> Result<(), ()> {
    cur.advance(); // consume '['
    let v1 = parse_variable_list_required(cur, vars, style, ParseError::IngletonVar)?;
    expect_sep(cur, style, ParseError::IngletonSep)?;
    let v2 = parse_variable_list_required(cur, vars, style, ParseError::IngletonVar)?;
    expect_sep(cur, style, ParseError::IngletonSep)?;
    let v3 = parse_variable_list_required(cur, vars, style, ParseError::IngletonVar)?;
    expect_sep(cur, style, ParseError::IngletonSep)?;
    let v4 = parse_variable_list_required(cur, vars, style, ParseError::IngletonVar)?;
    if cur.current() != Some(']') {
        cur.hard_err(ParseError::IngletonClose);
        return Err(());
    }
    cur.advance();
    i2(out, v1, v2, -coeff, cur);
    i3(out, v1, v2, v3, coeff, cur);
    i3(out, v1, v2, v4, coeff, cur);
    i2(out, v3, v4, coeff, cur);
    Ok(())
}

/// `Name(arg sep arg sep ... | arg ...)`: a macro invocation. Only
/// attempted for an uppercase-leading identifier, and only committed to
/// once the catalogue confirms some macro under that name exists at all —
/// otherwise the caller backtracks and reports the identifier as
/// unrecognized.
fn parse_macro_invocation(
    cur: &mut Cursor,
    vars: &mut VarTable,
    macros: &MacroCatalogue,
    style: &Style,
    out: &mut Expr,
    coeff: f64,
) -> Result<bool, ()> {
    let save = cur.save_pos();
    let name = cur.current().unwrap();
    if !macros.has_name(name) {
        return Ok(false);
    }
    cur.bump();
    cur.skip_ws();
    if cur.current() != Some('(') {
        cur.restore_pos(save);
        return Ok(false);
    }
    cur.advance();

    let mut args: Vec<Mask> = Vec::new();
    let mut sig: u32 = 0;
    loop {
        let v = parse_variable_list_required(cur, vars, style, ParseError::VarExpected)?;
        args.push(v);
        let arity = args.len();
        match cur.current() {
            Some(')') => {
                cur.advance();
                break;
            }
            Some('|') => {
                let exact_ahead = macros
                    .find(MacroHead { name, arity, signature: sig }, FindMode::PrefixPipe)
                    .is_some();
                if !exact_ahead {
                    cur.hard_err(ParseError::NoMacroArg);
                    return Err(());
                }
                sig |= 1 << (arity - 1);
                cur.advance();
            }
            Some(c) if c == style.entropy_sep => {
                let ahead = macros
                    .find(MacroHead { name, arity, signature: sig }, FindMode::PrefixSep)
                    .is_some();
                if !ahead {
                    cur.hard_err(ParseError::NoMacroArg);
                    return Err(());
                }
                cur.advance();
            }
            _ => {
                cur.hard_err(ParseError::MacroArgSep);
                return Err(());
            }
        }
    }

    let head = MacroHead { name, arity: args.len(), signature: sig };
    match macros.find(head, FindMode::Exact) {
        Some(idx) => {
            if let Err(e) = macros.expand(idx, &args, coeff, out) {
                cur.soft_err(e);
            }
            Ok(true)
        }
        None => {
            cur.hard_err(ParseError::NoMacroArg);
            Err(())
        }
    }
}

fn accumulate(out: &mut Expr, set: Mask, coeff: f64, cur: &mut Cursor) {
    if let Err(e) = out.add(set, coeff) {
        cur.soft_err(e);
    }
}

fn i2(out: &mut Expr, a: Mask, b: Mask, coeff: f64, cur: &mut Cursor) {
    if let Err(e) = out.i2(a, b, coeff) {
        cur.soft_err(e);
    }
}

fn i3(out: &mut Expr, a: Mask, b: Mask, c: Mask, coeff: f64, cur: &mut Cursor) {
    if let Err(e) = out.i3(a, b, c, coeff) {
        cur.soft_err(e);
    }
}

/// Tries to consume one atomic form at the cursor: a bare variable list,
/// a `(.)` form, a `[.]` Ingleton form, or a macro invocation. `Ok(false)`
/// means nothing atomic-shaped was here at all (cursor untouched); the
/// caller reports a generic "unrecognized character" in that case.
fn parse_atomic(
    cur: &mut Cursor,
    vars: &mut VarTable,
    macros: &MacroCatalogue,
    style: &Style,
    out: &mut Expr,
    coeff: f64,
) -> Result<bool, ()> {
    match cur.current() {
        Some('(') => {
            parse_paren_form(cur, vars, style, out, coeff)?;
            Ok(true)
        }
        Some('[') => {
            parse_ingleton(cur, vars, style, out, coeff)?;
            Ok(true)
        }
        Some(c) if c.is_ascii_uppercase() => parse_macro_invocation(cur, vars, macros, style, out, coeff),
        Some(c) if (style.full && c.is_ascii_alphabetic()) || (!style.full && c.is_ascii_lowercase()) => {
            let mask = parse_variable_list_required(cur, vars, style, ParseError::VarList)?;
            accumulate(out, mask, coeff, cur);
            Ok(true)
        }
        _ => Ok(false),
    }
}

/// Scans a decimal literal without consuming trailing whitespace mid-token
/// (`bump`, not `advance`); whitespace after the literal is skipped once
/// the whole token is known.
fn parse_number(cur: &mut Cursor) -> Option<f64> {
    let start = cur.save_pos();
    let mut s = String::new();
    let mut saw_digit = false;
    while let Some(c) = cur.current() {
        if c.is_ascii_digit() {
            saw_digit = true;
            s.push(c);
            cur.bump();
        } else if c == '.' && !s.contains('.') {
            s.push(c);
            cur.bump();
        } else {
            break;
        }
    }
    if !saw_digit {
        cur.restore_pos(start);
        return None;
    }
    let val = s.parse::<f64>().ok();
    if val.is_some() {
        cur.skip_ws();
    } else {
        cur.restore_pos(start);
    }
    val
}

/// `+`/`-` only; `required` controls whether an absent sign is itself an
/// error (mandatory between terms, optional at the very start of a side).
fn parse_sign(cur: &mut Cursor, required: bool) -> Result<f64, ()> {
    match cur.current() {
        Some('+') => {
            cur.advance();
            Ok(1.0)
        }
        Some('-') => {
            cur.advance();
            Ok(-1.0)
        }
        _ if required => {
            cur.hard_err(ParseError::PlusOrMinus);
            Err(())
        }
        _ => Ok(1.0),
    }
}

/// Which relation character(s) were consumed, carrying the `Kind` the
/// expression should adopt and a flag telling the caller whether to flip
/// the sign of everything accumulated so far (the `<=` reformulation).
struct Relation {
    kind: Kind,
    flip_lhs: bool,
}

/// Tries to consume a relation operator at the cursor. `diff_mode`
/// selects which operator family is legal here: ordinary relations use
/// `=`/`<=`/`>=`, while a zap (diff) expression uses `==` alone.
fn try_parse_relation(cur: &mut Cursor, diff_mode: bool) -> Result<Option<Relation>, ()> {
    match cur.current() {
        Some('=') => {
            cur.advance();
            if cur.current() == Some('=') {
                cur.advance();
                if diff_mode {
                    Ok(Some(Relation { kind: Kind::Diff, flip_lhs: false }))
                } else {
                    cur.hard_err(ParseError::DblEqRelation);
                    Err(())
                }
            } else if diff_mode {
                cur.hard_err(ParseError::DiffUseEq);
                Err(())
            } else {
                Ok(Some(Relation { kind: Kind::Eq, flip_lhs: false }))
            }
        }
        Some('<') => {
            cur.advance();
            if cur.current() == Some('=') {
                cur.advance();
                Ok(Some(Relation { kind: Kind::Ge, flip_lhs: true }))
            } else {
                cur.hard_err(ParseError::LessNeedsEq);
                Err(())
            }
        }
        Some('>') => {
            cur.advance();
            if cur.current() == Some('=') {
                cur.advance();
                Ok(Some(Relation { kind: Kind::Ge, flip_lhs: false }))
            } else {
                cur.hard_err(ParseError::GreaterNeedsEq);
                Err(())
            }
        }
        _ => Ok(None),
    }
}

/// Parses one signed term (`[sign] [number ['*']] atomic-form`, or the
/// bare-zero idiom) and accumulates it into `out`. `sign_required`
/// matches the grammar's B_EXPR/A_EXPR states, where every term after the
/// first on a side must carry an explicit sign. `bare_zero_allowed`
/// matches START/REL, where a lone literal `0` stands for an empty side of
/// the relation. `negate` flips the accumulated sign, used for the
/// default "subtract the right-hand side" reformulation.
fn parse_term(
    cur: &mut Cursor,
    vars: &mut VarTable,
    macros: &MacroCatalogue,
    style: &Style,
    out: &mut Expr,
    sign_required: bool,
    bare_zero_allowed: bool,
    negate: bool,
) -> Result<(), ()> {
    let sign = parse_sign(cur, sign_required)?;
    let effective = if negate { -sign } else { sign };

    if let Some(n) = parse_number(cur) {
        if cur.current() == Some('*') {
            cur.advance();
        }
        return match parse_atomic(cur, vars, macros, style, out, effective * n)? {
            true => Ok(()),
            false => {
                if n == 0.0 && bare_zero_allowed {
                    Ok(())
                } else {
                    cur.hard_err(ParseError::NotHomogeneous);
                    Err(())
                }
            }
        };
    }

    if parse_atomic(cur, vars, macros, style, out, effective)? {
        return Ok(());
    }

    cur.hard_err(ParseError::WrongItem);
    Err(())
}

/// The overall shape this call is being asked to parse: an ordinary
/// checkable relation, or a zap/diff expression (`==`, no truth judgement).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExprMode {
    Relation,
    Diff,
}

/// Parses a full relation (or diff) expression from the cursor's input,
/// walking a four-state grammar (START / B_EXPR / REL / A_EXPR),
/// collapsing the result before returning it. Any error is recorded on
/// `cur.diag`; callers render it against the source line on failure.
pub fn parse_expression(
    cur: &mut Cursor,
    vars: &mut VarTable,
    macros: &MacroCatalogue,
    style: &Style,
    mode: ExprMode,
) -> Result<Expr, ()> {
    let diff_mode = mode == ExprMode::Diff;
    let mut out = Expr::new(Kind::Ge); // reassigned once the relation is seen
    let mut got_relation = false;
    let mut terms_before = 0usize;
    let mut terms_after = 0usize;
    let mut rhs_negate = true;

    cur.skip_ws();
    if cur.at_end() {
        cur.hard_err(ParseError::Empty);
        return Err(());
    }

    loop {
        if cur.at_end() {
            break;
        }
        if !got_relation {
            if let Some(rel) = try_parse_relation(cur, diff_mode)? {
                if rel.flip_lhs {
                    for t in out.terms.iter_mut() {
                        t.coeff = -t.coeff;
                    }
                }
                rhs_negate = !rel.flip_lhs;
                out.kind = rel.kind;
                got_relation = true;
                continue;
            }
            let first = terms_before == 0;
            parse_term(cur, vars, macros, style, &mut out, !first, first, false)?;
            terms_before += 1;
        } else {
            if try_parse_relation(cur, diff_mode)?.is_some() {
                cur.hard_err(ParseError::DoubleRelation);
                return Err(());
            }
            let first = terms_after == 0;
            parse_term(cur, vars, macros, style, &mut out, !first, first, rhs_negate)?;
            terms_after += 1;
        }
        cur.skip_ws();
    }

    if !cur.at_end() {
        cur.hard_err(ParseError::ExtraText);
        return Err(());
    }
    if !got_relation {
        cur.hard_err(if diff_mode { ParseError::DiffUseEq } else { ParseError::NoRelation });
        return Err(());
    }
    if terms_after == 0 && !diff_mode {
        cur.hard_err(ParseError::NoRhs);
        return Err(());
    }

    out.collapse();
    if mode == ExprMode::Diff && out.terms.is_empty() {
        cur.hard_err(ParseError::AllZero);
        return Err(());
    }
    Ok(out)
}

/// Parses a macro body: a plain signed sum of terms with no relation at
/// all (the text after a macro definition's `=`). Unlike
/// `parse_expression`'s B_EXPR/A_EXPR split either side of a relation,
/// this is B_EXPR only — there is no right-hand side to subtract.
pub fn parse_macro_body(
    cur: &mut Cursor,
    vars: &mut VarTable,
    macros: &MacroCatalogue,
    style: &Style,
) -> Result<Expr, ()> {
    let mut out = Expr::new(Kind::MacroBody);
    let mut count = 0usize;

    cur.skip_ws();
    if cur.at_end() {
        cur.hard_err(ParseError::Empty);
        return Err(());
    }
    loop {
        if cur.at_end() {
            break;
        }
        let first = count == 0;
        parse_term(cur, vars, macros, style, &mut out, !first, false, false)?;
        count += 1;
        cur.skip_ws();
    }
    if !cur.at_end() {
        cur.hard_err(ParseError::ExtraText);
        return Err(());
    }

    out.collapse();
    if out.terms.is_empty() {
        cur.hard_err(ParseError::MacroDefSimplifiesToZero);
        return Err(());
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(input: &str, full: bool) -> Result<Expr, ()> {
        let mut vars = VarTable::new();
        let macros = {
            let mut m = MacroCatalogue::new();
            m.install_standard();
            m
        };
        let style = if full { Style::full() } else { Style::compact(',', false) };
        let mut cur = Cursor::new(input);
        parse_expression(&mut cur, &mut vars, &macros, &style, ExprMode::Relation)
    }

    #[test]
    fn parses_plain_mutual_information_inequality() {
        let e = check("(a,b)>=0", false).unwrap();
        assert_eq!(e.kind, Kind::Ge);
        assert_eq!(e.terms.len(), 3);
    }

    #[test]
    fn parses_conditional_entropy_form() {
        let e = check("(ab|c)=H(a|c)", true).unwrap();
        assert_eq!(e.kind, Kind::Eq);
        assert!(!e.terms.is_empty());
    }

    #[test]
    fn parses_ingleton_bracket_form() {
        let e = check("[a,b,c,d]>=0", false).unwrap();
        assert_eq!(e.kind, Kind::Ge);
    }

    #[test]
    fn le_relation_flips_left_hand_side() {
        let ge = check("a>=0", false).unwrap();
        let le = check("a<=0", false).unwrap();
        // a<=0 reformulates to 0<=-a, i.e. the lone surviving term is -a.
        assert_eq!(le.terms[0].coeff, -ge.terms[0].coeff);
    }

    #[test]
    fn rejects_double_relation() {
        let mut vars = VarTable::new();
        let macros = MacroCatalogue::default();
        let style = Style::compact(',', false);
        let mut cur = Cursor::new("a=b=c");
        let r = parse_expression(&mut cur, &mut vars, &macros, &style, ExprMode::Relation);
        assert!(r.is_err());
        assert_eq!(cur.diag.hard.unwrap().0, ParseError::DoubleRelation);
    }

    #[test]
    fn rejects_missing_relation() {
        let mut vars = VarTable::new();
        let macros = MacroCatalogue::default();
        let style = Style::compact(',', false);
        let mut cur = Cursor::new("a+b");
        let r = parse_expression(&mut cur, &mut vars, &macros, &style, ExprMode::Relation);
        assert!(r.is_err());
        assert_eq!(cur.diag.hard.unwrap().0, ParseError::NoRelation);
    }

    #[test]
    fn bare_zero_idiom_on_left_side() {
        let e = check("0<=a", false).unwrap();
        assert_eq!(e.kind, Kind::Ge);
        assert_eq!(e.terms.len(), 1);
    }

    #[test]
    fn empty_input_is_an_error() {
        let mut vars = VarTable::new();
        let macros = MacroCatalogue::default();
        let style = Style::compact(',', false);
        let mut cur = Cursor::new("   ");
        let r = parse_expression(&mut cur, &mut vars, &macros, &style, ExprMode::Relation);
        assert!(r.is_err());
        assert_eq!(cur.diag.hard.unwrap().0, ParseError::Empty);
    }

    #[test]
    fn macro_invocation_expands() {
        let e = check("I(a,b)>=0", false).unwrap();
        assert_eq!(e.kind, Kind::Ge);
        assert_eq!(e.terms.len(), 3);
    }

    #[test]
    fn macro_body_needs_no_relation() {
        let mut vars = VarTable::new();
        let macros = MacroCatalogue::default();
        let style = Style::compact(',', false);
        let mut cur = Cursor::new("ab-b");
        let e = parse_macro_body(&mut cur, &mut vars, &macros, &style).unwrap();
        assert_eq!(e.kind, Kind::MacroBody);
        assert_eq!(e.terms.len(), 2);
    }

    #[test]
    fn macro_body_rejects_trailing_relation() {
        let mut vars = VarTable::new();
        let macros = MacroCatalogue::default();
        let style = Style::compact(',', false);
        let mut cur = Cursor::new("ab=c");
        let r = parse_macro_body(&mut cur, &mut vars, &macros, &style);
        assert!(r.is_err());
    }
}
