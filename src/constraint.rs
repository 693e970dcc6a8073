// ABOUTME: Constraint parser (C6) — functional dependency, total independence, Markov chain, or plain relation

use crate::cursor::Cursor;
use crate::error::ParseError;
use crate::expr::{Expr, Kind, Term};
use crate::macros::MacroCatalogue;
use crate::parser::{parse_expression, parse_variable_list, ExprMode, Style};
use crate::vartable::{Mask, VarTable};

fn ordinal(i: usize) -> String {
    match i {
        0 => "first".to_string(),
        1 => "second".to_string(),
        2 => "third".to_string(),
        n => format!("{}th", n + 1),
    }
}

fn accumulate(out: &mut Expr, set: Mask, coeff: f64, cur: &mut Cursor) {
    if let Err(e) = out.add(set, coeff) {
        cur.soft_err(e);
    }
}

/// `V1 : V2` -> `Eq` expression `H(V1 union V2) - H(V2) = 0`. Rejects the
/// case where `V1` contributes no bit outside `V2` (the constraint would
/// be a syntactic tautology, never worth adding).
fn finish_funcdep(cur: &mut Cursor, v1: Mask, v2: Mask) -> Result<Expr, ()> {
    if v1 | v2 == v2 {
        cur.hard_err(ParseError::FuncEqual);
        return Err(());
    }
    if !cur.at_end() {
        cur.hard_err(ParseError::ExtraText);
        return Err(());
    }
    let mut out = Expr::new(Kind::Eq);
    accumulate(&mut out, v1 | v2, 1.0, cur);
    accumulate(&mut out, v2, -1.0, cur);
    out.collapse();
    Ok(out)
}

/// `V1 . V2 . V3 ...` / `V1 || V2 || ...` -> `Eq` expression
/// `H(V1)+H(V2)+...+H(Vk) - H(V1 union ... union Vk) = 0`, rejecting any
/// part that is already fully determined (bitwise) by the others.
fn finish_indep(cur: &mut Cursor, parts: Vec<Mask>) -> Result<Expr, ()> {
    if !cur.at_end() {
        cur.hard_err(ParseError::ExtraText);
        return Err(());
    }
    for (i, &vi) in parts.iter().enumerate() {
        let others: Mask = parts
            .iter()
            .enumerate()
            .filter(|&(j, _)| j != i)
            .fold(0, |acc, (_, &m)| acc | m);
        if vi & !others == 0 {
            cur.hard_err(ParseError::IndependenceFunctionOf(ordinal(i)));
            return Err(());
        }
    }
    let union: Mask = parts.iter().fold(0, |acc, &m| acc | m);
    let mut out = Expr::new(Kind::Eq);
    for &m in &parts {
        accumulate(&mut out, m, 1.0, cur);
    }
    accumulate(&mut out, union, -1.0, cur);
    out.collapse();
    Ok(out)
}

/// `V1 / V2 / V3 ...` / `V1 -> V2 -> ...` -> kind `Markov`, one term per
/// link with coefficient +1, stored in link order (the LP builder reads
/// consecutive terms as consecutive links, so these must not be merged
/// or reordered the way `Expr::add` would).
fn finish_markov(cur: &mut Cursor, parts: Vec<Mask>) -> Result<Expr, ()> {
    if !cur.at_end() {
        cur.hard_err(ParseError::ExtraText);
        return Err(());
    }
    if parts.len() < 3 {
        cur.hard_err(ParseError::MarkovTooShort);
        return Err(());
    }
    let terms = parts.into_iter().map(|set| Term { set, coeff: 1.0 }).collect();
    Ok(Expr { kind: Kind::Markov, terms })
}

/// Parses one constraint line: if the line contains `=` anywhere, the
/// colon/dot/slash constraint shapes are skipped entirely and it is parsed
/// as an ordinary relation straight away (a func-dep/independence/Markov
/// line never contains `=`). Otherwise peeks the top-level separator after
/// an initial variable list to discriminate functional dependency (`:`),
/// total independence (`.`/`||`), or Markov chain (`/`/`->`); falls
/// through to an ordinary relation if none of these shapes match,
/// restoring the cursor to the start first.
pub fn parse_constraint(
    cur: &mut Cursor,
    vars: &mut VarTable,
    macros: &MacroCatalogue,
    style: &Style,
) -> Result<Expr, ()> {
    let start = cur.save_pos();

    if cur.remainder().contains('=') {
        return parse_expression(cur, vars, macros, style, ExprMode::Relation);
    }

    if let Some(v1) = parse_variable_list(cur, vars, style) {
        match cur.current() {
            Some(':') => {
                cur.advance();
                if let Some(v2) = parse_variable_list(cur, vars, style) {
                    return finish_funcdep(cur, v1, v2);
                }
            }
            Some('.') => {
                cur.advance();
                if let Some(v2) = parse_variable_list(cur, vars, style) {
                    let mut parts = vec![v1, v2];
                    loop {
                        let save = cur.save_pos();
                        if cur.current() == Some('.') {
                            cur.advance();
                            if let Some(v) = parse_variable_list(cur, vars, style) {
                                parts.push(v);
                                continue;
                            }
                        }
                        cur.restore_pos(save);
                        break;
                    }
                    return finish_indep(cur, parts);
                }
            }
            Some('|') => {
                let save_bar = cur.save_pos();
                cur.advance();
                if cur.current() == Some('|') {
                    cur.advance();
                    if let Some(v2) = parse_variable_list(cur, vars, style) {
                        let mut parts = vec![v1, v2];
                        loop {
                            let save = cur.save_pos();
                            if cur.current() == Some('|') {
                                cur.advance();
                                if cur.current() == Some('|') {
                                    cur.advance();
                                    if let Some(v) = parse_variable_list(cur, vars, style) {
                                        parts.push(v);
                                        continue;
                                    }
                                }
                            }
                            cur.restore_pos(save);
                            break;
                        }
                        return finish_indep(cur, parts);
                    }
                } else {
                    cur.restore_pos(save_bar);
                }
            }
            Some('/') => {
                cur.advance();
                if let Some(v2) = parse_variable_list(cur, vars, style) {
                    let mut parts = vec![v1, v2];
                    loop {
                        let save = cur.save_pos();
                        if cur.current() == Some('/') {
                            cur.advance();
                            if let Some(v) = parse_variable_list(cur, vars, style) {
                                parts.push(v);
                                continue;
                            }
                        }
                        cur.restore_pos(save);
                        break;
                    }
                    return finish_markov(cur, parts);
                }
            }
            Some('-') => {
                let save_arrow = cur.save_pos();
                cur.advance();
                if cur.current() == Some('>') {
                    cur.advance();
                    if let Some(v2) = parse_variable_list(cur, vars, style) {
                        let mut parts = vec![v1, v2];
                        loop {
                            let save = cur.save_pos();
                            if cur.current() == Some('-') {
                                cur.advance();
                                if cur.current() == Some('>') {
                                    cur.advance();
                                    if let Some(v) = parse_variable_list(cur, vars, style) {
                                        parts.push(v);
                                        continue;
                                    }
                                }
                            }
                            cur.restore_pos(save);
                            break;
                        }
                        return finish_markov(cur, parts);
                    }
                } else {
                    cur.restore_pos(save_arrow);
                }
            }
            _ => {}
        }
    }

    cur.restore_pos(start);
    cur.diag.clear();
    parse_expression(cur, vars, macros, style, ExprMode::Relation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::macros::MacroCatalogue;

    fn parse(input: &str) -> Result<Expr, ()> {
        let mut vars = VarTable::new();
        let macros = MacroCatalogue::default();
        let style = Style::compact(',', false);
        let mut cur = Cursor::new(input);
        parse_constraint(&mut cur, &mut vars, &macros, &style)
    }

    #[test]
    fn functional_dependency_is_an_equality() {
        let e = parse("a:b").unwrap();
        assert_eq!(e.kind, Kind::Eq);
        assert_eq!(e.terms.len(), 2);
    }

    #[test]
    fn functional_dependency_rejects_trivial_subset() {
        let mut vars = VarTable::new();
        let macros = MacroCatalogue::default();
        let style = Style::compact(',', false);
        let mut cur = Cursor::new("a:ab");
        let r = parse_constraint(&mut cur, &mut vars, &macros, &style);
        assert!(r.is_err());
        assert_eq!(cur.diag.hard.unwrap().0, ParseError::FuncEqual);
    }

    #[test]
    fn total_independence_of_three() {
        let e = parse("a.b.c").unwrap();
        assert_eq!(e.kind, Kind::Eq);
        assert_eq!(e.terms.len(), 4);
    }

    #[test]
    fn total_independence_rejects_redundant_part() {
        let mut vars = VarTable::new();
        let macros = MacroCatalogue::default();
        let style = Style::compact(',', false);
        let mut cur = Cursor::new("a.b.ab");
        let r = parse_constraint(&mut cur, &mut vars, &macros, &style);
        assert!(r.is_err());
        assert!(matches!(
            cur.diag.hard.unwrap().0,
            ParseError::IndependenceFunctionOf(_)
        ));
    }

    #[test]
    fn markov_chain_needs_three_links() {
        let mut vars = VarTable::new();
        let macros = MacroCatalogue::default();
        let style = Style::compact(',', false);
        let mut cur = Cursor::new("a/b");
        let r = parse_constraint(&mut cur, &mut vars, &macros, &style);
        assert!(r.is_err());
        assert_eq!(cur.diag.hard.unwrap().0, ParseError::MarkovTooShort);
    }

    #[test]
    fn markov_chain_of_four() {
        let e = parse("a/b/c/d").unwrap();
        assert_eq!(e.kind, Kind::Markov);
        assert_eq!(e.terms.len(), 4);
    }

    #[test]
    fn arrow_markov_chain() {
        let e = parse("a->b->c").unwrap();
        assert_eq!(e.kind, Kind::Markov);
        assert_eq!(e.terms.len(), 3);
    }

    #[test]
    fn falls_through_to_plain_relation() {
        let e = parse("a+b>=0").unwrap();
        assert_eq!(e.kind, Kind::Ge);
    }
}
