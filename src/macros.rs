// ABOUTME: Macro catalogue — named parameterised linear combinations over abstract parameter slots

use crate::error::ResourceError;
use crate::expr::{Expr, Kind};
use crate::vartable::Mask;

/// Default and hard-floor capacity for the macro table (resizable via `set macrolimit`).
pub const DEFAULT_MAX_MACROS: usize = 50;

/// Identity of a macro: name, arity, and which of the `arity-1` separators
/// between consecutive arguments is `|` rather than the list separator.
/// Bit `i` of `signature` is set iff the separator after argument `i` is `|`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MacroHead {
    pub name: char,
    pub arity: usize,
    pub signature: u32,
}

/// How a catalogue lookup should match a query head against stored heads.
/// The prefix modes are consulted *between* arguments of a macro
/// invocation, to decide whether `)`, the list separator, or `|` can
/// legally come next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FindMode {
    /// Exact `(name, arity, signature)` match.
    Exact,
    /// Some macro with strictly greater arity whose first `head.arity`
    /// separators agree, and whose next separator would be the list
    /// separator (i.e. *not* `|`).
    PrefixSep,
    /// As `PrefixSep`, but the next separator would be `|`.
    PrefixPipe,
}

#[derive(Debug, Clone)]
pub struct MacroDef {
    pub head: MacroHead,
    pub body: Expr,
    pub standard: bool,
}

#[derive(Debug, Clone)]
pub struct MacroCatalogue {
    macros: Vec<MacroDef>,
    capacity: usize,
}

impl MacroCatalogue {
    /// An empty catalogue; `install_standard` installs the four undeletable
    /// standard macros before any user input is parsed.
    pub fn new() -> Self {
        MacroCatalogue {
            macros: Vec::new(),
            capacity: DEFAULT_MAX_MACROS,
        }
    }

    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity;
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.macros.len()
    }

    pub fn is_empty(&self) -> bool {
        self.macros.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<&MacroDef> {
        self.macros.get(idx)
    }

    pub fn iter(&self) -> impl Iterator<Item = &MacroDef> {
        self.macros.iter()
    }

    /// Installs `H(a)`, `H(a|b)`, `I(a;b)`, `I(a;b|c)` as standard macros,
    /// argument letters `a`, `b`, `c` mapped to parameter bits 0, 1, 2.
    /// Called once at session startup; these four slots are undeletable
    /// and shadow any later attempt to redefine them.
    pub fn install_standard(&mut self) {
        let mut h_a = Expr::new(Kind::MacroBody);
        h_a.add(0b1, 1.0).unwrap();
        self.macros.push(MacroDef {
            head: MacroHead { name: 'H', arity: 1, signature: 0 },
            body: h_a,
            standard: true,
        });

        let mut h_a_given_b = Expr::new(Kind::MacroBody);
        h_a_given_b.add(0b01 | 0b10, 1.0).unwrap();
        h_a_given_b.sub(0b10, 1.0).unwrap();
        self.macros.push(MacroDef {
            head: MacroHead { name: 'H', arity: 2, signature: 0b1 },
            body: h_a_given_b,
            standard: true,
        });

        let mut i_a_b = Expr::new(Kind::MacroBody);
        i_a_b.i2(0b01, 0b10, 1.0).unwrap();
        self.macros.push(MacroDef {
            head: MacroHead { name: 'I', arity: 2, signature: 0 },
            body: i_a_b,
            standard: true,
        });

        let mut i_a_b_given_c = Expr::new(Kind::MacroBody);
        i_a_b_given_c.i3(0b001, 0b010, 0b100, 1.0).unwrap();
        self.macros.push(MacroDef {
            head: MacroHead { name: 'I', arity: 3, signature: 0b10 },
            body: i_a_b_given_c,
            standard: true,
        });
    }

    pub fn find(&self, head: MacroHead, mode: FindMode) -> Option<usize> {
        match mode {
            FindMode::Exact => self.macros.iter().position(|m| m.head == head),
            FindMode::PrefixSep | FindMode::PrefixPipe => {
                if head.arity == 0 {
                    return None;
                }
                let mask = (1u32 << head.arity) - 1;
                let mut ty = head.signature & mask;
                if mode == FindMode::PrefixPipe {
                    ty |= 1 << (head.arity - 1);
                }
                self.macros.iter().position(|m| {
                    m.head.name == head.name
                        && m.head.arity > head.arity
                        && (m.head.signature & mask) == ty
                })
            }
        }
    }

    pub fn find_by_name_arity(&self, name: char, arity: usize) -> Option<usize> {
        self.macros
            .iter()
            .position(|m| m.head.name == name && m.head.arity == arity)
    }

    /// True iff any macro (standard or user) is registered under `name`,
    /// regardless of arity or signature. Consulted before committing to
    /// macro-invocation grammar for an uppercase identifier: if this is
    /// false the parser backtracks and treats the identifier as something
    /// else entirely.
    pub fn has_name(&self, name: char) -> bool {
        self.macros.iter().any(|m| m.head.name == name)
    }

    /// Stores a new macro. Caller must already have rejected exact
    /// duplicates, redefinition of a standard macro, and out-of-range
    /// parameter references; this only enforces capacity.
    pub fn add(&mut self, head: MacroHead, body: Expr) -> Result<(), ResourceError> {
        if self.macros.len() >= self.capacity {
            return Err(ResourceError::TooManyMacros);
        }
        self.macros.push(MacroDef { head, body, standard: false });
        Ok(())
    }

    pub fn delete(&mut self, idx: usize) -> bool {
        if idx >= self.macros.len() || self.macros[idx].standard {
            return false;
        }
        self.macros.remove(idx);
        true
    }

    /// Expands the macro at `idx` with the given actual argument masks,
    /// accumulating `call_coeff * body` into `out`. Each body term's
    /// abstract subset (a bitmap over parameter slots) is re-indexed by
    /// OR-ing together the actual masks of the slots it names — a bitmap
    /// substitution, never a textual one.
    pub fn expand(
        &self,
        idx: usize,
        actual_masks: &[Mask],
        call_coeff: f64,
        out: &mut Expr,
    ) -> Result<(), ResourceError> {
        let def = &self.macros[idx];
        for term in &def.body.terms {
            let mut actual: Mask = 0;
            for (slot, &am) in actual_masks.iter().enumerate() {
                if term.set & (1 << slot) != 0 {
                    actual |= am;
                }
            }
            out.add(actual, call_coeff * term.coeff)?;
        }
        Ok(())
    }
}

impl Default for MacroCatalogue {
    fn default() -> Self {
        let mut cat = MacroCatalogue::new();
        cat.install_standard();
        cat
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_macros_are_installed() {
        let cat = MacroCatalogue::default();
        assert_eq!(cat.len(), 4);
        assert!(cat.find(MacroHead { name: 'H', arity: 1, signature: 0 }, FindMode::Exact).is_some());
        assert!(cat.find(MacroHead { name: 'I', arity: 3, signature: 0b10 }, FindMode::Exact).is_some());
    }

    #[test]
    fn prefix_pipe_finds_longer_macro_expecting_bar() {
        let cat = MacroCatalogue::default();
        // I(a;b has arity so far 2, signature 0 -- the existing I(a;b|c) macro
        // has arity 3 and signature 0b10 (bar after 2nd arg), so a query with
        // arity=2, signature=0 in PrefixPipe mode should find it.
        let head = MacroHead { name: 'I', arity: 2, signature: 0 };
        assert!(cat.find(head, FindMode::PrefixPipe).is_some());
        assert!(cat.find(head, FindMode::PrefixSep).is_none());
    }

    #[test]
    fn delete_refuses_standard_macros() {
        let mut cat = MacroCatalogue::default();
        assert!(!cat.delete(0));
        assert_eq!(cat.len(), 4);
    }

    #[test]
    fn expand_reindexes_abstract_parameter_bits() {
        let cat = MacroCatalogue::default();
        // H(a|b): bit0=a, bit1=b -> H(a,b)-H(b)
        let idx = cat.find(MacroHead { name: 'H', arity: 2, signature: 0b1 }, FindMode::Exact).unwrap();
        let mut out = Expr::new(Kind::Diff);
        let actual = [0b001u32, 0b010u32]; // a->bit0, b->bit1
        cat.expand(idx, &actual, 1.0, &mut out).unwrap();
        out.collapse();
        assert_eq!(out.terms.len(), 2);
    }
}
