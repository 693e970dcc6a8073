// ABOUTME: Variable compaction (C8) — merges variables that always co-occur into one effective variable

use crate::error::ParseError;
use crate::vartable::Mask;

/// Maps original variable bit indices onto a (usually smaller) compacted
/// universe. Two original bits land on the same compacted index iff they
/// always co-occur across every mask handed to `compute` — i.e. they have
/// an identical "present/absent" signature over the goal and all active
/// constraints -- the intersection of masks containing `i` with the
/// complement of masks not containing `i`: two bits have the same
/// intersection iff they have the same signature.
#[derive(Debug, Clone)]
pub struct Compaction {
    /// Original bit index -> compacted bit index, `None` if unused.
    var_tr: Vec<Option<usize>>,
    /// Compacted universe size.
    pub n: usize,
}

impl Compaction {
    /// Builds the compaction map from every mask appearing in the goal and
    /// the active constraints. Fails if fewer than two variables survive.
    pub fn compute(masks: &[Mask]) -> Result<Compaction, ParseError> {
        let universe: Mask = masks.iter().fold(0, |a, b| a | b);
        let bits: Vec<usize> = (0..32).filter(|&i| universe & (1 << i) != 0).collect();

        let mut var_tr = vec![None; 32];
        let mut signatures: Vec<Vec<bool>> = Vec::new();

        for &i in &bits {
            let sig: Vec<bool> = masks.iter().map(|m| m & (1 << i) != 0).collect();
            let idx = match signatures.iter().position(|s| *s == sig) {
                Some(idx) => idx,
                None => {
                    signatures.push(sig);
                    signatures.len() - 1
                }
            };
            var_tr[i] = Some(idx);
        }

        let n = signatures.len();
        if n < 2 {
            return Err(ParseError::TooFewVariables);
        }
        Ok(Compaction { var_tr, n })
    }

    /// Re-indexes `mask` through the compaction map. Original bits with no
    /// mapping (unused in any supplied mask) are dropped.
    pub fn translate(&self, mask: Mask) -> Mask {
        let mut out: Mask = 0;
        for i in 0..32 {
            if mask & (1 << i) != 0 {
                if let Some(c) = self.var_tr[i] {
                    out |= 1 << c;
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distinct_variables_stay_distinct() {
        let masks = [0b001u32, 0b010, 0b100];
        let c = Compaction::compute(&masks).unwrap();
        assert_eq!(c.n, 3);
        assert_ne!(c.translate(0b001), c.translate(0b010));
    }

    #[test]
    fn always_cooccurring_variables_merge() {
        // b and c always appear together (always both set or both unset).
        let masks = [0b011u32, 0b111, 0b001];
        let c = Compaction::compute(&masks).unwrap();
        assert_eq!(c.n, 2);
        let tb = c.translate(0b010);
        let tc = c.translate(0b100);
        assert_eq!(tb, tc);
    }

    #[test]
    fn fewer_than_two_variables_is_an_error() {
        let masks = [0b001u32, 0b001];
        assert!(matches!(
            Compaction::compute(&masks),
            Err(ParseError::TooFewVariables)
        ));
    }

    #[test]
    fn compaction_is_idempotent() {
        let masks = [0b011u32, 0b111, 0b001];
        let c1 = Compaction::compute(&masks).unwrap();
        let translated: Vec<Mask> = masks.iter().map(|&m| c1.translate(m)).collect();
        let c2 = Compaction::compute(&translated).unwrap();
        assert_eq!(c2.n, c1.n);
    }
}
