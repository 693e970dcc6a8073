// ABOUTME: Row/column permutation source for the LP builder's numerical-robustness hack

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::process;
use std::time::{SystemTime, UNIX_EPOCH};

/// Seeded once at session startup from wall-clock XOR pid, then perturbed
/// per command by hashing the raw input line, so LP row/column
/// permutations de-correlate across sessions and across checks within one
/// session without needing a CSPRNG. This is a robustness hack against LP
/// numerical fragility, not a security feature — do not swap in a
/// cryptographic generator.
pub struct PermSource {
    rng: StdRng,
}

impl PermSource {
    pub fn new() -> Self {
        let wall = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0);
        let seed = wall ^ (process::id() as u64);
        PermSource {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Mixes a cheap hash of `line` into the generator state ahead of
    /// drawing this check's permutations.
    pub fn mix_line(&mut self, line: &str) {
        let mut hasher = DefaultHasher::new();
        line.hash(&mut hasher);
        let mixed = hasher.finish() ^ self.rng.gen::<u64>();
        self.rng = StdRng::seed_from_u64(mixed);
    }

    /// Fisher-Yates over `0..len`, element 0 held fixed (mirrors
    /// `perm_array` in the upstream `mklp.c`, which never moves `arr[0]`).
    pub fn shuffle(&mut self, len: usize) -> Vec<usize> {
        let mut v: Vec<usize> = (0..len).collect();
        for i in (1..len).rev() {
            let j = 1 + self.rng.gen_range(0..i);
            v.swap(i, j);
        }
        v
    }
}

impl Default for PermSource {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shuffle_keeps_element_zero_fixed() {
        let mut p = PermSource::new();
        for _ in 0..20 {
            let perm = p.shuffle(8);
            assert_eq!(perm[0], 0);
            let mut sorted = perm.clone();
            sorted.sort_unstable();
            assert_eq!(sorted, (0..8).collect::<Vec<_>>());
        }
    }

    #[test]
    fn shuffle_of_small_len_is_identity() {
        let mut p = PermSource::new();
        assert_eq!(p.shuffle(1), vec![0]);
        assert_eq!(p.shuffle(0), Vec::<usize>::new());
    }
}
