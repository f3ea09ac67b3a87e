//! Stochastic content generators for test variations
//!
//! Uses seeded RNG for reproducibility. Print seed on failure for replay.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Seeded generator for reproducible stochastic tests
pub struct Gen {
    pub rng: StdRng,
    pub seed: u64,
}

impl Gen {
    /// Create with specific seed (for reproduction)
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            seed,
        }
    }

    /// Create from environment or random seed
    pub fn from_env_or_random() -> Self {
        let seed = std::env::var("JSONDOM_TEST_SEED")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or_else(rand::random);
        Self::new(seed)
    }

    /// Geometric distribution: count until rand > alpha
    pub fn geometric(&mut self, alpha: f64) -> usize {
        let mut n = 0;
        while self.rng.gen::<f64>() < alpha {
            n += 1;
        }
        n
    }

    /// Random boolean with probability p
    pub fn chance(&mut self, p: f64) -> bool {
        self.rng.gen::<f64>() < p
    }

    /// Cut `len` bytes into random chunk lengths, each at least 1.
    pub fn chunk_sizes(&mut self, len: usize) -> Vec<usize> {
        let mut sizes = Vec::new();
        let mut left = len;
        while left > 0 {
            let size = (1 + self.geometric(0.8)).min(left);
            sizes.push(size);
            left -= size;
        }
        sizes
    }

    /// Random object key, occasionally with characters that need escaping.
    pub fn key(&mut self) -> String {
        let len = 1 + self.geometric(0.6);
        let chars = "abcdefghijklmnopqrstuvwxyz_é\"\\\n";
        let pool: Vec<char> = chars.chars().collect();
        (0..len)
            .map(|_| pool[self.rng.gen_range(0..pool.len())])
            .collect()
    }

    /// Random well-formed JSON text, nested at most `depth` levels.
    pub fn json(&mut self, depth: usize) -> String {
        let mut out = String::new();
        self.value(depth, &mut out);
        out
    }

    fn value(&mut self, depth: usize, out: &mut String) {
        let pick = if depth == 0 {
            self.rng.gen_range(0..5)
        } else {
            self.rng.gen_range(0..7)
        };
        match pick {
            0 => out.push_str("null"),
            1 => out.push_str(if self.chance(0.5) { "true" } else { "false" }),
            2 => out.push_str(&self.rng.gen_range(-1000i64..1000).to_string()),
            3 => {
                let value: f64 = self.rng.gen_range(-100.0..100.0);
                out.push_str(&format!("{value:.3}"));
            }
            4 => {
                let text = self.key();
                out.push_str(&serde_json::to_string(&text).expect("string encodes"));
            }
            5 => {
                out.push('[');
                for i in 0..self.geometric(0.6) {
                    if i > 0 {
                        out.push(',');
                    }
                    self.value(depth - 1, out);
                }
                out.push(']');
            }
            _ => {
                out.push('{');
                for i in 0..self.geometric(0.6) {
                    if i > 0 {
                        out.push(',');
                    }
                    let key = self.key();
                    out.push_str(&serde_json::to_string(&key).expect("key encodes"));
                    out.push(':');
                    self.value(depth - 1, out);
                }
                out.push('}');
            }
        }
    }
}
