use serde::{Deserialize, Serialize};

/// Online mean and variance (Welford's algorithm).
#[derive(Default)]
pub struct Accumulator {
    n_vals: usize,
    mean: f64,
    diff_2_sum: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub n_vals: usize,
    pub mean: f64,
    pub std_dev: f64,
}

impl Accumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, val: f64) {
        self.n_vals += 1;

        let diff_a = val - self.mean;
        self.mean += diff_a / self.n_vals as f64;

        let diff_b = val - self.mean;
        self.diff_2_sum += diff_a * diff_b;
    }

    /// Mean and sample standard deviation; NaN where undefined.
    pub fn summary(&self) -> Summary {
        Summary {
            n_vals: self.n_vals,
            mean: if self.n_vals > 0 { self.mean } else { f64::NAN },
            std_dev: if self.n_vals > 1 {
                (self.diff_2_sum / (self.n_vals as f64 - 1.0)).sqrt()
            } else {
                f64::NAN
            },
        }
    }
}

impl FromIterator<f64> for Accumulator {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        let mut acc = Self::new();
        iter.into_iter().for_each(|val| acc.add(val));
        acc
    }
}
