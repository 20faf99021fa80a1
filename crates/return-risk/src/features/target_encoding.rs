//! Group-mean target encoding.

use std::collections::HashMap;

/// Mean label per group key, with the overall label mean as fallback.
///
/// Null keys, keys whose labels are all missing, and keys never seen during
/// fitting all resolve to the overall mean.
#[derive(Debug, Clone, Default)]
pub struct GroupRateEncoder {
    rates: HashMap<String, f64>,
    overall: Option<f64>,
}

impl GroupRateEncoder {
    /// Compute per-key label means over the given rows.
    pub fn fit(keys: &[Option<String>], labels: &[Option<f64>]) -> Self {
        let mut sums: HashMap<&str, (f64, usize)> = HashMap::new();
        let mut total = 0.0;
        let mut count = 0usize;

        for (key, label) in keys.iter().zip(labels) {
            let Some(label) = label else { continue };
            total += label;
            count += 1;

            if let Some(key) = key {
                let entry = sums.entry(key.as_str()).or_insert((0.0, 0));
                entry.0 += label;
                entry.1 += 1;
            }
        }

        let rates = sums
            .into_iter()
            .map(|(key, (sum, n))| (key.to_string(), sum / n as f64))
            .collect();

        Self {
            rates,
            overall: (count > 0).then(|| total / count as f64),
        }
    }

    /// Encoded rate for a key.
    pub fn rate(&self, key: Option<&str>) -> Option<f64> {
        key.and_then(|k| self.rates.get(k).copied())
            .or(self.overall)
    }

    /// Encode a whole column.
    pub fn transform(&self, keys: &[Option<String>]) -> Vec<Option<f64>> {
        keys.iter().map(|k| self.rate(k.as_deref())).collect()
    }

    /// Mean label over every row with a label.
    pub fn overall_rate(&self) -> Option<f64> {
        self.overall
    }

    /// Number of keys with a defined group mean.
    pub fn n_groups(&self) -> usize {
        self.rates.len()
    }
}
