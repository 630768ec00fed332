//! Class balancing of the RUL label distribution
//!
//! Raw telemetry is dominated by healthy hours (label at the cap) and by
//! already-failed hours (label 0); the near-failure labels the model most
//! needs are rare. Balancing keeps a fixed stride-sample of label-0 rows,
//! duplicates labels 1–15 by per-label multipliers, and shuffles the result
//! with a seeded generator so every run is reproducible.

use tracing::info;

/// Keep one in this many label-0 rows (a 20% downsample)
pub const ZERO_LABEL_KEEP_STRIDE: usize = 5;

/// Duplication multipliers for the sparse near-failure labels
pub const OVERSAMPLE_RATIO: [(u32, usize); 15] = [
    (1, 3),
    (2, 8),
    (3, 8),
    (4, 10),
    (5, 10),
    (6, 12),
    (7, 16),
    (8, 17),
    (9, 19),
    (10, 20),
    (11, 20),
    (12, 20),
    (13, 20),
    (14, 20),
    (15, 20),
];

const SHUFFLE_SEED: u64 = 42;

fn oversample_multiplier(label: u32) -> usize {
    OVERSAMPLE_RATIO
        .iter()
        .find(|(l, _)| *l == label)
        .map(|(_, mult)| *mult)
        .unwrap_or(1)
}

/// Produce the balanced set of row indices (with repeats) to train on,
/// truncated to `sample_limit` when given.
pub fn balance_indices(labels: &[f64], sample_limit: Option<usize>) -> Vec<usize> {
    let mut balanced = Vec::new();
    let mut zero_seen = 0usize;

    for (idx, label) in labels.iter().enumerate() {
        let label = label.round().max(0.0) as u32;
        if label == 0 {
            if zero_seen % ZERO_LABEL_KEEP_STRIDE == 0 {
                balanced.push(idx);
            }
            zero_seen += 1;
        } else {
            for _ in 0..oversample_multiplier(label) {
                balanced.push(idx);
            }
        }
    }

    shuffle(&mut balanced, SHUFFLE_SEED);
    if let Some(limit) = sample_limit {
        balanced.truncate(limit);
    }
    info!(
        input_rows = labels.len(),
        balanced_rows = balanced.len(),
        "balanced training rows"
    );
    balanced
}

/// Fisher-Yates with an LCG so balancing stays reproducible
fn shuffle(indices: &mut [usize], seed: u64) {
    let mut state = seed.wrapping_add(12345);
    for i in (1..indices.len()).rev() {
        state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
        let j = ((state >> 33) as usize) % (i + 1);
        indices.swap(i, j);
    }
}
