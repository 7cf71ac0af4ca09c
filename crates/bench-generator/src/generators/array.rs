//! Array value generators.

use super::generate_value;
use bench_core::{Value, ValueRule};
use rand::Rng;

/// Generate an array whose length is uniform in the bounds; elements are
/// sampled independently with the element rule.
pub fn generate_array<R: Rng>(
    rng: &mut R,
    min_length: usize,
    max_length: usize,
    element: &ValueRule,
) -> Value {
    let length = rng.gen_range(min_length..=max_length);
    let items = (0..length).map(|_| generate_value(element, rng)).collect();
    Value::Array(items)
}
