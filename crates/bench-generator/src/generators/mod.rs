//! Per-type value generators.
//!
//! Dispatch is a closed match over [`ValueRule`]; wrapper rules recurse into
//! the rule of the wrapped type.

pub mod array;
pub mod numeric;
pub mod string;
pub mod timestamp;
pub mod uuid;

use bench_core::{Value, ValueRule};
use rand::Rng;

/// Generate one value for a column rule.
pub fn generate_value<R: Rng>(rule: &ValueRule, rng: &mut R) -> Value {
    match rule {
        ValueRule::Int { domain } => numeric::generate_int(rng, domain),
        ValueRule::UInt { domain } => numeric::generate_uint(rng, domain),
        ValueRule::Float { domain } => numeric::generate_float(rng, domain),
        ValueRule::String { domain } => string::generate_string(rng, domain),
        ValueRule::Date { domain } => timestamp::generate_date(rng, domain),
        ValueRule::DateTime { domain } => timestamp::generate_datetime(rng, domain),
        ValueRule::Uuid => uuid::generate_uuid_v4(rng),
        ValueRule::Enum { labels } => match pick(rng, labels) {
            Some(label) => Value::Enum(label.clone()),
            None => Value::Null,
        },
        ValueRule::Nullable {
            null_probability,
            inner,
        } => {
            if *null_probability > 0.0 && rng.gen_bool(*null_probability) {
                Value::Null
            } else {
                generate_value(inner, rng)
            }
        }
        ValueRule::Array {
            min_length,
            max_length,
            element,
        } => array::generate_array(rng, *min_length, *max_length, element),
        ValueRule::LowCardinality { inner } => generate_value(inner, rng),
    }
}

/// Uniform pick from a value set.
pub(crate) fn pick<'a, T, R: Rng>(rng: &mut R, values: &'a [T]) -> Option<&'a T> {
    if values.is_empty() {
        return None;
    }
    Some(&values[rng.gen_range(0..values.len())])
}
