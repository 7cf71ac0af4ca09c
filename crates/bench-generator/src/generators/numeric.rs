//! Numeric value generators.

use super::pick;
use bench_core::{Domain, Value};
use rand::Rng;

/// Generate a signed integer from a range (inclusive) or value set.
pub fn generate_int<R: Rng>(rng: &mut R, domain: &Domain<i64>) -> Value {
    match domain {
        Domain::Range { min, max } => Value::Int(rng.gen_range(*min..=*max)),
        Domain::Values(values) => pick(rng, values).map_or(Value::Null, |v| Value::Int(*v)),
    }
}

/// Generate an unsigned integer from a range (inclusive) or value set.
pub fn generate_uint<R: Rng>(rng: &mut R, domain: &Domain<u64>) -> Value {
    match domain {
        Domain::Range { min, max } => Value::UInt(rng.gen_range(*min..=*max)),
        Domain::Values(values) => pick(rng, values).map_or(Value::Null, |v| Value::UInt(*v)),
    }
}

/// Generate a float from a range (inclusive) or value set.
pub fn generate_float<R: Rng>(rng: &mut R, domain: &Domain<f64>) -> Value {
    match domain {
        Domain::Range { min, max } => Value::Float(rng.gen_range(*min..=*max)),
        Domain::Values(values) => pick(rng, values).map_or(Value::Null, |v| Value::Float(*v)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_generate_int_range() {
        let mut rng = StdRng::seed_from_u64(42);

        for _ in 0..100 {
            let value = generate_int(&mut rng, &Domain::Range { min: -10, max: 20 });
            if let Value::Int(v) = value {
                assert!((-10..=20).contains(&v));
            } else {
                panic!("Expected Int value");
            }
        }
    }

    #[test]
    fn test_generate_uint_degenerate_range() {
        let mut rng = StdRng::seed_from_u64(42);
        let value = generate_uint(&mut rng, &Domain::Range { min: 7, max: 7 });
        assert_eq!(value, Value::UInt(7));
    }

    #[test]
    fn test_generate_uint_full_width() {
        let mut rng = StdRng::seed_from_u64(42);
        let value = generate_uint(
            &mut rng,
            &Domain::Range {
                min: 0,
                max: u64::MAX,
            },
        );
        assert!(matches!(value, Value::UInt(_)));
    }

    #[test]
    fn test_generate_float_range() {
        let mut rng = StdRng::seed_from_u64(42);

        for _ in 0..100 {
            let value = generate_float(&mut rng, &Domain::Range { min: 0.0, max: 1.5 });
            if let Value::Float(v) = value {
                assert!((0.0..=1.5).contains(&v));
            } else {
                panic!("Expected Float value");
            }
        }
    }

    #[test]
    fn test_values_take_precedence() {
        let mut rng = StdRng::seed_from_u64(42);
        let values = Domain::Values(vec![3, 5, 8]);
        for _ in 0..50 {
            match generate_int(&mut rng, &values) {
                Value::Int(v) => assert!([3, 5, 8].contains(&v)),
                other => panic!("unexpected {other:?}"),
            }
        }
    }

    #[test]
    fn test_generate_float_widest_accepted_range() {
        let mut rng = StdRng::seed_from_u64(42);
        let domain = Domain::Range {
            min: -1.0e307,
            max: 1.0e307,
        };
        for _ in 0..100 {
            match generate_float(&mut rng, &domain) {
                Value::Float(v) => assert!((-1.0e307..=1.0e307).contains(&v)),
                other => panic!("unexpected {other:?}"),
            }
        }
    }
}
