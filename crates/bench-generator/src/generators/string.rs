//! String value generators.

use super::pick;
use bench_core::{StringDomain, Value};
use rand::distributions::Alphanumeric;
use rand::Rng;

/// Generate an alphanumeric string with a length in the domain bounds, or
/// pick one of the configured values.
pub fn generate_string<R: Rng>(rng: &mut R, domain: &StringDomain) -> Value {
    match domain {
        StringDomain::Length { min, max } => {
            let length = rng.gen_range(*min..=*max);
            let s: String = (0..length)
                .map(|_| rng.sample(Alphanumeric) as char)
                .collect();
            Value::String(s)
        }
        StringDomain::Values(values) => {
            pick(rng, values).map_or(Value::Null, |v| Value::String(v.clone()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_length_bounds() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..200 {
            match generate_string(&mut rng, &StringDomain::Length { min: 3, max: 9 }) {
                Value::String(s) => {
                    assert!((3..=9).contains(&s.len()));
                    assert!(s.chars().all(|c| c.is_ascii_alphanumeric()));
                }
                other => panic!("unexpected {other:?}"),
            }
        }
    }

    #[test]
    fn test_empty_strings_allowed() {
        let mut rng = StdRng::seed_from_u64(42);
        let value = generate_string(&mut rng, &StringDomain::Length { min: 0, max: 0 });
        assert_eq!(value, Value::String(String::new()));
    }

    #[test]
    fn test_pick_from_values() {
        let mut rng = StdRng::seed_from_u64(42);
        let domain = StringDomain::Values(vec!["a".into(), "b".into()]);
        for _ in 0..20 {
            let value = generate_string(&mut rng, &domain);
            assert!(value == Value::String("a".into()) || value == Value::String("b".into()));
        }
    }
}
