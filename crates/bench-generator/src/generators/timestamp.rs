//! Date and datetime value generators.

use super::pick;
use bench_core::{Domain, Value};
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use rand::Rng;

/// Generate a date uniformly between two dates (inclusive).
pub fn generate_date<R: Rng>(rng: &mut R, domain: &Domain<NaiveDate>) -> Value {
    match domain {
        Domain::Range { min, max } => {
            let days = rng.gen_range(min.num_days_from_ce()..=max.num_days_from_ce());
            Value::Date(NaiveDate::from_num_days_from_ce_opt(days).unwrap_or(*min))
        }
        Domain::Values(values) => pick(rng, values).map_or(Value::Null, |v| Value::Date(*v)),
    }
}

/// Generate a datetime uniformly between two instants (inclusive), at
/// second precision.
pub fn generate_datetime<R: Rng>(rng: &mut R, domain: &Domain<NaiveDateTime>) -> Value {
    match domain {
        Domain::Range { min, max } => {
            let secs = rng.gen_range(min.and_utc().timestamp()..=max.and_utc().timestamp());
            let dt = DateTime::from_timestamp(secs, 0)
                .map(|dt| dt.naive_utc())
                .unwrap_or(*min);
            Value::DateTime(dt)
        }
        Domain::Values(values) => pick(rng, values).map_or(Value::Null, |v| Value::DateTime(*v)),
    }
}
