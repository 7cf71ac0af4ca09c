//! UUID columns: random v4 identifiers drawn from the batch RNG.

use bench_core::Value;
use rand::Rng;
use uuid::Builder;

/// Sixteen bytes from `rng`, stamped with the v4 version and RFC 4122 variant.
pub fn generate_uuid_v4<R: Rng>(rng: &mut R) -> Value {
    let bytes: [u8; 16] = rng.gen();
    Value::Uuid(Builder::from_random_bytes(bytes).into_uuid())
}
