use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

pub fn stable_hash_with(f: impl FnOnce(&mut DefaultHasher)) -> u64 {
    let mut hasher = DefaultHasher::new();
    f(&mut hasher);
    hasher.finish()
}

pub fn stable_hash_id(seed: u64, salt: u64, id: usize) -> u64 {
    stable_hash_with(|hasher| {
        seed.hash(hasher);
        salt.hash(hasher);
        id.hash(hasher);
    })
}

/// Map a hash onto `[0, 1)` using its top 53 bits.
pub fn unit_interval(hash: u64) -> f64 {
    (hash >> 11) as f64 / (1u64 << 53) as f64
}
