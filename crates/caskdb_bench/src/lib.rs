//! Benchmark utilities.

use caskdb_core::{Config, CoreResult, Engine, Key};
use rand::Rng;

/// Generate random value bytes of the specified size.
pub fn random_value(size: usize) -> Vec<u8> {
    let mut rng = rand::thread_rng();
    (0..size).map(|_| rng.gen()).collect()
}

/// Generate `count` random keys.
pub fn random_keys(count: usize) -> Vec<Key> {
    let mut rng = rand::thread_rng();
    (0..count).map(|_| rng.gen()).collect()
}

/// Opens an in-memory engine holding `keys` keys, each overwritten
/// `versions` times with values of `value_size` bytes.
///
/// Everything written is flushed, so every version is durable.
pub fn populated_engine(keys: usize, versions: usize, value_size: usize) -> CoreResult<Engine> {
    let engine = Engine::open_in_memory(Config::default())?;
    for _ in 0..versions {
        for key in 0..keys as Key {
            engine.put(key, &random_value(value_size))?;
        }
    }
    engine.flush()?;
    Ok(engine)
}
