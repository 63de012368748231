//! The run's single seeded generator and its checkpoint encoding.
//!
//! Every random decision in a run draws from one [`ColonyRng`]. Capturing
//! its state at a checkpoint and restoring it later continues the exact
//! same stream, which is what makes a resumed run reproduce an
//! uninterrupted one.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::error::RngStateError;

/// The generator type used for every run.
pub type ColonyRng = ChaCha8Rng;

/// Seed value meaning "pick a fresh seed".
pub const GENERATE_SEED: i64 = -1;

/// Resolve a configured seed, drawing a fresh non-negative one from the OS
/// generator when it is [`GENERATE_SEED`].
pub fn resolve_seed(configured: i64) -> i64 {
    if configured == GENERATE_SEED {
        rand::rng().random_range(0..i64::MAX)
    } else {
        configured
    }
}

/// Build the generator for a seed.
pub fn seeded(seed: i64) -> ColonyRng {
    ChaCha8Rng::seed_from_u64(u64::from_le_bytes(seed.to_le_bytes()))
}

/// Serialize the full generator state (key, stream, word position) to
/// opaque text for the Run Ledger.
///
/// # Errors
///
/// Returns [`RngStateError::Serialization`] if encoding fails.
pub fn capture(rng: &ColonyRng) -> Result<String, RngStateError> {
    Ok(serde_json::to_string(rng)?)
}

/// Rebuild a generator from text produced by [`capture`].
///
/// # Errors
///
/// Returns [`RngStateError::Serialization`] if the text is not a valid
/// captured state.
pub fn restore(state: &str) -> Result<ColonyRng, RngStateError> {
    Ok(serde_json::from_str(state)?)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rand::RngCore;

    use super::*;

    #[test]
    fn same_seed_same_stream() {
        let mut a = seeded(42);
        let mut b = seeded(42);
        assert_eq!(a.next_u64(), b.next_u64());
        let mut c = seeded(43);
        assert_ne!(seeded(42).next_u64(), c.next_u64());
    }

    #[test]
    fn capture_and_restore_continue_the_stream() {
        let mut original = seeded(7);
        for _ in 0..1_000 {
            let _ = original.next_u32();
        }
        let state = capture(&original).unwrap();
        let mut restored = restore(&state).unwrap();
        let expected: Vec<u64> = (0..64).map(|_| original.next_u64()).collect();
        let actual: Vec<u64> = (0..64).map(|_| restored.next_u64()).collect();
        assert_eq!(expected, actual);
    }

    #[test]
    fn garbage_state_is_rejected() {
        assert!(restore("not a state").is_err());
        assert!(restore("{}").is_err());
    }

    #[test]
    fn generated_seeds_are_non_negative() {
        for _ in 0..100 {
            assert!(resolve_seed(GENERATE_SEED) >= 0);
        }
        assert_eq!(resolve_seed(12), 12);
    }
}
