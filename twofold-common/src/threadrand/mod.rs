use rand::rngs::OsRng;
use rand::{CryptoRng, Rng, RngCore};
use rand_chacha::rand_core::SeedableRng;
use rand_chacha::ChaCha20Rng;
use std::cell::UnsafeCell;

thread_local! {
    static RNG: UnsafeCell<ChaCha20Rng> = UnsafeCell::new(ChaCha20Rng::from_seed(OsRng.gen()));
}

/// A ChaCha20 CSPRNG per thread, seeded from the OS. Used for session nonces and invitation
/// tokens.
pub struct SecureRng;

impl SecureRng {
    pub fn next_u64() -> u64 {
        RNG.with(|rng| {
            // Only one thread accesses this RNG so this is safe
            unsafe { rand_chacha::rand_core::RngCore::next_u64(&mut *rng.get()) }
        })
    }

    pub fn next_u128() -> u128 {
        RNG.with(|rng| {
            // Only one thread accesses this RNG so this is safe
            let rng_ref = unsafe { &mut *rng.get() };
            let mut bytes = [0u8; 16];
            rand_chacha::rand_core::RngCore::fill_bytes(rng_ref, &mut bytes);
            u128::from_le_bytes(bytes)
        })
    }

    pub fn fill(dest: &mut [u8]) {
        RNG.with(|rng| unsafe { rand_chacha::rand_core::RngCore::fill_bytes(&mut *rng.get(), dest) })
    }
}

impl RngCore for SecureRng {
    fn next_u32(&mut self) -> u32 {
        RNG.with(|rng| unsafe { rand_chacha::rand_core::RngCore::next_u32(&mut *rng.get()) })
    }

    fn next_u64(&mut self) -> u64 {
        RNG.with(|rng| unsafe { rand_chacha::rand_core::RngCore::next_u64(&mut *rng.get()) })
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        SecureRng::fill(dest)
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        // try_fill_bytes is infallible for ChaCha20Rng
        SecureRng::fill(dest);
        Ok(())
    }
}

impl CryptoRng for SecureRng {}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashSet;

    #[test]
    fn test_values_do_not_repeat() {
        let values: HashSet<u128> = (0..256).map(|_| SecureRng::next_u128()).collect();
        assert_eq!(values.len(), 256);
    }

    #[test]
    fn test_threads_get_independent_streams() {
        let here = SecureRng::next_u64();
        let there = std::thread::spawn(SecureRng::next_u64).join().unwrap();
        assert_ne!(here, there);
    }

    #[test]
    fn test_fill_bytes() {
        let mut a = [0u8; 32];
        let mut b = [0u8; 32];
        SecureRng.fill_bytes(&mut a);
        SecureRng::fill(&mut b);

        assert_ne!(a, [0u8; 32]);
        assert_ne!(a, b);
    }
}
