//! Synthetic byte payloads.

/// `len` uniformly random bytes; practically incompressible.
pub fn random_bytes(len: usize, seed: u64) -> Vec<u8> {
    let mut rng = fastrand::Rng::with_seed(seed);
    let mut bytes = vec![0u8; len];
    rng.fill(&mut bytes);
    bytes
}

/// `len` bytes of text-like data made of short repeated runs; compresses well.
pub fn compressible_bytes(len: usize, seed: u64) -> Vec<u8> {
    let mut rng = fastrand::Rng::with_seed(seed);
    let mut bytes = Vec::with_capacity(len);
    while bytes.len() < len {
        let run = rng.usize(4..32);
        let byte = rng.alphanumeric() as u8;
        bytes.extend(std::iter::repeat_n(byte, run));
    }
    bytes.truncate(len);
    bytes
}
