/// Murmur-like 32-bit hash over `data`, mixed with `seed`.
///
/// The output is part of the persisted bloom filter format and must never
/// change.
pub fn hash(data: &[u8], seed: u32) -> u32 {
    const M: u32 = 0xc6a4_a793;
    const R: u32 = 24;

    let mut h = seed ^ (data.len() as u32).wrapping_mul(M);

    let mut chunks = data.chunks_exact(4);
    for word in &mut chunks {
        let w = u32::from_le_bytes([word[0], word[1], word[2], word[3]]);
        h = h.wrapping_add(w);
        h = h.wrapping_mul(M);
        h ^= h >> 16;
    }

    let rest = chunks.remainder();
    if rest.len() >= 3 {
        h = h.wrapping_add(u32::from(rest[2]) << 16);
    }
    if rest.len() >= 2 {
        h = h.wrapping_add(u32::from(rest[1]) << 8);
    }
    if let Some(&first) = rest.first() {
        h = h.wrapping_add(u32::from(first));
        h = h.wrapping_mul(M);
        h ^= h >> R;
    }
    h
}
