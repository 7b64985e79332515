//! Ones'-complement block checksum with end-around carry.
//!
//! The transmitted checksum covers the packet **payload only** (never the
//! header): the payload is split into `block_size`-byte blocks, the blocks
//! are summed as unsigned integers, and any carry beyond the block width is
//! folded back into the sum until it fits ([`fold`]).  [`generate`] returns
//! the bitwise complement of that sum; appending the complement to the data
//! makes the folded sum of the whole come out all-ones, which is exactly what
//! [`verify`] checks.
//!
//! Blocks are most-significant first.  When the input length is not a
//! multiple of `block_size` the *leading* block is short and is treated as
//! left-padded with zero bytes — leading information is never truncated.
//!
//! No I/O happens here — this is pure arithmetic.

/// Smallest supported checksum block, in bytes.
pub const MIN_BLOCK_SIZE: usize = 1;

/// Largest supported checksum block, in bytes (the wire field is 4 bytes).
pub const MAX_BLOCK_SIZE: usize = 4;

/// `true` when `block_size` is a width this engine supports.
pub fn block_size_valid(block_size: usize) -> bool {
    (MIN_BLOCK_SIZE..=MAX_BLOCK_SIZE).contains(&block_size)
}

/// Compute the checksum of `payload`: the ones'-complement of the folded
/// block sum, masked to the block width.
///
/// Zero-length and all-zero payloads are valid and yield the all-ones
/// checksum (complement of zero).
///
/// # Panics
///
/// Panics if `block_size` is outside `1..=4`.  Validate configuration with
/// [`block_size_valid`] before constructing a protocol endpoint.
pub fn generate(payload: &[u8], block_size: usize) -> u32 {
    assert!(
        block_size_valid(block_size),
        "checksum block size must be 1..=4 bytes, got {block_size}"
    );
    let width = 8 * block_size as u32;
    let mask = (1u64 << width) - 1;
    (!fold(payload, block_size) & mask) as u32
}

/// Verify `data`, which must be `payload ++ checksum` with the checksum
/// left-padded to exactly `block_size` bytes.
///
/// Returns `true` when the folded sum is all-ones for the block width.
///
/// # Panics
///
/// Panics if `block_size` is outside `1..=4` (see [`generate`]).
pub fn verify(data: &[u8], block_size: usize) -> bool {
    assert!(
        block_size_valid(block_size),
        "checksum block size must be 1..=4 bytes, got {block_size}"
    );
    let width = 8 * block_size as u32;
    let mask = (1u64 << width) - 1;
    fold(data, block_size) == mask
}

/// Verify a decoded packet: append the received checksum, left-padded to the
/// block width, and run [`verify`] over `payload ++ checksum`.
///
/// A checksum value too wide for the block (possible only through header
/// corruption or a misbehaving peer, since [`generate`] always fits) can
/// never verify and yields `false`.
pub fn verify_packet(payload: &[u8], checksum: u32, block_size: usize) -> bool {
    let checksum_bytes = match crate::bits::left_pad(u64::from(checksum), 8 * block_size as u32) {
        Ok(bytes) => bytes,
        Err(_) => return false,
    };
    let mut data = Vec::with_capacity(payload.len() + checksum_bytes.len());
    data.extend_from_slice(payload);
    data.extend_from_slice(&checksum_bytes);
    verify(&data, block_size)
}

/// Sum `block_size`-byte blocks of `data`, most-significant block first, and
/// fold end-around carries until the sum fits the block width.
fn fold(data: &[u8], block_size: usize) -> u64 {
    let width = 8 * block_size as u32;
    let mask = (1u64 << width) - 1;

    let mut sum: u64 = 0;
    // A short leading block keeps its value when read big-endian, which is
    // the same as left-padding it with zero bytes.
    let lead = data.len() % block_size;
    if lead != 0 {
        sum += be_value(&data[..lead]);
    }
    for block in data[lead..].chunks(block_size) {
        sum += be_value(block);
    }

    // End-around carry: overflow bits re-enter at the low end.
    while sum >> width != 0 {
        sum = (sum & mask) + (sum >> width);
    }
    sum
}

/// Big-endian value of up to 8 bytes.
fn be_value(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0u64, |acc, &b| (acc << 8) | u64::from(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_byte_payload_matches_known_complement() {
        // 0x41 fits one block with no carry, so the checksum is just !0x41.
        assert_eq!(generate(&[0x41], 1), 0xBE);
        assert!(verify(&[0x41, 0xBE], 1));
    }

    #[test]
    fn generate_then_verify_roundtrip_all_block_sizes() {
        let payloads: &[&[u8]] = &[
            b"",
            b"\x00",
            b"\x00\x00\x00",
            b"A",
            b"hello, world",
            b"\xff\xff\xff\xff\xff",
            b"\x01\x02\x03\x04\x05\x06\x07\x08\x09",
        ];
        for block_size in MIN_BLOCK_SIZE..=MAX_BLOCK_SIZE {
            for payload in payloads {
                let checksum = generate(payload, block_size);
                assert!(
                    verify_packet(payload, checksum, block_size),
                    "block_size={block_size} payload={payload:?}"
                );
            }
        }
    }

    #[test]
    fn empty_payload_checksum_is_all_ones() {
        assert_eq!(generate(b"", 1), 0xFF);
        assert_eq!(generate(b"", 2), 0xFFFF);
        assert_eq!(generate(b"", 4), 0xFFFF_FFFF);
    }

    #[test]
    fn carry_is_folded_end_around() {
        // 0xFF + 0xFF = 0x1FE; folding the carry gives 0xFF, complement 0x00.
        assert_eq!(generate(&[0xFF, 0xFF], 1), 0x00);
        assert!(verify(&[0xFF, 0xFF, 0x00], 1));
    }

    #[test]
    fn short_leading_block_is_left_padded() {
        // Three bytes at block size 2: blocks are 0x00AB and 0xCDEF.
        let payload = [0xAB, 0xCD, 0xEF];
        let sum = 0x00ABu64 + 0xCDEF;
        let folded = (sum & 0xFFFF) + (sum >> 16);
        assert_eq!(generate(&payload, 2), (!folded & 0xFFFF) as u32);
    }

    #[test]
    fn every_single_bit_flip_is_detected() {
        let payloads: &[&[u8]] = &[b"A", b"hello, world", b"\x00\x00", b"\xff\x00\xff"];
        for block_size in MIN_BLOCK_SIZE..=MAX_BLOCK_SIZE {
            for payload in payloads {
                let checksum = generate(payload, block_size);
                let mut data = payload.to_vec();
                data.extend_from_slice(
                    &crate::bits::left_pad(u64::from(checksum), 8 * block_size as u32).unwrap(),
                );
                assert!(verify(&data, block_size));

                for bit in 0..data.len() * 8 {
                    let mut flipped = data.clone();
                    flipped[bit / 8] ^= 0x80 >> (bit % 8);
                    assert!(
                        !verify(&flipped, block_size),
                        "flip of bit {bit} went undetected (block_size={block_size})"
                    );
                }
            }
        }
    }

    #[test]
    fn oversized_checksum_value_never_verifies() {
        // 0x1FF cannot be an 8-bit checksum; header corruption could still
        // put it on the wire.
        assert!(!verify_packet(b"A", 0x1FF, 1));
    }

    #[test]
    #[should_panic(expected = "block size")]
    fn zero_block_size_is_rejected() {
        generate(b"A", 0);
    }
}
