use thiserror::Error;

/// Trailing OP_0 pushed after the height, kept for s-nomp compatible scriptSigs.
pub const HEIGHT_MARKER: u8 = 0x00;

/// A `u32` height never needs more than 5 bytes once the sign bit is reserved.
pub const MAX_HEIGHT_PUSH_LEN: usize = 5;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum HeightError {
    #[error("height push truncated")]
    Truncated,
    #[error("invalid height push length: {0}")]
    InvalidLength(u8),
    #[error("missing trailing marker after height push")]
    MissingMarker,
    #[error("encoded height exceeds u32")]
    Overflow,
}

/// Number of bytes the height push carries.
///
/// Sized for `height << 1` so the most significant bit of the last byte stays
/// clear, as minimal script numbers require. Height 0 still takes one byte.
pub fn height_push_len(height: u32) -> usize {
    let doubled = u64::from(height) << 1;
    let bits = if doubled == 0 {
        1
    } else {
        (64 - doubled.leading_zeros()) as usize
    };
    (bits + 7) / 8
}

/// Encode a block height for the coinbase scriptSig.
///
/// Layout: `len | height (little-endian, zero-padded to len) | 0x00`.
///
/// ```
/// use coinbase_gen_core::height::encode_height;
///
/// assert_eq!(encode_height(128), vec![0x02, 0x80, 0x00, 0x00]);
/// ```
pub fn encode_height(height: u32) -> Vec<u8> {
    let len = height_push_len(height);
    let mut out = Vec::with_capacity(len + 2);
    out.push(len as u8);
    out.extend_from_slice(&u64::from(height).to_le_bytes()[..len]);
    out.push(HEIGHT_MARKER);
    out
}

/// Read a height written by [`encode_height`] from the front of a scriptSig.
///
/// Returns the height and the number of bytes consumed, marker included.
pub fn decode_height(script_sig: &[u8]) -> Result<(u32, usize), HeightError> {
    let (&len_byte, rest) = script_sig.split_first().ok_or(HeightError::Truncated)?;
    let len = len_byte as usize;
    if len == 0 || len > MAX_HEIGHT_PUSH_LEN {
        return Err(HeightError::InvalidLength(len_byte));
    }
    if rest.len() < len + 1 {
        return Err(HeightError::Truncated);
    }
    if rest[len] != HEIGHT_MARKER {
        return Err(HeightError::MissingMarker);
    }

    let mut buf = [0u8; 8];
    buf[..len].copy_from_slice(&rest[..len]);
    let value = u64::from_le_bytes(buf);
    let height = u32::try_from(value).map_err(|_| HeightError::Overflow)?;
    Ok((height, len + 2))
}
