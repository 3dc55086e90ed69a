//! Start and Length Indicator Value (SLIV) codec
//!
//! Time-domain allocations carry start symbol S and length L as one 7-bit
//! value (TS 38.214 §5.1.2.1 / §6.1.2.1):
//!
//! ```text
//! if (L - 1) <= 7: SLIV = 14 * (L - 1) + S
//! else:            SLIV = 14 * (14 - L + 1) + (14 - 1 - S)
//! ```

/// Symbols in a normal cyclic prefix slot
const SYMBOLS_PER_SLOT: u8 = 14;

/// Decode a SLIV into `(start_symbol, length)`.
///
/// The source field is 7 bits wide, so no range check is performed. Values
/// above 104 do not correspond to a legal pair and alias onto one.
pub fn decode_sliv(sliv: u8) -> (u8, u8) {
    let a = sliv / SYMBOLS_PER_SLOT;
    let b = sliv % SYMBOLS_PER_SLOT;

    if a + b < SYMBOLS_PER_SLOT {
        (b, a + 1)
    } else {
        (SYMBOLS_PER_SLOT - 1 - b, SYMBOLS_PER_SLOT + 1 - a)
    }
}

/// Encode `(start_symbol, length)` into a SLIV.
///
/// Returns `None` unless `length >= 1` and `start + length <= 14`.
pub fn encode_sliv(start: u8, length: u8) -> Option<u8> {
    if length == 0 || start >= SYMBOLS_PER_SLOT || start + length > SYMBOLS_PER_SLOT {
        return None;
    }

    if length - 1 <= 7 {
        Some(SYMBOLS_PER_SLOT * (length - 1) + start)
    } else {
        Some(SYMBOLS_PER_SLOT * (SYMBOLS_PER_SLOT - length + 1) + (SYMBOLS_PER_SLOT - 1 - start))
    }
}
