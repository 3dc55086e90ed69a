//! Common Utilities
//!
//! Provides bit unpacking, resource indication value (RIV) and timing helpers
//! used across the MAC control-channel code

use tracing::trace;

/// Convert a byte slice to hex string for debugging
pub fn bytes_to_hex(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Unpack bytes into bits (MSB first)
pub fn unpack_bits(bytes: &[u8]) -> Vec<bool> {
    let mut bits = Vec::with_capacity(bytes.len() * 8);

    for &byte in bytes {
        for i in 0..8 {
            bits.push((byte & (1 << (7 - i))) != 0);
        }
    }

    bits
}

/// Number of PRBs used when decoding BWP `locationAndBandwidth` (TS 38.331)
pub const MAX_BWP_PRBS: u16 = 275;

/// Decode a RIV over `n` PRBs into `(start, length)` (TS 38.214 §5.1.2.2.2).
///
/// Returns `None` when `riv` lies outside the `n(n+1)/2` values a window of
/// `n` PRBs can encode.
pub fn riv_to_prbs(riv: u32, n: u16) -> Option<(u16, u16)> {
    let n = n as u32;
    if n == 0 || riv >= n * (n + 1) / 2 {
        return None;
    }

    let tmp = riv / n;
    let tmp2 = riv % n;
    if tmp + tmp2 < n {
        Some((tmp2 as u16, (tmp + 1) as u16))
    } else {
        Some(((n - 1 - tmp2) as u16, (n - tmp + 1) as u16))
    }
}

/// Encode a contiguous PRB run as RIV (TS 38.214 §5.1.2.2.2).
///
/// Returns `None` for an empty run or one that leaves the `n` PRB window.
pub fn prb_to_riv(n: u16, start: u16, length: u16) -> Option<u32> {
    if length == 0 || start as u32 + length as u32 > n as u32 {
        return None;
    }

    let (n, start, length) = (n as u32, start as u32, length as u32);
    if length - 1 <= n / 2 {
        Some(n * (length - 1) + start)
    } else {
        Some(n * (n - length + 1) + (n - 1 - start))
    }
}

/// Channel bandwidth in MHz for a carrier of `n_rb` PRBs at numerology `mu`.
///
/// Covers the transmission bandwidth configurations of TS 38.104 Table
/// 5.3.2-1 (FR1, bands below 100) and Table 5.3.2-2 (FR2). Undefined
/// combinations yield `None`.
pub fn carrier_bandwidth_mhz(mu: u8, n_rb: u16, band: u16) -> Option<u16> {
    let bandwidth = if band < 100 {
        match (mu, n_rb) {
            (0, 25) => 5,
            (0, 52) => 10,
            (0, 79) => 15,
            (0, 106) => 20,
            (0, 133) => 25,
            (0, 160) => 30,
            (0, 216) => 40,
            (0, 270) => 50,
            (1, 11) => 5,
            (1, 24) => 10,
            (1, 38) => 15,
            (1, 51) => 20,
            (1, 65) => 25,
            (1, 78) => 30,
            (1, 106) => 40,
            (1, 133) => 50,
            (1, 162) => 60,
            (1, 189) => 70,
            (1, 217) => 80,
            (1, 245) => 90,
            (1, 273) => 100,
            (2, 11) => 10,
            (2, 18) => 15,
            (2, 24) => 20,
            (2, 31) => 25,
            (2, 38) => 30,
            (2, 51) => 40,
            (2, 65) => 50,
            (2, 79) => 60,
            (2, 93) => 70,
            (2, 107) => 80,
            (2, 121) => 90,
            (2, 135) => 100,
            _ => return None,
        }
    } else {
        match (mu, n_rb) {
            (2, 66) => 50,
            (2, 132) => 100,
            (2, 264) => 200,
            (3, 32) => 50,
            (3, 66) => 100,
            (3, 132) => 200,
            (3, 264) => 400,
            _ => return None,
        }
    };

    trace!("Carrier of {} RBs at mu={} in band {} is {} MHz", n_rb, mu, band, bandwidth);
    Some(bandwidth)
}

/// Time utilities for slot/frame calculations
pub mod time {
    /// Frames in a system frame number cycle
    pub const SFN_CYCLE: u32 = 1024;

    /// Slot count since SFN 0, slot 0, within one SFN cycle
    pub fn absolute_slot(slots_per_frame: u16, frame: u32, slot: u16) -> u32 {
        slots_per_frame as u32 * (frame % SFN_CYCLE) + slot as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bytes_to_hex() {
        let data = vec![0x12, 0x34, 0xAB, 0xCD];
        assert_eq!(bytes_to_hex(&data), "12 34 ab cd");
    }

    #[test]
    fn test_unpack_bits() {
        let bits = unpack_bits(&[0xA5, 0x01]);
        assert_eq!(bits.len(), 16);
        assert_eq!(bits[..8], [true, false, true, false, false, true, false, true]);
        assert!(bits[15]);
    }

    #[test]
    fn test_riv_decoding() {
        // 106 PRB BWP starting at PRB 0 over the 275 PRB grid
        let riv = prb_to_riv(MAX_BWP_PRBS, 0, 106).unwrap();
        assert_eq!(riv_to_prbs(riv, MAX_BWP_PRBS), Some((0, 106)));

        // Long allocation uses the mirrored branch
        let riv = prb_to_riv(MAX_BWP_PRBS, 10, 200).unwrap();
        assert_eq!(riv_to_prbs(riv, MAX_BWP_PRBS), Some((10, 200)));

        assert_eq!(riv_to_prbs(549, MAX_BWP_PRBS), Some((0, 275)));
        assert_eq!(riv_to_prbs(37_949, MAX_BWP_PRBS), Some((0, 139)));
    }

    #[test]
    fn test_riv_out_of_range() {
        assert_eq!(riv_to_prbs(37_950, MAX_BWP_PRBS), None);
        assert_eq!(riv_to_prbs(100_000, MAX_BWP_PRBS), None);
        assert_eq!(riv_to_prbs(0, 0), None);
    }

    #[test]
    fn test_riv_rejects_out_of_window() {
        assert_eq!(prb_to_riv(52, 50, 3), None);
        assert_eq!(prb_to_riv(52, 0, 0), None);
    }

    #[test]
    fn test_riv_round_trip_small_grid() {
        let n = 24;
        for start in 0..n {
            for length in 1..=(n - start) {
                let riv = prb_to_riv(n, start, length).unwrap();
                assert_eq!(riv_to_prbs(riv, n), Some((start, length)));
            }
        }
    }

    #[test]
    fn test_carrier_bandwidth() {
        assert_eq!(carrier_bandwidth_mhz(0, 52, 3), Some(10));
        assert_eq!(carrier_bandwidth_mhz(1, 273, 78), Some(100));
        assert_eq!(carrier_bandwidth_mhz(3, 264, 257), Some(400));
        assert_eq!(carrier_bandwidth_mhz(1, 100, 78), None);
        assert_eq!(carrier_bandwidth_mhz(0, 66, 257), None);
    }

    #[test]
    fn test_absolute_slot() {
        assert_eq!(time::absolute_slot(20, 3, 7), 67);
        assert_eq!(time::absolute_slot(10, 1025, 0), 10);
    }
}
