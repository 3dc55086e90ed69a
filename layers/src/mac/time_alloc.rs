//! PDSCH time-domain allocation
//!
//! Resolves the time-domain resource assignment field of a DCI against the
//! configured allocation list and places the DM-RS symbols of the allocation
//! (TS 38.214 §5.1.2.1, TS 38.211 §7.4.1.1.2).

use crate::rrc::{MappingType, TimeDomainAllocation};
use crate::LayerError;
use common::sliv::decode_sliv;
use serde::Serialize;

/// Largest SLIV describing a legal (start, length) pair
const MAX_SLIV: u8 = 104;

/// A decoded PDSCH time-domain allocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PdschAllocation {
    /// Slot offset between DCI and PDSCH
    pub k0: u8,
    pub mapping_type: MappingType,
    pub start_symbol: u8,
    pub num_symbols: u8,
}

/// Resolve entry `index` of a time-domain allocation list
pub fn lookup(list: &[TimeDomainAllocation], index: u8) -> Result<PdschAllocation, LayerError> {
    let entry = list.get(index as usize).ok_or_else(|| {
        LayerError::Configuration(format!(
            "Time domain allocation {} not configured ({} entries)",
            index,
            list.len()
        ))
    })?;

    if entry.start_symbol_and_length > MAX_SLIV {
        return Err(LayerError::Configuration(format!(
            "Invalid startSymbolAndLength {} in allocation {}",
            entry.start_symbol_and_length, index
        )));
    }

    let (start_symbol, num_symbols) = decode_sliv(entry.start_symbol_and_length);
    Ok(PdschAllocation {
        k0: entry.k0,
        mapping_type: entry.mapping_type,
        start_symbol,
        num_symbols,
    })
}

/// Single-symbol DM-RS positions for PDSCH mapping type A.
///
/// `duration` counts symbols from the start of the slot to the last PDSCH
/// symbol. Bit `l` of the result is set when symbol `l` carries DM-RS.
pub fn dmrs_symbol_mask(type_a_position: u8, additional_position: u8, duration: u8) -> Result<u16, LayerError> {
    if !(2..=3).contains(&type_a_position) {
        return Err(LayerError::Configuration(format!(
            "Invalid dmrs-TypeA-Position {}",
            type_a_position
        )));
    }
    if additional_position > 3 || (additional_position == 3 && type_a_position != 2) {
        return Err(LayerError::Configuration(format!(
            "Invalid dmrs-AdditionalPosition {} with dmrs-TypeA-Position {}",
            additional_position, type_a_position
        )));
    }

    let additional: &[u8] = match (duration, additional_position) {
        (3..=7, _) | (8..=14, 0) => &[],
        (8..=9, _) => &[7],
        (10..=12, 1) => &[9],
        (10..=11, _) | (12, 2) => &[6, 9],
        (12..=14, 3) => &[5, 8, 11],
        (13..=14, 1) => &[11],
        (13..=14, _) => &[7, 11],
        _ => {
            return Err(LayerError::Configuration(format!(
                "Invalid PDSCH duration {} for mapping type A",
                duration
            )))
        }
    };

    let mask = additional
        .iter()
        .fold(1u16 << type_a_position, |mask, &l| mask | (1 << l));
    Ok(mask)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allocation(k0: u8, sliv: u8) -> TimeDomainAllocation {
        TimeDomainAllocation {
            k0,
            mapping_type: MappingType::TypeA,
            start_symbol_and_length: sliv,
        }
    }

    #[test]
    fn test_lookup() {
        // S=1 L=13 and S=2 L=12
        let list = [allocation(0, 40), allocation(1, 53)];
        let first = lookup(&list, 0).unwrap();
        assert_eq!((first.start_symbol, first.num_symbols), (1, 13));
        let second = lookup(&list, 1).unwrap();
        assert_eq!((second.k0, second.start_symbol, second.num_symbols), (1, 2, 12));
        assert!(lookup(&list, 2).is_err());
    }

    #[test]
    fn test_lookup_rejects_illegal_sliv() {
        assert!(lookup(&[allocation(0, 105)], 0).is_err());
    }

    #[test]
    fn test_dmrs_front_loaded_only() {
        assert_eq!(dmrs_symbol_mask(2, 0, 14).unwrap(), 0b100);
        assert_eq!(dmrs_symbol_mask(3, 2, 5).unwrap(), 0b1000);
    }

    #[test]
    fn test_dmrs_additional_positions() {
        assert_eq!(dmrs_symbol_mask(2, 1, 14).unwrap(), (1 << 2) | (1 << 11));
        assert_eq!(dmrs_symbol_mask(2, 1, 10).unwrap(), (1 << 2) | (1 << 9));
        assert_eq!(dmrs_symbol_mask(2, 2, 14).unwrap(), (1 << 2) | (1 << 7) | (1 << 11));
        assert_eq!(dmrs_symbol_mask(2, 2, 12).unwrap(), (1 << 2) | (1 << 6) | (1 << 9));
        assert_eq!(dmrs_symbol_mask(2, 3, 12).unwrap(), (1 << 2) | (1 << 5) | (1 << 8) | (1 << 11));
        assert_eq!(dmrs_symbol_mask(2, 3, 11).unwrap(), (1 << 2) | (1 << 6) | (1 << 9));
        assert_eq!(dmrs_symbol_mask(3, 1, 8).unwrap(), (1 << 3) | (1 << 7));
    }

    #[test]
    fn test_dmrs_invalid() {
        assert!(dmrs_symbol_mask(1, 0, 14).is_err());
        assert!(dmrs_symbol_mask(3, 3, 14).is_err());
        assert!(dmrs_symbol_mask(2, 0, 2).is_err());
        assert!(dmrs_symbol_mask(2, 0, 15).is_err());
    }
}
