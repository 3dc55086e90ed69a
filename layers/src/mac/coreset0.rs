//! CORESET#0 and Type0-PDCCH search space resolution
//!
//! Derives the initial-access control channel from the MIB
//! `pdcch-ConfigSIB1` byte and the cell numerology (TS 38.213 §13).

use crate::mac::pdcch_config::{CceRegMapping, CoresetType, PdcchConfig};
use crate::mac::tables::{
    coreset0_table, search_space0_fr1, search_space0_fr2, MuxPattern, SearchSpaceEntry,
    FIRST_SYMBOL_MUX2_120_60, FIRST_SYMBOL_MUX2_240_120, FIRST_SYMBOL_MUX3_120_120,
};
use crate::rrc::PrecoderGranularity;
use crate::LayerError;
use common::types::{CyclicPrefix, FrequencyRange, SubcarrierSpacing};
use serde::Serialize;
use tracing::debug;

/// REG bundle size used for CORESET#0
const CORESET0_REG_BUNDLE_SIZE: u8 = 6;
/// Interleaver size used for CORESET#0
const CORESET0_INTERLEAVER_SIZE: u8 = 2;

/// Inputs to the CORESET#0 resolver
#[derive(Debug, Clone)]
pub struct InitialAccessParams {
    /// Subcarrier spacing of the SS/PBCH block
    pub scs_common: SubcarrierSpacing,
    /// Subcarrier spacing of CORESET#0
    pub pdcch_scs: SubcarrierSpacing,
    pub frequency_range: FrequencyRange,
    /// MIB pdcch-ConfigSIB1: CORESET#0 index in the high nibble,
    /// search space #0 index in the low nibble
    pub pdcch_config_sib1: u8,
    pub ssb_index: u8,
    pub k_ssb: u8,
    /// SFN of the frame carrying the SS/PBCH block
    pub sfn_ssb: u16,
    /// Slot of the SS/PBCH block within its frame
    pub ssb_slot: u16,
    pub slots_per_frame: u16,
    pub carrier_rbs: u16,
}

impl InitialAccessParams {
    pub fn coreset_index(&self) -> u8 {
        self.pdcch_config_sib1 >> 4
    }

    pub fn search_space_index(&self) -> u8 {
        self.pdcch_config_sib1 & 0x0f
    }
}

/// Resolved CORESET#0 placement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Coreset0Descriptor {
    pub mux_pattern: MuxPattern,
    pub num_rbs: u16,
    pub num_symbols: u8,
    /// Offset in RBs from the SSB; negative only below point A
    pub rb_offset: i16,
}

/// Resolved Type0-PDCCH monitoring occasion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SearchSpace0Descriptor {
    pub slots_per_monitoring_period: u8,
    pub first_symbol: u8,
    pub first_slot: u16,
    /// Parity of the SFN carrying the occasion
    pub frame_parity: u8,
    pub sets_per_slot: u8,
}

/// CORESET#0 with its search space, always produced together
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Type0PdcchOccasion {
    pub coreset0: Coreset0Descriptor,
    pub search_space0: SearchSpace0Descriptor,
}

/// Resolve CORESET#0 and search space #0 for one SS/PBCH block
pub fn resolve(params: &InitialAccessParams) -> Result<Type0PdcchOccasion, LayerError> {
    if params.slots_per_frame == 0 {
        return Err(LayerError::Configuration("slots_per_frame must be non-zero".into()));
    }

    let coreset_index = params.coreset_index();
    let table = coreset0_table(params.scs_common, params.pdcch_scs, params.carrier_rbs)?;
    let entry = table.entry(coreset_index)?;

    let coreset0 = Coreset0Descriptor {
        mux_pattern: entry.mux,
        num_rbs: entry.num_rbs,
        num_symbols: entry.num_symbols,
        rb_offset: entry.offset.resolve(params.k_ssb),
    };

    let search_space0 = match entry.mux {
        MuxPattern::Type1 => resolve_type1(params, coreset0.num_symbols)?,
        MuxPattern::Type2 | MuxPattern::Type3 => resolve_type2_3(params, entry.mux)?,
    };

    debug!(
        "CORESET#0 index {} ({}): {:?}, {} RBs, {} symbols, offset {}; SS#0 slot {} symbol {} parity {}",
        coreset_index,
        table.name,
        coreset0.mux_pattern,
        coreset0.num_rbs,
        coreset0.num_symbols,
        coreset0.rb_offset,
        search_space0.first_slot,
        search_space0.first_symbol,
        search_space0.frame_parity
    );

    Ok(Type0PdcchOccasion { coreset0, search_space0 })
}

fn resolve_type1(params: &InitialAccessParams, num_symbols: u8) -> Result<SearchSpace0Descriptor, LayerError> {
    let ss_index = params.search_space_index();
    let entry: &SearchSpaceEntry = match params.frequency_range {
        FrequencyRange::Fr1 => search_space0_fr1(ss_index)?,
        FrequencyRange::Fr2 => search_space0_fr2(ss_index)?,
    };

    let mu = params.scs_common.numerology() as u32;
    let spf = params.slots_per_frame as u32;
    let n = ((entry.o as u32) << mu >> entry.o_scale)
        + ((params.ssb_index as u32 * entry.m as u32) >> entry.m_scale);

    Ok(SearchSpace0Descriptor {
        slots_per_monitoring_period: 2,
        first_symbol: entry.first_symbol.resolve(params.ssb_index, num_symbols),
        first_slot: (n % spf) as u16,
        frame_parity: (n.div_ceil(spf) % 2) as u8,
        sets_per_slot: entry.sets_per_slot,
    })
}

fn resolve_type2_3(params: &InitialAccessParams, mux: MuxPattern) -> Result<SearchSpace0Descriptor, LayerError> {
    use SubcarrierSpacing::*;

    let ss_index = params.search_space_index();
    if ss_index != 0 {
        return Err(LayerError::Configuration(format!(
            "Invalid search space index {} for multiplexing {:?} (only 0 is defined)",
            ss_index, mux
        )));
    }

    let i = params.ssb_index as usize;
    let mut first_slot = params.ssb_slot;
    let mut frame_parity = (params.sfn_ssb % 2) as u8;
    let first_symbol = match (mux, params.scs_common, params.pdcch_scs) {
        (MuxPattern::Type2, Scs120, Scs60) => FIRST_SYMBOL_MUX2_120_60[i % 4],
        (MuxPattern::Type2, Scs240, Scs120) => {
            // SSB indices 8k+4 and 8k+5 are monitored in the preceding slot
            if matches!(i % 8, 4 | 5) {
                match params.ssb_slot.checked_sub(1) {
                    Some(slot) => first_slot = slot,
                    None => {
                        first_slot = params.slots_per_frame - 1;
                        frame_parity ^= 1;
                    }
                }
            }
            FIRST_SYMBOL_MUX2_240_120[i % 8]
        }
        (MuxPattern::Type3, Scs120, Scs120) => FIRST_SYMBOL_MUX3_120_120[i % 4],
        _ => {
            return Err(LayerError::Configuration(format!(
                "Multiplexing {:?} undefined for scs_common/pdcch_scs {}/{} kHz",
                mux,
                params.scs_common.khz(),
                params.pdcch_scs.khz()
            )))
        }
    };

    Ok(SearchSpace0Descriptor {
        slots_per_monitoring_period: 1,
        first_symbol,
        first_slot,
        frame_parity,
        sets_per_slot: 1,
    })
}

/// Bitmap with the first `groups` bits set, MSB first
pub(crate) fn leading_ones_bitmap(groups: u16) -> [u8; 6] {
    let mut bitmap = [0u8; 6];
    for bit in 0..(groups as usize).min(45) {
        bitmap[bit / 8] |= 0x80 >> (bit % 8);
    }
    bitmap
}

/// PDCCH configuration for DCIs sent in CORESET#0.
///
/// CORESET#0 is always interleaved with REG bundle size 6, interleaver size 2
/// and the PCI as shift index. The BWP spans the carrier.
pub fn initial_pdcch_config(
    occasion: &Type0PdcchOccasion,
    carrier_rbs: u16,
    pci: u16,
    scs: SubcarrierSpacing,
    num_dci: usize,
) -> PdcchConfig {
    let coreset0 = &occasion.coreset0;

    PdcchConfig {
        bwp_size: carrier_rbs,
        bwp_start: 0,
        subcarrier_spacing: scs,
        cyclic_prefix: CyclicPrefix::Normal,
        duration_symbols: coreset0.num_symbols,
        frequency_domain_resources: leading_ones_bitmap(coreset0.num_rbs / 6),
        cce_reg_mapping: CceRegMapping::Interleaved {
            reg_bundle_size: CORESET0_REG_BUNDLE_SIZE,
            interleaver_size: CORESET0_INTERLEAVER_SIZE,
            shift_index: pci,
        },
        precoder_granularity: PrecoderGranularity::SameAsRegBundle,
        scrambling_ids: vec![pci; num_dci],
        start_symbol: occasion.search_space0.first_symbol,
        coreset_type: CoresetType::Coreset0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use SubcarrierSpacing::*;

    fn params(scs_common: SubcarrierSpacing, pdcch_scs: SubcarrierSpacing, config: u8) -> InitialAccessParams {
        InitialAccessParams {
            scs_common,
            pdcch_scs,
            frequency_range: FrequencyRange::Fr1,
            pdcch_config_sib1: config,
            ssb_index: 0,
            k_ssb: 0,
            sfn_ssb: 0,
            ssb_slot: 0,
            slots_per_frame: scs_common.slots_per_frame(),
            carrier_rbs: 52,
        }
    }

    #[test]
    fn test_resolve_15_15_index0() {
        let occasion = resolve(&params(Scs15, Scs15, 0x00)).unwrap();
        assert_eq!(
            occasion.coreset0,
            Coreset0Descriptor { mux_pattern: MuxPattern::Type1, num_rbs: 24, num_symbols: 2, rb_offset: 0 }
        );
        assert_eq!(occasion.search_space0.first_slot, 0);
        assert_eq!(occasion.search_space0.first_symbol, 0);
        assert_eq!(occasion.search_space0.frame_parity, 0);
        assert_eq!(occasion.search_space0.slots_per_monitoring_period, 2);
    }

    #[test]
    fn test_reject_reserved_coreset_index() {
        // {15, 30} kHz only defines indices 0..=13
        let err = resolve(&params(Scs15, Scs30, 0xE0)).unwrap_err();
        assert!(matches!(err, LayerError::Configuration(_)));
    }

    #[test]
    fn test_reject_undefined_numerology() {
        assert!(resolve(&params(Scs60, Scs60, 0x00)).is_err());
    }

    #[test]
    fn test_type1_slot_computation() {
        // 30 kHz, O = 5, M = 1: n = 5 * 2 + ssb_index
        let mut p = params(Scs30, Scs30, 0x04);
        p.carrier_rbs = 106;
        p.ssb_index = 3;
        let occasion = resolve(&p).unwrap();
        assert_eq!(occasion.search_space0.first_slot, 13);
        assert_eq!(occasion.search_space0.frame_parity, 1);
        // Odd SSB index starts after CORESET#0
        assert_eq!(occasion.search_space0.first_symbol, occasion.coreset0.num_symbols);
    }

    #[test]
    fn test_type1_slot_wraps_frame() {
        // 15 kHz, O = 7, M = 1/2, ssb_index 7: n = 7 + 3 = 10
        let mut p = params(Scs15, Scs15, 0x07);
        p.ssb_index = 7;
        let occasion = resolve(&p).unwrap();
        assert_eq!(occasion.search_space0.first_slot, 0);
        assert_eq!(occasion.search_space0.frame_parity, 1);
        assert_eq!(occasion.search_space0.sets_per_slot, 2);
    }

    #[test]
    fn test_fr2_fractional_offset() {
        // 120 kHz, O = 2.5, M = 1: n = 2.5 * 8 + ssb_index
        let mut p = params(Scs120, Scs120, 0x02);
        p.frequency_range = FrequencyRange::Fr2;
        p.ssb_index = 4;
        let occasion = resolve(&p).unwrap();
        assert_eq!(occasion.search_space0.first_slot, 24);

        p.pdcch_config_sib1 = 0x0E;
        assert!(resolve(&p).is_err());
    }

    #[test]
    fn test_fr2_alternate_seven() {
        let mut p = params(Scs120, Scs120, 0x01);
        p.frequency_range = FrequencyRange::Fr2;
        p.ssb_index = 5;
        assert_eq!(resolve(&p).unwrap().search_space0.first_symbol, 7);
        p.ssb_index = 4;
        assert_eq!(resolve(&p).unwrap().search_space0.first_symbol, 0);
    }

    #[test]
    fn test_below_point_a() {
        let mut p = params(Scs120, Scs60, 0x80);
        p.frequency_range = FrequencyRange::Fr2;
        assert_eq!(resolve(&p).unwrap().coreset0.rb_offset, -41);
        p.k_ssb = 3;
        let occasion = resolve(&p).unwrap();
        assert_eq!(occasion.coreset0.rb_offset, -42);
        assert_eq!(occasion.coreset0.mux_pattern, MuxPattern::Type2);
    }

    #[test]
    fn test_type2_requires_search_space_zero() {
        let mut p = params(Scs120, Scs60, 0x81);
        p.frequency_range = FrequencyRange::Fr2;
        assert!(resolve(&p).is_err());
    }

    #[test]
    fn test_type2_240_120_first_symbol() {
        let mut p = params(Scs240, Scs120, 0x40);
        p.frequency_range = FrequencyRange::Fr2;
        p.sfn_ssb = 5;
        p.ssb_slot = 10;

        let expected = [0, 1, 2, 3, 12, 13, 0, 1];
        for (i, &symbol) in expected.iter().enumerate() {
            p.ssb_index = i as u8;
            let occasion = resolve(&p).unwrap();
            assert_eq!(occasion.search_space0.first_symbol, symbol, "ssb {}", i);
            let slot = if i == 4 || i == 5 { 9 } else { 10 };
            assert_eq!(occasion.search_space0.first_slot, slot, "ssb {}", i);
            assert_eq!(occasion.search_space0.frame_parity, 1);
            assert_eq!(occasion.search_space0.slots_per_monitoring_period, 1);
        }
    }

    #[test]
    fn test_type2_240_120_previous_frame() {
        let mut p = params(Scs240, Scs120, 0x40);
        p.frequency_range = FrequencyRange::Fr2;
        p.sfn_ssb = 5;
        p.ssb_slot = 0;
        p.slots_per_frame = 160;

        p.ssb_index = 12;
        let ss0 = resolve(&p).unwrap().search_space0;
        assert_eq!(ss0.first_slot, 159);
        assert_eq!(ss0.first_symbol, 12);
        assert_eq!(ss0.frame_parity, 0);

        p.ssb_index = 14;
        let ss0 = resolve(&p).unwrap().search_space0;
        assert_eq!(ss0.first_slot, 0);
        assert_eq!(ss0.frame_parity, 1);
    }

    #[test]
    fn test_type3_120_120() {
        let mut p = params(Scs120, Scs120, 0x50);
        p.frequency_range = FrequencyRange::Fr2;
        p.ssb_index = 6;
        let occasion = resolve(&p).unwrap();
        assert_eq!(occasion.coreset0.mux_pattern, MuxPattern::Type3);
        assert_eq!(occasion.coreset0.rb_offset, 24);
        assert_eq!(occasion.search_space0.first_symbol, 2);
    }

    #[test]
    fn test_initial_pdcch_config() {
        let occasion = resolve(&params(Scs15, Scs15, 0x00)).unwrap();
        let config = initial_pdcch_config(&occasion, 52, 42, Scs15, 2);
        assert_eq!(config.frequency_domain_resources, [0xF0, 0, 0, 0, 0, 0]);
        assert_eq!(config.bwp_size, 52);
        assert_eq!(config.scrambling_ids, vec![42, 42]);
        assert_eq!(config.coreset_type, CoresetType::Coreset0);
        assert_eq!(
            config.cce_reg_mapping,
            CceRegMapping::Interleaved { reg_bundle_size: 6, interleaver_size: 2, shift_index: 42 }
        );
    }

    #[test]
    fn test_leading_ones_bitmap() {
        assert_eq!(leading_ones_bitmap(16), [0xFF, 0xFF, 0, 0, 0, 0]);
        assert_eq!(leading_ones_bitmap(45), [0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xF8]);
    }
}
