//! RRC-derived cell configuration
//!
//! Read-only view of the TS 38.331 information elements the MAC needs to
//! build PDCCH configurations. Values keep their ASN.1 encoding (raw
//! enumeration indices, RIVs, bitmaps); decoding happens where they are
//! consumed. The model is filled from a configuration file, not from ASN.1.

use common::types::{CyclicPrefix, FrequencyRange, SubcarrierSpacing};
use common::utils::{riv_to_prbs, MAX_BWP_PRBS};
use serde::{Deserialize, Serialize};

use crate::LayerError;

/// Cell-wide parameters from ServingCellConfigCommon
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServingCellConfigCommon {
    /// Physical cell identity (0-1007)
    pub physical_cell_id: u16,
    /// Operating band
    pub band: u16,
    pub frequency_range: FrequencyRange,
    /// Carrier bandwidth in RBs at the common subcarrier spacing
    pub carrier_rbs: u16,
    /// SS/PBCH and common subcarrier spacing
    pub ssb_subcarrier_spacing: SubcarrierSpacing,
    /// First DM-RS symbol for PDSCH mapping type A (2 or 3)
    #[serde(default = "default_dmrs_type_a_position")]
    pub dmrs_type_a_position: u8,
}

fn default_dmrs_type_a_position() -> u8 {
    2
}

/// Downlink bandwidth part (BWP-Downlink with its PDCCH-Config)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BwpDownlink {
    pub bwp_id: u8,
    /// RIV over 275 PRBs
    pub location_and_bandwidth: u32,
    pub subcarrier_spacing: SubcarrierSpacing,
    #[serde(default)]
    pub cyclic_prefix: CyclicPrefix,
    pub control_resource_sets: Option<Vec<ControlResourceSet>>,
    pub search_spaces: Option<Vec<SearchSpace>>,
    #[serde(default)]
    pub pdsch_time_allocations: Vec<TimeDomainAllocation>,
}

impl BwpDownlink {
    /// First PRB relative to point A and size in PRBs, from `locationAndBandwidth`
    pub fn location(&self) -> Result<(u16, u16), LayerError> {
        riv_to_prbs(self.location_and_bandwidth, MAX_BWP_PRBS).ok_or_else(|| {
            LayerError::Configuration(format!(
                "BWP {}: locationAndBandwidth {} is not a RIV over {} PRBs",
                self.bwp_id, self.location_and_bandwidth, MAX_BWP_PRBS
            ))
        })
    }
}

/// ControlResourceSet information element
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlResourceSet {
    pub id: u8,
    /// 45-bit bitmap, one bit per group of 6 RBs, MSB first
    pub frequency_domain_resources: [u8; 6],
    /// Duration in symbols (1-3)
    pub duration: u8,
    pub cce_reg_mapping: CceRegMappingType,
    #[serde(default)]
    pub precoder_granularity: PrecoderGranularity,
    #[serde(default)]
    pub pdcch_dmrs_scrambling_id: Option<u16>,
}

/// cce-REG-MappingType choice, with raw enumeration indices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CceRegMappingType {
    NonInterleaved,
    Interleaved {
        /// ENUMERATED {n2, n3, n6}
        reg_bundle_size: u8,
        /// ENUMERATED {n2, n3, n6}
        interleaver_size: u8,
        #[serde(default)]
        shift_index: Option<u16>,
    },
}

/// Precoder granularity of a CORESET
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrecoderGranularity {
    #[default]
    SameAsRegBundle,
    AllContiguousRbs,
}

/// Search space type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchSpaceKind {
    Common,
    UeSpecific,
}

/// monitoringSlotPeriodicityAndOffset, with the period in slots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotPeriodicityAndOffset {
    pub periodicity: u16,
    #[serde(default)]
    pub offset: u16,
}

impl Default for SlotPeriodicityAndOffset {
    fn default() -> Self {
        Self { periodicity: 1, offset: 0 }
    }
}

/// SearchSpace information element
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchSpace {
    pub id: u8,
    pub control_resource_set_id: Option<u8>,
    pub search_space_type: Option<SearchSpaceKind>,
    /// 14-bit bitmap left-aligned in two bytes
    pub monitoring_symbols_within_slot: Option<[u8; 2]>,
    #[serde(default)]
    pub monitoring_slot_periodicity_and_offset: SlotPeriodicityAndOffset,
    /// Consecutive monitored slots per period
    #[serde(default)]
    pub duration: Option<u16>,
    /// nrofCandidates per aggregation level 1..16, ENUMERATED {n0..n6, n8}
    #[serde(default)]
    pub nrof_candidates: [u8; 5],
}

/// PDSCH mapping type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MappingType {
    #[default]
    TypeA,
    TypeB,
}

/// PDSCH-TimeDomainResourceAllocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeDomainAllocation {
    /// Slot offset K0
    #[serde(default)]
    pub k0: u8,
    #[serde(default)]
    pub mapping_type: MappingType,
    pub start_symbol_and_length: u8,
}
