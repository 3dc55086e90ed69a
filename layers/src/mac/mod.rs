//! Medium Access Control (MAC) Layer Implementation
//!
//! PDCCH configuration and DCI payload generation for the 5G NR MAC
//! (3GPP TS 38.212 / 38.213)

pub mod coreset0;
pub mod dci;
pub mod pdcch_config;
pub mod search_space;
pub mod tables;
pub mod time_alloc;

use crate::rrc::{BwpDownlink, SearchSpaceKind, ServingCellConfigCommon};
use crate::LayerError;
use common::types::SubcarrierSpacing;
use tracing::{debug, info};

pub use coreset0::{
    initial_pdcch_config, resolve, Coreset0Descriptor, InitialAccessParams, SearchSpace0Descriptor,
    Type0PdcchOccasion,
};
pub use dci::{dci_size, encode, encode_all, DciFields, DciFormat, DciPayload, DciPdu, RntiType};
pub use pdcch_config::{build_dedicated, CceRegMapping, CoresetType, PdcchConfig};
pub use tables::MuxPattern;

/// MIB fields governing initial access
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MibConfig {
    /// subCarrierSpacingCommon, used by CORESET#0
    pub subcarrier_spacing_common: SubcarrierSpacing,
    pub pdcch_config_sib1: u8,
    pub k_ssb: u8,
}

/// Control channel a DCI is sent on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlChannel {
    Coreset0,
    Dedicated(SearchSpaceKind),
}

/// Position of the SS/PBCH block the Type0-PDCCH occasion is derived from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SsbPosition {
    pub ssb_index: u8,
    pub sfn: u16,
    pub slot: u16,
}

/// Per-cell owner of the built PDCCH configurations.
///
/// Configurations are replaced as a whole by `rebuild`; a failed rebuild
/// leaves the context without any configuration.
pub struct MacPdcchContext {
    cell: ServingCellConfigCommon,
    mib: MibConfig,
    bwp: Option<BwpDownlink>,
    num_dci: usize,
    occasion: Option<Type0PdcchOccasion>,
    coreset0: Option<PdcchConfig>,
    common: Option<PdcchConfig>,
    ue_specific: Option<PdcchConfig>,
}

impl MacPdcchContext {
    /// Create a context; nothing is built until `rebuild`
    pub fn new(cell: ServingCellConfigCommon, mib: MibConfig, bwp: Option<BwpDownlink>, num_dci: usize) -> Self {
        Self {
            cell,
            mib,
            bwp,
            num_dci,
            occasion: None,
            coreset0: None,
            common: None,
            ue_specific: None,
        }
    }

    /// Replace the dedicated BWP. Built configurations are discarded.
    pub fn set_bwp(&mut self, bwp: Option<BwpDownlink>) {
        self.bwp = bwp;
        self.clear();
    }

    fn clear(&mut self) {
        self.occasion = None;
        self.coreset0 = None;
        self.common = None;
        self.ue_specific = None;
    }

    /// Rebuild every PDCCH configuration for the given SS/PBCH block
    pub fn rebuild(&mut self, ssb: SsbPosition) -> Result<(), LayerError> {
        self.clear();

        let scs_common = self.cell.ssb_subcarrier_spacing;
        let params = InitialAccessParams {
            scs_common,
            pdcch_scs: self.mib.subcarrier_spacing_common,
            frequency_range: self.cell.frequency_range,
            pdcch_config_sib1: self.mib.pdcch_config_sib1,
            ssb_index: ssb.ssb_index,
            k_ssb: self.mib.k_ssb,
            sfn_ssb: ssb.sfn,
            ssb_slot: ssb.slot,
            slots_per_frame: scs_common.slots_per_frame(),
            carrier_rbs: self.cell.carrier_rbs,
        };

        let occasion = resolve(&params)?;
        let coreset0 = initial_pdcch_config(
            &occasion,
            self.cell.carrier_rbs,
            self.cell.physical_cell_id,
            self.mib.subcarrier_spacing_common,
            self.num_dci,
        );

        let (common, ue_specific) = match &self.bwp {
            Some(bwp) => {
                let common = build_dedicated(&self.cell, bwp, SearchSpaceKind::Common, self.num_dci)?;
                let has_ue_specific = bwp
                    .search_spaces
                    .iter()
                    .flatten()
                    .any(|ss| ss.search_space_type == Some(SearchSpaceKind::UeSpecific));
                let ue_specific = if has_ue_specific {
                    Some(build_dedicated(&self.cell, bwp, SearchSpaceKind::UeSpecific, self.num_dci)?)
                } else {
                    debug!("BWP {} has no UE-specific search space", bwp.bwp_id);
                    None
                };
                (Some(common), ue_specific)
            }
            None => (None, None),
        };

        info!(
            "PDCCH configuration rebuilt for PCI {} SSB {}: CORESET#0 {} RBs, dedicated BWP {}",
            self.cell.physical_cell_id,
            ssb.ssb_index,
            occasion.coreset0.num_rbs,
            if common.is_some() { "configured" } else { "absent" }
        );

        self.occasion = Some(occasion);
        self.coreset0 = Some(coreset0);
        self.common = common;
        self.ue_specific = ue_specific;
        Ok(())
    }

    pub fn occasion(&self) -> Option<&Type0PdcchOccasion> {
        self.occasion.as_ref()
    }

    /// Built configuration of a control channel
    pub fn pdcch_config(&self, channel: ControlChannel) -> Result<&PdcchConfig, LayerError> {
        let config = match channel {
            ControlChannel::Coreset0 => self.coreset0.as_ref(),
            ControlChannel::Dedicated(SearchSpaceKind::Common) => self.common.as_ref(),
            ControlChannel::Dedicated(SearchSpaceKind::UeSpecific) => self.ue_specific.as_ref(),
        };
        config.ok_or(LayerError::NotInitialized)
    }

    /// Encode the DCIs of one PDCCH occasion on `channel`
    pub fn encode(&self, channel: ControlChannel, pdus: &[DciPdu]) -> Result<Vec<DciPayload>, LayerError> {
        encode_all(self.pdcch_config(channel)?, pdus)
    }
}
