//! PDCCH configuration
//!
//! The per-BWP control channel description handed to the DCI encoder and to
//! L1, built either for CORESET#0 (see `coreset0`) or from the dedicated
//! ControlResourceSet/SearchSpace configuration of a BWP.

use crate::rrc::{
    BwpDownlink, CceRegMappingType, ControlResourceSet, PrecoderGranularity, SearchSpace, SearchSpaceKind,
    ServingCellConfigCommon,
};
use crate::mac::search_space::candidates_per_slot;
use crate::LayerError;
use common::types::{CyclicPrefix, SubcarrierSpacing};
use serde::Serialize;
use tracing::debug;

/// CCE-to-REG mapping with decoded sizes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CceRegMapping {
    NonInterleaved,
    Interleaved {
        reg_bundle_size: u8,
        interleaver_size: u8,
        shift_index: u16,
    },
}

/// Origin of the CORESET a configuration describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CoresetType {
    Coreset0,
    Dedicated,
}

/// PDCCH configuration for one CORESET and BWP
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PdcchConfig {
    /// Size of the BWP the DCIs address, in PRBs
    pub bwp_size: u16,
    pub bwp_start: u16,
    pub subcarrier_spacing: SubcarrierSpacing,
    pub cyclic_prefix: CyclicPrefix,
    pub duration_symbols: u8,
    /// 45-bit bitmap of 6-RB groups, MSB first
    pub frequency_domain_resources: [u8; 6],
    pub cce_reg_mapping: CceRegMapping,
    pub precoder_granularity: PrecoderGranularity,
    /// DM-RS scrambling identity, one per DCI
    pub scrambling_ids: Vec<u16>,
    pub start_symbol: u8,
    pub coreset_type: CoresetType,
}

impl PdcchConfig {
    /// Number of RBs covered by the CORESET
    pub fn coreset_rbs(&self) -> u16 {
        self.frequency_domain_resources
            .iter()
            .map(|b| b.count_ones() as u16)
            .sum::<u16>()
            * 6
    }
}

/// Decode an ENUMERATED {n2, n3, n6} size
fn decode_size(raw: u8, what: &str) -> Result<u8, LayerError> {
    match raw {
        2 => Ok(6),
        0 | 1 => Ok(2 + raw),
        _ => Err(LayerError::Configuration(format!("Invalid {} enumeration {}", what, raw))),
    }
}

fn decode_cce_reg_mapping(mapping: &CceRegMappingType, pci: u16) -> Result<CceRegMapping, LayerError> {
    match *mapping {
        CceRegMappingType::NonInterleaved => Ok(CceRegMapping::NonInterleaved),
        CceRegMappingType::Interleaved { reg_bundle_size, interleaver_size, shift_index } => {
            Ok(CceRegMapping::Interleaved {
                reg_bundle_size: decode_size(reg_bundle_size, "reg-BundleSize")?,
                interleaver_size: decode_size(interleaver_size, "interleaverSize")?,
                shift_index: shift_index.unwrap_or(pci),
            })
        }
    }
}

/// First monitored symbol of a `monitoringSymbolsWithinSlot` bitmap
fn first_monitored_symbol(bitmap: [u8; 2], cyclic_prefix: CyclicPrefix) -> Option<u8> {
    let sps = cyclic_prefix.symbols_per_slot();
    let bits = ((bitmap[0] as u16) << (sps - 8)) | ((bitmap[1] as u16) >> (16 - sps));
    (0..sps).find(|&i| bits & (1 << (sps - 1 - i)) != 0)
}

fn find_search_space<'a>(
    search_spaces: &'a [SearchSpace],
    coreset_id: u8,
    kind: SearchSpaceKind,
) -> Result<&'a SearchSpace, LayerError> {
    for ss in search_spaces {
        let coreset = ss.control_resource_set_id.ok_or_else(|| {
            LayerError::Configuration(format!("Search space {} has no controlResourceSetId", ss.id))
        })?;
        let ss_kind = ss
            .search_space_type
            .ok_or_else(|| LayerError::Configuration(format!("Search space {} has no searchSpaceType", ss.id)))?;
        if coreset == coreset_id && ss_kind == kind {
            return Ok(ss);
        }
    }

    Err(LayerError::Configuration(format!(
        "No {:?} search space configured for CORESET {}",
        kind, coreset_id
    )))
}

/// Build the PDCCH configuration of a dedicated BWP.
///
/// The first configured CORESET is used; the search space is the one of the
/// requested kind attached to it.
pub fn build_dedicated(
    scc: &ServingCellConfigCommon,
    bwp: &BwpDownlink,
    kind: SearchSpaceKind,
    num_dci: usize,
) -> Result<PdcchConfig, LayerError> {
    let pci = scc.physical_cell_id;

    let coreset: &ControlResourceSet = bwp
        .control_resource_sets
        .as_deref()
        .and_then(|sets| sets.first())
        .ok_or_else(|| LayerError::Configuration(format!("BWP {} has no controlResourceSet", bwp.bwp_id)))?;

    let search_spaces = bwp
        .search_spaces
        .as_deref()
        .ok_or_else(|| LayerError::Configuration(format!("BWP {} has no searchSpace list", bwp.bwp_id)))?;
    let ss = find_search_space(search_spaces, coreset.id, kind)?;

    let bitmap = ss.monitoring_symbols_within_slot.ok_or_else(|| {
        LayerError::Configuration(format!("Search space {} has no monitoringSymbolsWithinSlot", ss.id))
    })?;
    let start_symbol = first_monitored_symbol(bitmap, bwp.cyclic_prefix).ok_or_else(|| {
        LayerError::Configuration(format!("Search space {} monitors no symbol", ss.id))
    })?;
    candidates_per_slot(ss.nrof_candidates, bwp.subcarrier_spacing)?;

    let (bwp_start, bwp_size) = bwp.location()?;
    let config = PdcchConfig {
        bwp_size,
        bwp_start,
        subcarrier_spacing: bwp.subcarrier_spacing,
        cyclic_prefix: bwp.cyclic_prefix,
        duration_symbols: coreset.duration,
        frequency_domain_resources: coreset.frequency_domain_resources,
        cce_reg_mapping: decode_cce_reg_mapping(&coreset.cce_reg_mapping, pci)?,
        precoder_granularity: coreset.precoder_granularity,
        scrambling_ids: vec![coreset.pdcch_dmrs_scrambling_id.unwrap_or(pci); num_dci],
        start_symbol,
        coreset_type: CoresetType::Dedicated,
    };

    debug!(
        "Dedicated PDCCH for BWP {}: CORESET {} ({} RBs, {} symbols) SS {} ({:?}) start symbol {}",
        bwp.bwp_id,
        coreset.id,
        config.coreset_rbs(),
        config.duration_symbols,
        ss.id,
        kind,
        config.start_symbol
    );

    Ok(config)
}
