//! Cell configuration file
//!
//! YAML or TOML description of one cell, in the layout of the `cell_cfg`
//! section of srsRAN-style gNB configuration files, extended with the
//! dedicated BWP used for UE-specific PDCCH.

use anyhow::{anyhow, Context, Result};
use common::types::{FrequencyRange, Pci, SubcarrierSpacing};
use common::utils::carrier_bandwidth_mhz;
use layers::mac::MibConfig;
use layers::rrc::{BwpDownlink, ServingCellConfigCommon};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, warn};

/// Main configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GnbConfig {
    /// Cell configuration
    pub cell_cfg: CellConfig,
    /// Logging configuration
    #[serde(default)]
    pub log: LogConfig,
}

/// Cell configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CellConfig {
    /// Physical Cell ID
    pub pci: u16,
    /// Band number
    pub band: u16,
    /// Common (SS/PBCH) subcarrier spacing in kHz
    pub common_scs: u32,
    /// Frequency range, derived from the band when absent
    #[serde(default)]
    pub frequency_range: Option<FrequencyRange>,
    /// Carrier bandwidth in RBs
    pub carrier_rbs: u16,
    /// SS/PBCH subcarrier offset k_SSB
    #[serde(default)]
    pub k_ssb: u8,
    /// First PDSCH DM-RS symbol (2 or 3)
    #[serde(default = "default_dmrs_type_a_position")]
    pub dmrs_type_a_position: u8,
    /// PDCCH configuration
    pub pdcch: PdcchConfig,
    /// Dedicated downlink BWP
    #[serde(default)]
    pub bwp: Option<BwpDownlink>,
}

fn default_dmrs_type_a_position() -> u8 {
    2
}

/// PDCCH configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PdcchConfig {
    /// Common PDCCH configuration
    pub common: CommonPdcchConfig,
    /// Dedicated PDCCH configuration
    #[serde(default)]
    pub dedicated: DedicatedPdcchConfig,
}

/// Common PDCCH configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CommonPdcchConfig {
    /// Search space 0 index
    pub ss0_index: u8,
    /// CORESET#0 index
    pub coreset0_index: u8,
    /// subCarrierSpacingCommon in kHz, defaults to the common SCS
    #[serde(default)]
    pub pdcch_scs: Option<u32>,
}

/// Dedicated PDCCH configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DedicatedPdcchConfig {
    /// DCIs per PDCCH occasion
    #[serde(default = "default_num_dci")]
    pub num_dci: usize,
}

impl Default for DedicatedPdcchConfig {
    fn default() -> Self {
        Self { num_dci: default_num_dci() }
    }
}

fn default_num_dci() -> usize {
    1
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LogConfig {
    /// Default log level
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self { level: default_log_level() }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn parse_scs(khz: u32) -> Result<SubcarrierSpacing> {
    SubcarrierSpacing::from_khz(khz).ok_or_else(|| anyhow!("Invalid subcarrier spacing: {} kHz", khz))
}

impl GnbConfig {
    /// Load configuration from a YAML or TOML file, by extension
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration {}", path.display()))?;

        match path.extension().and_then(|e| e.to_str()) {
            Some("yml") | Some("yaml") => Self::from_yaml_str(&contents),
            Some("toml") => Self::from_toml_str(&contents),
            _ => Err(anyhow!("Unsupported configuration format: {}", path.display())),
        }
    }

    pub fn from_yaml_str(contents: &str) -> Result<Self> {
        let config: GnbConfig = serde_yaml::from_str(contents)?;
        Ok(config)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: GnbConfig = toml::from_str(contents)?;
        Ok(config)
    }

    /// Cell-wide parameters for the MAC
    pub fn serving_cell(&self) -> Result<ServingCellConfigCommon> {
        let cell = &self.cell_cfg;
        let pci = Pci::new(cell.pci).ok_or_else(|| anyhow!("Invalid PCI: {}", cell.pci))?;
        let scs = parse_scs(cell.common_scs)?;

        match carrier_bandwidth_mhz(scs.numerology(), cell.carrier_rbs, cell.band) {
            Some(mhz) => debug!("Carrier: {} RBs, {} MHz", cell.carrier_rbs, mhz),
            None => warn!(
                "{} RBs at {} kHz is not a standard carrier bandwidth for band {}",
                cell.carrier_rbs, cell.common_scs, cell.band
            ),
        }

        Ok(ServingCellConfigCommon {
            physical_cell_id: pci.0,
            band: cell.band,
            frequency_range: self.frequency_range(),
            carrier_rbs: cell.carrier_rbs,
            ssb_subcarrier_spacing: scs,
            dmrs_type_a_position: cell.dmrs_type_a_position,
        })
    }

    /// MIB parameters; `pdcch-ConfigSIB1` packs both indices
    pub fn mib(&self) -> Result<MibConfig> {
        let cell = &self.cell_cfg;
        let common = &cell.pdcch.common;
        if common.coreset0_index > 15 || common.ss0_index > 15 {
            return Err(anyhow!(
                "CORESET#0 index {} and search space 0 index {} must be 4-bit values",
                common.coreset0_index,
                common.ss0_index
            ));
        }

        Ok(MibConfig {
            subcarrier_spacing_common: parse_scs(common.pdcch_scs.unwrap_or(cell.common_scs))?,
            pdcch_config_sib1: (common.coreset0_index << 4) | common.ss0_index,
            k_ssb: cell.k_ssb,
        })
    }

    pub fn frequency_range(&self) -> FrequencyRange {
        self.cell_cfg
            .frequency_range
            .unwrap_or_else(|| FrequencyRange::from_band(self.cell_cfg.band))
    }
}
