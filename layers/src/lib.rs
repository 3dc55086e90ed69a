//! Protocol Stack Layers Library
//!
//! MAC control-channel configuration for 5G NR: CORESET#0 and Type0-PDCCH
//! resolution, dedicated PDCCH configuration and DCI payload packing
//! (3GPP TS 38.212, 38.213, 38.214).

pub mod mac;
pub mod rrc;

use thiserror::Error;

/// Common errors for protocol layers
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LayerError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Unsupported DCI: {0}")]
    UnsupportedDci(String),

    #[error("Layer not initialized")]
    NotInitialized,
}
