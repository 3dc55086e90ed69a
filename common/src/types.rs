//! Common Types for the NR MAC control-channel core
//!
//! Defines fundamental numerology and identifier types shared by the layers

use serde::{Deserialize, Serialize};
use num_derive::FromPrimitive;
use num_traits::FromPrimitive;

/// Physical Cell Identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pci(pub u16);

impl Pci {
    /// Maximum valid PCI value (0-1007)
    pub const MAX: u16 = 1007;

    /// Create a new PCI with validation
    pub fn new(value: u16) -> Option<Self> {
        if value <= Self::MAX {
            Some(Self(value))
        } else {
            None
        }
    }
}

/// Subcarrier spacing values in kHz
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromPrimitive, Serialize, Deserialize)]
pub enum SubcarrierSpacing {
    /// 15 kHz
    Scs15 = 15,
    /// 30 kHz
    Scs30 = 30,
    /// 60 kHz
    Scs60 = 60,
    /// 120 kHz
    Scs120 = 120,
    /// 240 kHz
    Scs240 = 240,
}

impl SubcarrierSpacing {
    /// Parse a spacing given in kHz
    pub fn from_khz(khz: u32) -> Option<Self> {
        Self::from_u32(khz)
    }

    /// Numerology index mu, where spacing = 15 kHz * 2^mu
    pub fn numerology(&self) -> u8 {
        match self {
            Self::Scs15 => 0,
            Self::Scs30 => 1,
            Self::Scs60 => 2,
            Self::Scs120 => 3,
            Self::Scs240 => 4,
        }
    }

    /// Spacing in kHz
    pub fn khz(&self) -> u32 {
        *self as u32
    }

    /// Number of slots in a 10 ms frame
    pub fn slots_per_frame(&self) -> u16 {
        10 << self.numerology()
    }
}

/// Frequency range of the carrier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FrequencyRange {
    /// Sub-6 GHz
    Fr1,
    /// Millimeter wave
    Fr2,
}

impl FrequencyRange {
    /// Bands numbered 257 and above are FR2 (TS 38.104)
    pub fn from_band(band: u16) -> Self {
        if band >= 257 {
            Self::Fr2
        } else {
            Self::Fr1
        }
    }
}

/// Cyclic prefix type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CyclicPrefix {
    /// Normal cyclic prefix
    #[default]
    Normal,
    /// Extended cyclic prefix (60 kHz only)
    Extended,
}

impl CyclicPrefix {
    /// OFDM symbols per slot
    pub fn symbols_per_slot(&self) -> u8 {
        match self {
            Self::Normal => 14,
            Self::Extended => 12,
        }
    }
}
