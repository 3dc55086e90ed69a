//! Search space monitoring
//!
//! Slot-level monitoring occasions and PDCCH candidate counts of a
//! configured search space (TS 38.213 §10.1).

use crate::mac::tables::max_candidates_per_slot;
use crate::rrc::SearchSpace;
use crate::LayerError;
use common::utils::time::absolute_slot;
use common::types::SubcarrierSpacing;
use num_derive::FromPrimitive;
use num_traits::FromPrimitive;
use serde::Serialize;

/// Aggregation levels 1, 2, 4, 8 and 16
pub const NUM_AGGREGATION_LEVELS: usize = 5;

/// monitoringSlotPeriodicityAndOffset choices, in slots
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive, Serialize)]
pub enum MonitoringPeriodicity {
    Sl1 = 1,
    Sl2 = 2,
    Sl4 = 4,
    Sl5 = 5,
    Sl8 = 8,
    Sl10 = 10,
    Sl16 = 16,
    Sl20 = 20,
    Sl40 = 40,
    Sl80 = 80,
    Sl160 = 160,
    Sl320 = 320,
    Sl640 = 640,
    Sl1280 = 1280,
    Sl2560 = 2560,
}

impl MonitoringPeriodicity {
    pub fn from_slots(slots: u16) -> Option<Self> {
        Self::from_u16(slots)
    }

    pub fn period_slots(&self) -> u32 {
        *self as u32
    }
}

/// Periodic monitoring pattern of one search space
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MonitoringOccasion {
    periodicity: MonitoringPeriodicity,
    offset: u16,
    duration: u16,
}

impl MonitoringOccasion {
    pub fn new(periodicity: MonitoringPeriodicity, offset: u16, duration: u16) -> Result<Self, LayerError> {
        if offset as u32 >= periodicity.period_slots() {
            return Err(LayerError::Configuration(format!(
                "Monitoring offset {} not below periodicity {:?}",
                offset, periodicity
            )));
        }
        if duration == 0 || duration as u32 > periodicity.period_slots() {
            return Err(LayerError::Configuration(format!(
                "Monitoring duration {} outside periodicity {:?}",
                duration, periodicity
            )));
        }
        Ok(Self { periodicity, offset, duration })
    }

    /// Monitoring pattern of a configured search space
    pub fn from_search_space(ss: &SearchSpace) -> Result<Self, LayerError> {
        let config = ss.monitoring_slot_periodicity_and_offset;
        let periodicity = MonitoringPeriodicity::from_slots(config.periodicity).ok_or_else(|| {
            LayerError::Configuration(format!(
                "Search space {}: invalid monitoring periodicity {} slots",
                ss.id, config.periodicity
            ))
        })?;
        Self::new(periodicity, config.offset, ss.duration.unwrap_or(1))
    }

    pub fn periodicity(&self) -> MonitoringPeriodicity {
        self.periodicity
    }

    pub fn offset(&self) -> u16 {
        self.offset
    }

    pub fn duration(&self) -> u16 {
        self.duration
    }

    /// Whether `slot` of `frame` is monitored
    pub fn is_monitoring_occasion(&self, frame: u32, slot: u16, slots_per_frame: u16) -> bool {
        let period = self.periodicity.period_slots();
        let absolute = absolute_slot(slots_per_frame, frame, slot);
        // Add one period before subtracting so the offset never underflows
        (absolute % period + period - self.offset as u32) % period < self.duration as u32
    }
}

/// Decode nrofCandidates: ENUMERATED {n0, n1, n2, n3, n4, n5, n6, n8}
pub fn decode_candidates(raw: [u8; NUM_AGGREGATION_LEVELS]) -> Result<[u8; NUM_AGGREGATION_LEVELS], LayerError> {
    let mut candidates = [0u8; NUM_AGGREGATION_LEVELS];
    for (level, (&r, c)) in raw.iter().zip(candidates.iter_mut()).enumerate() {
        *c = match r {
            0..=6 => r,
            7 => 8,
            _ => {
                return Err(LayerError::Configuration(format!(
                    "Invalid nrofCandidates {} for aggregation level {}",
                    r,
                    1 << level
                )))
            }
        };
    }
    Ok(candidates)
}

/// Decoded candidates of a search space, limited to the blind decodes one
/// slot allows at `pdcch_scs` (TS 38.213 Table 10.1-2)
pub fn candidates_per_slot(
    raw: [u8; NUM_AGGREGATION_LEVELS],
    pdcch_scs: SubcarrierSpacing,
) -> Result<[u8; NUM_AGGREGATION_LEVELS], LayerError> {
    let candidates = decode_candidates(raw)?;
    let total: u16 = candidates.iter().map(|&c| c as u16).sum();
    let limit = max_candidates_per_slot(pdcch_scs)?;
    if total > limit as u16 {
        return Err(LayerError::Configuration(format!(
            "{} PDCCH candidates exceed {} per slot at {} kHz",
            total,
            limit,
            pdcch_scs.khz()
        )));
    }
    Ok(candidates)
}
