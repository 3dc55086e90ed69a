//! Type0-PDCCH lookup tables
//!
//! Constant data for CORESET#0 (TS 38.213 Tables 13-1 to 13-10) and the
//! Type0-PDCCH common search space (Tables 13-11 to 13-17). The tables are
//! compile-time data keyed by `(scs_common, pdcch_scs, size class)`; every
//! access is bounds-checked and reports the offending combination.

use crate::LayerError;
use common::types::SubcarrierSpacing;
use serde::Serialize;

/// Carrier size at and above which the 30 kHz tables for a 40 MHz minimum
/// channel bandwidth apply
pub const MIN_RBS_40MHZ_30KHZ: u16 = 106;

/// SSB and CORESET#0 multiplexing pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MuxPattern {
    /// CORESET#0 and SSB in different time instances
    Type1,
    /// CORESET#0 precedes the SSB, different frequency
    Type2,
    /// CORESET#0 and SSB in the same symbols, different frequency
    Type3,
}

/// RB offset column of the CORESET#0 tables
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RbOffset {
    /// Offset in RBs from the SSB's first RB
    Fixed(u8),
    /// CORESET#0 sits below the SSB; the offset depends on whether k_SSB is zero
    BelowPointA {
        k_ssb_zero: i16,
        k_ssb_nonzero: i16,
    },
}

impl RbOffset {
    pub fn resolve(&self, k_ssb: u8) -> i16 {
        match *self {
            RbOffset::Fixed(offset) => offset as i16,
            RbOffset::BelowPointA { k_ssb_zero, k_ssb_nonzero } => {
                if k_ssb == 0 {
                    k_ssb_zero
                } else {
                    k_ssb_nonzero
                }
            }
        }
    }
}

/// One row of a CORESET#0 table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoresetEntry {
    pub mux: MuxPattern,
    pub num_rbs: u16,
    pub num_symbols: u8,
    pub offset: RbOffset,
}

const fn t1(num_rbs: u16, num_symbols: u8, offset: u8) -> CoresetEntry {
    CoresetEntry { mux: MuxPattern::Type1, num_rbs, num_symbols, offset: RbOffset::Fixed(offset) }
}

const fn fixed(mux: MuxPattern, num_rbs: u16, num_symbols: u8, offset: u8) -> CoresetEntry {
    CoresetEntry { mux, num_rbs, num_symbols, offset: RbOffset::Fixed(offset) }
}

const fn below(mux: MuxPattern, num_rbs: u16, num_symbols: u8, k_ssb_zero: i16, k_ssb_nonzero: i16) -> CoresetEntry {
    CoresetEntry { mux, num_rbs, num_symbols, offset: RbOffset::BelowPointA { k_ssb_zero, k_ssb_nonzero } }
}

use MuxPattern::{Type2, Type3};

/// A CORESET#0 table for one numerology pair
#[derive(Debug)]
pub struct CoresetTable {
    /// Table name in TS 38.213, used in error messages
    pub name: &'static str,
    pub entries: &'static [CoresetEntry],
}

impl CoresetTable {
    /// Row for a 4-bit CORESET#0 index
    pub fn entry(&self, index: u8) -> Result<&'static CoresetEntry, LayerError> {
        self.entries.get(index as usize).ok_or_else(|| {
            LayerError::Configuration(format!(
                "CORESET#0 index {} reserved in {} (valid 0..={})",
                index,
                self.name,
                self.entries.len() - 1
            ))
        })
    }
}

static CORESET0_15_15: CoresetTable = CoresetTable {
    name: "Table 13-1 {15, 15} kHz",
    entries: &[
        t1(24, 2, 0), t1(24, 2, 2), t1(24, 2, 4),
        t1(24, 3, 0), t1(24, 3, 2), t1(24, 3, 4),
        t1(48, 1, 12), t1(48, 1, 16), t1(48, 2, 12),
        t1(48, 2, 16), t1(48, 3, 12), t1(48, 3, 16),
        t1(96, 1, 38), t1(96, 2, 38), t1(96, 3, 38),
    ],
};

static CORESET0_15_30: CoresetTable = CoresetTable {
    name: "Table 13-2 {15, 30} kHz",
    entries: &[
        t1(24, 2, 5), t1(24, 2, 6), t1(24, 2, 7), t1(24, 2, 8),
        t1(24, 3, 5), t1(24, 3, 6), t1(24, 3, 7), t1(24, 3, 8),
        t1(48, 1, 18), t1(48, 1, 20), t1(48, 2, 18),
        t1(48, 2, 20), t1(48, 3, 18), t1(48, 3, 20),
    ],
};

static CORESET0_30_15: CoresetTable = CoresetTable {
    name: "Table 13-3 {30, 15} kHz",
    entries: &[
        t1(48, 1, 2), t1(48, 1, 6), t1(48, 2, 2),
        t1(48, 2, 6), t1(48, 3, 2), t1(48, 3, 6),
        t1(96, 1, 28), t1(96, 2, 28), t1(96, 3, 28),
    ],
};

static CORESET0_30_30: CoresetTable = CoresetTable {
    name: "Table 13-4 {30, 30} kHz",
    entries: &[
        t1(24, 2, 0), t1(24, 2, 1), t1(24, 2, 2), t1(24, 2, 3), t1(24, 2, 4),
        t1(24, 3, 0), t1(24, 3, 1), t1(24, 3, 2), t1(24, 3, 3), t1(24, 3, 4),
        t1(48, 1, 12), t1(48, 1, 14), t1(48, 1, 16),
        t1(48, 2, 12), t1(48, 2, 14), t1(48, 2, 16),
    ],
};

static CORESET0_30_15_40MHZ: CoresetTable = CoresetTable {
    name: "Table 13-5 {30, 15} kHz, 40 MHz minimum bandwidth",
    entries: &[
        t1(48, 1, 4), t1(48, 2, 4), t1(48, 3, 4),
        t1(96, 1, 0), t1(96, 1, 56), t1(96, 2, 0),
        t1(96, 2, 56), t1(96, 3, 0), t1(96, 3, 56),
    ],
};

static CORESET0_30_30_40MHZ: CoresetTable = CoresetTable {
    name: "Table 13-6 {30, 30} kHz, 40 MHz minimum bandwidth",
    entries: &[
        t1(24, 2, 0), t1(24, 2, 4), t1(24, 3, 0), t1(24, 3, 4),
        t1(48, 1, 0), t1(48, 1, 28), t1(48, 2, 0),
        t1(48, 2, 28), t1(48, 3, 0), t1(48, 3, 28),
    ],
};

static CORESET0_120_60: CoresetTable = CoresetTable {
    name: "Table 13-7 {120, 60} kHz",
    entries: &[
        t1(48, 1, 0), t1(48, 1, 8), t1(48, 2, 0), t1(48, 2, 8),
        t1(48, 3, 0), t1(48, 3, 8), t1(96, 1, 28), t1(96, 2, 28),
        below(Type2, 48, 1, -41, -42), fixed(Type2, 48, 1, 49),
        below(Type2, 96, 1, -41, -42), fixed(Type2, 96, 1, 97),
    ],
};

static CORESET0_120_120: CoresetTable = CoresetTable {
    name: "Table 13-8 {120, 120} kHz",
    entries: &[
        t1(24, 2, 0), t1(24, 2, 4), t1(48, 1, 14), t1(48, 2, 14),
        below(Type3, 24, 2, -20, -21), fixed(Type3, 24, 2, 24),
        below(Type3, 48, 2, -20, -21), fixed(Type3, 48, 2, 48),
    ],
};

static CORESET0_240_60: CoresetTable = CoresetTable {
    name: "Table 13-9 {240, 60} kHz",
    entries: &[t1(96, 1, 0), t1(96, 1, 16), t1(96, 2, 0), t1(96, 2, 16)],
};

static CORESET0_240_120: CoresetTable = CoresetTable {
    name: "Table 13-10 {240, 120} kHz",
    entries: &[
        t1(48, 1, 0), t1(48, 1, 8), t1(48, 2, 0), t1(48, 2, 8),
        below(Type2, 24, 1, -41, -42), fixed(Type2, 24, 1, 25),
        below(Type2, 48, 1, -41, -42), fixed(Type2, 48, 1, 49),
    ],
};

/// Select the CORESET#0 table for a numerology pair and carrier size
pub fn coreset0_table(
    scs_common: SubcarrierSpacing,
    pdcch_scs: SubcarrierSpacing,
    carrier_rbs: u16,
) -> Result<&'static CoresetTable, LayerError> {
    use SubcarrierSpacing::*;

    let wide = carrier_rbs >= MIN_RBS_40MHZ_30KHZ;
    let table = match (scs_common, pdcch_scs) {
        (Scs15, Scs15) => &CORESET0_15_15,
        (Scs15, Scs30) => &CORESET0_15_30,
        (Scs30, Scs15) if wide => &CORESET0_30_15_40MHZ,
        (Scs30, Scs15) => &CORESET0_30_15,
        (Scs30, Scs30) if wide => &CORESET0_30_30_40MHZ,
        (Scs30, Scs30) => &CORESET0_30_30,
        (Scs120, Scs60) => &CORESET0_120_60,
        (Scs120, Scs120) => &CORESET0_120_120,
        (Scs240, Scs60) => &CORESET0_240_60,
        (Scs240, Scs120) => &CORESET0_240_120,
        _ => {
            return Err(LayerError::Configuration(format!(
                "Invalid scs_common/pdcch_scs combination {}/{} kHz",
                scs_common.khz(),
                pdcch_scs.khz()
            )))
        }
    };
    Ok(table)
}

/// First monitored symbol column of the Type0-PDCCH search space tables
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FirstSymbol {
    Fixed(u8),
    /// 0 for even SSB index, CORESET#0 duration for odd
    AlternateCoresetSymbols,
    /// 0 for even SSB index, 7 for odd
    AlternateSeven,
}

impl FirstSymbol {
    pub fn resolve(&self, ssb_index: u8, coreset_symbols: u8) -> u8 {
        let odd = ssb_index & 1 == 1;
        match *self {
            FirstSymbol::Fixed(symbol) => symbol,
            FirstSymbol::AlternateCoresetSymbols if odd => coreset_symbols,
            FirstSymbol::AlternateSeven if odd => 7,
            _ => 0,
        }
    }
}

/// One row of a multiplexing pattern 1 search space table.
///
/// O and M are fractional in the specification; they are held as numerators
/// with a power-of-two denominator exponent (`o_scale`, `m_scale`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchSpaceEntry {
    pub o: u8,
    pub o_scale: u8,
    pub sets_per_slot: u8,
    pub m: u8,
    pub m_scale: u8,
    pub first_symbol: FirstSymbol,
}

const fn ss(o: u8, o_scale: u8, sets_per_slot: u8, m: u8, m_scale: u8, first_symbol: FirstSymbol) -> SearchSpaceEntry {
    SearchSpaceEntry { o, o_scale, sets_per_slot, m, m_scale, first_symbol }
}

use FirstSymbol::{AlternateCoresetSymbols as ALT_N, AlternateSeven as ALT_7, Fixed};

/// Table 13-11, FR1
static SEARCH_SPACE0_MUX1_FR1: [SearchSpaceEntry; 16] = [
    ss(0, 0, 1, 1, 0, ALT_N),
    ss(0, 0, 2, 1, 1, ALT_N),
    ss(2, 0, 1, 1, 0, ALT_N),
    ss(2, 0, 2, 1, 1, ALT_N),
    ss(5, 0, 1, 1, 0, ALT_N),
    ss(5, 0, 2, 1, 1, ALT_N),
    ss(7, 0, 1, 1, 0, ALT_N),
    ss(7, 0, 2, 1, 1, ALT_N),
    ss(0, 0, 1, 2, 0, Fixed(0)),
    ss(5, 0, 1, 2, 0, Fixed(0)),
    ss(0, 0, 1, 1, 0, Fixed(1)),
    ss(0, 0, 1, 1, 0, Fixed(2)),
    ss(2, 0, 1, 1, 0, Fixed(1)),
    ss(2, 0, 1, 1, 0, Fixed(2)),
    ss(5, 0, 1, 1, 0, Fixed(1)),
    ss(5, 0, 1, 1, 0, Fixed(2)),
];

/// Table 13-12, FR2
static SEARCH_SPACE0_MUX1_FR2: [SearchSpaceEntry; 14] = [
    ss(0, 0, 1, 1, 0, Fixed(0)),
    ss(0, 0, 2, 1, 1, ALT_7),
    ss(5, 1, 1, 1, 0, Fixed(0)),
    ss(5, 1, 2, 1, 1, ALT_7),
    ss(5, 0, 1, 1, 0, Fixed(0)),
    ss(5, 0, 2, 1, 1, ALT_7),
    ss(0, 0, 2, 1, 1, ALT_N),
    ss(5, 1, 2, 1, 1, ALT_N),
    ss(5, 0, 2, 1, 1, ALT_N),
    ss(15, 1, 1, 1, 0, Fixed(0)),
    ss(15, 1, 2, 1, 1, ALT_7),
    ss(15, 1, 2, 1, 1, ALT_N),
    ss(0, 0, 1, 2, 0, Fixed(0)),
    ss(5, 0, 1, 2, 0, Fixed(0)),
];

/// Multiplexing pattern 1 search space row for FR1
pub fn search_space0_fr1(index: u8) -> Result<&'static SearchSpaceEntry, LayerError> {
    SEARCH_SPACE0_MUX1_FR1.get(index as usize).ok_or_else(|| {
        LayerError::Configuration(format!("Invalid search space index {} for multiplexing type 1 and FR1", index))
    })
}

/// Multiplexing pattern 1 search space row for FR2
pub fn search_space0_fr2(index: u8) -> Result<&'static SearchSpaceEntry, LayerError> {
    SEARCH_SPACE0_MUX1_FR2.get(index as usize).ok_or_else(|| {
        LayerError::Configuration(format!("Invalid search space index {} for multiplexing type 1 and FR2", index))
    })
}

/// Table 13-15: {120, 60} kHz, pattern 2, by SSB index mod 4
pub const FIRST_SYMBOL_MUX2_120_60: [u8; 4] = [0, 1, 6, 7];

/// Table 13-16: {240, 120} kHz, pattern 2, by SSB index mod 8
pub const FIRST_SYMBOL_MUX2_240_120: [u8; 8] = [0, 1, 2, 3, 12, 13, 0, 1];

/// Table 13-17: {120, 120} kHz, pattern 3, by SSB index mod 4
pub const FIRST_SYMBOL_MUX3_120_120: [u8; 4] = [4, 8, 2, 6];

/// Maximum monitored PDCCH candidates per slot (TS 38.213 Table 10.1-2)
const MAX_CANDIDATES_PER_SLOT: [u8; 4] = [44, 36, 22, 20];

/// Candidate budget for a PDCCH subcarrier spacing
pub fn max_candidates_per_slot(pdcch_scs: SubcarrierSpacing) -> Result<u8, LayerError> {
    MAX_CANDIDATES_PER_SLOT
        .get(pdcch_scs.numerology() as usize)
        .copied()
        .ok_or_else(|| LayerError::Configuration(format!("Invalid PDCCH subcarrier spacing {} kHz", pdcch_scs.khz())))
}
