//! DCI payload packing
//!
//! Bit-exact DCI format 1_0 and 0_0 payloads (TS 38.212 §7.3.1). Each
//! (format, RNTI type) pair has a fixed field order; only the frequency
//! domain assignment width depends on the BWP size. Fields are written most
//! significant bit first and the payload is returned right-aligned in a
//! `u64`, with a left-aligned byte view for L1.

use crate::mac::pdcch_config::PdcchConfig;
use crate::LayerError;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::trace;

/// Largest payload carried in one DCI
pub const MAX_DCI_BITS: u8 = 64;

/// UL format 0_0 is padded up to this size
const UL_0_0_MIN_BITS: u8 = 32;

/// DCI format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DciFormat {
    Ul0_0,
    Ul0_1,
    Dl1_0,
    Dl1_1,
}

impl FromStr for DciFormat {
    type Err = LayerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "0_0" => Ok(Self::Ul0_0),
            "0_1" => Ok(Self::Ul0_1),
            "1_0" => Ok(Self::Dl1_0),
            "1_1" => Ok(Self::Dl1_1),
            _ => Err(LayerError::UnsupportedDci(format!("Unknown DCI format {}", s))),
        }
    }
}

impl fmt::Display for DciFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Ul0_0 => "0_0",
            Self::Ul0_1 => "0_1",
            Self::Dl1_0 => "1_0",
            Self::Dl1_1 => "1_1",
        };
        f.write_str(name)
    }
}

/// RNTI type a DCI is scrambled with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RntiType {
    Ra,
    C,
    P,
    Si,
    Tc,
}

impl FromStr for RntiType {
    type Err = LayerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ra" => Ok(Self::Ra),
            "c" => Ok(Self::C),
            "p" => Ok(Self::P),
            "si" => Ok(Self::Si),
            "tc" => Ok(Self::Tc),
            _ => Err(LayerError::UnsupportedDci(format!("Unknown RNTI type {}", s))),
        }
    }
}

/// Field values set by the scheduler; fields absent from a layout are ignored
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DciFields {
    pub frequency_domain_assignment: u32,
    pub time_domain_assignment: u8,
    pub vrb_to_prb_mapping: u8,
    pub mcs: u8,
    pub tb_scaling: u8,
    pub format_indicator: u8,
    pub ra_preamble_index: u8,
    pub ul_sul_indicator: u8,
    pub ss_pbch_index: u8,
    pub prach_mask_index: u8,
    pub ndi: u8,
    pub rv: u8,
    pub harq_pid: u8,
    pub dai: u8,
    pub tpc: u8,
    pub pucch_resource_indicator: u8,
    pub pdsch_to_harq_feedback_timing: u8,
    pub short_messages_indicator: u8,
    pub short_messages: u8,
    pub frequency_hopping_flag: u8,
    pub padding: u8,
}

/// One DCI to encode
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DciPdu {
    pub format: DciFormat,
    pub rnti_type: RntiType,
    pub payload_size_bits: u8,
    pub fields: DciFields,
}

/// Encoded DCI payload, right-aligned in `value`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DciPayload {
    pub size_bits: u8,
    pub value: u64,
}

impl DciPayload {
    /// Payload left-aligned in eight big-endian bytes
    pub fn to_be_array(&self) -> [u8; 8] {
        let shift = (MAX_DCI_BITS - self.size_bits) as u32;
        self.value.checked_shl(shift).unwrap_or(0).to_be_bytes()
    }

    /// Left-aligned payload truncated to whole bytes
    pub fn to_bytes(&self) -> Bytes {
        let len = (self.size_bits as usize + 7) / 8;
        Bytes::copy_from_slice(&self.to_be_array()[..len])
    }
}

/// Width of the frequency domain assignment for an `n` PRB BWP:
/// ceil(log2(n * (n + 1) / 2))
pub fn frequency_assignment_bits(n: u16) -> u8 {
    let combinations = n as u32 * (n as u32 + 1) / 2;
    if combinations <= 1 {
        0
    } else {
        (u32::BITS - (combinations - 1).leading_zeros()) as u8
    }
}

fn all_ones(width: u8) -> u64 {
    if width == 0 {
        0
    } else {
        u64::MAX >> (64 - width as u32)
    }
}

/// MSB-first accumulator for (value, width) fields
struct BitWriter {
    value: u64,
    len: u8,
}

impl BitWriter {
    fn new() -> Self {
        Self { value: 0, len: 0 }
    }

    fn len(&self) -> u8 {
        self.len
    }

    fn write(&mut self, value: u64, width: u8) -> Result<(), LayerError> {
        if self.len as u32 + width as u32 > MAX_DCI_BITS as u32 {
            return Err(LayerError::UnsupportedDci(format!(
                "DCI exceeds {} bits",
                MAX_DCI_BITS
            )));
        }
        if width == 0 {
            return Ok(());
        }
        trace!("DCI field {:#x} ({} bits) at bit {}", value, width, self.len);
        self.value = self.value.checked_shl(width as u32).unwrap_or(0) | (value & all_ones(width));
        self.len += width;
        Ok(())
    }

    fn write_all(&mut self, fields: &[(u64, u8)]) -> Result<(), LayerError> {
        fields.iter().try_for_each(|&(value, width)| self.write(value, width))
    }
}

/// Write the layout of a (format, RNTI type) pair.
///
/// `ra_grant` selects the random access branch of format 1_0 with C-RNTI.
fn write_layout(
    writer: &mut BitWriter,
    format: DciFormat,
    rnti_type: RntiType,
    f: &DciFields,
    freq_bits: u8,
    ra_grant: bool,
) -> Result<(), LayerError> {
    let freq = (f.frequency_domain_assignment as u64, freq_bits);
    let tda = (f.time_domain_assignment as u64, 4);
    let vrb = (f.vrb_to_prb_mapping as u64, 1);
    let mcs = (f.mcs as u64, 5);
    let format_ind = (f.format_indicator as u64, 1);
    let ndi = (f.ndi as u64, 1);
    let rv = (f.rv as u64, 2);
    let harq = (f.harq_pid as u64, 4);
    let tpc = (f.tpc as u64, 2);
    let harq_timing = (f.pdsch_to_harq_feedback_timing as u64, 3);

    match (format, rnti_type) {
        (DciFormat::Dl1_0, RntiType::Ra) => {
            writer.write_all(&[freq, tda, vrb, mcs, (f.tb_scaling as u64, 2)])
        }
        (DciFormat::Dl1_0, RntiType::C) if ra_grant => writer.write_all(&[
            format_ind,
            freq,
            (f.ra_preamble_index as u64, 6),
            (f.ul_sul_indicator as u64, 1),
            (f.ss_pbch_index as u64, 6),
            (f.prach_mask_index as u64, 4),
        ]),
        (DciFormat::Dl1_0, RntiType::C) => writer.write_all(&[
            format_ind,
            freq,
            tda,
            vrb,
            mcs,
            ndi,
            rv,
            harq,
            (f.dai as u64, 2),
            tpc,
            (f.pucch_resource_indicator as u64, 3),
            harq_timing,
        ]),
        (DciFormat::Dl1_0, RntiType::P) => writer.write_all(&[
            (f.short_messages_indicator as u64, 2),
            (f.short_messages as u64, 8),
            freq,
            tda,
            vrb,
            mcs,
            (f.tb_scaling as u64, 2),
        ]),
        (DciFormat::Dl1_0, RntiType::Si) => writer.write_all(&[freq, tda, vrb, mcs, rv]),
        (DciFormat::Dl1_0, RntiType::Tc) => writer.write_all(&[
            format_ind,
            freq,
            tda,
            vrb,
            mcs,
            ndi,
            rv,
            harq,
            (f.dai as u64, 2),
            tpc,
            harq_timing,
        ]),
        (DciFormat::Ul0_0, RntiType::C) | (DciFormat::Ul0_0, RntiType::Tc) => {
            writer.write_all(&[
                format_ind,
                freq,
                tda,
                (f.frequency_hopping_flag as u64, 1),
                mcs,
                ndi,
                rv,
                harq,
                tpc,
            ])?;
            while writer.len() < UL_0_0_MIN_BITS {
                writer.write(f.padding as u64, 1)?;
            }
            Ok(())
        }
        _ => Err(LayerError::UnsupportedDci(format!(
            "DCI format {} with {:?}-RNTI",
            format, rnti_type
        ))),
    }
}

/// Nominal payload size of a (format, RNTI type) pair for an `bwp_size` PRB BWP.
///
/// Format 1_0 with C-RNTI is sized by its scheduling branch; format 0_0
/// includes the padding to 32 bits.
pub fn dci_size(format: DciFormat, rnti_type: RntiType, bwp_size: u16) -> Result<u8, LayerError> {
    let mut writer = BitWriter::new();
    write_layout(
        &mut writer,
        format,
        rnti_type,
        &DciFields::default(),
        frequency_assignment_bits(bwp_size),
        false,
    )?;
    Ok(writer.len())
}

/// Encode one DCI for the BWP described by `config`
pub fn encode(config: &PdcchConfig, pdu: &DciPdu) -> Result<DciPayload, LayerError> {
    if pdu.payload_size_bits > MAX_DCI_BITS {
        return Err(LayerError::UnsupportedDci(format!(
            "Payload size {} bits exceeds {}",
            pdu.payload_size_bits, MAX_DCI_BITS
        )));
    }

    let freq_bits = frequency_assignment_bits(config.bwp_size);
    // Compared as written to the field, after masking to its width
    let ra_grant = pdu.format == DciFormat::Dl1_0
        && pdu.rnti_type == RntiType::C
        && (pdu.fields.frequency_domain_assignment as u64 & all_ones(freq_bits)) == all_ones(freq_bits);

    let mut writer = BitWriter::new();
    write_layout(&mut writer, pdu.format, pdu.rnti_type, &pdu.fields, freq_bits, ra_grant)?;

    match pdu.format {
        DciFormat::Dl1_0 => {
            let nominal = dci_size(pdu.format, pdu.rnti_type, config.bwp_size)?;
            if pdu.payload_size_bits != nominal {
                return Err(LayerError::Configuration(format!(
                    "DCI 1_0 {:?}-RNTI payload size {} bits, expected {} for {} PRB BWP",
                    pdu.rnti_type, pdu.payload_size_bits, nominal, config.bwp_size
                )));
            }
        }
        _ => {
            if pdu.payload_size_bits < writer.len() {
                return Err(LayerError::Configuration(format!(
                    "DCI {} {:?}-RNTI payload size {} bits below {} mandated bits for {} PRB BWP",
                    pdu.format,
                    pdu.rnti_type,
                    pdu.payload_size_bits,
                    writer.len(),
                    config.bwp_size
                )));
            }
        }
    }

    // Unwritten trailing bits stay zero
    let shift = (pdu.payload_size_bits - writer.len()) as u32;
    let value = writer.value.checked_shl(shift).unwrap_or(0);

    trace!(
        "DCI {} {:?}-RNTI: {} bits {:#x}{}",
        pdu.format,
        pdu.rnti_type,
        pdu.payload_size_bits,
        value,
        if ra_grant { " (RA grant)" } else { "" }
    );

    Ok(DciPayload { size_bits: pdu.payload_size_bits, value })
}

/// Encode every DCI of a PDCCH occasion; each needs its own scrambling id
pub fn encode_all(config: &PdcchConfig, pdus: &[DciPdu]) -> Result<Vec<DciPayload>, LayerError> {
    if pdus.len() > config.scrambling_ids.len() {
        return Err(LayerError::Configuration(format!(
            "{} DCIs for a PDCCH configured with {} scrambling ids",
            pdus.len(),
            config.scrambling_ids.len()
        )));
    }
    pdus.iter().map(|pdu| encode(config, pdu)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mac::pdcch_config::{CceRegMapping, CoresetType};
    use crate::rrc::PrecoderGranularity;
    use common::types::{CyclicPrefix, SubcarrierSpacing};

    fn config(bwp_size: u16) -> PdcchConfig {
        PdcchConfig {
            bwp_size,
            bwp_start: 0,
            subcarrier_spacing: SubcarrierSpacing::Scs30,
            cyclic_prefix: CyclicPrefix::Normal,
            duration_symbols: 1,
            frequency_domain_resources: [0xFF, 0xFF, 0, 0, 0, 0],
            cce_reg_mapping: CceRegMapping::NonInterleaved,
            precoder_granularity: PrecoderGranularity::SameAsRegBundle,
            scrambling_ids: vec![0; 4],
            start_symbol: 0,
            coreset_type: CoresetType::Dedicated,
        }
    }

    fn pdu(format: DciFormat, rnti_type: RntiType, bwp_size: u16, fields: DciFields) -> DciPdu {
        DciPdu {
            format,
            rnti_type,
            payload_size_bits: dci_size(format, rnti_type, bwp_size).unwrap(),
            fields,
        }
    }

    #[test]
    fn test_frequency_assignment_bits() {
        assert_eq!(frequency_assignment_bits(24), 9);
        assert_eq!(frequency_assignment_bits(48), 11);
        assert_eq!(frequency_assignment_bits(96), 13);
        assert_eq!(frequency_assignment_bits(106), 13);
        assert_eq!(frequency_assignment_bits(275), 16);
        assert_eq!(frequency_assignment_bits(1), 0);

        let widths: Vec<u8> = [24, 48, 96, 275].iter().map(|&n| frequency_assignment_bits(n)).collect();
        assert!(widths.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_sizes_at_106() {
        // 13-bit frequency assignment
        assert_eq!(dci_size(DciFormat::Dl1_0, RntiType::Ra, 106).unwrap(), 25);
        assert_eq!(dci_size(DciFormat::Dl1_0, RntiType::C, 106).unwrap(), 41);
        assert_eq!(dci_size(DciFormat::Dl1_0, RntiType::P, 106).unwrap(), 35);
        assert_eq!(dci_size(DciFormat::Dl1_0, RntiType::Si, 106).unwrap(), 25);
        assert_eq!(dci_size(DciFormat::Dl1_0, RntiType::Tc, 106).unwrap(), 38);
        assert_eq!(dci_size(DciFormat::Ul0_0, RntiType::C, 106).unwrap(), 33);
        assert_eq!(dci_size(DciFormat::Ul0_0, RntiType::Tc, 24).unwrap(), 32);
    }

    #[test]
    fn test_every_pair_fills_payload() {
        let cfg = config(106);
        let pairs = [
            (DciFormat::Dl1_0, RntiType::Ra),
            (DciFormat::Dl1_0, RntiType::C),
            (DciFormat::Dl1_0, RntiType::P),
            (DciFormat::Dl1_0, RntiType::Si),
            (DciFormat::Dl1_0, RntiType::Tc),
            (DciFormat::Ul0_0, RntiType::C),
            (DciFormat::Ul0_0, RntiType::Tc),
        ];
        for (format, rnti_type) in pairs {
            let p = pdu(format, rnti_type, 106, DciFields { format_indicator: 1, ..Default::default() });
            let payload = encode(&cfg, &p).unwrap();
            assert_eq!(payload.size_bits, p.payload_size_bits);
            assert!(payload.value < 1u64 << payload.size_bits);
        }
    }

    #[test]
    fn test_si_rnti_layout() {
        let fields = DciFields {
            frequency_domain_assignment: 0x1ABC,
            time_domain_assignment: 0x5,
            vrb_to_prb_mapping: 1,
            mcs: 0x13,
            rv: 0x2,
            ..Default::default()
        };
        let payload = encode(&config(106), &pdu(DciFormat::Dl1_0, RntiType::Si, 106, fields)).unwrap();
        let expected = (0x1ABC << 12) | (0x5 << 8) | (1 << 7) | (0x13 << 2) | 0x2;
        assert_eq!(payload.value, expected);
    }

    #[test]
    fn test_ra_grant_branch() {
        let cfg = config(106);
        let fields = DciFields {
            format_indicator: 1,
            frequency_domain_assignment: 0x1FFF,
            ra_preamble_index: 0x2A,
            ul_sul_indicator: 1,
            ss_pbch_index: 0x3F,
            prach_mask_index: 0x9,
            // Ignored in the RA branch
            mcs: 0x1F,
            harq_pid: 0xF,
            ..Default::default()
        };
        let payload = encode(&cfg, &pdu(DciFormat::Dl1_0, RntiType::C, 106, fields)).unwrap();
        assert_eq!(payload.size_bits, 41);
        // 1 + 13 + 6 + 1 + 6 + 4 = 31 bits, followed by 10 reserved zero bits
        let written: u64 = (1 << 30) | (0x1FFF << 17) | (0x2A << 11) | (1 << 10) | (0x3F << 4) | 0x9;
        assert_eq!(payload.value, written << 10);
    }

    #[test]
    fn test_ra_grant_branch_with_wide_assignment() {
        let fields = DciFields {
            format_indicator: 1,
            frequency_domain_assignment: 0xFFFF,
            ra_preamble_index: 0x2A,
            ..Default::default()
        };
        let payload = encode(&config(106), &pdu(DciFormat::Dl1_0, RntiType::C, 106, fields)).unwrap();
        // Field reads as all ones, so the preamble index follows it
        assert_eq!(payload.value >> 27, (1 << 13) | 0x1FFF);
        assert_eq!((payload.value >> 21) & 0x3F, 0x2A);
    }

    #[test]
    fn test_normal_branch_when_not_all_ones() {
        let cfg = config(106);
        let fields = DciFields {
            frequency_domain_assignment: 0x1FFE,
            pdsch_to_harq_feedback_timing: 0x7,
            ra_preamble_index: 0x3F,
            ..Default::default()
        };
        let payload = encode(&cfg, &pdu(DciFormat::Dl1_0, RntiType::C, 106, fields)).unwrap();
        // Format indicator 0, frequency assignment, then 27 bits ending in the HARQ timing
        assert_eq!(payload.value, (0x1FFE << 27) | 0x7);
    }

    #[test]
    fn test_ul_padding() {
        let cfg = config(24);
        let fields = DciFields { format_indicator: 0, padding: 1, ..Default::default() };
        let payload = encode(&cfg, &pdu(DciFormat::Ul0_0, RntiType::C, 24, fields)).unwrap();
        // 9-bit frequency assignment gives 29 field bits and 3 padding bits
        assert_eq!(payload.size_bits, 32);
        assert_eq!(payload.value, 0b111);
    }

    #[test]
    fn test_ul_larger_payload_zero_filled() {
        let cfg = config(24);
        let fields = DciFields { format_indicator: 1, ..Default::default() };
        let p = DciPdu { format: DciFormat::Ul0_0, rnti_type: RntiType::Tc, payload_size_bits: 40, fields };
        let payload = encode(&cfg, &p).unwrap();
        assert_eq!(payload.value, 1 << 39);
    }

    #[test]
    fn test_values_masked_to_width() {
        let fields = DciFields { mcs: 0xFF, ..Default::default() };
        let payload = encode(&config(106), &pdu(DciFormat::Dl1_0, RntiType::Si, 106, fields)).unwrap();
        assert_eq!(payload.value, 0x1F << 2);
    }

    #[test]
    fn test_size_mismatch() {
        let cfg = config(106);
        let mut p = pdu(DciFormat::Dl1_0, RntiType::Si, 106, DciFields::default());
        p.payload_size_bits += 1;
        assert!(matches!(encode(&cfg, &p), Err(LayerError::Configuration(_))));

        // Payload sized for a smaller BWP
        let p = pdu(DciFormat::Ul0_0, RntiType::C, 275, DciFields::default());
        assert!(encode(&config(275), &p).is_ok());
        let p = DciPdu { payload_size_bits: 32, ..p };
        assert!(encode(&config(275), &p).is_err());
    }

    #[test]
    fn test_unsupported() {
        let cfg = config(106);
        let p = DciPdu {
            format: DciFormat::Ul0_0,
            rnti_type: RntiType::Si,
            payload_size_bits: 32,
            fields: DciFields::default(),
        };
        assert!(matches!(encode(&cfg, &p), Err(LayerError::UnsupportedDci(_))));

        let p = DciPdu { format: DciFormat::Dl1_1, rnti_type: RntiType::C, ..p };
        assert!(matches!(encode(&cfg, &p), Err(LayerError::UnsupportedDci(_))));

        let p = DciPdu { format: DciFormat::Dl1_0, payload_size_bits: 65, ..p };
        assert!(matches!(encode(&cfg, &p), Err(LayerError::UnsupportedDci(_))));
    }

    #[test]
    fn test_payload_bytes() {
        let payload = DciPayload { size_bits: 12, value: 0xABC };
        assert_eq!(payload.to_be_array(), [0xAB, 0xC0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(payload.to_bytes().as_ref(), &[0xAB, 0xC0]);

        let empty = DciPayload { size_bits: 0, value: 0 };
        assert!(empty.to_bytes().is_empty());
    }

    #[test]
    fn test_encode_all() {
        let cfg = config(106);
        let pdus = vec![pdu(DciFormat::Dl1_0, RntiType::Si, 106, DciFields::default()); 4];
        assert_eq!(encode_all(&cfg, &pdus).unwrap().len(), 4);

        let pdus = vec![pdus[0].clone(); 5];
        assert!(encode_all(&cfg, &pdus).is_err());
    }

    #[test]
    fn test_parse_names() {
        assert_eq!("1_0".parse::<DciFormat>().unwrap(), DciFormat::Dl1_0);
        assert_eq!("TC".parse::<RntiType>().unwrap(), RntiType::Tc);
        assert!("2_0".parse::<DciFormat>().is_err());
        assert_eq!(DciFormat::Ul0_0.to_string(), "0_0");
    }
}
