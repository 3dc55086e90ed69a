//! Albor Space 5G GNodeB PDCCH tool
//!
//! Resolves the control channel configuration of a cell and encodes DCI
//! payloads from a cell configuration file.

mod config;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::path::PathBuf;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use common::sliv::decode_sliv;
use common::utils::{bytes_to_hex, unpack_bits};
use layers::mac::search_space::{candidates_per_slot, MonitoringOccasion};
use layers::mac::time_alloc::{dmrs_symbol_mask, lookup};
use layers::mac::{
    dci_size, ControlChannel, DciFields, DciFormat, DciPdu, MacPdcchContext, RntiType, SsbPosition,
};
use layers::rrc::SearchSpaceKind;

use config::GnbConfig;

/// Albor Space 5G GNodeB PDCCH tool
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file (.yml, .yaml or .toml)
    #[arg(short, long, default_value = "gnb_pdcch.yml")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long)]
    log_level: Option<String>,

    /// Print results as JSON on stdout
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Resolve CORESET#0 and the Type0-PDCCH search space
    Coreset0 {
        #[arg(long, default_value_t = 0)]
        ssb_index: u8,
        /// SFN of the SS/PBCH block
        #[arg(long, default_value_t = 0)]
        sfn: u16,
        #[arg(long, default_value_t = 0)]
        ssb_slot: u16,
    },
    /// Build the dedicated PDCCH configuration of the configured BWP
    Pdcch {
        /// Use the UE-specific instead of the common search space
        #[arg(long)]
        ue_specific: bool,
    },
    /// Encode a DCI payload
    Dci {
        /// DCI format (0_0, 1_0)
        #[arg(long, default_value = "1_0")]
        format: DciFormat,
        /// RNTI type (ra, c, p, si, tc)
        #[arg(long, default_value = "si")]
        rnti_type: RntiType,
        #[arg(long, value_enum, default_value_t = Channel::Coreset0)]
        channel: Channel,
        /// Payload size in bits, the nominal size when absent
        #[arg(long)]
        payload_size: Option<u8>,
        /// Field values as JSON, e.g. '{"mcs": 9, "time_domain_assignment": 1}'
        #[arg(long, default_value = "{}")]
        fields: String,
    },
    /// Decode a start and length indicator value
    Sliv { value: u8 },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum Channel {
    Coreset0,
    Common,
    UeSpecific,
}

impl From<Channel> for ControlChannel {
    fn from(channel: Channel) -> Self {
        match channel {
            Channel::Coreset0 => ControlChannel::Coreset0,
            Channel::Common => ControlChannel::Dedicated(SearchSpaceKind::Common),
            Channel::UeSpecific => ControlChannel::Dedicated(SearchSpaceKind::UeSpecific),
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn load_context(config: &GnbConfig) -> Result<MacPdcchContext> {
    let cell = config.serving_cell()?;
    let mib = config.mib()?;

    info!("Cell configuration:");
    info!("  PCI: {}", cell.physical_cell_id);
    info!("  Band: {} ({:?})", cell.band, cell.frequency_range);
    info!("  Carrier: {} RBs", cell.carrier_rbs);
    info!("  Subcarrier spacing: {} kHz", cell.ssb_subcarrier_spacing.khz());
    info!("  pdcch-ConfigSIB1: {:#04x}", mib.pdcch_config_sib1);

    Ok(MacPdcchContext::new(
        cell,
        mib,
        config.cell_cfg.bwp.clone(),
        config.cell_cfg.pdcch.dedicated.num_dci,
    ))
}

fn run_coreset0(config: &GnbConfig, json: bool, ssb: SsbPosition) -> Result<()> {
    let mut ctx = load_context(config)?;
    ctx.set_bwp(None);
    ctx.rebuild(ssb)?;

    let occasion = ctx
        .occasion()
        .ok_or_else(|| anyhow!("Type0-PDCCH occasion not resolved"))?;
    if json {
        return print_json(occasion);
    }

    let coreset0 = &occasion.coreset0;
    let ss0 = &occasion.search_space0;
    info!("CORESET#0:");
    info!("  Multiplexing: {:?}", coreset0.mux_pattern);
    info!("  RBs: {}, symbols: {}, offset: {}", coreset0.num_rbs, coreset0.num_symbols, coreset0.rb_offset);
    info!("Search space #0:");
    info!("  First slot: {} in frames with SFN parity {}", ss0.first_slot, ss0.frame_parity);
    info!("  First symbol: {}", ss0.first_symbol);
    info!("  Slots per period: {}, sets per slot: {}", ss0.slots_per_monitoring_period, ss0.sets_per_slot);
    Ok(())
}

fn run_pdcch(config: &GnbConfig, json: bool, ue_specific: bool) -> Result<()> {
    let bwp = config
        .cell_cfg
        .bwp
        .as_ref()
        .ok_or_else(|| anyhow!("No dedicated BWP configured"))?;
    let mut ctx = load_context(config)?;
    ctx.rebuild(SsbPosition::default())?;

    let kind = if ue_specific { SearchSpaceKind::UeSpecific } else { SearchSpaceKind::Common };
    let pdcch = ctx.pdcch_config(ControlChannel::Dedicated(kind))?;
    if json {
        return print_json(pdcch);
    }

    info!("PDCCH ({:?} search space):", kind);
    info!("  BWP: {} PRBs from PRB {}", pdcch.bwp_size, pdcch.bwp_start);
    info!("  CORESET: {} RBs, {} symbols from symbol {}", pdcch.coreset_rbs(), pdcch.duration_symbols, pdcch.start_symbol);
    info!("  Frequency domain resources: {}", bytes_to_hex(&pdcch.frequency_domain_resources));
    info!("  CCE-REG mapping: {:?}", pdcch.cce_reg_mapping);
    info!("  Scrambling ids: {:?}", pdcch.scrambling_ids);

    let slots_per_frame = bwp.subcarrier_spacing.slots_per_frame();
    for ss in bwp.search_spaces.iter().flatten() {
        let occasion = MonitoringOccasion::from_search_space(ss)?;
        let candidates = candidates_per_slot(ss.nrof_candidates, bwp.subcarrier_spacing)?;
        let monitored = (0..slots_per_frame)
            .filter(|&slot| occasion.is_monitoring_occasion(0, slot, slots_per_frame))
            .count();
        info!(
            "  Search space {}: every {:?} offset {}, {} slots per frame, candidates {:?}",
            ss.id,
            occasion.periodicity(),
            occasion.offset(),
            monitored,
            candidates
        );
    }

    let dmrs_position = config.cell_cfg.dmrs_type_a_position;
    for index in 0..bwp.pdsch_time_allocations.len() {
        let allocation = lookup(&bwp.pdsch_time_allocations, index as u8)?;
        let dmrs = dmrs_symbol_mask(dmrs_position, 0, allocation.start_symbol + allocation.num_symbols);
        match dmrs {
            Ok(mask) => info!(
                "  PDSCH allocation {}: K0 {} {:?} symbols {}..{} DM-RS {:#06x}",
                index,
                allocation.k0,
                allocation.mapping_type,
                allocation.start_symbol,
                allocation.start_symbol + allocation.num_symbols,
                mask
            ),
            Err(e) => warn!("  PDSCH allocation {}: {}", index, e),
        }
    }
    Ok(())
}

struct DciRequest {
    format: DciFormat,
    rnti_type: RntiType,
    channel: Channel,
    payload_size: Option<u8>,
    fields: String,
}

fn run_dci(config: &GnbConfig, json: bool, request: DciRequest) -> Result<()> {
    let fields: DciFields = serde_json::from_str(&request.fields)?;
    let mut ctx = load_context(config)?;
    ctx.rebuild(SsbPosition::default())?;

    let channel = ControlChannel::from(request.channel);
    let bwp_size = ctx.pdcch_config(channel)?.bwp_size;
    let payload_size_bits = match request.payload_size {
        Some(size) => size,
        None => dci_size(request.format, request.rnti_type, bwp_size)?,
    };

    let pdu = DciPdu {
        format: request.format,
        rnti_type: request.rnti_type,
        payload_size_bits,
        fields,
    };
    let payloads = ctx.encode(channel, std::slice::from_ref(&pdu))?;
    let payload = payloads
        .first()
        .ok_or_else(|| anyhow!("No DCI payload produced"))?;

    if json {
        return print_json(payload);
    }
    info!(
        "DCI {} {:?}-RNTI on {} PRB BWP: {} bits, {}",
        request.format,
        request.rnti_type,
        bwp_size,
        payload.size_bits,
        bytes_to_hex(&payload.to_bytes())
    );
    let bits: String = unpack_bits(&payload.to_bytes())
        .iter()
        .take(payload.size_bits as usize)
        .map(|&bit| if bit { '1' } else { '0' })
        .collect();
    debug!("DCI bits: {}", bits);
    Ok(())
}

fn run_sliv(json: bool, value: u8) -> Result<()> {
    let (start, length) = decode_sliv(value);
    if json {
        return print_json(&serde_json::json!({ "sliv": value, "start": start, "length": length }));
    }
    info!("SLIV {}: start symbol {}, length {}", value, start, length);
    Ok(())
}

fn run(args: Args, config: Option<GnbConfig>) -> Result<()> {
    let config = || config.as_ref().ok_or_else(|| anyhow!("Configuration file required"));

    match args.command {
        Command::Coreset0 { ssb_index, sfn, ssb_slot } => {
            run_coreset0(config()?, args.json, SsbPosition { ssb_index, sfn, slot: ssb_slot })
        }
        Command::Pdcch { ue_specific } => run_pdcch(config()?, args.json, ue_specific),
        Command::Dci { format, rnti_type, channel, payload_size, fields } => run_dci(
            config()?,
            args.json,
            DciRequest { format, rnti_type, channel, payload_size, fields },
        ),
        Command::Sliv { value } => run_sliv(args.json, value),
    }
}

fn main() {
    let args = Args::parse();

    // SLIV decoding needs no cell
    let config = match args.command {
        Command::Sliv { .. } => Ok(None),
        _ => GnbConfig::from_file(&args.config).map(Some),
    };

    let log_level = args
        .log_level
        .clone()
        .or_else(|| config.as_ref().ok().and_then(|c| c.as_ref()).map(|c| c.log.level.clone()))
        .unwrap_or_else(|| "info".to_string());

    // Initialize logging
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&log_level));

    fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_line_number(true)
        .with_writer(std::io::stderr)
        .init();

    info!("Starting Albor Space 5G GNodeB PDCCH tool");

    let result = config.and_then(|config| {
        if config.is_some() {
            info!("Configuration file: {}", args.config.display());
        }
        run(args, config)
    });

    if let Err(e) = result {
        error!("{:#}", e);
        std::process::exit(1);
    }
}
