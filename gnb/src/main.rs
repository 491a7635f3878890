//! Albor Space 5G GNodeB Main Application
//!
//! Entry point for the base station: sets up the MAC scheduler core and
//! drives it with a slot clock standing in for the PHY slot indications.

mod config;

use anyhow::Result;
use clap::Parser;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use common::slot::SlotPoint;
use common::types::{CellId, Pci, Rnti, SubcarrierSpacing};
use config::GnbConfig;
use layers::mac::{
    default_pucch_config, CsiConfig, DrxConfig, MacConfig, MacLayer, MacSlotInterface, SrConfig,
    UciConfig,
};
use layers::ProtocolLayer;

/// Albor Space 5G GNodeB
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to YAML configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Physical Cell ID (0-1007), overrides the config file
    #[arg(long)]
    pci: Option<u16>,

    /// Cell ID, overrides the config file
    #[arg(long)]
    cell_id: Option<u16>,

    /// Subcarrier spacing in kHz (15, 30, 60, 120, 240), overrides the config file
    #[arg(long)]
    scs_khz: Option<u32>,

    /// Number of simulated UEs, overrides the config file
    #[arg(long)]
    nof_ues: Option<u16>,
}

/// Counters filled by the slot clock and reported periodically
#[derive(Default)]
struct SlotStats {
    slots: AtomicU64,
    sr_grants: AtomicU64,
    csi_grants: AtomicU64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .init();

    info!("Starting Albor Space 5G GNodeB");

    // Load configuration, then apply CLI overrides
    let mut config = match &args.config {
        Some(path) => {
            info!("Configuration file: {}", path);
            GnbConfig::from_yaml_file(path)?
        }
        None => GnbConfig::default(),
    };
    if let Some(pci) = args.pci {
        config.cell_cfg.pci = pci;
    }
    if let Some(cell_id) = args.cell_id {
        config.cell_cfg.cell_id = cell_id;
    }
    if let Some(scs) = args.scs_khz {
        config.cell_cfg.common_scs = scs;
    }
    if let Some(nof_ues) = args.nof_ues {
        config.sim.nof_ues = nof_ues;
    }

    let pci = Pci::new(config.cell_cfg.pci)
        .ok_or_else(|| anyhow::anyhow!("Invalid PCI: {}", config.cell_cfg.pci))?;
    let cell_id = CellId(config.cell_cfg.cell_id);
    let scs = SubcarrierSpacing::from_khz(config.cell_cfg.common_scs).ok_or_else(|| {
        anyhow::anyhow!("Invalid subcarrier spacing: {} kHz", config.cell_cfg.common_scs)
    })?;

    info!("Cell configuration:");
    info!("  PCI: {}", pci.0);
    info!("  Cell ID: {}", cell_id.0);
    info!("  Subcarrier spacing: {} kHz", scs.as_khz());
    info!("  Slot duration: {} us", scs.slot_duration_us());
    info!("  Simulated UEs: {}", config.sim.nof_ues);

    // Create MAC configuration
    let mac_config = MacConfig {
        cell_id,
        pci,
        scs,
        max_ues: config.cell_cfg.max_ues,
        pucch_cfg: default_pucch_config(
            config.cell_cfg.pucch.nof_f1_res as usize,
            config.cell_cfg.pucch.nof_f2_res as usize,
            config.cell_cfg.pucch.nof_sr_res as usize,
            config.cell_cfg.pucch.with_csi,
        ),
        nof_sr_resources: config.cell_cfg.pucch.nof_sr_res,
        uci_cfg: UciConfig {
            sr: SrConfig {
                period_slots: config.cell_cfg.uci.sr_period_slots,
                offset: config.cell_cfg.uci.sr_offset,
            },
            csi: config.cell_cfg.pucch.with_csi.then(|| CsiConfig {
                period_slots: config.cell_cfg.uci.csi_period_slots,
                offset: config.cell_cfg.uci.csi_offset,
            }),
        },
        drx_cfg: config.cell_cfg.drx.as_ref().map(|drx| DrxConfig {
            long_cycle_ms: drx.long_cycle_ms,
            long_start_offset_ms: drx.long_start_offset_ms,
            on_duration_ms: drx.on_duration_ms,
            inactivity_ms: drx.inactivity_ms,
        }),
        conres_timer_ms: config.cell_cfg.conres_timer_ms,
    };

    // Initialize MAC layer
    let mut mac_layer = MacLayer::new(mac_config)?;
    mac_layer.initialize().await?;
    info!("MAC layer initialized");
    let mac_layer = Arc::new(mac_layer);

    // Attach the simulated UE population
    for i in 0..config.sim.nof_ues {
        let rnti = Rnti(config.sim.first_rnti + i);
        mac_layer.add_ue(rnti).await?;
    }
    info!("Attached {} simulated UEs", config.sim.nof_ues);

    let running = Arc::new(RwLock::new(true));
    let stats = Arc::new(SlotStats::default());

    info!("GNodeB initialized successfully");

    // Slot clock: stands in for the PHY, delivering one slot indication per
    // slot duration through the MAC slot interface
    let slot_handle = {
        let mac: Arc<dyn MacSlotInterface> = mac_layer.clone();
        let running = running.clone();
        let stats = stats.clone();
        tokio::spawn(async move {
            let mut interval =
                tokio::time::interval(tokio::time::Duration::from_micros(scs.slot_duration_us() as u64));
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Burst);
            let mut slot = SlotPoint::new(scs, 0, 0);

            while *running.read().await {
                interval.tick().await;

                match mac.on_slot_indication(slot).await {
                    Ok(schedule) => {
                        stats.slots.fetch_add(1, Ordering::Relaxed);
                        stats
                            .sr_grants
                            .fetch_add(schedule.sr_grants.len() as u64, Ordering::Relaxed);
                        stats
                            .csi_grants
                            .fetch_add(schedule.csi_grants.len() as u64, Ordering::Relaxed);
                    }
                    Err(e) => {
                        error!("Slot processing error at {}: {}", slot, e);
                        break;
                    }
                }
                slot += 1;
            }
        })
    };

    // Periodic statistics reporting
    let stats_handle = {
        let running = running.clone();
        let stats = stats.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(tokio::time::Duration::from_secs(5));

            while *running.read().await {
                interval.tick().await;

                info!("Scheduler statistics:");
                info!("  Slots processed: {}", stats.slots.load(Ordering::Relaxed));
                info!("  SR grants: {}", stats.sr_grants.load(Ordering::Relaxed));
                info!("  CSI grants: {}", stats.csi_grants.load(Ordering::Relaxed));
            }
        })
    };

    // Wait for shutdown signal
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
        }
        _ = slot_handle => {
            warn!("Slot clock stopped unexpectedly");
        }
    }

    // Shutdown
    info!("Shutting down GNodeB");
    *running.write().await = false;

    let _ = tokio::time::timeout(tokio::time::Duration::from_secs(5), stats_handle).await;

    info!("GNodeB shutdown complete");
    Ok(())
}
