//! Medium Access Control (MAC) Layer Implementation
//!
//! Implements the 5G NR MAC scheduler core according to 3GPP TS 38.321 and
//! TS 38.213: per-cell PUCCH resource management, DRX active-time tracking
//! and UCI scheduling.

pub mod drx;
pub mod pucch;
pub mod scheduler;
pub mod uci;
pub mod ue;

use crate::{LayerError, ProtocolLayer};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

pub use drx::{DrxConfig, DrxController};
pub use pucch::{
    default_pucch_config, PucchConfig, PucchFormat, PucchFormatParams, PucchHarqGrant,
    PucchResource, PucchResourceManager, MAX_SR_PUCCH_RESOURCES,
};
pub use scheduler::{CellScheduler, CsiGrant, HarqGrant, SlotSchedule, SrGrant};
pub use uci::UciScheduler;
pub use ue::{CsiConfig, SrConfig, UciConfig, UeContext, UeRepository};

use common::slot::SlotPoint;
use common::types::{CellId, Pci, Rnti, SubcarrierSpacing};

/// MAC layer configuration
#[derive(Debug, Clone)]
pub struct MacConfig {
    /// Cell ID
    pub cell_id: CellId,
    /// Physical cell ID
    pub pci: Pci,
    /// Subcarrier spacing
    pub scs: SubcarrierSpacing,
    /// Maximum number of UEs
    pub max_ues: u16,
    /// Cell PUCCH resource plan; `sr_res_id` names the first resource of the
    /// SR group
    pub pucch_cfg: PucchConfig,
    /// Number of SR resources in the cell SR group; per-UE configs rotate
    /// over them
    pub nof_sr_resources: u8,
    /// UCI reporting periodicities; per-UE offsets are staggered from these
    pub uci_cfg: UciConfig,
    /// DRX configuration applied to attached UEs, if any
    pub drx_cfg: Option<DrxConfig>,
    /// Contention resolution timer in milliseconds
    pub conres_timer_ms: u32,
}

/// MAC-facing slot interface: the PHY (or a slot clock standing in for it)
/// delivers slot indications through this seam.
#[async_trait]
pub trait MacSlotInterface: Send + Sync {
    /// Process one slot and return its scheduling output
    async fn on_slot_indication(&self, slot: SlotPoint) -> Result<SlotSchedule, LayerError>;
}

/// MAC layer: configuration validation, lifecycle and serialized access to
/// the per-cell scheduler
pub struct MacLayer {
    config: MacConfig,
    scheduler: Arc<Mutex<CellScheduler>>,
    initialized: bool,
}

impl MacLayer {
    /// Create a new MAC layer instance. Validates the PUCCH resource plan
    /// and the UCI/DRX parameters.
    pub fn new(config: MacConfig) -> Result<Self, LayerError> {
        validate_config(&config)?;
        let scheduler = CellScheduler::new(config.cell_id, config.scs, config.max_ues as usize);
        Ok(Self {
            config,
            scheduler: Arc::new(Mutex::new(scheduler)),
            initialized: false,
        })
    }

    /// Attach a UE, deriving its PUCCH view and UCI offsets from the cell
    /// configuration
    pub async fn add_ue(&self, rnti: Rnti) -> Result<(), LayerError> {
        if !self.initialized {
            return Err(LayerError::NotInitialized);
        }
        let mut sched = self.scheduler.lock().await;
        let ue = self.build_ue_context(rnti, sched.nof_ues());
        sched.add_ue(ue)
    }

    /// Detach a UE; returns whether it was present
    pub async fn rem_ue(&self, rnti: Rnti) -> bool {
        self.scheduler.lock().await.rem_ue(rnti)
    }

    /// Number of attached UEs
    pub async fn nof_ues(&self) -> usize {
        self.scheduler.lock().await.nof_ues()
    }

    /// Access the scheduler for the cell's scheduling thread
    pub fn scheduler(&self) -> Arc<Mutex<CellScheduler>> {
        self.scheduler.clone()
    }

    fn build_ue_context(&self, rnti: Rnti, ue_index: usize) -> UeContext {
        let cfg = &self.config;

        // Rotate the SR resource and stagger the reporting offsets over the
        // UE population so simultaneous opportunities stay rare.
        let mut pucch_cfg = cfg.pucch_cfg.clone();
        pucch_cfg.sr_res_id += (ue_index % cfg.nof_sr_resources as usize) as u16;

        let sr = SrConfig {
            period_slots: cfg.uci_cfg.sr.period_slots,
            offset: (cfg.uci_cfg.sr.offset + ue_index as u32) % cfg.uci_cfg.sr.period_slots,
        };
        let csi = cfg.uci_cfg.csi.as_ref().map(|csi| CsiConfig {
            period_slots: csi.period_slots,
            offset: (csi.offset + ue_index as u32) % csi.period_slots,
        });

        let drx = DrxController::new(cfg.scs, cfg.conres_timer_ms, cfg.drx_cfg.as_ref());
        UeContext::new(rnti, pucch_cfg, UciConfig { sr, csi }, drx)
    }
}

#[async_trait]
impl ProtocolLayer for MacLayer {
    async fn initialize(&mut self) -> Result<(), LayerError> {
        info!("Initializing MAC layer");
        debug!(
            "MAC config: cell_id={}, pci={}, scs={:?}, max_ues={}",
            self.config.cell_id.0, self.config.pci.0, self.config.scs, self.config.max_ues
        );
        self.initialized = true;
        info!("MAC layer initialized successfully");
        Ok(())
    }

    async fn shutdown(&mut self) -> Result<(), LayerError> {
        info!("Shutting down MAC layer");
        self.initialized = false;
        Ok(())
    }
}

#[async_trait]
impl MacSlotInterface for MacLayer {
    async fn on_slot_indication(&self, slot: SlotPoint) -> Result<SlotSchedule, LayerError> {
        if !self.initialized {
            return Err(LayerError::NotInitialized);
        }
        let mut sched = self.scheduler.lock().await;
        Ok(sched.run_slot(slot))
    }
}

fn validate_config(config: &MacConfig) -> Result<(), LayerError> {
    let pucch = &config.pucch_cfg;

    for (name, ids) in [
        ("F1 HARQ", &pucch.f1_harq_res_ids),
        ("F2 HARQ", &pucch.f2_harq_res_ids),
    ] {
        if ids.is_empty() {
            return Err(LayerError::InvalidConfiguration(format!(
                "{} resource group is empty",
                name
            )));
        }
        for w in ids.windows(2) {
            if w[1] != w[0] + 1 {
                return Err(LayerError::InvalidConfiguration(format!(
                    "{} resource ids are not contiguous: {} -> {}",
                    name, w[0], w[1]
                )));
            }
        }
        for &id in ids.iter() {
            if pucch.resource(id).is_none() {
                return Err(LayerError::InvalidConfiguration(format!(
                    "{} resource id {} missing from the resource list",
                    name, id
                )));
            }
        }
    }

    if config.nof_sr_resources == 0
        || config.nof_sr_resources as usize > MAX_SR_PUCCH_RESOURCES
    {
        return Err(LayerError::InvalidConfiguration(format!(
            "invalid SR resource count: {}",
            config.nof_sr_resources
        )));
    }
    for i in 0..config.nof_sr_resources as u16 {
        if pucch.resource(pucch.sr_res_id + i).is_none() {
            return Err(LayerError::InvalidConfiguration(format!(
                "SR resource id {} missing from the resource list",
                pucch.sr_res_id + i
            )));
        }
    }

    if let Some(csi_res_id) = pucch.csi_res_id {
        if pucch.resource(csi_res_id).is_none() {
            return Err(LayerError::InvalidConfiguration(format!(
                "CSI resource id {} missing from the resource list",
                csi_res_id
            )));
        }
    }

    if config.uci_cfg.sr.period_slots == 0 {
        return Err(LayerError::InvalidConfiguration(
            "SR periodicity must be nonzero".into(),
        ));
    }
    if let Some(csi) = &config.uci_cfg.csi {
        if csi.period_slots == 0 {
            return Err(LayerError::InvalidConfiguration(
                "CSI periodicity must be nonzero".into(),
            ));
        }
    }

    if let Some(drx) = &config.drx_cfg {
        if drx.long_cycle_ms == 0
            || drx.on_duration_ms > drx.long_cycle_ms
            || drx.long_start_offset_ms >= drx.long_cycle_ms
        {
            return Err(LayerError::InvalidConfiguration(format!(
                "inconsistent DRX configuration: cycle={}ms, on-duration={}ms, offset={}ms",
                drx.long_cycle_ms, drx.on_duration_ms, drx.long_start_offset_ms
            )));
        }
    }

    Ok(())
}

/// Default MAC configuration for a cell
pub fn default_mac_config(cell_id: CellId, pci: Pci, scs: SubcarrierSpacing) -> MacConfig {
    MacConfig {
        cell_id,
        pci,
        scs,
        max_ues: 32,
        pucch_cfg: default_pucch_config(8, 8, 4, true),
        nof_sr_resources: 4,
        uci_cfg: UciConfig {
            sr: SrConfig {
                period_slots: 40,
                offset: 0,
            },
            csi: Some(CsiConfig {
                period_slots: 80,
                offset: 1,
            }),
        },
        drx_cfg: None,
        conres_timer_ms: 64,
    }
}
