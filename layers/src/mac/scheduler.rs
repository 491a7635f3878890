//! Cell Scheduler
//!
//! Per-cell, per-slot scheduling driver. Owns the PUCCH resource ledger, the
//! UCI orchestrator and the attached UE contexts; one instance per cell,
//! driven from that cell's scheduling thread.

use crate::mac::pucch::{PucchFormat, PucchResource, PucchResourceManager};
use crate::mac::uci::UciScheduler;
use crate::mac::ue::{UeContext, UeRepository};
use crate::LayerError;
use common::slot::SlotPoint;
use common::types::{CellId, Rnti, SubcarrierSpacing};
use tracing::{debug, trace};

/// A scheduled SR opportunity
#[derive(Debug, Clone, PartialEq)]
pub struct SrGrant {
    /// UE the opportunity belongs to
    pub rnti: Rnti,
    /// PUCCH resource the UE transmits on
    pub resource: PucchResource,
}

/// A scheduled CSI report occasion
#[derive(Debug, Clone, PartialEq)]
pub struct CsiGrant {
    /// UE the occasion belongs to
    pub rnti: Rnti,
    /// PUCCH resource the UE transmits on
    pub resource: PucchResource,
}

/// A HARQ-ACK feedback allocation
#[derive(Debug, Clone, PartialEq)]
pub struct HarqGrant {
    /// UE the feedback belongs to
    pub rnti: Rnti,
    /// PUCCH resource the UE transmits on
    pub resource: PucchResource,
    /// Resource indicator signalled in the DCI
    pub res_indicator: u8,
}

/// Scheduling output of one slot, consumed by the downstream PDU builder
#[derive(Debug, Clone)]
pub struct SlotSchedule {
    /// Slot this schedule applies to
    pub slot: SlotPoint,
    /// SR opportunities placed in this slot
    pub sr_grants: Vec<SrGrant>,
    /// CSI occasions placed in this slot
    pub csi_grants: Vec<CsiGrant>,
    /// HARQ-ACK allocations placed in this slot
    pub harq_grants: Vec<HarqGrant>,
}

impl SlotSchedule {
    /// Create an empty schedule for a slot
    pub fn new(slot: SlotPoint) -> Self {
        Self {
            slot,
            sr_grants: Vec::new(),
            csi_grants: Vec::new(),
            harq_grants: Vec::new(),
        }
    }
}

/// Per-cell scheduler
pub struct CellScheduler {
    cell_id: CellId,
    scs: SubcarrierSpacing,
    max_ues: usize,
    res_mgr: PucchResourceManager,
    uci: UciScheduler,
    ues: UeRepository,
    current_slot: Option<SlotPoint>,
}

impl CellScheduler {
    /// Create the scheduler of a cell
    pub fn new(cell_id: CellId, scs: SubcarrierSpacing, max_ues: usize) -> Self {
        Self {
            cell_id,
            scs,
            max_ues,
            res_mgr: PucchResourceManager::new(),
            uci: UciScheduler::new(cell_id),
            ues: UeRepository::new(),
            current_slot: None,
        }
    }

    /// Subcarrier spacing of the cell
    pub fn scs(&self) -> SubcarrierSpacing {
        self.scs
    }

    /// Number of attached UEs
    pub fn nof_ues(&self) -> usize {
        self.ues.len()
    }

    /// Attach a UE to the cell
    pub fn add_ue(&mut self, ue: UeContext) -> Result<(), LayerError> {
        if self.ues.len() >= self.max_ues {
            return Err(LayerError::ResourceUnavailable);
        }
        let rnti = ue.rnti;
        self.ues.add(ue)?;
        debug!("cell={}: attached UE rnti={}", self.cell_id.0, rnti);
        Ok(())
    }

    /// Detach a UE from the cell; returns whether it was present
    pub fn rem_ue(&mut self, rnti: Rnti) -> bool {
        let removed = self.ues.remove(rnti);
        if removed {
            debug!("cell={}: detached UE rnti={}", self.cell_id.0, rnti);
        }
        removed
    }

    /// Process one slot.
    ///
    /// Must be called exactly once per slot with strictly consecutive slot
    /// points; the resource ledger asserts this. Fans the indication out to
    /// the ledger and every UE's DRX controller, then runs the UCI
    /// orchestrator.
    pub fn run_slot(&mut self, slot: SlotPoint) -> SlotSchedule {
        self.current_slot = Some(slot);
        self.res_mgr.slot_indication(slot);
        for ue in self.ues.iter_mut() {
            ue.drx.slot_indication(slot);
        }

        let mut schedule = SlotSchedule::new(slot);
        self.uci
            .run_slot(slot, &self.ues, &mut self.res_mgr, &mut schedule);

        trace!(
            "cell={}: slot {} scheduled {} SR, {} CSI",
            self.cell_id.0,
            slot,
            schedule.sr_grants.len(),
            schedule.csi_grants.len()
        );
        schedule
    }

    /// Reserve the HARQ-ACK feedback resource for a downlink allocation.
    ///
    /// The format follows the UCI payload: up to 2 bits ride on Format 1,
    /// anything larger on Format 2. Returns `None` when the UE is unknown or
    /// the format group is exhausted at `slot_harq`.
    pub fn alloc_harq_uci(&mut self, slot_harq: SlotPoint, rnti: Rnti, uci_bits: u8) -> Option<HarqGrant> {
        let ue = self.ues.get(rnti)?;
        let format = if uci_bits <= 2 {
            PucchFormat::Format1
        } else {
            PucchFormat::Format2
        };
        let alloc = match format {
            PucchFormat::Format1 => {
                self.res_mgr
                    .reserve_next_f1_harq_res_available(slot_harq, rnti, &ue.pucch_cfg)
            }
            PucchFormat::Format2 => {
                self.res_mgr
                    .reserve_next_f2_harq_res_available(slot_harq, rnti, &ue.pucch_cfg)
            }
        };
        let Some(alloc) = alloc else {
            debug!(
                "cell={}: PUCCH {:?} group exhausted for rnti={} at slot {}",
                self.cell_id.0, format, rnti, slot_harq
            );
            return None;
        };
        Some(HarqGrant {
            rnti,
            resource: alloc.pucch_res.clone(),
            res_indicator: alloc.pucch_res_indicator,
        })
    }

    /// Release a UE's HARQ-ACK resource at a slot, e.g. on acknowledgment or
    /// supersession. Returns whether an allocation was found; a miss after
    /// ring recycling is expected.
    pub fn release_harq_uci(&mut self, slot_harq: SlotPoint, rnti: Rnti) -> bool {
        let Some(ue) = self.ues.get(rnti) else {
            return false;
        };
        self.res_mgr
            .release_harq_f1_resource(slot_harq, rnti, &ue.pucch_cfg)
            || self
                .res_mgr
                .release_harq_f2_resource(slot_harq, rnti, &ue.pucch_cfg)
    }

    /// Notify a new downlink PDCCH allocation for a UE; restarts its DRX
    /// inactivity timer from the current slot.
    pub fn on_dl_alloc(&mut self, rnti: Rnti) {
        let Some(slot) = self.current_slot else {
            return;
        };
        if let Some(ue) = self.ues.get_mut(rnti) {
            ue.drx.on_new_pdcch_alloc(slot);
        }
    }

    /// Notify the start of contention resolution for a UE; keeps it in DRX
    /// active time until the timer expires.
    pub fn on_con_res_start(&mut self, rnti: Rnti) {
        if let Some(ue) = self.ues.get_mut(rnti) {
            ue.drx.on_con_res_start();
        }
    }
}
