//! UCI Scheduling Orchestrator
//!
//! Per-slot driver for SR opportunities and CSI occasions: consults each UE's
//! DRX state, reserves PUCCH resources and writes the resulting grants into
//! the slot's scheduling output.

use crate::mac::pucch::PucchResourceManager;
use crate::mac::scheduler::{CsiGrant, SlotSchedule, SrGrant};
use crate::mac::ue::UeRepository;
use common::slot::SlotPoint;
use common::types::CellId;
use tracing::{debug, trace};

/// Schedules the SR opportunities and CSI occasions of one cell
pub struct UciScheduler {
    cell_id: CellId,
}

impl UciScheduler {
    /// Create the UCI scheduler of a cell
    pub fn new(cell_id: CellId) -> Self {
        Self { cell_id }
    }

    /// Run one slot: place SR/CSI opportunities for every UE in DRX active
    /// time into `out`.
    ///
    /// A failed reservation for one UE is logged and skipped; it never aborts
    /// processing of the remaining UEs.
    pub fn run_slot(
        &mut self,
        slot: SlotPoint,
        ues: &UeRepository,
        res_mgr: &mut PucchResourceManager,
        out: &mut SlotSchedule,
    ) {
        for ue in ues.iter() {
            if !ue.drx.is_pdcch_enabled(slot) {
                trace!(
                    "cell={}: rnti={} outside DRX active time at slot {}",
                    self.cell_id.0,
                    ue.rnti,
                    slot
                );
                continue;
            }

            if is_opportunity_slot(slot, ue.uci_cfg.sr.period_slots, ue.uci_cfg.sr.offset) {
                match res_mgr.reserve_sr_res_available(slot, ue.rnti, &ue.pucch_cfg) {
                    Some(res) => out.sr_grants.push(SrGrant {
                        rnti: ue.rnti,
                        resource: res.clone(),
                    }),
                    None => debug!(
                        "cell={}: no SR resource available for rnti={} at slot {}",
                        self.cell_id.0, ue.rnti, slot
                    ),
                }
            }

            if let Some(csi) = &ue.uci_cfg.csi {
                if is_opportunity_slot(slot, csi.period_slots, csi.offset) {
                    match res_mgr.reserve_csi_resource(slot, ue.rnti, &ue.pucch_cfg) {
                        Some(res) => out.csi_grants.push(CsiGrant {
                            rnti: ue.rnti,
                            resource: res.clone(),
                        }),
                        None => debug!(
                            "cell={}: no CSI resource available for rnti={} at slot {}",
                            self.cell_id.0, ue.rnti, slot
                        ),
                    }
                }
            }
        }
    }
}

/// Whether `slot` is a reporting opportunity for the given periodicity and
/// offset
fn is_opportunity_slot(slot: SlotPoint, period_slots: u32, offset: u32) -> bool {
    slot.count() % period_slots == offset % period_slots
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mac::drx::{DrxConfig, DrxController};
    use crate::mac::pucch::default_pucch_config;
    use crate::mac::ue::{CsiConfig, SrConfig, UciConfig, UeContext};
    use common::types::{Rnti, SubcarrierSpacing};

    const SCS: SubcarrierSpacing = SubcarrierSpacing::Scs15;

    fn make_ue(rnti: u16, sr_offset: u32, csi: Option<CsiConfig>, drx: Option<&DrxConfig>) -> UeContext {
        let mut pucch_cfg = default_pucch_config(8, 8, 4, true);
        // Spread UEs over the SR resource pool the way the MAC layer does
        pucch_cfg.sr_res_id += (rnti % 4) as u16;
        UeContext::new(
            Rnti(rnti),
            pucch_cfg,
            UciConfig {
                sr: SrConfig {
                    period_slots: 40,
                    offset: sr_offset,
                },
                csi,
            },
            DrxController::new(SCS, 64, drx),
        )
    }

    fn run_one_slot(
        uci: &mut UciScheduler,
        ues: &mut UeRepository,
        res_mgr: &mut PucchResourceManager,
        slot: SlotPoint,
    ) -> SlotSchedule {
        res_mgr.slot_indication(slot);
        for ue in ues.iter_mut() {
            ue.drx.slot_indication(slot);
        }
        let mut out = SlotSchedule::new(slot);
        uci.run_slot(slot, ues, res_mgr, &mut out);
        out
    }

    #[test]
    fn test_sr_opportunity_periodicity() {
        let mut uci = UciScheduler::new(CellId(1));
        let mut res_mgr = PucchResourceManager::new();
        let mut ues = UeRepository::new();
        ues.add(make_ue(0x4601, 3, None, None)).unwrap();

        let mut slot = SlotPoint::new(SCS, 0, 0);
        let mut sr_slots = Vec::new();
        for _ in 0..80 {
            let out = run_one_slot(&mut uci, &mut ues, &mut res_mgr, slot);
            if !out.sr_grants.is_empty() {
                sr_slots.push(slot.count());
            }
            slot += 1;
        }
        assert_eq!(sr_slots, vec![3, 43]);
    }

    #[test]
    fn test_drx_gates_uci_scheduling() {
        let drx_cfg = DrxConfig {
            long_cycle_ms: 40,
            long_start_offset_ms: 0,
            on_duration_ms: 10,
            inactivity_ms: 0,
        };
        let mut uci = UciScheduler::new(CellId(1));
        let mut res_mgr = PucchResourceManager::new();
        let mut ues = UeRepository::new();
        // SR opportunity at slot 20 falls outside the [0, 10) on-duration
        ues.add(make_ue(0x4601, 20, None, Some(&drx_cfg))).unwrap();

        let mut slot = SlotPoint::new(SCS, 0, 0);
        for _ in 0..40 {
            let out = run_one_slot(&mut uci, &mut ues, &mut res_mgr, slot);
            assert!(out.sr_grants.is_empty());
            slot += 1;
        }

        // With the opportunity inside the window the grant is placed
        ues.remove(Rnti(0x4601));
        ues.add(make_ue(0x4602, 5, None, Some(&drx_cfg))).unwrap();
        let mut found = false;
        for _ in 0..40 {
            let out = run_one_slot(&mut uci, &mut ues, &mut res_mgr, slot);
            found |= !out.sr_grants.is_empty();
            slot += 1;
        }
        assert!(found);
    }

    #[test]
    fn test_failed_reservation_is_isolated() {
        let mut uci = UciScheduler::new(CellId(1));
        let mut res_mgr = PucchResourceManager::new();
        let mut ues = UeRepository::new();

        // Two UEs share the same SR resource and opportunity slot; a third
        // uses a different resource of the pool.
        let mut colliding = make_ue(0x4601, 0, None, None);
        colliding.pucch_cfg.sr_res_id = 8;
        ues.add(colliding).unwrap();
        let mut colliding2 = make_ue(0x4602, 0, None, None);
        colliding2.pucch_cfg.sr_res_id = 8;
        ues.add(colliding2).unwrap();
        let mut other = make_ue(0x4603, 0, None, None);
        other.pucch_cfg.sr_res_id = 9;
        ues.add(other).unwrap();

        let slot = SlotPoint::new(SCS, 0, 0);
        let out = run_one_slot(&mut uci, &mut ues, &mut res_mgr, slot);

        let granted: Vec<Rnti> = out.sr_grants.iter().map(|g| g.rnti).collect();
        assert_eq!(granted, vec![Rnti(0x4601), Rnti(0x4603)]);
    }

    #[test]
    fn test_csi_occasion_scheduling() {
        let mut uci = UciScheduler::new(CellId(1));
        let mut res_mgr = PucchResourceManager::new();
        let mut ues = UeRepository::new();
        let csi = CsiConfig {
            period_slots: 80,
            offset: 2,
        };
        ues.add(make_ue(0x4601, 0, Some(csi), None)).unwrap();

        let mut slot = SlotPoint::new(SCS, 0, 0);
        let mut csi_slots = Vec::new();
        for _ in 0..160 {
            let out = run_one_slot(&mut uci, &mut ues, &mut res_mgr, slot);
            if !out.csi_grants.is_empty() {
                csi_slots.push(slot.count());
            }
            slot += 1;
        }
        assert_eq!(csi_slots, vec![2, 82]);
    }
}
