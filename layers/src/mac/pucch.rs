//! PUCCH Resource Manager
//!
//! Manages the cell-wide allocation of PUCCH resources across UEs, slot by
//! slot, over a fixed-size ring of per-slot occupancy records.
//!
//! Assumptions, mirroring the cell resource plan:
//! (i)   each UE has at most 8 PUCCH F1 and 8 PUCCH F2 resources dedicated to
//!       HARQ-ACK reporting;
//! (ii)  the cell list has at most `MAX_SR_PUCCH_RESOURCES` PUCCH F1 resources
//!       dedicated to SR, each UE being assigned exactly one of them;
//! (iii) the cell list has at most 1 PUCCH F2 resource dedicated to CSI,
//!       shared by all UEs;
//! (iv)  resource ids within the F1 HARQ group and within the F2 HARQ group
//!       are contiguous, but the two groups need not be adjacent.

use common::slot::SlotPoint;
use common::types::Rnti;
use common::utils::next_power_of_2;
use serde::{Deserialize, Serialize};

/// Maximum PDCCH-to-PDSCH delay (k0) handled by the scheduler, in slots
pub const SCHEDULER_MAX_K0: u32 = 15;
/// Maximum PDSCH-to-HARQ-ACK delay (k1) handled by the scheduler, in slots
pub const SCHEDULER_MAX_K1: u32 = 15;

/// Number of dedicated PUCCH resources (all formats) trackable per slot.
/// Keeps a 1-to-1 match between resource indicator and position of the
/// resource in its resource set.
pub const MAX_PUCCH_RESOURCES: usize = 128;

/// Number of possible r_PUCCH values, as per Section 9.2.1, TS 38.213
pub const MAX_COMMON_PUCCH_RESOURCES: usize = 16;

/// Maximum number of cell PUCCH resources dedicated to SR
pub const MAX_SR_PUCCH_RESOURCES: usize = 4;

/// Size of the allocation ring buffer. Bounds how far in advance a PUCCH can
/// be reserved; must cover the maximum forward scheduling horizon.
const RES_MANAGER_RING_BUFFER_SIZE: usize =
    next_power_of_2(SCHEDULER_MAX_K0 + SCHEDULER_MAX_K1) as usize;

/// PUCCH format of a configured resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PucchFormat {
    /// Format 1: up to 2 UCI bits, sequence based
    Format1,
    /// Format 2: more than 2 UCI bits
    Format2,
}

/// Format-specific parameters of a configured resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PucchFormatParams {
    /// Format 1 parameters
    Format1 {
        /// Initial cyclic shift, 0-11
        initial_cyclic_shift: u8,
        /// Orthogonal cover code index
        time_domain_occ: u8,
    },
    /// Format 2 parameters
    Format2 {
        /// Number of PRBs occupied by the resource
        nof_prbs: u8,
    },
}

/// A configured PUCCH resource, as signalled to the UE via RRC
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PucchResource {
    /// pucch-ResourceId, unique within the cell resource list
    pub res_id: u16,
    /// First PRB of the resource
    pub starting_prb: u16,
    /// First OFDM symbol within the slot
    pub start_symbol: u8,
    /// Number of OFDM symbols
    pub nof_symbols: u8,
    /// Format-specific parameters
    pub format_params: PucchFormatParams,
}

impl PucchResource {
    /// PUCCH format of this resource
    pub fn format(&self) -> PucchFormat {
        match self.format_params {
            PucchFormatParams::Format1 { .. } => PucchFormat::Format1,
            PucchFormatParams::Format2 { .. } => PucchFormat::Format2,
        }
    }
}

/// A UE's view of the cell PUCCH resource plan.
///
/// Supplied per call as an immutable snapshot; the resource manager never
/// retains it beyond the call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PucchConfig {
    /// All configured PUCCH resources of the cell
    pub pucch_res_list: Vec<PucchResource>,
    /// Resource ids of PUCCH resource set 0 (F1, HARQ-ACK); contiguous
    pub f1_harq_res_ids: Vec<u16>,
    /// Resource ids of PUCCH resource set 1 (F2, HARQ-ACK); contiguous
    pub f2_harq_res_ids: Vec<u16>,
    /// The SR resource assigned to this UE
    pub sr_res_id: u16,
    /// The cell-wide CSI resource, if CSI reporting is configured
    pub csi_res_id: Option<u16>,
}

impl PucchConfig {
    /// Look up a resource configuration by id
    pub fn resource(&self, res_id: u16) -> Option<&PucchResource> {
        self.pucch_res_list.iter().find(|r| r.res_id == res_id)
    }
}

/// Output of a HARQ-ACK resource reservation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PucchHarqGrant<'a> {
    /// PUCCH resource configuration to be used by the UE
    pub pucch_res: &'a PucchResource,
    /// PUCCH resource indicator signalled in the DCI
    pub pucch_res_indicator: u8,
}

/// Record of which UE holds a dedicated resource at a given slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ResourceTracker {
    rnti: Rnti,
    format: PucchFormat,
}

/// Per-slot occupancy: common-resource bitmap plus dedicated-resource
/// trackers indexed by resource id
#[derive(Debug, Clone, Copy)]
struct SlotRecord {
    used_common_resources: [bool; MAX_COMMON_PUCCH_RESOURCES],
    ues_using_pucch_res: [Option<ResourceTracker>; MAX_PUCCH_RESOURCES],
}

impl SlotRecord {
    const EMPTY: SlotRecord = SlotRecord {
        used_common_resources: [false; MAX_COMMON_PUCCH_RESOURCES],
        ues_using_pucch_res: [None; MAX_PUCCH_RESOURCES],
    };

    fn clear(&mut self) {
        *self = Self::EMPTY;
    }
}

/// Cell-level PUCCH resource ledger and allocation engine.
///
/// One instance per cell, mutated only from the cell's scheduling thread.
/// Exhaustion and lookup misses are expected outcomes returned as `None` or
/// `false`; slot arguments outside the ring window and non-monotonic slot
/// indications are caller errors checked defensively.
pub struct PucchResourceManager {
    /// Ring of per-slot records, addressed by absolute slot count modulo size
    resource_slots: [SlotRecord; RES_MANAGER_RING_BUFFER_SIZE],
    /// Last slot indication received
    last_sl_ind: Option<SlotPoint>,
}

impl Default for PucchResourceManager {
    fn default() -> Self {
        Self::new()
    }
}

impl PucchResourceManager {
    /// Create a resource manager with an empty ledger
    pub fn new() -> Self {
        Self {
            resource_slots: [SlotRecord::EMPTY; RES_MANAGER_RING_BUFFER_SIZE],
            last_sl_ind: None,
        }
    }

    /// Advance the current slot by one and recycle the ledger entry that
    /// falls out of the ring.
    ///
    /// The cell scheduling loop must call this exactly once per slot, with
    /// strictly consecutive slot points.
    pub fn slot_indication(&mut self, slot_tx: SlotPoint) {
        if let Some(last) = self.last_sl_ind {
            assert!(
                slot_tx - last == 1,
                "non-monotonic slot indication: {} -> {}",
                last,
                slot_tx
            );
        }
        self.last_sl_ind = Some(slot_tx);
        // The entry one slot in the past is recycled; its ring position will
        // next be addressed as the farthest slot of the forward horizon.
        let recycled = slot_tx - 1u32;
        self.resource_slots[Self::ring_index(recycled)].clear();
    }

    /// Returns true if the common PUCCH resource indexed by r_pucch is
    /// available at the given slot
    pub fn is_common_resource_available(&self, sl: SlotPoint, r_pucch: usize) -> bool {
        debug_assert!(r_pucch < MAX_COMMON_PUCCH_RESOURCES, "r_pucch {} out of range", r_pucch);
        !self.slot_record(sl).used_common_resources[r_pucch]
    }

    /// Mark the common PUCCH resource indexed by r_pucch as in use at the
    /// given slot. Availability is not re-checked; callers must query
    /// `is_common_resource_available` first.
    pub fn reserve_common_resource(&mut self, sl: SlotPoint, r_pucch: usize) {
        debug_assert!(r_pucch < MAX_COMMON_PUCCH_RESOURCES, "r_pucch {} out of range", r_pucch);
        self.slot_record_mut(sl).used_common_resources[r_pucch] = true;
    }

    /// Reserve the lowest-index free PUCCH F1 resource for HARQ-ACK.
    ///
    /// Returns `None` when the F1 group is exhausted for this slot; this is
    /// an expected outcome under load, not a fault.
    pub fn reserve_next_f1_harq_res_available<'a>(
        &mut self,
        slot_harq: SlotPoint,
        crnti: Rnti,
        pucch_cfg: &'a PucchConfig,
    ) -> Option<PucchHarqGrant<'a>> {
        self.reserve_next_harq_res_available(slot_harq, crnti, pucch_cfg, PucchFormat::Format1)
    }

    /// Reserve the lowest-index free PUCCH F2 resource for HARQ-ACK.
    ///
    /// Returns `None` when the F2 group is exhausted for this slot.
    pub fn reserve_next_f2_harq_res_available<'a>(
        &mut self,
        slot_harq: SlotPoint,
        crnti: Rnti,
        pucch_cfg: &'a PucchConfig,
    ) -> Option<PucchHarqGrant<'a>> {
        self.reserve_next_harq_res_available(slot_harq, crnti, pucch_cfg, PucchFormat::Format2)
    }

    /// Bind the F2 resource identified by a previously assigned resource
    /// indicator. Fails with `None` if the resource is already bound to a
    /// different UE.
    pub fn reserve_specific_format2_res<'a>(
        &mut self,
        slot_harq: SlotPoint,
        crnti: Rnti,
        res_indicator: u8,
        pucch_cfg: &'a PucchConfig,
    ) -> Option<&'a PucchResource> {
        let res_id = *pucch_cfg.f2_harq_res_ids.get(res_indicator as usize)?;
        let pucch_res = pucch_cfg.resource(res_id)?;
        let record = self.slot_record_mut(slot_harq);
        match record.ues_using_pucch_res[res_id as usize] {
            Some(tracker) if tracker.rnti != crnti => None,
            _ => {
                record.ues_using_pucch_res[res_id as usize] = Some(ResourceTracker {
                    rnti: crnti,
                    format: PucchFormat::Format2,
                });
                Some(pucch_res)
            }
        }
    }

    /// Reserve the cell CSI resource (F2, shared across UEs) for one UE at
    /// the given slot. Returns `None` if CSI is not configured or the
    /// resource is already taken.
    pub fn reserve_csi_resource<'a>(
        &mut self,
        slot_csi: SlotPoint,
        crnti: Rnti,
        pucch_cfg: &'a PucchConfig,
    ) -> Option<&'a PucchResource> {
        let res_id = pucch_cfg.csi_res_id?;
        let pucch_res = pucch_cfg.resource(res_id)?;
        debug_assert_eq!(pucch_res.format(), PucchFormat::Format2);
        let record = self.slot_record_mut(slot_csi);
        if record.ues_using_pucch_res[res_id as usize].is_some() {
            return None;
        }
        record.ues_using_pucch_res[res_id as usize] = Some(ResourceTracker {
            rnti: crnti,
            format: PucchFormat::Format2,
        });
        Some(pucch_res)
    }

    /// Reserve the UE's SR resource (F1) at the given slot. Returns `None`
    /// if the resource is already taken.
    pub fn reserve_sr_res_available<'a>(
        &mut self,
        slot_sr: SlotPoint,
        crnti: Rnti,
        pucch_cfg: &'a PucchConfig,
    ) -> Option<&'a PucchResource> {
        let res_id = pucch_cfg.sr_res_id;
        let pucch_res = pucch_cfg.resource(res_id)?;
        debug_assert_eq!(pucch_res.format(), PucchFormat::Format1);
        let record = self.slot_record_mut(slot_sr);
        if record.ues_using_pucch_res[res_id as usize].is_some() {
            return None;
        }
        record.ues_using_pucch_res[res_id as usize] = Some(ResourceTracker {
            rnti: crnti,
            format: PucchFormat::Format1,
        });
        Some(pucch_res)
    }

    /// Release the UE's F1 HARQ-ACK resource at the given slot.
    ///
    /// Returns whether an allocation was found. A miss is not an error; it
    /// happens after ring recycling and makes release idempotent.
    pub fn release_harq_f1_resource(
        &mut self,
        slot_harq: SlotPoint,
        crnti: Rnti,
        pucch_cfg: &PucchConfig,
    ) -> bool {
        self.release_harq_resource(slot_harq, crnti, pucch_cfg, PucchFormat::Format1)
    }

    /// Release the UE's F2 HARQ-ACK resource at the given slot.
    pub fn release_harq_f2_resource(
        &mut self,
        slot_harq: SlotPoint,
        crnti: Rnti,
        pucch_cfg: &PucchConfig,
    ) -> bool {
        self.release_harq_resource(slot_harq, crnti, pucch_cfg, PucchFormat::Format2)
    }

    /// Release the UE's SR resource at the given slot
    pub fn release_sr_resource(
        &mut self,
        slot_sr: SlotPoint,
        crnti: Rnti,
        pucch_cfg: &PucchConfig,
    ) -> bool {
        let res_id = pucch_cfg.sr_res_id as usize;
        debug_assert!(res_id < MAX_PUCCH_RESOURCES);
        let record = self.slot_record_mut(slot_sr);
        match record.ues_using_pucch_res[res_id] {
            Some(tracker) if tracker.rnti == crnti => {
                record.ues_using_pucch_res[res_id] = None;
                true
            }
            _ => false,
        }
    }

    /// Release the cell CSI resource from the given UE at the given slot
    pub fn release_csi_resource(
        &mut self,
        slot_csi: SlotPoint,
        crnti: Rnti,
        pucch_cfg: &PucchConfig,
    ) -> bool {
        let Some(res_id) = pucch_cfg.csi_res_id else {
            return false;
        };
        let record = self.slot_record_mut(slot_csi);
        match record.ues_using_pucch_res[res_id as usize] {
            Some(tracker) if tracker.rnti == crnti => {
                record.ues_using_pucch_res[res_id as usize] = None;
                true
            }
            _ => false,
        }
    }

    /// Resource indicator of the F1 HARQ-ACK resource held by the UE at the
    /// given slot, if any
    pub fn fetch_f1_pucch_res_indic(
        &self,
        slot_tx: SlotPoint,
        crnti: Rnti,
        pucch_cfg: &PucchConfig,
    ) -> Option<u8> {
        self.fetch_pucch_res_indic(slot_tx, crnti, pucch_cfg, PucchFormat::Format1)
    }

    /// Resource indicator of the F2 HARQ-ACK resource held by the UE at the
    /// given slot, if any
    pub fn fetch_f2_pucch_res_indic(
        &self,
        slot_tx: SlotPoint,
        crnti: Rnti,
        pucch_cfg: &PucchConfig,
    ) -> Option<u8> {
        self.fetch_pucch_res_indic(slot_tx, crnti, pucch_cfg, PucchFormat::Format2)
    }

    /// Configuration of the CSI resource held by the UE at the given slot,
    /// if any
    pub fn fetch_csi_pucch_res_config<'a>(
        &self,
        slot_tx: SlotPoint,
        crnti: Rnti,
        pucch_cfg: &'a PucchConfig,
    ) -> Option<&'a PucchResource> {
        let res_id = pucch_cfg.csi_res_id?;
        let record = self.slot_record(slot_tx);
        match record.ues_using_pucch_res[res_id as usize] {
            Some(tracker) if tracker.rnti == crnti => pucch_cfg.resource(res_id),
            _ => None,
        }
    }

    fn reserve_next_harq_res_available<'a>(
        &mut self,
        slot_harq: SlotPoint,
        crnti: Rnti,
        pucch_cfg: &'a PucchConfig,
        format: PucchFormat,
    ) -> Option<PucchHarqGrant<'a>> {
        let res_ids = match format {
            PucchFormat::Format1 => &pucch_cfg.f1_harq_res_ids,
            PucchFormat::Format2 => &pucch_cfg.f2_harq_res_ids,
        };
        let record = self.slot_record_mut(slot_harq);
        let free_pos = res_ids.iter().position(|&id| {
            debug_assert!((id as usize) < MAX_PUCCH_RESOURCES);
            record.ues_using_pucch_res[id as usize].is_none()
        })?;
        let res_id = res_ids[free_pos];
        let pucch_res = pucch_cfg.resource(res_id)?;
        record.ues_using_pucch_res[res_id as usize] = Some(ResourceTracker { rnti: crnti, format });
        Some(PucchHarqGrant {
            pucch_res,
            pucch_res_indicator: free_pos as u8,
        })
    }

    fn release_harq_resource(
        &mut self,
        slot_harq: SlotPoint,
        crnti: Rnti,
        pucch_cfg: &PucchConfig,
        format: PucchFormat,
    ) -> bool {
        let res_ids = match format {
            PucchFormat::Format1 => &pucch_cfg.f1_harq_res_ids,
            PucchFormat::Format2 => &pucch_cfg.f2_harq_res_ids,
        };
        let record = self.slot_record_mut(slot_harq);
        for &id in res_ids {
            if record.ues_using_pucch_res[id as usize] == Some(ResourceTracker { rnti: crnti, format }) {
                record.ues_using_pucch_res[id as usize] = None;
                return true;
            }
        }
        false
    }

    fn fetch_pucch_res_indic(
        &self,
        slot_tx: SlotPoint,
        crnti: Rnti,
        pucch_cfg: &PucchConfig,
        format: PucchFormat,
    ) -> Option<u8> {
        let res_ids = match format {
            PucchFormat::Format1 => &pucch_cfg.f1_harq_res_ids,
            PucchFormat::Format2 => &pucch_cfg.f2_harq_res_ids,
        };
        let record = self.slot_record(slot_tx);
        res_ids
            .iter()
            .position(|&id| {
                record.ues_using_pucch_res[id as usize]
                    == Some(ResourceTracker { rnti: crnti, format })
            })
            .map(|pos| pos as u8)
    }

    fn ring_index(sl: SlotPoint) -> usize {
        // The SFN range is a multiple of the ring size, so the mapping stays
        // consistent across the counter wrap.
        sl.count() as usize % RES_MANAGER_RING_BUFFER_SIZE
    }

    fn check_slot_window(&self, sl: SlotPoint) {
        if let Some(last) = self.last_sl_ind {
            let dist = sl - last;
            debug_assert!(
                (dist.unsigned_abs() as usize) < RES_MANAGER_RING_BUFFER_SIZE,
                "slot {} outside the ring window around {}",
                sl,
                last
            );
        }
    }

    fn slot_record(&self, sl: SlotPoint) -> &SlotRecord {
        self.check_slot_window(sl);
        &self.resource_slots[Self::ring_index(sl)]
    }

    fn slot_record_mut(&mut self, sl: SlotPoint) -> &mut SlotRecord {
        self.check_slot_window(sl);
        &mut self.resource_slots[Self::ring_index(sl)]
    }
}

/// Build a cell PUCCH resource plan: `nof_f1_res` F1 + `nof_f2_res` F2
/// resources for HARQ-ACK, `nof_sr_res` F1 resources for SR and, optionally,
/// one shared F2 resource for CSI. The returned config carries the first SR
/// resource; per-UE configs rotate `sr_res_id` over the SR group.
pub fn default_pucch_config(
    nof_f1_res: usize,
    nof_f2_res: usize,
    nof_sr_res: usize,
    with_csi: bool,
) -> PucchConfig {
    debug_assert!(nof_sr_res > 0 && nof_sr_res <= MAX_SR_PUCCH_RESOURCES);

    let mut pucch_res_list = Vec::new();
    let mut next_id = 0u16;

    let mut f1_harq_res_ids = Vec::with_capacity(nof_f1_res);
    for i in 0..nof_f1_res {
        pucch_res_list.push(PucchResource {
            res_id: next_id,
            starting_prb: 0,
            start_symbol: 0,
            nof_symbols: 14,
            format_params: PucchFormatParams::Format1 {
                initial_cyclic_shift: ((i * 3) % 12) as u8,
                time_domain_occ: (i / 4) as u8,
            },
        });
        f1_harq_res_ids.push(next_id);
        next_id += 1;
    }

    let sr_first_id = next_id;
    for i in 0..nof_sr_res {
        pucch_res_list.push(PucchResource {
            res_id: next_id,
            starting_prb: 1,
            start_symbol: 0,
            nof_symbols: 14,
            format_params: PucchFormatParams::Format1 {
                initial_cyclic_shift: ((i * 3) % 12) as u8,
                time_domain_occ: 0,
            },
        });
        next_id += 1;
    }

    let mut f2_harq_res_ids = Vec::with_capacity(nof_f2_res);
    for _ in 0..nof_f2_res {
        pucch_res_list.push(PucchResource {
            res_id: next_id,
            starting_prb: 51,
            start_symbol: 12,
            nof_symbols: 2,
            format_params: PucchFormatParams::Format2 { nof_prbs: 1 },
        });
        f2_harq_res_ids.push(next_id);
        next_id += 1;
    }

    let csi_res_id = with_csi.then(|| {
        pucch_res_list.push(PucchResource {
            res_id: next_id,
            starting_prb: 50,
            start_symbol: 12,
            nof_symbols: 2,
            format_params: PucchFormatParams::Format2 { nof_prbs: 1 },
        });
        next_id
    });

    PucchConfig {
        pucch_res_list,
        f1_harq_res_ids,
        f2_harq_res_ids,
        sr_res_id: sr_first_id,
        csi_res_id,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::types::SubcarrierSpacing;

    fn test_cfg() -> PucchConfig {
        default_pucch_config(8, 8, 4, true)
    }

    fn start_slot() -> SlotPoint {
        SlotPoint::new(SubcarrierSpacing::Scs15, 1, 0)
    }

    fn new_mgr() -> (PucchResourceManager, SlotPoint) {
        let mut mgr = PucchResourceManager::new();
        let sl = start_slot();
        mgr.slot_indication(sl);
        (mgr, sl)
    }

    #[test]
    fn test_harq_f1_reservation_occupies_resource() {
        let (mut mgr, sl) = new_mgr();
        let cfg = test_cfg();

        let grant = mgr
            .reserve_next_f1_harq_res_available(sl, Rnti(0x4601), &cfg)
            .unwrap();
        assert_eq!(grant.pucch_res_indicator, 0);
        assert_eq!(grant.pucch_res.res_id, cfg.f1_harq_res_ids[0]);
        assert_eq!(grant.pucch_res.format(), PucchFormat::Format1);

        // A second UE never gets the already-bound index
        let grant2 = mgr
            .reserve_next_f1_harq_res_available(sl, Rnti(0x4602), &cfg)
            .unwrap();
        assert_eq!(grant2.pucch_res_indicator, 1);
        assert_ne!(grant2.pucch_res.res_id, grant.pucch_res.res_id);
    }

    #[test]
    fn test_monotonic_indicator_allocation() {
        let (mut mgr, sl) = new_mgr();
        let cfg = test_cfg();

        for i in 0..cfg.f2_harq_res_ids.len() {
            let grant = mgr
                .reserve_next_f2_harq_res_available(sl, Rnti(0x4600 + i as u16), &cfg)
                .unwrap();
            assert_eq!(grant.pucch_res_indicator, i as u8);
        }
    }

    #[test]
    fn test_exhaustion_returns_none_without_side_effects() {
        let (mut mgr, sl) = new_mgr();
        let cfg = test_cfg();

        for i in 0..cfg.f1_harq_res_ids.len() {
            assert!(mgr
                .reserve_next_f1_harq_res_available(sl, Rnti(0x4600 + i as u16), &cfg)
                .is_some());
        }
        assert!(mgr
            .reserve_next_f1_harq_res_available(sl, Rnti(0x5000), &cfg)
            .is_none());

        // Existing allocations are untouched
        assert_eq!(mgr.fetch_f1_pucch_res_indic(sl, Rnti(0x4600), &cfg), Some(0));
        assert_eq!(
            mgr.fetch_f1_pucch_res_indic(sl, Rnti(0x4607), &cfg),
            Some(7)
        );
    }

    #[test]
    fn test_reserve_fetch_release_round_trip() {
        let (mut mgr, sl) = new_mgr();
        let cfg = test_cfg();
        let rnti = Rnti(0x4601);

        let grant = mgr.reserve_next_f2_harq_res_available(sl, rnti, &cfg).unwrap();
        assert_eq!(
            mgr.fetch_f2_pucch_res_indic(sl, rnti, &cfg),
            Some(grant.pucch_res_indicator)
        );

        assert!(mgr.release_harq_f2_resource(sl, rnti, &cfg));
        assert_eq!(mgr.fetch_f2_pucch_res_indic(sl, rnti, &cfg), None);
    }

    #[test]
    fn test_release_is_idempotent() {
        let (mut mgr, sl) = new_mgr();
        let cfg = test_cfg();
        let rnti = Rnti(0x4601);

        mgr.reserve_next_f1_harq_res_available(sl, rnti, &cfg).unwrap();
        assert!(mgr.release_harq_f1_resource(sl, rnti, &cfg));
        assert!(!mgr.release_harq_f1_resource(sl, rnti, &cfg));
    }

    #[test]
    fn test_reserve_specific_format2() {
        let (mut mgr, sl) = new_mgr();
        let cfg = test_cfg();

        let res = mgr
            .reserve_specific_format2_res(sl, Rnti(0x4601), 3, &cfg)
            .unwrap();
        assert_eq!(res.res_id, cfg.f2_harq_res_ids[3]);

        // Re-binding by the same UE is allowed, another UE is rejected
        assert!(mgr.reserve_specific_format2_res(sl, Rnti(0x4601), 3, &cfg).is_some());
        assert!(mgr.reserve_specific_format2_res(sl, Rnti(0x4602), 3, &cfg).is_none());

        // An out-of-range indicator is a miss, not a panic
        assert!(mgr.reserve_specific_format2_res(sl, Rnti(0x4602), 200, &cfg).is_none());
    }

    #[test]
    fn test_sr_resource_single_binding() {
        let (mut mgr, sl) = new_mgr();
        let cfg = test_cfg();

        let res = mgr.reserve_sr_res_available(sl, Rnti(0x4601), &cfg).unwrap();
        assert_eq!(res.res_id, cfg.sr_res_id);
        assert_eq!(res.format(), PucchFormat::Format1);

        // Same SR resource, same slot: second UE is rejected
        assert!(mgr.reserve_sr_res_available(sl, Rnti(0x4602), &cfg).is_none());

        // A UE with a different SR resource of the pool is unaffected
        let mut cfg2 = cfg.clone();
        cfg2.sr_res_id = cfg.sr_res_id + 1;
        assert!(mgr.reserve_sr_res_available(sl, Rnti(0x4602), &cfg2).is_some());

        assert!(mgr.release_sr_resource(sl, Rnti(0x4601), &cfg));
        assert!(!mgr.release_sr_resource(sl, Rnti(0x4601), &cfg));
    }

    #[test]
    fn test_csi_resource_shared_across_ues() {
        let (mut mgr, sl) = new_mgr();
        let cfg = test_cfg();

        let res = mgr.reserve_csi_resource(sl, Rnti(0x4601), &cfg).unwrap();
        assert_eq!(Some(res.res_id), cfg.csi_res_id);

        assert!(mgr.reserve_csi_resource(sl, Rnti(0x4602), &cfg).is_none());

        assert_eq!(
            mgr.fetch_csi_pucch_res_config(sl, Rnti(0x4601), &cfg).map(|r| r.res_id),
            cfg.csi_res_id
        );
        assert!(mgr.fetch_csi_pucch_res_config(sl, Rnti(0x4602), &cfg).is_none());

        assert!(mgr.release_csi_resource(sl, Rnti(0x4601), &cfg));
        assert!(mgr.reserve_csi_resource(sl, Rnti(0x4602), &cfg).is_some());
    }

    #[test]
    fn test_csi_unconfigured() {
        let (mut mgr, sl) = new_mgr();
        let mut cfg = test_cfg();
        cfg.csi_res_id = None;

        assert!(mgr.reserve_csi_resource(sl, Rnti(0x4601), &cfg).is_none());
        assert!(!mgr.release_csi_resource(sl, Rnti(0x4601), &cfg));
    }

    #[test]
    fn test_common_resource_bitmap() {
        let (mut mgr, sl) = new_mgr();

        assert!(mgr.is_common_resource_available(sl, 11));
        mgr.reserve_common_resource(sl, 11);
        assert!(!mgr.is_common_resource_available(sl, 11));
        assert!(mgr.is_common_resource_available(sl, 12));
    }

    #[test]
    fn test_allocations_are_per_slot() {
        let (mut mgr, sl) = new_mgr();
        let cfg = test_cfg();
        let rnti = Rnti(0x4601);

        mgr.reserve_next_f1_harq_res_available(sl, rnti, &cfg).unwrap();
        let later = sl + 4;
        assert_eq!(mgr.fetch_f1_pucch_res_indic(later, rnti, &cfg), None);

        let grant = mgr.reserve_next_f1_harq_res_available(later, rnti, &cfg).unwrap();
        assert_eq!(grant.pucch_res_indicator, 0);
    }

    #[test]
    fn test_ring_recycling_clears_trackers() {
        let (mut mgr, sl) = new_mgr();
        let cfg = test_cfg();
        let rnti = Rnti(0x4601);

        let target = sl + 8;
        mgr.reserve_next_f1_harq_res_available(target, rnti, &cfg).unwrap();
        mgr.reserve_sr_res_available(target, rnti, &cfg).unwrap();
        mgr.reserve_common_resource(target, 0);

        // Advance by exactly the ring size: the target position is recycled
        let mut now = sl;
        for _ in 0..RES_MANAGER_RING_BUFFER_SIZE {
            now += 1;
            mgr.slot_indication(now);
        }

        let reused = target + RES_MANAGER_RING_BUFFER_SIZE as u32;
        assert_eq!(mgr.fetch_f1_pucch_res_indic(reused, rnti, &cfg), None);
        assert!(mgr.is_common_resource_available(reused, 0));
        assert!(mgr.reserve_sr_res_available(reused, Rnti(0x4602), &cfg).is_some());
    }

    #[test]
    #[should_panic(expected = "non-monotonic slot indication")]
    fn test_skipped_slot_indication_is_rejected() {
        let (mut mgr, sl) = new_mgr();
        mgr.slot_indication(sl + 2);
    }

    #[test]
    fn test_default_config_groups_are_contiguous() {
        let cfg = test_cfg();
        for w in cfg.f1_harq_res_ids.windows(2) {
            assert_eq!(w[1], w[0] + 1);
        }
        for w in cfg.f2_harq_res_ids.windows(2) {
            assert_eq!(w[1], w[0] + 1);
        }
        // F1 group and F2 group are not adjacent: the SR group sits between
        assert!(cfg.f2_harq_res_ids[0] > *cfg.f1_harq_res_ids.last().unwrap() + 1);
        assert!(cfg.resource(cfg.sr_res_id).is_some());
        assert!(cfg.resource(cfg.csi_res_id.unwrap()).is_some());
    }
}
