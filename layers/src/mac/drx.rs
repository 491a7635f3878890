//! DRX Active-Time Controller
//!
//! Tracks, per UE, whether the PDCCH may be scheduled at a given slot: either
//! the slot falls in the periodic on-duration window, or a previous PDCCH
//! allocation (or the contention resolution timer) extended the active time.

use common::slot::SlotPoint;
use common::types::SubcarrierSpacing;
use serde::{Deserialize, Serialize};
use tracing::trace;

/// UE-dedicated DRX configuration, as signalled via RRC (TS 38.331
/// DRX-Config), in milliseconds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrxConfig {
    /// drx-LongCycle: period of the on-duration window
    pub long_cycle_ms: u32,
    /// drx-StartOffset: start of the on-duration window within the cycle
    pub long_start_offset_ms: u32,
    /// drx-onDurationTimer: length of the on-duration window
    pub on_duration_ms: u32,
    /// drx-InactivityTimer: active-time extension after a new PDCCH allocation
    pub inactivity_ms: u32,
}

/// DRX parameters converted from milliseconds to slots
#[derive(Debug, Clone, Copy)]
struct SlotizedDrx {
    period_slots: u32,
    /// On-duration window as [start, end) offsets within the period; `end`
    /// may exceed the period when the window crosses the cycle boundary.
    win_start: u32,
    win_end: u32,
    inactivity_slots: u32,
}

/// Per-UE controller deciding DRX active time.
///
/// State is implicit: membership in the periodic on-duration window is
/// evaluated on demand from the slot count, and `active_time_end` carries the
/// explicit forward extension. `active_time_end` is monotonic non-decreasing.
pub struct DrxController {
    conres_timer_slots: u32,
    drx: Option<SlotizedDrx>,
    current_slot: Option<SlotPoint>,
    active_time_end: Option<SlotPoint>,
}

impl DrxController {
    /// Create a controller for one UE. `drx_cfg` of `None` means DRX is not
    /// configured and the UE monitors the PDCCH continuously.
    pub fn new(scs: SubcarrierSpacing, conres_timer_ms: u32, drx_cfg: Option<&DrxConfig>) -> Self {
        let slots_per_ms = scs.slots_per_subframe();
        let drx = drx_cfg.map(|cfg| {
            debug_assert!(cfg.long_cycle_ms > 0);
            debug_assert!(cfg.on_duration_ms <= cfg.long_cycle_ms);
            debug_assert!(cfg.long_start_offset_ms < cfg.long_cycle_ms);
            SlotizedDrx {
                period_slots: cfg.long_cycle_ms * slots_per_ms,
                win_start: cfg.long_start_offset_ms * slots_per_ms,
                win_end: (cfg.long_start_offset_ms + cfg.on_duration_ms) * slots_per_ms,
                inactivity_slots: cfg.inactivity_ms * slots_per_ms,
            }
        });
        Self {
            conres_timer_slots: conres_timer_ms * slots_per_ms,
            drx,
            current_slot: None,
            active_time_end: None,
        }
    }

    /// Update the controller to the new slot. Window membership is derived
    /// from the slot count, so nothing else is recomputed here; the active
    /// time extension is never reset.
    pub fn slot_indication(&mut self, slot: SlotPoint) {
        self.current_slot = Some(slot);
    }

    /// Whether the PDCCH can be allocated for this UE at the given slot
    pub fn is_pdcch_enabled(&self, slot: SlotPoint) -> bool {
        // A UE without DRX configuration monitors continuously.
        let Some(drx) = &self.drx else {
            return true;
        };
        if Self::in_on_duration(drx, slot) {
            return true;
        }
        match self.active_time_end {
            Some(end) => slot - end < 0,
            None => false,
        }
    }

    /// Extend the active time after a new PDCCH allocation at the given slot
    pub fn on_new_pdcch_alloc(&mut self, slot: SlotPoint) {
        if let Some(drx) = self.drx {
            if drx.inactivity_slots > 0 {
                self.extend_active_time(slot + drx.inactivity_slots);
            }
        }
    }

    /// Extend the active time by the contention resolution timer. Used
    /// during initial access, before the dedicated DRX configuration
    /// applies.
    pub fn on_con_res_start(&mut self) {
        if let Some(now) = self.current_slot {
            self.extend_active_time(now + self.conres_timer_slots);
        }
    }

    fn in_on_duration(drx: &SlotizedDrx, slot: SlotPoint) -> bool {
        let offset = slot.count() % drx.period_slots;
        if drx.win_end <= drx.period_slots {
            drx.win_start <= offset && offset < drx.win_end
        } else {
            // Window crosses the cycle boundary
            offset >= drx.win_start || offset < drx.win_end - drx.period_slots
        }
    }

    fn extend_active_time(&mut self, end: SlotPoint) {
        // active_time_end is monotonic non-decreasing: a later computation
        // may not shrink a window already granted.
        let new_end = match self.active_time_end {
            Some(cur) if cur - end >= 0 => cur,
            _ => end,
        };
        if self.active_time_end != Some(new_end) {
            trace!("DRX active time extended until slot {}", new_end);
        }
        self.active_time_end = Some(new_end);
    }
}
