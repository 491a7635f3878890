//! Slot Point Timebase
//!
//! Absolute slot counting over the system-frame-number range according to 3GPP TS 38.211.
//! All scheduler components exchange time as `SlotPoint` values.

use crate::types::SubcarrierSpacing;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Sub};

/// Number of system frame numbers before the frame counter wraps
pub const NOF_SFNS: u32 = 1024;

/// A point in time measured in slots for a given numerology.
///
/// The counter spans `NOF_SFNS` frames and wraps; arithmetic and comparisons
/// are wrap-aware, with distances normalized to the half range. Two slot
/// points are only comparable for the same subcarrier spacing.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SlotPoint {
    scs: SubcarrierSpacing,
    count: u32,
}

impl SlotPoint {
    /// Create a slot point from frame and slot-in-frame numbers
    pub fn new(scs: SubcarrierSpacing, frame: u32, slot: u32) -> Self {
        debug_assert!(frame < NOF_SFNS, "frame {} out of SFN range", frame);
        debug_assert!(slot < scs.slots_per_frame(), "slot {} out of frame range", slot);
        Self {
            scs,
            count: frame * scs.slots_per_frame() + slot,
        }
    }

    /// Create a slot point from an absolute slot count, wrapping into range
    pub fn from_count(scs: SubcarrierSpacing, count: u32) -> Self {
        Self {
            scs,
            count: count % (NOF_SFNS * scs.slots_per_frame()),
        }
    }

    /// Subcarrier spacing this slot point is counted in
    pub fn scs(&self) -> SubcarrierSpacing {
        self.scs
    }

    /// Absolute slot count within the SFN range
    pub fn count(&self) -> u32 {
        self.count
    }

    /// System frame number
    pub fn frame(&self) -> u32 {
        self.count / self.scs.slots_per_frame()
    }

    /// Slot number within the frame
    pub fn slot(&self) -> u32 {
        self.count % self.scs.slots_per_frame()
    }

    /// Subframe number (1ms unit) within the frame
    pub fn subframe(&self) -> u32 {
        self.slot() / self.scs.slots_per_subframe()
    }

    /// Total slots in the SFN range before the counter wraps
    pub fn range(&self) -> u32 {
        NOF_SFNS * self.scs.slots_per_frame()
    }
}

impl Add<u32> for SlotPoint {
    type Output = SlotPoint;

    fn add(self, rhs: u32) -> SlotPoint {
        let range = self.range();
        SlotPoint {
            scs: self.scs,
            count: (self.count + rhs % range) % range,
        }
    }
}

impl AddAssign<u32> for SlotPoint {
    fn add_assign(&mut self, rhs: u32) {
        *self = *self + rhs;
    }
}

impl Sub<u32> for SlotPoint {
    type Output = SlotPoint;

    fn sub(self, rhs: u32) -> SlotPoint {
        let range = self.range();
        SlotPoint {
            scs: self.scs,
            count: (self.count + range - rhs % range) % range,
        }
    }
}

impl Sub<SlotPoint> for SlotPoint {
    type Output = i32;

    /// Signed slot distance, normalized into `[-range/2, range/2)`
    fn sub(self, rhs: SlotPoint) -> i32 {
        debug_assert_eq!(self.scs, rhs.scs, "mixed-numerology slot arithmetic");
        let range = self.range() as i32;
        let mut diff = self.count as i32 - rhs.count as i32;
        if diff >= range / 2 {
            diff -= range;
        } else if diff < -range / 2 {
            diff += range;
        }
        diff
    }
}

impl PartialOrd for SlotPoint {
    fn partial_cmp(&self, other: &SlotPoint) -> Option<std::cmp::Ordering> {
        Some((*self - *other).cmp(&0))
    }
}

impl fmt::Display for SlotPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.frame(), self.slot())
    }
}

impl fmt::Debug for SlotPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SlotPoint({}.{})", self.frame(), self.slot())
    }
}
