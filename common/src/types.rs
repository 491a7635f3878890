//! Common Types for 5G GNodeB
//!
//! Defines fundamental types used throughout the protocol stack

use num_derive::{FromPrimitive, ToPrimitive};
use num_traits::FromPrimitive;
use serde::{Deserialize, Serialize};

/// Radio Network Temporary Identifier (RNTI)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rnti(pub u16);

impl Rnti {
    /// Create a new RNTI
    pub fn new(value: u16) -> Self {
        Self(value)
    }

    /// Get the RNTI value
    pub fn value(&self) -> u16 {
        self.0
    }
}

impl std::fmt::Display for Rnti {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#06x}", self.0)
    }
}

/// Cell Identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellId(pub u16);

/// Physical Cell Identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pci(pub u16);

impl Pci {
    /// Maximum valid PCI value (0-1007)
    pub const MAX: u16 = 1007;

    /// Create a new PCI with validation
    pub fn new(value: u16) -> Option<Self> {
        if value <= Self::MAX {
            Some(Self(value))
        } else {
            None
        }
    }
}

/// Subcarrier spacing values in kHz
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromPrimitive, ToPrimitive, Serialize, Deserialize)]
pub enum SubcarrierSpacing {
    /// 15 kHz
    Scs15 = 15,
    /// 30 kHz
    Scs30 = 30,
    /// 60 kHz
    Scs60 = 60,
    /// 120 kHz
    Scs120 = 120,
    /// 240 kHz
    Scs240 = 240,
}

impl SubcarrierSpacing {
    /// Parse from a kHz value (15, 30, 60, 120 or 240)
    pub fn from_khz(khz: u32) -> Option<Self> {
        FromPrimitive::from_u32(khz)
    }

    /// Get the spacing in kHz
    pub fn as_khz(&self) -> u16 {
        *self as u16
    }

    /// Number of slots per subframe (1ms)
    pub fn slots_per_subframe(&self) -> u32 {
        match self {
            SubcarrierSpacing::Scs15 => 1,
            SubcarrierSpacing::Scs30 => 2,
            SubcarrierSpacing::Scs60 => 4,
            SubcarrierSpacing::Scs120 => 8,
            SubcarrierSpacing::Scs240 => 16,
        }
    }

    /// Number of slots per frame (10ms)
    pub fn slots_per_frame(&self) -> u32 {
        self.slots_per_subframe() * 10
    }

    /// Slot duration in microseconds
    pub fn slot_duration_us(&self) -> u32 {
        match self {
            SubcarrierSpacing::Scs15 => 1000,
            SubcarrierSpacing::Scs30 => 500,
            SubcarrierSpacing::Scs60 => 250,
            SubcarrierSpacing::Scs120 => 125,
            SubcarrierSpacing::Scs240 => 62, // Actually 62.5 us
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pci_validation() {
        assert!(Pci::new(0).is_some());
        assert!(Pci::new(1007).is_some());
        assert!(Pci::new(1008).is_none());
    }

    #[test]
    fn test_scs_from_khz() {
        assert_eq!(SubcarrierSpacing::from_khz(15), Some(SubcarrierSpacing::Scs15));
        assert_eq!(SubcarrierSpacing::from_khz(120), Some(SubcarrierSpacing::Scs120));
        assert_eq!(SubcarrierSpacing::from_khz(45), None);
    }

    #[test]
    fn test_scs_slot_timing() {
        assert_eq!(SubcarrierSpacing::Scs15.slots_per_frame(), 10);
        assert_eq!(SubcarrierSpacing::Scs30.slots_per_frame(), 20);
        assert_eq!(SubcarrierSpacing::Scs15.slot_duration_us(), 1000);
        assert_eq!(SubcarrierSpacing::Scs120.slot_duration_us(), 125);
    }

    #[test]
    fn test_rnti_display() {
        assert_eq!(Rnti(0x4601).to_string(), "0x4601");
    }
}
