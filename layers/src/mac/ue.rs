//! UE Scheduling Context
//!
//! Per-terminal state consulted by the cell scheduler: PUCCH resource view,
//! UCI reporting periodicities and the DRX controller.

use crate::mac::drx::DrxController;
use crate::mac::pucch::PucchConfig;
use crate::LayerError;
use common::types::Rnti;
use serde::{Deserialize, Serialize};

/// Scheduling request opportunity configuration, in slots
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SrConfig {
    /// Periodicity of SR opportunities
    pub period_slots: u32,
    /// Slot offset of the opportunity within the period
    pub offset: u32,
}

/// CSI reporting opportunity configuration, in slots
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CsiConfig {
    /// Periodicity of CSI report occasions
    pub period_slots: u32,
    /// Slot offset of the occasion within the period
    pub offset: u32,
}

/// Per-UE UCI reporting configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UciConfig {
    /// SR opportunities
    pub sr: SrConfig,
    /// CSI occasions, if CSI reporting is configured
    pub csi: Option<CsiConfig>,
}

/// One connected terminal as seen by the cell scheduler
pub struct UeContext {
    /// C-RNTI identifying the UE in this cell
    pub rnti: Rnti,
    /// The UE's view of the cell PUCCH resource plan
    pub pucch_cfg: PucchConfig,
    /// UCI reporting periodicities
    pub uci_cfg: UciConfig,
    /// DRX active-time controller
    pub drx: DrxController,
}

impl UeContext {
    /// Create a UE context
    pub fn new(rnti: Rnti, pucch_cfg: PucchConfig, uci_cfg: UciConfig, drx: DrxController) -> Self {
        Self {
            rnti,
            pucch_cfg,
            uci_cfg,
            drx,
        }
    }
}

/// Container of the UEs attached to one cell.
///
/// Backed by a bounded vector scanned linearly; the cell serves at most a few
/// hundred UEs and the scan stays well inside the per-slot deadline.
#[derive(Default)]
pub struct UeRepository {
    ues: Vec<UeContext>,
}

impl UeRepository {
    /// Create an empty repository
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a UE. Fails if the RNTI is already present.
    pub fn add(&mut self, ue: UeContext) -> Result<(), LayerError> {
        if self.get(ue.rnti).is_some() {
            return Err(LayerError::InvalidState(format!(
                "UE with RNTI {} already exists",
                ue.rnti
            )));
        }
        self.ues.push(ue);
        Ok(())
    }

    /// Remove a UE; returns whether it was present
    pub fn remove(&mut self, rnti: Rnti) -> bool {
        let before = self.ues.len();
        self.ues.retain(|ue| ue.rnti != rnti);
        self.ues.len() != before
    }

    /// Look up a UE by RNTI
    pub fn get(&self, rnti: Rnti) -> Option<&UeContext> {
        self.ues.iter().find(|ue| ue.rnti == rnti)
    }

    /// Look up a UE by RNTI, mutably
    pub fn get_mut(&mut self, rnti: Rnti) -> Option<&mut UeContext> {
        self.ues.iter_mut().find(|ue| ue.rnti == rnti)
    }

    /// Iterate over all UEs
    pub fn iter(&self) -> impl Iterator<Item = &UeContext> {
        self.ues.iter()
    }

    /// Iterate over all UEs, mutably
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut UeContext> {
        self.ues.iter_mut()
    }

    /// Number of attached UEs
    pub fn len(&self) -> usize {
        self.ues.len()
    }

    /// Whether the repository is empty
    pub fn is_empty(&self) -> bool {
        self.ues.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mac::pucch::default_pucch_config;
    use common::types::SubcarrierSpacing;

    fn test_ue(rnti: u16) -> UeContext {
        UeContext::new(
            Rnti(rnti),
            default_pucch_config(8, 8, 4, true),
            UciConfig {
                sr: SrConfig {
                    period_slots: 40,
                    offset: 0,
                },
                csi: None,
            },
            DrxController::new(SubcarrierSpacing::Scs15, 64, None),
        )
    }

    #[test]
    fn test_add_and_lookup() {
        let mut repo = UeRepository::new();
        repo.add(test_ue(0x4601)).unwrap();
        repo.add(test_ue(0x4602)).unwrap();

        assert_eq!(repo.len(), 2);
        assert!(repo.get(Rnti(0x4601)).is_some());
        assert!(repo.get(Rnti(0x4603)).is_none());
    }

    #[test]
    fn test_duplicate_rnti_rejected() {
        let mut repo = UeRepository::new();
        repo.add(test_ue(0x4601)).unwrap();
        assert!(repo.add(test_ue(0x4601)).is_err());
        assert_eq!(repo.len(), 1);
    }

    #[test]
    fn test_remove() {
        let mut repo = UeRepository::new();
        repo.add(test_ue(0x4601)).unwrap();
        assert!(repo.remove(Rnti(0x4601)));
        assert!(!repo.remove(Rnti(0x4601)));
        assert!(repo.is_empty());
    }
}
