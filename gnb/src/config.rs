//! YAML Configuration Structures for the GNodeB
//!
//! Cell, PUCCH, UCI, DRX and simulation sections with serde defaults, loaded
//! from a YAML file and overridable from the command line.

use serde::{Deserialize, Serialize};

/// Main configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GnbConfig {
    /// Cell configuration
    #[serde(default)]
    pub cell_cfg: CellConfig,
    /// Logging configuration
    #[serde(default)]
    pub log: LogConfig,
    /// Simulated terminal population
    #[serde(default)]
    pub sim: SimConfig,
}

impl Default for GnbConfig {
    fn default() -> Self {
        Self {
            cell_cfg: CellConfig::default(),
            log: LogConfig::default(),
            sim: SimConfig::default(),
        }
    }
}

/// Cell configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CellConfig {
    /// Physical Cell ID
    #[serde(default)]
    pub pci: u16,
    /// Cell ID
    #[serde(default = "default_cell_id")]
    pub cell_id: u16,
    /// Common subcarrier spacing in kHz
    #[serde(default = "default_common_scs")]
    pub common_scs: u32,
    /// Maximum number of UEs
    #[serde(default = "default_max_ues")]
    pub max_ues: u16,
    /// PUCCH resource plan
    #[serde(default)]
    pub pucch: PucchSection,
    /// UCI reporting periodicities
    #[serde(default)]
    pub uci: UciSection,
    /// DRX configuration; absent means UEs monitor continuously
    pub drx: Option<DrxSection>,
    /// Contention resolution timer in milliseconds
    #[serde(default = "default_conres_timer_ms")]
    pub conres_timer_ms: u32,
}

impl Default for CellConfig {
    fn default() -> Self {
        Self {
            pci: 0,
            cell_id: default_cell_id(),
            common_scs: default_common_scs(),
            max_ues: default_max_ues(),
            pucch: PucchSection::default(),
            uci: UciSection::default(),
            drx: None,
            conres_timer_ms: default_conres_timer_ms(),
        }
    }
}

fn default_cell_id() -> u16 {
    1
}

fn default_common_scs() -> u32 {
    15
}

fn default_max_ues() -> u16 {
    32
}

fn default_conres_timer_ms() -> u32 {
    64
}

/// PUCCH resource plan
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PucchSection {
    /// Number of F1 resources for HARQ-ACK
    #[serde(default = "default_nof_harq_res")]
    pub nof_f1_res: u8,
    /// Number of F2 resources for HARQ-ACK
    #[serde(default = "default_nof_harq_res")]
    pub nof_f2_res: u8,
    /// Number of F1 resources for SR
    #[serde(default = "default_nof_sr_res")]
    pub nof_sr_res: u8,
    /// Whether a cell CSI resource is configured
    #[serde(default = "default_with_csi")]
    pub with_csi: bool,
}

impl Default for PucchSection {
    fn default() -> Self {
        Self {
            nof_f1_res: default_nof_harq_res(),
            nof_f2_res: default_nof_harq_res(),
            nof_sr_res: default_nof_sr_res(),
            with_csi: default_with_csi(),
        }
    }
}

fn default_nof_harq_res() -> u8 {
    8
}

fn default_nof_sr_res() -> u8 {
    4
}

fn default_with_csi() -> bool {
    true
}

/// UCI reporting periodicities
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UciSection {
    /// SR periodicity in slots
    #[serde(default = "default_sr_period_slots")]
    pub sr_period_slots: u32,
    /// SR slot offset
    #[serde(default)]
    pub sr_offset: u32,
    /// CSI periodicity in slots
    #[serde(default = "default_csi_period_slots")]
    pub csi_period_slots: u32,
    /// CSI slot offset
    #[serde(default = "default_csi_offset")]
    pub csi_offset: u32,
}

impl Default for UciSection {
    fn default() -> Self {
        Self {
            sr_period_slots: default_sr_period_slots(),
            sr_offset: 0,
            csi_period_slots: default_csi_period_slots(),
            csi_offset: default_csi_offset(),
        }
    }
}

fn default_sr_period_slots() -> u32 {
    40
}

fn default_csi_period_slots() -> u32 {
    80
}

fn default_csi_offset() -> u32 {
    1
}

/// DRX configuration in milliseconds
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DrxSection {
    /// drx-LongCycle
    pub long_cycle_ms: u32,
    /// drx-StartOffset
    #[serde(default)]
    pub long_start_offset_ms: u32,
    /// drx-onDurationTimer
    pub on_duration_ms: u32,
    /// drx-InactivityTimer
    #[serde(default)]
    pub inactivity_ms: u32,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LogConfig {
    /// All layers log level
    #[serde(default = "default_log_level")]
    pub all_level: String,
    /// MAC layer log level
    #[serde(default = "default_log_level")]
    pub mac_level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            all_level: default_log_level(),
            mac_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Simulated terminal population driven by the slot clock
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SimConfig {
    /// Number of simulated UEs attached at startup
    #[serde(default = "default_nof_ues")]
    pub nof_ues: u16,
    /// RNTI of the first simulated UE
    #[serde(default = "default_first_rnti")]
    pub first_rnti: u16,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            nof_ues: default_nof_ues(),
            first_rnti: default_first_rnti(),
        }
    }
}

fn default_nof_ues() -> u16 {
    4
}

fn default_first_rnti() -> u16 {
    0x4601
}

impl GnbConfig {
    /// Load configuration from YAML file
    pub fn from_yaml_file(path: &str) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: GnbConfig = serde_yaml::from_str(&contents)?;
        Ok(config)
    }
}
