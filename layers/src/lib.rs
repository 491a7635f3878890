//! Protocol Stack Layers Library
//!
//! This crate implements the 5G protocol stack layers according to 3GPP Release 16.
//! The current scope is the MAC scheduler core: per-cell PUCCH resource
//! management, DRX active-time tracking and UCI scheduling.

pub mod mac;

use async_trait::async_trait;
use thiserror::Error;

/// Common errors for protocol layers
#[derive(Error, Debug)]
pub enum LayerError {
    #[error("Layer not initialized")]
    NotInitialized,

    #[error("Resource unavailable")]
    ResourceUnavailable,

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),
}

/// Common lifecycle trait for all protocol layers
#[async_trait]
pub trait ProtocolLayer: Send + Sync {
    /// Initialize the layer
    async fn initialize(&mut self) -> Result<(), LayerError>;

    /// Shutdown the layer
    async fn shutdown(&mut self) -> Result<(), LayerError>;
}
