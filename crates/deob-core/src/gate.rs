//! Readiness gate consulted before any stage runs
use crate::error::DeobError;

pub trait ReadinessGate: Send + Sync {
    /// Fails with [`DeobError::SetupRequired`] until every tool was fetched and built
    fn ensure(&self) -> Result<(), DeobError>;
}
