// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Base trait for long-lived adapters (storage, transport).

use async_trait::async_trait;

use crate::error::ParleyError;
use crate::types::HealthStatus;

/// Lifecycle hooks shared by every adapter.
#[async_trait]
pub trait Adapter: Send + Sync + 'static {
    /// Short adapter name for logs (e.g., "sqlite", "telegram").
    fn name(&self) -> &str;

    /// Checks whether the adapter can currently serve requests.
    async fn health_check(&self) -> Result<HealthStatus, ParleyError>;

    /// Flushes and releases resources.
    async fn shutdown(&self) -> Result<(), ParleyError>;
}
