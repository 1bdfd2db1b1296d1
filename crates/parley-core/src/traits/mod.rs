// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Trait seams between the dialog core and its external collaborators.
//!
//! Every trait uses `#[async_trait]` so implementations can be held as
//! `Arc<dyn Trait>` and swapped for in-memory doubles in tests.

pub mod adapter;
pub mod notifier;
pub mod occurrence;
pub mod queue_store;
pub mod state_store;
pub mod transport;

pub use adapter::Adapter;
pub use notifier::NotificationHandler;
pub use occurrence::OccurrenceSource;
pub use queue_store::QueueStore;
pub use state_store::StateStore;
pub use transport::{ChannelAdapter, Transport};
