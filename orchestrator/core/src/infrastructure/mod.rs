// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod content_client;
pub mod event_bus;
pub mod relationship_client;
pub mod repositories;

pub use content_client::ContentServiceClient;
pub use event_bus::{DomainEvent, EventBus};
pub use relationship_client::RelationshipServiceClient;
