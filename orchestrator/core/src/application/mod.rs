// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod agents;
pub mod cycle_service;
pub mod dispatcher;
pub mod installer;
pub mod ledger;
pub mod registry;
pub mod runner;
pub mod scheduler;
pub mod trust_audit;

// Re-export use cases for convenience
pub use cycle_service::{CycleService, CycleSummary};
pub use installer::{InstallationResult, Installer};
pub use registry::{DependencyViolation, LayerRegistry};
pub use runner::{AgentRunner, CycleOutcome};
pub use scheduler::{CycleScheduler, ScheduledAgent};
pub use trust_audit::{AuditEntry, TrustAuditor};
