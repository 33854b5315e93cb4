// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Concrete [`DomainAgent`](crate::domain::agent::DomainAgent) strategies.
//!
//! | Agent id | Strategy | Writes to |
//! |----------|----------|-----------|
//! | `infra-agent` | [`InfrastructureHealthAgent`] | `health_checks` |
//! | `compliance-agent` | [`ComplianceAgent`] | `compliance_checks` |
//! | `pipeline-agent` | [`PipelineAgent`] | `contacts`, `event_log`, external CRM |

pub mod compliance;
pub mod infrastructure_health;
pub mod pipeline;

pub use compliance::ComplianceAgent;
pub use infrastructure_health::InfrastructureHealthAgent;
pub use pipeline::PipelineAgent;
