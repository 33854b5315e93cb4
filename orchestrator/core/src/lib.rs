// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Lib
//!
//! Core of the Trellis layer orchestrator: layer manifests, the trust ladder,
//! the shared agent control loop, and the registry/installer.
//!
//! # Architecture
//!
//! - **Layer:** Core System
//! - **Purpose:** Domain model, application services and infrastructure adapters

pub mod application;
pub mod domain;
pub mod infrastructure;

pub use domain::*;
