// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Domain model: layers, agents, the trust ladder and the store interfaces.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Pure types and traits; no I/O beyond config file loading

pub mod action;
pub mod agent;
pub mod catalog;
pub mod content;
pub mod errors;
pub mod events;
pub mod layer;
pub mod learning;
pub mod node_config;
pub mod relationship;
pub mod repository;
pub mod scan;
pub mod trust;
