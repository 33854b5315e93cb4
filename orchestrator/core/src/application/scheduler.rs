// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Cycle Scheduler - background polling of installed agents
//!
//! One tokio task per agent, ticking on the agent's own scan interval. The
//! first tick fires after the job's start delay, immediately by default. A
//! tick runs one full cycle; the next tick waits for it to finish. Cancelling the
//! shutdown token stops every task between cycles, never in the middle of one.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Cooperative scheduling of agent cycles

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::application::cycle_service::CycleService;
use crate::domain::agent::DomainAgent;
use crate::domain::layer::LayerManifest;

/// An installed layer's agent and its tick interval.
#[derive(Clone)]
pub struct ScheduledAgent {
    pub layer: LayerManifest,
    pub agent: Arc<dyn DomainAgent>,
    pub interval: Duration,
    pub start_delay: Duration,
}

impl ScheduledAgent {
    /// Uses the manifest's scan interval unless `overrides` names the agent.
    /// `None` when the layer has no agent.
    pub fn new(
        layer: LayerManifest,
        agent: Arc<dyn DomainAgent>,
        overrides: &HashMap<String, u64>,
    ) -> Option<Self> {
        let config = layer.agent.as_ref()?;
        let secs = overrides
            .get(config.agent_id.as_str())
            .copied()
            .unwrap_or(config.scan_interval_secs)
            .max(1);
        Some(Self {
            interval: Duration::from_secs(secs),
            start_delay: Duration::ZERO,
            layer,
            agent,
        })
    }

    /// Skip the immediate first tick, e.g. after a cycle was just run.
    pub fn starting_after_one_interval(mut self) -> Self {
        self.start_delay = self.interval;
        self
    }
}

pub struct CycleScheduler {
    service: Arc<CycleService>,
    jobs: Vec<ScheduledAgent>,
    shutdown_token: CancellationToken,
}

impl CycleScheduler {
    pub fn new(service: Arc<CycleService>, jobs: Vec<ScheduledAgent>) -> Self {
        Self {
            service,
            jobs,
            shutdown_token: CancellationToken::new(),
        }
    }

    /// Get a handle to trigger shutdown
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown_token.clone()
    }

    /// Spawn one polling task per agent.
    pub fn start(self) -> Vec<JoinHandle<()>> {
        info!(agents = self.jobs.len(), "Starting cycle scheduler");
        self.jobs
            .into_iter()
            .map(|job| {
                let service = self.service.clone();
                let token = self.shutdown_token.clone();
                tokio::spawn(async move { run_job(service, job, token).await })
            })
            .collect()
    }
}

async fn run_job(service: Arc<CycleService>, job: ScheduledAgent, token: CancellationToken) {
    let mut tick = interval_at(Instant::now() + job.start_delay, job.interval);
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!(
        layer_id = %job.layer.id,
        interval_secs = job.interval.as_secs(),
        "Scheduling agent"
    );

    loop {
        tokio::select! {
            _ = tick.tick() => {
                debug!(layer_id = %job.layer.id, "Running scheduled cycle");
                match service.run_agent(&job.layer, job.agent.clone()).await {
                    Ok(summary) => debug!(
                        agent_id = %summary.agent_id,
                        executed = summary.outcome.executed.len(),
                        "Scheduled cycle completed"
                    ),
                    Err(e) => warn!(layer_id = %job.layer.id, "Scheduled cycle failed: {:#}", e),
                }
            }
            _ = token.cancelled() => {
                info!(layer_id = %job.layer.id, "Shutdown signal received, stopping agent schedule");
                break;
            }
        }
    }
}
