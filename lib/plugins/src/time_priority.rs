// SPDX-FileCopyrightText: Copyright (c) 2025 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Age-based priority escalation.
//!
//! At session open the plugin walks every job and rewrites its priority in
//! place according to the first matching escalation rule, so that all
//! later-opening plugins observe the escalated value. Rules are kept in
//! descending threshold order; a job that waited long enough for several
//! rules is escalated by the longest-threshold one only.

use std::time::{Duration, SystemTime};

use serde::Deserialize;

use gangway_api::JobInfo;
use gangway_framework::{Arguments, Plugin, Session};

use crate::priority::PrioritySelector;

/// Stable identifier of this plugin in scheduler configuration.
pub const PLUGIN_NAME: &str = "time-priority";

/// Rule shape as it appears in the configuration file.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawRule {
    #[serde(default)]
    waiting_threshold: String,
    source_priority: Option<PrioritySelector>,
    #[serde(default)]
    target_priority: i32,
}

/// A validated escalation rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EscalationRule {
    pub waiting_threshold: Duration,
    pub source_priority: PrioritySelector,
    pub target_priority: i32,
}

/// The time-priority plugin.
pub struct TimePriorityPlugin {
    /// Valid rules, descending by waiting threshold.
    rules: Vec<EscalationRule>,
}

impl TimePriorityPlugin {
    pub fn new(arguments: &Arguments) -> Self {
        let rules = parse_rules(arguments);
        tracing::debug!(rules = rules.len(), "time-priority configured");
        Self { rules }
    }

    /// Factory wired into the plugin registry.
    pub fn factory(arguments: &Arguments) -> Box<dyn Plugin> {
        Box::new(Self::new(arguments))
    }

    pub fn rules(&self) -> &[EscalationRule] {
        &self.rules
    }
}

fn parse_rules(arguments: &Arguments) -> Vec<EscalationRule> {
    let Some(raw_rules) = arguments.get::<Vec<RawRule>>("rules") else {
        return Vec::new();
    };

    let mut rules = Vec::new();
    for (index, raw) in raw_rules.into_iter().enumerate() {
        let threshold = match humantime::parse_duration(&raw.waiting_threshold) {
            Ok(threshold) => threshold,
            Err(err) => {
                tracing::warn!(
                    index,
                    threshold = %raw.waiting_threshold,
                    %err,
                    "dropping rule with unparseable waitingThreshold"
                );
                continue;
            }
        };
        if threshold.is_zero() {
            tracing::warn!(index, "dropping rule with non-positive waitingThreshold");
            continue;
        }
        let Some(source_priority) = raw.source_priority else {
            tracing::warn!(index, "dropping rule without sourcePriority");
            continue;
        };
        rules.push(EscalationRule {
            waiting_threshold: threshold,
            source_priority,
            target_priority: raw.target_priority,
        });
    }

    // Longest threshold first, so the first applicable rule is the most
    // specific one for long-waiting jobs.
    rules.sort_by(|a, b| b.waiting_threshold.cmp(&a.waiting_threshold));
    rules
}

/// How long the job has been waiting as of `now`; zero when the creation
/// timestamp is unset or in the future.
fn waiting_duration(job: &JobInfo, now: SystemTime) -> Duration {
    job.creation_timestamp
        .and_then(|created| now.duration_since(created).ok())
        .unwrap_or(Duration::ZERO)
}

impl Plugin for TimePriorityPlugin {
    fn name(&self) -> &'static str {
        PLUGIN_NAME
    }

    fn on_session_open(&self, ssn: &mut Session) {
        if self.rules.is_empty() {
            tracing::debug!("no escalation rules configured, skipping");
            return;
        }

        let now = ssn.now;
        for job in ssn.jobs.values_mut() {
            let waiting = waiting_duration(job, now);
            for rule in &self.rules {
                if waiting >= rule.waiting_threshold && rule.source_priority.matches(job.priority) {
                    tracing::debug!(
                        job = %job.uid,
                        from = job.priority,
                        to = rule.target_priority,
                        waited = ?waiting,
                        threshold = ?rule.waiting_threshold,
                        "escalating job priority"
                    );
                    job.priority = rule.target_priority;
                    break;
                }
            }
        }
    }
}
