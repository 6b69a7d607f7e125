// SPDX-FileCopyrightText: Copyright (c) 2025 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Priority-centric scheduling plugins.
//!
//! Three plugins compose the priority story of the scheduler:
//!
//! - [`ex_priority`] — multi-key ordering, preemption/reclaim victim
//!   filtering and head-of-line blocking;
//! - [`time_priority`] — age-based priority escalation at session open;
//! - [`group_quota`] — per-group usage accounting that de-prioritises
//!   jobs of groups exceeding their quota.
//!
//! All three share the [`priority`] selector DSL. Load order matters:
//! time-priority rewrites job priorities in place and must open before
//! the plugins that read them.

pub mod ex_priority;
pub mod group_quota;
pub mod priority;
pub mod time_priority;

use gangway_framework::PluginRegistry;

pub use ex_priority::{BlockingScope, ExPriorityConfig, ExPriorityPlugin, SortKey};
pub use group_quota::GroupQuotaPlugin;
pub use priority::{Operator, PriorityExpression, PrioritySelector};
pub use time_priority::{EscalationRule, TimePriorityPlugin};

/// Registry with the three stock plugins wired under their stable names.
pub fn default_registry() -> PluginRegistry {
    let mut registry = PluginRegistry::new();
    registry.register(ex_priority::PLUGIN_NAME, ExPriorityPlugin::factory);
    registry.register(time_priority::PLUGIN_NAME, TimePriorityPlugin::factory);
    registry.register(group_quota::PLUGIN_NAME, GroupQuotaPlugin::factory);
    registry
}
