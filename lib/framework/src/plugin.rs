// SPDX-FileCopyrightText: Copyright (c) 2025 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Plugin contract and name-based registry.

use std::collections::HashMap;

use crate::arguments::Arguments;
use crate::session::Session;

/// A scheduler plugin.
///
/// Plugins are constructed once per session from their [`Arguments`] and
/// participate in the session through the hooks below. A plugin must not
/// keep state across sessions.
pub trait Plugin {
    /// Stable identifier used in scheduler configuration.
    fn name(&self) -> &'static str;

    /// Called when the session opens. The plugin may inspect and mutate
    /// the job snapshot and registers its callbacks here.
    ///
    /// Plugins run in load order; a plugin that rewrites job priorities
    /// must be loaded before the plugins that read them.
    fn on_session_open(&self, ssn: &mut Session);

    /// Called when the session closes. Session-scoped state dies with the
    /// registered callbacks, so most plugins have nothing to do here.
    fn on_session_close(&self, _ssn: &mut Session) {}
}

/// Constructor for a plugin, keyed by its stable name in the registry.
pub type PluginFactory = fn(&Arguments) -> Box<dyn Plugin>;

/// Maps stable plugin names to their factories.
#[derive(Default)]
pub struct PluginRegistry {
    factories: HashMap<&'static str, PluginFactory>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: &'static str, factory: PluginFactory) {
        if self.factories.insert(name, factory).is_some() {
            tracing::warn!(plugin = name, "plugin factory re-registered, replacing");
        }
    }

    /// Build the named plugin, or `None` (with a warning) for an unknown
    /// name so a misspelled configuration entry degrades to a no-op.
    pub fn build(&self, name: &str, arguments: &Arguments) -> Option<Box<dyn Plugin>> {
        match self.factories.get(name) {
            Some(factory) => Some(factory(arguments)),
            None => {
                tracing::warn!(plugin = name, "unknown plugin name, skipping");
                None
            }
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.factories.keys().copied()
    }
}

impl std::fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginRegistry")
            .field("names", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}
