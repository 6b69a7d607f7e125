// SPDX-FileCopyrightText: Copyright (c) 2025 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Resource vectors and named quantity tables.

use std::collections::{BTreeMap, HashMap};

use crate::quantity::Quantity;

/// Canonical name of the CPU resource.
pub const RESOURCE_CPU: &str = "cpu";
/// Canonical name of the memory resource.
pub const RESOURCE_MEMORY: &str = "memory";

/// Resource vector attached to jobs by the host cache.
///
/// CPU is tracked in milli-cores and memory in bytes, both as floats to
/// match the host's accounting. Extended resources (GPUs, licenses, ...)
/// live in `scalar_resources` keyed by their full name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resource {
    pub milli_cpu: f64,
    pub memory: f64,
    pub scalar_resources: HashMap<String, f64>,
}

impl Resource {
    /// A vector with the given CPU (milli-cores) and memory (bytes).
    pub fn new(milli_cpu: f64, memory: f64) -> Self {
        Self {
            milli_cpu,
            memory,
            scalar_resources: HashMap::new(),
        }
    }

    /// True when every dimension of the vector is zero.
    pub fn is_empty(&self) -> bool {
        self.milli_cpu <= 0.0
            && self.memory <= 0.0
            && self.scalar_resources.values().all(|v| *v <= 0.0)
    }
}

/// A table of named quantities, ordered by resource name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceList {
    entries: BTreeMap<String, Quantity>,
}

impl ResourceList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Quantity> {
        self.entries.get(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, quantity: Quantity) {
        self.entries.insert(name.into(), quantity);
    }

    /// Add `quantity` to the named entry, creating it if absent.
    pub fn add(&mut self, name: impl Into<String>, quantity: Quantity) {
        *self.entries.entry(name.into()).or_default() += quantity;
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Quantity)> {
        self.entries.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Accumulate a host resource vector into this table.
    ///
    /// Milli-CPU lands under `cpu`, bytes under `memory`, and each scalar
    /// resource under its own name in base units. Zero CPU and memory are
    /// skipped; scalar entries are taken as the host reports them.
    pub fn accumulate(&mut self, res: &Resource) {
        if res.milli_cpu > 0.0 {
            self.add(RESOURCE_CPU, Quantity::from_milli(res.milli_cpu as i128));
        }
        if res.memory > 0.0 {
            self.add(RESOURCE_MEMORY, Quantity::from_units(res.memory as i128));
        }
        for (name, value) in &res.scalar_resources {
            self.add(name.clone(), Quantity::from_units(*value as i128));
        }
    }
}

impl FromIterator<(String, Quantity)> for ResourceList {
    fn from_iter<T: IntoIterator<Item = (String, Quantity)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}
