// SPDX-FileCopyrightText: Copyright (c) 2025 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Per-group quota-aware job ordering.
//!
//! At session open the plugin sums the allocated resources of every job
//! into its annotation-identified group and marks groups whose usage meets
//! or exceeds the configured quota in any resource. The only output is a
//! job-order comparator preferring jobs of under-quota groups; quota is a
//! scheduling hint, not a hard cap.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};

use gangway_api::{Quantity, ResourceList};
use gangway_framework::{Arguments, Plugin, Session};

/// Stable identifier of this plugin in scheduler configuration.
pub const PLUGIN_NAME: &str = "groupquota";

/// Annotation consulted when `annotationKey` is not configured.
pub const DEFAULT_ANNOTATION_KEY: &str = "example.com/group";

/// The groupquota plugin.
pub struct GroupQuotaPlugin {
    annotation_key: String,
    quota: ResourceList,
}

impl GroupQuotaPlugin {
    pub fn new(arguments: &Arguments) -> Self {
        let annotation_key = match arguments.get::<String>("annotationKey") {
            Some(key) => key,
            None => {
                tracing::warn!(
                    default = DEFAULT_ANNOTATION_KEY,
                    "annotationKey argument not provided, using default"
                );
                DEFAULT_ANNOTATION_KEY.to_string()
            }
        };
        let quota = parse_quota(arguments);
        tracing::debug!(annotation_key = %annotation_key, resources = quota.len(), "groupquota configured");
        Self {
            annotation_key,
            quota,
        }
    }

    /// Factory wired into the plugin registry.
    pub fn factory(arguments: &Arguments) -> Box<dyn Plugin> {
        Box::new(Self::new(arguments))
    }

    pub fn annotation_key(&self) -> &str {
        &self.annotation_key
    }

    pub fn quota(&self) -> &ResourceList {
        &self.quota
    }
}

fn parse_quota(arguments: &Arguments) -> ResourceList {
    let Some(raw) = arguments.get::<BTreeMap<String, String>>("resourceMap") else {
        return ResourceList::new();
    };

    let mut quota = ResourceList::new();
    for (name, value) in raw {
        match value.parse::<Quantity>() {
            Ok(limit) => quota.insert(name, limit),
            Err(err) => {
                tracing::warn!(resource = %name, value = %value, %err, "dropping unparseable quota entry");
            }
        }
    }
    quota
}

/// A group is over quota as soon as any quota resource it uses meets or
/// exceeds its limit; resources outside the quota table are ignored.
fn is_over_quota(usage: &ResourceList, quota: &ResourceList) -> bool {
    quota
        .iter()
        .any(|(name, limit)| usage.get(name).is_some_and(|used| used >= limit))
}

impl Plugin for GroupQuotaPlugin {
    fn name(&self) -> &'static str {
        PLUGIN_NAME
    }

    fn on_session_open(&self, ssn: &mut Session) {
        let mut group_usage: HashMap<String, ResourceList> = HashMap::new();
        for job in ssn.jobs.values() {
            if job.allocated.is_empty() {
                continue;
            }
            // Jobs without a pod group, annotations or the group key do
            // not take part in the accounting.
            let Some(group) = job.pod_group_annotation(&self.annotation_key) else {
                continue;
            };
            group_usage
                .entry(group.to_string())
                .or_default()
                .accumulate(&job.allocated);
        }

        let mut over_quota_groups: HashSet<String> = HashSet::new();
        for (group, usage) in &group_usage {
            if is_over_quota(usage, &self.quota) {
                tracing::debug!(group = %group, "group is over quota");
                over_quota_groups.insert(group.clone());
            }
        }

        let annotation_key = self.annotation_key.clone();
        ssn.add_job_order_fn(
            PLUGIN_NAME,
            Box::new(move |l, r| {
                // Jobs without the annotation belong to a group that is
                // never over quota.
                let l_over = l
                    .pod_group_annotation(&annotation_key)
                    .is_some_and(|group| over_quota_groups.contains(group));
                let r_over = r
                    .pod_group_annotation(&annotation_key)
                    .is_some_and(|group| over_quota_groups.contains(group));

                match (l_over, r_over) {
                    (true, false) => Ordering::Greater,
                    (false, true) => Ordering::Less,
                    _ => Ordering::Equal,
                }
            }),
        );
    }
}
