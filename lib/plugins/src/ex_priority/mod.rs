// SPDX-FileCopyrightText: Copyright (c) 2025 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Extended priority plugin.
//!
//! Covers the whole priority story of a session: multi-key task/job/sub-job
//! ordering, selector-gated preemption and reclaim victim filtering with a
//! max-run-time override, head-of-line blocking for job admission, and a
//! starvation predicate.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;
use std::time::SystemTime;

use gangway_api::{JobInfo, SubJobInfo, TaskId, TaskInfo};
use gangway_framework::{Arguments, Plugin, Session, ValidateResult, Verdict};

use crate::priority::PrioritySelector;


/// Stable identifier of this plugin in scheduler configuration.
pub const PLUGIN_NAME: &str = "ex-priority";

/// One key of the configurable sort order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Priority,
    CreationTime,
}

/// How widely a blocking job gates the admission of lower-priority jobs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BlockingScope {
    /// Blocking jobs gate every queue.
    Cluster,
    /// Blocking jobs only gate their own queue.
    #[default]
    Queue,
}

impl fmt::Display for BlockingScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BlockingScope::Cluster => "cluster",
            BlockingScope::Queue => "queue",
        })
    }
}

/// Parsed plugin configuration.
#[derive(Debug, Clone)]
pub struct ExPriorityConfig {
    /// Comparison keys tried left to right; the first non-equal one wins.
    pub sort_order: Vec<SortKey>,
    /// Job priorities whose tasks may be preempted. `None` leaves the
    /// priority gate open.
    pub preemptible: Option<PrioritySelector>,
    /// Job priorities whose tasks may be reclaimed.
    pub reclaimable: Option<PrioritySelector>,
    /// Job priorities that cause head-of-line blocking while pending.
    pub blocking: Option<PrioritySelector>,
    pub blocking_scope: BlockingScope,
    /// Pod annotation holding a task's maximum run time. A task past its
    /// limit is always an eligible victim.
    pub max_run_time_annotation_key: Option<String>,
}

impl Default for ExPriorityConfig {
    fn default() -> Self {
        Self {
            sort_order: vec![SortKey::Priority],
            preemptible: None,
            reclaimable: None,
            blocking: None,
            blocking_scope: BlockingScope::default(),
            max_run_time_annotation_key: None,
        }
    }
}

impl ExPriorityConfig {
    fn from_arguments(arguments: &Arguments) -> Self {
        let mut config = Self::default();

        if let Some(raw_order) = arguments.get::<Vec<String>>("sortOrder") {
            config.sort_order = raw_order
                .iter()
                .filter_map(|key| match key.as_str() {
                    "priority" => Some(SortKey::Priority),
                    "creationTime" => Some(SortKey::CreationTime),
                    other => {
                        tracing::warn!(key = other, "dropping unknown sortOrder key");
                        None
                    }
                })
                .collect();
            tracing::debug!(sort_order = ?config.sort_order, "ex-priority sortOrder");
        }

        config.preemptible = arguments.get("preemptible");
        config.reclaimable = arguments.get("reclaimable");
        config.blocking = arguments.get("blocking");

        if let Some(scope) = arguments.get::<String>("blockingScope") {
            config.blocking_scope = match scope.as_str() {
                "cluster" => BlockingScope::Cluster,
                "queue" => BlockingScope::Queue,
                other => {
                    tracing::warn!(scope = other, "unknown blockingScope, using queue");
                    BlockingScope::Queue
                }
            };
        }

        config.max_run_time_annotation_key = arguments
            .get::<String>("maxRunTimeAnnotationKey")
            .filter(|key| !key.is_empty());

        config
    }
}

/// The extended priority plugin.
pub struct ExPriorityPlugin {
    config: Arc<ExPriorityConfig>,
}

impl ExPriorityPlugin {
    pub fn new(arguments: &Arguments) -> Self {
        let config = ExPriorityConfig::from_arguments(arguments);
        tracing::debug!(?config, "ex-priority configured");
        Self {
            config: Arc::new(config),
        }
    }

    /// Factory wired into the plugin registry.
    pub fn factory(arguments: &Arguments) -> Box<dyn Plugin> {
        Box::new(Self::new(arguments))
    }

    pub fn config(&self) -> &ExPriorityConfig {
        &self.config
    }
}

/// Ordering key for a task's creation: the pod's start time when set, else
/// the pod's creation timestamp.
fn task_creation_time(task: &TaskInfo) -> Option<SystemTime> {
    let pod = task.pod.as_ref()?;
    pod.start_time.or(pod.creation_timestamp)
}

/// Higher priority orders first.
fn by_priority_desc(l: i32, r: i32) -> Ordering {
    r.cmp(&l)
}

fn compare_tasks(config: &ExPriorityConfig, l: &TaskInfo, r: &TaskInfo) -> Ordering {
    for key in &config.sort_order {
        match key {
            SortKey::Priority => {
                let ord = by_priority_desc(l.priority, r.priority);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            SortKey::CreationTime => {
                // A task without a timestamp defers to the next key.
                if let (Some(lt), Some(rt)) = (task_creation_time(l), task_creation_time(r)) {
                    if lt != rt {
                        return lt.cmp(&rt);
                    }
                }
            }
        }
    }
    Ordering::Equal
}

fn compare_jobs(config: &ExPriorityConfig, l: &JobInfo, r: &JobInfo) -> Ordering {
    for key in &config.sort_order {
        match key {
            SortKey::Priority => {
                let ord = by_priority_desc(l.priority, r.priority);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            SortKey::CreationTime => {
                if let (Some(lt), Some(rt)) = (l.creation_timestamp, r.creation_timestamp) {
                    if lt != rt {
                        return lt.cmp(&rt);
                    }
                }
            }
        }
    }
    Ordering::Equal
}

/// Sub-jobs carry no timestamp, so only the priority key applies.
fn compare_sub_jobs(config: &ExPriorityConfig, l: &SubJobInfo, r: &SubJobInfo) -> Ordering {
    for key in &config.sort_order {
        if let SortKey::Priority = key {
            let ord = by_priority_desc(l.priority, r.priority);
            if ord != Ordering::Equal {
                return ord;
            }
        }
    }
    Ordering::Equal
}

/// Whether the task has outlived the run time granted by its max-run-time
/// annotation as of `now`.
fn is_task_timed_out(config: &ExPriorityConfig, task: &TaskInfo, now: SystemTime) -> bool {
    let Some(key) = config.max_run_time_annotation_key.as_deref() else {
        return false;
    };
    let Some(pod) = task.pod.as_ref() else {
        return false;
    };
    let Some(value) = pod.annotations.get(key) else {
        return false;
    };
    let Some(start_time) = pod.start_time else {
        return false;
    };
    match humantime::parse_duration(value) {
        Ok(max_run_time) if !max_run_time.is_zero() => start_time
            .checked_add(max_run_time)
            .is_some_and(|deadline| deadline <= now),
        Ok(_) => false,
        Err(err) => {
            tracing::debug!(task = %task.uid, value = %value, %err, "unparseable max run time annotation");
            false
        }
    }
}

/// Whether a pending job matching the blocking selector with a strictly
/// higher priority exists in `job`'s scope.
fn has_blocking_job_ahead(config: &ExPriorityConfig, ssn: &Session, job: &JobInfo) -> bool {
    let Some(blocking) = config.blocking.as_ref() else {
        return false;
    };

    for other in ssn.jobs.values() {
        if !other.is_pending() {
            continue;
        }
        if other.uid == job.uid {
            continue;
        }
        if config.blocking_scope == BlockingScope::Queue && other.queue != job.queue {
            continue;
        }
        if blocking.matches(other.priority) && other.priority > job.priority {
            tracing::debug!(
                job = %job.uid,
                priority = job.priority,
                blocker = %other.uid,
                blocker_priority = other.priority,
                "job blocked by higher priority job"
            );
            return true;
        }
    }
    false
}

/// Shared body of the preemption and reclaim predicates; only the gating
/// selector differs.
fn filter_victims(
    config: &ExPriorityConfig,
    selector: Option<&PrioritySelector>,
    ssn: &Session,
    actor: &TaskInfo,
    candidates: &[&TaskInfo],
) -> Vec<TaskId> {
    let Some(actor_job) = ssn.job(&actor.job) else {
        tracing::debug!(task = %actor.uid, job = %actor.job, "acting task's job not in session");
        return Vec::new();
    };

    let mut victims = Vec::new();
    for candidate in candidates {
        let Some(candidate_job) = ssn.job(&candidate.job) else {
            continue;
        };

        if is_task_timed_out(config, candidate, ssn.now) {
            tracing::debug!(
                task = %candidate.uid,
                job_priority = candidate_job.priority,
                "allowing eviction of timed-out task"
            );
            victims.push(candidate.uid.clone());
            continue;
        }

        if let Some(selector) = selector {
            if !selector.matches(candidate_job.priority) {
                tracing::trace!(
                    task = %candidate.uid,
                    job_priority = candidate_job.priority,
                    "candidate outside the eligible priority range"
                );
                continue;
            }
        }

        let eligible = if candidate_job.uid != actor_job.uid {
            // Across jobs, job priorities decide.
            candidate_job.priority < actor_job.priority
        } else {
            // Within one job, task priorities decide.
            candidate.priority < actor.priority
        };
        if eligible {
            victims.push(candidate.uid.clone());
        } else {
            tracing::trace!(
                task = %candidate.uid,
                "candidate has greater or equal priority than actor"
            );
        }
    }
    victims
}

impl Plugin for ExPriorityPlugin {
    fn name(&self) -> &'static str {
        PLUGIN_NAME
    }

    fn on_session_open(&self, ssn: &mut Session) {
        let config = Arc::clone(&self.config);
        ssn.add_task_order_fn(
            PLUGIN_NAME,
            Box::new(move |l, r| compare_tasks(&config, l, r)),
        );

        let config = Arc::clone(&self.config);
        ssn.add_job_order_fn(
            PLUGIN_NAME,
            Box::new(move |l, r| compare_jobs(&config, l, r)),
        );

        let config = Arc::clone(&self.config);
        ssn.add_sub_job_order_fn(
            PLUGIN_NAME,
            Box::new(move |l, r| compare_sub_jobs(&config, l, r)),
        );

        if self.config.blocking.is_some() {
            // Head-of-line blocking gates jobs twice: once when they are
            // moved into the queue and again when they are validated for
            // allocation.
            let config = Arc::clone(&self.config);
            ssn.add_job_enqueueable_fn(
                PLUGIN_NAME,
                Box::new(move |ssn, job| {
                    let Some(blocking) = config.blocking.as_ref() else {
                        return Verdict::Abstain;
                    };
                    // Blocking-priority jobs are never gated by each other
                    // here; ordering already ranks them.
                    if blocking.matches(job.priority) {
                        return Verdict::Permit;
                    }
                    if has_blocking_job_ahead(&config, ssn, job) {
                        return Verdict::Reject;
                    }
                    Verdict::Abstain
                }),
            );

            let config = Arc::clone(&self.config);
            ssn.add_job_valid_fn(
                PLUGIN_NAME,
                Box::new(move |ssn, job| {
                    let blocking = config.blocking.as_ref()?;
                    if blocking.matches(job.priority) {
                        return None;
                    }
                    if has_blocking_job_ahead(&config, ssn, job) {
                        return Some(ValidateResult {
                            pass: false,
                            reason: "blocked by higher priority job".to_string(),
                            message: format!(
                                "head-of-line blocking: higher priority job is pending (scope: {})",
                                config.blocking_scope
                            ),
                        });
                    }
                    None
                }),
            );
        }

        let config = Arc::clone(&self.config);
        ssn.add_preemptable_fn(
            PLUGIN_NAME,
            Box::new(move |ssn, actor, candidates| {
                let victims =
                    filter_victims(&config, config.preemptible.as_ref(), ssn, actor, candidates);
                (victims, Verdict::Permit)
            }),
        );

        let config = Arc::clone(&self.config);
        ssn.add_reclaimable_fn(
            PLUGIN_NAME,
            Box::new(move |ssn, actor, candidates| {
                let victims =
                    filter_victims(&config, config.reclaimable.as_ref(), ssn, actor, candidates);
                (victims, Verdict::Permit)
            }),
        );

        ssn.add_job_starving_fn(
            PLUGIN_NAME,
            Box::new(|job| job.ready_task_num + job.waiting_task_num < job.task_count()),
        );
    }
}
