// SPDX-FileCopyrightText: Copyright (c) 2025 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! The per-session callback surface.
//!
//! Plugins register comparators and predicates during session open; the
//! host drives its decisions through the dispatch methods, which compose
//! all registered callbacks of a kind:
//!
//! - ordering: first non-[`Ordering::Equal`] answer wins, in registration
//!   order;
//! - enqueueable: first non-[`Verdict::Abstain`] verdict wins;
//! - valid: first failing [`ValidateResult`] wins;
//! - preemptable/reclaimable: intersection of the victim subsets of every
//!   permitting filter;
//! - starving: conjunction of all predicates.
//!
//! Registration order is the plugin load order, so a plugin that rewrites
//! job priorities (time-priority) must be loaded before the plugins that
//! read them.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::time::SystemTime;

use uuid::Uuid;

use gangway_api::{JobId, JobInfo, SubJobInfo, TaskId, TaskInfo};

/// Vote returned by admission-style predicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Permit,
    Reject,
    Abstain,
}

/// Outcome of a job validity check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidateResult {
    pub pass: bool,
    pub reason: String,
    pub message: String,
}

pub type TaskOrderFn = Box<dyn Fn(&TaskInfo, &TaskInfo) -> Ordering + Send + Sync>;
pub type JobOrderFn = Box<dyn Fn(&JobInfo, &JobInfo) -> Ordering + Send + Sync>;
pub type SubJobOrderFn = Box<dyn Fn(&SubJobInfo, &SubJobInfo) -> Ordering + Send + Sync>;
pub type JobEnqueueableFn = Box<dyn Fn(&Session, &JobInfo) -> Verdict + Send + Sync>;
pub type JobValidFn = Box<dyn Fn(&Session, &JobInfo) -> Option<ValidateResult> + Send + Sync>;
/// Filters a candidate victim list for preemption or reclaim: takes the
/// acting task and the candidates, returns the eligible subset.
pub type VictimFilterFn =
    Box<dyn Fn(&Session, &TaskInfo, &[&TaskInfo]) -> (Vec<TaskId>, Verdict) + Send + Sync>;
pub type JobStarvingFn = Box<dyn Fn(&JobInfo) -> bool + Send + Sync>;

/// One scheduling cycle: a snapshot of jobs plus the callbacks registered
/// against it. Owned and driven by a single thread.
pub struct Session {
    pub uid: Uuid,
    /// Wall-clock snapshot taken at session open. Every time comparison
    /// inside callbacks uses this instant.
    pub now: SystemTime,
    pub jobs: HashMap<JobId, JobInfo>,

    task_order_fns: Vec<(String, TaskOrderFn)>,
    job_order_fns: Vec<(String, JobOrderFn)>,
    sub_job_order_fns: Vec<(String, SubJobOrderFn)>,
    job_enqueueable_fns: Vec<(String, JobEnqueueableFn)>,
    job_valid_fns: Vec<(String, JobValidFn)>,
    preemptable_fns: Vec<(String, VictimFilterFn)>,
    reclaimable_fns: Vec<(String, VictimFilterFn)>,
    job_starving_fns: Vec<(String, JobStarvingFn)>,
}

impl Session {
    pub fn new(now: SystemTime) -> Self {
        Self {
            uid: Uuid::new_v4(),
            now,
            jobs: HashMap::new(),
            task_order_fns: Vec::new(),
            job_order_fns: Vec::new(),
            sub_job_order_fns: Vec::new(),
            job_enqueueable_fns: Vec::new(),
            job_valid_fns: Vec::new(),
            preemptable_fns: Vec::new(),
            reclaimable_fns: Vec::new(),
            job_starving_fns: Vec::new(),
        }
    }

    pub fn add_job(&mut self, job: JobInfo) {
        self.jobs.insert(job.uid.clone(), job);
    }

    pub fn job(&self, id: &JobId) -> Option<&JobInfo> {
        self.jobs.get(id)
    }

    // Registration surface.

    pub fn add_task_order_fn(&mut self, plugin: impl Into<String>, f: TaskOrderFn) {
        self.task_order_fns.push((plugin.into(), f));
    }

    pub fn add_job_order_fn(&mut self, plugin: impl Into<String>, f: JobOrderFn) {
        self.job_order_fns.push((plugin.into(), f));
    }

    pub fn add_sub_job_order_fn(&mut self, plugin: impl Into<String>, f: SubJobOrderFn) {
        self.sub_job_order_fns.push((plugin.into(), f));
    }

    pub fn add_job_enqueueable_fn(&mut self, plugin: impl Into<String>, f: JobEnqueueableFn) {
        self.job_enqueueable_fns.push((plugin.into(), f));
    }

    pub fn add_job_valid_fn(&mut self, plugin: impl Into<String>, f: JobValidFn) {
        self.job_valid_fns.push((plugin.into(), f));
    }

    pub fn add_preemptable_fn(&mut self, plugin: impl Into<String>, f: VictimFilterFn) {
        self.preemptable_fns.push((plugin.into(), f));
    }

    pub fn add_reclaimable_fn(&mut self, plugin: impl Into<String>, f: VictimFilterFn) {
        self.reclaimable_fns.push((plugin.into(), f));
    }

    pub fn add_job_starving_fn(&mut self, plugin: impl Into<String>, f: JobStarvingFn) {
        self.job_starving_fns.push((plugin.into(), f));
    }

    // Dispatch: how the host composes the registered callbacks.

    /// Compare two tasks; the first plugin with an opinion decides.
    pub fn task_order(&self, l: &TaskInfo, r: &TaskInfo) -> Ordering {
        for (plugin, f) in &self.task_order_fns {
            let ord = f(l, r);
            if ord != Ordering::Equal {
                tracing::trace!(plugin = %plugin, left = %l.uid, right = %r.uid, ?ord, "task order decided");
                return ord;
            }
        }
        Ordering::Equal
    }

    /// Compare two jobs; the first plugin with an opinion decides.
    pub fn job_order(&self, l: &JobInfo, r: &JobInfo) -> Ordering {
        for (plugin, f) in &self.job_order_fns {
            let ord = f(l, r);
            if ord != Ordering::Equal {
                tracing::trace!(plugin = %plugin, left = %l.uid, right = %r.uid, ?ord, "job order decided");
                return ord;
            }
        }
        Ordering::Equal
    }

    /// Compare two sub-jobs; the first plugin with an opinion decides.
    pub fn sub_job_order(&self, l: &SubJobInfo, r: &SubJobInfo) -> Ordering {
        for (_, f) in &self.sub_job_order_fns {
            let ord = f(l, r);
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }

    /// Whether a job may be moved into the scheduling queue.
    ///
    /// The first non-abstaining plugin decides; with no opinions the
    /// verdict is [`Verdict::Abstain`] and the host applies its default.
    pub fn job_enqueueable(&self, job: &JobInfo) -> Verdict {
        for (plugin, f) in &self.job_enqueueable_fns {
            match f(self, job) {
                Verdict::Abstain => continue,
                verdict => {
                    tracing::debug!(plugin = %plugin, job = %job.uid, ?verdict, "enqueue verdict");
                    return verdict;
                }
            }
        }
        Verdict::Abstain
    }

    /// Run validity checks; returns the first failing result, if any.
    pub fn job_valid(&self, job: &JobInfo) -> Option<ValidateResult> {
        for (plugin, f) in &self.job_valid_fns {
            if let Some(result) = f(self, job) {
                if !result.pass {
                    tracing::debug!(plugin = %plugin, job = %job.uid, reason = %result.reason, "job invalid");
                    return Some(result);
                }
            }
        }
        None
    }

    /// Victims every permitting plugin agrees may be preempted for `actor`.
    pub fn preemptable(&self, actor: &TaskInfo, candidates: &[&TaskInfo]) -> Vec<TaskId> {
        self.filter_victims(&self.preemptable_fns, actor, candidates)
    }

    /// Victims every permitting plugin agrees may be reclaimed for `actor`.
    pub fn reclaimable(&self, actor: &TaskInfo, candidates: &[&TaskInfo]) -> Vec<TaskId> {
        self.filter_victims(&self.reclaimable_fns, actor, candidates)
    }

    fn filter_victims(
        &self,
        fns: &[(String, VictimFilterFn)],
        actor: &TaskInfo,
        candidates: &[&TaskInfo],
    ) -> Vec<TaskId> {
        let mut agreed: Option<HashSet<TaskId>> = None;
        for (_, f) in fns {
            let (victims, verdict) = f(self, actor, candidates);
            if verdict != Verdict::Permit {
                continue;
            }
            let subset: HashSet<TaskId> = victims.into_iter().collect();
            agreed = Some(match agreed {
                None => subset,
                Some(prev) => prev.intersection(&subset).cloned().collect(),
            });
        }
        let Some(agreed) = agreed else {
            return Vec::new();
        };
        // Preserve the candidate order in the returned subset.
        candidates
            .iter()
            .filter(|t| agreed.contains(&t.uid))
            .map(|t| t.uid.clone())
            .collect()
    }

    /// Whether a job is starving for resources: every registered predicate
    /// must agree. With no predicates registered, no job is starving.
    pub fn job_starving(&self, job: &JobInfo) -> bool {
        if self.job_starving_fns.is_empty() {
            return false;
        }
        self.job_starving_fns.iter().all(|(_, f)| f(job))
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("uid", &self.uid)
            .field("now", &self.now)
            .field("jobs", &self.jobs.len())
            .field("task_order_fns", &self.task_order_fns.len())
            .field("job_order_fns", &self.job_order_fns.len())
            .field("sub_job_order_fns", &self.sub_job_order_fns.len())
            .field("job_enqueueable_fns", &self.job_enqueueable_fns.len())
            .field("job_valid_fns", &self.job_valid_fns.len())
            .field("preemptable_fns", &self.preemptable_fns.len())
            .field("reclaimable_fns", &self.reclaimable_fns.len())
            .field("job_starving_fns", &self.job_starving_fns.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> Session {
        Session::new(SystemTime::UNIX_EPOCH)
    }

    fn job(uid: &str, priority: i32) -> JobInfo {
        let mut job = JobInfo::new(uid, uid, "default");
        job.priority = priority;
        job
    }

    #[test]
    fn job_order_first_opinion_wins() {
        let mut ssn = session();
        ssn.add_job_order_fn("undecided", Box::new(|_, _| Ordering::Equal));
        ssn.add_job_order_fn("by-priority", Box::new(|l, r| r.priority.cmp(&l.priority)));
        ssn.add_job_order_fn("reversed", Box::new(|l, r| l.priority.cmp(&r.priority)));

        let high = job("high", 10);
        let low = job("low", 1);

        // The second plugin decides; the third is never consulted.
        assert_eq!(ssn.job_order(&high, &low), Ordering::Less);
        assert_eq!(ssn.job_order(&low, &high), Ordering::Greater);
        assert_eq!(ssn.job_order(&high, &high), Ordering::Equal);
    }

    #[test]
    fn enqueueable_first_non_abstain_wins() {
        let mut ssn = session();
        ssn.add_job_enqueueable_fn("quiet", Box::new(|_, _| Verdict::Abstain));
        ssn.add_job_enqueueable_fn("gate", Box::new(|_, j| {
            if j.priority < 0 {
                Verdict::Reject
            } else {
                Verdict::Permit
            }
        }));
        ssn.add_job_enqueueable_fn("always-no", Box::new(|_, _| Verdict::Reject));

        assert_eq!(ssn.job_enqueueable(&job("ok", 5)), Verdict::Permit);
        assert_eq!(ssn.job_enqueueable(&job("bad", -1)), Verdict::Reject);
    }

    #[test]
    fn enqueueable_all_abstain() {
        let mut ssn = session();
        ssn.add_job_enqueueable_fn("quiet", Box::new(|_, _| Verdict::Abstain));
        assert_eq!(ssn.job_enqueueable(&job("j", 0)), Verdict::Abstain);
        // No callbacks at all behaves the same.
        let empty = session();
        assert_eq!(empty.job_enqueueable(&job("j", 0)), Verdict::Abstain);
    }

    #[test]
    fn job_valid_returns_first_failure() {
        let mut ssn = session();
        ssn.add_job_valid_fn("no-opinion", Box::new(|_, _| None));
        ssn.add_job_valid_fn("checker", Box::new(|_, j| {
            (j.priority < 0).then(|| ValidateResult {
                pass: false,
                reason: "negative priority".to_string(),
                message: String::new(),
            })
        }));

        assert!(ssn.job_valid(&job("fine", 1)).is_none());
        let failure = ssn.job_valid(&job("broken", -2)).unwrap();
        assert_eq!(failure.reason, "negative priority");
    }

    #[test]
    fn victim_filters_intersect() {
        let mut ssn = session();
        ssn.add_preemptable_fn("evens", Box::new(|_, _, cands| {
            let picks = cands
                .iter()
                .filter(|t| t.priority % 2 == 0)
                .map(|t| t.uid.clone())
                .collect();
            (picks, Verdict::Permit)
        }));
        ssn.add_preemptable_fn("low", Box::new(|_, _, cands| {
            let picks = cands
                .iter()
                .filter(|t| t.priority < 3)
                .map(|t| t.uid.clone())
                .collect();
            (picks, Verdict::Permit)
        }));

        let actor = TaskInfo::new("actor", "j0", "actor");
        let mut tasks = Vec::new();
        for (name, priority) in [("t0", 0), ("t1", 1), ("t2", 2), ("t4", 4)] {
            let mut t = TaskInfo::new(name, "j1", name);
            t.priority = priority;
            tasks.push(t);
        }
        let candidates: Vec<&TaskInfo> = tasks.iter().collect();

        // evens ∩ low = {t0, t2}, in candidate order.
        let victims = ssn.preemptable(&actor, &candidates);
        assert_eq!(victims, vec![TaskId::new("t0"), TaskId::new("t2")]);
    }

    #[test]
    fn victim_filter_without_permit_yields_nothing() {
        let mut ssn = session();
        ssn.add_reclaimable_fn("undecided", Box::new(|_, _, _| (Vec::new(), Verdict::Abstain)));

        let actor = TaskInfo::new("actor", "j0", "actor");
        let victim = TaskInfo::new("v", "j1", "v");
        assert!(ssn.reclaimable(&actor, &[&victim]).is_empty());

        // No filters registered at all: the host gets no victims either.
        let empty = session();
        assert!(empty.preemptable(&actor, &[&victim]).is_empty());
    }

    #[test]
    fn starving_is_a_conjunction() {
        let mut ssn = session();
        assert!(!ssn.job_starving(&job("j", 0)));

        ssn.add_job_starving_fn("yes", Box::new(|_| true));
        assert!(ssn.job_starving(&job("j", 0)));

        ssn.add_job_starving_fn("no", Box::new(|_| false));
        assert!(!ssn.job_starving(&job("j", 0)));
    }
}
