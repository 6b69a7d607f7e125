// SPDX-FileCopyrightText: Copyright (c) 2025 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! End-to-end scenarios driving full sessions through the plugin registry,
//! with the documented load order: time-priority first, then the plugins
//! that read job priorities.

use std::cmp::Ordering;
use std::time::{Duration, SystemTime};

use serde_json::json;

use gangway_api::{JobInfo, PodGroup, Resource, TaskId, TaskInfo};
use gangway_framework::{Arguments, Plugin, Session, Verdict};
use gangway_plugins::default_registry;

fn at(secs: u64) -> SystemTime {
    SystemTime::UNIX_EPOCH + Duration::from_secs(secs)
}

fn job(uid: &str, queue: &str, priority: i32) -> JobInfo {
    let mut job = JobInfo::new(uid, uid, queue);
    job.priority = priority;
    job
}

fn build_plugins(specs: &[(&str, serde_json::Value)]) -> Vec<Box<dyn Plugin>> {
    let registry = default_registry();
    specs
        .iter()
        .map(|(name, args)| {
            registry
                .build(name, &Arguments::from(args.clone()))
                .expect(name)
        })
        .collect()
}

fn open_all(plugins: &[Box<dyn Plugin>], ssn: &mut Session) {
    for plugin in plugins {
        plugin.on_session_open(ssn);
    }
}

fn close_all(plugins: &[Box<dyn Plugin>], ssn: &mut Session) {
    for plugin in plugins {
        plugin.on_session_close(ssn);
    }
}

#[test]
fn escalated_priority_is_visible_to_ordering_plugins() {
    // time-priority promotes the old job from 10 to 100; ex-priority then
    // ranks it above the fresh job with priority 50.
    let now = at(1_000_000);
    let plugins = build_plugins(&[
        (
            "time-priority",
            json!({
                "rules": [{
                    "waitingThreshold": "10m",
                    "sourcePriority": {"anyExpressions": [{"operator": "Between", "values": [0, 50]}]},
                    "targetPriority": 100,
                }],
            }),
        ),
        ("ex-priority", json!({})),
    ]);

    let mut ssn = Session::new(now);
    let mut old = job("old", "q", 10);
    old.creation_timestamp = Some(now - Duration::from_secs(30 * 60));
    let mut fresh = job("fresh", "q", 50);
    fresh.creation_timestamp = Some(now - Duration::from_secs(60));
    ssn.add_job(old);
    ssn.add_job(fresh);

    open_all(&plugins, &mut ssn);

    let old = ssn.jobs.values().find(|j| j.uid.as_str() == "old").unwrap();
    let fresh = ssn
        .jobs
        .values()
        .find(|j| j.uid.as_str() == "fresh")
        .unwrap();
    assert_eq!(old.priority, 100);

    assert_eq!(ssn.job_order(old, fresh), Ordering::Less);

    close_all(&plugins, &mut ssn);
}

#[test]
fn blocking_applies_to_escalated_priorities() {
    // A long-waiting job is escalated into the blocking band and then
    // gates a younger, lower-priority job in the same queue.
    let now = at(1_000_000);
    let plugins = build_plugins(&[
        (
            "time-priority",
            json!({
                "rules": [{
                    "waitingThreshold": "10m",
                    "sourcePriority": {"anyExpressions": [{"operator": "Between", "values": [0, 50]}]},
                    "targetPriority": 150,
                }],
            }),
        ),
        (
            "ex-priority",
            json!({
                "blocking": {"anyExpressions": [{"operator": "Gte", "values": [100]}]},
                "blockingScope": "queue",
            }),
        ),
    ]);

    let mut ssn = Session::new(now);
    let mut stale = job("stale", "q", 10);
    stale.creation_timestamp = Some(now - Duration::from_secs(20 * 60));
    ssn.add_job(stale);
    ssn.add_job(job("young", "q", 10));
    ssn.add_job(job("elsewhere", "q-prime", 10));

    open_all(&plugins, &mut ssn);

    let stale = ssn.jobs.values().find(|j| j.uid.as_str() == "stale").unwrap().clone();
    let young = ssn.jobs.values().find(|j| j.uid.as_str() == "young").unwrap().clone();
    let elsewhere = ssn
        .jobs
        .values()
        .find(|j| j.uid.as_str() == "elsewhere")
        .unwrap()
        .clone();

    assert_eq!(stale.priority, 150);
    assert_eq!(ssn.job_enqueueable(&stale), Verdict::Permit);
    assert_eq!(ssn.job_enqueueable(&young), Verdict::Reject);
    // Queue scope: the other queue is unaffected.
    assert_eq!(ssn.job_enqueueable(&elsewhere), Verdict::Abstain);

    let invalid = ssn.job_valid(&young).expect("young must be gated");
    assert!(!invalid.pass);
    assert!(invalid.message.contains("scope: queue"));
}

#[test]
fn quota_hint_breaks_priority_ties() {
    // ex-priority is registered first but both pending jobs carry the
    // same priority, so the groupquota comparator decides.
    let plugins = build_plugins(&[
        ("ex-priority", json!({})),
        (
            "groupquota",
            json!({
                "annotationKey": "team",
                "resourceMap": {"cpu": "1000m"},
            }),
        ),
    ]);

    let mut ssn = Session::new(at(0));
    let mut holder = job("holder", "q", 0);
    let mut pod_group = PodGroup::default();
    pod_group
        .annotations
        .insert("team".to_string(), "a".to_string());
    holder.pod_group = Some(pod_group.clone());
    holder.allocated = Resource::new(1000.0, 0.0);
    ssn.add_job(holder);

    let mut ja = job("ja", "q", 5);
    ja.pod_group = Some(pod_group);
    let mut jb_group = PodGroup::default();
    jb_group
        .annotations
        .insert("team".to_string(), "b".to_string());
    let mut jb = job("jb", "q", 5);
    jb.pod_group = Some(jb_group);
    ssn.add_job(ja.clone());
    ssn.add_job(jb.clone());

    open_all(&plugins, &mut ssn);

    // Same priority: ex-priority defers, groupquota prefers team b.
    assert_eq!(ssn.job_order(&ja, &jb), Ordering::Greater);
    assert_eq!(ssn.job_order(&jb, &ja), Ordering::Less);

    // Different priorities: ex-priority decides before groupquota.
    let mut ja_high = ja.clone();
    ja_high.priority = 50;
    assert_eq!(ssn.job_order(&ja_high, &jb), Ordering::Less);
}

#[test]
fn preemption_timeout_override_end_to_end() {
    let now = at(7200);
    let plugins = build_plugins(&[(
        "ex-priority",
        json!({
            "preemptible": {"anyExpressions": [{"operator": "Between", "values": [0, 100]}]},
            "maxRunTimeAnnotationKey": "scheduling.gangway.io/max-run-time",
        }),
    )]);

    let mut ssn = Session::new(now);
    ssn.add_job(job("actor-job", "q", 1));
    ssn.add_job(job("victim-job", "q", 1000));
    open_all(&plugins, &mut ssn);

    let actor = TaskInfo::new("actor", "actor-job", "actor");
    let mut victim = TaskInfo::new("victim", "victim-job", "victim");
    let mut pod = gangway_api::Pod {
        start_time: Some(at(0)),
        ..Default::default()
    };
    pod.annotations.insert(
        "scheduling.gangway.io/max-run-time".to_string(),
        "1h".to_string(),
    );
    victim.pod = Some(pod);

    // The victim's job priority (1000) is outside the preemptible range
    // and above the actor's, but the task exceeded its 1h budget.
    let victims = ssn.preemptable(&actor, &[&victim]);
    assert_eq!(victims, vec![TaskId::new("victim")]);

    // Without the timeout the same candidate is protected.
    let mut young = TaskInfo::new("young", "victim-job", "young");
    young.pod = Some(gangway_api::Pod {
        start_time: Some(at(7000)),
        ..Default::default()
    });
    assert!(ssn.preemptable(&actor, &[&young]).is_empty());
}

#[test]
fn comparators_are_antisymmetric_through_the_session() {
    let plugins = build_plugins(&[(
        "ex-priority",
        json!({"sortOrder": ["priority", "creationTime"]}),
    )]);

    let mut ssn = Session::new(at(0));
    open_all(&plugins, &mut ssn);

    let mut a = job("a", "q", 5);
    a.creation_timestamp = Some(at(100));
    let mut b = job("b", "q", 5);
    b.creation_timestamp = Some(at(200));
    let c = job("c", "q", 9);

    for (l, r) in [(&a, &b), (&a, &c), (&b, &c)] {
        assert_eq!(ssn.job_order(l, r), ssn.job_order(r, l).reverse());
    }
    for j in [&a, &b, &c] {
        assert_eq!(ssn.job_order(j, j), Ordering::Equal);
    }
}
