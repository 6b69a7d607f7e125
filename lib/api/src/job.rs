// SPDX-FileCopyrightText: Copyright (c) 2025 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Session-scoped views of jobs, tasks and their pods.

use std::collections::HashMap;
use std::time::SystemTime;

use crate::resource::Resource;

macro_rules! id_type {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }
    };
}

id_type!(
    /// Unique identifier of a job.
    JobId
);
id_type!(
    /// Unique identifier of a task.
    TaskId
);
id_type!(
    /// Unique identifier of a sub-job.
    SubJobId
);
id_type!(
    /// Identifier of the queue a job is submitted to.
    QueueId
);

/// Lifecycle phase of a job's gang unit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum JobPhase {
    #[default]
    Pending,
    Inqueue,
    Running,
    Completed,
}

/// Gang-scheduling unit carrying arbitrary string annotations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PodGroup {
    pub annotations: HashMap<String, String>,
}

/// The slice of pod state the plugins read: annotations and timestamps.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pod {
    pub annotations: HashMap<String, String>,
    /// When the pod started running, if it has.
    pub start_time: Option<SystemTime>,
    pub creation_timestamp: Option<SystemTime>,
}

/// One schedulable unit of a job.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskInfo {
    pub uid: TaskId,
    /// The job this task belongs to.
    pub job: JobId,
    pub name: String,
    pub priority: i32,
    pub pod: Option<Pod>,
}

impl TaskInfo {
    pub fn new(uid: impl Into<TaskId>, job: impl Into<JobId>, name: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            job: job.into(),
            name: name.into(),
            priority: 0,
            pod: None,
        }
    }
}

/// Session view of a job and the tasks it owns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobInfo {
    pub uid: JobId,
    pub name: String,
    pub queue: QueueId,
    /// Unset when the host never observed a creation time.
    pub creation_timestamp: Option<SystemTime>,
    /// Current effective priority. Rewritten in place by escalation
    /// plugins during session open.
    pub priority: i32,
    pub phase: JobPhase,
    pub pod_group: Option<PodGroup>,
    /// Resources currently held by the job's bound tasks.
    pub allocated: Resource,
    pub ready_task_num: u32,
    pub waiting_task_num: u32,
    pub tasks: HashMap<TaskId, TaskInfo>,
}

impl JobInfo {
    pub fn new(uid: impl Into<JobId>, name: impl Into<String>, queue: impl Into<QueueId>) -> Self {
        Self {
            uid: uid.into(),
            name: name.into(),
            queue: queue.into(),
            ..Default::default()
        }
    }

    pub fn is_pending(&self) -> bool {
        self.phase == JobPhase::Pending
    }

    pub fn task_count(&self) -> u32 {
        self.tasks.len() as u32
    }

    /// Look up an annotation on the job's gang unit.
    pub fn pod_group_annotation(&self, key: &str) -> Option<&str> {
        self.pod_group
            .as_ref()
            .and_then(|pg| pg.annotations.get(key))
            .map(String::as_str)
    }
}

/// Flat sub-job grouping; carries a priority and nothing else.
#[derive(Debug, Clone, PartialEq)]
pub struct SubJobInfo {
    pub uid: SubJobId,
    pub priority: i32,
}

impl SubJobInfo {
    pub fn new(uid: impl Into<SubJobId>, priority: i32) -> Self {
        Self {
            uid: uid.into(),
            priority,
        }
    }
}
