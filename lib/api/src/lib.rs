// SPDX-FileCopyrightText: Copyright (c) 2025 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Workload data model for the gangway scheduler plugins.
//!
//! The scheduling framework snapshots cluster state into the types in this
//! crate once per session. Plugins only ever see these session-scoped
//! views; nothing here touches the API server or performs I/O.

mod job;
mod quantity;
mod resource;

pub use job::{
    JobId, JobInfo, JobPhase, Pod, PodGroup, QueueId, SubJobId, SubJobInfo, TaskId, TaskInfo,
};
pub use quantity::{Quantity, QuantityParseError};
pub use resource::{Resource, ResourceList, RESOURCE_CPU, RESOURCE_MEMORY};
