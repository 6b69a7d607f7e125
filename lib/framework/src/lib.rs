// SPDX-FileCopyrightText: Copyright (c) 2025 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Host contract for the gangway scheduler plugins.
//!
//! The scheduler executes in discrete sessions. At session open the host
//! calls every plugin's [`Plugin::on_session_open`]; plugins inspect the
//! session's job snapshot, optionally rewrite job priorities, and register
//! callbacks. The host then drives its actions (ordering, enqueue,
//! allocate, preempt, reclaim) through the dispatch methods on [`Session`],
//! which compose the registered callbacks in a documented way, and finally
//! calls [`Plugin::on_session_close`].
//!
//! Everything is single-threaded for the lifetime of a session: callbacks
//! are invoked serially and must not block, spawn or perform I/O.

mod arguments;
mod plugin;
mod session;

pub use arguments::Arguments;
pub use plugin::{Plugin, PluginFactory, PluginRegistry};
pub use session::{
    JobEnqueueableFn, JobOrderFn, JobStarvingFn, JobValidFn, Session, SubJobOrderFn, TaskOrderFn,
    ValidateResult, Verdict, VictimFilterFn,
};
