// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job execution engine: job state, the registry, and process supervision.

mod job;
mod registry;
mod spawner;

pub use job::{
    CachedResult, Job, JobLimits, JobSnapshot, JobSpec, Subscription, STOPPED_BY_REQUEST,
};
pub use registry::{Registry, RegistryError, RegistrySettings};
pub use spawner::{SpawnError, Spawner, SpawnerSettings};

pub(crate) use job::to_datetime;
