// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job table with admission control and periodic eviction.
//!
//! Lock order is registry table, then job. Jobs never call back into the
//! registry.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use clr_core::{Clock, JobId, JobStatus, Payload, SystemClock};
use parking_lot::{Mutex, RwLock};
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::job::{CachedResult, Job, JobLimits, JobSpec};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("maximum concurrent jobs reached ({active}/{max})")]
    AdmissionRejected { active: usize, max: usize },

    #[error("job {0} not found")]
    NotFound(JobId),

    #[error("job {id} is still {status}")]
    Conflict { id: JobId, status: JobStatus },
}

/// Registry sizing, derived from the `[process]` configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistrySettings {
    pub max_concurrent: usize,
    pub cleanup_interval: Duration,
    pub limits: JobLimits,
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self {
            max_concurrent: 10,
            cleanup_interval: Duration::from_secs(5 * 60),
            limits: JobLimits::default(),
        }
    }
}

pub struct Registry<C: Clock = SystemClock> {
    settings: RegistrySettings,
    clock: C,
    jobs: RwLock<HashMap<JobId, Arc<Job<C>>>>,
    /// Result caches that outlive their evicted jobs
    results: Mutex<HashMap<JobId, CachedResult>>,
}

impl<C: Clock> Registry<C> {
    pub fn new(settings: RegistrySettings, clock: C) -> Self {
        Self {
            settings,
            clock,
            jobs: RwLock::new(HashMap::new()),
            results: Mutex::new(HashMap::new()),
        }
    }

    pub fn settings(&self) -> &RegistrySettings {
        &self.settings
    }

    /// Admit a new pending job, or reject it when the ceiling is reached.
    pub fn create(&self, spec: JobSpec) -> Result<Arc<Job<C>>, RegistryError> {
        let mut jobs = self.jobs.write();
        let active = jobs.values().filter(|j| !j.is_terminal()).count();
        let max = self.settings.max_concurrent;
        if active >= max {
            tracing::warn!(active, max, connector = %spec.connector, "job rejected at capacity");
            return Err(RegistryError::AdmissionRejected { active, max });
        }
        let job = Arc::new(Job::new(JobId::new(), spec, self.settings.limits, self.clock.clone()));
        jobs.insert(job.id().clone(), Arc::clone(&job));
        tracing::info!(job_id = %job.id(), connector = %job.spec().connector, "job admitted");
        Ok(job)
    }

    pub fn get(&self, id: &JobId) -> Result<Arc<Job<C>>, RegistryError> {
        self.jobs.read().get(id).cloned().ok_or_else(|| RegistryError::NotFound(id.clone()))
    }

    /// All jobs, oldest first.
    pub fn list(&self) -> Vec<Arc<Job<C>>> {
        let mut jobs: Vec<_> = self.jobs.read().values().cloned().collect();
        jobs.sort_by_key(|j| j.started().at);
        jobs
    }

    pub fn stop(&self, id: &JobId) -> Result<(), RegistryError> {
        self.get(id)?.stop();
        Ok(())
    }

    /// Stop every job that is still pending or running.
    pub fn stop_all(&self) -> usize {
        let active: Vec<_> =
            self.jobs.read().values().filter(|j| !j.is_terminal()).cloned().collect();
        active.iter().filter(|job| job.stop()).count()
    }

    /// Delete a finished job. Its result cache stays readable until it expires.
    pub fn remove(&self, id: &JobId) -> Result<(), RegistryError> {
        let job = {
            let mut jobs = self.jobs.write();
            let job = jobs.get(id).ok_or_else(|| RegistryError::NotFound(id.clone()))?;
            let status = job.status();
            if !status.is_terminal() {
                return Err(RegistryError::Conflict { id: id.clone(), status });
            }
            jobs.remove(id)
        };
        if let Some(job) = job {
            self.retain_cache(&job);
            tracing::info!(job_id = %id, "job removed");
        }
        Ok(())
    }

    /// Number of pending or running jobs.
    pub fn count(&self) -> usize {
        self.jobs.read().values().filter(|j| !j.is_terminal()).count()
    }

    /// Number of jobs held, finished or not.
    pub fn len(&self) -> usize {
        self.jobs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.read().is_empty()
    }

    /// Last result payload of a job, live or evicted, until it expires.
    pub fn cached_result(&self, id: &JobId) -> Option<Payload> {
        if let Ok(job) = self.get(id) {
            return job.cached_result_payload();
        }
        let now = self.clock.now();
        let mut results = self.results.lock();
        match results.get(id) {
            Some(cache) if cache.is_live(now) => Some(cache.payload.clone()),
            Some(_) => {
                results.remove(id);
                None
            }
            None => None,
        }
    }

    /// Evict jobs finished at least `cleanup_interval` ago and purge expired
    /// result caches. Returns the number of jobs evicted.
    pub fn sweep(&self) -> usize {
        let now = self.clock.now();
        let interval = self.settings.cleanup_interval;
        let mut evicted = Vec::new();
        self.jobs.write().retain(|_, job| {
            let expired = job.completed().is_some_and(|c| c.age(now) >= interval);
            if expired {
                evicted.push(Arc::clone(job));
            }
            !expired
        });

        self.results.lock().retain(|_, cache| cache.is_live(now));
        for job in &evicted {
            self.retain_cache(job);
            tracing::debug!(job_id = %job.id(), status = %job.status(), "evicted finished job");
        }
        evicted.len()
    }

    fn retain_cache(&self, job: &Job<C>) {
        if let Some(cache) = job.live_cache() {
            self.results.lock().insert(job.id().clone(), cache);
        }
    }

    /// Run [`Registry::sweep`] every `cleanup_interval` until cancelled.
    pub fn spawn_sweeper(self: &Arc<Self>, cancel: CancellationToken) -> JoinHandle<()> {
        let registry = Arc::clone(self);
        let period = self.settings.cleanup_interval;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first tick completes immediately
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        let removed = registry.sweep();
                        if removed > 0 {
                            tracing::info!(removed, remaining = registry.len(), "swept finished jobs");
                        }
                    }
                }
            }
            tracing::debug!("sweeper stopped");
        })
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
