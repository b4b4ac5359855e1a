//! Auto-detection orchestrator.
//!
//! A [`Detector`] walks the registry in order, probing each adapter with
//! `check_connection` under `min(per-attempt, remaining global)` and
//! enumerating the first one that answers. Probes are strictly sequential:
//! the global budget is one shared clock.
//!
//! Terminal states map onto errors:
//! - first positive probe: `Ok(Detection)`
//! - every adapter probed without a match: [`DbEnumError::NoMatch`]
//! - budget spent before the next probe could start: [`DbEnumError::GlobalTimeout`]

mod budget;
mod invoker;

pub use budget::ProbeBudget;
pub use invoker::{Outcome, invoke};

use crate::{
    AdapterRegistry, ConnectionParameters, DatabaseAdapter, DbEnumError, DiagnosticLogger, Result,
    models::{AdapterDescriptor, EnumerationResult},
};
use std::time::Duration;
use tokio::time::Instant;

/// The adapter that matched and what it found.
#[derive(Debug, Clone)]
pub struct Detection {
    /// Descriptor of the matching adapter
    pub descriptor: AdapterDescriptor,
    /// Its enumeration of the target
    pub result: EnumerationResult,
    /// Number of adapters probed, including the matching one
    pub probed: usize,
}

/// Drives detection against one target.
#[derive(Debug)]
pub struct Detector<'a> {
    registry: &'a AdapterRegistry,
    budget: ProbeBudget,
    logger: &'a DiagnosticLogger,
}

impl<'a> Detector<'a> {
    /// Creates a detector over `registry`.
    pub const fn new(
        registry: &'a AdapterRegistry,
        budget: ProbeBudget,
        logger: &'a DiagnosticLogger,
    ) -> Self {
        Self {
            registry,
            budget,
            logger,
        }
    }

    /// Tries every adapter in registry order and enumerates the first match.
    ///
    /// # Errors
    /// - [`DbEnumError::Configuration`] for invalid parameters or budget
    /// - [`DbEnumError::NoMatch`] when every adapter was probed without a match
    /// - [`DbEnumError::GlobalTimeout`] when the budget ran out first
    /// - enumeration errors of the matching adapter
    pub async fn detect(&self, params: &ConnectionParameters) -> Result<Detection> {
        self.budget.validate()?;
        params.validate()?;

        let started = Instant::now();
        let target = params.target();
        let mut probed: usize = 0;

        for adapter in self.registry.all() {
            let remaining = self.remaining(started);
            if remaining.is_zero() {
                return Err(self.global_timeout(probed));
            }

            let descriptor = adapter.describe();
            probed = probed.saturating_add(1);
            self.logger
                .info(format!("Trying {} at {target}", descriptor.name));

            let timeout = self.budget.attempt_timeout(remaining);
            match invoke(adapter.check_connection(params, self.logger), timeout).await {
                Outcome::Success(true) => {
                    self.logger
                        .info(format!("Detected {} at {target}", descriptor.name));
                    return self.enumerate(adapter, params, started, probed).await;
                }
                Outcome::Success(false) => {
                    self.logger
                        .info(format!("{} not detected at {target}", descriptor.name));
                }
                Outcome::ConnectionFailed(reason) => {
                    self.logger.error(format!(
                        "{} probe of {target} failed: {}",
                        descriptor.key,
                        params.scrub(&reason)
                    ));
                }
                Outcome::TimedOut => {
                    self.logger.error(format!(
                        "{} probe of {target} timed out after {}s",
                        descriptor.key,
                        timeout.as_secs_f32()
                    ));
                    if self.remaining(started).is_zero() {
                        return Err(self.global_timeout(probed));
                    }
                }
            }
        }

        self.logger.error(format!(
            "No supported database type detected at {target}"
        ));
        Err(DbEnumError::NoMatch { probed })
    }

    /// Probes and enumerates exactly one adapter by key.
    ///
    /// The same deadline composition applies, collapsed to one candidate.
    ///
    /// # Errors
    /// - [`DbEnumError::AdapterNotFound`] for an unknown key
    /// - [`DbEnumError::TargetUnreachable`] when the probe fails
    /// - [`DbEnumError::ProbeTimeout`] or [`DbEnumError::GlobalTimeout`] when it hangs
    /// - enumeration errors of the adapter
    pub async fn target(&self, key: &str, params: &ConnectionParameters) -> Result<Detection> {
        self.budget.validate()?;
        params.validate()?;
        let adapter = self.registry.by_name(key)?;

        let started = Instant::now();
        let descriptor = adapter.describe();
        let target = params.target();
        self.logger
            .info(format!("Connecting to {} at {target}", descriptor.name));

        let timeout = self.budget.attempt_timeout(self.budget.global);
        match invoke(adapter.check_connection(params, self.logger), timeout).await {
            Outcome::Success(true) => self.enumerate(adapter, params, started, 1).await,
            Outcome::Success(false) => Err(self.unreachable(&descriptor, &target)),
            Outcome::ConnectionFailed(reason) => {
                self.logger.error(format!(
                    "{} probe of {target} failed: {}",
                    descriptor.key,
                    params.scrub(&reason)
                ));
                Err(self.unreachable(&descriptor, &target))
            }
            Outcome::TimedOut => Err(self.timed_out(&descriptor, &target, timeout, started, 1)),
        }
    }

    async fn enumerate(
        &self,
        adapter: &dyn DatabaseAdapter,
        params: &ConnectionParameters,
        started: Instant,
        probed: usize,
    ) -> Result<Detection> {
        let remaining = self.remaining(started);
        if remaining.is_zero() {
            return Err(self.global_timeout(probed));
        }

        let descriptor = adapter.describe();
        let target = params.target();
        self.logger
            .debug(format!("Enumerating {} at {target}", descriptor.name));

        let timeout = self.budget.attempt_timeout(remaining);
        match invoke(adapter.enumerate(params, self.logger), timeout).await {
            Outcome::Success(Ok(result)) => Ok(Detection {
                descriptor,
                result,
                probed,
            }),
            Outcome::Success(Err(error)) => Err(error),
            Outcome::ConnectionFailed(reason) => {
                let context = params.scrub(&reason);
                self.logger.error(format!(
                    "{} enumeration of {target} failed: {context}",
                    descriptor.key
                ));
                Err(DbEnumError::enumeration_failed(descriptor.key, context))
            }
            Outcome::TimedOut => Err(self.timed_out(&descriptor, &target, timeout, started, probed)),
        }
    }

    fn remaining(&self, started: Instant) -> Duration {
        self.budget.global.saturating_sub(started.elapsed())
    }

    fn global_timeout(&self, probed: usize) -> DbEnumError {
        self.logger.error(format!(
            "Global timeout of {}s reached after probing {probed} adapter(s)",
            self.budget.global.as_secs()
        ));
        DbEnumError::GlobalTimeout { probed }
    }

    fn unreachable(&self, descriptor: &AdapterDescriptor, target: &str) -> DbEnumError {
        self.logger.error(format!(
            "Failed to connect to {} at {target}",
            descriptor.name
        ));
        DbEnumError::TargetUnreachable {
            adapter: descriptor.key.to_string(),
            target: target.to_string(),
        }
    }

    fn timed_out(
        &self,
        descriptor: &AdapterDescriptor,
        target: &str,
        timeout: Duration,
        started: Instant,
        probed: usize,
    ) -> DbEnumError {
        if self.remaining(started).is_zero() {
            return self.global_timeout(probed);
        }
        self.logger.error(format!(
            "{} call to {target} timed out after {}s",
            descriptor.key,
            timeout.as_secs_f32()
        ));
        DbEnumError::ProbeTimeout {
            adapter: descriptor.key.to_string(),
            target: target.to_string(),
            timeout,
        }
    }
}
