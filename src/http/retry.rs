// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Retry policy with exponential backoff
//!
//! Retries are opt-in. A client carries default [`RetryOptions`]; a single
//! call may shadow any field through [`RetryOverrides`].

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use super::DEFAULT_RETRY_STATUSES;
use crate::error::HttpError;

/// Delay before retry number `attempt + 1`
pub type RetryDelayFn = Arc<dyn Fn(u32) -> Duration + Send + Sync>;

/// Custom retry decision, replaces the status/transport rule when set
pub type RetryPredicate = Arc<dyn Fn(&HttpError, u32) -> bool + Send + Sync>;

/// Default backoff: `2^attempt` seconds
pub fn exponential_backoff(attempt: u32) -> Duration {
    Duration::from_millis(1000u64.saturating_mul(1u64 << attempt.min(16)))
}

/// Fully resolved retry policy
#[derive(Clone)]
pub struct RetryOptions {
    /// Whether failed attempts are retried at all
    pub enabled: bool,
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Backoff schedule
    pub retry_delay: RetryDelayFn,
    /// Statuses worth retrying
    pub retry_on: Vec<u16>,
    /// Custom decision
    pub should_retry: Option<RetryPredicate>,
}

impl Default for RetryOptions {
    fn default() -> Self {
        Self {
            enabled: false,
            max_retries: 3,
            retry_delay: Arc::new(exponential_backoff),
            retry_on: DEFAULT_RETRY_STATUSES.to_vec(),
            should_retry: None,
        }
    }
}

impl fmt::Debug for RetryOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryOptions")
            .field("enabled", &self.enabled)
            .field("max_retries", &self.max_retries)
            .field("retry_on", &self.retry_on)
            .field("should_retry", &self.should_retry.is_some())
            .finish()
    }
}

impl RetryOptions {
    /// Create the default (disabled) policy
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable/disable retries
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Set max retries
    pub fn max_retries(mut self, max: u32) -> Self {
        self.max_retries = max;
        self
    }

    /// Set the backoff schedule
    pub fn retry_delay(mut self, delay: impl Fn(u32) -> Duration + Send + Sync + 'static) -> Self {
        self.retry_delay = Arc::new(delay);
        self
    }

    /// Set retryable statuses
    pub fn retry_on(mut self, statuses: impl Into<Vec<u16>>) -> Self {
        self.retry_on = statuses.into();
        self
    }

    /// Set a custom retry decision
    pub fn should_retry(
        mut self,
        predicate: impl Fn(&HttpError, u32) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.should_retry = Some(Arc::new(predicate));
        self
    }

    /// Apply per-call overrides field by field
    pub fn merge(&self, overrides: Option<&RetryOverrides>) -> RetryOptions {
        let Some(o) = overrides else {
            return self.clone();
        };
        RetryOptions {
            enabled: o.enabled.unwrap_or(self.enabled),
            max_retries: o.max_retries.unwrap_or(self.max_retries),
            retry_delay: o.retry_delay.clone().unwrap_or_else(|| self.retry_delay.clone()),
            retry_on: o.retry_on.clone().unwrap_or_else(|| self.retry_on.clone()),
            should_retry: o.should_retry.clone().or_else(|| self.should_retry.clone()),
        }
    }

    /// Decide whether the failed `attempt` (0-based) gets another try
    pub fn should_retry_error(&self, error: &HttpError, attempt: u32) -> bool {
        if !self.enabled || attempt >= self.max_retries {
            return false;
        }
        match self.should_retry {
            Some(ref predicate) => predicate(error, attempt),
            None => match error.status {
                Some(status) => self.retry_on.contains(&status),
                None => error.is_transport(),
            },
        }
    }

    /// Delay before the next try
    pub fn delay(&self, attempt: u32) -> Duration {
        (self.retry_delay)(attempt)
    }
}

/// Per-call retry overrides; unset fields fall back to the client defaults
#[derive(Clone, Default)]
pub struct RetryOverrides {
    pub enabled: Option<bool>,
    pub max_retries: Option<u32>,
    pub retry_delay: Option<RetryDelayFn>,
    pub retry_on: Option<Vec<u16>>,
    pub should_retry: Option<RetryPredicate>,
}

impl fmt::Debug for RetryOverrides {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryOverrides")
            .field("enabled", &self.enabled)
            .field("max_retries", &self.max_retries)
            .field("retry_delay", &self.retry_delay.is_some())
            .field("retry_on", &self.retry_on)
            .field("should_retry", &self.should_retry.is_some())
            .finish()
    }
}

impl RetryOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = Some(enabled);
        self
    }

    pub fn max_retries(mut self, max: u32) -> Self {
        self.max_retries = Some(max);
        self
    }

    pub fn retry_delay(mut self, delay: impl Fn(u32) -> Duration + Send + Sync + 'static) -> Self {
        self.retry_delay = Some(Arc::new(delay));
        self
    }

    pub fn retry_on(mut self, statuses: impl Into<Vec<u16>>) -> Self {
        self.retry_on = Some(statuses.into());
        self
    }

    pub fn should_retry(
        mut self,
        predicate: impl Fn(&HttpError, u32) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.should_retry = Some(Arc::new(predicate));
        self
    }
}
