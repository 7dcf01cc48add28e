//! Timeout and poll cadence for teardown.
use std::{env, time::Duration};

use crate::Error;

/// Environment variable holding the overall timeout in whole seconds.
pub const TIMEOUT_ENV: &str = "KUBE_TEARDOWN_TIMEOUT";
/// Environment variable holding the poll interval in milliseconds.
pub const INTERVAL_ENV: &str = "KUBE_TEARDOWN_INTERVAL_MS";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_INTERVAL: Duration = Duration::from_millis(200);

/// How long to wait for an object to go away, and how often to look.
///
/// Usually shared by a whole test suite through [`TestHelper`](crate::TestHelper).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WaitConfig {
    /// Upper bound on the whole delete-and-confirm operation.
    pub timeout: Duration,
    /// Delay between poll iterations.
    pub interval: Duration,
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            interval: DEFAULT_INTERVAL,
        }
    }
}

impl WaitConfig {
    /// Set the overall timeout.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the poll interval.
    #[must_use]
    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Read the configuration from [`TIMEOUT_ENV`] and [`INTERVAL_ENV`].
    ///
    /// Variables that are not set keep their default value.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, Error> {
        let mut config = Self::default();
        if let Some(secs) = parse_var(&lookup, TIMEOUT_ENV)? {
            config.timeout = Duration::from_secs(secs);
        }
        if let Some(millis) = parse_var(&lookup, INTERVAL_ENV)? {
            config.interval = Duration::from_millis(millis);
        }
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the poll loop cannot run with.
    pub fn validate(&self) -> Result<(), Error> {
        if self.timeout.is_zero() {
            return Err(Error::InvalidConfig("timeout must be greater than zero".into()));
        }
        if self.interval.is_zero() {
            return Err(Error::InvalidConfig("interval must be greater than zero".into()));
        }
        Ok(())
    }
}

fn parse_var(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<u64>, Error> {
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse::<u64>()
                .map_err(|e| Error::InvalidConfig(format!("{key}={raw:?}: {e}")))
        })
        .transpose()
}
