//! Error handling in [`kube_teardown`][crate]
use std::time::Duration;

use thiserror::Error;

use crate::{delete::Pending, Target};

/// Possible errors when tearing down an object.
#[derive(Debug, Error)]
pub enum Error {
    /// The object could not be looked up for a reason other than it being absent.
    #[error("failed to get {target}: {source}")]
    Get {
        /// The object being deleted.
        target: Target,
        /// The error returned by the apiserver.
        #[source]
        source: kube::Error,
    },

    /// The delete request was rejected.
    #[error("failed to delete {target}: {source}")]
    Delete {
        /// The object being deleted.
        target: Target,
        /// The error returned by the apiserver.
        #[source]
        source: kube::Error,
    },

    /// The object was still around when the deadline passed.
    #[error("timed out after {timeout:?} waiting for {target} to be removed: {last}")]
    Timeout {
        /// The object being deleted.
        target: Target,
        /// The deadline that elapsed.
        timeout: Duration,
        /// What the last poll iteration observed.
        last: Pending,
    },

    /// The object passed in has no `metadata.name`.
    #[error("object has no name to delete by")]
    MissingName,

    /// The wait configuration cannot be used.
    #[error("invalid wait configuration: {0}")]
    InvalidConfig(String),
}
