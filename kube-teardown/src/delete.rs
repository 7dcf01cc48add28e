//! Delete an object and wait for the apiserver to confirm it is gone.
//!
//! A delete request only marks an object for removal. Finalizers and garbage
//! collection can keep it around for a while, so [`delete_and_confirm`] keeps
//! deleting and re-checking until a lookup reports the object as not found.
use std::fmt;

use kube::api::DeleteParams;
use tokio::time::{self, MissedTickBehavior};

use crate::{
    store::{is_not_found, ObjectStore},
    Error, Target, WaitConfig,
};

/// Why the last poll iteration did not see the object disappear.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Pending {
    /// The deadline passed before any iteration completed.
    NotAttempted,
    /// The object was still returned after it was deleted.
    Present {
        /// Finalizers still set on the object.
        finalizers: Vec<String>,
        /// Whether the object had a deletion timestamp.
        terminating: bool,
    },
    /// Looking the object up again after the delete failed.
    Unconfirmed(String),
}

impl fmt::Display for Pending {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pending::NotAttempted => f.write_str("no poll attempt completed"),
            Pending::Present {
                finalizers,
                terminating,
            } => {
                f.write_str("object still present")?;
                if *terminating {
                    f.write_str(" (terminating)")?;
                }
                if !finalizers.is_empty() {
                    write!(f, " with finalizers [{}]", finalizers.join(", "))?;
                }
                Ok(())
            }
            Pending::Unconfirmed(err) => write!(f, "could not confirm removal: {err}"),
        }
    }
}

enum Attempt {
    Removed,
    Pending(Pending),
}

/// Delete `target` through `store` and wait until it can no longer be found.
///
/// Every poll iteration looks the object up, deletes it if it is still there
/// and looks it up once more. The call succeeds as soon as a lookup (or the
/// delete itself) reports the object as not found, which includes objects
/// that never existed. `dp` is passed to every delete request unchanged.
///
/// # Errors
///
/// - [`Error::Get`] or [`Error::Delete`] on the first apiserver failure other
///   than not found, without retrying.
/// - [`Error::Timeout`] if the object is still around after `config.timeout`.
///   A failure to look the object up again right after deleting it is only
///   recorded as the last observation, and the loop carries on.
/// - [`Error::InvalidConfig`] if `config` does not validate.
pub async fn delete_and_confirm<S>(
    store: &S,
    target: &Target,
    dp: &DeleteParams,
    config: &WaitConfig,
) -> Result<(), Error>
where
    S: ObjectStore + ?Sized,
{
    config.validate()?;
    tracing::info!(
        name = %target.name,
        namespace = %target.namespace_or_empty(),
        kind = %target.kind,
        "Deleting"
    );

    let mut last = Pending::NotAttempted;
    let poll = async {
        let mut interval = time::interval(config.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            match attempt(store, target, dp).await {
                Ok(Attempt::Removed) => return Ok(()),
                Ok(Attempt::Pending(pending)) => {
                    tracing::debug!("{target}: {pending}, retrying");
                    last = pending;
                }
                Err(err) => return Err(err),
            }
        }
    };
    let outcome = time::timeout(config.timeout, poll).await;
    match outcome {
        Ok(res) => res?,
        Err(_) => {
            return Err(Error::Timeout {
                target: target.clone(),
                timeout: config.timeout,
                last,
            })
        }
    }

    tracing::info!(
        name = %target.name,
        namespace = %target.namespace_or_empty(),
        kind = %target.kind,
        "Deleted"
    );
    Ok(())
}

async fn attempt<S>(store: &S, target: &Target, dp: &DeleteParams) -> Result<Attempt, Error>
where
    S: ObjectStore + ?Sized,
{
    match store.fetch(&target.name).await {
        Ok(_) => {}
        Err(err) if is_not_found(&err) => return Ok(Attempt::Removed),
        Err(source) => {
            return Err(Error::Get {
                target: target.clone(),
                source,
            })
        }
    }

    match store.remove(&target.name, dp).await {
        Ok(()) => {}
        // Went away between the lookup and the delete
        Err(err) if is_not_found(&err) => return Ok(Attempt::Removed),
        Err(source) => {
            return Err(Error::Delete {
                target: target.clone(),
                source,
            })
        }
    }

    match store.fetch(&target.name).await {
        Err(err) if is_not_found(&err) => Ok(Attempt::Removed),
        Err(err) => Ok(Attempt::Pending(Pending::Unconfirmed(err.to_string()))),
        Ok(meta) => Ok(Attempt::Pending(Pending::Present {
            finalizers: meta.finalizers.unwrap_or_default(),
            terminating: meta.deletion_timestamp.is_some(),
        })),
    }
}
