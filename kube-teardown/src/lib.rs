//! Test helpers for tearing down Kubernetes objects.
//!
//! Deleting an object through the apiserver only marks it for removal:
//! finalizers and background controllers decide when it actually disappears.
//! This crate turns that eventually consistent delete into a call that only
//! returns once the object can no longer be found, or fails after a deadline.
//!
//! ```no_run
//! use k8s_openapi::api::core::v1::ConfigMap;
//! use kube::{api::DeleteParams, Api, Client};
//! use kube_teardown::{delete_and_confirm, Target, WaitConfig};
//!
//! # async fn wrapper() -> Result<(), Box<dyn std::error::Error>> {
//! let client = Client::try_default().await?;
//! let cms: Api<ConfigMap> = Api::namespaced(client, "bar");
//! let target = Target::new("ConfigMap", "foo").within("bar");
//! delete_and_confirm(&cms, &target, &DeleteParams::default(), &WaitConfig::from_env()?).await?;
//! # Ok(())
//! # }
//! ```
//!
//! Most suites will rather share a [`TestHelper`] and call
//! [`TestHelper::delete_instance`] from their cleanup code.

pub mod config;
pub mod delete;
mod error;
mod helper;
pub mod store;
pub mod target;

pub use config::WaitConfig;
pub use delete::{delete_and_confirm, Pending};
pub use error::Error;
pub use helper::TestHelper;
pub use store::{is_not_found, ObjectStore};
pub use target::Target;
