//! Identification of the object being torn down.
use std::fmt;

use kube::{Resource, ResourceExt};

use crate::Error;

/// A reference to a single object in the cluster.
///
/// Re-used on every poll iteration to look the object up again, so it only
/// carries what is needed to identify it and to describe it in logs and
/// failure messages.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Target {
    /// Kind of the object, e.g. `ConfigMap`.
    pub kind: String,
    /// Name of the object.
    pub name: String,
    /// Namespace of the object, `None` for cluster scoped kinds.
    pub namespace: Option<String>,
}

impl Target {
    /// Reference a cluster scoped object.
    pub fn new(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            name: name.into(),
            namespace: None,
        }
    }

    /// Place the reference in a namespace.
    #[must_use]
    pub fn within(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Build a reference from an object and its dynamic type.
    ///
    /// The namespace is taken from the object's metadata as is; callers that
    /// fall back to a default namespace should apply it with [`Target::within`].
    pub fn from_resource<K: Resource>(obj: &K, dyntype: &K::DynamicType) -> Result<Self, Error> {
        let name = obj.meta().name.clone().ok_or(Error::MissingName)?;
        Ok(Self {
            kind: K::kind(dyntype).into_owned(),
            name,
            namespace: obj.namespace(),
        })
    }

    /// Namespace for log fields, empty when cluster scoped.
    pub(crate) fn namespace_or_empty(&self) -> &str {
        self.namespace.as_deref().unwrap_or_default()
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{} {}/{}", self.kind, ns, self.name),
            None => write!(f, "{} {}", self.kind, self.name),
        }
    }
}
