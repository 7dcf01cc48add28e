//! The apiserver operations teardown relies on.
use std::fmt::Debug;

use async_trait::async_trait;
use kube::{
    api::{DeleteParams, ObjectMeta},
    Api, Resource,
};
use serde::de::DeserializeOwned;

/// Lookup and deletion of objects by name.
///
/// The namespace, if any, is part of the store itself, the same way it is for
/// an [`Api`]. Both calls return the raw [`kube::Error`] so that a missing
/// object can be told apart with [`is_not_found`].
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch the current metadata of the named object.
    async fn fetch(&self, name: &str) -> kube::Result<ObjectMeta>;

    /// Issue a single delete request for the named object.
    async fn remove(&self, name: &str, dp: &DeleteParams) -> kube::Result<()>;
}

#[async_trait]
impl<K> ObjectStore for Api<K>
where
    K: Resource + Clone + DeserializeOwned + Debug + Send + Sync + 'static,
{
    async fn fetch(&self, name: &str) -> kube::Result<ObjectMeta> {
        let obj = self.get(name).await?;
        Ok(obj.meta().clone())
    }

    async fn remove(&self, name: &str, dp: &DeleteParams) -> kube::Result<()> {
        // Left means deletion started, Right means it is already done.
        self.delete(name, dp).await.map(|_| ())
    }
}

/// Whether the apiserver reported the object as absent.
pub fn is_not_found(err: &kube::Error) -> bool {
    match err {
        kube::Error::Api(resp) => resp.code == 404 || resp.reason == "NotFound",
        _ => false,
    }
}
