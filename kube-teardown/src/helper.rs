//! Suite wide entry point bundling a client with its wait configuration.
use std::fmt::{self, Debug};

use kube::{
    api::{ApiResource, DeleteParams, DynamicObject},
    core::{ClusterResourceScope, NamespaceResourceScope},
    discovery::Scope,
    Api, Client, Resource,
};
use serde::de::DeserializeOwned;

use crate::{delete::delete_and_confirm, Error, Target, WaitConfig};

/// Test helper holding the client and timings shared by a test suite.
///
/// The `try_*` methods return an [`Error`]; the others panic with it so the
/// calling test fails on the spot.
///
/// ```no_run
/// use k8s_openapi::api::core::v1::ConfigMap;
/// use kube::{api::DeleteParams, Client};
/// use kube_teardown::TestHelper;
///
/// # async fn wrapper(cm: ConfigMap) -> Result<(), Box<dyn std::error::Error>> {
/// let th = TestHelper::new(Client::try_default().await?);
/// th.delete_instance(&cm, &DeleteParams::default()).await;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct TestHelper {
    client: Client,
    config: WaitConfig,
}

impl Debug for TestHelper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestHelper")
            .field("default_namespace", &self.client.default_namespace())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl TestHelper {
    /// Create a helper with the default [`WaitConfig`].
    pub fn new(client: Client) -> Self {
        Self {
            client,
            config: WaitConfig::default(),
        }
    }

    /// Use `config` for every subsequent teardown.
    #[must_use]
    pub fn with_config(mut self, config: WaitConfig) -> Self {
        self.config = config;
        self
    }

    /// The client used for teardown.
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// The timings used for teardown.
    pub fn config(&self) -> &WaitConfig {
        &self.config
    }

    /// Delete a namespaced object and wait until it is gone.
    ///
    /// Objects without a namespace are looked up in the client's default namespace.
    pub async fn try_delete_instance<K>(&self, obj: &K, dp: &DeleteParams) -> Result<(), Error>
    where
        K: Resource<Scope = NamespaceResourceScope>
            + Clone
            + DeserializeOwned
            + Debug
            + Send
            + Sync
            + 'static,
        K::DynamicType: Default,
    {
        let mut target = Target::from_resource(obj, &K::DynamicType::default())?;
        let ns = target
            .namespace
            .get_or_insert_with(|| self.client.default_namespace().to_string());
        let api: Api<K> = Api::namespaced(self.client.clone(), ns.as_str());
        delete_and_confirm(&api, &target, dp, &self.config).await
    }

    /// Delete a cluster scoped object and wait until it is gone.
    pub async fn try_delete_cluster_instance<K>(
        &self,
        obj: &K,
        dp: &DeleteParams,
    ) -> Result<(), Error>
    where
        K: Resource<Scope = ClusterResourceScope>
            + Clone
            + DeserializeOwned
            + Debug
            + Send
            + Sync
            + 'static,
        K::DynamicType: Default,
    {
        let mut target = Target::from_resource(obj, &K::DynamicType::default())?;
        target.namespace = None;
        let api: Api<K> = Api::all(self.client.clone());
        delete_and_confirm(&api, &target, dp, &self.config).await
    }

    /// Delete an untyped object and wait until it is gone.
    ///
    /// `scope` is the scope of the kind as reported by discovery, e.g.
    /// [`ApiCapabilities::scope`](kube::discovery::ApiCapabilities). Namespaced
    /// objects without a namespace are looked up in the client's default namespace,
    /// and any namespace set on a cluster scoped object is ignored.
    pub async fn try_delete_dynamic(
        &self,
        obj: &DynamicObject,
        ar: &ApiResource,
        scope: &Scope,
        dp: &DeleteParams,
    ) -> Result<(), Error> {
        let mut target = Target::from_resource(obj, ar)?;
        let api: Api<DynamicObject> = match scope {
            Scope::Namespaced => {
                let ns = target
                    .namespace
                    .get_or_insert_with(|| self.client.default_namespace().to_string());
                Api::namespaced_with(self.client.clone(), ns.as_str(), ar)
            }
            Scope::Cluster => {
                target.namespace = None;
                Api::all_with(self.client.clone(), ar)
            }
        };
        delete_and_confirm(&api, &target, dp, &self.config).await
    }

    /// Like [`TestHelper::try_delete_instance`], failing the test on error.
    ///
    /// # Panics
    ///
    /// Panics with the error message if the object could not be confirmed as deleted.
    pub async fn delete_instance<K>(&self, obj: &K, dp: &DeleteParams)
    where
        K: Resource<Scope = NamespaceResourceScope>
            + Clone
            + DeserializeOwned
            + Debug
            + Send
            + Sync
            + 'static,
        K::DynamicType: Default,
    {
        if let Err(err) = self.try_delete_instance(obj, dp).await {
            panic!("{err}");
        }
    }

    /// Like [`TestHelper::try_delete_cluster_instance`], failing the test on error.
    ///
    /// # Panics
    ///
    /// Panics with the error message if the object could not be confirmed as deleted.
    pub async fn delete_cluster_instance<K>(&self, obj: &K, dp: &DeleteParams)
    where
        K: Resource<Scope = ClusterResourceScope>
            + Clone
            + DeserializeOwned
            + Debug
            + Send
            + Sync
            + 'static,
        K::DynamicType: Default,
    {
        if let Err(err) = self.try_delete_cluster_instance(obj, dp).await {
            panic!("{err}");
        }
    }

    /// Like [`TestHelper::try_delete_dynamic`], failing the test on error.
    ///
    /// # Panics
    ///
    /// Panics with the error message if the object could not be confirmed as deleted.
    pub async fn delete_dynamic(
        &self,
        obj: &DynamicObject,
        ar: &ApiResource,
        scope: &Scope,
        dp: &DeleteParams,
    ) {
        if let Err(err) = self.try_delete_dynamic(obj, ar, scope, dp).await {
            panic!("{err}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::{Method, Request, Response, StatusCode};
    use k8s_openapi::api::core::v1::{ConfigMap, Namespace};
    use kube::{api::ObjectMeta, client::Body};
    use serde_json::json;
    use std::time::Duration;

    const CM_PATH: &str = "/api/v1/namespaces/bar/configmaps/foo";
    const DEFAULT_CM_PATH: &str = "/api/v1/namespaces/default/configmaps/foo";

    fn configmap(ns: Option<&str>) -> ConfigMap {
        ConfigMap {
            metadata: ObjectMeta {
                name: Some("foo".into()),
                namespace: ns.map(Into::into),
                ..ObjectMeta::default()
            },
            ..ConfigMap::default()
        }
    }

    #[tokio::test]
    async fn deletes_configmap_and_confirms_removal() {
        let (th, fakeserver) = testcontext();
        let mocksrv = fakeserver.run(Scenario::DeleteThenGone(CM_PATH));
        th.try_delete_instance(&configmap(Some("bar")), &DeleteParams::background())
            .await
            .unwrap();
        timeout_after_1s(mocksrv).await;
    }

    #[tokio::test]
    async fn falls_back_to_default_namespace() {
        let (th, fakeserver) = testcontext();
        let mocksrv = fakeserver.run(Scenario::DeleteThenGone(DEFAULT_CM_PATH));
        th.delete_instance(&configmap(None), &DeleteParams::default()).await;
        timeout_after_1s(mocksrv).await;
    }

    #[tokio::test]
    async fn already_gone_configmap_is_not_deleted() {
        let (th, fakeserver) = testcontext();
        let mocksrv = fakeserver.run(Scenario::AlreadyGone(CM_PATH));
        th.delete_instance(&configmap(Some("bar")), &DeleteParams::default()).await;
        timeout_after_1s(mocksrv).await;
    }

    #[tokio::test]
    async fn deletes_cluster_scoped_namespace() {
        let (th, fakeserver) = testcontext();
        let mocksrv = fakeserver.run(Scenario::DeleteThenGone("/api/v1/namespaces/bar"));
        let ns = Namespace {
            metadata: ObjectMeta {
                name: Some("bar".into()),
                ..ObjectMeta::default()
            },
            ..Namespace::default()
        };
        th.delete_cluster_instance(&ns, &DeleteParams::default()).await;
        timeout_after_1s(mocksrv).await;
    }

    #[tokio::test]
    async fn deletes_dynamic_object() {
        let (th, fakeserver) = testcontext();
        let mocksrv = fakeserver.run(Scenario::DeleteThenGone(CM_PATH));
        let ar = ApiResource::erase::<ConfigMap>(&());
        let obj = DynamicObject::new("foo", &ar).within("bar");
        th.delete_dynamic(&obj, &ar, &Scope::Namespaced, &DeleteParams::default())
            .await;
        timeout_after_1s(mocksrv).await;
    }

    #[tokio::test]
    async fn namespaced_dynamic_object_falls_back_to_default_namespace() {
        let (th, fakeserver) = testcontext();
        // a cluster wide lookup would 404 and end the loop without a DELETE
        let mocksrv = fakeserver.run(Scenario::DeleteThenGone(DEFAULT_CM_PATH));
        let ar = ApiResource::erase::<ConfigMap>(&());
        let obj = DynamicObject::new("foo", &ar);
        th.try_delete_dynamic(&obj, &ar, &Scope::Namespaced, &DeleteParams::default())
            .await
            .unwrap();
        timeout_after_1s(mocksrv).await;
    }

    #[tokio::test]
    async fn cluster_scoped_dynamic_object_ignores_namespace() {
        let (th, fakeserver) = testcontext();
        let mocksrv = fakeserver.run(Scenario::DeleteThenGone("/api/v1/namespaces/bar"));
        let ar = ApiResource::erase::<Namespace>(&());
        let obj = DynamicObject::new("bar", &ar).within("stray");
        th.delete_dynamic(&obj, &ar, &Scope::Cluster, &DeleteParams::default())
            .await;
        timeout_after_1s(mocksrv).await;
    }

    #[tokio::test]
    async fn forbidden_lookup_is_reported() {
        let (th, fakeserver) = testcontext();
        let mocksrv = fakeserver.run(Scenario::Forbidden(CM_PATH));
        let err = th
            .try_delete_instance(&configmap(Some("bar")), &DeleteParams::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Get { .. }), "{err}");
        assert!(err.to_string().starts_with("failed to get ConfigMap bar/foo"), "{err}");
        timeout_after_1s(mocksrv).await;
    }

    #[tokio::test]
    #[should_panic(expected = "failed to get ConfigMap bar/foo")]
    async fn fail_fast_variant_panics() {
        let (th, fakeserver) = testcontext();
        let _mocksrv = fakeserver.run(Scenario::Forbidden(CM_PATH));
        th.delete_instance(&configmap(Some("bar")), &DeleteParams::default()).await;
    }

    #[tokio::test]
    async fn unnamed_objects_are_rejected_without_requests() {
        let (th, _fakeserver) = testcontext();
        let err = th
            .try_delete_instance(&ConfigMap::default(), &DeleteParams::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::MissingName));
    }

    #[tokio::test]
    async fn config_can_be_overridden() {
        let (mock_service, _handle) = tower_test::mock::pair::<Request<Body>, Response<Body>>();
        let config = WaitConfig::default().timeout(Duration::from_secs(30));
        let th = TestHelper::new(Client::new(mock_service, "default")).with_config(config);
        assert_eq!(th.config().timeout, Duration::from_secs(30));
        assert_eq!(th.client().default_namespace(), "default");
        let debug = format!("{th:?}");
        assert!(debug.starts_with("TestHelper {"), "{debug}");
        assert!(debug.contains("timeout: 30s"), "{debug}");
    }

    // ------------------------------------------------------------------------
    // mock apiserver
    // ------------------------------------------------------------------------

    type ApiServerHandle = tower_test::mock::Handle<Request<Body>, Response<Body>>;
    struct ApiServerVerifier(ApiServerHandle);

    async fn timeout_after_1s(handle: tokio::task::JoinHandle<()>) {
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("timeout on mock apiserver")
            .expect("scenario succeeded")
    }

    /// Request sequences the mock apiserver answers, keyed by object path
    enum Scenario {
        /// GET finds the object, DELETE accepts, the next GET is a 404
        DeleteThenGone(&'static str),
        /// GET is a 404 straight away
        AlreadyGone(&'static str),
        /// GET is rejected with a 403
        Forbidden(&'static str),
    }

    impl ApiServerVerifier {
        /// Runs one scenario to completion.
        ///
        /// If the helper makes more calls than the scenario answers it sees a
        /// `Service(Closed(()))` error, so await the handle with a timeout.
        fn run(self, scenario: Scenario) -> tokio::task::JoinHandle<()> {
            tokio::spawn(async move {
                match scenario {
                    Scenario::DeleteThenGone(path) => {
                        self.handle_get(path, StatusCode::OK)
                            .await
                            .handle_delete(path)
                            .await
                            .handle_get(path, StatusCode::NOT_FOUND)
                            .await
                    }
                    Scenario::AlreadyGone(path) => {
                        self.handle_get(path, StatusCode::NOT_FOUND).await
                    }
                    Scenario::Forbidden(path) => self.handle_get(path, StatusCode::FORBIDDEN).await,
                };
            })
        }

        async fn handle_get(mut self, path: &str, status: StatusCode) -> Self {
            let (request, send) = self.0.next_request().await.expect("service not called");
            assert_eq!(request.method(), Method::GET);
            assert_eq!(request.uri().path(), path);
            let body = if status.is_success() {
                object_for(path, false)
            } else {
                status_for(path, status)
            };
            send.send_response(
                Response::builder()
                    .status(status)
                    .body(Body::from(serde_json::to_vec(&body).unwrap()))
                    .unwrap(),
            );
            self
        }

        async fn handle_delete(mut self, path: &str) -> Self {
            let (request, send) = self.0.next_request().await.expect("service not called");
            assert_eq!(request.method(), Method::DELETE);
            assert_eq!(request.uri().path(), path);
            let body = object_for(path, true);
            send.send_response(
                Response::builder()
                    .body(Body::from(serde_json::to_vec(&body).unwrap()))
                    .unwrap(),
            );
            self
        }
    }

    fn name_of(path: &str) -> &str {
        path.rsplit('/').next().unwrap()
    }

    fn object_for(path: &str, terminating: bool) -> serde_json::Value {
        let mut obj = if path.contains("/configmaps/") {
            json!({
                "apiVersion": "v1",
                "kind": "ConfigMap",
                "metadata": { "name": name_of(path), "namespace": path.split('/').nth(4).unwrap() },
            })
        } else {
            json!({
                "apiVersion": "v1",
                "kind": "Namespace",
                "metadata": { "name": name_of(path) },
            })
        };
        if terminating {
            obj["metadata"]["deletionTimestamp"] = "2024-01-01T00:00:00Z".into();
        }
        obj
    }

    fn status_for(path: &str, status: StatusCode) -> serde_json::Value {
        let reason = match status {
            StatusCode::NOT_FOUND => "NotFound",
            StatusCode::FORBIDDEN => "Forbidden",
            _ => "InternalError",
        };
        json!({
            "kind": "Status",
            "apiVersion": "v1",
            "metadata": {},
            "status": "Failure",
            "message": format!("{} {reason}", name_of(path)),
            "reason": reason,
            "code": status.as_u16(),
        })
    }

    fn testcontext() -> (TestHelper, ApiServerVerifier) {
        let (mock_service, handle) = tower_test::mock::pair::<Request<Body>, Response<Body>>();
        let config = WaitConfig::default()
            .timeout(Duration::from_secs(5))
            .interval(Duration::from_millis(10));
        let th = TestHelper::new(Client::new(mock_service, "default")).with_config(config);
        (th, ApiServerVerifier(handle))
    }
}
