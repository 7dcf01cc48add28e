use std::time::Duration;

use k8s_openapi::api::core::v1::ConfigMap;
use kube::{
    api::{Api, DeleteParams, Patch, PatchParams, PostParams},
    Client,
};
use kube_teardown::{Error, TestHelper, WaitConfig};
use tracing::info;

const FINALIZER: &str = "teardown.kube.rs/hold";

fn configmap(name: &str, finalizers: Option<Vec<String>>) -> anyhow::Result<ConfigMap> {
    Ok(serde_json::from_value(serde_json::json!({
        "apiVersion": "v1",
        "kind": "ConfigMap",
        "metadata": {
            "name": name,
            "finalizers": finalizers,
        },
        "data": { "hello": "world" }
    }))?)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let client = Client::try_default().await?;
    let th = TestHelper::new(client.clone()).with_config(WaitConfig::from_env()?);
    let cms: Api<ConfigMap> = Api::default_namespaced(client);

    info!("Creating plain configmap");
    let plain = cms.create(&PostParams::default(), &configmap("teardown-plain", None)?).await?;
    th.delete_instance(&plain, &DeleteParams::background()).await;
    anyhow::ensure!(cms.get_opt("teardown-plain").await?.is_none(), "plain configmap survived");

    info!("Deleting it again");
    th.delete_instance(&plain, &DeleteParams::default()).await;

    info!("Creating configmap held by a finalizer");
    let held = configmap("teardown-held", Some(vec![FINALIZER.into()]))?;
    let held = cms.create(&PostParams::default(), &held).await?;
    let impatient = th.clone().with_config(
        WaitConfig::default()
            .timeout(Duration::from_secs(3))
            .interval(Duration::from_millis(250)),
    );
    match impatient.try_delete_instance(&held, &DeleteParams::default()).await {
        Err(Error::Timeout { last, .. }) => info!("Timed out as expected: {last}"),
        other => anyhow::bail!("expected a timeout, got {other:?}"),
    }

    info!("Releasing finalizer");
    let release = serde_json::json!({ "metadata": { "finalizers": null } });
    cms.patch("teardown-held", &PatchParams::default(), &Patch::Merge(&release))
        .await?;
    th.delete_instance(&held, &DeleteParams::default()).await;
    anyhow::ensure!(cms.get_opt("teardown-held").await?.is_none(), "held configmap survived");
    Ok(())
}
