use anyhow::{Context, Result};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Pod;
use kube::api::{Api, ListParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};

use super::AuxiliaryCheck;
use crate::config::ClusterConfig;

/// Counts pods in one namespace, or across the cluster when none is set.
pub struct ClusterPodCheck {
    config: ClusterConfig,
}

impl ClusterPodCheck {
    pub fn new(config: ClusterConfig) -> Self {
        Self { config }
    }

    async fn client(&self) -> Result<Client> {
        let Some(path) = &self.config.kubeconfig else {
            return Client::try_default().await.context("infer kubernetes config");
        };
        let kubeconfig = Kubeconfig::read_from(path)
            .with_context(|| format!("read kubeconfig {}", path.display()))?;
        let config = Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
            .await
            .context("load kubeconfig")?;
        Client::try_from(config).context("create kubernetes client")
    }
}

#[async_trait]
impl AuxiliaryCheck for ClusterPodCheck {
    fn name(&self) -> &str {
        "Cluster Pods"
    }

    async fn check(&self) -> Result<String> {
        let client = self.client().await?;
        let pods: Api<Pod> = match &self.config.namespace {
            Some(ns) => Api::namespaced(client, ns),
            None => Api::all(client),
        };
        let list = pods.list(&ListParams::default()).await.context("list pods")?;
        Ok(list.items.len().to_string())
    }
}
