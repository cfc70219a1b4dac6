use reqwest::{Method, StatusCode, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, info};

use pkg_constants::network::KUBE_TIMEOUT_SECS;
use pkg_constants::paths::{SERVICE_ACCOUNT_CA, SERVICE_ACCOUNT_NAMESPACE, SERVICE_ACCOUNT_TOKEN};
use pkg_types::kube::{
    Deployment, Endpoints, Event, KubeLease, List, Node, NodeMetrics, Pod, Service,
};

#[derive(Debug, thiserror::Error)]
pub enum KubeError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("API server returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid URL: {0}")]
    Url(String),
}

/// Where and how to reach the API server.
#[derive(Debug, Clone)]
pub struct KubeConfig {
    pub base_url: String,
    pub token: Option<String>,
    pub ca_pem: Option<Vec<u8>>,
    /// Namespace for namespaced reads and the report lease
    pub namespace: String,
}

impl KubeConfig {
    /// Service account config mounted into every pod.
    pub fn in_cluster() -> anyhow::Result<Self> {
        let host = std::env::var("KUBERNETES_SERVICE_HOST")
            .map_err(|_| anyhow::anyhow!("KUBERNETES_SERVICE_HOST not set; not running in a cluster?"))?;
        let port = std::env::var("KUBERNETES_SERVICE_PORT").unwrap_or_else(|_| "443".to_string());
        let token = std::fs::read_to_string(SERVICE_ACCOUNT_TOKEN)
            .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", SERVICE_ACCOUNT_TOKEN, e))?;
        let ca_pem = std::fs::read(SERVICE_ACCOUNT_CA)
            .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", SERVICE_ACCOUNT_CA, e))?;
        let namespace = std::fs::read_to_string(SERVICE_ACCOUNT_NAMESPACE)
            .map(|ns| ns.trim().to_string())
            .unwrap_or_else(|_| "default".to_string());

        // IPv6 service hosts need brackets in the authority.
        let host = if host.contains(':') {
            format!("[{}]", host)
        } else {
            host
        };

        Ok(Self {
            base_url: format!("https://{}:{}", host, port),
            token: Some(token.trim().to_string()),
            ca_pem: Some(ca_pem),
            namespace,
        })
    }

    /// An explicit API URL without credentials, e.g. `http://127.0.0.1:8001`.
    pub fn from_url(base_url: &str, namespace: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
            ca_pem: None,
            namespace: namespace.to_string(),
        }
    }
}

/// JSON client for the handful of core, apps, metrics and coordination
/// endpoints the bot uses.
#[derive(Clone)]
pub struct KubeClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
    namespace: String,
}

impl KubeClient {
    pub fn new(config: KubeConfig) -> anyhow::Result<Self> {
        let mut builder =
            reqwest::Client::builder().timeout(Duration::from_secs(KUBE_TIMEOUT_SECS));
        if let Some(pem) = &config.ca_pem {
            builder = builder.add_root_certificate(reqwest::Certificate::from_pem(pem)?);
        }
        info!(
            "Kubernetes API at {} (namespace {})",
            config.base_url, config.namespace
        );
        Ok(Self {
            http: builder.build()?,
            base_url: config.base_url,
            token: config.token,
            namespace: config.namespace,
        })
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    fn url(&self, path: &str, query: &[(&str, &str)]) -> Result<Url, KubeError> {
        let raw = format!("{}{}", self.base_url, path);
        let mut url = Url::parse(&raw).map_err(|e| KubeError::Url(format!("{}: {}", raw, e)))?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    async fn send(
        &self,
        method: Method,
        url: Url,
        body: Option<&impl Serialize>,
    ) -> Result<reqwest::Response, KubeError> {
        debug!("{} {}", method, url);
        let mut req = self.http.request(method, url.clone());
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }
        if let Some(body) = body {
            req = req.json(body);
        }
        let resp = req.send().await?;
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        let message = resp.text().await.unwrap_or_default();
        let message: String = message.chars().take(300).collect();
        match status {
            StatusCode::NOT_FOUND => Err(KubeError::NotFound(url.path().to_string())),
            StatusCode::CONFLICT => Err(KubeError::Conflict(url.path().to_string())),
            _ => Err(KubeError::Status {
                status: status.as_u16(),
                message,
            }),
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, KubeError> {
        let url = self.url(path, query)?;
        let resp = self.send(Method::GET, url, None::<&()>).await?;
        Ok(resp.json().await?)
    }

    // --- Cluster-wide reads ---

    pub async fn list_nodes(&self) -> Result<Vec<Node>, KubeError> {
        let list: List<Node> = self.get_json("/api/v1/nodes", &[]).await?;
        Ok(list.items)
    }

    pub async fn list_node_metrics(&self) -> Result<Vec<NodeMetrics>, KubeError> {
        let list: List<NodeMetrics> = self
            .get_json("/apis/metrics.k8s.io/v1beta1/nodes", &[])
            .await?;
        Ok(list.items)
    }

    pub async fn list_all_pods(&self) -> Result<Vec<Pod>, KubeError> {
        let list: List<Pod> = self.get_json("/api/v1/pods", &[]).await?;
        Ok(list.items)
    }

    // --- Namespaced reads ---

    pub async fn list_pods(&self, label_selector: &str) -> Result<Vec<Pod>, KubeError> {
        let path = format!("/api/v1/namespaces/{}/pods", self.namespace);
        let list: List<Pod> = self
            .get_json(&path, &[("labelSelector", label_selector)])
            .await?;
        Ok(list.items)
    }

    pub async fn get_deployment(&self, name: &str) -> Result<Deployment, KubeError> {
        let path = format!(
            "/apis/apps/v1/namespaces/{}/deployments/{}",
            self.namespace, name
        );
        self.get_json(&path, &[]).await
    }

    pub async fn list_services(&self) -> Result<Vec<Service>, KubeError> {
        let path = format!("/api/v1/namespaces/{}/services", self.namespace);
        let list: List<Service> = self.get_json(&path, &[]).await?;
        Ok(list.items)
    }

    pub async fn get_endpoints(&self, name: &str) -> Result<Endpoints, KubeError> {
        let path = format!("/api/v1/namespaces/{}/endpoints/{}", self.namespace, name);
        self.get_json(&path, &[]).await
    }

    pub async fn list_events(&self) -> Result<Vec<Event>, KubeError> {
        let path = format!("/api/v1/namespaces/{}/events", self.namespace);
        let list: List<Event> = self.get_json(&path, &[]).await?;
        Ok(list.items)
    }

    /// Last `tail_lines` lines of a pod's log.
    pub async fn pod_log(&self, pod: &str, tail_lines: u32) -> Result<String, KubeError> {
        let path = format!("/api/v1/namespaces/{}/pods/{}/log", self.namespace, pod);
        let tail = tail_lines.to_string();
        let url = self.url(&path, &[("tailLines", tail.as_str())])?;
        let resp = self.send(Method::GET, url, None::<&()>).await?;
        Ok(resp.text().await?)
    }

    // --- coordination.k8s.io leases ---

    fn leases_path(&self) -> String {
        format!(
            "/apis/coordination.k8s.io/v1/namespaces/{}/leases",
            self.namespace
        )
    }

    pub async fn get_lease(&self, name: &str) -> Result<KubeLease, KubeError> {
        let path = format!("{}/{}", self.leases_path(), name);
        self.get_json(&path, &[]).await
    }

    /// POST a new lease; `Conflict` if one with that name exists.
    pub async fn create_lease(&self, lease: &KubeLease) -> Result<KubeLease, KubeError> {
        let url = self.url(&self.leases_path(), &[])?;
        let resp = self.send(Method::POST, url, Some(lease)).await?;
        Ok(resp.json().await?)
    }

    /// PUT a lease; `Conflict` if its resourceVersion is stale.
    pub async fn replace_lease(&self, lease: &KubeLease) -> Result<KubeLease, KubeError> {
        let path = format!("{}/{}", self.leases_path(), lease.metadata.name);
        let url = self.url(&path, &[])?;
        let resp = self.send(Method::PUT, url, Some(lease)).await?;
        Ok(resp.json().await?)
    }
}
