use std::sync::Arc;

use error_stack::Report;
use poem::get;
use poem::listener::TcpListener;
use poem::middleware::Tracing;
use poem::Endpoint;
use poem::EndpointExt;
use poem::Route;
use poem::Server;
use tokio_util::sync::CancellationToken;
use tracing::error;
use tracing::info;

use super::errors::ApiError;
use super::handlers::get_pod_info;
use super::handlers::healthz;
use super::handlers::list_pod_infos;
use crate::domain::IdentityCache;

/// HTTP API server exposing the identity cache
pub struct ApiServer {
    cache: Arc<IdentityCache>,
    listen_addr: String,
}

impl ApiServer {
    pub fn new(cache: Arc<IdentityCache>, listen_addr: String) -> Self {
        Self { cache, listen_addr }
    }

    pub(crate) fn routes(&self) -> impl Endpoint {
        Route::new()
            .at("/healthz", get(healthz))
            .at("/api/v1/podinfos", get(list_pod_infos))
            .at("/api/v1/podinfos/:pod_name", get(get_pod_info))
            .data(Arc::clone(&self.cache))
            .with(Tracing)
    }

    /// Start the API server and serve until cancelled
    ///
    /// # Errors
    ///
    /// - [`ApiError::ServerError`] if the server fails to start or bind to the address
    pub async fn run(self, cancellation_token: CancellationToken) -> Result<(), Report<ApiError>> {
        info!("Starting HTTP API server on {}", self.listen_addr);

        let app = self.routes();
        let listener = TcpListener::bind(&self.listen_addr);
        let server = Server::new(listener);

        tokio::select! {
            result = server.run(app) => {
                match result {
                    Ok(()) => {
                        info!("API server stopped normally");
                        Ok(())
                    }
                    Err(e) => {
                        error!("API server failed: {e}");
                        Err(Report::new(ApiError::ServerError {
                            message: format!("Server failed: {e}"),
                        }))
                    }
                }
            }
            _ = cancellation_token.cancelled() => {
                info!("API server shutdown requested");
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use api_types::PodInfo;
    use api_types::PodInfoListResponse;
    use api_types::PodInfoResponse;
    use api_types::PodInfoSpec;
    use poem::http::StatusCode;
    use poem::test::TestClient;
    use similar_asserts::assert_eq;
    use test_log::test;

    use super::*;

    fn tracked(pod_name: &str, node_name: &str) -> PodInfo {
        PodInfo::for_pod(
            "flux-system",
            PodInfoSpec {
                pod_name: pod_name.to_string(),
                pod_namespace: Some("default".to_string()),
                node_name: node_name.to_string(),
                cpu_limit: 2,
                cpu_request: 2,
            },
        )
    }

    fn client_with(records: &[PodInfo]) -> TestClient<impl Endpoint> {
        let cache = Arc::new(IdentityCache::new());
        for record in records {
            cache.insert(&record.spec.pod_name, record.clone());
        }
        let server = ApiServer::new(cache, "127.0.0.1:0".to_string());
        TestClient::new(server.routes())
    }

    #[test(tokio::test)]
    async fn healthz_answers_ok() {
        let client = client_with(&[]);

        let resp = client.get("/healthz").send().await;
        resp.assert_status_is_ok();
        resp.assert_text("ok").await;
    }

    #[test(tokio::test)]
    async fn lists_tracked_records_in_pod_name_order() {
        let client = client_with(&[tracked("p2", "n2"), tracked("p1", "n1")]);

        let resp = client.get("/api/v1/podinfos").send().await;
        resp.assert_status_is_ok();
        let list: PodInfoListResponse = resp.json().await.value().deserialize();

        assert_eq!(list.count, 2);
        let names: Vec<_> = list.items.iter().map(|i| i.record_name.as_str()).collect();
        assert_eq!(names, ["podinfo-p1", "podinfo-p2"]);
        assert_eq!(list.items[0].spec.node_name, "n1");
    }

    #[test(tokio::test)]
    async fn returns_single_tracked_record() {
        let client = client_with(&[tracked("p1", "n1")]);

        let resp = client.get("/api/v1/podinfos/p1").send().await;
        resp.assert_status_is_ok();
        let body: PodInfoResponse = resp.json().await.value().deserialize();

        assert!(body.success);
        let data = body.data.expect("tracked record");
        assert_eq!(data.record_name, "podinfo-p1");
        assert_eq!(data.record_namespace.as_deref(), Some("flux-system"));
        assert_eq!(data.spec.cpu_limit, 2);
    }

    #[test(tokio::test)]
    async fn untracked_pod_is_reported_without_data() {
        let client = client_with(&[]);

        let resp = client.get("/api/v1/podinfos/ghost").send().await;
        resp.assert_status(StatusCode::OK);
        let body: PodInfoResponse = resp.json().await.value().deserialize();

        assert!(!body.success);
        assert!(body.data.is_none());
        assert_eq!(body.message, "Pod ghost is not tracked");
    }
}
