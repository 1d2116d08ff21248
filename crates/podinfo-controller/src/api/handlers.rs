use std::sync::Arc;

use api_types::PodInfoListResponse;
use api_types::PodInfoResponse;
use api_types::TrackedPodInfo;
use poem::handler;
use poem::web::Data;
use poem::web::Json;
use poem::web::Path;
use tracing::debug;

use crate::domain::IdentityCache;

#[handler]
pub async fn healthz() -> &'static str {
    "ok"
}

/// Every PodInfo the controller currently tracks, ordered by Pod name
#[handler]
pub async fn list_pod_infos(cache: Data<&Arc<IdentityCache>>) -> Json<PodInfoListResponse> {
    let items: Vec<TrackedPodInfo> = cache
        .snapshot()
        .iter()
        .map(TrackedPodInfo::from)
        .collect();
    Json(PodInfoListResponse {
        count: items.len(),
        items,
    })
}

/// The PodInfo tracked for a single Pod
#[handler]
pub async fn get_pod_info(
    Path(pod_name): Path<String>,
    cache: Data<&Arc<IdentityCache>>,
) -> Json<PodInfoResponse> {
    let Some(record) = cache.get(&pod_name) else {
        debug!(pod_name = %pod_name, "Pod not tracked");
        return Json(PodInfoResponse {
            success: false,
            data: None,
            message: format!("Pod {pod_name} is not tracked"),
        });
    };

    Json(PodInfoResponse {
        success: true,
        data: Some(TrackedPodInfo::from(&record)),
        message: format!("PodInfo {} retrieved successfully", record.record_name()),
    })
}
