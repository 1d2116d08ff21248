//! Extraction of CPU claims from a Pod's primary container

use k8s_openapi::api::core::v1::Container;
use k8s_openapi::api::core::v1::Pod;
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;

use crate::domain::quantity;
use crate::domain::quantity::QuantityError;

pub const CPU_RESOURCE: &str = "cpu";

/// Where the recorded CPU request is read from.
///
/// `Limits` reproduces the behaviour PodInfo consumers were built against: the
/// request is read from the limits map and therefore always equals the limit.
/// `Requests` reads the container's actual request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum, derive_more::Display)]
pub enum CpuRequestSource {
    #[default]
    #[display("limits")]
    Limits,
    #[display("requests")]
    Requests,
}

/// CPU claims of the primary container, in whole cores.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CpuClaims {
    pub limit: i64,
    pub request: i64,
}

/// Why no claims could be read. None of these is an error: the Pod simply gets
/// no PodInfo.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum MissingCpuData {
    #[display("pod has no containers")]
    NoContainers,
    #[display("primary container has no cpu limit")]
    NoCpuLimit,
    #[display("cpu {field} {value:?} is invalid: {reason}")]
    InvalidQuantity {
        field: &'static str,
        value: String,
        reason: QuantityError,
    },
}

fn primary_container(pod: &Pod) -> Option<&Container> {
    pod.spec.as_ref()?.containers.first()
}

/// CPU limit of container 0, if set.
pub fn primary_cpu_limit(pod: &Pod) -> Option<&Quantity> {
    primary_container(pod)?
        .resources
        .as_ref()?
        .limits
        .as_ref()?
        .get(CPU_RESOURCE)
}

/// CPU request of container 0, if set.
pub fn primary_cpu_request(pod: &Pod) -> Option<&Quantity> {
    primary_container(pod)?
        .resources
        .as_ref()?
        .requests
        .as_ref()?
        .get(CPU_RESOURCE)
}

fn whole_cores(field: &'static str, quantity: &Quantity) -> Result<i64, MissingCpuData> {
    quantity::ceil_value(&quantity.0).map_err(|reason| MissingCpuData::InvalidQuantity {
        field,
        value: quantity.0.clone(),
        reason,
    })
}

/// Reads the CPU limit and request of the Pod's primary container.
///
/// With [`CpuRequestSource::Requests`] a missing request falls back to the
/// limit, as the API server does when only a limit is given.
pub fn extract_cpu_claims(
    pod: &Pod,
    source: CpuRequestSource,
) -> Result<CpuClaims, MissingCpuData> {
    if primary_container(pod).is_none() {
        return Err(MissingCpuData::NoContainers);
    }

    let limit_quantity = primary_cpu_limit(pod).ok_or(MissingCpuData::NoCpuLimit)?;
    let limit = whole_cores("limit", limit_quantity)?;

    let request = match source {
        CpuRequestSource::Limits => limit,
        CpuRequestSource::Requests => match primary_cpu_request(pod) {
            Some(request_quantity) => whole_cores("request", request_quantity)?,
            None => limit,
        },
    };

    Ok(CpuClaims { limit, request })
}
