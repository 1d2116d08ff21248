pub mod dispatcher;
pub mod k8s;
pub mod kube_client;
pub mod logging;
