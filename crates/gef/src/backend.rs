//! The seam between the dispatch pipeline and an execution cluster.

use async_trait::async_trait;
use bytes::Bytes;

use bridgit_core::job::{OutputReference, RemoteJobHandle, ServiceId};

use crate::api::{GefApi, GefApiError};

/// The three remote operations a job dispatch needs, in call order.
#[async_trait]
pub trait ExecutionBackend: Send + Sync {
    /// Human-readable address of the cluster, used in diagnostics.
    fn address(&self) -> &str;

    async fn submit_job(
        &self,
        service_id: &ServiceId,
        access_token: &str,
        input_ref: &str,
    ) -> Result<RemoteJobHandle, GefApiError>;

    async fn resolve_output_location(
        &self,
        access_token: &str,
        handle: &RemoteJobHandle,
    ) -> Result<OutputReference, GefApiError>;

    async fn fetch_output_bytes(&self, location: &str) -> Result<Bytes, GefApiError>;
}

#[async_trait]
impl ExecutionBackend for GefApi {
    fn address(&self) -> &str {
        self.base_url()
    }

    async fn submit_job(
        &self,
        service_id: &ServiceId,
        access_token: &str,
        input_ref: &str,
    ) -> Result<RemoteJobHandle, GefApiError> {
        GefApi::submit_job(self, service_id, access_token, input_ref).await
    }

    async fn resolve_output_location(
        &self,
        access_token: &str,
        handle: &RemoteJobHandle,
    ) -> Result<OutputReference, GefApiError> {
        GefApi::resolve_output_location(self, access_token, handle).await
    }

    async fn fetch_output_bytes(&self, location: &str) -> Result<Bytes, GefApiError> {
        GefApi::fetch_output_bytes(self, location).await
    }
}
