//! REST binding of [`ProviderClient`].
//!
//! Every request carries the secret as `X-Auth-Token` and a fresh
//! `X-Request-Id`. Paths are resolved under `{api_url}/regions/{region}`.

mod wire;

use std::time::Duration;

use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;
use uuid::Uuid;

use crate::config::ProviderConfig;
use crate::provider::{
    MachineFields, MachineSpec, MachineState, OperationHandle, OperationStatus, ProviderClient,
    ProviderError, ProviderFuture, ResourceId, VolumeDescriptor, VolumeId,
};
use wire::{
    CreateMachineRequest, MachineEnvelope, OperationReport, OperationStarted, ResizeRequest,
    VolumeList,
};

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);
const AUTH_HEADER: &str = "X-Auth-Token";
const REQUEST_ID_HEADER: &str = "X-Request-Id";

/// Control plane client speaking JSON over HTTP.
#[derive(Clone, Debug)]
pub struct HttpProviderClient {
    http: reqwest::Client,
    api_url: String,
    region: String,
    secret_key: String,
}

impl HttpProviderClient {
    /// Builds a client for one region.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Transport`] when the HTTP client cannot be
    /// initialised.
    pub fn new(
        api_url: &str,
        secret_key: impl Into<String>,
        region: impl Into<String>,
    ) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder().timeout(HTTP_TIMEOUT).build()?;
        Ok(Self {
            http,
            api_url: api_url.trim_end_matches('/').to_owned(),
            region: region.into(),
            secret_key: secret_key.into(),
        })
    }

    /// Builds a client from provider settings for `region`.
    ///
    /// # Errors
    ///
    /// See [`Self::new`].
    pub fn from_config(config: &ProviderConfig, region: &str) -> Result<Self, ProviderError> {
        Self::new(&config.api_url, config.secret_key.clone(), region)
    }

    /// Region this client addresses.
    #[must_use]
    pub fn region(&self) -> &str {
        &self.region
    }

    fn url(&self, region: &str, path: &str) -> String {
        format!("{}/regions/{region}{path}", self.api_url)
    }

    fn request(&self, method: Method, region: &str, path: &str) -> RequestBuilder {
        let request_id = Uuid::new_v4().to_string();
        let url = self.url(region, path);
        debug!(%method, %url, %request_id, "sending provider request");
        self.http
            .request(method, url)
            .header(AUTH_HEADER, &self.secret_key)
            .header(REQUEST_ID_HEADER, request_id)
    }

    /// Sends `request` and checks the status code. A 404 becomes
    /// [`ProviderError::NotFound`] naming `resource`.
    async fn send(
        request: RequestBuilder,
        resource: impl FnOnce() -> String + Send,
    ) -> Result<reqwest::Response, ProviderError> {
        let response = request.send().await?;
        let status = response.status();
        debug!(status = status.as_u16(), "provider responded");
        if status.is_success() {
            return Ok(response);
        }
        if status == StatusCode::NOT_FOUND {
            return Err(ProviderError::NotFound {
                resource: resource(),
            });
        }
        let message = response.text().await.unwrap_or_default();
        Err(ProviderError::Rejected {
            status: status.as_u16(),
            message,
        })
    }

    async fn send_json<T: DeserializeOwned>(
        request: RequestBuilder,
        resource: impl FnOnce() -> String + Send,
    ) -> Result<T, ProviderError> {
        let body = Self::send(request, resource).await?.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn start(
        request: RequestBuilder,
        resource: impl FnOnce() -> String + Send,
    ) -> Result<OperationHandle, ProviderError> {
        let started: OperationStarted = Self::send_json(request, resource).await?;
        Ok(OperationHandle::from(started))
    }
}

fn machine(id: &ResourceId) -> impl FnOnce() -> String + Send + '_ {
    move || format!("machine {id}")
}

impl ProviderClient for HttpProviderClient {
    fn create_machine<'a>(&'a self, spec: &'a MachineSpec) -> ProviderFuture<'a, OperationHandle> {
        Box::pin(async move {
            let request = self
                .request(Method::POST, &spec.region, "/machines")
                .json(&CreateMachineRequest::from(spec));
            Self::start(request, || format!("region {}", spec.region)).await
        })
    }

    fn get_machine<'a>(&'a self, id: &'a ResourceId) -> ProviderFuture<'a, MachineState> {
        Box::pin(async move {
            let request = self.request(Method::GET, &self.region, &format!("/machines/{id}"));
            let envelope: MachineEnvelope = Self::send_json(request, machine(id)).await?;
            Ok(MachineState::from(envelope))
        })
    }

    fn resize_machine<'a>(
        &'a self,
        id: &'a ResourceId,
        size_class: &'a str,
    ) -> ProviderFuture<'a, OperationHandle> {
        Box::pin(async move {
            let request = self
                .request(Method::POST, &self.region, &format!("/machines/{id}/resize"))
                .json(&ResizeRequest { size_class });
            Self::start(request, machine(id)).await
        })
    }

    fn update_machine_fields<'a>(
        &'a self,
        id: &'a ResourceId,
        fields: &'a MachineFields,
    ) -> ProviderFuture<'a, ()> {
        Box::pin(async move {
            let request = self
                .request(Method::PATCH, &self.region, &format!("/machines/{id}"))
                .json(fields);
            Self::send(request, machine(id)).await?;
            Ok(())
        })
    }

    fn delete_machine<'a>(&'a self, id: &'a ResourceId) -> ProviderFuture<'a, OperationHandle> {
        Box::pin(async move {
            let request = self.request(Method::DELETE, &self.region, &format!("/machines/{id}"));
            Self::start(request, machine(id)).await
        })
    }

    fn attach_volume<'a>(
        &'a self,
        machine_id: &'a ResourceId,
        volume: &'a VolumeDescriptor,
    ) -> ProviderFuture<'a, OperationHandle> {
        Box::pin(async move {
            let request = self
                .request(
                    Method::POST,
                    &self.region,
                    &format!("/machines/{machine_id}/volumes"),
                )
                .json(volume);
            Self::start(request, machine(machine_id)).await
        })
    }

    fn detach_volume<'a>(
        &'a self,
        machine_id: &'a ResourceId,
        volume_id: &'a VolumeId,
    ) -> ProviderFuture<'a, OperationHandle> {
        Box::pin(async move {
            let request = self.request(
                Method::DELETE,
                &self.region,
                &format!("/machines/{machine_id}/volumes/{volume_id}"),
            );
            Self::start(request, || {
                format!("volume {volume_id} on machine {machine_id}")
            })
            .await
        })
    }

    fn list_attached_volumes<'a>(
        &'a self,
        machine_id: &'a ResourceId,
    ) -> ProviderFuture<'a, Vec<VolumeDescriptor>> {
        Box::pin(async move {
            let request = self.request(
                Method::GET,
                &self.region,
                &format!("/machines/{machine_id}/volumes"),
            );
            let list: VolumeList = Self::send_json(request, machine(machine_id)).await?;
            Ok(list.into())
        })
    }

    fn operation_status<'a>(
        &'a self,
        handle: &'a OperationHandle,
    ) -> ProviderFuture<'a, OperationStatus> {
        Box::pin(async move {
            let request = self.request(Method::GET, &self.region, &format!("/operations/{handle}"));
            let report: OperationReport =
                Self::send_json(request, || format!("operation {handle}")).await?;
            Ok(OperationStatus::from(report))
        })
    }
}
