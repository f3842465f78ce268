use std::time::Duration;

use diqwest::WithDigestAuth;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;

use super::error::AtlasError;
use super::types::{ArchiveRequest, ArchiveStatus, ClusterRequest, ClusterResponse};

const API_BASE: &str = "https://cloud.mongodb.com/api/atlas/v1.0";

/// Control-plane client. Every request is signed with HTTP digest auth
/// using the public/private API key pair.
#[derive(Debug, Clone)]
pub struct AtlasClient {
    public_key: String,
    private_key: String,
    client: Client,
    base_url: String,
}

impl AtlasClient {
    pub fn new(public_key: String, private_key: String) -> Self {
        Self::with_base_url(public_key, private_key, API_BASE.to_string())
    }

    /// Create a client pointing at a custom base URL (useful for testing).
    pub fn with_base_url(public_key: String, private_key: String, base_url: String) -> Self {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(60))
            .build()
            .expect("failed to build HTTP client");
        Self {
            public_key,
            private_key,
            client,
            base_url,
        }
    }

    /// Submit an asynchronous create-cluster request. The response reflects
    /// the accepted request; provisioning continues in the background.
    pub async fn create_cluster(
        &self,
        group_id: &str,
        request: &ClusterRequest,
    ) -> Result<ClusterResponse, AtlasError> {
        let url = format!("{}/groups/{group_id}/clusters", self.base_url);
        self.send(self.client.post(&url).json(request)).await
    }

    /// Fetch cluster metadata, including its connection strings.
    pub async fn get_cluster(
        &self,
        group_id: &str,
        cluster_name: &str,
    ) -> Result<ClusterResponse, AtlasError> {
        let url = format!("{}/groups/{group_id}/clusters/{cluster_name}", self.base_url);
        self.send(self.client.get(&url)).await
    }

    /// Create an online archive on a collection. The returned id is stable
    /// for the lifetime of the archive.
    pub async fn create_online_archive(
        &self,
        group_id: &str,
        cluster_name: &str,
        request: &ArchiveRequest,
    ) -> Result<ArchiveStatus, AtlasError> {
        let url = format!(
            "{}/groups/{group_id}/clusters/{cluster_name}/onlineArchives",
            self.base_url
        );
        self.send(self.client.post(&url).json(request)).await
    }

    /// Fetch the current state of an online archive.
    pub async fn get_online_archive(
        &self,
        group_id: &str,
        cluster_name: &str,
        archive_id: &str,
    ) -> Result<ArchiveStatus, AtlasError> {
        let url = format!(
            "{}/groups/{group_id}/clusters/{cluster_name}/onlineArchives/{archive_id}",
            self.base_url
        );
        self.send(self.client.get(&url)).await
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, AtlasError> {
        let response = builder
            .header("content-type", "application/json")
            .send_with_digest_auth(&self.public_key, &self.private_key)
            .await?;

        let status = response.status();

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(AtlasError::Unauthorized {
                status: status.as_u16(),
            });
        }

        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(AtlasError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.json::<T>().await?;
        Ok(body)
    }
}
