//! Hosted-anchor management surface.
//!
//! The anchor service exposes a REST inventory of hosted anchors alongside
//! the opaque host/resolve flow: list what a project has hosted, extend an
//! anchor's retention, or delete it early. Used by the CLI's `anchors`
//! commands; the session lifecycle never touches this.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::ServiceConfig;
use crate::error::ServiceError;
use crate::types::CloudAnchorId;

/// One hosted anchor as reported by the management API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostedAnchor {
    /// Resource name, `anchors/<id>`.
    pub name: String,
    #[serde(default)]
    pub create_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub expire_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_localize_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub maximum_expire_time: Option<DateTime<Utc>>,
}

impl HostedAnchor {
    /// The bare cloud anchor id, without the `anchors/` resource prefix.
    pub fn anchor_id(&self) -> &str {
        self.name.strip_prefix("anchors/").unwrap_or(&self.name)
    }
}

/// Management operations on hosted anchors.
#[async_trait]
pub trait AnchorManagement: Send + Sync {
    /// Every hosted anchor in the project, following pagination.
    async fn list_anchors(&self) -> Result<Vec<HostedAnchor>, ServiceError>;

    /// Move an anchor's expiry to the given time.
    async fn extend_ttl(
        &self,
        id: &CloudAnchorId,
        expire_time: DateTime<Utc>,
    ) -> Result<HostedAnchor, ServiceError>;

    /// Delete a hosted anchor.
    async fn delete_anchor(&self, id: &CloudAnchorId) -> Result<(), ServiceError>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListAnchorsResponse {
    #[serde(default)]
    anchors: Vec<HostedAnchor>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PatchAnchorRequest {
    expire_time: DateTime<Utc>,
}

/// HTTP client for the management API.
pub struct HttpManagementClient {
    http: Client,
    base_url: String,
    token: String,
}

impl HttpManagementClient {
    /// Build a client from service configuration. Requires an API token.
    pub fn new(config: &ServiceConfig) -> Result<Self, ServiceError> {
        let token = config.api_key.clone().ok_or_else(|| {
            ServiceError::AuthFailed("no API token configured for the anchor service".to_string())
        })?;
        let http = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| ServiceError::RequestFailed(e.to_string()))?;
        Ok(HttpManagementClient {
            http,
            base_url: config.endpoint.trim_end_matches('/').to_string(),
            token,
        })
    }

    fn anchors_url(&self) -> String {
        format!("{}/management/anchors", self.base_url)
    }

    fn anchor_url(&self, id: &CloudAnchorId) -> String {
        format!("{}/management/anchors/{}", self.base_url, id)
    }
}

#[async_trait]
impl AnchorManagement for HttpManagementClient {
    async fn list_anchors(&self) -> Result<Vec<HostedAnchor>, ServiceError> {
        let mut anchors = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self
                .http
                .get(self.anchors_url())
                .bearer_auth(&self.token)
                .query(&[("page_size", "100")]);
            if let Some(token) = &page_token {
                request = request.query(&[("page_token", token.as_str())]);
            }

            let response = request
                .send()
                .await
                .map_err(|e| ServiceError::RequestFailed(e.to_string()))?;
            let response = check_status(response).await?;
            let page: ListAnchorsResponse = response
                .json()
                .await
                .map_err(|e| ServiceError::BadResponse(e.to_string()))?;

            anchors.extend(page.anchors);
            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        Ok(anchors)
    }

    async fn extend_ttl(
        &self,
        id: &CloudAnchorId,
        expire_time: DateTime<Utc>,
    ) -> Result<HostedAnchor, ServiceError> {
        let response = self
            .http
            .patch(self.anchor_url(id))
            .bearer_auth(&self.token)
            .query(&[("updateMask", "expire_time")])
            .json(&PatchAnchorRequest { expire_time })
            .send()
            .await
            .map_err(|e| ServiceError::RequestFailed(e.to_string()))?;
        let response = check_status(response).await?;
        response
            .json()
            .await
            .map_err(|e| ServiceError::BadResponse(e.to_string()))
    }

    async fn delete_anchor(&self, id: &CloudAnchorId) -> Result<(), ServiceError> {
        let response = self
            .http
            .delete(self.anchor_url(id))
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| ServiceError::RequestFailed(e.to_string()))?;
        check_status(response).await?;
        Ok(())
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ServiceError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(map_status(status, &body))
}

fn map_status(status: StatusCode, body: &str) -> ServiceError {
    let detail = if body.is_empty() {
        status.to_string()
    } else {
        format!("{}: {}", status, body)
    };
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ServiceError::AuthFailed(detail),
        StatusCode::NOT_FOUND => ServiceError::AnchorNotFound(detail),
        StatusCode::TOO_MANY_REQUESTS => ServiceError::RateLimited(detail),
        _ => ServiceError::RequestFailed(detail),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anchor_id_strips_resource_prefix() {
        let anchor = HostedAnchor {
            name: "anchors/ua-123abc".to_string(),
            create_time: None,
            expire_time: None,
            last_localize_time: None,
            maximum_expire_time: None,
        };
        assert_eq!(anchor.anchor_id(), "ua-123abc");
    }

    #[test]
    fn bare_names_pass_through() {
        let anchor = HostedAnchor {
            name: "ua-raw".to_string(),
            create_time: None,
            expire_time: None,
            last_localize_time: None,
            maximum_expire_time: None,
        };
        assert_eq!(anchor.anchor_id(), "ua-raw");
    }

    #[test]
    fn status_codes_map_to_error_kinds() {
        assert!(matches!(
            map_status(StatusCode::UNAUTHORIZED, ""),
            ServiceError::AuthFailed(_)
        ));
        assert!(matches!(
            map_status(StatusCode::NOT_FOUND, "gone"),
            ServiceError::AnchorNotFound(_)
        ));
        assert!(matches!(
            map_status(StatusCode::TOO_MANY_REQUESTS, ""),
            ServiceError::RateLimited(_)
        ));
        assert!(matches!(
            map_status(StatusCode::INTERNAL_SERVER_ERROR, "boom"),
            ServiceError::RequestFailed(_)
        ));
    }

    #[test]
    fn list_response_tolerates_missing_fields() {
        let page: ListAnchorsResponse = serde_json::from_str("{}").unwrap();
        assert!(page.anchors.is_empty());
        assert!(page.next_page_token.is_none());

        let page: ListAnchorsResponse = serde_json::from_str(
            r#"{"anchors":[{"name":"anchors/ua-1","expireTime":"2026-09-01T00:00:00Z"}],"nextPageToken":"tok"}"#,
        )
        .unwrap();
        assert_eq!(page.anchors.len(), 1);
        assert_eq!(page.anchors[0].anchor_id(), "ua-1");
        assert_eq!(page.next_page_token.as_deref(), Some("tok"));
    }
}
