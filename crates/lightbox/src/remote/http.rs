//! HTTP implementation of the content service.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use tracing::debug;
use url::Url;

use super::{ContentService, MetadataUpdate};
use crate::errors::{FetchError, FetchResult};
use crate::models::RemotePage;

/// JSON client for a portfolio backend.
#[derive(Debug, Clone)]
pub struct HttpContentService {
    client: Client,
    base_url: Url,
}

impl HttpContentService {
    /// Build a client against `base_url` with the given connect timeout.
    pub fn new<U: AsRef<str>>(base_url: U, connect_timeout: Duration) -> FetchResult<Self> {
        let mut base_url = Url::parse(base_url.as_ref())
            .map_err(|e| FetchError::invalid(format!("bad base url '{}': {e}", base_url.as_ref())))?;
        // Relative joins drop the last path segment unless it ends in '/'.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| FetchError::transport(base_url.as_str(), e.to_string()))?;
        Ok(Self { client, base_url })
    }

    fn endpoint(&self, path: &str) -> FetchResult<Url> {
        self.base_url
            .join(path)
            .map_err(|e| FetchError::invalid(format!("bad endpoint '{path}': {e}")))
    }

    fn check_status(url: &Url, status: StatusCode) -> FetchResult<()> {
        if status.is_success() {
            Ok(())
        } else {
            Err(FetchError::status(status.as_u16(), url.as_str()))
        }
    }

    async fn send_checked(&self, request: reqwest::RequestBuilder, url: &Url) -> FetchResult<Response> {
        let response = request
            .send()
            .await
            .map_err(|e| FetchError::transport(url.as_str(), e.to_string()))?;
        Self::check_status(url, response.status())?;
        Ok(response)
    }

    async fn get_page(&self, mut url: Url, pairs: &[(&str, String)]) -> FetchResult<RemotePage> {
        url.query_pairs_mut()
            .extend_pairs(pairs.iter().map(|(name, value)| (*name, value.as_str())));
        let response = self.send_checked(self.client.get(url.clone()), &url).await?;
        response
            .json::<RemotePage>()
            .await
            .map_err(|e| FetchError::payload(url.as_str(), e.to_string()))
    }
}

#[async_trait]
impl ContentService for HttpContentService {
    async fn list_page(
        &self,
        collection: &str,
        page: u32,
        page_size: u32,
    ) -> FetchResult<RemotePage> {
        let url = self.endpoint(&format!("collections/{collection}/images"))?;
        debug!(collection, page, "Listing collection page");
        self.get_page(
            url,
            &[
                ("page", page.to_string()),
                ("pageSize", page_size.to_string()),
            ],
        )
        .await
    }

    async fn search_page(
        &self,
        collection: &str,
        query: &str,
        page: u32,
        page_size: u32,
    ) -> FetchResult<RemotePage> {
        let url = self.endpoint(&format!("collections/{collection}/search"))?;
        debug!(collection, query, page, "Searching collection");
        self.get_page(
            url,
            &[
                ("q", query.to_string()),
                ("page", page.to_string()),
                ("pageSize", page_size.to_string()),
            ],
        )
        .await
    }

    async fn update_metadata(
        &self,
        collection: &str,
        id: &str,
        update: MetadataUpdate,
    ) -> FetchResult<()> {
        let url = self.endpoint(&format!("collections/{collection}/images/{id}"))?;
        debug!(collection, id, "Updating record metadata");
        self.send_checked(self.client.patch(url.clone()).json(&update), &url)
            .await?;
        Ok(())
    }

    async fn delete_record(&self, collection: &str, id: &str) -> FetchResult<()> {
        let url = self.endpoint(&format!("collections/{collection}/images/{id}"))?;
        debug!(collection, id, "Deleting record");
        self.send_checked(self.client.delete(url.clone()), &url).await?;
        Ok(())
    }

    async fn like(&self, collection: &str, id: &str) -> FetchResult<u64> {
        let url = self.endpoint(&format!("collections/{collection}/images/{id}/like"))?;
        let response = self.send_checked(self.client.post(url.clone()), &url).await?;

        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct LikeResponse {
            new_like_count: u64,
        }
        let body: LikeResponse = response
            .json()
            .await
            .map_err(|e| FetchError::payload(url.as_str(), e.to_string()))?;
        Ok(body.new_like_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_gains_trailing_slash_for_joins() {
        let service =
            HttpContentService::new("http://api.example.net/api", Duration::from_secs(5)).unwrap();
        let url = service.endpoint("collections/wildlife/images").unwrap();
        assert_eq!(
            url.as_str(),
            "http://api.example.net/api/collections/wildlife/images"
        );
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let err = HttpContentService::new("not a url", Duration::from_secs(5)).unwrap_err();
        assert!(matches!(err, FetchError::Invalid { .. }));
    }

    #[test]
    fn non_success_status_maps_to_typed_error() {
        let url = Url::parse("http://api.example.net/api/collections/wildlife/images").unwrap();
        let err =
            HttpContentService::check_status(&url, StatusCode::SERVICE_UNAVAILABLE).unwrap_err();
        match err {
            FetchError::Status { status, url } => {
                assert_eq!(status, 503);
                assert!(url.contains("wildlife"));
            }
            other => panic!("expected status error, got {other:?}"),
        }
    }
}
