//! Typed clients and models for the Resource Manager services in use.
//!
//! Each service client is a thin typed layer over [`Operations`], which knows how to
//! issue the standard GET/PUT/PATCH/DELETE/list calls against a resource ID path.

pub mod network;
pub mod relay;
pub mod resources;

use reqwest::{Method, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use tokio_util::sync::CancellationToken;

use crate::client::{Client, RequestOptions};
use crate::error::{Error, Result};
use crate::poller::Poller;

/// Standard resource operations for one api-version
#[derive(Debug, Clone)]
pub(crate) struct Operations {
    client: Client,
    api_version: &'static str,
}

impl Operations {
    pub(crate) fn new(client: Client, api_version: &'static str) -> Self {
        Self {
            client,
            api_version,
        }
    }

    fn request(&self, method: Method, path: &str) -> RequestOptions {
        RequestOptions::builder()
            .method(method)
            .path(path)
            .api_version(self.api_version)
            .build()
    }

    fn encode<B: Serialize>(body: &B) -> Result<serde_json::Value> {
        serde_json::to_value(body).map_err(Error::Encode)
    }

    pub(crate) async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.client
            .execute(&self.request(Method::GET, path))
            .await?
            .json()
    }

    async fn write<B: Serialize>(&self, method: Method, path: &str, body: &B) -> Result<Poller> {
        let options = RequestOptions {
            body: Some(Self::encode(body)?),
            expected_status: vec![StatusCode::OK, StatusCode::CREATED, StatusCode::ACCEPTED],
            ..self.request(method.clone(), path)
        };
        let response = self.client.execute(&options).await?;
        Poller::from_response(&self.client, &method, response)
    }

    pub(crate) async fn put<B: Serialize>(&self, path: &str, body: &B) -> Result<Poller> {
        self.write(Method::PUT, path, body).await
    }

    pub(crate) async fn patch<B: Serialize>(&self, path: &str, body: &B) -> Result<Poller> {
        self.write(Method::PATCH, path, body).await
    }

    pub(crate) async fn delete(&self, path: &str) -> Result<Poller> {
        let options = RequestOptions {
            expected_status: vec![StatusCode::OK, StatusCode::ACCEPTED, StatusCode::NO_CONTENT],
            ..self.request(Method::DELETE, path)
        };
        let response = self.client.execute(&options).await?;
        Poller::from_response(&self.client, &Method::DELETE, response)
    }

    /// POST to an action endpoint such as `{id}/register`
    pub(crate) async fn action<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.client
            .execute(&self.request(Method::POST, path))
            .await?
            .json()
    }

    pub(crate) fn poll_interval(&self) -> std::time::Duration {
        self.client.poll_interval()
    }

    pub(crate) async fn list<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>> {
        self.client.list_all(&self.request(Method::GET, path)).await
    }
}

/// Poll a write to completion and decode the resulting resource
pub(crate) async fn complete<T: DeserializeOwned>(poller: Poller, cancel: &CancellationToken) -> Result<T> {
    poller.poll_until_done(cancel).await?.json()
}

/// Poll a delete to completion, discarding the final body
pub(crate) async fn complete_delete(poller: Poller, cancel: &CancellationToken) -> Result<()> {
    poller.poll_until_done(cancel).await.map(|_| ())
}
