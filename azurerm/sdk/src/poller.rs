//! Long running operation polling.
//!
//! Resource Manager signals asynchronous work in three ways, checked in this order:
//!
//! 1. an `Azure-AsyncOperation` header pointing at an operation status resource,
//! 2. a `Location` header that answers `202` until the operation completes,
//! 3. a non-terminal `properties.provisioningState` in a PUT/PATCH response body.
//!
//! Anything else is treated as already complete.

use std::time::Duration;

use reqwest::{Method, StatusCode};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};
use url::Url;

use crate::client::{Client, Response};
use crate::enums::ProvisioningState;
use crate::error::{Error, OdataError, Result};

const AZURE_ASYNC_OPERATION: &str = "azure-asyncoperation";
const LOCATION: &str = "location";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollingStrategy {
    /// Poll an operation status resource, then optionally GET the final resource
    AsyncOperation { status_url: Url, final_url: Option<Url> },
    /// Poll a location until it stops answering `202`
    Location { url: Url },
    /// GET the resource until its provisioning state is terminal
    ProvisioningState { url: Url },
    Done,
}

#[derive(Debug, Deserialize)]
struct OperationStatus {
    status: String,
    #[serde(default)]
    error: Option<OdataError>,
}

#[derive(Debug, Deserialize)]
struct ResourceWithState {
    #[serde(default)]
    properties: Option<StateProperties>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StateProperties {
    #[serde(default)]
    provisioning_state: Option<ProvisioningState>,
}

fn provisioning_state(response: &Response) -> Option<ProvisioningState> {
    serde_json::from_slice::<ResourceWithState>(&response.body)
        .ok()
        .and_then(|r| r.properties)
        .and_then(|p| p.provisioning_state)
}

/// Drives a long running operation to completion
#[derive(Debug)]
pub struct Poller {
    client: Client,
    strategy: PollingStrategy,
    last: Response,
}

impl Poller {
    /// Pick the polling strategy for the initial response of `method`
    pub fn from_response(client: &Client, method: &Method, response: Response) -> Result<Self> {
        let mutates_resource = *method == Method::PUT || *method == Method::PATCH;

        let strategy = if let Some(link) = response.header(AZURE_ASYNC_OPERATION) {
            let final_url = if mutates_resource {
                Some(response.url.clone())
            } else {
                response
                    .header(LOCATION)
                    .map(|location| client.resolve(location))
                    .transpose()?
            };
            PollingStrategy::AsyncOperation {
                status_url: client.resolve(link)?,
                final_url,
            }
        } else if let (Some(location), StatusCode::ACCEPTED) =
            (response.header(LOCATION), response.status)
        {
            PollingStrategy::Location {
                url: client.resolve(location)?,
            }
        } else if mutates_resource
            && provisioning_state(&response).is_some_and(|state| !state.is_terminal())
        {
            PollingStrategy::ProvisioningState {
                url: response.url.clone(),
            }
        } else {
            PollingStrategy::Done
        };

        debug!(?strategy, "selected polling strategy");
        Ok(Self {
            client: client.clone(),
            strategy,
            last: response,
        })
    }

    pub fn strategy(&self) -> &PollingStrategy {
        &self.strategy
    }

    fn delay(&self) -> Duration {
        self.last
            .retry_after()
            .unwrap_or_else(|| self.client.poll_interval())
    }

    async fn get(&self, url: &Url, expected: &[StatusCode], cancel: &CancellationToken) -> Result<Response> {
        tokio::select! {
            _ = cancel.cancelled() => Err(Error::PollingCancelled),
            _ = tokio::time::sleep(self.delay()) => {
                tokio::select! {
                    _ = cancel.cancelled() => Err(Error::PollingCancelled),
                    response = self.client.send(Method::GET, url.clone(), None, expected) => response,
                }
            }
        }
    }

    /// Poll until the operation reaches a terminal state and return the final response.
    ///
    /// For PUT/PATCH the final response is the resource itself; for DELETE it is whatever
    /// the last poll returned.
    #[instrument(skip(self, cancel), fields(strategy = ?self.strategy), err)]
    pub async fn poll_until_done(mut self, cancel: &CancellationToken) -> Result<Response> {
        loop {
            match self.strategy.clone() {
                PollingStrategy::Done => return Ok(self.last),

                PollingStrategy::AsyncOperation { status_url, final_url } => {
                    let response = self.get(&status_url, &[StatusCode::OK], cancel).await?;
                    let status: OperationStatus = response.json()?;
                    debug!(status = %status.status, "polled operation status");
                    self.last = response;

                    match ProvisioningState::parse_value(&status.status) {
                        ProvisioningState::Succeeded => {
                            let Some(final_url) = final_url else {
                                return Ok(self.last);
                            };
                            return self
                                .client
                                .send(Method::GET, final_url, None, &[StatusCode::OK])
                                .await;
                        }
                        state if state.is_failure() => {
                            return Err(Error::PollingFailed {
                                status: state.to_string(),
                                error: status.error,
                            })
                        }
                        _ => continue,
                    }
                }

                PollingStrategy::Location { url } => {
                    let response = self
                        .get(
                            &url,
                            &[
                                StatusCode::OK,
                                StatusCode::CREATED,
                                StatusCode::ACCEPTED,
                                StatusCode::NO_CONTENT,
                            ],
                            cancel,
                        )
                        .await?;
                    debug!(status = %response.status, "polled location");

                    let done = response.status != StatusCode::ACCEPTED;
                    self.last = response;
                    if done {
                        return Ok(self.last);
                    }
                }

                PollingStrategy::ProvisioningState { url } => {
                    let response = self.get(&url, &[StatusCode::OK], cancel).await?;
                    let state = provisioning_state(&response).unwrap_or(ProvisioningState::Succeeded);
                    debug!(%state, "polled provisioning state");
                    self.last = response;

                    if state.is_failure() {
                        return Err(Error::PollingFailed {
                            status: state.to_string(),
                            error: None,
                        });
                    }
                    if state.is_terminal() {
                        return Ok(self.last);
                    }
                }
            }
        }
    }
}
