//! `nextLink` pagination for list operations

use std::collections::HashSet;

use reqwest::{Method, StatusCode};
use serde::{de::DeserializeOwned, Deserialize};
use tracing::{debug, instrument, warn};

use crate::client::{Client, RequestOptions};
use crate::error::Result;

/// One page of a list operation
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResult<T> {
    #[serde(default = "Vec::new")]
    pub value: Vec<T>,
    #[serde(default)]
    pub next_link: Option<String>,
}

/// Fetch the first page described by `options` and follow `nextLink` until it is
/// absent or empty, concatenating every page's `value`.
///
/// A `nextLink` pointing at a page that was already fetched ends the iteration, some
/// services echo the last link back instead of omitting it.
#[instrument(skip(client, options), fields(path = %options.path), err)]
pub async fn list_all<T: DeserializeOwned>(client: &Client, options: &RequestOptions) -> Result<Vec<T>> {
    let first = client.execute(options).await?;
    let mut page: ListResult<T> = first.json()?;

    let mut items = Vec::new();
    let mut seen = HashSet::from([first.url.to_string()]);
    let mut pages = 1usize;

    loop {
        items.append(&mut page.value);

        let Some(link) = page.next_link.filter(|link| !link.is_empty()) else {
            break;
        };
        let url = client.resolve(&link)?;
        if !seen.insert(url.to_string()) {
            warn!(%url, "nextLink points at a page already fetched, stopping pagination");
            break;
        }

        let response = client
            .send(Method::GET, url, None, &[StatusCode::OK])
            .await?;
        page = response.json()?;
        pages += 1;
    }

    debug!(pages, items = items.len(), "listed all pages");
    Ok(items)
}

impl Client {
    /// See [`list_all`]
    pub async fn list_all<T: DeserializeOwned>(&self, options: &RequestOptions) -> Result<Vec<T>> {
        list_all(self, options).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_result_tolerates_missing_fields() {
        let page: ListResult<serde_json::Value> = serde_json::from_str("{}").unwrap();
        assert!(page.value.is_empty());
        assert!(page.next_link.is_none());

        let page: ListResult<u32> =
            serde_json::from_str(r#"{"value":[1,2],"nextLink":"https://x/next"}"#).unwrap();
        assert_eq!(page.value, vec![1, 2]);
        assert_eq!(page.next_link.as_deref(), Some("https://x/next"));
    }
}
