//! Hosted table over a PostgREST-style HTTP API (requires feature "rest").

use respond_types::{
    Action, ActionStore, RangeQuery, RowOrder, StoreError, ACTIONS_TABLE, MAX_ROWS_PER_QUERY,
};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct IpRow {
    #[serde(default)]
    ip: Option<String>,
}

/// ActionStore backed by a hosted table (`{base_url}/rest/v1/{table}`).
pub struct RestActionStore {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    table: String,
}

impl RestActionStore {
    pub fn new(base_url: String, api_key: Option<String>, table: Option<&str>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            table: table.unwrap_or(ACTIONS_TABLE).to_string(),
        }
    }

    fn url(&self) -> String {
        format!("{}/rest/v1/{}", self.base_url, self.table)
    }

    fn authorized(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.api_key {
            Some(ref key) => req.header("apikey", key).bearer_auth(key),
            None => req,
        }
    }

    async fn send(&self, req: reqwest::RequestBuilder) -> Result<reqwest::Response, StoreError> {
        let res = self
            .authorized(req)
            .send()
            .await
            .map_err(|e| StoreError::Other(e.to_string()))?;
        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(StoreError::Http {
                status: status.as_u16(),
                body,
            });
        }
        Ok(res)
    }

    async fn json<T: serde::de::DeserializeOwned>(res: reqwest::Response) -> Result<T, StoreError> {
        let body = res
            .text()
            .await
            .map_err(|e| StoreError::Other(e.to_string()))?;
        serde_json::from_str(&body).map_err(|e| StoreError::InvalidRow(e.to_string()))
    }
}

/// Total from a `Content-Range` header such as `0-24/3573` or `*/0`.
fn parse_content_range_total(value: &str) -> Option<usize> {
    value.rsplit('/').next()?.trim().parse().ok()
}

#[async_trait::async_trait]
impl ActionStore for RestActionStore {
    async fn select_range(&self, query: &RangeQuery) -> Result<Vec<Action>, StoreError> {
        if query.is_empty() {
            return Ok(Vec::new());
        }
        let limit = query.len().min(MAX_ROWS_PER_QUERY);
        let mut params: Vec<(&str, String)> = vec![
            ("select", "*".to_string()),
            ("offset", query.from.to_string()),
            ("limit", limit.to_string()),
        ];
        if query.order == RowOrder::StartDesc {
            params.push(("order", "start.desc".to_string()));
        }
        if let Some(ref ip) = query.ip {
            params.push(("ip", format!("eq.{}", ip)));
        }
        let res = self
            .send(self.client.get(self.url()).query(&params))
            .await?;
        Self::json(res).await
    }

    async fn select_ips(&self, from: usize, to: usize) -> Result<Vec<String>, StoreError> {
        if to < from {
            return Ok(Vec::new());
        }
        let limit = (to - from + 1).min(MAX_ROWS_PER_QUERY);
        let params = [
            ("select", "ip".to_string()),
            ("offset", from.to_string()),
            ("limit", limit.to_string()),
        ];
        let res = self
            .send(self.client.get(self.url()).query(&params))
            .await?;
        let rows: Vec<IpRow> = Self::json(res).await?;
        Ok(rows.into_iter().map(|r| r.ip.unwrap_or_default()).collect())
    }

    async fn upsert(&self, rows: &[Action]) -> Result<Option<usize>, StoreError> {
        let req = self
            .client
            .post(self.url())
            .query(&[("on_conflict", "codeid"), ("select", "codeid")])
            .header("Prefer", "resolution=merge-duplicates,return=representation")
            .json(rows);
        let res = self.send(req).await?;
        let written: Vec<serde_json::Value> = Self::json(res).await?;
        Ok(Some(written.len()))
    }

    async fn delete_all(&self) -> Result<(), StoreError> {
        // Unfiltered DELETE is refused by the hosted API; filter on a key no row uses.
        let req = self
            .client
            .delete(self.url())
            .query(&[("codeid", "neq.-1")]);
        self.send(req).await?;
        tracing::info!(table = %self.table, "hosted table purged");
        Ok(())
    }

    async fn count(&self) -> Result<usize, StoreError> {
        let req = self
            .client
            .head(self.url())
            .query(&[("select", "*")])
            .header("Prefer", "count=exact");
        let res = self.send(req).await?;
        res.headers()
            .get("content-range")
            .and_then(|v| v.to_str().ok())
            .and_then(parse_content_range_total)
            .ok_or_else(|| StoreError::Other("missing content-range count".to_string()))
    }
}
