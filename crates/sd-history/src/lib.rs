//! Event history from the indexing service.
//!
//! One fixed GraphQL query, no pagination past the configured page size and no
//! retry. Filtering to the connected account and conversion to display units
//! happen here, after the fetch.

use async_trait::async_trait;
use sd_types::HistoryRow;
use serde::{Deserialize, Deserializer};
use tracing::{debug, warn};

pub const DEFAULT_ENTITY: &str = "exampleEntities";
pub const DEFAULT_PAGE_SIZE: u32 = 1000;

#[derive(Debug, thiserror::Error)]
pub enum QueryServiceError {
    #[error("indexer transport error: {0}")]
    Transport(String),
    #[error("indexer HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("indexer query failed: {0}")]
    Graphql(String),
    #[error("indexer response could not be decoded: {0}")]
    Decode(String),
}

/// Shape of the one query the dashboard issues.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryQuery {
    /// Collection queried on the subgraph.
    pub entity: String,
    /// Page size; `None` asks for the whole collection.
    pub first: Option<u32>,
    /// Field carrying the event kind (`type` on current subgraphs, `block` on older ones).
    pub kind_field: String,
}

impl Default for HistoryQuery {
    fn default() -> Self {
        Self {
            entity: DEFAULT_ENTITY.to_owned(),
            first: Some(DEFAULT_PAGE_SIZE),
            kind_field: "type".to_owned(),
        }
    }
}

impl HistoryQuery {
    pub fn to_graphql(&self) -> String {
        let args = match self.first {
            Some(first) => format!(" (first: {first})"),
            None => String::new(),
        };
        format!(
            "{{\n  {}{} {{\n    id\n    user\n    amount\n    {}\n    timestamp\n  }}\n}}\n",
            self.entity, args, self.kind_field
        )
    }
}

/// One event exactly as the indexer returned it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RawEvent {
    pub id: String,
    pub user: String,
    #[serde(deserialize_with = "string_or_number")]
    pub amount: String,
    #[serde(rename = "type", default)]
    pub event_type: Option<String>,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub block: Option<String>,
    #[serde(deserialize_with = "string_or_number")]
    pub timestamp: String,
}

impl RawEvent {
    /// `type` when the subgraph has it, otherwise the `block` column.
    pub fn kind(&self) -> &str {
        self.event_type
            .as_deref()
            .or(self.block.as_deref())
            .unwrap_or_default()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    String(String),
    Number(serde_json::Number),
}

impl StringOrNumber {
    fn into_string(self) -> String {
        match self {
            Self::String(s) => s,
            Self::Number(n) => n.to_string(),
        }
    }
}

fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    StringOrNumber::deserialize(deserializer).map(StringOrNumber::into_string)
}

fn opt_string_or_number<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    Option::<StringOrNumber>::deserialize(deserializer).map(|v| v.map(StringOrNumber::into_string))
}

#[async_trait]
pub trait HistorySource: Send + Sync {
    async fn fetch_events(&self) -> Result<Vec<RawEvent>, QueryServiceError>;
}

/// GraphQL-over-HTTP client for the indexer.
pub struct GraphQlHistoryClient {
    endpoint: String,
    query: HistoryQuery,
    http: reqwest::Client,
}

impl GraphQlHistoryClient {
    pub fn new(endpoint: &str, query: HistoryQuery) -> Self {
        Self {
            endpoint: endpoint.trim_end_matches('/').to_owned(),
            query,
            http: reqwest::Client::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    data: Option<serde_json::Value>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

#[async_trait]
impl HistorySource for GraphQlHistoryClient {
    async fn fetch_events(&self) -> Result<Vec<RawEvent>, QueryServiceError> {
        let body = serde_json::json!({ "query": self.query.to_graphql() });

        let response = self
            .http
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|err| QueryServiceError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(QueryServiceError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        let parsed: GraphQlResponse = response
            .json()
            .await
            .map_err(|err| QueryServiceError::Decode(err.to_string()))?;

        if !parsed.errors.is_empty() {
            let messages: Vec<String> = parsed.errors.into_iter().map(|e| e.message).collect();
            return Err(QueryServiceError::Graphql(messages.join("; ")));
        }

        let records = parsed
            .data
            .as_ref()
            .and_then(|data| data.get(&self.query.entity))
            .cloned()
            .ok_or_else(|| {
                QueryServiceError::Decode(format!("response has no '{}' field", self.query.entity))
            })?;

        let events: Vec<RawEvent> = serde_json::from_value(records)
            .map_err(|err| QueryServiceError::Decode(err.to_string()))?;
        debug!(count = events.len(), "indexer returned events");
        Ok(events)
    }
}

/// Events whose `user` equals `account`, compared lower-case; order kept.
pub fn filter_to_account(events: Vec<RawEvent>, account: &str) -> Vec<RawEvent> {
    let account = account.to_lowercase();
    events
        .into_iter()
        .filter(|event| event.user.to_lowercase() == account)
        .collect()
}

/// Decimal amount and local date for one event.
pub fn enrich(event: &RawEvent) -> Result<HistoryRow, sd_units::UnitsError> {
    let timestamp: i64 = event
        .timestamp
        .trim()
        .parse()
        .map_err(|_| sd_units::UnitsError::InvalidTimestamp(event.timestamp.clone()))?;

    Ok(HistoryRow {
        id: event.id.clone(),
        user: event.user.clone(),
        event_type: event.kind().to_owned(),
        amount_wei: event.amount.clone(),
        amount: sd_units::to_decimal(&event.amount)?,
        timestamp,
        date: sd_units::format_local_date(timestamp)?,
    })
}

/// Filter then enrich. Rows that cannot be converted are logged and left out.
pub fn rows_for_account(events: Vec<RawEvent>, account: &str) -> Vec<HistoryRow> {
    filter_to_account(events, account)
        .iter()
        .filter_map(|event| match enrich(event) {
            Ok(row) => Some(row),
            Err(err) => {
                warn!(id = %event.id, "skipping history event: {err}");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Json, Router, http::StatusCode, routing::post};
    use serde_json::{Value, json};

    fn event(id: &str, user: &str) -> RawEvent {
        RawEvent {
            id: id.to_owned(),
            user: user.to_owned(),
            amount: "1000000000000000000".to_owned(),
            event_type: Some("Deposit".to_owned()),
            block: None,
            timestamp: "1700000000".to_owned(),
        }
    }

    async fn spawn_indexer(status: StatusCode, body: Value) -> String {
        let app = Router::new().route(
            "/",
            post(move |Json(request): Json<Value>| {
                let body = body.clone();
                async move {
                    let query = request["query"].as_str().unwrap_or_default();
                    assert!(query.contains("exampleEntities"));
                    (status, Json(body))
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[test]
    fn default_query_matches_subgraph_shape() {
        let query = HistoryQuery::default().to_graphql();
        assert!(query.contains("exampleEntities (first: 1000) {"));
        assert!(query.contains("    type\n"));

        let unpaged = HistoryQuery {
            first: None,
            kind_field: "block".to_owned(),
            ..HistoryQuery::default()
        }
        .to_graphql();
        assert!(unpaged.contains("exampleEntities {"));
        assert!(unpaged.contains("    block\n"));
    }

    #[test]
    fn filter_keeps_matching_users_in_order() {
        let events = vec![
            event("1", "0xabc"),
            event("2", "0xdef"),
            event("3", "0xABC"),
            event("4", "0xabcd"),
            event("5", "0xAbC"),
        ];
        let kept: Vec<String> = filter_to_account(events, "0xABC")
            .into_iter()
            .map(|e| e.id)
            .collect();
        assert_eq!(kept, vec!["1", "3", "5"]);
    }

    #[test]
    fn enrich_converts_amount_and_date() {
        let raw: RawEvent = serde_json::from_value(json!({
            "id": "0x01",
            "user": "0xabc",
            "amount": "500000000000000000",
            "type": "Deposit",
            "timestamp": "1700000000"
        }))
        .unwrap();

        let rows = rows_for_account(vec![raw], "0xABC");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].amount, "0.5");
        assert_eq!(rows[0].event_type, "Deposit");
        assert_eq!(rows[0].timestamp, 1_700_000_000);
        assert_eq!(rows[0].date, sd_units::format_local_date(1_700_000_000).unwrap());
    }

    #[test]
    fn older_subgraphs_use_block_and_numbers() {
        let raw: RawEvent = serde_json::from_value(json!({
            "id": "a",
            "user": "0xabc",
            "amount": 25,
            "block": 1234,
            "timestamp": 1700000000
        }))
        .unwrap();
        assert_eq!(raw.kind(), "1234");
        assert_eq!(raw.amount, "25");
        assert_eq!(raw.timestamp, "1700000000");
    }

    #[test]
    fn malformed_rows_are_skipped() {
        let mut bad = event("bad", "0xabc");
        bad.amount = "lots".to_owned();
        let rows = rows_for_account(vec![bad, event("good", "0xabc")], "0xabc");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, "good");
    }

    #[tokio::test]
    async fn fetches_events_from_indexer() -> anyhow::Result<()> {
        let url = spawn_indexer(
            StatusCode::OK,
            json!({ "data": { "exampleEntities": [
                { "id": "1", "user": "0xabc", "amount": "1", "type": "Withdraw", "timestamp": "1" }
            ] } }),
        )
        .await;

        let client = GraphQlHistoryClient::new(&url, HistoryQuery::default());
        let events = client.fetch_events().await?;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind(), "Withdraw");
        Ok(())
    }

    #[tokio::test]
    async fn graphql_errors_are_query_failures() {
        let url = spawn_indexer(
            StatusCode::OK,
            json!({ "data": null, "errors": [{ "message": "indexing_error" }] }),
        )
        .await;

        let client = GraphQlHistoryClient::new(&url, HistoryQuery::default());
        let err = client.fetch_events().await.unwrap_err();
        assert!(matches!(err, QueryServiceError::Graphql(ref m) if m == "indexing_error"));
    }

    #[tokio::test]
    async fn http_failures_keep_status() {
        let url = spawn_indexer(StatusCode::BAD_GATEWAY, json!({ "error": "down" })).await;

        let client = GraphQlHistoryClient::new(&url, HistoryQuery::default());
        let err = client.fetch_events().await.unwrap_err();
        assert!(matches!(err, QueryServiceError::Status { status: 502, .. }));
    }
}
