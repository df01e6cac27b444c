//! Hosted key-value service reached over its REST command API.
//!
//! Every call is a `POST` of a Redis command encoded as a JSON array
//! (`["GET", "artists"]`) with a bearer token. The service answers
//! `{"result": ...}` on success and `{"error": "..."}` otherwise.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::StoreError;
use crate::kv::{KvStore, StoreInfo};

#[derive(Debug, Clone)]
pub struct RestKvStore {
    client: reqwest::Client,
    url: String,
    token: String,
}

impl RestKvStore {
    pub fn new(url: &str, token: &str) -> Result<Self, StoreError> {
        if url.trim().is_empty() || token.trim().is_empty() {
            return Err(StoreError::Config(
                "REST store needs both a URL and a token".to_string(),
            ));
        }

        let client = reqwest::Client::builder()
            .user_agent(concat!("stagebook/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            url: url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    async fn command(&self, args: &[&str]) -> Result<Value, StoreError> {
        tracing::debug!(command = args.first().copied().unwrap_or(""), "kv REST call");

        let resp = self
            .client
            .post(&self.url)
            .bearer_auth(&self.token)
            .json(&args)
            .send()
            .await?;

        let status = resp.status();
        let body: Value = resp.json().await?;

        if let Some(err) = body.get("error").and_then(|e| e.as_str()) {
            return Err(StoreError::Remote(format!("{status}: {err}")));
        }
        if !status.is_success() {
            return Err(StoreError::Remote(format!("store returned {status}")));
        }

        Ok(body.get("result").cloned().unwrap_or(Value::Null))
    }
}

/// Turns stored text back into JSON. Text that does not parse is returned
/// as a JSON string so callers can see (and repair) the corruption.
pub(crate) fn decode_text(raw: String) -> Value {
    match serde_json::from_str(&raw) {
        Ok(value) => value,
        Err(_) => Value::String(raw),
    }
}

#[async_trait]
impl KvStore for RestKvStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        match self.command(&["GET", key]).await? {
            Value::Null => Ok(None),
            Value::String(raw) => Ok(Some(decode_text(raw))),
            other => Ok(Some(other)),
        }
    }

    async fn set(&self, key: &str, value: &Value) -> Result<(), StoreError> {
        let text = serde_json::to_string(value)?;
        match self.command(&["SET", key, &text]).await? {
            Value::String(ref s) if s == "OK" => Ok(()),
            other => Err(StoreError::Remote(format!("unexpected SET reply: {other}"))),
        }
    }

    async fn del(&self, key: &str) -> Result<bool, StoreError> {
        let removed = self.command(&["DEL", key]).await?;
        Ok(removed.as_u64().unwrap_or(0) > 0)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        match self.command(&["PING"]).await? {
            Value::String(ref s) if s == "PONG" => Ok(()),
            other => Err(StoreError::Remote(format!("unexpected PING reply: {other}"))),
        }
    }

    async fn info(&self) -> Result<StoreInfo, StoreError> {
        Ok(StoreInfo {
            backend: "rest",
            persistent: true,
            keys: None,
            warning: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn store_for(server: &MockServer) -> RestKvStore {
        RestKvStore::new(&server.uri(), "test-token").unwrap()
    }

    #[test]
    fn test_new_requires_credentials() {
        assert!(matches!(
            RestKvStore::new("", "token"),
            Err(StoreError::Config(_))
        ));
        assert!(matches!(
            RestKvStore::new("https://kv.example.com", " "),
            Err(StoreError::Config(_))
        ));
    }

    #[test]
    fn test_decode_text() {
        assert_eq!(decode_text("[1,2]".into()), json!([1, 2]));
        assert_eq!(decode_text("not json".into()), json!("not json"));
    }

    #[tokio::test]
    async fn test_get_parses_stored_json() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("authorization", "Bearer test-token"))
            .and(body_json(json!(["GET", "artists"])))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "result": "[{\"id\":\"a\"}]" })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let store = store_for(&server).await;
        let value = store.get("artists").await.unwrap();
        assert_eq!(value, Some(json!([{ "id": "a" }])));
    }

    #[tokio::test]
    async fn test_get_missing_key() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "result": null })))
            .mount(&server)
            .await;

        let store = store_for(&server).await;
        assert!(store.get("artists").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_set_sends_json_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_json(json!(["SET", "artists", "[]"])))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "result": "OK" })))
            .expect(1)
            .mount(&server)
            .await;

        let store = store_for(&server).await;
        store.set("artists", &json!([])).await.unwrap();
    }

    #[tokio::test]
    async fn test_error_reply_is_surfaced() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(401).set_body_json(json!({ "error": "Unauthorized" })),
            )
            .mount(&server)
            .await;

        let store = store_for(&server).await;
        let err = store.get("artists").await.unwrap_err();
        assert!(matches!(err, StoreError::Remote(_)));
        assert!(err.to_string().contains("Unauthorized"));
    }

    #[tokio::test]
    async fn test_del_and_ping() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_json(json!(["DEL", "k"])))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "result": 1 })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(body_json(json!(["PING"])))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "result": "PONG" })))
            .mount(&server)
            .await;

        let store = store_for(&server).await;
        assert!(store.del("k").await.unwrap());
        store.ping().await.unwrap();
    }
}
