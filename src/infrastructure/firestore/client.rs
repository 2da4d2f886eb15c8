//! Blocking Firestore REST client

use super::auth::ServiceAccountKey;
use super::value::{decode_fields, encode_fields, encode_value};
use crate::error::{NotePageError, Result};
use crate::infrastructure::store::{
    CollectionQuery, Document, DocumentStore, Fields, TransactionId, Write,
};
use reqwest::blocking::Client;
use serde_json::{json, Value};
use std::path::Path;
use std::time::Duration;

pub const FIRESTORE_URL: &str = "https://firestore.googleapis.com/v1";
pub const EMULATOR_HOST_ENV: &str = "FIRESTORE_EMULATOR_HOST";
pub const PROJECT_ENV: &str = "GOOGLE_CLOUD_PROJECT";

const DEFAULT_DATABASE: &str = "(default)";
const EMULATOR_BEARER: &str = "owner";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Authenticated handle to one Firestore database
#[derive(Debug, Clone)]
pub struct FirestoreClient {
    http: Client,
    base_url: String,
    documents_root: String,
    bearer: String,
}

impl FirestoreClient {
    /// Build a client from a service account key file.
    ///
    /// With FIRESTORE_EMULATOR_HOST set the emulator is used and no token is requested.
    pub fn connect(key_file: &Path) -> Result<Self> {
        let key = ServiceAccountKey::from_file(key_file)?;
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| NotePageError::Client(format!("failed to build HTTP client: {}", e)))?;

        let emulator = std::env::var(EMULATOR_HOST_ENV)
            .ok()
            .filter(|host| !host.trim().is_empty());

        let mut project_id = key.project_id.clone();
        if project_id.is_empty() {
            project_id = std::env::var(PROJECT_ENV).unwrap_or_default();
        }
        if project_id.is_empty() {
            return Err(NotePageError::KeyFile {
                path: key_file.to_path_buf(),
                message: format!("missing project_id (or set {})", PROJECT_ENV),
            });
        }

        match emulator {
            Some(host) => {
                tracing::info!(%host, project = %project_id, "using Firestore emulator");
                Ok(Self::new(
                    http,
                    &format!("http://{}/v1", host.trim()),
                    &project_id,
                    EMULATOR_BEARER.to_string(),
                ))
            }
            None => {
                let token = key.fetch_access_token(&http)?;
                tracing::debug!(project = %project_id, "authenticated with service account");
                Ok(Self::new(http, FIRESTORE_URL, &project_id, token))
            }
        }
    }

    pub fn new(http: Client, base_url: &str, project_id: &str, bearer: String) -> Self {
        FirestoreClient {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            documents_root: documents_root(project_id),
            bearer,
        }
    }

    fn post(&self, operation: &'static str, body: &Value) -> Result<Value> {
        let url = format!("{}/{}:{}", self.base_url, self.documents_root, operation);
        tracing::debug!(%url, "firestore request");

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.bearer)
            .json(body)
            .send()?;

        let status = response.status();
        let text = response.text()?;

        if !status.is_success() {
            // gateways answer with HTML or plain text
            let payload = serde_json::from_str(&text).unwrap_or(Value::Null);
            let mut err = remote_error(operation, status.as_u16(), &payload);
            if let NotePageError::Remote { message, .. } = &mut err {
                if payload.is_null() && !text.trim().is_empty() {
                    *message = text.trim().to_string();
                }
            }
            return Err(err);
        }

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text)?)
    }
}

impl DocumentStore for FirestoreClient {
    fn fetch_page(
        &self,
        query: &CollectionQuery,
        after: Option<&Document>,
        transaction: Option<&TransactionId>,
    ) -> Result<Vec<Document>> {
        let body = run_query_body(&self.documents_root, query, after, transaction);
        let payload = self.post("runQuery", &body)?;
        parse_run_query(&payload, query)
    }

    fn begin_transaction(&self, retry: Option<&TransactionId>) -> Result<TransactionId> {
        let payload = self.post("beginTransaction", &begin_transaction_body(retry))?;
        payload
            .get("transaction")
            .and_then(Value::as_str)
            .map(|id| TransactionId(id.to_string()))
            .ok_or_else(|| {
                NotePageError::Transaction("beginTransaction returned no transaction".to_string())
            })
    }

    fn commit(&self, transaction: &TransactionId, writes: &[Write]) -> Result<()> {
        let body = commit_body(&self.documents_root, transaction, writes);
        self.post("commit", &body)?;
        Ok(())
    }

    fn rollback(&self, transaction: &TransactionId) -> Result<()> {
        self.post("rollback", &json!({ "transaction": transaction.0 }))?;
        Ok(())
    }
}

pub fn documents_root(project_id: &str) -> String {
    format!(
        "projects/{}/databases/{}/documents",
        project_id, DEFAULT_DATABASE
    )
}

fn document_name(documents_root: &str, collection: &str, id: &str) -> String {
    format!("{}/{}/{}", documents_root, collection, id)
}

/// Backtick-quote field paths that are not plain identifiers
fn quote_field_path(field: &str) -> String {
    let simple = field
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && field.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if simple {
        field.to_string()
    } else {
        format!("`{}`", field.replace('\\', "\\\\").replace('`', "\\`"))
    }
}

/// Body of a `runQuery` request for one page of an ordered scan
pub fn run_query_body(
    documents_root: &str,
    query: &CollectionQuery,
    after: Option<&Document>,
    transaction: Option<&TransactionId>,
) -> Value {
    let mut order_by = Vec::new();
    if let Some(field) = &query.order_by {
        order_by.push(json!({
            "field": { "fieldPath": quote_field_path(field) },
            "direction": "ASCENDING",
        }));
    }
    order_by.push(json!({
        "field": { "fieldPath": "__name__" },
        "direction": "ASCENDING",
    }));

    let mut structured = json!({
        "from": [{ "collectionId": query.collection }],
        "orderBy": order_by,
        "limit": query.page_size,
    });

    if let Some(doc) = after {
        let mut values = Vec::new();
        if let Some(field) = &query.order_by {
            let value = doc.cursor_value.clone().unwrap_or_else(|| {
                doc.field(field)
                    .map(encode_value)
                    .unwrap_or_else(|| json!({ "nullValue": null }))
            });
            values.push(value);
        }
        values.push(json!({
            "referenceValue": document_name(documents_root, &query.collection, &doc.id)
        }));
        structured["startAt"] = json!({ "values": values, "before": false });
    }

    let mut body = json!({ "structuredQuery": structured });
    if let Some(transaction) = transaction {
        body["transaction"] = json!(transaction.0);
    }
    body
}

/// Documents from a `runQuery` response; entries without a document are skipped
pub fn parse_run_query(payload: &Value, query: &CollectionQuery) -> Result<Vec<Document>> {
    let Some(results) = payload.as_array() else {
        return Err(NotePageError::Read(format!(
            "unexpected runQuery response: {}",
            payload
        )));
    };

    let mut documents = Vec::with_capacity(results.len());
    for result in results {
        let Some(raw) = result.get("document") else {
            continue;
        };
        let name = raw.get("name").and_then(Value::as_str).unwrap_or_default();
        let id = name.rsplit('/').next().unwrap_or_default().to_string();

        let (fields, cursor_value) = match raw.get("fields").and_then(Value::as_object) {
            Some(raw_fields) => {
                let cursor_value = query
                    .order_by
                    .as_ref()
                    .and_then(|field| raw_fields.get(field))
                    .cloned();
                (decode_fields(raw_fields)?, cursor_value)
            }
            None => (Fields::new(), None),
        };

        documents.push(Document {
            id,
            fields,
            cursor_value,
        });
    }
    Ok(documents)
}

/// Body of a `beginTransaction` request; a retry names the aborted transaction
pub fn begin_transaction_body(retry: Option<&TransactionId>) -> Value {
    match retry {
        Some(previous) => json!({
            "options": { "readWrite": { "retryTransaction": previous.0 } }
        }),
        None => json!({}),
    }
}

/// Body of a `commit` request; each write merges only its own fields
pub fn commit_body(documents_root: &str, transaction: &TransactionId, writes: &[Write]) -> Value {
    let writes: Vec<Value> = writes
        .iter()
        .map(|write| {
            let field_paths: Vec<String> =
                write.fields.keys().map(|k| quote_field_path(k)).collect();
            json!({
                "update": {
                    "name": document_name(documents_root, &write.collection, &write.document_id),
                    "fields": encode_fields(&write.fields),
                },
                "updateMask": { "fieldPaths": field_paths },
            })
        })
        .collect();

    json!({ "writes": writes, "transaction": transaction.0 })
}

/// Map an error payload to the error taxonomy; ABORTED means contention
pub fn remote_error(operation: &'static str, status: u16, payload: &Value) -> NotePageError {
    // runQuery reports errors inside its streamed array
    let payload = match payload {
        Value::Array(items) => items.first().unwrap_or(&Value::Null),
        other => other,
    };
    let message = payload
        .pointer("/error/message")
        .and_then(Value::as_str)
        .unwrap_or("unknown error")
        .to_string();
    let code = payload
        .pointer("/error/status")
        .and_then(Value::as_str)
        .unwrap_or_default();

    if code == "ABORTED" {
        NotePageError::Aborted(message)
    } else {
        NotePageError::Remote {
            operation,
            status,
            message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::store::fields;

    const ROOT: &str = "projects/notes/databases/(default)/documents";

    #[test]
    fn test_documents_root() {
        assert_eq!(documents_root("notes"), ROOT);
    }

    #[test]
    fn test_run_query_body_first_page() {
        let query = CollectionQuery::new("pages").order_by("createdAt").page_size(50);
        let body = run_query_body(ROOT, &query, None, None);

        assert_eq!(
            body,
            json!({
                "structuredQuery": {
                    "from": [{ "collectionId": "pages" }],
                    "orderBy": [
                        { "field": { "fieldPath": "createdAt" }, "direction": "ASCENDING" },
                        { "field": { "fieldPath": "__name__" }, "direction": "ASCENDING" }
                    ],
                    "limit": 50
                }
            })
        );
    }

    #[test]
    fn test_run_query_body_resumes_after_document_in_transaction() {
        let query = CollectionQuery::new("pages").order_by("createdAt");
        let mut last = Document::new("p9", Fields::new());
        last.cursor_value = Some(json!({ "timestampValue": "2024-01-01T00:00:00Z" }));

        let body = run_query_body(ROOT, &query, Some(&last), Some(&TransactionId("dHg=".into())));

        assert_eq!(
            body["structuredQuery"]["startAt"],
            json!({
                "values": [
                    { "timestampValue": "2024-01-01T00:00:00Z" },
                    { "referenceValue": format!("{}/pages/p9", ROOT) }
                ],
                "before": false
            })
        );
        assert_eq!(body["transaction"], json!("dHg="));
    }

    #[test]
    fn test_unordered_query_orders_by_name_only() {
        let query = CollectionQuery::new("pages");
        let last = Document::new("p1", Fields::new());
        let body = run_query_body(ROOT, &query, Some(&last), None);

        assert_eq!(
            body["structuredQuery"]["orderBy"],
            json!([{ "field": { "fieldPath": "__name__" }, "direction": "ASCENDING" }])
        );
        assert_eq!(
            body["structuredQuery"]["startAt"]["values"],
            json!([{ "referenceValue": format!("{}/pages/p1", ROOT) }])
        );
        assert!(body.get("transaction").is_none());
    }

    #[test]
    fn test_parse_run_query() {
        let payload = json!([
            { "readTime": "2024-01-01T00:00:00Z", "transaction": "dHg=" },
            {
                "document": {
                    "name": format!("{}/notebooks/A", ROOT),
                    "fields": {
                        "name": { "stringValue": "default" },
                        "createdAt": { "timestampValue": "2024-01-01T00:00:00Z" }
                    },
                    "createTime": "2024-01-01T00:00:00Z",
                    "updateTime": "2024-01-01T00:00:00Z"
                },
                "readTime": "2024-01-01T00:00:00Z"
            },
            {
                "document": { "name": format!("{}/notebooks/B", ROOT) },
                "readTime": "2024-01-01T00:00:00Z"
            }
        ]);
        let query = CollectionQuery::new("notebooks").order_by("createdAt");

        let docs = parse_run_query(&payload, &query).unwrap();

        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].id, "A");
        assert_eq!(docs[0].fields["name"], json!("default"));
        assert_eq!(
            docs[0].cursor_value,
            Some(json!({ "timestampValue": "2024-01-01T00:00:00Z" }))
        );
        assert_eq!(docs[1].id, "B");
        assert!(docs[1].fields.is_empty());
    }

    #[test]
    fn test_parse_run_query_rejects_non_array() {
        let query = CollectionQuery::new("pages");
        assert!(matches!(
            parse_run_query(&json!({ "oops": true }), &query),
            Err(NotePageError::Read(_))
        ));
    }

    #[test]
    fn test_commit_body_uses_update_mask() {
        let writes = vec![Write {
            collection: "pages".to_string(),
            document_id: "p1".to_string(),
            fields: fields([("noteBookId", json!("A"))]),
        }];

        let body = commit_body(ROOT, &TransactionId("dHg=".into()), &writes);

        assert_eq!(
            body,
            json!({
                "writes": [{
                    "update": {
                        "name": format!("{}/pages/p1", ROOT),
                        "fields": { "noteBookId": { "stringValue": "A" } }
                    },
                    "updateMask": { "fieldPaths": ["noteBookId"] }
                }],
                "transaction": "dHg="
            })
        );
    }

    #[test]
    fn test_begin_transaction_body() {
        assert_eq!(begin_transaction_body(None), json!({}));
        assert_eq!(
            begin_transaction_body(Some(&TransactionId("b2xk".into()))),
            json!({ "options": { "readWrite": { "retryTransaction": "b2xk" } } })
        );
    }

    /// Serve one canned HTTP response on a local port
    fn serve_once(response: &'static str) -> String {
        use std::io::{Read, Write as _};
        use std::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        std::thread::spawn(move || {
            if let Ok((mut stream, _)) = listener.accept() {
                // drain the request so the close does not reset the connection
                let mut request = Vec::new();
                let mut buf = [0u8; 4096];
                while let Ok(n) = stream.read(&mut buf) {
                    if n == 0 {
                        break;
                    }
                    request.extend_from_slice(&buf[..n]);
                    let text = String::from_utf8_lossy(&request);
                    if let Some(end) = text.find("\r\n\r\n") {
                        let length = text[..end]
                            .lines()
                            .find_map(|l| {
                                let (name, value) = l.split_once(':')?;
                                name.eq_ignore_ascii_case("content-length")
                                    .then(|| value.trim().parse::<usize>().ok())
                                    .flatten()
                            })
                            .unwrap_or(0);
                        if request.len() >= end + 4 + length {
                            break;
                        }
                    }
                }
                let _ = stream.write_all(response.as_bytes());
            }
        });
        format!("http://{}/v1", addr)
    }

    #[test]
    fn test_non_json_gateway_error_keeps_status() {
        let base_url = serve_once(
            "HTTP/1.1 502 Bad Gateway\r\n\
             Content-Type: text/html\r\n\
             Content-Length: 28\r\n\
             Connection: close\r\n\r\n\
             <html>502 Bad Gateway</html>",
        );
        let client = FirestoreClient::new(Client::new(), &base_url, "p", "owner".to_string());

        match client
            .fetch_page(&CollectionQuery::new("pages"), None, None)
            .unwrap_err()
        {
            NotePageError::Remote {
                operation,
                status,
                message,
            } => {
                assert_eq!(operation, "runQuery");
                assert_eq!(status, 502);
                assert_eq!(message, "<html>502 Bad Gateway</html>");
            }
            other => panic!("Expected Remote error, got {:?}", other),
        }
    }

    #[test]
    fn test_json_error_body_message_is_used() {
        let base_url = serve_once(
            "HTTP/1.1 403 Forbidden\r\n\
             Content-Type: application/json\r\n\
             Content-Length: 59\r\n\
             Connection: close\r\n\r\n\
             {\"error\":{\"message\":\"denied\",\"status\":\"PERMISSION_DENIED\"}}",
        );
        let client = FirestoreClient::new(Client::new(), &base_url, "p", "owner".to_string());

        match client.begin_transaction(None).unwrap_err() {
            NotePageError::Remote { status, message, .. } => {
                assert_eq!(status, 403);
                assert_eq!(message, "denied");
            }
            other => panic!("Expected Remote error, got {:?}", other),
        }
    }

    #[test]
    fn test_quote_field_path() {
        assert_eq!(quote_field_path("noteBookId"), "noteBookId");
        assert_eq!(quote_field_path("_x1"), "_x1");
        assert_eq!(quote_field_path("my-field"), "`my-field`");
        assert_eq!(quote_field_path("1st"), "`1st`");
    }

    #[test]
    fn test_remote_error_mapping() {
        let aborted = json!({ "error": { "code": 409, "message": "contention", "status": "ABORTED" } });
        assert!(matches!(
            remote_error("commit", 409, &aborted),
            NotePageError::Aborted(msg) if msg == "contention"
        ));

        let denied = json!([{ "error": { "code": 403, "message": "denied", "status": "PERMISSION_DENIED" } }]);
        match remote_error("runQuery", 403, &denied) {
            NotePageError::Remote { operation, status, message } => {
                assert_eq!(operation, "runQuery");
                assert_eq!(status, 403);
                assert_eq!(message, "denied");
            }
            other => panic!("Expected Remote error, got {:?}", other),
        }
    }
}
