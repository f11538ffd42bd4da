//! PostgREST-backed [`RemoteStore`].
//!
//! Speaks the Supabase REST dialect: `GET /rest/v1/{table}?select=*&order=...`
//! for listings and `PATCH /rest/v1/{table}?id=eq.{id}` for updates.

use tagreview_core::config::StoreSettings;
use tagreview_core::model::{PartialRowUpdate, RowId, RowOrder, TagMapping};
use tagreview_core::store::{RemoteStore, StoreError};

const MAX_ERROR_BODY_CHARS: usize = 512;

pub struct PostgrestStore {
    agent: ureq::Agent,
    base_url: String,
    table: String,
    api_key: Option<String>,
}

impl PostgrestStore {
    pub fn new(settings: &StoreSettings) -> Self {
        let mut builder = ureq::AgentBuilder::new()
            .user_agent(concat!("tagreview/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = settings.timeout() {
            builder = builder.timeout(timeout);
        }

        Self {
            agent: builder.build(),
            base_url: settings.url.trim_end_matches('/').to_string(),
            table: settings.table.clone(),
            api_key: settings.api_key.clone(),
        }
    }

    fn table_url(&self) -> String {
        format!("{}/rest/v1/{}", self.base_url, self.table)
    }

    fn list_url(&self, order: RowOrder) -> String {
        let direction = if order.descending { "desc" } else { "asc" };
        format!(
            "{}?select=*&order={}.{direction}",
            self.table_url(),
            order.column.column()
        )
    }

    fn update_url(&self, id: RowId) -> String {
        format!("{}?id=eq.{id}", self.table_url())
    }

    fn authorize(&self, request: ureq::Request) -> ureq::Request {
        let request = request.set("Accept", "application/json");
        match &self.api_key {
            Some(key) => request
                .set("apikey", key)
                .set("Authorization", &format!("Bearer {key}")),
            None => request,
        }
    }
}

fn map_error(err: ureq::Error) -> StoreError {
    match err {
        ureq::Error::Status(status, response) => {
            let body = response.into_string().unwrap_or_default();
            StoreError::Status {
                status,
                body: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
            }
        }
        ureq::Error::Transport(transport) => StoreError::Transport(transport.to_string()),
    }
}

impl RemoteStore for PostgrestStore {
    fn list_rows(&self, order: RowOrder) -> Result<Vec<TagMapping>, StoreError> {
        let url = self.list_url(order);
        tracing::debug!(%url, "listing rows");

        let response = self
            .authorize(self.agent.get(&url))
            .call()
            .map_err(map_error)?;

        response
            .into_json::<Vec<TagMapping>>()
            .map_err(|err| StoreError::Decode(err.to_string()))
    }

    fn update_row(&self, id: RowId, fields: &PartialRowUpdate) -> Result<(), StoreError> {
        let url = self.update_url(id);
        tracing::debug!(%url, id, "updating row");

        self.authorize(self.agent.request("PATCH", &url))
            .set("Prefer", "return=minimal")
            .send_json(fields)
            .map_err(map_error)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader, Read, Write};
    use std::net::TcpListener;
    use std::thread;
    use tagreview_core::model::Action;

    fn settings(url: &str, api_key: Option<&str>) -> StoreSettings {
        StoreSettings {
            url: url.to_string(),
            api_key: api_key.map(str::to_string),
            table: "Tag_Mapping".to_string(),
            timeout_secs: Some(5),
        }
    }

    /// Serve exactly one canned response and hand back the raw request text.
    fn serve_once(status_line: &'static str, body: &'static str) -> (String, thread::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let handle = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream);
            let mut head = String::new();
            let mut content_length = 0usize;
            loop {
                let mut line = String::new();
                reader.read_line(&mut line).unwrap();
                if let Some(value) = line.to_ascii_lowercase().strip_prefix("content-length:") {
                    content_length = value.trim().parse().unwrap();
                }
                head.push_str(&line);
                if line == "\r\n" {
                    break;
                }
            }
            let mut request_body = vec![0; content_length];
            reader.read_exact(&mut request_body).unwrap();
            head.push_str(&String::from_utf8(request_body).unwrap());

            let response = format!(
                "{status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            reader.get_mut().write_all(response.as_bytes()).unwrap();
            head
        });
        (url, handle)
    }

    #[test]
    fn urls_follow_postgrest_conventions() {
        let store = PostgrestStore::new(&settings("https://db.example.co/", None));
        assert_eq!(
            store.list_url(RowOrder::FREQUENCY_DESC),
            "https://db.example.co/rest/v1/Tag_Mapping?select=*&order=Frequency.desc"
        );
        assert_eq!(
            store.update_url(42),
            "https://db.example.co/rest/v1/Tag_Mapping?id=eq.42"
        );
    }

    #[test]
    fn listing_sends_key_headers_and_decodes_rows() {
        let (url, server) = serve_once(
            "HTTP/1.1 200 OK",
            r#"[{"id":1,"Old_Tag":"js","New_Tag":"javascript","Action":"Approved","Frequency":9}]"#,
        );
        let store = PostgrestStore::new(&settings(&url, Some("anon-key")));

        let rows = store.list_rows(RowOrder::FREQUENCY_DESC).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].action, Action::Approved);

        let request = server.join().unwrap();
        assert!(request.starts_with("GET /rest/v1/Tag_Mapping?select=*&order=Frequency.desc"));
        let lower = request.to_ascii_lowercase();
        assert!(lower.contains("apikey: anon-key"));
        assert!(lower.contains("authorization: bearer anon-key"));
    }

    #[test]
    fn update_sends_only_pending_fields() {
        let (url, server) = serve_once("HTTP/1.1 204 No Content", "");
        let store = PostgrestStore::new(&settings(&url, None));

        store
            .update_row(
                7,
                &PartialRowUpdate {
                    action: Some(Action::Unset),
                    notes: None,
                },
            )
            .unwrap();

        let request = server.join().unwrap();
        assert!(request.starts_with("PATCH /rest/v1/Tag_Mapping?id=eq.7"));
        assert!(request.to_ascii_lowercase().contains("prefer: return=minimal"));
        assert!(request.ends_with(r#"{"Action":null}"#));
        assert!(!request.contains("Notes"));
    }

    #[test]
    fn non_success_status_is_reported_with_body() {
        let (url, server) = serve_once(
            "HTTP/1.1 401 Unauthorized",
            r#"{"message":"Invalid API key"}"#,
        );
        let store = PostgrestStore::new(&settings(&url, Some("wrong")));

        let err = store.list_rows(RowOrder::FREQUENCY_DESC).unwrap_err();
        server.join().unwrap();
        match err {
            StoreError::Status { status, body } => {
                assert_eq!(status, 401);
                assert!(body.contains("Invalid API key"));
            }
            other => panic!("expected status error, got {other:?}"),
        }
    }

    #[test]
    fn malformed_listing_is_a_decode_error() {
        let (url, server) = serve_once("HTTP/1.1 200 OK", r#"{"not":"a list"}"#);
        let store = PostgrestStore::new(&settings(&url, None));

        let err = store.list_rows(RowOrder::FREQUENCY_DESC).unwrap_err();
        server.join().unwrap();
        assert!(matches!(err, StoreError::Decode(_)));
    }

    #[test]
    fn unreachable_host_is_a_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let store = PostgrestStore::new(&settings(&url, None));
        let err = store.list_rows(RowOrder::FREQUENCY_DESC).unwrap_err();
        assert!(matches!(err, StoreError::Transport(_)));
    }
}
