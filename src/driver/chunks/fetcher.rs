//! Downloads and decompresses a single result chunk (spec component C2).
//!
//! Pulled out of `response.rs`'s old inline `stream_chunks` loop so C3/C4
//! can call it per-slot instead of walking the chunk queue serially. The
//! gzip-magic-byte sniff is carried over unchanged from `stream_chunks`;
//! the `chunk_headers`/`qrmk` precedence is new (`stream_chunks` never
//! applied `qrmk` to the request at all, even though `RawQueryResponse`
//! carried it all along).
//!
//! `SnowflakeHttpClient::get`/`Request::get_as_bytes` collapse the
//! transport down to `Result<Vec<u8>, SnowflakeError>` with no status code
//! exposed to the caller, so there's no distinct "non-200" signal to catch
//! here — any transport failure already comes back as an `Err` from
//! `get_as_bytes`, which this just re-tags as [`ErrorKind::Network`].

use std::{collections::HashMap, io::Read};

use flate2::read::GzDecoder;

use crate::{
    SnowflakeError,
    connection::Connection,
    driver::base::response::QueryResponseChunk,
    errors::ErrorKind,
    http::{self, client::SnowflakeHttpClient},
    kind_error, this_errors,
};

const GZIP_MAGIC: [u8; 2] = [0x1F, 0x8B];

/// Fetches one chunk's body and transparently decompresses it if it was
/// gzipped. `chunk_headers` comes from the response envelope
/// (`RawQueryResponse::chunk_headers`); when it already sets an
/// authorization-flavoured header, that wins over `qrmk` — `qrmk` only
/// fills in the SSE-C headers (`x-amz-server-side-encryption-customer-key`
/// and `-algorithm: AES256`) Snowflake uses to hand out a one-time S3
/// decryption key, and only when the envelope didn't already supply them
/// directly.
pub(crate) async fn fetch_chunk<C: SnowflakeHttpClient>(
    conn: &Connection<C>,
    chunk: &QueryResponseChunk,
    chunk_headers: &HashMap<String, String>,
    qrmk: Option<&str>,
) -> Result<Vec<u8>, SnowflakeError> {
    let mut headers = chunk_headers.clone();

    if let Some(key) = qrmk {
        headers
            .entry("x-amz-server-side-encryption-customer-key".to_string())
            .or_insert_with(|| key.to_string());
        headers
            .entry("x-amz-server-side-encryption-customer-algorithm".to_string())
            .or_insert_with(|| "AES256".to_string());
    }

    let request = http::RequestBuilder::default()
        .full_url(chunk.url.clone())
        .headers(headers)
        .connection(conn.clone())
        .build()
        .map_err(|e| kind_error!(ErrorKind::Network, "failed to build chunk download request", e))?;

    let body = request
        .get_as_bytes()
        .await
        .map_err(|e| e.with_kind(ErrorKind::Network))?;

    if body.len() >= 2 && body[0] == GZIP_MAGIC[0] && body[1] == GZIP_MAGIC[1] {
        let mut gz = GzDecoder::new(body.as_slice());
        let mut output = Vec::with_capacity(body.len() * 3);
        this_errors!(
            ErrorKind::WireDecode,
            "failed to decompress chunk body",
            gz.read_to_end(&mut output)
        );
        Ok(output)
    } else {
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use core::future::Future;

    use super::*;
    use crate::{
        auth::AuthStrategy,
        connection::{Connection, SnowflakeConnectionOptsBuilder},
    };

    /// Records the url/headers of the last `get` call and hands back a
    /// canned body — drives `fetch_chunk` itself instead of re-deriving its
    /// header-merging logic inline.
    #[derive(Clone)]
    struct FakeHttpClient {
        captured: Arc<Mutex<Option<(String, HashMap<String, String>)>>>,
        body: Vec<u8>,
    }

    impl FakeHttpClient {
        fn with_body(body: Vec<u8>) -> Self {
            FakeHttpClient {
                captured: Arc::new(Mutex::new(None)),
                body,
            }
        }

        fn last_request(&self) -> (String, HashMap<String, String>) {
            self.captured.lock().unwrap().clone().expect("get() was never called")
        }
    }

    impl SnowflakeHttpClient for FakeHttpClient {
        fn new() -> Self {
            FakeHttpClient::with_body(Vec::new())
        }

        fn get(
            &self,
            url: &str,
            headers: HashMap<String, String>,
        ) -> impl Future<Output = Result<Vec<u8>, SnowflakeError>> + Send {
            let captured = self.captured.clone();
            let url = url.to_string();
            let body = self.body.clone();
            async move {
                *captured.lock().unwrap() = Some((url, headers));
                Ok(body)
            }
        }

        fn post(
            &self,
            _url: &str,
            _body: Vec<u8>,
            _headers: HashMap<String, String>,
        ) -> impl Future<Output = Result<Vec<u8>, SnowflakeError>> + Send {
            async { Ok(Vec::new()) }
        }
    }

    fn test_connection(client: FakeHttpClient) -> Connection<FakeHttpClient> {
        let opts = SnowflakeConnectionOptsBuilder::default()
            .pool_size(1usize)
            .strategy(AuthStrategy::Password("unused".to_string()))
            .account_id("test-account")
            .username("test-user")
            .build()
            .unwrap();
        Connection::for_test(client, opts)
    }

    fn test_chunk() -> QueryResponseChunk {
        QueryResponseChunk {
            url: "https://example.invalid/chunk-0".to_string(),
            row_count: 1,
            uncompressed_size: 0,
            compressed_size: 0,
        }
    }

    #[tokio::test]
    async fn qrmk_does_not_override_an_explicit_chunk_header() {
        let conn = test_connection(FakeHttpClient::with_body(b"[]".to_vec()));
        let mut chunk_headers = HashMap::new();
        chunk_headers.insert(
            "x-amz-server-side-encryption-customer-key".to_string(),
            "from-envelope".to_string(),
        );

        let client = conn.get_client();
        fetch_chunk(&conn, &test_chunk(), &chunk_headers, Some("from-qrmk"))
            .await
            .unwrap();

        let (_, sent_headers) = client.last_request();
        assert_eq!(
            sent_headers.get("x-amz-server-side-encryption-customer-key").unwrap(),
            "from-envelope"
        );
    }

    #[tokio::test]
    async fn qrmk_sets_both_sse_c_headers_when_no_chunk_headers_present() {
        let conn = test_connection(FakeHttpClient::with_body(b"[]".to_vec()));
        let client = conn.get_client();

        fetch_chunk(&conn, &test_chunk(), &HashMap::new(), Some("from-qrmk"))
            .await
            .unwrap();

        let (_, sent_headers) = client.last_request();
        assert_eq!(
            sent_headers.get("x-amz-server-side-encryption-customer-key").unwrap(),
            "from-qrmk"
        );
        assert_eq!(
            sent_headers.get("x-amz-server-side-encryption-customer-algorithm").unwrap(),
            "AES256"
        );
    }

    #[tokio::test]
    async fn no_qrmk_sends_chunk_headers_unmodified() {
        let conn = test_connection(FakeHttpClient::with_body(b"[]".to_vec()));
        let mut chunk_headers = HashMap::new();
        chunk_headers.insert("authorization".to_string(), "Bearer abc".to_string());
        let client = conn.get_client();

        fetch_chunk(&conn, &test_chunk(), &chunk_headers, None).await.unwrap();

        let (_, sent_headers) = client.last_request();
        assert_eq!(sent_headers.get("authorization").unwrap(), "Bearer abc");
        assert!(!sent_headers.contains_key("x-amz-server-side-encryption-customer-key"));
    }

    #[tokio::test]
    async fn gzipped_body_is_transparently_decompressed() {
        use std::io::Write;

        let mut gz = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        gz.write_all(b"[[\"1\"]]").unwrap();
        let compressed = gz.finish().unwrap();

        let conn = test_connection(FakeHttpClient::with_body(compressed));
        let body = fetch_chunk(&conn, &test_chunk(), &HashMap::new(), None)
            .await
            .unwrap();

        assert_eq!(body, b"[[\"1\"]]");
    }
}
