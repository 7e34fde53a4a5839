//! Giphy-shaped response fixtures and mock server helpers

use serde::Deserialize;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Path of the translate endpoint
pub const TRANSLATE_PATH: &str = "/v1/gifs/translate";

/// API key used by the tests
pub const API_KEY: &str = "KEY";

/// Successful translate body with one result
pub const TRANSLATE_OK: &str = r#"{"data":[{"id":"abc","type":"gif"}],"meta":{"status":200}}"#;

/// Translate body reporting an application-level error with HTTP 200
pub const TRANSLATE_FORBIDDEN: &str =
    r#"{"data":[],"meta":{"status":403,"msg":"Forbidden","response_id":"r-1"}}"#;

/// One gif entry
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Gif {
    /// Gif id
    pub id: String,
    /// Entry type, always "gif" for this endpoint
    #[serde(rename = "type")]
    pub kind: String,
}

/// Status block embedded in every response
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Meta {
    /// Application-level status code
    pub status: u16,
}

/// Envelope of the translate endpoint
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TranslateResponse {
    /// Matching gifs
    pub data: Vec<Gif>,
    /// Status block
    pub meta: Meta,
}

/// URL of the translate endpoint on `server` for `phrase`
pub fn translate_url(server: &MockServer, phrase: &str) -> String {
    format!(
        "{}{}?api_key={}&s={}",
        server.uri(),
        TRANSLATE_PATH,
        API_KEY,
        phrase
    )
}

/// Serve `body` with `status` for translate requests matching `phrase`
pub async fn mount_translate(server: &MockServer, phrase: &str, status: u16, body: &str) {
    Mock::given(method("GET"))
        .and(path(TRANSLATE_PATH))
        .and(query_param("api_key", API_KEY))
        .and(query_param("s", phrase))
        .respond_with(
            ResponseTemplate::new(status).set_body_raw(body.to_owned(), "application/json"),
        )
        .mount(server)
        .await;
}
