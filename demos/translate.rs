//! Giphy translate example
//!
//! This example demonstrates a typical consumer of fetch-task:
//! - Building a request URL with query parameters
//! - Decoding a `{data, meta}` envelope with serde
//! - Turning every failure into an empty result list
//!
//! ```bash
//! GIPHY_API_KEY=... cargo run --example translate -- facepalm
//! ```

use fetch_task::{DecodeStrategy, FetchError, FetchTask, callbacks};
use serde::Deserialize;
use tokio::sync::oneshot;
use url::Url;

const TRANSLATE_ENDPOINT: &str = "http://api.giphy.com/v1/gifs/translate";

/// Giphy's public beta key, used when `GIPHY_API_KEY` is unset
const PUBLIC_BETA_KEY: &str = "dc6zaTOxFJmzC";

#[derive(Debug, Deserialize)]
struct Gif {
    id: String,
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Debug, Deserialize)]
struct Meta {
    status: u16,
}

#[derive(Debug, Deserialize)]
struct TranslateResponse {
    data: Vec<Gif>,
    meta: Meta,
}

/// Look up gifs for `phrase`; any failure yields an empty list
async fn translate(api_key: &str, phrase: &str) -> Result<Vec<Gif>, Box<dyn std::error::Error>> {
    let url = Url::parse_with_params(TRANSLATE_ENDPOINT, &[("api_key", api_key), ("s", phrase)])?;

    let (reply, rx) = oneshot::channel();
    let handler = callbacks(
        move |response: TranslateResponse| {
            if response.meta.status != 200 {
                eprintln!("giphy reported status {}", response.meta.status);
                let _ = reply.send(Vec::new());
                return;
            }
            let _ = reply.send(response.data);
        },
        |error: FetchError| {
            eprintln!("translate failed ({}): {}", error.kind(), error.message());
        },
    );

    let mut task = FetchTask::new(url, handler).with_decode(DecodeStrategy::json())?;
    task.execute()?;

    // A failed or cancelled task drops the sender without a value
    Ok(rx.await.unwrap_or_default())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let api_key = std::env::var("GIPHY_API_KEY").unwrap_or_else(|_| PUBLIC_BETA_KEY.to_string());
    let phrase = std::env::args().nth(1).unwrap_or_else(|| "facepalm".to_string());

    let gifs = translate(&api_key, &phrase).await?;
    if gifs.is_empty() {
        println!("no gifs for '{}'", phrase);
    }
    for gif in gifs {
        println!("{} ({})", gif.id, gif.kind);
    }

    Ok(())
}
