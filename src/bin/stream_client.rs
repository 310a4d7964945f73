// Visa Advisor - command-line consumer of the event stream
//
// Posts a JSON request file to one endpoint and prints each decoded event on
// its own line.

use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Parser, ValueEnum};
use futures_util::StreamExt;
use visa_advisor_core::{Frame, FrameDecoder};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Endpoint {
    Research,
    Analyze,
    Advisory,
}

impl Endpoint {
    fn path(self) -> &'static str {
        match self {
            Endpoint::Research => "/api/research",
            Endpoint::Analyze => "/api/analyze",
            Endpoint::Advisory => "/api/advisory",
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "stream-client", version, about = "Print events from a Visa Advisor stream")]
struct Cli {
    /// Endpoint to call
    #[arg(value_enum)]
    endpoint: Endpoint,

    /// JSON request body
    body: PathBuf,

    /// Server base URL
    #[arg(long, default_value = "http://127.0.0.1:8787")]
    url: String,

    /// Print only the event type of each frame
    #[arg(long)]
    brief: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let body = std::fs::read(&cli.body)
        .with_context(|| format!("reading {}", cli.body.display()))?;

    let url = format!("{}{}", cli.url.trim_end_matches('/'), cli.endpoint.path());
    let response = reqwest::Client::new()
        .post(&url)
        .header("content-type", "application/json")
        .body(body)
        .send()
        .await
        .with_context(|| format!("POST {}", url))?;

    let status = response.status();
    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        bail!("{} returned {}: {}", url, status, text);
    }

    let mut decoder = FrameDecoder::new();
    let mut bytes = response.bytes_stream();
    let mut pending: Vec<u8> = Vec::new();
    let mut saw_done = false;

    while let Some(chunk) = bytes.next().await {
        pending.extend_from_slice(&chunk.context("reading stream")?);
        // Hold back a multi-byte character split across chunks.
        let valid = match std::str::from_utf8(&pending) {
            Ok(text) => text.len(),
            Err(e) => e.valid_up_to(),
        };
        let text = String::from_utf8_lossy(&pending[..valid]).into_owned();
        pending.drain(..valid);

        for frame in decoder.push(&text) {
            match frame {
                Frame::Event(event) if cli.brief => println!("{}", event.type_name()),
                Frame::Event(event) => println!("{}", serde_json::to_string(&event)?),
                Frame::Done => saw_done = true,
            }
        }
    }

    if decoder.has_partial() {
        eprintln!("stream ended inside a frame");
    }
    if decoder.skipped() > 0 {
        eprintln!("{} malformed frames skipped", decoder.skipped());
    }
    if !saw_done {
        bail!("stream closed without [DONE]");
    }
    Ok(())
}
