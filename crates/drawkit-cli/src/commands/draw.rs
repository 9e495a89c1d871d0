//! `drawkit draw` — start a draw, follow its feed, fetch the result.

use std::path::Path;

use drawkit_client::{Client, ClientError, MessageStream, endpoints};
use drawkit_core::{DrawConfig, DrawState, ResultsLog, StreamMessage};
use futures::StreamExt;

use crate::BackendArgs;

pub struct DrawCommandConfig<'a> {
    pub sources: &'a str,
    pub bits: u64,
    pub numbers: u64,
    pub max_number: u64,
    pub transport: &'a str,
    pub show_bits: bool,
    pub output_path: Option<&'a str>,
    pub json: bool,
    pub backend: &'a BackendArgs,
}

pub fn run(cfg: DrawCommandConfig<'_>) {
    let sources = DrawConfig::parse_sources(cfg.sources);
    if sources.is_empty() {
        super::fail("--sources must name at least one entropy source");
    }
    let config = DrawConfig::new(sources, cfg.bits, cfg.numbers, cfg.max_number);

    let client = super::make_client(cfg.backend);
    let rt = super::runtime();

    let mut feed_log = ResultsLog::default();
    let state = rt
        .block_on(execute(&client, &config, &cfg, &mut feed_log))
        .unwrap_or_else(|e| super::fail(format!("draw failed: {e}")));

    if let Some(path) = cfg.output_path {
        match feed_log.save(Path::new(path)) {
            Ok(()) => {
                if !cfg.json {
                    println!("Saved {} feed messages to {path}", feed_log.len());
                }
            }
            Err(e) => log::error!("cannot write {path}: {e}"),
        }
    }

    if let Some(err) = &state.error {
        super::fail(format!("job {} rejected: {err}", state.job_id.as_deref().unwrap_or("?")));
    }

    if cfg.json {
        match serde_json::to_string_pretty(&state) {
            Ok(text) => println!("{text}"),
            Err(e) => super::fail(e),
        }
    } else {
        print_state(&state, &config);
    }
}

async fn execute(
    client: &Client,
    config: &DrawConfig,
    cfg: &DrawCommandConfig<'_>,
    feed_log: &mut ResultsLog,
) -> Result<DrawState, ClientError> {
    let job = client.start_draw(config).await?;
    *feed_log = ResultsLog::new(Some(job.job_id.clone()));

    let mut state = DrawState::new();
    state.begin(job.job_id.as_str());
    if !cfg.json {
        println!("🎲 Draw {} started", job.job_id);
    }

    match open_feed(client, &job.job_id, cfg.transport).await {
        Ok(Some(mut feed)) => {
            while let Some(item) = feed.next().await {
                match item {
                    Ok(message) => {
                        if !cfg.json {
                            print_progress(&message);
                        }
                        state.apply(&message);
                        feed_log.record(message);
                    }
                    Err(e) => log::warn!("feed error: {e}"),
                }
            }
        }
        Ok(None) => {}
        // The result endpoint still answers without a live feed.
        Err(e) => log::warn!("cannot open {} feed: {e}", cfg.transport),
    }

    if state.error.is_some() {
        return Ok(state);
    }

    let result = client.draw_result(&job.job_id).await?;
    if !result.echoes(config) {
        log::warn!("backend reported a different config than the one sent");
    }
    state.complete(result);

    if cfg.show_bits {
        let bits = client.draw_bits(&job.job_id).await?;
        if !bits.is_consistent() {
            log::warn!("bit string length does not match reported length");
        }
        state.attach_bits(bits);
        state.toggle_bits();
    }
    Ok(state)
}

async fn open_feed(
    client: &Client,
    job_id: &str,
    transport: &str,
) -> Result<Option<MessageStream>, ClientError> {
    match transport {
        "ws" => client.stream_ws(&endpoints::draw_ws(job_id)).await.map(Some),
        "sse" => client
            .stream_sse(&endpoints::draw_events(job_id))
            .await
            .map(Some),
        _ => Ok(None),
    }
}

pub fn print_progress(message: &StreamMessage) {
    match message {
        StreamMessage::Event(event) => {
            println!("  [{:<9}] {}", event.event, super::compact(&event.data));
        }
        StreamMessage::ValidationError(err) => println!("  [rejected ] {err}"),
    }
}

fn print_state(state: &DrawState, sent: &DrawConfig) {
    println!();
    let numbers = state
        .numbers()
        .map(|n| {
            n.iter()
                .map(|x| x.to_string())
                .collect::<Vec<_>>()
                .join(" ")
        })
        .unwrap_or_else(|| "-".to_string());
    println!("  Numbers:     {numbers}");
    println!("  Fingerprint: {}", state.fingerprint().unwrap_or("-"));

    if let Some(result) = &state.result {
        println!("  Status:      {}", result.status);
        println!("  Duration:    {:.2}s", result.duration_secs());
        println!(
            "  Config:      {} bits from {} ({} numbers, max {})",
            sent.bits,
            sent.sources.join(", "),
            sent.numbers,
            sent.max_number
        );
        if !result.tests.is_empty() {
            println!("  Tests:");
            for (name, outcome) in &result.tests {
                let passed = outcome.get("passed").and_then(|v| v.as_bool());
                let mark = match passed {
                    Some(true) => "pass",
                    Some(false) => "FAIL",
                    None => "?",
                };
                println!("    {name:<24} {mark}");
            }
        }
    }

    if state.show_bits {
        if let Some(bits) = &state.bits {
            println!(
                "  Bits:        {} ({} ones of {})",
                bits.bits,
                bits.count_ones(),
                bits.length
            );
        }
    }
}
