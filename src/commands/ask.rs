use std::io::Write;
use std::sync::Arc;

use anyhow::Result;
use tokio::io::AsyncBufReadExt;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{info, warn};

use crate::client::R2rClient;
use crate::config::AppConfig;
use crate::error::RagError;
use crate::stream::{start_stream, SessionHandle, StreamEvent};
use crate::types::parse_sources;

/// Ask a question about uploaded documents, streaming the answer to the
/// terminal. Without a query argument, reads queries from stdin in a loop;
/// submitting a new line cancels whatever is still streaming.
pub async fn run(
    client: Arc<R2rClient>,
    config: &AppConfig,
    query: Option<String>,
) -> Result<()> {
    // No uploaded documents means nothing to retrieve against
    match client.user_documents(&config.user_id).await {
        Ok(docs) if docs.is_empty() => {
            println!("Please upload at least one document to submit queries.");
            return Ok(());
        }
        Ok(_) => {}
        Err(e) => warn!(error = %e, "Could not check uploaded documents"),
    }

    match query {
        Some(q) if !q.trim().is_empty() => ask_once(client, config, q.trim()).await,
        Some(_) => {
            println!("Please submit a query.");
            Ok(())
        }
        None => interactive(client, config).await,
    }
}

async fn ask_once(client: Arc<R2rClient>, config: &AppConfig, query: &str) -> Result<()> {
    info!(query, user_id = %config.user_id, "Query started");
    let mut request = config.request(query);
    request.generation.stream = true;

    let (handle, events) = start_stream(client, request);
    render_stream(events).await;
    let _ = handle.join().await;
    Ok(())
}

/// Read queries from stdin; each new non-empty line supersedes the
/// in-flight session before a new one starts, so no stale update can land
/// once the replacement query is running.
async fn interactive(client: Arc<R2rClient>, config: &AppConfig) -> Result<()> {
    println!("Ask anything (Ctrl-D to exit).");

    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    let mut active: Option<SessionHandle> = None;
    let mut render: Option<tokio::task::JoinHandle<()>> = None;

    while let Some(line) = lines.next_line().await? {
        let query = line.trim().to_string();
        if query.is_empty() {
            println!("Please submit a query.");
            continue;
        }

        if let Some(handle) = active.take() {
            handle.cancel();
            let _ = handle.join().await;
        }
        if let Some(task) = render.take() {
            let _ = task.await;
        }

        info!(query = %query, user_id = %config.user_id, "Query started");
        let mut request = config.request(&query);
        request.generation.stream = true;

        let (handle, events) = start_stream(client.clone(), request);
        active = Some(handle);
        render = Some(tokio::spawn(async move {
            render_stream(events).await;
        }));
    }

    if let Some(handle) = active.take() {
        handle.cancel();
        let _ = handle.join().await;
    }
    if let Some(task) = render.take() {
        let _ = task.await;
    }
    Ok(())
}

/// Consume session events until the stream ends. Sources print once as a
/// header block; the answer prints incrementally, reflowing only when an
/// update rewrites already-printed text (citation normalization can).
async fn render_stream(mut events: UnboundedReceiver<StreamEvent>) {
    let mut sources_shown = false;
    let mut printed = String::new();

    while let Some(event) = events.recv().await {
        match event {
            StreamEvent::Update { sources, answer } => {
                if !sources_shown {
                    if let Some(payload) = sources.as_deref() {
                        print_sources(payload);
                        sources_shown = true;
                    }
                }
                if let Some(answer) = answer {
                    if let Some(delta) = answer.strip_prefix(printed.as_str()) {
                        print!("{delta}");
                    } else {
                        // Earlier text changed shape; reprint wholesale
                        print!("\n{answer}");
                    }
                    let _ = std::io::stdout().flush();
                    printed = answer;
                }
            }
            StreamEvent::Error(e) => {
                println!();
                println!("{}", failure_message(&e));
                return;
            }
            StreamEvent::Complete => {
                println!();
                return;
            }
        }
    }
    // Channel closed without a terminal event: the session was superseded
}

fn print_sources(payload: &str) {
    match parse_sources(payload) {
        Ok(sources) if sources.is_empty() => {}
        Ok(sources) => {
            println!("Sources:");
            for source in &sources {
                println!("  [{:.2}] {}", source.score, source.label());
            }
            println!();
        }
        Err(e) => warn!(error = %e, "Sources payload did not parse"),
    }
}

/// User-facing copy for a failed stream. Rate limiting gets its own
/// message; everything else is indistinguishable overload to the user.
fn failure_message(error: &RagError) -> &'static str {
    if error.is_rate_limited() {
        "Sorry, you have made too many requests recently, try again later."
    } else {
        "Sorry, we might be overloaded, try again later."
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limit_gets_its_own_message() {
        let msg = failure_message(&RagError::Http { status: 429 });
        assert!(msg.contains("too many requests"));
    }

    #[test]
    fn test_other_statuses_map_to_overload() {
        for status in [400, 500, 502, 503] {
            let msg = failure_message(&RagError::Http { status });
            assert!(msg.contains("overloaded"), "status {status}");
        }
    }

    #[test]
    fn test_transport_failure_maps_to_overload() {
        let msg = failure_message(&RagError::Stream("reset".to_string()));
        assert!(msg.contains("overloaded"));
    }
}
