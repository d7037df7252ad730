pub mod citations;
pub mod decode;
pub mod parser;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::{Stream, StreamExt};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::client::R2rClient;
use crate::error::RagError;
use crate::types::RagRequest;

use decode::ChunkDecoder;
use parser::parse_buffer;

/// Events delivered to the caller, strictly in computation order.
///
/// `Update` values are wholesale replacements of whatever was delivered
/// before, never diffs. After `Complete` or `Error` nothing else arrives;
/// a cancelled session simply goes quiet.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    Update {
        /// Raw sources payload, absent until its closing sentinel arrives.
        sources: Option<String>,
        /// Normalized answer text, absent until its opening sentinel arrives.
        answer: Option<String>,
    },
    Error(RagError),
    Complete,
}

/// One in-flight streaming request: the query it serves, its append-only
/// text buffer, and the last values handed to the caller.
struct StreamSession {
    query: String,
    started_at: DateTime<Utc>,
    buffer: String,
    sources: Option<String>,
    answer: Option<String>,
}

impl StreamSession {
    fn new(query: String) -> Self {
        Self {
            query,
            started_at: Utc::now(),
            buffer: String::new(),
            sources: None,
            answer: None,
        }
    }

    /// Re-scan the buffer and emit an update if anything changed. Never
    /// emits once cancellation has been observed.
    fn emit_latest(&mut self, tx: &UnboundedSender<StreamEvent>, cancelled: &AtomicBool) {
        let snapshot = parse_buffer(&self.buffer);
        if snapshot.is_empty() {
            return;
        }
        if snapshot.sources == self.sources && snapshot.answer == self.answer {
            return;
        }
        self.sources = snapshot.sources;
        self.answer = snapshot.answer;
        if cancelled.load(Ordering::SeqCst) {
            return;
        }
        let _ = tx.send(StreamEvent::Update {
            sources: self.sources.clone(),
            answer: self.answer.clone(),
        });
    }
}

/// Handle to a running session. Dropping it does NOT cancel the stream;
/// call `cancel` (idempotent, safe after completion) to abandon it.
pub struct SessionHandle {
    cancelled: Arc<AtomicBool>,
    notify: Arc<Notify>,
    task: JoinHandle<Result<(), RagError>>,
}

impl SessionHandle {
    pub fn cancel(&self) {
        if !self.cancelled.swap(true, Ordering::SeqCst) {
            debug!("Session cancellation requested");
            // notify_one stores a permit, so the session task sees the
            // cancellation even if it isn't parked in select! yet
            self.notify.notify_one();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Wait for the session task to finish and report how it ended.
    pub async fn join(self) -> Result<(), RagError> {
        match self.task.await {
            Ok(outcome) => outcome,
            Err(e) => Err(RagError::Stream(format!("session task failed: {e}"))),
        }
    }
}

/// Begin a streaming session for one request. Exactly one HTTP request is
/// issued. The caller consumes events from the returned receiver and keeps
/// the handle to cancel; starting a replacement query means cancelling this
/// handle first so no stale update can land after the new session starts.
pub fn start_stream(
    client: Arc<R2rClient>,
    request: RagRequest,
) -> (SessionHandle, UnboundedReceiver<StreamEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let cancelled = Arc::new(AtomicBool::new(false));
    let notify = Arc::new(Notify::new());

    let task_cancelled = cancelled.clone();
    let task_notify = notify.clone();
    let task = tokio::spawn(async move {
        let session = StreamSession::new(request.query.clone());

        let chunks = tokio::select! {
            biased;
            _ = task_notify.notified() => return Err(RagError::Cancelled),
            opened = client.rag_stream(&request) => match opened {
                Ok(chunks) => chunks,
                Err(e) => {
                    warn!(error = %e, "Completion request failed");
                    if !task_cancelled.load(Ordering::SeqCst) {
                        let _ = tx.send(StreamEvent::Error(e.clone()));
                    }
                    return Err(e);
                }
            },
        };

        pump(Box::pin(chunks), session, &tx, &task_cancelled, &task_notify).await
    });

    (
        SessionHandle {
            cancelled,
            notify,
            task,
        },
        rx,
    )
}

/// Read loop: decode each chunk, append to the buffer, re-scan, emit.
/// Cancellation is checked on every iteration, both before and inside the
/// select, so a hung upstream cannot outlive a cancel request.
async fn pump<S, B>(
    mut chunks: S,
    mut session: StreamSession,
    tx: &UnboundedSender<StreamEvent>,
    cancelled: &AtomicBool,
    notify: &Notify,
) -> Result<(), RagError>
where
    S: Stream<Item = Result<B, RagError>> + Unpin,
    B: AsRef<[u8]>,
{
    let mut decoder = ChunkDecoder::new();
    let mut chunk_count = 0usize;

    loop {
        if cancelled.load(Ordering::SeqCst) {
            return Err(RagError::Cancelled);
        }

        let next = tokio::select! {
            biased;
            _ = notify.notified() => return Err(RagError::Cancelled),
            next = chunks.next() => next,
        };

        let Some(chunk) = next else {
            break;
        };

        let bytes = match chunk {
            Ok(bytes) => bytes,
            Err(e) => return fail(tx, cancelled, e),
        };

        let text = match decoder.decode(bytes.as_ref()) {
            Ok(text) => text,
            Err(e) => return fail(tx, cancelled, e),
        };

        chunk_count += 1;
        if text.is_empty() {
            continue;
        }
        session.buffer.push_str(&text);
        session.emit_latest(tx, cancelled);
    }

    if let Err(e) = decoder.finish() {
        return fail(tx, cancelled, e);
    }

    // Flush pass: end-of-stream confirms whatever the buffer holds
    session.emit_latest(tx, cancelled);

    if cancelled.load(Ordering::SeqCst) {
        return Err(RagError::Cancelled);
    }

    info!(
        query = %session.query,
        chunks = chunk_count,
        buffer_len = session.buffer.len(),
        elapsed_ms = (Utc::now() - session.started_at).num_milliseconds(),
        "Stream complete"
    );
    let _ = tx.send(StreamEvent::Complete);
    Ok(())
}

fn fail(
    tx: &UnboundedSender<StreamEvent>,
    cancelled: &AtomicBool,
    error: RagError,
) -> Result<(), RagError> {
    warn!(error = %error, "Stream failed");
    if !cancelled.load(Ordering::SeqCst) {
        let _ = tx.send(StreamEvent::Error(error.clone()));
    }
    Err(error)
}
