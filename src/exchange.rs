//! Exchange between the face recognizer and the intent dispatcher
//!
//! Two bounded channels, one per direction. Every message carries the
//! [`RequestId`] of the recognition round it belongs to, so a reader can
//! tell a stale message from the one it is waiting for.

use crate::error::{RobotError, RobotResult};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Queue depth for each direction
pub const EXCHANGE_CAPACITY: usize = 8;

/// Correlation token: the trigger generation a recognition round started under
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RequestId(pub u64);

/// What the recognizer concluded about the face in front of it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum Outcome {
    Recognized { person: String },
    NotRecognized,
}

/// Recognizer → dispatcher
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecognitionResult {
    pub request: RequestId,
    #[serde(flatten)]
    pub outcome: Outcome,
}

/// Dispatcher → recognizer; `name: None` means the naming exchange failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameReply {
    pub request: RequestId,
    pub name: Option<String>,
}

/// Outcome of a bounded wait
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Received<T> {
    Message(T),
    TimedOut,
    Closed,
}

/// Create both ends of the exchange
pub fn exchange() -> (RecognizerEnd, DispatcherEnd) {
    let (results_tx, results_rx) = bounded(EXCHANGE_CAPACITY);
    let (replies_tx, replies_rx) = bounded(EXCHANGE_CAPACITY);
    (
        RecognizerEnd {
            results: results_tx,
            replies: replies_rx,
        },
        DispatcherEnd {
            results: results_rx,
            replies: replies_tx,
        },
    )
}

/// Recognizer side: posts results, waits for names
pub struct RecognizerEnd {
    results: Sender<RecognitionResult>,
    replies: Receiver<NameReply>,
}

impl RecognizerEnd {
    /// Never blocks; a full queue means nobody is listening, so the result is dropped
    pub fn post_result(&self, result: RecognitionResult) -> RobotResult<()> {
        try_post(&self.results, result, "recognition result")
    }

    /// Wait up to `timeout` for the reply to `request`, discarding stale replies
    pub fn wait_reply(&self, request: RequestId, timeout: Duration) -> Received<NameReply> {
        wait_for(&self.replies, timeout, |reply: &NameReply| {
            reply.request == request
        })
    }
}

/// Dispatcher side: waits for results, posts names
pub struct DispatcherEnd {
    results: Receiver<RecognitionResult>,
    replies: Sender<NameReply>,
}

impl DispatcherEnd {
    /// Wait up to `timeout` for the result of `request`, discarding older rounds
    pub fn wait_result(
        &self,
        request: RequestId,
        timeout: Duration,
    ) -> Received<RecognitionResult> {
        wait_for(&self.results, timeout, |result: &RecognitionResult| {
            result.request == request
        })
    }

    pub fn reply_name(&self, request: RequestId, name: Option<String>) -> RobotResult<()> {
        try_post(&self.replies, NameReply { request, name }, "name reply")
    }
}

fn try_post<T>(tx: &Sender<T>, msg: T, what: &str) -> RobotResult<()> {
    match tx.try_send(msg) {
        Ok(()) => Ok(()),
        Err(TrySendError::Full(_)) => {
            warn!("⚠️ Exchange full, dropping {}", what);
            Err(RobotError::Timeout(format!("room to post {}", what)))
        }
        Err(TrySendError::Disconnected(_)) => {
            Err(RobotError::Other(anyhow::anyhow!("exchange closed ({})", what)))
        }
    }
}

fn wait_for<T: std::fmt::Debug>(
    rx: &Receiver<T>,
    timeout: Duration,
    wanted: impl Fn(&T) -> bool,
) -> Received<T> {
    let deadline = Instant::now() + timeout;
    loop {
        match rx.recv_deadline(deadline) {
            Ok(msg) if wanted(&msg) => return Received::Message(msg),
            Ok(stale) => debug!("Discarding stale exchange message: {:?}", stale),
            Err(RecvTimeoutError::Timeout) => return Received::TimedOut,
            Err(RecvTimeoutError::Disconnected) => return Received::Closed,
        }
    }
}
