//! Face Recognition State Machine
//!
//! A single cooperative loop with its own FIFO run queue. Each step pops one
//! action, looks up `(state, action)` in the transition table, moves to the
//! next state and runs that state's handler, which enqueues what comes next.
//!
//! After any definitive outcome (recognized, remembered, naming failed) the
//! machine pauses itself: it keeps polling the camera but ignores faces until
//! [`RecognizerHandle::trigger`] is called from another thread.

use crate::config::Config;
use crate::exchange::{Outcome, RecognitionResult, RecognizerEnd, Received, RequestId};
use crate::faces::{squared_distance, Embedding, FaceDatabase, Recognition};
use crate::shutdown::StopSignal;
use crate::speech::Speaker;
use crate::vision::{FaceSample, FaceSource};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Longest stretch the naming wait goes without looking at the stop signal
const STOP_POLL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum State {
    Idle,
    Detecting,
    Recognizing,
    Remembering,
    Checking,
}

impl std::fmt::Display for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            State::Idle => "idle",
            State::Detecting => "detecting",
            State::Recognizing => "recognizing",
            State::Remembering => "remembering",
            State::Checking => "checking",
        };
        f.write_str(name)
    }
}

/// Entries of the run queue; payloads travel with the action
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Start,
    FaceDetected(Embedding),
    FaceNotDetected,
    Paused,
    FaceRecognized,
    FaceNotRecognized {
        embedding: Embedding,
        request: RequestId,
    },
    Successful,
    Failure,
    FaceStillPresent {
        person: String,
        embedding: Embedding,
    },
    FaceLost,
    FaceNotSimilar(Embedding),
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::Start => "start",
            Action::FaceDetected(_) => "face_detected",
            Action::FaceNotDetected => "face_not_detected",
            Action::Paused => "paused",
            Action::FaceRecognized => "face_recognized",
            Action::FaceNotRecognized { .. } => "face_not_recognized",
            Action::Successful => "successful",
            Action::Failure => "failure",
            Action::FaceStillPresent { .. } => "face_still_present",
            Action::FaceLost => "face_lost",
            Action::FaceNotSimilar(_) => "face_not_similar",
        }
    }
}

/// State handlers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handler {
    Detect,
    Recognize,
    Remember,
    Check,
}

/// The transition table: (current state, action) → (next state, handler)
///
/// Returns None for pairs that are not in the table.
pub fn transition(state: State, action: &Action) -> Option<(State, Handler)> {
    use Action::*;
    use State::*;

    match (state, action) {
        (Idle, Start) => Some((Detecting, Handler::Detect)),

        (Detecting, FaceDetected(_)) => Some((Recognizing, Handler::Recognize)),
        (Detecting, FaceNotDetected) => Some((Detecting, Handler::Detect)),
        (Detecting, Paused) => Some((Detecting, Handler::Detect)),

        (Recognizing, FaceRecognized) => Some((Detecting, Handler::Detect)),
        (Recognizing, FaceNotRecognized { .. }) => Some((Remembering, Handler::Remember)),
        (Recognizing, Paused) => Some((Detecting, Handler::Detect)),

        (Remembering, Successful) => Some((Detecting, Handler::Detect)),
        (Remembering, Failure) => Some((Detecting, Handler::Detect)),

        (Checking, FaceStillPresent { .. }) => Some((Checking, Handler::Check)),
        (Checking, FaceLost) => Some((Detecting, Handler::Detect)),
        (Checking, FaceNotSimilar(_)) => Some((Recognizing, Handler::Recognize)),

        _ => None,
    }
}

/// Flags shared between the recognizer thread and its handles
#[derive(Debug)]
struct Control {
    paused: AtomicBool,
    generation: AtomicU64,
    /// Highest round the dispatcher stopped waiting for
    abandoned: AtomicU64,
}

/// Cross-thread entry points into a running recognizer
#[derive(Debug, Clone)]
pub struct RecognizerHandle {
    control: Arc<Control>,
}

impl RecognizerHandle {
    /// Resume reacting to faces. Returns the round the next result will carry.
    /// Triggering while already running changes nothing.
    pub fn trigger(&self) -> RequestId {
        if self.control.paused.swap(false, Ordering::SeqCst) {
            let generation = self.control.generation.fetch_add(1, Ordering::SeqCst) + 1;
            info!("▶️ Face recognition triggered (round {})", generation);
            RequestId(generation)
        } else {
            RequestId(self.control.generation.load(Ordering::SeqCst))
        }
    }

    /// Give up on `request`: its naming exchange will not be started, and the
    /// recognizer pauses if that round is still the current one
    pub fn abandon(&self, request: RequestId) {
        self.control.abandoned.fetch_max(request.0, Ordering::SeqCst);
        if self.control.generation.load(Ordering::SeqCst) == request.0
            && !self.control.paused.swap(true, Ordering::SeqCst)
        {
            info!("⏹️ Face recognition round {} abandoned", request.0);
        }
    }

    pub fn is_paused(&self) -> bool {
        self.control.paused.load(Ordering::SeqCst)
    }
}

/// Tunables for the recognizer loop
#[derive(Debug, Clone)]
pub struct RecognizerSettings {
    pub match_threshold: f32,
    pub naming_timeout: Duration,
    pub idle_poll: Duration,
    pub no_face_sleep: Duration,
}

impl From<&Config> for RecognizerSettings {
    fn from(config: &Config) -> Self {
        Self {
            match_threshold: config.match_threshold,
            naming_timeout: config.naming_timeout(),
            idle_poll: config.idle_poll(),
            no_face_sleep: config.no_face_sleep(),
        }
    }
}

/// The face recognition state machine
pub struct FaceRecognizer {
    state: State,
    queue: VecDeque<Action>,
    source: Box<dyn FaceSource>,
    people: FaceDatabase,
    exchange: RecognizerEnd,
    speaker: Arc<dyn Speaker>,
    settings: RecognizerSettings,
    control: Arc<Control>,
    stop: StopSignal,
}

impl FaceRecognizer {
    /// Build a paused recognizer in `idle` with `start` already queued
    pub fn new(
        source: Box<dyn FaceSource>,
        people: FaceDatabase,
        exchange: RecognizerEnd,
        speaker: Arc<dyn Speaker>,
        settings: RecognizerSettings,
        stop: StopSignal,
    ) -> Self {
        let mut recognizer = Self {
            state: State::Idle,
            queue: VecDeque::new(),
            source,
            people,
            exchange,
            speaker,
            settings,
            control: Arc::new(Control {
                paused: AtomicBool::new(true),
                generation: AtomicU64::new(0),
                abandoned: AtomicU64::new(0),
            }),
            stop,
        };
        recognizer.enqueue(Action::Start);
        recognizer
    }

    pub fn handle(&self) -> RecognizerHandle {
        RecognizerHandle {
            control: self.control.clone(),
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn enqueue(&mut self, action: Action) {
        self.queue.push_back(action);
    }

    /// Enter the continuity state for someone already identified, replacing
    /// anything still queued
    pub fn resume_tracking(&mut self, person: &str, embedding: Embedding) {
        self.queue.clear();
        self.state = State::Checking;
        self.enqueue(Action::FaceStillPresent {
            person: person.to_string(),
            embedding,
        });
    }

    /// Process one queued action. Returns false when the queue was empty.
    pub fn step(&mut self) -> bool {
        let Some(action) = self.queue.pop_front() else {
            return false;
        };

        match transition(self.state, &action) {
            Some((next, handler)) => {
                debug!("[FSM] {} --({})--> {}", self.state, action.name(), next);
                self.state = next;
                self.invoke(handler, action);
            }
            None => {
                warn!(
                    "[FSM] invalid transition ({}, {}), dropped",
                    self.state,
                    action.name()
                );
            }
        }
        true
    }

    /// Run until the stop signal is observed
    pub fn run(mut self) {
        info!("👀 Face recognizer started");
        while !self.stopped() {
            if !self.step() {
                thread::sleep(self.settings.idle_poll);
            }
        }
        info!("👀 Face recognizer stopped");
    }

    /// Run on a dedicated thread
    pub fn spawn(self) -> std::io::Result<thread::JoinHandle<()>> {
        thread::Builder::new()
            .name("face-recognizer".to_string())
            .spawn(move || self.run())
    }

    fn stopped(&self) -> bool {
        self.stop.is_set()
    }

    fn paused(&self) -> bool {
        self.control.paused.load(Ordering::SeqCst)
    }

    fn pause(&self) {
        self.control.paused.store(true, Ordering::SeqCst);
    }

    /// Pause unless a newer round was triggered meanwhile
    fn pause_round(&self, request: RequestId) {
        if self.round() == request {
            self.pause();
        }
    }

    fn abandoned(&self, request: RequestId) -> bool {
        request.0 <= self.control.abandoned.load(Ordering::SeqCst)
    }

    fn round(&self) -> RequestId {
        RequestId(self.control.generation.load(Ordering::SeqCst))
    }

    fn invoke(&mut self, handler: Handler, action: Action) {
        match (handler, action) {
            (Handler::Detect, _) => self.detect(),
            (Handler::Recognize, Action::FaceDetected(embedding))
            | (Handler::Recognize, Action::FaceNotSimilar(embedding)) => self.recognize(embedding),
            (Handler::Remember, Action::FaceNotRecognized { embedding, request }) => {
                self.remember(embedding, request)
            }
            (Handler::Check, Action::FaceStillPresent { person, embedding }) => {
                self.check(person, embedding)
            }
            (handler, action) => {
                warn!("[FSM] {:?} has no payload in {}", handler, action.name());
            }
        }
    }

    fn detect(&mut self) {
        if self.stopped() {
            return;
        }

        let sample = self.source.sample();
        if self.paused() {
            thread::sleep(self.settings.no_face_sleep);
            self.enqueue(Action::Paused);
            return;
        }

        match sample {
            FaceSample::Face(embedding) => self.enqueue(Action::FaceDetected(embedding)),
            FaceSample::Nothing => {
                thread::sleep(self.settings.no_face_sleep);
                self.enqueue(Action::FaceNotDetected);
            }
        }
    }

    fn recognize(&mut self, embedding: Embedding) {
        if self.stopped() {
            return;
        }

        // Paused mid-round: nobody asked, so report nothing
        if self.paused() {
            debug!("Face seen while paused, back to detecting");
            self.enqueue(Action::Paused);
            return;
        }

        if let Err(e) = self.speaker.prompt("Recognising…") {
            warn!("Could not show prompt: {}", e);
        }
        let request = self.round();
        let recognition = self
            .people
            .recognize(&embedding, self.settings.match_threshold)
            .unwrap_or_else(|e| {
                warn!("⚠️ Face table unavailable: {}", e);
                Recognition::Unknown {
                    best_distance: f32::INFINITY,
                }
            });

        match recognition {
            Recognition::Known { name, distance } => {
                info!("🙂 Recognised {} ({:.3})", name, distance);
                if let Err(e) = self.speaker.say(&format!("Hello {}", name)) {
                    warn!("Could not greet {}: {}", name, e);
                }
                self.post(request, Outcome::Recognized { person: name });
                self.enqueue(Action::FaceRecognized);
                self.pause();
            }
            Recognition::Unknown { best_distance } => {
                debug!("Unknown face (closest {:.3})", best_distance);
                self.post(request, Outcome::NotRecognized);
                self.enqueue(Action::FaceNotRecognized { embedding, request });
            }
        }
    }

    fn remember(&mut self, embedding: Embedding, request: RequestId) {
        if self.stopped() {
            return;
        }

        if self.abandoned(request) {
            info!("Round {} was abandoned, not asking for a name", request.0);
            self.enqueue(Action::Failure);
            self.pause_round(request);
            return;
        }

        if let Err(e) = self.speaker.prompt("Who are you?") {
            warn!("Could not show prompt: {}", e);
        }
        match self.wait_for_name(request) {
            Some(name) => match self.people.remember(&name, embedding) {
                Ok(count) => {
                    info!("💾 Stored embedding #{} for {}", count, name);
                    if let Err(e) = self.speaker.say(&format!("Hello {}", name)) {
                        warn!("Could not greet {}: {}", name, e);
                    }
                    self.enqueue(Action::Successful);
                }
                Err(e) => {
                    warn!("⚠️ Could not store face for {}: {}", name, e);
                    self.enqueue(Action::Failure);
                }
            },
            None => self.enqueue(Action::Failure),
        }
        self.pause_round(request);
    }

    fn check(&mut self, person: String, last: Embedding) {
        if self.stopped() {
            return;
        }

        if let Err(e) = self.speaker.prompt(&person) {
            warn!("Could not show prompt: {}", e);
        }
        match self.source.sample() {
            FaceSample::Nothing => self.enqueue(Action::FaceLost),
            FaceSample::Face(current) => {
                if squared_distance(&last, &current) > self.settings.match_threshold {
                    self.enqueue(Action::FaceNotSimilar(current));
                } else {
                    self.enqueue(Action::FaceStillPresent {
                        person,
                        embedding: current,
                    });
                }
            }
        }
    }

    fn post(&self, request: RequestId, outcome: Outcome) {
        if let Err(e) = self.exchange.post_result(RecognitionResult { request, outcome }) {
            debug!("Recognition result not delivered: {}", e);
        }
    }

    /// Bounded wait for the name answering `request`; None on timeout, stop or empty answer
    fn wait_for_name(&self, request: RequestId) -> Option<String> {
        let deadline = Instant::now() + self.settings.naming_timeout;
        loop {
            if self.stopped() || self.abandoned(request) {
                return None;
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                info!("⌛ Nobody answered the naming prompt");
                return None;
            }
            match self.exchange.wait_reply(request, remaining.min(STOP_POLL)) {
                Received::Message(reply) => return reply.name.filter(|n| !n.is_empty()),
                Received::TimedOut => continue,
                Received::Closed => return None,
            }
        }
    }
}
