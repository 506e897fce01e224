//! Intent Dispatcher
//!
//! Maps each understood intent to robot behaviour: a gesture on the actuator
//! link, a sound clip, a direct drive command, or the identify round trip with
//! the face recognizer. Intents are handled one at a time, in arrival order.

use crate::actions::{ActionTable, IntentAction, InternalHandler, Resolved};
use crate::actuator::CommandChannel;
use crate::audio::ClipPlayer;
use crate::config::Config;
use crate::exchange::{DispatcherEnd, Outcome, Received, RequestId};
use crate::fsm::RecognizerHandle;
use crate::orient::Orienter;
use crate::shutdown::StopSignal;
use crate::speech::Speaker;
use crate::voice::IntentEvent;
use crossbeam_channel::{Receiver, RecvTimeoutError};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

const INTENT_POLL: Duration = Duration::from_millis(100);

/// Timing and paths used while dispatching
#[derive(Debug, Clone)]
pub struct DispatchSettings {
    pub settle_delay: Duration,
    pub step_delay: Duration,
    pub identify_timeout: Duration,
    pub naming_timeout: Duration,
    pub stop_token: String,
    pub assets_dir: PathBuf,
}

impl From<&Config> for DispatchSettings {
    fn from(config: &Config) -> Self {
        Self {
            settle_delay: config.settle_delay(),
            step_delay: config.step_delay(),
            identify_timeout: config.identify_timeout(),
            naming_timeout: config.naming_timeout(),
            stop_token: config.stop_token.clone(),
            assets_dir: PathBuf::from(&config.assets_dir),
        }
    }
}

/// What handling one intent amounted to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// Not understood, or a name heard outside a naming exchange
    Ignored,
    /// A name answered the naming prompt
    NameAccepted(String),
    /// Something other than a name arrived while a name was expected
    NameExpected,
    /// Single drive command followed by the stop token
    Direct(String),
    /// Scripted gesture; `sent` counts the steps the link accepted
    Gesture { sent: usize, steps: usize },
    /// Identify round trip finished with this outcome, None if nothing came back
    Identify(Option<Outcome>),
    /// Internal action with no handler attached
    SoundOnly,
}

/// A naming exchange in progress
#[derive(Debug, Clone, Copy)]
struct AwaitingName {
    request: RequestId,
    deadline: Instant,
}

pub struct IntentDispatcher {
    channel: Arc<CommandChannel>,
    player: Arc<dyn ClipPlayer>,
    speaker: Arc<dyn Speaker>,
    recognizer: RecognizerHandle,
    exchange: DispatcherEnd,
    orienter: Orienter,
    actions: Arc<ActionTable>,
    roster: HashSet<String>,
    settings: DispatchSettings,
    awaiting: Option<AwaitingName>,
}

impl IntentDispatcher {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        channel: Arc<CommandChannel>,
        player: Arc<dyn ClipPlayer>,
        speaker: Arc<dyn Speaker>,
        recognizer: RecognizerHandle,
        exchange: DispatcherEnd,
        orienter: Orienter,
        actions: ActionTable,
        roster: &[String],
        settings: DispatchSettings,
    ) -> Self {
        Self {
            channel,
            player,
            speaker,
            recognizer,
            exchange,
            orienter,
            actions: Arc::new(actions),
            roster: roster.iter().cloned().collect(),
            settings,
            awaiting: None,
        }
    }

    /// True while the next name heard will be passed to the recognizer
    pub fn awaiting_name(&self) -> bool {
        self.awaiting.is_some()
    }

    /// Handle one intent to completion
    pub fn handle(&mut self, event: IntentEvent) -> Dispatch {
        if !event.understood {
            return Dispatch::Ignored;
        }
        let label = event.label.as_str();
        info!("Recognised: {}", label);

        if let Some(awaiting) = self.awaiting {
            if Instant::now() > awaiting.deadline {
                info!("⌛ Naming window closed");
                self.awaiting = None;
            } else {
                return self.answer_naming(awaiting, label);
            }
        }

        if self.roster.contains(label) {
            debug!("Ignoring name '{}' outside a naming exchange", label);
            return Dispatch::Ignored;
        }

        let actions = Arc::clone(&self.actions);
        match actions.resolve(label) {
            Resolved::Direct(token) => self.direct(token),
            Resolved::Action(action) => {
                if let Some(sound) = action.sound() {
                    self.play(sound);
                }
                match action {
                    IntentAction::Scripted { steps, .. } => self.gesture(steps),
                    IntentAction::Internal { handler, .. } => match handler {
                        Some(InternalHandler::Identify) => self.identify(),
                        None => Dispatch::SoundOnly,
                    },
                }
            }
        }
    }

    /// Handle intents until stopped or the intent queue closes
    pub fn run(mut self, intents: Receiver<IntentEvent>, stop: StopSignal) {
        info!("🤖 Intent dispatcher started");
        while !stop.is_set() {
            match intents.recv_timeout(INTENT_POLL) {
                Ok(event) => {
                    let outcome = self.handle(event);
                    debug!("Dispatch: {:?}", outcome);
                }
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        info!("🤖 Intent dispatcher stopped");
    }

    pub fn spawn(
        self,
        intents: Receiver<IntentEvent>,
        stop: StopSignal,
    ) -> std::io::Result<thread::JoinHandle<()>> {
        thread::Builder::new()
            .name("intent-dispatcher".to_string())
            .spawn(move || self.run(intents, stop))
    }

    fn answer_naming(&mut self, awaiting: AwaitingName, label: &str) -> Dispatch {
        if !self.roster.contains(label) {
            if let Err(e) = self.speaker.prompt("Say your name") {
                warn!("Could not show prompt: {}", e);
            }
            return Dispatch::NameExpected;
        }

        if let Err(e) = self
            .exchange
            .reply_name(awaiting.request, Some(label.to_string()))
        {
            warn!("⚠️ Could not hand name to the recognizer: {}", e);
        }
        self.awaiting = None;
        Dispatch::NameAccepted(label.to_string())
    }

    fn direct(&self, token: &str) -> Dispatch {
        self.channel.send_or_warn(token);
        thread::sleep(self.settings.settle_delay);
        self.channel.send_or_warn(&self.settings.stop_token);
        Dispatch::Direct(token.to_string())
    }

    fn play(&self, sound: &str) {
        let path = self.settings.assets_dir.join(sound);
        if let Err(e) = self.player.play(&path) {
            warn!("[AUDIO] {}", e);
        }
    }

    /// Every step is attempted; a failed write does not cut the gesture short
    fn gesture(&self, steps: &[String]) -> Dispatch {
        let mut sent = 0;
        for step in steps {
            if self.channel.send_or_warn(step) {
                sent += 1;
            }
            thread::sleep(self.settings.step_delay);
        }
        Dispatch::Gesture {
            sent,
            steps: steps.len(),
        }
    }

    fn identify(&mut self) -> Dispatch {
        self.orienter.face_speaker(&self.channel);

        let request = self.recognizer.trigger();
        match self
            .exchange
            .wait_result(request, self.settings.identify_timeout)
        {
            Received::Message(result) => {
                if result.outcome == Outcome::NotRecognized {
                    info!("❓ Unknown face, waiting for a name");
                    self.awaiting = Some(AwaitingName {
                        request,
                        deadline: Instant::now() + self.settings.naming_timeout,
                    });
                }
                Dispatch::Identify(Some(result.outcome))
            }
            Received::TimedOut => {
                warn!("⌛ No face seen within {:?}", self.settings.identify_timeout);
                self.recognizer.abandon(request);
                Dispatch::Identify(None)
            }
            Received::Closed => {
                warn!("Face recognizer is gone");
                Dispatch::Identify(None)
            }
        }
    }
}
