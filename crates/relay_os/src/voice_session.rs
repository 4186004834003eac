#![forbid(unsafe_code)]

use std::env;
use std::sync::{Mutex, MutexGuard};

use relay_kernel_contracts::intent::{Contact, ContactTarget, TransactionIntent};
use relay_kernel_contracts::voice::{VoiceLocale, VoiceSessionState};
use tracing::{debug, info, warn};

use crate::capabilities::{CaptureError, VoiceCapabilities};
use crate::confirmation::{classify_confirmation, trailing_recipient_name, ConfirmationReply};
use crate::recipient::{describe_intent, resolve_intent, ResolvedIntent};

pub const CONFIRM_PROMPT_SUFFIX: &str = " Say yes to confirm, or no to cancel.";
pub const MSG_UNSUPPORTED: &str = "Voice commands aren't supported on this device.";
pub const MSG_NOT_HEARD: &str = "Sorry, I didn't catch that. Tap the mic and try again.";
pub const MSG_NOT_UNDERSTOOD: &str =
    "Sorry, I didn't understand that. Try something like: send 500 to 0712345678.";
pub const MSG_CANCELLED: &str = "Okay, cancelled.";
pub const MSG_SENT: &str = "Sent to your phone. Follow the prompts there to finish.";
pub const MSG_SUBMIT_FAILED: &str = "Couldn't reach your phone. Check your internet and settings.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceSessionConfig {
    pub locale: VoiceLocale,
    /// Save "<number> to <name>" recipients as contacts on confirmation.
    pub learn_contacts: bool,
}

impl VoiceSessionConfig {
    pub fn mvp_v1() -> Self {
        Self {
            locale: VoiceLocale::default(),
            learn_contacts: true,
        }
    }

    pub fn from_env() -> Self {
        let mut config = Self::mvp_v1();
        if let Ok(raw) = env::var("USSD_RELAY_VOICE_LOCALE") {
            match VoiceLocale::new(raw) {
                Ok(locale) => config.locale = locale,
                Err(err) => warn!(error = %err, "ignoring USSD_RELAY_VOICE_LOCALE"),
            }
        }
        if let Ok(raw) = env::var("USSD_RELAY_LEARN_CONTACTS") {
            config.learn_contacts = !matches!(raw.trim(), "0" | "false" | "off");
        }
        config
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoiceTurnOutcome {
    Submitted(TransactionIntent),
    Cancelled,
    /// The spoken failure message; the session is left in `Error`.
    Failed(String),
    /// `start`, `cancel` or `confirm` took over while this turn was waiting.
    Superseded,
    NothingPending,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceSessionSnapshot {
    pub state: VoiceSessionState,
    pub message: Option<String>,
    pub transcript: Option<String>,
    pub pending: Option<TransactionIntent>,
}

#[derive(Debug, Clone)]
struct PendingIntent {
    resolved: ResolvedIntent,
    utterance: String,
}

#[derive(Debug)]
struct SessionInner {
    state: VoiceSessionState,
    // Bumped by every start, cancel and confirm; a turn whose generation is
    // stale must not touch state again.
    generation: u64,
    message: Option<String>,
    transcript: Option<String>,
    pending: Option<PendingIntent>,
}

/// Listen, parse, read back, confirm, submit.
///
/// All methods take `&self`; `cancel` and `confirm` are meant to be called
/// from another thread while `start` is blocked in speech capture. The state
/// lock is never held across a capability call.
pub struct VoiceSession {
    config: VoiceSessionConfig,
    caps: VoiceCapabilities,
    inner: Mutex<SessionInner>,
}

impl VoiceSession {
    pub fn new(config: VoiceSessionConfig, caps: VoiceCapabilities) -> Self {
        Self {
            config,
            caps,
            inner: Mutex::new(SessionInner {
                state: VoiceSessionState::Idle,
                generation: 0,
                message: None,
                transcript: None,
                pending: None,
            }),
        }
    }

    pub fn snapshot(&self) -> VoiceSessionSnapshot {
        let inner = self.inner();
        VoiceSessionSnapshot {
            state: inner.state,
            message: inner.message.clone(),
            transcript: inner.transcript.clone(),
            pending: inner.pending.as_ref().map(|p| p.resolved.intent.clone()),
        }
    }

    /// Begins a new turn. A turn already in flight is superseded and its
    /// pending intent discarded.
    pub fn start(&self) -> VoiceTurnOutcome {
        let (generation, interrupted) = {
            let mut inner = self.inner();
            let interrupted = !matches!(
                inner.state,
                VoiceSessionState::Idle | VoiceSessionState::Error
            );
            inner.generation += 1;
            inner.state = VoiceSessionState::Listening;
            inner.message = None;
            inner.transcript = None;
            inner.pending = None;
            (inner.generation, interrupted)
        };
        if interrupted {
            info!("voice turn restarted");
            self.caps.speech.silence();
        }

        if !self.caps.capture.is_supported() {
            return self.fail(generation, MSG_UNSUPPORTED);
        }
        let utterance = match self.caps.capture.capture_utterance(&self.config.locale) {
            Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
            Ok(_) => return self.fail(generation, MSG_NOT_HEARD),
            Err(CaptureError::Unsupported) => return self.fail(generation, MSG_UNSUPPORTED),
            Err(err) => {
                warn!(error = %err, "speech capture failed");
                return self.fail(generation, MSG_NOT_HEARD);
            }
        };
        if !self.advance(generation, VoiceSessionState::Processing, |inner| {
            inner.transcript = Some(utterance.clone());
        }) {
            return VoiceTurnOutcome::Superseded;
        }

        let Some(parsed) = self.caps.parser.parse_intent(&utterance) else {
            return self.fail(generation, MSG_NOT_UNDERSTOOD);
        };
        let resolved = match resolve_intent(parsed, self.caps.contacts.as_ref()) {
            Ok(resolved) => resolved,
            Err(err) => {
                debug!(error = ?err, "intent could not be resolved");
                return self.fail(generation, &err.to_string());
            }
        };

        let prompt = format!("{}{CONFIRM_PROMPT_SUFFIX}", describe_intent(&resolved));
        if !self.advance(generation, VoiceSessionState::Confirming, |inner| {
            inner.message = Some(prompt.clone());
            inner.pending = Some(PendingIntent {
                resolved,
                utterance,
            });
        }) {
            return VoiceTurnOutcome::Superseded;
        }
        self.say(&prompt);
        if !self.advance(generation, VoiceSessionState::AwaitingConfirmation, |_| {}) {
            return VoiceTurnOutcome::Superseded;
        }

        let reply = self.caps.capture.capture_utterance(&self.config.locale);
        let mut inner = self.inner();
        if inner.generation != generation {
            return VoiceTurnOutcome::Superseded;
        }
        match reply {
            Ok(text) if classify_confirmation(&text) == ConfirmationReply::Affirmative => {
                let Some(pending) = inner.pending.take() else {
                    return VoiceTurnOutcome::NothingPending;
                };
                drop(inner);
                self.submit_pending(generation, pending)
            }
            Ok(_) => {
                inner.state = VoiceSessionState::Idle;
                inner.message = Some(MSG_CANCELLED.to_string());
                inner.pending = None;
                drop(inner);
                info!("voice intent declined");
                self.say(MSG_CANCELLED);
                VoiceTurnOutcome::Cancelled
            }
            Err(err) => {
                // Pending stays cached so `confirm` can still submit it.
                warn!(error = %err, "confirmation capture failed");
                inner.state = VoiceSessionState::Idle;
                inner.message = Some(MSG_CANCELLED.to_string());
                drop(inner);
                self.say(MSG_CANCELLED);
                VoiceTurnOutcome::Cancelled
            }
        }
    }

    /// Stops whatever is running and returns to idle without submitting.
    pub fn cancel(&self) {
        {
            let mut inner = self.inner();
            if inner.state.is_idle() {
                inner.pending = None;
                return;
            }
            inner.generation += 1;
            inner.state = VoiceSessionState::Idle;
            inner.message = Some(MSG_CANCELLED.to_string());
            inner.pending = None;
        }
        info!("voice session cancelled");
        self.caps.speech.silence();
        self.say(MSG_CANCELLED);
    }

    /// Submits the cached intent; the on-screen fallback for a missed "yes".
    pub fn confirm(&self) -> VoiceTurnOutcome {
        let (generation, pending) = {
            let mut inner = self.inner();
            let Some(pending) = inner.pending.take() else {
                return VoiceTurnOutcome::NothingPending;
            };
            inner.generation += 1;
            (inner.generation, pending)
        };
        self.submit_pending(generation, pending)
    }

    fn submit_pending(&self, generation: u64, pending: PendingIntent) -> VoiceTurnOutcome {
        if !self.advance(generation, VoiceSessionState::Processing, |_| {}) {
            return VoiceTurnOutcome::Superseded;
        }
        self.learn_contact(&pending);
        let intent = pending.resolved.intent;
        match self.caps.submitter.submit(&intent) {
            Ok(()) => {
                info!(mode = intent.mode_name(), "voice intent submitted");
                self.advance(generation, VoiceSessionState::Idle, |inner| {
                    inner.message = Some(MSG_SENT.to_string());
                });
                self.say(MSG_SENT);
                VoiceTurnOutcome::Submitted(intent)
            }
            Err(err) => {
                warn!(error = %err, mode = intent.mode_name(), "voice intent submit failed");
                self.fail(generation, MSG_SUBMIT_FAILED)
            }
        }
    }

    fn learn_contact(&self, pending: &PendingIntent) {
        if !self.config.learn_contacts || !pending.resolved.literal_phone {
            return;
        }
        let target = match &pending.resolved.intent {
            TransactionIntent::SendMoney { phone, .. } => ContactTarget::Phone {
                phone: phone.clone(),
            },
            TransactionIntent::Pochi { phone, .. } => ContactTarget::Pochi {
                phone: phone.clone(),
            },
            _ => return,
        };
        let Some(name) = trailing_recipient_name(&pending.utterance) else {
            return;
        };
        if self.caps.contacts.resolve_contact_by_name(&name).is_some() {
            return;
        }
        match self.caps.contacts.save_contact(Contact {
            name: name.clone(),
            target,
        }) {
            Ok(()) => info!(name = %name, "voice contact learned"),
            Err(err) => warn!(error = %err, "voice contact could not be saved"),
        }
    }

    fn fail(&self, generation: u64, message: &str) -> VoiceTurnOutcome {
        if !self.advance(generation, VoiceSessionState::Error, |inner| {
            inner.message = Some(message.to_string());
            inner.pending = None;
        }) {
            return VoiceTurnOutcome::Superseded;
        }
        self.say(message);
        VoiceTurnOutcome::Failed(message.to_string())
    }

    fn advance(
        &self,
        generation: u64,
        state: VoiceSessionState,
        update: impl FnOnce(&mut SessionInner),
    ) -> bool {
        let mut inner = self.inner();
        if inner.generation != generation {
            return false;
        }
        debug!(from = inner.state.as_str(), to = state.as_str(), "voice state");
        inner.state = state;
        update(&mut inner);
        true
    }

    fn say(&self, text: &str) {
        if let Err(err) = self.caps.speech.speak(text) {
            warn!(error = %err, "speech synthesis failed");
        }
    }

    fn inner(&self) -> MutexGuard<'_, SessionInner> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl std::fmt::Debug for VoiceSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VoiceSession")
            .field("config", &self.config)
            .field("state", &self.inner().state)
            .finish_non_exhaustive()
    }
}
