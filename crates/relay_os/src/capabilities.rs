#![forbid(unsafe_code)]

use std::sync::Arc;

use relay_engines::intent_parser::KeywordIntentParser;
use relay_kernel_contracts::intent::TransactionIntent;
use relay_kernel_contracts::voice::VoiceLocale;
use relay_storage::contacts::ContactDirectory;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaptureError {
    #[error("speech capture is not supported on this platform")]
    Unsupported,
    #[error("no speech was heard")]
    NoSpeech,
    #[error("speech capture failed: {0}")]
    Failed(String),
}

/// One utterance per call; blocks until the platform recogniser settles.
pub trait SpeechCapture: Send + Sync {
    fn is_supported(&self) -> bool;
    fn capture_utterance(&self, locale: &VoiceLocale) -> Result<String, CaptureError>;
}

/// Requests are not queued: `speak` replaces whatever is still playing.
pub trait SpeechSynth: Send + Sync {
    fn speak(&self, text: &str) -> Result<(), String>;
    fn silence(&self);
}

pub trait IntentParser: Send + Sync {
    fn parse_intent(&self, utterance: &str) -> Option<TransactionIntent>;
}

impl IntentParser for KeywordIntentParser {
    fn parse_intent(&self, utterance: &str) -> Option<TransactionIntent> {
        self.parse(utterance)
    }
}

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("remote trigger is not configured")]
    NotConfigured,
    #[error("remote trigger config is encrypted and locked")]
    Locked,
    #[error("intent could not be encoded: {0}")]
    Encode(#[from] relay_kernel_contracts::ContractViolation),
    #[error(transparent)]
    Push(#[from] relay_engines::push_dispatch::PushError),
}

pub trait IntentSubmitter: Send + Sync {
    fn submit(&self, intent: &TransactionIntent) -> Result<(), SubmitError>;
}

impl<T: SpeechCapture + ?Sized> SpeechCapture for Arc<T> {
    fn is_supported(&self) -> bool {
        (**self).is_supported()
    }

    fn capture_utterance(&self, locale: &VoiceLocale) -> Result<String, CaptureError> {
        (**self).capture_utterance(locale)
    }
}

impl<T: SpeechSynth + ?Sized> SpeechSynth for Arc<T> {
    fn speak(&self, text: &str) -> Result<(), String> {
        (**self).speak(text)
    }

    fn silence(&self) {
        (**self).silence()
    }
}

impl<T: IntentSubmitter + ?Sized> IntentSubmitter for Arc<T> {
    fn submit(&self, intent: &TransactionIntent) -> Result<(), SubmitError> {
        (**self).submit(intent)
    }
}

/// Everything a voice session talks to.
#[derive(Clone)]
pub struct VoiceCapabilities {
    pub capture: Arc<dyn SpeechCapture>,
    pub speech: Arc<dyn SpeechSynth>,
    pub parser: Arc<dyn IntentParser>,
    pub contacts: Arc<dyn ContactDirectory>,
    pub submitter: Arc<dyn IntentSubmitter>,
}

impl std::fmt::Debug for VoiceCapabilities {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VoiceCapabilities").finish_non_exhaustive()
    }
}
