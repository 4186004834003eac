#![forbid(unsafe_code)]

use std::io::{BufRead, Write};
use std::sync::{Mutex, MutexGuard};

use relay_kernel_contracts::voice::VoiceLocale;
use relay_os::capabilities::{CaptureError, SpeechCapture, SpeechSynth};

/// Reads one line per utterance; prompts go to `prompt`.
pub struct ConsoleCapture<R, W> {
    input: Mutex<R>,
    prompt: Mutex<W>,
}

impl<R, W> ConsoleCapture<R, W>
where
    R: BufRead + Send,
    W: Write + Send,
{
    pub fn new(input: R, prompt: W) -> Self {
        Self {
            input: Mutex::new(input),
            prompt: Mutex::new(prompt),
        }
    }
}

impl<R, W> SpeechCapture for ConsoleCapture<R, W>
where
    R: BufRead + Send,
    W: Write + Send,
{
    fn is_supported(&self) -> bool {
        true
    }

    fn capture_utterance(&self, locale: &VoiceLocale) -> Result<String, CaptureError> {
        {
            let mut prompt = lock(&self.prompt);
            write!(prompt, "[{}] > ", locale.as_str())
                .and_then(|()| prompt.flush())
                .map_err(|e| CaptureError::Failed(e.to_string()))?;
        }
        let mut line = String::new();
        let read = lock(&self.input)
            .read_line(&mut line)
            .map_err(|e| CaptureError::Failed(e.to_string()))?;
        if read == 0 {
            return Err(CaptureError::Failed("end of input".to_string()));
        }
        let line = line.trim();
        if line.is_empty() {
            return Err(CaptureError::NoSpeech);
        }
        Ok(line.to_string())
    }
}

/// Prints each spoken phrase as its own line.
pub struct ConsoleSpeech<W> {
    out: Mutex<W>,
}

impl<W: Write + Send> ConsoleSpeech<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }
}

impl<W: Write + Send> SpeechSynth for ConsoleSpeech<W> {
    fn speak(&self, text: &str) -> Result<(), String> {
        let mut out = lock(&self.out);
        writeln!(out, "{text}")
            .and_then(|()| out.flush())
            .map_err(|e| e.to_string())
    }

    fn silence(&self) {}
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
