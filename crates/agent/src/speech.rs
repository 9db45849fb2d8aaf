use std::process::{Output, Stdio};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;
use waiter_core::config::SpeechConfig;

const INPUT_PLACEHOLDER: &str = "{input}";
const OUTPUT_PLACEHOLDER: &str = "{output}";

#[derive(Debug, Error)]
pub enum TranscriptionError {
    #[error("speech recognition is not configured")]
    Unavailable,
    #[error("could not stage audio for recognition: {0}")]
    Staging(#[source] std::io::Error),
    #[error("could not start recognizer `{command}`: {source}")]
    Spawn { command: String, source: std::io::Error },
    #[error("recognizer exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },
    #[error("recognizer did not finish within {0:?}")]
    TimedOut(Duration),
}

#[derive(Debug, Error)]
pub enum SynthesisError {
    #[error("speech synthesis is not configured")]
    Unavailable,
    #[error("could not stage synthesized audio: {0}")]
    Staging(#[source] std::io::Error),
    #[error("could not start synthesizer `{command}`: {source}")]
    Spawn { command: String, source: std::io::Error },
    #[error("synthesizer exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },
    #[error("synthesizer did not finish within {0:?}")]
    TimedOut(Duration),
    #[error("synthesizer produced no audio")]
    EmptyAudio,
}

/// Speech-to-text over a recorded voice message.
#[async_trait]
pub trait SpeechTranscriber: Send + Sync {
    async fn transcribe(&self, audio: &[u8]) -> Result<String, TranscriptionError>;
}

/// Text-to-speech for a reply that answers a voice message.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, SynthesisError>;
}

/// Runs an external recognizer binary against a temp copy of the audio and
/// reads the transcript from its stdout.
#[derive(Clone, Debug)]
pub struct CommandTranscriber {
    command: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandTranscriber {
    pub fn new(command: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        Self { command: command.into(), args, timeout }
    }

    fn render_args(&self, input: &str) -> Vec<String> {
        let mut rendered = render(&self.args, INPUT_PLACEHOLDER, input);
        if !self.args.iter().any(|arg| arg.contains(INPUT_PLACEHOLDER)) {
            rendered.push(input.to_owned());
        }
        rendered
    }
}

#[async_trait]
impl SpeechTranscriber for CommandTranscriber {
    async fn transcribe(&self, audio: &[u8]) -> Result<String, TranscriptionError> {
        let staged = tempfile::Builder::new()
            .prefix("waiter-voice-")
            .suffix(".ogg")
            .tempfile()
            .map_err(TranscriptionError::Staging)?;
        tokio::fs::write(staged.path(), audio).await.map_err(TranscriptionError::Staging)?;

        let input = staged.path().to_string_lossy().into_owned();
        let started = Instant::now();
        let output = run_command(&self.command, &self.render_args(&input), None, self.timeout)
            .await
            .map_err(|failure| match failure {
                RunFailure::Spawn(source) => {
                    TranscriptionError::Spawn { command: self.command.clone(), source }
                }
                RunFailure::TimedOut => TranscriptionError::TimedOut(self.timeout),
            })?;

        if !output.status.success() {
            return Err(TranscriptionError::Failed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
            });
        }

        let transcript = String::from_utf8_lossy(&output.stdout).trim().to_owned();
        debug!(
            event_name = "speech.transcribed",
            audio_bytes = audio.len(),
            transcript_len = transcript.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "voice message transcribed"
        );
        Ok(transcript)
    }
}

/// Runs an external synthesizer with the reply text on stdin. Audio is read
/// back from the `{output}` file when the args name one, otherwise from
/// stdout.
#[derive(Clone, Debug)]
pub struct CommandSynthesizer {
    command: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandSynthesizer {
    pub fn new(command: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        Self { command: command.into(), args, timeout }
    }

    fn writes_file(&self) -> bool {
        self.args.iter().any(|arg| arg.contains(OUTPUT_PLACEHOLDER))
    }
}

#[async_trait]
impl SpeechSynthesizer for CommandSynthesizer {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, SynthesisError> {
        let staged = tempfile::Builder::new()
            .prefix("waiter-reply-")
            .suffix(".ogg")
            .tempfile()
            .map_err(SynthesisError::Staging)?;
        let target = staged.path().to_string_lossy().into_owned();

        let started = Instant::now();
        let args = render(&self.args, OUTPUT_PLACEHOLDER, &target);
        let output = run_command(&self.command, &args, Some(text.as_bytes()), self.timeout)
            .await
            .map_err(|failure| match failure {
                RunFailure::Spawn(source) => {
                    SynthesisError::Spawn { command: self.command.clone(), source }
                }
                RunFailure::TimedOut => SynthesisError::TimedOut(self.timeout),
            })?;

        if !output.status.success() {
            return Err(SynthesisError::Failed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
            });
        }

        let audio = if self.writes_file() {
            tokio::fs::read(staged.path()).await.map_err(SynthesisError::Staging)?
        } else {
            output.stdout
        };
        if audio.is_empty() {
            return Err(SynthesisError::EmptyAudio);
        }

        debug!(
            event_name = "speech.synthesized",
            text_len = text.len(),
            audio_bytes = audio.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "reply synthesized"
        );
        Ok(audio)
    }
}

enum RunFailure {
    Spawn(std::io::Error),
    TimedOut,
}

/// Spawns `command`, feeds `stdin` if given and collects its output. The
/// child is killed when the deadline passes.
async fn run_command(
    command: &str,
    args: &[String],
    stdin: Option<&[u8]>,
    timeout: Duration,
) -> Result<Output, RunFailure> {
    let mut child = Command::new(command)
        .args(args)
        .stdin(if stdin.is_some() { Stdio::piped() } else { Stdio::null() })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(RunFailure::Spawn)?;

    let input = child.stdin.take();
    let collect = async move {
        if let (Some(bytes), Some(mut pipe)) = (stdin, input) {
            pipe.write_all(bytes).await?;
            pipe.shutdown().await?;
        }
        child.wait_with_output().await
    };

    match tokio::time::timeout(timeout, collect).await {
        Ok(output) => output.map_err(RunFailure::Spawn),
        Err(_) => Err(RunFailure::TimedOut),
    }
}

fn render(args: &[String], placeholder: &str, value: &str) -> Vec<String> {
    args.iter().map(|arg| arg.replace(placeholder, value)).collect()
}

/// Used when no recognizer is configured; every voice message degrades to
/// the "didn't understand" reply.
#[derive(Clone, Copy, Debug, Default)]
pub struct UnavailableTranscriber;

#[async_trait]
impl SpeechTranscriber for UnavailableTranscriber {
    async fn transcribe(&self, _audio: &[u8]) -> Result<String, TranscriptionError> {
        Err(TranscriptionError::Unavailable)
    }
}

/// Used when no synthesizer is configured; voice turns are answered in text.
#[derive(Clone, Copy, Debug, Default)]
pub struct UnavailableSynthesizer;

#[async_trait]
impl SpeechSynthesizer for UnavailableSynthesizer {
    async fn synthesize(&self, _text: &str) -> Result<Vec<u8>, SynthesisError> {
        Err(SynthesisError::Unavailable)
    }
}

pub fn transcriber_from_config(config: &SpeechConfig) -> Box<dyn SpeechTranscriber> {
    match &config.command {
        Some(command) => Box::new(CommandTranscriber::new(
            command.clone(),
            config.args.clone(),
            Duration::from_secs(config.timeout_secs),
        )),
        None => Box::new(UnavailableTranscriber),
    }
}

pub fn synthesizer_from_config(config: &SpeechConfig) -> Box<dyn SpeechSynthesizer> {
    match &config.synthesis_command {
        Some(command) => Box::new(CommandSynthesizer::new(
            command.clone(),
            config.synthesis_args.clone(),
            Duration::from_secs(config.timeout_secs),
        )),
        None => Box::new(UnavailableSynthesizer),
    }
}
