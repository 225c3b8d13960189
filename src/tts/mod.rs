use std::{
    path::Path,
    process::Command,
};

use crate::core::CardError;

pub mod audio;

pub use audio::{
    content_address,
    media_filename,
    AudioAssetBuilder,
};

pub trait Synthesizer {
    /// Writes speech for `text` to `out`.
    fn synthesize(&self, text: &str, voice: &str, rate: &str, out: &Path) -> Result<(), CardError>;
}

/// Runs an edge-tts compatible command line.
pub struct EdgeTts {
    program: String,
}

impl EdgeTts {
    pub fn new(program: &str) -> Self {
        Self { program: program.to_string() }
    }

    fn command(&self, text: &str, voice: &str, rate: &str, out: &Path) -> Command {
        let mut command = Command::new(&self.program);
        command
            .arg("--voice")
            .arg(voice)
            .arg(format!("--rate={}", rate))
            .arg("--text")
            .arg(text)
            .arg("--write-media")
            .arg(out);
        command
    }
}

impl Synthesizer for EdgeTts {
    fn synthesize(&self, text: &str, voice: &str, rate: &str, out: &Path) -> Result<(), CardError> {
        log::debug!("Synthesizing {:?} with {} ({})", text, voice, rate);
        let output = self
            .command(text, voice, rate, out)
            .output()
            .map_err(|e| CardError::Synthesis(format!("failed to run {}: {}", self.program, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CardError::Synthesis(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_arguments() {
        let tts = EdgeTts::new("edge-tts");
        let command = tts.command("hello", "en-US-AvaNeural", "-10%", Path::new("/tmp/x.mp3"));
        let args: Vec<String> =
            command.get_args().map(|arg| arg.to_string_lossy().into_owned()).collect();
        assert_eq!(
            args,
            [
                "--voice",
                "en-US-AvaNeural",
                "--rate=-10%",
                "--text",
                "hello",
                "--write-media",
                "/tmp/x.mp3"
            ]
        );
    }

    #[test]
    fn test_missing_program_is_synthesis_error() {
        let tts = EdgeTts::new("anki-vocab-no-such-tts-binary");
        let err = tts.synthesize("hi", "v", "+0%", Path::new("/tmp/never.mp3")).unwrap_err();
        assert!(matches!(err, CardError::Synthesis(_)));
    }
}
