use crate::tts::{SynthesisError, VerseSynthesizer};
use async_trait::async_trait;
use shared::models::{Character, Verse};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;

/// Where synthesized audio goes. `play` resolves once playback has finished.
#[async_trait]
pub trait AudioSink: Send + Sync {
    async fn play(&self, audio: Vec<u8>) -> Result<(), SynthesisError>;
}

/// Sink that just keeps the clip, for handing it to an HTTP response.
#[derive(Default)]
pub struct ClipSink {
    clip: Mutex<Option<Vec<u8>>>,
}

impl ClipSink {
    pub fn take(&self) -> Option<Vec<u8>> {
        self.clip.lock().ok().and_then(|mut clip| clip.take())
    }
}

#[async_trait]
impl AudioSink for ClipSink {
    async fn play(&self, audio: Vec<u8>) -> Result<(), SynthesisError> {
        let mut clip = self
            .clip
            .lock()
            .map_err(|e| SynthesisError::Playback(e.to_string()))?;
        *clip = Some(audio);
        Ok(())
    }
}

/// Sole owner of the "currently playing" flag. One verse plays at a time;
/// a second request while one is in flight is refused rather than queued.
pub struct Voicebox {
    synthesizer: Arc<dyn VerseSynthesizer>,
    playing: watch::Sender<bool>,
}

struct PlayingGuard<'a>(&'a watch::Sender<bool>);

impl Drop for PlayingGuard<'_> {
    fn drop(&mut self) {
        self.0.send_replace(false);
    }
}

impl Voicebox {
    pub fn new(synthesizer: Arc<dyn VerseSynthesizer>) -> Self {
        let (playing, _) = watch::channel(false);
        Self {
            synthesizer,
            playing,
        }
    }

    pub fn is_playing(&self) -> bool {
        *self.playing.borrow()
    }

    /// Observe the playing flag; the receiver sees `false` once a playback ends.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.playing.subscribe()
    }

    pub async fn play_verse(
        &self,
        verse: &Verse,
        character: &Character,
        sink: &dyn AudioSink,
    ) -> Result<(), SynthesisError> {
        if self.playing.send_replace(true) {
            return Err(SynthesisError::AlreadyPlaying);
        }
        let _guard = PlayingGuard(&self.playing);

        let audio = self
            .synthesizer
            .synthesize(&verse.verse, &character.voice_settings)
            .await?;
        tracing::debug!(
            "Playing verse by {} ({} bytes)",
            character.name,
            audio.len()
        );
        sink.play(audio).await
    }
}
