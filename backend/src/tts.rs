use crate::config::TtsConfig;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::json;
use shared::models::VoiceConfig;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SynthesisError {
    #[error("ElevenLabs API key not configured")]
    MissingCredentials,
    #[error("Character has no voice configured")]
    MissingVoice,
    #[error("A verse is already playing")]
    AlreadyPlaying,
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("ElevenLabs API error ({status}): {message}")]
    Provider { status: u16, message: String },
    #[error("Playback failed: {0}")]
    Playback(String),
}

#[async_trait]
pub trait VerseSynthesizer: Send + Sync {
    /// Returns `audio/mpeg` bytes.
    async fn synthesize(&self, text: &str, voice: &VoiceConfig) -> Result<Vec<u8>, SynthesisError>;
}

pub struct ElevenLabsSynthesizer {
    client: Client,
    config: TtsConfig,
}

impl ElevenLabsSynthesizer {
    pub fn new(config: TtsConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }
}

#[async_trait]
impl VerseSynthesizer for ElevenLabsSynthesizer {
    async fn synthesize(&self, text: &str, voice: &VoiceConfig) -> Result<Vec<u8>, SynthesisError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .filter(|key| !key.is_empty())
            .ok_or(SynthesisError::MissingCredentials)?;
        if voice.voice_id.is_empty() {
            return Err(SynthesisError::MissingVoice);
        }

        let url = format!(
            "{}/v1/text-to-speech/{}",
            self.config.api_base.trim_end_matches('/'),
            voice.voice_id
        );
        let body = json!({
            "text": text,
            "model_id": self.config.model_id,
            "voice_settings": {
                "stability": voice.settings.stability,
                "similarity_boost": voice.settings.similarity_boost,
                "style": voice.settings.style,
                "use_speaker_boost": voice.settings.use_speaker_boost
            }
        });

        let response = self
            .client
            .post(&url)
            .header("xi-api-key", api_key)
            .header("Accept", "audio/mpeg")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(SynthesisError::Provider {
                status: status.as_u16(),
                message: "Invalid API key".to_string(),
            });
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(SynthesisError::Provider {
                status: status.as_u16(),
                message,
            });
        }

        tracing::debug!("Synthesized {} chars with voice {}", text.len(), voice.voice_id);
        Ok(response.bytes().await?.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::VoiceSettings;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn voice() -> VoiceConfig {
        VoiceConfig {
            voice_id: "21m00Tcm4TlvDq8ikWAM".into(),
            settings: VoiceSettings {
                stability: 0.75,
                similarity_boost: 0.8,
                style: 0.4,
                use_speaker_boost: true,
            },
        }
    }

    fn synthesizer(server: &MockServer, api_key: Option<&str>) -> ElevenLabsSynthesizer {
        ElevenLabsSynthesizer::new(TtsConfig {
            api_key: api_key.map(String::from),
            api_base: server.uri(),
            ..TtsConfig::default()
        })
    }

    #[tokio::test]
    async fn posts_voice_settings_and_returns_audio() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/text-to-speech/21m00Tcm4TlvDq8ikWAM"))
            .and(header("xi-api-key", "el-key"))
            .and(header("accept", "audio/mpeg"))
            .and(body_partial_json(json!({
                "text": "bars",
                "model_id": "eleven_monolingual_v1",
                "voice_settings": { "use_speaker_boost": true }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0xFF, 0xFB, 0x90]))
            .expect(1)
            .mount(&server)
            .await;

        let audio = synthesizer(&server, Some("el-key"))
            .synthesize("bars", &voice())
            .await
            .unwrap();
        assert_eq!(audio, vec![0xFF, 0xFB, 0x90]);
    }

    #[tokio::test]
    async fn missing_key_fails_before_any_request() {
        let server = MockServer::start().await;
        let result = synthesizer(&server, None).synthesize("bars", &voice()).await;
        assert!(matches!(result, Err(SynthesisError::MissingCredentials)));
        assert!(server.received_requests().await.unwrap_or_default().is_empty());
    }

    #[tokio::test]
    async fn provider_errors_keep_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(422).set_body_string("bad voice"))
            .mount(&server)
            .await;

        let result = synthesizer(&server, Some("el-key"))
            .synthesize("bars", &voice())
            .await;
        match result {
            Err(SynthesisError::Provider { status, message }) => {
                assert_eq!(status, 422);
                assert_eq!(message, "bad voice");
            }
            other => panic!("unexpected result: {:?}", other.map(|a| a.len())),
        }
    }
}
