use anyhow::Result;
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::config::SpeechConfig;
use crate::models::Transcription;

const TTS_BASE_URL: &str = "https://texttospeech.googleapis.com/v1";
const STT_BASE_URL: &str = "https://speech.googleapis.com/v1";

/// Client for the external text-to-speech and speech-to-text services.
/// Failures propagate as-is; the core performs no retries on audio calls.
#[derive(Debug, Clone)]
pub struct SpeechClient {
    client: Client,
    api_key: String,
    voice: String,
    default_language: String,
    tts_base_url: String,
    stt_base_url: String,
}

#[derive(Debug, Serialize)]
struct SynthesizeBody<'a> {
    input: SynthesisInput<'a>,
    voice: VoiceSelection<'a>,
    #[serde(rename = "audioConfig")]
    audio_config: AudioConfig<'a>,
}

#[derive(Debug, Serialize)]
struct SynthesisInput<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct VoiceSelection<'a> {
    #[serde(rename = "languageCode")]
    language_code: &'a str,
    name: &'a str,
}

#[derive(Debug, Serialize)]
struct AudioConfig<'a> {
    #[serde(rename = "audioEncoding")]
    audio_encoding: &'a str,
}

#[derive(Debug, Deserialize)]
struct SynthesizeResponse {
    #[serde(rename = "audioContent")]
    audio_content: String,
}

#[derive(Debug, Serialize)]
struct RecognizeBody<'a> {
    config: RecognitionConfig<'a>,
    audio: RecognitionAudio,
}

#[derive(Debug, Serialize)]
struct RecognitionConfig<'a> {
    encoding: &'a str,
    #[serde(rename = "languageCode")]
    language_code: &'a str,
    #[serde(rename = "audioChannelCount")]
    audio_channel_count: i32,
    #[serde(rename = "enableAutomaticPunctuation")]
    enable_automatic_punctuation: bool,
}

#[derive(Debug, Serialize)]
struct RecognitionAudio {
    content: String,
}

#[derive(Debug, Deserialize)]
struct RecognizeResponse {
    #[serde(default)]
    results: Vec<RecognizeResult>,
}

#[derive(Debug, Deserialize)]
struct RecognizeResult {
    #[serde(default)]
    alternatives: Vec<RecognizeAlternative>,
}

#[derive(Debug, Deserialize)]
struct RecognizeAlternative {
    transcript: String,
    #[serde(default)]
    confidence: f32,
}

impl SpeechClient {
    pub fn new(config: &SpeechConfig) -> Self {
        Self {
            client: Client::new(),
            api_key: config.api_key.clone(),
            voice: config.voice.clone(),
            default_language: config.default_language.clone(),
            tts_base_url: TTS_BASE_URL.to_string(),
            stt_base_url: STT_BASE_URL.to_string(),
        }
    }

    pub fn default_language(&self) -> &str {
        &self.default_language
    }

    /// Synthesize speech for `text`, returning MP3 bytes.
    pub async fn synthesize(&self, text: &str, language_tag: &str) -> Result<Vec<u8>> {
        info!(
            text_length = text.len(),
            language = %language_tag,
            voice = %self.voice,
            "Synthesizing speech"
        );

        let body = SynthesizeBody {
            input: SynthesisInput { text },
            voice: VoiceSelection {
                language_code: language_tag,
                name: &self.voice,
            },
            audio_config: AudioConfig {
                audio_encoding: "MP3",
            },
        };

        let url = format!("{}/text:synthesize?key={}", self.tts_base_url, self.api_key);
        let response = self.client.post(&url).json(&body).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            error!(status = %status, error = %error_text, "TTS API request failed");
            return Err(anyhow::anyhow!("TTS request failed: {}", error_text));
        }

        let synthesized: SynthesizeResponse = response.json().await?;
        let audio = BASE64.decode(synthesized.audio_content.as_bytes())?;

        info!(audio_bytes = audio.len(), "Speech synthesized successfully");
        Ok(audio)
    }

    /// Transcribe audio bytes, returning alternatives with confidence
    /// scores. The result may be empty for silent or unrecognizable audio.
    pub async fn transcribe(
        &self,
        audio_bytes: &[u8],
        language_tag: &str,
    ) -> Result<Vec<Transcription>> {
        let encoding = detect_encoding(audio_bytes);
        info!(
            audio_bytes = audio_bytes.len(),
            encoding = encoding,
            language = %language_tag,
            "Transcribing speech"
        );

        let body = RecognizeBody {
            config: RecognitionConfig {
                encoding,
                language_code: language_tag,
                audio_channel_count: 1,
                enable_automatic_punctuation: true,
            },
            audio: RecognitionAudio {
                content: BASE64.encode(audio_bytes),
            },
        };

        let url = format!("{}/speech:recognize?key={}", self.stt_base_url, self.api_key);
        let response = self.client.post(&url).json(&body).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            error!(status = %status, error = %error_text, "STT API request failed");
            return Err(anyhow::anyhow!("Transcription request failed: {}", error_text));
        }

        let recognized: RecognizeResponse = response.json().await?;
        let transcriptions: Vec<Transcription> = recognized
            .results
            .into_iter()
            .flat_map(|result| result.alternatives)
            .map(|alternative| Transcription {
                transcript: alternative.transcript,
                confidence: alternative.confidence,
            })
            .collect();

        if transcriptions.is_empty() {
            warn!("No transcriptions found in the response");
        }
        debug!(
            transcription_count = transcriptions.len(),
            "Transcription completed"
        );
        Ok(transcriptions)
    }
}

/// Guess the recognition encoding from the container header bytes.
/// Unrecognized headers fall back to LINEAR16 (plain WAV payloads).
fn detect_encoding(audio: &[u8]) -> &'static str {
    if audio.len() >= 12 && audio.starts_with(b"RIFF") && &audio[8..12] == b"WAVE" {
        "LINEAR16"
    } else if audio.starts_with(&[0xFF, 0xFB]) || audio.starts_with(b"ID3") {
        "MP3"
    } else if audio.starts_with(&[0x1A, 0x45, 0xDF, 0xA3]) {
        "WEBM_OPUS"
    } else {
        "LINEAR16"
    }
}
