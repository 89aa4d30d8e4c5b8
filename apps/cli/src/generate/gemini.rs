//! Gemini generateContent with optional file attachments.
//!
//! Attachments go through the resumable upload endpoint and must reach the `ACTIVE`
//! state before they can be referenced from a prompt.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use super::{check_status, DeckGenerator, GenerateError, DECK_INSTRUCTIONS};

pub const DEFAULT_API_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-2.0-pro-exp-02-05";
pub const POLL_INTERVAL: Duration = Duration::from_secs(10);

const STATE_PROCESSING: &str = "PROCESSING";
const STATE_ACTIVE: &str = "ACTIVE";

/// A file known to the Gemini file service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GeminiFile {
    pub name: String,
    pub display_name: String,
    pub mime_type: String,
    pub uri: String,
    pub state: String,
}

impl GeminiFile {
    pub fn is_processing(&self) -> bool {
        self.state == STATE_PROCESSING
    }

    pub fn is_active(&self) -> bool {
        self.state == STATE_ACTIVE
    }
}

// === API Request/Response Types ===

#[derive(Debug, Serialize)]
struct UploadStart<'a> {
    file: UploadMetadata<'a>,
}

#[derive(Debug, Serialize)]
struct UploadMetadata<'a> {
    display_name: &'a str,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    file: GeminiFile,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    system_instruction: Content<'a>,
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
enum Part<'a> {
    Text(&'a str),
    FileData(FileData<'a>),
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FileData<'a> {
    mime_type: &'a str,
    file_uri: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_p: f32,
    top_k: u32,
    max_output_tokens: u32,
    response_mime_type: &'static str,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 1.0,
            top_p: 0.95,
            top_k: 64,
            max_output_tokens: 8192,
            response_mime_type: "text/plain",
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Default, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: CandidateContent,
}

#[derive(Debug, Default, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Default, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

impl GenerateResponse {
    /// Text parts of the first candidate, concatenated.
    fn text(self) -> Option<String> {
        let candidate = self.candidates.into_iter().next()?;
        let text: String = candidate
            .content
            .parts
            .into_iter()
            .filter_map(|part| part.text)
            .collect();
        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

/// Generator backed by the Gemini API.
pub struct GeminiGenerator {
    client: Client,
    api_url: String,
    api_key: String,
    model: String,
    system_message: String,
    poll_interval: Duration,
}

impl GeminiGenerator {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self, GenerateError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(300))
            .connect_timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            api_url: DEFAULT_API_URL.to_string(),
            api_key: api_key.into(),
            model: model.into(),
            system_message: DECK_INSTRUCTIONS.to_string(),
            poll_interval: POLL_INTERVAL,
        })
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_system_message(mut self, system_message: impl Into<String>) -> Self {
        self.system_message = system_message.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Upload a local file and return its remote descriptor.
    pub async fn upload_file(&self, path: &Path, mime_type: &str) -> Result<GeminiFile, GenerateError> {
        let bytes = tokio::fs::read(path).await?;
        let display_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let start_url = format!("{}/upload/v1beta/files?key={}", self.api_url, self.api_key);
        let resp = self
            .client
            .post(&start_url)
            .header("X-Goog-Upload-Protocol", "resumable")
            .header("X-Goog-Upload-Command", "start")
            .header("X-Goog-Upload-Header-Content-Length", bytes.len().to_string())
            .header("X-Goog-Upload-Header-Content-Type", mime_type)
            .json(&UploadStart {
                file: UploadMetadata {
                    display_name: &display_name,
                },
            })
            .send()
            .await?;
        let resp = check_status(resp).await?;

        let upload_url = resp
            .headers()
            .get("x-goog-upload-url")
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
            .ok_or(GenerateError::MissingUploadUrl)?;

        let resp = self
            .client
            .post(&upload_url)
            .header("X-Goog-Upload-Offset", "0")
            .header("X-Goog-Upload-Command", "upload, finalize")
            .body(bytes)
            .send()
            .await?;
        let uploaded: UploadResponse = check_status(resp).await?.json().await?;

        tracing::info!(
            "Uploaded file {} as {}",
            uploaded.file.display_name,
            uploaded.file.name
        );
        Ok(uploaded.file)
    }

    /// Fetch the current descriptor of a remote file, e.g. `files/abc123`.
    pub async fn get_file(&self, name: &str) -> Result<GeminiFile, GenerateError> {
        let url = format!("{}/v1beta/{}?key={}", self.api_url, name, self.api_key);
        let resp = self.client.get(&url).send().await?;
        Ok(check_status(resp).await?.json().await?)
    }

    /// Poll each file until it leaves `PROCESSING`. Any final state other than `ACTIVE`
    /// is an error.
    pub async fn wait_for_active(&self, files: &[GeminiFile]) -> Result<(), GenerateError> {
        for file in files {
            let mut current = self.get_file(&file.name).await?;
            while current.is_processing() {
                tracing::debug!("Waiting for {} to finish processing", current.name);
                tokio::time::sleep(self.poll_interval).await;
                current = self.get_file(&file.name).await?;
            }
            if !current.is_active() {
                return Err(GenerateError::FileProcessing {
                    name: current.name,
                    state: current.state,
                });
            }
        }
        Ok(())
    }

    /// Generate with the given files attached ahead of the message.
    pub async fn generate_with_files(
        &self,
        message: &str,
        files: &[GeminiFile],
    ) -> Result<String, GenerateError> {
        let mut parts: Vec<Part<'_>> = files
            .iter()
            .map(|file| {
                Part::FileData(FileData {
                    mime_type: &file.mime_type,
                    file_uri: &file.uri,
                })
            })
            .collect();
        parts.push(Part::Text(message));

        let request = GenerateRequest {
            system_instruction: Content {
                role: None,
                parts: vec![Part::Text(&self.system_message)],
            },
            contents: vec![Content {
                role: Some("user"),
                parts,
            }],
            generation_config: GenerationConfig::default(),
        };

        let url = format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.api_url, self.model, self.api_key
        );
        tracing::info!(
            "Requesting content from {} with {} attachment(s)",
            self.model,
            files.len()
        );
        let resp = self.client.post(&url).json(&request).send().await?;
        let response: GenerateResponse = check_status(resp).await?.json().await?;

        response.text().ok_or(GenerateError::EmptyResponse)
    }
}

#[async_trait]
impl DeckGenerator for GeminiGenerator {
    fn name(&self) -> &'static str {
        "gemini"
    }

    async fn generate(&self, message: &str) -> Result<String, GenerateError> {
        self.generate_with_files(message, &[]).await
    }
}
