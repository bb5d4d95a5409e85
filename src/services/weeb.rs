/// Client for the weeb.sh random image API
use reqwest::StatusCode;
use serde::Deserialize;
use std::fmt;

const RANDOM_IMAGE_URL: &str = "https://api.weeb.sh/images/random";

#[derive(Debug)]
pub enum WeebError {
    MissingKey,
    Request(reqwest::Error),
    Status(StatusCode),
}

impl fmt::Display for WeebError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WeebError::MissingKey => write!(f, "No weeb.sh API key configured"),
            WeebError::Request(e) => write!(f, "weeb.sh request failed: {}", e),
            WeebError::Status(status) => write!(f, "weeb.sh answered with {}", status),
        }
    }
}

impl std::error::Error for WeebError {}

impl From<reqwest::Error> for WeebError {
    fn from(e: reqwest::Error) -> Self {
        WeebError::Request(e)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WeebImage {
    pub id: String,
    pub url: String,
}

#[derive(Clone)]
pub struct WeebClient {
    http: reqwest::Client,
    api_key: Option<String>,
}

impl WeebClient {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
        }
    }

    /// Shared HTTP client, also used to fetch audio inputs
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Fetch a random SFW image of the given type (`hug`, `pat`, ...)
    pub async fn random_image(&self, image_type: &str) -> Result<WeebImage, WeebError> {
        let key = self.api_key.as_deref().ok_or(WeebError::MissingKey)?;

        let response = self
            .http
            .get(RANDOM_IMAGE_URL)
            .query(&[("type", image_type), ("nsfw", "false")])
            .header(reqwest::header::AUTHORIZATION, format!("Bearer {}", key))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(WeebError::Status(response.status()));
        }

        Ok(response.json::<WeebImage>().await?)
    }
}
