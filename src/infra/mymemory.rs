use crate::app::ports::TranslationProviderPort;
use crate::error::{Result, ScraperError};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

const MYMEMORY_URL: &str = "https://api.mymemory.translated.net/get";
const AUTODETECT: &str = "Autodetect";

/// MyMemory translation memory API
#[derive(Clone)]
pub struct MyMemoryTranslator {
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct MyMemoryResponse {
    #[serde(rename = "responseData")]
    response_data: ResponseData,
    #[serde(rename = "responseStatus")]
    response_status: Value,
    #[serde(rename = "responseDetails", default)]
    response_details: Value,
}

#[derive(Debug, Deserialize)]
struct ResponseData {
    #[serde(rename = "translatedText")]
    translated_text: Option<String>,
}

impl MyMemoryTranslator {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl TranslationProviderPort for MyMemoryTranslator {
    fn provider_name(&self) -> &str {
        "mymemory"
    }

    async fn translate(
        &self,
        text: &str,
        source_language: Option<&str>,
        target_language: &str,
    ) -> Result<String> {
        let langpair = format!("{}|{}", source_language.unwrap_or(AUTODETECT), target_language);
        let body = self
            .client
            .get(MYMEMORY_URL)
            .query(&[("q", text), ("langpair", langpair.as_str())])
            .send()
            .await?
            .text()
            .await?;
        parse_response(&body)
    }
}

fn parse_response(body: &str) -> Result<String> {
    let response: MyMemoryResponse = serde_json::from_str(body)?;
    let status_ok = match &response.response_status {
        Value::Number(n) => n.as_u64() == Some(200),
        Value::String(s) => s == "200",
        _ => false,
    };
    if !status_ok {
        return Err(ScraperError::Translation(format!(
            "MyMemory status {}: {}",
            response.response_status, response.response_details
        )));
    }
    response
        .response_data
        .translated_text
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| ScraperError::Translation("MyMemory returned no text".into()))
}
