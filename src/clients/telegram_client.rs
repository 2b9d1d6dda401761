use serde::{Deserialize, Serialize};

const API_BASE: &str = "https://api.telegram.org";

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: &'a str,
    text: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct TelegramChat {
    pub id: i64,
}

#[derive(Debug, Deserialize)]
pub struct TelegramUser {
    pub id: i64,
}

#[derive(Debug, Deserialize)]
pub struct TelegramMessage {
    pub chat: TelegramChat,
    pub from: Option<TelegramUser>,
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TelegramUpdate {
    pub update_id: i64,
    pub message: Option<TelegramMessage>,
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

pub async fn send_message(
    token: &str,
    chat_id: &str,
    text: &str,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let client = reqwest::Client::new();
    let response = client
        .post(format!("{}/bot{}/sendMessage", API_BASE, token))
        .json(&SendMessageRequest { chat_id, text })
        .send()
        .await?;

    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(format!("sendMessage failed with status {}: {}", status, body).into());
    }
    Ok(())
}

/// Long-polls for updates after `offset`. Telegram holds the request open for
/// up to the timeout, so the caller's loop does not need its own sleep.
pub async fn get_updates(
    token: &str,
    offset: i64,
) -> Result<Vec<TelegramUpdate>, Box<dyn std::error::Error + Send + Sync>> {
    let client = reqwest::Client::new();
    let response = client
        .get(format!("{}/bot{}/getUpdates", API_BASE, token))
        .query(&[("offset", offset.to_string()), ("timeout", "30".to_string())])
        .send()
        .await?;

    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(format!("getUpdates failed with status {}: {}", status, body).into());
    }

    let parsed: ApiResponse<Vec<TelegramUpdate>> = serde_json::from_str(&body)
        .map_err(|e| format!("Failed to parse getUpdates JSON: {}\nRaw body: {}", e, body))?;
    if !parsed.ok {
        return Err(parsed
            .description
            .unwrap_or_else(|| "getUpdates returned ok=false".to_string())
            .into());
    }
    Ok(parsed.result.unwrap_or_default())
}
