//! LINE Messaging API client
//!
//! The bot only needs four calls from the platform. They sit behind
//! [`LineApi`] so the dispatcher and router can run without a network.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use tracing::error;

use crate::config::Config;
use crate::richmenu::RichMenuTarget;
use crate::types::{ReplyRequest, RichMenu, RichMenuIdResponse};

#[async_trait]
pub trait LineApi: Send + Sync {
    /// Send the messages for one reply token.
    async fn reply(&self, request: &ReplyRequest) -> Result<()>;

    /// Register a rich menu definition and return its id.
    async fn create_rich_menu(&self, menu: &RichMenu) -> Result<String>;

    /// Attach the image shown for a rich menu.
    async fn upload_rich_menu_image(
        &self,
        rich_menu_id: &str,
        content_type: &str,
        image: Vec<u8>,
    ) -> Result<()>;

    /// Make the rich menu visible to `target`.
    async fn link_rich_menu(&self, target: &RichMenuTarget, rich_menu_id: &str) -> Result<()>;
}

pub struct LineClient {
    http: reqwest::Client,
    api_base_url: String,
    api_data_base_url: String,
    channel_access_token: String,
}

impl LineClient {
    pub fn new(config: &Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base_url: config.api_base_url.trim_end_matches('/').to_string(),
            api_data_base_url: config.api_data_base_url.trim_end_matches('/').to_string(),
            channel_access_token: config.channel_access_token.clone(),
        }
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.channel_access_token)
    }

    async fn check(response: reqwest::Response, what: &str) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let error_text = response.text().await.unwrap_or_default();
        Err(anyhow!("LINE API {what} error ({status}): {error_text}"))
    }
}

#[async_trait]
impl LineApi for LineClient {
    async fn reply(&self, request: &ReplyRequest) -> Result<()> {
        if request.reply_token.trim().is_empty() {
            return Err(anyhow!("Reply token cannot be empty"));
        }

        let response = self
            .http
            .post(format!("{}/v2/bot/message/reply", self.api_base_url))
            .header("Authorization", self.bearer())
            .json(request)
            .send()
            .await
            .context("failed to send reply request")?;

        match Self::check(response, "reply").await {
            Ok(_) => Ok(()),
            Err(e) => {
                if e.to_string().contains("Invalid reply token") {
                    error!("Reply token is invalid or expired: tokens are single-use and valid for about a minute");
                }
                Err(e)
            }
        }
    }

    async fn create_rich_menu(&self, menu: &RichMenu) -> Result<String> {
        let response = self
            .http
            .post(format!("{}/v2/bot/richmenu", self.api_base_url))
            .header("Authorization", self.bearer())
            .json(menu)
            .send()
            .await
            .context("failed to send rich menu request")?;

        let created: RichMenuIdResponse = Self::check(response, "rich menu")
            .await?
            .json()
            .await
            .context("rich menu response has no richMenuId")?;

        Ok(created.rich_menu_id)
    }

    async fn upload_rich_menu_image(
        &self,
        rich_menu_id: &str,
        content_type: &str,
        image: Vec<u8>,
    ) -> Result<()> {
        let response = self
            .http
            .post(format!(
                "{}/v2/bot/richmenu/{}/content",
                self.api_data_base_url, rich_menu_id
            ))
            .header("Authorization", self.bearer())
            .header("Content-Type", content_type)
            .body(image)
            .send()
            .await
            .context("failed to upload rich menu image")?;

        Self::check(response, "rich menu image").await?;
        Ok(())
    }

    async fn link_rich_menu(&self, target: &RichMenuTarget, rich_menu_id: &str) -> Result<()> {
        let response = self
            .http
            .post(format!(
                "{}/v2/bot/user/{}/richmenu/{}",
                self.api_base_url,
                target.path_segment(),
                rich_menu_id
            ))
            .header("Authorization", self.bearer())
            .send()
            .await
            .context("failed to link rich menu")?;

        Self::check(response, "rich menu link").await?;
        Ok(())
    }
}
