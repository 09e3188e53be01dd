//! Bot configuration
//!
//! Loaded once from the environment at startup and shared read-only afterwards.

use anyhow::{bail, Context, Result};
use std::env;
use std::path::PathBuf;

use crate::richmenu::{RichMenuLayout, RichMenuTarget};

const DEFAULT_API_BASE_URL: &str = "https://api.line.me";
const DEFAULT_API_DATA_BASE_URL: &str = "https://api-data.line.me";

/// Bot configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Channel secret used as the HMAC key for `x-line-signature`
    pub channel_secret: String,

    /// Long-lived channel access token sent as a bearer token
    pub channel_access_token: String,

    /// Port the webhook server listens on (default: 3000)
    pub port: u16,

    /// Messaging API base URL
    pub api_base_url: String,

    /// Messaging API data base URL, used for rich menu image uploads
    pub api_data_base_url: String,

    /// Image uploaded for the rich menu (default: richmenu.jpg)
    pub richmenu_image_path: PathBuf,

    /// Which rich menu definition to provision
    pub richmenu_layout: RichMenuLayout,

    /// Who the rich menu is bound to
    pub richmenu_target: RichMenuTarget,

    /// Whether the rich menu is provisioned at startup
    pub richmenu_provision: bool,

    /// Whether users who follow the bot get the provisioned menu linked
    pub richmenu_link_on_follow: bool,
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| -> Result<String> {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .with_context(|| format!("{key} environment variable is required"))
        };

        let channel_secret = required("LINE_CHANNEL_SECRET")?;
        let channel_access_token = required("LINE_CHANNEL_ACCESS_TOKEN")?;

        let port = match lookup("PORT") {
            Some(port) => port
                .parse()
                .with_context(|| format!("PORT must be a valid port number, got {port:?}"))?,
            None => 3000,
        };

        let richmenu_layout = match lookup("RICHMENU_LAYOUT") {
            Some(layout) => layout.parse()?,
            None => RichMenuLayout::Message,
        };

        let richmenu_target = match lookup("RICHMENU_USER_ID").filter(|v| !v.is_empty()) {
            Some(user_id) => RichMenuTarget::User(user_id),
            None => RichMenuTarget::AllUsers,
        };

        let flag = |key: &str| -> Result<bool> {
            match lookup(key).as_deref() {
                None | Some("true") | Some("1") => Ok(true),
                Some("false") | Some("0") => Ok(false),
                Some(other) => bail!("{key} must be true or false, got {other:?}"),
            }
        };
        let optional = |key: &str, default: &str| -> String {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let richmenu_provision = flag("RICHMENU_PROVISION")?;
        let richmenu_link_on_follow = flag("RICHMENU_LINK_ON_FOLLOW")?;

        Ok(Self {
            channel_secret,
            channel_access_token,
            port,
            api_base_url: optional("LINE_API_BASE_URL", DEFAULT_API_BASE_URL),
            api_data_base_url: optional("LINE_API_DATA_BASE_URL", DEFAULT_API_DATA_BASE_URL),
            richmenu_image_path: PathBuf::from(optional("RICHMENU_IMAGE_PATH", "richmenu.jpg")),
            richmenu_layout,
            richmenu_target,
            richmenu_provision,
            richmenu_link_on_follow,
        })
    }

    /// Socket address the server binds to.
    pub fn bind_address(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }
}
