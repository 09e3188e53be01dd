//! LINE Rich Menus
//!
//! Menu definitions and the create → upload → link sequence run at startup.

use anyhow::{bail, Context, Result};
use std::path::Path;
use std::str::FromStr;
use tracing::info;

use crate::dispatch::{Role, CHOOSE_ROLE_LABEL};
use crate::line_api::LineApi;
use crate::types::{Action, Bounds, RichMenu, RichMenuArea, Size};

const MENU_WIDTH: u32 = 2500;
const MENU_HEIGHT: u32 = 1686;
const CELL: u32 = 833;

/// Roles on the top row of the postback layout, left to right.
const POSTBACK_TOP_ROW: [Role; 3] = [
    Role::GeneralSafetyManager,
    Role::SafetyOfficer,
    Role::HygieneManager,
];

/// Role spanning the bottom row of the postback layout.
const POSTBACK_BOTTOM_ROW: Role = Role::GeneralSafetyResponsible;

/// Which menu definition gets provisioned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RichMenuLayout {
    /// Six cells sending the texts "A" to "F".
    Message,
    /// Role cells sending postbacks.
    Postback,
}

impl FromStr for RichMenuLayout {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "message" => Ok(Self::Message),
            "postback" => Ok(Self::Postback),
            other => bail!("RICHMENU_LAYOUT must be \"message\" or \"postback\", got {other:?}"),
        }
    }
}

/// Who a rich menu is linked to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RichMenuTarget {
    AllUsers,
    User(String),
}

impl RichMenuTarget {
    /// Path segment in `/v2/bot/user/{segment}/richmenu/{id}`.
    pub fn path_segment(&self) -> &str {
        match self {
            RichMenuTarget::AllUsers => "all",
            RichMenuTarget::User(user_id) => user_id,
        }
    }
}

fn cell(column: u32, row: u32) -> Bounds {
    Bounds {
        x: column * CELL,
        y: row * CELL,
        width: CELL,
        height: CELL,
    }
}

fn postback(role: Role) -> Action {
    Action::Postback {
        label: Some(role.label().to_string()),
        data: role.label().to_string(),
        display_text: Some(role.label().to_string()),
    }
}

/// Build the menu definition for `layout`.
pub fn build_rich_menu(layout: RichMenuLayout) -> RichMenu {
    let areas = match layout {
        RichMenuLayout::Message => [CHOOSE_ROLE_LABEL, "B", "C", "D", "E", "F"]
            .iter()
            .enumerate()
            .map(|(i, text)| RichMenuArea {
                bounds: cell(i as u32 % 3, i as u32 / 3),
                action: Action::Message {
                    label: None,
                    text: text.to_string(),
                },
            })
            .collect(),
        RichMenuLayout::Postback => {
            let mut areas: Vec<RichMenuArea> = POSTBACK_TOP_ROW
                .iter()
                .enumerate()
                .map(|(i, role)| RichMenuArea {
                    bounds: cell(i as u32, 0),
                    action: postback(*role),
                })
                .collect();
            areas.push(RichMenuArea {
                bounds: Bounds {
                    x: 0,
                    y: CELL,
                    width: MENU_WIDTH,
                    height: CELL,
                },
                action: postback(POSTBACK_BOTTOM_ROW),
            });
            areas
        }
    };

    RichMenu {
        size: Size {
            width: MENU_WIDTH,
            height: MENU_HEIGHT,
        },
        selected: true,
        name: "richmenu1".to_string(),
        chat_bar_text: "メニューを開く".to_string(),
        areas,
    }
}

/// Content type LINE expects for the rich menu image.
pub fn image_content_type(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("png") => "image/png",
        _ => "image/jpeg",
    }
}

/// Create the menu, upload its image, and link it. Returns the menu id.
pub async fn provision<A: LineApi + ?Sized>(
    api: &A,
    layout: RichMenuLayout,
    image_path: &Path,
    target: &RichMenuTarget,
) -> Result<String> {
    let image = tokio::fs::read(image_path)
        .await
        .with_context(|| format!("failed to read rich menu image {}", image_path.display()))?;

    let menu = build_rich_menu(layout);
    let rich_menu_id = api.create_rich_menu(&menu).await?;
    info!("Rich menu created: {}", rich_menu_id);

    api.upload_rich_menu_image(&rich_menu_id, image_content_type(image_path), image)
        .await?;
    info!("Rich menu image uploaded: {}", image_path.display());

    api.link_rich_menu(target, &rich_menu_id).await?;
    info!(
        "Rich menu {} linked to {}",
        rich_menu_id,
        target.path_segment()
    );

    Ok(rich_menu_id)
}
