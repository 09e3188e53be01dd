use futures::future::join_all;
use tracing::{error, info, warn};

use crate::line_api::LineApi;
use crate::richmenu::RichMenuTarget;
use crate::types::{InboundPayload, ReplyMessage, ReplyRequest, WebhookEvent};

/// Menu text that opens the role prompt.
pub const CHOOSE_ROLE_LABEL: &str = "A";

const CHOOSE_ROLE_PROMPT: &str = "役職を選択してください。";
const UNRECOGNIZED_REPLY: &str = "無効な選択肢です。";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// 総括安全衛生管理者
    GeneralSafetyManager,
    /// 統括安全衛生責任者
    GeneralSafetyResponsible,
    /// 安全責任者
    SafetyOfficer,
    /// 衛生管理者
    HygieneManager,
}

impl Role {
    pub const ALL: [Role; 4] = [
        Role::GeneralSafetyManager,
        Role::GeneralSafetyResponsible,
        Role::SafetyOfficer,
        Role::HygieneManager,
    ];

    /// Roles offered as chips after the menu "A" cell is tapped.
    pub const QUICK_REPLY: [Role; 3] = [
        Role::GeneralSafetyManager,
        Role::SafetyOfficer,
        Role::HygieneManager,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Role::GeneralSafetyManager => "総括安全衛生管理者",
            Role::GeneralSafetyResponsible => "統括安全衛生責任者",
            Role::SafetyOfficer => "安全責任者",
            Role::HygieneManager => "衛生管理者",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|role| role.label() == label)
    }

    fn reply_text(self) -> &'static str {
        match self {
            Role::GeneralSafetyManager => "総括用のテキストを表示しています",
            Role::GeneralSafetyResponsible => "統括安全衛生責任者用のテキストを表示しています",
            Role::SafetyOfficer => "安全責任者用のテキストを表示しています",
            Role::HygieneManager => "衛生管理者用のテキストを表示しています",
        }
    }
}

/// What the user picked, from message text or postback data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Choice {
    ChooseRole,
    Role(Role),
    Unrecognized,
}

impl Choice {
    /// Exact match, no trimming or case folding.
    pub fn parse(input: &str) -> Self {
        if input == CHOOSE_ROLE_LABEL {
            return Choice::ChooseRole;
        }
        Role::from_label(input).map_or(Choice::Unrecognized, Choice::Role)
    }

    pub fn reply(self) -> Vec<ReplyMessage> {
        match self {
            Choice::ChooseRole => vec![ReplyMessage::with_quick_replies(
                CHOOSE_ROLE_PROMPT,
                Role::QUICK_REPLY.iter().map(|role| role.label()),
            )],
            Choice::Role(role) => vec![ReplyMessage::text(role.reply_text())],
            Choice::Unrecognized => vec![ReplyMessage::text(UNRECOGNIZED_REPLY)],
        }
    }
}

/// Build the reply for one event, or `None` when the event gets no reply.
pub fn reply_for(event: &WebhookEvent) -> Option<ReplyRequest> {
    let reply_token = event.reply_token.as_deref().filter(|t| !t.trim().is_empty())?;
    let choice = match event.payload()? {
        InboundPayload::Text(text) => Choice::parse(&text),
        InboundPayload::Postback(data) => Choice::parse(&data),
    };

    Some(ReplyRequest {
        reply_token: reply_token.to_string(),
        messages: choice.reply(),
    })
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DispatchReport {
    pub replied: usize,
    pub failed: usize,
    pub skipped: usize,
}

/// Reply to every event of a batch. Replies go out concurrently; a failed
/// reply is logged and does not affect the others.
pub async fn dispatch_events<A: LineApi + ?Sized>(
    api: &A,
    events: &[WebhookEvent],
) -> DispatchReport {
    let mut report = DispatchReport::default();
    let mut requests = Vec::with_capacity(events.len());

    for event in events {
        match reply_for(event) {
            Some(request) => requests.push(request),
            None => {
                if event.payload().is_some() {
                    warn!("No reply token for {} event, skipping", event.event_type);
                }
                report.skipped += 1;
            }
        }
    }

    let results = join_all(requests.iter().map(|request| api.reply(request))).await;

    for (request, result) in requests.iter().zip(results) {
        match result {
            Ok(()) => {
                info!("Reply sent: {}", request.messages[0].text);
                report.replied += 1;
            }
            Err(e) => {
                error!("Failed to send reply: {:#}", e);
                report.failed += 1;
            }
        }
    }

    report
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LinkReport {
    pub linked: usize,
    pub failed: usize,
}

/// Link the rich menu to every user who followed the bot in this batch.
/// Links go out concurrently; a failed link is logged and does not affect
/// the others.
pub async fn link_menu_for_followers<A: LineApi + ?Sized>(
    api: &A,
    rich_menu_id: Option<&str>,
    events: &[WebhookEvent],
) -> LinkReport {
    let mut report = LinkReport::default();
    let followers: Vec<RichMenuTarget> = events
        .iter()
        .filter_map(WebhookEvent::follower_id)
        .map(|user_id| RichMenuTarget::User(user_id.to_string()))
        .collect();

    if followers.is_empty() {
        return report;
    }
    let Some(rich_menu_id) = rich_menu_id else {
        warn!(
            "No rich menu provisioned, not linking it for {} new followers",
            followers.len()
        );
        report.failed = followers.len();
        return report;
    };

    let results = join_all(
        followers
            .iter()
            .map(|target| api.link_rich_menu(target, rich_menu_id)),
    )
    .await;

    for (target, result) in followers.iter().zip(results) {
        match result {
            Ok(()) => {
                info!("Rich menu {} linked to {}", rich_menu_id, target.path_segment());
                report.linked += 1;
            }
            Err(e) => {
                error!("Failed to link rich menu to {}: {:#}", target.path_segment(), e);
                report.failed += 1;
            }
        }
    }

    report
}
