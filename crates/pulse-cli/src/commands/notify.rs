//! Notify command: sends a test event to a running server.

use anyhow::Result;
use clap::{Args, Subcommand};
use serde_json::Value;

use pulse_core::notifier::EventNotifier;
use pulse_core::{Audience, Role, UserId};

#[derive(Args)]
pub struct NotifyArgs {
    /// Server base URL
    #[arg(long, env = "PULSE_SERVER_URL", default_value = "http://127.0.0.1:3040")]
    pub url: String,

    #[command(subcommand)]
    pub event: NotifyEvent,
}

#[derive(Subcommand)]
pub enum NotifyEvent {
    /// Announce to all users, or to specific roles
    Announcement {
        /// Target these roles (repeatable); targets everyone when omitted
        #[arg(long = "role")]
        roles: Vec<String>,

        /// Event payload as a JSON object
        #[arg(long)]
        payload: Option<String>,
    },
    /// Tell a user one of their requests changed status
    RequestStatus {
        #[arg(long)]
        user: String,

        #[arg(long)]
        request_id: String,

        #[arg(long)]
        status: String,
    },
    /// Post a chat message to a user
    Message {
        #[arg(long)]
        user: String,

        /// Event payload as a JSON object
        #[arg(long)]
        payload: Option<String>,
    },
}

pub async fn execute(args: NotifyArgs) -> Result<()> {
    let notifier = EventNotifier::with_url(&args.url);

    match args.event {
        NotifyEvent::Announcement { roles, payload } => {
            notifier
                .notify_announcement(announcement_audience(roles), parse_payload(payload)?)
                .await;
        }
        NotifyEvent::RequestStatus {
            user,
            request_id,
            status,
        } => {
            notifier
                .notify_request_status(UserId::new(user), &request_id, &status)
                .await;
        }
        NotifyEvent::Message { user, payload } => {
            notifier
                .notify_message(UserId::new(user), parse_payload(payload)?)
                .await;
        }
    }

    Ok(())
}

fn announcement_audience(roles: Vec<String>) -> Audience {
    if roles.is_empty() {
        Audience::All
    } else {
        Audience::Roles(roles.into_iter().map(Role::new).collect())
    }
}

fn parse_payload(raw: Option<String>) -> Result<Value> {
    Ok(match raw {
        Some(raw) => serde_json::from_str(&raw)?,
        None => serde_json::json!({}),
    })
}
