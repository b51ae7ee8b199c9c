//! Push payloads and the local notifications built from them.
//!
//! A push message carries a flat string map (`title`, `body`, `type`, `amount`,
//! `itemId`). The type picks the channel, the icon and the deep link of the
//! notification shown to the user. Unknown types fall back to the general channel.

mod notifier;

pub use notifier::{MemoryNotifier, Notifier, TracingNotifier};

use crate::entities::enums::NotificationType;
use crate::errors::Result;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Scheme of every deep link
pub const DEEP_LINK_SCHEME: &str = "fintrack";

/// Notification channel a notification is posted to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    /// Balance alerts
    Alerts,
    /// Savings goal progress
    Goals,
    /// Bill and subscription reminders
    Reminders,
    /// Budget overruns
    Budgets,
    /// Everything else
    General,
}

impl Channel {
    /// Stable channel id
    #[must_use]
    pub const fn id(self) -> &'static str {
        match self {
            Self::Alerts => "fintrack_alerts",
            Self::Goals => "fintrack_goals",
            Self::Reminders => "fintrack_reminders",
            Self::Budgets => "fintrack_budgets",
            Self::General => "fintrack_general",
        }
    }

    /// Channel for a notification type
    #[must_use]
    pub fn for_type(kind: &NotificationType) -> Self {
        match kind {
            NotificationType::LowBalance => Self::Alerts,
            NotificationType::GoalMilestone => Self::Goals,
            NotificationType::BillReminder | NotificationType::SubscriptionReminder => {
                Self::Reminders
            }
            NotificationType::BudgetAlert => Self::Budgets,
            NotificationType::General | NotificationType::Unknown(_) => Self::General,
        }
    }
}

/// Decoded push message
#[derive(Debug, Clone, PartialEq)]
pub struct PushPayload {
    /// Notification title
    pub title: String,
    /// Notification body
    pub body: String,
    /// What the notification is about
    pub kind: NotificationType,
    /// Amount mentioned in the message, if any
    pub amount: Option<f64>,
    /// Id of the goal, bill, subscription or budget it refers to
    pub item_id: Option<String>,
}

impl PushPayload {
    /// Creates a payload without amount or item
    #[must_use]
    pub fn new(kind: NotificationType, title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            kind,
            amount: None,
            item_id: None,
        }
    }

    /// Sets the amount
    #[must_use]
    pub fn with_amount(mut self, amount: f64) -> Self {
        self.amount = Some(amount);
        self
    }

    /// Sets the referenced item
    #[must_use]
    pub fn with_item(mut self, item_id: impl Into<String>) -> Self {
        self.item_id = Some(item_id.into());
        self
    }

    /// Decodes a push data map. Missing text fields become empty, a missing type
    /// becomes `GENERAL` and an unparsable amount is dropped.
    #[must_use]
    pub fn from_data(data: &HashMap<String, String>) -> Self {
        let text = |key: &str| data.get(key).cloned().unwrap_or_default();
        let amount = data.get("amount").and_then(|raw| match raw.trim().parse::<f64>() {
            Ok(value) if value.is_finite() => Some(value),
            _ => {
                warn!(amount = %raw, "Ignoring unparsable push amount");
                None
            }
        });

        Self {
            title: text("title"),
            body: text("body"),
            kind: data
                .get("type")
                .map_or(NotificationType::General, |t| NotificationType::from(t.as_str())),
            amount,
            item_id: data.get("itemId").filter(|id| !id.is_empty()).cloned(),
        }
    }

    /// Encodes the payload as a push data map
    #[must_use]
    pub fn to_data(&self) -> HashMap<String, String> {
        let mut data = HashMap::from([
            ("title".to_string(), self.title.clone()),
            ("body".to_string(), self.body.clone()),
            ("type".to_string(), self.kind.to_string()),
        ]);
        if let Some(amount) = self.amount {
            data.insert("amount".to_string(), format!("{amount:.2}"));
        }
        if let Some(item_id) = &self.item_id {
            data.insert("itemId".to_string(), item_id.clone());
        }
        data
    }
}

/// A notification ready to be shown
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalNotification {
    /// Channel it is posted to
    pub channel: Channel,
    /// Icon resource name
    pub icon: &'static str,
    /// Title
    pub title: String,
    /// Body
    pub body: String,
    /// Where tapping it leads
    pub deep_link: String,
}

fn icon_for(kind: &NotificationType) -> &'static str {
    match kind {
        NotificationType::LowBalance => "ic_wallet_alert",
        NotificationType::GoalMilestone => "ic_goal",
        NotificationType::BillReminder => "ic_bill",
        NotificationType::SubscriptionReminder => "ic_subscription",
        NotificationType::BudgetAlert => "ic_budget",
        NotificationType::General | NotificationType::Unknown(_) => "ic_notification",
    }
}

/// Deep link for a notification type and optional item.
#[must_use]
pub fn deep_link(kind: &NotificationType, item_id: Option<&str>) -> String {
    let screen = match kind {
        NotificationType::LowBalance => return format!("{DEEP_LINK_SCHEME}://transactions"),
        NotificationType::GoalMilestone => "goals",
        NotificationType::BillReminder => "bills",
        NotificationType::SubscriptionReminder => "subscriptions",
        NotificationType::BudgetAlert => "budgets",
        NotificationType::General | NotificationType::Unknown(_) => {
            return format!("{DEEP_LINK_SCHEME}://home");
        }
    };
    match item_id {
        Some(id) => format!("{DEEP_LINK_SCHEME}://{screen}/{id}"),
        None => format!("{DEEP_LINK_SCHEME}://{screen}"),
    }
}

impl LocalNotification {
    /// Builds the notification a payload should produce
    #[must_use]
    pub fn from_payload(payload: &PushPayload) -> Self {
        Self {
            channel: Channel::for_type(&payload.kind),
            icon: icon_for(&payload.kind),
            title: payload.title.clone(),
            body: payload.body.clone(),
            deep_link: deep_link(&payload.kind, payload.item_id.as_deref()),
        }
    }
}

/// Decodes an incoming push message and shows it through `notifier`.
pub async fn handle_push(
    notifier: &dyn Notifier,
    data: &HashMap<String, String>,
) -> Result<LocalNotification> {
    let payload = PushPayload::from_data(data);
    debug!(kind = %payload.kind, "Push message received");
    let notification = LocalNotification::from_payload(&payload);
    notifier.notify(&notification).await?;
    Ok(notification)
}
