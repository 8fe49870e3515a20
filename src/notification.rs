//! Notification System
//!
//! Toast messages and a short history for item operations (create, update,
//! delete, custom actions). Failures of these operations never take over the
//! view; they end up here.

use chrono::{DateTime, Local};
use std::collections::VecDeque;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Level of detail for notifications
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DetailLevel {
    /// Minimal: action + resource + status icon
    Minimal,
    /// Detailed: action + resource + duration
    #[default]
    Detailed,
    /// Verbose: all info including error details
    Verbose,
}

impl DetailLevel {
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "minimal" => Self::Minimal,
            "verbose" => Self::Verbose,
            _ => Self::Detailed,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Minimal => "minimal",
            Self::Detailed => "detailed",
            Self::Verbose => "verbose",
        }
    }
}

/// Kind of item operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationType {
    Create,
    Update,
    Delete,
    /// Custom action, by name
    Action(String),
}

impl OperationType {
    pub fn display_name(&self) -> &str {
        match self {
            Self::Create => "Create",
            Self::Update => "Update",
            Self::Delete => "Delete",
            Self::Action(name) => name,
        }
    }

    pub fn past_tense(&self) -> &str {
        match self {
            Self::Create => "Created",
            Self::Update => "Updated",
            Self::Delete => "Deleted",
            Self::Action(_) => "Completed",
        }
    }

    pub fn present_participle(&self) -> &str {
        match self {
            Self::Create => "Creating",
            Self::Update => "Updating",
            Self::Delete => "Deleting",
            Self::Action(_) => "Running",
        }
    }
}

/// Status of a notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationStatus {
    /// Request sent, no answer yet
    Pending,
    Success,
    /// Failed with a user-facing message
    Error(String),
}

impl NotificationStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::Error(_))
    }

    pub fn icon(&self) -> &'static str {
        match self {
            Self::Pending => "◯",
            Self::Success => "✓",
            Self::Error(_) => "✗",
        }
    }
}

/// A single notification
#[derive(Debug, Clone)]
pub struct Notification {
    pub id: Uuid,
    pub operation_type: OperationType,
    /// Resource (page) name
    pub resource_name: String,
    /// Short label of the affected item
    pub item_label: String,
    pub status: NotificationStatus,
    /// Wall-clock time shown in verbose toasts
    pub timestamp: DateTime<Local>,
    pub created_at: Instant,
    pub completed_at: Option<Instant>,
}

impl Notification {
    pub fn new(operation_type: OperationType, resource_name: String, item_label: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            operation_type,
            resource_name,
            item_label,
            status: NotificationStatus::Pending,
            timestamp: Local::now(),
            created_at: Instant::now(),
            completed_at: None,
        }
    }

    pub fn set_success(&mut self) {
        self.status = NotificationStatus::Success;
        self.completed_at = Some(Instant::now());
    }

    pub fn set_error(&mut self, error: String) {
        self.status = NotificationStatus::Error(error);
        self.completed_at = Some(Instant::now());
    }

    /// Duration of the operation (or elapsed time if still running)
    pub fn duration(&self) -> Duration {
        self.completed_at
            .unwrap_or_else(Instant::now)
            .duration_since(self.created_at)
    }

    pub fn duration_display(&self) -> String {
        let d = self.duration();
        if d.as_secs() < 1 {
            format!("{}ms", d.as_millis())
        } else if d.as_secs() < 60 {
            format!("{}s", d.as_secs())
        } else {
            format!("{}m{}s", d.as_secs() / 60, d.as_secs() % 60)
        }
    }

    /// Format notification for toast display (short form)
    pub fn toast_message(&self, detail_level: DetailLevel) -> String {
        let icon = self.status.icon();
        let verb = match &self.status {
            NotificationStatus::Pending => self.operation_type.present_participle(),
            NotificationStatus::Success => self.operation_type.past_tense(),
            NotificationStatus::Error(_) => "Failed",
        };

        match detail_level {
            DetailLevel::Minimal => format!("{} {} {}", icon, verb, self.item_label),
            DetailLevel::Detailed => {
                if let NotificationStatus::Error(ref err) = self.status {
                    format!("{} {} {}: {}", icon, verb, self.item_label, err)
                } else if self.status.is_terminal() {
                    format!("{} {} {} ({})", icon, verb, self.item_label, self.duration_display())
                } else {
                    format!("{} {} {}...", icon, verb, self.item_label)
                }
            },
            DetailLevel::Verbose => {
                let base = format!(
                    "{} {} {} {} [{}] {}",
                    icon,
                    verb,
                    self.operation_type.display_name(),
                    self.item_label,
                    self.resource_name,
                    self.timestamp.format("%H:%M:%S")
                );
                if let NotificationStatus::Error(ref err) = self.status {
                    format!("{} - {}", base, err)
                } else if self.status.is_terminal() {
                    format!("{} ({})", base, self.duration_display())
                } else {
                    format!("{}...", base)
                }
            },
        }
    }
}

/// Notification manager
pub struct NotificationManager {
    /// All notifications (recent first)
    pub notifications: VecDeque<Notification>,
    /// Maximum notifications to keep in history
    pub max_history: usize,
    /// Toast display duration
    pub toast_duration: Duration,
    pub detail_level: DetailLevel,
    last_toast_time: Option<Instant>,
}

impl Default for NotificationManager {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationManager {
    pub fn new() -> Self {
        Self {
            notifications: VecDeque::new(),
            max_history: 50,
            toast_duration: Duration::from_secs(5),
            detail_level: DetailLevel::Detailed,
            last_toast_time: None,
        }
    }

    /// Start tracking an operation
    pub fn create_notification(
        &mut self,
        operation_type: OperationType,
        resource_name: String,
        item_label: String,
    ) -> Uuid {
        let notification = Notification::new(operation_type, resource_name, item_label);
        let id = notification.id;
        self.notifications.push_front(notification);
        self.last_toast_time = Some(Instant::now());
        self.trim_history();
        id
    }

    pub fn mark_success(&mut self, id: Uuid) {
        if let Some(notif) = self.notifications.iter_mut().find(|n| n.id == id) {
            notif.set_success();
            self.last_toast_time = Some(Instant::now());
        }
    }

    pub fn mark_error(&mut self, id: Uuid, error: String) {
        if let Some(notif) = self.notifications.iter_mut().find(|n| n.id == id) {
            notif.set_error(error);
            self.last_toast_time = Some(Instant::now());
        }
    }

    /// Record a finished operation in one step
    pub fn record(
        &mut self,
        operation_type: OperationType,
        resource_name: &str,
        item_label: &str,
        result: Result<(), String>,
    ) -> Uuid {
        let id = self.create_notification(
            operation_type,
            resource_name.to_string(),
            item_label.to_string(),
        );
        match result {
            Ok(()) => self.mark_success(id),
            Err(e) => self.mark_error(id, e),
        }
        id
    }

    pub fn get(&self, id: Uuid) -> Option<&Notification> {
        self.notifications.iter().find(|n| n.id == id)
    }

    /// Most recent notification while the toast is still visible
    pub fn current_toast(&self) -> Option<&Notification> {
        let last_time = self.last_toast_time?;
        if last_time.elapsed() > self.toast_duration {
            return None;
        }
        self.notifications.front()
    }

    pub fn pending_count(&self) -> usize {
        self.notifications
            .iter()
            .filter(|n| n.status == NotificationStatus::Pending)
            .count()
    }

    pub fn clear(&mut self) {
        self.notifications.clear();
        self.last_toast_time = None;
    }

    fn trim_history(&mut self) {
        while self.notifications.len() > self.max_history {
            // Oldest completed first
            if let Some(pos) = self.notifications.iter().rposition(|n| n.status.is_terminal()) {
                self.notifications.remove(pos);
            } else {
                self.notifications.pop_back();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notification_lifecycle() {
        let mut manager = NotificationManager::new();

        let id = manager.create_notification(
            OperationType::Update,
            "Users".to_string(),
            "Leanne Graham".to_string(),
        );

        assert_eq!(manager.notifications.len(), 1);
        assert_eq!(manager.pending_count(), 1);

        manager.mark_success(id);
        assert!(matches!(manager.get(id).unwrap().status, NotificationStatus::Success));
        assert_eq!(manager.pending_count(), 0);
    }

    #[test]
    fn test_record_failure_shows_error_in_toast() {
        let mut manager = NotificationManager::new();
        manager.record(
            OperationType::Delete,
            "Users",
            "#3",
            Err("Resource not found.".to_string()),
        );

        let toast = manager.current_toast().unwrap();
        let msg = toast.toast_message(DetailLevel::Detailed);
        assert!(msg.contains("Failed"));
        assert!(msg.contains("Resource not found."));
    }

    #[test]
    fn test_toast_message_formats() {
        let mut notif = Notification::new(
            OperationType::Action("Reset website".to_string()),
            "Users".to_string(),
            "#1".to_string(),
        );

        let msg = notif.toast_message(DetailLevel::Minimal);
        assert!(msg.contains("Running"));

        notif.set_success();
        let msg = notif.toast_message(DetailLevel::Verbose);
        assert!(msg.contains("Completed Reset website #1 [Users]"));
        assert!(msg.contains("✓"));
    }

    #[test]
    fn test_history_is_trimmed() {
        let mut manager = NotificationManager::new();
        manager.max_history = 2;
        for i in 0..4 {
            manager.record(OperationType::Create, "Posts", &i.to_string(), Ok(()));
        }
        assert_eq!(manager.notifications.len(), 2);
        assert_eq!(manager.notifications[0].item_label, "3");
    }
}
