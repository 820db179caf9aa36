//! Notifier writing operator messages to the log

use log::{error, info};

use crate::ports::{Notification, NotificationLevel, Notifier};

/// Routes notifications to `log`: errors at error level, successes at info
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notification: Notification) {
        match notification.level {
            NotificationLevel::Error => error!(
                "[Notifier] {}: {}",
                notification.title, notification.description
            ),
            NotificationLevel::Success => info!(
                "[Notifier] {}: {}",
                notification.title, notification.description
            ),
        }
    }
}
