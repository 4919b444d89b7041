pub mod notifier;
pub mod reminder;

pub use notifier::NotificationSender;
pub use reminder::ReminderService;
