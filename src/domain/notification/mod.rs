//! Notification domain module

mod entity;

pub use entity::{
    NotificationLog, NotificationSettings, NotificationStatus, NotificationTemplate,
    NotificationType,
};
