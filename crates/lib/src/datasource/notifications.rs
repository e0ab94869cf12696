//! In-app notifications and notification pacing.

use std::sync::Arc;

use super::types::InAppNotification;
use super::{EncryptedTable, Record, user_filter, user_key, user_singleton};
use crate::{
    Clock, Result,
    backend::{Backend, RowQuery},
    constants::{IN_APP_NOTIFICATIONS_TABLE, NOTIFICATION_SEND_TIME_TABLE},
    crypto::SymmetricKeyProvider,
};

#[derive(Debug, Clone)]
pub struct LocalInAppNotificationDatasource {
    table: EncryptedTable,
}

impl LocalInAppNotificationDatasource {
    /// Open over `backend`, sealing with `keys`.
    pub fn new(backend: Backend, keys: Arc<dyn SymmetricKeyProvider>) -> Self {
        Self {
            table: EncryptedTable::new(IN_APP_NOTIFICATIONS_TABLE, backend, keys),
        }
    }

    /// Insert or replace notifications of `user_id`, keyed by notification id.
    pub async fn upsert_notifications(
        &self,
        user_id: &str,
        notifications: &[InAppNotification],
    ) -> Result<()> {
        self.table
            .upsert_many(notifications.iter().map(|notification| {
                Record::new(
                    user_key(user_id, [notification.id.as_str()]),
                    notification.priority,
                    notification,
                )
            }))
            .await
    }

    /// Notifications of `user_id`, highest priority first. Equal priorities
    /// keep the order they were first stored in.
    pub async fn get_all_notifications_by_priority(
        &self,
        user_id: &str,
    ) -> Result<Vec<InAppNotification>> {
        self.table
            .list(&RowQuery::new(user_filter(user_id)).descending())
            .await
    }

    pub async fn remove_notification(&self, user_id: &str, notification_id: &str) -> Result<()> {
        self.table
            .remove(&user_key(user_id, [notification_id]))
            .await?;
        Ok(())
    }

    pub async fn remove_all_notifications(&self, user_id: &str) -> Result<()> {
        self.table.remove_where(&user_filter(user_id)).await?;
        Ok(())
    }
}

/// When a notification was last shown to each user.
#[derive(Debug, Clone)]
pub struct LocalNotificationSendTimeDatasource {
    table: EncryptedTable,
    clock: Arc<dyn Clock>,
}

impl LocalNotificationSendTimeDatasource {
    /// Open over `backend`, sealing with `keys` and stamping times from `clock`.
    pub fn new(
        backend: Backend,
        keys: Arc<dyn SymmetricKeyProvider>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            table: EncryptedTable::new(NOTIFICATION_SEND_TIME_TABLE, backend, keys),
            clock,
        }
    }

    /// Last send time in milliseconds since the Unix epoch.
    pub async fn get_send_time(&self, user_id: &str) -> Result<Option<i64>> {
        self.table.get(&user_singleton(user_id)).await
    }

    pub async fn record_send_time(&self, user_id: &str, time: i64) -> Result<()> {
        self.table
            .upsert(Record::new(user_singleton(user_id), time, time))
            .await
    }

    /// Record the current time and return it.
    pub async fn record_now(&self, user_id: &str) -> Result<i64> {
        let now = self.clock.now_millis();
        self.record_send_time(user_id, now).await?;
        Ok(now)
    }

    pub async fn remove_send_time(&self, user_id: &str) -> Result<()> {
        self.table.remove(&user_singleton(user_id)).await?;
        Ok(())
    }
}
