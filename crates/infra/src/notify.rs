//! Status-update notification collaborator.
//!
//! Best-effort by contract: a failed notification is logged and never blocks
//! or rolls back the status transition that triggered it.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

use wrenchflow_core::TenantId;
use wrenchflow_workorders::{WorkOrderId, WorkOrderStatus};

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("notification channel unavailable: {0}")]
    Unavailable(String),
}

/// Outbound customer/status notifications (email, SMS, portal push).
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    async fn send_status_update(
        &self,
        tenant_id: TenantId,
        work_order_id: WorkOrderId,
        new_status: WorkOrderStatus,
    ) -> Result<(), NotifyError>;
}

#[async_trait]
impl<N> NotificationDispatcher for Arc<N>
where
    N: NotificationDispatcher + ?Sized,
{
    async fn send_status_update(
        &self,
        tenant_id: TenantId,
        work_order_id: WorkOrderId,
        new_status: WorkOrderStatus,
    ) -> Result<(), NotifyError> {
        (**self)
            .send_status_update(tenant_id, work_order_id, new_status)
            .await
    }
}

/// Log-only dispatcher: the default when no delivery channel is wired up.
#[derive(Debug, Default)]
pub struct TracingNotifier;

#[async_trait]
impl NotificationDispatcher for TracingNotifier {
    async fn send_status_update(
        &self,
        tenant_id: TenantId,
        work_order_id: WorkOrderId,
        new_status: WorkOrderStatus,
    ) -> Result<(), NotifyError> {
        info!(%tenant_id, %work_order_id, status = %new_status, "status update notification");
        Ok(())
    }
}

/// Captures every notification; for tests/dev.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(TenantId, WorkOrderId, WorkOrderStatus)>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<(TenantId, WorkOrderId, WorkOrderStatus)> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl NotificationDispatcher for RecordingNotifier {
    async fn send_status_update(
        &self,
        tenant_id: TenantId,
        work_order_id: WorkOrderId,
        new_status: WorkOrderStatus,
    ) -> Result<(), NotifyError> {
        if let Ok(mut sent) = self.sent.lock() {
            sent.push((tenant_id, work_order_id, new_status));
        }
        Ok(())
    }
}

/// Always fails; for exercising the best-effort contract in tests.
#[derive(Debug, Default)]
pub struct FailingNotifier;

#[async_trait]
impl NotificationDispatcher for FailingNotifier {
    async fn send_status_update(
        &self,
        _tenant_id: TenantId,
        _work_order_id: WorkOrderId,
        _new_status: WorkOrderStatus,
    ) -> Result<(), NotifyError> {
        Err(NotifyError::Unavailable("smtp relay down".to_string()))
    }
}
