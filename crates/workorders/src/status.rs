//! Work order status workflow and priority.
//!
//! Status moves forward-only through the shop pipeline; priority is an
//! orthogonal attribute and never gates a status move.

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use wrenchflow_core::DomainError;

/// Work order status lifecycle.
///
/// `PickedUp` is terminal: the work order is archived and rejects every
/// further command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkOrderStatus {
    Pending,
    InProgress,
    QualityCheck,
    Completed,
    PickedUp,
}

impl WorkOrderStatus {
    /// Position in the forward-only pipeline.
    fn rank(self) -> u8 {
        match self {
            WorkOrderStatus::Pending => 0,
            WorkOrderStatus::InProgress => 1,
            WorkOrderStatus::QualityCheck => 2,
            WorkOrderStatus::Completed => 3,
            WorkOrderStatus::PickedUp => 4,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, WorkOrderStatus::PickedUp)
    }

    /// Regular (non-override) transition rule: strictly forward in the
    /// pipeline. Skipping stages is allowed; moving back or standing still
    /// is not.
    pub fn can_advance_to(self, next: WorkOrderStatus) -> bool {
        !self.is_terminal() && next.rank() > self.rank()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            WorkOrderStatus::Pending => "pending",
            WorkOrderStatus::InProgress => "in_progress",
            WorkOrderStatus::QualityCheck => "quality_check",
            WorkOrderStatus::Completed => "completed",
            WorkOrderStatus::PickedUp => "picked_up",
        }
    }
}

impl core::fmt::Display for WorkOrderStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkOrderStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(WorkOrderStatus::Pending),
            "in_progress" => Ok(WorkOrderStatus::InProgress),
            "quality_check" => Ok(WorkOrderStatus::QualityCheck),
            "completed" => Ok(WorkOrderStatus::Completed),
            "picked_up" => Ok(WorkOrderStatus::PickedUp),
            other => Err(DomainError::validation(format!(
                "unknown work order status: {other}"
            ))),
        }
    }
}

/// Work order priority. Orthogonal to status; independently settable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkOrderPriority {
    Low,
    #[default]
    Normal,
    High,
    Urgent,
}

impl WorkOrderPriority {
    pub fn as_str(self) -> &'static str {
        match self {
            WorkOrderPriority::Low => "low",
            WorkOrderPriority::Normal => "normal",
            WorkOrderPriority::High => "high",
            WorkOrderPriority::Urgent => "urgent",
        }
    }
}

impl core::fmt::Display for WorkOrderPriority {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkOrderPriority {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(WorkOrderPriority::Low),
            "normal" => Ok(WorkOrderPriority::Normal),
            "high" => Ok(WorkOrderPriority::High),
            "urgent" => Ok(WorkOrderPriority::Urgent),
            other => Err(DomainError::validation(format!(
                "unknown work order priority: {other}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_moves_are_allowed_including_skips() {
        use WorkOrderStatus::*;
        assert!(Pending.can_advance_to(InProgress));
        assert!(Pending.can_advance_to(Completed));
        assert!(InProgress.can_advance_to(QualityCheck));
        assert!(QualityCheck.can_advance_to(PickedUp));
    }

    #[test]
    fn backward_and_same_state_moves_are_rejected() {
        use WorkOrderStatus::*;
        assert!(!InProgress.can_advance_to(Pending));
        assert!(!Completed.can_advance_to(QualityCheck));
        assert!(!QualityCheck.can_advance_to(QualityCheck));
    }

    #[test]
    fn picked_up_is_terminal() {
        use WorkOrderStatus::*;
        assert!(PickedUp.is_terminal());
        assert!(!PickedUp.can_advance_to(Pending));
        assert!(!PickedUp.can_advance_to(Completed));
    }

    #[test]
    fn status_round_trips_through_strings() {
        for s in [
            WorkOrderStatus::Pending,
            WorkOrderStatus::InProgress,
            WorkOrderStatus::QualityCheck,
            WorkOrderStatus::Completed,
            WorkOrderStatus::PickedUp,
        ] {
            assert_eq!(s.as_str().parse::<WorkOrderStatus>().unwrap(), s);
        }
        assert!("on_hold".parse::<WorkOrderStatus>().is_err());
    }

    #[test]
    fn priority_defaults_to_normal() {
        assert_eq!(WorkOrderPriority::default(), WorkOrderPriority::Normal);
        assert_eq!("urgent".parse::<WorkOrderPriority>().unwrap(), WorkOrderPriority::Urgent);
    }
}
