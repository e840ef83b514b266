use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::employee::EmployeeId;
use crate::domain::vehicle::VehicleTypeId;
use crate::domain::workflow::{LevelsRequired, WorkflowId};
use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BookingId(pub String);

impl std::fmt::Display for BookingId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub address: String,
    pub lat: f64,
    pub lng: f64,
}

impl Location {
    pub fn check(&self, field: &str) -> Result<(), DomainError> {
        if !(-90.0..=90.0).contains(&self.lat) || !(-180.0..=180.0).contains(&self.lng) {
            return Err(DomainError::InvariantViolation(format!(
                "{field} coordinates ({}, {}) are out of range",
                self.lat, self.lng
            )));
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingPriority {
    Normal,
    High,
    Urgent,
    Critical,
}

impl BookingPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::High => "high",
            Self::Urgent => "urgent",
            Self::Critical => "critical",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "normal" => Some(Self::Normal),
            "high" => Some(Self::High),
            "urgent" => Some(Self::Urgent),
            "critical" => Some(Self::Critical),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    #[serde(rename = "level_1_approved")]
    Level1Approved,
    #[serde(rename = "level_2_approved")]
    Level2Approved,
    Rejected,
    Completed,
    Cancelled,
}

impl BookingStatus {
    pub const ALL: [BookingStatus; 6] = [
        Self::Pending,
        Self::Level1Approved,
        Self::Level2Approved,
        Self::Rejected,
        Self::Completed,
        Self::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Level1Approved => "level_1_approved",
            Self::Level2Approved => "level_2_approved",
            Self::Rejected => "rejected",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|status| status.as_str() == raw.trim().to_ascii_lowercase())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalPlan {
    pub workflow_id: WorkflowId,
    pub levels_required: LevelsRequired,
    pub level_1_approver_id: EmployeeId,
    pub level_2_approver_id: Option<EmployeeId>,
}

impl ApprovalPlan {
    pub fn approver_for_level(&self, level: u8) -> Option<&EmployeeId> {
        match level {
            1 => Some(&self.level_1_approver_id),
            2 => self.level_2_approver_id.as_ref(),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalDecision {
    Approved,
    Rejected,
}

impl ApprovalDecision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingApproval {
    pub booking_id: BookingId,
    pub level: u8,
    pub approver_id: EmployeeId,
    pub decision: ApprovalDecision,
    pub comments: Option<String>,
    pub decided_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    pub id: BookingId,
    pub employee_id: EmployeeId,
    pub region: String,
    pub department: String,
    pub unit: String,
    pub pickup: Location,
    pub dropoff: Location,
    pub pickup_time: DateTime<Utc>,
    pub dropoff_time: DateTime<Utc>,
    pub purpose: String,
    pub priority: BookingPriority,
    pub passenger_count: u32,
    pub vehicle_type_id: Option<VehicleTypeId>,
    pub status: BookingStatus,
    pub approval_plan: ApprovalPlan,
    pub approvals: Vec<BookingApproval>,
    pub estimated_duration_secs: Option<u64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    /// Checks the trip fields supplied by the submitter.
    pub fn check_trip(&self) -> Result<(), DomainError> {
        if self.purpose.trim().is_empty() {
            return Err(DomainError::InvariantViolation("purpose must not be blank".to_string()));
        }
        if self.dropoff_time <= self.pickup_time {
            return Err(DomainError::InvariantViolation(
                "dropoff_time must be after pickup_time".to_string(),
            ));
        }
        if self.passenger_count == 0 {
            return Err(DomainError::InvariantViolation(
                "passenger_count must be at least 1".to_string(),
            ));
        }
        self.pickup.check("pickup")?;
        self.dropoff.check("dropoff")?;
        Ok(())
    }

    pub fn is_fully_approved(&self) -> bool {
        match self.status {
            BookingStatus::Level2Approved => true,
            BookingStatus::Level1Approved => {
                self.approval_plan.levels_required == LevelsRequired::Level1Only
            }
            _ => false,
        }
    }

    pub fn can_transition_to(&self, next: BookingStatus) -> bool {
        let both_levels = self.approval_plan.levels_required == LevelsRequired::BothLevels;
        match (self.status, next) {
            (BookingStatus::Pending, BookingStatus::Level1Approved)
            | (BookingStatus::Pending, BookingStatus::Rejected)
            | (BookingStatus::Pending, BookingStatus::Cancelled)
            | (BookingStatus::Level1Approved, BookingStatus::Cancelled)
            | (BookingStatus::Level2Approved, BookingStatus::Completed) => true,
            (BookingStatus::Level1Approved, BookingStatus::Level2Approved)
            | (BookingStatus::Level1Approved, BookingStatus::Rejected) => both_levels,
            (BookingStatus::Level1Approved, BookingStatus::Completed) => !both_levels,
            _ => false,
        }
    }

    pub fn transition_to(
        &mut self,
        next: BookingStatus,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        if !self.can_transition_to(next) {
            return Err(DomainError::InvalidBookingTransition { from: self.status, to: next });
        }
        self.status = next;
        self.updated_at = now;
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::fixtures::booking;
    use super::{BookingStatus, Location};
    use crate::domain::workflow::LevelsRequired;
    use crate::errors::DomainError;

    #[test]
    fn single_level_booking_completes_after_level_one() {
        let mut booking = booking(LevelsRequired::Level1Only);
        booking.transition_to(BookingStatus::Level1Approved, Utc::now()).expect("approve");
        assert!(booking.is_fully_approved());
        assert!(!booking.can_transition_to(BookingStatus::Level2Approved));
        booking.transition_to(BookingStatus::Completed, Utc::now()).expect("complete");
    }

    #[test]
    fn two_level_booking_requires_level_two_before_completion() {
        let mut booking = booking(LevelsRequired::BothLevels);
        booking.transition_to(BookingStatus::Level1Approved, Utc::now()).expect("approve");
        assert!(!booking.is_fully_approved());

        let error = booking
            .transition_to(BookingStatus::Completed, Utc::now())
            .expect_err("level 2 still pending");
        assert_eq!(
            error,
            DomainError::InvalidBookingTransition {
                from: BookingStatus::Level1Approved,
                to: BookingStatus::Completed,
            }
        );

        booking.transition_to(BookingStatus::Level2Approved, Utc::now()).expect("approve l2");
        assert!(booking.is_fully_approved());
    }

    #[test]
    fn terminal_states_do_not_reopen() {
        let mut booking = booking(LevelsRequired::Level1Only);
        booking.transition_to(BookingStatus::Rejected, Utc::now()).expect("reject");
        assert!(!booking.can_transition_to(BookingStatus::Pending));
        assert!(!booking.can_transition_to(BookingStatus::Cancelled));
    }

    #[test]
    fn trip_checks_reject_reversed_times() {
        let mut booking = booking(LevelsRequired::Level1Only);
        booking.dropoff_time = booking.pickup_time - Duration::minutes(5);
        assert!(booking.check_trip().is_err());
    }

    #[test]
    fn trip_checks_reject_out_of_range_coordinates() {
        let mut booking = booking(LevelsRequired::Level1Only);
        booking.dropoff = Location { address: "Nowhere".to_string(), lat: 91.0, lng: 0.0 };
        let error = booking.check_trip().expect_err("bad latitude");
        assert!(matches!(error, DomainError::InvariantViolation(ref m) if m.contains("dropoff")));
    }

    #[test]
    fn status_wire_names_match_lifecycle_labels() {
        assert_eq!(BookingStatus::parse("level_1_approved"), Some(BookingStatus::Level1Approved));
        let json = serde_json::to_string(&BookingStatus::Level2Approved).expect("serialize");
        assert_eq!(json, "\"level_2_approved\"");
    }
}
