use thiserror::Error;

use crate::domain::booking::BookingStatus;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("invalid booking transition from {from:?} to {to:?}")]
    InvalidBookingTransition { from: BookingStatus, to: BookingStatus },
    #[error("domain invariant violation: {0}")]
    InvariantViolation(String),
}

#[cfg(test)]
mod tests {
    use crate::domain::booking::BookingStatus;
    use crate::errors::DomainError;

    #[test]
    fn invalid_transition_keeps_states_in_message() {
        let error = DomainError::InvalidBookingTransition {
            from: BookingStatus::Rejected,
            to: BookingStatus::Completed,
        };
        let message = error.to_string();
        assert!(message.contains("Rejected"));
        assert!(message.contains("Completed"));
    }
}
