use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Error;

/// Schedule and message a driver attaches to an offer.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Proposal {
    pub pickup_time: Option<DateTime<Utc>>,
    pub delivery_time: Option<DateTime<Utc>>,
    pub message: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Bid {
    pub id: Uuid,
    pub load_id: Uuid,
    pub driver_id: Uuid,
    /// Offered price in minor currency units.
    pub amount: i64,
    pub proposal: Proposal,
    pub status: Status,
    /// Checked at acceptance time, not at submission.
    pub valid_until: DateTime<Utc>,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "snake_case")]
pub enum Status {
    Pending,
    Accepted,
    Rejected { reason: RejectionReason },
    Withdrawn,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionReason {
    AnotherBidAccepted,
    LoadCancelled,
}

impl Status {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Rejected { .. } => "rejected",
            Self::Withdrawn => "withdrawn",
        }
    }
}

impl Bid {
    pub fn new(
        load_id: Uuid,
        driver_id: Uuid,
        amount: i64,
        proposal: Proposal,
        valid_until: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            load_id,
            driver_id,
            amount,
            proposal,
            status: Status::Pending,
            valid_until,
            submitted_at: now,
        }
    }

    #[tracing::instrument]
    pub fn accept(&mut self, now: DateTime<Utc>) -> Result<(), Error> {
        match self.status {
            Status::Pending if now < self.valid_until => {
                self.status = Status::Accepted;
                Ok(())
            }
            Status::Pending => Err(self.transition_error("bid validity window has expired")),
            _ => Err(self.transition_error("bid is no longer pending")),
        }
    }

    #[tracing::instrument]
    pub fn reject(&mut self, reason: RejectionReason) -> Result<(), Error> {
        match self.status {
            Status::Pending => {
                self.status = Status::Rejected { reason };
                Ok(())
            }
            _ => Err(self.transition_error("bid is no longer pending")),
        }
    }

    /// Returns whether the call changed anything. Withdrawing an already
    /// withdrawn bid is a no-op success so client retries stay safe.
    #[tracing::instrument]
    pub fn withdraw(&mut self) -> Result<bool, Error> {
        match self.status {
            Status::Pending => {
                self.status = Status::Withdrawn;
                Ok(true)
            }
            Status::Withdrawn => Ok(false),
            _ => Err(self.transition_error("bid has already been settled")),
        }
    }

    fn transition_error(&self, detail: &str) -> Error {
        Error::StateTransition {
            entity: "bid",
            id: self.id,
            detail: detail.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn pending_bid(now: DateTime<Utc>) -> Bid {
        Bid::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            5000,
            Proposal::default(),
            now + Duration::days(7),
            now,
        )
    }

    #[test]
    fn accept_within_validity_window() {
        let now = Utc::now();
        let mut bid = pending_bid(now);

        bid.accept(now).unwrap();
        assert_eq!(bid.status, Status::Accepted);
    }

    #[test]
    fn accept_after_expiry_fails() {
        let now = Utc::now();
        let mut bid = pending_bid(now);

        assert!(matches!(
            bid.accept(now + Duration::days(8)),
            Err(Error::StateTransition { entity: "bid", .. })
        ));
        assert_eq!(bid.status, Status::Pending);
    }

    #[test]
    fn withdraw_is_idempotent() {
        let now = Utc::now();
        let mut bid = pending_bid(now);

        assert!(bid.withdraw().unwrap());
        assert!(!bid.withdraw().unwrap());
        assert_eq!(bid.status, Status::Withdrawn);
    }

    #[test]
    fn settled_bid_cannot_be_withdrawn() {
        let now = Utc::now();
        let mut bid = pending_bid(now);

        bid.accept(now).unwrap();
        assert!(bid.withdraw().is_err());
    }

    #[test]
    fn rejection_records_reason() {
        let now = Utc::now();
        let mut bid = pending_bid(now);

        bid.reject(RejectionReason::AnotherBidAccepted).unwrap();
        assert_eq!(
            bid.status,
            Status::Rejected {
                reason: RejectionReason::AnotherBidAccepted
            }
        );

        assert!(bid.reject(RejectionReason::LoadCancelled).is_err());
    }
}
