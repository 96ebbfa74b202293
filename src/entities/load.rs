use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Error;

/// One end of a haul.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Stop {
    pub address: String,
    pub instructions: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CargoDetails {
    pub weight_kg: f64,
    pub description: String,
}

/// Attributes supplied by the cargo owner at posting time.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LoadAttrs {
    pub pickup: Stop,
    pub delivery: Stop,
    pub cargo: CargoDetails,
    pub bidding_deadline: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Load {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub pickup: Stop,
    pub delivery: Stop,
    pub cargo: CargoDetails,
    pub bidding_deadline: DateTime<Utc>,
    pub status: Status,
    /// Monotonic counter guarding every status write (compare-and-swap).
    pub version: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Available,
    Assigned,
    InTransit,
    Delivered,
    Cancelled,
}

impl Status {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::Assigned => "assigned",
            Self::InTransit => "in_transit",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        }
    }
}

impl Load {
    pub fn new(owner_id: Uuid, attrs: LoadAttrs, now: DateTime<Utc>) -> Result<Self, Error> {
        if attrs.cargo.weight_kg <= 0.0 {
            return Err(Error::Validation("cargo weight must be positive".into()));
        }

        if attrs.pickup.address.trim().is_empty() || attrs.delivery.address.trim().is_empty() {
            return Err(Error::Validation(
                "pickup and delivery addresses are required".into(),
            ));
        }

        if attrs.bidding_deadline <= now {
            return Err(Error::Validation(
                "bidding deadline must be in the future".into(),
            ));
        }

        Ok(Self {
            id: Uuid::new_v4(),
            owner_id,
            pickup: attrs.pickup,
            delivery: attrs.delivery,
            cargo: attrs.cargo,
            bidding_deadline: attrs.bidding_deadline,
            status: Status::Available,
            version: 0,
            created_at: now,
        })
    }

    /// Deadline expiry is passive: checked here at the point of use, never
    /// swept by a background task.
    pub fn is_biddable(&self, now: DateTime<Utc>) -> bool {
        self.status == Status::Available && now < self.bidding_deadline
    }

    #[tracing::instrument]
    pub fn assign(&mut self) -> Result<(), Error> {
        match self.status {
            Status::Available => {
                self.status = Status::Assigned;
                self.version += 1;
                Ok(())
            }
            _ => Err(self.transition_error("only an available load can be assigned")),
        }
    }

    /// Compensating transition after a booking cancellation. The booking may
    /// already have been picked up, so an in-transit load reopens too.
    #[tracing::instrument]
    pub fn reopen(&mut self) -> Result<(), Error> {
        match self.status {
            Status::Assigned | Status::InTransit => {
                self.status = Status::Available;
                self.version += 1;
                Ok(())
            }
            _ => Err(self.transition_error("load has no active assignment to release")),
        }
    }

    #[tracing::instrument]
    pub fn cancel(&mut self) -> Result<(), Error> {
        match self.status {
            Status::Available | Status::Assigned => {
                self.status = Status::Cancelled;
                self.version += 1;
                Ok(())
            }
            _ => Err(self.transition_error("load is past the point of cancellation")),
        }
    }

    #[tracing::instrument]
    pub fn mark_in_transit(&mut self) -> Result<(), Error> {
        match self.status {
            Status::Assigned => {
                self.status = Status::InTransit;
                self.version += 1;
                Ok(())
            }
            // idempotent while the booking progresses through pickup and transit
            Status::InTransit => Ok(()),
            _ => Err(self.transition_error("load is not under an active booking")),
        }
    }

    #[tracing::instrument]
    pub fn mark_delivered(&mut self) -> Result<(), Error> {
        match self.status {
            Status::Assigned | Status::InTransit => {
                self.status = Status::Delivered;
                self.version += 1;
                Ok(())
            }
            _ => Err(self.transition_error("load is not under an active booking")),
        }
    }

    fn transition_error(&self, detail: &str) -> Error {
        Error::StateTransition {
            entity: "load",
            id: self.id,
            detail: detail.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn attrs(deadline: DateTime<Utc>) -> LoadAttrs {
        LoadAttrs {
            pickup: Stop {
                address: "12 Wharf Rd, Hull".into(),
                instructions: None,
            },
            delivery: Stop {
                address: "4 Mill Ln, Leeds".into(),
                instructions: Some("rear entrance".into()),
            },
            cargo: CargoDetails {
                weight_kg: 1200.0,
                description: "palletised tiles".into(),
            },
            bidding_deadline: deadline,
        }
    }

    #[test]
    fn create_rejects_non_positive_weight() {
        let now = Utc::now();
        let mut a = attrs(now + Duration::hours(1));
        a.cargo.weight_kg = 0.0;

        assert!(matches!(
            Load::new(Uuid::new_v4(), a, now),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn create_rejects_past_deadline() {
        let now = Utc::now();

        assert!(matches!(
            Load::new(Uuid::new_v4(), attrs(now - Duration::minutes(1)), now),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn create_rejects_blank_addresses() {
        let now = Utc::now();
        let mut a = attrs(now + Duration::hours(1));
        a.pickup.address = "  ".into();

        assert!(matches!(
            Load::new(Uuid::new_v4(), a, now),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn new_load_is_available_at_version_zero() {
        let now = Utc::now();
        let load = Load::new(Uuid::new_v4(), attrs(now + Duration::hours(1)), now).unwrap();

        assert_eq!(load.status, Status::Available);
        assert_eq!(load.version, 0);
        assert!(load.is_biddable(now));
    }

    #[test]
    fn deadline_expiry_closes_bidding() {
        let now = Utc::now();
        let load = Load::new(Uuid::new_v4(), attrs(now + Duration::hours(1)), now).unwrap();

        assert!(!load.is_biddable(now + Duration::hours(2)));
    }

    #[test]
    fn every_transition_bumps_version() {
        let now = Utc::now();
        let mut load = Load::new(Uuid::new_v4(), attrs(now + Duration::hours(1)), now).unwrap();

        load.assign().unwrap();
        assert_eq!(load.version, 1);

        load.mark_in_transit().unwrap();
        load.mark_delivered().unwrap();
        assert_eq!(load.version, 3);
    }

    #[test]
    fn delivered_load_cannot_be_cancelled() {
        let now = Utc::now();
        let mut load = Load::new(Uuid::new_v4(), attrs(now + Duration::hours(1)), now).unwrap();

        load.assign().unwrap();
        load.mark_delivered().unwrap();

        assert!(matches!(
            load.cancel(),
            Err(Error::StateTransition { entity: "load", .. })
        ));
    }

    #[test]
    fn reopen_requires_an_active_assignment() {
        let now = Utc::now();
        let mut load = Load::new(Uuid::new_v4(), attrs(now + Duration::hours(1)), now).unwrap();

        assert!(load.reopen().is_err());

        load.assign().unwrap();
        load.reopen().unwrap();
        assert_eq!(load.status, Status::Available);
        assert_eq!(load.version, 2);
    }

    #[test]
    fn reopen_recovers_an_in_transit_load() {
        let now = Utc::now();
        let mut load = Load::new(Uuid::new_v4(), attrs(now + Duration::hours(1)), now).unwrap();

        load.assign().unwrap();
        load.mark_in_transit().unwrap();

        // the booking fell through mid-haul; the load must not be stranded
        load.reopen().unwrap();
        assert_eq!(load.status, Status::Available);
        assert!(load.is_biddable(now));
        assert_eq!(load.version, 3);
    }

    #[test]
    fn terminal_loads_cannot_reopen() {
        let now = Utc::now();
        let mut load = Load::new(Uuid::new_v4(), attrs(now + Duration::hours(1)), now).unwrap();

        load.assign().unwrap();
        load.mark_delivered().unwrap();
        assert!(load.reopen().is_err());

        let mut cancelled = Load::new(Uuid::new_v4(), attrs(now + Duration::hours(1)), now).unwrap();
        cancelled.cancel().unwrap();
        assert!(cancelled.reopen().is_err());
    }
}
