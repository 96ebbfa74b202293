use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::{Bid, Load};
use crate::error::Error;

/// Fulfilment record created from exactly one accepted bid.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub load_id: Uuid,
    pub bid_id: Uuid,
    pub driver_id: Uuid,
    pub cargo_owner_id: Uuid,
    pub agreed_price: i64,
    pub status: Status,
    /// Append-only; entries are never edited or removed.
    pub tracking_log: Vec<TrackingEntry>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Confirmed,
    PickedUp,
    InTransit,
    Delivered,
    Cancelled,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TrackingEntry {
    pub timestamp: DateTime<Utc>,
    pub status: Status,
    pub location: Option<String>,
    pub note: Option<String>,
    pub actor_id: Uuid,
}

/// Caller-supplied portion of a tracking entry.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TrackingMeta {
    pub location: Option<String>,
    pub note: Option<String>,
    pub actor_id: Uuid,
}

impl Status {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Confirmed => "confirmed",
            Self::PickedUp => "picked_up",
            Self::InTransit => "in_transit",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        }
    }

    /// The full transition table. Anything not listed is illegal.
    pub fn can_transition_to(&self, next: &Status) -> bool {
        matches!(
            (self, next),
            (Self::Confirmed, Self::PickedUp)
                | (Self::Confirmed, Self::Cancelled)
                | (Self::PickedUp, Self::InTransit)
                | (Self::PickedUp, Self::Cancelled)
                | (Self::InTransit, Self::Delivered)
                | (Self::InTransit, Self::Cancelled)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled)
    }
}

impl Booking {
    /// Created once, by bid acceptance, with the opening log entry.
    pub fn new(load: &Load, bid: &Bid, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            load_id: load.id,
            bid_id: bid.id,
            driver_id: bid.driver_id,
            cargo_owner_id: load.owner_id,
            agreed_price: bid.amount,
            status: Status::Confirmed,
            tracking_log: vec![TrackingEntry {
                timestamp: now,
                status: Status::Confirmed,
                location: None,
                note: Some("booking created".into()),
                actor_id: Uuid::nil(), // system actor
            }],
        }
    }

    /// Applies a status transition and appends the matching log entry.
    /// Timestamps are server-assigned and strictly increase within the log.
    #[tracing::instrument(skip(meta))]
    pub fn advance(
        &mut self,
        next: Status,
        meta: TrackingMeta,
        now: DateTime<Utc>,
    ) -> Result<(), Error> {
        if !self.status.can_transition_to(&next) {
            return Err(Error::StateTransition {
                entity: "booking",
                id: self.id,
                detail: format!(
                    "illegal transition {} -> {}",
                    self.status.name(),
                    next.name()
                ),
            });
        }

        let mut timestamp = now;
        if let Some(last) = self.tracking_log.last() {
            if timestamp <= last.timestamp {
                timestamp = last.timestamp + Duration::milliseconds(1);
            }
        }

        self.tracking_log.push(TrackingEntry {
            timestamp,
            status: next.clone(),
            location: meta.location,
            note: meta.note,
            actor_id: meta.actor_id,
        });
        self.status = next;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::entities::{CargoDetails, LoadAttrs, Proposal, Stop};

    use super::*;

    fn booking() -> Booking {
        let now = Utc::now();
        let owner_id = Uuid::new_v4();

        let load = Load::new(
            owner_id,
            LoadAttrs {
                pickup: Stop {
                    address: "Dock 3, Felixstowe".into(),
                    instructions: None,
                },
                delivery: Stop {
                    address: "Unit 9, Coventry".into(),
                    instructions: None,
                },
                cargo: CargoDetails {
                    weight_kg: 800.0,
                    description: "machine parts".into(),
                },
                bidding_deadline: now + Duration::hours(1),
            },
            now,
        )
        .unwrap();

        let bid = Bid::new(
            load.id,
            Uuid::new_v4(),
            4500,
            Proposal::default(),
            now + Duration::days(7),
            now,
        );

        Booking::new(&load, &bid, now)
    }

    fn meta(actor_id: Uuid) -> TrackingMeta {
        TrackingMeta {
            location: Some("M6 J2".into()),
            note: None,
            actor_id,
        }
    }

    #[test]
    fn new_booking_is_confirmed_with_opening_entry() {
        let booking = booking();

        assert_eq!(booking.status, Status::Confirmed);
        assert_eq!(booking.tracking_log.len(), 1);
        assert_eq!(booking.tracking_log[0].actor_id, Uuid::nil());
    }

    #[test]
    fn confirmed_cannot_jump_to_in_transit() {
        let mut booking = booking();
        let driver = booking.driver_id;

        assert!(matches!(
            booking.advance(Status::InTransit, meta(driver), Utc::now()),
            Err(Error::StateTransition {
                entity: "booking",
                ..
            })
        ));
        assert_eq!(booking.status, Status::Confirmed);
        assert_eq!(booking.tracking_log.len(), 1);
    }

    #[test]
    fn full_progression_reaches_delivered() {
        let mut booking = booking();
        let driver = booking.driver_id;
        let now = Utc::now();

        booking.advance(Status::PickedUp, meta(driver), now).unwrap();
        booking.advance(Status::InTransit, meta(driver), now).unwrap();
        booking.advance(Status::Delivered, meta(driver), now).unwrap();

        assert_eq!(booking.status, Status::Delivered);
        assert!(booking.status.is_terminal());
        assert_eq!(booking.tracking_log.len(), 4);
    }

    #[test]
    fn terminal_booking_accepts_no_transition() {
        let mut booking = booking();
        let driver = booking.driver_id;

        booking
            .advance(Status::Cancelled, meta(driver), Utc::now())
            .unwrap();

        for next in [Status::PickedUp, Status::InTransit, Status::Delivered] {
            assert!(booking.advance(next, meta(driver), Utc::now()).is_err());
        }
    }

    #[test]
    fn log_timestamps_strictly_increase() {
        let mut booking = booking();
        let driver = booking.driver_id;
        let now = Utc::now();

        // same wall-clock instant for every call
        booking.advance(Status::PickedUp, meta(driver), now).unwrap();
        booking.advance(Status::InTransit, meta(driver), now).unwrap();
        booking.advance(Status::Delivered, meta(driver), now).unwrap();

        let times: Vec<_> = booking.tracking_log.iter().map(|e| e.timestamp).collect();
        assert!(times.windows(2).all(|w| w[0] < w[1]));
    }
}
