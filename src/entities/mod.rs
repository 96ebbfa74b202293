pub mod bid;
pub mod booking;
pub mod load;

pub use bid::{Bid, Proposal, RejectionReason};
pub use booking::{Booking, TrackingEntry, TrackingMeta};
pub use load::{CargoDetails, Load, LoadAttrs, Stop};
