pub mod bids;
pub mod bookings;
pub mod loads;
