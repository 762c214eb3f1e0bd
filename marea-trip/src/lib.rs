pub mod models;

pub use models::{LiveRideTerms, NewTrip, PricingSnapshot, Trip, TripStatus};
