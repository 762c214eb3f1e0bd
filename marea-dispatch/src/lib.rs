pub mod eligibility;
pub mod lifecycle;
pub mod models;
pub mod orchestrator;
pub mod repository;
pub mod selector;
pub mod sweeper;
pub mod testing;

pub use models::{
    offer_timeout, Candidate, LiveRideOffer, LiveRideOfferStatus, LiveRideRequest, LiveRideStatus,
    TimeWindow, MIN_LIVE_RIDE_HOURS, OFFER_TIMEOUT_MS,
};
pub use orchestrator::{CreateLiveRide, DispatchConfig, LiveRideDispatcher};
pub use repository::{AcceptOutcome, CandidateSource, CascadeOutcome, DispatchStore, NotificationStore};
