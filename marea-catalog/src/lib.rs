pub mod captain;
pub mod pricing;

pub use captain::{CaptainDirectory, CaptainRef};
pub use pricing::{LiveRideQuote, COMMISSION_RATE};
