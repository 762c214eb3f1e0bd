pub mod models;
pub mod money;
pub mod routes;

pub use routes::Route;
