pub mod routes;
pub mod startup;
pub mod errors;

pub use routes::AppState;
pub use startup::{run, serve, shutdown_signal};
