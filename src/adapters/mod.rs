// Adapters layer: concrete implementations of the domain ports.

pub mod postgres;
pub mod sleeper;

pub use postgres::PgConnectivityCheck;
pub use sleeper::TokioSleeper;
