// Domain layer: probe models and ports. No driver types leak in here.

pub mod model;
pub mod ports;
