// Application layer: wires config and adapters into the core prober.

pub mod wait_for_db;
