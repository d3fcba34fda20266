// Domain layer: bank records, account grouping and the ports the pipeline talks through.

pub mod model;
pub mod ports;
