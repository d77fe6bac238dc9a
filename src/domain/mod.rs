// Domain layer: records, identifiers and the ports to the external store, registry and scorer.

pub mod imex_id;
pub mod model;
pub mod ports;
