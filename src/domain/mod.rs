// Domain layer: data model and the ports the engine talks to.

pub mod model;
pub mod ports;
