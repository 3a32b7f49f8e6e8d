// Domain layer: entities, attribute bags and ports (interfaces) the engines are written against.

pub mod attributes;
pub mod model;
pub mod ports;
