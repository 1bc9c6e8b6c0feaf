// Domain layer: program syntax, report model and ports (interfaces).

pub mod ast;
pub mod model;
pub mod ports;
pub mod visit;
