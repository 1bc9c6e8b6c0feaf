//! Control-flow graphs for while-programs.

pub mod builder;
pub mod graph;

pub use builder::{build_cfg, Granularity};
pub use graph::{BasicBlock, BlockId, ControlFlowGraph, Jump};
