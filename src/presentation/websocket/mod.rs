//! WebSocket transport: frame reassembly, the connection handler, and the
//! session gateway.

pub mod assembler;
pub mod gateway;
pub mod handler;

pub use assembler::FrameAssembler;
pub use gateway::Gateway;
