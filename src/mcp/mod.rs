pub mod server;
pub mod tools;
pub mod transport;

pub use server::{FlStudioMcp, ToolError};
pub use tools::{HostTool, MidiTool, Tool, ToolDescriptor};
#[cfg(unix)]
pub use transport::run_socket;
pub use transport::{handle_jsonrpc_line, run_stdio, serve};
