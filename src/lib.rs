//! MCP server that lets AI assistants drive FL Studio.
//!
//! MIDI tools talk to the DAW through a virtual MIDI port. The remaining
//! tools forward to FL Studio's scripting surface when one is supplied.

pub mod config;
pub mod host;
pub mod mcp;
pub mod midi;
