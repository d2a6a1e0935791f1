//! Outer adapters that own a blocking or long-lived I/O loop: the OCPP
//! WebSocket acceptor and the operator console.

pub mod console;
pub mod ws_server;
