//! Delivery mechanisms: the HTTP control plane (§6). The operator console
//! is a delivery mechanism too but its blocking stdin read puts it under
//! `infrastructure` alongside the WebSocket acceptor, per §5's "dedicated
//! preemptive worker" framing.

pub mod http;
