//! The session orchestrator: one instance per connected charge point.
//!
//! Owns OCPP CALL/CALLRESULT/CALLERROR framing and correlation for its
//! connection, dispatches inbound CALLs to per-action handlers, and
//! exposes outbound commands used by the HTTP control plane and the
//! operator console.

pub mod command_sender;
pub mod commands;
pub mod dispatcher;
pub mod handlers;
pub mod state;
pub mod watchdog;

use std::sync::Arc;

use tracing::{error, warn};

use crate::support::ocpp_frame::OcppFrame;

pub use state::{Orchestrator, Services};

/// Process one inbound WebSocket text frame: dispatch a CALL to its
/// handler and reply, or resolve/reject the waiter for a CALLRESULT /
/// CALLERROR. Malformed frames are logged and dropped — they never
/// panic the read loop.
pub async fn handle_inbound_text(orchestrator: &Arc<Orchestrator>, text: &str) {
    let frame = match OcppFrame::parse(text) {
        Ok(frame) => frame,
        Err(e) => {
            error!(cpid = %orchestrator.cpid, error = %e, "malformed OCPP frame, dropping");
            return;
        }
    };

    match frame {
        OcppFrame::Call {
            unique_id,
            action,
            payload,
        } => {
            let reply = match dispatcher::dispatch(orchestrator, &action, payload).await {
                Ok(result) => OcppFrame::CallResult {
                    unique_id,
                    payload: result,
                },
                Err((code, description)) => {
                    warn!(
                        cpid = %orchestrator.cpid,
                        action,
                        error_code = code.as_str(),
                        error_description = description.as_str(),
                        "inbound handler produced a CALLERROR"
                    );
                    OcppFrame::error_response(unique_id, code, description)
                }
            };
            orchestrator.send_frame(&reply);
        }
        OcppFrame::CallResult { unique_id, payload } => {
            orchestrator
                .services
                .command_sender
                .resolve(&orchestrator.cpid, &unique_id, payload);
        }
        OcppFrame::CallError {
            unique_id,
            error_code,
            error_description,
            ..
        } => {
            orchestrator.services.command_sender.reject(
                &orchestrator.cpid,
                &unique_id,
                &error_code,
                &error_description,
            );
        }
    }
}
