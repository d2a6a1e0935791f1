//! Operator console — a line-oriented REPL on stdin/stdout.
//!
//! `ls | map <cpid> | config <cpid> <key> <value> | start <cpid> <connector>
//! <idtag> | stop <cpid> <n> | avail <cpid> <connector> <state>` (§6). Stdin
//! reads are blocking, so the read loop runs on `tokio::task::spawn_blocking`
//! and submits each line back onto the scheduler through an `mpsc` channel —
//! the same shape the command layer uses to thread control-plane calls
//! through `CommandSender`, just for input instead of OCPP replies.

use std::io::{self, BufRead, Write};

use tokio::sync::mpsc;
use tracing::warn;

use crate::application::control::ControlPlane;
use crate::application::orchestrator::commands::ResetKind;
use crate::support::shutdown::ShutdownSignal;

/// Spawn the console's blocking reader and its async dispatch loop. Returns
/// once `shutdown` fires or stdin is closed.
pub async fn run(control: ControlPlane, shutdown: ShutdownSignal) {
    let (line_tx, mut line_rx) = mpsc::unbounded_channel::<String>();

    tokio::task::spawn_blocking(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            match line {
                Ok(line) => {
                    if line_tx.send(line).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    warn!(error = %e, "console stdin read failed");
                    break;
                }
            }
        }
    });

    print_prompt();
    loop {
        tokio::select! {
            line = line_rx.recv() => {
                match line {
                    Some(line) => {
                        dispatch(&control, line.trim()).await;
                        print_prompt();
                    }
                    None => break,
                }
            }
            _ = shutdown.notified().wait() => break,
        }
    }
}

fn print_prompt() {
    print!("ocpp> ");
    let _ = io::stdout().flush();
}

async fn dispatch(control: &ControlPlane, line: &str) {
    if line.is_empty() {
        return;
    }
    let words: Vec<&str> = line.split_whitespace().collect();

    let result = match words.as_slice() {
        ["ls"] => {
            cmd_ls(control);
            Ok(())
        }
        ["map", cpid] => {
            cmd_map(control, cpid);
            Ok(())
        }
        ["config", cpid, key, value] => control
            .change_configuration(cpid, key, value)
            .await
            .map(|status| println!("{status}")),
        ["start", cpid, connector, id_tag] => match connector.parse::<i64>() {
            Ok(connector_id) => control
                .start(cpid, connector_id, (*id_tag).to_string(), None, None)
                .await
                .map(|status| println!("{status}")),
            Err(_) => {
                println!("error: connector must be a number");
                return;
            }
        },
        ["stop", cpid, n] => match n.parse::<i64>() {
            Ok(n) => control.console_stop(cpid, n).await.map(|status| println!("{status}")),
            Err(_) => {
                println!("error: argument must be a number");
                return;
            }
        },
        ["avail", cpid, connector, state] => {
            let connector_id = match connector.parse::<i64>() {
                Ok(id) => id,
                Err(_) => {
                    println!("error: connector must be a number");
                    return;
                }
            };
            let available = match parse_availability(state) {
                Some(a) => a,
                None => {
                    println!("error: state must be one of available/unavailable/true/false");
                    return;
                }
            };
            control
                .change_availability(cpid, connector_id, available)
                .await
                .map(|status| println!("{status}"))
        }
        ["reset", cpid, kind] => {
            let kind = match kind.to_lowercase().as_str() {
                "hard" => ResetKind::Hard,
                "soft" => ResetKind::Soft,
                _ => {
                    println!("error: reset kind must be hard or soft");
                    return;
                }
            };
            control.reset(cpid, kind).await.map(|status| println!("{status}"))
        }
        ["help"] | ["?"] => {
            print_help();
            Ok(())
        }
        _ => {
            println!(
                "unrecognized command: {line}  (type 'help' for the command list)"
            );
            return;
        }
    };

    if let Err(e) = result {
        println!("error: {e}");
    }
}

fn parse_availability(word: &str) -> Option<bool> {
    match word.to_lowercase().as_str() {
        "available" | "true" | "operative" => Some(true),
        "unavailable" | "false" | "inoperative" => Some(false),
        _ => None,
    }
}

fn cmd_ls(control: &ControlPlane) {
    let mut ids = control.connected_ids();
    ids.sort();
    if ids.is_empty() {
        println!("(no charge points connected)");
        return;
    }
    for cpid in ids {
        println!("{cpid}");
    }
}

fn cmd_map(control: &ControlPlane, cpid: &str) {
    match control.station_map(cpid) {
        None => println!("{cpid}: not connected"),
        Some(entries) if entries.is_empty() => println!("{cpid}: no connectors seen yet"),
        Some(entries) => {
            for entry in entries {
                let status = entry
                    .status
                    .map(|s| format!("{s:?}"))
                    .unwrap_or_else(|| "Unknown".to_string());
                print!("  connector {:>2}  {:<12}", entry.connector_id, status);
                if let Some(active) = entry.active {
                    print!("  active tx={}", active.transaction_id);
                } else if let Some(pending) = entry.pending {
                    print!("  pending id_tag={:?}", pending.id_tag);
                }
                println!();
            }
        }
    }
}

fn print_help() {
    println!("commands:");
    println!("  ls");
    println!("  map <cpid>");
    println!("  config <cpid> <key> <value>");
    println!("  start <cpid> <connector> <idtag>");
    println!("  stop <cpid> <n>                  (connector id, then transaction id, then UnlockConnector)");
    println!("  avail <cpid> <connector> <available|unavailable>");
    println!("  reset <cpid> <hard|soft>");
}
