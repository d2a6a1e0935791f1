//! OCPP 1.6J central system: charge-point session orchestration, VID
//! identity resolution and a prepaid wallet, fronted by an HTTP control
//! plane and an operator console.

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod interfaces;
pub mod support;
