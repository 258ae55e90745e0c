//! Click capture and conversion relay
//!
//! Capture stores the ad click identifier from the landing request in a
//! cookie. Relay reads it back when a conversion page renders its marker and
//! sends a single event to the conversions API, then sets a short-lived
//! per-page cookie so reloads do not report the same conversion again.

pub mod capture;
pub mod client;
pub mod diagnostics;
pub mod event;
pub mod relay;

pub use capture::{capture, capture_click, CapturedClick, CLICK_COOKIE, CLICK_ID_PARAM};
pub use client::{ConversionSink, DeliveryReport, GraphApiClient, RelayError};
pub use diagnostics::DiagnosticLog;
pub use event::{ConversionEvent, ConversionPayload};
pub use relay::{suppression_key, Relay, RelayOutcome, SkipReason};
