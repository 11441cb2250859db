//! A batching telemetry shipper for Splunk collectors.
//!
//! Producers hand pre-rendered log lines (or structured HEC envelopes) and
//! raw metric observations to this library. Everything is buffered and
//! delivered in batches over HEC raw, HEC event, TCP, or UDP, with metric
//! observations first summarized into per-minute count/sum/min/max
//! statistics. A producer is never blocked on network io.
//!
//! Delivery is best-effort by design: there is no persistent queue and no
//! retry. A collector outage costs data, not latency.
//!
//! # Getting Started
//!
//! See [`shipper::Shipper`] for the assembled pipeline, or compose
//! [`pipeline::BatchBuffer`] and a [`downstream::Transport`] by hand.

pub mod config;
pub mod downstream;
pub mod errors;
pub mod formatter;
pub mod pipeline;
pub mod shipper;
pub mod types;
