//! Single-owner video transcoding job engine fronted by a chat messenger.
//!
//! This crate is the engine core: a FIFO job queue, an ffmpeg-driving
//! pipeline, layered settings, and a transport-agnostic command dispatcher.
//! The concrete chat platform is intentionally left outside it; see
//! [`transport::ChatTransport`].

pub mod app;
pub mod artifacts;
pub mod callback_registry;
pub mod command_builder;
pub mod config;
pub mod dispatch;
pub mod domain;
pub mod error;
pub mod guard;
pub mod pipeline;
pub mod progress;
pub mod queue;
pub mod settings;
pub mod transcode;
pub mod transport;
pub mod worker;
