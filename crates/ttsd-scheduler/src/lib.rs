//! The Session & Synthesis Scheduler: the cooperative event loop (C5) that
//! owns client state (C1), the per-client request and audio queues (C2,
//! C3), and the engine driver (C4).
//!
//! The error taxonomy lives entirely in `ttsd_core::error`; this crate has
//! no error type of its own.

#![deny(unsafe_code)]
#![deny(unused_crate_dependencies)]

pub mod client;
pub mod engine_driver;
pub mod queue;
pub mod scheduler;
pub mod testutil;

pub use client::{ClientRegistry, ClientSession, TransitionEvent};
pub use engine_driver::EngineDriver;
pub use queue::Fifo;
pub use scheduler::{Command, EngineBusy, Scheduler, SchedulerHandle};
