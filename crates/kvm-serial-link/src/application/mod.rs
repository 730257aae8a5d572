//! Application layer: the command queue, its worker, and the link lifecycle.
//!
//! # What is the "application" layer? (for beginners)
//!
//! In Clean Architecture the *application* layer sits between the domain
//! (pure frame encoding in `kvm_serial_core`) and the infrastructure (serial
//! ports, OS hooks, config files).
//!
//! Code in this layer:
//!
//! - **Orchestrates** domain values to fulfil a user goal (e.g., "send this
//!   key press to the target, coalescing pointer motion on the way").
//! - **Depends on abstractions** ([`Transport`](crate::infrastructure::serial::Transport),
//!   [`InputSink`](forward_input::InputSink)) so the infrastructure can be
//!   swapped for mocks in tests.
//! - **Performs no direct OS calls**.
//!
//! # Sub-modules
//!
//! - **`link`**          – [`SerialLink`]: connect/disconnect/dispose and the
//!   public enqueue surface.  Owns everything below.
//! - **`queue`**         – The FIFO shared by producers and the worker, with
//!   motion coalescing at drain time.
//! - **`worker`**        – The single consumer that writes frames to the port.
//! - **`jiggle`**        – Anti-idle monitor that nudges the pointer after a
//!   randomized quiet period.
//! - **`stats`**         – Queue counters and their read-only snapshot.
//! - **`events`**        – Broadcast notifications (status, connection, sent, error).
//! - **`forward_input`** – Translates captured host input into link calls.

pub mod events;
pub mod forward_input;
pub mod jiggle;
pub mod link;
pub mod queue;
pub mod stats;
pub mod worker;

pub use events::{EventBus, LinkEvent};
pub use forward_input::{ForwardInputUseCase, InputSink, ViewArea};
pub use jiggle::JiggleConfig;
pub use link::{LinkError, LinkSettings, SerialLink};
pub use stats::QueueStats;
pub use worker::WorkerConfig;
