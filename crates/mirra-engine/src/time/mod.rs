//! Time subsystem.
//!
//! Frame timing utilities, independent of the runtime:
//! - one `FrameClock` per window, ticked once per delivered frame
//! - `FpsCounter` turns ticks into periodic frame-rate reports

mod frame_clock;

pub use frame_clock::{FpsCounter, FpsReport, FrameClock, FrameTime};
