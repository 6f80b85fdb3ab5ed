//! Stage: owns one scene from setup to teardown and animates it per frame.
//!
//! # Invariants
//! - Lifecycle moves Uninitialized -> Initializing -> Ready -> Running -> Disposed
//!   and never skips a state; dispose is reachable from every state.
//! - Setup commits everything at once; a failed or cancelled setup leaves nothing behind.
//! - `on_frame` is synchronous and depends only on its arguments and owned state.
//! - The frame driver supplies non-negative, clamped intervals and a monotonic elapsed time.

pub mod config;
pub mod controls;
pub mod diagnostics;
pub mod driver;
pub mod lifecycle;
pub mod progress;

pub use config::{ConfigError, HexColor, StageConfig};
pub use controls::OrbitControls;
pub use diagnostics::{Diagnostics, FpsCounter, NullDiagnostics};
pub use driver::{DriverConfig, DriverError, FrameDriver, FrameTime};
pub use lifecycle::{
    FrameError, InitFuture, InitializationError, LifecycleController, LifecycleState, SetupError,
    SetupStep, Spinner,
};
pub use progress::{LogProgress, ProgressReport, ProgressSink, RecordingProgress};
