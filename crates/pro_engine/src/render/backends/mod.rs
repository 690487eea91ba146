//! Graphics backend implementations
//!
//! Only the headless device lives here; GPU backends plug in through
//! [`GraphicsDevice`](crate::render::api::GraphicsDevice).

pub mod headless;

pub use headless::{HeadlessDevice, DeviceCommand, DeviceFailures, BufferKind};
