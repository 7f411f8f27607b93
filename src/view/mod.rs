//! Camera and view synchronization.

mod camera;
mod sync;

pub use camera::OrbitCamera;
pub use sync::ViewSync;
