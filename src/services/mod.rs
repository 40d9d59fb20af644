pub mod loader;
pub mod playback;
pub mod session;
pub mod speech;
