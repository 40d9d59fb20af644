pub mod config;
pub mod events;
pub mod playback;
pub mod script;
pub mod state;
