pub mod api;
pub mod audio;
pub mod device;
pub mod error;
pub mod stt;
pub mod tts;
