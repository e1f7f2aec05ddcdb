pub mod asset_cache;
pub mod compositor;
pub mod export;
pub mod interaction;
pub mod media;
pub mod playback;
pub mod surface;
#[cfg(feature = "ffmpeg")]
mod video_decode;
