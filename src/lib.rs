//! dj2mp3 - turn DJ tracklists into downloaded audio files.

pub mod config;
pub mod flatten;
pub mod models;
pub mod normalize;
pub mod pipeline;
pub mod progress;
pub mod reconcile;
pub mod safety;
pub mod sanitize;
pub mod sldl;
pub mod sources;
pub mod tracklist_file;
pub mod youtube_dl;
