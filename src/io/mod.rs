//! Audio I/O
//!
//! The validated [`AudioBuffer`] type and PCM WAV reading/writing with hound.

pub mod audio_buffer;
pub mod wav;

pub use audio_buffer::{validate_samples, AudioBuffer};
pub use wav::{load_wav, load_wav_mono, save_wav, WavEncoding};
