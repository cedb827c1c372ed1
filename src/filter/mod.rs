//! Request-path filtering: per-stream capabilities, the mixer gate, and
//! filter construction.

mod factory;
mod gate;
mod stream;

pub use factory::{register_mixer, FilterFactory, FilterRegistry, MixerGateFactory, MIXER_FILTER};
pub use gate::{MixerGate, Phase};
pub use stream::{
    DataVerdict, DecodeFilter, HeadersVerdict, RequestFilter, StreamCallbacks, StreamLog,
    TrailersVerdict,
};
