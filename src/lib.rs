pub mod clock;
pub mod config;
pub mod error;
pub mod sequencer;
pub mod slots;
pub mod processing {
    pub mod decode;
    pub mod layout;
}
pub mod render {
    pub mod gpu;
    pub mod presenter;
    pub mod window;
}
pub mod tasks {
    pub mod scheduler;
}

pub use error::Error;
