pub use meshrtc_core::ParticipantId;

pub mod model {
    pub use meshrtc_core::*;
}

#[cfg(feature = "server")]
pub mod server {
    pub use meshrtc_server::*;
}

#[cfg(feature = "client")]
pub mod client {
    pub use meshrtc_client::*;
}
