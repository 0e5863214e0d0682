pub mod error;
pub mod link;
pub mod media;
pub mod relay;
pub mod session;
pub mod stats;

pub use error::{MediaError, RelayError, SessionError};
pub use link::{LinkPhase, LinkRole};
pub use media::{LocalMedia, MediaSource, StaticMedia};
pub use relay::RelayConnection;
pub use session::{LinkInfo, Session, SessionConfig, SessionEvent};
pub use stats::{LinkQuality, QualitySnapshot};
