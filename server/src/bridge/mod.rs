//! Webhook Translation Engine
//!
//! Inbound (chat platform → transport) and outbound (transport → chat
//! platform) translation, the channel activation lifecycle, avatar mirroring
//! and account provisioning.

pub mod activation;
pub mod error;
pub mod inbound;
pub mod outbound;
pub mod profile;
pub mod provision;

pub use activation::ChannelActivationManager;
pub use error::{BridgeError, UpstreamError};
pub use inbound::{InboundOutcome, InboundTranslator};
pub use outbound::{OutboundReply, OutboundTranslator, TransportEvent};
pub use profile::{AvatarSettings, UserIdentityCache};
pub use provision::Provisioner;

/// `len` random bytes, hex encoded.
pub fn random_hex(len: usize) -> String {
    use rand::Rng;
    let mut bytes = vec![0u8; len];
    rand::thread_rng().fill(bytes.as_mut_slice());
    hex::encode(bytes)
}
