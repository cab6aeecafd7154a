//! Bluetooth A2DP sink / AVRCP controller abstraction
//!
//! The controller firmware and host stack live outside this workspace; the
//! streaming core only sees the event stream and a handful of commands.
//! Protocol codes (passthrough keys, metadata attributes, notification ids)
//! are passed through as raw AVRCP values; typed wrappers live in the
//! `bluetooth` crate.

/// 6-byte Bluetooth device address.
pub type PeerAddress = [u8; 6];

/// A2DP signalling channel state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConnectionState {
    /// No signalling channel.
    Disconnected,
    /// Peer is connecting.
    Connecting,
    /// Signalling channel open.
    Connected,
    /// Peer is going away.
    Disconnecting,
}

/// Codec negotiated for the media channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MediaCodec {
    /// Low-complexity subband codec (mandatory A2DP codec).
    Sbc,
    /// Any other codec, by A2DP media codec type.
    Other(u8),
}

/// Event delivered by the A2DP/AVRCP stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkEvent<'a> {
    /// A2DP connection state change.
    Connection {
        /// New state.
        state: ConnectionState,
        /// Remote device.
        peer: PeerAddress,
    },
    /// Media channel configured.
    AudioConfig {
        /// Negotiated codec.
        codec: MediaCodec,
        /// First SBC codec-information byte (sampling frequency + channel mode).
        sbc_info: u8,
    },
    /// Decoded PCM (16-bit little-endian stereo).
    AudioData(&'a [u8]),
    /// AVRCP controller channel opened or closed.
    RemoteControl {
        /// `true` once the remote control channel is usable.
        connected: bool,
    },
    /// Response to a metadata request.
    Metadata {
        /// AVRCP media attribute id.
        attribute: u8,
        /// Attribute value, UTF-8 as sent by the peer.
        text: &'a [u8],
    },
    /// A registered notification fired: the peer changed track.
    TrackChanged,
}

/// A2DP sink with AVRCP controller role.
pub trait A2dpSink {
    /// Error type
    type Error: core::fmt::Debug;

    /// Make the device connectable and discoverable (or hide it).
    async fn set_discoverable(&mut self, discoverable: bool) -> Result<(), Self::Error>;

    /// Drop the A2DP connection to `peer`.
    async fn disconnect(&mut self, peer: PeerAddress) -> Result<(), Self::Error>;

    /// Wait for the next stack event.
    ///
    /// Must be cancel-safe: the sink task polls it under a timeout and
    /// drops the future when a command arrives, so an event may not be
    /// consumed until this future resolves.
    async fn next_event(&mut self) -> SinkEvent<'_>;

    /// Send an AVRCP passthrough key press or release.
    async fn send_passthrough(
        &mut self,
        label: u8,
        key: u8,
        released: bool,
    ) -> Result<(), Self::Error>;

    /// Ask the peer for the attributes set in `attribute_mask`.
    async fn request_metadata(&mut self, label: u8, attribute_mask: u8)
        -> Result<(), Self::Error>;

    /// Register for the AVRCP notification `event`.
    async fn register_notification(&mut self, label: u8, event: u8) -> Result<(), Self::Error>;
}
