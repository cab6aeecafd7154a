//! Bluetooth sink connection state tracker.

/// What the UI shows for the Bluetooth source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum LinkState {
    /// Source not selected; radio hidden.
    Disabled = 0,
    /// Waiting for a phone to connect.
    Discoverable = 1,
    /// A2DP peer connected.
    Connected = 2,
}

impl LinkState {
    /// Inverse of `as u8`; unknown values read as `Disabled`.
    pub const fn from_u8(raw: u8) -> Self {
        match raw {
            1 => Self::Discoverable,
            2 => Self::Connected,
            _ => Self::Disabled,
        }
    }
}

/// Tracks the sink session: enabled flag, the connected peer (if any) and
/// whether the AVRCP control channel is up.
pub struct BluetoothState {
    enabled: bool,
    peer_address: Option<[u8; 6]>,
    remote_control: bool,
}

impl BluetoothState {
    /// Create a new, disabled state.
    pub const fn new() -> Self {
        BluetoothState {
            enabled: false,
            peer_address: None,
            remote_control: false,
        }
    }

    /// The user selected the Bluetooth source.
    pub fn on_enabled(&mut self) {
        self.enabled = true;
    }

    /// The source was deselected; forgets the peer.
    pub fn on_disabled(&mut self) {
        self.enabled = false;
        self.peer_address = None;
        self.remote_control = false;
    }

    /// Record a successful A2DP connection from `address`.
    pub fn on_connected(&mut self, address: [u8; 6]) {
        self.peer_address = Some(address);
    }

    /// Record that the peer has disconnected.
    pub fn on_disconnected(&mut self) {
        self.peer_address = None;
        self.remote_control = false;
    }

    /// AVRCP controller channel opened or closed.
    pub fn on_remote_control(&mut self, connected: bool) {
        self.remote_control = connected;
    }

    /// Returns `true` if a peer is currently connected.
    #[must_use]
    pub fn connected(&self) -> bool {
        self.peer_address.is_some()
    }

    /// Returns `true` if remote-control commands can be sent.
    #[must_use]
    pub fn remote_control(&self) -> bool {
        self.remote_control
    }

    /// Returns the peer's 6-byte Bluetooth address, or `None` when disconnected.
    #[must_use]
    pub fn peer_address(&self) -> Option<[u8; 6]> {
        self.peer_address
    }

    /// Collapsed state for the UI.
    #[must_use]
    pub fn link(&self) -> LinkState {
        match (self.enabled, self.connected()) {
            (false, _) => LinkState::Disabled,
            (true, false) => LinkState::Discoverable,
            (true, true) => LinkState::Connected,
        }
    }
}

impl Default for BluetoothState {
    fn default() -> Self {
        Self::new()
    }
}
