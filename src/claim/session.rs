//! Wallet session boundary.
//!
//! Connection negotiation happens elsewhere; the claim flow only reads the
//! latest session state through [`WalletSession`].

use alloy::primitives::Address;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::blockchain::wallet::Wallet;

/// Latest observed wallet state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub connected: bool,
    pub address: Option<Address>,
}

impl SessionSnapshot {
    pub const fn disconnected() -> Self {
        Self {
            connected: false,
            address: None,
        }
    }

    pub const fn connected(address: Address) -> Self {
        Self {
            connected: true,
            address: Some(address),
        }
    }

    /// The address to sign with, if the session can sign at all.
    pub fn signing_address(&self) -> Option<Address> {
        if self.connected {
            self.address
        } else {
            None
        }
    }

    /// Shortened address for display, e.g. `0xf39F…2266`.
    pub fn display_address(&self) -> Option<String> {
        self.address.map(|address| {
            let full = address.to_checksum(None);
            format!("{}…{}", &full[..6], &full[full.len() - 4..])
        })
    }
}

/// Read-only view of a wallet session owned by someone else.
pub trait WalletSession: Send + Sync {
    fn snapshot(&self) -> SessionSnapshot;
}

/// Session backed by the service's own signing key; always connected.
#[derive(Debug, Clone)]
pub struct SignerSession {
    address: Address,
}

impl SignerSession {
    pub fn new(wallet: &Wallet) -> Self {
        Self {
            address: wallet.address(),
        }
    }
}

impl WalletSession for SignerSession {
    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot::connected(self.address)
    }
}

/// Session whose state is pushed by an external connector.
///
/// Only the latest value is kept.
#[derive(Debug, Clone)]
pub struct WatchedSession {
    rx: watch::Receiver<SessionSnapshot>,
}

impl WatchedSession {
    /// Create a session and the handle its owner uses to update it.
    pub fn channel(initial: SessionSnapshot) -> (watch::Sender<SessionSnapshot>, Self) {
        let (tx, rx) = watch::channel(initial);
        (tx, Self { rx })
    }

    /// A session that never connects.
    pub fn disconnected() -> Self {
        Self::channel(SessionSnapshot::disconnected()).1
    }
}

impl WalletSession for WatchedSession {
    fn snapshot(&self) -> SessionSnapshot {
        *self.rx.borrow()
    }
}
