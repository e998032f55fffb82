//! The interface to the store which holds the authoritative per-channel round state.
//!
//! The store itself (typically an on-disk key-value database) is not this crate's concern; the
//! protocol only requires reload and save by the channel's stable index, with saves atomic with
//! respect to concurrent reloads.

use ln::channel::ChannelState;

/// An error from the channel-state store.
///
/// Either flavor quarantines the round it interrupts: the gate token is not returned and the
/// channel stays busy until an operator recovers it. The protocol cannot retry on its own
/// because each round consumes fresh randomness and a fresh elkrem secret.
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum ChannelStoreError {
	/// The store failed transiently (eg an I/O timeout). The persisted state is whatever the
	/// last successful save wrote.
	TemporaryFailure,
	/// The store failed permanently (eg corruption). The channel should be force-closed from
	/// the last known-good state.
	PermanentFailure,
}

/// The authoritative store of per-channel round state.
///
/// Implementations must make `persist_channel_state` atomic with respect to concurrent
/// `reload_channel_state` calls: a reload observes either the whole previous state or the whole
/// new one, never a partial write. The protocol serializes saves within a channel itself (at
/// most one round, and therefore one save, is in flight per channel).
pub trait ChannelStore : Send + Sync {
	/// Re-reads the authoritative state for the channel, which overwrites any in-memory copy.
	/// Called at the start of every protocol handler to defeat stale reads.
	fn reload_channel_state(&self, channel_idx: u32) -> Result<ChannelState, ChannelStoreError>;
	/// Atomically persists the full state record. Handlers never emit a message before the save
	/// covering its round returns success.
	fn persist_channel_state(&self, channel_idx: u32, state: &ChannelState) -> Result<(), ChannelStoreError>;
}
