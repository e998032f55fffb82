//! Error types live here.

use std::fmt;

/// Indicates an error on the client's part (usually some variant of attempting to use too-low or
/// too-high values)
pub enum APIError {
	/// Indicates the API was wholly misused (see err for more). Cases where these can be returned
	/// are documented, but generally indicates some precondition of a function was violated.
	APIMisuseError {
		/// A human-readable error message
		err: &'static str
	},
	/// The channel already has a push round in flight. The gate token was not touched; retry
	/// after the current round settles.
	ChannelBusy {
		/// A human-readable error message
		err: &'static str
	},
	/// One side of the channel would be left below the minimum balance by this push. Nothing was
	/// mutated and the gate token was returned.
	InsufficientBalance {
		/// A human-readable error message
		err: &'static str
	},
	/// The channel is unavailable - it is unknown, or a persistence or queue failure mid-round
	/// has quarantined it pending operator recovery.
	ChannelUnavailable {
		/// A human-readable error message
		err: &'static str
	},
}

impl fmt::Debug for APIError {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match *self {
			APIError::APIMisuseError { ref err } => f.write_str(err),
			APIError::ChannelBusy { ref err } => f.write_str(err),
			APIError::InsufficientBalance { ref err } => f.write_str(err),
			APIError::ChannelUnavailable { ref err } => f.write_str(err),
		}
	}
}
