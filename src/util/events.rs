//! Events are returned from various bits in the library which indicate some action must be taken
//! by the client.
//!
//! Because we don't have a built-in runtime, it's up to the client to call events at a time in the
//! future, as well as generate and broadcast funding transactions handle payment preimages and a
//! few other things.

use ln::msgs;

use bitcoin::secp256k1::key::PublicKey;

/// An event generated by a protocol handler which indicates a message should be sent to a peer.
///
/// These events are handled by the transport: it should drain the queue via
/// MessageSendEventsProvider::get_and_clear_pending_msg_events and ship each message to the
/// indicated peer over the authenticated link.
pub enum MessageSendEvent {
	/// Used to indicate that we've initiated a probabilistic push and the ProbInit should be sent
	/// to the peer with the given node id.
	SendProbInit {
		/// The node_id of the node which should receive this message
		node_id: PublicKey,
		/// The message which should be sent.
		msg: msgs::ProbInit,
	},
	/// Used to indicate that the responder's outcome commitments should be sent to the peer with
	/// the given node id.
	SendProbCommit {
		/// The node_id of the node which should receive this message
		node_id: PublicKey,
		/// The message which should be sent.
		msg: msgs::ProbCommit,
	},
	/// Used to indicate that the initiator's secret commitment and candidate-state signatures
	/// should be sent to the peer with the given node id.
	SendProbOffer {
		/// The node_id of the node which should receive this message
		node_id: PublicKey,
		/// The message which should be sent.
		msg: msgs::ProbOffer,
	},
	/// Used to indicate that the responder's guess, signature and revocation reveal should be
	/// sent to the peer with the given node id.
	SendProbChoice {
		/// The node_id of the node which should receive this message
		node_id: PublicKey,
		/// The message which should be sent.
		msg: msgs::ProbChoice,
	},
	/// Used to indicate that the initiator's outcome reveal should be sent to the peer with the
	/// given node id.
	SendProbReveal {
		/// The node_id of the node which should receive this message
		node_id: PublicKey,
		/// The message which should be sent.
		msg: msgs::ProbReveal,
	},
}

/// A trait indicating an object may generate message send events
pub trait MessageSendEventsProvider {
	/// Gets the list of pending events which were generated by previous actions, clearing the list
	/// in the process.
	fn get_and_clear_pending_msg_events(&self) -> Vec<MessageSendEvent>;
}
