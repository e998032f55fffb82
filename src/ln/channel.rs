//! The per-channel record which the push protocol mutates, its persisted round state, and the
//! one-slot gate which keeps rounds strictly sequential within a channel.

use bitcoin::secp256k1::key::PublicKey;
use bitcoin::secp256k1::{Secp256k1, Signature};
use bitcoin::secp256k1;

use chain::keysinterface::{ChannelKeys, ChannelPublicKeys, ElkremSender};
use chain::transaction::OutPoint;
use ln::chan_utils;
use ln::msgs::DecodeError;
use util::errors::APIError;
use util::ser::{Writeable, Writer, Readable};

use std::sync::Mutex;
use std::io::Read;

/// Channels have to have 10K sat in them on each side; can make variable later.
pub const MIN_BALANCE_SATOSHIS: u64 = 10_000;

/// An error enum representing a failure to process a channel operation.
#[derive(Debug)]
pub enum ChannelError {
	/// The operation was rejected before any state was mutated. The channel stays usable; if the
	/// rejection came from an inbound message the partner is expected to time out.
	Ignore(&'static str),
	/// The channel failed mid-round. The gate token is not returned, quarantining the channel
	/// until an operator intervenes.
	Close(&'static str),
}

/// The single-token rendezvous owned by each channel. The token's presence means "clear to
/// send"; holding it means a round is in progress.
///
/// The token is taken when a round starts (by the initiator's entry point, or by the responder
/// on seeing the opening message) and returned exactly once, by the terminal handler on each
/// side. Failure paths after mutation deliberately never return it.
pub struct ClearToSend {
	token: Mutex<bool>,
}

impl ClearToSend {
	pub(super) fn new() -> ClearToSend {
		ClearToSend {
			token: Mutex::new(true),
		}
	}

	/// Attempts a non-blocking take of the token, returning whether it was taken.
	pub fn try_take(&self) -> bool {
		let mut token = self.token.lock().unwrap();
		if *token {
			*token = false;
			true
		} else {
			false
		}
	}

	/// Returns the token. A round must hold it; releasing twice is a protocol bug.
	pub fn release(&self) {
		let mut token = self.token.lock().unwrap();
		debug_assert!(!*token);
		*token = true;
	}

	/// Whether the token is currently present (ie no round is in flight).
	pub fn is_clear(&self) -> bool {
		*self.token.lock().unwrap()
	}
}

/// Which message the channel expects next, if any. Each inbound message is legal in exactly one
/// phase; anything else is rejected without mutation.
#[derive(Clone, Copy, PartialEq, Debug)]
pub(super) enum RoundPhase {
	/// No round in flight
	Idle,
	/// We initiated and await the responder's outcome commitments
	AwaitingCommit,
	/// We are responding and await the initiator's offer
	AwaitingOffer,
	/// We initiated and await the responder's guess
	AwaitingChoice,
	/// We are responding and await the initiator's reveal
	AwaitingReveal,
}

/// The per-round channel state, persisted at the end of every handler's mutations and reloaded
/// at the start of the next to defeat stale reads.
#[derive(Clone, PartialEq)]
pub struct ChannelState {
	/// Monotonically increasing round counter; every successful round advances it by one
	pub state_idx: u64,
	/// Our share of the channel value, in satoshi
	pub my_amt: u64,
	/// The amount at stake this round, in satoshi (the protocol fixes this at one)
	pub prob_amt: u32,
	/// N, the number of candidate outcomes staked this round
	pub num_txs: u8,
	/// The initiator's hidden outcome index, only ever sent in the final reveal
	pub correct: u8,
	/// The responder's guess
	pub choice: u8,
	/// The initiator's preimage family, 20 + num_txs - 1 random bytes; the prefix of length
	/// 20 + correct hashes to `secret`
	pub secret_pre: Vec<u8>,
	/// HASH160 of the correct-outcome prefix of `secret_pre`; published in the offer
	pub secret: [u8; 20],
	/// The responder's per-outcome revocation preimages
	pub revoc_pre: Vec<[u8; 20]>,
	/// HASH160 of each entry of `revoc_pre`; sent in the commit message
	pub revoc: Vec<[u8; 20]>,
	/// The partner's current elkrem chain point
	pub elk_point: PublicKey,
	/// The partner's next elkrem chain point
	pub next_elk_point: PublicKey,
	/// The partner's next-next elkrem chain point
	pub n2_elk_point: PublicKey,
	/// The partner's signature on the post-state selected by `choice`
	pub their_sig: Option<Signature>,
}

impl Writeable for ChannelState {
	fn write<W: Writer>(&self, writer: &mut W) -> Result<(), ::std::io::Error> {
		self.state_idx.write(writer)?;
		self.my_amt.write(writer)?;
		self.prob_amt.write(writer)?;
		self.num_txs.write(writer)?;
		self.correct.write(writer)?;
		self.choice.write(writer)?;
		self.secret_pre.write(writer)?;
		self.secret.write(writer)?;
		self.revoc_pre.write(writer)?;
		self.revoc.write(writer)?;
		self.elk_point.write(writer)?;
		self.next_elk_point.write(writer)?;
		self.n2_elk_point.write(writer)?;
		self.their_sig.write(writer)?;
		Ok(())
	}
}

impl Readable for ChannelState {
	fn read<R: Read>(reader: &mut R) -> Result<Self, DecodeError> {
		Ok(ChannelState {
			state_idx: Readable::read(reader)?,
			my_amt: Readable::read(reader)?,
			prob_amt: Readable::read(reader)?,
			num_txs: Readable::read(reader)?,
			correct: Readable::read(reader)?,
			choice: Readable::read(reader)?,
			secret_pre: Readable::read(reader)?,
			secret: Readable::read(reader)?,
			revoc_pre: Readable::read(reader)?,
			revoc: Readable::read(reader)?,
			elk_point: Readable::read(reader)?,
			next_elk_point: Readable::read(reader)?,
			n2_elk_point: Readable::read(reader)?,
			their_sig: Readable::read(reader)?,
		})
	}
}

/// One end of a funded two-party channel, ready to run push rounds.
///
/// Construction happens at channel funding, which is not this crate's concern: the funding flow
/// hands us the partner identity and pubkeys, our signer, our elkrem sender and the partner's
/// first chain points.
pub struct Channel<ChanSigner: ChannelKeys, ES: ElkremSender> {
	pub(super) channel_idx: u32,
	pub(super) channel_value_satoshis: u64,
	pub(super) their_node_id: PublicKey,
	pub(super) funding_outpoint: OutPoint,
	pub(super) local_keys: ChanSigner,
	pub(super) their_pubkeys: ChannelPublicKeys,
	pub(super) elk_snd: ES,
	pub(super) clear_to_send: ClearToSend,
	pub(super) phase: RoundPhase,
	pub(super) state: ChannelState,
}

impl<ChanSigner: ChannelKeys, ES: ElkremSender> Channel<ChanSigner, ES> {
	/// Creates the record for a freshly funded channel.
	///
	/// `their_elk_points` are the partner's (current, next, next-next) chain points as exchanged
	/// during funding; `state_idx` is the state the funding flow left the channel at.
	pub fn new(channel_idx: u32, channel_value_satoshis: u64, my_amt: u64, their_node_id: PublicKey, funding_outpoint: OutPoint, local_keys: ChanSigner, their_pubkeys: ChannelPublicKeys, elk_snd: ES, state_idx: u64, their_elk_points: (PublicKey, PublicKey, PublicKey)) -> Result<Channel<ChanSigner, ES>, APIError> {
		if my_amt > channel_value_satoshis {
			return Err(APIError::APIMisuseError { err: "Our balance can't exceed the channel value" });
		}
		Ok(Channel {
			channel_idx,
			channel_value_satoshis,
			their_node_id,
			funding_outpoint,
			local_keys,
			their_pubkeys,
			elk_snd,
			clear_to_send: ClearToSend::new(),
			phase: RoundPhase::Idle,
			state: ChannelState {
				state_idx,
				my_amt,
				prob_amt: 0,
				num_txs: 0,
				correct: 0,
				choice: 0,
				secret_pre: Vec::new(),
				secret: [0; 20],
				revoc_pre: Vec::new(),
				revoc: Vec::new(),
				elk_point: their_elk_points.0,
				next_elk_point: their_elk_points.1,
				n2_elk_point: their_elk_points.2,
				their_sig: None,
			},
		})
	}

	/// Gets the channel's stable identifier, the persistence key.
	pub fn channel_idx(&self) -> u32 {
		self.channel_idx
	}

	/// Gets the total funded value of the channel, in satoshi.
	pub fn channel_value_satoshis(&self) -> u64 {
		self.channel_value_satoshis
	}

	/// Gets the node id of the channel partner, which routes outbound messages.
	pub fn their_node_id(&self) -> PublicKey {
		self.their_node_id
	}

	/// Gets the funding outpoint, which routes inbound messages.
	pub fn funding_outpoint(&self) -> OutPoint {
		self.funding_outpoint
	}

	/// Gets the channel's gate, exposed so callers can observe busyness without starting a push.
	pub fn clear_to_send(&self) -> &ClearToSend {
		&self.clear_to_send
	}

	/// Validates a revealed partner elkrem secret and rotates their chain points.
	///
	/// At reveal time the committed next point has been pre-rotated into the current slot, so
	/// that is what the secret must derive; a mismatch means the partner is lying about its
	/// chain and the round cannot safely continue.
	pub(super) fn advance_elkrem<T: secp256k1::Signing>(&mut self, secp_ctx: &Secp256k1<T>, elk: &[u8; 32], n2_elk_point: PublicKey) -> Result<(), ChannelError> {
		let point = match chan_utils::elk_point_from_secret(secp_ctx, elk) {
			Ok(point) => point,
			Err(_) => return Err(ChannelError::Close("Peer elkrem secret is not a valid scalar")),
		};
		if point != self.state.elk_point {
			return Err(ChannelError::Close("Peer elkrem secret does not chain to its committed point"));
		}
		self.state.elk_point = self.state.next_elk_point;
		self.state.next_elk_point = self.state.n2_elk_point;
		self.state.n2_elk_point = n2_elk_point;
		Ok(())
	}

	/// The elkrem secret revoking our previous state, sent with our terminal message of a round.
	pub(super) fn elkrem_for_previous_state(&self) -> Result<[u8; 32], ChannelError> {
		match self.elk_snd.at_index(self.state.state_idx - 1) {
			Ok(elk) => Ok(elk),
			Err(_) => Err(ChannelError::Close("Elkrem sender could not derive the revocation secret")),
		}
	}

	/// Derives the next-next chain point we commit to for the partner.
	pub(super) fn n2_elk_point_for_them<T: secp256k1::Signing>(&self, secp_ctx: &Secp256k1<T>) -> Result<PublicKey, ChannelError> {
		let secret = match self.elk_snd.at_index(self.state.state_idx + 1) {
			Ok(elk) => elk,
			Err(_) => return Err(ChannelError::Close("Elkrem sender could not derive the next chain point")),
		};
		match chan_utils::elk_point_from_secret(secp_ctx, &secret) {
			Ok(point) => Ok(point),
			Err(_) => Err(ChannelError::Close("Elkrem sender produced an invalid chain point")),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use chain::keysinterface::InMemoryChannelKeys;
	use util::test_utils::TestElkremSender;
	use util::ser::{Writeable, Readable};

	use bitcoin::hashes::Hash;
	use bitcoin::hash_types::Txid;
	use bitcoin::secp256k1::Secp256k1;
	use bitcoin::secp256k1::key::{SecretKey, PublicKey};

	fn dummy_pubkey(fill: u8) -> PublicKey {
		let secp_ctx = Secp256k1::signing_only();
		PublicKey::from_secret_key(&secp_ctx, &SecretKey::from_slice(&[fill; 32]).unwrap())
	}

	fn dummy_channel() -> Channel<InMemoryChannelKeys, TestElkremSender> {
		let secp_ctx = Secp256k1::new();
		let keys = InMemoryChannelKeys::new(&secp_ctx,
			SecretKey::from_slice(&[1; 32]).unwrap(),
			SecretKey::from_slice(&[2; 32]).unwrap());
		let their_pubkeys = ChannelPublicKeys {
			funding_pubkey: dummy_pubkey(3),
			payment_key: dummy_pubkey(4),
		};
		Channel::new(0, 100_000, 50_000, dummy_pubkey(5),
			OutPoint::new(Txid::from_slice(&[6; 32]).unwrap(), 0),
			keys, their_pubkeys, TestElkremSender::new([7; 32]), 2,
			(dummy_pubkey(8), dummy_pubkey(9), dummy_pubkey(10))).unwrap()
	}

	#[test]
	fn gate_is_a_single_token() {
		let chan = dummy_channel();
		assert!(chan.clear_to_send().is_clear());
		assert!(chan.clear_to_send().try_take());
		assert!(!chan.clear_to_send().try_take());
		assert!(!chan.clear_to_send().is_clear());
		chan.clear_to_send().release();
		assert!(chan.clear_to_send().try_take());
	}

	#[test]
	fn new_rejects_balance_above_value() {
		let secp_ctx = Secp256k1::new();
		let keys = InMemoryChannelKeys::new(&secp_ctx,
			SecretKey::from_slice(&[1; 32]).unwrap(),
			SecretKey::from_slice(&[2; 32]).unwrap());
		let their_pubkeys = ChannelPublicKeys {
			funding_pubkey: dummy_pubkey(3),
			payment_key: dummy_pubkey(4),
		};
		assert!(Channel::new(0, 100_000, 100_001, dummy_pubkey(5),
			OutPoint::new(Txid::from_slice(&[6; 32]).unwrap(), 0),
			keys, their_pubkeys, TestElkremSender::new([7; 32]), 2,
			(dummy_pubkey(8), dummy_pubkey(9), dummy_pubkey(10))).is_err());
	}

	#[test]
	fn advance_elkrem_validates_chain_linkage() {
		let secp_ctx = Secp256k1::new();
		let elk_snd = TestElkremSender::new([42; 32]);
		let good_secret = elk_snd.at_index(5).unwrap();
		let good_point = ::ln::chan_utils::elk_point_from_secret(&secp_ctx, &good_secret).unwrap();

		let mut chan = dummy_channel();
		chan.state.elk_point = good_point;

		// a secret which doesn't derive the committed point is rejected without rotating
		let stale = elk_snd.at_index(4).unwrap();
		assert!(chan.advance_elkrem(&secp_ctx, &stale, dummy_pubkey(11)).is_err());
		assert_eq!(chan.state.elk_point, good_point);

		let next_before = chan.state.next_elk_point;
		let n2_before = chan.state.n2_elk_point;
		let received = dummy_pubkey(12);
		chan.advance_elkrem(&secp_ctx, &good_secret, received).unwrap();
		assert_eq!(chan.state.elk_point, next_before);
		assert_eq!(chan.state.next_elk_point, n2_before);
		assert_eq!(chan.state.n2_elk_point, received);
	}

	#[test]
	fn channel_state_survives_the_store_round_trip() {
		let mut state = dummy_channel().state.clone();
		state.state_idx = 9;
		state.num_txs = 4;
		state.secret_pre = vec![1, 2, 3];
		state.revoc_pre = vec![[1; 20], [2; 20]];
		state.revoc = vec![[3; 20], [4; 20]];
		let encoded = state.encode();
		let read: ChannelState = Readable::read(&mut ::std::io::Cursor::new(&encoded)).unwrap();
		assert!(read == state);
	}
}
