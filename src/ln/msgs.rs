//! Wire messages, traits representing wire message handlers, and a few error types live here.
//!
//! For a normal node you probably don't need to use anything here, however, if you wish to split
//! a node into an internet-facing route/message socket handling daemon and a coin-owning daemon,
//! the MessageSendEvent enum in util::events plus the ProbMessageHandler trait here are the
//! interfaces between the two.
//!
//! All five push-round messages start with a one-byte type tag and the channel's funding
//! outpoint, which routes them. None of them carries an explicit count: the number of staked
//! outcomes is recovered from the payload length, in chunks of 20 (hashes and preimages) or 64
//! (compact signatures).

use bitcoin::secp256k1::key::PublicKey;
use bitcoin::secp256k1::Signature;

use std::error::Error;
use std::{fmt, io};
use std::io::Read;

use chain::transaction::OutPoint;
use util::events::MessageSendEventsProvider;
use util::ser::{Writeable, Writer, Readable, read_exact_or_short};

/// Type tag of a ProbInit message
pub const MSGID_PROB_INIT: u8 = 0xa0;
/// Type tag of a ProbCommit message
pub const MSGID_PROB_COMMIT: u8 = 0xa1;
/// Type tag of a ProbOffer message
pub const MSGID_PROB_OFFER: u8 = 0xa2;
/// Type tag of a ProbChoice message
pub const MSGID_PROB_CHOICE: u8 = 0xa3;
/// Type tag of a ProbReveal message
pub const MSGID_PROB_REVEAL: u8 = 0xa4;

/// An error in decoding a message or struct.
#[derive(Debug)]
pub enum DecodeError {
	/// A length descriptor in the packet didn't describe the later data correctly
	BadLengthDescriptor,
	/// Value was invalid, eg a byte which was supposed to be a bool was something other than a 0
	/// or 1, a public key or signature which failed to parse, or a message type tag we don't know
	InvalidValue,
	/// Buffer too short
	ShortRead,
	/// std::io::Error
	Io(io::Error),
}

impl fmt::Display for DecodeError {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		f.write_str(self.description())
	}
}

impl Error for DecodeError {
	fn description(&self) -> &str {
		match *self {
			DecodeError::BadLengthDescriptor => "A length descriptor in the packet didn't describe the later data correctly",
			DecodeError::InvalidValue => "Value was invalid",
			DecodeError::ShortRead => "Packet extended beyond the provided bytes",
			DecodeError::Io(ref e) => e.description(),
		}
	}
}

impl From<io::Error> for DecodeError {
	fn from(e: io::Error) -> Self {
		if e.kind() == io::ErrorKind::UnexpectedEof {
			DecodeError::ShortRead
		} else {
			DecodeError::Io(e)
		}
	}
}

/// Used to put an error message in a LightningError
#[derive(Clone, Debug)]
pub enum ErrorAction {
	/// The peer took some action which made us think they were useless. Disconnect them.
	DisconnectPeer,
	/// The peer did something harmless that we weren't able to process, just log and ignore
	IgnoreError,
}

/// An Err type for failure to process messages.
#[derive(Debug)]
pub struct LightningError {
	/// Error description
	pub err: &'static str,
	/// The action which should be taken against the offending peer.
	pub action: ErrorAction,
}

/// The opening message of a push round: the initiator stakes `amount` (always one satoshi) on
/// one of `num_txs` outcomes.
#[derive(Clone, PartialEq)]
pub struct ProbInit {
	/// The funding outpoint of the channel this round runs over
	pub channel_point: OutPoint,
	/// The amount at stake, in satoshi. The protocol fixes this at one.
	pub amount: u32,
	/// N, the number of candidate outcomes the responder must stake
	pub num_txs: u8,
}

/// The responder's outcome commitments: one HASH160 per candidate outcome, whose preimages stay
/// secret until the round resolves.
#[derive(Clone, PartialEq)]
pub struct ProbCommit {
	/// The funding outpoint of the channel this round runs over
	pub channel_point: OutPoint,
	/// HASH160 of the responder's per-outcome revocation preimages, in outcome order
	pub revocation_hashes: Vec<[u8; 20]>,
}

/// The initiator's offer: the hash committing to its secret preimage (whose length encodes the
/// correct outcome) and one signature per candidate post-state.
#[derive(Clone, PartialEq)]
pub struct ProbOffer {
	/// The funding outpoint of the channel this round runs over
	pub channel_point: OutPoint,
	/// HASH160 of the prefix of the initiator's preimage family selecting the correct outcome
	pub secret_hash: [u8; 20],
	/// One signature per candidate post-state, in outcome order
	pub signatures: Vec<Signature>,
}

/// The responder's guess, its signature on the guessed state, and the revocation preimages for
/// every outcome it did not choose (the chosen one is redacted with fresh randomness).
#[derive(Clone, PartialEq)]
pub struct ProbChoice {
	/// The funding outpoint of the channel this round runs over
	pub channel_point: OutPoint,
	/// The outcome the responder guesses, in [0, num_txs)
	pub choice: u8,
	/// The responder's revocation preimages, with the entry at `choice` replaced by noise
	pub revocation_preimages: Vec<[u8; 20]>,
	/// The responder's signature on the post-state selected by `choice`
	pub signature: Signature,
	/// The elkrem secret revoking the responder's previous state
	pub elkrem_secret: [u8; 32],
	/// The responder's next-next elkrem chain point
	pub next2_elk_point: PublicKey,
}

/// The initiator's reveal, settling the round: the correct outcome index and the preimage family
/// whose `20 + correct` prefix hashes to the offered secret.
#[derive(Clone, PartialEq)]
pub struct ProbReveal {
	/// The funding outpoint of the channel this round runs over
	pub channel_point: OutPoint,
	/// The correct outcome index, in [0, num_txs)
	pub correct: u8,
	/// The full preimage family, 20 + num_txs - 1 bytes
	pub secret_preimage: Vec<u8>,
	/// The elkrem secret revoking the initiator's previous state
	pub elkrem_secret: [u8; 32],
	/// The initiator's next-next elkrem chain point
	pub next2_elk_point: PublicKey,
}

/// A push-round message with its type tag, as read off the wire.
#[derive(Clone, PartialEq)]
pub enum ProbMessage {
	/// A ProbInit message
	Init(ProbInit),
	/// A ProbCommit message
	Commit(ProbCommit),
	/// A ProbOffer message
	Offer(ProbOffer),
	/// A ProbChoice message
	Choice(ProbChoice),
	/// A ProbReveal message
	Reveal(ProbReveal),
}

/// A trait to describe an object which can receive push-round messages.
///
/// Messages MAY be called in parallel when they originate from different their_node_ids, however
/// they MUST NOT be called in parallel when the two calls have the same their_node_id.
pub trait ProbMessageHandler : MessageSendEventsProvider + Send + Sync {
	/// Handle an incoming ProbInit message from the given peer.
	fn handle_prob_init(&self, their_node_id: &PublicKey, msg: &ProbInit) -> Result<(), LightningError>;
	/// Handle an incoming ProbCommit message from the given peer.
	fn handle_prob_commit(&self, their_node_id: &PublicKey, msg: &ProbCommit) -> Result<(), LightningError>;
	/// Handle an incoming ProbOffer message from the given peer.
	fn handle_prob_offer(&self, their_node_id: &PublicKey, msg: &ProbOffer) -> Result<(), LightningError>;
	/// Handle an incoming ProbChoice message from the given peer.
	fn handle_prob_choice(&self, their_node_id: &PublicKey, msg: &ProbChoice) -> Result<(), LightningError>;
	/// Handle an incoming ProbReveal message from the given peer.
	fn handle_prob_reveal(&self, their_node_id: &PublicKey, msg: &ProbReveal) -> Result<(), LightningError>;
}

impl Writeable for ProbInit {
	fn write<W: Writer>(&self, w: &mut W) -> Result<(), io::Error> {
		self.channel_point.write(w)?;
		self.amount.write(w)?;
		self.num_txs.write(w)?;
		Ok(())
	}
}

impl Readable for ProbInit {
	fn read<R: Read>(r: &mut R) -> Result<Self, DecodeError> {
		Ok(ProbInit {
			channel_point: Readable::read(r)?,
			amount: Readable::read(r)?,
			num_txs: Readable::read(r)?,
		})
	}
}

// The hash and signature lists below are written back-to-back with no count; decoding splits
// whatever follows the fixed fields into equal chunks and rejects ragged or empty remainders.

fn split_20_byte_chunks(data: &[u8]) -> Result<Vec<[u8; 20]>, DecodeError> {
	if data.is_empty() || data.len() % 20 != 0 || data.len() / 20 > 255 {
		return Err(DecodeError::BadLengthDescriptor);
	}
	let mut chunks = Vec::with_capacity(data.len() / 20);
	for chunk in data.chunks(20) {
		let mut hash = [0; 20];
		hash.copy_from_slice(chunk);
		chunks.push(hash);
	}
	Ok(chunks)
}

impl Writeable for ProbCommit {
	fn write<W: Writer>(&self, w: &mut W) -> Result<(), io::Error> {
		self.channel_point.write(w)?;
		for hash in self.revocation_hashes.iter() {
			hash.write(w)?;
		}
		Ok(())
	}
}

impl Readable for ProbCommit {
	fn read<R: Read>(r: &mut R) -> Result<Self, DecodeError> {
		let channel_point = Readable::read(r)?;
		let mut tail = Vec::new();
		r.read_to_end(&mut tail)?;
		Ok(ProbCommit {
			channel_point,
			revocation_hashes: split_20_byte_chunks(&tail)?,
		})
	}
}

impl Writeable for ProbOffer {
	fn write<W: Writer>(&self, w: &mut W) -> Result<(), io::Error> {
		self.channel_point.write(w)?;
		self.secret_hash.write(w)?;
		for sig in self.signatures.iter() {
			sig.write(w)?;
		}
		Ok(())
	}
}

impl Readable for ProbOffer {
	fn read<R: Read>(r: &mut R) -> Result<Self, DecodeError> {
		let channel_point = Readable::read(r)?;
		let secret_hash = Readable::read(r)?;
		let mut tail = Vec::new();
		r.read_to_end(&mut tail)?;
		if tail.is_empty() || tail.len() % 64 != 0 || tail.len() / 64 > 255 {
			return Err(DecodeError::BadLengthDescriptor);
		}
		let mut signatures = Vec::with_capacity(tail.len() / 64);
		for chunk in tail.chunks(64) {
			match Signature::from_compact(chunk) {
				Ok(sig) => signatures.push(sig),
				Err(_) => return Err(DecodeError::InvalidValue),
			}
		}
		Ok(ProbOffer {
			channel_point,
			secret_hash,
			signatures,
		})
	}
}

impl Writeable for ProbChoice {
	fn write<W: Writer>(&self, w: &mut W) -> Result<(), io::Error> {
		self.channel_point.write(w)?;
		self.choice.write(w)?;
		for pre in self.revocation_preimages.iter() {
			pre.write(w)?;
		}
		self.signature.write(w)?;
		self.elkrem_secret.write(w)?;
		self.next2_elk_point.write(w)?;
		Ok(())
	}
}

impl Readable for ProbChoice {
	fn read<R: Read>(r: &mut R) -> Result<Self, DecodeError> {
		let channel_point = Readable::read(r)?;
		let choice = Readable::read(r)?;
		let mut tail = Vec::new();
		r.read_to_end(&mut tail)?;
		// sig (64) + elk (32) + point (33) follow the preimage list
		if tail.len() <= 64 + 32 + 33 {
			return Err(DecodeError::ShortRead);
		}
		let split = tail.len() - (64 + 32 + 33);
		let revocation_preimages = split_20_byte_chunks(&tail[..split])?;
		let signature = match Signature::from_compact(&tail[split..split + 64]) {
			Ok(sig) => sig,
			Err(_) => return Err(DecodeError::InvalidValue),
		};
		let mut elkrem_secret = [0; 32];
		elkrem_secret.copy_from_slice(&tail[split + 64..split + 96]);
		let next2_elk_point = match PublicKey::from_slice(&tail[split + 96..]) {
			Ok(point) => point,
			Err(_) => return Err(DecodeError::InvalidValue),
		};
		Ok(ProbChoice {
			channel_point,
			choice,
			revocation_preimages,
			signature,
			elkrem_secret,
			next2_elk_point,
		})
	}
}

impl Writeable for ProbReveal {
	fn write<W: Writer>(&self, w: &mut W) -> Result<(), io::Error> {
		self.channel_point.write(w)?;
		self.correct.write(w)?;
		w.write_all(&self.secret_preimage)?;
		self.elkrem_secret.write(w)?;
		self.next2_elk_point.write(w)?;
		Ok(())
	}
}

impl Readable for ProbReveal {
	fn read<R: Read>(r: &mut R) -> Result<Self, DecodeError> {
		let channel_point = Readable::read(r)?;
		let correct = Readable::read(r)?;
		let mut tail = Vec::new();
		r.read_to_end(&mut tail)?;
		if tail.len() <= 32 + 33 {
			return Err(DecodeError::ShortRead);
		}
		let split = tail.len() - (32 + 33);
		// the preimage family is 20 + num_txs - 1 bytes for num_txs in [1, 255]
		if split < 20 || split > 20 + 254 {
			return Err(DecodeError::BadLengthDescriptor);
		}
		let secret_preimage = tail[..split].to_vec();
		let mut elkrem_secret = [0; 32];
		elkrem_secret.copy_from_slice(&tail[split..split + 32]);
		let next2_elk_point = match PublicKey::from_slice(&tail[split + 32..]) {
			Ok(point) => point,
			Err(_) => return Err(DecodeError::InvalidValue),
		};
		Ok(ProbReveal {
			channel_point,
			correct,
			secret_preimage,
			elkrem_secret,
			next2_elk_point,
		})
	}
}

impl Writeable for ProbMessage {
	fn write<W: Writer>(&self, w: &mut W) -> Result<(), io::Error> {
		match *self {
			ProbMessage::Init(ref msg) => {
				MSGID_PROB_INIT.write(w)?;
				msg.write(w)
			},
			ProbMessage::Commit(ref msg) => {
				MSGID_PROB_COMMIT.write(w)?;
				msg.write(w)
			},
			ProbMessage::Offer(ref msg) => {
				MSGID_PROB_OFFER.write(w)?;
				msg.write(w)
			},
			ProbMessage::Choice(ref msg) => {
				MSGID_PROB_CHOICE.write(w)?;
				msg.write(w)
			},
			ProbMessage::Reveal(ref msg) => {
				MSGID_PROB_REVEAL.write(w)?;
				msg.write(w)
			},
		}
	}
}

impl Readable for ProbMessage {
	fn read<R: Read>(r: &mut R) -> Result<Self, DecodeError> {
		let mut tag = [0; 1];
		read_exact_or_short(r, &mut tag)?;
		match tag[0] {
			MSGID_PROB_INIT => Ok(ProbMessage::Init(Readable::read(r)?)),
			MSGID_PROB_COMMIT => Ok(ProbMessage::Commit(Readable::read(r)?)),
			MSGID_PROB_OFFER => Ok(ProbMessage::Offer(Readable::read(r)?)),
			MSGID_PROB_CHOICE => Ok(ProbMessage::Choice(Readable::read(r)?)),
			MSGID_PROB_REVEAL => Ok(ProbMessage::Reveal(Readable::read(r)?)),
			_ => Err(DecodeError::InvalidValue),
		}
	}
}
