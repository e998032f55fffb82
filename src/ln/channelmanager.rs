//! The top-level protocol machine for probabilistic pushes lives here: one entry point which
//! starts a round, and one handler per inbound wire message.
//!
//! Every handler follows the same shape: check the message is legal in the channel's current
//! phase, reload the authoritative state from the store, mutate, persist, then queue the next
//! outbound message. The channel's one-slot gate is taken when a round starts and returned
//! exactly once per side by the terminal handler; failures after mutation deliberately hold the
//! token, quarantining the channel for operator recovery.

use bitcoin::hashes::Hash;
use bitcoin::hashes::hash160::Hash as Hash160;

use bitcoin::secp256k1::key::PublicKey;
use bitcoin::secp256k1::Secp256k1;
use bitcoin::secp256k1;

use chain::keysinterface::{ChannelKeys, KeysInterface, ElkremSender};
use chain::transaction::OutPoint;
use ln::chan_utils;
use ln::channel::{Channel, ChannelError, RoundPhase, MIN_BALANCE_SATOSHIS};
use ln::channelstore::ChannelStore;
use ln::msgs;
use ln::msgs::{ErrorAction, LightningError, ProbMessageHandler};
use util::errors::APIError;
use util::events::{MessageSendEvent, MessageSendEventsProvider};
use util::logger::Logger;

use std::cmp;
use std::collections::HashMap;
use std::collections::hash_map;
use std::mem;
use std::ops::Deref;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

/// The outbound mailbox. Handlers deposit messages here; the transport drains them via
/// MessageSendEventsProvider. Once shut down no further deposits are accepted, which aborts any
/// round at its next send.
struct OutboundQueue {
	events: Mutex<Vec<MessageSendEvent>>,
	shutdown: AtomicBool,
}

impl OutboundQueue {
	fn new() -> OutboundQueue {
		OutboundQueue {
			events: Mutex::new(Vec::new()),
			shutdown: AtomicBool::new(false),
		}
	}

	fn enqueue(&self, event: MessageSendEvent) -> Result<(), ChannelError> {
		if self.shutdown.load(Ordering::Acquire) {
			return Err(ChannelError::Close("Outbound queue is shut down"));
		}
		self.events.lock().unwrap().push(event);
		Ok(())
	}

	fn get_and_clear(&self) -> Vec<MessageSendEvent> {
		let mut events = self.events.lock().unwrap();
		let mut ret = Vec::new();
		mem::swap(&mut ret, &mut *events);
		ret
	}
}

macro_rules! handle_error {
	($self: ident, $internal: expr) => {
		match $internal {
			Ok(()) => Ok(()),
			Err(ChannelError::Ignore(err)) => {
				log_trace!($self.logger, "Rejecting peer message: {}", err);
				Err(LightningError { err, action: ErrorAction::IgnoreError })
			},
			Err(ChannelError::Close(err)) => {
				log_error!($self.logger, "Quarantining channel: {}", err);
				Err(LightningError { err, action: ErrorAction::DisconnectPeer })
			},
		}
	}
}

/// Manager which keeps track of a number of channels and drives the probabilistic push protocol
/// over them.
///
/// Each channel runs rounds independently; within a channel the gate keeps rounds strictly
/// sequential. Funding new channels is external: a funded Channel is handed in via
/// register_channel.
pub struct ProbChannelManager<ChanSigner: ChannelKeys, ES: ElkremSender, K: Deref, S: Deref, L: Deref>
	where K::Target: KeysInterface<ChanKeySigner = ChanSigner>,
	      S::Target: ChannelStore,
	      L::Target: Logger,
{
	secp_ctx: Secp256k1<secp256k1::All>,
	channels: Mutex<HashMap<OutPoint, Channel<ChanSigner, ES>>>,
	outbound_queue: OutboundQueue,
	keys_manager: K,
	store: S,
	logger: L,
}

impl<ChanSigner: ChannelKeys, ES: ElkremSender, K: Deref, S: Deref, L: Deref> ProbChannelManager<ChanSigner, ES, K, S, L>
	where K::Target: KeysInterface<ChanKeySigner = ChanSigner>,
	      S::Target: ChannelStore,
	      L::Target: Logger,
{
	/// Constructs a new ProbChannelManager with no channels.
	pub fn new(keys_manager: K, store: S, logger: L) -> ProbChannelManager<ChanSigner, ES, K, S, L> {
		ProbChannelManager {
			secp_ctx: Secp256k1::new(),
			channels: Mutex::new(HashMap::new()),
			outbound_queue: OutboundQueue::new(),
			keys_manager,
			store,
			logger,
		}
	}

	/// Adds a freshly funded channel, persisting its initial state.
	pub fn register_channel(&self, chan: Channel<ChanSigner, ES>) -> Result<(), APIError> {
		let mut channels = self.channels.lock().unwrap();
		match channels.entry(chan.funding_outpoint()) {
			hash_map::Entry::Occupied(_) => Err(APIError::APIMisuseError { err: "A channel with this funding outpoint is already registered" }),
			hash_map::Entry::Vacant(entry) => {
				if self.store.persist_channel_state(chan.channel_idx(), &chan.state).is_err() {
					return Err(APIError::ChannelUnavailable { err: "Failed to persist the channel's initial state" });
				}
				log_info!(self.logger, "Registered channel {} with value {}", chan.channel_idx(), chan.channel_value_satoshis());
				entry.insert(chan);
				Ok(())
			}
		}
	}

	/// Begins shutdown. Handlers complete the step they are on but deposit no further messages,
	/// so any round in flight aborts at its next send with its gate token left held.
	pub fn shutdown(&self) {
		self.outbound_queue.shutdown.store(true, Ordering::Release);
	}

	fn fill_random_bytes(&self, buf: &mut [u8]) {
		let mut filled = 0;
		while filled < buf.len() {
			let rand = self.keys_manager.get_secure_random_bytes();
			let take = cmp::min(rand.len(), buf.len() - filled);
			buf[filled..filled + take].copy_from_slice(&rand[..take]);
			filled += take;
		}
	}

	/// Draws a uniform index in [0, num_txs). Rejection-samples so no index is favored when 256
	/// doesn't divide evenly.
	fn uniform_index(&self, num_txs: u8) -> u8 {
		let bound = 256u16 - (256u16 % num_txs as u16);
		loop {
			for byte in self.keys_manager.get_secure_random_bytes().iter() {
				if (*byte as u16) < bound {
					return byte % num_txs;
				}
			}
		}
	}

	/// Initiates a push of exactly one satoshi, committed with probability 1/`num_txs`.
	///
	/// Takes the channel's gate token, which is only returned once the responder's guess has
	/// been handled and our reveal queued. If the channel already has a round in flight this
	/// fails immediately with `ChannelBusy`. Errors after the state was mutated leave the token
	/// held and the channel quarantined.
	pub fn push_prob(&self, channel_point: &OutPoint, amount_satoshis: u32, num_txs: u8) -> Result<(), APIError> {
		if amount_satoshis != 1 {
			return Err(APIError::APIMisuseError { err: "Can only push exactly one satoshi" });
		}
		if num_txs < 1 {
			return Err(APIError::APIMisuseError { err: "Need at least one candidate outcome" });
		}

		let mut channels = self.channels.lock().unwrap();
		let chan = match channels.get_mut(channel_point) {
			Some(chan) => chan,
			None => return Err(APIError::ChannelUnavailable { err: "No channel with that funding outpoint" }),
		};

		if !chan.clear_to_send.try_take() {
			log_trace!(self.logger, "Channel {} busy", chan.channel_idx());
			return Err(APIError::ChannelBusy { err: "Channel already has a push round in flight" });
		}

		// Reload from the store now that we hold the token, then run the balance checks against
		// the authoritative state.
		chan.state = match self.store.reload_channel_state(chan.channel_idx()) {
			Ok(state) => state,
			// don't return the token; something is wrong with the channel
			Err(_) => return Err(APIError::ChannelUnavailable { err: "Failed to reload channel state" }),
		};

		if amount_satoshis as u64 + MIN_BALANCE_SATOSHIS > chan.state.my_amt {
			chan.clear_to_send.release();
			return Err(APIError::InsufficientBalance { err: "Push would take us below the minimum channel balance" });
		}
		if chan.channel_value_satoshis() - chan.state.my_amt < MIN_BALANCE_SATOSHIS {
			chan.clear_to_send.release();
			return Err(APIError::InsufficientBalance { err: "Counterparty is below the minimum channel balance" });
		}

		chan.state.num_txs = num_txs;
		chan.state.prob_amt = amount_satoshis;
		chan.state.state_idx += 1;
		chan.state.my_amt -= amount_satoshis as u64;
		if self.store.persist_channel_state(chan.channel_idx(), &chan.state).is_err() {
			// don't return the token; something is wrong with the channel
			return Err(APIError::ChannelUnavailable { err: "Failed to persist channel state" });
		}

		let msg = msgs::ProbInit {
			channel_point: *channel_point,
			amount: amount_satoshis,
			num_txs,
		};
		if self.outbound_queue.enqueue(MessageSendEvent::SendProbInit { node_id: chan.their_node_id(), msg }).is_err() {
			// don't return the token; something is wrong with the network
			return Err(APIError::ChannelUnavailable { err: "Outbound queue is shut down" });
		}
		chan.phase = RoundPhase::AwaitingCommit;
		log_debug!(self.logger, "Started push round {} on channel {} with {} outcomes", chan.state.state_idx, chan.channel_idx(), num_txs);
		Ok(())
	}

	fn internal_prob_init(&self, their_node_id: &PublicKey, msg: &msgs::ProbInit) -> Result<(), ChannelError> {
		let mut channels = self.channels.lock().unwrap();
		let chan = match channels.get_mut(&msg.channel_point) {
			Some(chan) => chan,
			None => return Err(ChannelError::Ignore("Got a ProbInit for an unknown channel")),
		};
		if chan.their_node_id() != *their_node_id {
			return Err(ChannelError::Ignore("Got a ProbInit from the wrong peer"));
		}
		if msg.amount != 1 {
			return Err(ChannelError::Ignore("Peer tried to stake something other than one satoshi"));
		}
		if msg.num_txs < 1 {
			return Err(ChannelError::Ignore("Peer opened a round with no candidate outcomes"));
		}
		if chan.phase != RoundPhase::Idle || !chan.clear_to_send.try_take() {
			return Err(ChannelError::Ignore("Got a ProbInit while a round is in flight"));
		}

		chan.state = match self.store.reload_channel_state(chan.channel_idx()) {
			Ok(state) => state,
			Err(_) => return Err(ChannelError::Close("Failed to reload channel state")),
		};

		chan.state.prob_amt = msg.amount;
		chan.state.num_txs = msg.num_txs;
		chan.state.state_idx += 1;

		let num_txs = msg.num_txs as usize;
		chan.state.revoc_pre = Vec::with_capacity(num_txs);
		chan.state.revoc = Vec::with_capacity(num_txs);
		for _ in 0..num_txs {
			let mut pre = [0; 20];
			self.fill_random_bytes(&mut pre);
			chan.state.revoc.push(Hash160::hash(&pre).into_inner());
			chan.state.revoc_pre.push(pre);
		}

		if self.store.persist_channel_state(chan.channel_idx(), &chan.state).is_err() {
			return Err(ChannelError::Close("Failed to persist channel state"));
		}

		let commit = msgs::ProbCommit {
			channel_point: msg.channel_point,
			revocation_hashes: chan.state.revoc.clone(),
		};
		self.outbound_queue.enqueue(MessageSendEvent::SendProbCommit { node_id: chan.their_node_id(), msg: commit })?;
		chan.phase = RoundPhase::AwaitingOffer;
		log_debug!(self.logger, "Staked {} outcomes for push round {} on channel {}", msg.num_txs, chan.state.state_idx, chan.channel_idx());
		Ok(())
	}

	fn internal_prob_commit(&self, their_node_id: &PublicKey, msg: &msgs::ProbCommit) -> Result<(), ChannelError> {
		let mut channels = self.channels.lock().unwrap();
		let chan = match channels.get_mut(&msg.channel_point) {
			Some(chan) => chan,
			None => return Err(ChannelError::Ignore("Got a ProbCommit for an unknown channel")),
		};
		if chan.their_node_id() != *their_node_id {
			return Err(ChannelError::Ignore("Got a ProbCommit from the wrong peer"));
		}
		if chan.phase != RoundPhase::AwaitingCommit {
			return Err(ChannelError::Ignore("Got a ProbCommit out of order"));
		}

		chan.state = match self.store.reload_channel_state(chan.channel_idx()) {
			Ok(state) => state,
			Err(_) => return Err(ChannelError::Close("Failed to reload channel state")),
		};

		if msg.revocation_hashes.len() != chan.state.num_txs as usize {
			return Err(ChannelError::Ignore("Got a ProbCommit with the wrong number of outcome commitments"));
		}
		chan.state.revoc = msg.revocation_hashes.clone();

		// The partner proves its next chain point at the end of this round; pre-rotate so the
		// committed point sits in the current slot for advance_elkrem to check.
		chan.state.elk_point = chan.state.next_elk_point;
		chan.state.next_elk_point = chan.state.n2_elk_point;

		let num_txs = chan.state.num_txs as usize;
		chan.state.correct = self.uniform_index(chan.state.num_txs);
		let mut secret_pre = vec![0u8; 20 + num_txs - 1];
		self.fill_random_bytes(&mut secret_pre);
		chan.state.secret_pre = secret_pre;
		// the prefix length is what encodes the correct outcome
		chan.state.secret = Hash160::hash(&chan.state.secret_pre[..20 + chan.state.correct as usize]).into_inner();

		if self.store.persist_channel_state(chan.channel_idx(), &chan.state).is_err() {
			return Err(ChannelError::Close("Failed to persist channel state"));
		}

		let sigs = match chan.local_keys.sign_prob_states(&chan.funding_outpoint(), chan.state.state_idx, true, &chan.state.secret, &chan.state.revoc, &self.secp_ctx) {
			Ok(sigs) => sigs,
			Err(()) => return Err(ChannelError::Close("Signer refused to sign the candidate states")),
		};

		let offer = msgs::ProbOffer {
			channel_point: msg.channel_point,
			secret_hash: chan.state.secret,
			signatures: sigs,
		};
		self.outbound_queue.enqueue(MessageSendEvent::SendProbOffer { node_id: chan.their_node_id(), msg: offer })?;
		chan.phase = RoundPhase::AwaitingChoice;
		Ok(())
	}

	fn internal_prob_offer(&self, their_node_id: &PublicKey, msg: &msgs::ProbOffer) -> Result<(), ChannelError> {
		let mut channels = self.channels.lock().unwrap();
		let chan = match channels.get_mut(&msg.channel_point) {
			Some(chan) => chan,
			None => return Err(ChannelError::Ignore("Got a ProbOffer for an unknown channel")),
		};
		if chan.their_node_id() != *their_node_id {
			return Err(ChannelError::Ignore("Got a ProbOffer from the wrong peer"));
		}
		if chan.phase != RoundPhase::AwaitingOffer {
			return Err(ChannelError::Ignore("Got a ProbOffer out of order"));
		}

		chan.state = match self.store.reload_channel_state(chan.channel_idx()) {
			Ok(state) => state,
			Err(_) => return Err(ChannelError::Close("Failed to reload channel state")),
		};

		if msg.signatures.len() != chan.state.num_txs as usize {
			return Err(ChannelError::Ignore("Got a ProbOffer with the wrong number of signatures"));
		}

		chan.state.secret = msg.secret_hash;
		let choice = self.uniform_index(chan.state.num_txs);
		let their_sig = msg.signatures[choice as usize];
		let sighash = chan_utils::prob_state_sighash(&chan.funding_outpoint(), chan.state.state_idx, true, choice, &chan.state.secret, &chan.state.revoc[choice as usize]);
		if self.secp_ctx.verify(&sighash, &their_sig, &chan.their_pubkeys.funding_pubkey).is_err() {
			return Err(ChannelError::Close("Peer signature on the chosen state is invalid"));
		}
		chan.state.choice = choice;
		chan.state.their_sig = Some(their_sig);

		// Pre-rotate the partner's committed next point into the current slot, ready for the
		// reveal's advance_elkrem check.
		chan.state.elk_point = chan.state.next_elk_point;

		if self.store.persist_channel_state(chan.channel_idx(), &chan.state).is_err() {
			return Err(ChannelError::Close("Failed to persist channel state"));
		}

		let elk = chan.elkrem_for_previous_state()?;
		let sigs = match chan.local_keys.sign_prob_states(&chan.funding_outpoint(), chan.state.state_idx, false, &chan.state.secret, &chan.state.revoc, &self.secp_ctx) {
			Ok(sigs) => sigs,
			Err(()) => return Err(ChannelError::Close("Signer refused to sign the candidate states")),
		};

		// We must not transmit the preimage for the outcome still live, so a clone of the list
		// goes out with the chosen entry replaced by noise; the saved state keeps the real one.
		let mut revocation_preimages = chan.state.revoc_pre.clone();
		self.fill_random_bytes(&mut revocation_preimages[choice as usize]);

		let n2_elk_point = chan.n2_elk_point_for_them(&self.secp_ctx)?;

		let choice_msg = msgs::ProbChoice {
			channel_point: msg.channel_point,
			choice,
			revocation_preimages,
			signature: sigs[choice as usize],
			elkrem_secret: elk,
			next2_elk_point: n2_elk_point,
		};
		self.outbound_queue.enqueue(MessageSendEvent::SendProbChoice { node_id: chan.their_node_id(), msg: choice_msg })?;
		chan.phase = RoundPhase::AwaitingReveal;
		log_debug!(self.logger, "Guessed outcome {} of {} for push round {} on channel {}", choice, chan.state.num_txs, chan.state.state_idx, chan.channel_idx());
		Ok(())
	}

	fn internal_prob_choice(&self, their_node_id: &PublicKey, msg: &msgs::ProbChoice) -> Result<(), ChannelError> {
		let mut channels = self.channels.lock().unwrap();
		let chan = match channels.get_mut(&msg.channel_point) {
			Some(chan) => chan,
			None => return Err(ChannelError::Ignore("Got a ProbChoice for an unknown channel")),
		};
		if chan.their_node_id() != *their_node_id {
			return Err(ChannelError::Ignore("Got a ProbChoice from the wrong peer"));
		}
		if chan.phase != RoundPhase::AwaitingChoice {
			return Err(ChannelError::Ignore("Got a ProbChoice out of order"));
		}

		chan.state = match self.store.reload_channel_state(chan.channel_idx()) {
			Ok(state) => state,
			Err(_) => return Err(ChannelError::Close("Failed to reload channel state")),
		};

		if msg.choice >= chan.state.num_txs {
			return Err(ChannelError::Ignore("Peer chose an outcome out of range"));
		}
		if msg.revocation_preimages.len() != chan.state.num_txs as usize {
			return Err(ChannelError::Ignore("Got a ProbChoice with the wrong number of revocation preimages"));
		}
		// Every outcome the peer didn't choose must open its earlier commitment; the chosen one
		// is redacted and stays secret until the state is revoked.
		for (txnum, pre) in msg.revocation_preimages.iter().enumerate() {
			if txnum as u8 != msg.choice && Hash160::hash(pre).into_inner() != chan.state.revoc[txnum] {
				return Err(ChannelError::Close("Peer revealed a revocation preimage which does not match its commitment"));
			}
		}

		let sighash = chan_utils::prob_state_sighash(&chan.funding_outpoint(), chan.state.state_idx, false, msg.choice, &chan.state.secret, &chan.state.revoc[msg.choice as usize]);
		if self.secp_ctx.verify(&sighash, &msg.signature, &chan.their_pubkeys.funding_pubkey).is_err() {
			return Err(ChannelError::Close("Peer signature on its chosen state is invalid"));
		}

		chan.state.choice = msg.choice;
		chan.state.their_sig = Some(msg.signature);
		chan.state.revoc_pre = msg.revocation_preimages.clone();

		chan.advance_elkrem(&self.secp_ctx, &msg.elkrem_secret, msg.next2_elk_point)?;

		if self.store.persist_channel_state(chan.channel_idx(), &chan.state).is_err() {
			return Err(ChannelError::Close("Failed to persist channel state"));
		}

		let elk = chan.elkrem_for_previous_state()?;
		let n2_elk_point = chan.n2_elk_point_for_them(&self.secp_ctx)?;

		let reveal = msgs::ProbReveal {
			channel_point: msg.channel_point,
			correct: chan.state.correct,
			secret_preimage: chan.state.secret_pre.clone(),
			elkrem_secret: elk,
			next2_elk_point: n2_elk_point,
		};
		self.outbound_queue.enqueue(MessageSendEvent::SendProbReveal { node_id: chan.their_node_id(), msg: reveal })?;

		// done with the round on our side
		chan.phase = RoundPhase::Idle;
		chan.clear_to_send.release();
		log_debug!(self.logger, "Completed push round {} on channel {}: peer guessed {}, correct was {}", chan.state.state_idx, chan.channel_idx(), msg.choice, chan.state.correct);
		Ok(())
	}

	fn internal_prob_reveal(&self, their_node_id: &PublicKey, msg: &msgs::ProbReveal) -> Result<(), ChannelError> {
		let mut channels = self.channels.lock().unwrap();
		let chan = match channels.get_mut(&msg.channel_point) {
			Some(chan) => chan,
			None => return Err(ChannelError::Ignore("Got a ProbReveal for an unknown channel")),
		};
		if chan.their_node_id() != *their_node_id {
			return Err(ChannelError::Ignore("Got a ProbReveal from the wrong peer"));
		}
		if chan.phase != RoundPhase::AwaitingReveal {
			return Err(ChannelError::Ignore("Got a ProbReveal out of order"));
		}

		chan.state = match self.store.reload_channel_state(chan.channel_idx()) {
			Ok(state) => state,
			Err(_) => return Err(ChannelError::Close("Failed to reload channel state")),
		};

		if msg.correct >= chan.state.num_txs {
			return Err(ChannelError::Ignore("Peer revealed an outcome out of range"));
		}
		if msg.secret_preimage.len() != 20 + chan.state.num_txs as usize - 1 {
			return Err(ChannelError::Ignore("Peer revealed a preimage family of the wrong length"));
		}
		if Hash160::hash(&msg.secret_preimage[..20 + msg.correct as usize]).into_inner() != chan.state.secret {
			return Err(ChannelError::Close("Peer reveal does not match its secret commitment"));
		}

		chan.state.correct = msg.correct;
		chan.state.secret_pre = msg.secret_preimage.clone();

		chan.advance_elkrem(&self.secp_ctx, &msg.elkrem_secret, msg.next2_elk_point)?;

		if self.store.persist_channel_state(chan.channel_idx(), &chan.state).is_err() {
			return Err(ChannelError::Close("Failed to persist channel state"));
		}

		chan.phase = RoundPhase::Idle;
		chan.clear_to_send.release();
		log_debug!(self.logger, "Settled push round {} on channel {}: we guessed {}, correct was {}", chan.state.state_idx, chan.channel_idx(), chan.state.choice, msg.correct);
		Ok(())
	}
}

impl<ChanSigner: ChannelKeys, ES: ElkremSender, K: Deref + Sync + Send, S: Deref + Sync + Send, L: Deref + Sync + Send> ProbMessageHandler for ProbChannelManager<ChanSigner, ES, K, S, L>
	where K::Target: KeysInterface<ChanKeySigner = ChanSigner>,
	      S::Target: ChannelStore,
	      L::Target: Logger,
{
	fn handle_prob_init(&self, their_node_id: &PublicKey, msg: &msgs::ProbInit) -> Result<(), LightningError> {
		handle_error!(self, self.internal_prob_init(their_node_id, msg))
	}

	fn handle_prob_commit(&self, their_node_id: &PublicKey, msg: &msgs::ProbCommit) -> Result<(), LightningError> {
		handle_error!(self, self.internal_prob_commit(their_node_id, msg))
	}

	fn handle_prob_offer(&self, their_node_id: &PublicKey, msg: &msgs::ProbOffer) -> Result<(), LightningError> {
		handle_error!(self, self.internal_prob_offer(their_node_id, msg))
	}

	fn handle_prob_choice(&self, their_node_id: &PublicKey, msg: &msgs::ProbChoice) -> Result<(), LightningError> {
		handle_error!(self, self.internal_prob_choice(their_node_id, msg))
	}

	fn handle_prob_reveal(&self, their_node_id: &PublicKey, msg: &msgs::ProbReveal) -> Result<(), LightningError> {
		handle_error!(self, self.internal_prob_reveal(their_node_id, msg))
	}
}

impl<ChanSigner: ChannelKeys, ES: ElkremSender, K: Deref, S: Deref, L: Deref> MessageSendEventsProvider for ProbChannelManager<ChanSigner, ES, K, S, L>
	where K::Target: KeysInterface<ChanKeySigner = ChanSigner>,
	      S::Target: ChannelStore,
	      L::Target: Logger,
{
	fn get_and_clear_pending_msg_events(&self) -> Vec<MessageSendEvent> {
		self.outbound_queue.get_and_clear()
	}
}
