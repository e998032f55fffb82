//! keysinterface provides keys into lightning-prob and defines some useful traits which describe
//! the key material and per-round randomness the protocol consumes, so that signing and secret
//! management can live on a hardware wallet or other secure element.

use bitcoin::network::constants::Network;
use bitcoin::util::bip32::{ExtendedPrivKey, ChildNumber};

use bitcoin::hashes::{Hash, HashEngine};
use bitcoin::hashes::sha256::HashEngine as Sha256State;
use bitcoin::hashes::sha256::Hash as Sha256;

use bitcoin::secp256k1::key::{SecretKey, PublicKey};
use bitcoin::secp256k1::{Secp256k1, Signature};
use bitcoin::secp256k1;

use chain::transaction::OutPoint;
use ln::chan_utils;
use ln::msgs::DecodeError;
use util::byte_utils;
use util::ser::{Writeable, Writer, Readable};

use std::sync::atomic::{AtomicUsize, Ordering};
use std::io::Read;

/// One party's public keys which do not change over the life of a channel.
#[derive(Clone, PartialEq)]
pub struct ChannelPublicKeys {
	/// The public key which appears in the 2-of-2 funding output and which signs each candidate
	/// post-state in a push round.
	pub funding_pubkey: PublicKey,
	/// The key to which this party's share of the channel pays on commitment and claim outputs.
	pub payment_key: PublicKey,
}

impl Writeable for ChannelPublicKeys {
	fn write<W: Writer>(&self, writer: &mut W) -> Result<(), ::std::io::Error> {
		self.funding_pubkey.write(writer)?;
		self.payment_key.write(writer)?;
		Ok(())
	}
}

impl Readable for ChannelPublicKeys {
	fn read<R: Read>(reader: &mut R) -> Result<Self, DecodeError> {
		Ok(ChannelPublicKeys {
			funding_pubkey: Readable::read(reader)?,
			payment_key: Readable::read(reader)?,
		})
	}
}

/// Set of keys needed to operate one side of a channel and sign the candidate post-states of a
/// push round.
///
/// Signing services could be implemented on a hardware wallet, in which case an implementation of
/// this trait would front a communication channel to the secure device and no private key
/// material would reside on a hot server.
pub trait ChannelKeys : Send + Clone {
	/// Gets the local channel public keys and basepoints
	fn pubkeys(&self) -> &ChannelPublicKeys;

	/// Create one signature per candidate post-state of the current push round.
	///
	/// `revocation_hashes` carries one outcome commitment per candidate; the returned vector has
	/// the same length and order. `as_initiator` flags which side's view of state
	/// `commitment_number` each signature covers, so that the two sides' signatures over the same
	/// round never collide.
	///
	/// Note that if signing fails or is rejected, the round is quarantined.
	fn sign_prob_states<T: secp256k1::Signing>(&self, channel_point: &OutPoint, commitment_number: u64, as_initiator: bool, secret_hash: &[u8; 20], revocation_hashes: &[[u8; 20]], secp_ctx: &Secp256k1<T>) -> Result<Vec<Signature>, ()>;
}

/// The sending half of an elkrem hash chain.
///
/// Chain construction is not this crate's concern; the protocol only ever asks for the secret at
/// a given index (any prefix secret derives all earlier ones, which is what lets the partner
/// punish stale commitments).
pub trait ElkremSender : Send {
	/// Returns the chain secret at the given index. Fails if the index is outside the range this
	/// sender can derive.
	fn at_index(&self, index: u64) -> Result<[u8; 32], ()>;
}

/// A trait to describe an object which can get user secrets and key material.
pub trait KeysInterface: Send + Sync {
	/// A type which implements ChannelKeys which will be returned by get_channel_keys.
	type ChanKeySigner : ChannelKeys;

	/// Get a new set of ChannelKeys for per-channel secrets. These MUST be unique even if you
	/// restarted with some stale data!
	fn get_channel_keys(&self, channel_value_satoshis: u64) -> Self::ChanKeySigner;
	/// Gets a unique, cryptographically-secure random 32 byte value. This is used for preimage
	/// families, outcome commitments and index draws, so it is critical that the value be
	/// unpredictable to the channel partner.
	fn get_secure_random_bytes(&self) -> [u8; 32];
}

/// A simple implementation of ChannelKeys that just keeps the private keys in memory.
#[derive(Clone)]
pub struct InMemoryChannelKeys {
	/// Private key of the 2-of-2 funding output, also used to sign candidate post-states
	pub funding_key: SecretKey,
	/// Private key to which this side's channel claims pay
	pub payment_key: SecretKey,
	/// Local public keys
	local_channel_pubkeys: ChannelPublicKeys,
}

impl InMemoryChannelKeys {
	/// Create a new InMemoryChannelKeys
	pub fn new<C: secp256k1::Signing>(secp_ctx: &Secp256k1<C>, funding_key: SecretKey, payment_key: SecretKey) -> InMemoryChannelKeys {
		let local_channel_pubkeys = InMemoryChannelKeys::make_channel_pubkeys(secp_ctx, &funding_key, &payment_key);
		InMemoryChannelKeys {
			funding_key,
			payment_key,
			local_channel_pubkeys,
		}
	}

	fn make_channel_pubkeys<C: secp256k1::Signing>(secp_ctx: &Secp256k1<C>, funding_key: &SecretKey, payment_key: &SecretKey) -> ChannelPublicKeys {
		ChannelPublicKeys {
			funding_pubkey: PublicKey::from_secret_key(secp_ctx, funding_key),
			payment_key: PublicKey::from_secret_key(secp_ctx, payment_key),
		}
	}
}

impl ChannelKeys for InMemoryChannelKeys {
	fn pubkeys(&self) -> &ChannelPublicKeys { &self.local_channel_pubkeys }

	fn sign_prob_states<T: secp256k1::Signing>(&self, channel_point: &OutPoint, commitment_number: u64, as_initiator: bool, secret_hash: &[u8; 20], revocation_hashes: &[[u8; 20]], secp_ctx: &Secp256k1<T>) -> Result<Vec<Signature>, ()> {
		let mut sigs = Vec::with_capacity(revocation_hashes.len());
		for (txnum, revocation_hash) in revocation_hashes.iter().enumerate() {
			let sighash = chan_utils::prob_state_sighash(channel_point, commitment_number, as_initiator, txnum as u8, secret_hash, revocation_hash);
			sigs.push(secp_ctx.sign(&sighash, &self.funding_key));
		}
		Ok(sigs)
	}
}

/// Simple KeysInterface implementor that takes a 32-byte seed for use as a BIP 32 extended key
/// and derives keys from that.
///
/// Your node_id is seed/0'
/// ChannelKeys generation is seed/1'/N' where N is an ever-increasing channel counter.
///
/// Random-byte derivation mixes the seed, an ever-increasing counter and the startup time, so
/// two instances started from the same seed at different times never repeat a draw.
pub struct KeysManager {
	secp_ctx: Secp256k1<secp256k1::SignOnly>,
	node_secret: SecretKey,
	channel_master_key: ExtendedPrivKey,
	channel_child_index: AtomicUsize,
	rand_bytes_child_index: AtomicUsize,
	unique_start: Sha256State,
}

impl KeysManager {
	/// Constructs a KeysManager from a 32-byte seed. If the seed is in some way biased (eg your
	/// RNG is busted) this may panic (but more importantly, you will possibly lose funds).
	/// starting_time isn't strictly required to actually be a time, but it must absolutely,
	/// without a doubt, be unique to this instance. ie if you start multiple times with the same
	/// seed, starting_time must be unique to each run.
	pub fn new(seed: &[u8; 32], network: Network, starting_time_secs: u64, starting_time_nanos: u32) -> KeysManager {
		let secp_ctx = Secp256k1::signing_only();
		match ExtendedPrivKey::new_master(network.clone(), seed) {
			Ok(master_key) => {
				let node_secret = master_key.ckd_priv(&secp_ctx, ChildNumber::from_hardened_idx(0).unwrap()).expect("Your RNG is busted").private_key.key;
				let channel_master_key = master_key.ckd_priv(&secp_ctx, ChildNumber::from_hardened_idx(1).unwrap()).expect("Your RNG is busted");

				let mut unique_start = Sha256::engine();
				unique_start.input(&byte_utils::be64_to_array(starting_time_secs));
				unique_start.input(&byte_utils::be32_to_array(starting_time_nanos));
				unique_start.input(seed);

				KeysManager {
					secp_ctx,
					node_secret,
					channel_master_key,
					channel_child_index: AtomicUsize::new(0),
					rand_bytes_child_index: AtomicUsize::new(0),
					unique_start,
				}
			},
			Err(_) => panic!("Your rng is busted"),
		}
	}

	/// Gets this node's secret key, from which the node_id is derived.
	pub fn get_node_secret(&self) -> SecretKey {
		self.node_secret.clone()
	}
}

impl KeysInterface for KeysManager {
	type ChanKeySigner = InMemoryChannelKeys;

	fn get_channel_keys(&self, channel_value_satoshis: u64) -> InMemoryChannelKeys {
		let child_ix = self.channel_child_index.fetch_add(1, Ordering::AcqRel);
		let chan_master = self.channel_master_key.ckd_priv(&self.secp_ctx, ChildNumber::from_hardened_idx(child_ix as u32).expect("key space exhausted")).expect("Your RNG is busted");

		let mut sha = self.unique_start.clone();
		sha.input(&byte_utils::be64_to_array(channel_value_satoshis));
		sha.input(&chan_master.private_key.key[..]);
		let seed = Sha256::from_engine(sha).into_inner();

		macro_rules! key_step {
			($info: expr, $prev_key: expr) => {{
				let mut sha = Sha256::engine();
				sha.input(&seed);
				sha.input(&$prev_key[..]);
				sha.input($info.as_bytes());
				SecretKey::from_slice(&Sha256::from_engine(sha).into_inner()).expect("SHA-256 is busted")
			}}
		}
		let funding_key = key_step!("funding key", seed);
		let payment_key = key_step!("payment key", funding_key);

		InMemoryChannelKeys::new(&self.secp_ctx, funding_key, payment_key)
	}

	fn get_secure_random_bytes(&self) -> [u8; 32] {
		let mut sha = self.unique_start.clone();
		let child_ix = self.rand_bytes_child_index.fetch_add(1, Ordering::AcqRel);
		sha.input(&byte_utils::be64_to_array(child_ix as u64));
		sha.input(b"Unique Secure Random Bytes Salt");
		Sha256::from_engine(sha).into_inner()
	}
}

#[cfg(test)]
mod tests {
	use super::{KeysManager, KeysInterface, InMemoryChannelKeys, ChannelKeys};
	use chain::transaction::OutPoint;

	use bitcoin::network::constants::Network;
	use bitcoin::hashes::Hash;
	use bitcoin::hash_types::Txid;
	use bitcoin::secp256k1::Secp256k1;
	use bitcoin::secp256k1::key::SecretKey;

	#[test]
	fn random_bytes_never_repeat() {
		let manager = KeysManager::new(&[7; 32], Network::Testnet, 42, 42);
		let a = manager.get_secure_random_bytes();
		let b = manager.get_secure_random_bytes();
		assert_ne!(a, b);
		let other_start = KeysManager::new(&[7; 32], Network::Testnet, 42, 43);
		assert_ne!(a, other_start.get_secure_random_bytes());
	}

	#[test]
	fn channel_keys_are_unique_per_channel() {
		let manager = KeysManager::new(&[11; 32], Network::Testnet, 1, 1);
		let a = manager.get_channel_keys(100_000);
		let b = manager.get_channel_keys(100_000);
		assert_ne!(a.pubkeys().funding_pubkey, b.pubkeys().funding_pubkey);
	}

	#[test]
	fn prob_state_sigs_verify_against_role_and_outcome() {
		let secp_ctx = Secp256k1::new();
		let keys = InMemoryChannelKeys::new(&secp_ctx,
			SecretKey::from_slice(&[3; 32]).unwrap(),
			SecretKey::from_slice(&[4; 32]).unwrap());
		let channel_point = OutPoint::new(Txid::from_slice(&[5; 32]).unwrap(), 0);
		let revocs = vec![[1u8; 20], [2u8; 20], [3u8; 20]];
		let sigs = keys.sign_prob_states(&channel_point, 7, true, &[9; 20], &revocs, &secp_ctx).unwrap();
		assert_eq!(sigs.len(), 3);

		let sighash = ::ln::chan_utils::prob_state_sighash(&channel_point, 7, true, 1, &[9; 20], &revocs[1]);
		secp_ctx.verify(&sighash, &sigs[1], &keys.pubkeys().funding_pubkey).unwrap();

		// a signature never verifies for the other role or another outcome
		let wrong_role = ::ln::chan_utils::prob_state_sighash(&channel_point, 7, false, 1, &[9; 20], &revocs[1]);
		assert!(secp_ctx.verify(&wrong_role, &sigs[1], &keys.pubkeys().funding_pubkey).is_err());
		let wrong_outcome = ::ln::chan_utils::prob_state_sighash(&channel_point, 7, true, 2, &[9; 20], &revocs[1]);
		assert!(secp_ctx.verify(&wrong_outcome, &sigs[1], &keys.pubkeys().funding_pubkey).is_err());
	}
}
