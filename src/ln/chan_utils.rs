//! Various utilities for building scripts and deriving keys related to channels. These are
//! largely of interest for those implementing the on-chain claim logic, or as an example of how
//! the probabilistic outputs are enforced.

use bitcoin::blockdata::script::{Script, Builder};
use bitcoin::blockdata::opcodes;
use bitcoin::blockdata::transaction::TxOut;

use bitcoin::hashes::{Hash, HashEngine};
use bitcoin::hashes::sha256::Hash as Sha256;

use bitcoin::secp256k1::key::{SecretKey, PublicKey};
use bitcoin::secp256k1::{Secp256k1, Message};
use bitcoin::secp256k1;

use chain::transaction::OutPoint;
use util::byte_utils;
use util::errors::APIError;

/// Build the script for a commitment output, spendable two ways: immediately with a signature by
/// `revocation_key` (the punishment path, available to the partner once the matching per-state
/// secret has been revealed), or with a signature by `timeout_key` after `contest_delay`
/// relative blocks.
///
/// The witness selects the branch: a true top-of-stack item takes the revocation path, a false
/// one the timeout path. Either way a single OP_CHECKSIG consumes whichever key the branch left
/// on the stack.
pub fn get_commit_redeemscript(revocation_key: &PublicKey, contest_delay: u16, timeout_key: &PublicKey) -> Script {
	Builder::new().push_opcode(opcodes::all::OP_IF)
	              .push_slice(&revocation_key.serialize())
	              .push_opcode(opcodes::all::OP_ELSE)
	              .push_int(contest_delay as i64)
	              .push_opcode(opcodes::all::OP_CSV)
	              .push_opcode(opcodes::all::OP_DROP)
	              .push_slice(&timeout_key.serialize())
	              .push_opcode(opcodes::all::OP_ENDIF)
	              .push_opcode(opcodes::all::OP_CHECKSIG)
	              .into_script()
}

/// Build the script for one of the N parallel probabilistic-claim outputs, outcome number
/// `txnum`.
///
/// Two nested branches. Outer true is the sender reclaim side, which itself splits: inner true
/// requires a preimage hashing (HASH160) to `revocation_hash` (the responder revoked this
/// outcome), inner false requires a preimage of exactly `20 + txnum` bytes hashing to
/// `secret_hash` (the sender's published commitment - only the sender knows which length its one
/// preimage has, which is the whole probabilistic mechanism). Outer false is the receiver's
/// unconditional path after `contest_delay` relative blocks.
pub fn get_prob_claim_redeemscript(sender_key: &PublicKey, receiver_key: &PublicKey, revocation_hash: &[u8; 20], secret_hash: &[u8; 20], txnum: u8, contest_delay: u16) -> Script {
	Builder::new().push_opcode(opcodes::all::OP_IF)
	              .push_opcode(opcodes::all::OP_IF)
	              .push_opcode(opcodes::all::OP_HASH160)
	              .push_slice(revocation_hash)
	              .push_opcode(opcodes::all::OP_EQUALVERIFY)
	              .push_opcode(opcodes::all::OP_ELSE)
	              .push_opcode(opcodes::all::OP_SIZE)
	              .push_int(20 + txnum as i64)
	              .push_opcode(opcodes::all::OP_EQUALVERIFY)
	              .push_opcode(opcodes::all::OP_HASH160)
	              .push_slice(secret_hash)
	              .push_opcode(opcodes::all::OP_EQUALVERIFY)
	              .push_opcode(opcodes::all::OP_ENDIF)
	              .push_slice(&sender_key.serialize())
	              .push_opcode(opcodes::all::OP_ELSE)
	              .push_int(contest_delay as i64)
	              .push_opcode(opcodes::all::OP_CSV)
	              .push_opcode(opcodes::all::OP_DROP)
	              .push_slice(&receiver_key.serialize())
	              .push_opcode(opcodes::all::OP_ENDIF)
	              .push_opcode(opcodes::all::OP_CHECKSIG)
	              .into_script()
}

/// Gets the redeemscript for the 2-of-2 funding output, with the pubkeys in lexical order of
/// their serializations (smaller first).
///
/// The returned bool is true if the keys were swapped to sort them; spenders must order their
/// signatures to match.
pub fn make_funding_redeemscript(a_pubkey: &PublicKey, b_pubkey: &PublicKey) -> (Script, bool) {
	let a_ser = a_pubkey.serialize();
	let b_ser = b_pubkey.serialize();
	let (first, second, swapped) = if a_ser[..] < b_ser[..] {
		(a_ser, b_ser, false)
	} else {
		(b_ser, a_ser, true)
	};
	let script = Builder::new().push_opcode(opcodes::all::OP_PUSHNUM_2)
	                           .push_slice(&first)
	                           .push_slice(&second)
	                           .push_opcode(opcodes::all::OP_PUSHNUM_2)
	                           .push_opcode(opcodes::all::OP_CHECKMULTISIG)
	                           .into_script();
	(script, swapped)
}

/// Builds the p2wsh funding TxOut for the given pubkeys and channel value. You don't have to
/// remember the witness script preimage, as long as you remember the pubkeys involved.
pub fn build_funding_tx_out(a_pubkey: &PublicKey, b_pubkey: &PublicKey, value_satoshis: i64) -> Result<TxOut, APIError> {
	if value_satoshis < 0 {
		return Err(APIError::APIMisuseError { err: "Can't create a funding output with negative coins" });
	}
	let (funding_redeemscript, _) = make_funding_redeemscript(a_pubkey, b_pubkey);
	Ok(TxOut {
		value: value_satoshis as u64,
		script_pubkey: funding_redeemscript.to_v0_p2wsh(),
	})
}

/// Derives the public chain point which commits to an elkrem secret without revealing it.
///
/// Fails only if the secret is not a valid scalar, which for hash-chain outputs happens with
/// negligible probability.
pub fn elk_point_from_secret<T: secp256k1::Signing>(secp_ctx: &Secp256k1<T>, secret: &[u8; 32]) -> Result<PublicKey, ()> {
	let scalar = SecretKey::from_slice(secret).map_err(|_| ())?;
	Ok(PublicKey::from_secret_key(secp_ctx, &scalar))
}

/// Computes the digest both sides sign, one per candidate outcome of a push round.
///
/// The role flag keeps the initiator's and responder's signatures over the same round distinct;
/// the outcome number and its revocation hash bind each signature to exactly one of the N
/// parallel outputs.
pub fn prob_state_sighash(channel_point: &OutPoint, commitment_number: u64, as_initiator: bool, txnum: u8, secret_hash: &[u8; 20], revocation_hash: &[u8; 20]) -> Message {
	let mut sha = Sha256::engine();
	sha.input(b"prob state");
	sha.input(&channel_point.txid[..]);
	sha.input(&byte_utils::be32_to_array(channel_point.index));
	sha.input(&byte_utils::be64_to_array(commitment_number));
	sha.input(&[as_initiator as u8, txnum]);
	sha.input(secret_hash);
	sha.input(revocation_hash);
	let single = Sha256::from_engine(sha).into_inner();
	Message::from_slice(&Sha256::hash(&single).into_inner()[..]).unwrap()
}

#[cfg(test)]
mod tests {
	use super::*;

	use bitcoin::secp256k1::Secp256k1;
	use bitcoin::secp256k1::key::{SecretKey, PublicKey};

	use hex;

	fn test_key(fill: u8) -> PublicKey {
		let secp_ctx = Secp256k1::signing_only();
		PublicKey::from_secret_key(&secp_ctx, &SecretKey::from_slice(&[fill; 32]).unwrap())
	}

	#[test]
	fn commit_redeemscript_layout() {
		let rkey = test_key(1);
		let tkey = test_key(2);
		let script = get_commit_redeemscript(&rkey, 144, &tkey);

		let mut expected = Vec::new();
		expected.push(0x63); // OP_IF
		expected.push(33);
		expected.extend_from_slice(&rkey.serialize());
		expected.push(0x67); // OP_ELSE
		expected.extend_from_slice(&hex::decode("029000").unwrap()); // push 144
		expected.push(0xb2); // OP_CSV
		expected.push(0x75); // OP_DROP
		expected.push(33);
		expected.extend_from_slice(&tkey.serialize());
		expected.push(0x68); // OP_ENDIF
		expected.push(0xac); // OP_CHECKSIG
		assert_eq!(script.as_bytes(), &expected[..]);

		// deterministic under identical inputs
		assert_eq!(script, get_commit_redeemscript(&rkey, 144, &tkey));
	}

	#[test]
	fn prob_claim_redeemscript_layout() {
		let sender = test_key(3);
		let receiver = test_key(4);
		let revoc = [0x11; 20];
		let secret = [0x22; 20];
		let script = get_prob_claim_redeemscript(&sender, &receiver, &revoc, &secret, 3, 144);

		let mut expected = Vec::new();
		expected.push(0x63); // OP_IF
		expected.push(0x63); // OP_IF
		expected.push(0xa9); // OP_HASH160
		expected.push(20);
		expected.extend_from_slice(&revoc);
		expected.push(0x88); // OP_EQUALVERIFY
		expected.push(0x67); // OP_ELSE
		expected.push(0x82); // OP_SIZE
		expected.extend_from_slice(&hex::decode("0117").unwrap()); // push 23 == 20 + txnum
		expected.push(0x88); // OP_EQUALVERIFY
		expected.push(0xa9); // OP_HASH160
		expected.push(20);
		expected.extend_from_slice(&secret);
		expected.push(0x88); // OP_EQUALVERIFY
		expected.push(0x68); // OP_ENDIF
		expected.push(33);
		expected.extend_from_slice(&sender.serialize());
		expected.push(0x67); // OP_ELSE
		expected.extend_from_slice(&hex::decode("029000").unwrap()); // push 144
		expected.push(0xb2); // OP_CSV
		expected.push(0x75); // OP_DROP
		expected.push(33);
		expected.extend_from_slice(&receiver.serialize());
		expected.push(0x68); // OP_ENDIF
		expected.push(0xac); // OP_CHECKSIG
		assert_eq!(script.as_bytes(), &expected[..]);
	}

	#[test]
	fn prob_claim_redeemscript_varies_only_in_length_push() {
		let sender = test_key(3);
		let receiver = test_key(4);
		let revoc = [0x11; 20];
		let secret = [0x22; 20];
		let a = get_prob_claim_redeemscript(&sender, &receiver, &revoc, &secret, 3, 144);
		let b = get_prob_claim_redeemscript(&sender, &receiver, &revoc, &secret, 4, 144);
		assert_eq!(a.len(), b.len());
		let differing: Vec<usize> = a.as_bytes().iter().zip(b.as_bytes().iter()).enumerate()
			.filter(|&(_, (x, y))| x != y).map(|(i, _)| i).collect();
		assert_eq!(differing.len(), 1);
		assert_eq!(a.as_bytes()[differing[0]], 23);
		assert_eq!(b.as_bytes()[differing[0]], 24);
	}

	#[test]
	fn funding_redeemscript_sorts_keys() {
		let a = test_key(5);
		let b = test_key(6);
		let (script_ab, swapped_ab) = make_funding_redeemscript(&a, &b);
		let (script_ba, swapped_ba) = make_funding_redeemscript(&b, &a);
		assert_eq!(script_ab, script_ba);
		assert_ne!(swapped_ab, swapped_ba);

		// 2 <smaller> <larger> 2 CHECKMULTISIG
		let bytes = script_ab.as_bytes();
		assert_eq!(bytes.len(), 71);
		assert_eq!(bytes[0], 0x52);
		assert_eq!(bytes[1], 33);
		assert_eq!(bytes[35], 33);
		assert!(bytes[2..35] < bytes[36..69]);
		assert_eq!(bytes[69], 0x52);
		assert_eq!(bytes[70], 0xae);
	}

	#[test]
	fn funding_tx_out_rejects_negative_value() {
		let a = test_key(5);
		let b = test_key(6);
		assert!(build_funding_tx_out(&a, &b, -1).is_err());
		let out = build_funding_tx_out(&a, &b, 100_000).unwrap();
		assert_eq!(out.value, 100_000);
		assert!(out.script_pubkey.is_v0_p2wsh());
	}
}
