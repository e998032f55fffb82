use chain::keysinterface;
use chain::keysinterface::{InMemoryChannelKeys, ElkremSender, KeysInterface};
use ln::channel::ChannelState;
use ln::channelstore::{ChannelStore, ChannelStoreError};
use util::byte_utils;
use util::logger::{Logger, Level, Record};
use util::ser::{Writeable, Readable};

use bitcoin::network::constants::Network;
use bitcoin::hashes::{Hash, HashEngine};
use bitcoin::hashes::sha256::Hash as Sha256;

use std::collections::HashMap;
use std::io::Cursor;
use std::sync::Mutex;

/// A Logger which captures every line in order so tests can assert that the quarantine and
/// busy paths actually logged, and prints with the owning node's label for two-node traces.
pub struct TestLogger {
	level: Level,
	id: String,
	pub lines: Mutex<Vec<(Level, String)>>,
}

impl TestLogger {
	pub fn new() -> TestLogger {
		Self::with_id("".to_owned())
	}
	pub fn with_id(id: String) -> TestLogger {
		TestLogger {
			level: Level::Trace,
			id,
			lines: Mutex::new(Vec::new()),
		}
	}
	pub fn enable(&mut self, level: Level) {
		self.level = level;
	}
	/// Counts the captured lines at the given level whose message contains the fragment.
	pub fn count_lines_containing(&self, level: Level, fragment: &str) -> usize {
		let lines = self.lines.lock().unwrap();
		lines.iter().filter(|entry| entry.0 == level && entry.1.contains(fragment)).count()
	}
}

impl Logger for TestLogger {
	fn log(&self, record: &Record) {
		self.lines.lock().unwrap().push((record.level, format!("{}", record.args)));
		if self.level >= record.level {
			println!("{:<5} [{}] {}: {}", record.level.to_string(), self.id, record.module_path, record.args);
		}
	}
}

/// An in-memory ChannelStore which serializes every save and deserializes every reload, so the
/// persisted encoding is exercised on each protocol step. `update_ret` injects failures.
pub struct TestStore {
	pub states: Mutex<HashMap<u32, Vec<u8>>>,
	pub update_ret: Mutex<Result<(), ChannelStoreError>>,
}

impl TestStore {
	pub fn new() -> TestStore {
		TestStore {
			states: Mutex::new(HashMap::new()),
			update_ret: Mutex::new(Ok(())),
		}
	}
	pub fn set_update_ret(&self, ret: Result<(), ChannelStoreError>) {
		*self.update_ret.lock().unwrap() = ret;
	}
	/// Reads the persisted state back out, as an operator inspecting the store would.
	pub fn read_state(&self, channel_idx: u32) -> ChannelState {
		let states = self.states.lock().unwrap();
		Readable::read(&mut Cursor::new(states.get(&channel_idx).unwrap())).unwrap()
	}
}

impl ChannelStore for TestStore {
	fn reload_channel_state(&self, channel_idx: u32) -> Result<ChannelState, ChannelStoreError> {
		self.update_ret.lock().unwrap().clone()?;
		match self.states.lock().unwrap().get(&channel_idx) {
			Some(bytes) => Ok(Readable::read(&mut Cursor::new(bytes)).unwrap()),
			None => Err(ChannelStoreError::PermanentFailure),
		}
	}

	fn persist_channel_state(&self, channel_idx: u32, state: &ChannelState) -> Result<(), ChannelStoreError> {
		self.update_ret.lock().unwrap().clone()?;
		// Every save should survive the round trip to disk
		let encoded = state.encode();
		let reread: ChannelState = Readable::read(&mut Cursor::new(&encoded)).unwrap();
		assert!(reread == *state);
		self.states.lock().unwrap().insert(channel_idx, encoded);
		Ok(())
	}
}

pub struct TestKeysInterface {
	pub backing: keysinterface::KeysManager,
}

impl TestKeysInterface {
	pub fn new(seed: &[u8; 32], network: Network) -> TestKeysInterface {
		TestKeysInterface {
			// fixed startup time keeps every draw deterministic for a given seed
			backing: keysinterface::KeysManager::new(seed, network, 0, 1),
		}
	}
}

impl KeysInterface for TestKeysInterface {
	type ChanKeySigner = InMemoryChannelKeys;

	fn get_channel_keys(&self, channel_value_satoshis: u64) -> InMemoryChannelKeys {
		self.backing.get_channel_keys(channel_value_satoshis)
	}
	fn get_secure_random_bytes(&self) -> [u8; 32] {
		self.backing.get_secure_random_bytes()
	}
}

/// A stand-in for an elkrem sender: not the real tree, just a seeded chain honoring the
/// at-index contract (deterministic per index, bounded range).
#[derive(Clone)]
pub struct TestElkremSender {
	seed: [u8; 32],
}

impl TestElkremSender {
	pub fn new(seed: [u8; 32]) -> TestElkremSender {
		TestElkremSender {
			seed,
		}
	}
}

impl ElkremSender for TestElkremSender {
	fn at_index(&self, index: u64) -> Result<[u8; 32], ()> {
		if index >= 1 << 48 {
			return Err(());
		}
		let mut sha = Sha256::engine();
		sha.input(&self.seed);
		sha.input(&byte_utils::be64_to_array(index));
		Ok(Sha256::from_engine(sha).into_inner())
	}
}
