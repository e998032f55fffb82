//! Contains simple structs describing parts of transactions on the chain.

use bitcoin::hash_types::Txid;
use bitcoin::blockdata::transaction::OutPoint as BitcoinOutPoint;

use ln::msgs::DecodeError;
use util::ser::{Writeable, Writer, Readable};

use std::io::Read;

/// A reference to a transaction output.
///
/// Channels are identified on the wire by the outpoint of their funding output: 36 bytes, the
/// txid followed by the big-endian output index.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct OutPoint {
	/// The referenced transaction's txid.
	pub txid: Txid,
	/// The index of the referenced output in its transaction's vout.
	pub index: u32,
}

impl OutPoint {
	/// Creates a new `OutPoint` from the txid and the index.
	pub fn new(txid: Txid, index: u32) -> OutPoint {
		OutPoint { txid, index }
	}

	/// Converts this OutPoint into the OutPoint field as used by rust-bitcoin
	pub fn into_bitcoin_outpoint(self) -> BitcoinOutPoint {
		BitcoinOutPoint {
			txid: self.txid,
			vout: self.index,
		}
	}
}

impl Writeable for OutPoint {
	fn write<W: Writer>(&self, writer: &mut W) -> Result<(), ::std::io::Error> {
		self.txid.write(writer)?;
		self.index.write(writer)?;
		Ok(())
	}
}

impl Readable for OutPoint {
	fn read<R: Read>(reader: &mut R) -> Result<Self, DecodeError> {
		let txid = Readable::read(reader)?;
		let index = Readable::read(reader)?;
		Ok(OutPoint {
			txid,
			index,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::OutPoint;
	use util::ser::{Writeable, Readable};

	use bitcoin::hashes::Hash;
	use bitcoin::hash_types::Txid;

	#[test]
	fn test_outpoint_ser() {
		let outpoint = OutPoint::new(Txid::from_slice(&[42; 32]).unwrap(), 0x01020304);
		let encoded = outpoint.encode();
		assert_eq!(encoded.len(), 36);
		assert_eq!(&encoded[..32], &[42; 32][..]);
		assert_eq!(&encoded[32..], &[1, 2, 3, 4]);
		let read: OutPoint = Readable::read(&mut ::std::io::Cursor::new(&encoded)).unwrap();
		assert_eq!(read, outpoint);
	}
}
