//! A very simple serialization framework which is used to serialize/deserialize messages as well
//! as ChannelState instances, which are persisted between protocol rounds.

use std::io::{Read, Write};
use std::io::Error;

use ln::msgs::DecodeError;
use util::byte_utils::{be64_to_array, be32_to_array, be16_to_array, slice_to_be64, slice_to_be32, slice_to_be16};

use bitcoin::secp256k1::Signature;
use bitcoin::secp256k1::key::PublicKey;
use bitcoin::hash_types::Txid;
use bitcoin::hashes::Hash;

const MAX_BUF_SIZE: usize = 64 * 1024;

/// A trait that is similar to std::io::Write but has one extra function which can be used to size
/// buffers being written into.
pub trait Writer {
	/// Writes the given buf out. See std::io::Write::write_all for more
	fn write_all(&mut self, buf: &[u8]) -> Result<(), ::std::io::Error>;
	/// Hints that data of the given size is about the be written. This may not always be called
	/// prior to data being written and may be safely ignored.
	fn size_hint(&mut self, size: usize);
}

/// Wraps a Writer, implementing std::io::Write for callers which need one.
pub struct WriterWriteAdaptor<'a, W: Writer + 'a>(pub &'a mut W);
impl<'a, W: Writer + 'a> Write for WriterWriteAdaptor<'a, W> {
	fn write(&mut self, buf: &[u8]) -> Result<usize, ::std::io::Error> {
		self.0.write_all(buf)?;
		Ok(buf.len())
	}
	fn write_all(&mut self, buf: &[u8]) -> Result<(), ::std::io::Error> {
		self.0.write_all(buf)
	}
	fn flush(&mut self) -> Result<(), ::std::io::Error> {
		Ok(())
	}
}

pub(crate) struct VecWriter(pub Vec<u8>);
impl Writer for VecWriter {
	fn write_all(&mut self, buf: &[u8]) -> Result<(), ::std::io::Error> {
		self.0.extend_from_slice(buf);
		Ok(())
	}
	fn size_hint(&mut self, size: usize) {
		self.0.reserve_exact(size);
	}
}

/// A trait that various protocol types implement allowing them to be written out to a Writer
pub trait Writeable {
	/// Writes self out to the given Writer
	fn write<W: Writer>(&self, writer: &mut W) -> Result<(), Error>;

	/// Writes self out to a Vec<u8>
	fn encode(&self) -> Vec<u8> {
		let mut msg = VecWriter(Vec::new());
		self.write(&mut msg).unwrap();
		msg.0
	}
}

/// A trait that various protocol types implement allowing them to be read in from a Read
pub trait Readable
	where Self: Sized
{
	/// Reads a Self in from the given Read
	fn read<R: Read>(reader: &mut R) -> Result<Self, DecodeError>;
}

pub(crate) fn read_exact_or_short<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<(), DecodeError> {
	reader.read_exact(buf).map_err(|e| {
		if e.kind() == ::std::io::ErrorKind::UnexpectedEof { DecodeError::ShortRead } else { DecodeError::Io(e) }
	})
}

impl Writeable for u8 {
	#[inline]
	fn write<W: Writer>(&self, writer: &mut W) -> Result<(), Error> {
		writer.write_all(&[*self])
	}
}
impl Readable for u8 {
	#[inline]
	fn read<R: Read>(reader: &mut R) -> Result<u8, DecodeError> {
		let mut buf = [0; 1];
		read_exact_or_short(reader, &mut buf)?;
		Ok(buf[0])
	}
}

impl Writeable for bool {
	#[inline]
	fn write<W: Writer>(&self, writer: &mut W) -> Result<(), Error> {
		writer.write_all(&[if *self {1} else {0}])
	}
}
impl Readable for bool {
	#[inline]
	fn read<R: Read>(reader: &mut R) -> Result<bool, DecodeError> {
		match <u8 as Readable>::read(reader)? {
			0 => Ok(false),
			1 => Ok(true),
			_ => Err(DecodeError::InvalidValue),
		}
	}
}

macro_rules! impl_writeable_primitive {
	($val_type:ty, $meth_write:ident, $len: expr, $meth_read:ident) => {
		impl Writeable for $val_type {
			#[inline]
			fn write<W: Writer>(&self, writer: &mut W) -> Result<(), Error> {
				writer.write_all(&$meth_write(*self))
			}
		}
		impl Readable for $val_type {
			#[inline]
			fn read<R: Read>(reader: &mut R) -> Result<$val_type, DecodeError> {
				let mut buf = [0; $len];
				read_exact_or_short(reader, &mut buf)?;
				Ok($meth_read(&buf))
			}
		}
	}
}

impl_writeable_primitive!(u64, be64_to_array, 8, slice_to_be64);
impl_writeable_primitive!(u32, be32_to_array, 4, slice_to_be32);
impl_writeable_primitive!(u16, be16_to_array, 2, slice_to_be16);

macro_rules! impl_array {
	( $size:expr ) => (
		impl Writeable for [u8; $size] {
			#[inline]
			fn write<W: Writer>(&self, w: &mut W) -> Result<(), Error> {
				w.write_all(self)
			}
		}
		impl Readable for [u8; $size] {
			#[inline]
			fn read<R: Read>(r: &mut R) -> Result<Self, DecodeError> {
				let mut buf = [0u8; $size];
				read_exact_or_short(r, &mut buf)?;
				Ok(buf)
			}
		}
	);
}

impl_array!(20); // HASH160 outputs and their preimage roots
impl_array!(32); // elkrem secrets, txids
impl_array!(33); // compressed pubkeys
impl_array!(64); // compact signatures

impl Writeable for PublicKey {
	fn write<W: Writer>(&self, w: &mut W) -> Result<(), Error> {
		self.serialize().write(w)
	}
}
impl Readable for PublicKey {
	fn read<R: Read>(r: &mut R) -> Result<Self, DecodeError> {
		let buf: [u8; 33] = Readable::read(r)?;
		match PublicKey::from_slice(&buf) {
			Ok(key) => Ok(key),
			Err(_) => return Err(DecodeError::InvalidValue),
		}
	}
}

impl Writeable for Signature {
	fn write<W: Writer>(&self, w: &mut W) -> Result<(), Error> {
		self.serialize_compact().write(w)
	}
}
impl Readable for Signature {
	fn read<R: Read>(r: &mut R) -> Result<Self, DecodeError> {
		let mut buf = [0u8; 64];
		read_exact_or_short(r, &mut buf)?;
		match Signature::from_compact(&buf) {
			Ok(sig) => Ok(sig),
			Err(_) => return Err(DecodeError::InvalidValue),
		}
	}
}

impl Writeable for Txid {
	fn write<W: Writer>(&self, w: &mut W) -> Result<(), Error> {
		w.write_all(&self[..])
	}
}
impl Readable for Txid {
	fn read<R: Read>(r: &mut R) -> Result<Self, DecodeError> {
		let buf: [u8; 32] = Readable::read(r)?;
		Ok(Txid::from_slice(&buf[..]).unwrap())
	}
}

impl<T: Writeable> Writeable for Option<T> {
	fn write<W: Writer>(&self, w: &mut W) -> Result<(), Error> {
		match *self {
			None => 0u8.write(w)?,
			Some(ref data) => {
				1u8.write(w)?;
				data.write(w)?;
			}
		}
		Ok(())
	}
}
impl<T: Readable> Readable for Option<T> {
	fn read<R: Read>(r: &mut R) -> Result<Self, DecodeError> {
		match <u8 as Readable>::read(r)? {
			0 => Ok(None),
			1 => Ok(Some(Readable::read(r)?)),
			_ => Err(DecodeError::InvalidValue),
		}
	}
}

// Vectors are only used in the persisted ChannelState encoding, where a u16 count prefix is
// fine; the peer wire messages carry counts implicitly and encode their lists by hand.
macro_rules! impl_vec {
	($ty: ty) => {
		impl Writeable for Vec<$ty> {
			#[inline]
			fn write<W: Writer>(&self, w: &mut W) -> Result<(), Error> {
				(self.len() as u16).write(w)?;
				for e in self.iter() {
					e.write(w)?;
				}
				Ok(())
			}
		}
		impl Readable for Vec<$ty> {
			#[inline]
			fn read<R: Read>(r: &mut R) -> Result<Self, DecodeError> {
				let len: u16 = Readable::read(r)?;
				let byte_size = (len as usize).saturating_mul(::std::mem::size_of::<$ty>());
				if byte_size > MAX_BUF_SIZE {
					return Err(DecodeError::BadLengthDescriptor);
				}
				let mut ret = Vec::with_capacity(len as usize);
				for _ in 0..len { ret.push(Readable::read(r)?); }
				Ok(ret)
			}
		}
	}
}

impl_vec!(u8);
impl_vec!([u8; 20]);
impl_vec!(Signature);

#[cfg(test)]
mod tests {
	use super::{Readable, Writeable};
	use ln::msgs::DecodeError;
	use std::io::Cursor;

	#[test]
	fn primitives_round_trip() {
		assert_eq!(0xdeadbeefu32.encode(), vec![0xde, 0xad, 0xbe, 0xef]);
		assert_eq!(<u32 as Readable>::read(&mut Cursor::new(&[0xde, 0xad, 0xbe, 0xef][..])).unwrap(), 0xdeadbeef);
		let arr = [42u8; 20];
		assert_eq!(<[u8; 20] as Readable>::read(&mut Cursor::new(&arr.encode())).unwrap(), arr);
	}

	#[test]
	fn short_read() {
		match <u64 as Readable>::read(&mut Cursor::new(&[0u8; 3][..])) {
			Err(DecodeError::ShortRead) => {},
			_ => panic!(),
		}
	}

	#[test]
	fn vec_round_trip() {
		let v: Vec<[u8; 20]> = vec![[1; 20], [2; 20], [3; 20]];
		let encoded = v.encode();
		assert_eq!(encoded.len(), 2 + 3 * 20);
		assert_eq!(<Vec<[u8; 20]> as Readable>::read(&mut Cursor::new(&encoded)).unwrap(), v);
	}
}
