use std::io::{
	Read,
	Write
};

use tracing::trace;

use crate::{
	codec::{
		self,
		Codec,
		Endianness
	},
	error::CmshError,
	tag::{
		ChunkType,
		tag_name
	}
};

/// Size of a chunk header: 8-byte tag followed by a 4-byte payload length
pub const HEADER_SIZE: usize = 12;

/// A tagged, length-prefixed block of bytes, possibly holding nested chunks.
///
/// When writing, data is appended until [`BinaryChunk::finalise`] freezes the chunk.
/// When reading, a cursor walks the payload through [`BinaryChunk::get`] and
/// [`BinaryChunk::get_sub_chunk`].
#[derive(Clone, Debug, PartialEq)]
pub struct BinaryChunk {
	tag: u64,
	data: Vec<u8>,
	index: usize,
	finalised: bool,
	host: Endianness,
	/// Absolute stream offset of the first payload byte
	origin: usize,
}

impl BinaryChunk {
	pub fn new(kind: ChunkType) -> BinaryChunk {
		BinaryChunk::with_tag(kind.tag())
	}

	/// Chunk with an arbitrary tag, including ones unknown to this reader
	pub fn with_tag(tag: u64) -> BinaryChunk {
		BinaryChunk {
			tag: tag,
			data: vec![],
			index: 0,
			finalised: false,
			host: Endianness::native(),
			origin: 0,
		}
	}

	pub fn tag(&self) -> u64 {
		self.tag
	}

	/// Known chunk type, or `None` for tags this reader does not understand
	pub fn kind(&self) -> Option<ChunkType> {
		ChunkType::from_tag(self.tag)
	}

	pub fn host(&self) -> Endianness {
		self.host
	}

	/// Overrides the byte order assumed for the host when converting values
	pub fn set_host(&mut self, host: Endianness) {
		self.host = host;
	}

	fn ensure_open(&self, extra: usize) -> Result<(), CmshError> {
		if self.finalised {
			return Err(CmshError::Finalised(self.tag));
		}

		let length = (self.data.len() + extra) as u64;
		if length > u32::MAX as u64 {
			return Err(CmshError::LengthOverflow {
				tag: self.tag,
				length: length,
				limit: u32::MAX as u64,
			});
		}

		Ok(())
	}

	/// Appends raw bytes to the payload
	pub fn add(&mut self, bytes: &[u8]) -> Result<(), CmshError> {
		self.ensure_open(bytes.len())?;
		self.data.extend_from_slice(bytes);
		Ok(())
	}

	/// Appends a finalised chunk, header included
	pub fn add_sub_chunk(&mut self, child: &BinaryChunk) -> Result<(), CmshError> {
		if !child.finalised {
			return Err(CmshError::NotFinalised(child.tag));
		}
		self.ensure_open(HEADER_SIZE + child.data.len())?;

		codec::encode(&child.tag, self.host, &mut self.data);
		codec::encode(&(child.data.len() as u32), self.host, &mut self.data);
		self.data.extend_from_slice(&child.data);
		Ok(())
	}

	/// Appends a value in wire byte order
	pub fn put<T: Codec>(&mut self, value: &T) -> Result<(), CmshError> {
		self.ensure_open(T::SIZE)?;
		codec::encode(value, self.host, &mut self.data);
		Ok(())
	}

	pub fn put_slice<T: Codec>(&mut self, values: &[T]) -> Result<(), CmshError> {
		self.ensure_open(values.len() * T::SIZE)?;
		codec::encode_slice(values, self.host, &mut self.data);
		Ok(())
	}

	/// Freezes the payload. Nothing can be added afterwards.
	pub fn finalise(&mut self) {
		self.data.shrink_to_fit();
		self.finalised = true;
	}

	pub fn is_finalised(&self) -> bool {
		self.finalised
	}

	/// Payload bytes, excluding the header
	pub fn data(&self) -> &[u8] {
		&self.data
	}

	pub fn data_size(&self) -> usize {
		self.data.len()
	}

	/// Whether `size` more bytes can be read from the cursor
	pub fn check_available(&self, size: usize) -> bool {
		self.index + size <= self.data.len()
	}

	pub fn remaining(&self) -> usize {
		self.data.len() - self.index
	}

	/// Absolute stream offset of the cursor
	pub fn offset(&self) -> usize {
		self.origin + self.index
	}

	/// Absolute stream offset of this chunk's header
	pub fn header_offset(&self) -> usize {
		self.origin.saturating_sub(HEADER_SIZE)
	}

	/// Error for a read of `needed` bytes at the cursor that the payload cannot satisfy
	pub fn truncated(&self, needed: usize) -> CmshError {
		CmshError::StreamTruncated {
			tag: self.tag,
			offset: self.offset(),
			needed: needed,
			available: self.remaining(),
		}
	}

	/// Fills `dest` entirely from the cursor, or fails without moving it
	pub fn get(&mut self, dest: &mut [u8]) -> Result<(), CmshError> {
		if !self.check_available(dest.len()) {
			return Err(self.truncated(dest.len()));
		}

		dest.copy_from_slice(&self.data[self.index..self.index + dest.len()]);
		self.index += dest.len();
		Ok(())
	}

	/// Reads one value in wire byte order
	pub fn take<T: Codec>(&mut self) -> Result<T, CmshError> {
		if !self.check_available(T::SIZE) {
			return Err(self.truncated(T::SIZE));
		}

		let mut bytes = &self.data[self.index..];
		let value = codec::decode(self.host, &mut bytes);
		self.index += T::SIZE;
		Ok(value)
	}

	/// Reads the next nested chunk, or `None` once the payload is exhausted
	pub fn get_sub_chunk(&mut self) -> Result<Option<BinaryChunk>, CmshError> {
		if self.remaining() == 0 {
			return Ok(None);
		}
		if !self.check_available(HEADER_SIZE) {
			return Err(self.truncated(HEADER_SIZE));
		}

		let mut header = &self.data[self.index..self.index + HEADER_SIZE];
		let tag: u64 = codec::decode(self.host, &mut header);
		let length: u32 = codec::decode(self.host, &mut header);
		let length = length as usize;

		if !self.check_available(HEADER_SIZE + length) {
			return Err(CmshError::StreamTruncated {
				tag: tag,
				offset: self.offset() + HEADER_SIZE,
				needed: length,
				available: self.remaining() - HEADER_SIZE,
			});
		}

		let start = self.index + HEADER_SIZE;
		let child = BinaryChunk {
			tag: tag,
			data: self.data[start..start + length].to_vec(),
			index: 0,
			finalised: true,
			host: self.host,
			origin: self.origin + start,
		};

		self.index = start + length;
		Ok(Some(child))
	}

	/// Rewinds the cursor to the start of the payload
	pub fn reset_parse(&mut self) {
		self.index = 0;
	}

	/// Moves the cursor past the end of the payload
	pub fn end_parse(&mut self) {
		self.index = self.data.len();
	}

	/// Reads a chunk header starting at absolute stream offset `origin`, returning the tag
	/// and the declared payload length
	pub fn read_header<R>(buf: &mut R, host: Endianness, origin: usize) -> Result<(u64, u32), CmshError>
	where
		R: Read,
	{
		let mut header = [0u8; HEADER_SIZE];
		let got = read_full(buf, &mut header)?;
		if got < HEADER_SIZE {
			return Err(CmshError::StreamTruncated {
				tag: 0,
				offset: origin + got,
				needed: HEADER_SIZE,
				available: got,
			});
		}

		let mut bytes = &header[..];
		let tag = codec::decode(host, &mut bytes);
		let length = codec::decode(host, &mut bytes);
		Ok((tag, length))
	}

	/// Reads the payload of a chunk whose header was just read. `origin` is the absolute
	/// offset of the first payload byte.
	pub fn read_payload<R>(buf: &mut R, tag: u64, length: u32, host: Endianness, origin: usize)
		-> Result<BinaryChunk, CmshError>
	where
		R: Read,
	{
		let mut data = Vec::with_capacity(length as usize);
		buf.by_ref().take(length as u64).read_to_end(&mut data)?;
		if data.len() < length as usize {
			return Err(CmshError::StreamTruncated {
				tag: tag,
				offset: origin + data.len(),
				needed: length as usize,
				available: data.len(),
			});
		}

		trace!(tag = %tag_name(tag), length = length, offset = origin, "read chunk");

		Ok(BinaryChunk {
			tag: tag,
			data: data,
			index: 0,
			finalised: true,
			host: host,
			origin: origin,
		})
	}

	/// Reads a whole chunk whose header starts at absolute stream offset `origin`.
	/// Payloads declared longer than `limit` are refused before any allocation.
	pub fn read<R>(buf: &mut R, host: Endianness, origin: usize, limit: u64)
		-> Result<BinaryChunk, CmshError>
	where
		R: Read,
	{
		let (tag, length) = BinaryChunk::read_header(buf, host, origin)?;

		if length as u64 > limit {
			return Err(CmshError::LengthOverflow {
				tag: tag,
				length: length as u64,
				limit: limit,
			});
		}

		BinaryChunk::read_payload(buf, tag, length, host, origin + HEADER_SIZE)
	}

	/// Writes the header and payload. The chunk must be finalised.
	pub fn write<W>(&self, buf: &mut W) -> Result<(), CmshError>
	where
		W: Write,
	{
		if !self.finalised {
			return Err(CmshError::NotFinalised(self.tag));
		}

		let mut header = Vec::with_capacity(HEADER_SIZE);
		codec::encode(&self.tag, self.host, &mut header);
		codec::encode(&(self.data.len() as u32), self.host, &mut header);

		buf.write_all(&header)?;
		buf.write_all(&self.data)?;
		Ok(())
	}

	/// Full encoding of the chunk, as [`BinaryChunk::write`] would emit it
	pub fn to_bytes(&self) -> Result<Vec<u8>, CmshError> {
		let mut out = Vec::with_capacity(HEADER_SIZE + self.data.len());
		self.write(&mut out)?;
		Ok(out)
	}
}

/// Reads until `dest` is full or the stream ends, returning the byte count
fn read_full<R: Read>(buf: &mut R, dest: &mut [u8]) -> Result<usize, CmshError> {
	let mut got = 0;
	while got < dest.len() {
		match buf.read(&mut dest[got..]) {
			Ok(0) => break,
			Ok(n) => got += n,
			Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
			Err(e) => return Err(e.into()),
		}
	}
	Ok(got)
}

#[cfg(test)]
mod tests {
	use std::io::Cursor;

	use rgk_core::tag8;

	use super::*;

	fn leaf(kind: ChunkType, value: u32) -> BinaryChunk {
		let mut chunk = BinaryChunk::new(kind);
		chunk.put(&value).unwrap();
		chunk.finalise();
		chunk
	}

	#[test]
	fn test_layout() {
		let chunk = leaf(ChunkType::Version, 0x0103_0000);
		let bytes = chunk.to_bytes().unwrap();

		assert_eq!(&bytes[..8], b"CMSHVERS");
		assert_eq!(&bytes[8..12], &[0, 0, 0, 4]);
		assert_eq!(&bytes[12..], &[1, 3, 0, 0]);
	}

	#[test]
	fn test_add_sub_chunk_matches_write() {
		let child = leaf(ChunkType::SubmeshVertexCount, 3);
		let mut parent = BinaryChunk::new(ChunkType::Submesh);
		parent.add_sub_chunk(&child).unwrap();
		parent.finalise();

		assert_eq!(parent.data(), child.to_bytes().unwrap().as_slice());
		assert_eq!(parent.data_size(), HEADER_SIZE + 4);
	}

	#[test]
	fn test_lifecycle_errors() {
		let mut open = BinaryChunk::new(ChunkType::Name);
		open.add(b"abc").unwrap();

		let mut parent = BinaryChunk::new(ChunkType::Mesh);
		assert!(matches!(parent.add_sub_chunk(&open), Err(CmshError::NotFinalised(_))));
		assert!(matches!(open.write(&mut vec![]), Err(CmshError::NotFinalised(_))));

		open.finalise();
		assert!(matches!(open.add(b"d"), Err(CmshError::Finalised(_))));
		assert!(matches!(open.put(&1u32), Err(CmshError::Finalised(_))));
		assert_eq!(open.data(), b"abc");
	}

	#[test]
	fn test_get_exact_and_partial() {
		let mut chunk = BinaryChunk::new(ChunkType::Name);
		chunk.add(&[1, 2, 3, 4]).unwrap();
		chunk.finalise();

		let mut dest = [0u8; 4];
		assert!(chunk.check_available(4));
		chunk.get(&mut dest).unwrap();
		assert_eq!(dest, [1, 2, 3, 4]);
		assert_eq!(chunk.remaining(), 0);

		chunk.reset_parse();
		let mut big = [0u8; 5];
		assert!(!chunk.check_available(5));
		match chunk.get(&mut big) {
			Err(CmshError::StreamTruncated { needed, available, .. }) => {
				assert_eq!(needed, 5);
				assert_eq!(available, 4);
			}
			other => panic!("unexpected {:?}", other),
		}
		// failed reads leave the cursor alone
		assert_eq!(chunk.remaining(), 4);

		chunk.end_parse();
		assert!(chunk.get_sub_chunk().unwrap().is_none());
	}

	#[test]
	fn test_sub_chunks() {
		let mut parent = BinaryChunk::new(ChunkType::Submesh);
		parent.add_sub_chunk(&leaf(ChunkType::SubmeshVertexCount, 3)).unwrap();
		parent.add_sub_chunk(&leaf(ChunkType::SubmeshFaceCount, 1)).unwrap();
		parent.finalise();

		let mut first = parent.get_sub_chunk().unwrap().unwrap();
		assert_eq!(first.kind(), Some(ChunkType::SubmeshVertexCount));
		assert_eq!(first.offset(), HEADER_SIZE);
		assert_eq!(first.take::<u32>().unwrap(), 3);

		let mut second = parent.get_sub_chunk().unwrap().unwrap();
		assert_eq!(second.kind(), Some(ChunkType::SubmeshFaceCount));
		assert_eq!(second.take::<u32>().unwrap(), 1);
		assert!(second.take::<u32>().is_err());

		assert!(parent.get_sub_chunk().unwrap().is_none());
	}

	#[test]
	fn test_truncated_sub_chunk() {
		let mut parent = BinaryChunk::new(ChunkType::Mesh);
		parent.put(&tag8!(b"NAME    ")).unwrap();
		parent.put(&100u32).unwrap();
		parent.add(b"short").unwrap();
		parent.finalise();

		assert!(matches!(parent.get_sub_chunk(),
			Err(CmshError::StreamTruncated { needed: 100, available: 5, .. })));
	}

	#[test]
	fn test_read_write() {
		let mut root = BinaryChunk::new(ChunkType::CmshFile);
		root.add_sub_chunk(&leaf(ChunkType::Version, 7)).unwrap();
		root.finalise();

		let bytes = root.to_bytes().unwrap();
		let read = BinaryChunk::read(&mut Cursor::new(&bytes), Endianness::native(), 0, u32::MAX as u64)
			.unwrap();
		assert_eq!(read.tag(), root.tag());
		assert_eq!(read.data(), root.data());

		let err = BinaryChunk::read(&mut Cursor::new(&bytes[..bytes.len() - 1]), Endianness::native(),
			0, u32::MAX as u64).unwrap_err();
		assert!(matches!(err, CmshError::StreamTruncated { .. }));

		let err = BinaryChunk::read(&mut Cursor::new(&bytes[..6]), Endianness::native(), 0,
			u32::MAX as u64).unwrap_err();
		assert!(matches!(err, CmshError::StreamTruncated { needed: HEADER_SIZE, available: 6, .. }));

		let err = BinaryChunk::read(&mut Cursor::new(&bytes), Endianness::native(), 0, 4).unwrap_err();
		assert!(matches!(err, CmshError::LengthOverflow { limit: 4, .. }));
	}

	#[test]
	fn test_host_order_portable() {
		let mut le = BinaryChunk::new(ChunkType::AnimationLength);
		le.set_host(Endianness::Little);
		le.put(&2.5f32).unwrap();
		le.finalise();

		let mut be = BinaryChunk::new(ChunkType::AnimationLength);
		be.set_host(Endianness::Big);
		be.put(&2.5f32).unwrap();
		be.finalise();

		assert_eq!(le.to_bytes().unwrap(), be.to_bytes().unwrap());

		let bytes = le.to_bytes().unwrap();
		let mut read = BinaryChunk::read(&mut Cursor::new(bytes), Endianness::Big, 0, 64).unwrap();
		assert_eq!(read.take::<f32>().unwrap(), 2.5);
	}
}
