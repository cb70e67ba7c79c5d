//! Generic write and parse protocol shared by every persisted entity.
//!
//! An entity maps to one chunk holding one sub-chunk per field. Writers implement
//! [`BinaryWrite`] over a read-only view of the entity; readers implement [`ChunkParser`],
//! which receives the sub-chunks one by one and assembles the entity once the chunk is
//! exhausted.

use crate::{
	chunk::BinaryChunk,
	codec::{
		Codec,
		Endianness
	},
	error::CmshError,
	tag::ChunkType,
	version::{
		FormatVersion,
		Shapes
	}
};

#[cfg(feature = "export")]
pub use self::export::*;

#[cfg(feature = "import")]
pub use self::import::*;

#[cfg(feature = "export")]
mod export {
	use super::*;

	/// Target of an export: which version to emit and in which shapes
	#[derive(Clone, Copy, Debug, PartialEq)]
	pub struct WriteContext {
		pub version: FormatVersion,
		pub shapes: Shapes,
		pub host: Endianness,
	}

	impl WriteContext {
		pub fn new(version: FormatVersion, host: Endianness) -> WriteContext {
			WriteContext {
				version: version,
				shapes: Shapes::for_version(version),
				host: host,
			}
		}
	}

	pub trait BinaryWrite {
		const CHUNK: ChunkType;

		/// Appends one sub-chunk per field to `chunk`
		fn write_fields(&self, chunk: &mut BinaryChunk, ctx: &WriteContext) -> Result<(), CmshError>;
	}

	fn open_chunk(kind: ChunkType, ctx: &WriteContext) -> Result<BinaryChunk, CmshError> {
		if kind.is_deprecated() {
			return Err(CmshError::Deprecated(kind.tag()));
		}

		let mut chunk = BinaryChunk::new(kind);
		chunk.set_host(ctx.host);
		Ok(chunk)
	}

	/// Serializes an entity into a finalised chunk
	pub fn write_entity<T: BinaryWrite>(entity: &T, ctx: &WriteContext) -> Result<BinaryChunk, CmshError> {
		let mut chunk = open_chunk(T::CHUNK, ctx)?;
		entity.write_fields(&mut chunk, ctx)?;
		chunk.finalise();
		Ok(chunk)
	}

	pub fn write_sub_entity<T: BinaryWrite>(entity: &T, parent: &mut BinaryChunk, ctx: &WriteContext)
		-> Result<(), CmshError>
	{
		parent.add_sub_chunk(&write_entity(entity, ctx)?)
	}

	pub fn write_value<T: Codec>(kind: ChunkType, value: &T, parent: &mut BinaryChunk, ctx: &WriteContext)
		-> Result<(), CmshError>
	{
		let mut chunk = open_chunk(kind, ctx)?;
		chunk.put(value)?;
		chunk.finalise();
		parent.add_sub_chunk(&chunk)
	}

	pub fn write_values<T: Codec>(kind: ChunkType, values: &[T], parent: &mut BinaryChunk,
		ctx: &WriteContext) -> Result<(), CmshError>
	{
		let mut chunk = open_chunk(kind, ctx)?;
		chunk.put_slice(values)?;
		chunk.finalise();
		parent.add_sub_chunk(&chunk)
	}

	/// Names are stored as raw UTF-8 without terminator
	pub fn write_name(kind: ChunkType, name: &str, parent: &mut BinaryChunk, ctx: &WriteContext)
		-> Result<(), CmshError>
	{
		let mut chunk = open_chunk(kind, ctx)?;
		chunk.add(name.as_bytes())?;
		chunk.finalise();
		parent.add_sub_chunk(&chunk)
	}
}

#[cfg(feature = "import")]
mod import {
	use tracing::{
		debug,
		warn
	};

	use super::*;
	use crate::{
		codec,
		error::Warning,
		tag::tag_name,
		ImportFlag
	};

	/// State carried through the parse of one stream
	#[derive(Clone, Debug, PartialEq)]
	pub struct ParseContext {
		pub version: FormatVersion,
		pub shapes: Shapes,
		pub flags: ImportFlag,
		pub warnings: Vec<Warning>,
		/// Number of unknown or deprecated chunks passed over
		pub skipped: usize,
	}

	impl ParseContext {
		pub fn new(version: FormatVersion, flags: ImportFlag) -> ParseContext {
			ParseContext {
				version: version,
				shapes: Shapes::for_version(version),
				flags: flags,
				warnings: vec![],
				skipped: 0,
			}
		}

		/// Switches to the shapes of the version declared by the stream
		pub fn set_version(&mut self, version: FormatVersion) {
			self.version = version;
			self.shapes = Shapes::for_version(version);
		}

		/// Records a sub-entity that was dropped or defaulted
		pub fn warn<S: Into<String>>(&mut self, entity: &'static str, tag: u64, reason: S) {
			let reason = reason.into();
			warn!(entity = entity, chunk = %tag_name(tag), reason = %reason, "sub-entity dropped");

			self.warnings.push(Warning::SubEntityMissing {
				entity: entity,
				tag: tag,
				reason: reason,
			});
		}

		/// Classifies a sub-chunk, returning `None` for chunks to pass over
		pub fn known_kind(&mut self, sub: &BinaryChunk) -> Option<ChunkType> {
			match sub.kind() {
				Some(kind) if !kind.is_deprecated() => Some(kind),
				Some(kind) => {
					debug!(chunk = ?kind, offset = sub.header_offset(), "skipping deprecated chunk");
					self.skipped += 1;
					None
				}
				None => {
					debug!(chunk = %tag_name(sub.tag()), offset = sub.header_offset(), "skipping unknown chunk");
					self.skipped += 1;
					None
				}
			}
		}
	}

	pub fn misplaced(sub: &BinaryChunk, parent: u64) -> CmshError {
		CmshError::MisplacedChunk {
			tag: sub.tag(),
			parent: parent,
			offset: sub.header_offset(),
		}
	}

	pub trait ChunkParser: Default {
		type Output;
		const CHUNK: ChunkType;

		/// Consumes one field. Returns `false` when `kind` is not a field of this entity.
		fn parse_field(&mut self, kind: ChunkType, sub: &mut BinaryChunk, ctx: &mut ParseContext)
			-> Result<bool, CmshError>;

		/// Assembles the entity once every field was seen
		fn finish(self, ctx: &mut ParseContext) -> Result<Self::Output, CmshError>;
	}

	/// Parses the fields of `chunk` until it is exhausted
	pub fn parse_entity<P: ChunkParser>(chunk: &mut BinaryChunk, ctx: &mut ParseContext)
		-> Result<P::Output, CmshError>
	{
		let mut parser = P::default();

		while let Some(mut sub) = chunk.get_sub_chunk()? {
			let kind = match ctx.known_kind(&sub) {
				Some(kind) => kind,
				None => continue,
			};

			if !parser.parse_field(kind, &mut sub, ctx)? {
				return Err(misplaced(&sub, chunk.tag()));
			}
		}

		parser.finish(ctx)
	}

	fn mismatch<T>(chunk: &BinaryChunk) -> CmshError {
		CmshError::FieldTypeMismatch {
			tag: chunk.tag(),
			offset: chunk.offset(),
			size: chunk.remaining(),
			expected: std::any::type_name::<T>(),
		}
	}

	/// Reads a leaf chunk holding exactly one `T`. A shorter payload is truncated.
	pub fn parse_value<T: Codec>(chunk: &mut BinaryChunk) -> Result<T, CmshError> {
		if chunk.remaining() > T::SIZE {
			return Err(mismatch::<T>(chunk));
		}
		chunk.take()
	}

	/// Reads a leaf chunk holding a whole number of `T`
	pub fn parse_values<T: Codec>(chunk: &mut BinaryChunk) -> Result<Vec<T>, CmshError> {
		if chunk.remaining() > 0 && chunk.remaining() < T::SIZE {
			return Err(chunk.truncated(T::SIZE));
		}
		if chunk.remaining() % T::SIZE != 0 {
			return Err(mismatch::<Vec<T>>(chunk));
		}

		let mut bytes = vec![0; chunk.remaining()];
		chunk.get(&mut bytes)?;
		Ok(codec::decode_vec(chunk.host(), &bytes))
	}

	pub fn parse_name(chunk: &mut BinaryChunk) -> Result<String, CmshError> {
		let mut bytes = vec![0; chunk.remaining()];
		chunk.get(&mut bytes)?;

		String::from_utf8(bytes).map_err(|e| CmshError::FieldTypeMismatch {
			tag: chunk.tag(),
			offset: chunk.offset() - e.as_bytes().len(),
			size: e.as_bytes().len(),
			expected: "UTF-8 string",
		})
	}
}
