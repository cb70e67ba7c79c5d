use crate::{
	chunk::BinaryChunk,
	error::CmshError,
	tag::ChunkType,
	version::FormatVersion
};

#[cfg(feature = "export")]
use crate::protocol::{
	BinaryWrite,
	WriteContext,
	write_value
};

#[cfg(feature = "import")]
use crate::protocol::{
	ChunkParser,
	ParseContext,
	parse_value
};

/// First child of every root chunk
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Header {
	pub version: FormatVersion,
}

#[cfg(feature = "export")]
impl BinaryWrite for Header {
	const CHUNK: ChunkType = ChunkType::Header;

	fn write_fields(&self, chunk: &mut BinaryChunk, ctx: &WriteContext) -> Result<(), CmshError> {
		write_value(ChunkType::Version, &self.version.pack(), chunk, ctx)
	}
}

#[cfg(feature = "import")]
#[derive(Default)]
pub struct HeaderParser {
	version: Option<FormatVersion>,
}

#[cfg(feature = "import")]
impl ChunkParser for HeaderParser {
	type Output = Header;
	const CHUNK: ChunkType = ChunkType::Header;

	fn parse_field(&mut self, kind: ChunkType, sub: &mut BinaryChunk, _ctx: &mut ParseContext)
		-> Result<bool, CmshError>
	{
		match kind {
			ChunkType::Version => self.version = Some(FormatVersion::unpack(parse_value(sub)?)),
			_ => return Ok(false),
		}

		Ok(true)
	}

	fn finish(self, _ctx: &mut ParseContext) -> Result<Header, CmshError> {
		match self.version {
			Some(v) => Ok(Header { version: v }),
			None => Err(CmshError::MissingHeader),
		}
	}
}

#[cfg(all(test, feature = "import", feature = "export"))]
mod tests {
	use super::*;
	use crate::{
		codec::Endianness,
		protocol::{
			parse_entity,
			write_entity
		},
		version::CURRENT,
		ImportFlag
	};

	#[test]
	fn test_header() {
		let wctx = WriteContext::new(CURRENT, Endianness::native());
		let mut chunk = write_entity(&Header { version: FormatVersion::new(1, 1, 7) }, &wctx).unwrap();

		// CMSHVERS leaf: 12-byte header and the packed version
		assert_eq!(&chunk.data()[12..], &[1, 1, 0, 7]);

		let mut ctx = ParseContext::new(CURRENT, ImportFlag::empty());
		let header = parse_entity::<HeaderParser>(&mut chunk, &mut ctx).unwrap();
		assert_eq!(header.version, FormatVersion::new(1, 1, 7));
	}

	#[test]
	fn test_missing_version() {
		let mut chunk = BinaryChunk::new(ChunkType::Header);
		chunk.finalise();

		let mut ctx = ParseContext::new(CURRENT, ImportFlag::empty());
		assert!(matches!(parse_entity::<HeaderParser>(&mut chunk, &mut ctx), Err(CmshError::MissingHeader)));
	}
}
