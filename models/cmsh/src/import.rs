use std::io::Read;

use tracing::debug;

use crate::{
	animation::AnimationParser,
	chunk::{
		BinaryChunk,
		HEADER_SIZE
	},
	error::{
		CmshError,
		Warning
	},
	header::HeaderParser,
	mesh::MeshParser,
	protocol::{
		ParseContext,
		misplaced,
		parse_entity
	},
	skeleton::SkeletonParser,
	tag::ChunkType,
	version::{
		self,
		FormatVersion
	},
	CmshFile,
	Entity,
	FileKind,
	ImportCfg,
	ImportFlag,
	State
};

/// Streams the entities of a file one at a time.
///
/// Only the chunk being parsed is held in memory. Any error moves the importer to
/// [`State::Failed`], after which every call is refused.
pub struct Importer<R: Read> {
	buf: R,
	cfg: ImportCfg,
	state: State,
	kind: Option<FileKind>,
	root_tag: u64,
	/// Root payload bytes not read yet
	remaining: u64,
	/// Absolute offset of the next byte in the stream
	offset: usize,
	ctx: ParseContext,
}

impl<R: Read> Importer<R> {
	pub fn new(buf: R, cfg: ImportCfg) -> Importer<R> {
		let flags = cfg.flags;

		Importer {
			buf: buf,
			cfg: cfg,
			state: State::Unopened,
			kind: None,
			root_tag: 0,
			remaining: 0,
			offset: 0,
			ctx: ParseContext::new(version::CURRENT, flags),
		}
	}

	pub fn state(&self) -> State {
		self.state
	}

	/// Kind of the file, known once opened
	pub fn kind(&self) -> Option<FileKind> {
		self.kind
	}

	pub fn version(&self) -> FormatVersion {
		self.ctx.version
	}

	pub fn warnings(&self) -> &[Warning] {
		&self.ctx.warnings
	}

	/// Number of unknown or deprecated chunks passed over so far
	pub fn skipped(&self) -> usize {
		self.ctx.skipped
	}

	pub fn into_warnings(self) -> Vec<Warning> {
		self.ctx.warnings
	}

	fn guard<T>(&mut self, result: Result<T, CmshError>) -> Result<T, CmshError> {
		if result.is_err() {
			self.state = State::Failed;
		}
		result
	}

	/// Reads the root chunk header and the file header, returning the file version
	pub fn open(&mut self) -> Result<FormatVersion, CmshError> {
		if self.state != State::Unopened {
			return Err(CmshError::InvalidState(self.state));
		}

		let result = self.read_root();
		let version = self.guard(result)?;

		debug!(kind = ?self.kind, version = %version, "opened stream");
		self.state = State::HeaderValidated;
		Ok(version)
	}

	fn read_root(&mut self) -> Result<FormatVersion, CmshError> {
		let (tag, length) = BinaryChunk::read_header(&mut self.buf, self.cfg.host, 0)?;

		let kind = match FileKind::from_root(tag) {
			Some(kind) => kind,
			None => return Err(CmshError::UnknownTopLevelTag { tag: tag }),
		};

		self.kind = Some(kind);
		self.root_tag = tag;
		self.remaining = length as u64;
		self.offset = HEADER_SIZE;

		let mut header = match self.next_child()? {
			Some(chunk) if chunk.kind() == Some(ChunkType::Header) => chunk,
			_ => return Err(CmshError::MissingHeader),
		};
		let header = parse_entity::<HeaderParser>(&mut header, &mut self.ctx)?;

		if header.version.major > version::CURRENT.major {
			return Err(CmshError::VersionTooNew {
				found: header.version,
				supported: version::CURRENT,
			});
		}

		self.ctx.set_version(header.version);
		Ok(header.version)
	}

	/// Reads the next direct child of the root chunk, bounded by the root length
	fn next_child(&mut self) -> Result<Option<BinaryChunk>, CmshError> {
		if self.remaining == 0 {
			self.check_end()?;
			return Ok(None);
		}
		if self.remaining < HEADER_SIZE as u64 {
			return Err(CmshError::StreamTruncated {
				tag: self.root_tag,
				offset: self.offset,
				needed: HEADER_SIZE,
				available: self.remaining as usize,
			});
		}

		let (tag, length) = BinaryChunk::read_header(&mut self.buf, self.cfg.host, self.offset)?;
		let available = self.remaining - HEADER_SIZE as u64;

		if length as u64 > available {
			return Err(CmshError::StreamTruncated {
				tag: tag,
				offset: self.offset + HEADER_SIZE,
				needed: length as usize,
				available: available as usize,
			});
		}
		if length as u64 > self.cfg.max_chunk_size {
			return Err(CmshError::LengthOverflow {
				tag: tag,
				length: length as u64,
				limit: self.cfg.max_chunk_size,
			});
		}

		let chunk = BinaryChunk::read_payload(&mut self.buf, tag, length, self.cfg.host,
			self.offset + HEADER_SIZE)?;

		self.remaining = available - length as u64;
		self.offset += HEADER_SIZE + length as usize;
		Ok(Some(chunk))
	}

	/// Fails when bytes follow the end declared by the root chunk
	fn check_end(&mut self) -> Result<(), CmshError> {
		let mut trailing = vec![];
		if self.buf.by_ref().take(1).read_to_end(&mut trailing)? == 0 {
			return Ok(());
		}

		Err(CmshError::StreamTruncated {
			tag: self.root_tag,
			offset: self.offset,
			needed: 1,
			available: 0,
		})
	}

	/// Parses the next entity, or returns `None` once the file is exhausted.
	/// Entities disabled through [`ImportFlag`] are passed over.
	pub fn next_entity(&mut self) -> Result<Option<Entity>, CmshError> {
		match self.state {
			State::HeaderValidated | State::StreamingEntities => (),
			State::Done => return Ok(None),
			_ => return Err(CmshError::InvalidState(self.state)),
		}

		self.state = State::StreamingEntities;
		let result = self.read_entity();
		let entity = self.guard(result)?;

		if entity.is_none() {
			debug!(skipped = self.ctx.skipped, warnings = self.ctx.warnings.len(), "stream done");
			self.state = State::Done;
		}

		Ok(entity)
	}

	fn read_entity(&mut self) -> Result<Option<Entity>, CmshError> {
		let kind = match self.kind {
			Some(kind) => kind,
			None => return Err(CmshError::InvalidState(self.state)),
		};

		while let Some(mut chunk) = self.next_child()? {
			let chunk_type = match self.ctx.known_kind(&chunk) {
				Some(chunk_type) => chunk_type,
				None => continue,
			};

			if !kind.accepts(chunk_type) {
				return Err(misplaced(&chunk, self.root_tag));
			}

			let entity = match chunk_type {
				ChunkType::Mesh => Entity::Mesh(parse_entity::<MeshParser>(&mut chunk, &mut self.ctx)?),
				ChunkType::Skeleton => {
					if self.ctx.flags.contains(ImportFlag::SKIP_SKELETONS) {
						debug!(offset = chunk.header_offset(), "skipping skeleton");
						continue;
					}
					Entity::Skeleton(parse_entity::<SkeletonParser>(&mut chunk, &mut self.ctx)?)
				}
				ChunkType::Animation => {
					if self.ctx.flags.contains(ImportFlag::SKIP_ANIMATIONS) {
						debug!(offset = chunk.header_offset(), "skipping animation");
						continue;
					}
					Entity::Animation(parse_entity::<AnimationParser>(&mut chunk, &mut self.ctx)?)
				}
				_ => return Err(misplaced(&chunk, self.root_tag)),
			};

			return Ok(Some(entity));
		}

		Ok(None)
	}
}

/// Reads a whole file, returning its entities and the non-fatal problems met on the way
pub fn import_from_stream<R: Read>(buf: R, cfg: ImportCfg) -> Result<(CmshFile, Vec<Warning>), CmshError> {
	let mut importer = Importer::new(buf, cfg);
	let version = importer.open()?;

	let mut file = CmshFile {
		kind: importer.kind().unwrap_or(FileKind::Mesh),
		version: version,
		entities: vec![],
	};

	while let Some(entity) = importer.next_entity()? {
		file.entities.push(entity);
	}

	Ok((file, importer.into_warnings()))
}
