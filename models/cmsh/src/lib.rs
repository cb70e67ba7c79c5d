//! CMSH: chunked binary cache for meshes, skeletons and animations.
//!
//! A file is a tree of chunks (8-byte tag, 4-byte big endian length, payload). The root
//! chunk names the kind of file, its first child carries the format version and the
//! remaining children are entities.

pub mod animation;
pub mod chunk;
pub mod codec;
pub mod error;
pub mod header;
pub mod mesh;
pub mod protocol;
pub mod skeleton;
pub mod tag;
pub mod version;

#[cfg(feature = "export")]
pub mod export;
#[cfg(feature = "import")]
pub mod import;

use bitflags::bitflags;

use rgk_core::scene::{
	Animation,
	Mesh,
	Skeleton
};

use codec::Endianness;
use tag::ChunkType;
use version::FormatVersion;

pub use error::{
	CmshError,
	Warning
};

#[cfg(feature = "export")]
pub use export::{
	Exporter,
	export_to_stream
};
#[cfg(feature = "import")]
pub use import::{
	Importer,
	import_from_stream
};

bitflags! {
	pub struct ImportFlag: u32 {
		const SKIP_SKELETONS = 1;
		const SKIP_ANIMATIONS = 2;
		/// Drops per-vertex bone influences of every submesh
		const SKIP_BONE_DATA = 4;
	}
}

impl Default for ImportFlag {
	fn default() -> Self {
		ImportFlag::empty()
	}
}

#[derive(Clone, Debug, PartialEq)]
pub struct ImportCfg {
	pub flags: ImportFlag,
	/// Largest chunk payload accepted, in bytes
	pub max_chunk_size: u64,
	/// Byte order assumed for the host
	pub host: Endianness,
}

impl Default for ImportCfg {
	fn default() -> Self {
		Self {
			flags: ImportFlag::default(),
			max_chunk_size: 1 << 30,
			host: Endianness::native(),
		}
	}
}

#[derive(Clone, Debug, PartialEq)]
pub struct ExportCfg {
	/// Version to write. Older versions get the field shapes of their time.
	pub version: FormatVersion,
	/// Byte order assumed for the host
	pub host: Endianness,
}

impl Default for ExportCfg {
	fn default() -> Self {
		Self {
			version: version::CURRENT,
			host: Endianness::native(),
		}
	}
}

/// Progress of an [`Importer`] or [`Exporter`] through a stream
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum State {
	Unopened,
	HeaderValidated,
	StreamingEntities,
	Done,
	Failed,
}

/// Kind of a file, given by its root chunk
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FileKind {
	/// Meshes and skeletons
	Mesh,
	/// Skeletal animations
	Animation,
}

impl FileKind {
	pub fn root(self) -> ChunkType {
		match self {
			FileKind::Mesh => ChunkType::CmshFile,
			FileKind::Animation => ChunkType::CanmFile,
		}
	}

	pub fn from_root(tag: u64) -> Option<FileKind> {
		match ChunkType::from_tag(tag) {
			Some(ChunkType::CmshFile) => Some(FileKind::Mesh),
			Some(ChunkType::CanmFile) => Some(FileKind::Animation),
			_ => None,
		}
	}

	/// Whether a top level entity chunk belongs in this kind of file
	pub fn accepts(self, kind: ChunkType) -> bool {
		match self {
			FileKind::Mesh => matches!(kind, ChunkType::Mesh | ChunkType::Skeleton),
			FileKind::Animation => kind == ChunkType::Animation,
		}
	}
}

#[derive(Clone, Debug, PartialEq)]
pub enum Entity {
	Mesh(Mesh),
	Skeleton(Skeleton),
	Animation(Animation),
}

impl Entity {
	pub fn chunk_type(&self) -> ChunkType {
		match self {
			Entity::Mesh(_) => ChunkType::Mesh,
			Entity::Skeleton(_) => ChunkType::Skeleton,
			Entity::Animation(_) => ChunkType::Animation,
		}
	}
}

/// Whole content of a file
#[derive(Clone, Debug, PartialEq)]
pub struct CmshFile {
	pub kind: FileKind,
	pub version: FormatVersion,
	pub entities: Vec<Entity>,
}

impl CmshFile {
	pub fn new(kind: FileKind) -> CmshFile {
		CmshFile {
			kind: kind,
			version: version::CURRENT,
			entities: vec![],
		}
	}

	pub fn meshes(&self) -> impl Iterator<Item = &Mesh> {
		self.entities.iter().filter_map(|e| match e {
			Entity::Mesh(m) => Some(m),
			_ => None,
		})
	}

	pub fn skeletons(&self) -> impl Iterator<Item = &Skeleton> {
		self.entities.iter().filter_map(|e| match e {
			Entity::Skeleton(s) => Some(s),
			_ => None,
		})
	}

	pub fn animations(&self) -> impl Iterator<Item = &Animation> {
		self.entities.iter().filter_map(|e| match e {
			Entity::Animation(a) => Some(a),
			_ => None,
		})
	}
}
