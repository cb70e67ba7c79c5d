use std::io::Write;

use tracing::debug;

use crate::{
	chunk::{
		BinaryChunk,
		HEADER_SIZE
	},
	error::CmshError,
	header::Header,
	protocol::{
		WriteContext,
		write_sub_entity
	},
	version,
	CmshFile,
	Entity,
	ExportCfg,
	FileKind,
	State
};

/// Builds a file entity by entity.
///
/// The root chunk is assembled in memory, its length being written ahead of its content.
/// Any error moves the exporter to [`State::Failed`], after which every call is refused.
pub struct Exporter {
	kind: FileKind,
	state: State,
	ctx: WriteContext,
	root: BinaryChunk,
}

impl Exporter {
	pub fn new(kind: FileKind, cfg: ExportCfg) -> Exporter {
		let mut root = BinaryChunk::new(kind.root());
		root.set_host(cfg.host);

		Exporter {
			kind: kind,
			state: State::Unopened,
			ctx: WriteContext::new(cfg.version, cfg.host),
			root: root,
		}
	}

	pub fn state(&self) -> State {
		self.state
	}

	fn guard<T>(&mut self, result: Result<T, CmshError>) -> Result<T, CmshError> {
		if result.is_err() {
			self.state = State::Failed;
		}
		result
	}

	/// Checks the target version and writes the file header
	pub fn open(&mut self) -> Result<(), CmshError> {
		if self.state != State::Unopened {
			return Err(CmshError::InvalidState(self.state));
		}

		let result = self.write_header();
		self.guard(result)?;

		debug!(kind = ?self.kind, version = %self.ctx.version, "exporting");
		self.state = State::HeaderValidated;
		Ok(())
	}

	fn write_header(&mut self) -> Result<(), CmshError> {
		if self.ctx.version > version::CURRENT {
			return Err(CmshError::VersionTooNew {
				found: self.ctx.version,
				supported: version::CURRENT,
			});
		}

		write_sub_entity(&Header { version: self.ctx.version }, &mut self.root, &self.ctx)
	}

	/// Appends an entity. It must belong in this kind of file.
	pub fn add(&mut self, entity: &Entity) -> Result<(), CmshError> {
		match self.state {
			State::HeaderValidated | State::StreamingEntities => (),
			_ => return Err(CmshError::InvalidState(self.state)),
		}

		let result = self.write_entity(entity);
		self.guard(result)?;

		self.state = State::StreamingEntities;
		Ok(())
	}

	fn write_entity(&mut self, entity: &Entity) -> Result<(), CmshError> {
		if !self.kind.accepts(entity.chunk_type()) {
			return Err(CmshError::MisplacedChunk {
				tag: entity.chunk_type().tag(),
				parent: self.kind.root().tag(),
				offset: HEADER_SIZE + self.root.data_size(),
			});
		}

		match entity {
			Entity::Mesh(mesh) => write_sub_entity(mesh, &mut self.root, &self.ctx),
			Entity::Skeleton(skeleton) => write_sub_entity(skeleton, &mut self.root, &self.ctx),
			Entity::Animation(animation) => write_sub_entity(animation, &mut self.root, &self.ctx),
		}
	}

	/// Seals the root chunk and writes the whole file
	pub fn finish<W: Write>(&mut self, buf: W) -> Result<(), CmshError> {
		match self.state {
			State::HeaderValidated | State::StreamingEntities => (),
			_ => return Err(CmshError::InvalidState(self.state)),
		}

		self.root.finalise();
		let result = self.write_root(buf);
		self.guard(result)?;

		debug!(size = HEADER_SIZE + self.root.data_size(), "export done");
		self.state = State::Done;
		Ok(())
	}

	fn write_root<W: Write>(&self, mut buf: W) -> Result<(), CmshError> {
		self.root.write(&mut buf)?;
		buf.flush()?;
		Ok(())
	}
}

/// Writes a whole file. The version written is the one of `cfg`, not `file.version`.
pub fn export_to_stream<W: Write>(file: &CmshFile, buf: W, cfg: ExportCfg) -> Result<(), CmshError> {
	let mut exporter = Exporter::new(file.kind, cfg);
	exporter.open()?;

	for entity in file.entities.iter() {
		exporter.add(entity)?;
	}

	exporter.finish(buf)
}

#[cfg(test)]
mod tests {
	use rgk_core::scene::{
		Animation,
		Mesh,
		Skeleton
	};

	use super::*;
	use crate::version::FormatVersion;

	#[test]
	fn test_lifecycle() {
		let mut exporter = Exporter::new(FileKind::Mesh, ExportCfg::default());
		let mesh = Entity::Mesh(Mesh::new("cube"));

		assert!(matches!(exporter.add(&mesh), Err(CmshError::InvalidState(State::Unopened))));
		assert!(matches!(exporter.finish(vec![]), Err(CmshError::InvalidState(State::Unopened))));

		exporter.open().unwrap();
		assert_eq!(exporter.state(), State::HeaderValidated);
		assert!(matches!(exporter.open(), Err(CmshError::InvalidState(State::HeaderValidated))));

		exporter.add(&mesh).unwrap();
		exporter.add(&Entity::Skeleton(Skeleton::new("rig"))).unwrap();
		assert_eq!(exporter.state(), State::StreamingEntities);

		let mut out = vec![];
		exporter.finish(&mut out).unwrap();
		assert_eq!(exporter.state(), State::Done);
		assert_eq!(&out[..8], b"CMSHFILE");
		assert_eq!(&out[12..20], b"CMSHHEAD");
		assert!(matches!(exporter.add(&mesh), Err(CmshError::InvalidState(State::Done))));
	}

	#[test]
	fn test_version_too_new() {
		let cfg = ExportCfg {
			version: FormatVersion::new(1, 4, 0),
			..ExportCfg::default()
		};
		let mut exporter = Exporter::new(FileKind::Animation, cfg);

		assert!(matches!(exporter.open(), Err(CmshError::VersionTooNew { .. })));
		assert_eq!(exporter.state(), State::Failed);
		assert!(matches!(exporter.finish(vec![]), Err(CmshError::InvalidState(State::Failed))));
	}

	#[test]
	fn test_wrong_entity_kind() {
		let mut exporter = Exporter::new(FileKind::Animation, ExportCfg::default());
		exporter.open().unwrap();

		match exporter.add(&Entity::Mesh(Mesh::new("cube"))) {
			Err(CmshError::MisplacedChunk { tag, parent, .. }) => {
				assert_eq!(tag, crate::tag::ChunkType::Mesh.tag());
				assert_eq!(parent, crate::tag::ChunkType::CanmFile.tag());
			}
			other => panic!("unexpected {:?}", other),
		}
		assert_eq!(exporter.state(), State::Failed);
		assert!(matches!(exporter.add(&Entity::Animation(Animation::new("walk"))),
			Err(CmshError::InvalidState(State::Failed))));
	}

	#[test]
	fn test_deterministic() {
		let mut file = CmshFile::new(FileKind::Animation);
		file.entities.push(Entity::Animation(Animation::new("walk")));
		file.entities.push(Entity::Animation(Animation::new("run")));

		let mut a = vec![];
		let mut b = vec![];
		export_to_stream(&file, &mut a, ExportCfg::default()).unwrap();
		export_to_stream(&file, &mut b, ExportCfg::default()).unwrap();
		assert_eq!(a, b);
	}
}
