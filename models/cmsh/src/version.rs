use std::fmt;

/// Format revision of a CMSH stream, packed on disk as `major<<24 | minor<<16 | revision`
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FormatVersion {
	pub major: u8,
	pub minor: u8,
	pub revision: u16,
}

/// Version written by default
pub const CURRENT: FormatVersion = FormatVersion::new(1, 3, 0);

/// First entry of the shape table. Older streams read and write with its shapes.
pub const OLDEST: FormatVersion = FormatVersion::new(1, 0, 0);

impl FormatVersion {
	pub const fn new(major: u8, minor: u8, revision: u16) -> FormatVersion {
		FormatVersion {
			major: major,
			minor: minor,
			revision: revision,
		}
	}

	pub const fn pack(self) -> u32 {
		(self.major as u32) << 24 | (self.minor as u32) << 16 | self.revision as u32
	}

	pub const fn unpack(packed: u32) -> FormatVersion {
		FormatVersion {
			major: (packed >> 24) as u8,
			minor: (packed >> 16) as u8,
			revision: packed as u16,
		}
	}
}

impl fmt::Display for FormatVersion {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "{}.{}.{}", self.major, self.minor, self.revision)
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VertexLayout {
	/// f64 position, normal, tangent, bitangent and texture coordinates
	Double,
	/// f32 position, normal, tangent and texture coordinates
	Single,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FaceLayout {
	U16,
	U32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BoneLayout {
	/// 4 bone ids followed by 4 weights
	Four,
	/// 8 bone ids followed by 8 weights
	Eight,
}

/// On-disk shape of every field whose encoding changed between revisions
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Shapes {
	pub vertex: VertexLayout,
	pub faces: FaceLayout,
	pub bones: BoneLayout,
}

/// Each entry holds the shapes written from that version on. Sorted by version.
const SHAPE_TABLE: [(FormatVersion, Shapes); 4] = [
	(FormatVersion::new(1, 0, 0), Shapes {
		vertex: VertexLayout::Double,
		faces: FaceLayout::U16,
		bones: BoneLayout::Four,
	}),
	(FormatVersion::new(1, 1, 0), Shapes {
		vertex: VertexLayout::Double,
		faces: FaceLayout::U32,
		bones: BoneLayout::Four,
	}),
	(FormatVersion::new(1, 2, 0), Shapes {
		vertex: VertexLayout::Double,
		faces: FaceLayout::U32,
		bones: BoneLayout::Eight,
	}),
	(FormatVersion::new(1, 3, 0), Shapes {
		vertex: VertexLayout::Single,
		faces: FaceLayout::U32,
		bones: BoneLayout::Eight,
	}),
];

impl Shapes {
	/// Selects the shapes used by a stream of the given version.
	/// Anything older than the first entry reads as the first entry.
	pub fn for_version(version: FormatVersion) -> Shapes {
		let mut shapes = SHAPE_TABLE[0].1;

		for (since, entry) in SHAPE_TABLE.iter() {
			if version >= *since {
				shapes = *entry;
			}
		}

		shapes
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_pack_layout() {
		assert_eq!(FormatVersion::new(1, 3, 0).pack(), 0x0103_0000);
		assert_eq!(FormatVersion::new(0xAB, 0xCD, 0xEF12).pack(), 0xABCD_EF12);
		assert_eq!(FormatVersion::unpack(0x0203_0004), FormatVersion::new(2, 3, 4));
	}

	#[test]
	fn test_pack_unpack() {
		for major in [0u8, 1, 7, 128, 255] {
			for minor in [0u8, 1, 42, 255] {
				for revision in [0u16, 1, 256, 4097, 65535] {
					let v = FormatVersion::new(major, minor, revision);
					assert_eq!(FormatVersion::unpack(v.pack()), v);
				}
			}
		}
	}

	#[test]
	fn test_ordering_matches_packing() {
		let a = FormatVersion::new(1, 2, 65535);
		let b = FormatVersion::new(1, 3, 0);
		assert!(a < b);
		assert!(a.pack() < b.pack());
		assert!(CURRENT >= OLDEST);
	}

	#[test]
	fn test_display() {
		assert_eq!(CURRENT.to_string(), "1.3.0");
	}

	#[test]
	fn test_shapes_for_version() {
		let old = Shapes::for_version(FormatVersion::new(0, 9, 0));
		assert_eq!(old, Shapes::for_version(OLDEST));
		assert_eq!(old.faces, FaceLayout::U16);

		let v11 = Shapes::for_version(FormatVersion::new(1, 1, 3));
		assert_eq!(v11.faces, FaceLayout::U32);
		assert_eq!(v11.bones, BoneLayout::Four);

		assert_eq!(Shapes::for_version(FormatVersion::new(1, 2, 0)).bones, BoneLayout::Eight);
		assert_eq!(Shapes::for_version(FormatVersion::new(1, 2, 9)).vertex, VertexLayout::Double);

		let newer = Shapes::for_version(FormatVersion::new(1, 9, 0));
		assert_eq!(newer, Shapes::for_version(CURRENT));
		assert_eq!(newer.vertex, VertexLayout::Single);
	}
}
