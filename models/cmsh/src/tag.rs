use rgk_core::{
	tag8,
	untag8
};

/// Every chunk tag known to the format, nested as they appear in a file.
///
/// Tags are never reassigned. Retired tags stay listed so that readers can
/// recognize and skip them; see [`ChunkType::is_deprecated`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u64)]
pub enum ChunkType {
	CmshFile = tag8!(b"CMSHFILE"),
	CanmFile = tag8!(b"CANMFILE"),
	Header = tag8!(b"CMSHHEAD"),
	Version = tag8!(b"CMSHVERS"),
	Name = tag8!(b"NAME    "),
	Mesh = tag8!(b"MESH    "),
	MeshSkeleton = tag8!(b"MSHSKELN"),
	Submesh = tag8!(b"SUBMESH "),
	SubmeshMaterial = tag8!(b"SMMATERL"),
	SubmeshVertexCount = tag8!(b"SMVTXCNT"),
	SubmeshVertex = tag8!(b"SMVERTEX"),
	SubmeshColors = tag8!(b"SMCOLORS"),
	SubmeshFaceCount = tag8!(b"SMFACCNT"),
	SubmeshFaces = tag8!(b"SMFACES "),
	SubmeshBoneCount = tag8!(b"SMBONCNT"),
	SubmeshBones = tag8!(b"SMBONES "),
	Skeleton = tag8!(b"SKELETON"),
	SkeletonGlobalInverse = tag8!(b"SKELGINV"),
	SkeletonBone = tag8!(b"SKELBONE"),
	BoneParentName = tag8!(b"BONEPARN"),
	BoneOffsetMatrix = tag8!(b"BONEOMTX"),
	Animation = tag8!(b"SKELANIM"),
	AnimationLength = tag8!(b"ANIMLEN "),
	Keyframe = tag8!(b"KEYFRAME"),
	KeyframeTime = tag8!(b"KFRMTIME"),
	KeyframeObject = tag8!(b"KFRMOBJT"),
	KeyframeTranslate = tag8!(b"KFRMTRAN"),
	KeyframeRotate = tag8!(b"KFRMROTN"),
	KeyframeScale = tag8!(b"KFRMSCAL"),

	// Deprecated
	MeshBoundingBox = tag8!(b"MSHBOUND"),
	SubmeshMatrices = tag8!(b"SMMTXBUF"),
	AnimationInterpolator = tag8!(b"ANIMINTP"),
}

impl ChunkType {
	pub const ALL: [ChunkType; 32] = [
		ChunkType::CmshFile,
		ChunkType::CanmFile,
		ChunkType::Header,
		ChunkType::Version,
		ChunkType::Name,
		ChunkType::Mesh,
		ChunkType::MeshSkeleton,
		ChunkType::Submesh,
		ChunkType::SubmeshMaterial,
		ChunkType::SubmeshVertexCount,
		ChunkType::SubmeshVertex,
		ChunkType::SubmeshColors,
		ChunkType::SubmeshFaceCount,
		ChunkType::SubmeshFaces,
		ChunkType::SubmeshBoneCount,
		ChunkType::SubmeshBones,
		ChunkType::Skeleton,
		ChunkType::SkeletonGlobalInverse,
		ChunkType::SkeletonBone,
		ChunkType::BoneParentName,
		ChunkType::BoneOffsetMatrix,
		ChunkType::Animation,
		ChunkType::AnimationLength,
		ChunkType::Keyframe,
		ChunkType::KeyframeTime,
		ChunkType::KeyframeObject,
		ChunkType::KeyframeTranslate,
		ChunkType::KeyframeRotate,
		ChunkType::KeyframeScale,
		ChunkType::MeshBoundingBox,
		ChunkType::SubmeshMatrices,
		ChunkType::AnimationInterpolator,
	];

	/// Looks up a raw tag, returning `None` for tags unknown to this reader
	pub fn from_tag(tag: u64) -> Option<ChunkType> {
		ChunkType::ALL.iter().copied().find(|c| c.tag() == tag)
	}

	pub const fn tag(self) -> u64 {
		self as u64
	}

	/// Deprecated tags are still recognized (and skipped) when reading, but never written
	pub const fn is_deprecated(self) -> bool {
		matches!(self, ChunkType::MeshBoundingBox | ChunkType::SubmeshMatrices |
			ChunkType::AnimationInterpolator)
	}
}

/// Renders a tag for diagnostics: its characters when printable, hex otherwise
pub fn tag_name(tag: u64) -> String {
	let chars = untag8(tag);

	if chars.iter().all(|c| c.is_ascii_graphic() || *c == b' ') {
		chars.iter().map(|c| *c as char).collect::<String>().trim_end().to_string()
	} else {
		format!("{:#018X}", tag)
	}
}
