pub mod color;
pub mod scene;

/// Converts an 8-byte string into a 64-bit big endian integer.
/// Byte strings longer than 8 bytes are truncated.
#[macro_export]
macro_rules! tag8 {
	($b8: literal) => {
		u64::from_be_bytes([$b8[0], $b8[1], $b8[2], $b8[3], $b8[4], $b8[5], $b8[6], $b8[7]])
	}
}

/// Splits a 64-bit tag back into its 8 characters
pub const fn untag8(tag: u64) -> [u8; 8] {
	tag.to_be_bytes()
}
