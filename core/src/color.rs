#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
	pub red: f32,
	pub green: f32,
	pub blue: f32,
	pub alpha: f32,
}

impl Color {
	pub const fn new(red: f32, green: f32, blue: f32, alpha: f32) -> Color {
		Color {
			red: red,
			green: green,
			blue: blue,
			alpha: alpha,
		}
	}
}

impl Default for Color {
	/// Opaque white
	fn default() -> Self {
		Color::new(1.0, 1.0, 1.0, 1.0)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_default_opaque_white() {
		assert_eq!(Color::default(), Color::new(1.0, 1.0, 1.0, 1.0));
	}
}
