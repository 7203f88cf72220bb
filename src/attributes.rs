//! Flag sets whose bit positions are part of the file formats.

use bitflags::bitflags;

pub const GID_FLAGS_SHIFT: u32 = 28;
pub const GID_MASK: u32 = 0x1FFF_FFFF;

bitflags! {
	/// Transform bits of a Tiled gid, taken from `gid >> 28`.
	///
	/// Tiled renders them in a fixed order: diagonal flip (transpose) first, then the horizontal
	/// flip, then the vertical one.
	#[derive(Default)]
	pub struct TiledFlags: u8 {
		const ANTI_DIAGONAL = 1 << 1;
		const VERTICAL = 1 << 2;
		const HORIZONTAL = 1 << 3;
		const HORIZONTAL_VERTICAL = Self::HORIZONTAL.bits | Self::VERTICAL.bits;
	}
}

bitflags! {
	/// Attribute byte of an extended cell. The hardware rotates clockwise first and mirrors after.
	#[derive(Default)]
	pub struct TileAttributes: u8 {
		const ID_BIT8 = 1 << 0;
		const ROTATE = 1 << 1;
		const MIRROR_Y = 1 << 2;
		const MIRROR_X = 1 << 3;
		const MIRROR_X_Y = Self::MIRROR_X.bits | Self::MIRROR_Y.bits;
	}
}

bitflags! {
	#[derive(Default)]
	pub struct LayerAttributes: u8 {
		const EXTENDED_512 = 1 << 1;
		const COMPRESSED_ZX0 = 1 << 2;
		const QUICK_MODE = 1 << 3;
		const BACKWARDS_MODE = 1 << 4;
		const COMPRESSED_RLE = 1 << 5;
		const SPLIT = 1 << 6;
	}
}

impl TiledFlags {
	/// Every member of the dihedral group, identity first.
	pub const ALL: [Self; 8] = [
		Self::empty(),
		Self::HORIZONTAL,
		Self::VERTICAL,
		Self::HORIZONTAL_VERTICAL,
		Self::ANTI_DIAGONAL,
		Self::from_bits_truncate(Self::ANTI_DIAGONAL.bits | Self::HORIZONTAL.bits),
		Self::from_bits_truncate(Self::ANTI_DIAGONAL.bits | Self::VERTICAL.bits),
		Self::from_bits_truncate(Self::ANTI_DIAGONAL.bits | Self::HORIZONTAL_VERTICAL.bits),
	];

	#[must_use]
	pub const fn fromGid(gid: u32) -> Self {
		Self::from_bits_truncate((gid >> GID_FLAGS_SHIFT) as u8)
	}

	#[must_use]
	pub const fn gidBits(self) -> u32 {
		(self.bits as u32) << GID_FLAGS_SHIFT
	}
}

impl TileAttributes {
	/// Translates Tiled's flip flags into the container's rotate/mirror bits.
	#[must_use]
	pub fn fromTiled(tiled: TiledFlags) -> Self {
		// indexed by [diagonal, horizontal, vertical] read as a 3-bit number
		const TABLE: [TileAttributes; 8] = [
			TileAttributes::empty(),
			TileAttributes::MIRROR_Y,
			TileAttributes::MIRROR_X,
			TileAttributes::MIRROR_X_Y,
			TileAttributes::from_bits_truncate(TileAttributes::ROTATE.bits | TileAttributes::MIRROR_X.bits),
			TileAttributes::from_bits_truncate(
				TileAttributes::ROTATE.bits | TileAttributes::MIRROR_X_Y.bits,
			),
			TileAttributes::ROTATE,
			TileAttributes::from_bits_truncate(TileAttributes::ROTATE.bits | TileAttributes::MIRROR_Y.bits),
		];
		TABLE[usize::from(tiled.contains(TiledFlags::ANTI_DIAGONAL)) << 2
			| usize::from(tiled.contains(TiledFlags::HORIZONTAL)) << 1
			| usize::from(tiled.contains(TiledFlags::VERTICAL))]
	}

	#[must_use]
	pub fn transform(self) -> Self {
		self - Self::ID_BIT8
	}
}
