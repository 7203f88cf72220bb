//! Cell byte packing for narrow (8-bit id) and extended (9-bit id + transform) layers.

use {
	crate::{
		attributes::TileAttributes,
		grid::Cell,
	},
	core::fmt,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CellMode {
	Narrow,
	Extended,
}

impl CellMode {
	#[must_use]
	pub fn new(extended: bool) -> Self {
		if extended {
			Self::Extended
		} else {
			Self::Narrow
		}
	}

	/// Number of distinct tile ids.
	#[must_use]
	pub const fn capacity(self) -> i64 {
		match self {
			Self::Narrow => 256,
			Self::Extended => 512,
		}
	}

	#[must_use]
	pub const fn bytesPerCell(self) -> usize {
		match self {
			Self::Narrow => 1,
			Self::Extended => 2,
		}
	}
}

impl fmt::Display for CellMode {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			Self::Narrow => "narrow",
			Self::Extended => "extended",
		})
	}
}

/// Cells whose ids didn't fit the mode and were wrapped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IdOverflow {
	pub mode: CellMode,
	pub count: usize,
	pub maxId: i64,
}

impl fmt::Display for IdOverflow {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(
			f,
			"{} tile ids outside 0..={} in {} mode (largest {}), wrapped modulo {}",
			self.count,
			self.mode.capacity() - 1,
			self.mode,
			self.maxId,
			self.mode.capacity()
		)
	}
}

/// Packs cells row-major. Split layouts put every id byte before every attribute byte.
#[must_use]
pub fn packCells(cells: &[Cell], mode: CellMode, split: bool) -> (Vec<u8>, Option<IdOverflow>) {
	let (capacity, mut overflow) = (mode.capacity(), None::<IdOverflow>);
	let mut ids = Vec::with_capacity(cells.len() * mode.bytesPerCell());
	let mut attributes = Vec::with_capacity(if split { cells.len() } else { 0 });
	for cell in cells {
		if !(0..capacity).contains(&cell.tileId) {
			let overflow = overflow.get_or_insert(IdOverflow { mode, count: 0, maxId: cell.tileId });
			overflow.count += 1;
			overflow.maxId = overflow.maxId.max(cell.tileId);
		}
		let tileId = cell.tileId.rem_euclid(capacity) as u16;
		ids.push(tileId as u8);
		if mode == CellMode::Extended {
			let attribute = TileAttributes::fromTiled(cell.flags).bits() | (tileId >> 8) as u8;
			if split { attributes.push(attribute) } else { ids.push(attribute) }
		}
	}
	ids.append(&mut attributes);
	(ids, overflow)
}

/// A cell as stored in a layer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DecodedCell {
	pub tileId: u16,
	pub attributes: TileAttributes,
}

impl DecodedCell {
	/// `(attributes << 8) | id`, the layout a consumer loads in one 16-bit read.
	#[must_use]
	pub fn word(self) -> u16 {
		u16::from(self.attributes.bits() | (self.tileId >> 8) as u8) << 8 | (self.tileId & 0xFF)
	}

	#[must_use]
	pub fn transform(self) -> TileAttributes {
		self.attributes.transform()
	}
}

/// Undoes [`packCells`]. `bytes` must hold exactly `cellCount * mode.bytesPerCell()` bytes.
#[must_use]
pub fn unpackCells(bytes: &[u8], mode: CellMode, split: bool) -> Vec<DecodedCell> {
	match mode {
		CellMode::Narrow => bytes.iter().map(|&id| DecodedCell { tileId: id.into(), ..DecodedCell::default() }).collect(),
		CellMode::Extended => {
			let cell = |id: u8, attribute: u8| {
				let attributes = TileAttributes::from_bits_truncate(attribute);
				DecodedCell {
					tileId: u16::from(id) | u16::from(attributes.contains(TileAttributes::ID_BIT8)) << 8,
					attributes: attributes - TileAttributes::ID_BIT8,
				}
			};
			if split {
				let (ids, attributes) = bytes.split_at(bytes.len() / 2);
				ids.iter().zip(attributes).map(|(&id, &attribute)| cell(id, attribute)).collect()
			} else {
				bytes.chunks_exact(2).map(|pair| cell(pair[0], pair[1])).collect()
			}
		}
	}
}
