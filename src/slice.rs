//! Cutting a raster into unique tiles, recognising flipped and rotated repeats.

use {
	crate::{
		attributes::TiledFlags,
		image::Image,
		Error, Result,
	},
	log::{info, warn},
	rustc_hash::FxHashMap,
	serde::Deserialize,
};

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SliceOptions {
	pub tileWidth: usize,
	pub tileHeight: usize,
	/// Atlas width in pixels, `0` for an automatic near-square atlas.
	pub tilesetWidth: usize,
	pub dedupRepeats: bool,
	pub dedupMirrors: bool,
	pub dedupRotations: bool,
	pub insertBlankTile: bool,
	/// Written into every cell of the emitted grid instead of the sliced gids.
	pub clearMap: Option<i64>,
}

impl Default for SliceOptions {
	fn default() -> Self {
		Self {
			tileWidth: 8,
			tileHeight: 8,
			tilesetWidth: 256,
			dedupRepeats: true,
			dedupMirrors: true,
			dedupRotations: false,
			insertBlankTile: true,
			clearMap: None,
		}
	}
}

const MIRRORS: [TiledFlags; 3] = [TiledFlags::HORIZONTAL, TiledFlags::VERTICAL, TiledFlags::HORIZONTAL_VERTICAL];
const ROTATIONS: [TiledFlags; 4] = [
	TiledFlags::ALL[6], // anti-diagonal + vertical
	TiledFlags::ALL[7], // anti-diagonal + horizontal + vertical
	TiledFlags::ANTI_DIAGONAL,
	TiledFlags::ALL[5], // anti-diagonal + horizontal
];

/// Reference from a grid cell to a unique tile and the transform that reproduces the cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TiledNode {
	pub id: usize,
	pub flags: TiledFlags,
}

impl TiledNode {
	/// The editor's gid for this node, with the tileset starting at gid 1.
	#[must_use]
	pub fn gid(self) -> i64 {
		i64::from(self.flags.gidBits()) | (self.id as i64 + 1)
	}
}

/// Content hash → node. The first registration of a hash is kept.
#[derive(Debug, Default)]
pub struct TileDictionary {
	nodes: FxHashMap<u64, TiledNode>,
	tileCount: usize,
}

impl TileDictionary {
	/// Returns whether `hash` was new.
	pub fn register(&mut self, hash: u64, node: TiledNode) -> bool {
		use std::collections::hash_map::Entry;
		match self.nodes.entry(hash) {
			Entry::Occupied(_) => false,
			Entry::Vacant(entry) => {
				entry.insert(node);
				true
			}
		}
	}

	#[must_use]
	pub fn resolve(&self, hash: u64) -> Option<TiledNode> {
		self.nodes.get(&hash).copied()
	}

	/// Ids handed out so far.
	#[must_use]
	pub fn tileCount(&self) -> usize {
		self.tileCount
	}

	fn allocate(&mut self) -> usize {
		self.tileCount += 1;
		self.tileCount - 1
	}
}

#[derive(Debug)]
pub struct SlicedImage {
	pub uniqueTiles: Vec<Image>,
	/// One node per tile position, row-major.
	pub nodes: Vec<TiledNode>,
	pub columns: usize,
	pub rows: usize,
	pub tileWidth: usize,
	pub tileHeight: usize,
}

pub fn sliceImage(image: &Image, options: &SliceOptions) -> Result<SlicedImage> {
	sliceImageWith(image, options, &mut TileDictionary::default())
}

/// Slices `image` against `dictionary`. New tiles get ids following the ones already in it.
pub fn sliceImageWith(
	image: &Image,
	options: &SliceOptions,
	dictionary: &mut TileDictionary,
) -> Result<SlicedImage> {
	let (tileWidth, tileHeight) = (options.tileWidth, options.tileHeight);
	if tileWidth == 0
		|| tileHeight == 0
		|| image.width == 0
		|| image.height == 0
		|| image.width % tileWidth != 0
		|| image.height % tileHeight != 0
	{
		return Err(Error::GeometryMismatch {
			imageWidth: image.width,
			imageHeight: image.height,
			tileWidth,
			tileHeight,
		});
	}
	let (columns, rows) = (image.width / tileWidth, image.height / tileHeight);
	let rotations = options.dedupRotations && tileWidth == tileHeight;
	if options.dedupRotations && !rotations {
		warn!("{tileWidth}x{tileHeight} tiles aren't square, rotated repeats won't be detected");
	}

	let (mut uniqueTiles, mut nodes) = (Vec::new(), Vec::with_capacity(columns * rows));
	if options.insertBlankTile {
		let blankTile = image.blankLike(tileWidth, tileHeight);
		let id = dictionary.allocate();
		dictionary.register(blankTile.contentHash(TiledFlags::empty()), TiledNode { id, flags: TiledFlags::empty() });
		uniqueTiles.push(blankTile);
	}
	for row in 0..rows {
		for column in 0..columns {
			let tile = image.crop([column * tileWidth, row * tileHeight], [tileWidth, tileHeight]);
			let hash = tile.contentHash(TiledFlags::empty());
			let node = match dictionary.resolve(hash).filter(|_| options.dedupRepeats) {
				Some(node) => node,
				None => {
					let node = TiledNode { id: dictionary.allocate(), flags: TiledFlags::empty() };
					if options.dedupRepeats {
						dictionary.register(hash, node);
						let mirrors: &[TiledFlags] = if options.dedupMirrors { &MIRRORS } else { &[] };
						let rotations: &[TiledFlags] = if rotations { &ROTATIONS } else { &[] };
						for &flags in mirrors.iter().chain(rotations) {
							dictionary.register(tile.contentHash(flags), TiledNode { flags, ..node });
						}
					}
					uniqueTiles.push(tile);
					node
				}
			};
			nodes.push(node);
		}
	}
	info!("{} unique {tileWidth}x{tileHeight} tiles out of {}", uniqueTiles.len(), columns * rows);
	Ok(SlicedImage { uniqueTiles, nodes, columns, rows, tileWidth, tileHeight })
}

#[cfg(test)]
mod tests {
	use {super::*, crate::image::Palette};

	/// An indexed tile whose pixels are all different and non-zero.
	fn distinctTile(size: usize) -> Image {
		let palette = Palette { rgb: (0..=255).flat_map(|i| [i, 255 - i, i / 2]).collect(), trns: None };
		Image::fromIndexed(size, size, palette, (1..=(size * size) as u8).collect())
	}

	fn canvas(tile: &Image, columns: usize, rows: usize) -> Image {
		tile.blankLike(tile.width * columns, tile.height * rows)
	}

	#[test]
	fn mirrored_tile_reuses_the_original() {
		let tile = distinctTile(8);
		let mut image = canvas(&tile, 2, 2);
		image.blitRectangle([0, 0], [8, 8], &tile, [0, 0]);
		image.blitRectangle([8, 0], [8, 8], &tile.transformed(TiledFlags::HORIZONTAL), [0, 0]);

		let sliced = sliceImage(&image, &SliceOptions::default()).unwrap();
		assert_eq!(sliced.uniqueTiles.len(), 2);
		assert!(sliced.uniqueTiles[0].isBlank());
		assert_eq!(sliced.uniqueTiles[1], tile);
		let empty = TiledNode { id: 0, flags: TiledFlags::empty() };
		assert_eq!(sliced.nodes, [
			TiledNode { id: 1, flags: TiledFlags::empty() },
			TiledNode { id: 1, flags: TiledFlags::HORIZONTAL },
			empty,
			empty,
		]);
		assert_eq!(sliced.nodes[1].gid(), 0x8000_0002);
		assert_eq!([sliced.columns, sliced.rows], [2, 2]);
	}

	#[test]
	fn every_transform_resolves_to_its_flags() {
		let tile = distinctTile(4);
		let mut image = canvas(&tile, 8, 1);
		for (i, flags) in TiledFlags::ALL.into_iter().enumerate() {
			image.blitRectangle([i * 4, 0], [4, 4], &tile.transformed(flags), [0, 0]);
		}
		let options = SliceOptions {
			tileWidth: 4,
			tileHeight: 4,
			dedupRotations: true,
			insertBlankTile: false,
			..SliceOptions::default()
		};
		let sliced = sliceImage(&image, &options).unwrap();
		assert_eq!(sliced.uniqueTiles.len(), 1);
		for (node, flags) in sliced.nodes.iter().zip(TiledFlags::ALL) {
			assert_eq!(*node, TiledNode { id: 0, flags });
			// what the editor draws for the cell is what the image holds there
			assert_eq!(sliced.uniqueTiles[node.id].transformed(node.flags), tile.transformed(flags));
		}
	}

	#[test]
	fn rotations_need_the_option() {
		let tile = distinctTile(4);
		let mut image = canvas(&tile, 2, 1);
		image.blitRectangle([0, 0], [4, 4], &tile, [0, 0]);
		image.blitRectangle([4, 0], [4, 4], &tile.transformed(TiledFlags::ANTI_DIAGONAL), [0, 0]);
		let options = SliceOptions { tileWidth: 4, tileHeight: 4, insertBlankTile: false, ..SliceOptions::default() };
		let sliced = sliceImage(&image, &options).unwrap();
		assert_eq!(sliced.uniqueTiles.len(), 2);
		assert_eq!(sliced.nodes[1], TiledNode { id: 1, flags: TiledFlags::empty() });
	}

	#[test]
	fn symmetric_tile_keeps_the_identity() {
		let palette = Palette { rgb: vec![0, 0, 0, 200, 10, 10], trns: None };
		let image = Image::fromIndexed(8, 4, palette, vec![1; 32]);
		let options = SliceOptions { tileWidth: 4, tileHeight: 4, ..SliceOptions::default() };
		let sliced = sliceImage(&image, &options).unwrap();
		assert_eq!(sliced.uniqueTiles.len(), 2);
		assert!(sliced.nodes.iter().all(|&node| node == TiledNode { id: 1, flags: TiledFlags::empty() }));
	}

	#[test]
	fn repeats_can_be_kept() {
		let tile = distinctTile(4);
		let mut image = canvas(&tile, 3, 1);
		for i in 0..2 {
			image.blitRectangle([i * 4, 0], [4, 4], &tile, [0, 0]);
		}
		let options = SliceOptions { tileWidth: 4, tileHeight: 4, dedupRepeats: false, ..SliceOptions::default() };
		let sliced = sliceImage(&image, &options).unwrap();
		assert_eq!(sliced.uniqueTiles.len(), 4);
		assert_eq!(sliced.nodes.iter().map(|node| node.id).collect::<Vec<_>>(), [1, 2, 3]);
	}

	#[test]
	fn slicing_is_deterministic() {
		let tile = distinctTile(4);
		let mut image = canvas(&tile, 4, 4);
		for (i, flags) in TiledFlags::ALL.into_iter().enumerate() {
			image.blitRectangle([i % 4 * 4, i / 4 * 8], [4, 4], &tile.transformed(flags), [0, 0]);
		}
		let options = SliceOptions { tileWidth: 4, tileHeight: 4, ..SliceOptions::default() };
		let [first, second] = [(); 2].map(|()| sliceImage(&image, &options).unwrap());
		assert_eq!(first.nodes, second.nodes);
		assert_eq!(first.uniqueTiles, second.uniqueTiles);
	}

	#[test]
	fn geometry_must_divide() {
		let image = Image::fromRGBA(10, 8, vec![0; 10 * 8 * 4]);
		assert!(matches!(
			sliceImage(&image, &SliceOptions::default()),
			Err(Error::GeometryMismatch { imageWidth: 10, imageHeight: 8, tileWidth: 8, tileHeight: 8 })
		));
	}
}
