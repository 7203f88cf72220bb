use {
	crate::{image::Image, Error, Result},
	log::info,
};

pub struct Atlas {
	pub image: Image,
	pub columns: usize,
	pub rows: usize,
}

/// Smallest power-of-two width, at least one tile wide, whose square fits every tile row.
#[must_use]
pub fn autoTilesetWidth(tileWidth: usize, tileHeight: usize, tileCount: usize) -> usize {
	let mut width = tileWidth.next_power_of_two();
	while tileCount.div_ceil(width / tileWidth) * tileHeight > width {
		width *= 2;
	}
	width
}

/// Lays `tiles` out row-major, `tilesetWidth / tileWidth` to a row. A width of `0` picks one with
/// [`autoTilesetWidth`].
pub fn packTileset(tiles: &[Image], tilesetWidth: usize) -> Result<Atlas> {
	let Some(first) = tiles.first() else {
		return Err(Error::GeometryMismatch { imageWidth: tilesetWidth, imageHeight: 0, tileWidth: 0, tileHeight: 0 });
	};
	let (tileWidth, tileHeight) = (first.width, first.height);
	let width = match tilesetWidth {
		0 => autoTilesetWidth(tileWidth, tileHeight, tiles.len()),
		width => width,
	};
	let columns = width / tileWidth;
	if columns == 0 {
		return Err(Error::GeometryMismatch { imageWidth: width, imageHeight: 0, tileWidth, tileHeight });
	}
	let rows = tiles.len().div_ceil(columns);
	let mut image = first.blankLike(width, rows * tileHeight);
	for (i, tile) in tiles.iter().enumerate() {
		image.blitRectangle([i % columns * tileWidth, i / columns * tileHeight], [tileWidth, tileHeight], tile, [0, 0]);
	}
	info!("tileset of {}x{} pixels, {columns} tiles per row", image.width, image.height);
	Ok(Atlas { image, columns, rows })
}
