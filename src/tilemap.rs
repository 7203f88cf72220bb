//! Grid ⇄ layer conversion: normalise, translate, pack, compress, and back.

use {
	crate::{
		attributes::LayerAttributes,
		cells::{packCells, unpackCells, CellMode, DecodedCell, IdOverflow},
		compress::{compressPayload, decompressPayload},
		fs_read,
		grid::{fileStem, normalize, CsvOptions, GridFormat, TileGrid},
		map::{Container, Layer, LayerData},
		Result,
	},
	log::warn,
	serde::{Deserialize, Serialize},
	std::path::Path,
};

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EncodeOptions {
	/// 0-based id stored for empty cells.
	pub blankTileId: i64,
	pub extended512: bool,
	pub split: bool,
	pub rle: bool,
	pub zx0: bool,
	pub quick: bool,
	pub backwards: bool,
	pub gridFormat: GridFormat,
	pub csv: CsvOptions,
}

impl EncodeOptions {
	#[must_use]
	pub fn layerAttributes(&self) -> LayerAttributes {
		let mut attributes = LayerAttributes::empty();
		attributes.set(LayerAttributes::EXTENDED_512, self.extended512);
		attributes.set(LayerAttributes::SPLIT, self.split && self.extended512);
		attributes.set(LayerAttributes::COMPRESSED_RLE, self.rle);
		attributes.set(LayerAttributes::COMPRESSED_ZX0, self.zx0);
		attributes.set(LayerAttributes::QUICK_MODE, self.quick);
		attributes.set(LayerAttributes::BACKWARDS_MODE, self.backwards);
		attributes
	}
}

/// Turns a grid into a layer. Ids that don't fit are wrapped and reported, not rejected.
pub fn encodeGrid(grid: &TileGrid, options: &EncodeOptions) -> Result<(LayerData, Option<IdOverflow>)> {
	if options.split && !options.extended512 {
		warn!("{}: split only applies to extended layers, ignoring it", grid.tileset);
	}
	let attributes = options.layerAttributes();
	let (bytes, overflow) = packCells(
		&normalize(grid, options.blankTileId),
		CellMode::new(options.extended512),
		attributes.contains(LayerAttributes::SPLIT),
	);
	let layerData = LayerData {
		layer: Layer {
			id: grid.layerId,
			tileset: grid.tileset.clone(),
			attributes,
			width: grid.width,
			height: grid.height,
			tileWidth: grid.tileWidth,
			tileHeight: grid.tileHeight,
		},
		payload: compressPayload(bytes, attributes)?,
	};
	layerData.dataLength()?;
	Ok((layerData, overflow))
}

/// Decompresses and unpacks a layer's payload. A payload that doesn't decode to exactly one cell
/// per grid position is corrupt.
pub fn decodeLayer(layerData: &LayerData) -> Result<Vec<DecodedCell>> {
	let Layer { attributes, width, height, .. } = layerData.layer;
	let mode = CellMode::new(attributes.contains(LayerAttributes::EXTENDED_512));
	let expectedLen = usize::from(width) * usize::from(height) * mode.bytesPerCell();
	let bytes = decompressPayload(&layerData.payload, attributes, expectedLen)?;
	Ok(unpackCells(&bytes, mode, attributes.contains(LayerAttributes::SPLIT)))
}

/// A decoded layer, named the way a consumer refers to it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TileMap {
	pub name: String,
	#[serde(flatten)]
	pub layer: Layer,
	#[serde(skip)]
	pub cells: Vec<DecodedCell>,
}

impl TileMap {
	/// `stem`, suffixed with `_<id>` for every layer but the first.
	pub fn fromLayer(stem: &str, layerData: &LayerData) -> Result<Self> {
		let name = match layerData.layer.id {
			0 | 1 => stem.to_owned(),
			id => format!("{stem}_{id}"),
		};
		Ok(Self { name, layer: layerData.layer.clone(), cells: decodeLayer(layerData)? })
	}

	/// Every layer of a container file.
	pub fn readAll(path: &Path) -> Result<Vec<Self>> {
		let (container, stem) = (Container::read(&fs_read(path)?)?, fileStem(path));
		container.layers.iter().map(|layerData| Self::fromLayer(&stem, layerData)).collect()
	}

	#[must_use]
	pub fn cell(&self, x: usize, y: usize) -> Option<DecodedCell> {
		(x < usize::from(self.layer.width)).then(|| self.cells.get(y * usize::from(self.layer.width) + x)).flatten().copied()
	}

	/// Rows of [`DecodedCell::word`]s.
	#[must_use]
	pub fn words(&self) -> Vec<Vec<u16>> {
		self.cells.chunks(usize::from(self.layer.width).max(1)).map(|row| row.iter().map(|cell| cell.word()).collect()).collect()
	}
}
