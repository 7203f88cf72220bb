//! Editor grids as read from TMX or CSV files, and their normalisation into cells.

use {
	crate::{
		attributes::{TiledFlags, GID_MASK},
		fs_read, tmx, Error, Result,
	},
	memchr::memchr,
	serde::Deserialize,
	std::path::Path,
};

/// One layer of raw editor values, `gid | flags << 28` or `0`/`-1` for empty space.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TileGrid {
	pub layerId: u8,
	pub tileset: String,
	pub width: u16,
	pub height: u16,
	pub tileWidth: u8,
	pub tileHeight: u8,
	pub firstGid: u32,
	pub data: Vec<i64>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Cell {
	/// 0-based, possibly out of range for the packing mode.
	pub tileId: i64,
	pub flags: TiledFlags,
	pub isBlank: bool,
}

impl Cell {
	#[must_use]
	pub fn fromRaw(raw: i64, firstGid: u32, blankTileId: i64) -> Self {
		if raw == 0 || raw == -1 {
			return Self { tileId: blankTileId, flags: TiledFlags::empty(), isBlank: true };
		}
		let gid = raw as u32;
		Self {
			tileId: i64::from(gid & GID_MASK) - i64::from(firstGid),
			flags: TiledFlags::fromGid(gid),
			isBlank: false,
		}
	}
}

/// Strips the global-id offset and the flag bits, row-major.
#[must_use]
pub fn normalize(grid: &TileGrid, blankTileId: i64) -> Vec<Cell> {
	grid.data.iter().map(|&raw| Cell::fromRaw(raw, grid.firstGid, blankTileId)).collect()
}

#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum GridFormat {
	#[default]
	Auto,
	Tmx,
	Csv,
}

impl GridFormat {
	/// Picks a format by extension, then by whether the first line opens an XML tag.
	#[must_use]
	pub fn detect(path: &Path, contents: &[u8]) -> Self {
		match path.extension().and_then(|extension| extension.to_str()).map(str::to_ascii_lowercase).as_deref() {
			Some("tmx") => Self::Tmx,
			Some("csv" | "txt") => Self::Csv,
			_ => {
				let firstLine = &contents[..memchr(b'\n', contents).unwrap_or(contents.len())];
				match firstLine.iter().find(|byte| !byte.is_ascii_whitespace()) {
					Some(b'<') => Self::Tmx,
					_ => Self::Csv,
				}
			}
		}
	}
}

/// What a bare CSV grid can't say about itself.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CsvOptions {
	pub tileWidth: u8,
	pub tileHeight: u8,
	pub firstGid: u32,
}

impl Default for CsvOptions {
	fn default() -> Self {
		Self { tileWidth: 8, tileHeight: 8, firstGid: 1 }
	}
}

/// Rows of comma-separated integers. Empty fields are skipped, so trailing commas are harmless.
pub fn parseCSV(text: &str, tileset: &str, options: &CsvOptions) -> Result<TileGrid> {
	let mut reader = csv::ReaderBuilder::new()
		.has_headers(false)
		.flexible(true)
		.trim(csv::Trim::All)
		.from_reader(text.as_bytes());
	let (mut data, mut width, mut height) = (Vec::new(), None, 0);
	for record in reader.records() {
		let record = record?;
		let row = record
			.iter()
			.filter(|field| !field.is_empty())
			.map(|field| {
				field.parse::<i64>().map_err(|_| Error::InvalidGrid(format!("row {}: {field:?} isn't an integer", height + 1)))
			})
			.collect::<Result<Vec<_>>>()?;
		if row.is_empty() {
			continue;
		}
		match width {
			None => width = Some(row.len()),
			Some(width) if width != row.len() => {
				return Err(Error::InvalidGrid(format!("row {} has {} cells, expected {width}", height + 1, row.len())));
			}
			_ => {}
		}
		data.extend(row);
		height += 1;
	}
	let Some(width) = width else {
		return Err(Error::InvalidGrid("no cells".to_owned()));
	};
	Ok(TileGrid {
		layerId: 1,
		tileset: tileset.to_owned(),
		width: gridDimension(width, "width")?,
		height: gridDimension(height, "height")?,
		tileWidth: options.tileWidth,
		tileHeight: options.tileHeight,
		firstGid: options.firstGid,
		data,
	})
}

pub(crate) fn gridDimension(value: usize, name: &str) -> Result<u16> {
	u16::try_from(value).map_err(|_| Error::InvalidGrid(format!("{name} of {value} cells doesn't fit 16 bits")))
}

#[must_use]
pub fn fileStem(path: &Path) -> String {
	path.file_stem().map(|stem| stem.to_string_lossy().into_owned()).unwrap_or_default()
}

/// Reads a TMX or CSV grid file.
pub fn readGrid(path: &Path, format: GridFormat, csvOptions: &CsvOptions) -> Result<TileGrid> {
	let contents = fs_read(path)?;
	let format = match format {
		GridFormat::Auto => GridFormat::detect(path, &contents),
		format => format,
	};
	let text = String::from_utf8(contents).map_err(|err| Error::InvalidGrid(format!("not UTF-8: {err}")))?;
	match format {
		GridFormat::Csv => parseCSV(&text, &fileStem(path), csvOptions),
		_ => tmx::parseTMX(&text),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn cells_lose_offset_and_flags() {
		assert_eq!(Cell::fromRaw(5, 1, 0), Cell { tileId: 4, flags: TiledFlags::empty(), isBlank: false });
		assert_eq!(
			Cell::fromRaw(0xA000_0003, 1, 0),
			Cell { tileId: 2, flags: TiledFlags::HORIZONTAL | TiledFlags::ANTI_DIAGONAL, isBlank: false }
		);
		for empty in [0, -1] {
			assert_eq!(Cell::fromRaw(empty, 1, 7), Cell { tileId: 7, flags: TiledFlags::empty(), isBlank: true });
		}
		// a gid below the tileset's first one
		assert_eq!(Cell::fromRaw(3, 10, 0).tileId, -7);
	}

	#[test]
	fn csv_grid() {
		let grid = parseCSV("1, 2,3,\n4,5,6,\n\n", "level", &CsvOptions::default()).unwrap();
		assert_eq!([grid.width, grid.height], [3, 2]);
		assert_eq!(grid.data, [1, 2, 3, 4, 5, 6]);
		assert_eq!(grid.tileset, "level");
		assert_eq!(
			normalize(&grid, 0).iter().map(|cell| cell.tileId).collect::<Vec<_>>(),
			[0, 1, 2, 3, 4, 5]
		);
	}

	#[test]
	fn bad_csv_grids() {
		let options = CsvOptions::default();
		assert!(matches!(parseCSV("1,2\n3\n", "", &options), Err(Error::InvalidGrid(_))));
		assert!(matches!(parseCSV("1,x\n", "", &options), Err(Error::InvalidGrid(_))));
		assert!(matches!(parseCSV("\n", "", &options), Err(Error::InvalidGrid(_))));
	}

	#[test]
	fn format_detection() {
		assert_eq!(GridFormat::detect(Path::new("a.TMX"), b"1,2"), GridFormat::Tmx);
		assert_eq!(GridFormat::detect(Path::new("a.txt"), b"<map>"), GridFormat::Csv);
		assert_eq!(GridFormat::detect(Path::new("a"), b"  <?xml version=\"1.0\"?>\n"), GridFormat::Tmx);
		assert_eq!(GridFormat::detect(Path::new("a.dat"), b"0,1\n<"), GridFormat::Csv);
	}
}
