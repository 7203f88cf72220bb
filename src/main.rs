#![warn(clippy::pedantic, elided_lifetimes_in_paths, explicit_outlives_requirements)]
#![allow(non_snake_case)]

use {
	clap::Parser,
	const_format::concatcp,
	log::{error, info},
	std::{path::PathBuf, process::ExitCode},
	tiled2bin::{
		batch::{encodeFiles, expandPatterns, sliceFiles},
		config::Config,
		grid::GridFormat,
		map::{LAYER_HEADER_SIZE, VERSION},
	},
};

const AFTER_HELP: &str = concatcp!(
	"Every input becomes one layer of a single container (format version ",
	VERSION,
	", ",
	LAYER_HEADER_SIZE,
	"-byte layer headers, payloads up to ",
	u16::MAX,
	" bytes). Flags override the --config file."
);

#[derive(Parser)]
#[clap(version, about = "Tiled maps into binary tilemaps, and images into deduplicated tilesets", after_help = AFTER_HELP)]
struct Args {
	/// Grid files (.tmx, .csv) to encode, or images (.png) with --slice. Glob patterns are expanded.
	#[clap(required = true)]
	files: Vec<String>,

	/// TOML file with [encode], [slice] and [output] tables.
	#[clap(long)]
	config: Option<PathBuf>,

	/// Slice images into a tileset PNG and a TMX grid instead of encoding.
	#[clap(long)]
	slice: bool,

	#[clap(long, arg_enum)]
	format: Option<GridFormat>,

	/// 9-bit tile ids plus transform attributes, two bytes per cell.
	#[clap(long, alias = "512")]
	extended512: bool,

	/// 0-based tile id stored for empty cells.
	#[clap(long, allow_hyphen_values = true)]
	blank: Option<i64>,

	#[clap(long)]
	rle: bool,

	#[clap(long)]
	zx0: bool,

	/// Quick, non-optimal ZX0 compression.
	#[clap(long, short)]
	quick: bool,

	/// Backwards ZX0 compression.
	#[clap(long, short)]
	backwards: bool,

	/// Write each layer's raw payload to its own file, without container framing.
	#[clap(long)]
	noHeader: bool,

	/// All id bytes, then all attribute bytes. Needs --extended512.
	#[clap(long)]
	split: bool,

	/// Tile width and height in pixels.
	#[clap(long)]
	tileSize: Option<u8>,

	/// Atlas width in pixels, 0 for a near-square power of two.
	#[clap(long)]
	tilesetWidth: Option<usize>,

	/// Every tile position becomes its own tile.
	#[clap(long)]
	noRepeat: bool,

	#[clap(long)]
	noMirror: bool,

	/// Also match tiles rotated by 90 degrees (square tiles only).
	#[clap(long)]
	rotate: bool,

	#[clap(long)]
	noBlankTile: bool,

	/// Value written into every cell of the sliced TMX grid.
	#[clap(long, allow_hyphen_values = true)]
	clearMap: Option<i64>,

	#[clap(long)]
	mapExt: Option<String>,

	#[clap(long)]
	zx0Ext: Option<String>,

	#[clap(long)]
	rleExt: Option<String>,

	#[clap(long)]
	outDir: Option<PathBuf>,
}

impl Args {
	fn config(&self) -> tiled2bin::Result<Config> {
		let mut config = match &self.config {
			Some(path) => Config::load(path)?,
			None => Config::default(),
		};
		let Config { encode, slice, output } = &mut config;

		encode.extended512 |= self.extended512;
		encode.split |= self.split;
		encode.rle |= self.rle;
		encode.zx0 |= self.zx0;
		encode.quick |= self.quick;
		encode.backwards |= self.backwards;
		if let Some(blank) = self.blank {
			encode.blankTileId = blank;
		}
		if let Some(format) = self.format {
			encode.gridFormat = format;
		}
		if let Some(tileSize) = self.tileSize {
			(encode.csv.tileWidth, encode.csv.tileHeight) = (tileSize, tileSize);
			(slice.tileWidth, slice.tileHeight) = (tileSize.into(), tileSize.into());
		}

		if let Some(tilesetWidth) = self.tilesetWidth {
			slice.tilesetWidth = tilesetWidth;
		}
		slice.dedupRepeats &= !self.noRepeat;
		slice.dedupMirrors &= !self.noMirror;
		slice.dedupRotations |= self.rotate;
		slice.insertBlankTile &= !self.noBlankTile;
		if self.clearMap.is_some() {
			slice.clearMap = self.clearMap;
		}

		output.noHeader |= self.noHeader;
		for (value, field) in [
			(&self.mapExt, &mut output.mapExtension),
			(&self.zx0Ext, &mut output.zx0Extension),
			(&self.rleExt, &mut output.rleExtension),
		] {
			if let Some(value) = value {
				field.clone_from(value);
			}
		}
		if let Some(outDir) = &self.outDir {
			output.outDir.clone_from(outDir);
		}
		Ok(config)
	}
}

fn main() -> ExitCode {
	env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
	let args = Args::parse();
	let config = match args.config() {
		Ok(ok) => ok,
		Err(err) => {
			error!("{err}");
			return ExitCode::FAILURE;
		}
	};

	let paths = expandPatterns(&args.files);
	let report = if args.slice { sliceFiles(&paths, &config) } else { encodeFiles(&paths, &config) };
	info!(
		"{} processed, {} failed, {} warnings, {} files written",
		report.processed,
		report.failed,
		report.warnings,
		report.outputs.len()
	);
	if report.failed == 0 && !report.outputs.is_empty() {
		ExitCode::SUCCESS
	} else {
		ExitCode::FAILURE
	}
}
