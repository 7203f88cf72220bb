use {
	crate::{fs_read, slice::SliceOptions, tilemap::EncodeOptions, Result},
	serde::Deserialize,
	std::path::{Path, PathBuf},
};

/// Everything a run can be told, as read from a TOML file. Missing keys keep their defaults.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
	pub encode: EncodeOptions,
	pub slice: SliceOptions,
	pub output: OutputOptions,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct OutputOptions {
	/// One raw payload file per input, no container framing.
	pub noHeader: bool,
	pub mapExtension: String,
	pub zx0Extension: String,
	pub rleExtension: String,
	pub outDir: PathBuf,
}

impl Default for OutputOptions {
	fn default() -> Self {
		Self {
			noHeader: false,
			mapExtension: "map".to_owned(),
			zx0Extension: "map.zx0".to_owned(),
			rleExtension: "map.rle".to_owned(),
			outDir: PathBuf::from("."),
		}
	}
}

impl OutputOptions {
	/// ZX0 wins over RLE when both are on.
	#[must_use]
	pub fn extensionFor(&self, encode: &EncodeOptions) -> &str {
		if encode.zx0 {
			&self.zx0Extension
		} else if encode.rle {
			&self.rleExtension
		} else {
			&self.mapExtension
		}
	}

	/// `<outDir>/<stem>.<extension>`
	#[must_use]
	pub fn outputPath(&self, stem: &str, extension: &str) -> PathBuf {
		self.outDir.join(format!("{stem}.{}", extension.trim_start_matches('.')))
	}
}

impl Config {
	pub fn load(path: &Path) -> Result<Self> {
		Ok(toml::from_slice(&fs_read(path)?)?)
	}
}
