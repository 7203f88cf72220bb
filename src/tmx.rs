//! Tiled's XML map format: the first tile layer of a map in, a freshly sliced map out.

use {
	crate::{
		atlas::Atlas,
		grid::{fileStem, gridDimension, TileGrid},
		slice::SlicedImage,
		Error, Result,
	},
	core::str::FromStr,
	log::debug,
	quick_xml::{
		events::{BytesStart, Event},
		Reader,
	},
	std::{
		io::{self, Write},
		path::Path,
	},
};

fn attribute(element: &BytesStart<'_>, name: &str) -> Result<Option<String>> {
	for attribute in element.attributes() {
		let attribute = attribute?;
		if attribute.key.as_ref() == name.as_bytes() {
			return Ok(Some(String::from_utf8_lossy(&attribute.value).into_owned()));
		}
	}
	Ok(None)
}

fn parsedAttribute<T: FromStr>(element: &BytesStart<'_>, name: &str) -> Result<T> {
	let tag = String::from_utf8_lossy(element.name().as_ref()).into_owned();
	let value = attribute(element, name)?.ok_or_else(|| Error::InvalidGrid(format!("<{tag}> has no {name}")))?;
	value.trim().parse().map_err(|_| Error::InvalidGrid(format!("<{tag} {name}={value:?}> isn't a number")))
}

/// Reads the map's tile size, its first tileset and its first tile layer.
pub fn parseTMX(text: &str) -> Result<TileGrid> {
	let mut reader = Reader::from_str(text);
	reader.config_mut().trim_text(true);
	let (mut tileSize, mut firstGid, mut tileset) = (None, None, None);
	let (mut layer, mut layerCount, mut csv) = (None, 0, String::new());
	let (mut inFirstTileset, mut inFirstLayer, mut inData) = (false, false, false);
	loop {
		let event = reader.read_event()?;
		match &event {
			Event::Start(element) | Event::Empty(element) => {
				let isStart = matches!(event, Event::Start(_));
				match element.name().as_ref() {
					b"map" => {
						tileSize = Some((
							parsedAttribute::<u8>(element, "tilewidth")?,
							parsedAttribute::<u8>(element, "tileheight")?,
						));
					}
					b"tileset" if firstGid.is_none() => {
						firstGid = Some(parsedAttribute::<u32>(element, "firstgid")?);
						tileset = attribute(element, "source")?.map(|source| fileStem(Path::new(&source)));
						inFirstTileset = isStart;
					}
					b"image" if inFirstTileset && tileset.is_none() => {
						tileset = attribute(element, "source")?.map(|source| fileStem(Path::new(&source)));
					}
					b"layer" => {
						layerCount += 1;
						if layerCount == 1 {
							layer = Some((
								parsedAttribute::<u8>(element, "id")?,
								parsedAttribute::<usize>(element, "width")?,
								parsedAttribute::<usize>(element, "height")?,
							));
							inFirstLayer = isStart;
						} else {
							debug!("skipping layer {:?}", attribute(element, "name")?.unwrap_or_default());
						}
					}
					b"data" if inFirstLayer => {
						let encoding = attribute(element, "encoding")?.unwrap_or_default().to_ascii_lowercase();
						if encoding != "csv" {
							return Err(Error::InvalidGrid(format!("{encoding:?} layer data, only csv is supported")));
						}
						inData = isStart;
					}
					_ => {}
				}
			}
			Event::Text(text) if inData => csv.push_str(&String::from_utf8_lossy(text)),
			Event::End(element) => match element.name().as_ref() {
				b"tileset" => inFirstTileset = false,
				b"layer" => inFirstLayer = false,
				b"data" => inData = false,
				_ => {}
			},
			Event::Eof => break,
			_ => {}
		}
	}

	let missing = |what: &str| Error::InvalidGrid(format!("map has no {what}"));
	let (tileWidth, tileHeight) = tileSize.ok_or_else(|| missing("<map> element"))?;
	let (layerId, width, height) = layer.ok_or_else(|| missing("tile layer"))?;
	let data = csv
		.split(',')
		.map(str::trim)
		.filter(|value| !value.is_empty())
		.map(|value| value.parse::<i64>().map_err(|_| Error::InvalidGrid(format!("{value:?} isn't a cell value"))))
		.collect::<Result<Vec<_>>>()?;
	if data.len() != width * height {
		return Err(Error::InvalidGrid(format!("{width}x{height} layer holds {} cells", data.len())));
	}
	Ok(TileGrid {
		layerId,
		tileset: tileset.ok_or_else(|| missing("tileset source"))?,
		width: gridDimension(width, "width")?,
		height: gridDimension(height, "height")?,
		tileWidth,
		tileHeight,
		firstGid: firstGid.ok_or_else(|| missing("tileset"))?,
		data,
	})
}

/// Writes the grid of a sliced image, pointing its tileset at `imageSource`.
/// `clearMap` replaces every cell value.
pub fn writeTMX(
	writer: &mut impl Write,
	sliced: &SlicedImage,
	atlas: &Atlas,
	imageSource: &str,
	clearMap: Option<i64>,
) -> io::Result<()> {
	let SlicedImage { columns, rows, tileWidth, tileHeight, .. } = *sliced;
	writeln!(writer, r#"<?xml version="1.0" encoding="UTF-8"?>"#)?;
	writeln!(
		writer,
		r#"<map version="1.10" tiledversion="1.10.2" orientation="orthogonal" renderorder="right-down" width="{columns}" height="{rows}" tilewidth="{tileWidth}" tileheight="{tileHeight}" infinite="0" nextlayerid="2" nextobjectid="1">"#
	)?;
	writeln!(
		writer,
		r#" <tileset firstgid="1" name="tiles" tilewidth="{tileWidth}" tileheight="{tileHeight}" tilecount="{}" columns="{}">"#,
		sliced.uniqueTiles.len(),
		atlas.columns
	)?;
	writeln!(
		writer,
		r#"  <image source="{imageSource}" width="{}" height="{}"/>"#,
		atlas.image.width, atlas.image.height
	)?;
	writeln!(writer, " </tileset>")?;
	writeln!(writer, r#" <layer id="1" name="Tile Layer 1" width="{columns}" height="{rows}">"#)?;
	writeln!(writer, r#"  <data encoding="csv">"#)?;
	for (i, row) in sliced.nodes.chunks(columns).enumerate() {
		let values = row
			.iter()
			.map(|node| clearMap.unwrap_or_else(|| node.gid()).to_string())
			.collect::<Vec<_>>()
			.join(",");
		writeln!(writer, "{values}{}", if i + 1 < rows { "," } else { "" })?;
	}
	writeln!(writer, "</data>")?;
	writeln!(writer, " </layer>")?;
	writeln!(writer, "</map>")
}

#[cfg(test)]
mod tests {
	use {
		super::*,
		crate::{atlas::packTileset, image::Image, slice::TiledNode, TiledFlags},
	};

	const LEVEL: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<map version="1.10" orientation="orthogonal" width="3" height="2" tilewidth="16" tileheight="8">
 <tileset firstgid="1" source="../tilesets/Forest Tiles.tsx"/>
 <tileset firstgid="100" source="props.tsx"/>
 <layer id="4" name="ground" width="3" height="2">
  <data encoding="csv">
1,2,2147483651,
0,4,5
</data>
 </layer>
 <layer id="5" name="decor" width="3" height="2">
  <data encoding="base64">AAAA</data>
 </layer>
</map>
"#;

	#[test]
	fn first_layer_of_a_map() {
		let grid = parseTMX(LEVEL).unwrap();
		assert_eq!(grid.tileset, "Forest Tiles");
		assert_eq!((grid.layerId, grid.width, grid.height), (4, 3, 2));
		assert_eq!((grid.tileWidth, grid.tileHeight, grid.firstGid), (16, 8, 1));
		assert_eq!(grid.data, [1, 2, 0x8000_0003, 0, 4, 5]);
	}

	#[test]
	fn inline_tileset_image() {
		let text = r#"<map tilewidth="8" tileheight="8">
 <tileset firstgid="1" name="t" tilewidth="8" tileheight="8"><image source="gfx/font.png" width="64" height="8"/></tileset>
 <layer id="1" width="2" height="1"><data encoding="CSV">1,2</data></layer>
</map>"#;
		let grid = parseTMX(text).unwrap();
		assert_eq!(grid.tileset, "font");
		assert_eq!(grid.data, [1, 2]);
	}

	#[test]
	fn unsupported_or_broken_maps() {
		let base64 = LEVEL.replace(r#"encoding="csv""#, r#"encoding="base64""#);
		assert!(matches!(parseTMX(&base64), Err(Error::InvalidGrid(_))));
		let short = LEVEL.replace("0,4,5", "0,4");
		assert!(matches!(parseTMX(&short), Err(Error::InvalidGrid(_))));
		assert!(matches!(parseTMX("<map tilewidth=\"8\" tileheight=\"8\"/>"), Err(Error::InvalidGrid(_))));
	}

	#[test]
	fn sliced_map_reads_back() {
		let tile = Image::fromRGBA(2, 2, vec![7; 16]);
		let nodes = vec![
			TiledNode { id: 1, flags: TiledFlags::empty() },
			TiledNode { id: 1, flags: TiledFlags::VERTICAL },
			TiledNode { id: 0, flags: TiledFlags::empty() },
			TiledNode { id: 1, flags: TiledFlags::ANTI_DIAGONAL },
		];
		let sliced = SlicedImage {
			uniqueTiles: vec![tile.blankLike(2, 2), tile],
			nodes,
			columns: 2,
			rows: 2,
			tileWidth: 2,
			tileHeight: 2,
		};
		let atlas = packTileset(&sliced.uniqueTiles, 0).unwrap();
		let mut text = Vec::new();
		writeTMX(&mut text, &sliced, &atlas, "room.png", None).unwrap();
		let grid = parseTMX(core::str::from_utf8(&text).unwrap()).unwrap();
		assert_eq!(grid.tileset, "room");
		assert_eq!(grid.data, [2, 0x4000_0002, 1, 0x2000_0002]);

		text.clear();
		writeTMX(&mut text, &sliced, &atlas, "room.png", Some(-1)).unwrap();
		assert_eq!(parseTMX(core::str::from_utf8(&text).unwrap()).unwrap().data, [-1; 4]);
	}
}
