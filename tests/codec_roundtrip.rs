#![allow(non_snake_case)]

use {
	rand::{rngs::StdRng, Rng, SeedableRng},
	tiled2bin::{
		grid::TileGrid,
		map::Container,
		tilemap::{decodeLayer, encodeGrid, EncodeOptions},
		TileAttributes, TiledFlags,
	},
};

/// A grid of runs of random tiles, most of them flipped somehow, with a few empty cells.
fn randomGrid(rng: &mut StdRng, layerId: u8, capacity: u32) -> TileGrid {
	let (width, height) = (24, 16);
	let mut data = Vec::with_capacity(width * height);
	while data.len() < width * height {
		let raw = if rng.gen_bool(0.1) {
			0
		} else {
			let flags = TiledFlags::ALL[rng.gen_range(0..8)];
			i64::from(rng.gen_range(1..=capacity) | flags.gidBits())
		};
		let run = rng.gen_range(1..6).min(width * height - data.len());
		data.extend(std::iter::repeat(raw).take(run));
	}
	TileGrid {
		layerId,
		tileset: format!("tileset{layerId}"),
		width: width as u16,
		height: height as u16,
		tileWidth: 8,
		tileHeight: 8,
		firstGid: 1,
		data,
	}
}

/// What a decoder should see for `raw`, given a blank id of 0.
fn expectedCell(raw: i64, extended: bool) -> (u16, TileAttributes) {
	if raw == 0 {
		return (0, TileAttributes::empty());
	}
	let gid = raw as u32;
	let tileId = (gid & 0x1FFF_FFFF) as u16 - 1;
	let attributes =
		if extended { TileAttributes::fromTiled(TiledFlags::fromGid(gid)) } else { TileAttributes::empty() };
	(tileId, attributes)
}

#[test]
fn every_mode_and_compression_round_trips() {
	let mut rng = StdRng::seed_from_u64(0x7113_D2B1);
	for extended512 in [false, true] {
		for split in [false, true] {
			for (rle, zx0) in [(false, false), (true, false), (false, true), (true, true)] {
				let options = EncodeOptions { extended512, split, rle, zx0, ..EncodeOptions::default() };
				let grids = [1, 2].map(|layerId| randomGrid(&mut rng, layerId, if extended512 { 512 } else { 256 }));
				let mut layers = Vec::new();
				for grid in &grids {
					let (layerData, overflow) = encodeGrid(grid, &options).unwrap();
					assert!(overflow.is_none());
					layers.push(layerData);
				}
				let container = Container::new(layers);
				let readBack = Container::read(&container.toBytes().unwrap()).unwrap();
				assert_eq!(readBack, container, "extended {extended512}, split {split}, rle {rle}, zx0 {zx0}");

				for (grid, layerData) in grids.iter().zip(&readBack.layers) {
					let decoded = decodeLayer(layerData).unwrap();
					assert_eq!(decoded.len(), grid.data.len());
					for (cell, &raw) in decoded.iter().zip(&grid.data) {
						assert_eq!((cell.tileId, cell.attributes), expectedCell(raw, extended512));
					}
				}
			}
		}
	}
}

#[test]
fn quick_and_backwards_zx0_round_trip() {
	let mut rng = StdRng::seed_from_u64(42);
	let grid = randomGrid(&mut rng, 1, 512);
	for (quick, backwards) in [(true, false), (false, true), (true, true)] {
		let options =
			EncodeOptions { extended512: true, zx0: true, quick, backwards, ..EncodeOptions::default() };
		let (layerData, _) = encodeGrid(&grid, &options).unwrap();
		let ids = decodeLayer(&layerData).unwrap().iter().map(|cell| cell.tileId).collect::<Vec<_>>();
		let expected = grid.data.iter().map(|&raw| expectedCell(raw, true).0).collect::<Vec<_>>();
		assert_eq!(ids, expected);
	}
}

#[test]
fn compression_shrinks_repetitive_layers() {
	let grid = TileGrid {
		layerId: 1,
		tileset: "sky".to_owned(),
		width: 32,
		height: 24,
		tileWidth: 8,
		tileHeight: 8,
		firstGid: 1,
		data: vec![3; 32 * 24],
	};
	for (rle, zx0) in [(true, false), (false, true)] {
		let (layerData, _) = encodeGrid(&grid, &EncodeOptions { rle, zx0, ..EncodeOptions::default() }).unwrap();
		assert!(layerData.payload.len() < 32 * 24 / 4, "{} bytes", layerData.payload.len());
		assert!(decodeLayer(&layerData).unwrap().iter().all(|cell| cell.tileId == 2));
	}
}
