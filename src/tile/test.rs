use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use approx::assert_relative_eq;
use flatfinder_geo::{LatLng, SlippyTile, TILE_SIZE};
use image::{ImageFormat, Rgb, RgbImage};

use crate::raster::{Extent, Origin};
use crate::tile::decode::{classify, decode};
use crate::tile::error::{DecodeError, FetchError};
use crate::tile::fetch::{Bounds, TileFetcher, TileSettings};
use crate::tile::mirror::{select_mirror, MirrorSelector};
use crate::tile::palette::{Colour, Palette, UNCLASSIFIED};
use crate::tile::source::TileSource;
use crate::Error;

const PIN: (f64, f64) = (51.49477, -0.05966);
const YELLOW: [u8; 3] = [0xFF, 0xF2, 0x00];
const WHITE: [u8; 3] = [0xFF, 0xFF, 0xFF];

/// A small box around the pin, covered by a handful of zoom-12 tiles.
const NEAR_PIN: Bounds = (-0.07, -0.05, 51.49, 51.50);

fn png(colour: [u8; 3]) -> Vec<u8> {
    let image = RgbImage::from_pixel(TILE_SIZE, TILE_SIZE, Rgb(colour));
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .expect("encodes png");
    bytes
}

/// Answers only for one live mirror; every other mirror is "blocked".
struct FakeSource {
    live: &'static str,
    tile: Vec<u8>,
    probes: AtomicUsize,
    tiles: AtomicUsize,
}

impl FakeSource {
    fn new(live: &'static str, colour: [u8; 3]) -> Self {
        FakeSource {
            live,
            tile: png(colour),
            probes: AtomicUsize::new(0),
            tiles: AtomicUsize::new(0),
        }
    }
}

impl TileSource for FakeSource {
    fn get(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        if url.starts_with("https://api-") && !url.starts_with(&format!("https://api-{}.", self.live)) {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: 403,
            });
        }

        if url.contains("/tile/") || url.contains("openstreetmap") {
            self.tiles.fetch_add(1, Ordering::SeqCst);
            return Ok(self.tile.clone());
        }

        self.probes.fetch_add(1, Ordering::SeqCst);
        Ok(Vec::new())
    }
}

fn tile_count(bounds: Bounds, zoom: u8) -> (usize, usize) {
    let (xs, ys) = SlippyTile::covering(bounds, zoom);
    (xs.count(), ys.count())
}

#[test]
fn first_live_mirror_wins() {
    let hosts = ["nile", "tigris", "ganges"].map(String::from);
    let probe = |host: &str| match host {
        "nile" => Err(FetchError::Status {
            url: host.to_string(),
            status: 403,
        }),
        _ => Ok(()),
    };

    assert_eq!(select_mirror(probe, &hosts).unwrap(), "tigris");
}

#[test_log::test]
fn all_mirrors_failing_lists_every_attempt() {
    let hosts = ["nile", "tigris", "ganges"].map(String::from);
    let probe = |host: &str| {
        Err(FetchError::Request {
            url: host.to_string(),
            reason: "unreachable".to_string(),
        })
    };

    match select_mirror(probe, &hosts) {
        Err(FetchError::NoMirrorAvailable { attempts }) => {
            let tried: Vec<&str> = attempts.iter().map(|(host, _)| host.as_str()).collect();
            assert_eq!(tried, vec!["nile", "tigris", "ganges"]);
        }
        other => panic!("expected every mirror to fail, got {other:?}"),
    }
}

#[test]
fn selected_mirror_is_probed_once() {
    let source = FakeSource::new("ganges", YELLOW);
    let selector = MirrorSelector::new(
        ["nile", "tigris", "ganges"].map(String::from).to_vec(),
        "https://api-{mirror}.tfl.gov.uk",
    );

    assert_eq!(selector.select(&source).unwrap(), "ganges");
    assert_eq!(selector.select(&source).unwrap(), "ganges");
    assert_eq!(source.probes.load(Ordering::SeqCst), 1);
    assert_eq!(selector.selected().as_deref(), Some("ganges"));
}

#[test]
fn palette_matches_exactly() {
    let palette = Palette::tfl();

    assert_eq!(palette.len(), 11);
    assert_eq!(palette.classify([0xED, 0x1C, 0x24]), 1);
    assert_eq!(palette.classify([0x00, 0x00, 0x00]), 10);
    assert_eq!(palette.classify([0xED, 0x1C, 0x25]), UNCLASSIFIED);
}

#[test]
fn band_minutes_are_midpoints_with_open_last_band() {
    let minutes = Palette::tfl().minutes(5.0);

    assert_relative_eq!(minutes[0], 2.5);
    assert_relative_eq!(minutes[3], 17.5);
    assert_relative_eq!(minutes[9], 47.5);
    assert_eq!(minutes[10], f64::INFINITY);
}

#[test]
fn colours_parse_from_hex() {
    assert_eq!("#1C9959".parse::<Colour>().unwrap(), Colour([0x1C, 0x99, 0x59]));
    assert_eq!(Colour([0x1C, 0x99, 0x59]).to_string(), "#1C9959");
    assert!("1C9959".parse::<Colour>().is_err());
    assert!("#1C99".parse::<Colour>().is_err());
    assert!("#GG9959".parse::<Colour>().is_err());
}

#[test]
fn palette_deserializes_from_hex_list() {
    let palette: Palette = serde_json::from_str(r##"["#460000", "#ED1C24"]"##).unwrap();
    assert_eq!(palette.classify([0x46, 0x00, 0x00]), 0);

    assert!(serde_json::from_str::<Palette>("[]").is_err());
}

#[test_log::test]
fn single_classified_pixel_fills_the_image() {
    let mut image = RgbImage::from_pixel(3, 3, Rgb(WHITE));
    image.put_pixel(1, 1, Rgb(YELLOW));

    let extent = Extent::new(0.0, 3.0, 0.0, 3.0).unwrap();
    let raster = decode(&image, &Palette::tfl(), 5.0, extent).unwrap();

    assert_eq!(raster.origin(), Origin::Upper);
    assert!(raster.data().iter().all(|minutes| *minutes == 17.5));
}

#[test]
fn boundary_pixels_take_the_fastest_neighbour() {
    let mut image = RgbImage::from_pixel(3, 1, Rgb(WHITE));
    image.put_pixel(0, 0, Rgb([0x46, 0x00, 0x00]));
    image.put_pixel(2, 0, Rgb(YELLOW));

    let extent = Extent::new(0.0, 3.0, 0.0, 1.0).unwrap();
    let raster = decode(&image, &Palette::tfl(), 5.0, extent).unwrap();

    assert_eq!(raster.data(), &[2.5, 2.5, 17.5]);
}

#[test]
fn unclassifiable_image_fails_fast() {
    let image = RgbImage::from_pixel(4, 4, Rgb(WHITE));
    assert!(classify(&image, &Palette::tfl()).iter().all(|band| *band == UNCLASSIFIED));

    let extent = Extent::new(0.0, 4.0, 0.0, 4.0).unwrap();
    let result = decode(&image, &Palette::tfl(), 5.0, extent);
    assert!(matches!(result, Err(Error::Decode(DecodeError::NoClassifiedPixels))));
}

#[test]
fn travel_time_urls_carry_pin_and_parameters() {
    let fetcher = TileFetcher::new(Arc::new(FakeSource::new("nile", YELLOW)), TileSettings::default());
    let url = fetcher
        .tile_url("tigris", LatLng::new(PIN.0, PIN.1), SlippyTile((2046, 0), (1362, 0), 12), 5)
        .unwrap();

    assert!(url.starts_with("https://api-tigris.tfl.gov.uk/TravelTimes/Average/51.49477/-0.05966/tile/12/2046/1362?"));
    assert!(url.contains("timeOfDayId=INTER"));
    assert!(url.contains("modeId=All"));
    assert!(url.contains("travelTimeInterval=5"));
    assert!(url.contains("scenarioTitle=Base"));
}

#[test_log::test]
fn time_map_mosaics_every_covering_tile() {
    let source = Arc::new(FakeSource::new("tigris", YELLOW));
    let fetcher = TileFetcher::new(source.clone(), TileSettings::default());

    let raster = fetcher
        .time_map(LatLng::new(PIN.0, PIN.1), 12, 5, NEAR_PIN)
        .unwrap();

    let (nx, ny) = tile_count(NEAR_PIN, 12);
    assert_eq!(raster.shape(), (ny * TILE_SIZE as usize, nx * TILE_SIZE as usize));
    assert_eq!(raster.origin(), Origin::Upper);
    assert_eq!(source.tiles.load(Ordering::SeqCst), nx * ny);
    assert_eq!(source.probes.load(Ordering::SeqCst), 1);
    assert!(raster.data().iter().all(|minutes| *minutes == 17.5));

    // The mosaic covers the requested box.
    let south_west = LatLng::new(NEAR_PIN.2, NEAR_PIN.0).mercator();
    let north_east = LatLng::new(NEAR_PIN.3, NEAR_PIN.1).mercator();
    assert!(raster.extent().contains(south_west));
    assert!(raster.extent().contains(north_east));
}

#[test]
fn time_map_fails_when_every_mirror_is_blocked() {
    let fetcher = TileFetcher::new(Arc::new(FakeSource::new("thames", YELLOW)), TileSettings::default());
    let result = fetcher.time_map(LatLng::new(PIN.0, PIN.1), 12, 5, NEAR_PIN);

    assert!(matches!(result, Err(Error::Fetch(FetchError::NoMirrorAvailable { .. }))));
}

#[test]
fn base_map_keeps_three_bands() {
    let fetcher = TileFetcher::new(Arc::new(FakeSource::new("nile", [10, 20, 30])), TileSettings::default());
    let base = fetcher.base_map(12, NEAR_PIN).unwrap();

    assert_eq!(base.bands(), 3);
    assert_eq!(base.value(0, 0, 2), Some(30.0));
}

#[test_log::test]
fn fetched_tiles_share_one_mirror_selection() {
    let source = Arc::new(FakeSource::new("tigris", YELLOW));
    let fetcher = TileFetcher::new(source.clone(), TileSettings::default());
    let pin = LatLng::new(PIN.0, PIN.1);

    let image = fetcher.fetch_tile(pin, 12, (2046, 1362), 5).unwrap();
    assert_eq!(image.dimensions(), (TILE_SIZE, TILE_SIZE));
    assert_eq!(image.get_pixel(0, 0).0, YELLOW);

    fetcher.fetch_tile(pin, 12, (2047, 1362), 5).unwrap();
    fetcher.fetch_tile(pin, 12, (2046, 1362), 10).unwrap();

    assert_eq!(source.tiles.load(Ordering::SeqCst), 3);
    assert_eq!(source.probes.load(Ordering::SeqCst), 1);
    assert_eq!(fetcher.mirrors().selected().as_deref(), Some("tigris"));
}

#[test]
fn undersized_tiles_are_rejected() {
    let mut tile = Vec::new();
    RgbImage::from_pixel(64, 64, Rgb(YELLOW))
        .write_to(&mut Cursor::new(&mut tile), ImageFormat::Png)
        .expect("encodes png");

    let source = FakeSource {
        tile,
        ..FakeSource::new("nile", YELLOW)
    };
    let fetcher = TileFetcher::new(Arc::new(source), TileSettings::default());

    let result = fetcher.fetch_tile(LatLng::new(PIN.0, PIN.1), 12, (2046, 1362), 5);
    assert!(matches!(
        result,
        Err(Error::Decode(DecodeError::TileSize { expected: 256, found: (64, 64) }))
    ));
}
