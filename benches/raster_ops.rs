use criterion::criterion_main;
use geo::{coord, Geometry, GeometryCollection, Rect};
use image::{Rgb, RgbImage};

use flatfinder::rasterize::{distance_field, rasterize, DistanceScale};
use flatfinder::tile::{decode, Palette};
use flatfinder::warp::resample;
use flatfinder::{Extent, Origin, Raster, Resampling};

/// A zoom-12 mosaic of 3x3 tiles.
const SIDE: usize = 768;

struct ParkScenario {
    name: &'static str,
    parks: usize,
}

const PARK_CASES: [ParkScenario; 3] = [
    ParkScenario { name: "sparse", parks: 4 },
    ParkScenario { name: "borough", parks: 40 },
    ParkScenario { name: "dense", parks: 400 },
];

fn reference() -> Raster {
    let extent = Extent::new(0.0, SIDE as f64, 0.0, SIDE as f64).expect("Extent must be valid");
    Raster::filled((SIDE, SIDE), 0.0, extent, Origin::Upper).expect("Raster must be created")
}

/// Square parks scattered over the grid by a fixed stride.
fn parks(count: usize) -> Geometry {
    let side = SIDE as f64;
    let collection = (0..count)
        .map(|i| {
            let x = (i * 7919) as f64 % (side - 20.0);
            let y = (i * 104729) as f64 % (side - 20.0);
            Geometry::Polygon(Rect::new(coord! { x: x, y: y }, coord! { x: x + 12.0, y: y + 9.0 }).to_polygon())
        })
        .collect();

    Geometry::GeometryCollection(GeometryCollection(collection))
}

fn rasterize_benchmark(c: &mut criterion::Criterion) {
    let mut group = c.benchmark_group("proximity");
    group.significance_level(0.1).sample_size(30);

    let reference = reference();
    let scale = DistanceScale::default();

    PARK_CASES.into_iter().for_each(|sc| {
        let geometry = parks(sc.parks);
        let mask = rasterize(&geometry, &reference);

        group.bench_function(format!("rasterize: {}", sc.name), |b| {
            b.iter(|| rasterize(&geometry, &reference))
        });

        group.bench_function(format!("distance_field: {}", sc.name), |b| {
            b.iter(|| distance_field(&mask, &scale))
        });
    });

    group.finish();
}

fn warp_benchmark(c: &mut criterion::Criterion) {
    let reference = reference();

    let extent = Extent::new(-10.0, SIDE as f64 + 10.0, -10.0, SIDE as f64 + 10.0).expect("Extent must be valid");
    let data = (0..SIDE * SIDE).map(|i| (i % 97) as f64).collect();
    let source = Raster::new(data, (SIDE, SIDE, 1), extent, Origin::Lower).expect("Raster must be created");

    c.bench_function("resample: nearest", |b| {
        b.iter(|| resample(&reference, &source, Resampling::Nearest))
    });
    c.bench_function("resample: bilinear", |b| {
        b.iter(|| resample(&reference, &source, Resampling::Bilinear))
    });
}

fn decode_benchmark(c: &mut criterion::Criterion) {
    let palette = Palette::tfl();
    let extent = Extent::new(0.0, 1.0, 0.0, 1.0).expect("Extent must be valid");

    // Concentric bands with a ring of unclassified road pixels every so often.
    let image = RgbImage::from_fn(SIDE as u32, SIDE as u32, |x, y| {
        let ring = (x.abs_diff(384).max(y.abs_diff(384)) / 40) as usize;
        if ring % 5 == 4 {
            Rgb([0xFF, 0xFF, 0xFF])
        } else {
            Rgb(palette.colours()[ring.min(palette.len() - 1)].0)
        }
    });

    c.bench_function("decode: mosaic", |b| {
        b.iter(|| decode(&image, &palette, 5.0, extent).expect("Mosaic must decode"))
    });
}

criterion::criterion_group!(raster_benches, rasterize_benchmark, warp_benchmark, decode_benchmark);
criterion_main!(raster_benches);
