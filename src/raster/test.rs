use approx::assert_relative_eq;
use flatfinder_geo::{LatLng, Project, WebMercator};

use crate::raster::morphology::{fill_holes, Morphology, Unfillable};
use crate::raster::project::{project, to_pixel_indices};
use crate::raster::{Extent, Origin, Raster, RasterError};

fn london_extent() -> Extent {
    let south_west = LatLng::new(51.28, -0.489).mercator();
    let north_east = LatLng::new(51.686, 0.236).mercator();

    Extent::new(south_west.x, north_east.x, south_west.y, north_east.y).expect("valid extent")
}

fn corner(x: f64, y: f64) -> LatLng {
    LatLng::from(WebMercator(geo::Point::new(x, y)).unproject())
}

#[test]
fn rejects_mismatched_grid() {
    let extent = Extent::new(0.0, 2.0, 0.0, 2.0).unwrap();
    let result = Raster::new(vec![0.0; 3], (2, 2, 1), extent, Origin::Lower);

    assert!(matches!(
        result,
        Err(RasterError::ShapeMismatch {
            expected: 4,
            actual: 3
        })
    ));
}

#[test]
fn rejects_inverted_extent() {
    assert!(Extent::new(2.0, 0.0, 0.0, 2.0).is_err());
    assert!(Extent::new(0.0, 2.0, 0.0, f64::NAN).is_err());
}

#[test]
fn corners_round_trip_to_edge_indices() {
    let extent = london_extent();
    let raster = Raster::filled((40, 60), 0.0, extent, Origin::Lower).unwrap();

    let south_west = corner(extent.west, extent.south);
    let north_east = corner(extent.east, extent.north);
    let indices = to_pixel_indices(&[south_west, north_east], &raster);

    assert!(indices[0].row.abs() <= 1 && indices[0].col.abs() <= 1);
    assert!((indices[1].row - 39).abs() <= 1);
    assert!((indices[1].col - 59).abs() <= 1);
}

#[test]
fn upper_origin_counts_rows_from_the_north() {
    let extent = london_extent();
    let lower = Raster::filled((40, 60), 0.0, extent, Origin::Lower).unwrap();
    let upper = Raster::filled((40, 60), 0.0, extent, Origin::Upper).unwrap();

    let north_west = corner(extent.west + 1.0, extent.north - 1.0);

    assert_eq!(to_pixel_indices(&[north_west], &upper)[0].row, 0);
    assert_eq!(to_pixel_indices(&[north_west], &lower)[0].row, 39);
}

#[test]
fn out_of_range_indices_are_not_clamped() {
    let extent = london_extent();
    let raster = Raster::filled((10, 10), 0.0, extent, Origin::Lower).unwrap();

    let index = to_pixel_indices(&[LatLng::new(51.0, 0.0)], &raster)[0];
    assert!(index.row < 0);
    assert_eq!(index.within(10, 10), None);
}

#[test]
fn projection_matches_web_mercator() {
    let point = LatLng::new(51.49477, -0.05966);
    let coords = project(&[point]);
    let WebMercator(expected) = WebMercator::project(point.into(), 0);

    assert_relative_eq!(coords[0].x, expected.x());
    assert_relative_eq!(coords[0].y, expected.y());
}

#[test]
fn flipping_origin_keeps_ground_values() {
    let extent = Extent::new(0.0, 2.0, 0.0, 3.0).unwrap();
    let lower = Raster::new(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], (3, 2, 1), extent, Origin::Lower).unwrap();
    let upper = lower.with_origin(Origin::Upper);

    assert_eq!(upper.data(), &[5.0, 6.0, 3.0, 4.0, 1.0, 2.0]);

    // The south-western cell holds the same value under both conventions.
    let south_west = geo::coord! { x: 0.5, y: 0.5 };
    let lower_ix = lower.transform().index(south_west).within(3, 2).unwrap();
    let upper_ix = upper.transform().index(south_west).within(3, 2).unwrap();
    assert_eq!(lower.get(lower_ix.0, lower_ix.1), upper.get(upper_ix.0, upper_ix.1));

    assert_eq!(upper.with_origin(Origin::Lower), lower);
}

#[test]
fn band_extraction_and_congruence() {
    let extent = Extent::new(0.0, 2.0, 0.0, 1.0).unwrap();
    let rgb = Raster::new(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], (1, 2, 3), extent, Origin::Upper).unwrap();

    let green = rgb.band(1).unwrap();
    assert_eq!(green.data(), &[2.0, 5.0]);
    assert!(green.is_congruent(&rgb));
    assert!(rgb.band(3).is_err());

    let flipped = green.with_origin(Origin::Lower);
    assert!(!flipped.is_congruent(&green));
}

#[test_log::test]
fn single_seed_fills_neighbours_in_one_pass() {
    let mut grid = vec![255u8; 9];
    grid[4] = 2;

    let passes = fill_holes(&mut grid, 3, 3, |v| v == 255, Morphology::Erosion).unwrap();

    assert_eq!(passes, 1);
    assert!(grid.iter().all(|v| *v == 2));
}

#[test_log::test]
fn dilation_spreads_across_a_strip() {
    let mut grid = vec![0.0, 0.0, 0.0, 0.0, 7.0];

    let passes = fill_holes(&mut grid, 1, 5, |v| v == 0.0, Morphology::Dilation).unwrap();

    assert_eq!(passes, 4);
    assert_eq!(grid, vec![7.0; 5]);
}

#[test]
fn seedless_grid_fails_fast() {
    let mut grid = vec![255u8; 16];

    let result = fill_holes(&mut grid, 4, 4, |v| v == 255, Morphology::Erosion);
    assert!(matches!(result, Err(Unfillable { remaining: 16 })));
}
