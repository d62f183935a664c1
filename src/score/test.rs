use std::sync::Arc;

use flatfinder_geo::{LatLng, WebMercator};

use crate::layer::Layers;
use crate::raster::{Extent, Origin, Raster};
use crate::score::{score, score_listings, Cuts, ListingPoint};

/// A 2x2 raster around central London, values laid out from the north.
fn central(origin: Origin) -> Raster {
    let south_west = LatLng::new(51.45, -0.2).mercator();
    let north_east = LatLng::new(51.55, 0.0).mercator();
    let extent = Extent::new(south_west.x, north_east.x, south_west.y, north_east.y).unwrap();

    Raster::new(vec![1.0, 2.0, 3.0, 4.0], (2, 2, 1), extent, Origin::Upper)
        .unwrap()
        .with_origin(origin)
}

fn listing(id: &str, lat: f64, lon: f64) -> ListingPoint {
    ListingPoint {
        id: id.to_string(),
        lat,
        lon,
    }
}

#[test]
fn scores_are_looked_up_under_each_point() {
    let points = [LatLng::new(51.54, -0.19), LatLng::new(51.46, -0.01)];

    // The origin convention must not change what lies under a point.
    for origin in [Origin::Upper, Origin::Lower] {
        assert_eq!(score(&points, &central(origin)), vec![1.0, 4.0]);
    }
}

#[test]
fn points_outside_the_extent_score_nan() {
    let raster = central(Origin::Lower);
    let outside = [LatLng::new(51.7, -0.1), LatLng::new(51.5, 0.3), LatLng::new(51.0, -0.5)];

    assert!(score(&outside, &raster).iter().all(|v| v.is_nan()));
}

#[test]
fn score_at_a_projected_corner() {
    let raster = central(Origin::Lower);
    let extent = raster.extent();
    let inside = LatLng::from(WebMercator(geo::Point::new(extent.west + 1.0, extent.south + 1.0)).unproject());

    assert_eq!(score(&[inside], &raster), vec![3.0]);
}

#[test]
fn cuts_fail_closed() {
    let cuts = Cuts::from_iter([("park", 10.0), ("town", 10.0)]);

    assert!(cuts.passes([("park", 10.0), ("town", 2.0)]));
    assert!(!cuts.passes([("park", 10.5), ("town", 2.0)]));
    assert!(!cuts.passes([("park", f64::NAN)]));

    // Layers without a cut, and cuts without a score, constrain nothing.
    assert!(cuts.passes([("friends", 500.0)]));
    assert!(cuts.passes(std::iter::empty()));
}

#[test]
fn default_cuts() {
    let cuts = Cuts::default();

    assert_eq!(cuts.get("propvalue"), Some(10000.0));
    assert_eq!(cuts.get("aerial"), Some(30.0));
    assert_eq!(cuts.len(), 6);
}

#[test_log::test]
fn listings_are_scored_and_filtered() {
    let layers = Layers::from_iter([
        ("park", Arc::new(central(Origin::Lower))),
        ("town", Arc::new(central(Origin::Upper).map(|v| v * 10.0))),
    ]);

    let listings = [
        listing("a", 51.54, -0.19),
        listing("b", 51.46, -0.01),
        listing("c", 52.5, -0.1),
    ];

    let table = score_listings(&listings, &layers);

    assert_eq!(table.len(), 3);
    assert_eq!(table.layers().collect::<Vec<_>>(), vec!["park", "town"]);
    assert_eq!(&table.column("park").unwrap()[..2], &[1.0, 4.0]);
    assert_eq!(&table.column("town").unwrap()[..2], &[10.0, 40.0]);

    let cuts = Cuts::from_iter([("park", 3.0), ("town", 30.0)]);
    assert_eq!(table.passing(&cuts), vec!["a"]);
}

#[test]
fn listing_points_accept_long_field_names() {
    let point: ListingPoint =
        serde_json::from_str(r#"{"id": "55501234", "latitude": 51.5, "longitude": -0.1}"#).unwrap();

    assert_eq!(point.position(), LatLng::new(51.5, -0.1));
}
