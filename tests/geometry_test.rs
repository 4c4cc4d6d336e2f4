//! Property tests for spatial shape normalization

use geo_types::Coord;
use proptest::prelude::*;
use search_bridge::query::geometry::{dedup_consecutive, normalize};
use search_bridge::SearchError;

fn coordinates() -> impl Strategy<Value = Vec<Coord<f64>>> {
    // A small grid makes repeated vertices likely
    prop::collection::vec((0i32..4, 0i32..4), 0..24).prop_map(|points| {
        points
            .into_iter()
            .map(|(x, y)| Coord {
                x: f64::from(x),
                y: f64::from(y),
            })
            .collect()
    })
}

fn polygon_wkt(ring: &[(i32, i32)]) -> String {
    let points: Vec<String> = ring.iter().map(|(x, y)| format!("{} {}", x, y)).collect();
    format!("POLYGON(({}))", points.join(", "))
}

proptest! {
    #[test]
    fn dedup_is_idempotent(coords in coordinates()) {
        let once = dedup_consecutive(&coords);
        prop_assert_eq!(dedup_consecutive(&once), once);
    }

    #[test]
    fn dedup_leaves_no_adjacent_duplicates(coords in coordinates()) {
        let deduped = dedup_consecutive(&coords);
        prop_assert!(deduped.len() <= coords.len());
        prop_assert!(deduped.windows(2).all(|pair| pair[0] != pair[1]));
        prop_assert_eq!(deduped.first(), coords.first());
    }

    #[test]
    fn polygon_normalization_is_idempotent(repeats in prop::collection::vec(1usize..4, 4)) {
        let corners = [(0, 0), (10, 0), (10, 10), (0, 0)];
        let ring: Vec<(i32, i32)> = corners
            .iter()
            .zip(&repeats)
            .flat_map(|(corner, n)| std::iter::repeat(*corner).take(*n))
            .collect();

        let once = normalize(&polygon_wkt(&ring)).unwrap();
        prop_assert_eq!(normalize(&once).unwrap(), once.clone());
        prop_assert_eq!(once.matches(',').count(), 3);
    }
}

#[test]
fn test_supported_shapes() {
    assert!(normalize("POINT(10 20)").is_ok());
    assert!(normalize("MULTIPOLYGON(((0 0, 1 0, 1 1, 0 0)), ((5 5, 6 5, 6 6, 5 5)))").is_ok());
    let ring = normalize("LINEARRING(0 0, 1 0, 1 1, 0 0)").unwrap();
    assert!(ring.starts_with("LINEARRING"));
}

#[test]
fn test_rejected_shapes() {
    for wkt in [
        "LINESTRING(0 0, 1 1)",
        "MULTIPOINT((0 0), (1 1))",
        "LINEARRING(0 0, 1 0, 1 1, 2 2)",
        "POLYGON((0 0, 1 0",
        "POLYGON((0 0, 1 0, 1 1))",
        "POLYGON((0 0, 0 0, 0 0, 0 0))",
    ] {
        let err = normalize(wkt).unwrap_err();
        assert!(matches!(err, SearchError::UnsupportedShape(_)), "{}", wkt);
    }
}
