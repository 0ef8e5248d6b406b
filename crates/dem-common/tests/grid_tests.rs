//! Coverage and filename properties of the 1-degree grid.

use dem_common::{
    cells_covering, coverage, GeoBounds, GridCell, Resolution, TileName, MIN_FRAGMENT_DEG,
};

fn bounds(w: f64, s: f64, e: f64, n: f64) -> GeoBounds {
    GeoBounds::new(w, s, e, n).unwrap()
}

// ============================================================================
// Coverage properties
// ============================================================================

#[test]
fn test_coverage_union_contains_request() {
    // For a spread of request boxes, every kept cell clip lies inside the
    // request, and every point of the request away from discarded slivers
    // falls inside some kept cell.
    let cases = [
        bounds(-105.0, 40.0, -103.0, 41.0),
        bounds(-0.5, -0.5, 0.5, 0.5),
        bounds(9.25, 45.5, 12.75, 48.5),
        bounds(-180.0, -60.0, -177.5, -57.5),
        bounds(138.2, 35.1, 139.9, 36.8),
    ];

    for request in cases {
        let cov = coverage(&request);
        assert!(!cov.is_empty(), "no coverage for {request}");

        for c in &cov {
            assert!(request.contains(&c.clipped), "clip escapes request");
            assert!(c.cell.bounds().contains(&c.clipped));
            assert!(c.clipped.width() >= MIN_FRAGMENT_DEG);
            assert!(c.clipped.height() >= MIN_FRAGMENT_DEG);
        }

        // Sample interior points; each must land in exactly one cell clip
        // unless its column/row was discarded as a sliver.
        let steps = 9;
        for i in 1..steps {
            for j in 1..steps {
                let lon = request.west + request.width() * i as f64 / steps as f64;
                let lat = request.south + request.height() * j as f64 / steps as f64;
                let hits = cov
                    .iter()
                    .filter(|c| c.clipped.contains_point(lon, lat))
                    .count();
                let cell = GridCell::containing(lon, lat);
                let discarded = !cov.iter().any(|c| c.cell == cell);
                assert!(
                    hits >= 1 || discarded,
                    "point ({lon}, {lat}) uncovered in {request}"
                );
            }
        }
    }
}

#[test]
fn test_coverage_order_is_deterministic() {
    let request = bounds(-105.3, 39.7, -102.1, 41.6);
    let a = cells_covering(&request);
    let b = cells_covering(&request);
    assert_eq!(a, b);

    // South-to-north rows, west-to-east within a row.
    for pair in a.windows(2) {
        assert!(pair[0].lat < pair[1].lat || pair[0].lon < pair[1].lon);
    }
}

#[test]
fn test_example_scenario_two_cells() {
    let cells = cells_covering(&bounds(-105.0, 40.0, -103.0, 41.0));
    assert_eq!(
        cells,
        vec![
            GridCell { lat: 40, lon: -105 },
            GridCell { lat: 40, lon: -104 },
        ]
    );
}

#[test]
fn test_no_fragment_below_half_degree() {
    // 0.3 degrees of the eastern column and 0.2 degrees of the northern row
    // are slivers; neither may appear in the result.
    let cov = coverage(&bounds(-105.0, 40.0, -103.7, 41.2));
    assert_eq!(cov.len(), 2);
    for c in &cov {
        assert!(c.clipped.width() >= MIN_FRAGMENT_DEG);
        assert!(c.clipped.height() >= MIN_FRAGMENT_DEG);
        assert_eq!(c.cell.lat, 40);
    }
}

// ============================================================================
// Filename round trip
// ============================================================================

#[test]
fn test_filename_example_scenario() {
    let cell_bounds = bounds(-105.0, 40.0, -104.0, 41.0);
    let name = TileName::for_bounds(&cell_bounds, Resolution::M30);
    assert_eq!(name.to_string(), "N40_W105_30m.dem");
}

#[test]
fn test_filename_round_trip_exhaustive() {
    // Full valid space: every cell, every resolution tag.
    for res in Resolution::ALL {
        for lat in -90..90 {
            for lon in -180..180 {
                let name = TileName::new(GridCell { lat, lon }, res);
                let parsed = TileName::parse(&name.to_string())
                    .unwrap_or_else(|e| panic!("{name} failed to parse: {e}"));
                assert_eq!(parsed, name);
            }
        }
    }
}

#[test]
fn test_filenames_sort_with_cache_listing() {
    // Zero padding keeps lexicographic order consistent per hemisphere.
    let a = TileName::new(GridCell { lat: 5, lon: 7 }, Resolution::M30).to_string();
    let b = TileName::new(GridCell { lat: 5, lon: 12 }, Resolution::M30).to_string();
    let c = TileName::new(GridCell { lat: 5, lon: 101 }, Resolution::M30).to_string();
    assert!(a < b && b < c);
}
