use std::collections::HashSet;

use rand::{rngs::StdRng, Rng, SeedableRng};
use rand_distr::Normal;

use pcd_core::pointcloud::point::{Point, PointCloud};
use pcd_filter::{
    grid::GridSurfaceEstimator, interpolation::SurfaceInterpolator, residual::ResidualFilter,
    CancellationToken, FilterConfig, FilterPipeline, FilterWarning, NoopObserver,
};

const SPIKE_SOURCE_ID: u16 = 7;

fn plane(x: f64, y: f64) -> f64 {
    2.0 * x + 3.0 * y
}

/// 100 x 100 lattice over [0, 100]^2 on the plane z = 2x + 3y with
/// N(0, 0.01) noise, plus 20 points raised by 50.
///
/// The spikes sit at cell centres of a 20 x 20 grid over the same extent,
/// away from the neighbourhoods used to estimate grid nodes.
fn noisy_plane_with_spikes(seed: u64) -> PointCloud {
    let mut rng = StdRng::seed_from_u64(seed);
    let noise = Normal::new(0.0, 0.01).unwrap();
    let spacing = 100.0 / 99.0;

    let mut points = Vec::with_capacity(10_020);
    for i in 0..100 {
        for j in 0..100 {
            let (x, y) = (i as f64 * spacing, j as f64 * spacing);
            let mut p = Point::new(x, y, plane(x, y) + rng.sample(noise));
            p.attributes.intensity = (i * 100 + j) as u16;
            points.push(p);
        }
    }

    let cell = 100.0 / 19.0;
    for k in 0..20 {
        let ci = (k % 10) * 2;
        let cj = (k / 10) * 9 + 4;
        let (x, y) = ((ci as f64 + 0.5) * cell, (cj as f64 + 0.5) * cell);
        let mut p = Point::new(x, y, plane(x, y) + 50.0 + rng.sample(noise));
        p.attributes.point_source_id = SPIKE_SOURCE_ID;
        points.push(p);
    }

    PointCloud::new(points)
}

#[test]
fn pipeline_removes_injected_spikes() {
    let config = FilterConfig {
        grid_resolution: 20,
        neighbors: 8,
        residual_sigma: 2.0,
        global_sigma: 3.0,
        target_points: 10_000,
        seed: Some(11),
        ..Default::default()
    };
    let pipeline = FilterPipeline::from_config(&config).unwrap();
    let input = noisy_plane_with_spikes(42);
    assert_eq!(input.len(), 10_020);

    let report = pipeline
        .run(input, &NoopObserver, &CancellationToken::new())
        .unwrap();

    let spikes = report
        .cloud
        .points
        .iter()
        .filter(|p| p.attributes.point_source_id == SPIKE_SOURCE_ID)
        .count();
    let clean = report.cloud.len() - spikes;

    assert_eq!(spikes, 0);
    assert!(clean >= 9_900, "only {} clean points retained", clean);
    assert!(report.cloud.len() <= 10_000);
    for p in &report.cloud.points {
        // attributes stayed with their own coordinates
        let i = (p.attributes.intensity / 100) as f64;
        assert_eq!(p.x, i * (100.0 / 99.0));
    }
}

/// 10,000 points drawn uniformly over [0, 100]^2 on the same plane plus 20
/// spikes at uniformly drawn positions, so spikes may fall inside the
/// neighbourhoods of grid nodes.
fn uniform_plane_with_spikes(seed: u64) -> PointCloud {
    let mut rng = StdRng::seed_from_u64(seed);
    let noise = Normal::new(0.0, 0.01).unwrap();

    let mut points = Vec::with_capacity(10_020);
    for i in 0..10_020 {
        let (x, y) = (rng.random_range(0.0..100.0_f64), rng.random_range(0.0..100.0_f64));
        let mut p = Point::new(x, y, plane(x, y) + rng.sample(noise));
        if i >= 10_000 {
            p.z += 50.0;
            p.attributes.point_source_id = SPIKE_SOURCE_ID;
        }
        points.push(p);
    }
    PointCloud::new(points)
}

#[test]
fn pipeline_removes_uniformly_placed_spikes() {
    for seed in 0..20 {
        let config = FilterConfig {
            grid_resolution: 20,
            neighbors: 8,
            residual_sigma: 2.0,
            global_sigma: 3.0,
            target_points: 10_000,
            seed: Some(seed),
            ..Default::default()
        };
        let report = FilterPipeline::from_config(&config)
            .unwrap()
            .run(
                uniform_plane_with_spikes(seed),
                &NoopObserver,
                &CancellationToken::new(),
            )
            .unwrap();

        let spikes = report
            .cloud
            .points
            .iter()
            .filter(|p| p.attributes.point_source_id == SPIKE_SOURCE_ID)
            .count();
        let clean = report.cloud.len() - spikes;

        assert_eq!(spikes, 0, "seed {}: spikes survived", seed);
        assert!(clean >= 9_900, "seed {}: only {} clean points retained", seed, clean);
    }
}

#[test]
fn collinear_cloud_is_retained() {
    let input = PointCloud::new(vec![
        Point::new(0.0, 0.0, 1.0),
        Point::new(1.0, 2.0, 9.0),
        Point::new(2.0, 4.0, -3.0),
    ]);

    // the surface components tolerate the degenerate input on their own
    let token = CancellationToken::new();
    let mut warnings = Vec::new();
    let surface = GridSurfaceEstimator::new(100, 10)
        .estimate(&input, &token, &mut warnings)
        .unwrap()
        .unwrap();
    assert_eq!(surface.elevations.len(), 10_000);
    let _ = SurfaceInterpolator::new(surface).predict_or_observed(&input);

    let pipeline = FilterPipeline::from_config(&FilterConfig::default()).unwrap();
    let report = pipeline
        .run(input.clone(), &NoopObserver, &token)
        .unwrap();

    assert_eq!(report.cloud, input);
    assert!(report.lacks_prediction());
    assert!(report
        .warnings
        .iter()
        .any(|w| matches!(w, FilterWarning::DegenerateGeometry { .. })));
}

#[test]
fn axis_aligned_line_is_retained() {
    let input: PointCloud = (0..50)
        .map(|i| Point::new(3.0, i as f64, if i == 25 { 900.0 } else { 1.0 }))
        .collect::<Vec<_>>()
        .into();
    let config = FilterConfig {
        grid_resolution: 10,
        neighbors: 4,
        global_sigma: 100.0,
        ..Default::default()
    };

    let report = FilterPipeline::from_config(&config)
        .unwrap()
        .run(input.clone(), &NoopObserver, &CancellationToken::new())
        .unwrap();

    assert_eq!(report.cloud, input);
    assert!(report.lacks_prediction());
}

#[test]
fn points_outside_hull_always_survive() {
    let mut rng = StdRng::seed_from_u64(3);
    let mut points = Vec::new();
    for _ in 0..2_000 {
        let (x, y) = (rng.random_range(0.0..50.0), rng.random_range(0.0..50.0));
        points.push(Point::new(x, y, 0.2 * x + rng.random_range(-0.5..0.5)));
    }
    let inner = PointCloud::new(points.clone());

    // far outside the inner extent, with absurd elevations
    points.push(Point::new(-10.0, 25.0, 1e4));
    points.push(Point::new(80.0, 80.0, -1e4));
    let full = PointCloud::new(points);

    let surface = GridSurfaceEstimator::new(15, 6)
        .estimate(&inner, &CancellationToken::new(), &mut Vec::new())
        .unwrap()
        .unwrap();
    let predictions = SurfaceInterpolator::new(surface).predict_or_observed(&full);
    assert_eq!(predictions.defined, 2_000);

    for sigma in [0.0, 0.5, 2.0] {
        let (mask, _) = ResidualFilter::new(sigma).mask(&full, &predictions.values);
        assert!(mask[2_000] && mask[2_001]);
    }
}

#[test]
fn stages_only_ever_subset() {
    let mut rng = StdRng::seed_from_u64(9);
    let points: Vec<Point> = (0..3_000)
        .map(|i| {
            let (x, y) = (rng.random_range(0.0..200.0_f64), rng.random_range(0.0..80.0_f64));
            let mut z = (x * 0.05).sin() * 4.0 + y * 0.1 + rng.random_range(-0.3..0.3);
            if i % 97 == 0 {
                z += rng.random_range(-60.0..60.0);
            }
            let mut p = Point::new(x, y, z);
            p.attributes.gps_time = Some(i as f64);
            p
        })
        .collect();
    let input = PointCloud::new(points);
    let ids: HashSet<u64> = input
        .points
        .iter()
        .map(|p| p.attributes.gps_time.unwrap() as u64)
        .collect();

    let configs = [
        FilterConfig {
            grid_resolution: 30,
            neighbors: 5,
            target_points: 5_000,
            seed: Some(1),
            ..Default::default()
        },
        FilterConfig {
            grid_resolution: 2,
            neighbors: 50,
            residual_sigma: 0.5,
            global_sigma: 1.5,
            target_points: 1_000,
            seed: Some(2),
            ..Default::default()
        },
        FilterConfig {
            grid_resolution: 1,
            neighbors: 1,
            target_points: 4_000,
            seed: Some(3),
            ..Default::default()
        },
    ];

    for config in configs {
        let report = FilterPipeline::from_config(&config)
            .unwrap()
            .run(input.clone(), &NoopObserver, &CancellationToken::new())
            .unwrap();

        assert!(report.cloud.len() <= input.len());
        assert!(report.cloud.len() <= config.target_points);
        let mut seen = HashSet::new();
        for p in &report.cloud.points {
            let id = p.attributes.gps_time.unwrap() as u64;
            assert!(ids.contains(&id));
            assert!(seen.insert(id), "point {} duplicated", id);
        }
        for stage in &report.stages {
            assert!(stage.points_after <= stage.points_before);
        }
    }
}

#[test]
fn million_points_reach_exact_budget() {
    let mut rng = StdRng::seed_from_u64(2024);
    let noise = Normal::new(0.0, 0.05).unwrap();
    let points: Vec<Point> = (0..1_000_000)
        .map(|_| {
            let (x, y) = (rng.random_range(0.0..1000.0), rng.random_range(0.0..1000.0));
            Point::new(x, y, 0.01 * x + 0.02 * y + rng.sample(noise))
        })
        .collect();
    let config = FilterConfig {
        target_points: 500_000,
        seed: Some(8),
        ..Default::default()
    };

    let report = FilterPipeline::from_config(&config)
        .unwrap()
        .run(PointCloud::new(points), &NoopObserver, &CancellationToken::new())
        .unwrap();

    assert_eq!(report.cloud.len(), 500_000);
    assert_eq!(report.stages[0].points_after, 1_000_000);
    assert_eq!(report.stages[1].removed(), 0);
}
