use float_cmp::approx_eq;
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use raycast_accelerators::{BVHOptions, SplitMethod};
use raycast_api::*;
use raycast_core::geometry::*;
use raycast_core::pbrt::Float;
use raycast_core::Error;
use raycast_shapes::{Side, TriangleHit, TriangleMesh};
use std::sync::Arc;

fn all_split_methods() -> [BVHOptions; 3] {
    [SplitMethod::Middle, SplitMethod::EqualCounts, SplitMethod::SAH].map(|split_method| {
        BVHOptions {
            split_method,
            ..Default::default()
        }
    })
}

/// Hits reduced to what identifies them, in a canonical order.
fn hit_set(hits: &[TriangleHit]) -> Vec<(usize, Float)> {
    let mut set: Vec<(usize, Float)> = hits.iter().map(|h| (h.triangle, h.t)).collect();
    set.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.total_cmp(&b.1)));
    set
}

fn torus() -> TriangleMesh {
    TriangleMesh::torus(1.0, 1.0, 40, 10).expect("valid torus")
}

#[test]
fn icosphere_has_entry_and_exit_hits() {
    let raycaster = Raycaster::new(Point3::new(0.0, 0.0, 10.0), Vector3::new(0.0, 0.0, -1.0));

    for detail in 0..3 {
        let geometry = Geometry::new(TriangleMesh::icosphere(1.0, detail).expect("valid sphere"));
        let linear = geometry.raycast(&raycaster).expect("valid ray");
        assert_eq!(linear.len(), 2, "detail {detail}");

        for options in all_split_methods() {
            geometry.compute_bounds_tree(options);
            let indexed = geometry.raycast(&raycaster).expect("valid ray");
            assert_eq!(hit_set(&indexed), hit_set(&linear));

            let first = geometry
                .raycast(&raycaster.with_first_hit_only(true))
                .expect("valid ray");
            assert_eq!(first.len(), 1);
            let entry = first[0];
            assert!(linear.iter().all(|h| entry.t <= h.t));
            assert!(entry.t > 9.0 && entry.t < 10.0);
            assert!(entry.front_face);
            assert!(entry.normal.z > 0.0);
            assert!(entry.point.z > 0.0);

            // The ray passes through the centers of two opposite faces.
            let exit = linear.iter().map(|h| h.t).fold(entry.t, Float::max);
            assert!(approx_eq!(Float, entry.t + exit, 20.0, epsilon = 1e-4));
        }
        geometry.dispose_bounds_tree();
    }
}

#[test]
fn torus_scene_hits_every_clone() {
    let geometry = Arc::new(Geometry::new(torus()));
    let mesh = Mesh::new("torus", Arc::clone(&geometry));

    let mut scene = Scene::new();
    scene.add(mesh.clone());
    for _ in 0..10 {
        scene.add(mesh.instance());
    }

    let raycaster = Raycaster::new(Point3::new(0.0, 0.0, -100.0), Vector3::new(0.0, 0.0, 1.0))
        .with_side(Side::Front);

    assert_eq!(mesh.raycast(&raycaster).expect("valid ray").len(), 10);
    assert_eq!(scene.intersect_objects(&raycaster).expect("valid ray").len(), 110);

    geometry.compute_bounds_tree(BVHOptions::default());
    assert_eq!(mesh.raycast(&raycaster).expect("valid ray").len(), 10);
    let hits = scene.intersect_objects(&raycaster).expect("valid ray");
    assert_eq!(hits.len(), 110);
    assert!(hits.windows(2).all(|w| w[0].distance <= w[1].distance));

    let first = scene
        .intersect_objects(&raycaster.with_first_hit_only(true))
        .expect("valid ray");
    assert_eq!(first.len(), 11);
}

#[test]
fn empty_geometry_has_no_hits() {
    let geometry = Geometry::new(TriangleMesh::default());
    let raycaster = Raycaster::new(Point3::new(0.0, 0.0, 10.0), Vector3::new(0.0, 0.0, -1.0));

    assert!(geometry.raycast(&raycaster).expect("valid ray").is_empty());
    let tree = geometry.compute_bounds_tree(BVHOptions::default());
    assert_eq!(tree.nodes().len(), 1);
    assert!(tree.bounds().is_empty());
    assert!(geometry.raycast(&raycaster).expect("valid ray").is_empty());
    assert!(geometry
        .raycast(&raycaster.with_first_hit_only(true))
        .expect("valid ray")
        .is_empty());
}

#[test]
fn random_rays_match_linear_scan() {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    let geometry = Geometry::new(torus());
    let trees: Vec<_> = all_split_methods()
        .into_iter()
        .map(|options| geometry.compute_bounds_tree(options))
        .collect();

    for _ in 0..100 {
        let o = Point3f::new(
            rng.gen_range(0.1..10.0),
            rng.gen_range(0.1..10.0),
            rng.gen_range(0.1..10.0),
        );
        let raycaster = Raycaster::new(o, (-Vector3::from(o)).normalize());

        geometry.dispose_bounds_tree();
        let linear = geometry.raycast(&raycaster).expect("valid ray");
        let linear_first = geometry
            .raycast(&raycaster.with_first_hit_only(true))
            .expect("valid ray");

        for tree in trees.iter() {
            geometry.set_bounds_tree(Some(Arc::clone(tree)));
            let indexed = geometry.raycast(&raycaster).expect("valid ray");
            assert_eq!(hit_set(&indexed), hit_set(&linear));

            let indexed_first = geometry
                .raycast(&raycaster.with_first_hit_only(true))
                .expect("valid ray");
            assert_eq!(hit_set(&indexed_first), hit_set(&linear_first));
        }
    }
}

#[test]
fn detaching_restores_linear_results() {
    let geometry = Geometry::new(TriangleMesh::uv_sphere(2.0, 16, 12).expect("valid sphere"));
    let raycaster = Raycaster::new(Point3::new(0.3, -0.2, 5.0), Vector3::new(0.0, 0.1, -1.0));

    let before = hit_set(&geometry.raycast(&raycaster).expect("valid ray"));
    assert_eq!(before.len(), 2);

    geometry.compute_bounds_tree(BVHOptions::default());
    geometry.dispose_bounds_tree();
    geometry.dispose_bounds_tree();
    assert_eq!(hit_set(&geometry.raycast(&raycaster).expect("valid ray")), before);

    let tree = geometry.compute_bounds_tree(BVHOptions::default());
    geometry.set_bounds_tree(None);
    geometry.set_bounds_tree(Some(tree));
    assert_eq!(hit_set(&geometry.raycast(&raycaster).expect("valid ray")), before);
}

#[test]
fn invalid_rays_are_rejected() {
    let geometry = Geometry::new(TriangleMesh::cuboid(1.0, 1.0, 1.0).expect("valid box"));
    geometry.compute_bounds_tree(BVHOptions::default());

    let zero = Raycaster::new(Point3::new(0.0, 0.0, 5.0), Vector3::ZERO);
    assert!(matches!(geometry.raycast(&zero), Err(Error::InvalidRay(_))));

    let nan = Raycaster::new(Point3::new(Float::NAN, 0.0, 5.0), Vector3::new(0.0, 0.0, -1.0));
    assert!(matches!(geometry.raycast(&nan), Err(Error::InvalidRay(_))));

    geometry.dispose_bounds_tree();
    assert!(matches!(geometry.raycast(&zero), Err(Error::InvalidRay(_))));
}

#[test]
fn trees_can_be_swapped_while_casting() {
    let geometry = Arc::new(Geometry::new(torus()));
    let raycaster = Raycaster::new(Point3::new(0.0, 0.0, -100.0), Vector3::new(0.0, 0.0, 1.0))
        .with_side(Side::Front);

    std::thread::scope(|s| {
        for _ in 0..4 {
            let geometry = Arc::clone(&geometry);
            s.spawn(move || {
                for _ in 0..50 {
                    assert_eq!(geometry.raycast(&raycaster).expect("valid ray").len(), 10);
                }
            });
        }
        for options in all_split_methods() {
            geometry.compute_bounds_tree(options);
            geometry.dispose_bounds_tree();
        }
    });
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn closest_hit_is_nearest_of_all_hits(
        ox in -5.0f32..5.0, oy in -5.0f32..5.0, oz in -5.0f32..5.0,
        dx in -1.0f32..1.0, dy in -1.0f32..1.0, dz in -1.0f32..1.0,
    ) {
        prop_assume!(dx * dx + dy * dy + dz * dz > 1e-4);
        let geometry = Geometry::new(torus());
        geometry.compute_bounds_tree(BVHOptions::default());
        let raycaster = Raycaster::new(Point3::new(ox, oy, oz), Vector3::new(dx, dy, dz));

        let all = geometry.raycast(&raycaster).expect("valid ray");
        let first = geometry.raycast(&raycaster.with_first_hit_only(true)).expect("valid ray");
        prop_assert_eq!(first.len(), usize::from(!all.is_empty()));
        if let Some(closest) = first.first() {
            prop_assert!(all.iter().all(|h| closest.t <= h.t));
        }
    }
}
