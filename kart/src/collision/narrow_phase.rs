use nalgebra as na;
use rapier3d::parry::{
    query::{self, Ray, ShapeCastOptions},
    shape::{self as pshape, Shape},
};

use super::types::{CapsuleSpec, Iso, Penetration, Vec3};

/// Ray against a single shape placed at `iso`.
///
/// `direction` must be unit length so that the returned time of impact is a distance.
/// Returns `(distance, world normal)`.
pub fn cast_ray_against(
    shape: &dyn Shape,
    iso: &Iso,
    origin: Vec3,
    direction: Vec3,
    max_distance: f32,
) -> Option<(f32, Vec3)> {
    let ray = Ray::new(na::Point3::from(origin), direction);
    shape
        .cast_ray_and_get_normal(iso, &ray, max_distance, true)
        .map(|hit| (hit.time_of_impact, hit.normal))
}

/// Does a capsule spanned by segment `a`..`b` overlap `shape` at `iso`?
pub fn capsule_overlaps(a: Vec3, b: Vec3, radius: f32, shape: &dyn Shape, iso: &Iso) -> bool {
    let capsule = pshape::Capsule::new(na::Point3::from(a), na::Point3::from(b), radius);
    query::intersection_test(&Iso::identity(), &capsule, iso, shape).unwrap_or(false)
}

/// Separation of a Z-aligned kart capsule at `capsule_iso` from `shape` at `iso`.
///
/// Returns `None` when the shapes only touch or are apart. Half-spaces are resolved against
/// the lower cap directly, other shapes through parry's contact query.
pub fn capsule_penetration(
    capsule: &CapsuleSpec,
    capsule_iso: &Iso,
    shape: &dyn Shape,
    iso: &Iso,
) -> Option<Penetration> {
    if let Some(halfspace) = shape.as_shape::<pshape::HalfSpace>() {
        return capsule_halfspace_penetration(capsule, capsule_iso, halfspace, iso);
    }

    let kart_capsule = pshape::Capsule::new_z(capsule.half_height, capsule.radius);
    let contact = query::contact(capsule_iso, &kart_capsule, iso, shape, 0.0).ok()??;
    if contact.dist >= 0.0 {
        return None;
    }

    // normal1 points from the capsule toward the other shape; push the capsule the other way.
    Some(Penetration {
        direction: -contact.normal1.into_inner(),
        distance: -contact.dist,
    })
}

/// Depth of the capsule end closest to the plane, measured along the plane normal.
fn capsule_halfspace_penetration(
    capsule: &CapsuleSpec,
    capsule_iso: &Iso,
    halfspace: &pshape::HalfSpace,
    iso: &Iso,
) -> Option<Penetration> {
    let normal = iso.rotation * halfspace.normal.into_inner();
    let plane_point = iso.translation.vector;
    let axis = capsule_iso.rotation * Vec3::z() * capsule.half_height;
    let center = capsule_iso.translation.vector;

    let lowest = (center + axis - plane_point)
        .dot(&normal)
        .min((center - axis - plane_point).dot(&normal));
    let depth = capsule.radius - lowest;
    (depth > 0.0).then_some(Penetration {
        direction: normal,
        distance: depth,
    })
}

/// Sweep a capsule spanned by `a`..`b` along unit `direction` against one shape.
///
/// A sphere is the capsule with `a == b`. Returns `(distance, world point, world normal)`.
/// Distance is zero when the capsule starts overlapping the shape.
pub fn capsule_cast_against(
    a: Vec3,
    b: Vec3,
    radius: f32,
    direction: Vec3,
    max_distance: f32,
    shape: &dyn Shape,
    iso: &Iso,
) -> Option<(f32, Vec3, Vec3)> {
    let center = (a + b) * 0.5;
    let swept = pshape::Capsule::new(
        na::Point3::from(a - center),
        na::Point3::from(b - center),
        radius,
    );
    let swept_iso = Iso::translation(center.x, center.y, center.z);
    let vel = direction * max_distance;

    let mut opts = ShapeCastOptions::with_max_time_of_impact(1.0);
    opts.stop_at_penetration = true;
    let hit = query::cast_shapes(&swept_iso, &vel, &swept, iso, &Vec3::zeros(), shape, opts)
        .ok()??;

    // Witnesses and normals are expressed in the local frame of each shape.
    let point = (iso * hit.witness2).coords;
    let normal = iso.rotation * hit.normal2.into_inner();
    Some((hit.time_of_impact * max_distance, point, normal))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ground_box() -> (pshape::Cuboid, Iso) {
        (
            pshape::Cuboid::new(Vec3::new(10.0, 0.5, 10.0)),
            Iso::translation(0.0, -0.5, 0.0),
        )
    }

    #[test]
    fn ray_reports_distance_and_up_normal() {
        let (cuboid, iso) = ground_box();
        let (distance, normal) =
            cast_ray_against(&cuboid, &iso, Vec3::new(0.0, 2.0, 0.0), -Vec3::y(), 5.0)
                .expect("ray should hit the top face");
        assert!((distance - 2.0).abs() < 1.0e-4);
        assert!((normal - Vec3::y()).norm() < 1.0e-4);
    }

    #[test]
    fn ray_shorter_than_gap_misses() {
        let (cuboid, iso) = ground_box();
        let miss = cast_ray_against(&cuboid, &iso, Vec3::new(0.0, 2.0, 0.0), -Vec3::y(), 1.0);
        assert!(miss.is_none());
    }

    #[test]
    fn sunk_capsule_is_pushed_up() {
        let (cuboid, iso) = ground_box();
        let spec = CapsuleSpec {
            radius: 0.5,
            half_height: 0.5,
        };
        let capsule_iso = Iso::translation(0.0, 0.3, 0.0);
        let pen = capsule_penetration(&spec, &capsule_iso, &cuboid, &iso)
            .expect("capsule sunk 0.2m into the ground");
        assert!(pen.direction.y > 0.99);
        assert!((pen.distance - 0.2).abs() < 1.0e-3);
    }

    #[test]
    fn separated_capsule_has_no_penetration() {
        let (cuboid, iso) = ground_box();
        let spec = CapsuleSpec {
            radius: 0.5,
            half_height: 0.5,
        };
        let capsule_iso = Iso::translation(0.0, 1.0, 0.0);
        assert!(capsule_penetration(&spec, &capsule_iso, &cuboid, &iso).is_none());
        assert!(!capsule_overlaps(
            Vec3::new(0.0, 1.0, 0.5),
            Vec3::new(0.0, 1.0, -0.5),
            0.5,
            &cuboid,
            &iso
        ));
    }

    #[test]
    fn sunk_capsule_depth_matches_box_and_plane() {
        let spec = CapsuleSpec {
            radius: 0.5,
            half_height: 0.5,
        };
        let capsule_iso = Iso::translation(0.0, 0.3, 0.0);
        let plane = pshape::HalfSpace::new(na::Unit::new_normalize(Vec3::y()));
        let (cuboid, box_iso) = ground_box();

        let on_plane = capsule_penetration(&spec, &capsule_iso, &plane, &Iso::identity())
            .expect("capsule sunk 0.2m into the plane");
        let on_box = capsule_penetration(&spec, &capsule_iso, &cuboid, &box_iso)
            .expect("capsule sunk 0.2m into the box");

        assert!((on_plane.distance - 0.2).abs() < 1.0e-5);
        assert!((on_plane.distance - on_box.distance).abs() < 1.0e-3);
        assert!((on_plane.direction - on_box.direction).norm() < 1.0e-3);
    }

    #[test]
    fn tilted_capsule_uses_its_lowest_end() {
        let spec = CapsuleSpec {
            radius: 0.5,
            half_height: 0.5,
        };
        // Nose pitched down 30 degrees: the front cap centre sits 0.25m below the centre.
        let pitch = na::UnitQuaternion::from_axis_angle(&Vec3::x_axis(), 30f32.to_radians());
        let capsule_iso = Iso::from_parts(na::Translation3::new(0.0, 0.6, 0.0), pitch);
        let plane = pshape::HalfSpace::new(na::Unit::new_normalize(Vec3::y()));

        let pen = capsule_penetration(&spec, &capsule_iso, &plane, &Iso::identity())
            .expect("front cap is below the plane surface");
        assert!((pen.distance - 0.15).abs() < 1.0e-4);
        assert!((pen.direction - Vec3::y()).norm() < 1.0e-6);

        let lifted = Iso::from_parts(na::Translation3::new(0.0, 0.8, 0.0), pitch);
        assert!(capsule_penetration(&spec, &lifted, &plane, &Iso::identity()).is_none());
    }

    #[test]
    fn point_capsule_cast_stops_at_wall() {
        let wall = pshape::Cuboid::new(Vec3::new(0.5, 2.0, 2.0));
        let wall_iso = Iso::translation(5.0, 0.0, 0.0);
        let (distance, _point, normal) = capsule_cast_against(
            Vec3::zeros(),
            Vec3::zeros(),
            0.5,
            Vec3::x(),
            10.0,
            &wall,
            &wall_iso,
        )
        .expect("sphere should reach the wall");
        // Wall face at x = 4.5, sphere radius 0.5.
        assert!((distance - 4.0).abs() < 1.0e-3);
        assert!(normal.x < -0.99);
    }

    #[test]
    fn capsule_cast_reaches_wall_with_its_front_cap() {
        let wall = pshape::Cuboid::new(Vec3::new(2.0, 2.0, 0.5));
        let wall_iso = Iso::translation(0.0, 0.0, 5.0);
        // Axis along Z: the front cap ends at z = 1.0.
        let (distance, _point, normal) = capsule_cast_against(
            Vec3::new(0.0, 0.0, 0.5),
            Vec3::new(0.0, 0.0, -0.5),
            0.5,
            Vec3::z(),
            10.0,
            &wall,
            &wall_iso,
        )
        .expect("capsule should reach the wall");
        assert!((distance - 3.5).abs() < 1.0e-3);
        assert!(normal.z < -0.99);
    }
}
