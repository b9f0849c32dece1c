//! Property tests for the hosting quality gate.
//!
//! The distance and angle rules must hold for every camera position and
//! every reported quality, not just the handful of poses the lifecycle
//! tests happen to visit.

use anchorage::geometry::{PlaneAlignment, Pose, Vec3};
use anchorage::quality::{
    BlockReason, GateVerdict, MappingQuality, QualityGate, QualityIndicator,
};
use proptest::prelude::*;

const RADIUS: f32 = 0.25;

fn indicator() -> QualityIndicator {
    QualityIndicator::new(Vec3::ZERO, RADIUS, PlaneAlignment::HorizontalUp)
}

/// Camera position at the given spherical offset from the indicator.
fn camera_at(distance: f32, azimuth: f32, elevation: f32) -> Pose {
    Pose::at(Vec3::new(
        distance * elevation.cos() * azimuth.sin(),
        distance * elevation.sin(),
        distance * elevation.cos() * azimuth.cos(),
    ))
}

fn any_quality() -> impl Strategy<Value = MappingQuality> {
    prop_oneof![
        Just(MappingQuality::Insufficient),
        Just(MappingQuality::Sufficient),
        Just(MappingQuality::Good),
    ]
}

proptest! {
    /// Any distance below 1.5 radii blocks as too close, regardless of
    /// direction or reported quality.
    #[test]
    fn close_distances_always_block(
        distance in 0.01f32..(1.5 * RADIUS - 0.001),
        azimuth in -std::f32::consts::PI..std::f32::consts::PI,
        elevation in -1.2f32..1.2f32,
        quality in any_quality(),
    ) {
        let gate = QualityGate::default();
        let camera = camera_at(distance, azimuth, elevation);
        prop_assert_eq!(
            gate.evaluate(&camera, &indicator(), quality),
            GateVerdict::Block(BlockReason::TooClose)
        );
    }

    /// Any distance beyond the 10 m limit blocks as too far.
    #[test]
    fn far_distances_always_block(
        distance in 10.001f32..100.0,
        azimuth in -std::f32::consts::PI..std::f32::consts::PI,
        elevation in -1.2f32..1.2f32,
        quality in any_quality(),
    ) {
        let gate = QualityGate::default();
        let camera = camera_at(distance, azimuth, elevation);
        prop_assert_eq!(
            gate.evaluate(&camera, &indicator(), quality),
            GateVerdict::Block(BlockReason::TooFar)
        );
    }

    /// A top view blocks even when the reported quality would pass.
    #[test]
    fn top_view_blocks_every_quality(
        distance in 1.0f32..9.0,
        quality in any_quality(),
    ) {
        let gate = QualityGate::default();
        let mut indicator = indicator();
        // Looking straight down from overhead, inside the distance band.
        let camera = camera_at(distance, 0.0, std::f32::consts::FRAC_PI_2);
        indicator.observe(&camera, quality, &gate);
        prop_assert!(indicator.top_view_reached());
        prop_assert_eq!(
            gate.evaluate(&camera, &indicator, quality),
            GateVerdict::Block(BlockReason::TopView)
        );
    }

    /// With no coverage built up, an insufficient reading blocks and a
    /// sufficient one proceeds, anywhere in the valid band.
    #[test]
    fn quality_is_authoritative_in_band(
        distance in 1.0f32..9.0,
        azimuth in -std::f32::consts::PI..std::f32::consts::PI,
    ) {
        let gate = QualityGate::default();
        let camera = camera_at(distance, azimuth, 0.2);
        prop_assert_eq!(
            gate.evaluate(&camera, &indicator(), MappingQuality::Insufficient),
            GateVerdict::Block(BlockReason::InsufficientCoverage)
        );
        prop_assert_eq!(
            gate.evaluate(&camera, &indicator(), MappingQuality::Sufficient),
            GateVerdict::Proceed
        );
        prop_assert_eq!(
            gate.evaluate(&camera, &indicator(), MappingQuality::Good),
            GateVerdict::Proceed
        );
    }
}

#[test]
fn distance_equal_to_one_radius_blocks_too_close() {
    let gate = QualityGate::default();
    let camera = camera_at(RADIUS, 0.3, 0.0);
    assert_eq!(
        gate.evaluate(&camera, &indicator(), MappingQuality::Good),
        GateVerdict::Block(BlockReason::TooClose)
    );
}

#[test]
fn five_radii_side_view_with_sufficient_quality_proceeds() {
    let gate = QualityGate::default();
    let camera = camera_at(5.0 * RADIUS, 1.0, 0.0);
    assert_eq!(
        gate.evaluate(&camera, &indicator(), MappingQuality::Sufficient),
        GateVerdict::Proceed
    );
}

#[test]
fn block_reasons_carry_instructions() {
    assert!(BlockReason::TooClose.instruction().contains("too close"));
    assert!(BlockReason::TooFar.instruction().contains("too far"));
    assert!(BlockReason::TopView.instruction().contains("top view"));
    assert!(BlockReason::InsufficientCoverage
        .instruction()
        .contains("all sides"));
}
