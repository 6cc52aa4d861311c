//! Layer Transition Tests
//!
//! Tests for:
//! - play / cross_fade phase transitions (Standby, Playing, CrossFading, FixedCrossFading)
//! - Overlapping crossfades keeping the originally requested duration
//! - Crossfade completion and blend ratio
//! - Edge requests: same-state, non-positive durations, standby layers
//! - Re-based crossfades starting from the pose on screen
//! - Loop states sampled past their duration
//! - Default-layer resolution across multiple layers

use std::sync::Arc;

use glam::Vec3;

use kinema::animation::{
    AnimationClip, Animator, AnimatorController, AnimatorState, InterpolationMode, KeyframeTrack,
    LayerDefinition, LayerState, StateMachine, TargetPath, Track, TrackData, WrapMode,
};

const EPSILON: f32 = 1e-4;

fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < EPSILON
}

/// Translation ramp on `hip` from `0` to `end` over `duration` seconds.
fn ramp_clip(name: &str, end: f32, duration: f32) -> Arc<AnimationClip> {
    Arc::new(AnimationClip::new(
        name,
        vec![Track::new(
            "hip",
            TargetPath::Translation,
            TrackData::Vector3(KeyframeTrack::new(
                vec![0.0, duration],
                vec![Vec3::ZERO, Vec3::X * end],
                InterpolationMode::Linear,
            )),
        )],
    ))
}

/// `hip` held at `x` for `duration` seconds.
fn hold_clip(name: &str, x: f32, duration: f32) -> Arc<AnimationClip> {
    Arc::new(AnimationClip::new(
        name,
        vec![Track::new(
            "hip",
            TargetPath::Translation,
            TrackData::Vector3(KeyframeTrack::new(
                vec![0.0, duration],
                vec![Vec3::X * x; 2],
                InterpolationMode::Linear,
            )),
        )],
    ))
}

fn locomotion() -> Arc<StateMachine> {
    let machine = StateMachine::new()
        .with_state(AnimatorState::new("idle", hold_clip("idle", 0.0, 2.0)))
        .and_then(|m| m.with_state(AnimatorState::new("walk", ramp_clip("walk", 4.0, 2.0))))
        .and_then(|m| m.with_state(AnimatorState::new("run", hold_clip("run", 10.0, 1.0))))
        .and_then(|m| {
            m.with_state(
                AnimatorState::new("jump", hold_clip("jump", 20.0, 1.0))
                    .with_wrap_mode(WrapMode::Once),
            )
        })
        .expect("unique state names");
    Arc::new(machine)
}

fn animator() -> Animator {
    Animator::new(Arc::new(AnimatorController::single(locomotion()))).expect("valid controller")
}

fn current_name(animator: &Animator, layer: usize) -> Option<String> {
    animator
        .current_animator_state(layer)
        .expect("layer in range")
        .map(|s| s.name().to_owned())
}

fn hip_x(animator: &Animator) -> f32 {
    let hip = animator.layout().find("hip").expect("hip is animated");
    animator.pose().transform(hip).expect("in layout").translation.x
}

// ============================================================================
// Play
// ============================================================================

#[test]
fn layer_starts_in_standby() {
    let animator = animator();
    let layer = animator.layer(0).unwrap();
    assert_eq!(layer.layer_state(), LayerState::Standby);
    assert!(current_name(&animator, 0).is_none());
}

#[test]
fn play_then_current_state_is_that_state() {
    let mut animator = animator();
    animator.play("idle").unwrap();

    assert_eq!(current_name(&animator, 0).as_deref(), Some("idle"));
    assert_eq!(animator.layer(0).unwrap().layer_state(), LayerState::Playing);
}

#[test]
fn play_in_layer_starts_at_normalized_time() {
    let mut animator = animator();
    animator.play("run").unwrap();
    animator.play_in_layer("walk", 0, 0.5).unwrap();

    let layer = animator.layer(0).unwrap();
    assert_eq!(current_name(&animator, 0).as_deref(), Some("walk"));
    assert!(approx(layer.current_time().unwrap(), 1.0));
}

#[test]
fn play_cancels_crossfade() {
    let mut animator = animator();
    animator.play("idle").unwrap();
    animator.cross_fade("run", 0.5).unwrap();
    animator.play("walk").unwrap();

    let layer = animator.layer(0).unwrap();
    assert_eq!(layer.layer_state(), LayerState::Playing);
    assert!(!layer.is_in_transition());
    assert_eq!(current_name(&animator, 0).as_deref(), Some("walk"));
}

// ============================================================================
// Crossfade
// ============================================================================

#[test]
fn cross_fade_from_playing_starts_blend() {
    let mut animator = animator();
    animator.play("idle").unwrap();
    animator.cross_fade("run", 0.3).unwrap();

    let layer = animator.layer(0).unwrap();
    assert_eq!(layer.layer_state(), LayerState::CrossFading);
    assert_eq!(layer.current_state().unwrap().name(), "idle");
    assert_eq!(layer.dest_state().unwrap().name(), "run");
    assert!(approx(layer.cross_fade_duration().unwrap(), 0.3));
    assert!(approx(layer.cross_fade_elapsed().unwrap(), 0.0));
}

#[test]
fn cross_fade_elapsed_advances_with_update() {
    let mut animator = animator();
    animator.play("idle").unwrap();
    animator.cross_fade("run", 0.3).unwrap();
    animator.tick(0.1);

    let layer = animator.layer(0).unwrap();
    assert_eq!(layer.layer_state(), LayerState::CrossFading);
    assert!(approx(layer.cross_fade_elapsed().unwrap(), 0.1));
}

#[test]
fn overlapping_cross_fade_keeps_original_duration() {
    let mut animator = animator();
    animator.play("idle").unwrap();
    animator.cross_fade("run", 0.3).unwrap();
    animator.tick(0.1);
    animator.cross_fade("jump", 0.5).unwrap();

    let layer = animator.layer(0).unwrap();
    assert_eq!(layer.layer_state(), LayerState::FixedCrossFading);
    assert!(layer.is_fixed_cross_fade());
    // Previous destination is the new source
    assert_eq!(layer.current_state().unwrap().name(), "run");
    assert_eq!(layer.dest_state().unwrap().name(), "jump");
    assert!(approx(layer.cross_fade_duration().unwrap(), 0.3));
    assert!(approx(layer.cross_fade_elapsed().unwrap(), 0.0));
}

#[test]
fn fixed_cross_fade_resolves_after_locked_duration() {
    let mut animator = animator();
    animator.play("idle").unwrap();
    animator.cross_fade("run", 0.3).unwrap();
    animator.tick(0.1);
    animator.cross_fade("jump", 0.5).unwrap();

    animator.tick(0.2);
    assert_eq!(
        animator.layer(0).unwrap().layer_state(),
        LayerState::FixedCrossFading
    );

    animator.tick(0.15);
    let layer = animator.layer(0).unwrap();
    assert_eq!(layer.layer_state(), LayerState::Playing);
    assert_eq!(current_name(&animator, 0).as_deref(), Some("jump"));
}

#[test]
fn third_cross_fade_rebases_and_keeps_lock() {
    let mut animator = animator();
    animator.play("idle").unwrap();
    animator.cross_fade("run", 0.3).unwrap();
    animator.cross_fade("jump", 0.5).unwrap();
    animator.tick(0.05);
    animator.cross_fade("walk", 2.0).unwrap();

    let layer = animator.layer(0).unwrap();
    assert_eq!(layer.layer_state(), LayerState::FixedCrossFading);
    assert_eq!(layer.current_state().unwrap().name(), "jump");
    assert_eq!(layer.dest_state().unwrap().name(), "walk");
    assert!(approx(layer.cross_fade_duration().unwrap(), 0.3));
}

#[test]
fn cross_fade_completes_into_playing() {
    let mut animator = animator();
    animator.play("idle").unwrap();
    animator.cross_fade("run", 0.3).unwrap();

    animator.tick(0.2);
    assert_eq!(
        animator.layer(0).unwrap().layer_state(),
        LayerState::CrossFading
    );
    animator.tick(0.2);

    let layer = animator.layer(0).unwrap();
    assert_eq!(layer.layer_state(), LayerState::Playing);
    assert_eq!(current_name(&animator, 0).as_deref(), Some("run"));
    // Destination clock kept running during the blend
    assert!(approx(layer.current_time().unwrap(), 0.4));
}

#[test]
fn cross_fade_blends_pose_by_ratio() {
    let mut animator = animator();
    animator.play("idle").unwrap();
    animator.cross_fade("run", 1.0).unwrap();

    animator.tick(0.25);
    assert!(approx(hip_x(&animator), 2.5), "got {}", hip_x(&animator));

    animator.tick(0.5);
    assert!(approx(hip_x(&animator), 7.5), "got {}", hip_x(&animator));

    animator.tick(0.5);
    assert!(approx(hip_x(&animator), 10.0), "got {}", hip_x(&animator));
}

#[test]
fn cross_fade_into_playing_state_restarts_it() {
    let mut animator = animator();
    animator.play("walk").unwrap();
    animator.tick(0.5);
    animator.cross_fade("walk", 0.3).unwrap();

    let layer = animator.layer(0).unwrap();
    assert_eq!(layer.layer_state(), LayerState::CrossFading);
    assert_eq!(layer.current_state().unwrap().name(), "walk");
    assert_eq!(layer.dest_state().unwrap().name(), "walk");
    assert!(approx(layer.current_time().unwrap(), 0.5));
    assert!(approx(layer.dest_time().unwrap(), 0.0));
}

#[test]
fn cross_fade_into_running_destination_rebases() {
    let mut animator = animator();
    animator.play("idle").unwrap();
    animator.cross_fade("run", 0.3).unwrap();
    animator.tick(0.1);
    animator.cross_fade("run", 0.5).unwrap();

    let layer = animator.layer(0).unwrap();
    assert_eq!(layer.layer_state(), LayerState::FixedCrossFading);
    assert_eq!(layer.current_state().unwrap().name(), "run");
    assert_eq!(layer.dest_state().unwrap().name(), "run");
    assert!(approx(layer.current_time().unwrap(), 0.1));
    assert!(approx(layer.dest_time().unwrap(), 0.0));
    assert!(approx(layer.cross_fade_duration().unwrap(), 0.3));
}

#[test]
fn rebase_continues_from_the_blended_pose() {
    let mut animator = animator();
    animator.play("idle").unwrap();
    animator.cross_fade("run", 1.0).unwrap();
    animator.tick(0.5);
    assert!(approx(hip_x(&animator), 5.0), "got {}", hip_x(&animator));

    animator.cross_fade("jump", 0.2).unwrap();
    animator.tick(1e-4);
    assert!((hip_x(&animator) - 5.0).abs() < 0.01, "got {}", hip_x(&animator));

    // Frozen blend fades into `jump` over the locked second
    animator.tick(0.4999);
    assert!(approx(hip_x(&animator), 12.5), "got {}", hip_x(&animator));

    animator.tick(0.6);
    assert_eq!(animator.layer(0).unwrap().layer_state(), LayerState::Playing);
    assert!(approx(hip_x(&animator), 20.0), "got {}", hip_x(&animator));
}

#[test]
fn rebase_before_any_update_fades_from_old_destination() {
    let mut animator = animator();
    animator.play("idle").unwrap();
    animator.cross_fade("run", 1.0).unwrap();
    animator.cross_fade("jump", 1.0).unwrap();

    animator.tick(0.5);
    assert!(approx(hip_x(&animator), 15.0), "got {}", hip_x(&animator));
}

#[test]
fn non_positive_duration_switches_immediately() {
    let mut animator = animator();
    animator.play("idle").unwrap();
    animator.cross_fade("run", 0.0).unwrap();
    assert_eq!(animator.layer(0).unwrap().layer_state(), LayerState::Playing);
    assert_eq!(current_name(&animator, 0).as_deref(), Some("run"));

    animator.cross_fade("walk", 0.3).unwrap();
    animator.cross_fade("jump", -1.0).unwrap();
    assert_eq!(animator.layer(0).unwrap().layer_state(), LayerState::Playing);
    assert_eq!(current_name(&animator, 0).as_deref(), Some("jump"));
}

#[test]
fn cross_fade_on_standby_layer_plays() {
    let mut animator = animator();
    animator.cross_fade("walk", 0.3).unwrap();

    let layer = animator.layer(0).unwrap();
    assert_eq!(layer.layer_state(), LayerState::Playing);
    assert_eq!(current_name(&animator, 0).as_deref(), Some("walk"));
}

#[test]
fn reverse_speed_destination_starts_at_end() {
    let machine = StateMachine::new()
        .with_state(AnimatorState::new("idle", hold_clip("idle", 0.0, 1.0)))
        .and_then(|m| {
            m.with_state(
                AnimatorState::new("rewind", ramp_clip("rewind", 1.0, 2.0))
                    .with_speed(-1.0)
                    .with_wrap_mode(WrapMode::Once),
            )
        })
        .unwrap();
    let mut animator = Animator::new(Arc::new(AnimatorController::single(Arc::new(machine)))).unwrap();

    animator.play("idle").unwrap();
    animator.cross_fade("rewind", 0.5).unwrap();
    let layer = animator.layer(0).unwrap();
    assert!(approx(layer.dest_time().unwrap(), 2.0));

    animator.tick(0.5);
    let layer = animator.layer(0).unwrap();
    assert_eq!(layer.layer_state(), LayerState::Playing);
    assert!(approx(layer.current_time().unwrap(), 1.5));
}

/// `hip` zig-zags through uneven keys over two seconds.
fn zig_zag_clip() -> Arc<AnimationClip> {
    Arc::new(AnimationClip::new(
        "zig_zag",
        vec![Track::new(
            "hip",
            TargetPath::Translation,
            TrackData::Vector3(KeyframeTrack::new(
                vec![0.0, 0.5, 1.2, 2.0],
                vec![
                    Vec3::ZERO,
                    Vec3::new(3.0, 1.0, 0.0),
                    Vec3::new(-1.0, 4.0, 2.0),
                    Vec3::ZERO,
                ],
                InterpolationMode::Linear,
            )),
        )],
    ))
}

#[test]
fn loop_state_past_duration_samples_like_its_offset() {
    let make = || {
        let machine = StateMachine::new()
            .with_state(AnimatorState::new("zig_zag", zig_zag_clip()))
            .unwrap();
        let mut animator =
            Animator::new(Arc::new(AnimatorController::single(Arc::new(machine)))).unwrap();
        animator.play("zig_zag").unwrap();
        animator
    };
    let epsilon = 0.7;

    let mut wrapped = make();
    wrapped.tick(2.0 + epsilon);
    let mut fresh = make();
    fresh.tick(epsilon);

    let hip = fresh.layout().find("hip").unwrap();
    let a = wrapped.pose().transform(hip).unwrap().translation;
    let b = fresh.pose().transform(hip).unwrap().translation;
    assert!((a - b).length() < EPSILON, "{a} vs {b}");
    // Second segment, away from any key
    assert!((b - Vec3::new(1.857_142_9, 1.857_142_9, 0.571_428_6)).length() < EPSILON);
}

#[test]
fn animator_speed_scales_cross_fade() {
    let mut animator = animator();
    animator.speed = 2.0;
    animator.play("idle").unwrap();
    animator.cross_fade("run", 0.4).unwrap();
    animator.tick(0.1);

    let layer = animator.layer(0).unwrap();
    assert!(approx(layer.cross_fade_elapsed().unwrap(), 0.2));
    assert!(approx(layer.dest_time().unwrap(), 0.2));
}

// ============================================================================
// Default Layer Resolution
// ============================================================================

fn two_layer_animator() -> Animator {
    let upper = StateMachine::new()
        .with_state(AnimatorState::new("wave", hold_clip("wave", 1.0, 1.0)))
        .and_then(|m| m.with_state(AnimatorState::new("idle", hold_clip("upper_idle", 0.0, 1.0))))
        .unwrap();
    let controller = AnimatorController::new()
        .with_layer(LayerDefinition::new("Base", locomotion()))
        .with_layer(LayerDefinition::new("Upper", Arc::new(upper)));
    Animator::new(Arc::new(controller)).unwrap()
}

#[test]
fn request_without_layer_searches_all_layers() {
    let mut animator = two_layer_animator();
    assert_eq!(animator.last_layer(), None);

    animator.cross_fade("wave", 0.2).unwrap();
    assert_eq!(animator.last_layer(), Some(1));
    assert_eq!(current_name(&animator, 1).as_deref(), Some("wave"));
    assert!(current_name(&animator, 0).is_none());
}

#[test]
fn request_without_layer_prefers_last_used_layer() {
    let mut animator = two_layer_animator();
    animator.play("wave").unwrap();

    // "idle" exists on both layers; the last used one wins
    animator.play("idle").unwrap();
    assert_eq!(animator.last_layer(), Some(1));
    assert_eq!(current_name(&animator, 1).as_deref(), Some("idle"));
    assert!(current_name(&animator, 0).is_none());

    // "run" only exists on the base layer
    animator.play("run").unwrap();
    assert_eq!(animator.last_layer(), Some(0));
    assert_eq!(current_name(&animator, 0).as_deref(), Some("run"));
}

#[test]
fn explicit_layer_does_not_fall_back() {
    let mut animator = two_layer_animator();
    assert!(animator.cross_fade_in_layer("run", 0.2, 1).is_err());
    assert!(current_name(&animator, 0).is_none());
}

#[test]
fn layers_evaluate_independently() {
    let mut animator = two_layer_animator();
    animator.play_in_layer("walk", 0, 0.0).unwrap();
    animator.play_in_layer("wave", 1, 0.0).unwrap();
    animator.cross_fade_in_layer("run", 1.0, 0).unwrap();

    animator.tick(0.5);
    assert_eq!(
        animator.layer(0).unwrap().layer_state(),
        LayerState::CrossFading
    );
    assert_eq!(animator.layer(1).unwrap().layer_state(), LayerState::Playing);
    assert!(approx(animator.layer(1).unwrap().current_time().unwrap(), 0.5));
}
