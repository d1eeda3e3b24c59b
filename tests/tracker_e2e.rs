//! End-to-end acceptance tests for minimum-distance tracking.
//!
//! Each test pins one observable contract of the tracker against a
//! configuration whose answer is known in closed form, so a regression in
//! the integrator, the operator loop, or the tracker itself is caught by a
//! hand-checkable number.

use periapse::prelude::*;

const TWO_PI: f64 = 2.0 * std::f64::consts::PI;

/// Natural-units Kepler scenario wired into a simulation with the tracker.
fn tracked_kepler_sim(dt: f64) -> Simulation {
    let config = KeplerConfig::natural_units();
    let (system, _orbiter) = config.build_tracked(1.0).expect("valid scenario");

    let mut sim = Simulation::new(system, Box::new(YoshidaIntegrator::new()), dt);
    sim.add_operator(load_operator("min_distance").expect("reserved name"));
    sim
}

/// The canonical reference case: a = 1, e = 0.5, started at apocenter.
/// After passing pericenter the tracked minimum must equal a(1-e) = 0.5
/// within integration tolerance.
#[test]
fn pericenter_distance_matches_closed_form() {
    let mut sim = tracked_kepler_sim(1e-3);

    // 1.2 periods guarantees one full pericenter passage.
    sim.integrate(1.2 * TWO_PI).expect("integration");

    let min = sim.system.particles[1].min_distance().expect("tracked");
    assert!(
        (min - 0.5).abs() < 1e-3,
        "minimum {min:.6} should match pericenter 0.5"
    );
    // The sampled minimum can only sit above the true pericenter, modulo
    // integrator error far below the sampling error.
    assert!(min > 0.5 - 1e-6);
}

/// The stored minimum never increases while the reference is fixed.
#[test]
fn minimum_is_monotonically_non_increasing() {
    let mut sim = tracked_kepler_sim(5e-3);

    let mut previous = sim.system.particles[1].min_distance().expect("tracked");
    for _ in 0..2_000 {
        sim.step().expect("step");
        let current = sim.system.particles[1].min_distance().expect("tracked");
        assert!(
            current <= previous,
            "minimum rose from {previous:.9} to {current:.9}"
        );
        previous = current;
    }
}

/// A particle that never had `min_distance` set is never touched.
#[test]
fn untracked_particle_is_untouched() {
    let config = KeplerConfig::natural_units();
    let system = config.build(1.0).expect("valid scenario");

    let mut sim = Simulation::new(system, Box::new(YoshidaIntegrator::new()), 1e-3);
    sim.add_operator(load_operator("min_distance").expect("reserved name"));
    sim.integrate(TWO_PI).expect("integration");

    assert!(!sim.system.particles[1].has(ParamKey::MinDistance));
    assert!(sim.system.particles[1].track().is_none());

    let tracker: &MinDistanceTracker = sim.operator_as("min_distance").expect("registered");
    assert_eq!(tracker.diagnostics().updates, 0);
}

/// Every snapshot written during the run is a consistent bound orbit.
#[test]
fn snapshots_stay_internally_consistent() {
    let mut sim = tracked_kepler_sim(2e-3);

    let mut last_min = sim.system.particles[1].min_distance().expect("tracked");
    let mut updates_seen = 0;

    for _ in 0..4_000 {
        sim.step().expect("step");
        let track = sim.system.particles[1].track().expect("tracked");
        if track.min_distance < last_min {
            last_min = track.min_distance;
            let orbit = track.orbit().expect("snapshot recorded with each minimum");
            assert!(orbit.is_valid_bound(), "unbound snapshot {orbit:?}");
            assert!(orbit.a > 0.0 && orbit.e < 1.0);
            // The snapshot's own pericenter cannot exceed where we are.
            assert!(orbit.pericenter() <= track.min_distance + 1e-9);
            updates_seen += 1;
        }
    }

    assert!(updates_seen > 0, "the run never updated the minimum");
}

/// Pulling a tracked particle inward must register a strictly smaller
/// minimum and refresh the snapshot on the next step.
#[test]
fn inward_rescale_forces_new_minimum() {
    let mut sim = tracked_kepler_sim(1e-3);
    sim.integrate(1.2 * TWO_PI).expect("integration");

    let before_min = sim.system.particles[1].min_distance().expect("tracked");
    let before_orbit = *sim.system.particles[1]
        .track()
        .and_then(TrackState::orbit)
        .expect("snapshot");

    // Teleport the orbiter to a fraction of its pericenter distance.
    let p = &mut sim.system.particles[1];
    p.position = p.position.scale(0.1);
    sim.step().expect("step");

    let after_min = sim.system.particles[1].min_distance().expect("tracked");
    let after_orbit = *sim.system.particles[1]
        .track()
        .and_then(TrackState::orbit)
        .expect("snapshot");

    assert!(
        after_min < before_min,
        "rescale inward must beat the old minimum ({after_min} >= {before_min})"
    );
    assert_ne!(after_orbit, before_orbit, "snapshot must be refreshed");
}

/// Under the default skip policy a vanished reference leaves the stored
/// minimum alone and shows up in the diagnostics.
#[test]
fn vanished_reference_is_skipped_with_diagnostic() {
    let config = KeplerConfig::natural_units();
    let (mut system, orbiter) = config.build_tracked(1.0).expect("valid scenario");

    let victim = system.add(0.0, Vec3::new(4.0, 0.0, 0.0), Vec3::new(0.0, 0.5, 0.0));
    let index = system.index_of(orbiter).expect("present");
    system.particles[index].set_reference(victim);
    system.remove(victim);

    let mut sim = Simulation::new(system, Box::new(LeapfrogIntegrator), 1e-2);
    sim.add_operator(load_operator("min_distance").expect("reserved name"));
    sim.integrate(1.0).expect("skip policy never aborts");

    let min = sim.system.particles[1].min_distance().expect("tracked");
    assert!((min - 1.5).abs() < 1e-12, "seeded minimum must be untouched");

    let tracker: &MinDistanceTracker = sim.operator_as("min_distance").expect("registered");
    assert!(tracker.diagnostics().skipped_unknown_reference > 0);
    assert_eq!(tracker.diagnostics().updates, 0);
}

/// The halt policy surfaces the unknown reference as an error instead.
#[test]
fn vanished_reference_halts_under_halt_policy() {
    let config = KeplerConfig::natural_units();
    let (mut system, orbiter) = config.build_tracked(1.0).expect("valid scenario");

    let victim = system.add(0.0, Vec3::new(4.0, 0.0, 0.0), Vec3::new(0.0, 0.5, 0.0));
    let index = system.index_of(orbiter).expect("present");
    system.particles[index].set_reference(victim);
    system.remove(victim);

    let mut sim = Simulation::new(system, Box::new(LeapfrogIntegrator), 1e-2);
    sim.add_operator(Box::new(MinDistanceTracker::new(ReferencePolicy::Halt)));

    let err = sim.integrate(1.0).expect_err("halt policy must error");
    assert!(matches!(err, SimError::UnknownReference { .. }));
}

/// SI sanity check: Earth-style orbit started at aphelion reaches its
/// perihelion distance within a tenth of a percent.
#[test]
fn si_units_aphelion_to_perihelion() {
    let config = KeplerConfig {
        initial_anomaly: std::f64::consts::PI,
        ..KeplerConfig::earth_sun()
    };
    let g = periapse::scenarios::G_SI;
    let (system, _orbiter) = config.build_tracked(g).expect("valid scenario");

    let period = config.period(g);
    let mut sim = Simulation::new(system, Box::new(YoshidaIntegrator::new()), period / 4_000.0);
    sim.add_operator(load_operator("min_distance").expect("reserved name"));
    sim.integrate(0.6 * period).expect("integration");

    let min = sim.system.particles[1].min_distance().expect("tracked");
    let perihelion = config.pericenter();
    assert!(
        ((min - perihelion) / perihelion).abs() < 1e-3,
        "minimum {min:.6e} should match perihelion {perihelion:.6e}"
    );
}

/// The guard stays quiet over a healthy run and pauses when the stored
/// minimum is tampered upward.
#[test]
fn guard_accepts_healthy_run_and_catches_tampering() {
    let mut sim = tracked_kepler_sim(5e-3);
    let mut guard = TrackGuard::default();

    for _ in 0..1_000 {
        sim.step().expect("step");
        let response = guard.check(&sim.system);
        assert!(response.can_continue(), "unexpected violation: {response:?}");
    }

    // Violate the invariant by hand (re-seed upward with the same reference).
    let current = sim.system.particles[1].min_distance().expect("tracked");
    sim.system.particles[1].seed_min_distance(current * 10.0);
    let response = guard.check(&sim.system);
    assert!(!response.can_continue(), "tampering must not pass the guard");
}
