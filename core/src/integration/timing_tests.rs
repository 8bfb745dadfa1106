//! Virtual clock scheduling tests

use super::test_utils::*;
use crate::config::LatencyProfile;
use crate::headless::{DEFAULT_CYCLES_PER_SECOND, NullHost};
use crate::kernel::ThreadScheduler;
use crate::timing::{AUDIO_HOST_UPDATE_EVENT, AUDIO_UPDATE_EVENT, EventId};
use crate::SampleFormat;

#[test]
fn test_events_registered_and_scheduled() {
    let rig = Rig::new(LatencyProfile::Medium);
    let events = rig.engine.events();
    assert_eq!(rig.clock.event_name(events.update), Some(AUDIO_UPDATE_EVENT));
    assert_eq!(rig.clock.event_name(events.host_update), Some(AUDIO_HOST_UPDATE_EVENT));
    assert_eq!(rig.clock.pending_events(), 2);
}

#[test]
fn test_intervals_follow_block_sizes() {
    let rig = Rig::new(LatencyProfile::Medium);
    let intervals = rig.engine.intervals();
    assert_eq!(intervals.audio, DEFAULT_CYCLES_PER_SECOND * 64 / 44_100);
    assert_eq!(intervals.host, DEFAULT_CYCLES_PER_SECOND * 512 / 44_100);

    let low = Rig::new(LatencyProfile::Low);
    assert_eq!(low.engine.intervals().audio, DEFAULT_CYCLES_PER_SECOND * 16 / 44_100);
    assert_eq!(low.engine.intervals().host, DEFAULT_CYCLES_PER_SECOND * 256 / 44_100);
}

#[test]
fn test_one_second_of_ticks() {
    let mut rig = Rig::new(LatencyProfile::Medium);
    let intervals = rig.engine.intervals();

    rig.run_cycles(DEFAULT_CYCLES_PER_SECOND);

    let ticks = rig.engine.mixer_stats().ticks;
    assert_eq!(ticks as i64, DEFAULT_CYCLES_PER_SECOND / intervals.audio);
    assert_eq!(rig.host.pokes as i64, DEFAULT_CYCLES_PER_SECOND / intervals.host);
    assert!((688..=690).contains(&ticks));
}

#[test]
fn test_late_event_rearms_without_drift() {
    let mut rig = Rig::new(LatencyProfile::Medium);
    let interval = rig.engine.intervals().audio;
    let update = rig.engine.events().update;

    let fired = rig.clock.advance(interval + 100);
    assert_eq!(fired, vec![(update, 100)]);
    assert!(rig.engine.handle_event(
        update,
        100,
        &mut rig.clock,
        &mut rig.scheduler,
        &mut rig.host
    ));

    let fired = rig.clock.advance(interval - 100);
    assert_eq!(fired, vec![(update, 0)]);
    assert_eq!(rig.engine.mixer_stats().ticks, 1);
}

#[test]
fn test_host_event_pokes_host() {
    let mut rig = Rig::new(LatencyProfile::Medium);
    let host_update = rig.engine.events().host_update;

    assert!(rig.engine.handle_event(
        host_update,
        0,
        &mut rig.clock,
        &mut rig.scheduler,
        &mut rig.host
    ));

    assert_eq!(rig.host.pokes, 1);
    assert_eq!(rig.engine.mixer_stats().ticks, 0);
}

#[test]
fn test_foreign_event_is_ignored() {
    let mut rig = Rig::new(LatencyProfile::Medium);
    let pending = rig.clock.pending_events();
    assert!(!rig.engine.handle_event(
        EventId(99),
        0,
        &mut rig.clock,
        &mut rig.scheduler,
        &mut NullHost
    ));
    assert_eq!(rig.clock.pending_events(), pending);
}

#[test]
fn test_clock_rate_change_recomputes_intervals() {
    let mut rig = Rig::new(LatencyProfile::High);
    rig.clock.set_cycles_per_second(333_000_000);
    rig.engine.on_clock_rate_change(&rig.clock);

    assert_eq!(rig.engine.intervals().audio, 333_000_000 * 64 / 44_100);
    assert_eq!(rig.engine.intervals().host, 333_000_000 * 512 / 44_100);
}

#[test]
fn test_clock_driven_drain_wakes_thread() {
    let mut rig = Rig::new(LatencyProfile::Medium);
    rig.setup_channel(0, SampleFormat::Stereo, RAM_BASE, &constant_stereo(128, 11));
    let main = rig.scheduler.current_thread();
    rig.enqueue(0, true);
    rig.enqueue(0, true);

    // 128 frames to drain at 64 frames per tick
    let interval = rig.engine.intervals().audio;
    rig.run_cycles(interval);
    assert!(rig.scheduler.is_waiting(main));
    rig.run_cycles(interval);
    assert_eq!(rig.scheduler.resume_value(main), Some(128));
}
