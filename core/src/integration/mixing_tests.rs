//! Mix tick tests

use super::test_utils::*;
use crate::config::{AudioSettings, LatencyProfile};
use crate::volume::ScaleKernel;
use crate::{AudioEngine, SampleFormat};

const SRC_A: u32 = RAM_BASE + 0x1000;
const SRC_B: u32 = RAM_BASE + 0x8000;

fn mix_two(a: i16, b: i16) -> Vec<i16> {
    let mut rig = Rig::new(LatencyProfile::Medium);
    rig.setup_channel(0, SampleFormat::Stereo, SRC_A, &constant_stereo(64, a));
    rig.setup_channel(1, SampleFormat::Stereo, SRC_B, &constant_stereo(64, b));
    rig.enqueue(0, false);
    rig.enqueue(1, false);
    rig.tick(1);
    rig.drain_output()
}

#[test]
fn test_two_channels_sum() {
    assert_eq!(mix_two(1000, 2500), constant_stereo(64, 3500));
    assert_eq!(mix_two(-1200, 200), constant_stereo(64, -1000));
}

#[test]
fn test_sum_clamps_at_boundaries() {
    assert_eq!(mix_two(30000, 10000), constant_stereo(64, i16::MAX));
    assert_eq!(mix_two(-30000, -10000), constant_stereo(64, i16::MIN));
}

#[test]
fn test_tick_drains_one_block() {
    let mut rig = Rig::new(LatencyProfile::Low);
    let samples = ramp(200);
    rig.setup_channel(0, SampleFormat::Stereo, SRC_A, &samples);
    rig.enqueue(0, false);

    rig.tick(1);

    // Low latency mixes 16 frames per tick
    assert_eq!(rig.engine.channel(0).unwrap().queued(), samples[32..].to_vec());
    assert_eq!(rig.drain_output(), samples[..32].to_vec());
}

#[test]
fn test_short_queue_mixes_with_silence() {
    let mut rig = Rig::new(LatencyProfile::Medium);
    rig.setup_channel(0, SampleFormat::Stereo, SRC_A, &constant_stereo(10, 400));
    rig.enqueue(0, false);

    rig.tick(1);

    let mut expected = constant_stereo(10, 400);
    expected.resize(128, 0);
    assert_eq!(rig.drain_output(), expected);
    assert_eq!(rig.engine.channel(0).unwrap().queued_samples(), 0);
}

#[test]
fn test_unreserved_channels_are_skipped() {
    let mut rig = Rig::new(LatencyProfile::Medium);
    rig.setup_channel(0, SampleFormat::Stereo, SRC_A, &constant_stereo(64, 321));
    rig.enqueue(0, false);
    rig.engine.channel_mut(0).unwrap().reserved = false;

    rig.tick(1);

    assert_eq!(rig.engine.channel(0).unwrap().queued_samples(), 128);
    assert_eq!(rig.drain_output(), vec![0; 128]);
}

#[test]
fn test_full_master_discards_block() {
    let settings = AudioSettings {
        master_queue_capacity: 256,
        ..AudioSettings::from_profile(LatencyProfile::Medium)
    };
    let mut rig = Rig::with_settings(settings);
    rig.setup_channel(0, SampleFormat::Stereo, SRC_A, &ramp(384));
    rig.enqueue(0, false);

    rig.tick(3);

    let stats = rig.engine.mixer_stats();
    assert_eq!(stats.ticks, 3);
    assert_eq!(stats.blocks_pushed, 2);
    assert_eq!(stats.blocks_discarded, 1);
    assert_eq!(stats.samples_mixed, 384);
    // The third block was mixed (channel drained) but never reached the output
    assert_eq!(rig.drain_output(), ramp(256));
}

#[test]
fn test_scalar_kernel_mixes_identically() {
    let run = |kernel: ScaleKernel| {
        let mut rig = Rig::new(LatencyProfile::Medium);
        rig.engine = AudioEngine::new(AudioSettings::default(), &mut rig.clock).with_kernel(kernel);
        rig.setup_channel(0, SampleFormat::Stereo, SRC_A, &ramp(256));
        rig.setup_channel(1, SampleFormat::Stereo, SRC_B, &ramp(256));
        rig.engine.channel_mut(0).unwrap().set_volume(0x9000, 0x2000);
        rig.engine.channel_mut(1).unwrap().set_volume(0xFFFF, 0x7FFF);
        rig.enqueue(0, false);
        rig.enqueue(1, false);
        rig.tick(2);
        rig.drain_output()
    };

    assert_eq!(run(ScaleKernel::Scalar), run(ScaleKernel::detect()));
}

#[test]
fn test_shutdown_clears_audio_but_keeps_reservations() {
    let mut rig = Rig::new(LatencyProfile::Medium);
    rig.setup_channel(0, SampleFormat::Stereo, SRC_A, &constant_stereo(256, 3));
    rig.enqueue(0, false);
    rig.tick(1);

    rig.engine.shutdown();

    assert_eq!(rig.engine.channel(0).unwrap().queued_samples(), 0);
    assert!(rig.engine.channel(0).unwrap().reserved);
    assert!(rig.drain_output().is_empty());
}
