//! Properties every processor must satisfy
//!
//! Each test runs over the full effect registry.

use hyperprism::{AudioBuffer, EffectKind, ProcessSpec, Processor};

const FS: f64 = 48000.0;

fn prepared(kind: EffectKind, block: usize, channels: usize) -> Box<dyn Processor> {
    let mut processor = kind.instantiate();
    processor.prepare(ProcessSpec::new(FS, block, channels));
    processor
}

/// Stereo test signal: a loud 220 Hz section followed by a quiet 3 kHz one
fn program(num_samples: usize) -> AudioBuffer {
    let loud = AudioBuffer::sine(2, num_samples / 2, FS, 220.0, 0.8);
    let quiet = AudioBuffer::sine(2, num_samples - num_samples / 2, FS, 3000.0, 0.02);
    let mut buffer = loud;
    buffer.append(&quiet);
    buffer
}

fn process_in_blocks(processor: &mut dyn Processor, input: &AudioBuffer, block: usize) -> AudioBuffer {
    let mut output = AudioBuffer::new(input.num_channels(), 0);
    let mut start = 0;
    while start < input.num_samples() {
        let len = block.min(input.num_samples() - start);
        let mut chunk = input.slice(start, len);
        processor.process_block(&mut chunk);
        output.append(&chunk);
        start += len;
    }
    output
}

// === Silence ===

#[test]
fn test_silence_in_silence_out() {
    for kind in EffectKind::all() {
        let mut processor = prepared(kind, 512, 2);
        for _ in 0..20 {
            let mut buffer = AudioBuffer::new(2, 512);
            processor.process_block(&mut buffer);
            for ch in 0..2 {
                assert!(
                    buffer.channel(ch).iter().all(|s| s.abs() <= f32::EPSILON),
                    "{} produced output from silence",
                    kind.id()
                );
            }
        }
    }
}

#[test]
fn test_unprepared_processor_outputs_silence() {
    for kind in EffectKind::all() {
        let mut processor = kind.instantiate();
        let mut buffer = AudioBuffer::sine(2, 64, FS, 440.0, 0.5);
        processor.process_block(&mut buffer);
        assert_eq!(buffer, AudioBuffer::new(2, 64), "{}", kind.id());
    }
}

// === Denormals ===

#[test]
fn test_no_denormals_after_impulse_decay() {
    let block = 512;
    let blocks = (10.0 * FS) as usize / block;

    for kind in EffectKind::all() {
        let mut processor = prepared(kind, block, 2);
        let mut impulse = AudioBuffer::new(2, block);
        impulse.channel_mut(0)[0] = 1.0;
        impulse.channel_mut(1)[0] = -1.0;
        processor.process_block(&mut impulse);

        for _ in 0..blocks {
            let mut buffer = AudioBuffer::new(2, block);
            processor.process_block(&mut buffer);
            for ch in 0..2 {
                for &s in buffer.channel(ch) {
                    assert!(
                        s == 0.0 || s.abs() >= f32::MIN_POSITIVE,
                        "{} produced a subnormal sample {:e}",
                        kind.id(),
                        s
                    );
                }
            }
        }
    }
}

// === Determinism and block size ===

#[test]
fn test_identical_instances_are_bit_identical() {
    let input = program(8192);
    for kind in EffectKind::all() {
        let mut a = prepared(kind, 1024, 2);
        let mut b = prepared(kind, 1024, 2);
        let first = process_in_blocks(a.as_mut(), &input.slice(0, 4096), 1024);
        let second = process_in_blocks(b.as_mut(), &input.slice(0, 4096), 1024);
        assert_eq!(first, second, "{}", kind.id());

        // Same parameter trajectory on both
        for processor in [&a, &b] {
            let id = processor.parameters().iter().next().map(|p| p.id());
            if let Some(id) = id {
                let descriptor = *processor.parameters().get(id).unwrap().descriptor();
                processor.set_param(id, descriptor.range.max()).unwrap();
            }
        }
        let first = process_in_blocks(a.as_mut(), &input.slice(4096, 4096), 1024);
        let second = process_in_blocks(b.as_mut(), &input.slice(4096, 4096), 1024);
        assert_eq!(first, second, "{}", kind.id());
    }
}

#[test]
fn test_block_size_invariance() {
    let input = program(4096);
    for kind in EffectKind::all() {
        let mut whole = prepared(kind, 4096, 2);
        let mut split = prepared(kind, 4096, 2);
        let one_block = process_in_blocks(whole.as_mut(), &input, 4096);
        let eight_blocks = process_in_blocks(split.as_mut(), &input, 512);
        assert_eq!(one_block, eight_blocks, "{}", kind.id());
    }
}

#[test]
fn test_irregular_block_sizes_match() {
    let input = program(4096);
    for kind in EffectKind::all() {
        let mut regular = prepared(kind, 4096, 2);
        let reference = process_in_blocks(regular.as_mut(), &input, 4096);

        let mut irregular = prepared(kind, 4096, 2);
        let mut output = AudioBuffer::new(2, 0);
        let mut start = 0;
        for len in [1usize, 7, 64, 333, 1000, 2691] {
            let mut chunk = input.slice(start, len);
            irregular.process_block(&mut chunk);
            output.append(&chunk);
            start += len;
        }
        assert_eq!(start, 4096);
        assert_eq!(reference, output, "{}", kind.id());
    }
}

// === Lifecycle ===

#[test]
fn test_reset_restores_fresh_output() {
    let input = program(2048);
    for kind in EffectKind::all() {
        let mut processor = prepared(kind, 2048, 2);
        let fresh = process_in_blocks(processor.as_mut(), &input, 2048);
        processor.reset();
        let again = process_in_blocks(processor.as_mut(), &input, 2048);
        assert_eq!(fresh, again, "{}", kind.id());
    }
}

#[test]
fn test_mono_processing_is_finite() {
    let input = AudioBuffer::sine(1, 4096, FS, 100.0, 1.0);
    for kind in EffectKind::all() {
        let mut processor = prepared(kind, 512, 1);
        let output = process_in_blocks(processor.as_mut(), &input, 512);
        assert!(output.is_valid(), "{}", kind.id());
        assert_eq!(output.num_samples(), 4096);
    }
}

#[test]
fn test_bus_layouts() {
    for kind in EffectKind::all() {
        let processor = kind.instantiate();
        assert!(processor.is_bus_layout_supported(1, 1));
        assert!(processor.is_bus_layout_supported(2, 2));
        assert!(!processor.is_bus_layout_supported(1, 2));
        assert!(!processor.is_bus_layout_supported(6, 6));
    }
}

// === Smoothing ===

/// One-pole step for a 50 ms ramp at 48 kHz
fn smoother_step() -> f32 {
    1.0 - (-7.0f32 / 2400.0).exp()
}

#[test]
fn test_output_gain_step_is_smoothed() {
    let mut processor = EffectKind::from_id("low_pass").unwrap().instantiate();
    processor.set_param("cutoff", 20000.0).unwrap();
    processor.prepare(ProcessSpec::new(FS, 4800, 1));

    let mut settle = AudioBuffer::new(1, 4800);
    settle.channel_mut(0).fill(0.1);
    processor.process_block(&mut settle);
    let before = settle.channel(0)[4799];

    processor.set_param("output_gain", 20.0).unwrap();
    let mut buffer = AudioBuffer::new(1, 4800);
    buffer.channel_mut(0).fill(0.1);
    processor.process_block(&mut buffer);

    let out = buffer.channel(0);
    let mut max_delta = (out[0] - before).abs();
    for pair in out.windows(2) {
        max_delta = max_delta.max((pair[1] - pair[0]).abs());
    }
    let jump = 1.0 - 0.1;
    assert!(max_delta <= smoother_step() * jump * 1.05 + 1e-5, "delta {}", max_delta);
    assert!((out[4799] - 1.0).abs() < 1e-3);
}

#[test]
fn test_compressor_makeup_step_is_smoothed() {
    let mut processor = EffectKind::from_id("compressor").unwrap().instantiate();
    processor.set_param("threshold", 0.0).unwrap();
    processor.prepare(ProcessSpec::new(FS, 4800, 1));

    let mut settle = AudioBuffer::new(1, 4800);
    settle.channel_mut(0).fill(0.1);
    processor.process_block(&mut settle);
    let before = settle.channel(0)[4799];

    processor.set_param("makeup", 12.0).unwrap();
    let mut buffer = AudioBuffer::new(1, 4800);
    buffer.channel_mut(0).fill(0.1);
    processor.process_block(&mut buffer);

    let out = buffer.channel(0);
    let mut max_delta = (out[0] - before).abs();
    for pair in out.windows(2) {
        max_delta = max_delta.max((pair[1] - pair[0]).abs());
    }
    let target = 0.1 * 10f32.powf(12.0 / 20.0);
    assert!(max_delta <= smoother_step() * (target - 0.1) * 1.05 + 1e-5);
    assert!((out[4799] - target).abs() < 1e-4);
}
