//! Modulation effects built from one template
//!
//! Delay, Echo, Chorus, Flanger, Vibrato, Phaser, Tremolo and Auto Pan share
//! a single processor parameterised by a [`ModulationLayout`]: the number of
//! taps, whether the taps feed back, and what the LFO modulates.

use std::f32::consts::{FRAC_PI_4, PI, SQRT_2, TAU};
use std::sync::Arc;

use crate::buffer::AudioBuffer;
use crate::dsp::{ms_to_samples, undenormal, DelayLine, Oscillator, Waveform};
use crate::meters::MeterBank;
use crate::params::{ParamDescriptor, ParameterStore, Smoother};
use crate::processor::{begin_block, ProcessSpec, Processor};

// ============================================================================
// Layout
// ============================================================================

/// What the LFO drives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LfoTarget {
    /// No LFO; taps sit at fixed multiples of the delay time
    None,
    /// Tap delay times
    Delay,
    /// Output gain
    Gain,
    /// Stereo position
    Pan,
    /// Allpass stage coefficients
    AllpassCoeff,
}

/// Shape of a modulation effect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModulationLayout {
    /// Delay taps, or allpass stages for `LfoTarget::AllpassCoeff`
    pub taps: usize,
    pub feedback: bool,
    pub lfo_target: LfoTarget,
}

/// The concrete effects built from the template
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModulationKind {
    Delay,
    Echo,
    Chorus,
    Flanger,
    Vibrato,
    Phaser,
    Tremolo,
    AutoPan,
}

impl ModulationKind {
    pub const ALL: [ModulationKind; 8] = [
        ModulationKind::Delay,
        ModulationKind::Echo,
        ModulationKind::Chorus,
        ModulationKind::Flanger,
        ModulationKind::Vibrato,
        ModulationKind::Phaser,
        ModulationKind::Tremolo,
        ModulationKind::AutoPan,
    ];

    pub fn id(self) -> &'static str {
        match self {
            ModulationKind::Delay => "delay",
            ModulationKind::Echo => "echo",
            ModulationKind::Chorus => "chorus",
            ModulationKind::Flanger => "flanger",
            ModulationKind::Vibrato => "vibrato",
            ModulationKind::Phaser => "phaser",
            ModulationKind::Tremolo => "tremolo",
            ModulationKind::AutoPan => "auto_pan",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            ModulationKind::Delay => "Delay",
            ModulationKind::Echo => "Echo",
            ModulationKind::Chorus => "Chorus",
            ModulationKind::Flanger => "Flanger",
            ModulationKind::Vibrato => "Vibrato",
            ModulationKind::Phaser => "Phaser",
            ModulationKind::Tremolo => "Tremolo",
            ModulationKind::AutoPan => "Auto Pan",
        }
    }

    pub fn layout(self) -> ModulationLayout {
        let (taps, feedback, lfo_target) = match self {
            ModulationKind::Delay => (1, true, LfoTarget::None),
            ModulationKind::Echo => (3, true, LfoTarget::None),
            ModulationKind::Chorus => (2, false, LfoTarget::Delay),
            ModulationKind::Flanger => (1, true, LfoTarget::Delay),
            ModulationKind::Vibrato => (1, false, LfoTarget::Delay),
            ModulationKind::Phaser => (4, true, LfoTarget::AllpassCoeff),
            ModulationKind::Tremolo => (0, false, LfoTarget::Gain),
            ModulationKind::AutoPan => (0, false, LfoTarget::Pan),
        };
        ModulationLayout {
            taps,
            feedback,
            lfo_target,
        }
    }

    pub fn params(self) -> &'static [ParamDescriptor] {
        match self {
            ModulationKind::Delay => &DELAY_PARAMS,
            ModulationKind::Echo => &ECHO_PARAMS,
            ModulationKind::Chorus => &CHORUS_PARAMS,
            ModulationKind::Flanger => &FLANGER_PARAMS,
            ModulationKind::Vibrato => &VIBRATO_PARAMS,
            ModulationKind::Phaser => &PHASER_PARAMS,
            ModulationKind::Tremolo => &TREMOLO_PARAMS,
            ModulationKind::AutoPan => &AUTO_PAN_PARAMS,
        }
    }
}

// ============================================================================
// Parameter tables
// ============================================================================

const fn rate(max: f32, default: f32) -> ParamDescriptor {
    ParamDescriptor::skewed("rate", "Rate", "Hz", 0.05, max, 0.4, default)
}

const fn depth(default: f32) -> ParamDescriptor {
    ParamDescriptor::linear("depth", "Depth", "%", 0.0, 100.0, default)
}

const fn delay(min: f32, max: f32, default: f32) -> ParamDescriptor {
    ParamDescriptor::skewed("delay", "Delay", "ms", min, max, 0.5, default)
}

const fn feedback(default: f32) -> ParamDescriptor {
    ParamDescriptor::linear("feedback", "Feedback", "%", 0.0, 95.0, default)
}

const fn tone(default: f32) -> ParamDescriptor {
    ParamDescriptor::skewed("tone", "Tone", "Hz", 500.0, 20000.0, 0.3, default)
}

const fn waveform(default_index: usize) -> ParamDescriptor {
    ParamDescriptor::choice("waveform", "Waveform", Waveform::LFO_LABELS, default_index)
}

const fn mix(default: f32) -> ParamDescriptor {
    ParamDescriptor::linear("mix", "Mix", "%", 0.0, 100.0, default)
}

const DELAY_PARAMS: [ParamDescriptor; 4] = [
    delay(1.0, 2000.0, 350.0),
    feedback(35.0),
    tone(8000.0),
    mix(35.0),
];

const ECHO_PARAMS: [ParamDescriptor; 4] = [
    delay(1.0, 1000.0, 250.0),
    feedback(40.0),
    tone(5000.0),
    mix(40.0),
];

const CHORUS_PARAMS: [ParamDescriptor; 5] = [
    rate(10.0, 0.8),
    depth(50.0),
    delay(5.0, 40.0, 15.0),
    waveform(0),
    mix(50.0),
];

const FLANGER_PARAMS: [ParamDescriptor; 6] = [
    rate(10.0, 0.25),
    depth(70.0),
    delay(0.5, 10.0, 2.0),
    feedback(50.0),
    waveform(1),
    mix(50.0),
];

const VIBRATO_PARAMS: [ParamDescriptor; 5] = [
    rate(15.0, 5.0),
    depth(40.0),
    delay(1.0, 10.0, 5.0),
    waveform(0),
    mix(100.0),
];

const PHASER_PARAMS: [ParamDescriptor; 5] = [
    rate(10.0, 0.5),
    depth(70.0),
    feedback(40.0),
    waveform(0),
    mix(50.0),
];

const TREMOLO_PARAMS: [ParamDescriptor; 4] = [rate(20.0, 5.0), depth(50.0), waveform(0), mix(100.0)];

const AUTO_PAN_PARAMS: [ParamDescriptor; 4] = [rate(10.0, 1.0), depth(80.0), waveform(0), mix(100.0)];

/// Table positions resolved once at construction
#[derive(Debug, Clone, Copy)]
struct Slots {
    rate: Option<usize>,
    depth: Option<usize>,
    delay: Option<usize>,
    feedback: Option<usize>,
    tone: Option<usize>,
    waveform: Option<usize>,
    mix: usize,
}

impl Slots {
    fn resolve(store: &ParameterStore) -> Self {
        Self {
            rate: store.index_of("rate"),
            depth: store.index_of("depth"),
            delay: store.index_of("delay"),
            feedback: store.index_of("feedback"),
            tone: store.index_of("tone"),
            waveform: store.index_of("waveform"),
            mix: store.index_of("mix").unwrap_or(0),
        }
    }
}

// ============================================================================
// Constants
// ============================================================================

/// Gain of each further echo tap relative to the previous one
const TAP_DECAY: f32 = 0.6;
/// Phaser sweep range
const PHASER_MIN_HZ: f32 = 200.0;
const PHASER_MAX_HZ: f32 = 4000.0;
/// Most allpass stages any layout uses
const MAX_STAGES: usize = 4;

/// One-pole low-pass coefficient for `cutoff`
#[inline]
fn one_pole_coeff(cutoff: f32, sample_rate: f32) -> f32 {
    1.0 - (-TAU * cutoff / sample_rate).exp()
}

/// First-order allpass coefficient placing the 90° point at `frequency`
#[inline]
fn allpass_coeff(frequency: f32, sample_rate: f32) -> f32 {
    let frequency = frequency.clamp(1.0, sample_rate * 0.49);
    let t = (PI * frequency / sample_rate).tan();
    (t - 1.0) / (t + 1.0)
}

/// LFO value in `[-1, 1]` at `phase` shifted by `offset`
#[inline]
fn lfo_at(waveform: Waveform, phase: f32, offset: f32) -> f32 {
    let mut p = phase + offset;
    if p >= TAU {
        p -= TAU;
    }
    waveform.at(p)
}

// ============================================================================
// Channel state
// ============================================================================

#[derive(Debug, Clone, Copy, Default)]
struct AllpassStage {
    x1: f32,
    y1: f32,
}

impl AllpassStage {
    #[inline]
    fn process(&mut self, x: f32, a: f32) -> f32 {
        let y = undenormal(a * x + self.x1 - a * self.y1);
        self.x1 = x;
        self.y1 = y;
        y
    }
}

#[derive(Debug, Clone, Default)]
struct Channel {
    line: DelayLine,
    /// One-pole tone state on the wet path
    tone: f32,
    /// One-pole tone state on the feedback path
    tone_feedback: f32,
    stages: [AllpassStage; MAX_STAGES],
    /// Last phaser chain output, fed back into its input
    last: f32,
}

impl Channel {
    fn clear(&mut self) {
        self.line.clear();
        self.tone = 0.0;
        self.tone_feedback = 0.0;
        self.stages = [AllpassStage::default(); MAX_STAGES];
        self.last = 0.0;
    }
}

#[derive(Debug, Clone, Copy)]
struct Settings {
    depth: f32,
    /// Base delay in samples
    delay: f32,
    feedback: f32,
    tone: Option<f32>,
    waveform: Waveform,
}

// ============================================================================
// Processor
// ============================================================================

/// Template processor for the modulation family
pub struct ModulationEffect {
    kind: ModulationKind,
    layout: ModulationLayout,
    slots: Slots,
    params: Arc<ParameterStore>,
    meters: Arc<MeterBank>,
    spec: Option<ProcessSpec>,
    channels: Vec<Channel>,
    lfo: Oscillator,
    mix: Smoother,
}

impl ModulationEffect {
    pub fn new(kind: ModulationKind) -> Self {
        let params = ParameterStore::new(kind.id(), kind.params());
        Self {
            kind,
            layout: kind.layout(),
            slots: Slots::resolve(&params),
            params: Arc::new(params),
            meters: Arc::new(MeterBank::new(&[])),
            spec: None,
            channels: Vec::new(),
            lfo: Oscillator::new(),
            mix: Smoother::default(),
        }
    }

    pub fn kind(&self) -> ModulationKind {
        self.kind
    }

    pub fn layout(&self) -> ModulationLayout {
        self.layout
    }

    /// Shared LFO phase in radians
    pub fn lfo_phase(&self) -> f32 {
        self.lfo.phase()
    }

    #[inline]
    fn read_or(&self, slot: Option<usize>, fallback: f32) -> f32 {
        slot.map_or(fallback, |index| self.params.read(index))
    }

    /// Longest delay any tap can reach, in milliseconds
    fn max_delay_ms(&self) -> f32 {
        let Some(index) = self.slots.delay else {
            return 0.0;
        };
        let longest = self.params.at(index).descriptor().range.max();
        match self.layout.lfo_target {
            LfoTarget::None => longest * self.layout.taps as f32,
            _ => longest * 2.0,
        }
    }

    fn settings(&self, sample_rate: f32) -> Settings {
        Settings {
            depth: self.read_or(self.slots.depth, 0.0) * 0.01,
            delay: self.read_or(self.slots.delay, 0.0) * 0.001 * sample_rate,
            feedback: if self.layout.feedback {
                self.read_or(self.slots.feedback, 0.0) * 0.01
            } else {
                0.0
            },
            tone: self
                .slots
                .tone
                .map(|index| one_pole_coeff(self.params.read(index), sample_rate)),
            waveform: Waveform::from_index(
                self.slots
                    .waveform
                    .map_or(0, |index| self.params.at(index).index()),
            ),
        }
    }
}

impl Processor for ModulationEffect {
    fn effect_id(&self) -> &'static str {
        self.kind.id()
    }

    fn display_name(&self) -> &'static str {
        self.kind.display_name()
    }

    fn parameters(&self) -> &Arc<ParameterStore> {
        &self.params
    }

    fn meters(&self) -> &Arc<MeterBank> {
        &self.meters
    }

    fn is_prepared(&self) -> bool {
        self.spec.is_some()
    }

    fn prepare(&mut self, spec: ProcessSpec) {
        let capacity = ms_to_samples(self.max_delay_ms(), spec.rate()) + 2;
        self.channels = (0..spec.num_channels)
            .map(|_| {
                let mut channel = Channel::default();
                if self.layout.taps > 0 && self.slots.delay.is_some() {
                    channel.line.allocate(capacity);
                }
                channel
            })
            .collect();
        self.lfo.reset();
        self.mix
            .prepare(spec.rate(), self.params.read(self.slots.mix) * 0.01);
        self.spec = Some(spec);
        log::debug!(
            "{} prepared at {} Hz ({} taps)",
            self.kind.id(),
            spec.sample_rate,
            self.layout.taps
        );
    }

    fn release(&mut self) {
        self.spec = None;
        self.channels = Vec::new();
    }

    fn reset(&mut self) {
        self.lfo.reset();
        for channel in &mut self.channels {
            channel.clear();
        }
    }

    fn process_block(&mut self, buffer: &mut AudioBuffer) {
        let Some((spec, active)) = begin_block(self.spec, buffer) else {
            return;
        };

        let fs = spec.rate();
        let s = self.settings(fs);
        self.lfo.set_frequency(self.read_or(self.slots.rate, 0.0), fs);
        self.mix.set_target(self.params.read(self.slots.mix) * 0.01);

        let layout = self.layout;
        let buffers = &mut buffer.channels_mut()[..active];
        let states = &mut self.channels[..active];
        let num_samples = buffers.first().map_or(0, Vec::len);
        let tap_offset = if layout.taps > 0 {
            TAU / layout.taps as f32
        } else {
            0.0
        };

        for n in 0..num_samples {
            let mix = self.mix.next();
            let phase = self.lfo.phase();
            self.lfo.advance();

            for (ch, (samples, state)) in buffers.iter_mut().zip(states.iter_mut()).enumerate() {
                let x = samples[n];
                let wet = match layout.lfo_target {
                    LfoTarget::None | LfoTarget::Delay => {
                        let mut sum = 0.0;
                        let mut last = 0.0;
                        let mut gain = 1.0;
                        for k in 0..layout.taps {
                            let delay = if layout.lfo_target == LfoTarget::None {
                                s.delay * (k + 1) as f32
                            } else {
                                let lfo = lfo_at(s.waveform, phase, tap_offset * k as f32);
                                s.delay * (1.0 + s.depth * lfo)
                            };
                            // Read before this sample is written: delay 1 is tap 0
                            last = state.line.tap_frac((delay - 1.0).max(0.0));
                            if layout.lfo_target == LfoTarget::None {
                                sum += last * gain;
                                gain *= TAP_DECAY;
                            } else {
                                sum += last / layout.taps as f32;
                            }
                        }

                        let fed_back = match s.tone {
                            Some(a) => {
                                state.tone_feedback =
                                    undenormal(state.tone_feedback + a * (last - state.tone_feedback));
                                state.tone_feedback
                            }
                            None => last,
                        };
                        state.line.write(undenormal(x + s.feedback * fed_back));

                        match s.tone {
                            Some(a) => {
                                state.tone = undenormal(state.tone + a * (sum - state.tone));
                                state.tone
                            }
                            None => sum,
                        }
                    }
                    LfoTarget::AllpassCoeff => {
                        let lfo = s.waveform.at(phase);
                        let sweep = (0.5 + 0.5 * lfo) * s.depth;
                        let frequency = PHASER_MIN_HZ * (PHASER_MAX_HZ / PHASER_MIN_HZ).powf(sweep);
                        let a = allpass_coeff(frequency, fs);
                        let mut y = x + s.feedback * state.last;
                        for stage in state.stages.iter_mut().take(layout.taps) {
                            y = stage.process(y, a);
                        }
                        state.last = y;
                        y
                    }
                    LfoTarget::Gain => {
                        let lfo = s.waveform.at(phase);
                        x * (1.0 - s.depth * (0.5 - 0.5 * lfo))
                    }
                    LfoTarget::Pan => {
                        if active < 2 {
                            x
                        } else {
                            let pan = s.depth * s.waveform.at(phase);
                            let angle = (pan + 1.0) * FRAC_PI_4;
                            let gain = if ch == 0 { angle.cos() } else { angle.sin() };
                            x * gain * SQRT_2
                        }
                    }
                };

                samples[n] = x * (1.0 - mix) + wet * mix;
            }
        }

        self.lfo.wrap();
    }
}
