//! Affective axes modelled on neuromodulators.
//!
//! Mood is a point in a six-dimensional unit hypercube. Each axis is loosely named
//! after the neurotransmitter whose role it plays (reward, contentment, alertness,
//! bonding, stress, inhibition). Categorical labels are *projected* from the
//! vector, never stored independently, so they can't go stale.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

pub const AXIS_COUNT: usize = 6;

/// One scalar dimension of the mood model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    /// Reward and anticipation
    Dopamine,
    /// Contentment and stability
    Serotonin,
    /// Alertness and arousal
    Noradrenaline,
    /// Social bonding
    Oxytocin,
    /// Stress
    Cortisol,
    /// Inhibition and calm
    Gaba,
}

impl Axis {
    pub const ALL: [Axis; AXIS_COUNT] = [
        Axis::Dopamine,
        Axis::Serotonin,
        Axis::Noradrenaline,
        Axis::Oxytocin,
        Axis::Cortisol,
        Axis::Gaba,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Axis::Dopamine => "dopamine",
            Axis::Serotonin => "serotonin",
            Axis::Noradrenaline => "noradrenaline",
            Axis::Oxytocin => "oxytocin",
            Axis::Cortisol => "cortisol",
            Axis::Gaba => "gaba",
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Axis {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dopamine" => Ok(Axis::Dopamine),
            "serotonin" => Ok(Axis::Serotonin),
            "noradrenaline" | "norepinephrine" => Ok(Axis::Noradrenaline),
            "oxytocin" => Ok(Axis::Oxytocin),
            "cortisol" => Ok(Axis::Cortisol),
            "gaba" => Ok(Axis::Gaba),
            other => Err(format!("unknown affect axis '{}'", other)),
        }
    }
}

/// A full axis vector. Every constructor except `raw` clamps into `[0, 1]` and
/// replaces non-finite values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisVector([f32; AXIS_COUNT]);

impl Default for AxisVector {
    /// The neutral resting point: mid-range everywhere, a little less alert and
    /// a little less stressed.
    fn default() -> Self {
        Self([0.5, 0.5, 0.4, 0.5, 0.3, 0.5])
    }
}

impl AxisVector {
    const fn raw(values: [f32; AXIS_COUNT]) -> Self {
        Self(values)
    }

    pub fn new(values: [f32; AXIS_COUNT]) -> Self {
        let mut v = Self(values);
        for axis in Axis::ALL {
            v.set(axis, values[axis.index()]);
        }
        v
    }

    pub fn splat(value: f32) -> Self {
        Self::new([value; AXIS_COUNT])
    }

    pub fn get(&self, axis: Axis) -> f32 {
        self.0[axis.index()]
    }

    /// Set an axis, clamping to `[0, 1]`. NaN becomes 0.5.
    pub fn set(&mut self, axis: Axis, value: f32) {
        let value = if value.is_nan() { 0.5 } else { value };
        self.0[axis.index()] = value.clamp(0.0, 1.0);
    }

    pub fn values(&self) -> [f32; AXIS_COUNT] {
        self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = (Axis, f32)> + '_ {
        Axis::ALL.into_iter().map(move |a| (a, self.get(a)))
    }

    pub fn distance(&self, other: &AxisVector) -> f32 {
        self.0
            .iter()
            .zip(other.0.iter())
            .map(|(a, b)| (a - b).powi(2))
            .sum::<f32>()
            .sqrt()
    }

    /// Distance from this point to the farthest corner of the unit hypercube.
    pub fn max_distance(&self) -> f32 {
        self.0
            .iter()
            .map(|v| v.max(1.0 - v).powi(2))
            .sum::<f32>()
            .sqrt()
    }
}

// ============================================================================
// Categorical projection
// ============================================================================

/// Primary emotion label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Emotion {
    Neutral,
    Joy,
    Contentment,
    Affection,
    Surprise,
    Fear,
    Anger,
    Sadness,
}

impl Emotion {
    pub fn as_str(&self) -> &'static str {
        match self {
            Emotion::Neutral => "neutral",
            Emotion::Joy => "joy",
            Emotion::Contentment => "contentment",
            Emotion::Affection => "affection",
            Emotion::Surprise => "surprise",
            Emotion::Fear => "fear",
            Emotion::Anger => "anger",
            Emotion::Sadness => "sadness",
        }
    }

    pub fn is_negative(&self) -> bool {
        matches!(self, Emotion::Fear | Emotion::Anger | Emotion::Sadness)
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reference vectors, axis order: dopamine, serotonin, noradrenaline, oxytocin,
/// cortisol, gaba. Neutral is not listed: its reference is the configured baseline.
const REFERENCE_TABLE: [(Emotion, AxisVector); 7] = [
    (Emotion::Joy, AxisVector::raw([0.85, 0.70, 0.60, 0.60, 0.20, 0.50])),
    (Emotion::Contentment, AxisVector::raw([0.60, 0.80, 0.30, 0.55, 0.15, 0.75])),
    (Emotion::Affection, AxisVector::raw([0.65, 0.65, 0.40, 0.90, 0.20, 0.60])),
    (Emotion::Surprise, AxisVector::raw([0.65, 0.50, 0.90, 0.45, 0.45, 0.35])),
    (Emotion::Fear, AxisVector::raw([0.30, 0.30, 0.90, 0.30, 0.85, 0.20])),
    (Emotion::Anger, AxisVector::raw([0.50, 0.20, 0.85, 0.15, 0.80, 0.20])),
    (Emotion::Sadness, AxisVector::raw([0.20, 0.20, 0.25, 0.35, 0.60, 0.45])),
];

/// Reference vector for a primary emotion (`None` for neutral).
pub fn reference_vector(emotion: Emotion) -> Option<AxisVector> {
    REFERENCE_TABLE
        .iter()
        .find(|(e, _)| *e == emotion)
        .map(|(_, v)| *v)
}

fn nearest_emotion(axes: &AxisVector, baseline: &AxisVector) -> Emotion {
    let mut best = Emotion::Neutral;
    let mut best_dist = axes.distance(baseline);
    for (emotion, reference) in REFERENCE_TABLE.iter() {
        let d = axes.distance(reference);
        if d < best_dist {
            best = *emotion;
            best_dist = d;
        }
    }
    best
}

/// Narrow a primary label using one or two secondary axes.
fn sub_emotion(primary: Emotion, axes: &AxisVector) -> &'static str {
    let da = axes.get(Axis::Dopamine);
    let ne = axes.get(Axis::Noradrenaline);
    let oxt = axes.get(Axis::Oxytocin);
    let cort = axes.get(Axis::Cortisol);
    let gaba = axes.get(Axis::Gaba);

    match primary {
        Emotion::Neutral => {
            if ne > 0.6 {
                "attentive"
            } else {
                "steady"
            }
        }
        Emotion::Joy => {
            if ne > 0.7 {
                "excited"
            } else {
                "cheerful"
            }
        }
        Emotion::Contentment => {
            if gaba > 0.8 {
                "serene"
            } else {
                "satisfied"
            }
        }
        Emotion::Affection => {
            if oxt > 0.85 && da > 0.7 {
                "devoted"
            } else {
                "warm"
            }
        }
        Emotion::Surprise => {
            if da >= 0.5 {
                "amazed"
            } else {
                "startled"
            }
        }
        Emotion::Fear => {
            if cort > 0.9 && ne > 0.9 {
                "panicked"
            } else {
                "anxious"
            }
        }
        Emotion::Anger => {
            if cort > 0.8 {
                "furious"
            } else {
                "irritated"
            }
        }
        Emotion::Sadness => {
            if oxt < 0.3 {
                "lonely"
            } else if da < 0.15 {
                "despondent"
            } else {
                "melancholy"
            }
        }
    }
}

/// Immutable snapshot of the mood model with its derived labels.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AffectiveState {
    axes: AxisVector,
    primary: Emotion,
    sub_emotion: &'static str,
    intensity: f32,
}

impl AffectiveState {
    /// Project an axis vector into a labelled snapshot.
    ///
    /// `neutral_threshold` is the minimum normalised intensity for a non-neutral
    /// primary label.
    pub fn derive(axes: AxisVector, baseline: &AxisVector, neutral_threshold: f32) -> Self {
        let axes = AxisVector::new(axes.values());
        let max = baseline.max_distance();
        let intensity = if max > f32::EPSILON {
            (axes.distance(baseline) / max).clamp(0.0, 1.0)
        } else {
            0.0
        };

        let primary = if intensity < neutral_threshold {
            Emotion::Neutral
        } else {
            nearest_emotion(&axes, baseline)
        };

        Self {
            axes,
            primary,
            sub_emotion: sub_emotion(primary, &axes),
            intensity,
        }
    }

    /// Snapshot sitting exactly on the baseline.
    pub fn neutral(baseline: &AxisVector) -> Self {
        Self::derive(*baseline, baseline, 0.0)
    }

    pub fn axes(&self) -> &AxisVector {
        &self.axes
    }

    pub fn get(&self, axis: Axis) -> f32 {
        self.axes.get(axis)
    }

    pub fn primary(&self) -> Emotion {
        self.primary
    }

    pub fn sub_emotion(&self) -> &'static str {
        self.sub_emotion
    }

    pub fn intensity(&self) -> f32 {
        self.intensity
    }

    /// Short natural-language rendering for logs and status panels.
    pub fn describe(&self) -> String {
        if self.primary == Emotion::Neutral {
            return format!("emotionally {}", self.sub_emotion);
        }
        let degree = if self.intensity < 0.2 {
            "faintly"
        } else if self.intensity < 0.4 {
            "mildly"
        } else if self.intensity < 0.6 {
            "clearly"
        } else if self.intensity < 0.8 {
            "strongly"
        } else {
            "intensely"
        };
        format!("{} {} ({})", degree, self.sub_emotion, self.primary)
    }
}

// ============================================================================
// Deltas
// ============================================================================

/// Signed per-axis adjustments, accumulated by the judgment pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AffectDelta(BTreeMap<Axis, f32>);

impl AffectDelta {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of `add`.
    pub fn with(mut self, axis: Axis, value: f32) -> Self {
        self.add(axis, value);
        self
    }

    /// Accumulate a signed value onto an axis.
    pub fn add(&mut self, axis: Axis, value: f32) {
        *self.0.entry(axis).or_insert(0.0) += value;
    }

    /// Accumulate every entry of `other`, multiplied by `factor`.
    pub fn merge_scaled(&mut self, other: &AffectDelta, factor: f32) {
        for (axis, value) in other.iter() {
            self.add(axis, value * factor);
        }
    }

    pub fn scaled(&self, factor: f32) -> Self {
        let mut out = Self::new();
        out.merge_scaled(self, factor);
        out
    }

    pub fn get(&self, axis: Axis) -> f32 {
        self.0.get(&axis).copied().unwrap_or(0.0)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Axis, f32)> + '_ {
        self.0.iter().map(|(a, v)| (*a, *v))
    }

    /// Entries keyed by axis name, the shape `AffectModel::apply_delta` accepts.
    pub fn named(&self) -> impl Iterator<Item = (&'static str, f32)> + '_ {
        self.0.iter().map(|(a, v)| (a.as_str(), *v))
    }
}
