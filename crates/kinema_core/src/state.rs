//! Persistence-boundary shapes and the parse-or-fallback helpers that guard them.
//!
//! Persisted state comes back from files written by other tools, older versions or
//! hand edits. Numbers sometimes arrive as strings ("0.42"), sometimes as garbage.
//! Everything numeric crosses into the core through `LenientF32`, so the rest of
//! the code can assume finite values unconditionally.

use crate::affect::{Axis, AxisVector};
use crate::skill::Pose;
use chrono::{DateTime, Utc};
use serde::de::{Deserializer, IgnoredAny};
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;

/// Guard against NaN and Infinity. Non-finite values are replaced by `fallback`.
#[inline]
pub fn sanitize_f32(v: f32, fallback: f32) -> f32 {
    if v.is_finite() {
        v
    } else {
        tracing::warn!("NaN/Inf detected in state, resetting to fallback {}", fallback);
        fallback
    }
}

/// A float that deserializes from a number *or* a numeric string, and records
/// `None` for anything else instead of failing the whole document.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LenientF32(pub Option<f32>);

impl LenientF32 {
    pub fn value(&self) -> Option<f32> {
        self.0
    }

    pub fn or(&self, fallback: f32) -> f32 {
        self.0.unwrap_or(fallback)
    }
}

impl From<f32> for LenientF32 {
    fn from(v: f32) -> Self {
        Self(Some(v).filter(|v| v.is_finite()))
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawNumber {
    Number(f64),
    Text(String),
    Other(IgnoredAny),
}

impl<'de> Deserialize<'de> for LenientF32 {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = RawNumber::deserialize(deserializer)?;
        let parsed = match raw {
            RawNumber::Number(n) => Some(n as f32),
            RawNumber::Text(s) => s.trim().parse::<f32>().ok(),
            RawNumber::Other(_) => None,
        };
        Ok(Self(parsed.filter(|v| v.is_finite())))
    }
}

impl Serialize for LenientF32 {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self.0 {
            Some(v) => serializer.serialize_f32(v),
            None => serializer.serialize_none(),
        }
    }
}

/// Plain affective values as handed to the persistence collaborator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AffectSnapshot {
    #[serde(default)]
    pub axes: BTreeMap<String, LenientF32>,
    #[serde(default)]
    pub saved_at: Option<DateTime<Utc>>,
}

impl AffectSnapshot {
    pub fn from_axes(axes: &AxisVector) -> Self {
        Self {
            axes: axes
                .iter()
                .map(|(a, v)| (a.as_str().to_string(), LenientF32::from(v)))
                .collect(),
            saved_at: Some(Utc::now()),
        }
    }

    /// Parsed value for an axis, `None` when missing or malformed.
    pub fn axis(&self, axis: Axis) -> Option<f32> {
        self.axes.get(axis.as_str()).and_then(|v| v.value())
    }

    /// Rebuild an axis vector, substituting `baseline` for every missing or
    /// malformed axis. Returns the vector and the axes that fell back.
    pub fn to_axes(&self, baseline: &AxisVector) -> (AxisVector, Vec<Axis>) {
        let mut out = *baseline;
        let mut fell_back = Vec::new();
        for axis in Axis::ALL {
            match self.axis(axis) {
                Some(v) => out.set(axis, v),
                None => fell_back.push(axis),
            }
        }
        (out, fell_back)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OrMalformed<T> {
    Value(T),
    Malformed(IgnoredAny),
}

/// Field-level fallback: a malformed field becomes its default instead of
/// failing the whole document.
fn default_if_malformed<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    match OrMalformed::<T>::deserialize(deserializer)? {
        OrMalformed::Value(v) => Ok(v),
        OrMalformed::Malformed(_) => {
            tracing::warn!(
                "Malformed {} in session snapshot, using default",
                std::any::type_name::<T>()
            );
            Ok(T::default())
        }
    }
}

/// Everything the host persists between sessions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionSnapshot {
    #[serde(default, deserialize_with = "default_if_malformed")]
    pub affect: AffectSnapshot,
    #[serde(default, deserialize_with = "default_if_malformed")]
    pub pose: Pose,
    /// Learned effectiveness per function code ("Ne", "Fi", ...).
    #[serde(default, deserialize_with = "default_if_malformed")]
    pub effectiveness: BTreeMap<String, LenientF32>,
}
