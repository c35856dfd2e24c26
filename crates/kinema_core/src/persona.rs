//! Personality profile: the ordered stack of cognitive functions.
//!
//! Eight attitude-qualified functions exist (extraverted/introverted × feeling,
//! thinking, intuition, sensing). A profile ranks them: one dominant, one
//! auxiliary, the rest inferior with reduced effectiveness. The ranking is fixed
//! at load time; only `effectiveness` moves afterwards, through `reinforce`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub const MIN_EFFECTIVENESS: f32 = 0.3;
pub const MAX_EFFECTIVENESS: f32 = 1.0;

/// Attitude-qualified cognitive function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FunctionKind {
    /// Extraverted feeling: shared values, social harmony
    Fe,
    /// Introverted feeling: personal values
    Fi,
    /// Extraverted thinking: getting things done
    Te,
    /// Introverted thinking: internal consistency
    Ti,
    /// Extraverted intuition: possibilities in the outside world
    Ne,
    /// Introverted intuition: patterns and implications
    Ni,
    /// Extraverted sensing: the here and now
    Se,
    /// Introverted sensing: familiarity and routine
    Si,
}

impl FunctionKind {
    pub const ALL: [FunctionKind; 8] = [
        FunctionKind::Fe,
        FunctionKind::Fi,
        FunctionKind::Te,
        FunctionKind::Ti,
        FunctionKind::Ne,
        FunctionKind::Ni,
        FunctionKind::Se,
        FunctionKind::Si,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            FunctionKind::Fe => "Fe",
            FunctionKind::Fi => "Fi",
            FunctionKind::Te => "Te",
            FunctionKind::Ti => "Ti",
            FunctionKind::Ne => "Ne",
            FunctionKind::Ni => "Ni",
            FunctionKind::Se => "Se",
            FunctionKind::Si => "Si",
        }
    }

    /// Faculty letter: F, T, N or S.
    pub fn faculty(&self) -> char {
        match self {
            FunctionKind::Fe | FunctionKind::Fi => 'F',
            FunctionKind::Te | FunctionKind::Ti => 'T',
            FunctionKind::Ne | FunctionKind::Ni => 'N',
            FunctionKind::Se | FunctionKind::Si => 'S',
        }
    }

    pub fn is_extraverted(&self) -> bool {
        matches!(
            self,
            FunctionKind::Fe | FunctionKind::Te | FunctionKind::Ne | FunctionKind::Se
        )
    }

    fn from_parts(faculty: char, extraverted: bool) -> Option<Self> {
        Some(match (faculty, extraverted) {
            ('F', true) => FunctionKind::Fe,
            ('F', false) => FunctionKind::Fi,
            ('T', true) => FunctionKind::Te,
            ('T', false) => FunctionKind::Ti,
            ('N', true) => FunctionKind::Ne,
            ('N', false) => FunctionKind::Ni,
            ('S', true) => FunctionKind::Se,
            ('S', false) => FunctionKind::Si,
            _ => return None,
        })
    }
}

impl fmt::Display for FunctionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for FunctionKind {
    type Err = ProfileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        let mut chars = lower.chars();
        match (chars.next(), chars.next(), chars.next()) {
            (Some(f), Some(a), None) if a == 'e' || a == 'i' => {
                Self::from_parts(f.to_ascii_uppercase(), a == 'e')
                    .ok_or_else(|| ProfileError::UnknownFunction(s.to_string()))
            }
            _ => Err(ProfileError::UnknownFunction(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FunctionRole {
    Dominant,
    Auxiliary,
    Inferior,
}

impl fmt::Display for FunctionRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FunctionRole::Dominant => "dominant",
            FunctionRole::Auxiliary => "auxiliary",
            FunctionRole::Inferior => "inferior",
        };
        f.write_str(s)
    }
}

/// Observed result of an action a function proposed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reinforcement {
    Success,
    Failure,
}

#[derive(Debug, Error, PartialEq)]
pub enum ProfileError {
    #[error("invalid personality type code '{0}' (expected four letters like ENFP)")]
    InvalidTypeCode(String),
    #[error("unknown cognitive function '{0}'")]
    UnknownFunction(String),
    #[error("profile has no {0} function")]
    MissingRole(FunctionRole),
    #[error("profile has more than one {0} function")]
    DuplicateRole(FunctionRole),
    #[error("function {0} appears more than once in the profile")]
    DuplicateFunction(FunctionKind),
}

/// One ranked judgment contributor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CognitiveFunction {
    pub kind: FunctionKind,
    pub role: FunctionRole,
    pub effectiveness: f32,
}

impl CognitiveFunction {
    pub fn new(kind: FunctionKind, role: FunctionRole, effectiveness: f32) -> Self {
        Self {
            kind,
            role,
            effectiveness: clamp_effectiveness(effectiveness),
        }
    }

    /// Nudge effectiveness toward the observed outcome, staying within
    /// `[MIN_EFFECTIVENESS, MAX_EFFECTIVENESS]`. Returns the new value.
    pub fn reinforce(&mut self, outcome: Reinforcement, rate: f32) -> f32 {
        let rate = if rate.is_finite() { rate.clamp(0.0, 1.0) } else { 0.0 };
        self.effectiveness = match outcome {
            Reinforcement::Success => {
                self.effectiveness + rate * (MAX_EFFECTIVENESS - self.effectiveness)
            }
            Reinforcement::Failure => {
                self.effectiveness - rate * (self.effectiveness - MIN_EFFECTIVENESS)
            }
        };
        self.effectiveness = clamp_effectiveness(self.effectiveness);
        self.effectiveness
    }
}

fn clamp_effectiveness(v: f32) -> f32 {
    if v.is_finite() {
        v.clamp(MIN_EFFECTIVENESS, MAX_EFFECTIVENESS)
    } else {
        MIN_EFFECTIVENESS
    }
}

/// Nominal effectiveness per rank.
///
/// The k-th inferior function (0-based) gets `inferior * inferior_falloff^k`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FunctionWeights {
    pub dominant: f32,
    pub auxiliary: f32,
    pub inferior: f32,
    pub inferior_falloff: f32,
}

impl Default for FunctionWeights {
    fn default() -> Self {
        Self {
            dominant: 1.0,
            auxiliary: 0.8,
            inferior: 0.5,
            inferior_falloff: 1.0,
        }
    }
}

impl FunctionWeights {
    fn for_rank(&self, role: FunctionRole, inferior_index: usize) -> f32 {
        match role {
            FunctionRole::Dominant => self.dominant,
            FunctionRole::Auxiliary => self.auxiliary,
            FunctionRole::Inferior => {
                self.inferior * self.inferior_falloff.powi(inferior_index as i32)
            }
        }
    }
}

/// Ordered function stack: dominant, auxiliary, then inferiors in listed order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonalityProfile {
    pub type_code: Option<String>,
    functions: Vec<CognitiveFunction>,
}

impl PersonalityProfile {
    /// Derive the four-function stack from a type code such as "ENFP".
    ///
    /// The J/P letter says which of the two preferred functions faces outward; the
    /// E/I letter says whether the outward one leads. The tertiary is the opposite
    /// of the auxiliary in the dominant's attitude; the inferior is the opposite of
    /// the dominant in the other attitude.
    pub fn from_type_code(code: &str, weights: &FunctionWeights) -> Result<Self, ProfileError> {
        let upper = code.trim().to_ascii_uppercase();
        let letters: Vec<char> = upper.chars().collect();
        let invalid = || ProfileError::InvalidTypeCode(code.to_string());
        if letters.len() != 4 {
            return Err(invalid());
        }

        let extravert = match letters[0] {
            'E' => true,
            'I' => false,
            _ => return Err(invalid()),
        };
        let perceiving = match letters[1] {
            'S' | 'N' => letters[1],
            _ => return Err(invalid()),
        };
        let judging = match letters[2] {
            'T' | 'F' => letters[2],
            _ => return Err(invalid()),
        };
        let judging_outward = match letters[3] {
            'J' => true,
            'P' => false,
            _ => return Err(invalid()),
        };

        let (outward, inward) = if judging_outward {
            (judging, perceiving)
        } else {
            (perceiving, judging)
        };
        let (dom_faculty, dom_extraverted, aux_faculty) = if extravert {
            (outward, true, inward)
        } else {
            (inward, false, outward)
        };

        let opposite = |f: char| match f {
            'S' => 'N',
            'N' => 'S',
            'T' => 'F',
            _ => 'T',
        };

        let stack = [
            (dom_faculty, dom_extraverted, FunctionRole::Dominant),
            (aux_faculty, !dom_extraverted, FunctionRole::Auxiliary),
            (opposite(aux_faculty), dom_extraverted, FunctionRole::Inferior),
            (opposite(dom_faculty), !dom_extraverted, FunctionRole::Inferior),
        ];

        let ranked = stack
            .iter()
            .map(|(f, e, role)| {
                FunctionKind::from_parts(*f, *e)
                    .map(|kind| (kind, *role))
                    .ok_or_else(invalid)
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut profile = Self::from_ranked(&ranked, weights)?;
        profile.type_code = Some(upper);
        Ok(profile)
    }

    /// Build a profile from an explicit `(kind, role)` list, validating that there
    /// is exactly one dominant and one auxiliary and no repeated function.
    pub fn from_ranked(
        ranked: &[(FunctionKind, FunctionRole)],
        weights: &FunctionWeights,
    ) -> Result<Self, ProfileError> {
        let mut dominant = None;
        let mut auxiliary = None;
        let mut inferiors = Vec::new();
        let mut seen = Vec::new();

        for (kind, role) in ranked {
            if seen.contains(kind) {
                return Err(ProfileError::DuplicateFunction(*kind));
            }
            seen.push(*kind);
            match role {
                FunctionRole::Dominant => {
                    if dominant.replace(*kind).is_some() {
                        return Err(ProfileError::DuplicateRole(FunctionRole::Dominant));
                    }
                }
                FunctionRole::Auxiliary => {
                    if auxiliary.replace(*kind).is_some() {
                        return Err(ProfileError::DuplicateRole(FunctionRole::Auxiliary));
                    }
                }
                FunctionRole::Inferior => inferiors.push(*kind),
            }
        }

        let dominant = dominant.ok_or(ProfileError::MissingRole(FunctionRole::Dominant))?;
        let auxiliary = auxiliary.ok_or(ProfileError::MissingRole(FunctionRole::Auxiliary))?;

        let mut functions = vec![
            CognitiveFunction::new(
                dominant,
                FunctionRole::Dominant,
                weights.for_rank(FunctionRole::Dominant, 0),
            ),
            CognitiveFunction::new(
                auxiliary,
                FunctionRole::Auxiliary,
                weights.for_rank(FunctionRole::Auxiliary, 0),
            ),
        ];
        for (i, kind) in inferiors.into_iter().enumerate() {
            functions.push(CognitiveFunction::new(
                kind,
                FunctionRole::Inferior,
                weights.for_rank(FunctionRole::Inferior, i),
            ));
        }

        Ok(Self {
            type_code: None,
            functions,
        })
    }

    /// Functions in evaluation order.
    pub fn functions(&self) -> &[CognitiveFunction] {
        &self.functions
    }

    pub fn into_functions(self) -> Vec<CognitiveFunction> {
        self.functions
    }

    pub fn dominant(&self) -> &CognitiveFunction {
        &self.functions[0]
    }

    pub fn auxiliary(&self) -> &CognitiveFunction {
        &self.functions[1]
    }
}
