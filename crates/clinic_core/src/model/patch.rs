//! Tri-state field updates for partial writes.
//!
//! A nullable column can be left alone, overwritten, or cleared. `Option<T>`
//! alone cannot tell "omitted" from "set to null", so patches use `Patch<T>`
//! for nullable fields and `Option<T>` only for required ones.

use serde::{Deserialize, Serialize};

/// Update instruction for one nullable field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "op", content = "value")]
pub enum Patch<T> {
    /// Leave the stored value unchanged.
    Keep,
    /// Overwrite the stored value.
    Set(T),
    /// Overwrite the stored value with null.
    Clear,
}

impl<T> Default for Patch<T> {
    fn default() -> Self {
        Self::Keep
    }
}

impl<T> Patch<T> {
    /// The new value when this instruction overwrites with a value.
    pub fn as_set(&self) -> Option<&T> {
        match self {
            Self::Set(value) => Some(value),
            Self::Keep | Self::Clear => None,
        }
    }
}

impl<T: Clone> Patch<T> {
    /// Applies this instruction to a nullable field.
    pub fn apply_to(&self, current: &mut Option<T>) {
        match self {
            Self::Keep => {}
            Self::Set(value) => *current = Some(value.clone()),
            Self::Clear => *current = None,
        }
    }

    pub fn is_keep(&self) -> bool {
        matches!(self, Self::Keep)
    }
}

impl<T> From<Option<T>> for Patch<T> {
    /// `Some(v)` sets, `None` clears. Use `Patch::Keep` to leave a field alone.
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => Self::Set(value),
            None => Self::Clear,
        }
    }
}

/// Applies an optional replacement to a required field.
pub(crate) fn apply_required<T: Clone>(patch: &Option<T>, current: &mut T) {
    if let Some(value) = patch {
        *current = value.clone();
    }
}
