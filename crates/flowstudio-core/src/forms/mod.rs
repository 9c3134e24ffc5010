//! Forms - schema-driven node configuration forms.
//!
//! Every field declares an input type tag. The tag selects a strategy from a
//! fixed table that converts between the text a user edits and the field's
//! JSON value, and checks input as it is typed. The form aggregates values,
//! defers semantic validation to a caller-supplied [`Validator`], and gates
//! submission on the combined result.

mod caret;
mod field;
mod form;
mod strategy;
mod variable;

pub use caret::{Caret, CaretTracker, FormSet};
pub use field::{FieldOption, FieldSchema, FieldType};
pub use form::{
    default_values, json_values, FormErrors, FormState, RequiredFields, SubmitOutcome, Validator,
};
pub use strategy::{FieldCheck, FieldStrategy};
pub use variable::{is_partial_variable, is_variable};
