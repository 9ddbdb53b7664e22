//! Destructive-operation gate

/// Whether a candidate may run.
///
/// `validation_ok && (!destructive || allow_destructive) && !clarify_required`
pub fn decide(
    validation_ok: bool,
    destructive: bool,
    allow_destructive: bool,
    clarify_required: bool,
) -> bool {
    validation_ok && (!destructive || allow_destructive) && !clarify_required
}

/// Two-level confidence: 0.9 for validated SQL that needs no clarification, else 0.4.
pub fn output_confidence(validation_ok: bool, clarify_required: bool) -> f32 {
    if validation_ok && !clarify_required {
        0.9
    } else {
        0.4
    }
}
