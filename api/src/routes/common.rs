use validator::ValidationErrors;

/// Flattens validator errors into one human-readable line, using each
/// rule's message where one is set.
pub fn format_validation_errors(errors: &ValidationErrors) -> String {
    let mut messages: Vec<String> = errors
        .field_errors()
        .iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| match &e.message {
                Some(msg) => msg.to_string(),
                None => format!("{field} is invalid"),
            })
        })
        .collect();

    // Nested structs (e.g. coordinates) report under their own key.
    for (field, kind) in errors.errors() {
        if let validator::ValidationErrorsKind::Struct(inner) = kind {
            messages.push(format!("{field}: {}", format_validation_errors(inner)));
        }
    }

    messages.sort();
    messages.join("; ")
}
