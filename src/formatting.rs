// src/formatting.rs

/// Prepends the configured prefix, if any, to a subject line.
pub fn email_subject(prefix: Option<&str>, subject: &str) -> String {
    match prefix {
        Some(prefix) => format!("{prefix}{subject}"),
        None => subject.to_string(),
    }
}

/// The line identifying the sending project, appended to email bodies.
pub fn project_footer(name: Option<&str>, version: Option<&str>) -> String {
    match (name, version) {
        (Some(name), Some(version)) => format!("\n\n{name} v{version}"),
        (Some(name), None) => format!("\n\n{name}"),
        (None, _) => String::new(),
    }
}

/// Appends the project footer to a message body without touching its contents.
pub fn email_body(message: &str, name: Option<&str>, version: Option<&str>) -> String {
    format!("{message}{}", project_footer(name, version))
}

/// Subject line for reports about errors that escaped the program's entry point.
pub fn unhandled_subject(project_name: Option<&str>) -> String {
    match project_name {
        Some(name) => format!("{name}: Unhandled error"),
        None => "Unhandled error".to_string(),
    }
}
