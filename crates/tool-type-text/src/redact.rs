/// Loggable stand-in for a field value: first character and length only.
pub fn preview(value: &str) -> String {
    let len = value.chars().count();
    match value.chars().next() {
        Some(first) if len > 1 => format!("{first}***({len})"),
        Some(_) => "*(1)".to_string(),
        None => "(0)".to_string(),
    }
}
