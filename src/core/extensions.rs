/// Extension mentions the web service understands inline (e.g. `@gmail`).
const KNOWN_EXTENSIONS: &[&str] = &[
    "gmail",
    "drive",
    "docs",
    "youtube",
    "maps",
    "flights",
    "hotels",
    "workspace",
];

/// First `@extension` token in `text`, lowercased and without the `@`.
///
/// Display-only: the prompt is sent unchanged.
pub fn detect_extension(text: &str) -> Option<String> {
    text.split_whitespace().find_map(|token| {
        let name = token.strip_prefix('@')?;
        let name = name.trim_end_matches(|c: char| !c.is_ascii_alphanumeric());
        let lowered = name.to_ascii_lowercase();
        KNOWN_EXTENSIONS
            .contains(&lowered.as_str())
            .then_some(lowered)
    })
}
