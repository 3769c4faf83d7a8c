use flowstack_kb::Snippet;

/// Substitution marker recognized in prompt templates.
pub const QUERY_PLACEHOLDER: &str = "{query}";

/// Build the final prompt from the query, retrieved context, and an optional
/// template.
///
/// Pure function of its inputs: no clock, no randomness, no I/O. Template
/// handling mirrors what pipeline authors expect from the canvas: a template
/// containing `{query}` has it substituted in place, a template without the
/// marker is treated as a system prefix above a `User:` line, and no template
/// passes the query through untouched. Retrieved snippets, when present, are
/// stacked under a `Context:` heading above the templated body.
pub fn compose_prompt(query: &str, context: &[Snippet], template: Option<&str>) -> String {
    let body = match template {
        Some(template) if template.contains(QUERY_PLACEHOLDER) => {
            template.replace(QUERY_PLACEHOLDER, query)
        }
        Some(template) => format!("{template}\n\nUser: {query}"),
        None => query.to_string(),
    };

    if context.is_empty() {
        return body;
    }

    let joined = context
        .iter()
        .map(|snippet| snippet.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");
    format!("Context:\n{joined}\n---\n{body}")
}
