/// Convert the model's markdown-like completion into an HTML fragment.
///
/// A fixed sequence of literal substring replacements, applied once each,
/// left to right, non-recursively. The order is load-bearing: the `<li>`
/// rewrite in step 5 also touches the `</li><li>` pairs produced by step 3,
/// and mixed bullet/bold inputs can interact (see tests). Output must stay
/// byte-compatible with previously stored records, so the mapping is kept
/// exactly as-is, including the absence of HTML escaping.
pub fn format_response(raw: &str) -> String {
    let formatted = raw
        .replace("##", "<h6><br>")
        .replace("* ", "<li>")
        .replace(" - ", "</li><li>")
        .replace("**", "</h6>")
        .replace("<li>", "<li><p>");
    format!("<ul>{}</ul>", formatted)
}
