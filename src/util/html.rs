/// Render an ADO HTML field as plain text for the terminal.
pub fn to_plain_text(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut rest = html;

    while let Some(start) = rest.find('<') {
        out.push_str(&rest[..start]);
        let after = &rest[start..];
        let Some(end) = after.find('>') else {
            out.push_str(after);
            rest = "";
            break;
        };
        let tag = after[1..end].trim().to_ascii_lowercase();
        let name = tag
            .trim_start_matches('/')
            .split(|c: char| c.is_whitespace() || c == '/')
            .next()
            .unwrap_or("");
        match name {
            "br" | "p" | "div" | "ul" | "ol" | "tr" => push_break(&mut out),
            "li" if !tag.starts_with('/') => {
                push_break(&mut out);
                out.push_str("- ");
            }
            _ => {}
        }
        rest = &after[end + 1..];
    }
    out.push_str(rest);

    let decoded = decode_entities(&out);
    let lines: Vec<&str> = decoded
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();
    lines.join("\n")
}

fn push_break(out: &mut String) {
    if !out.ends_with('\n') {
        out.push('\n');
    }
}

fn decode_entities(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

/// Turn a list of criteria into the `<ul><li>` markup ADO renders.
pub fn list_to_html<S: AsRef<str>>(items: &[S]) -> String {
    let body: String = items
        .iter()
        .map(|i| format!("<li>{}</li>", i.as_ref()))
        .collect();
    format!("<ul>{body}</ul>")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_tags_and_breaks_paragraphs() {
        let html = "<p>As an owner,<br>I want a volume</p><p>so that logs persist</p>";
        assert_eq!(
            to_plain_text(html),
            "As an owner,\nI want a volume\nso that logs persist"
        );
    }

    #[test]
    fn renders_lists_as_dashes() {
        let html = "<ul><li>First</li><li>Second &amp; third</li></ul>";
        assert_eq!(to_plain_text(html), "- First\n- Second & third");
    }

    #[test]
    fn plain_text_passes_through() {
        assert_eq!(to_plain_text("no markup here"), "no markup here");
        assert_eq!(to_plain_text(""), "");
    }

    #[test]
    fn unterminated_tag_is_kept_verbatim() {
        assert_eq!(to_plain_text("a < b"), "a < b");
    }

    #[test]
    fn builds_html_lists() {
        assert_eq!(
            list_to_html(&["Volume created", "Notes updated"]),
            "<ul><li>Volume created</li><li>Notes updated</li></ul>"
        );
        let empty: [&str; 0] = [];
        assert_eq!(list_to_html(&empty), "<ul></ul>");
    }
}
