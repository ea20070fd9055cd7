/// Escapes `ident` for use as part of a CSS class name, following the CSSOM
/// `CSS.escape()` algorithm.
pub fn css_escape(ident: &str) -> String {
    let chars: Vec<char> = ident.chars().collect();
    let mut out = String::with_capacity(ident.len());
    for (i, &c) in chars.iter().enumerate() {
        let code = c as u32;
        match c {
            '\0' => out.push('\u{FFFD}'),
            '\u{1}'..='\u{1F}' | '\u{7F}' => push_code_point(&mut out, code),
            '0'..='9' if i == 0 => push_code_point(&mut out, code),
            '0'..='9' if i == 1 && chars[0] == '-' => push_code_point(&mut out, code),
            '-' if i == 0 && chars.len() == 1 => out.push_str("\\-"),
            _ if code >= 0x80 || c == '-' || c == '_' || c.is_ascii_alphanumeric() => out.push(c),
            _ => {
                out.push('\\');
                out.push(c);
            }
        }
    }
    out
}

fn push_code_point(out: &mut String, code: u32) {
    out.push_str(&format!("\\{code:x} "));
}
