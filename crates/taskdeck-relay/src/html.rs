//! Pages shown in the login popup after the provider redirects back.

/// Seconds the popup stays open before closing or forwarding.
pub const CLOSE_DELAY_SECS: u32 = 3;
pub const FORWARD_DELAY_SECS: u32 = 2;

pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

/// A JS string literal that is safe to place inside a `<script>` block.
fn js_string(raw: &str) -> String {
    let quoted = serde_json::to_string(raw).unwrap_or_else(|_| "\"\"".to_string());
    quoted.replace("</", "<\\/")
}

fn page(title: &str, head: &str, body: &str, script: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{title}</title>\n{head}</head>\n\
         <body>\n<h1>{title}</h1>\n{body}\n<script>{script}</script>\n</body>\n</html>\n"
    )
}

fn close_script() -> String {
    format!("setTimeout(function () {{ window.close(); }}, {});", CLOSE_DELAY_SECS * 1000)
}

/// The provider reported an error instead of a code.
pub fn error_page(error: &str) -> String {
    page(
        "Authorization failed",
        "",
        &format!("<p>Error: {}</p>", escape_html(error)),
        &close_script(),
    )
}

pub fn missing_code_page() -> String {
    page(
        "Authorization failed",
        "",
        "<p>Authorization code missing.</p>",
        &close_script(),
    )
}

/// Hands `target` to the window that opened the popup. Without an opener
/// the popup navigates there itself, and the refresh tag covers disabled
/// scripts.
pub fn forward_page(target: &str) -> String {
    let head = format!(
        "<meta http-equiv=\"refresh\" content=\"{};url={}\">\n",
        FORWARD_DELAY_SECS + 1,
        escape_html(target)
    );
    let script = format!(
        "setTimeout(function () {{ var target = {}; \
         if (window.opener) {{ window.opener.location.href = target; window.close(); }} \
         else {{ window.location.replace(target); }} }}, {});",
        js_string(target),
        FORWARD_DELAY_SECS * 1000
    );
    page(
        "Authorization complete",
        &head,
        "<p>Returning to the application...</p>",
        &script,
    )
}
