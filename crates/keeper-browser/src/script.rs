//! JavaScript snippets evaluated in the page via `Runtime.evaluate`.
//!
//! Every user-supplied string is embedded as a JSON string literal, so
//! selectors containing quotes or brackets cannot break out of the expression.

/// Encode `value` as a JavaScript string literal.
pub fn quote(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "\"\"".to_string())
}

/// `true` when the first match exists, is rendered, and has a non-empty box.
pub fn is_visible(selector: &str) -> String {
    format!(
        r"(() => {{
            const el = document.querySelector({sel});
            if (!el) return false;
            const style = window.getComputedStyle(el);
            if (style.display === 'none' || style.visibility === 'hidden' || style.opacity === '0') {{
                return false;
            }}
            const rect = el.getBoundingClientRect();
            return rect.width > 0 && rect.height > 0;
        }})()",
        sel = quote(selector),
    )
}

/// `true` when the first match exists.
pub fn exists(selector: &str) -> String {
    format!("document.querySelector({}) !== null", quote(selector))
}

/// Script-dispatched click on the first match.
pub fn click(selector: &str) -> String {
    format!("document.querySelector({}).click()", quote(selector))
}

/// Focus the first match.
pub fn focus(selector: &str) -> String {
    format!("document.querySelector({}).focus()", quote(selector))
}

/// Attribute of the first match, or `null`.
pub fn attribute(selector: &str, name: &str) -> String {
    format!(
        "document.querySelector({sel}).getAttribute({attr})",
        sel = quote(selector),
        attr = quote(name),
    )
}

/// Attribute values of every match that carries the attribute.
pub fn attribute_all(selector: &str, name: &str) -> String {
    format!(
        r"Array.from(document.querySelectorAll({sel}))
            .map((el) => el.getAttribute({attr}))
            .filter((v) => v !== null)",
        sel = quote(selector),
        attr = quote(name),
    )
}

/// Absolute `href` values (resolved against the document base) of every match.
pub fn hrefs(selector: &str) -> String {
    format!(
        r"Array.from(document.querySelectorAll({sel}))
            .map((el) => el.href)
            .filter((v) => typeof v === 'string' && v.length > 0)",
        sel = quote(selector),
    )
}

/// `innerText` of every match, in document order.
pub fn text_blocks(selector: &str) -> String {
    format!(
        "Array.from(document.querySelectorAll({})).map((el) => el.innerText || '')",
        quote(selector),
    )
}

/// Remove every element matching any of `selectors`; evaluates to the count removed.
pub fn remove_all(selectors: &[String]) -> String {
    let list = serde_json::to_string(selectors).unwrap_or_else(|_| "[]".to_string());
    format!(
        r"(() => {{
            let removed = 0;
            for (const sel of {list}) {{
                try {{
                    document.querySelectorAll(sel).forEach((el) => {{ el.remove(); removed += 1; }});
                }} catch (e) {{}}
            }}
            return removed;
        }})()"
    )
}

/// Viewport rectangle of the first match as `{x, y, width, height}`, or `null`.
pub fn bounding_box(selector: &str) -> String {
    format!(
        r"(() => {{
            const el = document.querySelector({sel});
            if (!el) return null;
            el.scrollIntoView({{ block: 'center' }});
            const r = el.getBoundingClientRect();
            return {{ x: r.x, y: r.y, width: r.width, height: r.height }};
        }})()",
        sel = quote(selector),
    )
}

/// `document.readyState === 'complete'`.
pub const READY: &str = "document.readyState === 'complete'";
