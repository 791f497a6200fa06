//! Builders for the injected JavaScript every element operation runs through.
//!
//! Scripts are IIFEs that return a plain JSON object; the Rust side inspects
//! the object rather than parsing console output. A prelude establishes
//! `__doc` (the active document, honoring the thread's frame context),
//! `__win` and a `__vis` visibility helper, so component bodies only describe
//! the operation itself.

use crate::types::{Locator, LocatorKind};

/// Escape a string for embedding inside a single-quoted JS literal.
pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            _ => out.push(c),
        }
    }
    out
}

/// JS expression evaluating to an array of nodes matching `locator`, in
/// document order, resolved against the document variable `__doc`.
pub fn find_all(locator: &Locator) -> String {
    find_all_in(locator, "__doc")
}

/// Same as [`find_all`] but resolved against an arbitrary context node
/// expression (an element or document variable).
pub fn find_all_in(locator: &Locator, context: &str) -> String {
    let expr = escape(&locator.expression);
    match locator.kind() {
        // Ordered snapshot keeps "all matches" stable in document order.
        LocatorKind::XPath => format!(
            "(function(c){{var r=[];var d=c.ownerDocument||c;\
             var s=d.evaluate('{expr}',c,null,XPathResult.ORDERED_NODE_SNAPSHOT_TYPE,null);\
             for(var i=0;i<s.snapshotLength;i++){{r.push(s.snapshotItem(i));}}return r;}})({context})"
        ),
        LocatorKind::Css => {
            format!("Array.prototype.slice.call({context}.querySelectorAll('{expr}'))")
        }
    }
}

/// Wrap an operation body in the standard prelude. `frame` roots `__doc` at
/// that frame's document; the body must `return` an object.
pub fn script(frame: Option<&Locator>, body: &str) -> String {
    let frame_hook = match frame {
        Some(locator) => {
            let finder = find_all_in(locator, "document");
            format!(
                "var __frames = {finder};\
                 if (!__frames.length) {{ return {{ ok: false, error: 'frame-not-found' }}; }}\
                 var __fdoc = __frames[0].contentDocument;\
                 if (!__fdoc) {{ return {{ ok: false, error: 'frame-not-reachable' }}; }}\
                 __doc = __fdoc;"
            )
        }
        None => String::new(),
    };
    format!(
        "(function() {{\
         var __doc = document;\
         {frame_hook}\
         var __win = __doc.defaultView || window;\
         var __vis = function(el) {{\
           if (!el || !el.getClientRects) {{ return false; }}\
           if (!el.getClientRects().length) {{ return false; }}\
           var st = __win.getComputedStyle(el);\
           return st.visibility !== 'hidden' && st.display !== 'none';\
         }};\
         {body}\
         }})()"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_quotes_and_backslashes() {
        assert_eq!(escape("a'b"), "a\\'b");
        assert_eq!(escape("a\\b"), "a\\\\b");
        assert_eq!(escape("line\nbreak"), "line\\nbreak");
    }

    #[test]
    fn css_finder_uses_query_selector_all() {
        let snippet = find_all(&Locator::new("#rail .card"));
        assert!(snippet.contains("__doc.querySelectorAll('#rail .card')"));
    }

    #[test]
    fn xpath_finder_uses_ordered_snapshot() {
        let snippet = find_all(&Locator::new("//a[@href]"));
        assert!(snippet.contains("ORDERED_NODE_SNAPSHOT_TYPE"));
        assert!(snippet.contains("evaluate('//a[@href]'"));
    }

    #[test]
    fn frame_prelude_roots_document_at_frame() {
        let s = script(Some(&Locator::new("#payments-frame")), "return { ok: true };");
        assert!(s.contains("contentDocument"));
        assert!(s.contains("frame-not-reachable"));
        assert!(s.contains("querySelectorAll('#payments-frame')"));
    }

    #[test]
    fn plain_prelude_has_no_frame_hook() {
        let s = script(None, "return { ok: true };");
        assert!(!s.contains("contentDocument"));
        assert!(s.contains("var __vis"));
    }

    #[test]
    fn xpath_expression_quotes_are_escaped() {
        let snippet = find_all(&Locator::new("//button[text()='Login']"));
        assert!(snippet.contains("text()=\\'Login\\'"));
    }
}
