//! 注入页面的 JavaScript 片段
//!
//! 所有脚本都返回 `{ ok, ... }` 形式的物件，由 `ChromeSession` 反序列化。
//! 元素以 `data-autofill-ref` 属性标记，之后的操作依该标记重新取得元素，
//! 因此顶层文件与同源 iframe 中的元素都能操作。

use serde::Deserialize;

use crate::session::Locator;

pub const REF_ATTRIBUTE: &str = "data-autofill-ref";

/// 列出顶层文件与所有可存取的 (i)frame 文件
const DOCUMENTS_JS: &str = r#"
    const __docs = () => {
        const out = [document];
        for (let i = 0; i < out.length; i++) {
            for (const f of out[i].querySelectorAll('iframe,frame')) {
                try { if (f.contentDocument) out.push(f.contentDocument); } catch (e) {}
            }
        }
        return out;
    };
"#;

/// `find` 脚本的回传
#[derive(Debug, Deserialize)]
pub struct FindScan {
    /// found / hidden / missing / invalid
    pub status: String,
    pub reference: Option<String>,
    #[serde(default)]
    pub matches: usize,
    pub document_url: Option<String>,
    pub error: Option<String>,
}

/// 一般操作脚本的回传
#[derive(Debug, Deserialize)]
pub struct ActionResult {
    pub ok: bool,
    /// stale / option_missing / hidden
    pub error: Option<String>,
    pub value: Option<String>,
    #[serde(default)]
    pub options: Vec<String>,
}

fn js_string(value: &str) -> String {
    // serde_json 的字串输出即是合法的 JS 字串字面值
    serde_json::to_string(value).unwrap_or_else(|_| "\"\"".to_string())
}

pub fn find(locator: &Locator) -> String {
    let (kind, value) = match locator {
        Locator::Css(s) => ("css", s.as_str()),
        Locator::XPath(s) => ("xpath", s.as_str()),
        Locator::LabelText(s) => ("label", s.as_str()),
    };
    format!(
        r#"
        (() => {{
            {docs}
            const kind = {kind};
            const value = {value};
            const usable = (el) => el.getClientRects().length > 0 && !el.disabled;
            const query = (doc) => {{
                if (kind === 'css') return Array.from(doc.querySelectorAll(value));
                if (kind === 'xpath') {{
                    const r = doc.evaluate(value, doc, null, XPathResult.ORDERED_NODE_SNAPSHOT_TYPE, null);
                    const out = [];
                    for (let i = 0; i < r.snapshotLength; i++) out.push(r.snapshotItem(i));
                    return out;
                }}
                const out = [];
                for (const label of doc.querySelectorAll('label')) {{
                    if (!label.textContent.includes(value)) continue;
                    const target = label.control
                        || (label.htmlFor ? doc.getElementById(label.htmlFor) : null)
                        || label.querySelector('input,select,textarea');
                    if (target) out.push(target);
                }}
                return out;
            }};
            try {{
                let hidden = 0;
                for (const doc of __docs()) {{
                    const all = query(doc);
                    const ok = all.filter(usable);
                    hidden += all.length - ok.length;
                    if (ok.length === 0) continue;
                    const el = ok[0];
                    let id = el.getAttribute('{attr}');
                    if (!id) {{
                        window.__autofillSeq = (window.__autofillSeq || 0) + 1;
                        id = 'r' + Date.now().toString(36) + '-' + window.__autofillSeq;
                        el.setAttribute('{attr}', id);
                    }}
                    return {{ status: 'found', reference: id, matches: ok.length, document_url: doc.URL }};
                }}
                return {{ status: hidden > 0 ? 'hidden' : 'missing', matches: 0 }};
            }} catch (e) {{
                return {{ status: 'invalid', matches: 0, error: String(e) }};
            }}
        }})()
        "#,
        docs = DOCUMENTS_JS,
        kind = js_string(kind),
        value = js_string(value),
        attr = REF_ATTRIBUTE,
    )
}

/// 以标记取得元素后执行 `body`；`body` 中可使用 `el`
fn with_element(reference: &str, body: &str) -> String {
    format!(
        r#"
        (() => {{
            {docs}
            let el = null;
            for (const doc of __docs()) {{
                el = doc.querySelector('[{attr}="' + {reference} + '"]');
                if (el) break;
            }}
            if (!el) return {{ ok: false, error: 'stale' }};
            {body}
        }})()
        "#,
        docs = DOCUMENTS_JS,
        attr = REF_ATTRIBUTE,
        reference = js_string(reference),
        body = body,
    )
}

pub fn set_value(reference: &str, text: &str) -> String {
    let body = format!(
        r#"
            const text = {text};
            el.scrollIntoView({{ block: 'center' }});
            if (el.tagName === 'SELECT') {{
                const options = Array.from(el.options).map(o => o.value);
                if (!options.includes(text)) return {{ ok: false, error: 'option_missing', options }};
                el.value = text;
            }} else {{
                const proto = el.tagName === 'TEXTAREA'
                    ? HTMLTextAreaElement.prototype
                    : HTMLInputElement.prototype;
                const setter = Object.getOwnPropertyDescriptor(proto, 'value').set;
                el.focus();
                setter.call(el, '');
                setter.call(el, text);
            }}
            el.dispatchEvent(new Event('input', {{ bubbles: true }}));
            el.dispatchEvent(new Event('change', {{ bubbles: true }}));
            return {{ ok: true, value: el.value }};
        "#,
        text = js_string(text),
    );
    with_element(reference, &body)
}

pub fn read_value(reference: &str) -> String {
    with_element(reference, "return { ok: true, value: String(el.value ?? '') };")
}

pub fn click(reference: &str) -> String {
    with_element(
        reference,
        r#"
            if (el.getClientRects().length === 0 || el.disabled) return { ok: false, error: 'hidden' };
            el.scrollIntoView({ block: 'center' });
            el.click();
            return { ok: true };
        "#,
    )
}

pub fn press_enter(reference: &str) -> String {
    with_element(
        reference,
        r#"
            el.focus();
            for (const type of ['keydown', 'keypress', 'keyup']) {
                el.dispatchEvent(new KeyboardEvent(type, { key: 'Enter', code: 'Enter', keyCode: 13, which: 13, bubbles: true }));
            }
            if (el.form) {
                if (typeof el.form.requestSubmit === 'function') el.form.requestSubmit();
                else el.form.submit();
            }
            return { ok: true };
        "#,
    )
}

pub fn page_text() -> String {
    format!(
        r#"
        (() => {{
            {docs}
            return {{ ok: true, value: __docs().map(d => d.body ? d.body.innerText : '').join('\n') }};
        }})()
        "#,
        docs = DOCUMENTS_JS,
    )
}

pub const CURRENT_URL: &str = "(() => ({ ok: true, value: window.location.href }))()";

pub const READY_STATE: &str = "(() => ({ ok: true, value: document.readyState }))()";
