//! 注入页面的 JS 片段
//!
//! 所有片段都以 [`PRELUDE`] 开头，`__find` 按 `{"by": ..., "value": ...}` 解析元素。

/// 公共辅助函数
pub const PRELUDE: &str = r#"
const __find = (s) => {
    try {
        switch (s.by) {
            case 'xpath':
                return document.evaluate(s.value, document, null, XPathResult.FIRST_ORDERED_NODE_TYPE, null).singleNodeValue;
            case 'css':
                return document.querySelector(s.value);
            case 'id':
                return document.getElementById(s.value);
            case 'name':
                return document.getElementsByName(s.value)[0] || null;
        }
    } catch (e) {}
    return null;
};
const __visible = (el) => {
    if (!el || !el.getBoundingClientRect) return false;
    const r = el.getBoundingClientRect();
    const st = window.getComputedStyle(el);
    return r.width > 0 && r.height > 0 && st.visibility !== 'hidden' && st.display !== 'none';
};
const __rect = (el) => {
    const r = el.getBoundingClientRect();
    return { left: r.left, top: r.top, right: r.right, bottom: r.bottom };
};
const __text = (el) => ((el.innerText || el.textContent || '') + '').trim();
const __fire = (el) => {
    el.dispatchEvent(new Event('input', { bubbles: true }));
    el.dispatchEvent(new Event('change', { bubbles: true }));
};
const __setValue = (el, value) => {
    let proto = null;
    if (el instanceof HTMLInputElement) proto = HTMLInputElement.prototype;
    else if (el instanceof HTMLTextAreaElement) proto = HTMLTextAreaElement.prototype;
    else if (el instanceof HTMLSelectElement) proto = HTMLSelectElement.prototype;
    const d = proto ? Object.getOwnPropertyDescriptor(proto, 'value') : null;
    if (d && d.set) d.set.call(el, value); else el.value = value;
    __fire(el);
};
const __tag = (el, seq) => {
    let token = el.getAttribute('data-autofill-opt');
    if (!token) {
        token = 'o' + seq.next++;
        el.setAttribute('data-autofill-opt', token);
    }
    return token;
};
const __resetTags = () => {
    document.querySelectorAll('[data-autofill-opt]').forEach((e) => e.removeAttribute('data-autofill-opt'));
    return { next: 1 };
};
"#;

pub const IS_INTERACTABLE: &str = r#"
    if (!__visible(el) || el.disabled) return false;
    return window.getComputedStyle(el).pointerEvents !== 'none';
"#;

pub const READ_VALUE: &str = r#"
    const tag = el.tagName.toLowerCase();
    if (tag === 'select') {
        const o = el.options[el.selectedIndex];
        return o ? (o.text || '').trim() : '';
    }
    if (tag === 'input' || tag === 'textarea') return (el.value || '').trim();
    const inner = el.querySelector('input:not([type=hidden]), textarea, select');
    if (inner) {
        if (inner.tagName.toLowerCase() === 'select') {
            const o = inner.options[inner.selectedIndex];
            return o ? (o.text || '').trim() : '';
        }
        return (inner.value || '').trim();
    }
    return (el.getAttribute('value') || '').trim();
"#;

pub const NATIVE_OPTIONS: &str = r#"
    if (el.tagName.toLowerCase() !== 'select') return [];
    return Array.from(el.options).map((o) => (o.text || '').trim());
"#;

pub const IS_CHECKED: &str = r#"
    const aria = el.getAttribute('aria-checked');
    if (aria !== null) return aria === 'true';
    if (el instanceof HTMLInputElement) return !!el.checked;
    if (el instanceof HTMLLabelElement && el.control) return !!el.control.checked;
    const inner = el.querySelector('input[type=checkbox], input[type=radio]');
    return inner ? !!inner.checked : false;
"#;

/// 可见下拉浮层及其中的选项
///
/// 浮层候选依次为 listbox / menu 角色、带 menu|list|options 类的 ul、
/// 带 menu|listbox|options|dropdown|select 类的 div。
pub const OVERLAY_PANELS: &str = r#"
(() => {
    PRELUDE_HERE
    const seq = __resetTags();
    const xps = [
        "//*[@role='listbox' and not(@aria-hidden='true')]",
        "//*[@role='menu' and not(@aria-hidden='true')]",
        "//ul[contains(@class,'menu') or contains(@class,'list') or contains(@class,'options')]",
        "//div[contains(@class,'menu') or contains(@class,'listbox') or contains(@class,'options') or contains(@class,'dropdown') or contains(@class,'select')]",
    ];
    const seen = new Set();
    const out = [];
    for (const xp of xps) {
        let snap;
        try {
            snap = document.evaluate(xp, document, null, XPathResult.ORDERED_NODE_SNAPSHOT_TYPE, null);
        } catch (e) { continue; }
        for (let i = 0; i < snap.snapshotLength; i++) {
            const panel = snap.snapshotItem(i);
            if (seen.has(panel) || !__visible(panel)) continue;
            seen.add(panel);
            const options = [];
            for (const tag of ['li', 'div', 'span', 'option']) {
                panel.querySelectorAll(tag).forEach((el) => {
                    if (tag !== 'option' && !__visible(el)) return;
                    const text = __text(el);
                    if (!text || text.length > 200) return;
                    options.push({ token: __tag(el, seq), text });
                });
            }
            out.push({ rect: __rect(panel), options });
        }
    }
    return out;
})()
"#;

/// 全页面范围内可见的选项类元素
pub const PAGE_OPTIONS: &str = r#"
(() => {
    PRELUDE_HERE
    const seq = __resetTags();
    const out = [];
    for (const tag of ['li', 'div', 'span', 'option']) {
        document.querySelectorAll(tag).forEach((el) => {
            if (!__visible(el)) return;
            const text = __text(el);
            if (!text || text.length > 200) return;
            out.push({ token: __tag(el, seq), text });
        });
    }
    return out;
})()
"#;

/// 按标签文本勾选复选框；`SCOPE_HERE` 为 null 时搜索整个页面
pub const CHECK_BY_LABEL: &str = r#"
(() => {
    PRELUDE_HERE
    const scope = SCOPE_HERE;
    const root = scope ? __find(scope) : document.body;
    if (!root) return false;
    const needle = LABEL_HERE.toLowerCase();
    const matches = Array.from(root.querySelectorAll('*'))
        .filter((e) => __text(e).toLowerCase().includes(needle));
    const leaves = matches.filter(
        (e) => !Array.from(e.children).some((c) => __text(c).toLowerCase().includes(needle))
    );
    for (const el of leaves) {
        const aria = el.closest('[role=checkbox]');
        if (aria) {
            if (aria.getAttribute('aria-checked') !== 'true') aria.click();
            return true;
        }
        const label = el.closest('label');
        const control = label && label.control && label.control.type === 'checkbox'
            ? label.control : null;
        const parent = el.parentElement;
        const input = control
            || (label ? label.querySelector('input[type=checkbox]') : null)
            || (parent ? parent.querySelector('input[type=checkbox]') : null);
        if (input) {
            if (!input.checked) input.click();
            return !!input.checked;
        }
        // 读不到勾选状态时才直接点击文字
        try {
            el.click();
            return true;
        } catch (e) {}
    }
    return false;
})()
"#;

/// 新文档加载前注入，隐藏自动化痕迹
pub const STEALTH: &str = r#"
Object.defineProperty(navigator, 'webdriver', { get: () => undefined });
window.chrome = window.chrome || { runtime: {} };
Object.defineProperty(navigator, 'languages', { get: () => ['en-IN', 'en-US', 'en'] });
"#;

/// 把 [`PRELUDE`] 填进整段脚本
pub fn with_prelude(script: &str) -> String {
    script.replace("PRELUDE_HERE", PRELUDE)
}

/// 在单个元素上执行脚本体；找不到元素返回 null
pub fn on_element(selector_json: &str, body: &str) -> String {
    format!(
        "(() => {{ {} const el = __find({}); if (!el) return null; try {{ {} }} catch (e) {{ return null; }} }})()",
        PRELUDE, selector_json, body
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_check_reads_checkbox_state_before_clicking_text() {
        let script = with_prelude(CHECK_BY_LABEL);
        assert!(!script.contains("PRELUDE_HERE"));

        let control = script.find("label.control").unwrap();
        let guarded = script.find("if (!input.checked) input.click();").unwrap();
        let text_click = script.find("el.click();").unwrap();
        assert!(control < guarded);
        assert!(guarded < text_click);
    }
}
