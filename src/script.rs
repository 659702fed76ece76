//! Automation script generation for PhantomJS-compatible engines
//!
//! The script opens the page, strips classes that drive scroll and entrance
//! animations, optionally injects a body background, then waits
//! `timeout_ms` before rendering to the target file and exiting.

use crate::CaptureConfig;
use std::path::Path;
use url::Url;

/// Classes removed from every element after load so the frame is stable
pub const ANIMATION_CLASSES: [&str; 4] = ["section-vh", "anim-content", "animated", "animate"];

// Placeholders are filled in a single pass so the JS braces need no escaping
// and substituted values are never rescanned.
const SCRIPT_TEMPLATE: &str = r#"var page = require('webpage').create();
page.settings.javascriptEnabled = true;
page.settings.resourceTimeout = {{TIMEOUT}};
page.settings.loadImages = true;
page.settings.localToRemoteUrlAccessEnabled = true;
page.viewportSize = {{VIEWPORT}};
page.open({{URL}}, function () {
    page.evaluate(function (classes) {
        classes.forEach(function (name) {
            var nodes = document.querySelectorAll('.' + name);
            for (var i = 0; i < nodes.length; i++) {
                nodes[i].classList.remove(name);
            }
        });
{{BACKGROUND}}    }, {{CLASSES}});

    setTimeout(function () {
        page.render({{TARGET}});
        phantom.exit();
    }, {{TIMEOUT}});
});
"#;

const BACKGROUND_TEMPLATE: &str = r#"
        var style = document.createElement('style');
        style.setAttribute('type', 'text/css');
        style.appendChild(document.createTextNode({{CSS}}));
        document.head.insertBefore(style, document.head.firstChild);
"#;

/// Build the engine script for `config`, rendering `url` into `target`.
pub fn render_script(config: &CaptureConfig, url: &Url, target: &Path) -> String {
    let background = match config.background_color.as_deref() {
        Some(color) => {
            let css = js_string(&background_rule(color));
            fill(BACKGROUND_TEMPLATE, &[("CSS", css.as_str())])
        }
        None => String::new(),
    };
    let timeout = config.timeout_ms.to_string();
    let viewport = viewport_literal(config);
    let url = js_string(url.as_str());
    let classes = classes_literal();
    let target = js_string(&target.to_string_lossy());

    fill(
        SCRIPT_TEMPLATE,
        &[
            ("TIMEOUT", timeout.as_str()),
            ("VIEWPORT", viewport.as_str()),
            ("URL", url.as_str()),
            ("BACKGROUND", background.as_str()),
            ("CLASSES", classes.as_str()),
            ("TARGET", target.as_str()),
        ],
    )
}

/// CSS rule injected when a background color is configured
pub fn background_rule(color: &str) -> String {
    format!("body {{ background: {} }}", color)
}

fn viewport_literal(config: &CaptureConfig) -> String {
    let vp = config.viewport;
    if vp.is_full_page() {
        format!("{{ width: {} }}", vp.width)
    } else {
        format!("{{ width: {}, height: {} }}", vp.width, vp.height)
    }
}

fn classes_literal() -> String {
    serde_json::to_string(&ANIMATION_CLASSES).unwrap_or_else(|_| "[]".to_string())
}

fn fill(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len() + 256);
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            out.push_str(&rest[start..]);
            return out;
        };
        let key = &after[..end];
        match vars.iter().find(|(name, _)| *name == key) {
            Some((_, value)) => out.push_str(value),
            None => out.push_str(&rest[start..start + end + 4]),
        }
        rest = &after[end + 2..];
    }
    out.push_str(rest);
    out
}

// JSON string literals are valid JS string literals.
fn js_string(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}
