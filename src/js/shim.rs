use boa_engine::{Context, JsError, Source};
use serde_json::json;
use url::Url;

use crate::config::location_host;
use crate::js::{JsEngineClient, JsEngineExtension};

/// Installs the browser globals a server-injected script expects to find:
/// `window`, `self`, `location`, a minimal `document` and animation-frame
/// timers.
pub struct EnvironmentExtension {
    location: serde_json::Value,
}

impl EnvironmentExtension {
    pub fn new(page_url: &Url) -> Self {
        Self {
            location: json!({
                "href": page_url.as_str(),
                "origin": page_url.origin().ascii_serialization(),
                "protocol": format!("{}:", page_url.scheme()),
                "host": location_host(page_url),
                "hostname": page_url.host_str().unwrap_or_default(),
                "port": page_url.port().map(|p| p.to_string()).unwrap_or_default(),
                "pathname": page_url.path(),
                "search": page_url.query().map(|q| format!("?{q}")).unwrap_or_default(),
                "hash": page_url.fragment().map(|f| format!("#{f}")).unwrap_or_default(),
            }),
        }
    }
}

impl JsEngineExtension for EnvironmentExtension {
    fn register(&self, context: &mut Context, _client: JsEngineClient) -> Result<(), JsError> {
        log::info!("Registering environment shims");
        register_environment_shims(context, &self.location)
    }
}

/// Register environment shims for browser compatibility.
fn register_environment_shims(context: &mut Context, location: &serde_json::Value) -> Result<(), JsError> {
    let shims = format!(
        r#"
(function() {{
    // 1. Global Object & Window
    globalThis.window = globalThis;
    globalThis.self = globalThis;

    // 2. Location of the page this client stands in for
    globalThis.location = {location};

    // 3. Document. There is no DOM, only the properties injected scripts
    // touch. Elements are inert records kept under `body.children`.
    function createElement(tagName) {{
        return {{
            tagName: String(tagName).toUpperCase(),
            children: [],
            attributes: {{}},
            style: {{}},
            textContent: '',
            innerHTML: '',
            setAttribute: function(name, value) {{ this.attributes[name] = String(value); }},
            getAttribute: function(name) {{
                return Object.prototype.hasOwnProperty.call(this.attributes, name) ? this.attributes[name] : null;
            }},
            appendChild: function(child) {{ this.children.push(child); return child; }},
            removeChild: function(child) {{
                var i = this.children.indexOf(child);
                if (i >= 0) {{ this.children.splice(i, 1); }}
                return child;
            }},
            addEventListener: function() {{}},
            removeEventListener: function() {{}}
        }};
    }}

    var body = createElement('body');
    globalThis.document = {{
        title: '',
        readyState: 'complete',
        location: globalThis.location,
        body: body,
        documentElement: createElement('html'),
        createElement: createElement,
        getElementById: function() {{ return null; }},
        querySelector: function() {{ return null; }},
        querySelectorAll: function() {{ return []; }},
        addEventListener: function() {{}},
        removeEventListener: function() {{}}
    }};
    globalThis.document.documentElement.appendChild(body);

    // 4. RequestAnimationFrame (simulated with setTimeout)
    globalThis.requestAnimationFrame = function(callback) {{
        return setTimeout(function() {{ callback(Date.now()); }}, 16);
    }};

    globalThis.cancelAnimationFrame = function(id) {{
        clearTimeout(id);
    }};

    // 5. Performance
    if (!globalThis.performance) {{
        globalThis.performance = {{
            now: function() {{ return Date.now(); }}
        }};
    }}
}})();
"#
    );

    context.eval(Source::from_bytes(shims.as_bytes()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::js::JsEngineBuilder;

    #[tokio::test]
    async fn location_mirrors_page_url() {
        let url = Url::parse("http://example.com:8080/app/index.html?x=1#top").unwrap();
        let engine = JsEngineBuilder::new()
            .with_extension(EnvironmentExtension::new(&url))
            .build()
            .unwrap();
        let js = engine.client();

        assert_eq!(js.evaluate("location.host").await.unwrap(), "example.com:8080");
        assert_eq!(js.evaluate("location.hostname").await.unwrap(), "example.com");
        assert_eq!(js.evaluate("location.port").await.unwrap(), "8080");
        assert_eq!(js.evaluate("location.protocol").await.unwrap(), "http:");
        assert_eq!(js.evaluate("location.pathname").await.unwrap(), "/app/index.html");
        assert_eq!(js.evaluate("location.search").await.unwrap(), "?x=1");
        assert_eq!(js.evaluate("location.hash").await.unwrap(), "#top");
        assert_eq!(js.evaluate("window === globalThis").await.unwrap(), "true");
    }

    #[tokio::test]
    async fn document_title_is_writable() {
        let url = Url::parse("http://localhost:8000/").unwrap();
        let engine = JsEngineBuilder::new()
            .with_extension(EnvironmentExtension::new(&url))
            .build()
            .unwrap();
        let js = engine.client();

        assert_eq!(js.evaluate("document.title").await.unwrap(), "");
        js.run("document.title = 'Where is Kazakhstan';").await.unwrap();
        assert_eq!(js.evaluate("document.title").await.unwrap(), "Where is Kazakhstan");

        js.run("var p = document.createElement('p'); p.textContent = 'hi'; document.body.appendChild(p);")
            .await
            .unwrap();
        assert_eq!(
            js.evaluate("document.body.children[0].tagName + ' ' + document.body.children[0].textContent")
                .await
                .unwrap(),
            "P hi"
        );
        assert_eq!(js.evaluate("document.location.host").await.unwrap(), "localhost:8000");
    }

    #[tokio::test]
    async fn default_port_is_omitted_from_host() {
        let url = Url::parse("http://example.com/").unwrap();
        let engine = JsEngineBuilder::new()
            .with_extension(EnvironmentExtension::new(&url))
            .build()
            .unwrap();

        assert_eq!(engine.client().evaluate("location.host").await.unwrap(), "example.com");
    }
}
