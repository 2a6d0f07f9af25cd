use boa_engine::{Context, JsError, JsNativeError, JsResult, JsString, JsValue, NativeFunction, Source};

use crate::channel::Outbox;
use crate::js::{JsEngineClient, JsEngineExtension};

/// Exposes `send_msg(msg)` to page scripts.
///
/// The message is JSON-stringified in JS and queued on whatever channel is
/// live at call time. Values JSON cannot represent (`undefined`, functions)
/// go out as their `String()` form, so `send_msg(undefined)` sends
/// `undefined`. Throws when no channel is open.
pub struct SendMsgExtension {
    outbox: Outbox,
}

impl SendMsgExtension {
    pub fn new(outbox: Outbox) -> Self {
        Self { outbox }
    }
}

impl JsEngineExtension for SendMsgExtension {
    fn register(&self, context: &mut Context, _client: JsEngineClient) -> Result<(), JsError> {
        // __wszero_send(text: string) -> void
        context.register_global_callable(
            JsString::from("__wszero_send"),
            1,
            NativeFunction::from_copy_closure_with_captures(
                move |_this: &JsValue, args: &[JsValue], outbox: &Outbox, _ctx: &mut Context| {
                    send_fn(args, outbox)
                },
                self.outbox.clone(),
            ),
        )?;

        let shim = r#"
globalThis.send_msg = function(msg) {
    __wszero_send(String(JSON.stringify(msg)));
};
"#;
        context.eval(Source::from_bytes(shim.as_bytes()))?;

        log::info!("Registered send_msg");
        Ok(())
    }
}

fn send_fn(args: &[JsValue], outbox: &Outbox) -> JsResult<JsValue> {
    let text = args
        .first()
        .and_then(|v| v.as_string())
        .map(|s| s.to_std_string_escaped())
        .unwrap_or_else(|| "undefined".to_string());

    log::debug!("[send_msg] {} bytes", text.len());
    outbox
        .send_text(text)
        .map_err(|e| JsNativeError::typ().with_message(e.to_string()))?;
    Ok(JsValue::undefined())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{ChannelHandle, ReadyState};
    use crate::js::JsEngineBuilder;

    #[tokio::test]
    async fn send_msg_stringifies_onto_live_channel() {
        let outbox = Outbox::new();
        let engine = JsEngineBuilder::new()
            .with_extension(SendMsgExtension::new(outbox.clone()))
            .build()
            .unwrap();
        let js = engine.client();

        let (handle, mut rx) = ChannelHandle::new(1);
        handle.set_ready_state(ReadyState::Open);
        outbox.replace(handle);

        js.evaluate("send_msg({op: 'name', name: 'ada'})").await.unwrap();
        let sent: serde_json::Value = serde_json::from_str(&rx.recv().await.unwrap()).unwrap();
        assert_eq!(sent, serde_json::json!({"op": "name", "name": "ada"}));
    }

    #[tokio::test]
    async fn unserializable_values_send_their_string_form() {
        let outbox = Outbox::new();
        let engine = JsEngineBuilder::new()
            .with_extension(SendMsgExtension::new(outbox.clone()))
            .build()
            .unwrap();
        let js = engine.client();

        let (handle, mut rx) = ChannelHandle::new(1);
        handle.set_ready_state(ReadyState::Open);
        outbox.replace(handle);

        js.run("send_msg(undefined); send_msg(function() {}); send_msg(null);")
            .await
            .unwrap();
        assert_eq!(rx.recv().await.unwrap(), "undefined");
        assert_eq!(rx.recv().await.unwrap(), "undefined");
        assert_eq!(rx.recv().await.unwrap(), "null");
    }

    #[tokio::test]
    async fn send_msg_throws_without_a_channel() {
        let engine = JsEngineBuilder::new()
            .with_extension(SendMsgExtension::new(Outbox::new()))
            .build()
            .unwrap();
        let js = engine.client();

        let caught = js
            .evaluate("try { send_msg({a: 1}); 'sent' } catch (e) { 'threw' }")
            .await
            .unwrap();
        assert_eq!(caught, "threw");
    }
}
