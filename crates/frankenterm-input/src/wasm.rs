#![forbid(unsafe_code)]

use js_sys::{Array, Function, JSON, Reflect};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{Event, HtmlTextAreaElement};

use crate::config::InputConfig;
use crate::event::{EventType, KeyEvent, KeyEventKind, Modifiers, RawInputEvent};
use crate::handler::InputHandler;
use crate::host::{CursorGeometry, InputSurface, LayoutBox, OVERLAY_PROPERTIES, OverlayStyle, Terminal};
use crate::resolver::KeyEscapeResult;

/// Textarea input coordinator exported to JS.
///
/// The host registers `keydown`, `keypress`, `compositionstart`,
/// `compositionupdate`, `compositionend` and `blur` listeners (capture phase)
/// on the textarea and forwards each event to [`handleEvent`]. The event's
/// `timeStamp` (or an explicit `nowMs`, same clock as `performance.now()`)
/// advances the input clock before routing, so commit windows start at the
/// event. Timers are host-driven: after every call, read [`nextDeadlineMs`]
/// and call [`tick`] with `performance.now()` once it passes.
///
/// The `terminal` object supplies the consumer callbacks:
/// `evaluateKeyEscapeSequence(ev)`, `scrollDisp(n)`, `cancel(ev, force)`,
/// `showCursor()`, `handler(key)`, `cursorGeometry()` and
/// `setCursorConcealed(bool)`. Missing callbacks are skipped.
///
/// [`handleEvent`]: FrankenTermInput::handle_event
/// [`nextDeadlineMs`]: FrankenTermInput::next_deadline_ms
/// [`tick`]: FrankenTermInput::tick
#[wasm_bindgen]
pub struct FrankenTermInput {
    handler: InputHandler<JsTerminal, TextareaSurface>,
}

#[wasm_bindgen]
impl FrankenTermInput {
    #[wasm_bindgen(constructor)]
    pub fn new(
        textarea: HtmlTextAreaElement,
        terminal: JsValue,
        options: Option<JsValue>,
    ) -> Result<FrankenTermInput, JsValue> {
        let config = match options {
            Some(options) if !options.is_null() && !options.is_undefined() => {
                let json = JSON::stringify(&options)?
                    .as_string()
                    .ok_or_else(|| JsValue::from_str("options must be a JSON object"))?;
                InputConfig::from_json_str(&json).map_err(to_js_error)?
            }
            _ => InputConfig::default(),
        };
        let handler = InputHandler::try_new(
            JsTerminal::new(terminal),
            TextareaSurface { textarea },
            config,
        )
        .map_err(to_js_error)?;
        Ok(Self { handler })
    }

    /// Route one DOM event. Returns the value the listener should return
    /// (`true`/`false`), or `undefined` when the event was not acted on.
    ///
    /// `now_ms` defaults to the event's `timeStamp`; without either the
    /// event is routed at the last ticked time.
    #[wasm_bindgen(js_name = handleEvent)]
    pub fn handle_event(
        &mut self,
        event: JsValue,
        now_ms: Option<f64>,
    ) -> Result<JsValue, JsValue> {
        let raw = parse_dom_event(&event)?;
        let now = now_ms
            .or_else(|| get_f64(&event, "timeStamp"))
            .map_or(self.handler.now(), duration_from_ms);
        self.handler.terminal_mut().current = Some(event);
        let outcome = self.handler.handle_at(&raw, now);
        self.handler.terminal_mut().current = None;
        Ok(outcome
            .listener_return()
            .map_or(JsValue::UNDEFINED, JsValue::from_bool))
    }

    /// Advance the input clock (milliseconds) and fire due commits.
    pub fn tick(&mut self, now_ms: f64) -> u32 {
        let committed = self.handler.tick(duration_from_ms(now_ms));
        u32::try_from(committed).unwrap_or(u32::MAX)
    }

    /// Deadline of the next armed commit timer, in milliseconds.
    #[wasm_bindgen(js_name = nextDeadlineMs)]
    pub fn next_deadline_ms(&self) -> Option<f64> {
        self.handler
            .next_deadline()
            .map(|deadline| deadline.as_secs_f64() * 1000.0)
    }

    /// Call after the terminal redraws so the composition overlay follows the cursor.
    pub fn refresh(&mut self) {
        self.handler.on_refresh();
    }

    #[wasm_bindgen(js_name = isComposing)]
    pub fn is_composing(&self) -> bool {
        self.handler.is_composing()
    }

    #[wasm_bindgen(js_name = pendingCommit)]
    pub fn pending_commit(&self) -> Option<String> {
        self.handler.pending_commit().map(str::to_owned)
    }

    /// Drain the decision trace as an array of JSONL lines.
    #[wasm_bindgen(js_name = drainTraceJsonl)]
    pub fn drain_trace_jsonl(&mut self, run_id: &str) -> Result<Array, JsValue> {
        let lines = self
            .handler
            .trace_mut()
            .drain_jsonl(run_id)
            .map_err(to_js_error)?;
        Ok(lines.iter().map(|line| JsValue::from_str(line)).collect())
    }
}

fn to_js_error(err: crate::error::InputError) -> JsValue {
    JsValue::from_str(&err.to_string())
}

fn duration_from_ms(ms: f64) -> core::time::Duration {
    if ms.is_finite() && ms > 0.0 {
        core::time::Duration::from_secs_f64(ms / 1000.0)
    } else {
        core::time::Duration::ZERO
    }
}

/// Terminal callbacks held by the JS host.
struct JsTerminal {
    target: JsValue,
    /// DOM event being dispatched, handed back to `evaluateKeyEscapeSequence`
    /// and `cancel`.
    current: Option<JsValue>,
}

impl JsTerminal {
    fn new(target: JsValue) -> Self {
        Self {
            target,
            current: None,
        }
    }

    fn method(&self, name: &str) -> Option<Function> {
        Reflect::get(&self.target, &JsValue::from_str(name))
            .ok()?
            .dyn_into::<Function>()
            .ok()
    }

    fn call0(&self, name: &str) -> JsValue {
        self.method(name)
            .and_then(|f| f.call0(&self.target).ok())
            .unwrap_or(JsValue::UNDEFINED)
    }

    fn call1(&self, name: &str, arg: &JsValue) -> JsValue {
        self.method(name)
            .and_then(|f| f.call1(&self.target, arg).ok())
            .unwrap_or(JsValue::UNDEFINED)
    }

    fn current_event(&self) -> JsValue {
        self.current.clone().unwrap_or(JsValue::UNDEFINED)
    }
}

impl Terminal for JsTerminal {
    fn evaluate_key_escape_sequence(&self, _event: &KeyEvent) -> KeyEscapeResult {
        let result = self.call1("evaluateKeyEscapeSequence", &self.current_event());
        if result.is_null() || result.is_undefined() {
            return KeyEscapeResult::default();
        }
        let scroll_disp = get_f64(&result, "scrollDisp")
            .filter(|delta| *delta != 0.0)
            .map(|delta| delta as i32);
        let cancel = get_truthy(&result, "cancel");
        let key = get_string_opt(&result, "key").filter(|key| !key.is_empty());
        KeyEscapeResult {
            scroll_disp,
            cancel,
            key,
        }
    }

    fn scroll_disp(&mut self, delta: i32) {
        self.call1("scrollDisp", &JsValue::from_f64(f64::from(delta)));
    }

    fn cancel(&mut self, _event: &KeyEvent, force: bool) -> bool {
        let event = self.current_event();
        if let Some(f) = self.method("cancel") {
            return f
                .call2(&self.target, &event, &JsValue::from_bool(force))
                .ok()
                .and_then(|v| v.as_bool())
                .unwrap_or(false);
        }
        if let Some(event) = event.dyn_ref::<Event>() {
            event.prevent_default();
            event.stop_propagation();
        }
        false
    }

    fn show_cursor(&mut self) {
        self.call0("showCursor");
    }

    fn handler(&mut self, key: &str) {
        self.call1("handler", &JsValue::from_str(key));
    }

    fn cursor_geometry(&self) -> Option<CursorGeometry> {
        let geometry = self.call0("cursorGeometry");
        if geometry.is_null() || geometry.is_undefined() {
            return None;
        }
        let cursor = Reflect::get(&geometry, &JsValue::from_str("cursor")).ok()?;
        let rows = Reflect::get(&geometry, &JsValue::from_str("rows")).ok()?;
        if cursor.is_null() || cursor.is_undefined() || rows.is_null() || rows.is_undefined() {
            return None;
        }
        Some(CursorGeometry {
            cursor: layout_box(&cursor),
            rows: layout_box(&rows),
        })
    }

    fn set_cursor_concealed(&mut self, concealed: bool) {
        self.call1("setCursorConcealed", &JsValue::from_bool(concealed));
    }
}

/// Reads `offsetTop`/`offsetLeft`/`offsetWidth`/`offsetHeight` from a DOM
/// element or a plain object.
fn layout_box(obj: &JsValue) -> LayoutBox {
    let px = |key| get_f64(obj, key).map_or(0, |v| v as i32);
    LayoutBox {
        offset_top: px("offsetTop"),
        offset_left: px("offsetLeft"),
        offset_width: px("offsetWidth"),
        offset_height: px("offsetHeight"),
    }
}

struct TextareaSurface {
    textarea: HtmlTextAreaElement,
}

impl InputSurface for TextareaSurface {
    fn buffered_text(&self) -> String {
        self.textarea.value()
    }

    fn clear_buffer(&mut self) {
        self.textarea.set_value("");
    }

    fn apply_overlay(&mut self, style: &OverlayStyle) {
        let css = self.textarea.style();
        for (name, value) in style.css_declarations() {
            let _ = css.set_property(name, &value);
        }
    }

    fn clear_overlay(&mut self) {
        let css = self.textarea.style();
        for name in OVERLAY_PROPERTIES {
            let _ = css.remove_property(name);
        }
    }
}

fn parse_dom_event(event: &JsValue) -> Result<RawInputEvent, JsValue> {
    let type_name = get_string_opt(event, "type")
        .ok_or_else(|| JsValue::from_str("event is missing a string `type`"))?;
    let event_type: EventType = type_name.parse().map_err(to_js_error)?;
    Ok(match event_type {
        EventType::KeyDown => RawInputEvent::Key(parse_key_event(event, KeyEventKind::Down)),
        EventType::KeyPress => RawInputEvent::Key(parse_key_event(event, KeyEventKind::Press)),
        EventType::CompositionStart => RawInputEvent::composition_start(),
        EventType::CompositionUpdate => {
            RawInputEvent::composition_update(&get_string_opt(event, "data").unwrap_or_default())
        }
        EventType::CompositionEnd => {
            RawInputEvent::composition_end(get_string_opt(event, "data").as_deref())
        }
        EventType::Blur => RawInputEvent::Blur,
    })
}

fn parse_key_event(event: &JsValue, kind: KeyEventKind) -> KeyEvent {
    KeyEvent {
        kind,
        mods: Modifiers::from_dom_flags(
            get_truthy(event, "shiftKey"),
            get_truthy(event, "altKey"),
            get_truthy(event, "ctrlKey"),
            get_truthy(event, "metaKey"),
        ),
        key_code: get_u32_opt(event, "keyCode"),
        char_code: get_u32_opt(event, "charCode"),
        which: get_u32_opt(event, "which"),
        key: get_string_opt(event, "key").map(Into::into),
        code: get_string_opt(event, "code").map(Into::into),
        repeat: get_truthy(event, "repeat"),
    }
}

fn get_field(obj: &JsValue, key: &str) -> Option<JsValue> {
    let v = Reflect::get(obj, &JsValue::from_str(key)).ok()?;
    if v.is_null() || v.is_undefined() {
        return None;
    }
    Some(v)
}

fn get_f64(obj: &JsValue, key: &str) -> Option<f64> {
    get_field(obj, key)?.as_f64().filter(|n| n.is_finite())
}

fn get_u32_opt(obj: &JsValue, key: &str) -> Option<u32> {
    let n = get_f64(obj, key)?;
    if n < 0.0 || n > f64::from(u32::MAX) || n.fract() != 0.0 {
        return None;
    }
    Some(n as u32)
}

fn get_string_opt(obj: &JsValue, key: &str) -> Option<String> {
    get_field(obj, key)?.as_string()
}

fn get_truthy(obj: &JsValue, key: &str) -> bool {
    get_field(obj, key).is_some_and(|v| v.is_truthy())
}
