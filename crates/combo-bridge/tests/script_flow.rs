use std::collections::{HashMap, HashSet};

use combo_bridge::{ComboFrame, ComboRows, ComboUi, Error, Host, ScriptRuntime};
use egui::Color32;
use logging::capture::LogBuffer;
use tracing_subscriber::prelude::*;

/// Toolkit fake: opens the named combos and clicks one row per queued click.
#[derive(Default)]
struct ScriptedUi {
    /// Combos whose popup is open.
    open: HashSet<String>,
    /// Pending click per combo, consumed when drawn.
    clicks: HashMap<String, String>,
    /// `(id, preview)` for every drawn header, in order.
    previews: Vec<(String, String)>,
    /// Rows drawn per combo on its last open frame.
    rows: HashMap<String, usize>,
}

impl ScriptedUi {
    fn click(&mut self, id: &str, row: &str) {
        self.open.insert(id.to_string());
        self.clicks.insert(id.to_string(), row.to_string());
    }

    fn last_preview(&self, id: &str) -> Option<&str> {
        self.previews
            .iter()
            .rev()
            .find(|(i, _)| i == id)
            .map(|(_, p)| p.as_str())
    }
}

struct ScriptedRows {
    click: Option<String>,
    drawn: usize,
}

impl ComboRows for ScriptedRows {
    fn selectable(&mut self, text: &str, _selected: bool) -> bool {
        self.drawn += 1;
        self.click.as_deref() == Some(text)
    }

    fn set_item_default_focus(&mut self) {}
}

impl ComboUi for ScriptedUi {
    fn text_disabled_color(&self) -> Color32 {
        Color32::GRAY
    }

    fn combo(&mut self, frame: &ComboFrame<'_>, rows: &mut dyn FnMut(&mut dyn ComboRows)) -> bool {
        self.previews
            .push((frame.id.to_string(), frame.preview.to_string()));
        let open = self.open.contains(frame.id);
        if open {
            let mut scripted = ScriptedRows {
                click: self.clicks.remove(frame.id),
                drawn: 0,
            };
            rows(&mut scripted);
            self.rows.insert(frame.id.to_string(), scripted.drawn);
        }
        open
    }
}

const RECORDER: &str = r#"
    add_combo("log");
    fn record(sender, data) {
        set_value("log", get_value("log") + sender + ":" + data + ";");
    }
"#;

#[test]
fn callbacks_run_in_click_order_with_sender_and_data() {
    let mut rt = ScriptRuntime::new(Host::new());
    rt.run(RECORDER).unwrap();
    rt.run(
        r#"
        add_combo("a", #{ items: ["x", "y"], callback: Fn("record"), callback_data: "one" });
        add_combo("b", #{ items: ["x", "y"], callback: Fn("record"), callback_data: 2 });
        "#,
    )
    .unwrap();

    let mut ui = ScriptedUi::default();
    ui.click("b", "y");
    rt.host().draw_all(&mut ui);
    ui.click("a", "x");
    rt.host().draw_all(&mut ui);

    // Nothing runs during rendering.
    assert_eq!(rt.host().get_value("log").unwrap(), "");
    assert_eq!(rt.host().callbacks().pending(), 2);

    let report = rt.run_callbacks();
    assert_eq!(report.ran, 2);
    assert_eq!(report.failed, 0);
    assert_eq!(rt.host().get_value("log").unwrap(), "b:2;a:one;");
    assert_eq!(rt.host().get_value("a").unwrap(), "x");
    assert_eq!(rt.host().get_value("b").unwrap(), "y");
}

#[test]
fn disabled_combo_exposes_no_rows_until_reenabled() {
    let mut rt = ScriptRuntime::new(Host::new());
    rt.run(RECORDER).unwrap();
    rt.run(
        r#"add_combo("c", #{ items: ["p", "q", "r"], default_value: "p", enabled: false, callback: Fn("record") });"#,
    )
    .unwrap();

    let mut ui = ScriptedUi::default();
    ui.click("c", "q");
    rt.host().draw_all(&mut ui);
    assert_eq!(ui.rows.get("c"), Some(&0));
    assert_eq!(rt.host().get_value("c").unwrap(), "p");
    assert_eq!(rt.run_callbacks().ran, 0);

    rt.run(r#"configure_item("c", #{ enabled: true });"#).unwrap();
    ui.click("c", "q");
    rt.host().draw_all(&mut ui);
    assert_eq!(ui.rows.get("c"), Some(&3));
    assert_eq!(rt.host().get_value("c").unwrap(), "q");
    assert_eq!(rt.run_callbacks().ran, 1);
}

#[test]
fn shared_source_is_visible_to_every_bound_combo() {
    let host = Host::new();
    host.store().set("shared_key", "z");
    let mut rt = ScriptRuntime::new(host);
    rt.run(
        r#"
        add_combo("left", #{ items: ["z", "w"], source: "shared_key" });
        add_combo("right", #{ items: ["z", "w"], source: "shared_key", default_value: "ignored" });
        "#,
    )
    .unwrap();

    let mut ui = ScriptedUi::default();
    rt.host().draw_all(&mut ui);
    assert_eq!(ui.last_preview("right"), Some("z"));

    ui.click("left", "w");
    rt.host().draw_all(&mut ui);
    rt.host().draw_all(&mut ui);
    assert_eq!(ui.last_preview("right"), Some("w"));
    assert_eq!(rt.host().store().get("shared_key").as_deref(), Some("w"));
}

#[test]
fn malformed_configuration_raises_and_keeps_state() {
    let mut rt = ScriptRuntime::new(Host::new());
    rt.run(r#"add_combo("c", #{ items: ["a", "b"], width: 80 });"#)
        .unwrap();

    let err = rt
        .run(r#"configure_item("c", #{ items: ["z"], width: "wide" });"#)
        .unwrap_err();
    match &err {
        Error::Script { message, .. } => assert!(message.contains("width"), "{message}"),
        other => panic!("unexpected error: {other:?}"),
    }

    let out = rt
        .run(r#"let cfg = get_item_configuration("c"); [cfg.items.len(), cfg.width]"#)
        .unwrap();
    let values: Vec<i64> = out
        .into_array()
        .unwrap()
        .into_iter()
        .map(|d| d.as_int().unwrap())
        .collect();
    assert_eq!(values, [2, 80]);
    assert!(!rt.host().lock().is_locked());
}

#[test]
fn registration_failures_return_false() {
    let mut rt = ScriptRuntime::new(Host::new());
    let out = rt
        .run(
            r#"
            add_container("panel");
            [
                add_combo("a", #{ parent: "panel" }),
                add_combo("b", #{ parent: "nowhere" }),
                add_combo("c", #{ before: "missing" }),
                add_combo("a"),
                does_item_exist("b"),
            ]
            "#,
        )
        .unwrap();
    let results: Vec<bool> = out
        .into_array()
        .unwrap()
        .into_iter()
        .map(|d| d.as_bool().unwrap())
        .collect();
    assert_eq!(results, [true, false, false, false, false]);
    assert_eq!(rt.host().item_names(), ["a"]);
}

#[test]
fn moving_a_combo_out_of_a_container_survives_its_deletion() {
    let mut rt = ScriptRuntime::new(Host::new());
    rt.run(
        r#"
        add_container("panel");
        add_combo("a");
        add_combo("b", #{ parent: "panel" });
        "#,
    )
    .unwrap();

    let err = rt
        .run(r#"configure_item("a", #{ parent: "nowhere", before: "ghost" });"#)
        .unwrap_err();
    assert!(err.to_string().contains("nowhere"), "{err}");

    let out = rt
        .run(
            r#"
            configure_item("b", #{ parent: "" });
            delete_item("panel");
            let cfg = get_item_configuration("a");
            [does_item_exist("b"), cfg.parent == "", cfg.before == ""]
            "#,
        )
        .unwrap();
    let results: Vec<bool> = out
        .into_array()
        .unwrap()
        .into_iter()
        .map(|d| d.as_bool().unwrap())
        .collect();
    assert_eq!(results, [true, true, true]);
}

#[test]
fn script_print_is_routed_to_tracing() {
    let buffer = LogBuffer::new();
    let subscriber = tracing_subscriber::registry().with(buffer.layer());
    tracing::subscriber::with_default(subscriber, || {
        let mut rt = ScriptRuntime::new(Host::new());
        rt.run(r#"print("hello from script");"#).unwrap();
    });

    let events = buffer.events();
    let printed = events
        .iter()
        .find(|e| e.message == "hello from script")
        .expect("print captured");
    assert_eq!(printed.target, "combo_bridge::script");
    assert_eq!(printed.level, "INFO");
}

#[test]
fn failed_callbacks_are_logged() {
    let buffer = LogBuffer::new();
    let subscriber = tracing_subscriber::registry().with(buffer.layer());
    tracing::subscriber::with_default(subscriber, || {
        let mut rt = ScriptRuntime::new(Host::new());
        rt.run(
            r#"
            fn broken(sender, data) { throw "bad pick"; }
            add_combo("c", #{ items: ["x"], callback: Fn("broken") });
            "#,
        )
        .unwrap();
        let mut ui = ScriptedUi::default();
        ui.click("c", "x");
        rt.host().draw_all(&mut ui);
        assert_eq!(rt.run_callbacks().failed, 1);
    });

    assert!(
        buffer
            .events()
            .iter()
            .any(|e| e.level == "WARN" && e.message.starts_with("combo callback failed"))
    );
}
