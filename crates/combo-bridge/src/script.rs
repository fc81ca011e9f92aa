//! Rhai runtime with the combo API registered.
//!
//! Scripts run under the [`ScriptLock`](crate::lock::ScriptLock). Functions
//! defined by earlier scripts stay available, so a `Fn("name")` handed to a
//! combo as its `callback` can be invoked later by
//! [`ScriptRuntime::run_callbacks`].

use std::{fmt, result::Result as StdResult};

use rhai::{AST, Dynamic, Engine, EvalAltResult, Map, NativeCallContext, Position};
use tracing::{debug, info, warn};

use crate::{Error, Result, error::excerpt_at, host::Host};

/// Result returned by registered native functions.
type NativeResult<T> = StdResult<T, Box<EvalAltResult>>;

/// Outcome of one callback drain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DrainReport {
    /// Callables that returned normally.
    pub ran: usize,
    /// Callables that raised an error.
    pub failed: usize,
}

/// A Rhai engine bound to one [`Host`].
pub struct ScriptRuntime {
    /// Engine with the bridge API and sandbox limits.
    engine: Engine,
    /// Functions accumulated from every script run so far.
    functions: AST,
    /// Facade the API functions operate on.
    host: Host,
}

impl fmt::Debug for ScriptRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptRuntime")
            .field("host", &self.host)
            .finish_non_exhaustive()
    }
}

impl ScriptRuntime {
    /// Create a runtime driving `host`.
    pub fn new(host: Host) -> Self {
        let mut engine = Engine::new();
        configure_engine(&mut engine);
        register_api(&mut engine, &host);
        Self {
            engine,
            functions: AST::empty(),
            host,
        }
    }

    /// The host this runtime drives.
    pub fn host(&self) -> &Host {
        &self.host
    }

    /// Compile and evaluate `source`, keeping its function definitions.
    pub fn run(&mut self, source: &str) -> Result<Dynamic> {
        let lock = self.host.lock().clone();
        let _guard = lock.acquire();
        let ast = self.engine.compile(source).map_err(|err| {
            let err: EvalAltResult = err.into();
            error_from_rhai(source, &err)
        })?;
        self.functions = self.functions.merge(&ast.clone_functions_only());
        self.engine
            .eval_ast::<Dynamic>(&self.functions.merge(&ast))
            .map_err(|err| error_from_rhai(source, &err))
    }

    /// Invoke every pending callback in enqueue order with
    /// `(sender, user_data)`. Failures are logged and counted.
    pub fn run_callbacks(&self) -> DrainReport {
        let mut report = DrainReport::default();
        for record in self.host.callbacks().drain() {
            let _guard = self.host.lock().acquire();
            let args = (record.sender.clone(), record.user_data.clone());
            match record
                .callback
                .fn_ptr()
                .call::<Dynamic>(&self.engine, &self.functions, args)
            {
                Ok(_) => report.ran += 1,
                Err(err) => {
                    warn!(
                        sender = %record.sender,
                        callback = record.callback.fn_name(),
                        error = %err,
                        "combo callback failed"
                    );
                    report.failed += 1;
                }
            }
        }
        if report.ran + report.failed > 0 {
            debug!(ran = report.ran, failed = report.failed, "callbacks drained");
        }
        report
    }
}

/// Route script output into tracing and apply sandbox limits.
fn configure_engine(engine: &mut Engine) {
    engine.on_print(|s| info!(target: "combo_bridge::script", "{}", s));
    engine.on_debug(|s, src, pos| {
        debug!(target: "combo_bridge::script", "{} @ {:?}:{:?}", s, src, pos);
    });

    engine.set_max_operations(200_000);
    engine.set_max_call_levels(64);
    engine.set_max_expr_depths(128, 64);
}

/// Register the combo API on `engine`.
fn register_api(engine: &mut Engine, host: &Host) {
    {
        let host = host.clone();
        engine.register_fn("add_combo", move |name: &str| -> bool {
            add_combo_or_false(&host, name, &Map::new())
        });
    }
    {
        let host = host.clone();
        engine.register_fn("add_combo", move |name: &str, config: Map| -> bool {
            add_combo_or_false(&host, name, &config)
        });
    }
    {
        let host = host.clone();
        engine.register_fn("add_container", move |name: &str| -> bool {
            match host.add_container(name) {
                Ok(()) => true,
                Err(err) => {
                    warn!(container = name, error = %err, "add_container failed");
                    false
                }
            }
        });
    }
    {
        let host = host.clone();
        engine.register_fn(
            "configure_item",
            move |ctx: NativeCallContext, name: &str, config: Map| -> NativeResult<()> {
                host.configure_item(name, &config)
                    .map_err(|err| boxed_bridge_error(&err, ctx.call_position()))
            },
        );
    }
    {
        let host = host.clone();
        engine.register_fn(
            "get_item_configuration",
            move |ctx: NativeCallContext, name: &str| -> NativeResult<Map> {
                host.get_item_configuration(name)
                    .map_err(|err| boxed_bridge_error(&err, ctx.call_position()))
            },
        );
    }
    {
        let host = host.clone();
        engine.register_fn(
            "get_value",
            move |ctx: NativeCallContext, name: &str| -> NativeResult<String> {
                host.get_value(name)
                    .map_err(|err| boxed_bridge_error(&err, ctx.call_position()))
            },
        );
    }
    {
        let host = host.clone();
        engine.register_fn(
            "set_value",
            move |ctx: NativeCallContext, name: &str, value: &str| -> NativeResult<()> {
                host.set_value(name, value)
                    .map_err(|err| boxed_bridge_error(&err, ctx.call_position()))
            },
        );
    }
    {
        let host = host.clone();
        engine.register_fn("does_item_exist", move |name: &str| -> bool {
            host.does_item_exist(name)
        });
    }
    {
        let host = host.clone();
        engine.register_fn("delete_item", move |name: &str| -> bool {
            host.delete_item(name)
        });
    }
}

/// Construction entry point with the boolean failure sentinel.
fn add_combo_or_false(host: &Host, name: &str, config: &Map) -> bool {
    match host.add_combo(name, config) {
        Ok(handle) => {
            debug!(item = handle.name(), "combo created from script");
            true
        }
        Err(err) => {
            warn!(item = name, error = %err, "add_combo failed");
            false
        }
    }
}

/// Tag raised by bridge functions so errors keep their call position.
#[derive(Debug, Clone)]
struct BridgeError {
    /// Human-readable message.
    message: String,
}

impl fmt::Display for BridgeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Wrap a bridge error as a Rhai runtime error at `pos`.
fn boxed_bridge_error(err: &Error, pos: Position) -> Box<EvalAltResult> {
    Box::new(EvalAltResult::ErrorRuntime(
        Dynamic::from(BridgeError {
            message: err.to_string(),
        }),
        pos,
    ))
}

/// Convert a Rhai error into [`Error::Script`] with a source excerpt.
fn error_from_rhai(source: &str, err: &EvalAltResult) -> Error {
    let (pos, message) = bridge_error_from_rhai(err).unwrap_or((err.position(), err.to_string()));
    let (line, col, excerpt) = match pos_to_line_col(pos) {
        Some((line, col)) => (Some(line), Some(col), Some(excerpt_at(source, line, col))),
        None => (None, None, None),
    };
    Error::Script {
        line,
        col,
        message,
        excerpt,
    }
}

/// Convert a Rhai `Position` into a 1-based (line, col) pair.
fn pos_to_line_col(pos: Position) -> Option<(usize, usize)> {
    let line = pos.line()?;
    let col = pos.position().unwrap_or(1);
    Some((line.max(1), col.max(1)))
}

/// Find a [`BridgeError`] raised anywhere in a Rhai error tree.
fn bridge_error_from_rhai(err: &EvalAltResult) -> Option<(Position, String)> {
    match err {
        EvalAltResult::ErrorRuntime(d, pos) if d.is::<BridgeError>() => {
            let be: BridgeError = d.clone_cast();
            Some((*pos, be.message))
        }
        EvalAltResult::ErrorInFunctionCall(_, _, inner, _)
        | EvalAltResult::ErrorInModule(_, inner, _) => bridge_error_from_rhai(inner),
        _ => None,
    }
}
