//! Calculator JSON-RPC Example
//!
//! Registers a few calculator procedures and feeds single, named, batch and
//! malformed requests through the server, printing each wire response.
//!
//! Run with `RUST_LOG=debug cargo run --example calculator` to see dispatch logs.

use std::sync::Mutex;

use json_rpc_procedure_server::prelude::*;
use serde_json::{Value, json};
use tracing_subscriber::EnvFilter;

/// Accumulator kept across calls, exposed as an object target
#[derive(Default)]
struct Memory {
    value: Mutex<f64>,
    last_operation: Mutex<String>,
}

impl RpcObject for Memory {
    fn signature(&self, method: &str) -> Option<Signature> {
        match method {
            "before" => Some(Signature::new().required("procedure")),
            "memoryAdd" => Some(Signature::new().required("amount")),
            "memoryRecall" => Some(Signature::new()),
            _ => None,
        }
    }

    fn call(&self, method: &str, args: Arguments) -> RpcResult<Value> {
        match method {
            "before" => {
                *self.last_operation.lock().unwrap() = args.get("procedure")?;
                Ok(Value::Null)
            }
            "memoryAdd" => {
                let mut value = self.value.lock().unwrap();
                *value += args.get::<f64>("amount")?;
                Ok(json!(*value))
            }
            "memoryRecall" => Ok(json!({
                "value": *self.value.lock().unwrap(),
                "last_operation": *self.last_operation.lock().unwrap(),
            })),
            _ => Err(RpcError::ProcedureNotFound(method.to_string())),
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("Calculator JSON-RPC Server Example");
    println!("==================================");

    let mut server = Server::with_config(ServerConfig::default().with_before_hook("before"));
    let registry = server.registry_mut();

    registry.register_fn(
        "add",
        Signature::new().required("a").required("b"),
        |args| Ok(args.get::<f64>("a")? + args.get::<f64>("b")?),
    );
    registry.register_fn(
        "subtract",
        Signature::new().required("a").required("b"),
        |args| Ok(args.get::<f64>("a")? - args.get::<f64>("b")?),
    );
    registry.register_fn(
        "divide",
        Signature::new().required("a").optional("b", 1),
        |args| {
            let b = args.get::<f64>("b")?;
            if b == 0.0 {
                return Err(RpcError::application_with_data(
                    -32001,
                    "Division by zero",
                    json!({"dividend": args.get::<f64>("a")?}),
                ));
            }
            Ok(args.get::<f64>("a")? / b)
        },
    );
    registry.register_object(std::sync::Arc::new(Memory::default()));

    let requests = [
        r#"{"jsonrpc": "2.0", "method": "add", "params": [5, 3], "id": 1}"#,
        r#"{"jsonrpc": "2.0", "method": "subtract", "params": {"b": 4, "a": 10}, "id": 2}"#,
        r#"{"jsonrpc": "2.0", "method": "divide", "params": [1, 0], "id": 3}"#,
        r#"{"jsonrpc": "2.0", "method": "multiply", "params": [2, 3], "id": 4}"#,
        r#"{"jsonrpc": "2.0", "method": "add", "params": [1, 2, 3], "id": 5}"#,
        r#"[{"jsonrpc": "2.0", "method": "memoryAdd", "params": [2.5]},
            {"jsonrpc": "2.0", "method": "memoryAdd", "params": {"amount": 4}, "id": 6},
            {"jsonrpc": "2.0", "method": "memoryRecall", "id": 7}]"#,
        r#"[{"jsonrpc": "2.0", "method": "memoryAdd", "params": [1]}]"#,
        r#"{"jsonrpc": "2.0", "method": "add", "params": "#,
    ];

    for (i, request) in requests.iter().enumerate() {
        println!("\n--- Request {} ---", i + 1);
        println!("{}", request);

        let response = server.execute(request);
        if response.is_empty() {
            println!("(notification only, nothing sent)");
        } else {
            println!("Response: {}", response.body);
        }
    }
}
