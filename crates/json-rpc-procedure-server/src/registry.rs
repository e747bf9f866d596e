//! Procedure registry and dispatch.
//!
//! Names resolve in this order: explicit registrations (closure, instance
//! method, or type-name method), then registered fallback objects in the
//! order they were added. Registration is a setup-phase activity; dispatch
//! only reads the registry.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::binder;
use crate::error::{RpcError, RpcResult};
use crate::error_codes;
use crate::params::RequestParams;
use crate::procedure::{Arguments, ObjectFactory, Procedure, ProcedureTarget, RpcObject, Signature};

/// Maps procedure names to callable targets
#[derive(Default)]
pub struct ProcedureRegistry {
    procedures: HashMap<String, ProcedureTarget>,
    types: HashMap<String, ObjectFactory>,
    objects: Vec<Arc<dyn RpcObject>>,
    before_hook: Option<String>,
}

/// A target made concrete for one call
enum Resolved {
    Function(Procedure),
    Object {
        instance: Arc<dyn RpcObject>,
        method: String,
        signature: Signature,
    },
}

impl ProcedureRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Associate `name` with `target`. Re-registering a name replaces the
    /// previous target.
    pub fn register(&mut self, name: impl Into<String>, target: ProcedureTarget) {
        let name = name.into();
        if self.procedures.insert(name.clone(), target).is_some() {
            debug!("Replaced procedure registration: {}", name);
        }
    }

    /// Register a closure with its declared parameters
    pub fn register_fn<F, T>(&mut self, name: impl Into<String>, signature: Signature, handler: F)
    where
        F: Fn(Arguments) -> RpcResult<T> + Send + Sync + 'static,
        T: Serialize,
    {
        self.register(name, ProcedureTarget::function(signature, handler));
    }

    /// Register `method` of an existing instance under `name`
    pub fn register_method(
        &mut self,
        name: impl Into<String>,
        instance: Arc<dyn RpcObject>,
        method: impl Into<String>,
    ) {
        self.register(name, ProcedureTarget::method(instance, method));
    }

    /// Make a type resolvable by name for [`ProcedureTarget::TypeMethod`] targets.
    /// The factory runs once per call.
    pub fn register_type<F>(&mut self, type_name: impl Into<String>, factory: F)
    where
        F: Fn() -> Arc<dyn RpcObject> + Send + Sync + 'static,
    {
        self.types.insert(type_name.into(), Arc::new(factory));
    }

    /// Register `method` of the type named `type_name` under `name`
    pub fn register_type_method(
        &mut self,
        name: impl Into<String>,
        type_name: impl Into<String>,
        method: impl Into<String>,
    ) {
        self.register(name, ProcedureTarget::type_method(type_name, method));
    }

    /// Serve any method of `instance` that has no explicit registration
    pub fn register_object(&mut self, instance: Arc<dyn RpcObject>) {
        self.objects.push(instance);
    }

    /// Name of a method that object targets run, with the procedure name, before the target method
    pub fn set_before_hook(&mut self, hook_name: impl Into<String>) {
        self.before_hook = Some(hook_name.into());
    }

    pub fn before_hook(&self) -> Option<&str> {
        self.before_hook.as_deref()
    }

    /// True if `name` has an explicit registration
    pub fn contains(&self, name: &str) -> bool {
        self.procedures.contains_key(name)
    }

    /// Names with an explicit registration
    pub fn procedure_names(&self) -> Vec<String> {
        self.procedures.keys().cloned().collect()
    }

    /// Resolve `name`, bind `params` and invoke the target. Failures raised
    /// by the target itself are returned unchanged.
    pub fn dispatch(&self, name: &str, params: RequestParams) -> RpcResult<Value> {
        debug!("Dispatching procedure: {}", name);

        match self.resolve(name)? {
            Resolved::Function(procedure) => {
                let args = binder::bind(procedure.signature(), params)?;
                procedure.call(args)
            }
            Resolved::Object {
                instance,
                method,
                signature,
            } => {
                let args = binder::bind(&signature, params)?;
                self.run_before_hook(instance.as_ref(), name)?;
                instance.call(&method, args)
            }
        }
    }

    fn resolve(&self, name: &str) -> RpcResult<Resolved> {
        let not_found = || RpcError::ProcedureNotFound(name.to_string());

        match self.procedures.get(name) {
            Some(ProcedureTarget::Function(procedure)) => Ok(Resolved::Function(procedure.clone())),
            Some(ProcedureTarget::Method {
                instance,
                method,
                signature,
            }) => {
                let signature = signature.clone().ok_or_else(not_found)?;
                Ok(Resolved::Object {
                    instance: Arc::clone(instance),
                    method: method.clone(),
                    signature,
                })
            }
            Some(ProcedureTarget::TypeMethod { type_name, method }) => {
                let factory = self.types.get(type_name).ok_or_else(|| {
                    debug!("Type {} is not registered (procedure {})", type_name, name);
                    not_found()
                })?;
                let instance = factory();
                let signature = instance.signature(method).ok_or_else(not_found)?;
                Ok(Resolved::Object {
                    instance,
                    method: method.clone(),
                    signature,
                })
            }
            None => self
                .objects
                .iter()
                .find_map(|instance| {
                    instance.signature(name).map(|signature| Resolved::Object {
                        instance: Arc::clone(instance),
                        method: name.to_string(),
                        signature,
                    })
                })
                .ok_or_else(not_found),
        }
    }

    fn run_before_hook(&self, instance: &dyn RpcObject, procedure: &str) -> RpcResult<()> {
        let Some(hook) = self.before_hook.as_deref() else {
            return Ok(());
        };
        let Some(signature) = instance.signature(hook) else {
            return Ok(());
        };

        // A hook declaring no parameters runs without the name; one that
        // needs more than the name is a server fault, not the caller's.
        let supplied = if signature.is_empty() {
            Vec::new()
        } else {
            vec![Value::String(procedure.to_string())]
        };
        let args = binder::bind_positional(&signature, supplied).map_err(|e| {
            warn!("Before-hook {} cannot be called for {}: {}", hook, procedure, e);
            RpcError::Other {
                code: error_codes::INTERNAL_ERROR,
                message: format!("Before-hook {} cannot accept the procedure name", hook),
            }
        })?;

        trace!("Running before-hook {} for {}", hook, procedure);
        instance.call(hook, args).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ArgumentError;
    use serde_json::json;
    use std::sync::Mutex;

    /// getAll(p1, p2, p3 = 4) -> p1 + p2 + p3
    struct Summer;

    impl RpcObject for Summer {
        fn signature(&self, method: &str) -> Option<Signature> {
            match method {
                "getAll" => Some(
                    Signature::new()
                        .required("p1")
                        .required("p2")
                        .optional("p3", 4),
                ),
                _ => None,
            }
        }

        fn call(&self, method: &str, args: Arguments) -> RpcResult<Value> {
            match method {
                "getAll" => {
                    let total: i64 = args.get::<i64>("p1")?
                        + args.get::<i64>("p2")?
                        + args.get::<i64>("p3")?;
                    Ok(json!(total))
                }
                _ => Err(RpcError::ProcedureNotFound(method.to_string())),
            }
        }
    }

    /// getAll(p1) -> p1 + 2
    struct PlusTwo;

    impl RpcObject for PlusTwo {
        fn signature(&self, method: &str) -> Option<Signature> {
            (method == "getAll").then(|| Signature::new().required("p1"))
        }

        fn call(&self, _method: &str, args: Arguments) -> RpcResult<Value> {
            Ok(json!(args.get::<i64>("p1")? + 2))
        }
    }

    /// Records the procedure name handed to its `before` method
    #[derive(Default)]
    struct Recorder {
        last: Mutex<String>,
        hook_calls: Mutex<usize>,
    }

    impl RpcObject for Recorder {
        fn signature(&self, method: &str) -> Option<Signature> {
            match method {
                "before" => Some(Signature::new().required("procedure")),
                "myProcedure" => Some(Signature::new()),
                _ => None,
            }
        }

        fn call(&self, method: &str, args: Arguments) -> RpcResult<Value> {
            match method {
                "before" => {
                    *self.last.lock().unwrap() = args.get("procedure")?;
                    *self.hook_calls.lock().unwrap() += 1;
                    Ok(Value::Null)
                }
                "myProcedure" => Ok(json!(self.last.lock().unwrap().clone())),
                _ => Err(RpcError::ProcedureNotFound(method.to_string())),
            }
        }
    }

    fn named(value: Value) -> RequestParams {
        serde_json::from_value(value).unwrap()
    }

    fn sum_closure(args: Arguments) -> RpcResult<i64> {
        Ok(args.get::<i64>("p1")? + args.get::<i64>("p2")? + args.get::<i64>("p3")?)
    }

    fn sum_signature() -> Signature {
        Signature::new()
            .required("p1")
            .required("p2")
            .optional("p3", 4)
    }

    #[test]
    fn test_procedure_not_found() {
        let registry = ProcedureRegistry::new();
        let error = registry.dispatch("a", RequestParams::default()).unwrap_err();
        assert_eq!(error, RpcError::ProcedureNotFound("a".to_string()));
    }

    #[test]
    fn test_callback_not_found() {
        let mut registry = ProcedureRegistry::new();
        registry.register_fn("b", Signature::new(), |_args| Ok(()));
        assert!(matches!(
            registry.dispatch("a", RequestParams::default()),
            Err(RpcError::ProcedureNotFound(_))
        ));
    }

    #[test]
    fn test_type_not_found() {
        let mut registry = ProcedureRegistry::new();
        registry.register_type_method("getAllTasks", "c", "getAll");
        assert!(matches!(
            registry.dispatch("getAllTasks", RequestParams::default()),
            Err(RpcError::ProcedureNotFound(_))
        ));
    }

    #[test]
    fn test_method_not_found_on_type() {
        let mut registry = ProcedureRegistry::new();
        registry.register_type("A", || Arc::new(Summer));
        registry.register_type_method("getAllTasks", "A", "getNothing");
        assert!(matches!(
            registry.dispatch("getAllTasks", RequestParams::default()),
            Err(RpcError::ProcedureNotFound(_))
        ));
    }

    #[test]
    fn test_method_not_found_on_instance() {
        let mut registry = ProcedureRegistry::new();
        registry.register_method("getNothing", Arc::new(Summer), "getNothing");
        assert!(matches!(
            registry.dispatch("getNothing", RequestParams::default()),
            Err(RpcError::ProcedureNotFound(_))
        ));
    }

    #[test]
    fn test_bind_named_arguments() {
        let mut registry = ProcedureRegistry::new();
        registry.register_type("A", || Arc::new(Summer));
        registry.register_type("B", || Arc::new(PlusTwo));
        registry.register_type_method("getAllA", "A", "getAll");
        registry.register_type_method("getAllB", "B", "getAll");
        registry.register_method("getAllC", Arc::new(PlusTwo), "getAll");

        let dispatch = |name: &str, params: Value| registry.dispatch(name, named(params)).unwrap();

        assert_eq!(dispatch("getAllA", json!({"p2": 4, "p1": -2})), json!(6));
        assert_eq!(dispatch("getAllA", json!({"p2": 4, "p3": 8, "p1": -2})), json!(10));
        assert_eq!(dispatch("getAllB", json!({"p1": 4})), json!(6));
        assert_eq!(dispatch("getAllC", json!({"p1": 3})), json!(5));
    }

    #[test]
    fn test_bind_positional_arguments() {
        let mut registry = ProcedureRegistry::new();
        registry.register_type("A", || Arc::new(Summer));
        registry.register_type("B", || Arc::new(PlusTwo));
        registry.register_type_method("getAllA", "A", "getAll");
        registry.register_type_method("getAllB", "B", "getAll");

        let dispatch = |name: &str, params: Value| registry.dispatch(name, named(params)).unwrap();

        assert_eq!(dispatch("getAllA", json!([4, -2])), json!(6));
        assert_eq!(dispatch("getAllA", json!([4, 0, -2])), json!(2));
        assert_eq!(dispatch("getAllB", json!([2])), json!(4));
    }

    #[test]
    fn test_register_closure_named_and_positional() {
        let mut registry = ProcedureRegistry::new();
        registry.register_fn("getAllA", sum_signature(), sum_closure);

        assert_eq!(
            registry
                .dispatch("getAllA", named(json!({"p2": 4, "p1": -2})))
                .unwrap(),
            json!(6)
        );
        assert_eq!(
            registry
                .dispatch("getAllA", named(json!({"p2": 4, "p3": 8, "p1": -2})))
                .unwrap(),
            json!(10)
        );
        assert_eq!(
            registry.dispatch("getAllA", named(json!([4, -2]))).unwrap(),
            json!(6)
        );
        assert_eq!(
            registry
                .dispatch("getAllA", named(json!([4, 0, -2])))
                .unwrap(),
            json!(2)
        );
    }

    #[test]
    fn test_positional_and_named_equivalent() {
        let mut registry = ProcedureRegistry::new();
        registry.register_fn("f", sum_signature(), sum_closure);

        let positional = registry.dispatch("f", named(json!([4, -2]))).unwrap();
        let by_name = registry
            .dispatch("f", named(json!({"p1": 4, "p2": -2})))
            .unwrap();
        assert_eq!(positional, json!(6));
        assert_eq!(positional, by_name);
    }

    #[test]
    fn test_too_many_arguments() {
        let mut registry = ProcedureRegistry::new();
        registry.register_method("getAllC", Arc::new(PlusTwo), "getAll");

        let error = registry
            .dispatch("getAllC", named(json!([3, 5])))
            .unwrap_err();
        assert!(matches!(
            error,
            RpcError::InvalidArguments(ArgumentError::TooManyArguments { .. })
        ));

        let error = registry
            .dispatch("getAllC", named(json!({"p1": 3, "p2": 5})))
            .unwrap_err();
        assert!(matches!(error, RpcError::InvalidArguments(_)));
    }

    #[test]
    fn test_not_enough_arguments() {
        let mut registry = ProcedureRegistry::new();
        registry.register_method("getAllC", Arc::new(PlusTwo), "getAll");

        let error = registry
            .dispatch("getAllC", RequestParams::default())
            .unwrap_err();
        assert!(matches!(
            error,
            RpcError::InvalidArguments(ArgumentError::NotEnoughArguments { .. })
        ));
    }

    #[test]
    fn test_undefined_arguments() {
        let mut registry = ProcedureRegistry::new();
        registry.register_method("getAllA", Arc::new(Summer), "getAll");

        let error = registry
            .dispatch("getAllA", named(json!({"p1": 3, "p2": 5, "p333": 7})))
            .unwrap_err();
        assert!(matches!(
            error,
            RpcError::InvalidArguments(ArgumentError::UndefinedArgument { .. })
        ));
    }

    #[test]
    fn test_reregistration_last_write_wins() {
        let mut registry = ProcedureRegistry::new();
        registry.register_fn("version", Signature::new(), |_args| Ok("first"));
        registry.register_fn("version", Signature::new(), |_args| Ok("second"));

        assert_eq!(registry.procedure_names(), vec!["version".to_string()]);
        assert_eq!(
            registry.dispatch("version", RequestParams::default()).unwrap(),
            json!("second")
        );
    }

    #[test]
    fn test_before_hook_on_object() {
        let recorder = Arc::new(Recorder::default());
        let mut registry = ProcedureRegistry::new();
        registry.register_object(recorder.clone());
        registry.set_before_hook("before");

        let result = registry
            .dispatch("myProcedure", RequestParams::default())
            .unwrap();
        assert_eq!(result, json!("myProcedure"));
        assert_eq!(*recorder.hook_calls.lock().unwrap(), 1);
    }

    #[test]
    fn test_before_hook_runs_once_per_dispatch() {
        let recorder = Arc::new(Recorder::default());
        let mut registry = ProcedureRegistry::new();
        registry.register_method("renamed", recorder.clone(), "myProcedure");
        registry.set_before_hook("before");

        assert_eq!(
            registry.dispatch("renamed", RequestParams::default()).unwrap(),
            json!("renamed")
        );
        registry
            .dispatch("renamed", RequestParams::default())
            .unwrap();
        assert_eq!(*recorder.hook_calls.lock().unwrap(), 2);
    }

    #[test]
    fn test_before_hook_missing_on_object_is_noop() {
        let mut registry = ProcedureRegistry::new();
        registry.register_method("sum", Arc::new(Summer), "getAll");
        registry.set_before_hook("before");

        assert_eq!(
            registry.dispatch("sum", named(json!([1, 2]))).unwrap(),
            json!(7)
        );
    }

    #[test]
    fn test_before_hook_skipped_when_binding_fails() {
        let recorder = Arc::new(Recorder::default());
        let mut registry = ProcedureRegistry::new();
        registry.register_object(recorder.clone());
        registry.set_before_hook("before");

        assert!(registry
            .dispatch("myProcedure", named(json!(["extra"])))
            .is_err());
        assert_eq!(*recorder.hook_calls.lock().unwrap(), 0);
    }

    #[test]
    fn test_explicit_registration_shadows_object() {
        let mut registry = ProcedureRegistry::new();
        registry.register_object(Arc::new(Recorder::default()));
        registry.register_fn("myProcedure", Signature::new(), |_args| Ok("explicit"));

        assert_eq!(
            registry
                .dispatch("myProcedure", RequestParams::default())
                .unwrap(),
            json!("explicit")
        );
    }

    #[test]
    fn test_application_error_propagates_unchanged() {
        let mut registry = ProcedureRegistry::new();
        registry.register_fn("fail", Signature::new(), |_args| -> RpcResult<()> {
            Err(RpcError::application(-32001, "Kaboom"))
        });

        assert_eq!(
            registry.dispatch("fail", RequestParams::default()).unwrap_err(),
            RpcError::application(-32001, "Kaboom")
        );
    }

    /// `before` declared with `arity` required parameters, plus `work()`
    struct FixedHook {
        arity: usize,
        hook_calls: Mutex<usize>,
    }

    impl FixedHook {
        fn new(arity: usize) -> Self {
            Self {
                arity,
                hook_calls: Mutex::new(0),
            }
        }
    }

    impl RpcObject for FixedHook {
        fn signature(&self, method: &str) -> Option<Signature> {
            match method {
                "before" => Some(
                    (0..self.arity)
                        .map(|i| crate::procedure::ParameterSpec::required(format!("arg{}", i)))
                        .collect(),
                ),
                "work" => Some(Signature::new()),
                _ => None,
            }
        }

        fn call(&self, method: &str, _args: Arguments) -> RpcResult<Value> {
            if method == "before" {
                *self.hook_calls.lock().unwrap() += 1;
                return Ok(Value::Null);
            }
            Ok(json!("done"))
        }
    }

    #[test]
    fn test_before_hook_without_parameters_still_runs() {
        let object = Arc::new(FixedHook::new(0));
        let mut registry = ProcedureRegistry::new();
        registry.register_object(object.clone());
        registry.set_before_hook("before");

        assert_eq!(
            registry.dispatch("work", RequestParams::default()).unwrap(),
            json!("done")
        );
        assert_eq!(*object.hook_calls.lock().unwrap(), 1);
    }

    #[test]
    fn test_before_hook_needing_more_arguments_is_internal_error() {
        let object = Arc::new(FixedHook::new(2));
        let mut registry = ProcedureRegistry::new();
        registry.register_object(object.clone());
        registry.set_before_hook("before");

        let error = registry
            .dispatch("work", RequestParams::default())
            .unwrap_err();
        assert!(matches!(error, RpcError::Other { code: -32603, .. }));
        assert_eq!(error.classify().object.code, -32603);
        assert_eq!(*object.hook_calls.lock().unwrap(), 0);
    }
}
