use std::sync::{Arc, Mutex};
use std::thread;

use dyncode::{
    AnalysisError, CallableContract, CompileError, CompilerOptions, ContractBuilder, ContractError, DynamicCompiler,
    ErrorCategory, HostFunction, HostTypeDef, InvokeError, ModuleReference, ReferenceSet, RuntimeError, RuntimeType,
    Value, Visibility,
};

fn int_pair_to_int() -> CallableContract {
    ContractBuilder::new()
        .input("Int32")
        .input("Int32")
        .output("Int32")
        .build_function()
        .unwrap()
}

#[test]
fn test_add_invokes_through_contract() {
    let source = r#"
        public class Calculator {
            public static int add(int a, int b) { return a + b; }
        }
    "#;
    let add = DynamicCompiler::new().compile(source, &int_pair_to_int()).unwrap();
    assert_eq!(add.invoke(&[Value::Int32(7), Value::Int32(5)]).unwrap(), Some(Value::Int32(12)));
    assert_eq!(add.name(), "Calculator.add");
}

#[test]
fn test_wrong_arity_does_not_match() {
    let source = "public class Calculator { public static int add(int a) => a; }";
    let error = DynamicCompiler::new().compile(source, &int_pair_to_int()).unwrap_err();
    assert!(matches!(error, CompileError::NoMatch(_)));
    assert_eq!(error.category(), ErrorCategory::ContractNotImplemented);
}

#[test]
fn test_syntax_error_reports_diagnostics() {
    let source = "public class Calculator { public static int add(int a, int b) { return a + ; } }";
    let error = DynamicCompiler::new().compile(source, &int_pair_to_int()).unwrap_err();
    let diagnostics = error.diagnostics().expect("compilation should have failed");
    assert!(diagnostics.has_errors());
    assert!(diagnostics.error_count() >= 1);
    assert_eq!(error.category(), ErrorCategory::MalformedSource);
}

#[test]
fn test_type_errors_report_diagnostics() {
    let source = "public class C { public static int add(int a, int b) { return a + missing; } }";
    let error = DynamicCompiler::new().compile(source, &int_pair_to_int()).unwrap_err();
    assert!(matches!(error, CompileError::CompilationFailed { .. }));
}

#[test]
fn test_string_concatenation() {
    let source = r#"
        public class Joiner {
            public static string Join(string a, string b) => a + ", " + b;
        }
    "#;
    let contract = CallableContract::function(["String", "String"], "String").unwrap();
    let join = DynamicCompiler::new().compile(source, &contract).unwrap();
    assert_eq!(
        join.invoke(&[Value::string("hello"), Value::string("world")]).unwrap(),
        Some(Value::string("hello, world"))
    );
}

#[test]
fn test_mixed_type_spellings() {
    let source = "using System; public class C { public static System.Int32 Mul(int a, Int32 b) => a * b; }";
    let contracts = [
        CallableContract::function(["int", "System.Int32"], "Int32").unwrap(),
        CallableContract::function(["Int32", "int"], "int").unwrap(),
    ];
    for contract in &contracts {
        let mul = DynamicCompiler::new().compile(source, contract).unwrap();
        assert_eq!(mul.invoke(&[Value::Int32(6), Value::Int32(7)]).unwrap(), Some(Value::Int32(42)));
    }
}

#[test]
fn test_first_match_in_declaration_order_wins() {
    let source = r#"
        public class C {
            public static int First(int a, int b) => a - b;
            public static int Second(int a, int b) => a + b;
        }
    "#;
    let callable = DynamicCompiler::new().compile(source, &int_pair_to_int()).unwrap();
    assert_eq!(callable.name(), "C.First");
}

#[test]
fn test_non_public_member_is_not_bound() {
    let source = "public class C { private static int add(int a, int b) => a + b; }";
    let error = DynamicCompiler::new().compile(source, &int_pair_to_int()).unwrap_err();
    assert!(matches!(
        &error,
        CompileError::MemberNotFound { type_name, member } if type_name == "C" && member == "add"
    ));

    let lenient = DynamicCompiler::new().with_options(CompilerOptions::new().with_visibility(Visibility::all()));
    assert!(lenient.compile(source, &int_pair_to_int()).is_ok());
}

#[test]
fn test_instance_methods_run_without_receiver() {
    let source = "public class C { public int add(int a, int b) => a + b; }";
    let add = DynamicCompiler::new().compile(source, &int_pair_to_int()).unwrap();
    assert_eq!(add.invoke(&[Value::Int32(1), Value::Int32(2)]).unwrap(), Some(Value::Int32(3)));
}

#[test]
fn test_source_must_declare_exactly_one_class() {
    let compiler = DynamicCompiler::new();
    let none = compiler.compile("namespace Empty { }", &int_pair_to_int()).unwrap_err();
    assert_eq!(none, CompileError::Analysis(AnalysisError::NoDeclaredType));
    assert_eq!(none.category(), ErrorCategory::MalformedSource);

    let two = compiler
        .compile("class A { } class B { }", &int_pair_to_int())
        .unwrap_err();
    assert_eq!(
        two,
        CompileError::Analysis(AnalysisError::MultipleDeclaredTypes {
            names: vec!["A".into(), "B".into()]
        })
    );
}

#[test]
fn test_namespaced_class_binds() {
    let source = r#"
        using System;
        namespace Demo.Geometry {
            public class Ops {
                public static double Hypot(double a, double b) => Math.Sqrt(a * a + b * b);
            }
        }
    "#;
    let hypot = DynamicCompiler::new()
        .compile_typed::<(f64, f64), f64>(source)
        .unwrap();
    assert_eq!(hypot.call((3.0, 4.0)).unwrap(), 5.0);
    assert_eq!(hypot.untyped().name(), "Demo.Geometry.Ops.Hypot");
}

#[test]
fn test_builder_arity_limits() {
    let function = |inputs: usize| {
        ContractBuilder::new()
            .inputs(vec!["int"; inputs])
            .output("int")
            .build_function()
    };
    assert!(function(0).is_ok());
    assert!(function(7).is_ok());
    assert!(matches!(function(8), Err(ContractError::UnsupportedArity { inputs: 8, .. })));

    let procedure = |inputs: usize| ContractBuilder::new().inputs(vec!["int"; inputs]).build_procedure();
    assert!(procedure(1).is_ok());
    assert!(procedure(8).is_ok());
    assert!(procedure(0).is_err());
    assert!(procedure(9).is_err());

    assert_eq!(
        ContractBuilder::new().input("int").build_function(),
        Err(ContractError::MissingOutput)
    );
    assert_eq!(
        ContractBuilder::new().input("int").output("int").build_procedure(),
        Err(ContractError::UnexpectedOutput)
    );
}

#[test]
fn test_contract_errors_are_builder_misuse() {
    let error: CompileError = ContractBuilder::new().build_procedure().unwrap_err().into();
    assert_eq!(error.category(), ErrorCategory::BuilderMisuse);
}

#[test]
fn test_typed_compile() {
    let source = r#"
        public class Stats {
            public static double Mean(double[] xs) {
                double total = 0;
                for (int i = 0; i < xs.Length; i++) total += xs[i];
                return xs.Length == 0 ? 0 : total / xs.Length;
            }
        }
    "#;
    let mean = DynamicCompiler::new().compile_typed::<(Vec<f64>,), f64>(source).unwrap();
    assert_eq!(mean.call((vec![1.0, 2.0, 6.0],)).unwrap(), 3.0);
    assert_eq!(mean.call((vec![],)).unwrap(), 0.0);
}

#[test]
fn test_nullable_contract() {
    let source = "public class C { public static int OrZero(int? x) => x ?? 0; }";
    let or_zero = DynamicCompiler::new().compile_typed::<(Option<i32>,), i32>(source).unwrap();
    assert_eq!(or_zero.call((Some(4),)).unwrap(), 4);
    assert_eq!(or_zero.call((None,)).unwrap(), 0);
}

#[test]
fn test_procedure_with_host_sink() {
    let lines = Arc::new(Mutex::new(Vec::new()));
    let sink_lines = Arc::clone(&lines);
    let sink = HostTypeDef::new("Demo", "Sink").with(HostFunction::new(
        "Write",
        vec![RuntimeType::String],
        RuntimeType::Void,
        move |args| {
            sink_lines.lock().unwrap().push(args[0].to_display_string());
            Ok(Value::Null)
        },
    ));
    let references = ReferenceSet::standard().with(ModuleReference::new("Demo").with(sink));

    let source = r#"
        using Demo;
        public class Logger {
            public static void Log(string message, int count) {
                for (int i = 0; i < count; i++) Sink.Write(message + " #" + i);
            }
        }
    "#;
    let contract = CallableContract::procedure(["string", "int"]).unwrap();
    let log = DynamicCompiler::new()
        .with_references(references)
        .compile(source, &contract)
        .unwrap();
    assert_eq!(log.invoke(&[Value::string("tick"), Value::Int32(2)]).unwrap(), None);
    assert_eq!(*lines.lock().unwrap(), vec!["tick #0".to_string(), "tick #1".to_string()]);
}

#[test]
fn test_procedure_contract_rejects_functions() {
    let source = "public class C { public static int Log(string message) => 0; }";
    let contract = CallableContract::procedure(["string"]).unwrap();
    assert!(matches!(
        DynamicCompiler::new().compile(source, &contract),
        Err(CompileError::NoMatch(_))
    ));
}

#[test]
fn test_runaway_recursion_is_a_runtime_error() {
    let source = "public class C { public static int Down(int n) => Down(n + 1); }";
    let options = CompilerOptions::new().with_max_call_depth(64);
    let down = DynamicCompiler::new()
        .with_options(options)
        .compile_typed::<(i32,), i32>(source)
        .unwrap();
    assert_eq!(
        down.call((0,)),
        Err(InvokeError::Runtime(RuntimeError::StackOverflow { limit: 64 }))
    );
}

#[test]
fn test_callable_shared_across_threads() {
    let source = r#"
        public class C {
            public static long Fib(int n) {
                long a = 0;
                long b = 1;
                for (int i = 0; i < n; i++) {
                    long next = a + b;
                    a = b;
                    b = next;
                }
                return a;
            }
        }
    "#;
    let fib = DynamicCompiler::new().compile_typed::<(i32,), i64>(source).unwrap();
    let handles: Vec<_> = (0..4)
        .map(|offset| {
            let fib = fib.clone();
            thread::spawn(move || fib.call((40 + offset,)).unwrap())
        })
        .collect();
    let results: Vec<i64> = handles.into_iter().map(|handle| handle.join().unwrap()).collect();
    assert_eq!(results, vec![102_334_155, 165_580_141, 267_914_296, 433_494_437]);
}

#[test]
fn test_short_name_match_with_foreign_namespace_fails_binding() {
    let source = "public class C { public static int add(int a, int b) => a + b; }";
    let contract = CallableContract::function(["Custom.Int32", "int"], "int").unwrap();
    let error = DynamicCompiler::new().compile(source, &contract).unwrap_err();
    assert!(matches!(error, CompileError::BindingMismatch(_)));
    assert_eq!(error.category(), ErrorCategory::ContractNotImplemented);
}

#[test]
fn test_invoke_validates_arguments() {
    let source = "public class C { public static int add(int a, int b) => a + b; }";
    let add = DynamicCompiler::new().compile(source, &int_pair_to_int()).unwrap();
    assert!(matches!(add.invoke(&[Value::Int32(1)]), Err(InvokeError::ArgumentCount { .. })));
    assert!(matches!(
        add.invoke(&[Value::Int32(1), Value::Null]),
        Err(InvokeError::ArgumentType { index: 1, .. })
    ));
}

#[test]
fn test_declaration_syntax_errors_report_diagnostics() {
    let broken = [
        "public class Calculator { public static int add(int a, int b) { return a + b; }",
        "public class Calculator { public static int add(int a int b) { return a + b; } }",
        "public class Calculator { public static int add(int a, int b) => a + b }",
        "public class Calculator public static int add(int a, int b) { return a + b; } }",
    ];
    for source in broken {
        let error = DynamicCompiler::new().compile(source, &int_pair_to_int()).unwrap_err();
        assert!(
            matches!(error, CompileError::CompilationFailed { .. }),
            "{source}: {error:?}"
        );
        assert_eq!(error.category(), ErrorCategory::MalformedSource);
        assert!(error.diagnostics().is_some_and(|diagnostics| diagnostics.has_errors()));
    }
}

#[test]
fn test_void_output_binds_a_procedure() {
    let procedure = ContractBuilder::new().input("string").output("void").build_procedure().unwrap();
    let function = CallableContract::function(["string"], "void").unwrap();
    assert_eq!(procedure, function);

    let source = "public class Logger { public static void Log(string message) { } }";
    let log = DynamicCompiler::new().compile(source, &function).unwrap();
    assert_eq!(log.name(), "Logger.Log");
    assert_eq!(log.invoke(&[Value::string("hello")]).unwrap(), None);
}

#[test]
fn test_hidden_matched_overload_is_not_found() {
    let source = r#"
        public class Calculator {
            private static int Scale(int x) => x * 2;
            public static long Scale(long x) => x * 3;
        }
    "#;
    let contract = CallableContract::function(["int"], "int").unwrap();
    let error = DynamicCompiler::new().compile(source, &contract).unwrap_err();
    assert!(matches!(
        &error,
        CompileError::MemberNotFound { type_name, member } if type_name == "Calculator" && member == "Scale"
    ));
    assert_eq!(error.category(), ErrorCategory::ContractNotImplemented);
}

#[test]
fn test_locals_branches_and_host_math() {
    let source = r#"
        using System;
        public class C {
            public static int Clamp(int value, int limit) {
                int bound = Math.Abs(limit);
                var result = value;
                if (result > bound) result = bound;
                else if (result < -bound) result = -bound;
                while (result % 2 != 0) result = Math.Max(result - 1, -bound);
                return result;
            }
        }
    "#;
    let clamp = DynamicCompiler::new().compile_typed::<(i32, i32), i32>(source).unwrap();
    assert_eq!(clamp.call((9, -6)).unwrap(), 6);
    assert_eq!(clamp.call((5, 10)).unwrap(), 4);
    assert_eq!(clamp.call((-20, 8)).unwrap(), -8);
}
