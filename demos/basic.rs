//! Compile two small classes at run time and call them.
//!
//! Run with `RUST_LOG=dyncode=debug cargo run --example basic` to watch each
//! phase of the pipeline.

use dyncode::{ContractBuilder, DynamicCompiler, Value};
use tracing_subscriber::EnvFilter;

const MULTIPLY: &str = r#"
    public class Multiplier {
        public static int Multiply(int x, int y) {
            return x * y;
        }
    }
"#;

const JOIN: &str = r#"
    using System;

    namespace Demo {
        public class Joiner {
            public static string Join(string first, string second) {
                if (String.IsNullOrEmpty(first)) return second;
                return first + " " + second;
            }
        }
    }
"#;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let compiler = DynamicCompiler::new();

    let multiply = ContractBuilder::new()
        .input("int")
        .input("int")
        .output("int")
        .build_function()?;
    let callable = compiler.compile(MULTIPLY, &multiply)?;
    let product = callable.invoke(&[Value::Int32(6), Value::Int32(7)])?;
    println!("{} {} = {}", callable.name(), multiply, product.unwrap_or(Value::Null));

    let join = ContractBuilder::new()
        .inputs(["string", "string"])
        .output("string")
        .build_function()?;
    let callable = compiler.compile(JOIN, &join)?;
    for (first, second) in [("Hello", "World"), ("", "alone")] {
        let joined = callable.invoke(&[Value::string(first), Value::string(second)])?;
        println!("{}({first:?}, {second:?}) = {:?}", callable.name(), joined.unwrap_or(Value::Null));
    }

    let broken = "public class Broken { public static int Multiply(int x, int y) { return x * ; } }";
    if let Err(error) = compiler.compile(broken, &multiply) {
        println!("{error}");
        if let Some(diagnostics) = error.diagnostics() {
            for diagnostic in diagnostics.iter() {
                print!("{}", diagnostic.display_with_source(broken));
            }
        }
    }

    Ok(())
}
