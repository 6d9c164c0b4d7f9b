use crate::bytecode::OpCode;
use crate::function_compiler::tests::{compile_method, compile_method_err};

use OpCode::*;

#[test]
fn arithmetic_widens_the_narrower_operand() {
    compile_method("static double M(int a, double b) => a * b;")
        .assert_opcodes(&[GetLocal, I32ToF64, GetLocal, MulF64, Return]);
    compile_method("static long M(long a, int b) => a + b;")
        .assert_opcodes(&[GetLocal, GetLocal, I32ToI64, AddI64, Return]);
}

#[test]
fn char_arithmetic_promotes_to_int() {
    compile_method("static int M(char c) => c - 'a';")
        .assert_opcodes(&[GetLocal, CharToI32, Constant, CharToI32, SubI32, Return]);
}

#[test]
fn string_concatenation_accepts_any_operand() {
    compile_method("static string M(string s, int n) => s + n;")
        .assert_opcodes(&[GetLocal, GetLocal, Concat, Return]);
}

#[test]
fn short_circuit_and() {
    compile_method("static bool M(bool a, bool b) => a && b;").assert_opcodes(&[
        GetLocal,
        JumpIfFalse,
        GetLocal,
        Jump,
        PushFalse,
        Return,
    ]);
}

#[test]
fn null_coalescing_unwraps_nullable() {
    compile_method("static int M(int? a) => a ?? 0;").assert_opcodes(&[
        GetLocal,
        Dup,
        IsNull,
        JumpIfFalse,
        Pop,
        PushZero,
        Return,
    ]);
}

#[test]
fn comparison_with_null() {
    compile_method("static bool M(string s) => s == null;")
        .assert_opcodes(&[GetLocal, PushNull, Equal, Return]);
}

#[test]
fn ternary_widens_branches() {
    compile_method("static double M(bool c) => c ? 1 : 2.5;").assert_opcodes(&[
        GetLocal,
        JumpIfFalse,
        PushOne,
        I32ToF64,
        Jump,
        Constant,
        Return,
    ]);
}

#[test]
fn negative_int_min_literal() {
    compile_method("static int M() => -2147483648;").assert_opcodes(&[Constant, Return]);
}

#[test]
fn explicit_numeric_cast() {
    compile_method("static int M(double d) => (int)d;").assert_opcodes(&[GetLocal, F64ToI32, Return]);
}

#[test]
fn invalid_cast() {
    let errors = compile_method_err("static int M(string s) => (int)s;");
    assert!(errors[0].contains("cannot convert type 'string' to 'int'"), "{errors:?}");
}

#[test]
fn host_call_picks_best_overload() {
    compile_method("static int M(int a, int b) => Math.Max(a, b);")
        .assert_opcodes(&[GetLocal, GetLocal, CallHost, Return]);
    compile_method("static double M(int a, double b) => Math.Max(a, b);")
        .assert_opcodes(&[GetLocal, I32ToF64, GetLocal, CallHost, Return]);
}

#[test]
fn primitive_keyword_reaches_host_type() {
    compile_method("static string M(string a) => string.Concat(a, \"!\");")
        .assert_opcodes(&[GetLocal, Constant, CallHost, Return]);
}

#[test]
fn no_matching_overload() {
    let errors = compile_method_err("static int M(string s) => Math.Abs(s);");
    assert!(errors[0].contains("no overload for method 'System.Math.Abs'"), "{errors:?}");
}

#[test]
fn script_method_call() {
    compile_method("static int M() => Twice(2); static int Twice(int x) => x * 2;")
        .assert_opcodes(&[Constant, Call, Return]);
}

#[test]
fn instance_method_from_static_context() {
    let errors = compile_method_err("static int M() => Twice(2); int Twice(int x) => x * 2;");
    assert!(errors[0].contains("an object reference is required"), "{errors:?}");
}

#[test]
fn unknown_name() {
    let errors = compile_method_err("static int M() => missing;");
    assert!(errors[0].contains("'missing' does not exist"), "{errors:?}");
}

#[test]
fn to_string_and_length() {
    compile_method("static int M(int a) => a.ToString().Length;")
        .assert_opcodes(&[GetLocal, ToString, Length, Return]);
}

#[test]
fn nullable_members() {
    compile_method("static bool M(int? a) => a.HasValue;")
        .assert_opcodes(&[GetLocal, IsNull, Not, Return]);
    compile_method("static int M(int? a) => a.Value;").assert_opcodes(&[GetLocal, Unwrap, Return]);
}

#[test]
fn constants_are_inlined() {
    compile_method("const int Limit = 10; static int M() => Limit + int.MaxValue;")
        .assert_opcodes(&[Constant, Constant, AddI32, Return]);
}

#[test]
fn assigning_a_constant() {
    let errors = compile_method_err("const int Limit = 10; static void M() { Limit = 3; }");
    assert!(errors[0].contains("left-hand side of an assignment"), "{errors:?}");
}

#[test]
fn compound_assignment_widens_the_operand() {
    compile_method("static void M(double d, int i) { d += i; }").assert_opcodes(&[
        GetLocal,
        GetLocal,
        I32ToF64,
        AddF64,
        SetLocal,
        ReturnVoid,
    ]);
}

#[test]
fn compound_assignment_does_not_narrow_silently() {
    let errors = compile_method_err("static void M(int a) { a += 1.5; }");
    assert!(
        errors[0].contains("cannot implicitly convert type 'double' to 'int'"),
        "{errors:?}"
    );
}

#[test]
fn compound_assignment_needs_a_compatible_operand() {
    let errors = compile_method_err("static void M(int a, string s) { a -= s; }");
    assert!(errors[0].contains("operator '-'"), "{errors:?}");
}

#[test]
fn assignment_as_a_value() {
    compile_method("static int M(int a) { int b; return b = a; }").assert_opcodes(&[
        PushZero,
        SetLocal,
        GetLocal,
        Dup,
        SetLocal,
        Return,
    ]);
}

#[test]
fn array_creation_and_indexing() {
    compile_method("static int M() { int[] xs = new int[3]; xs[0] = 4; return xs[0]; }").assert_opcodes(
        &[
            Constant, NewArray, SetLocal, GetLocal, PushZero, Constant, SetIndex, GetLocal, PushZero,
            GetIndex, Return,
        ],
    );
}

#[test]
fn array_initializer() {
    compile_method("static long[] M() => new long[] { 1, 2L };")
        .assert_opcodes(&[PushOne, I32ToI64, Constant, ArrayLiteral, Return]);
}

#[test]
fn array_size_must_match_initializer() {
    let errors = compile_method_err("static int[] M() => new int[3] { 1 };");
    assert!(errors[0].contains("array size"), "{errors:?}");
}

#[test]
fn element_increment_evaluates_operands_once() {
    compile_method("static void M(int[] xs, int i) { xs[i]++; }").assert_opcodes(&[
        GetLocal, GetLocal, SetLocal, SetLocal, GetLocal, GetLocal, GetLocal, GetLocal, GetIndex,
        PushOne, AddI32, SetIndex, ReturnVoid,
    ]);
}

#[test]
fn postfix_increment_value_is_the_old_value() {
    compile_method("static int M(int a) => a++;")
        .assert_opcodes(&[GetLocal, Dup, PushOne, AddI32, SetLocal, Return]);
}

#[test]
fn char_increment_round_trips_through_int() {
    compile_method("static void M(char c) { c++; }")
        .assert_opcodes(&[GetLocal, CharToI32, PushOne, AddI32, I32ToChar, SetLocal, ReturnVoid]);
}

#[test]
fn string_characters_are_read_only() {
    let errors = compile_method_err("static void M(string s) { s[0] = 'x'; }");
    assert!(errors[0].contains("character of a string"), "{errors:?}");
}

#[test]
fn private_members_of_other_types_are_inaccessible() {
    let errors = compile_method_err(
        "class Inner { private static int Secret() => 1; } static int M() => Inner.Secret();",
    );
    assert!(errors[0].contains("inaccessible due to its protection level"), "{errors:?}");
}
