#[cfg(test)]
mod tests {
    use tailspin::interpreter::{Interpreter, RuntimeError, Value};
    use tailspin::parse;

    fn run(source: &str) -> Interpreter {
        let module = parse(source).expect("parse failed");
        let mut interpreter = Interpreter::new();
        interpreter.interpret(&module).expect("runtime error");
        interpreter
    }

    fn run_err(source: &str) -> RuntimeError {
        let module = parse(source).expect("parse failed");
        let mut interpreter = Interpreter::new();
        interpreter
            .interpret(&module)
            .expect_err("expected a runtime error")
    }

    fn global_str(interpreter: &Interpreter, name: &str) -> String {
        interpreter
            .get_global(name)
            .unwrap_or_else(|| panic!("global '{}' not found", name))
            .to_string()
    }

    #[test]
    fn test_arithmetic_precedence() {
        let interpreter = run("x = 2 + 3 * 4");
        assert_eq!(global_str(&interpreter, "x"), "14");
    }

    #[test]
    fn test_big_integer_arithmetic() {
        let interpreter = run("x = 2 ** 100");
        assert_eq!(
            global_str(&interpreter, "x"),
            "1267650600228229401496703205376"
        );
    }

    #[test]
    fn test_floor_division_and_modulo_follow_divisor_sign() {
        let interpreter = run("q = -7 // 2\nr = -7 % 2\ns = 7 % -2");
        assert_eq!(global_str(&interpreter, "q"), "-4");
        assert_eq!(global_str(&interpreter, "r"), "1");
        assert_eq!(global_str(&interpreter, "s"), "-1");
    }

    #[test]
    fn test_true_division_produces_float() {
        let interpreter = run("x = 7 / 2");
        assert_eq!(global_str(&interpreter, "x"), "3.5");
    }

    #[test]
    fn test_boolean_operators_return_operand_values() {
        let interpreter = run("x = 0 or 5\ny = 1 and 2\nz = 0 and 5");
        assert_eq!(global_str(&interpreter, "x"), "5");
        assert_eq!(global_str(&interpreter, "y"), "2");
        assert_eq!(global_str(&interpreter, "z"), "0");
    }

    #[test]
    fn test_chained_comparison() {
        let interpreter = run("x = 1 < 2 < 3\ny = 1 < 2 > 5");
        assert_eq!(global_str(&interpreter, "x"), "True");
        assert_eq!(global_str(&interpreter, "y"), "False");
    }

    #[test]
    fn test_conditional_expression() {
        let interpreter = run("x = 1 if True else 2");
        assert_eq!(global_str(&interpreter, "x"), "1");
    }

    #[test]
    fn test_while_loop_with_else() {
        let source = "
n = 3
total = 0
while n > 0:
    total = total + n
    n = n - 1
else:
    total = total + 100
";
        let interpreter = run(source);
        assert_eq!(global_str(&interpreter, "total"), "106");
    }

    #[test]
    fn test_break_skips_loop_else() {
        let source = "
hit = False
for i in range(5):
    if i == 2:
        break
else:
    hit = True
";
        let interpreter = run(source);
        assert_eq!(global_str(&interpreter, "hit"), "False");
    }

    #[test]
    fn test_continue_in_for_loop() {
        let source = "
total = 0
for i in range(6):
    if i % 2 == 0:
        continue
    total = total + i
";
        let interpreter = run(source);
        assert_eq!(global_str(&interpreter, "total"), "9");
    }

    #[test]
    fn test_function_call_with_defaults_and_keywords() {
        let source = "
def scale(x, factor=10, offset=0):
    return x * factor + offset


a = scale(3)
b = scale(3, 2)
c = scale(3, offset=1)
";
        let interpreter = run(source);
        assert_eq!(global_str(&interpreter, "a"), "30");
        assert_eq!(global_str(&interpreter, "b"), "6");
        assert_eq!(global_str(&interpreter, "c"), "31");
    }

    #[test]
    fn test_function_reads_globals() {
        let source = "
base = 100


def add_base(n):
    return n + base


x = add_base(5)
";
        let interpreter = run(source);
        assert_eq!(global_str(&interpreter, "x"), "105");
    }

    #[test]
    fn test_tuple_unpacking_assignment() {
        let interpreter = run("a, b = 1, 2\na, b = b, a");
        assert_eq!(global_str(&interpreter, "a"), "2");
        assert_eq!(global_str(&interpreter, "b"), "1");
    }

    #[test]
    fn test_string_operations() {
        let source = "
s = \"tail\" + \"spin\"
r = s * 2
c = s[0]
tail = s[0:4]
inside = \"spin\" in s
n = len(s)
";
        let interpreter = run(source);
        assert_eq!(global_str(&interpreter, "s"), "tailspin");
        assert_eq!(global_str(&interpreter, "r"), "tailspintailspin");
        assert_eq!(global_str(&interpreter, "c"), "t");
        assert_eq!(global_str(&interpreter, "tail"), "tail");
        assert_eq!(global_str(&interpreter, "inside"), "True");
        assert_eq!(global_str(&interpreter, "n"), "8");
    }

    #[test]
    fn test_list_operations() {
        let source = "
xs = [1, 2, 3]
xs[0] = 10
ys = xs + [4]
rest = ys[1:]
count = len(ys)
";
        let interpreter = run(source);
        assert_eq!(global_str(&interpreter, "xs"), "[10, 2, 3]");
        assert_eq!(global_str(&interpreter, "ys"), "[10, 2, 3, 4]");
        assert_eq!(global_str(&interpreter, "rest"), "[2, 3, 4]");
        assert_eq!(global_str(&interpreter, "count"), "4");
    }

    #[test]
    fn test_negative_indexing() {
        let interpreter = run("xs = [1, 2, 3]\nlast = xs[-1]");
        assert_eq!(global_str(&interpreter, "last"), "3");
    }

    #[test]
    fn test_range_builtin() {
        let interpreter = run("xs = range(2, 8, 2)");
        assert_eq!(global_str(&interpreter, "xs"), "[2, 4, 6]");
    }

    #[test]
    fn test_recursion_limit_enforced() {
        let source = "
def down(n):
    if n == 0:
        return 0
    return down(n - 1)
";
        let module = parse(source).expect("parse failed");
        let mut interpreter = Interpreter::new();
        interpreter.set_recursion_limit(50);
        interpreter.interpret(&module).expect("runtime error");

        let result = interpreter.call_global("down", vec![Value::from(100)]);
        assert!(matches!(result, Err(RuntimeError::RecursionDepth)));

        // Raising the bound lets the same call finish
        interpreter.set_recursion_limit(200);
        let result = interpreter
            .call_global("down", vec![Value::from(100)])
            .expect("call failed");
        assert_eq!(result.to_string(), "0");
    }

    #[test]
    fn test_zero_division_error() {
        assert!(matches!(
            run_err("x = 1 // 0"),
            RuntimeError::ZeroDivision
        ));
    }

    #[test]
    fn test_name_error() {
        assert!(matches!(
            run_err("x = missing + 1"),
            RuntimeError::NameError(name) if name == "missing"
        ));
    }

    #[test]
    fn test_assertion_error() {
        assert!(matches!(
            run_err("assert 1 == 2, \"mismatch\""),
            RuntimeError::AssertionError(detail) if detail.contains("mismatch")
        ));
    }

    #[test]
    fn test_calling_non_callable() {
        assert!(matches!(
            run_err("x = 5\nx()"),
            RuntimeError::TypeError(_)
        ));
    }

    #[test]
    fn test_unexpected_keyword_argument() {
        let source = "
def f(a):
    return a


f(b=1)
";
        assert!(matches!(run_err(source), RuntimeError::TypeError(_)));
    }

    #[test]
    fn test_function_metadata_captured() {
        let source = "
def documented(n: int, acc: int = 1) -> int:
    \"\"\"Counts down.\"\"\"
    return n
";
        let interpreter = run(source);
        let Some(Value::Function(func)) = interpreter.get_global("documented") else {
            panic!("expected a function");
        };
        assert_eq!(func.name, "documented");
        assert_eq!(func.qualname, "documented");
        assert_eq!(func.docstring.as_deref(), Some("Counts down."));
        assert_eq!(func.returns.as_deref(), Some("int"));
        assert_eq!(func.params[0].annotation.as_deref(), Some("int"));
        assert_eq!(
            func.params[1].default.as_ref().map(|d| d.to_string()),
            Some("1".to_string())
        );
    }

    #[test]
    fn test_nested_function_qualname() {
        let source = "
def outer():
    def inner():
        return 1
    return inner


f = outer()
";
        let interpreter = run(source);
        let Some(Value::Function(func)) = interpreter.get_global("f") else {
            panic!("expected a function");
        };
        assert_eq!(func.qualname, "outer.<locals>.inner");
    }
}
