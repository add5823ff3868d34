#[cfg(test)]
mod tests {
    use tailspin::{format_ast, parse};

    fn format(source: &str) -> String {
        let module = parse(source).expect("parse failed");
        format_ast(&module, 4)
    }

    /// Formatting then re-parsing and re-formatting must be a fixed point.
    fn assert_stable(source: &str) {
        let first = format(source);
        let second = format(&first);
        assert_eq!(first, second, "formatter output is not stable");
    }

    #[test]
    fn test_format_function_definition() {
        let source = "
def add(a: int, b: int = 1) -> int:
    return a + b
";
        let formatted = format(source);
        assert_eq!(
            formatted,
            "def add(a: int, b: int = 1) -> int:\n    return a + b\n"
        );
    }

    #[test]
    fn test_format_decorator() {
        let source = "
@tco
def f(n):
    return n
";
        let formatted = format(source);
        assert!(formatted.starts_with("@tco\ndef f(n):\n"));
    }

    #[test]
    fn test_format_if_elif_else() {
        let source = "
if a:
    x = 1
elif b:
    x = 2
else:
    x = 3
";
        let formatted = format(source);
        assert_eq!(
            formatted,
            "if a:\n    x = 1\nelif b:\n    x = 2\nelse:\n    x = 3\n"
        );
    }

    #[test]
    fn test_format_while_true() {
        let source = "
while True:
    break
";
        assert_eq!(format(source), "while True:\n    break\n");
    }

    #[test]
    fn test_format_loop_else() {
        let source = "
for i in range(3):
    pass
else:
    done = True
";
        let formatted = format(source);
        assert!(formatted.contains("else:\n    done = True\n"));
    }

    #[test]
    fn test_format_tuple_assignment_without_parens() {
        assert_eq!(format("a, b = b, a"), "a, b = b, a\n");
    }

    #[test]
    fn test_format_parenthesizes_tuple_in_call() {
        assert_eq!(format("f((a, b))"), "f((a, b))\n");
    }

    #[test]
    fn test_format_precedence_parens() {
        // Parenthesized sub-expression with lower precedence is preserved
        assert_eq!(format("r = (a + b) * c"), "r = (a + b) * c\n");
        // Redundant parentheses vanish
        assert_eq!(format("r = (a * b) + c"), "r = a * b + c\n");
    }

    #[test]
    fn test_format_conditional_expression() {
        assert_eq!(format("r = a if c else b"), "r = a if c else b\n");
    }

    #[test]
    fn test_format_chained_comparison() {
        assert_eq!(format("r = 0 <= x < 10"), "r = 0 <= x < 10\n");
    }

    #[test]
    fn test_format_string_escapes() {
        assert_eq!(format("s = \"a\\nb\""), "s = \"a\\nb\"\n");
    }

    #[test]
    fn test_format_slice() {
        assert_eq!(format("r = xs[1:]"), "r = xs[1:]\n");
        assert_eq!(format("r = xs[a:b]"), "r = xs[a:b]\n");
    }

    #[test]
    fn test_format_keyword_arguments() {
        assert_eq!(format("r = f(1, b=2)"), "r = f(1, b=2)\n");
    }

    #[test]
    fn test_format_float_keeps_decimal_point() {
        assert_eq!(format("x = 1.0"), "x = 1.0\n");
    }

    #[test]
    fn test_format_is_stable_on_larger_program() {
        let source = "
@tco
def fibonacci(n: int, a: int = 0, b: int = 1) -> int:
    \"\"\"Fibonacci, accumulator style.\"\"\"
    if n == 0:
        return a
    if n == 1:
        return b
    return fibonacci(n - 1, b, a + b)


for i in range(10):
    print(fibonacci(i))
";
        assert_stable(source);
    }

    #[test]
    fn test_format_is_stable_on_nested_loops() {
        let source = "
def f(n):
    while n > 0:
        for i in range(3):
            if i == n:
                break
        else:
            n = n - 1
    return n
";
        assert_stable(source);
    }
}
