#[cfg(test)]
mod tests {
    use tailspin::optimizer::rewrite_function;
    use tailspin::{find_function, parse, TailRecursionError};

    fn rewrite(source: &str, name: &str) -> Result<(), TailRecursionError> {
        let module = parse(source).expect("parse failed");
        let def = find_function(&module, name).expect("function not found");
        rewrite_function(def, name).map(|_| ())
    }

    fn assert_accepts(source: &str, name: &str) {
        if let Err(error) = rewrite(source, name) {
            panic!("expected '{}' to be accepted, got: {}", name, error);
        }
    }

    fn assert_not_tail_recursive(source: &str, name: &str) -> Vec<usize> {
        match rewrite(source, name) {
            Err(TailRecursionError::NotTailRecursive { violations, .. }) => {
                assert!(!violations.is_empty(), "no violations recorded");
                violations.iter().map(|v| v.line).collect()
            }
            Err(other) => panic!("expected NotTailRecursive, got: {}", other),
            Ok(()) => panic!("expected '{}' to be rejected", name),
        }
    }

    #[test]
    fn test_accepts_factorial_accumulator() {
        assert_accepts(
            "
def factorial(n, acc=1):
    if n == 0:
        return acc
    return factorial(n - 1, acc * n)
",
            "factorial",
        );
    }

    #[test]
    fn test_accepts_gcd() {
        assert_accepts(
            "
def gcd(a, b):
    if b == 0:
        return a
    return gcd(b, a % b)
",
            "gcd",
        );
    }

    #[test]
    fn test_accepts_redundant_parentheses() {
        assert_accepts(
            "
def f(n):
    if n == 0:
        return 0
    return (f(n - 1))
",
            "f",
        );
    }

    #[test]
    fn test_accepts_conditional_expression_branches() {
        assert_accepts(
            "
def f(n):
    return 0 if n <= 0 else f(n - 1)
",
            "f",
        );
    }

    #[test]
    fn test_accepts_non_recursive_function() {
        assert_accepts(
            "
def double(n):
    return n * 2
",
            "double",
        );
    }

    #[test]
    fn test_accepts_self_alias_without_call() {
        // A bare self-reference is not a recursive call
        assert_accepts(
            "
def f(n):
    g = f
    return n
",
            "f",
        );
    }

    #[test]
    fn test_rejects_multiplication_around_call() {
        let lines = assert_not_tail_recursive(
            "
def bad(n):
    if n == 0:
        return 1
    return n * bad(n - 1)
",
            "bad",
        );
        assert_eq!(lines, vec![5]);
    }

    #[test]
    fn test_rejects_addition_of_two_self_calls() {
        let lines = assert_not_tail_recursive(
            "
def fib(n):
    if n < 2:
        return n
    return fib(n - 1) + fib(n - 2)
",
            "fib",
        );
        assert_eq!(lines.len(), 2);
    }

    #[test]
    fn test_rejects_boolean_composition() {
        // `cond and f(...)` composes; the call is not the whole return value
        assert_not_tail_recursive(
            "
def f(n):
    return n > 0 and f(n - 1)
",
            "f",
        );
        assert_not_tail_recursive(
            "
def g(n):
    return n <= 0 or g(n - 1)
",
            "g",
        );
    }

    #[test]
    fn test_rejects_call_inside_list_subscript() {
        assert_not_tail_recursive(
            "
def f(n):
    if n == 0:
        return 0
    return [f(n - 1)][0]
",
            "f",
        );
    }

    #[test]
    fn test_rejects_self_call_as_argument() {
        assert_not_tail_recursive(
            "
def f(n):
    if n == 0:
        return 0
    return print(f(n - 1))
",
            "f",
        );
    }

    #[test]
    fn test_rejects_self_call_in_assignment() {
        assert_not_tail_recursive(
            "
def f(n):
    x = f(n - 1)
    return x
",
            "f",
        );
    }

    #[test]
    fn test_rejects_self_call_in_loop_condition() {
        assert_not_tail_recursive(
            "
def f(n):
    while f(n):
        n = n - 1
    return n
",
            "f",
        );
    }

    #[test]
    fn test_rejects_accessor_style_self_call() {
        assert_not_tail_recursive(
            "
def f(n):
    return f.wrapped(n - 1)
",
            "f",
        );
    }

    #[test]
    fn test_rejects_conditional_expression_with_composed_branch() {
        // The self-call in the accepted branch is fine, the composed one is not
        assert_not_tail_recursive(
            "
def f(n):
    return f(n - 1) if n > 1 else 1 + f(0)
",
            "f",
        );
    }

    #[test]
    fn test_bare_return_is_ignored() {
        assert_accepts(
            "
def f(n):
    if n == 0:
        return
    return f(n - 1)
",
            "f",
        );
    }

    #[test]
    fn test_rejects_async_function() {
        let result = rewrite(
            "
async def f(n):
    if n == 0:
        return 0
    return f(n - 1)
",
            "f",
        );
        assert!(matches!(
            result,
            Err(TailRecursionError::AsyncRejected { name }) if name == "f"
        ));
    }

    #[test]
    fn test_rejects_generator_function() {
        let result = rewrite(
            "
def f(n):
    yield n
    return f(n - 1)
",
            "f",
        );
        assert!(matches!(
            result,
            Err(TailRecursionError::GeneratorRejected { line: 3, .. })
        ));
    }

    #[test]
    fn test_rejects_nested_qualname() {
        let module = parse(
            "
def inner(n):
    return inner(n - 1)
",
        )
        .expect("parse failed");
        let def = find_function(&module, "inner").expect("function not found");
        let result = rewrite_function(def, "outer.<locals>.inner");
        assert!(matches!(
            result,
            Err(TailRecursionError::NestedRejected { .. })
        ));
    }

    #[test]
    fn test_rejects_inner_def_referencing_function() {
        assert_not_tail_recursive(
            "
def f(n):
    def helper(k):
        return f(k)
    if n == 0:
        return 0
    return f(n - 1)
",
            "f",
        );
    }

    #[test]
    fn test_accepts_inner_def_not_referencing_function() {
        assert_accepts(
            "
def f(n):
    def double(k):
        return k * 2
    if n == 0:
        return 0
    return f(double(n) - double(n) - 1 + n - 1)
",
            "f",
        );
    }

    #[test]
    fn test_error_message_lists_violations() {
        let error = rewrite(
            "
def bad(n):
    if n == 0:
        return 1
    return n * bad(n - 1)
",
            "bad",
        )
        .unwrap_err();
        let message = error.to_string();
        assert!(message.contains("bad"));
        assert!(message.contains("line 5"));
    }
}
