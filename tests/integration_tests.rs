#[cfg(test)]
mod tests {
    use tailspin::interpreter::{Interpreter, RuntimeError, Value};
    use tailspin::{parse, TailRecursionError};

    fn interpreter_for(source: &str) -> Interpreter {
        let module = parse(source).expect("parse failed");
        let mut interpreter = Interpreter::new();
        interpreter.interpret(&module).expect("runtime error");
        interpreter
    }

    fn call_str(interpreter: &mut Interpreter, name: &str, args: Vec<Value>) -> String {
        interpreter
            .call_global(name, args)
            .unwrap_or_else(|e| panic!("{} failed: {}", name, e))
            .to_string()
    }

    /// Deep unoptimized recursion nests native stack frames; run those
    /// tests on a thread with a large stack.
    fn with_deep_stack(f: impl FnOnce() + Send + 'static) {
        std::thread::Builder::new()
            .stack_size(256 * 1024 * 1024)
            .spawn(f)
            .expect("failed to spawn test thread")
            .join()
            .expect("test thread panicked");
    }

    const FACTORIAL_MOD_K: &str = "
@tco
def factorial_mod_k(acc: int, n: int, k: int) -> int:
    if n == 0:
        return acc % k
    return factorial_mod_k(acc * n % k, n - 1, k)
";

    #[test]
    fn test_factorial_mod_k_deep_recursion() {
        let mut interpreter = interpreter_for(FACTORIAL_MOD_K);
        let result = interpreter
            .call_global(
                "factorial_mod_k",
                vec![Value::from(1), Value::from(1_000_000), Value::from(79)],
            )
            .expect("optimized call failed");

        let value: i64 = result.to_string().parse().expect("expected an integer");
        assert!((0..79).contains(&value));
        // 79 divides 1_000_000!, so the residue is exactly zero
        assert_eq!(value, 0);
    }

    #[test]
    fn test_factorial_mod_k_fails_without_optimization() {
        with_deep_stack(|| {
            let source = "
def factorial_mod_k(acc, n, k):
    if n == 0:
        return acc % k
    return factorial_mod_k(acc * n % k, n - 1, k)
";
            let mut interpreter = interpreter_for(source);
            let result = interpreter.call_global(
                "factorial_mod_k",
                vec![Value::from(1), Value::from(1_000_000), Value::from(79)],
            );
            assert!(matches!(result, Err(RuntimeError::RecursionDepth)));
        });
    }

    #[test]
    fn test_optimized_matches_unoptimized_on_small_inputs() {
        let unoptimized = "
def factorial_mod_k(acc, n, k):
    if n == 0:
        return acc % k
    return factorial_mod_k(acc * n % k, n - 1, k)
";
        let mut plain = interpreter_for(unoptimized);
        let mut optimized = interpreter_for(FACTORIAL_MOD_K);

        for n in [0, 1, 2, 5, 17, 50] {
            let args = vec![Value::from(1), Value::from(n), Value::from(1009)];
            let expected = call_str(&mut plain, "factorial_mod_k", args.clone());
            let actual = call_str(&mut optimized, "factorial_mod_k", args);
            assert_eq!(actual, expected, "mismatch at n={}", n);
        }
    }

    const FIB: &str = "
@tco
def fib(n, a=0, b=1):
    if n == 0:
        return a
    if n == 1:
        return b
    return fib(n - 1, b, a + b)
";

    #[test]
    fn test_fib_small_and_deep() {
        let mut interpreter = interpreter_for(FIB);
        assert_eq!(call_str(&mut interpreter, "fib", vec![Value::from(10)]), "55");
        assert_eq!(
            call_str(&mut interpreter, "fib", vec![Value::from(20)]),
            "6765"
        );

        // Arbitrary precision: fib(5000) has over a thousand digits and
        // must complete under the default recursion limit
        let big = call_str(&mut interpreter, "fib", vec![Value::from(5000)]);
        assert!(big.len() > 1000);
    }

    #[test]
    fn test_gcd() {
        let source = "
@tco
def gcd(a, b):
    if b == 0:
        return a
    return gcd(b, a % b)
";
        let mut interpreter = interpreter_for(source);
        assert_eq!(
            call_str(
                &mut interpreter,
                "gcd",
                vec![Value::from(1071), Value::from(462)]
            ),
            "21"
        );
        assert_eq!(
            call_str(
                &mut interpreter,
                "gcd",
                vec![Value::from(48), Value::from(18)]
            ),
            "6"
        );
    }

    #[test]
    fn test_sum_to_n() {
        let source = "
@tco
def sum_to_n(n, acc=0):
    if n == 0:
        return acc
    return sum_to_n(n - 1, acc + n)
";
        let mut interpreter = interpreter_for(source);
        assert_eq!(
            call_str(&mut interpreter, "sum_to_n", vec![Value::from(100)]),
            "5050"
        );
        assert_eq!(
            call_str(&mut interpreter, "sum_to_n", vec![Value::from(1_000_000)]),
            "500000500000"
        );
    }

    #[test]
    fn test_loop_tail_transfers_through_inner_loop() {
        let source = "
@tco
def loop_tail(n):
    if n <= 0:
        return 0
    for i in range(3):
        return loop_tail(n - 1)
    return 0
";
        let mut interpreter = interpreter_for(source);
        assert_eq!(
            call_str(&mut interpreter, "loop_tail", vec![Value::from(5)]),
            "0"
        );
    }

    #[test]
    fn test_loop_tail_runs_once_per_logical_iteration() {
        // A step counter distinguishes the correct rewrite (one transfer
        // per logical call) from a `continue` bound to the inner loop
        // (which would burn all three loop passes and fall through)
        let source = "
@tco
def loop_tail(n, steps=0):
    if n <= 0:
        return steps
    for i in range(3):
        return loop_tail(n - 1, steps + 1)
    return -1
";
        let mut interpreter = interpreter_for(source);
        assert_eq!(
            call_str(&mut interpreter, "loop_tail", vec![Value::from(5)]),
            "5"
        );
    }

    #[test]
    fn test_tail_call_inside_while_loop() {
        let source = "
@tco
def countdown(n):
    while n > 0:
        return countdown(n - 1)
    return n
";
        let mut interpreter = interpreter_for(source);
        assert_eq!(
            call_str(&mut interpreter, "countdown", vec![Value::from(5000)]),
            "0"
        );
    }

    #[test]
    fn test_rejection_surfaces_at_decoration_time() {
        let source = "
@tco
def bad(n):
    if n == 0:
        return 1
    return n * bad(n - 1)
";
        let module = parse(source).expect("parse failed");
        let mut interpreter = Interpreter::new();
        let error = interpreter
            .interpret(&module)
            .expect_err("decoration should fail");

        match error {
            RuntimeError::TailRecursion(TailRecursionError::NotTailRecursive {
                name,
                violations,
            }) => {
                assert_eq!(name, "bad");
                assert!(!violations.is_empty());
            }
            other => panic!("expected NotTailRecursive, got: {}", other),
        }
    }

    #[test]
    fn test_async_rejection_at_decoration_time() {
        let source = "
@tco
async def f(n):
    if n == 0:
        return 0
    return f(n - 1)
";
        let module = parse(source).expect("parse failed");
        let mut interpreter = Interpreter::new();
        let error = interpreter
            .interpret(&module)
            .expect_err("decoration should fail");
        assert!(matches!(
            error,
            RuntimeError::TailRecursion(TailRecursionError::AsyncRejected { .. })
        ));
    }

    #[test]
    fn test_nested_function_rejected_when_outer_runs() {
        let source = "
def outer():
    @tco
    def inner(n):
        if n == 0:
            return 0
        return inner(n - 1)
    return inner(5)
";
        // Defining `outer` succeeds; the decoration only runs with it
        let mut interpreter = interpreter_for(source);

        let error = interpreter
            .call_global("outer", Vec::new())
            .expect_err("nested decoration should fail");
        match error {
            RuntimeError::TailRecursion(TailRecursionError::NestedRejected { qualname }) => {
                assert_eq!(qualname, "outer.<locals>.inner");
            }
            other => panic!("expected NestedRejected, got: {}", other),
        }
    }

    #[test]
    fn test_generator_rejected_at_decoration_time() {
        let source = "
@tco
def gen(n):
    yield n
    return gen(n - 1)
";
        let module = parse(source).expect("parse failed");
        let mut interpreter = Interpreter::new();
        let error = interpreter
            .interpret(&module)
            .expect_err("decoration should fail");
        assert!(matches!(
            error,
            RuntimeError::TailRecursion(TailRecursionError::GeneratorRejected { .. })
        ));
    }

    #[test]
    fn test_source_unavailable_for_builtins() {
        let source = "tco(len)";
        let module = parse(source).expect("parse failed");
        let mut interpreter = Interpreter::new();
        let error = interpreter
            .interpret(&module)
            .expect_err("decorating a builtin should fail");
        assert!(matches!(
            error,
            RuntimeError::TailRecursion(TailRecursionError::SourceUnavailable { .. })
        ));
    }

    #[test]
    fn test_factory_decorator_form() {
        let source = "
@tco()
def down(n):
    if n == 0:
        return 0
    return down(n - 1)
";
        let mut interpreter = interpreter_for(source);
        // Far past the recursion limit, so the factory form really optimized
        assert_eq!(
            call_str(&mut interpreter, "down", vec![Value::from(100_000)]),
            "0"
        );
    }

    #[test]
    fn test_parameter_update_is_atomic() {
        let source = "
@tco
def swap_until(n, a, b):
    if n == 0:
        return a, b
    return swap_until(n - 1, b, a)
";
        let mut interpreter = interpreter_for(source);
        assert_eq!(
            call_str(
                &mut interpreter,
                "swap_until",
                vec![Value::from(3), Value::from(1), Value::from(2)]
            ),
            "(2, 1)"
        );
        assert_eq!(
            call_str(
                &mut interpreter,
                "swap_until",
                vec![Value::from(4), Value::from(1), Value::from(2)]
            ),
            "(1, 2)"
        );
    }

    #[test]
    fn test_globals_visible_after_decoration() {
        let source = "
multiplier = 2


@tco
def multiply_factorial(n, acc=1):
    if n == 0:
        return acc * multiplier
    return multiply_factorial(n - 1, acc * n)
";
        let mut interpreter = interpreter_for(source);
        assert_eq!(
            call_str(&mut interpreter, "multiply_factorial", vec![Value::from(5)]),
            "240"
        );
    }

    #[test]
    fn test_metadata_preserved_on_optimized_function() {
        let source = "
@tco
def factorial(n: int, acc: int = 1) -> int:
    \"\"\"Tail-recursive factorial.\"\"\"
    if n == 0:
        return acc
    return factorial(n - 1, acc * n)
";
        let interpreter = interpreter_for(source);
        let Some(Value::Function(func)) = interpreter.get_global("factorial") else {
            panic!("expected a function");
        };

        assert_eq!(func.name, "factorial");
        assert_eq!(func.qualname, "factorial");
        assert_eq!(func.docstring.as_deref(), Some("Tail-recursive factorial."));
        assert_eq!(func.returns.as_deref(), Some("int"));
        assert_eq!(func.params.len(), 2);
        assert_eq!(func.params[0].name, "n");
        assert_eq!(func.params[0].annotation.as_deref(), Some("int"));
        assert_eq!(func.params[1].name, "acc");
        assert_eq!(
            func.params[1].default.as_ref().map(|d| d.to_string()),
            Some("1".to_string())
        );
    }

    #[test]
    fn test_defaults_still_work_after_optimization() {
        let mut interpreter = interpreter_for(FIB);
        // Defaults bound at call time, keywords remapped
        assert_eq!(
            call_str(&mut interpreter, "fib", vec![Value::from(10)]),
            "55"
        );
        let result = interpreter
            .call_global("fib", vec![Value::from(10), Value::from(0), Value::from(1)])
            .expect("explicit arguments failed");
        assert_eq!(result.to_string(), "55");
    }

    #[test]
    fn test_call_time_errors_pass_through_unwrapped() {
        let source = "
@tco
def g(n):
    if n == 0:
        return 1 // 0
    return g(n - 1)
";
        let mut interpreter = interpreter_for(source);
        let error = interpreter
            .call_global("g", vec![Value::from(3)])
            .expect_err("expected division failure");
        assert!(matches!(error, RuntimeError::ZeroDivision));
    }

    #[test]
    fn test_optimized_function_is_reentrant() {
        // Two interleaved calls cannot share trampoline state
        let source = "
@tco
def sum_to_n(n, acc=0):
    if n == 0:
        return acc
    return sum_to_n(n - 1, acc + n)


def both(n, m):
    return sum_to_n(n) + sum_to_n(m)
";
        let mut interpreter = interpreter_for(source);
        assert_eq!(
            call_str(
                &mut interpreter,
                "both",
                vec![Value::from(100), Value::from(10)]
            ),
            "5105"
        );
    }

    #[test]
    fn test_list_length_via_slicing() {
        let source = "
@tco
def list_length(lst, acc=0):
    if not lst:
        return acc
    return list_length(lst[1:], acc + 1)


n = list_length(range(2000))
";
        let interpreter = interpreter_for(source);
        assert_eq!(
            interpreter.get_global("n").expect("missing global").to_string(),
            "2000"
        );
    }

    #[test]
    fn test_reverse_string() {
        let source = "
@tco
def reverse_string(s, acc=\"\"):
    if len(s) == 0:
        return acc
    return reverse_string(s[1:], s[0] + acc)
";
        let mut interpreter = interpreter_for(source);
        assert_eq!(
            call_str(&mut interpreter, "reverse_string", vec![Value::from("tailspin")]),
            "nipsliat"
        );
    }

    #[test]
    fn test_equivalence_under_raised_bound() {
        with_deep_stack(|| {
            let unoptimized = "
def sum_to_n(n, acc=0):
    if n == 0:
        return acc
    return sum_to_n(n - 1, acc + n)
";
            let module = parse(unoptimized).expect("parse failed");
            let mut plain = Interpreter::new();
            plain.interpret(&module).expect("runtime error");

            // Fails under the default bound
            let result = plain.call_global("sum_to_n", vec![Value::from(5000)]);
            assert!(matches!(result, Err(RuntimeError::RecursionDepth)));

            // Terminates under a raised bound
            plain.set_recursion_limit(10_000);
            let expected = plain
                .call_global("sum_to_n", vec![Value::from(5000)])
                .expect("raised-bound call failed")
                .to_string();

            // The optimized form gets the same answer under the default bound
            let optimized = "
@tco
def sum_to_n(n, acc=0):
    if n == 0:
        return acc
    return sum_to_n(n - 1, acc + n)
";
            let module = parse(optimized).expect("parse failed");
            let mut interpreter = Interpreter::new();
            interpreter.interpret(&module).expect("runtime error");
            let actual = interpreter
                .call_global("sum_to_n", vec![Value::from(5000)])
                .expect("optimized call failed")
                .to_string();

            assert_eq!(actual, expected);
            assert_eq!(actual, "12502500");
        });
    }
}
