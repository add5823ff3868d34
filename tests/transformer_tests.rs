#[cfg(test)]
mod tests {
    use tailspin::optimizer::rewrite_function;
    use tailspin::{find_function, parse, show_transformed_code, TailRecursionError};

    /// Replace the random 16-hex-digit tags in generated names with stable
    /// numbered placeholders, so transformed code can be compared against
    /// golden strings. Each distinct tag gets its own number in order of
    /// first appearance.
    fn normalize(code: &str) -> String {
        let mut tags: Vec<String> = Vec::new();
        let mut out = String::new();
        let mut rest = code;

        while let Some(pos) = rest.find("_tco_") {
            out.push_str(&rest[..pos]);
            let after = &rest[pos..];
            let prefix = if after.starts_with("_tco_resume_") {
                "_tco_resume_"
            } else {
                "_tco_"
            };
            let tail = &after[prefix.len()..];
            let hex: String = tail.chars().take_while(|c| c.is_ascii_hexdigit()).collect();

            if hex.len() == 16 && tail[hex.len()..].starts_with('_') {
                let number = match tags.iter().position(|t| t == &hex) {
                    Some(i) => i + 1,
                    None => {
                        tags.push(hex.clone());
                        tags.len()
                    }
                };
                out.push_str(prefix);
                out.push_str(&format!("P{}_", number));
                rest = &tail[hex.len() + 1..];
            } else {
                out.push_str(prefix);
                rest = tail;
            }
        }

        out.push_str(rest);
        out
    }

    fn transform(source: &str, name: &str) -> String {
        show_transformed_code(source, name).expect("transformation failed")
    }

    fn transform_error(source: &str, name: &str) -> TailRecursionError {
        let module = parse(source).expect("parse failed");
        let def = find_function(&module, name).expect("function not found");
        rewrite_function(def, name).expect_err("expected transformation to fail")
    }

    #[test]
    fn test_factorial_golden_snapshot() {
        let source = "
@tco
def factorial(n: int, acc: int = 1) -> int:
    if n == 0:
        return acc
    return factorial(n - 1, acc * n)
";
        let expected = "\
def factorial(n: int, acc: int = 1) -> int:
    _tco_P1_n = n
    _tco_P1_acc = acc
    while True:
        if _tco_P1_n == 0:
            return _tco_P1_acc
        _tco_P1_n, _tco_P1_acc = _tco_P1_n - 1, _tco_P1_acc * _tco_P1_n
        continue
";
        assert_eq!(normalize(&transform(source, "factorial")), expected);
    }

    #[test]
    fn test_nested_loops_golden_snapshot() {
        let source = "
def f(n):
    while n > 0:
        for i in range(3):
            return f(n - 1)
    return 0
";
        let expected = "\
def f(n):
    _tco_P1_n = n
    while True:
        _tco_resume_P2_0 = False
        while _tco_P1_n > 0:
            _tco_resume_P2_1 = False
            for i in range(3):
                _tco_P1_n = _tco_P1_n - 1
                _tco_resume_P2_1 = True
                break
            if _tco_resume_P2_1:
                _tco_resume_P2_0 = True
                break
        if _tco_resume_P2_0:
            continue
        return 0
";
        assert_eq!(normalize(&transform(source, "f")), expected);
    }

    #[test]
    fn test_conditional_return_expands_to_statement() {
        let source = "
def f(n):
    return 0 if n <= 0 else f(n - 1)
";
        let expected = "\
def f(n):
    _tco_P1_n = n
    while True:
        if _tco_P1_n <= 0:
            return 0
        else:
            _tco_P1_n = _tco_P1_n - 1
            continue
";
        assert_eq!(normalize(&transform(source, "f")), expected);
    }

    #[test]
    fn test_keyword_arguments_remap_to_positional_slots() {
        let source = "
def fib(n, a=0, b=1):
    if n == 0:
        return a
    if n == 1:
        return b
    return fib(b=b + a, n=n - 1)
";
        let code = normalize(&transform(source, "fib"));
        // Keywords land in declared order; the missing `a` takes its default
        assert!(code.contains(
            "_tco_P1_n, _tco_P1_a, _tco_P1_b = _tco_P1_n - 1, 0, _tco_P1_b + _tco_P1_a"
        ));
    }

    #[test]
    fn test_missing_positional_argument_takes_default() {
        let source = "
def sum_to(n, acc=0):
    if n == 0:
        return acc
    return sum_to(n - 1)
";
        let code = normalize(&transform(source, "sum_to"));
        assert!(code.contains("_tco_P1_n, _tco_P1_acc = _tco_P1_n - 1, 0"));
    }

    #[test]
    fn test_single_parameter_uses_plain_assignment() {
        let source = "
def f(n):
    if n == 0:
        return 0
    return f(n - 1)
";
        let code = normalize(&transform(source, "f"));
        assert!(code.contains("_tco_P1_n = _tco_P1_n - 1\n"));
        assert!(code.contains("continue\n"));
    }

    #[test]
    fn test_non_tail_returns_are_substituted() {
        let source = "
def f(n, acc=1):
    if n == 0:
        return acc * 2
    return f(n - 1, acc)
";
        let code = normalize(&transform(source, "f"));
        assert!(code.contains("return _tco_P1_acc * 2"));
    }

    #[test]
    fn test_parameter_writes_are_substituted() {
        let source = "
def f(n):
    n = n - 1
    if n <= 0:
        return 0
    return f(n)
";
        let code = normalize(&transform(source, "f"));
        assert!(code.contains("_tco_P1_n = _tco_P1_n - 1"));
        // The declared parameter no longer appears as a bare reference
        // inside the trampoline
        let trampoline = code.split("while True:").nth(1).unwrap();
        for token_line in trampoline.lines() {
            assert!(
                !token_line.contains(" n ") && !token_line.ends_with(" n"),
                "unsubstituted parameter read in: {}",
                token_line
            );
        }
    }

    #[test]
    fn test_own_decorator_is_stripped_in_every_spelling() {
        for decorator in ["@tco", "@tco()", "@tailspin.tco", "@tailspin.tco()"] {
            let source = format!(
                "
{}
def f(n):
    if n == 0:
        return 0
    return f(n - 1)
",
                decorator
            );
            let code = transform(&source, "f");
            assert!(
                !code.contains('@'),
                "decorator {} survived the stripping pass",
                decorator
            );
        }
    }

    #[test]
    fn test_foreign_decorators_are_preserved() {
        let source = "
@trace
@tco
def f(n):
    if n == 0:
        return 0
    return f(n - 1)
";
        let code = transform(source, "f");
        assert!(code.contains("@trace"));
        assert!(!code.contains("@tco"));
    }

    #[test]
    fn test_loop_without_tail_call_gets_no_sentinel() {
        let source = "
def f(n, acc=0):
    for i in range(3):
        acc = acc + i
    if n == 0:
        return acc
    return f(n - 1, acc)
";
        let code = normalize(&transform(source, "f"));
        assert!(!code.contains("_tco_resume_"));
    }

    #[test]
    fn test_loop_else_is_preserved() {
        let source = "
def f(n):
    for i in range(3):
        return f(n - 1)
    else:
        n = 0
    return n
";
        let code = normalize(&transform(source, "f"));
        assert!(code.contains("else:"));
        // The sentinel check comes after the loop statement, else included
        let else_pos = code.find("else:").unwrap();
        let check_pos = code.find("if _tco_resume_").unwrap();
        assert!(check_pos > else_pos);
    }

    #[test]
    fn test_fallthrough_body_gets_return_none() {
        let source = "
def f(n):
    for i in range(3):
        return f(n - 1)
";
        let code = normalize(&transform(source, "f"));
        assert!(code.trim_end().ends_with("return"));
    }

    #[test]
    fn test_fresh_names_do_not_capture_user_names() {
        let source = "
def f(n, _tco_trap=0):
    _tco_resume_guard = n
    if _tco_resume_guard == 0:
        return _tco_trap
    return f(n - 1, _tco_trap)
";
        let code = transform(source, "f");

        // Collect the random tags the transformer generated and check none
        // of them appear in the user's source
        let normalized = normalize(&code);
        assert!(normalized.contains("_tco_P"));
        for tag in generated_tags(&code) {
            assert!(
                !source.contains(&tag),
                "generated tag {} collides with source",
                tag
            );
        }

        // The user's own _tco_-ish names survive untouched
        assert!(code.contains("_tco_resume_guard"));
    }

    fn generated_tags(code: &str) -> Vec<String> {
        let mut tags = Vec::new();
        let mut rest = code;
        while let Some(pos) = rest.find("_tco_") {
            let after = &rest[pos..];
            let prefix_len = if after.starts_with("_tco_resume_") {
                "_tco_resume_".len()
            } else {
                "_tco_".len()
            };
            let tail = &after[prefix_len..];
            let hex: String = tail.chars().take_while(|c| c.is_ascii_hexdigit()).collect();
            if hex.len() == 16 && tail[hex.len()..].starts_with('_') {
                tags.push(hex);
            }
            rest = &after[prefix_len..];
        }
        tags.sort();
        tags.dedup();
        tags
    }

    #[test]
    fn test_pretty_printer_is_idempotent_modulo_fresh_names() {
        let source = "
def fib(n, a=0, b=1):
    if n == 0:
        return a
    if n == 1:
        return b
    return fib(n - 1, b, a + b)
";
        let first = normalize(&transform(source, "fib"));
        let second = normalize(&transform(source, "fib"));
        assert_eq!(first, second);
    }

    #[test]
    fn test_rejects_unknown_keyword_argument() {
        let error = transform_error(
            "
def f(n):
    if n == 0:
        return 0
    return f(m=n - 1)
",
            "f",
        );
        assert!(matches!(
            error,
            TailRecursionError::ArgumentShape { line: 5, .. }
        ));
    }

    #[test]
    fn test_rejects_too_many_positional_arguments() {
        let error = transform_error(
            "
def f(n):
    if n == 0:
        return 0
    return f(n - 1, 2)
",
            "f",
        );
        assert!(matches!(error, TailRecursionError::ArgumentShape { .. }));
    }

    #[test]
    fn test_rejects_missing_argument_without_default() {
        let error = transform_error(
            "
def f(n, k):
    if n == 0:
        return 0
    return f(n - 1)
",
            "f",
        );
        assert!(matches!(error, TailRecursionError::ArgumentShape { .. }));
    }

    #[test]
    fn test_rejects_duplicate_argument_binding() {
        let error = transform_error(
            "
def f(n):
    if n == 0:
        return 0
    return f(n - 1, n=n - 1)
",
            "f",
        );
        assert!(matches!(error, TailRecursionError::ArgumentShape { .. }));
    }

    #[test]
    fn test_rejects_starred_tail_call_argument() {
        let error = transform_error(
            "
def f(n):
    if n == 0:
        return 0
    return f(*n)
",
            "f",
        );
        assert!(matches!(error, TailRecursionError::ArgumentShape { .. }));
    }

    #[test]
    fn test_rejects_variadic_parameter_declarations() {
        let error = transform_error(
            "
def f(n, *rest):
    if n == 0:
        return 0
    return f(n - 1)
",
            "f",
        );
        assert!(matches!(error, TailRecursionError::ArgumentShape { .. }));
    }
}
