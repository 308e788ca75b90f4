use super::*;
use pretty_assertions::assert_eq;

#[test]
fn each_name_gets_the_line_running_inside_it() {
    let symbols = SymbolTable::new();
    let file = symbols.intern("app.rb");
    let mut stack = CallStack::new();
    stack.push(symbols.intern("outer"), SourcePosition::new(file, 10));
    stack.push(symbols.intern("inner"), SourcePosition::new(file, 3));

    let bt = stack.capture(SourcePosition::new(file, 7), &symbols);
    assert_eq!(
        bt.lines(),
        vec![
            "app.rb:7:in `inner'".to_string(),
            "app.rb:3:in `outer'".to_string(),
            "app.rb:10:in `<main>'".to_string(),
        ]
    );
    assert_eq!(
        bt.to_string(),
        "app.rb:7:in `inner'\n\tfrom app.rb:3:in `outer'\n\tfrom app.rb:10:in `<main>'\n"
    );
}

#[test]
fn top_level_raise_has_only_main() {
    let symbols = SymbolTable::new();
    let file = symbols.intern("top.rb");
    let bt = CallStack::new().capture(SourcePosition::new(file, 1), &symbols);
    assert_eq!(bt.len(), 1);
    assert_eq!(bt.frames()[0].name, "<main>");
    assert_eq!(EvalBacktrace::default().to_string(), "");
}

#[test]
fn push_and_pop_balance() {
    let symbols = SymbolTable::new();
    let mut stack = CallStack::new();
    assert!(stack.is_empty());
    stack.push(symbols.intern("m"), SourcePosition::default());
    assert_eq!(stack.depth(), 1);
    assert_eq!(stack.innermost(), Some(symbols.intern("m")));
    stack.pop();
    assert!(stack.is_empty());
}
