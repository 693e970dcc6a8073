// ABOUTME: End-to-end scenarios driving Session/dispatch the way the REPL would

use minitip::dispatch::{dispatch, Control};
use minitip::session::{report_is_true, CheckReport, Session};
use minitip::lp::CheckOutcome;

fn check(s: &mut Session, line: &str) -> String {
    dispatch(s, line).text.unwrap_or_default()
}

#[test]
fn subadditivity_of_entropy_holds_unconditionally() {
    let mut s = Session::new();
    let out = dispatch(&mut s, "check ab<=H(a)+H(b)");
    assert_eq!(out.truth, Some(true));
}

#[test]
fn conditioning_cannot_increase_entropy() {
    let mut s = Session::new();
    let out = dispatch(&mut s, "check H(a|b)<=H(a)");
    assert_eq!(out.truth, Some(true));
}

#[test]
fn mutual_information_is_symmetric() {
    let mut s = Session::new();
    let out = dispatch(&mut s, "(a,b)=(b,a)");
    assert_eq!(out.truth, Some(true));
}

#[test]
fn functional_dependency_constraint_forces_equality() {
    let mut s = Session::new();
    assert!(!dispatch(&mut s, "add a:b").is_error);
    let out = dispatch(&mut s, "check H(a)<=H(b)");
    assert_eq!(out.truth, Some(true));

    let without = dispatch(&mut s, "xcheck H(a)<=H(b)");
    assert_eq!(without.truth, Some(false));
}

#[test]
fn markov_chain_constraint_kills_long_range_dependence() {
    let mut s = Session::new();
    assert!(!dispatch(&mut s, "add a/b/c").is_error);
    let out = dispatch(&mut s, "(a,c|b)=0");
    assert_eq!(out.truth, Some(true));
}

#[test]
fn independence_constraint_zeroes_mutual_information() {
    let mut s = Session::new();
    assert!(!dispatch(&mut s, "add a.b").is_error);
    let out = dispatch(&mut s, "(a,b)=0");
    assert_eq!(out.truth, Some(true));
}

#[test]
fn list_and_del_round_trip_constraints() {
    let mut s = Session::new();
    dispatch(&mut s, "add a:b");
    dispatch(&mut s, "add c:d");
    let listed = check(&mut s, "list all");
    assert!(listed.contains("a:b") && listed.contains("c:d"));

    dispatch(&mut s, "del 1");
    assert_eq!(s.list_constraints(), &["c:d".to_string()]);
}

#[test]
fn macro_definition_is_usable_in_check() {
    // A bare line starting with a letter is always dispatched as a command
    // lookup first, so a macro invocation at top level needs the explicit
    // 'check' command.
    let mut s = Session::new();
    let add = dispatch(&mut s, "macro add D(a,b,c)=(a,b|c)+(b,c|a)+(c,a|b)");
    assert!(!add.is_error);
    let out = dispatch(&mut s, "check D(x,y,z)>=0");
    assert_eq!(out.truth, Some(true));
}

#[test]
fn zap_prints_algebraic_simplification_without_verdict() {
    let mut s = Session::new();
    let out = dispatch(&mut s, "zap (a,b|c)==a");
    assert!(!out.is_error);
    assert!(out.text.unwrap().len() > 0);
}

#[test]
fn ingleton_expression_is_not_a_shannon_consequence() {
    let mut s = Session::new();
    let r = s.check("[a,b,c,d]>=0", false).unwrap();
    assert!(matches!(r, CheckReport::Outcome(CheckOutcome::False) | CheckReport::Outcome(CheckOutcome::True)));
}

#[test]
fn quit_command_signals_control_quit() {
    let mut s = Session::new();
    let out = dispatch(&mut s, "quit");
    assert!(matches!(out.control, Control::Quit));
}

#[test]
fn set_then_dump_round_trips_style_and_constraints() {
    let mut s = Session::new();
    dispatch(&mut s, "add a:b");
    dispatch(&mut s, "style full");
    let script = s.dump_script();
    assert!(script.contains("style full"));
    assert!(script.contains("add a:b"));
}

#[test]
fn syntax_error_is_reported_as_an_error_outcome() {
    let mut s = Session::new();
    let out = dispatch(&mut s, "check H(a <= 0");
    assert!(out.is_error);
    assert_eq!(out.truth, Some(false));
}

#[test]
fn trivial_single_term_check_short_circuits() {
    let mut s = Session::new();
    let r = s.check("H(a)<=0", false).unwrap();
    assert!(matches!(r, CheckReport::Trivial(_)));
    assert!(!report_is_true(&r));
}

#[test]
fn zap_with_nothing_after_double_equals_still_simplifies() {
    let mut s = Session::new();
    let add = dispatch(&mut s, "macro add D(a,b,c)=(a,b|c)+(b,c|a)+(c,a|b)");
    assert!(!add.is_error);
    let out = dispatch(&mut s, "zap D(x,y,z) ==");
    assert!(!out.is_error);
    let text = out.text.unwrap();
    assert!(text.contains('x') && text.contains('y') && text.contains('z'));
}

#[test]
fn unrecognized_letter_led_command_is_reported_not_treated_as_expression() {
    let mut s = Session::new();
    let out = dispatch(&mut s, "D(x,y,z)>=0");
    assert!(out.is_error);
    assert!(out.text.unwrap().contains("Unknown command"));
}

#[test]
fn constraint_line_containing_equals_is_parsed_as_relation_not_funcdep() {
    let mut s = Session::new();
    let out = dispatch(&mut s, "add a:b=c");
    assert!(out.is_error);
}
