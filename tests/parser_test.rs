mod common;

use common::*;
use trenza_lib::config_parser::{parse_router, unparse_router};
use trenza_lib::error::{ErrorSink, SilentSink};

#[test]
fn declarations_connections_and_chains()
{
    let router = parse_clean("src :: Source;\nq :: Queue(100);\nsink :: Discard;\nsrc -> q -> sink;\n");
    assert_eq!(element_names(&router), vec!["src", "q", "sink"]);
    assert_eq!(router.nconnections(), 2);
    assert!(connected(&router, ("src", 0), ("q", 0)));
    assert!(connected(&router, ("q", 0), ("sink", 0)));
}

#[test]
fn ports_and_comments()
{
    let text = "\
        //a classifier fanning out\n\
        cl :: Classifier(12/0800, -);\n\
        a, b :: Counter; /* shared declaration */\n\
        cl [1] -> b;\n\
        cl -> a;\n\
        a -> [1] b;\n";
    let router = parse_clean(text);
    assert!(connected(&router, ("cl", 1), ("b", 0)));
    assert!(connected(&router, ("cl", 0), ("a", 0)));
    assert!(connected(&router, ("a", 0), ("b", 1)));
    assert_eq!(router.configuration(router.eindex("cl").unwrap()), "12/0800, -");
}

#[test]
fn emission_round_trips()
{
    let text = "cl :: Classifier(12/0800, -);\na :: Counter;\nb :: Counter;\n\ncl [1] -> b;\ncl -> a;\na -> [1] b;\n";
    let router = parse_clean(text);
    let emitted = unparse_router(&router);
    assert_eq!(emitted, text);
    //and the emission parses back to the same emission
    let reparsed = parse_clean(&emitted);
    assert_eq!(unparse_router(&reparsed), emitted);
}

#[test]
fn compound_instances_flatten_under_their_name()
{
    let text = "\
        elementclass Clean {\n\
            strip :: Strip(14);\n\
            check :: CheckHeader;\n\
            input -> strip -> check -> output;\n\
        }\n\
        src :: Source;\n\
        c :: Clean;\n\
        sink :: Discard;\n\
        src -> c -> sink;\n";
    let mut router = parse_clean(text);
    let mut sink = SilentSink::new();
    router.flatten(&mut sink);
    assert_eq!(sink.nerrors(), 0);
    assert_eq!(element_names(&router), vec!["src", "sink", "c/strip", "c/check"]);
    assert!(connected(&router, ("src", 0), ("c/strip", 0)));
    assert!(connected(&router, ("c/strip", 0), ("c/check", 0)));
    assert!(connected(&router, ("c/check", 0), ("sink", 0)));
}

#[test]
fn nested_compounds_flatten_recursively()
{
    let text = "\
        elementclass Inner {\n\
            f :: Filter;\n\
            input -> f -> output;\n\
        }\n\
        elementclass Outer {\n\
            i :: Inner;\n\
            input -> i -> output;\n\
        }\n\
        a :: Source;\n\
        o :: Outer;\n\
        b :: Discard;\n\
        a -> o -> b;\n";
    let mut router = parse_clean(text);
    let mut sink = SilentSink::new();
    router.flatten(&mut sink);
    assert_eq!(sink.nerrors(), 0);
    assert_eq!(element_names(&router), vec!["a", "b", "o/i/f"]);
    assert!(connected(&router, ("a", 0), ("o/i/f", 0)));
    assert!(connected(&router, ("o/i/f", 0), ("b", 0)));
}

#[test]
fn problems_are_reported_with_landmarks()
{
    let mut sink = SilentSink::new();
    let router = parse_router("a :: A;\na :: B;\nq -> a;\n", "bad.cfg", &mut sink);
    assert!(router.is_some());
    assert_eq!(sink.nerrors(), 2);
    assert!(sink.messages[0].starts_with("bad.cfg:2"), "got {:?}", sink.messages);
    assert!(sink.messages[1].starts_with("bad.cfg:3"), "got {:?}", sink.messages);
}

#[test]
fn syntax_errors_fail_the_read()
{
    let mut sink = SilentSink::new();
    let router = parse_router("a :: ;", "bad.cfg", &mut sink);
    assert!(router.is_none());
    assert!(sink.nerrors() > 0);
}
