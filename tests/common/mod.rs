#![allow(dead_code)]

use trenza_lib::config_parser;
use trenza_lib::error::{ErrorSink, SilentSink};
use trenza_lib::pattern::{collect_pattern_pairs, PatternPair};
use trenza_lib::router::{Endpoint, Router};

/*
    Auxiliary functions shared by the integration tests: parsing helpers that insist on
    error-free input, a one-call optimize over configuration texts, and small graph
    shape queries.
*/

/// Parse a configuration text, requiring it to be free of errors.
pub fn parse_clean(text: &str) -> Router
{
    let mut sink = SilentSink::new();
    let router = config_parser::parse_router(text, "test", &mut sink).expect("configuration parses");
    assert_eq!(sink.nerrors(), 0, "unexpected parse errors: {:?}", sink.messages);
    router
}

/// Parse a pattern file text and collect its pattern pairs.
pub fn parse_patterns(text: &str) -> Vec<PatternPair>
{
    let mut sink = SilentSink::new();
    let file_router = config_parser::parse_router(text, "patterns", &mut sink).expect("pattern file parses");
    let pairs = collect_pattern_pairs(&file_router, &mut sink);
    assert_eq!(sink.nerrors(), 0, "unexpected pattern errors: {:?}", sink.messages);
    pairs
}

/// Parse and flatten a target, apply a pattern file to fixpoint, and return the
/// resulting router together with the number of rewrites performed.
pub fn optimize_text(target: &str, patterns: &str) -> (Router, usize)
{
    let mut sink = SilentSink::new();
    let mut router = parse_clean(target);
    router.flatten(&mut sink);
    let pairs = parse_patterns(patterns);
    let rewrites = trenza_lib::optimize(&mut router, &pairs, &mut sink);
    assert_eq!(sink.nerrors(), 0, "unexpected optimize errors: {:?}", sink.messages);
    (router, rewrites)
}

/// Names of the live non-tunnel elements, in index order.
pub fn element_names(router: &Router) -> Vec<String>
{
    (0..router.nelements())
        .filter(|&i| router.element(i).is_live() && !router.element(i).is_tunnel())
        .map(|i| router.ename(i).to_string())
        .collect()
}

/// Indices of the live elements of a given type.
pub fn elements_of_type(router: &Router, type_name: &str) -> Vec<usize>
{
    (0..router.nelements())
        .filter(|&i| router.element_type_name(i) == Some(type_name))
        .collect()
}

/// Whether a connection exists between the named elements at the given ports.
pub fn connected(router: &Router, from: (&str, usize), to: (&str, usize)) -> bool
{
    let from_element = router.eindex(from.0).expect("from element exists");
    let to_element = router.eindex(to.0).expect("to element exists");
    router.has_connection(Endpoint::new(from_element, from.1), Endpoint::new(to_element, to.1))
}

/// Check the structural invariants that must hold between rewrites: unique names
/// among live elements and no connection endpoint referencing a dead element.
pub fn assert_invariants(router: &Router)
{
    let names = element_names(router);
    let mut deduped = names.clone();
    deduped.sort();
    deduped.dedup();
    assert_eq!(names.len(), deduped.len(), "duplicate element names: {:?}", names);
    for c in 0..router.nconnections()
    {
        let (from, to) = router.connection(c);
        assert!(router.element(from.element).is_live(), "connection {} from a dead element", c);
        assert!(router.element(to.element).is_live(), "connection {} to a dead element", c);
    }
}
