/*!

Patterns and replacements.

A pattern file is an ordinary configuration file. Every compound class `X` declared
together with a compound class `X_Replacement` defines a [PatternPair]: matches of
`X` in the target router are rewritten into `X_Replacement`. Within a pattern the
boundary is marked by its `input` and `output` tunnels; configuration arguments may
be `$variable` placeholders, unified consistently across the pattern's elements.

*/

pub mod matcher;
pub mod rewrite;

use std::collections::HashMap;
use std::path::Path;

use crate::config_parser;
use crate::error::ErrorSink;
use crate::router::Router;

pub use self::matcher::Matcher;

///Suffix marking the replacement half of a pattern pair.
pub const REPLACEMENT_SUFFIX: &str = "_Replacement";

///A subgraph pattern together with its replacement.
#[derive(Clone,Debug)]
pub struct PatternPair
{
    ///The base class name, also used as the prefix of spliced replacements.
    pub name: String,
    ///The pattern body, flattened at load time.
    pub pattern: Router,
    ///The replacement body, kept as declared.
    pub replacement: Router,
}

///Read a pattern file and collect its pattern pairs, in declaration order.
///Problems reading or parsing count into the sink like any other configuration error.
pub fn read_pattern_file(path:&Path, sink:&mut dyn ErrorSink) -> Vec<PatternPair>
{
    match config_parser::read_router_file(Some(path), sink)
    {
        Some(file_router) => collect_pattern_pairs(&file_router, sink),
        None => vec![],
    }
}

///Scan the file-scope class table for `X`/`X_Replacement` pairs.
pub fn collect_pattern_pairs(file_router:&Router, sink:&mut dyn ErrorSink) -> Vec<PatternPair>
{
    let mut pairs = vec![];
    for t in 0..file_router.ntypes()
    {
        let type_name = file_router.type_name(t);
        if type_name.len() <= REPLACEMENT_SUFFIX.len() || !type_name.ends_with(REPLACEMENT_SUFFIX)
        {
            continue;
        }
        let base = &type_name[..type_name.len()-REPLACEMENT_SUFFIX.len()];
        let replacement = match file_router.type_compound(t)
        {
            Some(body) => body,
            None => continue,
        };
        if let Some(pattern_body) = file_router.type_compound_by_name(base)
        {
            let mut pattern = (**pattern_body).clone();
            pattern.flatten(sink);
            pairs.push(PatternPair{
                name: base.to_string(),
                pattern,
                replacement: (**replacement).clone(),
            });
        }
    }
    pairs
}

///Whether an argument is a well-formed placeholder: `$` followed by one or
///more alphanumeric or underscore characters.
pub fn is_placeholder(arg:&str) -> bool
{
    arg.len() > 1 && arg.starts_with('$') && arg[1..].chars().all(|c| c.is_ascii_alphanumeric() || c=='_')
}

/**
Unify a pattern configuration against a target configuration.

Both are split into argument vectors; differing lengths fail. Position by position,
equal arguments unify trivially and a well-formed placeholder binds to the target
argument, consistently with `defs` and with its other occurrences in this call.
Only on success is the call's tentative binding set merged into `defs`, so a failed
attempt leaves `defs` as it was.
**/
pub fn unify_configuration(pattern_config:&str, target_config:&str, defs:&mut HashMap<String,String>) -> bool
{
    let patvec = config_parser::split_args(pattern_config);
    let confvec = config_parser::split_args(target_config);
    if patvec.len() != confvec.len()
    {
        return false;
    }
    let mut my_defs: HashMap<String,String> = HashMap::new();
    for (pat,conf) in patvec.iter().zip(confvec.iter())
    {
        if pat == conf
        {
            continue;
        }
        if !is_placeholder(pat)
        {
            return false;
        }
        if let Some(bound) = defs.get(pat)
        {
            if bound != conf
            {
                return false;
            }
        }
        else if let Some(bound) = my_defs.get(pat)
        {
            if bound != conf
            {
                return false;
            }
        }
        else
        {
            my_defs.insert(pat.clone(), conf.clone());
        }
    }
    defs.extend(my_defs);
    true
}

///Replace every whole-argument placeholder bound in `defs` by its binding.
///Returns `None` when nothing changed, so callers keep the original text byte-stable.
pub(crate) fn substitute_configuration(configuration:&str, defs:&HashMap<String,String>) -> Option<String>
{
    let mut args = config_parser::split_args(configuration);
    let mut changed = false;
    for arg in args.iter_mut()
    {
        if arg.len() <= 1 || !arg.starts_with('$')
        {
            continue;
        }
        if let Some(value) = defs.get(arg.as_str())
        {
            *arg = value.clone();
            changed = true;
        }
    }
    if changed
    {
        Some(config_parser::join_args(&args))
    }
    else
    {
        None
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn unify_binds_and_checks()
    {
        let mut defs = HashMap::new();
        assert!(unify_configuration("$a, 2, $a", "1, 2, 1", &mut defs));
        assert_eq!(defs.get("$a").map(|s| s.as_str()), Some("1"));
        //a bound placeholder must keep its value across elements
        assert!(!unify_configuration("$a", "7", &mut defs));
        assert!(unify_configuration("$a", "1", &mut defs));
    }

    #[test]
    fn unify_rejects_inconsistent_occurrences()
    {
        let mut defs = HashMap::new();
        assert!(!unify_configuration("$a, $a", "1, 2", &mut defs));
        //the failed attempt must not leak bindings
        assert!(defs.is_empty());
    }

    #[test]
    fn unify_rejects_malformed_placeholders()
    {
        let mut defs = HashMap::new();
        assert!(!unify_configuration("$", "1", &mut defs));
        assert!(!unify_configuration("$a-b", "1", &mut defs));
        assert!(!unify_configuration("plain", "1", &mut defs));
        //though a malformed placeholder equal to the target is fine
        assert!(unify_configuration("$a-b", "$a-b", &mut defs));
    }

    #[test]
    fn unify_requires_equal_lengths()
    {
        let mut defs = HashMap::new();
        assert!(!unify_configuration("1, 2", "1", &mut defs));
    }

    #[test]
    fn substitution_round_trips_bindings()
    {
        let mut defs = HashMap::new();
        assert!(unify_configuration("$rate, 5", "100, 5", &mut defs));
        assert_eq!(substitute_configuration("$rate, 5", &defs).as_deref(), Some("100, 5"));
        assert_eq!(substitute_configuration("$other, 5", &defs), None);
    }
}
