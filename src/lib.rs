/*!
trenza-lib
=====

This crate provides a pattern-based rewrite optimizer for dataflow router configurations.
A configuration declares named elements, each a typed processing node with a configuration
argument string, and connections between their numbered ports. The optimizer reads a target
configuration plus pattern files, repeatedly locates subgraphs isomorphic to a pattern, and
substitutes the pattern's replacement, until no pattern matches. The result is written back
in the configuration language.

# Usage

This crate is `trenza-lib`. To use it add `trenza-lib` to your dependencies in your
project's `Cargo.toml`. The companion binary `trenza` wraps [optimize] behind a command
line reading and writing configuration files.

```toml
[dependencies]
trenza-lib = "0.1"
```

# Configuration syntax

A configuration file contains declarations, connections, and compound class definitions.

```ignore
//declare two queues and a sink
inq, outq :: Queue(100);
sink :: Discard;

//connect output port 1 of inq to input port 0 of sink
inq [1] -> [0] sink;
//ports default to 0 and chains are allowed
outq -> sink;

//a compound class; input and output mark its boundary
elementclass Clean {
	strip :: Strip(14);
	input -> strip -> output;
}
c :: Clean;
```

# Pattern files

A pattern file is an ordinary configuration file in which every compound class `X`
accompanied by a compound class `X_Replacement` defines a rewrite rule. The class
bodies use their `input`/`output` tunnels to mark the boundary of the matched region,
and `$variable` configuration arguments unify against whatever the target supplies,
consistently across the pattern:

```ignore
elementclass Fuse {
	f :: Shaper($rate);
	g :: Queue($len);
	input -> f -> g -> output;
}
elementclass Fuse_Replacement {
	fg :: ShapedQueue($rate, $len);
	input -> fg -> output;
}
```

Patterns are applied greedily in declaration order until a full pass rewrites nothing.
Elements inserted by a rewrite are stamped with the id of the pattern that produced
them, and a match consisting solely of such elements is rejected, which keeps a rule
whose replacement matches its own pattern from looping.
*/

pub mod config_parser;
pub mod error;
pub mod pattern;
pub mod router;

use log::{debug, info};

use error::ErrorSink;
use pattern::{Matcher, PatternPair};
use router::Router;

/**
Apply `patterns` to `target` until no pattern matches.

Every element's provenance stamp is cleared first, so the current element complement
is known not to come from replacements. Each pass tries the patterns in declaration
order; the first validated match is rewritten and the pass restarts. Returns the
number of rewrites performed. Termination is the pattern author's responsibility:
a rule is safe when its replacement contains no fresh match of its own pattern.
**/
pub fn optimize(target:&mut Router, patterns:&[PatternPair], sink:&mut dyn ErrorSink) -> usize
{
	for i in 0..target.nelements()
	{
		target.element_mut(i).flags = 0;
	}
	let mut rewrites = 0;
	let mut progress = true;
	while progress
	{
		progress = false;
		for (index,pair) in patterns.iter().enumerate()
		{
			let mut matcher = Matcher::new(pair, index+1, sink);
			if matcher.next_match(target)
			{
				matcher.replace(target, sink);
				rewrites += 1;
				info!("applied pattern '{}' (rewrite {})", pair.name, rewrites);
				progress = true;
				break;
			}
			debug!("pattern '{}' is exhausted for this pass", pair.name);
		}
	}
	info!("optimization finished after {} rewrites", rewrites);
	rewrites
}

///Get the number currently written in the Cargo.toml field `version`.
pub fn get_version_number() -> &'static str
{
	match option_env!("CARGO_PKG_VERSION")
	{
		Some( version ) => version,
		_ => "?",
	}
}
