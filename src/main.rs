/*!

The `trenza` command line: read a router configuration and pattern files, apply the
patterns to a fixpoint, write the transformed configuration back out.

*/

use std::env;
use std::path::Path;
use std::process::exit;

use getopts::Options;

use trenza_lib::config_parser;
use trenza_lib::error::{ErrorSink, StderrSink};
use trenza_lib::pattern::{read_pattern_file, PatternPair};
use trenza_lib::{get_version_number, optimize};

fn short_usage(program:&str)
{
	eprintln!("Usage: {} [OPTION]... [ROUTERFILE] [PATTERNFILE]...", program);
	eprintln!("Try '{} --help' for more information.", program);
}

fn usage(program:&str, opts:&Options)
{
	let brief = format!("'{}' replaces patterns of elements with other sets of elements inside\n\
		a router configuration. Both patterns and configuration are written in the\n\
		configuration language. The transformed configuration is written to the\n\
		standard output.\n\n\
		Usage: {} [OPTION]... [ROUTERFILE] [PATTERNFILE]...", program, program);
	println!("{}", opts.usage(&brief));
}

fn main()
{
	env_logger::init();
	let args: Vec<String> = env::args().collect();
	let program = args[0].clone();

	let mut opts = Options::new();
	opts.optopt("f", "file", "Read router configuration from FILE.", "FILE");
	opts.optmulti("p", "patterns", "Read patterns from PATTERNFILE. Can be given more than once.", "PATTERNFILE");
	opts.optopt("o", "output", "Write output to FILE.", "FILE");
	opts.optflag("", "help", "Print this message and exit.");
	opts.optflag("v", "version", "Print version number and exit.");

	let option_matches = match opts.parse(&args[1..])
	{
		Ok(matches) => matches,
		Err(failure) =>
		{
			eprintln!("{}: {}", program, failure);
			short_usage(&program);
			exit(1);
		},
	};
	if option_matches.opt_present("help")
	{
		usage(&program, &opts);
		return;
	}
	if option_matches.opt_present("version")
	{
		println!("trenza {}", get_version_number());
		return;
	}

	let mut sink = StderrSink::new();

	let router_options = option_matches.opt_strs("file");
	let output_options = option_matches.opt_strs("output");
	if output_options.len() > 1
	{
		sink.error("output file specified twice");
		short_usage(&program);
		exit(1);
	}
	let mut router_file: Option<String> = match router_options.len()
	{
		0 => None,
		1 => Some(router_options[0].clone()),
		_ =>
		{
			sink.error("router file specified twice");
			short_usage(&program);
			exit(1);
		},
	};

	//first free argument names the router unless --file already did; the rest are pattern files
	let mut pattern_files: Vec<String> = vec![];
	for (index,free) in option_matches.free.iter().enumerate()
	{
		if index == 0
		{
			if router_file.is_some()
			{
				sink.error("router file specified twice");
				short_usage(&program);
				exit(1);
			}
			router_file = Some(free.clone());
		}
		else
		{
			pattern_files.push(free.clone());
		}
	}
	let mut all_pattern_files: Vec<String> = option_matches.opt_strs("patterns");
	all_pattern_files.append(&mut pattern_files);

	let mut patterns: Vec<PatternPair> = vec![];
	for file in all_pattern_files.iter()
	{
		patterns.extend(read_pattern_file(Path::new(file), &mut sink));
	}

	let router = config_parser::read_router_file(router_file.as_deref().map(Path::new), &mut sink);
	let mut router = match router
	{
		Some(router) if sink.nerrors() == 0 => router,
		_ => exit(1),
	};
	router.flatten(&mut sink);

	if all_pattern_files.is_empty()
	{
		sink.warning("no patterns read");
	}

	optimize(&mut router, &patterns, &mut sink);

	let output_file = output_options.first().map(|name| Path::new(name.as_str()));
	if let Err(error) = config_parser::write_router_file(&router, output_file)
	{
		sink.error(&format!("{}: {}", output_options.first().map(|s| s.as_str()).unwrap_or("<stdout>"), error));
		exit(1);
	}
}
