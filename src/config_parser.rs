/*!

Lexing, parsing and emission of the router configuration language.

A configuration is a sequence of statements:

* `name1, name2 :: Type(configuration);` declares elements,
* `a [1] -> [0] b -> c;` connects ports, with omitted ports defaulting to 0,
* `elementclass Name { ... }` defines a compound element class.

Inside a compound body the reserved names `input` and `output` are implicitly
declared connection tunnels on first use; they demarcate the compound's boundary.
Parsing never aborts: every problem is reported against its `file:line` landmark
through the [ErrorSink] and the offending statement is skipped.

The grammar lives in `config.pest`.

*/

use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;
use std::rc::Rc;

use itertools::Itertools;
use pest::Parser;
use pest::iterators::Pair;

use crate::error::ErrorSink;
use crate::router::{Endpoint, Router, TUNNEL_TYPE};

#[derive(pest_derive::Parser)]
#[grammar = "config.pest"]
struct ConfigParser;

///Compound classes visible at the current parse point, innermost scope last.
struct ClassScope
{
	levels: Vec<Vec<(String, Rc<Router>)>>,
}

impl ClassScope
{
	fn find(&self, name:&str) -> Option<Rc<Router>>
	{
		self.levels.iter().rev().find_map(|level|{
			level.iter().rev().find(|(class_name,_)| class_name==name).map(|(_,body)| body.clone())
		})
	}
}

///Read a router configuration from a file, or from the standard input when `path` is `None`.
///Returns `None` when the file cannot be read or the text does not lex; finer-grained
///problems are reported through the sink while parsing continues.
pub fn read_router_file(path:Option<&Path>, sink:&mut dyn ErrorSink) -> Option<Router>
{
	let (contents, name) = match path
	{
		Some(path) => match fs::read_to_string(path)
		{
			Ok(contents) => (contents, path.display().to_string()),
			Err(error) =>
			{
				sink.error(&format!("{}: {}", path.display(), error));
				return None;
			},
		},
		None =>
		{
			let mut contents = String::new();
			match io::stdin().read_to_string(&mut contents)
			{
				Ok(_) => (contents, "<stdin>".to_string()),
				Err(error) =>
				{
					sink.error(&format!("<stdin>: {}", error));
					return None;
				},
			}
		},
	};
	parse_router(&contents, &name, sink)
}

///Parse a configuration text into a [Router]. `filename` is only used to build landmarks.
pub fn parse_router(text:&str, filename:&str, sink:&mut dyn ErrorSink) -> Option<Router>
{
	let mut pairs = match ConfigParser::parse(Rule::file, text)
	{
		Ok(pairs) => pairs,
		Err(error) =>
		{
			sink.error(&format!("{}: {}", filename, error));
			return None;
		},
	};
	let file = pairs.next().expect("the file rule matched");
	let mut router = Router::new();
	let mut scope = ClassScope{ levels: vec![vec![]] };
	for statement in file.into_inner()
	{
		build_statement(statement, &mut router, filename, &mut scope, false, sink);
	}
	Some(router)
}

fn landmark_of(pair:&Pair<Rule>, filename:&str) -> String
{
	let (line,_column) = pair.as_span().start_pos().line_col();
	format!("{}:{}", filename, line)
}

fn build_statement(pair:Pair<Rule>, router:&mut Router, filename:&str, scope:&mut ClassScope, inside_compound:bool, sink:&mut dyn ErrorSink)
{
	match pair.as_rule()
	{
		Rule::elementclass => build_elementclass(pair, router, filename, scope, sink),
		Rule::declaration => build_declaration(pair, router, filename, scope, sink),
		Rule::connection => build_connection(pair, router, filename, inside_compound, sink),
		_ => (),
	}
}

fn build_elementclass(pair:Pair<Rule>, router:&mut Router, filename:&str, scope:&mut ClassScope, sink:&mut dyn ErrorSink)
{
	let mut class_name: Option<String> = None;
	let mut body = Router::new();
	scope.levels.push(vec![]);
	for inner in pair.into_inner()
	{
		match inner.as_rule()
		{
			Rule::elementclass_kw => (),
			Rule::ident if class_name.is_none() => class_name = Some(inner.as_str().to_string()),
			_ => build_statement(inner, &mut body, filename, scope, true, sink),
		}
	}
	scope.levels.pop();
	let class_name = class_name.expect("elementclass carries a name");
	let body = Rc::new(body);
	scope.levels.last_mut().expect("scope is never empty").push((class_name.clone(), body.clone()));
	router.get_type_index(&class_name, Some(body));
}

fn build_declaration(pair:Pair<Rule>, router:&mut Router, filename:&str, scope:&mut ClassScope, sink:&mut dyn ErrorSink)
{
	let landmark = landmark_of(&pair, filename);
	let mut idents: Vec<&str> = vec![];
	let mut configuration = String::new();
	for inner in pair.into_inner()
	{
		match inner.as_rule()
		{
			Rule::ident => idents.push(inner.as_str()),
			Rule::arglist =>
			{
				configuration = inner.into_inner().next().map(|config| config.as_str()).unwrap_or("").trim().to_string();
			},
			_ => (),
		}
	}
	let type_name = idents.pop().expect("declaration carries a type");
	let compound = scope.find(type_name);
	let class = router.get_type_index(type_name, compound);
	for name in idents
	{
		if router.eindex(name).is_some()
		{
			sink.lerror(&landmark, &format!("element '{}' already declared", name));
			continue;
		}
		router.add_element(name.to_string(), class, configuration.clone(), landmark.clone());
	}
}

fn build_connection(pair:Pair<Rule>, router:&mut Router, filename:&str, inside_compound:bool, sink:&mut dyn ErrorSink)
{
	let landmark = landmark_of(&pair, filename);
	//(input port, element, output port) per hop
	let mut hops: Vec<(usize,usize,usize)> = vec![];
	let mut resolved = true;
	for endpoint in pair.into_inner()
	{
		let mut input_port = 0;
		let mut output_port = 0;
		let mut name = "";
		let mut seen_name = false;
		for part in endpoint.into_inner()
		{
			match part.as_rule()
			{
				Rule::ident =>
				{
					name = part.as_str();
					seen_name = true;
				},
				Rule::port =>
				{
					let value = part.into_inner().next().expect("port carries a number")
						.as_str().parse::<usize>().unwrap_or(0);
					if seen_name { output_port = value } else { input_port = value }
				},
				_ => (),
			}
		}
		match resolve_endpoint(router, name, inside_compound, &landmark, sink)
		{
			Some(element) => hops.push((input_port, element, output_port)),
			None => resolved = false,
		}
	}
	if !resolved
	{
		return;
	}
	for window in hops.windows(2)
	{
		let (_, from_element, from_port) = window[0];
		let (to_port, to_element, _) = window[1];
		router.add_connection(Endpoint::new(from_element, from_port), Endpoint::new(to_element, to_port), &landmark);
	}
}

fn resolve_endpoint(router:&mut Router, name:&str, inside_compound:bool, landmark:&str, sink:&mut dyn ErrorSink) -> Option<usize>
{
	if let Some(index) = router.eindex(name)
	{
		return Some(index);
	}
	if inside_compound && (name=="input" || name=="output")
	{
		return Some(router.add_element(name.to_string(), TUNNEL_TYPE, String::new(), landmark.to_string()));
	}
	sink.lerror(landmark, &format!("undeclared element '{}'", name));
	None
}

///Render a router back to configuration text: declarations in element order,
///a separating blank line, then connections in storage order.
pub fn unparse_router(router:&Router) -> String
{
	let mut out = String::new();
	for i in 0..router.nelements()
	{
		let element = router.element(i);
		if !element.is_live() || element.is_tunnel()
		{
			continue;
		}
		let type_name = router.element_type_name(i).expect("live element has a type");
		if element.configuration.is_empty()
		{
			out.push_str(&format!("{} :: {};\n", element.name, type_name));
		}
		else
		{
			out.push_str(&format!("{} :: {}({});\n", element.name, type_name, element.configuration));
		}
	}
	out.push('\n');
	for c in 0..router.nconnections()
	{
		let (from,to) = router.connection(c);
		let from_element = router.element(from.element);
		let to_element = router.element(to.element);
		if !from_element.is_live() || !to_element.is_live() || from_element.is_tunnel() || to_element.is_tunnel()
		{
			continue;
		}
		out.push_str(&from_element.name);
		if from.port != 0
		{
			out.push_str(&format!(" [{}]", from.port));
		}
		out.push_str(" -> ");
		if to.port != 0
		{
			out.push_str(&format!("[{}] ", to.port));
		}
		out.push_str(&to_element.name);
		out.push_str(";\n");
	}
	out
}

///Write a router to `path`, or to the standard output when `path` is `None`.
pub fn write_router_file(router:&Router, path:Option<&Path>) -> io::Result<()>
{
	let text = unparse_router(router);
	match path
	{
		Some(path) => fs::write(path, text),
		None => io::stdout().write_all(text.as_bytes()),
	}
}

///Split a configuration on top-level commas, respecting double quotes and
///nested parentheses, brackets and braces. Arguments are trimmed.
pub fn split_args(configuration:&str) -> Vec<String>
{
	let mut args = vec![];
	let mut current = String::new();
	let mut depth = 0usize;
	let mut in_quote = false;
	let mut chars = configuration.chars();
	while let Some(ch) = chars.next()
	{
		match ch
		{
			'"' =>
			{
				in_quote = !in_quote;
				current.push(ch);
			},
			'\\' if in_quote =>
			{
				current.push(ch);
				if let Some(escaped) = chars.next()
				{
					current.push(escaped);
				}
			},
			'(' | '[' | '{' if !in_quote =>
			{
				depth += 1;
				current.push(ch);
			},
			')' | ']' | '}' if !in_quote =>
			{
				depth = depth.saturating_sub(1);
				current.push(ch);
			},
			',' if !in_quote && depth==0 =>
			{
				args.push(current.trim().to_string());
				current.clear();
			},
			_ => current.push(ch),
		}
	}
	let last = current.trim();
	if !last.is_empty() || !args.is_empty()
	{
		args.push(last.to_string());
	}
	args
}

///Inverse of [split_args] modulo whitespace normalization.
pub fn join_args(args:&[String]) -> String
{
	args.iter().join(", ")
}

#[cfg(test)]
mod tests
{
	use super::*;
	use crate::error::SilentSink;

	#[test]
	fn split_respects_quoting_and_nesting()
	{
		assert_eq!(split_args(""), Vec::<String>::new());
		assert_eq!(split_args("1, 2,3"), vec!["1","2","3"]);
		assert_eq!(split_args("f(a,b), c"), vec!["f(a,b)","c"]);
		assert_eq!(split_args("\"a,b\", c"), vec!["\"a,b\"","c"]);
		assert_eq!(split_args("[1,2], {3,4}"), vec!["[1,2]","{3,4}"]);
		assert_eq!(split_args("a,,b"), vec!["a","","b"]);
	}

	#[test]
	fn join_is_inverse_modulo_spacing()
	{
		let args = split_args("7 ,  $rate,\"x,y\"");
		assert_eq!(join_args(&args), "7, $rate, \"x,y\"");
	}

	#[test]
	fn parse_declarations_and_connections()
	{
		let mut sink = SilentSink::new();
		let router = parse_router("a, b :: Queue(100);\nc :: Discard;\na [1] -> [0] c;\nb -> c;\n", "test", &mut sink).expect("parses");
		assert_eq!(sink.nerrors(), 0);
		assert_eq!(router.nelements(), 3);
		assert_eq!(router.element_type_name(0), Some("Queue"));
		assert_eq!(router.configuration(0), "100");
		let a = router.eindex("a").unwrap();
		let c = router.eindex("c").unwrap();
		assert!(router.has_connection(Endpoint::new(a,1), Endpoint::new(c,0)));
	}

	#[test]
	fn duplicate_and_undeclared_are_reported()
	{
		let mut sink = SilentSink::new();
		parse_router("a :: A;\na :: B;\nx -> a;\n", "test", &mut sink);
		assert_eq!(sink.nerrors(), 2);
		assert!(sink.messages[0].starts_with("test:2"));
		assert!(sink.messages[1].contains("undeclared element 'x'"));
	}

	#[test]
	fn unparse_round_trips()
	{
		let text = "a :: Shaper(10, $rate);\nb :: Discard;\n\na [2] -> b;\n";
		let mut sink = SilentSink::new();
		let router = parse_router(text, "test", &mut sink).expect("parses");
		assert_eq!(unparse_router(&router), text);
	}
}
