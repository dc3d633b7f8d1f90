/*!

The graph store for router configurations.

A [Router] owns its elements, the two parallel connection vectors, and a router-local
type table. All cross-references are plain indices; deletion tombstones the element
(`class` becomes `None`) and a later [remove_deleted](Router::remove_deleted) compacts
the arena. Enumeration order is insertion order everywhere, which the matching machinery
relies upon.

*/

use std::collections::HashMap;
use std::rc::Rc;

use crate::error::ErrorSink;

///The distinguished type index of connection tunnels. Interned at position 0
///of every router-local type table.
pub const TUNNEL_TYPE: usize = 0;
///Name under which the tunnel type is interned. Not expressible as a source identifier.
pub const TUNNEL_TYPE_NAME: &str = "<tunnel>";

///One end of a connection: an element index plus a port number.
///The derived lexicographic order is the tie-break order of the match validator.
#[derive(Clone,Copy,Debug,PartialEq,Eq,PartialOrd,Ord,Hash)]
pub struct Endpoint
{
	pub element: usize,
	pub port: usize,
}

impl Endpoint
{
	pub fn new(element:usize, port:usize) -> Endpoint
	{
		Endpoint{ element, port }
	}
}

///An entry of a router-local type table.
#[derive(Clone,Debug)]
pub struct ElementType
{
	pub name: String,
	///The body of a compound element class, shared among its instances.
	///`None` for primitive types.
	pub compound: Option<Rc<Router>>,
}

///A processing node of the router graph.
#[derive(Clone,Debug)]
pub struct Element
{
	pub name: String,
	///Index into the router's type table. `None` marks a tombstoned element.
	pub class: Option<usize>,
	///Raw configuration argument text, as written between the declaration parentheses.
	pub configuration: String,
	///Source location, `file:line`. Opaque to the engine.
	pub landmark: String,
	///Provenance stamp: the 1-based id of the pattern whose rewrite inserted this
	///element, 0 for pre-existing elements.
	pub flags: usize,
	///For a paired tunnel exit, the entry element whose connections continue here.
	pub tunnel_input: Option<usize>,
	///For a paired tunnel entry, the exit element from which its connections continue.
	pub tunnel_output: Option<usize>,
}

impl Element
{
	pub fn is_live(&self) -> bool
	{
		self.class.is_some()
	}
	pub fn is_tunnel(&self) -> bool
	{
		self.class == Some(TUNNEL_TYPE)
	}
	///Whether this tunnel participates in a pairing made by compound expansion.
	pub fn is_paired_tunnel(&self) -> bool
	{
		self.is_tunnel() && (self.tunnel_input.is_some() || self.tunnel_output.is_some())
	}
}

///A router configuration graph: elements, connections, and the type table.
#[derive(Clone,Debug)]
pub struct Router
{
	elements: Vec<Element>,
	hookup_from: Vec<Endpoint>,
	hookup_to: Vec<Endpoint>,
	hookup_landmark: Vec<String>,
	types: Vec<ElementType>,
	index_by_name: HashMap<String,usize>,
}

impl Router
{
	pub fn new() -> Router
	{
		Router{
			elements: vec![],
			hookup_from: vec![],
			hookup_to: vec![],
			hookup_landmark: vec![],
			types: vec![ ElementType{ name: TUNNEL_TYPE_NAME.to_string(), compound: None } ],
			index_by_name: HashMap::new(),
		}
	}

	pub fn nelements(&self) -> usize
	{
		self.elements.len()
	}
	pub fn element(&self, index:usize) -> &Element
	{
		&self.elements[index]
	}
	pub fn element_mut(&mut self, index:usize) -> &mut Element
	{
		&mut self.elements[index]
	}
	pub fn ename(&self, index:usize) -> &str
	{
		&self.elements[index].name
	}
	pub fn configuration(&self, index:usize) -> &str
	{
		&self.elements[index].configuration
	}
	pub fn set_configuration(&mut self, index:usize, configuration:String)
	{
		self.elements[index].configuration = configuration;
	}
	///Element index by name, or `None` when absent.
	pub fn eindex(&self, name:&str) -> Option<usize>
	{
		self.index_by_name.get(name).copied()
	}
	///The type name of a live element.
	pub fn element_type_name(&self, index:usize) -> Option<&str>
	{
		self.elements[index].class.map(|t| self.types[t].name.as_str())
	}

	pub fn ntypes(&self) -> usize
	{
		self.types.len()
	}
	pub fn type_name(&self, index:usize) -> &str
	{
		&self.types[index].name
	}
	pub fn type_compound(&self, index:usize) -> Option<&Rc<Router>>
	{
		self.types[index].compound.as_ref()
	}
	pub fn type_index(&self, name:&str) -> Option<usize>
	{
		self.types.iter().position(|t| t.name == name)
	}
	pub fn type_compound_by_name(&self, name:&str) -> Option<&Rc<Router>>
	{
		self.type_index(name).and_then(|t| self.type_compound(t))
	}
	///Intern a type name, attaching a compound body when one is known.
	///An already interned primitive type gains the body; an existing body is kept.
	pub fn get_type_index(&mut self, name:&str, compound:Option<Rc<Router>>) -> usize
	{
		match self.type_index(name)
		{
			Some(t) =>
			{
				if self.types[t].compound.is_none()
				{
					self.types[t].compound = compound;
				}
				t
			},
			None =>
			{
				self.types.push(ElementType{ name: name.to_string(), compound });
				self.types.len() - 1
			},
		}
	}

	///Append an element. The caller is responsible for name uniqueness among live elements.
	pub fn add_element(&mut self, name:String, class:usize, configuration:String, landmark:String) -> usize
	{
		let index = self.elements.len();
		self.index_by_name.insert(name.clone(), index);
		self.elements.push(Element{
			name,
			class: Some(class),
			configuration,
			landmark,
			flags: 0,
			tunnel_input: None,
			tunnel_output: None,
		});
		index
	}

	pub fn nconnections(&self) -> usize
	{
		self.hookup_from.len()
	}
	pub fn connection(&self, index:usize) -> (Endpoint,Endpoint)
	{
		(self.hookup_from[index], self.hookup_to[index])
	}
	pub fn has_connection(&self, from:Endpoint, to:Endpoint) -> bool
	{
		(0..self.hookup_from.len()).any(|c| self.hookup_from[c]==from && self.hookup_to[c]==to)
	}
	///Targets of every connection leaving `from`, in storage order.
	pub fn find_connections_from(&self, from:Endpoint) -> Vec<Endpoint>
	{
		(0..self.hookup_from.len()).filter(|&c| self.hookup_from[c]==from).map(|c| self.hookup_to[c]).collect()
	}
	///Sources of every connection entering `to`, in storage order.
	pub fn find_connections_to(&self, to:Endpoint) -> Vec<Endpoint>
	{
		(0..self.hookup_from.len()).filter(|&c| self.hookup_to[c]==to).map(|c| self.hookup_from[c]).collect()
	}
	pub fn add_connection(&mut self, from:Endpoint, to:Endpoint, landmark:&str)
	{
		debug_assert!(from.element < self.elements.len() && to.element < self.elements.len());
		self.hookup_from.push(from);
		self.hookup_to.push(to);
		self.hookup_landmark.push(landmark.to_string());
	}

	///Tombstone an element. It remains visible to index-based queries until the next
	///[remove_deleted](Router::remove_deleted).
	pub fn mark_deleted(&mut self, index:usize)
	{
		self.elements[index].class = None;
	}

	///Pair two tunnel elements: connections into `entry` continue from `exit`
	///at the same port.
	pub fn add_tunnel_pair(&mut self, entry:usize, exit:usize)
	{
		self.elements[entry].tunnel_output = Some(exit);
		self.elements[exit].tunnel_input = Some(entry);
	}

	///Drop tombstoned elements and every connection touching them, remapping all
	///stored indices. Also forgets tunnel pairings whose partner died.
	pub fn remove_deleted(&mut self)
	{
		let mut new_index = vec![ None; self.elements.len() ];
		let mut kept = 0;
		for (i,element) in self.elements.iter().enumerate()
		{
			if element.is_live()
			{
				new_index[i] = Some(kept);
				kept += 1;
			}
		}
		let old_elements = std::mem::take(&mut self.elements);
		self.index_by_name.clear();
		for (i,mut element) in old_elements.into_iter().enumerate()
		{
			if new_index[i].is_none()
			{
				continue;
			}
			element.tunnel_input = element.tunnel_input.and_then(|e| new_index[e]);
			element.tunnel_output = element.tunnel_output.and_then(|e| new_index[e]);
			self.index_by_name.insert(element.name.clone(), self.elements.len());
			self.elements.push(element);
		}
		let old_from = std::mem::take(&mut self.hookup_from);
		let old_to = std::mem::take(&mut self.hookup_to);
		let old_landmark = std::mem::take(&mut self.hookup_landmark);
		for ((from,to),landmark) in old_from.into_iter().zip(old_to.into_iter()).zip(old_landmark.into_iter())
		{
			if let (Some(f),Some(t)) = (new_index[from.element], new_index[to.element])
			{
				self.hookup_from.push(Endpoint::new(f, from.port));
				self.hookup_to.push(Endpoint::new(t, to.port));
				self.hookup_landmark.push(landmark);
			}
		}
	}

	/**
	Splice the body of a compound class into this router under the instance element's name.

	The instance element becomes a connection tunnel. Every live body element `e` is copied
	as `instance/e` with its type interned locally, body connections are copied with remapped
	indices, and the boundary pairing is established: connections into the instance continue
	from `instance/input`, connections into `instance/output` continue from the instance.
	The copies carry `flags = 0`; callers that need provenance stamp them afterwards.
	**/
	pub fn expand_compound(&mut self, class_body:&Router, instance:usize, landmark:&str)
	{
		let prefix = self.elements[instance].name.clone();
		self.elements[instance].class = Some(TUNNEL_TYPE);
		self.elements[instance].configuration = String::new();
		let mut body_index = vec![ None; class_body.nelements() ];
		for i in 0..class_body.nelements()
		{
			let element = class_body.element(i);
			if !element.is_live()
			{
				continue;
			}
			let class = if element.is_tunnel()
			{
				TUNNEL_TYPE
			}
			else
			{
				let type_name = class_body.element_type_name(i).expect("live element has a type").to_string();
				let compound = class_body.element(i).class.and_then(|t| class_body.type_compound(t).cloned());
				self.get_type_index(&type_name, compound)
			};
			let element_landmark = if element.landmark.is_empty() { landmark.to_string() } else { element.landmark.clone() };
			let new = self.add_element(format!("{}/{}", prefix, element.name), class, element.configuration.clone(), element_landmark);
			body_index[i] = Some(new);
		}
		//Boundary pairing with the body's own input/output tunnels, when present.
		if let Some(body_input) = class_body.eindex("input")
		{
			if class_body.element(body_input).is_tunnel()
			{
				if let Some(mapped) = body_index[body_input]
				{
					self.add_tunnel_pair(instance, mapped);
				}
			}
		}
		if let Some(body_output) = class_body.eindex("output")
		{
			if class_body.element(body_output).is_tunnel()
			{
				if let Some(mapped) = body_index[body_output]
				{
					self.add_tunnel_pair(mapped, instance);
				}
			}
		}
		//Pairings internal to the body, in case it was not flattened.
		for i in 0..class_body.nelements()
		{
			if let (Some(new_entry),Some(exit)) = (body_index[i], class_body.element(i).tunnel_output)
			{
				if let Some(new_exit) = body_index[exit]
				{
					self.add_tunnel_pair(new_entry, new_exit);
				}
			}
		}
		for c in 0..class_body.nconnections()
		{
			let (from,to) = class_body.connection(c);
			if let (Some(f),Some(t)) = (body_index[from.element], body_index[to.element])
			{
				self.add_connection(Endpoint::new(f, from.port), Endpoint::new(t, to.port), landmark);
			}
		}
	}

	/**
	Expand every compound element to primitive form and resolve the tunnels the
	expansion introduces. Idempotent: a router without compound elements and without
	paired tunnels is left untouched. Unpaired tunnels, such as a pattern's boundary
	`input`/`output`, are preserved.
	**/
	pub fn flatten(&mut self, _sink:&mut dyn ErrorSink)
	{
		loop
		{
			let work = (0..self.nelements()).find_map(|i|{
				let class = self.element(i).class?;
				let body = self.type_compound(class)?.clone();
				Some((i,body))
			});
			match work
			{
				Some((instance,body)) =>
				{
					let landmark = self.elements[instance].landmark.clone();
					self.expand_compound(&body, instance, &landmark);
				},
				None => break,
			}
		}
		self.remove_tunnels();
	}

	///Compose connections across paired tunnels, then drop the paired tunnels
	///together with every connection touching them.
	fn remove_tunnels(&mut self)
	{
		loop
		{
			let mut added = false;
			let mut c = 0;
			while c < self.nconnections()
			{
				let (from,to) = self.connection(c);
				if let Some(exit) = self.elements[to.element].tunnel_output
				{
					for continuation in self.find_connections_from(Endpoint::new(exit, to.port))
					{
						if !self.has_connection(from, continuation)
						{
							let landmark = self.hookup_landmark[c].clone();
							self.add_connection(from, continuation, &landmark);
							added = true;
						}
					}
				}
				c += 1;
			}
			if !added
			{
				break;
			}
		}
		let paired: Vec<bool> = self.elements.iter().map(|e| e.is_paired_tunnel()).collect();
		if !paired.iter().any(|&p| p)
		{
			return;
		}
		let old_from = std::mem::take(&mut self.hookup_from);
		let old_to = std::mem::take(&mut self.hookup_to);
		let old_landmark = std::mem::take(&mut self.hookup_landmark);
		for ((from,to),landmark) in old_from.into_iter().zip(old_to.into_iter()).zip(old_landmark.into_iter())
		{
			if !paired[from.element] && !paired[to.element]
			{
				self.hookup_from.push(from);
				self.hookup_to.push(to);
				self.hookup_landmark.push(landmark);
			}
		}
		for (i,is_paired) in paired.iter().enumerate()
		{
			if *is_paired
			{
				self.mark_deleted(i);
			}
		}
		self.remove_deleted();
	}
}

impl Default for Router
{
	fn default() -> Router
	{
		Router::new()
	}
}

#[cfg(test)]
mod tests
{
	use super::*;
	use crate::error::SilentSink;

	fn primitive(router:&mut Router, name:&str, type_name:&str) -> usize
	{
		let class = router.get_type_index(type_name, None);
		router.add_element(name.to_string(), class, String::new(), String::new())
	}

	#[test]
	fn compaction_remaps_connections()
	{
		let mut router = Router::new();
		let a = primitive(&mut router, "a", "A");
		let b = primitive(&mut router, "b", "B");
		let c = primitive(&mut router, "c", "C");
		router.add_connection(Endpoint::new(a,0), Endpoint::new(b,0), "");
		router.add_connection(Endpoint::new(b,0), Endpoint::new(c,0), "");
		router.mark_deleted(b);
		router.remove_deleted();
		assert_eq!(router.nelements(), 2);
		assert_eq!(router.nconnections(), 0);
		assert_eq!(router.eindex("a"), Some(0));
		assert_eq!(router.eindex("c"), Some(1));
	}

	#[test]
	fn expansion_pairs_and_flatten_resolves()
	{
		//body: input -> f -> output
		let mut body = Router::new();
		let input = body.add_element("input".to_string(), TUNNEL_TYPE, String::new(), String::new());
		let f = primitive(&mut body, "f", "F");
		let output = body.add_element("output".to_string(), TUNNEL_TYPE, String::new(), String::new());
		body.add_connection(Endpoint::new(input,0), Endpoint::new(f,0), "");
		body.add_connection(Endpoint::new(f,0), Endpoint::new(output,0), "");

		let mut router = Router::new();
		let a = primitive(&mut router, "a", "A");
		let b = primitive(&mut router, "b", "B");
		let compound_class = router.get_type_index("Pair", Some(Rc::new(body)));
		let instance = router.add_element("p".to_string(), compound_class, String::new(), String::new());
		router.add_connection(Endpoint::new(a,0), Endpoint::new(instance,0), "");
		router.add_connection(Endpoint::new(instance,0), Endpoint::new(b,0), "");

		let mut sink = SilentSink::new();
		router.flatten(&mut sink);
		assert_eq!(sink.nerrors(), 0);
		let inner = router.eindex("p/f").expect("expanded element");
		assert_eq!(router.element_type_name(inner), Some("F"));
		let a = router.eindex("a").unwrap();
		let b = router.eindex("b").unwrap();
		assert!(router.has_connection(Endpoint::new(a,0), Endpoint::new(inner,0)));
		assert!(router.has_connection(Endpoint::new(inner,0), Endpoint::new(b,0)));
		//the instance tunnel and its boundary pair are gone
		assert!(router.eindex("p").is_none());
		assert!(router.eindex("p/input").is_none());
		assert!(router.eindex("p/output").is_none());
	}
}
