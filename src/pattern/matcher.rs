/*!

Candidate enumeration and match validation.

A [Matcher] ties one [PatternPair] to a target router. [next_match](Matcher::next_match)
drives a resumable backtracking enumerator over injective element mappings and filters
them through the full structural validation: configuration unification, the provenance
check breaking rewrite loops, connection consistency, and boundary-tunnel coverage.
On acceptance the matcher holds everything the rewriter needs: the mapping, its inverse,
the placeholder bindings, and the boundary wiring of the matched region.

The enumerator extends the mapping one pattern connection at a time, in pattern order,
then places any pattern element no connection covers. It never binds the pattern's
tunnels; those stand for the outside world.

*/

use std::collections::HashMap;

use log::{debug, trace};

use crate::error::ErrorSink;
use crate::router::{Endpoint, Router};
use super::{unify_configuration, PatternPair};

///Pattern elements newly bound when a position was placed, for undo on backtrack.
#[derive(Clone,Copy)]
struct Binding
{
    first: Option<usize>,
    second: Option<usize>,
}

///Cursor state of the resumable enumerator.
struct EnumeratorState
{
    ///Pattern connection indices with both endpoints off the tunnels, in pattern order.
    connection_positions: Vec<usize>,
    ///Non-tunnel pattern elements covered by no such connection, in index order.
    loose_positions: Vec<usize>,
    ///Per position: the candidate to try next, or for bound positions the one chosen.
    cursors: Vec<usize>,
    ///Undo records of the currently bound positions; its length is the search depth.
    bound: Vec<Binding>,
    ///Target elements currently claimed by the mapping.
    used: Vec<bool>,
}

///Matches one pattern against a target router, yielding validated matches one at a time.
pub struct Matcher<'a>
{
    pub(crate) pattern: &'a Router,
    pub(crate) replacement: &'a Router,
    pub(crate) base_name: &'a str,
    ///1-based pattern id, stamped as provenance on inserted elements.
    pub(crate) patid: usize,
    pat_input: Option<usize>,
    pat_output: Option<usize>,
    state: Option<EnumeratorState>,
    ///pattern element -> target element.
    pub(crate) matching: Vec<Option<usize>>,
    ///target element -> pattern element, rebuilt per validation.
    pub(crate) back_match: Vec<Option<usize>>,
    ///Placeholder bindings shared across the whole match.
    pub(crate) defs: HashMap<String,String>,
    ///External edges entering the match: (outside endpoint, input-tunnel endpoint).
    pub(crate) incoming: Vec<(Endpoint,Endpoint)>,
    ///External edges leaving the match: (output-tunnel endpoint, outside endpoint).
    pub(crate) outgoing: Vec<(Endpoint,Endpoint)>,
}

impl<'a> Matcher<'a>
{
    ///Prepare a matcher for one pattern. Malformed boundary tunnels are reported
    ///against the offending element's landmark; behavior under such malformedness
    ///is unspecified and callers treat a nonzero error count as fatal.
    pub fn new(pair:&'a PatternPair, patid:usize, sink:&mut dyn ErrorSink) -> Matcher<'a>
    {
        let pattern = &pair.pattern;
        let mut pat_input = None;
        let mut pat_output = None;
        for i in 0..pattern.nelements()
        {
            let element = pattern.element(i);
            if !element.is_tunnel()
            {
                continue;
            }
            if element.tunnel_input.is_some() || element.tunnel_output.is_some()
            {
                sink.lerror(&element.landmark, "pattern has active connection tunnels");
            }
            else if element.name == "input" && pat_input.is_none()
            {
                pat_input = Some(i);
            }
            else if element.name == "output" && pat_output.is_none()
            {
                pat_output = Some(i);
            }
            else
            {
                sink.lerror(&element.landmark, &format!("connection tunnel with unexpected name '{}'", element.name));
            }
        }
        Matcher{
            pattern,
            replacement: &pair.replacement,
            base_name: &pair.name,
            patid,
            pat_input,
            pat_output,
            state: None,
            matching: vec![ None; pattern.nelements() ],
            back_match: vec![],
            defs: HashMap::new(),
            incoming: vec![],
            outgoing: vec![],
        }
    }

    ///Advance to the next candidate mapping that passes full validation.
    pub fn next_match(&mut self, body:&Router) -> bool
    {
        while self.next_mapping(body)
        {
            if self.check_match(body)
            {
                debug!("pattern '{}' matched {} elements", self.base_name,
                    self.matching.iter().filter(|m| m.is_some()).count());
                return true;
            }
        }
        false
    }

    ///Advance the enumerator to the next connectivity-feasible injective mapping.
    ///Resumable: each call continues from the previously yielded mapping.
    fn next_mapping(&mut self, body:&Router) -> bool
    {
        if self.state.is_none()
        {
            self.state = Some(self.initial_state(body));
        }
        let mut state = self.state.take().expect("state was just installed");
        let found = self.advance(&mut state, body);
        self.state = Some(state);
        found
    }

    fn initial_state(&self, body:&Router) -> EnumeratorState
    {
        let pattern = self.pattern;
        let mut covered = vec![ false; pattern.nelements() ];
        let mut connection_positions = vec![];
        for c in 0..pattern.nconnections()
        {
            let (from,to) = pattern.connection(c);
            if pattern.element(from.element).is_tunnel() || pattern.element(to.element).is_tunnel()
            {
                continue;
            }
            connection_positions.push(c);
            covered[from.element] = true;
            covered[to.element] = true;
        }
        let loose_positions = (0..pattern.nelements())
            .filter(|&i| pattern.element(i).is_live() && !pattern.element(i).is_tunnel() && !covered[i])
            .collect::<Vec<usize>>();
        let npositions = connection_positions.len() + loose_positions.len();
        EnumeratorState{
            connection_positions,
            loose_positions,
            cursors: vec![ 0; npositions ],
            bound: vec![],
            used: vec![ false; body.nelements() ],
        }
    }

    fn advance(&mut self, state:&mut EnumeratorState, body:&Router) -> bool
    {
        let npositions = state.cursors.len();
        if npositions == 0
        {
            //a pattern without matchable content never matches
            return false;
        }
        if state.bound.len() == npositions
        {
            //resume past the mapping yielded last time
            self.unbind(state);
        }
        loop
        {
            let depth = state.bound.len();
            if depth == npositions
            {
                return true;
            }
            match self.try_position(state, depth, body)
            {
                Some((candidate,binding)) =>
                {
                    state.cursors[depth] = candidate;
                    state.bound.push(binding);
                    if depth+1 < npositions
                    {
                        state.cursors[depth+1] = 0;
                    }
                },
                None =>
                {
                    if depth == 0
                    {
                        return false;
                    }
                    self.unbind(state);
                },
            }
        }
    }

    ///Undo the deepest binding and move its cursor past the choice it had made.
    fn unbind(&mut self, state:&mut EnumeratorState)
    {
        let binding = state.bound.pop().expect("a binding to undo");
        for &newly_bound in &[binding.first, binding.second]
        {
            if let Some(pattern_element) = newly_bound
            {
                if let Some(target_element) = self.matching[pattern_element]
                {
                    state.used[target_element] = false;
                }
                self.matching[pattern_element] = None;
            }
        }
        let depth = state.bound.len();
        state.cursors[depth] += 1;
    }

    ///Find, from the position's cursor on, the first candidate consistent with the
    ///partial mapping, and bind it.
    fn try_position(&mut self, state:&mut EnumeratorState, depth:usize, body:&Router) -> Option<(usize,Binding)>
    {
        let nconnections = state.connection_positions.len();
        let mut cursor = state.cursors[depth];
        if depth < nconnections
        {
            let (pf,pt) = self.pattern.connection(state.connection_positions[depth]);
            while cursor < body.nconnections()
            {
                if let Some(binding) = self.try_bind_connection(state, pf, pt, cursor, body)
                {
                    trace!("position {}: target connection {} extends the mapping", depth, cursor);
                    return Some((cursor,binding));
                }
                cursor += 1;
            }
            None
        }
        else
        {
            let pattern_element = state.loose_positions[depth-nconnections];
            while cursor < body.nelements()
            {
                if self.loose_candidate_ok(state, pattern_element, cursor, body)
                {
                    self.matching[pattern_element] = Some(cursor);
                    state.used[cursor] = true;
                    trace!("position {}: target element {} taken for pattern element {}", depth, cursor, pattern_element);
                    return Some((cursor, Binding{ first: Some(pattern_element), second: None }));
                }
                cursor += 1;
            }
            None
        }
    }

    fn try_bind_connection(&mut self, state:&mut EnumeratorState, pf:Endpoint, pt:Endpoint, candidate:usize, body:&Router) -> Option<Binding>
    {
        let (tf,tt) = body.connection(candidate);
        if !body.element(tf.element).is_live() || !body.element(tt.element).is_live()
        {
            return None;
        }
        if body.element(tf.element).is_tunnel() || body.element(tt.element).is_tunnel()
        {
            return None;
        }
        if tf.port != pf.port || tt.port != pt.port
        {
            return None;
        }
        if self.pattern.element_type_name(pf.element) != body.element_type_name(tf.element)
        {
            return None;
        }
        if self.pattern.element_type_name(pt.element) != body.element_type_name(tt.element)
        {
            return None;
        }
        let from_mapped = self.matching[pf.element];
        let to_mapped = self.matching[pt.element];
        match from_mapped
        {
            Some(mapped) if mapped != tf.element => return None,
            None if state.used[tf.element] => return None,
            _ => (),
        }
        match to_mapped
        {
            Some(mapped) if mapped != tt.element => return None,
            None if state.used[tt.element] => return None,
            _ => (),
        }
        if from_mapped.is_none() && to_mapped.is_none() && (pf.element==pt.element) != (tf.element==tt.element)
        {
            //injectivity: a pattern self-loop maps to a target self-loop and nothing else
            return None;
        }
        let mut binding = Binding{ first: None, second: None };
        if from_mapped.is_none()
        {
            self.matching[pf.element] = Some(tf.element);
            state.used[tf.element] = true;
            binding.first = Some(pf.element);
        }
        if self.matching[pt.element].is_none()
        {
            self.matching[pt.element] = Some(tt.element);
            state.used[tt.element] = true;
            binding.second = Some(pt.element);
        }
        Some(binding)
    }

    fn loose_candidate_ok(&self, state:&EnumeratorState, pattern_element:usize, candidate:usize, body:&Router) -> bool
    {
        let element = body.element(candidate);
        element.is_live() && !element.is_tunnel() && !state.used[candidate]
            && self.pattern.element_type_name(pattern_element) == body.element_type_name(candidate)
    }

    /**
    Validate the current candidate mapping.

    Step 1 unifies the configurations of every mapped pair under shared bindings.
    Step 2 builds the inverse mapping and rejects a match made up entirely of
    elements this same pattern inserted earlier, which is what stops the driver
    from chewing on its own replacement forever. Step 3 walks every target
    connection: internal edges must exist in the pattern, edges crossing the
    boundary must resolve to an input/output tunnel port whose sibling edges are
    all present outside. Step 4 finally requires every tunnel port of the pattern
    to have been resolved, so the rewrite can wire the full boundary.
    **/
    fn check_match(&mut self, body:&Router) -> bool
    {
        self.defs.clear();
        self.incoming.clear();
        self.outgoing.clear();
        for (pattern_element,mapped) in self.matching.iter().enumerate()
        {
            if let Some(target_element) = *mapped
            {
                if !unify_configuration(self.pattern.configuration(pattern_element), body.configuration(target_element), &mut self.defs)
                {
                    return false;
                }
            }
        }
        self.back_match = vec![ None; body.nelements() ];
        let mut all_previous = true;
        for (pattern_element,mapped) in self.matching.iter().enumerate()
        {
            if let Some(target_element) = *mapped
            {
                self.back_match[target_element] = Some(pattern_element);
                if body.element(target_element).flags != self.patid
                {
                    all_previous = false;
                }
            }
        }
        if all_previous
        {
            trace!("rejecting: every matched element was inserted by this pattern");
            return false;
        }
        for c in 0..body.nconnections()
        {
            let (hf,ht) = body.connection(c);
            match (self.back_match[hf.element], self.back_match[ht.element])
            {
                (Some(pf),Some(pt)) =>
                {
                    if !self.pattern.has_connection(Endpoint::new(pf, hf.port), Endpoint::new(pt, ht.port))
                    {
                        trace!("rejecting: target connection {} has no pattern counterpart", c);
                        return false;
                    }
                },
                (None,Some(pt)) =>
                {
                    if !self.check_incoming(hf, Endpoint::new(pt, ht.port), body)
                    {
                        return false;
                    }
                },
                (Some(pf),None) =>
                {
                    if !self.check_outgoing(Endpoint::new(pf, hf.port), ht, body)
                    {
                        return false;
                    }
                },
                (None,None) => (),
            }
        }
        for c in 0..self.pattern.nconnections()
        {
            let (pf,pt) = self.pattern.connection(c);
            if Some(pf.element) == self.pat_input && !self.incoming.iter().any(|&(_,recorded)| recorded==pf)
            {
                return false;
            }
            if Some(pt.element) == self.pat_output && !self.outgoing.iter().any(|&(recorded,_)| recorded==pt)
            {
                return false;
            }
        }
        true
    }

    ///Resolve a target edge entering the match at `pat_inside` to an input-tunnel
    ///port of the pattern. Among the tunnel ports feeding `pat_inside`, the smallest
    ///endpoint whose every outgoing pattern edge is reflected at `outside` wins.
    fn check_incoming(&mut self, outside:Endpoint, pat_inside:Endpoint, body:&Router) -> bool
    {
        let input_element = match self.pat_input
        {
            Some(index) => index,
            None => return false,
        };
        let mut success: Option<Endpoint> = None;
        for c in 0..self.pattern.nconnections()
        {
            let (pf,pt) = self.pattern.connection(c);
            if pt != pat_inside || pf.element != input_element
            {
                continue;
            }
            if let Some(best) = success
            {
                if best <= pf
                {
                    continue;
                }
            }
            let mut covered = true;
            for sibling in self.pattern.find_connections_from(pf)
            {
                let want = match self.matching[sibling.element]
                {
                    Some(mapped) => Endpoint::new(mapped, sibling.port),
                    None =>
                    {
                        covered = false;
                        break;
                    },
                };
                if !body.has_connection(outside, want)
                {
                    covered = false;
                    break;
                }
            }
            if covered
            {
                success = Some(pf);
            }
        }
        match success
        {
            Some(tunnel_port) =>
            {
                self.incoming.push((outside, tunnel_port));
                true
            },
            None => false,
        }
    }

    ///Symmetric to [check_incoming](Matcher::check_incoming) for edges leaving the match.
    fn check_outgoing(&mut self, pat_inside:Endpoint, outside:Endpoint, body:&Router) -> bool
    {
        let output_element = match self.pat_output
        {
            Some(index) => index,
            None => return false,
        };
        let mut success: Option<Endpoint> = None;
        for c in 0..self.pattern.nconnections()
        {
            let (pf,pt) = self.pattern.connection(c);
            if pf != pat_inside || pt.element != output_element
            {
                continue;
            }
            if let Some(best) = success
            {
                if best <= pt
                {
                    continue;
                }
            }
            let mut covered = true;
            for sibling in self.pattern.find_connections_to(pt)
            {
                let want = match self.matching[sibling.element]
                {
                    Some(mapped) => Endpoint::new(mapped, sibling.port),
                    None =>
                    {
                        covered = false;
                        break;
                    },
                };
                if !body.has_connection(want, outside)
                {
                    covered = false;
                    break;
                }
            }
            if covered
            {
                success = Some(pt);
            }
        }
        match success
        {
            Some(tunnel_port) =>
            {
                self.outgoing.push((tunnel_port, outside));
                true
            },
            None => false,
        }
    }

    ///Drop all per-attempt scratch state. Called after a rewrite invalidates the
    ///indices the cursors point at.
    pub(crate) fn reset(&mut self)
    {
        self.state = None;
        for mapped in self.matching.iter_mut()
        {
            *mapped = None;
        }
        self.back_match.clear();
        self.defs.clear();
        self.incoming.clear();
        self.outgoing.clear();
    }
}
