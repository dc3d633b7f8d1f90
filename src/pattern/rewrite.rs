/*!

Graph surgery for an accepted match.

The rewrite splices the replacement body into the target under a fresh prefix,
stamps the inserted elements with the pattern's provenance id, substitutes the
placeholder bindings into their configurations, wires the recorded boundary
edges through the splice's boundary tunnel, deletes the matched region, and
flattens. Between rewrites the target satisfies every structural invariant.

*/

use log::{debug, trace};

use crate::error::ErrorSink;
use crate::router::{Endpoint, Router, TUNNEL_TYPE};
use super::matcher::Matcher;
use super::substitute_configuration;

///Pick `base@1`, `base@2`, ... until neither the name itself nor anything under
///`name/` exists in the router, so the splice can collide with nothing.
pub(crate) fn uniqueify_prefix(base_name:&str, router:&Router) -> String
{
    let mut count = 1;
    loop
    {
        let prefix = format!("{}@{}", base_name, count);
        count += 1;
        let slashed = format!("{}/", prefix);
        let collides = (0..router.nelements()).any(|i|{
            let name = router.ename(i);
            name == prefix || name.starts_with(slashed.as_str())
        });
        if !collides
        {
            return prefix;
        }
    }
}

impl<'a> Matcher<'a>
{
    ///Substitute the replacement for the match accepted by the last successful
    ///[next_match](Matcher::next_match). Leaves the matcher reset; a rewrite
    ///invalidates every index its scratch state held.
    pub fn replace(&mut self, body:&mut Router, sink:&mut dyn ErrorSink)
    {
        let prefix = uniqueify_prefix(self.base_name, body);
        debug!("splicing replacement of pattern '{}' as '{}'", self.base_name, prefix);
        let old_nelements = body.nelements();
        let boundary = body.add_element(prefix, TUNNEL_TYPE, String::new(), String::new());
        body.expand_compound(self.replacement, boundary, "");

        //stamp provenance and substitute the unified placeholders
        for i in old_nelements..body.nelements()
        {
            body.element_mut(i).flags = self.patid;
            if let Some(updated) = substitute_configuration(body.configuration(i), &self.defs)
            {
                body.set_configuration(i, updated);
            }
            trace!("inserted '{}'", body.ename(i));
        }

        //wire the recorded boundary through the splice's tunnel
        for &(outside,tunnel_port) in &self.incoming
        {
            body.add_connection(outside, Endpoint::new(boundary, tunnel_port.port), "");
        }
        for &(tunnel_port,outside) in &self.outgoing
        {
            body.add_connection(Endpoint::new(boundary, tunnel_port.port), outside, "");
        }

        //delete the matched region
        for i in 0..old_nelements
        {
            if self.back_match[i].is_some()
            {
                body.mark_deleted(i);
            }
        }
        body.remove_deleted();
        body.flatten(sink);
        self.reset();
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn prefixes_skip_occupied_generations()
    {
        let mut router = Router::new();
        let class = router.get_type_index("F", None);
        router.add_element("X@1/f".to_string(), class, String::new(), String::new());
        router.add_element("X@2".to_string(), class, String::new(), String::new());
        assert_eq!(uniqueify_prefix("X", &router), "X@3");
        assert_eq!(uniqueify_prefix("Y", &router), "Y@1");
    }
}
