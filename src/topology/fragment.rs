//! Fragments: closed loops of boundary edges describing one physically
//! connected piece of a cut element.
//!
//! A fragment is built either from the whole boundary of an uncut element or
//! from the node loops produced by [`Fragment::split`]. Its edges are oriented
//! head to tail: `edges[i].node(1) == edges[i + 1].node(0)`, wrapping around.

use crate::mesh_error::CutMeshError;
use crate::topology::edge::Edge;
use crate::topology::node::NodeKey;
use itertools::Itertools;
use std::collections::BTreeSet;
use std::fmt;

/// One closed boundary loop of a cut element.
#[derive(Clone, Debug, PartialEq)]
pub struct Fragment {
    host: Option<u32>,
    edges: Vec<Edge>,
}

impl Fragment {
    /// Fragment covering an element's whole boundary, cuts included.
    pub fn from_boundary(host: u32, boundary: &[Edge]) -> Self {
        Self {
            host: Some(host),
            edges: boundary.to_vec(),
        }
    }

    /// Fragment whose boundary visits `nodes` in order and closes back to the
    /// first node. The new edges carry no cuts.
    pub fn from_loop(host: Option<u32>, nodes: &[NodeKey]) -> Self {
        let edges = nodes
            .iter()
            .circular_tuple_windows()
            .map(|(&a, &b)| Edge::new(a, b))
            .collect();
        Self { host, edges }
    }

    /// Element owning this fragment.
    pub fn host(&self) -> Option<u32> {
        self.host
    }

    pub(crate) fn set_host(&mut self, host: u32) {
        self.host = Some(host);
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn edge(&self, index: usize) -> &Edge {
        &self.edges[index]
    }

    pub(crate) fn edge_mut(&mut self, index: usize) -> &mut Edge {
        &mut self.edges[index]
    }

    pub fn num_edges(&self) -> usize {
        self.edges.len()
    }

    /// Loop nodes in boundary order.
    pub fn nodes(&self) -> Vec<NodeKey> {
        self.edges.iter().map(|e| e.node(0)).collect()
    }

    /// All embedded nodes on the boundary, endpoints and cuts alike.
    pub fn embedded_nodes(&self) -> BTreeSet<NodeKey> {
        self.edges
            .iter()
            .flat_map(|e| e.nodes().into_iter().chain(e.embedded_node()))
            .filter(|n| n.is_embedded())
            .collect()
    }

    pub fn contains_node(&self, node: NodeKey) -> bool {
        self.edges.iter().any(|e| e.contains_node(node))
    }

    /// Two fragments are connected when they share an equivalent edge.
    pub fn is_connected(&self, other: &Fragment) -> bool {
        self.edges
            .iter()
            .any(|a| other.edges.iter().any(|b| a.equivalent(b)))
    }

    /// Number of boundary edges carrying a cut.
    pub fn num_cuts(&self) -> usize {
        self.edges.iter().filter(|e| e.has_intersection()).count()
    }

    /// Endpoints of `edge` that lie on this fragment.
    pub fn common_nodes_with_edge(&self, edge: &Edge) -> Vec<NodeKey> {
        edge.nodes()
            .into_iter()
            .filter(|&n| self.contains_node(n))
            .collect()
    }

    pub fn is_edge_interior(&self, index: usize) -> bool {
        self.edges[index].is_interior_edge()
    }

    /// Indices of edges running through the element interior.
    pub fn interior_edge_ids(&self) -> Vec<usize> {
        (0..self.edges.len())
            .filter(|&i| self.is_edge_interior(i))
            .collect()
    }

    pub fn switch_node(&mut self, new: NodeKey, old: NodeKey) {
        for edge in &mut self.edges {
            edge.switch_node(new, old);
        }
    }

    /// Head-to-tail closure of the loop.
    pub fn is_closed(&self) -> bool {
        self.edges.len() >= 3
            && self
                .edges
                .iter()
                .circular_tuple_windows()
                .all(|(a, b)| a.node(1) == b.node(0))
    }

    /// Split the loop at its cut edges.
    ///
    /// Walks the boundary once, switching between two node lists every time a
    /// cut is crossed. No cut returns the fragment unchanged; one cut returns a
    /// single loop with the embedded node inserted; two cuts return the two
    /// loops on either side of the segment joining them.
    pub fn split(&self) -> Result<Vec<Fragment>, CutMeshError> {
        let mut loops: [Vec<NodeKey>; 2] = [Vec::new(), Vec::new()];
        let mut side = 0;
        let mut cuts = 0;
        for edge in &self.edges {
            loops[side].push(edge.node(0));
            if let Some(embedded) = edge.embedded_node() {
                loops[side].push(embedded);
                side = 1 - side;
                loops[side].push(embedded);
                cuts += 1;
            }
        }

        match cuts {
            0 => Ok(vec![self.clone()]),
            1 => {
                let [mut first, second] = loops;
                first.extend(second.into_iter().skip(1));
                Ok(vec![Fragment::from_loop(self.host, &first)])
            }
            2 => Ok(loops
                .iter()
                .filter(|nodes| nodes.len() >= 3)
                .map(|nodes| Fragment::from_loop(self.host, nodes))
                .collect()),
            n => Err(CutMeshError::Invariant(format!(
                "fragment {self} has {n} cut edges, at most 2 can be split"
            ))),
        }
    }

    /// Merge the two fragment edges that lie on one cut element edge back into
    /// a single edge carrying the cut.
    ///
    /// Returns `true` when a pair was merged.
    pub fn combine_tip_edges(
        &mut self,
        host_edges: &[Edge],
        tolerance: f64,
    ) -> Result<bool, CutMeshError> {
        let n = self.edges.len();
        let mut tip = None;
        for host_edge in host_edges.iter().filter(|e| e.has_intersection()) {
            let on_edge: Vec<usize> = (0..n)
                .filter(|&j| host_edge.contains_edge(&self.edges[j]))
                .collect();
            if on_edge.len() == 2 {
                tip = Some((host_edge, on_edge[0], on_edge[1]));
                break;
            }
        }
        let Some((host_edge, a, b)) = tip else {
            return Ok(false);
        };

        let (first, second) = if b == a + 1 {
            (a, b)
        } else if a == 0 && b == n - 1 {
            (b, a)
        } else {
            return Err(CutMeshError::Invariant(format!(
                "tip edges {a} and {b} of fragment {self} are not adjacent"
            )));
        };

        let start = self.edges[first].node(0);
        let tip_node = self.edges[first].node(1);
        let end = self.edges[second].node(1);
        if tip_node != self.edges[second].node(0) {
            return Err(CutMeshError::Invariant(format!(
                "tip edges of fragment {self} do not meet"
            )));
        }

        let locate = |node| {
            host_edge.distance_from_first(node).ok_or_else(|| {
                CutMeshError::Invariant(format!("node {node} is not on edge {host_edge}"))
            })
        };
        let (x_start, x_end, x_tip) = (locate(start)?, locate(end)?, locate(tip_node)?);
        let span = x_end - x_start;
        if span.abs() < tolerance {
            return Err(CutMeshError::InvalidIntersection(format!(
                "tip edges of fragment {self} span no length on edge {host_edge}"
            )));
        }
        let position = (x_tip - x_start) / span;

        let mut full = Edge::new(start, end);
        full.add_intersection(position, tip_node, start, tolerance)?;
        self.edges[first] = full;
        self.edges.remove(second);
        Ok(true)
    }

    /// Parametric length of the element boundary covered by this fragment.
    ///
    /// Each element edge has length 1. Interior edges do not count.
    pub fn boundary_measure(&self, host_edges: &[Edge]) -> f64 {
        self.edges
            .iter()
            .filter(|e| !e.is_interior_edge())
            .filter_map(|e| {
                host_edges.iter().find(|h| h.contains_edge(e)).and_then(|h| {
                    let x0 = h.distance_from_first(e.node(0))?;
                    let x1 = h.distance_from_first(e.node(1))?;
                    Some((x1 - x0).abs())
                })
            })
            .sum()
    }
}

impl fmt::Display for Fragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}}}", self.edges.iter().join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOL: f64 = 1e-4;

    fn p(id: u32) -> NodeKey {
        NodeKey::permanent(id)
    }

    fn e(id: u32) -> NodeKey {
        NodeKey::embedded(id)
    }

    fn square() -> Vec<Edge> {
        vec![
            Edge::new(p(0), p(1)),
            Edge::new(p(1), p(2)),
            Edge::new(p(2), p(3)),
            Edge::new(p(3), p(0)),
        ]
    }

    #[test]
    fn uncut_boundary_is_closed_and_whole() {
        let frag = Fragment::from_boundary(0, &square());
        assert!(frag.is_closed());
        assert_eq!(frag.num_cuts(), 0);
        assert_eq!(frag.split().unwrap(), vec![frag.clone()]);
        assert!((frag.boundary_measure(&square()) - 4.0).abs() < 1e-12);
    }

    #[test]
    fn two_cuts_split_into_two_loops() {
        let mut edges = square();
        edges[0].add_intersection(0.5, e(0), p(0), TOL).unwrap();
        edges[2].add_intersection(0.5, e(1), p(2), TOL).unwrap();
        let frag = Fragment::from_boundary(0, &edges);
        let pieces = frag.split().unwrap();
        assert_eq!(pieces.len(), 2);
        assert_eq!(pieces[0].nodes(), vec![p(0), e(0), e(1), p(3)]);
        assert_eq!(pieces[1].nodes(), vec![e(0), p(1), p(2), e(1)]);
        assert!(pieces.iter().all(Fragment::is_closed));
        assert!(pieces[0].is_connected(&pieces[1]));
        assert_eq!(pieces[0].interior_edge_ids(), vec![1]);
        assert_eq!(pieces[1].interior_edge_ids(), vec![3]);

        let total: f64 = pieces.iter().map(|f| f.boundary_measure(&edges)).sum();
        assert!((total - 4.0).abs() < 1e-12);
    }

    #[test]
    fn one_cut_inserts_the_embedded_node() {
        let mut edges = square();
        edges[1].add_intersection(0.3, e(0), p(1), TOL).unwrap();
        let pieces = Fragment::from_boundary(0, &edges).split().unwrap();
        assert_eq!(pieces.len(), 1);
        assert_eq!(pieces[0].nodes(), vec![p(0), p(1), e(0), p(2), p(3)]);
        assert_eq!(pieces[0].num_edges(), 5);
        assert!((pieces[0].boundary_measure(&edges) - 4.0).abs() < 1e-12);
    }

    #[test]
    fn corner_cut_produces_triangle() {
        let mut edges = square();
        edges[0].add_intersection(0.5, e(0), p(0), TOL).unwrap();
        edges[1].add_intersection(0.5, e(1), p(1), TOL).unwrap();
        let pieces = Fragment::from_boundary(0, &edges).split().unwrap();
        assert_eq!(pieces[0].nodes(), vec![p(0), e(0), e(1), p(2), p(3)]);
        assert_eq!(pieces[1].nodes(), vec![e(0), p(1), e(1)]);
    }

    #[test]
    fn tip_edges_spanning_nothing_are_rejected() {
        let mut edges = square();
        edges[2].add_intersection(0.25, e(0), p(2), TOL).unwrap();
        let mut frag = Fragment::from_loop(Some(0), &[p(0), p(1), p(2), e(0), p(2)]);
        assert!(matches!(
            frag.combine_tip_edges(&edges, TOL),
            Err(CutMeshError::InvalidIntersection(_))
        ));
    }

    #[test]
    fn tip_edges_combine_back_into_one_cut_edge() {
        let mut edges = square();
        edges[2].add_intersection(0.25, e(0), p(2), TOL).unwrap();
        let mut frag = Fragment::from_boundary(0, &edges).split().unwrap().remove(0);
        assert_eq!(frag.num_edges(), 5);
        assert!(frag.combine_tip_edges(&edges, TOL).unwrap());
        assert_eq!(frag.num_edges(), 4);
        assert!(frag.is_closed());
        let merged = frag.edge(2);
        assert_eq!(merged.nodes(), [p(2), p(3)]);
        assert!((merged.intersection(p(2)).unwrap() - 0.25).abs() < 1e-12);
        assert!(!frag.combine_tip_edges(&square(), TOL).unwrap());
    }

    #[test]
    fn tip_edges_wrapping_the_loop_start_combine() {
        let mut edges = square();
        edges[0].add_intersection(0.5, e(0), p(0), TOL).unwrap();
        // Loop starting at the embedded node: the two halves of edge 0 are
        // the last and the first fragment edge.
        let mut frag = Fragment::from_loop(Some(0), &[e(0), p(1), p(2), p(3), p(0)]);
        assert!(frag.combine_tip_edges(&edges, TOL).unwrap());
        assert_eq!(frag.nodes(), vec![p(1), p(2), p(3), p(0)]);
        assert_eq!(frag.edge(3).embedded_node(), Some(e(0)));
        assert!(frag.is_closed());
    }

    #[test]
    fn common_nodes_with_edge_filters_endpoints() {
        let frag = Fragment::from_loop(Some(0), &[p(0), e(0), e(1), p(3)]);
        let edge = Edge::new(p(3), p(2));
        assert_eq!(frag.common_nodes_with_edge(&edge), vec![p(3)]);
        assert_eq!(frag.embedded_nodes().len(), 2);
    }
}
