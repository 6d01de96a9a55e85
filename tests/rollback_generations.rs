//! Handles across generations, and rebuilding a cut mesh from saved local
//! copies after a reset.

use xfem_topology::cut_mesh::CutMesh;
use xfem_topology::debug_invariants::DebugInvariants;
use xfem_topology::mesh_error::CutMeshError;
use xfem_topology::topology::{Element, NodeKey};

fn p(id: u32) -> NodeKey {
    NodeKey::permanent(id)
}

fn e(id: u32) -> NodeKey {
    NodeKey::embedded(id)
}

fn after_first_cycle() -> CutMesh {
    let mut mesh = CutMesh::default();
    mesh.add_elements(&[vec![0, 1, 2, 3], vec![3, 2, 4, 5]])
        .unwrap();
    mesh.update_edge_neighbors().unwrap();
    mesh.add_edge_intersection(0, 0, 0.5).unwrap();
    mesh.add_edge_intersection(0, 2, 0.5).unwrap();
    mesh.update_physical_links_and_fragments().unwrap();
    mesh.update_topology().unwrap();
    mesh
}

fn saved_children(mesh: &CutMesh) -> Vec<(u32, Vec<u32>, Element)> {
    [2, 3]
        .into_iter()
        .map(|id| {
            let elem = mesh.get_elem_by_id(id).unwrap();
            let nodes = elem.nodes().iter().map(|n| n.id()).collect();
            (id, nodes, elem.to_local_copy().unwrap())
        })
        .collect()
}

#[test]
fn parents_go_stale_when_ancestry_is_cleared() {
    let mut mesh = after_first_cycle();
    let parent = mesh.get_elem_by_id(0).unwrap().handle();
    let child = mesh.get_elem_by_id(2).unwrap().handle();
    mesh.clear_ancestry().unwrap();

    assert!(matches!(
        mesh.resolve_element(parent),
        Err(CutMeshError::StaleHandle { what: "element", id: 0, .. })
    ));
    assert_eq!(mesh.resolve_element(child).unwrap().id(), 2);
}

#[test]
fn reset_invalidates_everything() {
    let mut mesh = after_first_cycle();
    let child = mesh.get_elem_by_id(3).unwrap().handle();
    let node = mesh.node_handle(p(7)).unwrap();
    let cut = mesh.node_handle(e(0)).unwrap();
    mesh.reset();

    assert_eq!(mesh.num_elements(), 0);
    assert!(mesh.crack_tip_elements().is_empty());
    assert!(mesh.last_delta().is_empty());
    assert!(mesh.resolve_element(child).is_err());
    assert!(mesh.resolve_node(node).is_err());
    assert!(mesh.resolve_node(cut).is_err());
}

#[test]
fn reingesting_after_reset_reproduces_the_mesh() {
    let connectivity = [vec![0, 1, 2, 3], vec![3, 2, 4, 5]];
    let mut fresh = CutMesh::default();
    fresh.add_elements(&connectivity).unwrap();
    fresh.update_edge_neighbors().unwrap();

    let mut mesh = after_first_cycle();
    mesh.reset();
    mesh.add_elements(&connectivity).unwrap();
    mesh.update_edge_neighbors().unwrap();

    assert_eq!(
        mesh.elements().keys().collect::<Vec<_>>(),
        fresh.elements().keys().collect::<Vec<_>>()
    );
    for (id, elem) in fresh.elements() {
        let rebuilt = mesh.get_elem_by_id(*id).unwrap();
        assert_eq!(rebuilt.nodes(), elem.nodes());
        for i in 0..elem.num_edges() {
            assert_eq!(rebuilt.edge_neighbors(i), elem.edge_neighbors(i));
        }
    }
    assert_eq!(mesh.node_to_elements(), fresh.node_to_elements());
}

#[test]
fn local_copies_only_hold_local_corners() {
    let mesh = after_first_cycle();
    let left = mesh.get_elem_by_id(2).unwrap();
    let copy = left.to_local_copy().unwrap();
    assert_eq!(
        copy.nodes(),
        &[NodeKey::local(0), NodeKey::local(1), NodeKey::local(2), NodeKey::local(3)]
    );
    assert_eq!(copy.edge(0).embedded_node(), Some(e(2)));
    assert!(copy.parent().is_none());
    assert_eq!(left.global_node_from_local_node(NodeKey::local(1)).unwrap(), p(6));
    assert_eq!(left.create_local_node_from_global_node(p(3)).unwrap(), NodeKey::local(3));
    assert!(left.create_local_node_from_global_node(e(2)).is_err());
}

#[test]
fn rebuild_from_saved_copies() {
    let mesh = after_first_cycle();
    let saved = saved_children(&mesh);
    let upper: Vec<u32> = mesh
        .get_elem_by_id(1)
        .unwrap()
        .nodes()
        .iter()
        .map(|n| n.id())
        .collect();

    let mut rebuilt = CutMesh::default();
    rebuilt.add_element(&upper, 1).unwrap();
    for (id, nodes, _) in &saved {
        rebuilt.add_element(nodes, *id).unwrap();
    }
    for (id, _, copy) in &saved {
        rebuilt.restore_fragment_info(*id, copy).unwrap();
    }
    rebuilt.update_edge_neighbors().unwrap();
    for (id, _, copy) in &saved {
        rebuilt.restore_edge_intersections(*id, copy).unwrap();
    }
    rebuilt.init_crack_tip_topology().unwrap();

    let left = rebuilt.get_elem_by_id(2).unwrap();
    assert_eq!(left.nodes(), &[p(0), p(6), p(2), p(3)]);
    assert_eq!(left.num_fragments(), 1);
    assert!(left.has_phantom_nodes());
    assert_eq!(left.edge(0).embedded_node(), Some(e(2)));
    assert_eq!(left.edge(2).embedded_node(), Some(e(1)));

    let tip = rebuilt.get_elem_by_id(1).unwrap();
    assert_eq!(tip.edge(0).embedded_node(), Some(e(1)));
    assert_eq!(tip.edge_neighbors(0), &[2, 3]);
    assert!(rebuilt.is_crack_tip_element(1));
    assert!(rebuilt.embedded_nodes().contains(e(0)));
    assert!(rebuilt.validate_invariants().is_ok());
}

#[test]
fn restoring_twice_is_rejected() {
    let mesh = after_first_cycle();
    let saved = saved_children(&mesh);
    let (id, nodes, copy) = &saved[0];

    let mut rebuilt = CutMesh::default();
    rebuilt.add_element(nodes, *id).unwrap();
    rebuilt.restore_fragment_info(*id, copy).unwrap();
    assert!(matches!(
        rebuilt.restore_fragment_info(*id, copy),
        Err(CutMeshError::Invariant(_))
    ));

    rebuilt.add_element(&[10, 11, 12], 9).unwrap();
    assert!(matches!(
        rebuilt.restore_fragment_info(9, copy),
        Err(CutMeshError::InvalidElementArity { found: 4 })
    ));
}
