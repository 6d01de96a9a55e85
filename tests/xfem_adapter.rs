//! The adapter driving the engine from a host mesh over several updates.

use std::collections::BTreeSet;

use xfem_topology::cut::PlaneCut;
use xfem_topology::mesh_error::CutMeshError;
use xfem_topology::xfem::{HostMesh, Xfem};

const TOL: f64 = 1e-12;

/// Two unit squares stacked along y: element 0 below element 1.
fn two_squares() -> HostMesh {
    let mut host = HostMesh::new();
    for coords in [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0], [1.0, 2.0], [0.0, 2.0]] {
        host.add_node(coords);
    }
    host.add_element(&[0, 1, 2, 3]).unwrap();
    host.add_element(&[3, 2, 4, 5]).unwrap();
    host
}

/// Vertical trace entering through the bottom edge at x = 0.5.
fn vertical_trace(length: f64) -> PlaneCut {
    PlaneCut::new([0.5, -0.5], [1.0, 0.0]).with_length(length)
}

fn element_ids(host: &HostMesh) -> Vec<u32> {
    host.elements().map(|(id, _)| id).collect()
}

#[test]
fn trace_splits_the_lower_element() {
    let mut host = two_squares();
    let mut xfem = Xfem::default();
    xfem.add_geometric_cut(vertical_trace(1.75));

    assert!(xfem.update(&mut host, 0.0).unwrap());
    assert_eq!(element_ids(&host), vec![1, 2, 3]);
    assert_eq!(host.num_nodes(), 8);
    assert_eq!(host.coords(6).unwrap(), [1.0, 0.0]);
    assert_eq!(host.coords(7).unwrap(), [0.0, 0.0]);
    assert_eq!(host.element_nodes(2).unwrap(), &[0, 6, 2, 3]);
    assert_eq!(host.element_nodes(3).unwrap(), &[7, 1, 2, 3]);

    assert_eq!(xfem.crack_tip_elements(), &BTreeSet::from([1]));
    assert!(xfem.is_elem_at_crack_tip(1));
    assert!(!xfem.is_elem_cut(1));
    for id in [2, 3] {
        assert!(xfem.is_elem_cut(id));
        assert!((xfem.get_elem_phys_volfrac(&host, id).unwrap() - 0.5).abs() < TOL);
    }
    assert_eq!(xfem.get_elem_phys_volfrac(&host, 1).unwrap(), 1.0);
}

#[test]
fn cut_plane_of_the_split_halves() {
    let mut host = two_squares();
    let mut xfem = Xfem::default();
    xfem.add_geometric_cut(vertical_trace(1.75));
    xfem.update(&mut host, 0.0).unwrap();

    let plane = |elem, quantity| xfem.get_cut_plane(&host, elem, quantity, 0).unwrap();
    assert!((plane(2, 0) - 0.5).abs() < TOL);
    assert!((plane(2, 1) - 0.5).abs() < TOL);
    assert_eq!(plane(2, 2), 0.0);
    assert!((plane(2, 3) - 1.0).abs() < TOL);
    assert!(plane(2, 4).abs() < TOL);
    assert_eq!(plane(2, 5), 0.0);
    // The other half faces the opposite way.
    assert!((plane(3, 3) + 1.0).abs() < TOL);
    // Uncut elements have no plane.
    assert_eq!(plane(1, 0), 0.0);

    assert_eq!(
        xfem.get_cut_plane(&host, 2, 6, 0),
        Err(CutMeshError::InvalidCutPlaneQuantity(6))
    );
    assert!(matches!(
        xfem.get_cut_plane(&host, 2, 0, 1),
        Err(CutMeshError::InvalidGeometry(_))
    ));
}

#[test]
fn repeating_an_update_is_idle() {
    let mut host = two_squares();
    let mut xfem = Xfem::default();
    xfem.add_geometric_cut(vertical_trace(1.75));
    assert!(xfem.update(&mut host, 0.0).unwrap());
    let before = host.clone();

    assert!(!xfem.update(&mut host, 0.0).unwrap());
    assert_eq!(host, before);
    assert_eq!(xfem.crack_tip_elements(), &BTreeSet::from([1]));
    assert!(xfem.is_elem_cut(2) && xfem.is_elem_cut(3));
}

#[test]
fn crack_tip_follows_the_host_on_idle_updates() {
    let mut host = two_squares();
    let mut xfem = Xfem::default();
    xfem.add_geometric_cut(vertical_trace(1.75));
    assert!(xfem.update(&mut host, 0.0).unwrap());
    assert!(xfem.is_elem_at_crack_tip(1));

    // The host drops the element ahead of the crack between updates.
    host.delete_element(1).unwrap();
    assert!(!xfem.update(&mut host, 0.0).unwrap());
    assert!(xfem.crack_tip_elements().is_empty());
    assert!(!xfem.is_elem_at_crack_tip(1));
    assert!(xfem.is_elem_cut(2) && xfem.is_elem_cut(3));
}

#[test]
fn growing_trace_reaches_the_upper_element() {
    let mut host = two_squares();
    let mut xfem = Xfem::default();
    xfem.add_geometric_cut(vertical_trace(3.0).growing(0.0, 1.0));

    // Nothing has grown yet.
    assert!(!xfem.update(&mut host, 0.0).unwrap());
    assert_eq!(element_ids(&host), vec![0, 1]);

    // The tip stops inside the upper element.
    assert!(xfem.update(&mut host, 0.6).unwrap());
    assert_eq!(element_ids(&host), vec![1, 2, 3]);
    assert!(xfem.is_elem_at_crack_tip(1));

    // The trace leaves through the top edge.
    assert!(xfem.update(&mut host, 1.0).unwrap());
    assert_eq!(element_ids(&host), vec![4, 5, 6, 7]);
    assert_eq!(host.num_nodes(), 14);
    assert!(xfem.crack_tip_elements().is_empty());
    for id in 4..8 {
        assert!(xfem.is_elem_cut(id));
        assert!((xfem.get_elem_phys_volfrac(&host, id).unwrap() - 0.5).abs() < TOL);
    }
}

#[test]
fn state_marked_side_starts_a_crack() {
    let mut host = HostMesh::rectangle(1, 1, 1.0, 1.0).unwrap();
    let mut xfem = Xfem::default();
    xfem.add_state_marked_elem_side(0, [0.0, 1.0], 3).unwrap();

    assert!(xfem.update(&mut host, 0.0).unwrap());
    assert_eq!(element_ids(&host), vec![1, 2]);
    assert_eq!(host.num_nodes(), 8);
    for id in [1, 2] {
        assert!((xfem.get_elem_phys_volfrac(&host, id).unwrap() - 0.5).abs() < TOL);
        assert!((xfem.get_cut_plane(&host, id, 1, 0).unwrap() - 0.5).abs() < TOL);
    }
    // The lower half keeps the first node and faces up.
    assert!((xfem.get_cut_plane(&host, 1, 4, 0).unwrap() - 1.0).abs() < TOL);
    assert!(xfem.crack_tip_elements().is_empty());

    // Marks are consumed by the update.
    assert!(!xfem.update(&mut host, 0.0).unwrap());
}

#[test]
fn duplicate_marks_are_rejected() {
    let mut xfem = Xfem::default();
    xfem.add_state_marked_elem(0, [1.0, 0.0]).unwrap();
    assert!(matches!(
        xfem.add_state_marked_elem_side(0, [1.0, 0.0], 1),
        Err(CutMeshError::DuplicateStateMark(0))
    ));
    xfem.clear_state_marked_elems();
    xfem.add_state_marked_frag(0, [1.0, 0.0]).unwrap();
}
