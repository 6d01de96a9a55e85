use proptest::prelude::*;

use xfem_topology::cut_mesh::CutMesh;
use xfem_topology::debug_invariants::DebugInvariants;
use xfem_topology::topology::NodeKey;
use xfem_topology::xfem::CutElem;

const SQUARE: [[f64; 2]; 4] = [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]];

fn two_quads() -> CutMesh {
    let mut mesh = CutMesh::default();
    mesh.add_elements(&[vec![0, 1, 2, 3], vec![3, 2, 4, 5]])
        .unwrap();
    mesh.update_edge_neighbors().unwrap();
    mesh
}

proptest! {
    #[test]
    fn shared_cuts_mirror_across_the_edge(pos in 0.01f64..0.99) {
        let mut mesh = two_quads();
        let node = mesh.add_edge_intersection(0, 2, pos).unwrap();
        let upper = mesh.get_elem_by_id(1).unwrap();
        prop_assert_eq!(upper.edge(0).embedded_node(), Some(node));
        let from_3 = upper.edge(0).intersection(NodeKey::permanent(3)).unwrap();
        prop_assert!((from_3 - (1.0 - pos)).abs() < 1e-12);
        // Cutting from the other side at the mirrored position reuses the node.
        prop_assert_eq!(mesh.add_edge_intersection(1, 0, 1.0 - pos).unwrap(), node);
    }

    #[test]
    fn fragments_conserve_the_boundary(a in 0.01f64..0.99, b in 0.01f64..0.99) {
        let mut mesh = CutMesh::default();
        mesh.add_elements(&[vec![0, 1, 2, 3]]).unwrap();
        mesh.update_edge_neighbors().unwrap();
        mesh.add_edge_intersection(0, 0, a).unwrap();
        mesh.add_edge_intersection(0, 2, b).unwrap();
        mesh.update_physical_links_and_fragments().unwrap();

        let elem = mesh.get_elem_by_id(0).unwrap();
        prop_assert_eq!(elem.num_fragments(), 2);
        let measures: Vec<f64> = elem
            .fragments()
            .iter()
            .map(|f| f.boundary_measure(elem.edges()))
            .collect();
        prop_assert!((measures.iter().sum::<f64>() - 4.0).abs() < 1e-9);
        prop_assert!((measures[0] - (a + 1.0 + (1.0 - b))).abs() < 1e-9);
    }

    #[test]
    fn children_split_the_area(a in 0.01f64..0.99, b in 0.01f64..0.99) {
        let mut mesh = CutMesh::default();
        mesh.add_elements(&[vec![0, 1, 2, 3]]).unwrap();
        mesh.update_edge_neighbors().unwrap();
        mesh.add_edge_intersection(0, 0, a).unwrap();
        mesh.add_edge_intersection(0, 2, b).unwrap();
        mesh.update_physical_links_and_fragments().unwrap();
        let children = mesh.update_topology().unwrap().child_elements.clone();
        prop_assert_eq!(children.len(), 2);
        prop_assert!(mesh.validate_invariants().is_ok());

        let fractions: Vec<f64> = children
            .iter()
            .map(|&c| {
                CutElem::new(mesh.get_elem_by_id(c).unwrap())
                    .unwrap()
                    .physical_volfrac(&SQUARE)
                    .unwrap()
            })
            .collect();
        prop_assert!((fractions[0] + fractions[1] - 1.0).abs() < 1e-9);
        prop_assert!((fractions[0] - 0.5 * (a + 1.0 - b)).abs() < 1e-9);
    }
}
