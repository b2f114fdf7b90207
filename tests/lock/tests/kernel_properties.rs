//! Property lock tests for the grid model, oracle, canonicalization and
//! fingerprints.

use proptest::prelude::*;
use tessera_kernel::oracle::validate;
use tessera_kernel::pipeline::canonicalize::canonicalize;
use tessera_kernel::primitives::apply::apply_step;
use tessera_kernel::{standard_registry, Grid, Pipeline, Step, TrainingPair};
use tessera_memory::fingerprint;

const FULL_PALETTE: [u8; 10] = [0, 1, 2, 3, 4, 5, 6, 7, 8, 9];

/// Rotations, flips and identity: their declared algebra is exact.
const DIHEDRAL: [&str; 6] = ["identity", "rotate_90", "rotate_180", "rotate_270", "flip_h", "flip_v"];

fn arb_grid() -> impl Strategy<Value = Grid> {
    (1usize..=6, 1usize..=6).prop_flat_map(|(rows, cols)| {
        prop::collection::vec(0u8..=9, rows * cols).prop_map(move |cells| Grid::new(rows, cols, cells).unwrap())
    })
}

fn arb_dihedral_pipeline() -> impl Strategy<Value = Pipeline> {
    prop::collection::vec(prop::sample::select(DIHEDRAL.to_vec()), 0..8)
        .prop_map(|names| names.into_iter().map(Step::nullary).collect())
}

fn apply_n(name: &str, grid: &Grid, times: usize) -> Grid {
    let reg = standard_registry();
    let mut g = grid.clone();
    for _ in 0..times {
        g = apply_step(&g, name, &[], &reg).unwrap().unwrap();
    }
    g
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    // -----------------------------------------------------------------------
    // ACCEPTANCE: primitives are deterministic and well-formed
    // -----------------------------------------------------------------------

    #[test]
    fn every_primitive_is_deterministic_and_rectangular(g in arb_grid()) {
        let reg = standard_registry();
        for entry in reg.iter() {
            for args in entry.params.instances(&FULL_PALETTE) {
                let first = apply_step(&g, entry.name, &args, &reg).unwrap();
                let second = apply_step(&g, entry.name, &args, &reg).unwrap();
                prop_assert_eq!(&first, &second, "{}{:?}", entry.name, args);
                if let Some(out) = first {
                    prop_assert!(out.rows() > 0 && out.cols() > 0);
                    prop_assert_eq!(out.cells().len(), out.rows() * out.cols());
                    prop_assert!(out.cells().iter().all(|&c| c <= 9));
                }
            }
        }
    }

    #[test]
    fn four_quarter_turns_restore(g in arb_grid()) {
        prop_assert_eq!(apply_n("rotate_90", &g, 4), g);
    }

    #[test]
    fn double_flips_restore(g in arb_grid()) {
        prop_assert_eq!(apply_n("flip_h", &g, 2), g.clone());
        prop_assert_eq!(apply_n("flip_v", &g, 2), g);
    }

    // -----------------------------------------------------------------------
    // ACCEPTANCE: one mismatched cell fails validation
    // -----------------------------------------------------------------------

    #[test]
    fn single_cell_mismatch_fails(g in arb_grid(), pick in any::<prop::sample::Index>()) {
        let reg = standard_registry();
        let identity = Pipeline::new(vec![Step::nullary("identity")]);
        prop_assert!(validate(&identity, &[TrainingPair::new(g.clone(), g.clone())], &reg).unwrap());

        let at = pick.index(g.area());
        let (row, col) = (at / g.cols(), at % g.cols());
        let wrong = Grid::from_fn(g.rows(), g.cols(), |r, c| {
            let v = g.get(r, c);
            if (r, c) == (row, col) { (v + 1) % 10 } else { v }
        })
        .unwrap();
        let pairs = vec![TrainingPair::new(g.clone(), g.clone()), TrainingPair::new(g, wrong)];
        prop_assert!(!validate(&identity, &pairs, &reg).unwrap());
    }

    // -----------------------------------------------------------------------
    // ACCEPTANCE: canonicalization is idempotent, shrinking and sound
    // -----------------------------------------------------------------------

    #[test]
    fn canonicalize_is_idempotent_and_shrinks(p in arb_dihedral_pipeline(), g in arb_grid()) {
        let reg = standard_registry();
        let once = canonicalize(&p, &reg);
        prop_assert_eq!(canonicalize(&once, &reg), once.clone());
        prop_assert!(once.depth() <= p.depth());
        prop_assert_eq!(once.apply(&g, &reg).unwrap(), p.apply(&g, &reg).unwrap());
    }

    // -----------------------------------------------------------------------
    // ACCEPTANCE: fingerprints are deterministic
    // -----------------------------------------------------------------------

    #[test]
    fn fingerprint_is_deterministic(a in arb_grid(), b in arb_grid()) {
        let pairs = vec![TrainingPair::new(a, b)];
        let first = fingerprint(&pairs);
        let second = fingerprint(&pairs.clone());
        prop_assert_eq!(&first.hash, &second.hash);
        prop_assert_eq!(first, second);
    }
}
